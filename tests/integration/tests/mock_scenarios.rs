use serde_json::{json, Value};
use tau_mock::{
    args, ArgMatcher, ConfigurationError, InvocationOutcome, MemberKind, MockError, MockOptions,
    StubbedError,
};
use tau_mock_contract::{
    DynamicMock, MethodDescriptor, TableProxyGenerator, TypeDescriptor, VOID_TYPE,
};

#[derive(Debug, thiserror::Error)]
#[error("quota exceeded for {0}")]
struct QuotaExceeded(String);

fn foo_contract() -> TypeDescriptor {
    TypeDescriptor::from_json(&json!({
        "name": "Foo",
        "kind": "contract",
        "methods": [
            { "name": "Bar", "params": ["integer", "integer"], "returns": "any" },
            { "name": "Next", "returns": "string" },
            { "name": "Forbidden" },
            { "name": "Lookup", "params": ["string"], "returns": "integer" },
            { "name": "Fetch", "params": ["string"], "returns": "object" }
        ],
        "properties": [
            { "name": "Enabled", "type": "bool", "getter": {}, "setter": {} }
        ]
    }))
    .expect("foo contract should parse")
}

fn strict_foo() -> DynamicMock {
    let mock = DynamicMock::new(foo_contract());
    mock.set_strict(true);
    mock
}

fn verification(error: MockError) -> tau_mock::VerificationFailure {
    match error {
        MockError::Verification(failure) => failure,
        other => panic!("expected verification failure, got {other:?}"),
    }
}

#[test]
fn integration_literal_expectation_matches_and_verifies() {
    let mut mock = strict_foo();
    mock.expect("Bar", args![1, 2]).expect("record Bar(1,2)");

    let substitute = mock.object().expect("substitute");
    let result = substitute
        .call("Bar", &mut [json!(1), json!(2)])
        .expect("matching call succeeds");

    assert_eq!(result, Value::Null);
    mock.verify().expect("single expectation met");
}

#[test]
fn integration_mismatched_literal_cites_parameter_index() {
    let mut mock = strict_foo();
    mock.expect("Bar", args![1, 2]).expect("record Bar(1,2)");

    let substitute = mock.object().expect("substitute");
    let failure = verification(
        substitute
            .call("Bar", &mut [json!(1), json!(3)])
            .expect_err("second argument differs"),
    );

    assert_eq!(failure.reason, "Bar() called with incorrect parameter (2)");
    assert_eq!(failure.expected, "equal to <2>");
    assert_eq!(failure.actual, "3");
    assert_eq!(
        failure.to_string(),
        "Bar() called with incorrect parameter (2)\nexpected:<equal to <2>>\n but was:<3>"
    );
}

#[test]
fn integration_round_robin_cycles_indefinitely() {
    let mut mock = strict_foo();
    mock.setup_result_in_order("Next", "a", Vec::<&str>::new())
        .expect("record a");
    mock.setup_result_in_order("Next", "b", Vec::<&str>::new())
        .expect("record b");

    let substitute = mock.object().expect("substitute");
    let observed = (0..7)
        .map(|_| substitute.call("Next", &mut []).expect("next"))
        .collect::<Vec<_>>();

    assert_eq!(
        observed,
        vec![
            json!("a"),
            json!("b"),
            json!("a"),
            json!("b"),
            json!("a"),
            json!("b"),
            json!("a")
        ]
    );
    mock.verify().expect("round robin never fails verification");
    mock.verify().expect("verification is repeatable");
}

#[test]
fn integration_forbidden_member_fails_on_first_call() {
    let mut mock = strict_foo();
    mock.expect_no_call("Forbidden", Vec::<&str>::new())
        .expect("record forbidden");

    mock.verify().expect("no call made yet");

    let substitute = mock.object().expect("substitute");
    let failure = verification(
        substitute
            .call("Forbidden", &mut [])
            .expect_err("forbidden call"),
    );
    assert_eq!(failure.reason, "Forbidden() called");
}

#[test]
fn integration_non_overridable_member_is_rejected_before_instance_exists() {
    let target = TypeDescriptor::class("Foo")
        .method(MethodDescriptor::new("X", Vec::<&str>::new(), "integer"))
        .method(MethodDescriptor::new("Y", Vec::<&str>::new(), VOID_TYPE).overridable());
    let mock = DynamicMock::new(target);

    let error = mock
        .setup_result("X", 1, Vec::<&str>::new())
        .expect_err("X cannot be intercepted");
    assert_eq!(
        error.as_configuration(),
        Some(&ConfigurationError::NotOverridable {
            type_name: "Foo".to_string(),
            member: "X".to_string(),
            kind: MemberKind::Method,
        })
    );
    assert!(!mock.has_instance());
}

#[test]
fn integration_lenient_substitute_tolerates_unexpected_calls() {
    let mut mock = DynamicMock::new(foo_contract());
    assert!(!mock.is_strict());

    let substitute = mock.object().expect("substitute");
    assert_eq!(
        substitute
            .call("Bar", &mut [json!(4), json!(5)])
            .expect("lenient call"),
        Value::Null
    );
    mock.verify().expect("nothing was expected");
}

#[test]
fn integration_parameterized_lookup_answers_by_arguments() {
    let mut mock = strict_foo();
    mock.setup_result_for_params("Lookup", 1, args!["one"])
        .expect("record one");
    mock.setup_result_for_params("Lookup", 2, args!["two"])
        .expect("record two");

    let substitute = mock.object().expect("substitute");
    assert_eq!(
        substitute.call("Lookup", &mut [json!("two")]).expect("two"),
        json!(2)
    );
    assert_eq!(
        substitute.call("Lookup", &mut [json!("one")]).expect("one"),
        json!(1)
    );
    assert_eq!(
        substitute
            .call("Lookup", &mut [json!("three")])
            .expect("unmatched lookup is tolerated"),
        Value::Null
    );
}

#[test]
fn integration_stubbed_errors_surface_unchanged() {
    let mut mock = strict_foo();
    mock.expect_and_throw(
        "Fetch",
        StubbedError::new(QuotaExceeded("reports".to_string())),
        args!["reports"],
    )
    .expect("record typed failure");
    mock.expect_and_throw(
        "Fetch",
        anyhow::anyhow!("upstream unavailable"),
        args![ArgMatcher::Anything],
    )
    .expect("record anyhow failure");

    let substitute = mock.object().expect("substitute");

    let typed = substitute
        .call("Fetch", &mut [json!("reports")])
        .expect_err("typed failure");
    let stubbed = typed.as_stubbed().expect("stubbed error");
    assert_eq!(
        stubbed
            .downcast_ref::<QuotaExceeded>()
            .map(|error| error.0.as_str()),
        Some("reports")
    );

    let untyped = substitute
        .call("Fetch", &mut [json!("anything")])
        .expect_err("anyhow failure");
    assert_eq!(untyped.to_string(), "upstream unavailable");

    mock.verify().expect("both failures were expected");
}

#[test]
fn integration_property_stubs_route_through_accessors() {
    let mut mock = strict_foo();
    mock.setup_result("Enabled", true, Vec::<&str>::new())
        .expect("record getter");

    let substitute = mock.object().expect("substitute");
    assert_eq!(substitute.get("Enabled").expect("getter"), json!(true));
    assert_eq!(
        substitute.call("get_Enabled", &mut []).expect("accessor name"),
        json!(true)
    );
}

#[test]
fn integration_verify_all_report_serializes_every_failure() {
    let mut mock = strict_foo();
    mock.expect("Bar", args![1, 2]).expect("record Bar");
    mock.expect_and_return("Lookup", 7, args!["seven"])
        .expect("record Lookup");

    let substitute = mock.object().expect("substitute");
    let failure = verification(
        substitute
            .call("Bar", &mut [json!(9), json!(2)])
            .expect_err("mismatch still consumes the slot"),
    );
    assert_eq!(failure.reason, "Bar() called with incorrect parameter (1)");

    let report = mock.verify_all();
    assert!(!report.is_success());
    assert_eq!(
        serde_json::to_value(&report).expect("report serializes"),
        json!({
            "mock": "Foo",
            "failures": [
                {
                    "reason": "Lookup() not called enough times",
                    "expected": "1",
                    "actual": "0"
                }
            ]
        })
    );
}

#[test]
fn integration_history_records_routed_calls_when_enabled() {
    let mut mock = DynamicMock::with_options(
        foo_contract(),
        MockOptions::named("Foo").strict(true),
        TableProxyGenerator::new(),
    );
    mock.expect_and_return("Lookup", 3, args!["three"])
        .expect("record Lookup");

    let substitute = mock.object().expect("substitute");
    substitute
        .call("Lookup", &mut [json!("three")])
        .expect("lookup");
    substitute
        .call("Next", &mut [])
        .expect_err("no expectation in strict mode");

    let registry = mock.mock().lock();
    let history = registry.history();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].signature.to_string(), "Foo.Lookup()");
    assert_eq!(history[0].args, vec![json!("three")]);
    assert_eq!(
        history[0].outcome,
        InvocationOutcome::Returned { value: json!(3) }
    );
    assert!(matches!(
        &history[1].outcome,
        InvocationOutcome::Failed { error } if error.starts_with("Next() called too many times")
    ));
}
