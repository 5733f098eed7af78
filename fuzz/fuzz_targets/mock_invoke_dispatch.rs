#![no_main]

use libfuzzer_sys::fuzz_target;
use serde_json::Value;
use tau_mock::{args, ExpectedCall, Mock, MockError, MockOptions, StrategyKind};

fuzz_target!(|data: &[u8]| {
    let raw = String::from_utf8_lossy(data);
    let (member, payload) = raw.split_once('\n').unwrap_or((&*raw, ""));
    let args = serde_json::from_str::<Vec<Value>>(payload).unwrap_or_default();

    let mut mock = Mock::with_options(MockOptions::named("Fuzz").strict(data.len() % 2 == 0));
    mock.expect("Bar", args![1, 2]);
    mock.setup_result_in_order("Next", "a", Vec::<&str>::new());
    mock.setup(
        StrategyKind::ParameterizedLookup,
        ExpectedCall::new("Lookup").with_args(args!["key"]).returns(1),
    );
    mock.expect_no_call("Forbidden", Vec::<&str>::new());

    let arity = args.len();
    match mock.call(member, args) {
        Ok(_) | Err(MockError::Verification(_)) => {}
        Err(other) => panic!("routing produced a non-verification failure: {other}"),
    }

    let first = mock.verify();
    assert_eq!(first, mock.verify());
    assert_eq!(mock.history().len(), 1);
    assert_eq!(mock.history()[0].args.len(), arity);
});
