use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const STRICT_ENV: &str = "TAU_MOCK_STRICT";
pub const RECORD_HISTORY_ENV: &str = "TAU_MOCK_RECORD_HISTORY";

/// Construction settings for a [`crate::Mock`] registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MockOptions {
    /// Owner name used in signatures and diagnostics.
    pub name: String,
    /// Fail calls to members without a registered strategy instead of returning null.
    pub strict: bool,
    /// Keep an ordered log of every routed invocation.
    pub record_history: bool,
}

impl Default for MockOptions {
    fn default() -> Self {
        Self {
            name: "Mock".to_string(),
            strict: false,
            record_history: true,
        }
    }
}

impl MockOptions {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Parses `MockOptions` from a JSON object; absent fields keep their defaults.
    #[tracing::instrument(level = "debug", skip(value))]
    pub fn from_json(value: &Value) -> Result<Self> {
        let object = value
            .as_object()
            .context("mock options JSON payload must be an object")?;
        let mut options = Self::default();

        if let Some(name) = object.get("name") {
            let name = name
                .as_str()
                .context("mock options field 'name' must be a string")?
                .trim();
            if name.is_empty() {
                return Err(anyhow!("mock options field 'name' cannot be empty"));
            }
            options.name = name.to_string();
        }
        if let Some(strict) = object.get("strict") {
            options.strict = strict
                .as_bool()
                .context("mock options field 'strict' must be boolean")?;
        }
        if let Some(record_history) = object.get("record_history") {
            options.record_history = record_history
                .as_bool()
                .context("mock options field 'record_history' must be boolean")?;
        }

        Ok(options)
    }

    /// Overlays `TAU_MOCK_STRICT` and `TAU_MOCK_RECORD_HISTORY` onto these options.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides_from(|name| std::env::var(name).ok())
    }

    pub fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(strict) = parse_optional_bool(STRICT_ENV, lookup(STRICT_ENV).as_deref())? {
            self.strict = strict;
        }
        if let Some(record_history) =
            parse_optional_bool(RECORD_HISTORY_ENV, lookup(RECORD_HISTORY_ENV).as_deref())?
        {
            self.record_history = record_history;
        }
        Ok(self)
    }
}

fn parse_optional_bool(name: &str, raw: Option<&str>) -> Result<Option<bool>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let value = raw.trim().to_ascii_lowercase();
    if value.is_empty() {
        return Ok(None);
    }
    match value.as_str() {
        "1" | "true" | "yes" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "off" => Ok(Some(false)),
        _ => Err(anyhow!(
            "invalid {} value '{}': expected one of 1,true,yes,on,0,false,no,off",
            name,
            raw.trim()
        )),
    }
}
