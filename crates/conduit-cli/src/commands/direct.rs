//! Direct tool invocation, bypassing the completion loop

use crate::console::CliConsole;
use anyhow::{Context, bail};
use conduit_core::{ConduitConfig, SessionManager};
use serde_json::{Value, json};
use tracing::info;

/// Arguments for a direct call: raw `--args` JSON, else `{"city": QUERY}`
pub fn build_arguments(raw: Option<&str>, query: Option<&str>) -> anyhow::Result<Value> {
    match (raw, query) {
        (Some(raw), _) => {
            let value: Value = serde_json::from_str(raw).context("Invalid --args JSON")?;
            if !value.is_object() {
                bail!("--args must be a JSON object");
            }
            Ok(value)
        }
        (None, Some(query)) => Ok(json!({"city": query})),
        (None, None) => bail!("Direct mode needs a query or --args"),
    }
}

pub async fn execute(
    config: &ConduitConfig,
    tool: &str,
    arguments: Value,
    console: &CliConsole,
) -> anyhow::Result<()> {
    info!(tool, %arguments, "Direct tool call");

    let mut manager = SessionManager::from_config(config);
    let result = manager.direct_call(tool, arguments).await?;

    console.tool_result(tool, &result);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_becomes_city() {
        let args = build_arguments(None, Some("Taipei")).unwrap();
        assert_eq!(args, json!({"city": "Taipei"}));
    }

    #[test]
    fn test_raw_args_take_precedence() {
        let args = build_arguments(Some(r#"{"city":"Paris","days":3}"#), Some("ignored")).unwrap();
        assert_eq!(args, json!({"city": "Paris", "days": 3}));
    }

    #[test]
    fn test_invalid_args() {
        let err = build_arguments(Some("{nope"), None).unwrap_err();
        assert!(err.to_string().contains("Invalid --args JSON"));
        assert!(build_arguments(Some("[1, 2]"), None).is_err());
        assert!(build_arguments(None, None).is_err());
    }
}
