use crate::contract::ValidationError;

/// Environment-provided runtime settings for the hit-counter function.
///
/// Both values are required; the handler cannot reach its table without them,
/// so resolution happens once at binary startup and absence is fatal there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub table_name: String,
    pub region: String,
}

pub fn resolve_runtime_config(
    table_name: Option<String>,
    region: Option<String>,
) -> Result<RuntimeConfig, ValidationError> {
    Ok(RuntimeConfig {
        table_name: required_value("HITS_TABLE_NAME", table_name)?,
        region: required_value("REGION", region)?,
    })
}

fn required_value(name: &str, value: Option<String>) -> Result<String, ValidationError> {
    match value.as_deref().map(str::trim) {
        Some(trimmed) if !trimmed.is_empty() => Ok(trimmed.to_string()),
        _ => Err(ValidationError::new(format!("{name} must be configured"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_trimmed_values() {
        let config = resolve_runtime_config(
            Some(" hits-table \n".to_string()),
            Some("eu-central-1".to_string()),
        )
        .expect("config should resolve");

        assert_eq!(
            config,
            RuntimeConfig {
                table_name: "hits-table".to_string(),
                region: "eu-central-1".to_string(),
            }
        );
    }

    #[test]
    fn rejects_missing_table_name() {
        let error = resolve_runtime_config(None, Some("eu-central-1".to_string()))
            .expect_err("config should fail");
        assert_eq!(error.message(), "HITS_TABLE_NAME must be configured");
    }

    #[test]
    fn rejects_blank_region() {
        let error = resolve_runtime_config(Some("hits-table".to_string()), Some("  ".to_string()))
            .expect_err("config should fail");
        assert_eq!(error.message(), "REGION must be configured");
    }
}
