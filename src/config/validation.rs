use std::collections::HashSet;

use super::*;
use crate::tool_parser::sentinels::ENVELOPES;

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate(config: &ExtractorConfig) -> ConfigResult<()> {
        Self::validate_tool_names(&config.tool_names)?;
        Self::validate_think_tokens(config)?;
        Self::validate_call_id_prefix(&config.call_id_prefix)?;
        // Fragment spelling is checked when they are assembled
        config.sentinel_fragments()?;
        Ok(())
    }

    fn validate_tool_names(names: &[String]) -> ConfigResult<()> {
        if names.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "tool_names".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for name in names {
            if !is_identifier(name) {
                return Err(ConfigError::InvalidValue {
                    field: "tool_names".to_string(),
                    value: name.clone(),
                    reason: "Must match [A-Za-z_][A-Za-z0-9_]*".to_string(),
                });
            }

            if ENVELOPES.iter().any(|sentinel| sentinel.name == name.as_str()) {
                return Err(ConfigError::InvalidValue {
                    field: "tool_names".to_string(),
                    value: name.clone(),
                    reason: "Collides with an envelope sentinel name".to_string(),
                });
            }

            if !seen.insert(name.as_str()) {
                return Err(ConfigError::InvalidValue {
                    field: "tool_names".to_string(),
                    value: name.clone(),
                    reason: "Duplicate tool name".to_string(),
                });
            }
        }
        Ok(())
    }

    fn validate_think_tokens(config: &ExtractorConfig) -> ConfigResult<()> {
        for (field, token) in [
            ("think_start_token", &config.think_start_token),
            ("think_end_token", &config.think_end_token),
        ] {
            if token.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: token.clone(),
                    reason: "Must not be empty".to_string(),
                });
            }
        }

        if config.think_start_token == config.think_end_token {
            return Err(ConfigError::IncompatibleConfig {
                reason: "think_start_token and think_end_token must differ".to_string(),
            });
        }

        for name in &config.tool_names {
            let open = format!("<{}>", name);
            let close = format!("</{}>", name);
            if config.think_start_token == open || config.think_end_token == close {
                return Err(ConfigError::IncompatibleConfig {
                    reason: format!("Tool name '{}' collides with the reasoning block tags", name),
                });
            }
        }
        Ok(())
    }

    fn validate_call_id_prefix(prefix: &str) -> ConfigResult<()> {
        if prefix.chars().any(char::is_whitespace) {
            return Err(ConfigError::InvalidValue {
                field: "call_id_prefix".to_string(),
                value: prefix.to_string(),
                reason: "Must not contain whitespace".to_string(),
            });
        }
        Ok(())
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}
