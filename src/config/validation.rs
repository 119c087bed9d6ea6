use crate::config::keys::KeyConfig;
use crate::error::ConfigError;

type ValidationResult = std::result::Result<(), ConfigError>;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Centralized configuration validation utilities
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate numeric range
    pub fn validate_range<T>(value: T, min: T, max: T, field_name: &str) -> ValidationResult
    where
        T: PartialOrd + std::fmt::Display + Copy,
    {
        if value < min || value > max {
            return Err(ConfigError::InvalidValue {
                field: field_name.to_string(),
                value: format!("{value} (must be between {min} and {max})"),
            });
        }
        Ok(())
    }

    /// A progress template needs exactly one `{}` placeholder
    pub fn validate_template(template: &str, field_name: &str) -> ValidationResult {
        if template.matches("{}").count() != 1 {
            return Err(ConfigError::InvalidValue {
                field: field_name.to_string(),
                value: format!("'{template}' (must contain one '{{}}' placeholder)"),
            });
        }
        Ok(())
    }

    pub fn validate_log_level(level: &str, field_name: &str) -> ValidationResult {
        if !LOG_LEVELS.contains(&level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidValue {
                field: field_name.to_string(),
                value: format!("'{level}' (use one of {})", LOG_LEVELS.join(", ")),
            });
        }
        Ok(())
    }

    /// Focus keys are taken before any widget sees them, so they may not be
    /// bound to anything else. Other actions may share keys; Esc both
    /// dismisses a dialog and opens the main menu by default.
    pub fn validate_keys(keys: &KeyConfig) -> ValidationResult {
        let all = keys.all();
        for (field, binding) in &all {
            if !matches!(*field, "focus_next" | "focus_previous") {
                continue;
            }
            let clash = all
                .iter()
                .find(|(other, other_binding)| other != field && other_binding == binding);
            if let Some((other, _)) = clash {
                return Err(ConfigError::InvalidKey {
                    field: format!("keys.{field}"),
                    value: format!("{binding} is also bound to keys.{other}"),
                });
            }
        }
        Ok(())
    }
}
