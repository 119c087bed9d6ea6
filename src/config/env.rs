use std::env;

use crate::error::ConfigError;

/// Environment variable configuration constants
pub struct EnvVars;

impl EnvVars {
    pub const CONFIG_PATH: &'static str = "UIKIT_CONFIG";
    pub const THEME: &'static str = "UIKIT_THEME";
    pub const FOCUS_WRAP: &'static str = "UIKIT_FOCUS_WRAP";
    pub const CLICK_TO_FOCUS: &'static str = "UIKIT_CLICK_TO_FOCUS";
    pub const PROGRESS_TEMPLATE: &'static str = "UIKIT_PROGRESS_TEMPLATE";
    pub const LOG_LEVEL: &'static str = "UIKIT_LOG_LEVEL";
    pub const LOG_VIEWER_CAPACITY: &'static str = "UIKIT_LOG_VIEWER_CAPACITY";

    // Special environment variables
    pub const FORCE_TERMINAL_UI: &'static str = "UIKIT_FORCE_TERMINAL_UI";
}

type ParseResult<T> = std::result::Result<Option<T>, ConfigError>;

fn invalid(var_name: &str, value: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        field: var_name.to_string(),
        value: value.into(),
    }
}

/// Environment variable parsing utilities with validation
pub struct EnvParser;

impl EnvParser {
    /// Parse environment variable as a trimmed, non-empty string
    pub fn parse_string(var_name: &str) -> ParseResult<String> {
        match env::var(var_name) {
            Ok(value) => {
                let trimmed = value.trim().to_string();
                if trimmed.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(trimmed))
                }
            }
            Err(env::VarError::NotPresent) => Ok(None),
            Err(env::VarError::NotUnicode(_)) => Err(invalid(var_name, "invalid UTF-8")),
        }
    }

    /// Parse environment variable as boolean
    pub fn parse_bool(var_name: &str) -> ParseResult<bool> {
        let Some(value) = Self::parse_string(var_name)? else {
            return Ok(None);
        };
        match value.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(Some(true)),
            "false" | "0" | "no" | "off" => Ok(Some(false)),
            _ => Err(invalid(
                var_name,
                format!("'{value}' (use true/false, 1/0, yes/no, on/off)"),
            )),
        }
    }

    /// Parse environment variable as usize with range validation
    pub fn parse_usize(var_name: &str, min: usize, max: usize) -> ParseResult<usize> {
        let Some(value) = Self::parse_string(var_name)? else {
            return Ok(None);
        };
        let parsed = value
            .parse::<usize>()
            .map_err(|_| invalid(var_name, format!("'{value}' is not a positive integer")))?;
        if parsed < min || parsed > max {
            return Err(invalid(
                var_name,
                format!("{parsed} is outside {min}..={max}"),
            ));
        }
        Ok(Some(parsed))
    }

    /// Check if environment variable is present (for boolean flags)
    pub fn is_present(var_name: &str) -> bool {
        env::var_os(var_name).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool() {
        env::set_var("UIKIT_TEST_BOOL_TRUE", "yes");
        env::set_var("UIKIT_TEST_BOOL_FALSE", "0");
        env::set_var("UIKIT_TEST_BOOL_INVALID", "maybe");

        assert_eq!(EnvParser::parse_bool("UIKIT_TEST_BOOL_TRUE").unwrap(), Some(true));
        assert_eq!(EnvParser::parse_bool("UIKIT_TEST_BOOL_FALSE").unwrap(), Some(false));
        assert!(EnvParser::parse_bool("UIKIT_TEST_BOOL_INVALID").is_err());
        assert_eq!(EnvParser::parse_bool("UIKIT_TEST_BOOL_NOT_SET").unwrap(), None);

        env::remove_var("UIKIT_TEST_BOOL_TRUE");
        env::remove_var("UIKIT_TEST_BOOL_FALSE");
        env::remove_var("UIKIT_TEST_BOOL_INVALID");
    }

    #[test]
    fn test_parse_usize() {
        env::set_var("UIKIT_TEST_USIZE_VALID", " 42 ");
        env::set_var("UIKIT_TEST_USIZE_OUT_OF_RANGE", "150");
        env::set_var("UIKIT_TEST_USIZE_INVALID", "lots");

        assert_eq!(
            EnvParser::parse_usize("UIKIT_TEST_USIZE_VALID", 1, 100).unwrap(),
            Some(42)
        );
        assert!(EnvParser::parse_usize("UIKIT_TEST_USIZE_OUT_OF_RANGE", 1, 100).is_err());
        assert!(EnvParser::parse_usize("UIKIT_TEST_USIZE_INVALID", 1, 100).is_err());
        assert_eq!(
            EnvParser::parse_usize("UIKIT_TEST_USIZE_NOT_SET", 1, 100).unwrap(),
            None
        );

        env::remove_var("UIKIT_TEST_USIZE_VALID");
        env::remove_var("UIKIT_TEST_USIZE_OUT_OF_RANGE");
        env::remove_var("UIKIT_TEST_USIZE_INVALID");
    }
}
