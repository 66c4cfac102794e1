//! Environment variable expansion for configuration strings.

use crate::ConfigError;

/// Expand `${VAR}` and `${VAR:-default}` references in a string.
///
/// Bare `$VAR` is left untouched.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    if !value.contains("${") {
        return Ok(value.to_owned());
    }

    shellexpand::env_with_context(value, |var| -> Result<Option<String>, LookupError> {
        std::env::var(var).map(Some).map_err(|_| LookupError {
            var_name: var.to_owned(),
        })
    })
    .map(std::borrow::Cow::into_owned)
    .map_err(|e| ConfigError::EnvVar {
        field: field.to_owned(),
        message: format!("${{{0}}} not set", e.cause.var_name),
    })
}

/// Variable that could not be resolved.
struct LookupError {
    var_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_simple_var() {
        // SAFETY: variable name is unique to this test
        unsafe {
            std::env::set_var("KUDE_TEST_EXPAND_SIMPLE", "/opt/kude");
        }
        let result = expand_env("${KUDE_TEST_EXPAND_SIMPLE}/templates", "external.template_dir");
        assert_eq!(result.unwrap(), "/opt/kude/templates");
        unsafe {
            std::env::remove_var("KUDE_TEST_EXPAND_SIMPLE");
        }
    }

    #[test]
    fn test_expand_default_used_when_unset() {
        // SAFETY: variable name is unique to this test
        unsafe {
            std::env::remove_var("KUDE_TEST_EXPAND_UNSET");
        }
        let result = expand_env("${KUDE_TEST_EXPAND_UNSET:-java}", "external.executable");
        assert_eq!(result.unwrap(), "java");
    }

    #[test]
    fn test_expand_missing_var_error() {
        // SAFETY: variable name is unique to this test
        unsafe {
            std::env::remove_var("KUDE_TEST_EXPAND_MISSING");
        }
        let err = expand_env("${KUDE_TEST_EXPAND_MISSING}", "external.jar").unwrap_err();
        assert!(matches!(err, ConfigError::EnvVar { .. }));
        assert!(err.to_string().contains("KUDE_TEST_EXPAND_MISSING"));
        assert!(err.to_string().contains("external.jar"));
    }

    #[test]
    fn test_expand_literal_unchanged() {
        assert_eq!(expand_env("$HOME/x", "locale").unwrap(), "$HOME/x");
        assert_eq!(expand_env("es_PY", "locale").unwrap(), "es_PY");
    }
}
