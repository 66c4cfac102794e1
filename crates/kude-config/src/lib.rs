//! Configuration management for KUDE rendering.
//!
//! Parses `kude.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Strategy selection
//!
//! The presence of an `[external]` section selects the external renderer.
//! Without it (or with [`CliSettings::native`] set) the native renderer is used.
//!
//! ## Environment Variable Expansion
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `locale`
//! - `external.executable`
//! - `external.class_path`
//! - `external.jar`
//! - `external.template_dir`
//! - `external.work_dir`

mod expand;

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override the external template root. Enables the external strategy
    /// with default command settings when no `[external]` section exists.
    pub template_dir: Option<PathBuf>,
    /// Force the native renderer.
    pub native: Option<bool>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "kude.toml";

const DEFAULT_EXECUTABLE: &str = "java";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Report locale, sent as `REPORT_LOCALE`.
    pub locale: String,
    /// Native renderer settings.
    pub native: NativeConfig,
    /// External renderer section (paths are relative strings from TOML).
    external: Option<ExternalConfigRaw>,
    /// Result synchronization settings.
    pub sync: SyncConfig,

    /// Resolved external configuration (set after loading).
    /// `None` selects the native renderer.
    #[serde(skip)]
    pub external_resolved: Option<ExternalConfig>,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            locale: "es_PY".to_owned(),
            native: NativeConfig::default(),
            external: None,
            sync: SyncConfig::default(),
            external_resolved: None,
            config_path: None,
        }
    }
}

/// Native renderer configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct NativeConfig {
    /// Dump the merged parameters at the end of the report.
    pub include_parameters: bool,
}

impl Default for NativeConfig {
    fn default() -> Self {
        Self {
            include_parameters: true,
        }
    }
}

/// Raw external configuration as parsed from TOML (paths as strings).
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ExternalConfigRaw {
    executable: Option<String>,
    jvm_args: Vec<String>,
    class_path: Option<String>,
    jar: Option<String>,
    template_dir: Option<String>,
    work_dir: Option<String>,
    timeout_secs: Option<u64>,
}

/// Resolved external renderer configuration with absolute paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalConfig {
    /// Renderer executable. Bare names are looked up on `PATH`.
    pub executable: PathBuf,
    /// Arguments placed before `-classpath`/`-jar`.
    pub jvm_args: Vec<String>,
    /// Class path passed with `-classpath`.
    pub class_path: Option<PathBuf>,
    /// Jar passed with `-jar`.
    pub jar: Option<PathBuf>,
    /// Template root.
    pub template_dir: PathBuf,
    /// Parent of temporary workspaces. `None` uses the OS temp dir.
    pub work_dir: Option<PathBuf>,
    /// Hard timeout for one renderer run.
    pub timeout: Duration,
}

impl ExternalConfig {
    /// Defaults for a template root with no `[external]` section.
    #[must_use]
    pub fn with_template_dir(template_dir: PathBuf) -> Self {
        Self {
            executable: PathBuf::from(DEFAULT_EXECUTABLE),
            jvm_args: Vec::new(),
            class_path: None,
            jar: None,
            template_dir,
            work_dir: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Result synchronization configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Number of output directory listings before giving up.
    pub attempts: u32,
    /// Delay before the first listing, in milliseconds.
    pub initial_delay_ms: u64,
    /// Delay between listings, in milliseconds.
    pub retry_delay_ms: u64,
    /// Artifact extension without the leading dot.
    pub extension: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            attempts: 3,
            initial_delay_ms: 500,
            retry_delay_ms: 1000,
            extension: "pdf".to_owned(),
        }
    }
}

impl SyncConfig {
    /// Delay before the first listing.
    #[must_use]
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    /// Delay between listings.
    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`external.jar`").
        field: String,
        /// Error message (e.g., "${`KUDE_HOME`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `kude.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values. The result is
    /// validated again once they are applied.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails or
    /// the result is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = std::env::current_dir()
            .ok()
            .and_then(|cwd| Self::discover_config(&cwd))
        {
            Self::load_from_file(&discovered)?
        } else {
            Self::default()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    /// Whether rendering goes through the external renderer.
    #[must_use]
    pub fn uses_external(&self) -> bool {
        self.external_resolved.is_some()
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(template_dir) = &settings.template_dir {
            match &mut self.external_resolved {
                Some(external) => external.template_dir.clone_from(template_dir),
                None => {
                    self.external_resolved =
                        Some(ExternalConfig::with_template_dir(template_dir.clone()));
                }
            }
        }
        if settings.native == Some(true) {
            self.external_resolved = None;
        }
    }

    /// Search for config file in `start` and its parents.
    fn discover_config(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir)?;
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.locale, "locale")?;
        self.validate_sync()?;
        if let Some(external) = &self.external_resolved {
            require_non_empty(&external.executable.to_string_lossy(), "external.executable")?;
            require_non_empty(
                &external.template_dir.to_string_lossy(),
                "external.template_dir",
            )?;
            if external.timeout.is_zero() {
                return Err(ConfigError::Validation(
                    "external.timeout_secs must be greater than 0".to_owned(),
                ));
            }
        }
        Ok(())
    }

    fn validate_sync(&self) -> Result<(), ConfigError> {
        if self.sync.attempts == 0 {
            return Err(ConfigError::Validation(
                "sync.attempts must be greater than 0".to_owned(),
            ));
        }
        require_non_empty(&self.sync.extension, "sync.extension")?;
        if self.sync.extension.starts_with('.') {
            return Err(ConfigError::Validation(
                "sync.extension must not start with a dot".to_owned(),
            ));
        }
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.locale = expand::expand_env(&self.locale, "locale")?;

        if let Some(ref mut external) = self.external {
            let expand_opt = |value: &mut Option<String>, field: &str| -> Result<(), ConfigError> {
                if let Some(v) = value.as_deref() {
                    *value = Some(expand::expand_env(v, field)?);
                }
                Ok(())
            };
            expand_opt(&mut external.executable, "external.executable")?;
            expand_opt(&mut external.class_path, "external.class_path")?;
            expand_opt(&mut external.jar, "external.jar")?;
            expand_opt(&mut external.template_dir, "external.template_dir")?;
            expand_opt(&mut external.work_dir, "external.work_dir")?;
        }

        Ok(())
    }

    /// Resolve relative paths to absolute paths based on config directory.
    ///
    /// Validates that `template_dir` is provided when `[external]` section exists.
    fn resolve_paths(&mut self, config_dir: &Path) -> Result<(), ConfigError> {
        let Some(external) = &self.external else {
            self.external_resolved = None;
            return Ok(());
        };

        let template_dir = external.template_dir.as_deref().ok_or_else(|| {
            ConfigError::Validation("[external] section requires template_dir to be set".to_owned())
        })?;
        let executable = external.executable.as_deref().unwrap_or(DEFAULT_EXECUTABLE);
        // Bare command names stay relative so they resolve through PATH.
        let executable = if Path::new(executable).components().count() > 1 {
            config_dir.join(executable)
        } else {
            PathBuf::from(executable)
        };

        self.external_resolved = Some(ExternalConfig {
            executable,
            jvm_args: external.jvm_args.clone(),
            class_path: external.class_path.as_deref().map(|p| config_dir.join(p)),
            jar: external.jar.as_deref().map(|p| config_dir.join(p)),
            template_dir: config_dir.join(template_dir),
            work_dir: external.work_dir.as_deref().map(|p| config_dir.join(p)),
            timeout: Duration::from_secs(external.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
        });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.locale, "es_PY");
        assert!(config.native.include_parameters);
        assert!(!config.uses_external());
        assert_eq!(config.sync.attempts, 3);
        assert_eq!(config.sync.initial_delay(), Duration::from_millis(500));
        assert_eq!(config.sync.retry_delay(), Duration::from_millis(1000));
        assert_eq!(config.sync.extension, "pdf");
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.locale, "es_PY");
        assert!(config.external.is_none());
    }

    #[test]
    fn test_parse_native_and_sync() {
        let toml = r#"
locale = "en_US"

[native]
include_parameters = false

[sync]
attempts = 5
retry_delay_ms = 250
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.locale, "en_US");
        assert!(!config.native.include_parameters);
        assert_eq!(config.sync.attempts, 5);
        assert_eq!(config.sync.initial_delay_ms, 500);
        assert_eq!(config.sync.retry_delay(), Duration::from_millis(250));
    }

    #[test]
    fn test_resolve_paths() {
        let toml = r#"
[external]
executable = "bin/java"
jvm_args = ["-Dfile.encoding=IBM850"]
class_path = "lib/jasperLibs/"
jar = "lib/CreateKude.jar"
template_dir = "templates"
work_dir = "/var/tmp/kude"
timeout_secs = 30
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.resolve_paths(Path::new("/project")).unwrap();

        assert_eq!(
            config.external_resolved,
            Some(ExternalConfig {
                executable: PathBuf::from("/project/bin/java"),
                jvm_args: vec!["-Dfile.encoding=IBM850".to_owned()],
                class_path: Some(PathBuf::from("/project/lib/jasperLibs/")),
                jar: Some(PathBuf::from("/project/lib/CreateKude.jar")),
                template_dir: PathBuf::from("/project/templates"),
                work_dir: Some(PathBuf::from("/var/tmp/kude")),
                timeout: Duration::from_secs(30),
            })
        );
    }

    #[test]
    fn test_resolve_paths_bare_executable_uses_path_lookup() {
        let toml = r#"
[external]
template_dir = "/opt/templates"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.resolve_paths(Path::new("/project")).unwrap();

        let external = config.external_resolved.unwrap();
        assert_eq!(external.executable, PathBuf::from("java"));
        assert_eq!(external.template_dir, PathBuf::from("/opt/templates"));
        assert_eq!(external.timeout, Duration::from_secs(120));
        assert_eq!(external.work_dir, None);
    }

    #[test]
    fn test_external_section_requires_template_dir() {
        let toml = r#"
[external]
executable = "java"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        let err = config.resolve_paths(Path::new("/project")).unwrap_err();

        assert!(
            matches!(err, ConfigError::Validation(_)),
            "Expected ConfigError::Validation, got {err:?}"
        );
        assert!(err.to_string().contains("template_dir"));
    }

    #[test]
    fn test_apply_cli_settings_template_dir_enables_external() {
        let mut config = Config::default();
        config.apply_cli_settings(&CliSettings {
            template_dir: Some(PathBuf::from("/custom/templates")),
            ..Default::default()
        });

        let external = config.external_resolved.as_ref().unwrap();
        assert_eq!(external.template_dir, PathBuf::from("/custom/templates"));
        assert_eq!(external.executable, PathBuf::from("java"));
    }

    #[test]
    fn test_apply_cli_settings_template_dir_keeps_command() {
        let toml = r#"
[external]
executable = "/usr/bin/java"
template_dir = "templates"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.resolve_paths(Path::new("/project")).unwrap();
        config.apply_cli_settings(&CliSettings {
            template_dir: Some(PathBuf::from("/other")),
            ..Default::default()
        });

        let external = config.external_resolved.unwrap();
        assert_eq!(external.executable, PathBuf::from("/usr/bin/java"));
        assert_eq!(external.template_dir, PathBuf::from("/other"));
    }

    #[test]
    fn test_apply_cli_settings_native_wins() {
        let mut config = Config::default();
        config.apply_cli_settings(&CliSettings {
            template_dir: Some(PathBuf::from("/custom/templates")),
            native: Some(true),
        });
        assert!(!config.uses_external());
    }

    #[test]
    fn test_apply_cli_settings_empty() {
        let mut config = Config::default();
        config.apply_cli_settings(&CliSettings::default());
        assert!(!config.uses_external());
    }

    #[test]
    fn test_expand_env_vars_external() {
        // SAFETY: variable name is unique to this test
        unsafe {
            std::env::set_var("KUDE_TEST_CONFIG_HOME", "/opt/kude");
        }

        let toml = r#"
[external]
jar = "${KUDE_TEST_CONFIG_HOME}/CreateKude.jar"
template_dir = "${KUDE_TEST_CONFIG_TEMPLATES:-templates}"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.expand_env_vars().unwrap();
        config.resolve_paths(Path::new("/project")).unwrap();

        let external = config.external_resolved.unwrap();
        assert_eq!(external.jar, Some(PathBuf::from("/opt/kude/CreateKude.jar")));
        assert_eq!(external.template_dir, PathBuf::from("/project/templates"));

        unsafe {
            std::env::remove_var("KUDE_TEST_CONFIG_HOME");
        }
    }

    #[test]
    fn test_expand_env_vars_missing_required_var() {
        // SAFETY: variable name is unique to this test
        unsafe {
            std::env::remove_var("KUDE_TEST_CONFIG_MISSING");
        }

        let toml = r#"
[external]
template_dir = "${KUDE_TEST_CONFIG_MISSING}"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        let err = config.expand_env_vars().unwrap_err();

        assert!(matches!(err, ConfigError::EnvVar { .. }));
        assert!(err.to_string().contains("external.template_dir"));
    }

    /// Assert that validation fails with expected substrings in the error message.
    fn assert_validation_error(config: &Config, expected_substrings: &[&str]) {
        let err = config.validate().unwrap_err();
        assert!(
            matches!(err, ConfigError::Validation(_)),
            "Expected ConfigError::Validation, got {err:?}"
        );
        let msg = err.to_string();
        for s in expected_substrings {
            assert!(msg.contains(s), "Expected error to contain '{s}', got: {msg}");
        }
    }

    #[test]
    fn test_validate_default_config_passes() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_locale_empty() {
        let config = Config {
            locale: String::new(),
            ..Config::default()
        };
        assert_validation_error(&config, &["locale", "empty"]);
    }

    #[test]
    fn test_validate_attempts_zero() {
        let mut config = Config::default();
        config.sync.attempts = 0;
        assert_validation_error(&config, &["sync.attempts"]);
    }

    #[test]
    fn test_validate_extension() {
        let mut config = Config::default();
        config.sync.extension = ".pdf".to_owned();
        assert_validation_error(&config, &["sync.extension", "dot"]);

        config.sync.extension = String::new();
        assert_validation_error(&config, &["sync.extension", "empty"]);
    }

    #[test]
    fn test_validate_external_timeout_zero() {
        let mut external = ExternalConfig::with_template_dir(PathBuf::from("/t"));
        external.timeout = Duration::ZERO;
        let config = Config {
            external_resolved: Some(external),
            ..Config::default()
        };
        assert_validation_error(&config, &["external.timeout_secs"]);
    }

    #[test]
    fn test_validate_external_executable_empty() {
        let mut external = ExternalConfig::with_template_dir(PathBuf::from("/t"));
        external.executable = PathBuf::new();
        let config = Config {
            external_resolved: Some(external),
            ..Config::default()
        };
        assert_validation_error(&config, &["external.executable"]);
    }

    #[test]
    fn test_load_explicit_path_not_found() {
        let tmp = TempDir::new().unwrap();
        let err = Config::load(Some(&tmp.path().join("kude.toml")), None).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_load_from_file_resolves_against_config_dir() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("kude.toml");
        std::fs::write(&path, "[external]\ntemplate_dir = \"templates\"\n").unwrap();

        let config = Config::load(Some(&path), None).unwrap();

        assert_eq!(config.config_path, Some(path));
        assert_eq!(
            config.external_resolved.unwrap().template_dir,
            tmp.path().join("templates")
        );
    }

    #[test]
    fn test_load_validates_cli_template_dir() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("kude.toml");
        std::fs::write(&path, "").unwrap();

        let err = Config::load(
            Some(&path),
            Some(&CliSettings {
                template_dir: Some(PathBuf::new()),
                ..Default::default()
            }),
        )
        .unwrap_err();

        assert!(
            matches!(err, ConfigError::Validation(ref msg) if msg.contains("external.template_dir")),
            "unexpected error: {err:?}"
        );
    }

    #[test]
    fn test_load_applies_valid_cli_template_dir() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("kude.toml");
        std::fs::write(&path, "").unwrap();

        let config = Config::load(
            Some(&path),
            Some(&CliSettings {
                template_dir: Some(tmp.path().join("templates")),
                ..Default::default()
            }),
        )
        .unwrap();

        assert!(config.uses_external());
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("kude.toml");
        std::fs::write(&path, "[sync]\nattempts = 0\n").unwrap();

        let err = Config::load(Some(&path), None).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_discover_config_in_parent() {
        let tmp = TempDir::new().unwrap();
        let nested = tmp.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(tmp.path().join("kude.toml"), "").unwrap();

        assert_eq!(
            Config::discover_config(&nested),
            Some(tmp.path().join("kude.toml"))
        );
    }
}
