use std::path::{Path, PathBuf};
use std::time::Duration;

use derive_setters::Setters;
use serde::{Deserialize, Serialize};

pub use config::ConfigError;

/// Runtime settings shared by the bridge, the host dispatcher and the shell
/// runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Setters)]
#[serde(rename_all = "snake_case")]
#[setters(into, strip_option)]
pub struct BridgeConfig {
    /// Deadline for an awaited request. Unset means callers wait until the
    /// result arrives, however long that takes.
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,

    /// Deadline for a single command on the host. The child is killed when
    /// it expires.
    #[serde(default)]
    pub command_timeout_ms: Option<u64>,

    /// Shell used to interpret command lines. Defaults to `sh` on Unix and
    /// `cmd` on Windows.
    #[serde(default)]
    pub shell: Option<String>,

    /// Working directory for host commands
    #[serde(default)]
    pub cwd: Option<PathBuf>,

    /// Extra environment variables for host commands, as `KEY=VALUE`
    #[serde(default)]
    pub env: Vec<String>,

    /// Capacity of the host notification broadcast
    pub notification_buffer: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: None,
            command_timeout_ms: None,
            shell: None,
            cwd: None,
            env: Vec::new(),
            notification_buffer: 64,
        }
    }
}

impl BridgeConfig {
    /// Loads the configuration from, in increasing order of precedence:
    /// 1. the embedded `defaults.json`
    /// 2. `<config dir>/cmdbridge/config.json` if it exists
    /// 3. environment variables prefixed with `CMDBRIDGE_`, using `__` as
    ///    the nesting separator (e.g. `CMDBRIDGE_REQUEST_TIMEOUT_MS`).
    ///    `CMDBRIDGE_ENV` takes a comma separated `KEY=VALUE` list.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(Self::user_config_path().as_deref())
    }

    /// Same as [`BridgeConfig::from_env`] with an explicit user file.
    pub fn load(user_file: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(user_file, None)
    }

    /// `env_vars` replaces the process environment when set.
    fn load_with_env(
        user_file: Option<&Path>,
        env_vars: Option<config::Map<String, String>>,
    ) -> Result<Self, ConfigError> {
        const DEFAULT_CONFIG: &str = include_str!("../defaults.json");

        let mut builder = config::Config::builder().add_source(config::File::from_str(
            DEFAULT_CONFIG,
            config::FileFormat::Json,
        ));

        if let Some(path) = user_file {
            tracing::debug!(path = %path.display(), "Reading user configuration");
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Json)
                    .required(false),
            );
        }

        builder
            .add_source(
                config::Environment::with_prefix("CMDBRIDGE")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("env")
                    .try_parsing(true)
                    .source(env_vars),
            )
            .build()?
            .try_deserialize()
    }

    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("cmdbridge").join("config.json"))
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    pub fn command_timeout(&self) -> Option<Duration> {
        self.command_timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_embedded_defaults() {
        let missing = Path::new("/nonexistent/cmdbridge/config.json");

        let actual = BridgeConfig::load(Some(missing)).unwrap();

        assert_eq!(actual.notification_buffer, 64);
        assert_eq!(actual.request_timeout(), None);
        assert!(actual.env.is_empty());
    }

    #[test]
    fn test_user_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{"request_timeout_ms": 1500, "shell": "bash", "env": ["SF_LOG_LEVEL=debug"]}}"#
        )
        .unwrap();

        let actual = BridgeConfig::load(Some(file.path())).unwrap();

        assert_eq!(actual.request_timeout(), Some(Duration::from_millis(1500)));
        assert_eq!(actual.shell.as_deref(), Some("bash"));
        assert_eq!(actual.env, vec!["SF_LOG_LEVEL=debug".to_string()]);
        assert_eq!(actual.notification_buffer, 64);
    }

    #[test]
    fn test_environment_overrides_user_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"request_timeout_ms": 1500, "shell": "bash"}}"#).unwrap();
        let fixture = [
            ("CMDBRIDGE_REQUEST_TIMEOUT_MS", "1234"),
            ("CMDBRIDGE_COMMAND_TIMEOUT_MS", "50"),
            ("CMDBRIDGE_ENV", "FOO=bar,SF_LOG_LEVEL=debug"),
            ("OTHER_REQUEST_TIMEOUT_MS", "9"),
        ]
        .into_iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();

        let actual = BridgeConfig::load_with_env(Some(file.path()), Some(fixture)).unwrap();

        assert_eq!(actual.request_timeout(), Some(Duration::from_millis(1234)));
        assert_eq!(actual.command_timeout(), Some(Duration::from_millis(50)));
        assert_eq!(actual.shell.as_deref(), Some("bash"));
        assert_eq!(
            actual.env,
            vec!["FOO=bar".to_string(), "SF_LOG_LEVEL=debug".to_string()]
        );
    }

    #[test]
    fn test_setters() {
        let actual = BridgeConfig::default()
            .command_timeout_ms(250u64)
            .cwd(PathBuf::from("/tmp"));

        assert_eq!(actual.command_timeout(), Some(Duration::from_millis(250)));
        assert_eq!(actual.cwd, Some(PathBuf::from("/tmp")));
    }
}
