use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub discord: DiscordConfig,
    pub server: ServerConfig,
    pub dispatch: DispatchConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DiscordConfig {
    /// Hex-encoded Ed25519 public key Discord signs interaction requests with.
    pub public_key: String,
    pub application_id: String,
    /// Bot token; only required for command catalog sync, not for serving.
    pub bot_token: Option<SecretString>,
    pub api_base: String,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub health_check_port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct DispatchConfig {
    /// Capacity of the bounded channel between intake and the worker.
    pub queue_depth: usize,
    pub handler_timeout_secs: u64,
    /// Lifetime of an interaction token; work past this is discarded.
    pub token_ttl_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub discord_public_key: Option<String>,
    pub discord_application_id: Option<String>,
    pub discord_bot_token: Option<String>,
    pub discord_api_base: Option<String>,
    pub dispatch_queue_depth: Option<usize>,
    pub dispatch_handler_timeout_secs: Option<u64>,
    pub dispatch_token_ttl_secs: Option<u64>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            discord: DiscordConfig {
                public_key: String::new(),
                application_id: String::new(),
                bot_token: None,
                api_base: "https://discord.com/api/v10".to_string(),
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8090,
                health_check_port: 8080,
                graceful_shutdown_secs: 15,
            },
            dispatch: DispatchConfig {
                queue_depth: 256,
                handler_timeout_secs: 30,
                token_ttl_secs: 900,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("herald.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(discord) = patch.discord {
            if let Some(public_key_value) = discord.public_key {
                self.discord.public_key = public_key_value;
            }
            if let Some(application_id) = discord.application_id {
                self.discord.application_id = application_id;
            }
            if let Some(bot_token_value) = discord.bot_token {
                self.discord.bot_token = Some(secret_value(bot_token_value));
            }
            if let Some(api_base) = discord.api_base {
                self.discord.api_base = api_base;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(health_check_port) = server.health_check_port {
                self.server.health_check_port = health_check_port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(dispatch) = patch.dispatch {
            if let Some(queue_depth) = dispatch.queue_depth {
                self.dispatch.queue_depth = queue_depth;
            }
            if let Some(handler_timeout_secs) = dispatch.handler_timeout_secs {
                self.dispatch.handler_timeout_secs = handler_timeout_secs;
            }
            if let Some(token_ttl_secs) = dispatch.token_ttl_secs {
                self.dispatch.token_ttl_secs = token_ttl_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("HERALD_DISCORD_PUBLIC_KEY") {
            self.discord.public_key = value;
        }
        if let Some(value) = read_env("HERALD_DISCORD_APPLICATION_ID") {
            self.discord.application_id = value;
        }
        if let Some(value) = read_env("HERALD_DISCORD_BOT_TOKEN") {
            self.discord.bot_token = Some(secret_value(value));
        }
        if let Some(value) = read_env("HERALD_DISCORD_API_BASE") {
            self.discord.api_base = value;
        }

        if let Some(value) = read_env("HERALD_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("HERALD_SERVER_PORT") {
            self.server.port = parse_u16("HERALD_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("HERALD_SERVER_HEALTH_CHECK_PORT") {
            self.server.health_check_port = parse_u16("HERALD_SERVER_HEALTH_CHECK_PORT", &value)?;
        }
        if let Some(value) = read_env("HERALD_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("HERALD_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        if let Some(value) = read_env("HERALD_DISPATCH_QUEUE_DEPTH") {
            self.dispatch.queue_depth = parse_usize("HERALD_DISPATCH_QUEUE_DEPTH", &value)?;
        }
        if let Some(value) = read_env("HERALD_DISPATCH_HANDLER_TIMEOUT_SECS") {
            self.dispatch.handler_timeout_secs =
                parse_u64("HERALD_DISPATCH_HANDLER_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("HERALD_DISPATCH_TOKEN_TTL_SECS") {
            self.dispatch.token_ttl_secs = parse_u64("HERALD_DISPATCH_TOKEN_TTL_SECS", &value)?;
        }

        let log_level = read_env("HERALD_LOGGING_LEVEL").or_else(|| read_env("HERALD_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("HERALD_LOGGING_FORMAT").or_else(|| read_env("HERALD_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(public_key) = overrides.discord_public_key {
            self.discord.public_key = public_key;
        }
        if let Some(application_id) = overrides.discord_application_id {
            self.discord.application_id = application_id;
        }
        if let Some(bot_token) = overrides.discord_bot_token {
            self.discord.bot_token = Some(secret_value(bot_token));
        }
        if let Some(api_base) = overrides.discord_api_base {
            self.discord.api_base = api_base;
        }
        if let Some(queue_depth) = overrides.dispatch_queue_depth {
            self.dispatch.queue_depth = queue_depth;
        }
        if let Some(handler_timeout_secs) = overrides.dispatch_handler_timeout_secs {
            self.dispatch.handler_timeout_secs = handler_timeout_secs;
        }
        if let Some(token_ttl_secs) = overrides.dispatch_token_ttl_secs {
            self.dispatch.token_ttl_secs = token_ttl_secs;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_discord(&self.discord)?;
        validate_server(&self.server)?;
        validate_dispatch(&self.dispatch)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("herald.toml"), PathBuf::from("config/herald.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_discord(discord: &DiscordConfig) -> Result<(), ConfigError> {
    let public_key = discord.public_key.trim();
    if public_key.is_empty() {
        return Err(ConfigError::Validation(
            "discord.public_key is required. Copy it from the Discord developer portal > Your App > General Information".to_string()
        ));
    }
    match hex::decode(public_key) {
        Ok(bytes) if bytes.len() == 32 => {}
        Ok(bytes) => {
            return Err(ConfigError::Validation(format!(
                "discord.public_key must decode to 32 bytes, got {}",
                bytes.len()
            )));
        }
        Err(_) => {
            return Err(ConfigError::Validation(
                "discord.public_key must be a hex-encoded Ed25519 public key".to_string(),
            ));
        }
    }

    let application_id = discord.application_id.trim();
    if application_id.is_empty() {
        return Err(ConfigError::Validation(
            "discord.application_id is required. Copy it from the Discord developer portal > Your App > General Information".to_string()
        ));
    }
    if !application_id.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(ConfigError::Validation(
            "discord.application_id must be a numeric snowflake".to_string(),
        ));
    }

    if let Some(bot_token) = &discord.bot_token {
        if bot_token.expose_secret().trim().is_empty() {
            return Err(ConfigError::Validation(
                "discord.bot_token must not be empty when set".to_string(),
            ));
        }
    }

    if !discord.api_base.starts_with("http://") && !discord.api_base.starts_with("https://") {
        return Err(ConfigError::Validation(
            "discord.api_base must start with http:// or https://".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.health_check_port == 0 {
        return Err(ConfigError::Validation(
            "server.health_check_port must be greater than zero".to_string(),
        ));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_dispatch(dispatch: &DispatchConfig) -> Result<(), ConfigError> {
    if dispatch.queue_depth == 0 || dispatch.queue_depth > 10_000 {
        return Err(ConfigError::Validation(
            "dispatch.queue_depth must be in range 1..=10000".to_string(),
        ));
    }

    if dispatch.handler_timeout_secs == 0 || dispatch.handler_timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "dispatch.handler_timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if dispatch.token_ttl_secs < dispatch.handler_timeout_secs || dispatch.token_ttl_secs > 3_600 {
        return Err(ConfigError::Validation(
            "dispatch.token_ttl_secs must be at least handler_timeout_secs and at most 3600"
                .to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    discord: Option<DiscordPatch>,
    server: Option<ServerPatch>,
    dispatch: Option<DispatchPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DiscordPatch {
    public_key: Option<String>,
    application_id: Option<String>,
    bot_token: Option<String>,
    api_base: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    health_check_port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct DispatchPatch {
    queue_depth: Option<usize>,
    handler_timeout_secs: Option<u64>,
    token_ttl_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    const TEST_PUBLIC_KEY: &str =
        "0f03352cd555fa8c5e53a131ba16331d804eac4a49ef5d9b1bc54b2d08a2ae4b";

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_HERALD_PUBLIC_KEY", TEST_PUBLIC_KEY);
        env::set_var("TEST_HERALD_APPLICATION_ID", "1234567890");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("herald.toml");
            fs::write(
                &path,
                r#"
[discord]
public_key = "${TEST_HERALD_PUBLIC_KEY}"
application_id = "${TEST_HERALD_APPLICATION_ID}"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.discord.public_key == TEST_PUBLIC_KEY,
                "public key should be loaded from environment",
            )?;
            ensure(
                config.discord.application_id == "1234567890",
                "application id should be loaded from environment",
            )?;
            Ok(())
        })();

        clear_vars(&["TEST_HERALD_PUBLIC_KEY", "TEST_HERALD_APPLICATION_ID"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("HERALD_DISCORD_PUBLIC_KEY", TEST_PUBLIC_KEY);
        env::set_var("HERALD_DISCORD_APPLICATION_ID", "42424242");
        env::set_var("HERALD_DISPATCH_QUEUE_DEPTH", "64");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("herald.toml");
            fs::write(
                &path,
                r#"
[discord]
application_id = "11111111"

[dispatch]
queue_depth = 16

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.discord.application_id == "42424242",
                "env application id should win over file",
            )?;
            ensure(config.dispatch.queue_depth == 64, "env queue depth should win over file")?;
            ensure(config.logging.level == "debug", "override log level should win over env")?;
            Ok(())
        })();

        clear_vars(&[
            "HERALD_DISCORD_PUBLIC_KEY",
            "HERALD_DISCORD_APPLICATION_ID",
            "HERALD_DISPATCH_QUEUE_DEPTH",
        ]);
        result
    }

    #[test]
    fn validation_rejects_non_hex_public_key() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let error = match AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                discord_public_key: Some("not-hex".to_string()),
                discord_application_id: Some("1234567890".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }) {
            Ok(_) => return Err("expected validation failure".to_string()),
            Err(error) => error,
        };

        let mentions_key = matches!(
            error,
            ConfigError::Validation(ref message) if message.contains("discord.public_key")
        );
        ensure(mentions_key, "validation failure should mention discord.public_key")
    }

    #[test]
    fn validation_rejects_short_public_key() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let result = AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                discord_public_key: Some("0f03352c".to_string()),
                discord_application_id: Some("1234567890".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        });

        ensure(result.is_err(), "a 4-byte key must fail validation")
    }

    #[test]
    fn validation_rejects_token_ttl_below_handler_timeout() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let result = AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                discord_public_key: Some(TEST_PUBLIC_KEY.to_string()),
                discord_application_id: Some("1234567890".to_string()),
                dispatch_handler_timeout_secs: Some(60),
                dispatch_token_ttl_secs: Some(30),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        });

        ensure(result.is_err(), "token ttl below handler timeout must fail validation")
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                discord_public_key: Some(TEST_PUBLIC_KEY.to_string()),
                discord_application_id: Some("1234567890".to_string()),
                discord_bot_token: Some("bot-secret-value".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .map_err(|err| format!("config load failed: {err}"))?;

        let debug = format!("{config:?}");
        ensure(!debug.contains("bot-secret-value"), "debug output should not contain bot token")?;
        ensure(
            matches!(config.logging.format, LogFormat::Compact),
            "default logging format should be compact",
        )
    }
}
