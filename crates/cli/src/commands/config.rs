use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use herald_core::config::{AppConfig, LoadOptions};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    lines.push(render_line(
        "discord.public_key",
        &config.discord.public_key,
        field_source(
            "discord.public_key",
            Some("HERALD_DISCORD_PUBLIC_KEY"),
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        ),
    ));
    lines.push(render_line(
        "discord.application_id",
        &config.discord.application_id,
        field_source(
            "discord.application_id",
            Some("HERALD_DISCORD_APPLICATION_ID"),
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        ),
    ));

    // The bot token is the one real credential here; its value never renders.
    let bot_token = if config.discord.bot_token.is_some() { "<redacted>" } else { "<unset>" };
    lines.push(render_line(
        "discord.bot_token",
        bot_token,
        field_source(
            "discord.bot_token",
            Some("HERALD_DISCORD_BOT_TOKEN"),
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        ),
    ));
    lines.push(render_line(
        "discord.api_base",
        &config.discord.api_base,
        field_source(
            "discord.api_base",
            Some("HERALD_DISCORD_API_BASE"),
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        ),
    ));

    lines.push(render_line(
        "server.bind_address",
        &config.server.bind_address,
        field_source(
            "server.bind_address",
            Some("HERALD_SERVER_BIND_ADDRESS"),
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        ),
    ));
    lines.push(render_line(
        "server.port",
        &config.server.port.to_string(),
        field_source(
            "server.port",
            Some("HERALD_SERVER_PORT"),
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        ),
    ));
    lines.push(render_line(
        "server.health_check_port",
        &config.server.health_check_port.to_string(),
        field_source(
            "server.health_check_port",
            Some("HERALD_SERVER_HEALTH_CHECK_PORT"),
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        ),
    ));

    lines.push(render_line(
        "dispatch.queue_depth",
        &config.dispatch.queue_depth.to_string(),
        field_source(
            "dispatch.queue_depth",
            Some("HERALD_DISPATCH_QUEUE_DEPTH"),
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        ),
    ));
    lines.push(render_line(
        "dispatch.handler_timeout_secs",
        &config.dispatch.handler_timeout_secs.to_string(),
        field_source(
            "dispatch.handler_timeout_secs",
            Some("HERALD_DISPATCH_HANDLER_TIMEOUT_SECS"),
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        ),
    ));
    lines.push(render_line(
        "dispatch.token_ttl_secs",
        &config.dispatch.token_ttl_secs.to_string(),
        field_source(
            "dispatch.token_ttl_secs",
            Some("HERALD_DISPATCH_TOKEN_TTL_SECS"),
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        ),
    ));

    lines.push(render_line(
        "logging.level",
        &config.logging.level,
        field_source(
            "logging.level",
            Some("HERALD_LOGGING_LEVEL"),
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        ),
    ));
    lines.push(render_line(
        "logging.format",
        &format!("{:?}", config.logging.format),
        field_source(
            "logging.format",
            Some("HERALD_LOGGING_FORMAT"),
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        ),
    ));

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from("herald.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/herald.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: Option<&str>,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_key {
        if env::var_os(env_key).is_some() {
            return format!("env ({env_key})");
        }
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

#[cfg(test)]
mod tests {
    use super::contains_path;

    #[test]
    fn contains_path_walks_nested_tables() {
        let doc: toml::Value = "[discord]\npublic_key = \"abc\"".parse().expect("toml parses");
        assert!(contains_path(&doc, "discord.public_key"));
        assert!(!contains_path(&doc, "discord.bot_token"));
        assert!(!contains_path(&doc, "dispatch.queue_depth"));
    }
}
