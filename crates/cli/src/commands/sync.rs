use herald_core::config::{AppConfig, LoadOptions};
use herald_discord::catalog::{CatalogClient, CatalogScope};
use herald_discord::handlers::builtin_descriptors;
use herald_discord::registry::CommandRegistry;

use super::CommandResult;

const COMMAND: &str = "sync-commands";

pub fn run(scope: &str, dry_run: bool) -> CommandResult {
    let scope = match CatalogScope::parse(scope) {
        Ok(scope) => scope,
        Err(error) => return CommandResult::failure(COMMAND, "invalid_scope", error.to_string(), 2),
    };

    let registry = match CommandRegistry::from_descriptors(builtin_descriptors()) {
        Ok(registry) => registry,
        Err(error) => return CommandResult::failure(COMMAND, "registry", error.to_string(), 1),
    };
    let schemas = registry.schemas();
    let payload = match serde_json::to_string_pretty(&schemas) {
        Ok(payload) => payload,
        Err(error) => return CommandResult::failure(COMMAND, "serialization", error.to_string(), 1),
    };

    if dry_run {
        return CommandResult::success(
            COMMAND,
            format!(
                "dry run for scope `{scope}`: would replace the catalog with {} commands:\n{payload}",
                schemas.len()
            ),
        );
    }

    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return CommandResult::failure(COMMAND, "config", error.to_string(), 1),
    };
    let Some(bot_token) = config.discord.bot_token.clone() else {
        return CommandResult::failure(
            COMMAND,
            "missing_bot_token",
            "discord.bot_token is required to sync the catalog (set HERALD_DISCORD_BOT_TOKEN)",
            1,
        );
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "runtime",
                format!("failed to initialize async runtime: {error}"),
                1,
            );
        }
    };

    let result = runtime.block_on(async {
        let client = CatalogClient::new(
            reqwest::Client::new(),
            config.discord.api_base.clone(),
            config.discord.application_id.clone(),
            bot_token,
        );
        client.replace_commands(&scope, &schemas).await
    });

    match result {
        Ok(()) => CommandResult::success(
            COMMAND,
            format!("replaced catalog for scope `{scope}` with {} commands", schemas.len()),
        ),
        Err(error) => CommandResult::failure(COMMAND, "catalog_sync", error.to_string(), 1),
    }
}
