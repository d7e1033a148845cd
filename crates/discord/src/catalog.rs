//! Bulk slash-command catalog sync.
//!
//! The platform's catalog is replaced wholesale per scope: either globally or
//! for a single guild. The registry is the source of truth; whatever it
//! holds is what the platform ends up advertising.

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tracing::info;

use crate::registry::CommandSchema;

/// `global` is a reserved scope key; anything else must be a guild snowflake.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CatalogScope {
    Global,
    Guild(String),
}

impl CatalogScope {
    pub fn parse(raw: &str) -> Result<Self, CatalogError> {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case("global") {
            return Ok(Self::Global);
        }
        if !trimmed.is_empty() && trimmed.bytes().all(|byte| byte.is_ascii_digit()) {
            return Ok(Self::Guild(trimmed.to_owned()));
        }
        Err(CatalogError::InvalidScope(raw.to_owned()))
    }
}

impl std::fmt::Display for CatalogScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Global => f.write_str("global"),
            Self::Guild(guild_id) => f.write_str(guild_id),
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("invalid catalog scope `{0}` (expected `global` or a numeric guild id)")]
    InvalidScope(String),
    #[error("catalog request failed: {0}")]
    Transport(String),
    #[error("catalog sync rejected with status {status}")]
    Rejected { status: u16 },
}

/// Pushes the full command list for a scope with a single bulk-replace call.
pub struct CatalogClient {
    client: reqwest::Client,
    api_base: String,
    application_id: String,
    bot_token: SecretString,
}

impl CatalogClient {
    pub fn new(
        client: reqwest::Client,
        api_base: impl Into<String>,
        application_id: impl Into<String>,
        bot_token: SecretString,
    ) -> Self {
        let api_base = api_base.into().trim_end_matches('/').to_owned();
        Self { client, api_base, application_id: application_id.into(), bot_token }
    }

    pub fn catalog_url(&self, scope: &CatalogScope) -> String {
        match scope {
            CatalogScope::Global => {
                format!("{}/applications/{}/commands", self.api_base, self.application_id)
            }
            CatalogScope::Guild(guild_id) => format!(
                "{}/applications/{}/guilds/{}/commands",
                self.api_base, self.application_id, guild_id
            ),
        }
    }

    pub async fn replace_commands(
        &self,
        scope: &CatalogScope,
        schemas: &[CommandSchema],
    ) -> Result<(), CatalogError> {
        let response = self
            .client
            .put(self.catalog_url(scope))
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Bot {}", self.bot_token.expose_secret()),
            )
            .json(&schemas)
            .send()
            .await
            .map_err(|error| CatalogError::Transport(error.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Rejected { status: status.as_u16() });
        }

        info!(
            event_name = "catalog.commands.replaced",
            scope = %scope,
            command_count = schemas.len(),
            "command catalog replaced"
        );
        Ok(())
    }
}
