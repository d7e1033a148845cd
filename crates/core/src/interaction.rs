use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

/// One verified inbound event from the platform. Immutable once decoded.
///
/// The interaction token is a bearer credential for the response channel and
/// is held in a [`SecretString`] so it never reaches logs or `Debug` output.
#[derive(Clone)]
pub struct Interaction {
    pub interaction_id: String,
    pub application_id: String,
    pub token: SecretString,
    pub kind: InteractionKind,
    pub command_name: Option<String>,
    pub actor_id: Option<String>,
    pub actor_display_name: Option<String>,
    pub channel_id: Option<String>,
    pub guild_id: Option<String>,
    /// Command-specific structured arguments, opaque to the dispatch core.
    pub payload: Value,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InteractionKind {
    /// Liveness probe; answered inline, never dispatched.
    Ping,
    Command,
    Other,
}

impl Interaction {
    pub fn is_ping(&self) -> bool {
        matches!(self.kind, InteractionKind::Ping)
    }

    pub fn delivery_target(&self) -> DeliveryTarget {
        DeliveryTarget {
            interaction_id: self.interaction_id.clone(),
            application_id: self.application_id.clone(),
            token: self.token.clone(),
        }
    }
}

impl fmt::Debug for Interaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interaction")
            .field("interaction_id", &self.interaction_id)
            .field("application_id", &self.application_id)
            .field("token", &"<redacted>")
            .field("kind", &self.kind)
            .field("command_name", &self.command_name)
            .field("actor_id", &self.actor_id)
            .field("actor_display_name", &self.actor_display_name)
            .field("channel_id", &self.channel_id)
            .field("guild_id", &self.guild_id)
            .finish_non_exhaustive()
    }
}

/// The coordinates of the single follow-up callback for an interaction.
#[derive(Clone)]
pub struct DeliveryTarget {
    pub interaction_id: String,
    pub application_id: String,
    pub token: SecretString,
}

impl DeliveryTarget {
    /// Exposes the token for URL construction only. Callers must not log the
    /// returned value.
    pub fn expose_token(&self) -> &str {
        self.token.expose_secret()
    }
}

impl fmt::Debug for DeliveryTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeliveryTarget")
            .field("interaction_id", &self.interaction_id)
            .field("application_id", &self.application_id)
            .field("token", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{Interaction, InteractionKind};

    fn interaction_fixture() -> Interaction {
        Interaction {
            interaction_id: "9001".to_string(),
            application_id: "1234567890".to_string(),
            token: "super-secret-callback-token".to_string().into(),
            kind: InteractionKind::Command,
            command_name: Some("hello".to_string()),
            actor_id: Some("U1".to_string()),
            actor_display_name: Some("tester".to_string()),
            channel_id: Some("C1".to_string()),
            guild_id: None,
            payload: json!({ "name": "hello" }),
        }
    }

    #[test]
    fn debug_output_redacts_the_interaction_token() {
        let interaction = interaction_fixture();
        let debug = format!("{interaction:?}");
        assert!(!debug.contains("super-secret-callback-token"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn delivery_target_carries_callback_coordinates() {
        let interaction = interaction_fixture();
        let target = interaction.delivery_target();
        assert_eq!(target.application_id, "1234567890");
        assert_eq!(target.expose_token(), "super-secret-callback-token");
        assert!(!format!("{target:?}").contains("super-secret-callback-token"));
    }
}
