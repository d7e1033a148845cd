use herald_core::{IngressError, Interaction, InteractionKind};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Wire value Discord uses for a liveness ping.
const INTERACTION_TYPE_PING: u8 = 1;
/// Wire value for a slash-command invocation.
const INTERACTION_TYPE_APPLICATION_COMMAND: u8 = 2;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("interaction body is not valid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("interaction is missing required field `{0}`")]
    MissingField(&'static str),
}

impl From<DecodeError> for IngressError {
    fn from(error: DecodeError) -> Self {
        Self::Malformed(error.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct WireInteraction {
    #[serde(rename = "type")]
    kind: u8,
    #[serde(default)]
    id: String,
    #[serde(default)]
    application_id: String,
    #[serde(default)]
    token: String,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    member: Option<WireMember>,
    #[serde(default)]
    user: Option<WireUser>,
    #[serde(default)]
    channel_id: Option<String>,
    #[serde(default)]
    guild_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireMember {
    user: Option<WireUser>,
}

#[derive(Debug, Deserialize)]
struct WireUser {
    #[serde(default)]
    id: String,
    #[serde(default)]
    username: String,
    #[serde(default)]
    global_name: Option<String>,
}

/// Parses a verified raw payload into an [`Interaction`].
///
/// Must only be called after signature verification has succeeded; the bytes
/// are trusted to come from the platform at this point. Ping payloads may be
/// minimal, but command invocations must carry the routing fields needed for
/// dispatch and response delivery.
pub fn decode(raw_body: &[u8]) -> Result<Interaction, DecodeError> {
    let wire: WireInteraction = serde_json::from_slice(raw_body)?;

    let kind = match wire.kind {
        INTERACTION_TYPE_PING => InteractionKind::Ping,
        INTERACTION_TYPE_APPLICATION_COMMAND => InteractionKind::Command,
        _ => InteractionKind::Other,
    };

    let command_name =
        wire.data.get("name").and_then(Value::as_str).map(str::to_owned).filter(|n| !n.is_empty());

    if kind == InteractionKind::Command {
        if wire.id.is_empty() {
            return Err(DecodeError::MissingField("id"));
        }
        if wire.application_id.is_empty() {
            return Err(DecodeError::MissingField("application_id"));
        }
        if wire.token.is_empty() {
            return Err(DecodeError::MissingField("token"));
        }
        if command_name.is_none() {
            return Err(DecodeError::MissingField("data.name"));
        }
    }

    let actor = wire.member.and_then(|member| member.user).or(wire.user);
    let (actor_id, actor_display_name) = match actor {
        Some(user) => {
            let display = user.global_name.filter(|name| !name.is_empty()).or_else(|| {
                (!user.username.is_empty()).then(|| user.username.clone())
            });
            ((!user.id.is_empty()).then_some(user.id), display)
        }
        None => (None, None),
    };

    Ok(Interaction {
        interaction_id: wire.id,
        application_id: wire.application_id,
        token: wire.token.into(),
        kind,
        command_name,
        actor_id,
        actor_display_name,
        channel_id: wire.channel_id,
        guild_id: wire.guild_id,
        payload: wire.data,
    })
}
