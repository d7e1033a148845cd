//! Built-in command handlers registered by the default bootstrap.

use std::sync::Arc;

use async_trait::async_trait;
use herald_core::{Interaction, ResponseEnvelope};

use crate::registry::{CommandDescriptor, CommandHandler, CommandSchema, HandlerError};

/// `/hello` - greets whoever invoked the command.
pub struct HelloHandler;

#[async_trait]
impl CommandHandler for HelloHandler {
    async fn execute(&self, interaction: &Interaction) -> Result<ResponseEnvelope, HandlerError> {
        let actor = interaction.actor_id.as_deref().unwrap_or("unknown");
        Ok(ResponseEnvelope::content(format!("Hello <@{actor}>!")))
    }
}

/// `/fail` - always errors, exercising the error-to-response path end to end.
pub struct FailHandler;

#[async_trait]
impl CommandHandler for FailHandler {
    async fn execute(&self, _interaction: &Interaction) -> Result<ResponseEnvelope, HandlerError> {
        Err(HandlerError::new("You failed, and it's awesome"))
    }
}

pub fn builtin_descriptors() -> Vec<CommandDescriptor> {
    vec![
        CommandDescriptor::new(CommandSchema::new("hello", "Say hello"), Arc::new(HelloHandler)),
        CommandDescriptor::new(
            CommandSchema::new("fail", "Fail at doing nothing, you've been warned"),
            Arc::new(FailHandler),
        ),
    ]
}
