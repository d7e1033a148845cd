use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use herald_core::{Interaction, ResponseEnvelope};
use serde::Serialize;
use thiserror::Error;

/// A handler failure surfaced to the user. The message becomes the visible
/// error text of the response envelope.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct HandlerError {
    pub message: String,
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// A command implementation. One invocation per interaction, no shared
/// mutable state between invocations.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn execute(&self, interaction: &Interaction) -> Result<ResponseEnvelope, HandlerError>;
}

/// Declarative command description pushed to the platform's catalog. Not
/// re-validated at dispatch time; the platform enforces it on submit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CommandSchema {
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<serde_json::Value>,
}

impl CommandSchema {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self { name: name.into(), description: description.into(), options: Vec::new() }
    }
}

#[derive(Clone)]
pub struct CommandDescriptor {
    pub schema: CommandSchema,
    pub handler: Arc<dyn CommandHandler>,
}

impl CommandDescriptor {
    pub fn new(schema: CommandSchema, handler: Arc<dyn CommandHandler>) -> Self {
        Self { schema, handler }
    }

    pub fn name(&self) -> &str {
        &self.schema.name
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("duplicate command name `{0}` in registry")]
    DuplicateCommand(String),
    #[error("command name must not be empty")]
    EmptyCommandName,
}

/// Immutable command-name-to-handler mapping, built once at process start.
///
/// Duplicate names are a configuration error caught here, at startup, never
/// at request time. Reads are lock-free and safe from any number of
/// concurrent dispatches.
pub struct CommandRegistry {
    commands: HashMap<String, CommandDescriptor>,
}

impl CommandRegistry {
    pub fn from_descriptors(descriptors: Vec<CommandDescriptor>) -> Result<Self, RegistryError> {
        let mut commands = HashMap::with_capacity(descriptors.len());
        for descriptor in descriptors {
            let name = descriptor.name().to_owned();
            if name.trim().is_empty() {
                return Err(RegistryError::EmptyCommandName);
            }
            if commands.insert(name.clone(), descriptor).is_some() {
                return Err(RegistryError::DuplicateCommand(name));
            }
        }
        Ok(Self { commands })
    }

    pub fn lookup(&self, name: &str) -> Option<&CommandDescriptor> {
        self.commands.get(name)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Schemas for catalog sync, sorted by name so pushes are deterministic.
    pub fn schemas(&self) -> Vec<CommandSchema> {
        let mut schemas: Vec<_> =
            self.commands.values().map(|descriptor| descriptor.schema.clone()).collect();
        schemas.sort_by(|left, right| left.name.cmp(&right.name));
        schemas
    }
}

// Handlers are opaque trait objects, so `Debug` reports the registered names.
impl fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.commands.keys().collect();
        names.sort();
        f.debug_struct("CommandRegistry").field("commands", &names).finish()
    }
}
