use std::sync::Arc;
use std::time::Duration;

use herald_core::{Interaction, ResponseEnvelope};
use tracing::{debug, info, warn};

use crate::registry::CommandRegistry;

/// User-visible text for a command name absent from the registry.
pub const UNKNOWN_COMMAND_MESSAGE: &str = "unknown command";
/// User-visible text when a handler exceeds its execution budget.
pub const TIMEOUT_MESSAGE: &str = "the command timed out before completing";
/// User-visible text for verified interactions that are not commands.
pub const UNSUPPORTED_MESSAGE: &str = "unsupported interaction type";

/// How a dispatch concluded. Every variant still carries a deliverable
/// envelope; the resolution only exists for logging and tests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DispatchResolution {
    Succeeded { command: String },
    UnknownCommand { command: String },
    HandlerFailed { command: String },
    TimedOut { command: String },
    NotACommand,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub envelope: ResponseEnvelope,
    pub resolution: DispatchResolution,
}

/// Routes a verified interaction to its handler and normalizes the result.
///
/// Per interaction the handler runs at most once; a failed handler is never
/// retried (a retry could duplicate its side effects). Failures of any kind
/// converge on an error envelope so delivery has a single uniform contract
/// and the platform never sees a silent timeout.
pub struct Dispatcher {
    registry: Arc<CommandRegistry>,
    handler_timeout: Duration,
}

impl Dispatcher {
    pub fn new(registry: Arc<CommandRegistry>, handler_timeout: Duration) -> Self {
        Self { registry, handler_timeout }
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn handler_timeout(&self) -> Duration {
        self.handler_timeout
    }

    pub async fn dispatch(&self, interaction: &Interaction) -> DispatchOutcome {
        self.dispatch_within(interaction, self.handler_timeout).await
    }

    /// Dispatches with an explicit budget, which callers clamp to the
    /// interaction token's remaining lifetime.
    pub async fn dispatch_within(
        &self,
        interaction: &Interaction,
        budget: Duration,
    ) -> DispatchOutcome {
        debug!(
            event_name = "dispatch.interaction.received",
            correlation_id = %interaction.interaction_id,
            command = interaction.command_name.as_deref().unwrap_or("none"),
            "interaction received for dispatch"
        );

        let Some(command) = interaction.command_name.as_deref() else {
            warn!(
                event_name = "dispatch.interaction.not_a_command",
                correlation_id = %interaction.interaction_id,
                "verified interaction carries no command name"
            );
            return DispatchOutcome {
                envelope: ResponseEnvelope::error(UNSUPPORTED_MESSAGE),
                resolution: DispatchResolution::NotACommand,
            };
        };

        let Some(descriptor) = self.registry.lookup(command) else {
            info!(
                event_name = "dispatch.interaction.unknown_command",
                correlation_id = %interaction.interaction_id,
                command,
                "no handler registered for command"
            );
            return DispatchOutcome {
                envelope: ResponseEnvelope::error(UNKNOWN_COMMAND_MESSAGE),
                resolution: DispatchResolution::UnknownCommand { command: command.to_owned() },
            };
        };

        debug!(
            event_name = "dispatch.interaction.executing",
            correlation_id = %interaction.interaction_id,
            command,
            budget_ms = budget.as_millis() as u64,
            "executing command handler"
        );

        match tokio::time::timeout(budget, descriptor.handler.execute(interaction)).await {
            Ok(Ok(envelope)) => {
                info!(
                    event_name = "dispatch.interaction.succeeded",
                    correlation_id = %interaction.interaction_id,
                    command,
                    "command handler completed"
                );
                DispatchOutcome {
                    envelope,
                    resolution: DispatchResolution::Succeeded { command: command.to_owned() },
                }
            }
            Ok(Err(handler_error)) => {
                warn!(
                    event_name = "dispatch.interaction.handler_failed",
                    correlation_id = %interaction.interaction_id,
                    command,
                    error = %handler_error,
                    "command handler failed; converting to error envelope"
                );
                DispatchOutcome {
                    envelope: ResponseEnvelope::error(handler_error.message),
                    resolution: DispatchResolution::HandlerFailed { command: command.to_owned() },
                }
            }
            Err(_elapsed) => {
                warn!(
                    event_name = "dispatch.interaction.timed_out",
                    correlation_id = %interaction.interaction_id,
                    command,
                    budget_ms = budget.as_millis() as u64,
                    "command handler exceeded its budget"
                );
                DispatchOutcome {
                    envelope: ResponseEnvelope::error(TIMEOUT_MESSAGE),
                    resolution: DispatchResolution::TimedOut { command: command.to_owned() },
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use herald_core::{Interaction, InteractionKind, ResponseEnvelope};
    use serde_json::json;

    use super::{DispatchResolution, Dispatcher, TIMEOUT_MESSAGE, UNKNOWN_COMMAND_MESSAGE};
    use crate::registry::{
        CommandDescriptor, CommandHandler, CommandRegistry, CommandSchema, HandlerError,
    };

    struct CountingHandler {
        calls: Arc<AtomicUsize>,
        reply: Result<&'static str, &'static str>,
    }

    #[async_trait]
    impl CommandHandler for CountingHandler {
        async fn execute(
            &self,
            _interaction: &Interaction,
        ) -> Result<ResponseEnvelope, HandlerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.reply {
                Ok(content) => Ok(ResponseEnvelope::content(content)),
                Err(message) => Err(HandlerError::new(message)),
            }
        }
    }

    struct SleepingHandler {
        sleep: Duration,
    }

    #[async_trait]
    impl CommandHandler for SleepingHandler {
        async fn execute(
            &self,
            _interaction: &Interaction,
        ) -> Result<ResponseEnvelope, HandlerError> {
            tokio::time::sleep(self.sleep).await;
            Ok(ResponseEnvelope::content("too late"))
        }
    }

    fn command_interaction(name: Option<&str>) -> Interaction {
        Interaction {
            interaction_id: "9001".to_string(),
            application_id: "1234567890".to_string(),
            token: "tok".to_string().into(),
            kind: InteractionKind::Command,
            command_name: name.map(str::to_owned),
            actor_id: Some("U1".to_string()),
            actor_display_name: Some("tester".to_string()),
            channel_id: Some("C1".to_string()),
            guild_id: None,
            payload: json!({}),
        }
    }

    fn dispatcher_with(
        name: &str,
        handler: CountingHandler,
    ) -> (Dispatcher, Arc<AtomicUsize>) {
        let calls = handler.calls.clone();
        let registry = CommandRegistry::from_descriptors(vec![CommandDescriptor::new(
            CommandSchema::new(name, "test command"),
            Arc::new(handler),
        )])
        .expect("registry builds");
        (Dispatcher::new(Arc::new(registry), Duration::from_secs(5)), calls)
    }

    #[tokio::test]
    async fn unknown_command_yields_error_envelope_without_panicking() {
        let registry = CommandRegistry::from_descriptors(Vec::new()).expect("empty registry");
        let dispatcher = Dispatcher::new(Arc::new(registry), Duration::from_secs(5));

        let outcome = dispatcher.dispatch(&command_interaction(Some("foo"))).await;

        assert_eq!(outcome.envelope, ResponseEnvelope::error(UNKNOWN_COMMAND_MESSAGE));
        assert_eq!(
            outcome.resolution,
            DispatchResolution::UnknownCommand { command: "foo".to_string() }
        );
    }

    #[tokio::test]
    async fn successful_handler_runs_exactly_once_and_returns_its_content() {
        let (dispatcher, calls) = dispatcher_with(
            "hello",
            CountingHandler { calls: Arc::new(AtomicUsize::new(0)), reply: Ok("Hello <@U1>!") },
        );

        let outcome = dispatcher.dispatch(&command_interaction(Some("hello"))).await;

        assert_eq!(outcome.envelope, ResponseEnvelope::content("Hello <@U1>!"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_handler_is_not_retried_and_its_message_is_preserved() {
        let (dispatcher, calls) = dispatcher_with(
            "fail",
            CountingHandler {
                calls: Arc::new(AtomicUsize::new(0)),
                reply: Err("You failed, and it's awesome"),
            },
        );

        let outcome = dispatcher.dispatch(&command_interaction(Some("fail"))).await;

        assert_eq!(outcome.envelope, ResponseEnvelope::error("You failed, and it's awesome"));
        assert_eq!(
            outcome.resolution,
            DispatchResolution::HandlerFailed { command: "fail".to_string() }
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn handler_exceeding_its_budget_times_out_into_an_error_envelope() {
        let registry = CommandRegistry::from_descriptors(vec![CommandDescriptor::new(
            CommandSchema::new("slow", "sleeps"),
            Arc::new(SleepingHandler { sleep: Duration::from_secs(60) }),
        )])
        .expect("registry builds");
        let dispatcher = Dispatcher::new(Arc::new(registry), Duration::from_secs(5));

        let outcome = dispatcher
            .dispatch_within(&command_interaction(Some("slow")), Duration::from_millis(10))
            .await;

        assert_eq!(outcome.envelope, ResponseEnvelope::error(TIMEOUT_MESSAGE));
        assert_eq!(
            outcome.resolution,
            DispatchResolution::TimedOut { command: "slow".to_string() }
        );
    }

    #[tokio::test]
    async fn interaction_without_a_command_name_resolves_without_handler_execution() {
        let (dispatcher, calls) = dispatcher_with(
            "hello",
            CountingHandler { calls: Arc::new(AtomicUsize::new(0)), reply: Ok("hi") },
        );

        let outcome = dispatcher.dispatch(&command_interaction(None)).await;

        assert_eq!(outcome.resolution, DispatchResolution::NotACommand);
        assert!(outcome.envelope.is_error());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
