//! Stage two of the two-stage dispatch split: the out-of-band worker that
//! executes command handlers and delivers the follow-up response, after the
//! webhook endpoint has already acknowledged the interaction.

use std::sync::Arc;
use std::time::{Duration, Instant};

use herald_core::{Interaction, ResponseEnvelope};
use herald_discord::dispatch::Dispatcher;
use herald_discord::responder::ResponseDelivery;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

/// User-visible text when an item sat in the queue past its token's lifetime.
pub const EXPIRED_MESSAGE: &str = "this interaction expired before it could be processed";

/// One accepted command invocation, queued between the webhook endpoint and
/// the dispatch worker.
#[derive(Debug)]
pub struct WorkItem {
    pub interaction: Interaction,
    pub correlation_id: String,
    pub received_at: Instant,
}

impl WorkItem {
    pub fn new(interaction: Interaction) -> Self {
        Self {
            interaction,
            correlation_id: Uuid::new_v4().to_string(),
            received_at: Instant::now(),
        }
    }
}

/// Consumes queued work items, runs each through the dispatcher on its own
/// task, and delivers whatever envelope comes out.
///
/// Delivery is attempted exactly once per item regardless of how dispatch
/// concluded; a failed delivery is logged and the interaction is lost, since
/// the callback token cannot be replayed safely.
#[derive(Clone)]
pub struct DispatchWorker {
    dispatcher: Arc<Dispatcher>,
    delivery: Arc<dyn ResponseDelivery>,
    token_ttl: Duration,
}

impl DispatchWorker {
    pub fn new(
        dispatcher: Arc<Dispatcher>,
        delivery: Arc<dyn ResponseDelivery>,
        token_ttl: Duration,
    ) -> Self {
        Self { dispatcher, delivery, token_ttl }
    }

    /// Drains the queue until every sender is dropped. Items are processed
    /// concurrently so one slow handler cannot head-of-line-block the rest.
    pub fn spawn(self, mut work_queue: mpsc::Receiver<WorkItem>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(item) = work_queue.recv().await {
                let worker = self.clone();
                tokio::spawn(async move {
                    worker.process(item).await;
                });
            }
            info!(
                event_name = "worker.queue.closed",
                "dispatch queue closed; worker stopping"
            );
        })
    }

    pub async fn process(&self, item: WorkItem) {
        let WorkItem { interaction, correlation_id, received_at } = item;

        let waited = received_at.elapsed();
        let envelope = if waited >= self.token_ttl {
            warn!(
                event_name = "worker.interaction.expired",
                correlation_id = %correlation_id,
                waited_ms = waited.as_millis() as u64,
                "callback token expired while queued; failing fast"
            );
            ResponseEnvelope::error(EXPIRED_MESSAGE)
        } else {
            // The handler budget never exceeds what is left of the token's
            // lifetime, so a finished handler always has a live token.
            let budget = self.dispatcher.handler_timeout().min(self.token_ttl - waited);
            self.dispatcher.dispatch_within(&interaction, budget).await.envelope
        };

        match self.delivery.deliver(&interaction.delivery_target(), &envelope).await {
            Ok(()) => {
                info!(
                    event_name = "worker.response.delivered",
                    correlation_id = %correlation_id,
                    is_error = envelope.is_error(),
                    "follow-up response delivered"
                );
            }
            Err(error) => {
                warn!(
                    event_name = "worker.response.delivery_failed",
                    correlation_id = %correlation_id,
                    error = %error,
                    "follow-up delivery failed; interaction response is lost"
                );
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
    use herald_core::{DeliveryTarget, Interaction, InteractionKind, ResponseEnvelope};
    use herald_discord::dispatch::Dispatcher;
    use herald_discord::handlers::builtin_descriptors;
    use herald_discord::registry::CommandRegistry;
    use herald_discord::responder::{DeliveryError, ResponseDelivery};
    use serde_json::json;
    use tokio::sync::mpsc;
    use tokio::sync::Mutex;

    use super::{DispatchWorker, WorkItem, EXPIRED_MESSAGE};

    struct RecordingDelivery {
        deliveries: Mutex<Vec<(String, ResponseEnvelope)>>,
        attempts: AtomicUsize,
        fail: bool,
    }

    impl RecordingDelivery {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                deliveries: Mutex::new(Vec::new()),
                attempts: AtomicUsize::new(0),
                fail,
            })
        }
    }

    #[async_trait]
    impl ResponseDelivery for RecordingDelivery {
        async fn deliver(
            &self,
            target: &DeliveryTarget,
            envelope: &ResponseEnvelope,
        ) -> Result<(), DeliveryError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(DeliveryError::Rejected { status: 404 });
            }
            self.deliveries
                .lock()
                .await
                .push((target.interaction_id.clone(), envelope.clone()));
            Ok(())
        }
    }

    fn command(name: &str) -> Interaction {
        Interaction {
            interaction_id: "9001".to_string(),
            application_id: "1234567890".to_string(),
            token: "tok".to_string().into(),
            kind: InteractionKind::Command,
            command_name: Some(name.to_string()),
            actor_id: Some("U1".to_string()),
            actor_display_name: Some("tester".to_string()),
            channel_id: Some("C1".to_string()),
            guild_id: None,
            payload: json!({ "name": name }),
        }
    }

    fn worker_with(delivery: Arc<RecordingDelivery>, token_ttl: Duration) -> DispatchWorker {
        let registry =
            CommandRegistry::from_descriptors(builtin_descriptors()).expect("builtins register");
        let dispatcher = Arc::new(Dispatcher::new(Arc::new(registry), Duration::from_secs(5)));
        DispatchWorker::new(dispatcher, delivery, token_ttl)
    }

    #[tokio::test]
    async fn successful_command_is_dispatched_and_delivered_once() {
        let delivery = RecordingDelivery::new(false);
        let worker = worker_with(delivery.clone(), Duration::from_secs(900));

        worker.process(WorkItem::new(command("hello"))).await;

        assert_eq!(delivery.attempts.load(Ordering::SeqCst), 1);
        let deliveries = delivery.deliveries.lock().await;
        assert_eq!(
            deliveries.as_slice(),
            [("9001".to_string(), ResponseEnvelope::content("Hello <@U1>!"))]
        );
    }

    #[tokio::test]
    async fn handler_failure_still_reaches_delivery_as_an_error_envelope() {
        let delivery = RecordingDelivery::new(false);
        let worker = worker_with(delivery.clone(), Duration::from_secs(900));

        worker.process(WorkItem::new(command("fail"))).await;

        let deliveries = delivery.deliveries.lock().await;
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].1, ResponseEnvelope::error("You failed, and it's awesome"));
    }

    #[tokio::test]
    async fn expired_items_skip_the_handler_and_deliver_an_expiry_notice() {
        let delivery = RecordingDelivery::new(false);
        let worker = worker_with(delivery.clone(), Duration::ZERO);

        worker.process(WorkItem::new(command("hello"))).await;

        let deliveries = delivery.deliveries.lock().await;
        assert_eq!(deliveries[0].1, ResponseEnvelope::error(EXPIRED_MESSAGE));
    }

    #[tokio::test]
    async fn delivery_failure_is_swallowed_and_not_retried() {
        let delivery = RecordingDelivery::new(true);
        let worker = worker_with(delivery.clone(), Duration::from_secs(900));

        worker.process(WorkItem::new(command("hello"))).await;

        assert_eq!(delivery.attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn spawned_worker_drains_queued_items() {
        let delivery = RecordingDelivery::new(false);
        let worker = worker_with(delivery.clone(), Duration::from_secs(900));

        let (sender, receiver) = mpsc::channel(4);
        let handle = worker.spawn(receiver);

        sender.send(WorkItem::new(command("hello"))).await.expect("queue accepts");
        drop(sender);
        handle.await.expect("worker loop completes");

        // Item tasks are detached from the loop; poll until the delivery
        // lands rather than racing it.
        for _ in 0..100 {
            if delivery.attempts.load(Ordering::SeqCst) == 1 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("queued item was never delivered");
    }
}
