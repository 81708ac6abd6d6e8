//! Check-gated handlers for raw events.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use tracing::{debug, error};

use crate::domain::checks::{all_pass, Check, CheckContext};
use crate::domain::directory::Directory;
use crate::domain::types::{Event, EventKind, UserId};

/// The body of an event handler.
#[async_trait]
pub trait EventHandler<C: Sync>: Send + Sync {
    async fn handle(&self, ctx: &C, event: &Event) -> anyhow::Result<()>;
}

struct Registration<C> {
    name: String,
    kinds: Vec<EventKind>,
    checks: Vec<Arc<dyn Check>>,
    handler: Arc<dyn EventHandler<C>>,
}

/// Handlers keyed by event kind, run in registration order.
pub struct EventRouter<C> {
    handlers: Vec<Registration<C>>,
}

impl<C: Sync> Default for EventRouter<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Sync> EventRouter<C> {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// Run `handler` for every event of the given kinds whose checks pass.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        kinds: &[EventKind],
        checks: Vec<Arc<dyn Check>>,
        handler: impl EventHandler<C> + 'static,
    ) {
        let name = name.into();
        debug!(handler = %name, ?kinds, "Registered event handler");
        self.handlers.push(Registration {
            name,
            kinds: kinds.to_vec(),
            checks,
            handler: Arc::new(handler),
        });
    }

    pub fn names(&self) -> Vec<&str> {
        self.handlers.iter().map(|h| h.name.as_str()).collect()
    }

    /// Offer `event` to every handler registered for its kind.
    ///
    /// Messages authored by `self_id` are dropped before any check runs. A
    /// handler whose checks fail (or can't be evaluated) is skipped; a handler
    /// that errors or panics is logged and the remaining handlers still run.
    /// Returns how many handlers completed successfully.
    pub async fn dispatch(
        &self,
        ctx: &C,
        event: &Event,
        directory: &Directory,
        self_id: Option<UserId>,
    ) -> usize {
        if let (Some(message), Some(me)) = (event.message(), self_id) {
            if message.author.id == me {
                return 0;
            }
        }

        let kind = event.kind();
        let check_ctx = CheckContext::new(event, directory, self_id);
        let mut completed = 0;

        for registration in self.handlers.iter().filter(|h| h.kinds.contains(&kind)) {
            match all_pass(&registration.checks, &check_ctx).await {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => {
                    error!(handler = %registration.name, event = %event, error = %e, "Unable to evaluate handler checks");
                    continue;
                }
            }

            let outcome = AssertUnwindSafe(registration.handler.handle(ctx, event))
                .catch_unwind()
                .await;

            match outcome {
                Ok(Ok(())) => completed += 1,
                Ok(Err(e)) => error!(
                    error = %format!("{:#}", e),
                    "Error while handling {} ({})", registration.name, event
                ),
                Err(_) => error!("Handler {} panicked ({})", registration.name, event),
            }
        }

        completed
    }
}
