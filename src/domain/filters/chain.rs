//! Filter chain implementation.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use anyhow::Result;
use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::config::FiltersConfig;
use crate::domain::parser::sanitize_content;

use super::{
    AttachmentFilter, DomainFilter, EmbedFilter, Filter, FilterContext, InviteFilter, RegexFilter,
};

/// Which message event the chain is running for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Create,
    Edit,
}

/// How a chain run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainOutcome {
    /// Every applicable filter let the message through.
    Passed,
    /// The named filter actioned the message; later filters were not run.
    Actioned(&'static str),
    /// Shutdown was requested between two filters.
    Cancelled,
}

/// Ordered chain of content filters.
pub struct FilterChain {
    filters: Vec<Arc<dyn Filter>>,
}

impl FilterChain {
    /// Create a new FilterChain with the built-in filters.
    pub fn new(config: &FiltersConfig) -> Result<Self> {
        let filters: Vec<Arc<dyn Filter>> = vec![
            Arc::new(InviteFilter::new(config.invite_whitelist.clone())?),
            Arc::new(DomainFilter::new(
                config.domain_blacklist.clone(),
                config.extension_blacklist.clone(),
                config.scheme_blacklist.clone(),
            )?),
            Arc::new(AttachmentFilter::new(config.attachment_blacklist.clone())),
            Arc::new(EmbedFilter),
            Arc::new(RegexFilter::new(&config.regex)?),
        ];

        Ok(Self::with_filters(filters))
    }

    /// Build a chain from arbitrary filters.
    ///
    /// Filters are ordered by priority; equal priorities keep the given order.
    pub fn with_filters(mut filters: Vec<Arc<dyn Filter>>) -> Self {
        filters.sort_by_key(|f| f.priority());
        Self { filters }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    /// Run the message in `ctx` through the chain.
    ///
    /// Content is sanitized once up front. A filter whose concerns are all
    /// absent from the message is skipped. A filter that fails is logged and
    /// treated as if it had let the message through.
    pub async fn run(
        &self,
        ctx: &FilterContext<'_>,
        trigger: Trigger,
        cancel: &CancellationToken,
    ) -> ChainOutcome {
        let message = ctx.message;
        let content = sanitize_content(&message.content);

        for filter in &self.filters {
            if cancel.is_cancelled() {
                debug!(message = %message.id, "Filter chain cancelled");
                return ChainOutcome::Cancelled;
            }

            if !filter.concerns().iter().any(|c| c.present_in(message)) {
                debug!(filter = filter.name(), "Skipping filter, no matching concerns");
                continue;
            }

            let check = async {
                match trigger {
                    Trigger::Create => filter.check_create(ctx, &content).await,
                    Trigger::Edit => filter.check_edit(ctx, &content).await,
                }
            };

            match AssertUnwindSafe(check).catch_unwind().await {
                Ok(Ok(true)) => {}
                Ok(Ok(false)) => {
                    debug!(filter = filter.name(), message = %message.id, "Message actioned");
                    return ChainOutcome::Actioned(filter.name());
                }
                Ok(Err(e)) => {
                    error!(
                        filter = filter.name(),
                        message = %message.id,
                        channel = %message.channel_id,
                        error = %format!("{:#}", e),
                        "Error while running filter"
                    );
                }
                Err(_) => {
                    error!(
                        filter = filter.name(),
                        message = %message.id,
                        channel = %message.channel_id,
                        "Filter panicked"
                    );
                }
            }
        }

        ChainOutcome::Passed
    }
}
