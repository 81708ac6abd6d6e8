//! Check trait definition and combinators.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::directory::Directory;
use crate::domain::error::Result;
use crate::domain::types::{Event, Message, UserId};

/// Everything a check may look at. Checks only ever read from it.
pub struct CheckContext<'a> {
    pub event: &'a Event,
    /// Parsed command arguments; empty for plain events.
    pub args: &'a [String],
    pub directory: &'a Directory,
    /// The bot's own user, once the session is ready.
    pub self_id: Option<UserId>,
}

impl<'a> CheckContext<'a> {
    pub fn new(event: &'a Event, directory: &'a Directory, self_id: Option<UserId>) -> Self {
        Self {
            event,
            args: &[],
            directory,
            self_id,
        }
    }

    pub fn with_args(mut self, args: &'a [String]) -> Self {
        self.args = args;
        self
    }

    pub fn message(&self) -> Option<&'a Message> {
        self.event.message()
    }
}

/// A named, asynchronous predicate gating commands and event handlers.
///
/// Expected conditions (no roles, no message on the event) resolve to
/// `Ok(true)`/`Ok(false)`. An `Err` means a configuration object could not be
/// resolved and the operation the check guards must be aborted.
#[async_trait]
pub trait Check: Send + Sync {
    fn name(&self) -> String;

    async fn check(&self, ctx: &CheckContext<'_>) -> Result<bool>;
}

/// Evaluate checks in order, stopping at the first one that fails.
pub async fn all_pass(checks: &[Arc<dyn Check>], ctx: &CheckContext<'_>) -> Result<bool> {
    for check in checks {
        if !check.check(ctx).await? {
            debug!(check = %check.name(), "Failing check");
            return Ok(false);
        }
    }
    Ok(true)
}

/// Evaluate checks in order, stopping at the first one that passes.
pub async fn any_pass(checks: &[Arc<dyn Check>], ctx: &CheckContext<'_>) -> Result<bool> {
    for check in checks {
        if check.check(ctx).await? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Logical AND over a list of checks.
pub struct All(Vec<Arc<dyn Check>>);

/// Logical OR over a list of checks.
pub struct Any(Vec<Arc<dyn Check>>);

pub fn all(checks: Vec<Arc<dyn Check>>) -> Arc<dyn Check> {
    Arc::new(All(checks))
}

pub fn any(checks: Vec<Arc<dyn Check>>) -> Arc<dyn Check> {
    Arc::new(Any(checks))
}

#[async_trait]
impl Check for All {
    fn name(&self) -> String {
        let names: Vec<String> = self.0.iter().map(|c| c.name()).collect();
        format!("all({})", names.join(", "))
    }

    async fn check(&self, ctx: &CheckContext<'_>) -> Result<bool> {
        all_pass(&self.0, ctx).await
    }
}

#[async_trait]
impl Check for Any {
    fn name(&self) -> String {
        let names: Vec<String> = self.0.iter().map(|c| c.name()).collect();
        format!("any({})", names.join(", "))
    }

    async fn check(&self, ctx: &CheckContext<'_>) -> Result<bool> {
        any_pass(&self.0, ctx).await
    }
}

/// A check backed by a plain synchronous closure.
pub struct FnCheck<F> {
    name: String,
    predicate: F,
}

/// Wrap a closure as a [`Check`].
pub fn check_fn<F>(name: impl Into<String>, predicate: F) -> Arc<dyn Check>
where
    F: Fn(&CheckContext<'_>) -> bool + Send + Sync + 'static,
{
    Arc::new(FnCheck {
        name: name.into(),
        predicate,
    })
}

#[async_trait]
impl<F> Check for FnCheck<F>
where
    F: Fn(&CheckContext<'_>) -> bool + Send + Sync,
{
    fn name(&self) -> String {
        self.name.clone()
    }

    async fn check(&self, ctx: &CheckContext<'_>) -> Result<bool> {
        Ok((self.predicate)(ctx))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::test_support;

    /// Returns a fixed result and counts its calls.
    struct Counting {
        result: bool,
        calls: AtomicUsize,
    }

    impl Counting {
        fn new(result: bool) -> Arc<Self> {
            Arc::new(Self {
                result,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Check for Counting {
        fn name(&self) -> String {
            format!("counting({})", self.result)
        }

        async fn check(&self, _ctx: &CheckContext<'_>) -> Result<bool> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.result)
        }
    }

    #[tokio::test]
    async fn test_all_pass_stops_at_first_failure() {
        let directory = test_support::directory();
        let event = Event::MessageCreate(test_support::message(1, test_support::MEMBER, "hi"));
        let ctx = CheckContext::new(&event, &directory, None);

        let first = Counting::new(true);
        let failing = Counting::new(false);
        let never = Counting::new(true);
        let checks: Vec<Arc<dyn Check>> = vec![first.clone(), failing.clone(), never.clone()];

        assert!(!all_pass(&checks, &ctx).await.unwrap());
        assert_eq!(first.calls(), 1);
        assert_eq!(failing.calls(), 1);
        assert_eq!(never.calls(), 0);
    }

    #[tokio::test]
    async fn test_any_pass_stops_at_first_success() {
        let directory = test_support::directory();
        let event = Event::MessageCreate(test_support::message(1, test_support::MEMBER, "hi"));
        let ctx = CheckContext::new(&event, &directory, None);

        let failing = Counting::new(false);
        let passing = Counting::new(true);
        let never = Counting::new(false);
        let checks: Vec<Arc<dyn Check>> = vec![failing.clone(), passing.clone(), never.clone()];

        assert!(any_pass(&checks, &ctx).await.unwrap());
        assert_eq!(never.calls(), 0);
        assert!(!any_pass(&[], &ctx).await.unwrap());
        assert!(all_pass(&[], &ctx).await.unwrap());
    }

    #[tokio::test]
    async fn test_combinators_nest() {
        let directory = test_support::directory();
        let event = Event::MessageCreate(test_support::message(1, test_support::MEMBER, "hi"));
        let ctx = CheckContext::new(&event, &directory, None);

        let author_is_member = check_fn("author is member", |ctx| {
            ctx.message()
                .is_some_and(|m| m.author.id == test_support::MEMBER)
        });
        let nested = all(vec![
            author_is_member,
            any(vec![check_fn("no", |_| false), check_fn("yes", |_| true)]),
        ]);

        assert!(nested.check(&ctx).await.unwrap());
        assert_eq!(nested.name(), "all(author is member, any(no, yes))");
    }
}
