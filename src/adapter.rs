//! Normalizes controller action results into the [`Handler`] contract.
//!
//! An action either finishes while it is being called ([`Outcome::Ready`]) or
//! hands back a future that finishes later ([`Outcome::Deferred`]). The adapted
//! handler completes when the action's work does, and passes any error through
//! untouched.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::{self, BoxFuture, FutureExt};

use crate::controller::Action;
use crate::error::HandlerResult;
use crate::handler::Handler;

/// Result shape of a controller action.
pub enum Outcome {
    /// The action already finished.
    Ready(HandlerResult),
    /// The action finishes when this future settles.
    Deferred(BoxFuture<'static, HandlerResult>),
}

impl Outcome {
    /// A successfully finished action.
    pub fn done() -> Self {
        Outcome::Ready(Ok(()))
    }

    pub fn deferred<F>(fut: F) -> Self
    where
        F: Future<Output = HandlerResult> + Send + 'static,
    {
        Outcome::Deferred(fut.boxed())
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, Outcome::Deferred(_))
    }
}

impl From<()> for Outcome {
    fn from(_: ()) -> Self {
        Outcome::done()
    }
}

impl From<HandlerResult> for Outcome {
    fn from(result: HandlerResult) -> Self {
        Outcome::Ready(result)
    }
}

impl fmt::Debug for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Ready(result) => f.debug_tuple("Ready").field(result).finish(),
            Outcome::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

/// Binds `action` to `instance` and exposes it as a [`Handler`].
///
/// The action runs as soon as the handler is called.
pub fn adapt<C>(instance: Arc<C>, action: Action<C>) -> Handler
where
    C: Send + Sync + 'static,
{
    Arc::new(move |req, res, next| match action(&instance, req, res, next) {
        Outcome::Ready(result) => future::ready(result).boxed(),
        Outcome::Deferred(fut) => fut,
    })
}
