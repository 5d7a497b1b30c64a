//! Route and middleware annotations.
//!
//! Annotators are plain values. They are applied to an action through a
//! controller's declaration table ([`Declare`]) or directly with
//! [`Annotator::apply`]; either way they append to the action's
//! [`MethodMetadata`](crate::MethodMetadata) and never replace it.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::controller::Controller;
use crate::error::HandlerResult;
use crate::exchange::{Next, Req, Res};
use crate::handler::{handler_fn, Handler};
use crate::metadata::{MetadataStore, MethodKey, MiddlewareFactory, MiddlewarePhase, RouteDeclaration, Verb};

/// A single declaration waiting to be attached to an action.
#[derive(Clone)]
pub enum Annotator {
    Route(RouteDeclaration),
    Middleware(MiddlewarePhase, MiddlewareFactory),
}

impl Annotator {
    /// Appends this declaration to the metadata of `key`, creating the entry if needed.
    pub fn apply(self, store: &mut MetadataStore, key: MethodKey) {
        let meta = store.entry(key);
        match self {
            Annotator::Route(route) => meta.routes.push(route),
            Annotator::Middleware(phase, factory) => meta.middleware_mut(phase).push(factory),
        }
    }
}

impl fmt::Debug for Annotator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Annotator::Route(route) => f.debug_tuple("Route").field(route).finish(),
            Annotator::Middleware(phase, _) => f.debug_tuple("Middleware").field(phase).finish(),
        }
    }
}

/// Declares `path` for `verb`. The path is not validated until registration.
pub fn route_for(verb: Verb, path: impl Into<String>) -> Annotator {
    Annotator::Route(RouteDeclaration {
        path: path.into(),
        verb,
    })
}

pub fn get(path: impl Into<String>) -> Annotator {
    route_for(Verb::Get, path)
}

pub fn post(path: impl Into<String>) -> Annotator {
    route_for(Verb::Post, path)
}

/// Route answering every request method.
pub fn all(path: impl Into<String>) -> Annotator {
    route_for(Verb::All, path)
}

/// Middleware placed ahead of the action. `factory` runs once per registered route.
pub fn before<F>(factory: F) -> Annotator
where
    F: Fn() -> Handler + Send + Sync + 'static,
{
    Annotator::Middleware(MiddlewarePhase::Before, Arc::new(factory))
}

/// Middleware placed after the action; it only runs if the action calls `next.proceed()`.
pub fn after<F>(factory: F) -> Annotator
where
    F: Fn() -> Handler + Send + Sync + 'static,
{
    Annotator::Middleware(MiddlewarePhase::After, Arc::new(factory))
}

/// Factory that hands out the same synchronous middleware function on every call.
///
/// ```
/// use waypost::{before, middleware};
///
/// let stamp = before(middleware(|_req, res, next| {
///     res.set_header("x-served-by", "waypost")?;
///     next.proceed();
///     Ok(())
/// }));
/// # drop(stamp);
/// ```
pub fn middleware<F>(f: F) -> impl Fn() -> Handler + Send + Sync + 'static
where
    F: Fn(&Req, &Res, &Next) -> HandlerResult + Send + Sync + 'static,
{
    let f = Arc::new(f);
    move || {
        let f = f.clone();
        handler_fn(move |req, res, next| f(req, res, next))
    }
}

/// Declaration table for the actions of controller `C`.
///
/// Annotators listed for one action are applied in the order given, which is
/// also the order their routes are registered in.
pub struct Declare<'s, C> {
    store: &'s mut MetadataStore,
    _controller: PhantomData<fn() -> C>,
}

impl<'s, C: Controller> Declare<'s, C> {
    pub(crate) fn new(store: &'s mut MetadataStore) -> Self {
        Declare {
            store,
            _controller: PhantomData,
        }
    }

    /// Attaches `annotators` to the action named `name`.
    pub fn action<I>(&mut self, name: &'static str, annotators: I) -> &mut Self
    where
        I: IntoIterator<Item = Annotator>,
    {
        let key = MethodKey::of::<C>(name);
        for annotator in annotators {
            annotator.apply(&mut *self.store, key);
        }
        self
    }
}
