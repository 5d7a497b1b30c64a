use std::sync::Arc;

use crate::adapter::{adapt, Outcome};
use crate::annotate::Declare;
use crate::exchange::{Next, Req, Res};
use crate::handler::Handler;
use crate::metadata::ControllerId;

/// A controller action: receives the bound instance and the request triple.
pub type Action<C> = fn(&Arc<C>, Req, Res, Next) -> Outcome;

/// Ordered table of a controller's actions.
pub struct Actions<C> {
    entries: Vec<(&'static str, Action<C>)>,
}

impl<C> Actions<C> {
    fn new() -> Self {
        Actions {
            entries: Vec::new(),
        }
    }

    /// Lists `action` under `name`.
    pub fn add(&mut self, name: &'static str, action: Action<C>) -> &mut Self {
        self.entries.push((name, action));
        self
    }
}

/// A type that groups route-handling actions.
///
/// Controllers are constructed with no arguments, list their actions in
/// [`actions`](Controller::actions) and attach routes and middleware to them in
/// [`annotate`](Controller::annotate). An action that is listed but never
/// annotated is not a route.
///
/// ```
/// use std::sync::Arc;
/// use waypost::{get, Actions, Controller, Declare, Next, Outcome, Req, Res};
///
/// #[derive(Default)]
/// struct PingController;
///
/// impl PingController {
///     fn ping(self: &Arc<Self>, _req: Req, res: Res, _next: Next) -> Outcome {
///         res.json(&serde_json::json!({ "status": "ok" })).into()
///     }
/// }
///
/// impl Controller for PingController {
///     fn actions(table: &mut Actions<Self>) {
///         table.add("ping", Self::ping);
///     }
///
///     fn annotate(routes: &mut Declare<'_, Self>) {
///         routes.action("ping", [get("/ping")]);
///     }
/// }
/// ```
pub trait Controller: Default + Send + Sync + 'static {
    /// Lists every action on the controller, annotated or not.
    fn actions(table: &mut Actions<Self>);

    /// Declares routes and middleware for this controller's actions.
    fn annotate(routes: &mut Declare<'_, Self>);
}

fn action_table<C: Controller>() -> Vec<(&'static str, Action<C>)> {
    let mut table = Actions::new();
    C::actions(&mut table);
    table.entries
}

/// A live, type-erased controller instance.
pub trait Instance: Send + Sync {
    fn controller_id(&self) -> ControllerId;

    /// Names of every action on the instance, in declaration order.
    fn action_names(&self) -> Vec<&'static str>;

    /// Adapted handler for `action` bound to this instance.
    fn bind(&self, action: &str) -> Option<Handler>;
}

struct Bound<C>(Arc<C>);

impl<C: Controller> Instance for Bound<C> {
    fn controller_id(&self) -> ControllerId {
        ControllerId::of::<C>()
    }

    fn action_names(&self) -> Vec<&'static str> {
        action_table::<C>().into_iter().map(|(name, _)| name).collect()
    }

    fn bind(&self, action: &str) -> Option<Handler> {
        action_table::<C>()
            .into_iter()
            .find(|(name, _)| *name == action)
            .map(|(_, f)| adapt(self.0.clone(), f))
    }
}

/// Constructs a fresh instance of one controller type.
#[derive(Clone, Copy)]
pub struct ControllerFactory {
    id: ControllerId,
    construct: fn() -> Box<dyn Instance>,
}

fn construct<C: Controller>() -> Box<dyn Instance> {
    Box::new(Bound(Arc::new(C::default())))
}

impl ControllerFactory {
    pub fn of<C: Controller>() -> Self {
        ControllerFactory {
            id: ControllerId::of::<C>(),
            construct: construct::<C>,
        }
    }

    pub fn id(&self) -> ControllerId {
        self.id
    }

    pub fn instantiate(&self) -> Box<dyn Instance> {
        (self.construct)()
    }
}

impl std::fmt::Debug for ControllerFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ControllerFactory").field(&self.id.name()).finish()
    }
}
