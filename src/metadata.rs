//! Per-action route and middleware declarations.
//!
//! The [`MetadataStore`] is an explicit registry handed to module definitions
//! (which write into it) and to the [`Resolver`](crate::Resolver) (which reads
//! it). Entries are keyed by [`MethodKey`], the pair of a controller's type path
//! and an action name.

use std::any::{self, TypeId};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use hyper::Method;

use crate::annotate::Declare;
use crate::controller::Controller;
use crate::handler::Handler;

/// HTTP verbs a route can be declared for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Get,
    Post,
    /// Matches any request method.
    All,
}

impl Verb {
    /// Whether a request with `method` is served by a route declared for this verb.
    ///
    /// `Get` routes also answer `HEAD`.
    pub fn accepts(&self, method: &Method) -> bool {
        match self {
            Verb::Get => *method == Method::GET || *method == Method::HEAD,
            Verb::Post => *method == Method::POST,
            Verb::All => true,
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Verb::Get => "get",
            Verb::Post => "post",
            Verb::All => "all",
        })
    }
}

/// One `(path, verb)` pair bound to an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDeclaration {
    pub path: String,
    pub verb: Verb,
}

/// Where a middleware sits relative to the action in a route's chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MiddlewarePhase {
    Before,
    After,
}

/// Produces a fresh middleware handler each time a route is registered.
pub type MiddlewareFactory = Arc<dyn Fn() -> Handler + Send + Sync>;

/// Everything declared for a single action.
#[derive(Clone, Default)]
pub struct MethodMetadata {
    pub routes: Vec<RouteDeclaration>,
    pub before: Vec<MiddlewareFactory>,
    pub after: Vec<MiddlewareFactory>,
}

impl MethodMetadata {
    /// Middleware factories declared for `phase`, in declaration order.
    pub fn middleware(&self, phase: MiddlewarePhase) -> &[MiddlewareFactory] {
        match phase {
            MiddlewarePhase::Before => &self.before,
            MiddlewarePhase::After => &self.after,
        }
    }

    pub(crate) fn middleware_mut(&mut self, phase: MiddlewarePhase) -> &mut Vec<MiddlewareFactory> {
        match phase {
            MiddlewarePhase::Before => &mut self.before,
            MiddlewarePhase::After => &mut self.after,
        }
    }
}

impl fmt::Debug for MethodMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodMetadata")
            .field("routes", &self.routes)
            .field("before", &self.before.len())
            .field("after", &self.after.len())
            .finish()
    }
}

/// Identity of a controller type.
///
/// Equality and hashing use the [`TypeId`]; the type path is only carried for
/// logs and error messages.
#[derive(Debug, Clone, Copy)]
pub struct ControllerId {
    type_id: TypeId,
    name: &'static str,
}

impl ControllerId {
    pub fn of<C: 'static>() -> Self {
        ControllerId {
            type_id: TypeId::of::<C>(),
            name: any::type_name::<C>(),
        }
    }

    /// Fully qualified type path, e.g. `app::controllers::HomeController`.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for ControllerId {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ControllerId {}

impl Hash for ControllerId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Display for ControllerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Identity of one action on one controller type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodKey {
    pub controller: ControllerId,
    pub method: &'static str,
}

impl MethodKey {
    /// Key for action `method` on controller type `C`.
    pub fn of<C: Controller>(method: &'static str) -> Self {
        MethodKey {
            controller: ControllerId::of::<C>(),
            method,
        }
    }
}

/// Append-only registry of action metadata.
///
/// An action that was never annotated has no entry at all; [`get`](Self::get)
/// returns `None` for it.
#[derive(Debug, Default)]
pub struct MetadataStore {
    entries: HashMap<MethodKey, MethodMetadata>,
    defined: HashSet<ControllerId>,
}

impl MetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `C`'s declaration table against this store.
    ///
    /// A controller type is defined at most once; later calls return `false`
    /// and leave the store untouched.
    pub fn define<C: Controller>(&mut self) -> bool {
        let id = ControllerId::of::<C>();
        if !self.defined.insert(id) {
            return false;
        }
        log::trace!("defining controller {}", id);
        C::annotate(&mut Declare::new(self));
        true
    }

    /// Whether `C` has been defined in this store.
    pub fn is_defined<C: Controller>(&self) -> bool {
        self.defined.contains(&ControllerId::of::<C>())
    }

    /// Names of every annotated action of `controller`, sorted.
    pub fn annotated(&self, controller: ControllerId) -> Vec<&'static str> {
        let mut names: Vec<_> = self
            .entries
            .keys()
            .filter(|key| key.controller == controller)
            .map(|key| key.method)
            .collect();
        names.sort_unstable();
        names
    }

    /// Metadata for `key`, or `None` when the action is not a route.
    pub fn get(&self, key: &MethodKey) -> Option<&MethodMetadata> {
        self.entries.get(key)
    }

    /// Creates the entry for `key` on first use.
    pub(crate) fn entry(&mut self, key: MethodKey) -> &mut MethodMetadata {
        self.entries.entry(key).or_default()
    }

    /// Number of annotated actions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct HomeController;

    mod admin {
        pub struct HomeController;
    }

    #[test]
    fn test_verb_accepts() {
        assert!(Verb::Get.accepts(&Method::GET));
        assert!(Verb::Get.accepts(&Method::HEAD));
        assert!(!Verb::Get.accepts(&Method::POST));
        assert!(Verb::Post.accepts(&Method::POST));
        assert!(!Verb::Post.accepts(&Method::GET));
        assert!(Verb::All.accepts(&Method::DELETE));
    }

    #[test]
    fn test_verb_display() {
        assert_eq!(Verb::Get.to_string(), "get");
        assert_eq!(Verb::Post.to_string(), "post");
        assert_eq!(Verb::All.to_string(), "all");
    }

    /// A key that was never written has no entry, not an empty one
    #[test]
    fn test_missing_entry_is_none() {
        let store = MetadataStore::new();
        let key = MethodKey {
            controller: ControllerId::of::<HomeController>(),
            method: "index",
        };
        assert!(store.get(&key).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_entry_created_on_first_write() {
        let mut store = MetadataStore::new();
        let key = MethodKey {
            controller: ControllerId::of::<HomeController>(),
            method: "index",
        };
        store.entry(key).routes.push(RouteDeclaration {
            path: "/".into(),
            verb: Verb::Get,
        });
        store.entry(key).routes.push(RouteDeclaration {
            path: "/index".into(),
            verb: Verb::Get,
        });

        let meta = store.get(&key).unwrap();
        assert_eq!(meta.routes.len(), 2);
        assert_eq!(meta.routes[1].path, "/index");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_controller_id_uses_type_identity() {
        let home = ControllerId::of::<HomeController>();
        let admin = ControllerId::of::<admin::HomeController>();

        assert_ne!(home, admin);
        assert_eq!(home, ControllerId::of::<HomeController>());
        assert!(admin.name().ends_with("admin::HomeController"));
        assert_eq!(home.to_string(), home.name());
    }

    #[test]
    fn test_annotated_lists_one_controller() {
        let mut store = MetadataStore::new();
        let home = ControllerId::of::<HomeController>();
        let admin = ControllerId::of::<admin::HomeController>();
        for (controller, method) in [(home, "show"), (home, "index"), (admin, "audit")] {
            store.entry(MethodKey { controller, method }).routes.push(RouteDeclaration {
                path: format!("/{}", method),
                verb: Verb::Get,
            });
        }

        assert_eq!(store.annotated(home), vec!["index", "show"]);
        assert_eq!(store.annotated(admin), vec!["audit"]);
    }
}
