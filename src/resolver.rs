//! Turns controller modules found under a directory into router registrations.
//!
//! Resolution is a single pass:
//!
//! ```text
//! walk directory (files with the module extension)
//!     → load module (defines its controllers in the MetadataStore)
//!     → exports ending in the controller suffix, once per name per file
//!     → instantiate controller
//!     → for each action with metadata, for each route:
//!           register [before..., adapted action, after...]
//! ```
//!
//! Registration order follows that traversal. Nothing is reordered or
//! de-duplicated across actions; the router's own precedence decides which
//! of several registrations for one path answers.

use std::collections::HashSet;
use std::path::Path;

use walkdir::WalkDir;

use crate::config::AppConfig;
use crate::controller::Instance;
use crate::error::{ResolveError, Result};
use crate::handler::Handler;
use crate::metadata::{MetadataStore, MethodKey, MethodMetadata};
use crate::module::{Export, ModuleLoader};
use crate::router::RouteTarget;

/// Default extension of module artifacts.
pub const MODULE_EXTENSION: &str = "ctl";

/// Default suffix an export name needs to be treated as a controller.
pub const CONTROLLER_SUFFIX: &str = "Controller";

/// One-shot resolver over a metadata store and a module loader.
pub struct Resolver<'a, L> {
    store: &'a mut MetadataStore,
    loader: &'a L,
    extension: String,
    suffix: String,
}

impl<'a, L: ModuleLoader> Resolver<'a, L> {
    pub fn new(store: &'a mut MetadataStore, loader: &'a L) -> Self {
        Resolver {
            store,
            loader,
            extension: MODULE_EXTENSION.to_string(),
            suffix: CONTROLLER_SUFFIX.to_string(),
        }
    }

    /// Takes the module extension and controller suffix from `config`.
    pub fn configure(mut self, config: &AppConfig) -> Self {
        self.extension = config.module_extension.clone();
        self.suffix = config.controller_suffix.clone();
        self
    }

    pub fn extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// Registers every declared route found under `dir` on `router`.
    ///
    /// Stops at the first error; routes registered before it stay registered.
    pub fn resolve<R: RouteTarget + ?Sized>(&mut self, dir: &Path, router: &mut R) -> Result<()> {
        log::info!("resolving controllers under {}", dir.display());

        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() || !self.is_artifact(entry.path()) {
                continue;
            }
            self.resolve_file(entry.path(), router)?;
        }
        Ok(())
    }

    fn is_artifact(&self, path: &Path) -> bool {
        path.extension()
            .map_or(false, |ext| ext == self.extension.as_str())
    }

    fn resolve_file<R: RouteTarget + ?Sized>(&mut self, path: &Path, router: &mut R) -> Result<()> {
        let module = self.loader.load(path, &mut *self.store)?;
        let mut seen: HashSet<&str> = HashSet::new();

        for (name, export) in module.exports() {
            if !name.ends_with(self.suffix.as_str()) {
                continue;
            }
            if !seen.insert(name) {
                log::debug!("{}: export {} already resolved in this file", path.display(), name);
                continue;
            }
            let factory = match export {
                Export::Controller(factory) => factory,
                Export::Value => {
                    log::debug!("{}: export {} is not a controller", path.display(), name);
                    continue;
                }
            };

            let instance = factory.instantiate();
            self.register_instance(instance.as_ref(), router)?;
        }
        Ok(())
    }

    fn register_instance<R: RouteTarget + ?Sized>(&self, instance: &dyn Instance, router: &mut R) -> Result<()> {
        let controller = instance.controller_id();
        let actions = instance.action_names();
        self.check_actions(instance, &actions)?;

        for method in actions {
            let key = MethodKey { controller, method };
            let Some(meta) = self.store.get(&key) else {
                log::trace!("{}::{} has no routes", controller, method);
                continue;
            };
            let Some(handler) = instance.bind(method) else {
                continue;
            };
            register_routes(meta, handler, router)?;
        }
        Ok(())
    }

    /// Every action name is listed once and every annotated name is listed.
    fn check_actions(&self, instance: &dyn Instance, actions: &[&'static str]) -> Result<()> {
        let controller = instance.controller_id();
        let mut listed = HashSet::new();
        for &action in actions {
            if !listed.insert(action) {
                return Err(ResolveError::DuplicateAction {
                    controller: controller.name(),
                    action,
                });
            }
        }

        match self
            .store
            .annotated(controller)
            .into_iter()
            .find(|action| !listed.contains(action))
        {
            Some(action) => Err(ResolveError::UnknownAction {
                controller: controller.name(),
                action,
            }),
            None => Ok(()),
        }
    }
}

/// Registers one chain per declared route of a single action.
fn register_routes<R: RouteTarget + ?Sized>(meta: &MethodMetadata, handler: Handler, router: &mut R) -> Result<()> {
    for route in &meta.routes {
        let chain: Vec<Handler> = meta
            .before
            .iter()
            .map(|factory| factory())
            .chain(std::iter::once(handler.clone()))
            .chain(meta.after.iter().map(|factory| factory()))
            .collect();

        router
            .register(route.verb, &route.path, chain)
            .map_err(|source| ResolveError::Register {
                verb: route.verb,
                path: route.path.clone(),
                source,
            })?;
    }
    Ok(())
}
