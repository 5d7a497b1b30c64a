//! Controller modules and how they are loaded from artifacts on disk.
//!
//! A module is an ordered list of named exports. Loading a module defines each
//! exported controller in the [`MetadataStore`], the same way defining a
//! controller type attaches its declarations.

use std::collections::HashMap;
use std::path::Path;

use crate::controller::{Controller, ControllerFactory};
use crate::error::{ResolveError, Result};
use crate::metadata::MetadataStore;

/// A named binding exported by a module.
#[derive(Debug, Clone, Copy)]
pub enum Export {
    Controller(ControllerFactory),
    /// Anything that is not a controller. Never instantiated.
    Value,
}

/// The exports of one loaded module, in export order.
#[derive(Debug, Default)]
pub struct Module {
    exports: Vec<(String, Export)>,
}

impl Module {
    pub fn exports(&self) -> impl Iterator<Item = (&str, &Export)> {
        self.exports.iter().map(|(name, export)| (name.as_str(), export))
    }

    pub fn len(&self) -> usize {
        self.exports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exports.is_empty()
    }
}

/// Collects the exports of a module while it is being defined.
pub struct ModuleBuilder<'s> {
    store: &'s mut MetadataStore,
    module: Module,
}

impl<'s> ModuleBuilder<'s> {
    pub fn new(store: &'s mut MetadataStore) -> Self {
        ModuleBuilder {
            store,
            module: Module::default(),
        }
    }

    /// Defines `C` and exports it under `name`.
    ///
    /// The same type may be exported more than once, under any names; its
    /// declarations are only recorded the first time.
    pub fn controller<C: Controller>(&mut self, name: impl Into<String>) -> &mut Self {
        self.store.define::<C>();
        self.module
            .exports
            .push((name.into(), Export::Controller(ControllerFactory::of::<C>())));
        self
    }

    /// Exports a non-controller binding under `name`.
    pub fn value(&mut self, name: impl Into<String>) -> &mut Self {
        self.module.exports.push((name.into(), Export::Value));
        self
    }

    pub fn finish(self) -> Module {
        self.module
    }
}

/// Turns a module artifact into its exports.
pub trait ModuleLoader {
    /// Loads the artifact at `path`, defining its controllers in `store`.
    fn load(&self, path: &Path, store: &mut MetadataStore) -> Result<Module>;
}

/// Body of a module: declares its exports.
pub type ModuleDefinition = fn(&mut ModuleBuilder<'_>);

/// Loader backed by a table of module definitions registered by name.
///
/// Each artifact is a small TOML document naming the module it stands for:
///
/// ```toml
/// module = "home"
/// ```
#[derive(Default, Clone)]
pub struct ModuleTable {
    modules: HashMap<String, ModuleDefinition>,
}

impl ModuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `definition` under `name`, replacing any previous one.
    pub fn register(&mut self, name: impl Into<String>, definition: ModuleDefinition) -> &mut Self {
        self.modules.insert(name.into(), definition);
        self
    }

    pub fn with(mut self, name: impl Into<String>, definition: ModuleDefinition) -> Self {
        self.register(name, definition);
        self
    }

    fn module_name(path: &Path) -> Result<String> {
        let artifact = |source| ResolveError::Artifact {
            path: path.to_path_buf(),
            source,
        };
        config::Config::builder()
            .add_source(config::File::from(path).format(config::FileFormat::Toml))
            .build()
            .map_err(artifact)?
            .get_string("module")
            .map_err(artifact)
    }
}

impl std::fmt::Debug for ModuleTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.modules.keys()).finish()
    }
}

impl ModuleLoader for ModuleTable {
    fn load(&self, path: &Path, store: &mut MetadataStore) -> Result<Module> {
        let name = Self::module_name(path)?;
        let definition = self
            .modules
            .get(&name)
            .ok_or_else(|| ResolveError::UnknownModule {
                path: path.to_path_buf(),
                module: name.clone(),
            })?;

        log::debug!("loading module `{}` from {}", name, path.display());
        let mut builder = ModuleBuilder::new(store);
        definition(&mut builder);
        Ok(builder.finish())
    }
}
