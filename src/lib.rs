#![allow(clippy::return_self_not_must_use)]

//! # Waypost
//!
//! Declarative controller routes, resolved onto a hyper-backed router.
//!
//! Controllers list their actions and annotate them with routes and
//! middleware. At startup a [`Resolver`] walks a directory of module
//! artifacts, loads each module, instantiates its controllers and registers
//! one handler chain per declared route on a [`Router`].
//!
//! ## Example
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use waypost::{get, Actions, Controller, Declare, MetadataStore, ModuleBuilder,
//!               ModuleTable, Next, Outcome, Req, Res, Resolver, Router, Server};
//!
//! #[derive(Default)]
//! struct HomeController;
//!
//! impl HomeController {
//!     fn index(self: &Arc<Self>, _req: Req, res: Res, _next: Next) -> Outcome {
//!         res.json(&serde_json::json!({ "message": "Hello world" })).into()
//!     }
//! }
//!
//! impl Controller for HomeController {
//!     fn actions(table: &mut Actions<Self>) {
//!         table.add("index", Self::index);
//!     }
//!
//!     fn annotate(routes: &mut Declare<'_, Self>) {
//!         routes.action("index", [get("/"), get("/index")]);
//!     }
//! }
//!
//! fn home(module: &mut ModuleBuilder<'_>) {
//!     module.controller::<HomeController>("HomeController");
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let modules = ModuleTable::new().with("home", home);
//!     let mut store = MetadataStore::new();
//!     let mut router = Router::new();
//!     Resolver::new(&mut store, &modules).resolve(Path::new("controllers"), &mut router)?;
//!
//!     Server::bind("127.0.0.1:3000").serve(router).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - `MetadataStore`: per-action route and middleware declarations
//! - `Declare` / annotators: how controllers write into the store
//! - `adapt`: turns ready or deferred action results into one handler shape
//! - `Resolver`: directory walk, module loading, registration
//! - `Router`: `matchit` path matching, oldest matching registration first
//!
//! ## Configuration
//! [`AppConfig`] is read from an optional `waypost` config file and
//! `WAYPOST_`-prefixed environment variables.

pub use crate::adapter::{adapt, Outcome};
pub use crate::annotate::{after, all, before, get, middleware, post, route_for, Annotator, Declare};
pub use crate::config::AppConfig;
pub use crate::controller::{Action, Actions, Controller, ControllerFactory, Instance};
pub use crate::error::{HandlerError, HandlerResult, ResolveError, RouteError, ServeError};
pub use crate::exchange::{Next, Req, Res};
pub use crate::handler::{async_handler, handler_fn, run_chain, ChainEnd, Handler, HandlerFuture};
pub use crate::http::{Body, Bytes, Request, RequestBuilder, Response, ResponseBuilder};
pub use crate::metadata::{
    ControllerId, MetadataStore, MethodKey, MethodMetadata, MiddlewareFactory, MiddlewarePhase,
    RouteDeclaration, Verb,
};
pub use crate::module::{Export, Module, ModuleBuilder, ModuleDefinition, ModuleLoader, ModuleTable};
pub use crate::resolver::{Resolver, CONTROLLER_SUFFIX, MODULE_EXTENSION};
pub use crate::router::{RouteInfo, RouteTarget, Router, DEFAULT_BODY_LIMIT};
pub use crate::server::Server;

mod adapter;
mod annotate;
mod config;
mod controller;
mod error;
mod exchange;
mod handler;
mod http;
mod metadata;
mod module;
mod resolver;
mod router;
mod server;

// Re-export common types
pub use hyper;
