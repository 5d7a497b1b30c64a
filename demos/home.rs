//! A small application resolved from `demos/controllers`.
//!
//! Run with `WAYPOST_CONTROLLERS_DIR=demos/controllers`, then try:
//!   - GET /           → {"message":"Hello world"}
//!   - GET /index      → same action, second route
//!   - GET /health     → {"status":"ok"} with an `x-served-by` header
//!   - POST /echo      → the JSON body, returned after a short delay

use std::sync::Arc;
use std::time::Duration;

use waypost::{
    before, get, middleware, post, Actions, AppConfig, Controller, Declare, MetadataStore,
    ModuleBuilder, ModuleTable, Next, Outcome, Req, Res, Resolver, Router, Server,
};

#[derive(Default)]
struct HomeController;

impl HomeController {
    fn index(self: &Arc<Self>, _req: Req, res: Res, _next: Next) -> Outcome {
        res.json(&serde_json::json!({ "message": "Hello world" })).into()
    }
}

impl Controller for HomeController {
    fn actions(table: &mut Actions<Self>) {
        table.add("index", Self::index);
    }

    fn annotate(routes: &mut Declare<'_, Self>) {
        routes.action("index", [get("/"), get("/index")]);
    }
}

#[derive(Default)]
struct HealthController;

impl HealthController {
    fn health(self: &Arc<Self>, _req: Req, res: Res, _next: Next) -> Outcome {
        res.json(&serde_json::json!({ "status": "ok" })).into()
    }

    fn echo(self: &Arc<Self>, req: Req, res: Res, _next: Next) -> Outcome {
        Outcome::deferred(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let body: serde_json::Value = req.json()?;
            res.json(&body)
        })
    }
}

impl Controller for HealthController {
    fn actions(table: &mut Actions<Self>) {
        table.add("health", Self::health).add("echo", Self::echo);
    }

    fn annotate(routes: &mut Declare<'_, Self>) {
        routes
            .action(
                "health",
                [
                    get("/health"),
                    before(middleware(|_req, res, next| {
                        res.set_header("x-served-by", "waypost")?;
                        next.proceed();
                        Ok(())
                    })),
                ],
            )
            .action("echo", [post("/echo")]);
    }
}

fn home(module: &mut ModuleBuilder<'_>) {
    module.controller::<HomeController>("HomeController");
}

fn health(module: &mut ModuleBuilder<'_>) {
    module.controller::<HealthController>("HealthController");
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "waypost=debug".into()),
        )
        .init();

    if let Err(err) = run().await {
        log::error!("{}", err);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::new()?;
    let modules = ModuleTable::new().with("home", home).with("health", health);

    let mut store = MetadataStore::new();
    let mut router = Router::new().with_body_limit(config.max_body_size);
    Resolver::new(&mut store, &modules)
        .configure(&config)
        .resolve(&config.controllers_dir, &mut router)?;

    for route in router.routes() {
        log::info!("{} {} ({} handlers)", route.verb, route.path, route.handlers);
    }

    Server::from_config(&config).serve(router).await?;
    Ok(())
}
