//! End-to-end: controller modules on disk → resolved router → dispatched requests.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use waypost::hyper::StatusCode;
use waypost::{
    after, before, get, middleware, Actions, Body, Controller, Declare, HandlerError,
    MetadataStore, ModuleBuilder, ModuleTable, Next, Outcome, Req, RequestBuilder, Res,
    ResolveError, Resolver, Response, RouteInfo, Router, Verb,
};

fn artifact(dir: &Path, file: &str, module: &str) {
    let path = dir.join(file);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, format!("module = \"{}\"\n", module)).unwrap();
}

fn resolve(dir: &Path, modules: &ModuleTable) -> Result<Router, ResolveError> {
    let mut store = MetadataStore::new();
    let mut router = Router::new();
    Resolver::new(&mut store, modules).resolve(dir, &mut router)?;
    Ok(router)
}

fn request(method: &str, path: &str) -> waypost::Request {
    RequestBuilder::new()
        .method(method)
        .uri(path)
        .body(Body::empty())
        .unwrap()
}

async fn text(response: Response) -> String {
    let bytes = response.into_body().bytes().await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

// --- scenario A -------------------------------------------------------------

#[derive(Default)]
struct PingController;

impl PingController {
    fn ping(self: &Arc<Self>, _req: Req, res: Res, _next: Next) -> Outcome {
        res.json(&serde_json::json!({ "status": "ok" })).into()
    }

    fn internal(self: &Arc<Self>, _req: Req, res: Res, _next: Next) -> Outcome {
        res.send("should never be routed");
        Outcome::done()
    }
}

impl Controller for PingController {
    fn actions(table: &mut Actions<Self>) {
        table.add("ping", Self::ping).add("internal", Self::internal);
    }

    fn annotate(routes: &mut Declare<'_, Self>) {
        routes.action("ping", [get("/ping")]);
    }
}

fn ping_module(module: &mut ModuleBuilder<'_>) {
    module.controller::<PingController>("PingController");
}

#[tokio::test]
async fn ping_controller_serves_only_its_route() {
    let dir = tempfile::tempdir().unwrap();
    artifact(dir.path(), "ping.ctl", "ping");
    let router = resolve(dir.path(), &ModuleTable::new().with("ping", ping_module)).unwrap();

    assert_eq!(
        router.routes(),
        vec![RouteInfo { verb: Verb::Get, path: "/ping".into(), handlers: 1 }]
    );

    let response = router.dispatch(request("GET", "/ping")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_str(&text(response).await).unwrap();
    assert_eq!(body, serde_json::json!({ "status": "ok" }));

    let response = router.dispatch(request("GET", "/internal")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// --- scenario B -------------------------------------------------------------

#[derive(Default)]
struct AliasController {
    hits: AtomicUsize,
}

impl AliasController {
    fn shared(self: &Arc<Self>, _req: Req, res: Res, _next: Next) -> Outcome {
        let n = self.hits.fetch_add(1, Ordering::SeqCst) + 1;
        res.send(format!("hit {}", n));
        Outcome::done()
    }
}

impl Controller for AliasController {
    fn actions(table: &mut Actions<Self>) {
        table.add("shared", Self::shared);
    }

    fn annotate(routes: &mut Declare<'_, Self>) {
        routes.action(
            "shared",
            [
                get("/a"),
                get("/b"),
                before(middleware(|_req, res, next| {
                    res.set_header("x-alias", "yes")?;
                    next.proceed();
                    Ok(())
                })),
            ],
        );
    }
}

#[tokio::test]
async fn two_routes_share_middleware_and_instance() {
    let dir = tempfile::tempdir().unwrap();
    artifact(dir.path(), "alias.ctl", "alias");
    let modules = ModuleTable::new().with("alias", |module| {
        module.controller::<AliasController>("AliasController");
    });
    let router = resolve(dir.path(), &modules).unwrap();

    let routes = router.routes();
    assert_eq!(routes.len(), 2);
    assert!(routes.iter().all(|route| route.handlers == 2));

    let a = router.dispatch(request("GET", "/a")).await.unwrap();
    assert_eq!(a.headers().get("x-alias").unwrap(), "yes");
    assert_eq!(text(a).await, "hit 1");

    let b = router.dispatch(request("GET", "/b")).await.unwrap();
    assert_eq!(b.headers().get("x-alias").unwrap(), "yes");
    assert_eq!(text(b).await, "hit 2");
}

// --- scenario C -------------------------------------------------------------

mod first {
    use super::*;

    #[derive(Default)]
    pub struct DupController;

    impl DupController {
        fn show(self: &Arc<Self>, _req: Req, res: Res, _next: Next) -> Outcome {
            res.send("first");
            Outcome::done()
        }
    }

    impl Controller for DupController {
        fn actions(table: &mut Actions<Self>) {
            table.add("show", Self::show);
        }

        fn annotate(routes: &mut Declare<'_, Self>) {
            routes.action("show", [get("/dup")]);
        }
    }
}

mod second {
    use super::*;

    #[derive(Default)]
    pub struct DupController;

    impl DupController {
        fn show(self: &Arc<Self>, _req: Req, res: Res, _next: Next) -> Outcome {
            res.send("second");
            Outcome::done()
        }
    }

    impl Controller for DupController {
        fn actions(table: &mut Actions<Self>) {
            table.add("show", Self::show);
        }

        fn annotate(routes: &mut Declare<'_, Self>) {
            routes.action("show", [get("/dup")]);
        }
    }
}

#[tokio::test]
async fn same_named_controllers_in_two_files_both_register() {
    let dir = tempfile::tempdir().unwrap();
    artifact(dir.path(), "a/dup.ctl", "first");
    artifact(dir.path(), "b/dup.ctl", "second");
    let modules = ModuleTable::new()
        .with("first", |module| {
            module.controller::<first::DupController>("DupController");
        })
        .with("second", |module| {
            module.controller::<second::DupController>("DupController");
        });
    let router = resolve(dir.path(), &modules).unwrap();

    let routes = router.routes();
    assert_eq!(routes.len(), 2);
    assert!(routes.iter().all(|route| route.path == "/dup"));

    // directories are walked in file-name order, so `a/` registered first
    let response = router.dispatch(request("GET", "/dup")).await.unwrap();
    assert_eq!(text(response).await, "first");
}

// --- chains -----------------------------------------------------------------

#[derive(Default)]
struct PipelineController;

fn stamp(tag: &'static str) -> impl Fn() -> waypost::Handler + Send + Sync + 'static {
    middleware(move |_req, res, next| {
        let trail = res
            .header("x-trail")
            .and_then(|v| v.to_str().ok().map(str::to_string))
            .unwrap_or_default();
        res.set_header("x-trail", &format!("{}{}", trail, tag))?;
        next.proceed();
        Ok(())
    })
}

impl PipelineController {
    fn handoff(self: &Arc<Self>, _req: Req, res: Res, next: Next) -> Outcome {
        Outcome::deferred(async move {
            tokio::task::yield_now().await;
            res.send("pipeline");
            next.proceed();
            Ok(())
        })
    }

    fn reject(self: &Arc<Self>, _req: Req, _res: Res, _next: Next) -> Outcome {
        Outcome::deferred(async { Err(HandlerError::failed("rejected")) })
    }
}

impl Controller for PipelineController {
    fn actions(table: &mut Actions<Self>) {
        table.add("handoff", Self::handoff).add("reject", Self::reject);
    }

    fn annotate(routes: &mut Declare<'_, Self>) {
        routes
            .action(
                "handoff",
                [
                    get("/pipeline"),
                    get("/pipeline"),
                    before(stamp("1")),
                    before(stamp("2")),
                    after(stamp("3")),
                ],
            )
            .action("reject", [get("/reject")]);
    }
}

#[tokio::test]
async fn chains_run_in_declared_order() {
    let dir = tempfile::tempdir().unwrap();
    artifact(dir.path(), "pipeline.ctl", "pipeline");
    let modules = ModuleTable::new().with("pipeline", |module| {
        module.controller::<PipelineController>("PipelineController");
    });
    let router = resolve(dir.path(), &modules).unwrap();

    // stacked identical declarations are two registrations
    let routes = router.routes();
    assert_eq!(routes.iter().filter(|r| r.path == "/pipeline").count(), 2);
    assert!(routes
        .iter()
        .filter(|r| r.path == "/pipeline")
        .all(|r| r.handlers == 4));

    // the deferred action proceeds, so the after-middleware runs and then the
    // chain falls through to the duplicate registration, which appends again
    let response = router.dispatch(request("GET", "/pipeline")).await.unwrap();
    assert_eq!(response.headers().get("x-trail").unwrap(), "123123");
    assert_eq!(text(response).await, "pipeline");
}

#[tokio::test]
async fn deferred_rejection_reaches_the_router() {
    let dir = tempfile::tempdir().unwrap();
    artifact(dir.path(), "pipeline.ctl", "pipeline");
    let modules = ModuleTable::new().with("pipeline", |module| {
        module.controller::<PipelineController>("PipelineController");
    });
    let router = resolve(dir.path(), &modules).unwrap();

    let err = router.dispatch(request("GET", "/reject")).await.unwrap_err();
    assert_eq!(err.to_string(), "handler failed: rejected");

    let response = router.handle(request("GET", "/reject")).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[test]
fn malformed_artifact_aborts_resolution() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("broken.ctl"), "module = ").unwrap();

    let err = resolve(dir.path(), &ModuleTable::new().with("ping", ping_module))
        .err()
        .unwrap();
    assert!(matches!(err, ResolveError::Artifact { .. }));
}
