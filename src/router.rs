//! Route registration and dispatch.
//!
//! Registrations are kept in the order they were made. A path pattern may be
//! registered any number of times. Dispatch tries every registration whose
//! pattern matches the request path, oldest first, whatever the patterns look
//! like, and only moves on when a whole chain calls `next.proceed()`.

use std::collections::HashMap;
use std::sync::Arc;

use hyper::StatusCode;

use crate::error::{HandlerError, RouteError};
use crate::exchange::{Req, Res};
use crate::handler::{run_chain, ChainEnd, Handler};
use crate::http::{Body, Request, Response};
use crate::metadata::Verb;

/// Anything routes can be registered on.
///
/// Each call receives the path followed by the handler chain for it.
pub trait RouteTarget {
    fn get(&mut self, path: &str, handlers: Vec<Handler>) -> Result<(), RouteError>;

    fn post(&mut self, path: &str, handlers: Vec<Handler>) -> Result<(), RouteError>;

    fn all(&mut self, path: &str, handlers: Vec<Handler>) -> Result<(), RouteError>;

    /// Forwards to the registration call for `verb`.
    fn register(&mut self, verb: Verb, path: &str, handlers: Vec<Handler>) -> Result<(), RouteError> {
        match verb {
            Verb::Get => self.get(path, handlers),
            Verb::Post => self.post(path, handlers),
            Verb::All => self.all(path, handlers),
        }
    }
}

/// A registered route as seen from the outside.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteInfo {
    pub verb: Verb,
    pub path: String,
    /// Number of handlers in the chain.
    pub handlers: usize,
}

struct Entry {
    verb: Verb,
    path: String,
    /// index into `Router::matchers`
    pattern: usize,
    chain: Arc<[Handler]>,
}

/// Request bodies larger than this are refused unless the router is configured otherwise.
pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Path router backed by `matchit`.
///
/// All patterns share one `matchit` tree, which rejects malformed and
/// conflicting patterns at registration. Each distinct pattern also gets a
/// tree of its own so dispatch can test registrations one by one.
pub struct Router {
    paths: matchit::Router<()>,
    /// pattern -> index into `matchers`
    patterns: HashMap<String, usize>,
    matchers: Vec<matchit::Router<()>>,
    entries: Vec<Entry>,
    body_limit: usize,
}

impl Router {
    pub fn new() -> Self {
        Router {
            paths: matchit::Router::new(),
            patterns: HashMap::new(),
            matchers: Vec::new(),
            entries: Vec::new(),
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    /// Caps the number of request body bytes collected before dispatch.
    pub fn with_body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }

    pub fn body_limit(&self) -> usize {
        self.body_limit
    }

    fn insert(&mut self, verb: Verb, path: &str, handlers: Vec<Handler>) -> Result<(), RouteError> {
        if handlers.is_empty() {
            return Err(RouteError::EmptyChain(path.to_string()));
        }

        let pattern = match self.patterns.get(path) {
            Some(&pattern) => pattern,
            None => {
                let invalid = |source| RouteError::InvalidPath {
                    path: path.to_string(),
                    source,
                };
                self.paths.insert(path, ()).map_err(invalid)?;
                let mut matcher = matchit::Router::new();
                matcher.insert(path, ()).map_err(invalid)?;

                let pattern = self.matchers.len();
                self.matchers.push(matcher);
                self.patterns.insert(path.to_string(), pattern);
                pattern
            }
        };

        log::debug!("registered {} {} ({} handlers)", verb, path, handlers.len());
        self.entries.push(Entry {
            verb,
            path: path.to_string(),
            pattern,
            chain: handlers.into(),
        });
        Ok(())
    }

    /// Every registration, in the order it was made.
    pub fn routes(&self) -> Vec<RouteInfo> {
        self.entries
            .iter()
            .map(|entry| RouteInfo {
                verb: entry.verb,
                path: entry.path.clone(),
                handlers: entry.chain.len(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parameters captured by `pattern` from `path`, or `None` if it does not match.
    fn capture(&self, pattern: usize, path: &str) -> Option<Vec<(String, String)>> {
        let matched = self.matchers[pattern].at(path).ok()?;
        Some(
            matched
                .params
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
        )
    }

    /// Runs `request` through the matching chains.
    ///
    /// Handler errors are returned as-is. When every matching chain proceeds
    /// past its end, whatever was written so far is the response; if nothing
    /// was written the result is `404 Not Found`.
    pub async fn dispatch(&self, request: Request) -> Result<Response, HandlerError> {
        let req = Req::from_request(request, self.body_limit).await?;
        let res = Res::new();

        for entry in &self.entries {
            if !entry.verb.accepts(req.method()) {
                continue;
            }
            let Some(params) = self.capture(entry.pattern, req.path()) else {
                continue;
            };
            let scoped = req.with_params(params);
            if run_chain(&entry.chain, &scoped, &res).await? == ChainEnd::Handled {
                return Ok(res.into_response());
            }
        }

        if res.is_sent() {
            return Ok(res.into_response());
        }
        log::trace!("no route handled {} {}", req.method(), req.path());
        res.status(StatusCode::NOT_FOUND);
        res.send("Not Found");
        Ok(res.into_response())
    }

    /// Like [`dispatch`](Self::dispatch), but answers with an error status when
    /// dispatch fails: `413` for oversized bodies, `500` otherwise.
    pub async fn handle(&self, request: Request) -> Response {
        let target = format!("{} {}", request.method(), request.uri().path());
        match self.dispatch(request).await {
            Ok(response) => response,
            Err(HandlerError::PayloadTooLarge { limit }) => {
                log::debug!("request {} refused: body over {} bytes", target, limit);
                error_response(StatusCode::PAYLOAD_TOO_LARGE, "Payload Too Large")
            }
            Err(err) => {
                log::error!("request {} failed: {}", target, err);
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
            }
        }
    }
}

fn error_response(status: StatusCode, body: &'static str) -> Response {
    let mut response = Response::new(Body::new(body));
    *response.status_mut() = status;
    response
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl RouteTarget for Router {
    fn get(&mut self, path: &str, handlers: Vec<Handler>) -> Result<(), RouteError> {
        self.insert(Verb::Get, path, handlers)
    }

    fn post(&mut self, path: &str, handlers: Vec<Handler>) -> Result<(), RouteError> {
        self.insert(Verb::Post, path, handlers)
    }

    fn all(&mut self, path: &str, handlers: Vec<Handler>) -> Result<(), RouteError> {
        self.insert(Verb::All, path, handlers)
    }
}
