//! The `(req, res, next)` triple every handler in a chain receives.
//!
//! All three are cheap handles around shared state, so a handler can move
//! clones into a deferred future without borrowing from the dispatcher.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use hyper::body::HttpBody;
use hyper::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use hyper::{HeaderMap, Method, StatusCode, Uri};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{HandlerError, HandlerResult};
use crate::http::{Body, Bytes, Request, Response};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A read-only view of the incoming request with its body already collected.
#[derive(Clone, Debug)]
pub struct Req {
    head: Arc<Head>,
    params: Arc<[(String, String)]>,
}

#[derive(Debug)]
struct Head {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
}

impl Req {
    pub fn new(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Self {
        Req {
            head: Arc::new(Head {
                method,
                uri,
                headers,
                body,
            }),
            params: Arc::from(Vec::new()),
        }
    }

    /// Collects the body of `request`, refusing more than `limit` bytes.
    pub async fn from_request(request: Request, limit: usize) -> Result<Self, HandlerError> {
        let (parts, mut body) = request.into_parts();
        let too_large = HandlerError::PayloadTooLarge { limit };
        if body.size_hint().lower() > limit as u64 {
            return Err(too_large);
        }

        let mut collected = Vec::new();
        while let Some(chunk) = body.data().await {
            let chunk = chunk?;
            if collected.len() + chunk.len() > limit {
                return Err(too_large);
            }
            collected.extend_from_slice(&chunk);
        }
        Ok(Req::new(parts.method, parts.uri, parts.headers, Bytes::from(collected)))
    }

    /// Same request, carrying the parameters captured by a matched route.
    pub(crate) fn with_params(&self, params: Vec<(String, String)>) -> Req {
        Req {
            head: self.head.clone(),
            params: Arc::from(params),
        }
    }

    pub fn method(&self) -> &Method {
        &self.head.method
    }

    pub fn uri(&self) -> &Uri {
        &self.head.uri
    }

    pub fn path(&self) -> &str {
        self.head.uri.path()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.head.headers
    }

    /// Header value as text, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Route parameter captured from the path, e.g. `id` for `/users/:id`.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn body(&self) -> &Bytes {
        &self.head.body
    }

    /// Decodes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, HandlerError> {
        Ok(serde_json::from_slice(&self.head.body)?)
    }
}

/// A response under construction, shared by every handler in a chain.
#[derive(Clone, Default)]
pub struct Res {
    draft: Arc<Mutex<Draft>>,
}

#[derive(Default)]
struct Draft {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    sent: bool,
}

impl Res {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self, status: StatusCode) -> &Self {
        lock(&self.draft).status = status;
        self
    }

    pub fn current_status(&self) -> StatusCode {
        lock(&self.draft).status
    }

    /// Sets a header, replacing any previous value under the same name.
    pub fn set_header(&self, name: &str, value: &str) -> Result<&Self, HandlerError> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| HandlerError::failed(format!("invalid header name `{}`: {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| HandlerError::failed(format!("invalid header value for `{}`: {}", name, e)))?;
        lock(&self.draft).headers.insert(name, value);
        Ok(self)
    }

    pub fn header(&self, name: &str) -> Option<HeaderValue> {
        lock(&self.draft).headers.get(name).cloned()
    }

    /// Writes the body and marks the response as sent.
    pub fn send(&self, body: impl Into<Bytes>) {
        let mut draft = lock(&self.draft);
        draft.body = body.into();
        draft.sent = true;
    }

    /// Serializes `value` as the JSON body.
    pub fn json<T: Serialize + ?Sized>(&self, value: &T) -> HandlerResult {
        let body = serde_json::to_vec(value)?;
        let mut draft = lock(&self.draft);
        draft
            .headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        draft.body = Bytes::from(body);
        draft.sent = true;
        Ok(())
    }

    /// Whether a body has been written.
    pub fn is_sent(&self) -> bool {
        lock(&self.draft).sent
    }

    /// Builds the final response from the current draft.
    pub fn into_response(&self) -> Response {
        let draft = lock(&self.draft);
        let mut response = Response::new(Body::new(draft.body.clone()));
        *response.status_mut() = draft.status;
        *response.headers_mut() = draft.headers.clone();
        response
    }
}

/// What a handler asked the chain to do once it finished.
#[derive(Debug)]
pub(crate) enum Signal {
    Proceed,
    Fail(HandlerError),
}

/// Continuation handle. A handler that neither proceeds nor fails ends the chain.
#[derive(Clone, Default)]
pub struct Next {
    signal: Arc<Mutex<Option<Signal>>>,
}

impl Next {
    pub fn new() -> Self {
        Self::default()
    }

    /// Passes control to the next handler in the chain.
    pub fn proceed(&self) {
        *lock(&self.signal) = Some(Signal::Proceed);
    }

    /// Aborts the chain; dispatch returns `err`.
    pub fn fail(&self, err: HandlerError) {
        *lock(&self.signal) = Some(Signal::Fail(err));
    }

    pub fn is_called(&self) -> bool {
        lock(&self.signal).is_some()
    }

    pub(crate) fn take(&self) -> Option<Signal> {
        lock(&self.signal).take()
    }
}
