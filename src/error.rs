use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while turning declared controller metadata into router registrations.
///
/// Every variant is fatal: resolution stops at the first one and the caller is
/// expected to abort startup.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Error while walking the controllers directory
    #[error("failed to walk controllers directory: {0}")]
    Walk(#[from] walkdir::Error),

    /// A module artifact could not be read or parsed
    #[error("malformed module artifact {}: {source}", .path.display())]
    Artifact {
        path: PathBuf,
        #[source]
        source: config::ConfigError,
    },

    /// An artifact names a module that no definition was registered for
    #[error("artifact {} names unknown module `{module}`", .path.display())]
    UnknownModule { path: PathBuf, module: String },

    /// A controller lists two actions under the same name
    #[error("controller {controller} lists action `{action}` more than once")]
    DuplicateAction {
        controller: &'static str,
        action: &'static str,
    },

    /// A controller annotates a name missing from its action table
    #[error("controller {controller} annotates `{action}`, which is not one of its actions")]
    UnknownAction {
        controller: &'static str,
        action: &'static str,
    },

    /// The router rejected a registration
    #[error("failed to register {verb} {path}: {source}")]
    Register {
        verb: crate::Verb,
        path: String,
        #[source]
        source: RouteError,
    },
}

/// Errors returned by a [`RouteTarget`](crate::RouteTarget) when a registration is refused.
#[derive(Debug, Error)]
pub enum RouteError {
    /// The path is malformed or conflicts with an incompatible pattern
    #[error("invalid route path `{path}`: {source}")]
    InvalidPath {
        path: String,
        #[source]
        source: matchit::InsertError,
    },

    /// A registration call carried no handlers
    #[error("route `{0}` has no handlers")]
    EmptyChain(String),
}

/// Errors produced while a request travels through a handler chain.
///
/// The crate never recovers from these; they surface to whoever drives the
/// dispatch.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// A handler reported a failure with a message
    #[error("handler failed: {0}")]
    Failed(String),

    /// JSON encoding or decoding failed
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The request body could not be collected
    #[error("body error: {0}")]
    Body(#[from] hyper::Error),

    /// The request body exceeds the router's limit
    #[error("request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    /// Any other error raised by application code
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl HandlerError {
    /// Shorthand for [`HandlerError::Failed`].
    pub fn failed(message: impl Into<String>) -> Self {
        HandlerError::Failed(message.into())
    }
}

/// Errors raised by the server bootstrap.
#[derive(Debug, Error)]
pub enum ServeError {
    /// The bind address could not be parsed
    #[error("invalid bind address `{addr}`: {source}")]
    Addr {
        addr: String,
        #[source]
        source: std::net::AddrParseError,
    },

    /// The underlying hyper server failed
    #[error("server error: {0}")]
    Hyper(#[from] hyper::Error),

    /// Wrapper for standard I/O errors
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Type alias for Results using ResolveError as the error type
pub type Result<T> = std::result::Result<T, ResolveError>;

/// Outcome of a single handler invocation
pub type HandlerResult = std::result::Result<(), HandlerError>;
