use core::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use hyper::body::{HttpBody, SizeHint};

pub use hyper::body::Bytes;

/// An HTTP request type that wraps hyper's Request with our custom Body type.
pub type Request = hyper::Request<Body>;

/// An HTTP response.
///
/// Handlers rarely build one directly; they write through [`Res`](crate::Res)
/// and the router assembles the response when the chain ends.
///
/// ```
/// # use waypost::{Response, Body};
/// let response = Response::new(Body::new("Hello world!"));
/// ```
pub type Response = hyper::Response<Body>;

/// A builder for constructing HTTP requests and responses with a fluent API.
///
/// ```rust
/// use waypost::{ResponseBuilder, Body};
///
/// let response = ResponseBuilder::new()
///     .status(404)
///     .header("X-Custom-Foo", "Bar")
///     .body(Body::new("Page not found."))
///     .unwrap();
/// ```
pub type ResponseBuilder = hyper::http::response::Builder;

/// Builder for requests handed to [`Router::dispatch`](crate::Router::dispatch).
pub type RequestBuilder = hyper::http::request::Builder;

/// A streaming HTTP body used for both requests and responses.
///
/// ```rust
/// # use waypost::Body;
/// let string = Body::new("Hello world!");
/// let bytes = Body::new(vec![0, 1, 0, 1, 0]);
/// ```
pub struct Body(pub(crate) hyper::Body);

impl Body {
    /// Create a body from a string or bytes.
    pub fn new(data: impl Into<Bytes>) -> Body {
        Body(hyper::Body::from(data.into()))
    }

    /// Create an empty body.
    pub fn empty() -> Body {
        Body(hyper::Body::empty())
    }

    /// Collects the whole body into memory.
    pub async fn bytes(self) -> Result<Bytes, hyper::Error> {
        hyper::body::to_bytes(self.0).await
    }
}

impl<T> From<T> for Body
where
    Bytes: From<T>,
{
    fn from(data: T) -> Body {
        Body::new(data)
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::empty()
    }
}

impl HttpBody for Body {
    type Data = Bytes;
    type Error = hyper::Error;

    fn poll_data(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Self::Data, Self::Error>>> {
        Pin::new(&mut self.0).poll_data(cx)
    }

    fn is_end_stream(&self) -> bool {
        self.0.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.0.size_hint()
    }

    fn poll_trailers(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<hyper::HeaderMap>, Self::Error>> {
        Pin::new(&mut self.0).poll_trailers(cx)
    }
}
