use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use hyper::server::conn::AddrStream;
use hyper::service::{make_service_fn, service_fn};

use crate::config::AppConfig;
use crate::error::ServeError;
use crate::http::Body;
use crate::router::Router;

/// Thin hyper bootstrap around a resolved [`Router`].
///
/// ```no_run
/// use waypost::{Router, Server};
///
/// #[tokio::main]
/// async fn main() -> Result<(), waypost::ServeError> {
///     Server::bind("127.0.0.1:3000").serve(Router::new()).await
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Server {
    addr: String,
    http1_keep_alive: bool,
    #[cfg(feature = "http2")]
    http2_only: bool,
}

impl Server {
    pub fn bind(addr: impl Into<String>) -> Self {
        Server {
            addr: addr.into(),
            http1_keep_alive: true,
            #[cfg(feature = "http2")]
            http2_only: false,
        }
    }

    /// Server bound to the configured host and port.
    pub fn from_config(config: &AppConfig) -> Self {
        Server {
            addr: config.bind_address(),
            http1_keep_alive: config.http1_keep_alive,
            #[cfg(feature = "http2")]
            http2_only: config.http2_only,
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Accepts connections until the process stops, handing each request to `router`.
    pub async fn serve(self, router: Router) -> Result<(), ServeError> {
        let addr: SocketAddr = self.addr.parse().map_err(|source| ServeError::Addr {
            addr: self.addr.clone(),
            source,
        })?;
        let router = Arc::new(router);

        let make_service = make_service_fn(move |conn: &AddrStream| {
            let router = router.clone();
            log::trace!("connection from {}", conn.remote_addr());
            async move {
                Ok::<_, Infallible>(service_fn(move |request: hyper::Request<hyper::Body>| {
                    let router = router.clone();
                    async move { Ok::<_, Infallible>(router.handle(request.map(Body)).await) }
                }))
            }
        });

        let builder = hyper::Server::try_bind(&addr)?.http1_keepalive(self.http1_keep_alive);
        #[cfg(feature = "http2")]
        let builder = builder.http2_only(self.http2_only);

        log::info!("listening on http://{}", addr);
        builder.serve(make_service).await?;
        Ok(())
    }
}
