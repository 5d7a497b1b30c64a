use std::future::Future;
use std::sync::Arc;

use futures::future::{self, BoxFuture, FutureExt};

use crate::error::HandlerResult;
use crate::exchange::{Next, Req, Res, Signal};

/// Future returned by every handler.
pub type HandlerFuture = BoxFuture<'static, HandlerResult>;

/// A request-handling function with the `(req, res, next)` signature.
///
/// Middleware, adapted controller actions and anything else registered on a
/// route share this one shape.
pub type Handler = Arc<dyn Fn(Req, Res, Next) -> HandlerFuture + Send + Sync>;

/// Wraps a synchronous closure as a [`Handler`].
///
/// The returned future is already complete when the handler returns.
pub fn handler_fn<F>(f: F) -> Handler
where
    F: Fn(&Req, &Res, &Next) -> HandlerResult + Send + Sync + 'static,
{
    Arc::new(move |req, res, next| future::ready(f(&req, &res, &next)).boxed())
}

/// Wraps an async closure as a [`Handler`].
pub fn async_handler<F, Fut>(f: F) -> Handler
where
    F: Fn(Req, Res, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(move |req, res, next| f(req, res, next).boxed())
}

/// How a chain run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainEnd {
    /// A handler finished without calling `next`.
    Handled,
    /// Every handler called `next.proceed()`.
    Exhausted,
}

/// Runs `chain` in order, stopping at the first handler that does not proceed.
///
/// Errors returned by a handler or passed to `next.fail` end the run.
pub async fn run_chain(chain: &[Handler], req: &Req, res: &Res) -> Result<ChainEnd, crate::HandlerError> {
    for handler in chain {
        let next = Next::new();
        handler(req.clone(), res.clone(), next.clone()).await?;
        match next.take() {
            Some(Signal::Proceed) => continue,
            Some(Signal::Fail(err)) => return Err(err),
            None => return Ok(ChainEnd::Handled),
        }
    }
    Ok(ChainEnd::Exhausted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HandlerError;
    use hyper::{HeaderMap, Method, Uri};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn req() -> Req {
        Req::new(Method::GET, Uri::from_static("/"), HeaderMap::new(), Default::default())
    }

    fn counting(counter: Arc<AtomicUsize>, proceed: bool) -> Handler {
        handler_fn(move |_req, _res, next| {
            counter.fetch_add(1, Ordering::SeqCst);
            if proceed {
                next.proceed();
            }
            Ok(())
        })
    }

    #[tokio::test]
    async fn test_chain_stops_without_next() {
        let hits = Arc::new(AtomicUsize::new(0));
        let chain = vec![
            counting(hits.clone(), true),
            counting(hits.clone(), false),
            counting(hits.clone(), true),
        ];

        let end = run_chain(&chain, &req(), &Res::new()).await.unwrap();
        assert_eq!(end, ChainEnd::Handled);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_chain_exhausted() {
        let hits = Arc::new(AtomicUsize::new(0));
        let chain = vec![counting(hits.clone(), true), counting(hits.clone(), true)];

        let end = run_chain(&chain, &req(), &Res::new()).await.unwrap();
        assert_eq!(end, ChainEnd::Exhausted);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_chain_next_fail() {
        let hits = Arc::new(AtomicUsize::new(0));
        let chain = vec![
            handler_fn(|_req, _res, next| {
                next.fail(HandlerError::failed("denied"));
                Ok(())
            }),
            counting(hits.clone(), true),
        ];

        let err = run_chain(&chain, &req(), &Res::new()).await.unwrap_err();
        assert_eq!(err.to_string(), "handler failed: denied");
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_async_handler_writes_response() {
        let chain = vec![async_handler(|_req, res: Res, _next| async move {
            tokio::task::yield_now().await;
            res.send("late");
            Ok(())
        })];
        let res = Res::new();

        run_chain(&chain, &req(), &res).await.unwrap();
        assert!(res.is_sent());
    }
}
