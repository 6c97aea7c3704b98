//! HTTP host and graceful shutdown.
//!
//! [`Server`] serves any hyper [`Service`] with the
//! [`ExceptionLogger`](crate::middleware::ExceptionLogger) installed in front
//! of it. Failures escaping the service are logged by the middleware first;
//! the host then answers with a bare `500 Internal Server Error`, which is
//! the standard error response for every route.
//!
//! A panicking handler is logged the same way. The middleware resumes the
//! panic, and the host catches it at dispatch and answers with the same `500`,
//! so the connection stays usable for later requests.
//!
//! # Graceful shutdown and Kubernetes
//!
//! When Kubernetes terminates a pod it sends **SIGTERM** and waits
//! `terminationGracePeriodSeconds` (default 30 s) before sending SIGKILL.
//!
//! The server reacts by:
//! 1. Immediately stopping `listener.accept()`.
//! 2. Letting every in-flight connection task run to completion.
//! 3. Returning from [`Server::serve`], which lets `main` exit cleanly.

use std::convert::Infallible;
use std::fmt;
use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use bytes::Bytes;
use futures::FutureExt;
use http::{Request, Response, StatusCode};
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::service::{Service, service_fn};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::error::Result;
use crate::middleware::ExceptionLogger;

/// The HTTP host.
#[derive(Debug)]
pub struct Server {
    addr: SocketAddr,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    ///
    /// ```rust
    /// use tsu_ops::Server;
    /// let server = Server::bind("0.0.0.0:3000").unwrap();
    /// assert_eq!(server.addr().port(), 3000);
    /// ```
    pub fn bind(addr: &str) -> Result<Self> {
        Ok(Self { addr: addr.parse()? })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Starts accepting connections and dispatching them through `app`.
    ///
    /// Returns only after a full graceful shutdown (SIGTERM or Ctrl-C,
    /// followed by all in-flight requests completing).
    pub async fn serve<S>(self, app: S) -> Result<()>
    where
        S: Service<Request<Incoming>, Response = Response<Full<Bytes>>> + Send + Sync + 'static,
        S::Future: Send + 'static,
        S::Error: fmt::Display + Send + 'static,
    {
        let listener = TcpListener::bind(self.addr).await?;
        let app = Arc::new(ExceptionLogger::new(app));

        info!(addr = %self.addr, "tsu-ops listening");

        let mut tasks = tokio::task::JoinSet::new();

        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                // Check shutdown first so a SIGTERM stops accepting new
                // connections even if more are queued.
                biased;

                () = &mut shutdown => {
                    info!(
                        in_flight = tasks.len(),
                        "shutdown signal received, draining connections"
                    );
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let app = Arc::clone(&app);
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        let svc = service_fn(move |req| {
                            let app = Arc::clone(&app);
                            async move { dispatch(&*app, req).await }
                        });

                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            error!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                // Reap finished connection tasks so the JoinSet does not grow
                // without bound on long-running servers.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}

        info!("tsu-ops stopped");
        Ok(())
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Runs one request through the logged service and turns an escaped error
/// or panic into the standard `500` response.
///
/// The error type is [`Infallible`]: by the time a failure reaches this point
/// it has been logged, so hyper never sees it.
async fn dispatch<S, B>(
    app: &S,
    req: Request<B>,
) -> std::result::Result<Response<Full<Bytes>>, Infallible>
where
    S: Service<Request<B>, Response = Response<Full<Bytes>>>,
    S::Error: fmt::Display,
{
    match AssertUnwindSafe(async { app.call(req).await }).catch_unwind().await {
        Ok(Ok(response)) => Ok(response),
        Ok(Err(e)) => {
            debug!("answering with 500 after unhandled error: {e}");
            Ok(internal_error())
        }
        Err(_) => {
            debug!("answering with 500 after handler panic");
            Ok(internal_error())
        }
    }
}

fn internal_error() -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from_static(b"Internal Server Error")));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first shutdown signal the process receives.
///
/// On Unix this listens for both **SIGTERM** and **SIGINT** (Ctrl-C).
/// On Windows only Ctrl-C is available. A handler that fails to install
/// simply never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use http_body_util::BodyExt;

    use super::*;

    async fn app(
        req: Request<Full<Bytes>>,
    ) -> std::result::Result<Response<Full<Bytes>>, io::Error> {
        match req.uri().path() {
            "/ok" => Ok(Response::new(Full::new(Bytes::from_static(b"fine")))),
            "/panic" => panic!("handler gave up"),
            _ => Err(io::Error::other("disk on fire")),
        }
    }

    fn get(path: &str) -> Request<Full<Bytes>> {
        Request::builder().uri(path).body(Full::new(Bytes::new())).unwrap()
    }

    #[tokio::test]
    async fn success_passes_through() {
        let svc = ExceptionLogger::new(service_fn(app));
        let res = dispatch(&svc, get("/ok")).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = res.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"fine");
    }

    #[tokio::test]
    async fn escaped_error_becomes_500() {
        let svc = ExceptionLogger::new(service_fn(app));
        let res = dispatch(&svc, get("/broken")).await.unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn handler_panic_becomes_500() {
        let svc = ExceptionLogger::new(service_fn(app));
        let res = dispatch(&svc, get("/panic")).await.unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

        // The same service keeps answering after a panic.
        let res = dispatch(&svc, get("/ok")).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[test]
    fn invalid_address_is_an_error() {
        assert!(matches!(Server::bind("not-an-addr"), Err(crate::Error::Addr(_))));
    }
}
