//! Minimal tsu-ops host — one healthy route, one failing, one panicking.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl -i http://localhost:3000/healthz
//!   curl -i 'http://localhost:3000/users/42?fields=name'   ← logged, then 500
//!   curl -i http://localhost:3000/panic                    ← logged, connection dropped

use std::io;

use bytes::Bytes;
use http::{Request, Response, StatusCode};
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::service::service_fn;
use tsu_ops::Server;

#[tokio::main]
async fn main() -> tsu_ops::Result<()> {
    tracing_subscriber::fmt::init();

    Server::bind("0.0.0.0:3000")?.serve(service_fn(route)).await
}

async fn route(req: Request<Incoming>) -> Result<Response<Full<Bytes>>, io::Error> {
    match req.uri().path() {
        "/healthz" => Ok(Response::new(Full::new(Bytes::from_static(b"ok")))),
        "/panic" => panic!("handler gave up"),
        path if path.starts_with("/users/") => {
            // Stand-in for a storage call that fails.
            Err(io::Error::new(io::ErrorKind::ConnectionRefused, "user store unreachable"))
        }
        _ => {
            let mut res = Response::new(Full::new(Bytes::from_static(b"not found")));
            *res.status_mut() = StatusCode::NOT_FOUND;
            Ok(res)
        }
    }
}
