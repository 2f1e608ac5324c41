use anyhow::{Context, Result};
use axum::extract::Request;
use axum::http::header::{self, HeaderName, HeaderValue};
use axum::http::Method;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use geogate::config::ServerConfig;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;

/// Headers the threaded WebAssembly engine needs, plus no-cache.
const RESPONSE_HEADERS: [(&str, &str); 7] = [
    ("cross-origin-opener-policy", "same-origin"),
    ("cross-origin-embedder-policy", "require-corp"),
    ("cross-origin-resource-policy", "cross-origin"),
    ("access-control-allow-origin", "*"),
    ("cache-control", "no-cache, no-store, must-revalidate"),
    ("pragma", "no-cache"),
    ("expires", "0"),
];

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let config = ServerConfig::from_env();
    let tls = self_signed(&config.subject).await?;
    let app = router(&config);

    log::info!("HTTPS server running on https://localhost:{}", config.addr.port());
    log::info!("serving {}", config.root.display());
    log::info!("COOP/COEP headers enabled");

    axum_server::bind_rustls(config.addr, tls)
        .serve(app.into_make_service())
        .await
        .with_context(|| format!("serving on {}", config.addr))
}

/// Static files under `config.root` with cross-origin isolation headers.
fn router(config: &ServerConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_headers([header::CONTENT_TYPE])
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS]);

    let mut app = Router::new()
        .fallback_service(ServeDir::new(&config.root))
        .layer(cors)
        .layer(middleware::from_fn(log_request));
    for (name, value) in RESPONSE_HEADERS {
        app = app.layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        ));
    }
    app
}

/// Fresh, unpersisted certificate for `subject`.
async fn self_signed(subject: &str) -> Result<RustlsConfig> {
    let certified = rcgen::generate_simple_self_signed(vec![subject.to_string()])
        .context("generating self-signed certificate")?;
    RustlsConfig::from_pem(
        certified.cert.pem().into_bytes(),
        certified.key_pair.serialize_pem().into_bytes(),
    )
    .await
    .context("loading TLS configuration")
}

/// Request log, quiet for library assets under `/lib/`.
async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let response = next.run(request).await;
    if !path.starts_with("/lib/") {
        log::info!("{method} {path} {}", response.status());
    }
    response
}
