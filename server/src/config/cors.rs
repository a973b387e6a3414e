use std::time::Duration;

use axum::http::{header, HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Local agent console origins used when `CORS_ALLOWED_ORIGINS` is unset.
const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000,http://localhost:5173";

const PREFLIGHT_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

const REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

pub fn create_cors_layer(configured_origins: Option<&str>) -> CorsLayer {
    let origins = parse_origins(configured_origins.unwrap_or(DEFAULT_ALLOWED_ORIGINS));

    let allow_origin = if origins.is_empty() {
        tracing::warn!("No usable CORS origin configured, mirroring the request origin");
        // Credentials rule out a wildcard origin.
        AllowOrigin::mirror_request()
    } else {
        tracing::info!(count = origins.len(), "CORS origins configured");
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
            REQUEST_ID,
        ])
        .expose_headers([header::CONTENT_TYPE, REQUEST_ID])
        .allow_credentials(true)
        .max_age(PREFLIGHT_MAX_AGE)
}

/// Comma separated list; blanks are skipped and unparsable entries logged.
fn parse_origins(raw: &str) -> Vec<HeaderValue> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect()
}
