use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, MethodRouter},
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Number};
use tower_http::trace::TraceLayer;

mod extract;
mod models;

use extract::{is_valid_tiktok_url, MediaExtractor, YtDlp};
use models::{DownloadQuery, DownloadResponse, ErrorResponse};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_TITLE: &str = "TikTok Video";

const MISSING_URL: &str = "Missing URL parameter. Usage: /api/download?url=<TikTok_URL>";
const INVALID_URL: &str = "Invalid TikTok URL. Please provide a valid TikTok video link (e.g., https://www.tiktok.com/@username/video/123456789)";
const NO_VIDEO_INFO: &str =
    "Could not extract video information. The video may be private, deleted, or restricted.";
const NO_DOWNLOAD_LINK: &str =
    "Could not extract video download link. This might be a region-restricted or protected video.";
const READY: &str = "Video ready for download";

const CORS_HEADERS: [(HeaderName, &str); 3] = [
    (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
    (header::ACCESS_CONTROL_ALLOW_METHODS, "GET, POST, OPTIONS"),
    (header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"),
];

#[derive(Clone)]
struct AppState {
    extractor: Arc<dyn MediaExtractor>,
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let extractor = YtDlp::from_env();
    tracing::info!("using extractor at {}", extractor.program().display());

    let app = app(AppState {
        extractor: Arc::new(extractor),
    });

    let listener = tokio::net::TcpListener::bind(resolve_bind_addr()).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await
}

fn resolve_bind_addr() -> String {
    if let Some(addr) = std::env::var("TIKTOK_DL_ADDR")
        .ok()
        .filter(|value| !value.trim().is_empty())
    {
        return addr;
    }
    if let Some(port) = std::env::var("PORT")
        .ok()
        .and_then(|value| value.trim().parse::<u16>().ok())
    {
        return format!("0.0.0.0:{port}");
    }
    DEFAULT_BIND_ADDR.to_string()
}

fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/download", download_routes())
        .route("/api/download", download_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Every method other than OPTIONS runs the download flow.
fn download_routes() -> MethodRouter<AppState> {
    get(download_endpoint)
        .post(download_endpoint)
        .options(preflight)
        .fallback(download_endpoint)
}

async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

async fn preflight() -> Response {
    respond(StatusCode::OK, json!({"message": "OK"}))
}

async fn download_endpoint(
    State(state): State<AppState>,
    query: Option<Query<DownloadQuery>>,
) -> Response {
    let Some(url) = query
        .and_then(|Query(q)| q.url)
        .filter(|url| !url.is_empty())
    else {
        return failure(StatusCode::BAD_REQUEST, MISSING_URL, None);
    };

    if !is_valid_tiktok_url(&url) {
        return failure(StatusCode::BAD_REQUEST, INVALID_URL, None);
    }

    tracing::info!(%url, "processing TikTok URL");

    let info = match state.extractor.extract(&url).await {
        Ok(Some(info)) => info,
        Ok(None) => return failure(StatusCode::BAD_REQUEST, NO_VIDEO_INFO, None),
        Err(e) => {
            tracing::error!(error = %e, "extraction failed");
            return failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                e.user_message(),
                Some(e.details().to_string()),
            );
        }
    };

    let Some(direct_url) = info.url.filter(|u| !u.is_empty()) else {
        return failure(StatusCode::BAD_REQUEST, NO_DOWNLOAD_LINK, None);
    };
    let title = info
        .title
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| DEFAULT_TITLE.to_string());
    let duration = info
        .duration
        .map(whole_number)
        .unwrap_or_else(|| Number::from(0));

    tracing::info!(%title, %duration, "extracted video URL");

    respond(
        StatusCode::OK,
        DownloadResponse {
            success: true,
            url: direct_url,
            title,
            duration,
            message: READY,
        },
    )
}

/// yt-dlp may report `15.0`; the API answers `15`.
fn whole_number(n: Number) -> Number {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 9_007_199_254_740_992.0 => {
            Number::from(f as i64)
        }
        _ => n,
    }
}

fn failure(status: StatusCode, error: &str, details: Option<String>) -> Response {
    respond(
        status,
        ErrorResponse {
            success: false,
            error: error.to_string(),
            details,
        },
    )
}

fn respond<T: Serialize>(status: StatusCode, body: T) -> Response {
    (status, CORS_HEADERS, Json(body)).into_response()
}
