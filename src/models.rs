use serde::{Deserialize, Serialize};
use serde_json::Number;

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    pub url: Option<String>,
}

/// Subset of the `yt-dlp --dump-single-json` document the API cares about.
#[derive(Debug, Deserialize, Clone)]
pub struct VideoInfo {
    pub url: Option<String>,
    pub title: Option<String>,
    pub duration: Option<Number>,
}

#[derive(Debug, Serialize)]
pub struct DownloadResponse {
    pub success: bool,
    pub url: String,
    pub title: String,
    pub duration: Number,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}
