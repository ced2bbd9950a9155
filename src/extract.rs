use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::RegexSet;
use tokio::process::Command;

use crate::models::VideoInfo;

// ── Constants ────────────────────────────────────────────────────────────────

/// Best single-file MP4, falling back to whatever single file is best.
pub const FORMAT_PREFERENCE: &str = "best[ext=mp4]/best";
pub const SOCKET_TIMEOUT_MS: u64 = 8000;
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
const DEFAULT_YT_DLP_BIN: &str = "yt-dlp";

// ── Lazy static regexes ──────────────────────────────────────────────────────

static TIKTOK_URL_SET: Lazy<RegexSet> = Lazy::new(|| {
    RegexSet::new([
        // www.tiktok.com, en.tiktok.com, www.de.tiktok.com, optionally /@handle
        r"(?i)^https?://(?:www\.)?(?:[a-z]{2}\.)?tiktok\.com/(?:@[^/?#\s]*)?",
        r"(?i)^https?://vm\.tiktok\.com/",
        r"(?i)^https?://vt\.tiktok\.com/",
    ])
    .unwrap()
});

// ── Error type ───────────────────────────────────────────────────────────────

/// A failed extraction. Every variant carries the raw message from yt-dlp.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractionError {
    #[error("{0}")]
    TimedOut(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    RateLimited(String),
    #[error("{0}")]
    Failed(String),
}

impl ExtractionError {
    /// Sort a raw failure message into a category. Matching is case-sensitive
    /// and the first match wins, in the order timeout, not found, forbidden,
    /// rate limit.
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.contains("timed out") {
            Self::TimedOut(message)
        } else if message.contains("not found") {
            Self::NotFound(message)
        } else if message.contains("403") || message.contains("forbidden") {
            Self::Forbidden(message)
        } else if message.contains("429") {
            Self::RateLimited(message)
        } else {
            Self::Failed(message)
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            Self::TimedOut(_) => {
                "Request timed out. The TikTok server took too long to respond. Please try again."
            }
            Self::NotFound(_) => "Video not found. Please check the URL and try again.",
            Self::Forbidden(_) => "This video is not available in your region or is private.",
            Self::RateLimited(_) => "Too many requests. Please wait a moment and try again.",
            Self::Failed(_) => "An error occurred while processing your request.",
        }
    }

    pub fn details(&self) -> &str {
        match self {
            Self::TimedOut(msg)
            | Self::NotFound(msg)
            | Self::Forbidden(msg)
            | Self::RateLimited(msg)
            | Self::Failed(msg) => msg,
        }
    }
}

// ── Extractor seam ───────────────────────────────────────────────────────────

/// Resolves a page URL into video metadata. `Ok(None)` means the tool ran but
/// produced no result object.
#[async_trait]
pub trait MediaExtractor: Send + Sync {
    async fn extract(&self, url: &str) -> Result<Option<VideoInfo>, ExtractionError>;
}

/// Runs one `yt-dlp` process per call. Holds nothing but the binary path.
#[derive(Debug, Clone)]
pub struct YtDlp {
    program: PathBuf,
}

impl YtDlp {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn from_env() -> Self {
        let program = std::env::var("YT_DLP_BIN")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_YT_DLP_BIN.to_string());
        Self::new(program)
    }

    pub fn program(&self) -> &std::path::Path {
        &self.program
    }

    fn args(url: &str) -> Vec<String> {
        // yt-dlp takes the socket timeout in seconds
        let socket_timeout = (SOCKET_TIMEOUT_MS as f64 / 1000.0).to_string();
        vec![
            "--dump-single-json".to_string(),
            "--no-warnings".to_string(),
            "--quiet".to_string(),
            "--format".to_string(),
            FORMAT_PREFERENCE.to_string(),
            "--user-agent".to_string(),
            USER_AGENT.to_string(),
            "--socket-timeout".to_string(),
            socket_timeout,
            "--".to_string(),
            url.to_string(),
        ]
    }
}

#[async_trait]
impl MediaExtractor for YtDlp {
    async fn extract(&self, url: &str) -> Result<Option<VideoInfo>, ExtractionError> {
        let output = Command::new(&self.program)
            .args(Self::args(url))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                ExtractionError::classify(format!(
                    "Failed to run {}: {}",
                    self.program.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr = stderr.trim();
            let message = if stderr.is_empty() {
                format!("yt-dlp exited with {}", output.status)
            } else {
                stderr.to_string()
            };
            return Err(ExtractionError::classify(message));
        }

        parse_info(&String::from_utf8_lossy(&output.stdout))
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

pub fn is_valid_tiktok_url(url: &str) -> bool {
    TIKTOK_URL_SET.is_match(url)
}

/// Parse yt-dlp's stdout. Blank output and a literal `null` are "no result".
pub fn parse_info(stdout: &str) -> Result<Option<VideoInfo>, ExtractionError> {
    let stdout = stdout.trim();
    if stdout.is_empty() {
        return Ok(None);
    }
    serde_json::from_str::<Option<VideoInfo>>(stdout)
        .map_err(|e| ExtractionError::classify(format!("yt-dlp returned invalid JSON: {}", e)))
}
