//! Manual smoke test against a running API instance.
//!
//! `cargo run --bin smoke -- <TIKTOK_URL>`; the server address comes from
//! `TIKTOK_DL_API` (default `http://localhost:3000`).

use serde_json::Value;
use url::Url;

const DEFAULT_API: &str = "http://localhost:3000";
const SAMPLE_URLS: &[&str] = &[
    "https://www.tiktok.com/@tiktok/video/7256519088906111498",
    "https://www.tiktok.com/@tiktok/video/7254614472730470914",
];

#[tokio::main]
async fn main() {
    let target = std::env::args()
        .nth(1)
        .unwrap_or_else(|| SAMPLE_URLS[0].to_string());
    let api = std::env::var("TIKTOK_DL_API").unwrap_or_else(|_| DEFAULT_API.to_string());

    if let Err(e) = run(&api, &target).await {
        eprintln!("Failed to reach the backend: {}", e);
        eprintln!();
        eprintln!("Make sure:");
        eprintln!("1. The server is running (cargo run --bin tiktok-dl-api)");
        eprintln!("2. It is listening on {}", api);
        eprintln!("3. Your network connection is up");
        std::process::exit(1);
    }
}

async fn run(api: &str, target: &str) -> Result<(), Box<dyn std::error::Error>> {
    let endpoint = Url::parse(api)?.join("/api/download")?;
    let endpoint = Url::parse_with_params(endpoint.as_str(), &[("url", target)])?;

    println!("Testing URL: {}", target);
    println!("Sending request to {}", endpoint);
    println!();

    let response = reqwest::Client::new().get(endpoint).send().await?;
    let status = response.status();
    let text = response.text().await?;

    println!("Response status: {}", status);
    println!();

    let body: Value = match serde_json::from_str(&text) {
        Ok(body) => body,
        Err(_) => {
            println!("Raw response (non-JSON):");
            println!("{}", text);
            return Ok(());
        }
    };
    println!("{}", serde_json::to_string_pretty(&body)?);
    println!();

    if body["success"].as_bool() == Some(true) {
        println!("SUCCESS");
        println!("Title: {}", body["title"].as_str().unwrap_or_default());
        println!("Duration: {} seconds", body["duration"]);
        println!("Download URL: {}", body["url"].as_str().unwrap_or_default());
    } else {
        println!("ERROR");
        println!("Error: {}", body["error"].as_str().unwrap_or_default());
    }
    Ok(())
}
