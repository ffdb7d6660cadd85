use std::collections::BTreeMap;

use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "rotator-cli")]
#[command(about = "Management CLI for the profile rotator", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://127.0.0.1:5002", env = "ROTATOR_URL")]
    url: String,

    #[arg(short, long, default_value = "CHANGE_ME_IN_PRODUCTION", env = "ROTATOR_API_KEY")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version and whether the rotation loop is running
    Status,
    /// List discovered profiles
    Profiles,
    /// Print the activity log
    Logs {
        /// Only the last N lines
        #[arg(short, long)]
        tail: Option<usize>,
    },
    /// Start the background rotation
    Start,
    /// Stop the background rotation
    Stop,
    /// Run one manual pass over the next group
    SafeRefresh,
    /// List quarantined profiles
    Quarantine,
    /// Clear the quarantine of a profile
    Reset { profile: String },
    /// Assign a proxy descriptor to a profile
    SetProxy { profile: String, proxy: String },
    /// Fleet overview
    Summary,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", cli.key))?);
    let client = reqwest::Client::builder().default_headers(headers).build()?;
    let url = |path: &str| format!("{}/admin/{}", cli.url.trim_end_matches('/'), path);

    let res = match &cli.command {
        Commands::Status => client.get(url("status")).send().await?,
        Commands::Profiles => client.get(url("profiles")).send().await?,
        Commands::Logs { .. } => client.get(url("logs")).send().await?,
        Commands::Start => client.post(url("refresh/start")).send().await?,
        Commands::Stop => client.post(url("refresh/stop")).send().await?,
        Commands::SafeRefresh => client.post(url("refresh/safe")).send().await?,
        Commands::Quarantine => client.get(url("quarantine")).send().await?,
        Commands::Reset { profile } => {
            client
                .post(url("quarantine/reset"))
                .json(&json!({ "profile": profile }))
                .send()
                .await?
        }
        Commands::SetProxy { profile, proxy } => {
            let proxies: BTreeMap<&str, &str> = [(profile.as_str(), proxy.as_str())].into_iter().collect();
            client
                .post(url("proxies"))
                .json(&json!({ "proxies": proxies }))
                .send()
                .await?
        }
        Commands::Summary => client.get(url("summary")).send().await?,
    };

    match cli.command {
        Commands::Logs { tail } => print_logs(res, tail).await,
        _ => print_response(res).await,
    }
}

async fn read_body(res: reqwest::Response) -> Result<Value, Box<dyn std::error::Error>> {
    let status = res.status();
    let body: Value = res.json().await.unwrap_or(Value::Null);
    if !status.is_success() {
        let reason = body.get("error").and_then(Value::as_str).unwrap_or("no details");
        return Err(format!("admin API returned {status}: {reason}").into());
    }
    Ok(body)
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let body = read_body(res).await?;
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}

async fn print_logs(res: reqwest::Response, tail: Option<usize>) -> Result<(), Box<dyn std::error::Error>> {
    let body = read_body(res).await?;
    let lines: Vec<&str> = body
        .get("logs")
        .and_then(Value::as_array)
        .map(|logs| logs.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    let skip = tail.map_or(0, |n| lines.len().saturating_sub(n));
    for line in &lines[skip..] {
        println!("{line}");
    }
    Ok(())
}
