use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Inspection CLI for the storage gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Per-backend availability, failure count and circuit state
    Status,
    /// Fetch a payload through the gateway
    Data,
    /// Check gateway liveness
    Health,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let path = match cli.command {
        Commands::Status => "/status",
        Commands::Data => "/data",
        Commands::Health => "/health",
    };

    let res = client.get(format!("{}{}", base, path)).send().await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let cached = res
        .headers()
        .get("x-cache")
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let text = res.text().await?;
    if !status.is_success() {
        eprintln!("Response: {}", text);
        return Err(format!("gateway returned status {}", status).into());
    }

    if let Some(cached) = cached {
        eprintln!("x-cache: {}", cached);
    }
    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, body: &'static str) -> reqwest::Response {
        reqwest::Response::from(axum::http::Response::builder().status(status).body(body).unwrap())
    }

    #[tokio::test]
    async fn test_non_success_status_is_error() {
        let res = response(503, r#"{"error":"No Storage Services are available"}"#);
        let err = print_response(res).await.unwrap_err();
        assert_eq!(err.to_string(), "gateway returned status 503 Service Unavailable");
    }

    #[tokio::test]
    async fn test_success_status_is_ok() {
        assert!(print_response(response(200, r#"{"id":1}"#)).await.is_ok());
    }
}
