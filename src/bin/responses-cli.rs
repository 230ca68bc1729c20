use std::path::PathBuf;

use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "responses-cli")]
#[command(about = "Client for the responses API", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// API key sent as `x-api-key`
    #[arg(short, long, default_value = "")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check service health (no key needed)
    Health,
    /// List responses waiting to be downloaded
    Pending,
    /// List every response with its download stamp
    All,
    /// Download a response and mark it downloaded
    Download {
        id: String,
        /// Write the JSON body to a file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Put a downloaded response back in the pending queue
    Unmark { id: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let mut headers = HeaderMap::new();
    if !cli.key.is_empty() {
        headers.insert("x-api-key", HeaderValue::from_str(&cli.key)?);
    }

    let (request, out) = match cli.command {
        Commands::Health => (client.get(format!("{base}/health")), None),
        Commands::Pending => (client.get(format!("{base}/responses/pending")), None),
        Commands::All => (client.get(format!("{base}/responses/all")), None),
        Commands::Download { id, out } => {
            (client.get(format!("{base}/responses/{id}/download")), out)
        }
        Commands::Unmark { id } => (client.post(format!("{base}/responses/{id}/unmark")), None),
    };

    let res = request.headers(headers).send().await?;
    print_response(res, out).await
}

async fn print_response(
    res: reqwest::Response,
    out: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    let json: Value = res.json().await?;
    let pretty = serde_json::to_string_pretty(&json)?;
    match out {
        Some(path) => {
            std::fs::write(&path, pretty)?;
            eprintln!("Wrote {}", path.display());
        }
        None => println!("{}", pretty),
    }
    Ok(())
}
