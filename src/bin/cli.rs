//! Weatherlog CLI
//!
//! Command-line client for a running Weatherlog server:
//! - Log in and obtain a token
//! - Upload CSV batches
//! - Run searches
//! - Check server health
//! - Hash passwords for the server config

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;
use weatherlog::storage::Column;

#[derive(Parser)]
#[command(name = "weatherlog-cli")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Client for the Weatherlog sensor API")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// API server URL
    #[arg(long, default_value = "http://localhost:3000", global = true)]
    pub server: String,

    /// Bearer token (falls back to WEATHERLOG_TOKEN)
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// Output format (table, json)
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Log in and print an access token
    Login {
        /// Account email
        #[arg(long)]
        email: String,
        /// Account password
        #[arg(long)]
        password: String,
    },

    /// Upload a CSV file of readings
    Upload {
        /// Path to CSV file
        path: PathBuf,
    },

    /// Search readings
    Search {
        /// Search document as JSON, or @path to read it from a file
        #[arg(default_value = "{}")]
        query: String,
    },

    /// Show server health
    Status,

    /// Hash a password for the [[auth.users]] table
    HashPassword {
        /// Password to hash
        password: String,
        /// bcrypt cost factor
        #[arg(long, default_value_t = bcrypt::DEFAULT_COST)]
        cost: u32,
    },

    /// Generate default server config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let token = cli
        .token
        .clone()
        .or_else(|| std::env::var("WEATHERLOG_TOKEN").ok());

    match cli.command {
        Commands::Login { email, password } => {
            let response = client
                .post(format!("{}/api/login", cli.server))
                .json(&serde_json::json!({ "email": email, "password": password }))
                .send()
                .await?;

            let body = check(response).await?;
            match cli.format.as_str() {
                "json" => println!("{}", serde_json::to_string_pretty(&body)?),
                _ => {
                    println!("{}", body["accessToken"].as_str().unwrap_or("-"));
                    if let Some(expires) = body["expiresAt"].as_str() {
                        eprintln!("Expires at {}", expires);
                    }
                }
            }
        }

        Commands::Upload { path } => {
            let csv = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            let token = require_token(token)?;

            let response = client
                .post(format!("{}/api/sensors/upload", cli.server))
                .bearer_auth(token)
                .header(reqwest::header::CONTENT_TYPE, "text/csv")
                .body(csv)
                .send()
                .await?;

            let body = check(response).await?;
            match cli.format.as_str() {
                "json" => println!("{}", serde_json::to_string_pretty(&body)?),
                _ => println!(
                    "{} ({} readings stored)",
                    body["message"].as_str().unwrap_or("-"),
                    body["accepted"].as_u64().unwrap_or(0)
                ),
            }
        }

        Commands::Search { query } => {
            let document = read_query(&query)?;
            let token = require_token(token)?;

            let response = client
                .post(format!("{}/api/sensors/search", cli.server))
                .bearer_auth(token)
                .json(&document)
                .send()
                .await?;

            let data = check(response).await?;
            match cli.format.as_str() {
                "json" => println!("{}", serde_json::to_string_pretty(&data)?),
                _ => print_table(&data),
            }
        }

        Commands::Status => {
            let response = client.get(format!("{}/health", cli.server)).send().await;

            match response {
                Ok(resp) if resp.status().is_success() => {
                    let health: Value = resp.json().await?;

                    println!("Weatherlog v{}", health["version"].as_str().unwrap_or("unknown"));
                    println!();
                    println!("API Status: {}", health["status"].as_str().unwrap_or("unknown"));
                    println!("Storage: {}", health["storage"].as_str().unwrap_or("unknown"));
                    if let Some(readings) = health["readings"].as_u64() {
                        println!("  Readings: {}", readings);
                    }
                    if let Some(uptime) = health["uptime_seconds"].as_u64() {
                        println!();
                        println!("Uptime: {}", format_duration(uptime));
                    }
                }
                Ok(resp) => bail!("API returned error: {}", resp.status()),
                Err(e) => {
                    eprintln!("Cannot connect to Weatherlog API at {}", cli.server);
                    eprintln!();
                    eprintln!("Make sure the server is running:");
                    eprintln!("  cargo run --bin weatherlog");
                    return Err(e.into());
                }
            }
        }

        Commands::HashPassword { password, cost } => {
            let hash = weatherlog::auth::hash_password(&password, cost)?;
            println!("{}", hash);
        }

        Commands::Config { output } => {
            let config = weatherlog::config::generate_default_config();

            match output {
                Some(path) => {
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(&path, &config)?;
                    println!("Config written to {:?}", path);
                }
                None => print!("{}", config),
            }
        }
    }

    Ok(())
}

fn require_token(token: Option<String>) -> anyhow::Result<String> {
    match token {
        Some(t) if !t.trim().is_empty() => Ok(t),
        _ => bail!("No token: pass --token or set WEATHERLOG_TOKEN (get one with `weatherlog-cli login`)"),
    }
}

/// Parse the search argument, reading `@path` from disk
fn read_query(arg: &str) -> anyhow::Result<Value> {
    let text = match arg.strip_prefix('@') {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("reading {}", path))?
        }
        None => arg.to_string(),
    };
    serde_json::from_str(&text).context("search document is not valid JSON")
}

/// Turn a non-2xx response into an error carrying the server's message
async fn check(response: reqwest::Response) -> anyhow::Result<Value> {
    let status = response.status();
    let body: Value = response.json().await.unwrap_or(Value::Null);

    if status.is_success() {
        Ok(body)
    } else {
        let message = body["message"].as_str().unwrap_or("no message");
        bail!("Request failed ({}): {}", status, message)
    }
}

fn format_duration(seconds: u64) -> String {
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else if seconds < 86400 {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    } else {
        format!("{}d {}h", seconds / 86400, (seconds % 86400) / 3600)
    }
}

fn print_table(data: &Value) {
    let rows = match data.as_array() {
        Some(r) => r,
        None => {
            // Aggregate: {"_avg": {"rainfall": 1.5}}
            if let Some((key, inner)) = data.as_object().and_then(|o| o.iter().next()) {
                if let Some((column, value)) = inner.as_object().and_then(|o| o.iter().next()) {
                    println!("{}({}) = {}", key.trim_start_matches('_'), column, value);
                    return;
                }
            }
            println!("{}", data);
            return;
        }
    };

    if rows.is_empty() {
        println!("No readings match");
        return;
    }

    for column in Column::ALL {
        print!("{:<12}", column.name());
    }
    println!();
    println!("{}", "-".repeat(12 * Column::ALL.len()));

    for row in rows {
        for column in Column::ALL {
            let cell = match &row[column.name()] {
                Value::Number(n) => n.to_string(),
                Value::String(s) => s.clone(),
                _ => "-".to_string(),
            };
            print!("{:<12}", cell);
        }
        println!();
    }
    println!();
    println!("{} readings", rows.len());
}
