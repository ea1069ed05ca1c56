use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;

use unsubscribe_service::config::{self, ServiceConfig};
use unsubscribe_service::token::TokenCodec;

#[derive(Parser)]
#[command(name = "unsub-cli")]
#[command(about = "Operator CLI for the unsubscribe service", long_about = None)]
struct Cli {
    /// Service config; supplies the token TTL and secret variable
    #[arg(short, long, env = "UNSUB_CONFIG")]
    config: Option<PathBuf>,

    /// Environment variable holding the signing secret
    #[arg(long)]
    secret_env: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Issue a token and print the unsubscribe link
    Issue {
        #[arg(long)]
        user_id: u64,
        #[arg(long)]
        email: String,
        #[arg(long)]
        ttl_days: Option<i64>,
        #[arg(long, default_value = "http://localhost:3000")]
        base_url: String,
    },
    /// Verify a token and print its fields
    Inspect { token: String },
    /// Probe the service health endpoint
    Health {
        #[arg(short, long, default_value = "http://localhost:3000")]
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Issue {
            user_id,
            email,
            ttl_days,
            base_url,
        } => {
            let config = load(cli.config.as_deref(), cli.secret_env)?;
            let codec = TokenCodec::new(config::read_secret(&config.token)?)?;
            let ttl_days = ttl_days.unwrap_or(config.token.ttl_days);
            let token = codec.issue(user_id, &email, chrono::Duration::days(ttl_days))?;
            println!("token: {token}");
            println!("link:  {}", TokenCodec::unsubscribe_url(&base_url, &token));
        }
        Commands::Inspect { token } => {
            let config = load(cli.config.as_deref(), cli.secret_env)?;
            let codec = TokenCodec::new(config::read_secret(&config.token)?)?;
            match codec.verify(&token) {
                Ok(verified) => {
                    let expires = chrono::DateTime::from_timestamp_millis(verified.expires_at)
                        .map(|t| t.to_rfc3339())
                        .unwrap_or_else(|| verified.expires_at.to_string());
                    println!("valid");
                    println!("user_id:    {}", verified.user_id);
                    println!("email:      {}", verified.email);
                    println!("expires_at: {expires}");
                }
                Err(e) => {
                    eprintln!("invalid ({}): {e}", e.kind());
                    std::process::exit(1);
                }
            }
        }
        Commands::Health { url } => {
            let res = reqwest::get(format!("{}/health", url.trim_end_matches('/'))).await?;
            let status = res.status();
            if !status.is_success() {
                eprintln!("Error: service returned status {status}");
                std::process::exit(1);
            }
            let json: Value = res.json().await?;
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
    }

    Ok(())
}

fn load(
    path: Option<&std::path::Path>,
    secret_env: Option<String>,
) -> Result<ServiceConfig, config::ConfigError> {
    let mut config = match path {
        Some(path) => config::load_config(path)?,
        None => ServiceConfig::default(),
    };
    if let Some(var) = secret_env {
        config.token.secret_env = var;
    }
    Ok(config)
}
