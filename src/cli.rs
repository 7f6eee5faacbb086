//! CLI argument parsing, validation, and startup helpers.

use crate::ServerConfig;
use crate::authority::{AuthoritySettings, TokenAuthority};
use crate::db::Database;
use crate::rate_limit::DEFAULT_REFRESH_PER_MINUTE;
use clap::Parser;
use std::time::Duration;
use tracing::{error, info};

/// Shortest accepted token lifetime.
const MIN_TOKEN_TTL_SECS: u64 = 60;

/// Longest accepted token lifetime: 10 years.
const MAX_TOKEN_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "tokenkeep",
    about = "Session token authority: validate, refresh and expire bearer tokens"
)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "TOKENKEEP_PORT", default_value = "7300")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, env = "TOKENKEEP_DATABASE", default_value = "tokenkeep.db")]
    pub database: String,

    /// Lifetime in seconds of tokens minted on refresh
    #[arg(long, env = "TOKENKEEP_TOKEN_TTL", default_value = "604800", value_parser = validate_ttl)]
    pub token_ttl_secs: u64,

    /// Deactivate the presented token when a refresh succeeds
    #[arg(long, env = "TOKENKEEP_ROTATE_ON_REFRESH")]
    pub rotate_on_refresh: bool,

    /// Refresh requests allowed per client IP per minute
    #[arg(long, env = "TOKENKEEP_REFRESH_PER_MINUTE", default_value_t = DEFAULT_REFRESH_PER_MINUTE)]
    pub refresh_per_minute: u32,

    /// Value of Access-Control-Allow-Origin on every response
    #[arg(long, env = "TOKENKEEP_ALLOWED_ORIGIN", default_value = "*")]
    pub allowed_origin: String,

    /// Mint a token for this subject on startup and print it
    #[arg(long, value_name = "SUBJECT")]
    pub issue_token: Option<String>,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

fn validate_ttl(s: &str) -> Result<u64, String> {
    let secs: u64 = s
        .parse()
        .map_err(|_| format!("Token TTL must be a number of seconds: {}", s))?;

    if secs < MIN_TOKEN_TTL_SECS {
        return Err(format!(
            "Token TTL must be at least {} seconds: {}",
            MIN_TOKEN_TTL_SECS, s
        ));
    }

    if secs > MAX_TOKEN_TTL_SECS {
        return Err(format!(
            "Token TTL must be at most {} seconds: {}",
            MAX_TOKEN_TTL_SECS, s
        ));
    }

    Ok(secs)
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Handle the --issue-token flag: mint a token and print it.
/// Returns false if the token could not be created.
pub async fn handle_issue_token(db: &Database, settings: &AuthoritySettings, subject: &str) -> bool {
    let authority = TokenAuthority::new(db.clone(), settings.clone());
    match authority.issue(subject).await {
        Ok(issued) => {
            println!();
            println!("Token issued for: {}", issued.subject_id);
            println!("Token: {}", issued.token);
            println!("Expires at (unix): {}", issued.expires_at);
            println!();
            true
        }
        Err(e) => {
            error!(subject = %subject, error = %e, "Failed to issue token");
            false
        }
    }
}

/// Build ServerConfig from validated arguments.
pub fn build_config(args: &Args, db: Database) -> ServerConfig {
    ServerConfig {
        db,
        authority: AuthoritySettings {
            token_ttl: Duration::from_secs(args.token_ttl_secs),
            rotate_on_refresh: args.rotate_on_refresh,
        },
        refresh_per_minute: args.refresh_per_minute,
        allowed_origin: args.allowed_origin.clone(),
    }
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}
