//! Configuration for arbol
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use uuid::Uuid;

/// Arbol - community survey backend for the Arbol de la Vida
#[derive(Parser, Debug, Clone)]
#[command(name = "arbol")]
#[command(about = "Community survey backend for the Arbol de la Vida vitality tracker")]
pub struct Args {
    /// Unique node identifier for this instance
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Path to the SQLite database file
    #[arg(long, env = "ARBOL_DB", default_value = "arbol.db")]
    pub db_path: PathBuf,

    /// Enable development mode (insecure default JWT secret)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// JWT secret for token signing (required in production)
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// JWT token expiry in seconds (default 6 hours)
    #[arg(long, env = "JWT_EXPIRY_SECONDS", default_value = "21600")]
    pub jwt_expiry_seconds: u64,

    /// Admin account name bootstrapped at startup (optional)
    #[arg(long, env = "ADMIN_NAME")]
    pub admin_name: Option<String>,

    /// Admin account password bootstrapped at startup (optional)
    #[arg(long, env = "ADMIN_PASSWORD")]
    pub admin_password: Option<String>,

    /// Seed one default question per category on a fresh database
    #[arg(long, env = "SEED_QUESTIONS", default_value = "true")]
    pub seed_questions: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Get effective JWT secret (uses default in dev mode)
    pub fn jwt_secret(&self) -> String {
        if self.dev_mode {
            self.jwt_secret
                .clone()
                .unwrap_or_else(|| "dev-only-insecure-secret".to_string())
        } else {
            self.jwt_secret
                .clone()
                .expect("JWT_SECRET is required in production mode")
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode && self.jwt_secret.is_none() {
            return Err("JWT_SECRET is required in production mode".to_string());
        }

        if self.admin_name.is_some() != self.admin_password.is_some() {
            return Err("ADMIN_NAME and ADMIN_PASSWORD must be set together".to_string());
        }

        if self.jwt_expiry_seconds == 0 {
            return Err("JWT_EXPIRY_SECONDS must be greater than zero".to_string());
        }

        Ok(())
    }
}
