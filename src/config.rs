//! Configuration for Leadhub
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;

/// Leadhub - REST backend for the marketplace lead lifecycle
#[derive(Parser, Debug, Clone)]
#[command(name = "leadhub")]
#[command(about = "Marketplace backend connecting users with service partners")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "leadhub")]
    pub mongodb_db: String,

    /// JWT secret for token signing (required in production)
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// JWT token expiry in seconds
    #[arg(long, env = "JWT_EXPIRY_SECONDS", default_value = "86400")]
    pub jwt_expiry_seconds: u64,

    /// Base URL of the media storage service uploads are forwarded to
    /// (e.g., "http://localhost:9000")
    #[arg(long, env = "MEDIA_STORAGE_URL", default_value = "http://localhost:9000")]
    pub media_storage_url: String,

    /// Public base URL media files are served from.
    /// Defaults to MEDIA_STORAGE_URL when unset.
    #[arg(long, env = "MEDIA_PUBLIC_URL")]
    pub media_public_url: Option<String>,

    /// Maximum total size of an upload request body in bytes
    #[arg(long, env = "MAX_UPLOAD_BYTES", default_value = "10485760")]
    pub max_upload_bytes: u64,

    /// Maximum number of media files per lead
    #[arg(long, env = "MAX_UPLOAD_FILES", default_value = "6")]
    pub max_upload_files: usize,

    /// Enable development mode (fallback JWT secret, relaxed startup)
    #[arg(long, env = "DEV_MODE", default_value = "false", action = clap::ArgAction::Set)]
    pub dev_mode: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Validate configuration coherence before startup
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode && self.jwt_secret.is_none() {
            return Err("JWT_SECRET is required outside dev mode".to_string());
        }
        if self.max_upload_bytes == 0 {
            return Err("MAX_UPLOAD_BYTES must be greater than zero".to_string());
        }
        if self.max_upload_files == 0 {
            return Err("MAX_UPLOAD_FILES must be greater than zero".to_string());
        }
        Ok(())
    }

    /// Secret used for JWT signing, with a fixed fallback in dev mode
    pub fn jwt_secret(&self) -> String {
        self.jwt_secret
            .clone()
            .unwrap_or_else(|| "leadhub-dev-secret".to_string())
    }

    /// Public base URL for uploaded media
    pub fn media_public_url(&self) -> &str {
        self.media_public_url
            .as_deref()
            .unwrap_or(&self.media_storage_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Args {
        Args::parse_from(["leadhub", "--dev-mode", "true"])
    }

    #[test]
    fn test_dev_mode_allows_missing_jwt_secret() {
        let args = base_args();
        assert!(args.validate().is_ok());
        assert_eq!(args.jwt_secret(), "leadhub-dev-secret");
    }

    #[test]
    fn test_production_requires_jwt_secret() {
        let args = Args::parse_from(["leadhub"]);
        assert!(args.validate().is_err());

        let args = Args::parse_from(["leadhub", "--jwt-secret", "s3cret"]);
        assert!(args.validate().is_ok());
        assert_eq!(args.jwt_secret(), "s3cret");
    }

    #[test]
    fn test_media_public_url_falls_back_to_storage_url() {
        let args = base_args();
        assert_eq!(args.media_public_url(), "http://localhost:9000");

        let args = Args::parse_from([
            "leadhub",
            "--dev-mode",
            "true",
            "--media-public-url",
            "https://cdn.example.com",
        ]);
        assert_eq!(args.media_public_url(), "https://cdn.example.com");
    }
}
