use lockbank_core::email::DEFAULT_ALLOWED_DOMAINS;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for the kiosk machine. Override via
/// environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `5000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Email domains a card may be associated with.
    pub allowed_email_domains: Vec<String>,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                       |
    /// |-------------------------|-------------------------------|
    /// | `HOST`                  | `0.0.0.0`                     |
    /// | `PORT`                  | `5000`                        |
    /// | `CORS_ORIGINS`          | `http://localhost:5010`       |
    /// | `REQUEST_TIMEOUT_SECS`  | `30`                          |
    /// | `ALLOWED_EMAIL_DOMAINS` | `epitech.eu,epitech.digital`  |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "5000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins = split_csv(
            &std::env::var("CORS_ORIGINS").unwrap_or_else(|_| "http://localhost:5010".into()),
        );

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let allowed_email_domains = split_csv(
            &std::env::var("ALLOWED_EMAIL_DOMAINS")
                .unwrap_or_else(|_| DEFAULT_ALLOWED_DOMAINS.join(",")),
        );
        assert!(
            !allowed_email_domains.is_empty(),
            "ALLOWED_EMAIL_DOMAINS must name at least one domain"
        );

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            allowed_email_domains,
        }
    }
}

fn split_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
