//! Dispatch server configuration

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Clone)]
pub struct Config {
    /// Environment: development | staging | production
    pub environment: String,
    /// HTTP port (API + notification socket)
    pub http_port: u16,
    /// redb database file
    pub database_path: String,
    /// HS256 secret for bearer tokens
    pub jwt_secret: String,
    /// Stripe secret key
    pub stripe_secret_key: String,
    /// Stripe webhook signing secret
    pub stripe_webhook_secret: String,
    /// Currency for every payment intent (ISO 4217, lowercase)
    pub payment_currency: String,
    /// Allowed CORS origin
    pub frontend_url: String,
    /// `json` for machine-readable logs
    pub log_format: String,
}

impl Config {
    /// Require a secret env var: must be set and non-empty in non-development environments.
    fn require_secret(name: &str, environment: &str) -> Result<String, BoxError> {
        Self::secret_from(std::env::var(name).ok(), name, environment)
    }

    fn secret_from(value: Option<String>, name: &str, environment: &str) -> Result<String, BoxError> {
        let val = match value {
            Some(v) => v,
            None => {
                if environment != "development" {
                    return Err(format!("{name} must be set in {environment} environment").into());
                }
                format!("dev-{name}-not-for-production")
            }
        };
        if val.is_empty() && environment != "development" {
            return Err(format!("{name} must not be empty in {environment} environment").into());
        }
        Ok(val)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());

        Ok(Self {
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            database_path: std::env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "data/dispatch.redb".into()),
            jwt_secret: Self::require_secret("JWT_SECRET", &environment)?,
            stripe_secret_key: Self::require_secret("STRIPE_SECRET_KEY", &environment)?,
            stripe_webhook_secret: Self::require_secret("STRIPE_WEBHOOK_SECRET", &environment)?,
            payment_currency: std::env::var("PAYMENT_CURRENCY")
                .map(|c| c.to_lowercase())
                .unwrap_or_else(|_| "usd".into()),
            frontend_url: std::env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3001".into()),
            log_format: std::env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".into()),
            environment,
        })
    }

    pub fn json_logs(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_development_gets_placeholder_secret() {
        let secret = Config::secret_from(None, "JWT_SECRET", "development").unwrap();
        assert_eq!(secret, "dev-JWT_SECRET-not-for-production");
    }

    #[test]
    fn test_production_requires_secret() {
        assert!(Config::secret_from(None, "JWT_SECRET", "production").is_err());
        assert!(Config::secret_from(Some(String::new()), "JWT_SECRET", "production").is_err());
        assert_eq!(
            Config::secret_from(Some("s3cret".into()), "JWT_SECRET", "production").unwrap(),
            "s3cret"
        );
    }
}
