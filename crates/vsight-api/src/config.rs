//! API configuration.

use std::time::Duration;

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Rate limit requests per second
    pub rate_limit_rps: u32,
    /// Request timeout
    pub request_timeout: Duration,
    /// Max request body size
    pub max_body_size: usize,
    /// Environment (development/production)
    pub environment: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec!["*".to_string()],
            rate_limit_rps: 10,
            request_timeout: Duration::from_secs(90),
            max_body_size: 30 * 1024 * 1024, // six full-size JPEGs
            environment: "development".to_string(),
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("API_HOST").unwrap_or(defaults.host),
            port: env_parse("API_PORT").unwrap_or(defaults.port),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(defaults.cors_origins),
            rate_limit_rps: env_parse("RATE_LIMIT_RPS").unwrap_or(defaults.rate_limit_rps),
            request_timeout: env_parse("REQUEST_TIMEOUT")
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            max_body_size: env_parse("MAX_BODY_SIZE").unwrap_or(defaults.max_body_size),
            environment: std::env::var("ENVIRONMENT").unwrap_or(defaults.environment),
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "production"
    }
}

/// Location of the platform service that owns views, capabilities,
/// tampering references, images and analytics history.
#[derive(Debug, Clone)]
pub struct PlatformConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8100".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

impl PlatformConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("PLATFORM_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            timeout: env_parse("PLATFORM_TIMEOUT")
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        }
    }
}

/// Day/night split used to pick the reference period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TamperingSettings {
    /// First local hour that counts as day.
    pub day_start_hour: u32,
    /// First local hour that counts as night.
    pub night_start_hour: u32,
}

impl Default for TamperingSettings {
    fn default() -> Self {
        Self {
            day_start_hour: 6,
            night_start_hour: 18,
        }
    }
}

impl TamperingSettings {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let settings = Self {
            day_start_hour: env_parse("TAMPERING_DAY_START_HOUR").unwrap_or(defaults.day_start_hour),
            night_start_hour: env_parse("TAMPERING_NIGHT_START_HOUR")
                .unwrap_or(defaults.night_start_hour),
        };
        if settings.day_start_hour >= settings.night_start_hour || settings.night_start_hour > 24 {
            tracing::warn!(
                day_start = settings.day_start_hour,
                night_start = settings.night_start_hour,
                "Invalid tampering day/night hours, using defaults"
            );
            return defaults;
        }
        settings
    }
}
