use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::staffing::TransportationPolicy;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the staffing service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub staffing: StaffingConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let ansi = environment == AppEnvironment::Development;

        let ride_downgrade_ratio = match env::var("APP_RIDE_DOWNGRADE_RATIO") {
            Ok(raw) => parse_ratio(&raw)?,
            Err(_) => StaffingConfig::DEFAULT_RIDE_DOWNGRADE_RATIO,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level, ansi },
            staffing: StaffingConfig {
                ride_downgrade_ratio,
            },
        })
    }
}

fn parse_ratio(raw: &str) -> Result<f64, ConfigError> {
    let value = raw
        .trim()
        .parse::<f64>()
        .map_err(|_| ConfigError::InvalidDowngradeRatio(raw.to_string()))?;
    if value.is_finite() && value > 0.0 && value <= 1.0 {
        Ok(value)
    } else {
        Err(ConfigError::InvalidDowngradeRatio(raw.to_string()))
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Log filter and formatting controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub ansi: bool,
}

/// Business-rule dials.
#[derive(Debug, Clone)]
pub struct StaffingConfig {
    /// Share of worst-case seats at or below which a shuttle downgrade is suggested.
    pub ride_downgrade_ratio: f64,
}

impl StaffingConfig {
    pub const DEFAULT_RIDE_DOWNGRADE_RATIO: f64 = 0.5;

    pub fn transportation_policy(&self) -> TransportationPolicy {
        TransportationPolicy::new(self.ride_downgrade_ratio)
    }
}

impl Default for StaffingConfig {
    fn default() -> Self {
        Self {
            ride_downgrade_ratio: Self::DEFAULT_RIDE_DOWNGRADE_RATIO,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidDowngradeRatio(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidDowngradeRatio(raw) => write!(
                f,
                "APP_RIDE_DOWNGRADE_RATIO must be a number in (0, 1], got '{raw}'"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidDowngradeRatio(_) => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
