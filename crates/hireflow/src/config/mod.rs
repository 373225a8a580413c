use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use crate::workflows::hiring::{
    EvaluationThresholds, HiringSettings, MatchThresholds, MatchWeights, ValidationError,
};

const DEFAULT_AGENT_TIMEOUT_MS: u64 = 5_000;

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

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub agent: AgentConfig,
    pub scoring: ScoringConfig,
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

        let base_url =
            env::var("AGENT_BASE_URL").unwrap_or_else(|_| "http://127.0.0.1:8000/api".to_string());
        let timeout_ms = match env::var("AGENT_TIMEOUT_MS") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|ms| *ms > 0)
                .ok_or(ConfigError::InvalidTimeout { value: raw })?,
            Err(_) => DEFAULT_AGENT_TIMEOUT_MS,
        };

        let scoring = ScoringConfig::from_env()?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            agent: AgentConfig {
                base_url,
                timeout: Duration::from_millis(timeout_ms),
            },
            scoring,
        })
    }

    pub fn hiring_settings(&self) -> HiringSettings {
        HiringSettings {
            weights: self.scoring.weights,
            match_thresholds: self.scoring.match_thresholds,
            evaluation_thresholds: self.scoring.evaluation_thresholds,
            agent_timeout: self.agent.timeout,
        }
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

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Where the external agents live and how long a single call may take.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub base_url: String,
    pub timeout: Duration,
}

/// Weights and cut-offs shared by matching and interview evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScoringConfig {
    pub weights: MatchWeights,
    pub match_thresholds: MatchThresholds,
    pub evaluation_thresholds: EvaluationThresholds,
}

impl ScoringConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let mut scoring = Self::default();

        if let Ok(raw) = env::var("MATCH_WEIGHTS") {
            scoring.weights = parse_weights(&raw)?;
        }
        if let Ok(raw) = env::var("MATCH_THRESHOLDS") {
            let [high, recommended, consider] = parse_fixed::<3>("MATCH_THRESHOLDS", &raw)?;
            scoring.match_thresholds = MatchThresholds::new(high, recommended, consider)
                .map_err(|source| ConfigError::InvalidScoring {
                    variable: "MATCH_THRESHOLDS",
                    source,
                })?;
        }
        if let Ok(raw) = env::var("EVALUATION_THRESHOLDS") {
            let [strong, pass, borderline] = parse_fixed::<3>("EVALUATION_THRESHOLDS", &raw)?;
            scoring.evaluation_thresholds = EvaluationThresholds::new(strong, pass, borderline)
                .map_err(|source| ConfigError::InvalidScoring {
                    variable: "EVALUATION_THRESHOLDS",
                    source,
                })?;
        }

        Ok(scoring)
    }
}

/// Parse `skill,experience,salary,culture` weights, e.g. `0.4,0.2,0.2,0.2`.
pub fn parse_weights(raw: &str) -> Result<MatchWeights, ConfigError> {
    let [skill, experience, salary, culture] = parse_fixed::<4>("MATCH_WEIGHTS", raw)?;
    MatchWeights::new(skill, experience, salary, culture).map_err(|source| {
        ConfigError::InvalidScoring {
            variable: "MATCH_WEIGHTS",
            source,
        }
    })
}

fn parse_fixed<const N: usize>(variable: &'static str, raw: &str) -> Result<[f64; N], ConfigError> {
    let invalid = || ConfigError::InvalidNumberList {
        variable,
        expected: N,
        value: raw.to_string(),
    };

    let values = raw
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| invalid())?;

    values.try_into().map_err(|_| invalid())
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost {
        source: std::net::AddrParseError,
    },
    InvalidTimeout {
        value: String,
    },
    InvalidNumberList {
        variable: &'static str,
        expected: usize,
        value: String,
    },
    InvalidScoring {
        variable: &'static str,
        source: ValidationError,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidTimeout { value } => {
                write!(f, "AGENT_TIMEOUT_MS must be a positive integer (found '{value}')")
            }
            ConfigError::InvalidNumberList {
                variable,
                expected,
                value,
            } => write!(
                f,
                "{variable} must hold {expected} comma-separated numbers (found '{value}')"
            ),
            ConfigError::InvalidScoring { variable, source } => {
                write!(f, "{variable} is invalid: {source}")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidScoring { source, .. } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidTimeout { .. }
            | ConfigError::InvalidNumberList { .. } => None,
        }
    }
}
