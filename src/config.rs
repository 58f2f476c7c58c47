//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Route the flow hands off to once the last question is answered.
pub const DEFAULT_COMPLETION_ROUTE: &str = "/personality-tests/introduction?type=patient";

/// Route rendering for navigation destinations.
#[derive(Debug, Clone)]
pub struct RouteConfig {
    /// Entry point (landing page).
    pub entry_route: String,
    /// Prefix for question pages; the step name is appended.
    pub question_prefix: String,
    /// External route reached after the final step.
    pub completion_route: String,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            entry_route: "/".to_string(),
            question_prefix: "/questions".to_string(),
            completion_route: DEFAULT_COMPLETION_ROUTE.to_string(),
        }
    }
}

/// Intake flow configuration, built from environment variables.
#[derive(Debug, Clone)]
pub struct IntakeConfig {
    /// Base URL of the session store API.
    pub api_url: String,
    /// Value of the `anonymous_session` cookie, if a session already exists.
    pub session_cookie: Option<SecretString>,
    /// Local database holding the persisted step history.
    pub db_path: PathBuf,
    /// Scope under which this flow instance's history is persisted.
    pub flow_key: String,
    /// Port for the REST routes.
    pub http_port: u16,
    /// Transport timeout for session store requests.
    pub http_timeout: Duration,
    pub routes: RouteConfig,
}

impl IntakeConfig {
    /// Build config from environment variables.
    ///
    /// `INTAKE_API_URL` is required; everything else has a default.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_url = std::env::var("INTAKE_API_URL")
            .map_err(|_| ConfigError::MissingEnvVar("INTAKE_API_URL".to_string()))?;
        if !api_url.starts_with("http://") && !api_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue {
                key: "INTAKE_API_URL".to_string(),
                message: format!("expected an http(s) URL, got {api_url}"),
            });
        }

        let session_cookie = std::env::var("INTAKE_SESSION_COOKIE")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(SecretString::from);

        let db_path = std::env::var("INTAKE_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data/intake.db"));

        let flow_key = std::env::var("INTAKE_FLOW_KEY").unwrap_or_else(|_| "default".to_string());

        let http_port = parse_env("INTAKE_HTTP_PORT", 8080u16)?;
        let timeout_secs = parse_env("INTAKE_HTTP_TIMEOUT_SECS", 30u64)?;

        let mut routes = RouteConfig::default();
        if let Ok(route) = std::env::var("INTAKE_COMPLETION_ROUTE") {
            routes.completion_route = route;
        }

        Ok(Self {
            api_url,
            session_cookie,
            db_path,
            flow_key,
            http_port,
            http_timeout: Duration::from_secs(timeout_secs),
            routes,
        })
    }
}

fn parse_env<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}
