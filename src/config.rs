// Solve options and process configuration.
//
// `SolveOptions` travel with each solve. `AppConfig` is read once at
// start-up from the environment (and a `.env` file when present).

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use crate::domain::{OptError, Result, SolverBackend, DEFAULT_TOLERANCE};

pub const DEFAULT_ADDR: &str = "0.0.0.0:50051";
pub const DEFAULT_TERMINATION_GRACE: Duration = Duration::from_millis(100);

/// Configuration for one solve
#[derive(Debug, Clone, PartialEq)]
pub struct SolveOptions {
    pub backend: SolverBackend,
    /// Wall-clock budget; `None` means unlimited.
    pub time_limit: Option<Duration>,
    pub tolerance: f64,
    /// How long to wait for a stopped session to hand back its incumbent.
    pub termination_grace: Duration,
    pub node_limit: Option<u64>,
    pub verbose: bool,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            backend: SolverBackend::Auto,
            time_limit: None,
            tolerance: DEFAULT_TOLERANCE,
            termination_grace: DEFAULT_TERMINATION_GRACE,
            node_limit: None,
            verbose: false,
        }
    }
}

impl SolveOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_backend(mut self, backend: SolverBackend) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_termination_grace(mut self, grace: Duration) -> Self {
        self.termination_grace = grace;
        self
    }

    pub fn with_node_limit(mut self, nodes: u64) -> Self {
        self.node_limit = Some(nodes);
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn budget(&self) -> Duration {
        self.time_limit.unwrap_or(Duration::MAX)
    }
}

/// gRPC server settings
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub addr: SocketAddr,
}

/// Process configuration
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub server: ServerConfig,
    /// Defaults applied to requests that do not override them.
    pub solve: SolveOptions,
}

impl AppConfig {
    /// Load `.env` (if any) and read `OPTBRIDGE_*` variables.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let addr_text = lookup("OPTBRIDGE_ADDR").unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let addr = addr_text
            .parse::<SocketAddr>()
            .map_err(|e| OptError::Config(format!("OPTBRIDGE_ADDR '{}': {}", addr_text, e)))?;

        let mut solve = SolveOptions::default();
        if let Some(backend) = lookup("OPTBRIDGE_BACKEND") {
            solve.backend = backend.parse()?;
        }
        if let Some(secs) = lookup("OPTBRIDGE_TIME_LIMIT_SECS") {
            let secs = parse_number(&secs, "OPTBRIDGE_TIME_LIMIT_SECS")?;
            solve.time_limit = Some(time_limit_from_secs(secs, "OPTBRIDGE_TIME_LIMIT_SECS")?);
        }
        if let Some(tolerance) = lookup("OPTBRIDGE_TOLERANCE") {
            let tolerance = parse_number(&tolerance, "OPTBRIDGE_TOLERANCE")?;
            if tolerance <= 0.0 || !tolerance.is_finite() {
                return Err(OptError::Config(format!(
                    "OPTBRIDGE_TOLERANCE must be positive, got {}",
                    tolerance
                )));
            }
            solve.tolerance = tolerance;
        }

        Ok(Self {
            server: ServerConfig { addr },
            solve,
        })
    }
}

/// Time limit from seconds; negative, non-finite and out-of-range values
/// are configuration errors.
pub fn time_limit_from_secs(secs: f64, source: &str) -> Result<Duration> {
    Duration::try_from_secs_f64(secs).map_err(|e| {
        OptError::Config(format!(
            "{} must be a non-negative number of seconds, got {}: {}",
            source, secs, e
        ))
    })
}

fn parse_number(text: &str, key: &str) -> Result<f64> {
    text.trim()
        .parse::<f64>()
        .map_err(|e| OptError::Config(format!("{} '{}': {}", key, text, e)))
}
