//! Settings read from the environment
use nnbringup_core::Seed;

/// Log filter directives (`tracing_subscriber::EnvFilter` syntax)
pub const LOG_ENV: &str = "NNBRINGUP_LOG";
/// Fixed initialization seed
pub const SEED_ENV: &str = "NNBRINGUP_SEED";

pub const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub log_filter: String,
    pub seed: Seed,
    /// Problems found while reading the environment, reported once logging is up
    pub warnings: Vec<String>,
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut warnings = Vec::new();

        let log_filter = lookup(LOG_ENV)
            .filter(|raw| !raw.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        let seed = match lookup(SEED_ENV) {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(parsed) => Seed(parsed),
                Err(_) => {
                    warnings.push(format!(
                        "Invalid {}='{}', falling back to a clock seed",
                        SEED_ENV, raw
                    ));
                    Seed::from_clock()
                }
            },
            None => Seed::from_clock(),
        };

        Self {
            log_filter,
            seed,
            warnings,
        }
    }

    pub fn log_warnings(&self) {
        for warning in &self.warnings {
            tracing::warn!("{}", warning);
        }
    }
}
