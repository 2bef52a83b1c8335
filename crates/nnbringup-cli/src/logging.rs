//! Tracing subscriber setup. Everything goes to stderr; stdout carries only
//! the bring-up report.
use anyhow::Context;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{DEFAULT_LOG_FILTER, LOG_ENV};

pub fn init(directives: &str) -> anyhow::Result<()> {
    let (filter, rejected) = match EnvFilter::try_new(directives) {
        Ok(filter) => (filter, None),
        Err(e) => (EnvFilter::new(DEFAULT_LOG_FILTER), Some(e)),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init()
        .context("failed to install tracing subscriber")?;

    if let Some(e) = rejected {
        tracing::warn!(
            "Invalid {}='{}' ({}), falling back to '{}'",
            LOG_ENV,
            directives,
            e,
            DEFAULT_LOG_FILTER
        );
    }
    Ok(())
}
