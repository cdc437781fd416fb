//! Logging via tracing-subscriber, installed in two steps.
//!
//! [`bootstrap`] installs the global subscriber at `info` (or `RUST_LOG`)
//! before the config is read, so config loading itself is logged. Once the
//! configured level is known, [`LogHandle::apply`] swaps the filter in place.

use tracing::Subscriber;
use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, reload, util::SubscriberInitExt};

use crate::error::AppError;

const BOOTSTRAP_LEVEL: &str = "info";

/// Handle to the live filter of the installed subscriber.
#[derive(Clone)]
pub struct LogHandle {
    filter: reload::Handle<EnvFilter, Registry>,
}

impl LogHandle {
    /// Replace the active filter.
    ///
    /// With `prefer_level`, `level` wins and `RUST_LOG` is only consulted
    /// when `level` does not parse. Otherwise `RUST_LOG` wins.
    pub fn apply(&self, level: &str, prefer_level: bool) -> Result<(), AppError> {
        let filter = resolve_filter(level, prefer_level)?;
        self.filter
            .reload(filter)
            .map_err(|e| AppError::Logger(format!("failed to apply log level '{level}': {e}")))
    }

    /// The active filter directives, e.g. `"debug"`.
    pub fn current(&self) -> Option<String> {
        self.filter.with_current(|f| f.to_string()).ok()
    }
}

/// Install the global subscriber at the bootstrap level, writing to stderr.
pub fn bootstrap() -> Result<LogHandle, AppError> {
    let (subscriber, handle) = layered(resolve_filter(BOOTSTRAP_LEVEL, false)?);
    subscriber
        .try_init()
        .map_err(|e| AppError::Logger(format!("failed to set subscriber: {e}")))?;
    Ok(handle)
}

fn layered(filter: EnvFilter) -> (impl Subscriber + Send + Sync + 'static, LogHandle) {
    let (filter, handle) = reload::Layer::new(filter);
    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr));
    (subscriber, LogHandle { filter: handle })
}

fn resolve_filter(level: &str, prefer_level: bool) -> Result<EnvFilter, AppError> {
    if prefer_level {
        EnvFilter::try_new(level).or_else(|level_err| {
            EnvFilter::try_from_default_env().map_err(|env_err| {
                AppError::Logger(format!("invalid log level '{level}': {level_err}; RUST_LOG: {env_err}"))
            })
        })
    } else {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(level))
            .map_err(|e| AppError::Logger(format!("invalid log level '{level}': {e}")))
    }
}
