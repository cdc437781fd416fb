//! Application-wide error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error("identity error: {0}")]
    Identity(String),

    #[error("logger error: {0}")]
    Logger(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("relay error: {0}")]
    Relay(String),

    #[error("agent error: {0}")]
    Agent(String),

    #[error("api error: {0}")]
    Api(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn config_error_display() {
        let e = AppError::Config("missing field".into());
        assert!(e.to_string().starts_with("config error"));
        assert!(e.to_string().contains("missing field"));
    }

    #[test]
    fn storage_error_display() {
        let e = AppError::Storage("storage.json is not an object".into());
        assert!(e.to_string().contains("not an object"));
    }

    #[test]
    fn relay_error_display() {
        let e = AppError::Relay("no endpoint for agent1qabc".into());
        assert!(e.to_string().contains("agent1qabc"));
    }

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let e: AppError = io_err.into();
        assert!(e.to_string().contains("io error"));
        let _: &dyn Error = &e;
    }
}
