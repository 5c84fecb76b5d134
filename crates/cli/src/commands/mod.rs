//! Subcommand implementations.

pub mod references;
pub mod users;

use thiserror::Error;
use vip_admin::config::{AdminConfig, ConfigError};
use vip_admin::error::AppError;
use vip_admin::services::DirectoryError;
use vip_admin::state::{AppState, StateError};

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error(transparent)]
    App(#[from] AppError),

    #[error("commercetools error: {0}")]
    Commercetools(#[from] vip_admin::commercetools::CommercetoolsError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Failed to write output: {0}")]
    Io(#[from] std::io::Error),
}

/// Application state from the environment, as the admin binary builds it.
fn load_state() -> Result<AppState, CommandError> {
    let config = AdminConfig::from_env()?;
    Ok(AppState::new(config)?)
}
