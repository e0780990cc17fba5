//! Setup errors
//!
//! Runtime failures travel as [`AgentError`]s inside failed responses. Setup
//! code (reading a settings document, validating its workflows) fails with a
//! [`KernelError`] instead, wrapped in an [`error_stack::Report`] so each
//! layer can attach what it was doing:
//!
//! ```text
//! Invalid settings: Invalid input: Invalid workflow step 'sensor': expected agent:action
//! ├╴validating hive settings from hive.yaml
//! ```

use crate::agent::error::AgentError;
use crate::config::ConfigError;
use thiserror::Error;

/// Why a deployment could not be set up
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KernelError {
    /// The document could not be read, substituted or deserialized
    #[error("Failed to load settings: {0}")]
    Load(#[from] ConfigError),

    /// The document parsed but describes something unusable
    #[error("Invalid settings: {0}")]
    InvalidSettings(#[from] AgentError),
}

/// Setup result carrying an attachable report
pub type KernelResult<T> = Result<T, error_stack::Report<KernelError>>;
