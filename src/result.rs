use std::error::Error;
use std::fmt;
use serde::{Serialize, Deserialize};

use crate::store::StoreError;

/// Errors surfaced by the engine's public operations.
///
/// Every variant resolves to user-visible text or a defined no-op at the
/// transport boundary; nothing propagates past it.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub enum EngineError {
    /// The participant has no profile yet.
    RegistrationRequired,
    /// An internal lock was poisoned.
    Lock,
    /// The persistence layer failed.
    Store(StoreError),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self {
            EngineError::RegistrationRequired => {
                write!(f, "Please use the /start command to enter your name and class before playing.")},
            EngineError::Lock => {
                write!(f, "Error: Internal lock failure.")},
            EngineError::Store(e) => {
                write!(f, "Error: Store failure: {}.", e)},
        }
    }
}

impl Error for EngineError {}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        EngineError::Store(err)
    }
}
