//! Fatal engine error classification

use crate::engine::{EngineErrorData, ErrorType};
use serde::{Deserialize, Serialize};

/// What the controller does about a fatal engine error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryAction {
    /// Resume segment loading from the current position
    StartLoad,
    /// Heal the decoder in place
    RecoverMediaError,
    /// Tear the session down and start a new one
    Reinitialize,
}

impl RecoveryAction {
    /// Action for an engine error; non-fatal errors are left to the engine
    pub fn for_error(error: &EngineErrorData) -> Option<Self> {
        error.fatal.then(|| Self::for_type(error.error_type))
    }

    /// Recovery table
    pub fn for_type(error_type: ErrorType) -> Self {
        match error_type {
            ErrorType::Network => RecoveryAction::StartLoad,
            ErrorType::Media => RecoveryAction::RecoverMediaError,
            ErrorType::KeySystem | ErrorType::Mux | ErrorType::Other => RecoveryAction::Reinitialize,
        }
    }
}

impl std::fmt::Display for RecoveryAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecoveryAction::StartLoad => write!(f, "start_load"),
            RecoveryAction::RecoverMediaError => write!(f, "recover_media_error"),
            RecoveryAction::Reinitialize => write!(f, "reinitialize"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recovery_table() {
        assert_eq!(RecoveryAction::for_type(ErrorType::Network), RecoveryAction::StartLoad);
        assert_eq!(RecoveryAction::for_type(ErrorType::Media), RecoveryAction::RecoverMediaError);
        assert_eq!(RecoveryAction::for_type(ErrorType::Mux), RecoveryAction::Reinitialize);
        assert_eq!(RecoveryAction::for_type(ErrorType::KeySystem), RecoveryAction::Reinitialize);
        assert_eq!(RecoveryAction::for_type(ErrorType::Other), RecoveryAction::Reinitialize);
    }

    #[test]
    fn test_non_fatal_ignored() {
        let error = EngineErrorData::non_fatal(ErrorType::Network, "fragLoadTimeOut");
        assert_eq!(RecoveryAction::for_error(&error), None);

        let error = EngineErrorData::fatal(ErrorType::Network, "manifestLoadError");
        assert_eq!(RecoveryAction::for_error(&error), Some(RecoveryAction::StartLoad));
    }
}
