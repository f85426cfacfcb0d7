use thiserror::Error;

use crate::state::TransactionPhase;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("cannot {action} while {from}")]
    InvalidTransition {
        from: TransactionPhase,
        action: &'static str,
    },

    #[error("no open transaction to record the operation in")]
    NotInTransaction,

    /// The checkpoint could not be written, or could not be read back. An
    /// unknown operation tag lands here and halts the restore.
    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] serde_json::Error),
}
