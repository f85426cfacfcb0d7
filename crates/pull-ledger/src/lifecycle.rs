use crate::error::LedgerError;

/// Context the host passes when it opens a transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionContext {
    /// Identifier of the message or request processed in this transaction
    pub id: Option<String>,
}

impl TransactionContext {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: Some(id.into()) }
    }
}

/// Hooks a two-phase-commit host calls on a transactional plugin.
///
/// The host serializes calls for one plugin instance: `init` or
/// `restore_from_checkpoint` once at start, then any number of
/// `begin` / `prepare_for_commit` / `commit` or `abort` rounds.
pub trait TransactionalPlugin {
    fn init(&mut self) -> Result<(), LedgerError>;

    /// Rebuild from the last prepared snapshot, or start empty with `None`.
    fn restore_from_checkpoint(&mut self, blob: Option<&[u8]>) -> Result<(), LedgerError>;

    fn begin(&mut self, ctx: &TransactionContext) -> Result<(), LedgerError>;

    fn prepare_for_commit(&mut self) -> Result<Vec<u8>, LedgerError>;

    fn commit(&mut self) -> Result<(), LedgerError>;

    fn abort(&mut self) -> Result<(), LedgerError>;
}
