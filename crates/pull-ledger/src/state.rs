use std::fmt;

/// Phase of the ledger's transaction state machine.
///
/// `Idle -> InTransaction -> Prepared -> Idle`; `abort` returns to `Idle`
/// from anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionPhase {
    /// No open transaction, the pending log is empty
    #[default]
    Idle,

    /// Operations are being logged
    InTransaction,

    /// A snapshot was handed out, waiting for commit or abort
    Prepared,
}

impl TransactionPhase {
    pub fn is_open(&self) -> bool {
        matches!(
            self,
            TransactionPhase::InTransaction | TransactionPhase::Prepared
        )
    }
}

impl fmt::Display for TransactionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransactionPhase::Idle => "idle",
            TransactionPhase::InTransaction => "in transaction",
            TransactionPhase::Prepared => "prepared",
        };
        f.write_str(name)
    }
}
