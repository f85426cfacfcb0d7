use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Fetch error: {0}")]
    Fetch(#[from] pull_engine::FetchError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] pull_ledger::LedgerError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Initialization failed: {0}")]
    Initialization(String),

    #[error("Owner failed: {0}")]
    OwnerFailure(String),
}
