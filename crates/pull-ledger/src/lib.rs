//! # Pull Ledger
//!
//! Per-owner record of declared resources with two-phase-commit semantics.
//! Declarations, removals and refresh requests are logged inside a
//! transaction and only reach the [`pull_engine::ResourceCacheEngine`] when
//! the transaction commits. A prepared snapshot is enough to rebuild both the
//! committed set and the engine registrations after a restart.

pub mod checkpoint;
pub mod error;
pub mod ledger;
pub mod lifecycle;
pub mod operation;
pub mod owner;
pub mod sink;
pub mod state;

pub use checkpoint::{Checkpoint, ResourceDescriptor};
pub use error::LedgerError;
pub use ledger::ResourceLedger;
pub use lifecycle::{TransactionContext, TransactionalPlugin};
pub use operation::PendingOperation;
pub use owner::{HandlerBinding, ResourceOwner};
pub use sink::ResourceSink;
pub use state::TransactionPhase;
