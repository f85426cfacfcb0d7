use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::{debug, info, trace};

use crate::checkpoint::{Checkpoint, ResourceDescriptor};
use crate::error::LedgerError;
use crate::lifecycle::{TransactionContext, TransactionalPlugin};
use crate::operation::PendingOperation;
use crate::owner::{HandlerBinding, ResourceOwner};
use crate::sink::ResourceSink;
use crate::state::TransactionPhase;

/// Transactional record of one owner's declared resources.
///
/// Mutating calls only append to the pending log of the open transaction.
/// `commit` applies the log, in order, to the committed set and forwards each
/// operation to the sink. Calls for one ledger must not be interleaved.
pub struct ResourceLedger {
    owner_id: String,
    owner: Arc<dyn ResourceOwner>,
    sink: Arc<dyn ResourceSink>,
    committed: BTreeMap<String, ResourceDescriptor>,
    pending: Vec<PendingOperation>,
    phase: TransactionPhase,
}

impl ResourceLedger {
    pub fn new(
        owner_id: impl Into<String>,
        owner: Arc<dyn ResourceOwner>,
        sink: Arc<dyn ResourceSink>,
    ) -> Self {
        Self {
            owner_id: owner_id.into(),
            owner,
            sink,
            committed: BTreeMap::new(),
            pending: Vec::new(),
            phase: TransactionPhase::Idle,
        }
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn phase(&self) -> TransactionPhase {
        self.phase
    }

    /// Operations logged in the open transaction.
    pub fn pending(&self) -> &[PendingOperation] {
        &self.pending
    }

    pub fn declare(&mut self, alias: &str, url: &str, notify_handler: &str) -> Result<(), LedgerError> {
        self.record(PendingOperation::Add {
            alias: alias.to_string(),
            url: url.to_string(),
            notify_handler: notify_handler.to_string(),
        })
    }

    pub fn undeclare(&mut self, alias: &str) -> Result<(), LedgerError> {
        self.record(PendingOperation::Remove {
            alias: alias.to_string(),
        })
    }

    pub fn force_refresh(&mut self, alias: &str) -> Result<(), LedgerError> {
        self.record(PendingOperation::Refresh {
            alias: alias.to_string(),
        })
    }

    /// Committed descriptor for `alias`, with the version and path the engine
    /// last delivered for it.
    pub fn get(&self, alias: &str) -> Option<ResourceDescriptor> {
        let mut descriptor = self.committed.get(alias)?.clone();
        if let Some(info) = self.sink.registration(&self.owner_id, alias) {
            descriptor.current_version = info.current_version;
            descriptor.cached_path = info.cached_path;
        }
        Some(descriptor)
    }

    pub fn list_aliases(&self) -> BTreeSet<String> {
        self.committed.keys().cloned().collect()
    }

    pub fn begin(&mut self) -> Result<(), LedgerError> {
        if self.phase != TransactionPhase::Idle {
            return Err(LedgerError::InvalidTransition {
                from: self.phase,
                action: "begin",
            });
        }
        self.pending.clear();
        self.phase = TransactionPhase::InTransaction;
        trace!(owner = %self.owner_id, "begin transaction");
        Ok(())
    }

    /// Snapshot the committed set and the pending log without applying
    /// anything. May be called repeatedly before `commit`.
    pub fn prepare(&mut self) -> Result<Vec<u8>, LedgerError> {
        if !self.phase.is_open() {
            return Err(LedgerError::InvalidTransition {
                from: self.phase,
                action: "prepare",
            });
        }
        let snapshot = self.checkpoint().to_bytes()?;
        self.phase = TransactionPhase::Prepared;
        trace!(owner = %self.owner_id, pending = self.pending.len(), "prepared transaction");
        Ok(snapshot)
    }

    pub fn commit(&mut self) -> Result<(), LedgerError> {
        if !self.phase.is_open() {
            return Err(LedgerError::InvalidTransition {
                from: self.phase,
                action: "commit",
            });
        }
        let log = std::mem::take(&mut self.pending);
        debug!(owner = %self.owner_id, operations = log.len(), "Committing transaction");
        self.apply(log);
        self.phase = TransactionPhase::Idle;
        Ok(())
    }

    /// Drop the pending log. Committed state and the sink are not touched.
    pub fn abort(&mut self) {
        if self.phase.is_open() {
            debug!(owner = %self.owner_id, discarded = self.pending.len(), "Aborting transaction");
        }
        self.pending.clear();
        self.phase = TransactionPhase::Idle;
    }

    /// Reset to an empty ledger.
    pub fn init(&mut self) {
        self.committed.clear();
        self.pending.clear();
        self.phase = TransactionPhase::Idle;
    }

    /// Rebuild from a snapshot produced by [`prepare`](Self::prepare).
    ///
    /// Every committed resource is re-added to the sink, then the log that
    /// was pending in the snapshot is applied. Nothing is replayed if the
    /// snapshot cannot be parsed.
    pub fn restore(&mut self, snapshot: &[u8]) -> Result<(), LedgerError> {
        if self.phase != TransactionPhase::Idle {
            return Err(LedgerError::InvalidTransition {
                from: self.phase,
                action: "restore",
            });
        }
        let checkpoint = Checkpoint::from_bytes(snapshot)?;
        let log = checkpoint.replay_log();
        info!(
            owner = %self.owner_id,
            resources = checkpoint.resources.len(),
            pending = checkpoint.pending_operations.len(),
            "Restoring ledger from checkpoint"
        );

        self.committed = checkpoint.resources;
        self.pending.clear();
        self.apply(log);
        Ok(())
    }

    /// Drop every registration of this owner from the sink and forget all
    /// ledger state. Returns how many registrations were removed.
    pub fn teardown(&mut self) -> usize {
        let removed = self.sink.remove_owner(&self.owner_id);
        self.init();
        debug!(owner = %self.owner_id, removed, "Ledger torn down");
        removed
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            resources: self.committed.clone(),
            pending_operations: self.pending.clone(),
        }
    }

    fn record(&mut self, op: PendingOperation) -> Result<(), LedgerError> {
        match self.phase {
            TransactionPhase::InTransaction => {
                trace!(owner = %self.owner_id, alias = op.alias(), op = op.name(), "logged operation");
                self.pending.push(op);
                Ok(())
            }
            TransactionPhase::Prepared => Err(LedgerError::InvalidTransition {
                from: self.phase,
                action: "log an operation",
            }),
            TransactionPhase::Idle => Err(LedgerError::NotInTransaction),
        }
    }

    fn apply(&mut self, log: Vec<PendingOperation>) {
        for op in log {
            trace!(owner = %self.owner_id, alias = op.alias(), op = op.name(), "applying operation");
            match op {
                PendingOperation::Add {
                    alias,
                    url,
                    notify_handler,
                } => {
                    let notifier = Arc::new(HandlerBinding::new(
                        Arc::clone(&self.owner),
                        notify_handler.as_str(),
                        alias.as_str(),
                    ));
                    self.sink
                        .add_resource(&self.owner_id, &alias, &url, notifier);
                    self.committed.insert(
                        alias.clone(),
                        ResourceDescriptor::new(alias, url, notify_handler),
                    );
                }
                PendingOperation::Remove { alias } => {
                    self.committed.remove(&alias);
                    self.sink.remove_resource(&self.owner_id, &alias);
                }
                PendingOperation::Refresh { alias } => {
                    self.sink.refresh_resource(&self.owner_id, &alias);
                }
            }
        }
    }
}

impl TransactionalPlugin for ResourceLedger {
    fn init(&mut self) -> Result<(), LedgerError> {
        ResourceLedger::init(self);
        Ok(())
    }

    fn restore_from_checkpoint(&mut self, blob: Option<&[u8]>) -> Result<(), LedgerError> {
        match blob {
            Some(blob) => self.restore(blob),
            None => {
                ResourceLedger::init(self);
                Ok(())
            }
        }
    }

    fn begin(&mut self, ctx: &TransactionContext) -> Result<(), LedgerError> {
        if let Some(id) = &ctx.id {
            trace!(owner = %self.owner_id, transaction = %id, "host opened transaction");
        }
        ResourceLedger::begin(self)
    }

    fn prepare_for_commit(&mut self) -> Result<Vec<u8>, LedgerError> {
        self.prepare()
    }

    fn commit(&mut self) -> Result<(), LedgerError> {
        ResourceLedger::commit(self)
    }

    fn abort(&mut self) -> Result<(), LedgerError> {
        ResourceLedger::abort(self);
        Ok(())
    }
}
