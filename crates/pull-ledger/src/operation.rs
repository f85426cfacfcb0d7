use serde::{Deserialize, Serialize};

/// One logged ledger call, replayed in order at commit.
///
/// Serialized with an `op` tag so a checkpoint written by one process can be
/// replayed by the next. A tag outside this set fails to deserialize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op")]
pub enum PendingOperation {
    #[serde(rename = "addResource")]
    Add {
        alias: String,
        url: String,
        #[serde(rename = "notifyHandlerName")]
        notify_handler: String,
    },
    #[serde(rename = "removeResource")]
    Remove { alias: String },
    #[serde(rename = "refreshResource")]
    Refresh { alias: String },
}

impl PendingOperation {
    pub fn alias(&self) -> &str {
        match self {
            PendingOperation::Add { alias, .. }
            | PendingOperation::Remove { alias }
            | PendingOperation::Refresh { alias } => alias,
        }
    }

    /// Name of the engine call this operation turns into.
    pub fn name(&self) -> &'static str {
        match self {
            PendingOperation::Add { .. } => "addResource",
            PendingOperation::Remove { .. } => "removeResource",
            PendingOperation::Refresh { .. } => "refreshResource",
        }
    }
}
