pub mod get;
pub mod list;
pub mod stats;

use serde::{Deserialize, Serialize};

pub use get::{GetActionError, GetActionQuery, GetActionResponse};
pub use list::{ListActionsError, ListActionsQuery, ListActionsResponse};
pub use stats::{StatsError, StatsQuery, StatsResponse};

/// Actions are stored under their bare id, so a full scan uses the empty prefix
pub const LEDGER_SCAN_PREFIX: &str = "";

/// Which tier served a read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadSource {
    Ledger,
    Index,
    Defaults,
}

impl ReadSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ledger => "ledger",
            Self::Index => "index",
            Self::Defaults => "defaults",
        }
    }
}

impl std::fmt::Display for ReadSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
