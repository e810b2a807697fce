pub mod commands;
pub mod defaults;
pub mod queries;
pub mod routes;

pub use commands::{
    ReconcileCommand, ReconcileError, ReconcileResponse, RecordActionCommand, RecordActionError,
    RecordActionResponse,
};

pub use queries::{
    GetActionError, GetActionQuery, GetActionResponse, ListActionsError, ListActionsQuery,
    ListActionsResponse, ReadSource, StatsError, StatsQuery, StatsResponse,
};

pub use routes::compliance_routes;
