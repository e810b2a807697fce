pub mod reconcile;
pub mod record;

pub use reconcile::{ReconcileCommand, ReconcileError, ReconcileResponse};
pub use record::{RecordActionCommand, RecordActionError, RecordActionResponse};
