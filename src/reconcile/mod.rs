//! Order Reconciliation Module
//!
//! Keeps the local `OrderStore` eventually consistent with every reachable
//! venue's open-order listing.
//!
//! - `ReconciliationDaemon` - periodic diff of local vs remote open orders
//! - `MissingOrderPolicy` - what a locally-open order that vanished remotely becomes
//! - `import_remote` - mapping of vendor payloads into `OrderRecord`s

mod daemon;
mod import;

pub use daemon::{MissingOrderPolicy, ReconcileConfig, ReconcileReport, ReconciliationDaemon};
pub use import::{import_remote, imported_order_id, ImportError, IMPORTED_CLIENT_KEY};
