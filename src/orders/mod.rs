//! Order Management Module
//!
//! # Architecture
//!
//! - `OrderStore` - Shared in-memory ledger, the single source of order truth
//! - `OcoWatcher` / `create_oco_pair` - One-cancels-other pairs
//! - Core types - `OrderId`, `OrderRecord`
//!
//! # Example
//!
//! ```
//! use execution_core::orders::{OrderId, OrderRecord, OrderStore};
//! use execution_core::types::{OrderSide, OrderType};
//! use rust_decimal_macros::dec;
//!
//! let store = OrderStore::new();
//! store.upsert(
//!     OrderRecord::new(OrderId::new("abc-123"), "manual", "BTCUSDT.PAPER", OrderSide::Buy, OrderType::Limit, dec!(1)),
//!     "placement",
//! );
//! assert_eq!(store.list_open().len(), 1);
//! ```

mod oco;
mod store;
mod types;

pub use oco::{create_oco_pair, OcoConfig, OcoError, OcoLeg, OcoPair, OcoPassReport, OcoWatcher};
pub use store::{OrderStore, UpsertOutcome};
pub use types::{OrderId, OrderRecord};
