//! Table module providing multi-table support with async actor model.
//!
//! This module implements:
//! - TableActor: Async actor owning a single table's [`Game`](crate::game::Game)
//! - TableManager: Registry that spawns tables and routes requests to them
//! - TurnClock: Per-turn deadline that auto-checks or auto-folds on expiry
//!
//! ## Architecture
//!
//! Each table runs in a separate Tokio task with an mpsc message inbox.
//! Requests carry a oneshot reply channel and are handled strictly in
//! arrival order; nothing is shared between tables.
//!
//! ## Example
//!
//! ```no_run
//! use holdem::{
//!     game::entities::{Action, PlayerId},
//!     table::{TableConfig, TableManager},
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = TableManager::new();
//!     let table_id = manager.create_table(TableConfig::default()).await?;
//!
//!     manager.join_table(table_id, PlayerId::new("ann"), "Ann".into()).await?;
//!     manager.join_table(table_id, PlayerId::new("bob"), "Bob".into()).await?;
//!     manager.start_round(table_id).await?;
//!     manager.submit_action(table_id, PlayerId::new("ann"), Action::Call).await?;
//!     Ok(())
//! }
//! ```

pub mod actor;
pub mod config;
pub mod manager;
pub mod messages;
pub mod timer;

/// Table identifier assigned by the [`TableManager`].
pub type TableId = i64;

pub use actor::{TableActor, TableHandle};
pub use config::{ConfigError, TableConfig, TableSpeed};
pub use manager::{TableManager, TableManagerError};
pub use messages::{TableMessage, TableNotification, TableResponse, TableStateResponse};
pub use timer::TurnClock;
