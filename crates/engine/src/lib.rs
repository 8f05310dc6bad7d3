//! Indicator instance management: activation with historical backfill,
//! replay-consistent live updates and lookup.

pub mod config;
pub mod error;
pub mod history;
pub mod instance;
pub mod key;
pub mod manager;
mod order_flow;
pub mod replay;
pub mod sources;
pub mod stats;

pub use config::EngineConfig;
pub use error::EngineError;
pub use history::ResultHistory;
pub use instance::{IndicatorInstance, IndicatorState, InstanceSnapshot};
pub use key::{instance_key, params_hash};
pub use manager::{InstanceManager, UpdateBatch};
pub use replay::OrderFlow;
pub use sources::DataSources;
pub use stats::ManagerStats;
