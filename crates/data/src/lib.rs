//! Market history collaborators: an in-memory store and CSV loaders.

pub mod csv_loader;
pub mod memory;

pub use csv_loader::{load_candles_from_csv, load_trades_from_csv};
pub use memory::MemoryMarketStore;
