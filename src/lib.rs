// Core modules
pub mod api;
pub mod config;
pub mod console;
pub mod discovery;
pub mod error;
pub mod execution;
pub mod models;
pub mod monitor;
pub mod sniper;

// Re-export commonly used types
pub use api::{MarketDataProvider, TradeVenue, WalletBalance};
pub use error::{BookError, BuyError, ConfigError, ManualSellError, ProviderError, SellError, VenueError};
pub use models::*;
pub use monitor::{CycleReport, ExitThresholds, MonitorConfig, MonitorLoop, PositionOutcome};
pub use sniper::{SnipeOutcome, SnipeResult, Sniper};
