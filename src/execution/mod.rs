// Order execution and position bookkeeping
pub mod confirmation;
pub mod executor;
pub mod live;
pub mod paper;
pub mod position_book;
pub mod token_locks;

pub use confirmation::ConfirmationPoller;
pub use executor::TradeExecutor;
pub use live::PumpPortalVenue;
pub use paper::PaperBroker;
pub use position_book::PositionBook;
pub use token_locks::{TokenGuard, TokenLocks};
