use thiserror::Error;

/// Failure talking to a market data source or the wallet RPC.
///
/// Never fatal: callers log it and treat the result as empty/absent.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status} from {endpoint}")]
    Status { endpoint: String, status: u16 },

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
}

/// Failure reported by a trade venue.
#[derive(Debug, Clone, Error)]
pub enum VenueError {
    #[error("order rejected: {0}")]
    Rejected(String),

    #[error("transaction {signature} failed on chain: {reason}")]
    TransactionFailed { signature: String, reason: String },

    #[error("transaction {signature} not confirmed after {attempts} status checks")]
    ConfirmationTimeout { signature: String, attempts: u32 },

    #[error("no reference price for {0}")]
    NoPrice(String),

    #[error("venue unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum BuyError {
    #[error("buy amount must be a positive number of SOL, got {0}")]
    InvalidAmount(f64),

    #[error("insufficient funds: need {required:.4} SOL, wallet holds {available:.4} SOL")]
    InsufficientFunds { required: f64, available: f64 },

    #[error("wallet balance unavailable: {0}")]
    BalanceUnavailable(String),

    #[error("buy execution failed: {0}")]
    ExecutionFailed(String),
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SellError {
    #[error("sell quantity must be a positive number of tokens, got {0}")]
    InvalidQuantity(f64),

    #[error("sell execution failed: {0}")]
    ExecutionFailed(String),

    #[error("sell did not finish within {0:?}")]
    TimedOut(std::time::Duration),
}

/// Operator-initiated sell failure
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ManualSellError {
    #[error("no open position for {0}")]
    NotTracked(String),

    #[error(transparent)]
    Sell(#[from] SellError),
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum BookError {
    #[error("position already tracked for {0}")]
    AlreadyTracked(String),
}

/// Fatal startup error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("missing required setting `{0}`")]
    Missing(&'static str),

    #[error("invalid setting `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}
