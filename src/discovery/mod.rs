// Candidate discovery: listing filter and ranking
pub mod filter;
pub mod scanner;

pub use filter::passes_volume_filter;
pub use scanner::{MarketScanner, MAX_CANDIDATES};
