use crate::models::CandidateToken;

/// Volume filter for freshly listed tokens
///
/// Checks, in order:
/// 1. Input validation (empty address, negative/NaN/infinite volume)
/// 2. Minimum 24h volume threshold
///
/// Returns (passes, reason) tuple
pub fn passes_volume_filter(token: &CandidateToken, min_volume: f64) -> (bool, String) {
    // 1. Input validation
    if token.address.trim().is_empty() {
        return (false, "InvalidData: Empty mint address".to_string());
    }
    if token.volume < 0.0 || !token.volume.is_finite() {
        return (
            false,
            "InvalidData: Volume is negative, NaN, or infinite".to_string(),
        );
    }

    // 2. Volume floor - a launch nobody trades is not worth sniping
    if token.volume < min_volume {
        return (
            false,
            format!("LowVolume: ${:.0}/24h (need ${:.0})", token.volume, min_volume),
        );
    }

    (true, format!("Volume: ${:.0}/24h", token.volume))
}
