//! # Block Size Limit
//!
//! The limit for the next block is the median of the last `W` block sizes
//! (W odd, so the median is one element), times `block_size_scale`, clamped
//! to `[default_min_block_size, 2 * default_max_block_size]`.
//!
//! A young chain with fewer than `W` blocks pads the window with
//! `default_max_block_size / 2`.

use crate::domain::params::ProtocolParams;

/// Maximum size in bytes for the block following `recent_sizes`.
///
/// `recent_sizes` is ordered oldest first; only the last `W` entries count.
pub fn max_block_size(recent_sizes: &[u64], params: &ProtocolParams) -> u64 {
    let w = params.block_size_window.max(1);
    let start = recent_sizes.len().saturating_sub(w);
    let mut window: Vec<u64> = recent_sizes[start..].to_vec();
    window.resize(w, params.default_max_block_size / 2);
    window.sort_unstable();

    let median = window[w / 2];
    let scaled = median.saturating_mul(params.block_size_scale);
    scaled.clamp(
        params.default_min_block_size,
        params.default_max_block_size.saturating_mul(2),
    )
}
