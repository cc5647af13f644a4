//! Feature Layout - Centralized Feature Definition
//!
//! **This file controls the feature schema**
//!
//! ## Rules:
//! 1. Add feature → increment FEATURE_VERSION
//! 2. Change order → increment FEATURE_VERSION
//! 3. Remove feature → increment FEATURE_VERSION
//!
//! Model artifacts record the layout hash they were trained against and are
//! refused at load time when it differs from `layout_hash()`.

use crc32fast::Hasher;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// FEATURE VERSION
// ============================================================================

/// Current feature layout version
pub const FEATURE_VERSION: u8 = 1;

// ============================================================================
// FEATURE NAMES
// ============================================================================

pub const SAMPLE_COUNT: &str = "sample_count";
pub const LAST_VALUE: &str = "last_value";
pub const MOVING_AVERAGE: &str = "moving_average";
pub const MOVING_VARIANCE: &str = "moving_variance";
pub const SLOPE: &str = "slope";
pub const RATE_OF_CHANGE: &str = "rate_of_change";
pub const ZSCORE: &str = "zscore";
pub const ABS_ZSCORE: &str = "abs_zscore";
pub const NORMALIZED_SLOPE: &str = "normalized_slope";
pub const OPERATING_POSITION: &str = "operating_position";
pub const LIMIT_EXCESS: &str = "limit_excess";

// ============================================================================
// FEATURE LAYOUT (Authoritative source)
// ============================================================================

/// Feature names in layout order
pub const FEATURE_LAYOUT: &[&str] = &[
    // === Window (0-1) ===
    SAMPLE_COUNT,       // 0: Readings in the window, incl. the new one
    LAST_VALUE,         // 1: Value of the triggering reading

    // === Rolling statistics (2-5) ===
    MOVING_AVERAGE,     // 2: Mean over the window
    MOVING_VARIANCE,    // 3: Sample variance (n-1)
    SLOPE,              // 4: Least-squares trend per sample
    RATE_OF_CHANGE,     // 5: Change vs previous reading, per second

    // === Deviation (6-7) ===
    ZSCORE,             // 6: Latest value vs preceding readings
    ABS_ZSCORE,         // 7: |zscore|

    // === Operating envelope (8-10) ===
    NORMALIZED_SLOPE,   // 8: Trend over the window / operating width
    OPERATING_POSITION, // 9: 0 at low limit, 1 at high limit
    LIMIT_EXCESS,       // 10: Distance outside the envelope / width
];

/// Must match FEATURE_LAYOUT.len()
pub const FEATURE_COUNT: usize = 11;

// ============================================================================
// LAYOUT HASH
// ============================================================================

/// CRC32 over version + ordered feature names
pub fn compute_layout_hash() -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(&[FEATURE_VERSION]);

    for name in FEATURE_LAYOUT {
        hasher.update(name.as_bytes());
        hasher.update(&[0]);
    }

    hasher.finalize()
}

pub fn layout_hash() -> u32 {
    compute_layout_hash()
}

// ============================================================================
// LAYOUT INFO
// ============================================================================

/// Layout description for logs and model tooling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutInfo {
    pub version: u8,
    pub hash: u32,
    pub feature_count: usize,
    pub feature_names: Vec<String>,
}

impl LayoutInfo {
    pub fn current() -> Self {
        Self {
            version: FEATURE_VERSION,
            hash: layout_hash(),
            feature_count: FEATURE_COUNT,
            feature_names: FEATURE_LAYOUT.iter().map(|s| s.to_string()).collect(),
        }
    }
}

// ============================================================================
// LAYOUT VALIDATION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Error)]
#[error(
    "feature layout mismatch: expected v{expected_version} (hash: {expected_hash:08x}), \
     got v{actual_version} (hash: {actual_hash:08x})"
)]
pub struct LayoutMismatchError {
    pub expected_version: u8,
    pub expected_hash: u32,
    pub actual_version: u8,
    pub actual_hash: u32,
}

pub fn validate_layout(incoming_version: u8, incoming_hash: u32) -> Result<(), LayoutMismatchError> {
    let current_hash = layout_hash();

    if incoming_version != FEATURE_VERSION || incoming_hash != current_hash {
        return Err(LayoutMismatchError {
            expected_version: FEATURE_VERSION,
            expected_hash: current_hash,
            actual_version: incoming_version,
            actual_hash: incoming_hash,
        });
    }

    Ok(())
}

pub fn feature_index(name: &str) -> Option<usize> {
    FEATURE_LAYOUT.iter().position(|&n| n == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_count() {
        assert_eq!(FEATURE_LAYOUT.len(), FEATURE_COUNT);
    }

    #[test]
    fn test_layout_hash_stable_and_non_zero() {
        assert_eq!(compute_layout_hash(), compute_layout_hash());
        assert_ne!(layout_hash(), 0);
    }

    #[test]
    fn test_validate_layout() {
        assert!(validate_layout(FEATURE_VERSION, layout_hash()).is_ok());
        assert!(validate_layout(FEATURE_VERSION + 1, layout_hash()).is_err());
        assert!(validate_layout(FEATURE_VERSION, layout_hash().wrapping_add(1)).is_err());
    }

    #[test]
    fn test_feature_index() {
        assert_eq!(feature_index(SAMPLE_COUNT), Some(0));
        assert_eq!(feature_index(LIMIT_EXCESS), Some(10));
        assert_eq!(feature_index("cpu_percent"), None);
    }

    #[test]
    fn test_layout_info() {
        let info = LayoutInfo::current();
        assert_eq!(info.feature_names.len(), FEATURE_COUNT);
        assert_eq!(info.hash, layout_hash());
    }
}
