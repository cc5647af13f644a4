//! Features Module - Rolling feature extraction
//!
//! - `layout.rs` - versioned feature names + CRC32 layout hash
//! - `vector.rs` - immutable `FeatureVector`
//! - `window.rs` - window statistics
//! - `computer.rs` - `FeatureComputer` (history window → vector)

pub mod layout;
pub mod vector;
pub mod window;
pub mod computer;

#[cfg(test)]
mod tests;

pub use computer::FeatureComputer;
pub use layout::{layout_hash, LayoutMismatchError, FEATURE_COUNT, FEATURE_LAYOUT, FEATURE_VERSION};
pub use vector::{FeatureVector, FeatureVectorBuilder};
