//! Categorical feature encoding transformers.
//!
//! # Available Encoders
//!
//! ## OneHotEncoder
//! Expands categorical text columns into indicator columns.
//!
//! ```ignore
//! // Input:  Int'l Plan = ["no", "yes", "no"]
//! // Output: Int'l Plan_no, Int'l Plan_yes = [[1,0], [0,1], [1,0]]
//! ```
//!
//! ## LabelEncoder
//! Maps a binary target to a single 0/1 column (the positive-class indicator).
//!
//! # Design Notes
//!
//! Categories are ordered by value, not by first appearance, so refitting on
//! a reshuffled copy of the same data yields the same column order.

mod label;
mod one_hot;

pub use label::{FittedLabelEncoder, LabelEncoder, LabelEncoderParams};
pub use one_hot::{FittedOneHotEncoder, OneHotEncoder, OneHotEncoderParams};

/// Strategy for handling unknown categories during transform.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum HandleUnknown {
    /// Raise an error when unknown categories are encountered.
    #[default]
    Error,
    /// Ignore unknown categories (all-zero indicator group).
    Ignore,
}
