//! Feature encoding for the churn workflow.
//!
//! Transformers follow a fit/transform split: an unfitted transformer holds
//! settings, fitting learns parameters from a table, and the fitted
//! transformer applies exactly those parameters to any later table. Fitted
//! transformers serialize to a parameter struct so the schema learned on the
//! training data can be reloaded at scoring time.
//!
//! # Core Traits
//!
//! - [`Transformer`]: Unfitted transformer with settings
//! - [`FittedTransformer`]: Fitted transformer ready for inference
//!
//! # Available Transformers
//!
//! - [`OneHotEncoder`]: indicator columns per category
//! - [`LabelEncoder`]: binary target to a single 0/1 column
//! - [`ChurnEncoder`]: full table-to-matrix encoding, label first
//!
//! # Example
//!
//! ```ignore
//! use churnflow::preprocessing::{ChurnEncoder, FittedChurnEncoder, FittedTransformer, Transformer};
//!
//! let fitted = ChurnEncoder::churn().fit(&table)?;
//! let matrix = fitted.transform(&table)?;
//! fitted.save_to_file("encoder.bin")?;
//!
//! // Later, reapply the same schema to unlabelled data
//! let loaded = FittedChurnEncoder::load_from_file("encoder.bin")?;
//! let features = loaded.transform_features(&new_customers)?;
//! ```

pub mod encoder;
pub mod encoding;
pub mod traits;

pub use encoder::{ChurnEncoder, EncodingSchema, FittedChurnEncoder};
pub use encoding::{
    FittedLabelEncoder, FittedOneHotEncoder, HandleUnknown, LabelEncoder, LabelEncoderParams,
    OneHotEncoder, OneHotEncoderParams,
};
pub use traits::{FittedTransformer, Transformer};
