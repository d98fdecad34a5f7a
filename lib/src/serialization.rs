//! Serialization of fitted preprocessing parameters.
//!
//! Fitted transformers are persisted as plain parameter structs, never as the
//! transformer itself, so a schema learned at training time can be reloaded
//! and reapplied unchanged when scoring.

use std::error::Error;

/// A trait for parameter representations that can be serialized to and from bytes.
///
/// Implementors should contain only plain data (column names, category
/// values), not open handles or derived lookup tables.
pub trait SerializableParams: Sized {
    /// The error type returned during (de)serialization.
    type Error: Error + Send + Sync + 'static;

    /// Serialize the parameters into a byte buffer.
    fn to_bytes(&self) -> Result<Vec<u8>, Self::Error>;

    /// Deserialize the parameters from a byte buffer.
    fn from_bytes(bytes: &[u8]) -> Result<Self, Self::Error>;
}

impl<T> SerializableParams for T
where
    T: serde::Serialize + for<'de> serde::Deserialize<'de>,
{
    type Error = bincode::Error;

    fn to_bytes(&self) -> Result<Vec<u8>, Self::Error> {
        bincode::serialize(self)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, Self::Error> {
        bincode::deserialize(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Categories {
        column: String,
        values: Vec<String>,
    }

    #[test]
    fn test_params_bytes_roundtrip() {
        let params = Categories {
            column: "Area Code".to_string(),
            values: vec!["408".to_string(), "415".to_string(), "510".to_string()],
        };
        let bytes = params.to_bytes().unwrap();
        let restored = Categories::from_bytes(&bytes).unwrap();
        assert_eq!(restored, params);
    }

    #[test]
    fn test_params_truncated_bytes_fail() {
        let params = Categories {
            column: "State".to_string(),
            values: vec!["KS".to_string()],
        };
        let bytes = params.to_bytes().unwrap();
        assert!(Categories::from_bytes(&bytes[..bytes.len() - 1]).is_err());
    }
}
