//! Versioned JSON records.
//!
//! Structured values are stored as `{"version": N, "data": ...}` so a future
//! shape change can be detected instead of misread.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Schema version written by this build.
pub const SCHEMA_VERSION: u32 = 1;

/// A persisted record that cannot be used.
///
/// Stores treat a corrupt slot as empty and log the reason.
#[derive(Debug, Error)]
pub enum StorageCorrupt {
    /// The record is not valid JSON of the expected shape.
    #[error("unparseable record: {0}")]
    Unparseable(#[from] serde_json::Error),

    /// The record was written by an incompatible schema version.
    #[error("unsupported schema version {found} (expected {expected})", expected = SCHEMA_VERSION)]
    UnsupportedVersion {
        /// Version found in the record.
        found: u32,
    },

    /// The record parsed but breaks an invariant of its type.
    #[error("invalid record: {0}")]
    Invalid(String),
}

#[derive(Serialize)]
struct RecordOut<'a, T> {
    version: u32,
    data: &'a T,
}

#[derive(Deserialize)]
struct RecordVersion {
    version: u32,
}

#[derive(Deserialize)]
struct RecordIn<T> {
    data: T,
}

/// Encode `value` as a current-version record.
///
/// # Errors
///
/// Returns the serializer error if `value` cannot be encoded.
pub fn encode_record<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(&RecordOut {
        version: SCHEMA_VERSION,
        data: value,
    })
}

/// Decode a record written by [`encode_record`].
///
/// # Errors
///
/// Returns [`StorageCorrupt`] if the record is unparseable or from another
/// schema version.
pub fn decode_record<T: DeserializeOwned>(raw: &str) -> Result<T, StorageCorrupt> {
    let RecordVersion { version } = serde_json::from_str(raw)?;
    if version != SCHEMA_VERSION {
        return Err(StorageCorrupt::UnsupportedVersion { found: version });
    }
    let RecordIn { data } = serde_json::from_str(raw)?;
    Ok(data)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_shape() {
        let raw = encode_record(&vec![1, 2, 3]).unwrap();
        assert_eq!(raw, r#"{"version":1,"data":[1,2,3]}"#);
        let back: Vec<i32> = decode_record(&raw).unwrap();
        assert_eq!(back, vec![1, 2, 3]);
    }

    #[test]
    fn test_rejects_other_versions() {
        let err = decode_record::<Vec<i32>>(r#"{"version":2,"data":[]}"#).unwrap_err();
        assert!(matches!(err, StorageCorrupt::UnsupportedVersion { found: 2 }));
    }

    #[test]
    fn test_rejects_unversioned_legacy_arrays() {
        // Records written before versioning were bare arrays.
        let err = decode_record::<Vec<i32>>("[1,2]").unwrap_err();
        assert!(matches!(err, StorageCorrupt::Unparseable(_)));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(decode_record::<Vec<i32>>("{not json").is_err());
        assert!(decode_record::<Vec<i32>>(r#"{"version":1,"data":"x"}"#).is_err());
    }
}
