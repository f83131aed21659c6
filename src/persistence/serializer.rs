//! Snapshot serializers: convert snapshot data to and from bytes.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::SnapshotError;

/// Encodes and decodes snapshot data.
///
/// An empty byte buffer and `None` are the same thing on both sides.
pub trait SnapshotSerializer<T>: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<Option<T>, SnapshotError>;

    fn encode(&self, data: Option<&T>) -> Result<Vec<u8>, SnapshotError>;
}

/// JSON via serde_json.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer {
    pretty: bool,
}

impl JsonSerializer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits indented JSON, handy when the snapshot is inspected by hand.
    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl<T> SnapshotSerializer<T> for JsonSerializer
where
    T: Serialize + DeserializeOwned,
{
    fn decode(&self, bytes: &[u8]) -> Result<Option<T>, SnapshotError> {
        if bytes.is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_slice(bytes)?))
    }

    fn encode(&self, data: Option<&T>) -> Result<Vec<u8>, SnapshotError> {
        let Some(data) = data else {
            return Ok(Vec::new());
        };
        let bytes = if self.pretty {
            serde_json::to_vec_pretty(data)?
        } else {
            serde_json::to_vec(data)?
        };
        Ok(bytes)
    }
}
