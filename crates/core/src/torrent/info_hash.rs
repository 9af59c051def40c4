use serde_bencode::value::Value;
use sha1::{Digest, Sha1};
use thiserror::Error;

/// Errors that can occur when reading a .torrent payload.
#[derive(Debug, Error)]
pub enum TorrentParseError {
    #[error("invalid bencode: {0}")]
    Decode(String),

    #[error("torrent is not a dictionary")]
    NotADictionary,

    #[error("missing info dictionary")]
    MissingInfo,

    #[error("info is not a dictionary")]
    InfoNotADictionary,

    #[error("failed to re-encode info dictionary: {0}")]
    Encode(String),
}

/// Extract the info hash from a .torrent file.
///
/// The `info` sub-dictionary is re-serialized with keys in lexicographic byte
/// order before hashing, so the result matches what the torrent client
/// computes even when the source file stores keys out of order.
///
/// Returns the 40-character lowercase hex string.
pub fn extract_info_hash(bytes: &[u8]) -> Result<String, TorrentParseError> {
    let decoded: Value =
        serde_bencode::from_bytes(bytes).map_err(|e| TorrentParseError::Decode(e.to_string()))?;

    let mut top_level = match decoded {
        Value::Dict(dict) => dict,
        _ => return Err(TorrentParseError::NotADictionary),
    };

    let info = top_level
        .remove(b"info".as_slice())
        .ok_or(TorrentParseError::MissingInfo)?;

    if !matches!(info, Value::Dict(_)) {
        return Err(TorrentParseError::InfoNotADictionary);
    }

    // The bencode serializer emits dictionary entries sorted by key.
    let encoded =
        serde_bencode::to_bytes(&info).map_err(|e| TorrentParseError::Encode(e.to_string()))?;

    Ok(hex::encode(Sha1::digest(&encoded)))
}
