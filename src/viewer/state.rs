//! Saved-state blobs.
//!
//! A blob is a 4-byte big-endian version tag followed by a JSON payload. The
//! host stores blobs without looking inside; only the viewer that wrote one
//! can read it back, and only when the tag matches.

use log::{debug, error};
use serde::Serialize;
use serde::de::DeserializeOwned;

const TAG_LEN: usize = 4;

pub fn encode_state<T: Serialize>(version: u32, state: &T) -> Vec<u8> {
    let mut blob = version.to_be_bytes().to_vec();
    match serde_json::to_vec(state) {
        Ok(payload) => {
            blob.extend_from_slice(&payload);
            blob
        }
        Err(e) => {
            error!("Failed to serialize viewer state: {e}");
            Vec::new()
        }
    }
}

/// The version tag at the head of `blob`, if it has one
pub fn state_version(blob: &[u8]) -> Option<u32> {
    let tag: [u8; TAG_LEN] = blob.get(..TAG_LEN)?.try_into().ok()?;
    Some(u32::from_be_bytes(tag))
}

pub fn decode_state<T: DeserializeOwned>(blob: &[u8], version: u32) -> Option<T> {
    let found = state_version(blob)?;
    if found != version {
        debug!("Ignoring saved state with version {found}, expected {version}");
        return None;
    }
    match serde_json::from_slice(&blob[TAG_LEN..]) {
        Ok(state) => Some(state),
        Err(e) => {
            debug!("Ignoring corrupt saved state: {e}");
            None
        }
    }
}
