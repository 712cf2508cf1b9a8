//! Peer Wire Messages
//!
//! Protobuf messages exchanged between peers. Only [`Response`] travels
//! in a body; the fields of [`Request`] are carried in the URL path.

use prost::Message;

use crate::error::{CacheError, Result};

/// Content type of an encoded [`Response`].
pub const CONTENT_TYPE: &str = "application/octet-stream";

/// A lookup of `key` in `group` on a remote peer.
#[derive(Clone, PartialEq, Message)]
pub struct Request {
    #[prost(string, tag = "1")]
    pub group: String,
    #[prost(string, tag = "2")]
    pub key: String,
}

/// The value a peer returns for a [`Request`].
#[derive(Clone, PartialEq, Message)]
pub struct Response {
    #[prost(bytes = "vec", tag = "1")]
    pub value: Vec<u8>,
}

/// Encodes a value as a response body.
pub fn encode_response(value: &[u8]) -> Vec<u8> {
    Response {
        value: value.to_vec(),
    }
    .encode_to_vec()
}

/// Decodes a response body back into the value bytes.
pub fn decode_response(body: &[u8]) -> Result<Vec<u8>> {
    Response::decode(body)
        .map(|response| response.value)
        .map_err(|e| CacheError::Peer(format!("decoding response body: {}", e)))
}
