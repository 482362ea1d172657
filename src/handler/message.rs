//! Application message handed to handlers.
//!
//! Wraps the raw JSON payload of an application-message frame together with
//! its command name, so handlers can pick the representation they want:
//! - `payload` - raw bytes, as received
//! - `json` - a generic `serde_json::Value`
//! - `decode` - any `DeserializeOwned` type
//!
//! # Example
//!
//! ```
//! use bililive_client::handler::Message;
//! use bytes::Bytes;
//!
//! let msg = Message::from_payload(Bytes::from_static(br#"{"cmd":"DANMU_MSG","info":[]}"#)).unwrap();
//! assert_eq!(msg.cmd(), "DANMU_MSG");
//! assert!(msg.json().unwrap()["info"].is_array());
//! ```

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{LiveError, Result};

/// The only field the dispatcher needs from a payload.
#[derive(Deserialize)]
struct Command {
    cmd: String,
}

/// A decoded application message.
///
/// `Message` is `Clone` (the payload is reference counted), so a handler can
/// move it into a spawned task cheaply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Command name (`cmd` field of the payload).
    cmd: String,
    /// Raw JSON payload.
    payload: Bytes,
}

impl Message {
    /// Create a message from an already known command name.
    pub fn new(cmd: impl Into<String>, payload: Bytes) -> Self {
        Self {
            cmd: cmd.into(),
            payload,
        }
    }

    /// Create a message from a raw payload, reading the command name from it.
    ///
    /// # Errors
    ///
    /// Returns [`LiveError::Protocol`] if the payload is not a JSON object
    /// with a string `cmd` field.
    pub fn from_payload(payload: Bytes) -> Result<Self> {
        let Command { cmd } = serde_json::from_slice(&payload).map_err(|e| {
            LiveError::Protocol(format!("application message without cmd: {}", e))
        })?;
        Ok(Self { cmd, payload })
    }

    /// Get the command name.
    #[inline]
    pub fn cmd(&self) -> &str {
        &self.cmd
    }

    /// Get a reference to the raw payload.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Get a clone of the payload as Bytes (cheap, zero-copy).
    #[inline]
    pub fn payload_bytes(&self) -> Bytes {
        self.payload.clone()
    }

    /// Parse the payload as a generic JSON value.
    pub fn json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::from_slice(&self.payload)?)
    }

    /// Deserialize the payload into `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.payload)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_payload_reads_cmd() {
        let msg = Message::from_payload(Bytes::from_static(
            br#"{"cmd":"SEND_GIFT","data":{"num":3}}"#,
        ))
        .unwrap();

        assert_eq!(msg.cmd(), "SEND_GIFT");
        assert_eq!(msg.json().unwrap()["data"]["num"], 3);
    }

    #[test]
    fn test_from_payload_without_cmd() {
        let err = Message::from_payload(Bytes::from_static(br#"{"data":{}}"#)).unwrap_err();
        assert!(matches!(err, LiveError::Protocol(_)));
        assert!(err.to_string().contains("without cmd"));
    }

    #[test]
    fn test_from_payload_not_json() {
        let err = Message::from_payload(Bytes::from_static(b"\x00\x01")).unwrap_err();
        assert!(matches!(err, LiveError::Protocol(_)));
    }

    #[test]
    fn test_decode_typed() {
        #[derive(Deserialize, Debug, PartialEq)]
        struct Gift {
            cmd: String,
            data: GiftData,
        }

        #[derive(Deserialize, Debug, PartialEq)]
        struct GiftData {
            uname: String,
            num: u32,
        }

        let msg = Message::new(
            "SEND_GIFT",
            Bytes::from_static(br#"{"cmd":"SEND_GIFT","data":{"uname":"alice","num":2}}"#),
        );
        let gift: Gift = msg.decode().unwrap();
        assert_eq!(gift.data.uname, "alice");
        assert_eq!(gift.data.num, 2);
    }

    #[test]
    fn test_payload_bytes_zero_copy() {
        let original = Bytes::from_static(br#"{"cmd":"X"}"#);
        let msg = Message::from_payload(original.clone()).unwrap();
        assert_eq!(msg.payload_bytes().as_ptr(), original.as_ptr());
    }
}
