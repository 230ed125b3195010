//! Payload framing: how encoded position bytes ride on a transport frame.
//!
//! Two client generations exist. Current clients send protobuf bytes as a
//! binary frame. The first browser client could only emit strings, so it
//! base64-encoded the same bytes into a text frame. A server speaks exactly
//! one of the two, chosen at startup.

use std::fmt;
use std::str::FromStr;

use base64::{Engine as _, engine::general_purpose};
use cursorparty_transport::Frame;
use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// How position payloads are framed on the transport.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum PayloadFormat {
    /// Protobuf bytes in a binary frame.
    #[default]
    Binary,
    /// Standard-alphabet, padded base64 of the protobuf bytes in a text frame.
    Base64,
}

impl PayloadFormat {
    /// Extracts the encoded position bytes from an inbound frame.
    ///
    /// # Errors
    /// Returns [`ProtocolError::MalformedPayload`] when the frame kind does
    /// not match this format, the text is not valid base64, or the body is
    /// empty.
    pub fn unwrap_frame(self, frame: Frame) -> Result<Vec<u8>, ProtocolError> {
        if frame.is_empty() {
            return Err(ProtocolError::MalformedPayload("empty frame".into()));
        }
        let bytes = match (self, frame) {
            (Self::Binary, Frame::Binary(data)) => data,
            (Self::Base64, Frame::Text(text)) => general_purpose::STANDARD
                .decode(text.trim())
                .map_err(|e| ProtocolError::MalformedPayload(e.to_string()))?,
            (Self::Binary, Frame::Text(_)) => {
                return Err(ProtocolError::MalformedPayload(
                    "expected a binary frame, got text".into(),
                ));
            }
            (Self::Base64, Frame::Binary(_)) => {
                return Err(ProtocolError::MalformedPayload(
                    "expected a base64 text frame, got binary".into(),
                ));
            }
        };

        if bytes.is_empty() {
            return Err(ProtocolError::MalformedPayload("blank base64 text".into()));
        }
        Ok(bytes)
    }

    /// Wraps encoded position bytes into an outbound frame.
    pub fn wrap(self, bytes: &[u8]) -> Frame {
        match self {
            Self::Binary => Frame::Binary(bytes.to_vec()),
            Self::Base64 => Frame::Text(general_purpose::STANDARD.encode(bytes)),
        }
    }
}

impl fmt::Display for PayloadFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Binary => write!(f, "binary"),
            Self::Base64 => write!(f, "base64"),
        }
    }
}

impl FromStr for PayloadFormat {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "binary" => Ok(Self::Binary),
            "base64" | "text" => Ok(Self::Base64),
            other => Err(ProtocolError::MalformedPayload(format!(
                "unknown payload format {other:?}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unwrap_frame_binary_accepts_binary() {
        let bytes = PayloadFormat::Binary
            .unwrap_frame(Frame::Binary(vec![1, 2, 3]))
            .unwrap();
        assert_eq!(bytes, vec![1, 2, 3]);
    }

    #[test]
    fn test_unwrap_frame_binary_rejects_text() {
        let result = PayloadFormat::Binary.unwrap_frame(Frame::Text("AQID".into()));
        assert!(matches!(result, Err(ProtocolError::MalformedPayload(_))));
    }

    #[test]
    fn test_unwrap_frame_base64_decodes_text() {
        let bytes = PayloadFormat::Base64
            .unwrap_frame(Frame::Text("AQID".into()))
            .unwrap();
        assert_eq!(bytes, vec![1, 2, 3]);
    }

    #[test]
    fn test_unwrap_frame_base64_rejects_binary() {
        let result = PayloadFormat::Base64.unwrap_frame(Frame::Binary(vec![1]));
        assert!(matches!(result, Err(ProtocolError::MalformedPayload(_))));
    }

    #[test]
    fn test_unwrap_frame_base64_rejects_invalid_alphabet() {
        let result = PayloadFormat::Base64.unwrap_frame(Frame::Text("not*base64!".into()));
        assert!(matches!(result, Err(ProtocolError::MalformedPayload(_))));
    }

    #[test]
    fn test_unwrap_frame_rejects_empty_body() {
        let binary = PayloadFormat::Binary.unwrap_frame(Frame::Binary(Vec::new()));
        let text = PayloadFormat::Base64.unwrap_frame(Frame::Text(String::new()));
        assert!(matches!(binary, Err(ProtocolError::MalformedPayload(_))));
        assert!(matches!(text, Err(ProtocolError::MalformedPayload(_))));
    }

    #[test]
    fn test_unwrap_frame_base64_blank_text_is_malformed() {
        let result = PayloadFormat::Base64.unwrap_frame(Frame::Text("  \n".into()));
        assert!(matches!(result, Err(ProtocolError::MalformedPayload(_))));
    }

    #[test]
    fn test_wrap_matches_format() {
        assert_eq!(PayloadFormat::Binary.wrap(&[1, 2, 3]), Frame::Binary(vec![1, 2, 3]));
        assert_eq!(PayloadFormat::Base64.wrap(&[1, 2, 3]), Frame::Text("AQID".into()));
    }

    #[test]
    fn test_from_str_accepts_known_names() {
        assert_eq!("binary".parse::<PayloadFormat>().unwrap(), PayloadFormat::Binary);
        assert_eq!("BASE64".parse::<PayloadFormat>().unwrap(), PayloadFormat::Base64);
        assert_eq!("text".parse::<PayloadFormat>().unwrap(), PayloadFormat::Base64);
        assert!("protobuf".parse::<PayloadFormat>().is_err());
    }

    #[test]
    fn test_default_is_binary() {
        assert_eq!(PayloadFormat::default(), PayloadFormat::Binary);
        assert_eq!(PayloadFormat::default().to_string(), "binary");
    }
}
