//! Position records: the protobuf messages carried by `move` events.
//!
//! ```text
//! InputPosition      (client → server)   1: x    2: y    3: room
//! BroadcastPosition  (server → peers)    1: id   2: x    3: y   4: room
//! ```
//!
//! Coordinates are `double` so a value survives the round trip bit for bit.

/// A cursor position as sent by a client.
///
/// Carries no identity: who sent it is decided by the server from the
/// connection it arrived on.
#[derive(Clone, PartialEq, prost::Message)]
pub struct InputPosition {
    #[prost(double, tag = "1")]
    pub x: f64,
    #[prost(double, tag = "2")]
    pub y: f64,
    /// Room label. Carried through to peers, never used for routing.
    #[prost(string, tag = "3")]
    pub room: String,
}

/// A cursor position as fanned out to the sender's peers.
#[derive(Clone, PartialEq, prost::Message)]
pub struct BroadcastPosition {
    /// Display form of the sender's connection id, e.g. `conn-7`.
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(double, tag = "2")]
    pub x: f64,
    #[prost(double, tag = "3")]
    pub y: f64,
    #[prost(string, tag = "4")]
    pub room: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    #[test]
    fn test_input_position_field_tags_match_schema() {
        let bytes = InputPosition {
            x: 1.0,
            y: 2.0,
            room: "r".into(),
        }
        .encode_to_vec();

        // key = (tag << 3) | wire_type
        assert_eq!(bytes[0], (1 << 3) | 1, "x is tag 1, 64-bit");
        assert_eq!(bytes[9], (2 << 3) | 1, "y is tag 2, 64-bit");
        assert_eq!(bytes[18], (3 << 3) | 2, "room is tag 3, length-delimited");
        assert_eq!(&bytes[19..], &[1, b'r']);
    }

    #[test]
    fn test_broadcast_position_field_tags_match_schema() {
        let bytes = BroadcastPosition {
            id: "a".into(),
            x: 1.0,
            y: 2.0,
            room: "r".into(),
        }
        .encode_to_vec();

        assert_eq!(&bytes[..3], &[(1 << 3) | 2, 1, b'a']);
        assert_eq!(bytes[3], (2 << 3) | 1);
        assert_eq!(bytes[12], (3 << 3) | 1);
        assert_eq!(&bytes[21..], &[(4 << 3) | 2, 1, b'r']);
    }

    #[test]
    fn test_input_position_defaults_are_omitted() {
        // proto3 scalars at their default value are not written at all.
        assert!(InputPosition::default().encode_to_vec().is_empty());
    }
}
