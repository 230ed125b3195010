//! Server configuration, read from the environment at startup.

use std::time::Duration;

use cursorparty_protocol::PayloadFormat;

use crate::CursorPartyError;

/// Port used when `PORT` is unset.
pub const DEFAULT_PORT: u16 = 8080;

/// Host used when `HOST` is unset.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Per-member outbound queue length used when
/// `CURSORPARTY_OUTBOUND_CAPACITY` is unset.
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 256;

/// How long an accepted socket may take to finish the WebSocket upgrade
/// when `CURSORPARTY_HANDSHAKE_TIMEOUT_MS` is unset.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Everything a [`CursorPartyServer`](crate::CursorPartyServer) needs to
/// start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// `host:port` the listener binds to.
    pub bind_addr: String,
    /// How position payloads are framed, in both directions.
    pub payload_format: PayloadFormat,
    /// Messages a member may have queued before fan-out to it is dropped.
    pub outbound_capacity: usize,
    /// Name of the single room, used in logs.
    pub room_name: String,
    /// Deadline for the WebSocket upgrade on a freshly accepted socket.
    pub handshake_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: format!("{DEFAULT_HOST}:{DEFAULT_PORT}"),
            payload_format: PayloadFormat::default(),
            outbound_capacity: DEFAULT_OUTBOUND_CAPACITY,
            room_name: "room".to_string(),
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }
}

impl ServerConfig {
    /// Reads the configuration from process environment variables.
    ///
    /// | Variable                           | Default   |
    /// |------------------------------------|-----------|
    /// | `HOST`                             | `0.0.0.0` |
    /// | `PORT`                             | `8080`    |
    /// | `CURSORPARTY_PAYLOAD_FORMAT`       | `binary`  |
    /// | `CURSORPARTY_OUTBOUND_CAPACITY`    | `256`     |
    /// | `CURSORPARTY_ROOM`                 | `room`    |
    /// | `CURSORPARTY_HANDSHAKE_TIMEOUT_MS` | `5000`    |
    ///
    /// # Errors
    /// [`CursorPartyError::Config`] if a variable is set but unparseable.
    pub fn from_env() -> Result<Self, CursorPartyError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env), reading variables through
    /// `lookup` instead of the process environment.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, CursorPartyError> {
        let defaults = Self::default();

        let host = lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match lookup("PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|_| {
                CursorPartyError::Config(format!("PORT must be a port number, got {raw:?}"))
            })?,
            None => DEFAULT_PORT,
        };

        let payload_format = match lookup("CURSORPARTY_PAYLOAD_FORMAT") {
            Some(raw) => raw.parse().map_err(|_| {
                CursorPartyError::Config(format!(
                    "CURSORPARTY_PAYLOAD_FORMAT must be \"binary\" or \"base64\", got {raw:?}"
                ))
            })?,
            None => defaults.payload_format,
        };

        let outbound_capacity = match lookup("CURSORPARTY_OUTBOUND_CAPACITY") {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(CursorPartyError::Config(format!(
                        "CURSORPARTY_OUTBOUND_CAPACITY must be a positive integer, got {raw:?}"
                    )));
                }
            },
            None => defaults.outbound_capacity,
        };

        let room_name = lookup("CURSORPARTY_ROOM").unwrap_or(defaults.room_name);

        let handshake_timeout = match lookup("CURSORPARTY_HANDSHAKE_TIMEOUT_MS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => Duration::from_millis(ms),
                _ => {
                    return Err(CursorPartyError::Config(format!(
                        "CURSORPARTY_HANDSHAKE_TIMEOUT_MS must be a positive integer, got {raw:?}"
                    )));
                }
            },
            None => defaults.handshake_timeout,
        };

        Ok(Self {
            bind_addr: format!("{host}:{port}"),
            payload_format,
            outbound_capacity,
            room_name,
            handshake_timeout,
        })
    }
}
