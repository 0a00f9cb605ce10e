//! Server configuration.

use serde::Deserialize;

use crate::message::input::DEFAULT_READ_CHUNK;
use crate::websocket::MAX_FRAME_SIZE;

/// Limits and switches shared by the connection protocols.
///
/// Every field is optional when deserialized:
///
/// ```yaml
/// keep_alive: false
/// max_body_size: 1048576
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Allow persistent connections at all.
    pub keep_alive: bool,
    /// Host used to build request URLs when the `Host` header is missing.
    pub default_host: String,
    /// Request line plus headers.
    pub max_head_size: usize,
    /// Decoded request body.
    pub max_body_size: u64,
    /// Websocket message, after reassembly.
    pub max_frame_size: u64,
    /// Bytes asked from the channel per read.
    pub read_chunk: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            keep_alive: true,
            default_host: String::from("localhost"),
            max_head_size: 64 * 1024,
            max_body_size: 16 * 1024 * 1024,
            max_frame_size: MAX_FRAME_SIZE,
            read_chunk: DEFAULT_READ_CHUNK,
        }
    }
}

impl Config {
    pub fn from_yaml(s: &str) -> Result<Self, serde_yaml::Error> { serde_yaml::from_str(s) }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert!(config.keep_alive);
        assert_eq!(config.default_host, "localhost");
        assert_eq!(config.max_head_size, 65536);
        assert_eq!(config.max_body_size, 16777216);
        assert_eq!(config.max_frame_size, 0x8000000);
        assert_eq!(config.read_chunk, 8192);
    }

    #[test]
    fn partial_yaml() {
        let config = Config::from_yaml("keep_alive: false\nmax_body_size: 1024\n").unwrap();
        assert!(!config.keep_alive);
        assert_eq!(config.max_body_size, 1024);
        assert_eq!(config.default_host, "localhost");

        assert_eq!(Config::from_yaml("{}").unwrap(), Config::default());
        assert!(Config::from_yaml("read_chunk: lots").is_err());
    }
}
