//! Close frame payload and status codes.
//!
//! [RFC-6455 Section 7.4](https://datatracker.ietf.org/doc/html/rfc6455#section-7.4)

/// 1000, the purpose of the connection has been fulfilled.
pub const NORMAL: u16 = 1000;
/// 1001, endpoint is going away.
pub const GOING_AWAY: u16 = 1001;
/// 1002, protocol error.
pub const PROTOCOL_ERROR: u16 = 1002;
/// 1003, data type or size that cannot be accepted.
pub const UNSUPPORTED: u16 = 1003;
/// 1005, no status present; must never be sent.
pub const NO_STATUS: u16 = 1005;
/// 1006, closed without a close frame; must never be sent.
pub const ABNORMAL: u16 = 1006;
/// 1007, payload inconsistent with the message type.
pub const INVALID_PAYLOAD: u16 = 1007;
/// 1008, policy violation.
pub const POLICY: u16 = 1008;
/// 1009, message too big.
pub const TOO_BIG: u16 = 1009;
/// 1010, missing extension.
pub const EXTENSION: u16 = 1010;
/// 1011, unexpected condition on the server.
pub const UNEXPECTED: u16 = 1011;

/// Whether a code received from the peer may be echoed back verbatim.
///
/// Registered codes which are allowed on the wire, plus everything from
/// 3000 on (library and application ranges).
#[inline]
pub const fn is_acceptable(code: u16) -> bool {
    matches!(
        code,
        NORMAL | GOING_AWAY | PROTOCOL_ERROR | UNSUPPORTED | INVALID_PAYLOAD..=UNEXPECTED
    ) || code > 2999
}

/// Split a close payload into code and reason.
///
/// Returns `None` for an empty payload. A single byte cannot hold a code
/// and is reported as [`PROTOCOL_ERROR`] with the byte as reason.
pub fn decode(payload: &[u8]) -> Option<(u16, &[u8])> {
    match payload.len() {
        0 => None,
        1 => Some((PROTOCOL_ERROR, payload)),
        _ => Some((u16::from_be_bytes([payload[0], payload[1]]), &payload[2..])),
    }
}

/// Build a close payload.
pub fn encode(code: u16, reason: &str) -> Vec<u8> {
    let mut payload = Vec::with_capacity(2 + reason.len());
    payload.extend_from_slice(&code.to_be_bytes());
    payload.extend_from_slice(reason.as_bytes());
    payload
}

/// The code to answer a received close frame with.
pub fn reply_code(payload: &[u8]) -> u16 {
    match decode(payload) {
        None => NORMAL,
        Some((_, _)) if payload.len() == 1 => PROTOCOL_ERROR,
        Some((_, reason)) if std::str::from_utf8(reason).is_err() => INVALID_PAYLOAD,
        Some((code, _)) if is_acceptable(code) => code,
        Some(_) => PROTOCOL_ERROR,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn echo_normal() {
        assert_eq!(reply_code(&encode(1000, "")), 1000);
        assert_eq!(reply_code(&encode(1001, "bye")), 1001);
        assert_eq!(reply_code(&encode(1011, "")), 1011);
    }

    #[test]
    fn empty_payload() {
        assert_eq!(reply_code(b""), 1000);
    }

    #[test]
    fn rewrite_reserved() {
        for code in [0, 999, 1004, 1005, 1006, 1012, 1015, 2000, 2999] {
            assert_eq!(reply_code(&encode(code, "")), 1002, "code {}", code);
        }
        assert_eq!(reply_code(&[0x03]), 1002);
    }

    #[test]
    fn application_range() {
        assert_eq!(reply_code(&encode(3000, "app")), 3000);
        assert_eq!(reply_code(&encode(4999, "")), 4999);
    }

    #[test]
    fn invalid_reason() {
        let mut payload = encode(1000, "");
        payload.extend_from_slice(&[0xc3, 0x28]);
        assert_eq!(reply_code(&payload), 1007);
    }

    #[test]
    fn split_payload() {
        let payload = encode(1001, "going");
        assert_eq!(decode(&payload), Some((1001, &b"going"[..])));
        assert_eq!(decode(b""), None);
    }
}
