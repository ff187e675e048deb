//! Fixed-width login request / accept body encoding.

use bytes::Bytes;

use crate::errors::LoginParseError;

const USERNAME_WIDTH: usize = 6;
const PASSWORD_WIDTH: usize = 10;
const SESSION_WIDTH: usize = 10;
const SEQUENCE_WIDTH: usize = 20;

/// Body of an `L` (login request) frame: `username(6) password(10) session(10) sequence(20)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRequest {
    /// Username, trimmed of padding.
    pub username: String,
    /// Password, trimmed of padding.
    pub password: String,
    /// Session name, trimmed of padding.
    pub session_name: String,
    /// Next-expected sequence number requested by the client.
    pub sequence: u64,
}

impl LoginRequest {
    /// Pack the fields into the 46-byte space-padded wire body.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut body = String::with_capacity(USERNAME_WIDTH + PASSWORD_WIDTH + SESSION_WIDTH + SEQUENCE_WIDTH);
        body.push_str(&pad_left_justified(&self.username, USERNAME_WIDTH));
        body.push_str(&pad_left_justified(&self.password, PASSWORD_WIDTH));
        body.push_str(&pad_left_justified(&self.session_name, SESSION_WIDTH));
        body.push_str(&pad_right_justified(&self.sequence.to_string(), SEQUENCE_WIDTH));
        Bytes::from(body.into_bytes())
    }

    /// Parse the 46-byte wire body.
    ///
    /// # Errors
    ///
    /// Returns [`LoginParseError::WrongLength`] if `body` is not exactly 46 bytes,
    /// or [`LoginParseError::InvalidSequence`] if the sequence field does not parse
    /// as a non-negative base-10 integer.
    pub fn decode(body: &[u8]) -> Result<Self, LoginParseError> {
        let expected = USERNAME_WIDTH + PASSWORD_WIDTH + SESSION_WIDTH + SEQUENCE_WIDTH;
        if body.len() != expected {
            return Err(LoginParseError::WrongLength { expected, actual: body.len() });
        }

        let text = String::from_utf8_lossy(body);
        let mut offset = 0;
        let username = take_field(&text, &mut offset, USERNAME_WIDTH);
        let password = take_field(&text, &mut offset, PASSWORD_WIDTH);
        let session_name = take_field(&text, &mut offset, SESSION_WIDTH);
        let sequence_field = take_field(&text, &mut offset, SEQUENCE_WIDTH);

        let sequence_text = sequence_field.trim();
        if sequence_text.is_empty() {
            return Err(LoginParseError::InvalidSequence);
        }
        let sequence: u64 = sequence_text.parse().map_err(|_| LoginParseError::InvalidSequence)?;

        Ok(Self { username, password, session_name, sequence })
    }
}

/// Body of an `A` (login accepted) frame: `session(10) sequence(20)`, both right-justified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginAccept {
    /// Accepted session name.
    pub session_name: String,
    /// Next sequence the server will assign / resume replay from.
    pub sequence: u64,
}

impl LoginAccept {
    /// Pack the fields into the 30-byte right-justified wire body.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut body = String::with_capacity(SESSION_WIDTH + SEQUENCE_WIDTH);
        body.push_str(&pad_right_justified(&self.session_name, SESSION_WIDTH));
        body.push_str(&pad_right_justified(&self.sequence.to_string(), SEQUENCE_WIDTH));
        Bytes::from(body.into_bytes())
    }
}

fn pad_left_justified(value: &str, width: usize) -> String {
    format!("{value:<width$}")
}

fn pad_right_justified(value: &str, width: usize) -> String {
    format!("{value:>width$}")
}

fn take_field(text: &str, offset: &mut usize, width: usize) -> String {
    let start = *offset;
    let end = start + width;
    *offset = end;
    text.get(start..end).unwrap_or_default().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_request_round_trip() {
        let req = LoginRequest {
            username: "user1".to_string(),
            password: "password1".to_string(),
            session_name: "session1".to_string(),
            sequence: 1,
        };
        let body = req.encode();
        assert_eq!(body.len(), 46);
        let decoded = LoginRequest::decode(&body).unwrap();
        assert_eq!(decoded, req);
    }

    #[test]
    fn login_request_matches_literal_scenario() {
        let req = LoginRequest {
            username: "user1".to_string(),
            password: "password1".to_string(),
            session_name: "session1".to_string(),
            sequence: 1,
        };
        let body = req.encode();
        assert_eq!(&body[0..6], b"user1 ");
        assert_eq!(&body[6..16], b"password1 ");
        assert_eq!(&body[16..26], b"session1  ");
        assert_eq!(&body[26..46], b"                   1");
    }

    #[test]
    fn login_accept_matches_literal_scenario() {
        let accept = LoginAccept { session_name: "session1".to_string(), sequence: 3 };
        let body = accept.encode();
        assert_eq!(body.as_ref(), b"  session1                    3");
    }

    #[test]
    fn bad_sequence_is_a_parse_error() {
        let mut body = vec![b' '; 46];
        body[0..5].copy_from_slice(b"user1");
        body[26..46].copy_from_slice(b"xxxxxxxxxxxxxxxxxxxx");
        let err = LoginRequest::decode(&body).unwrap_err();
        assert_eq!(err, LoginParseError::InvalidSequence);
    }

    #[test]
    fn wrong_length_is_rejected() {
        let err = LoginRequest::decode(b"too short").unwrap_err();
        assert_eq!(err, LoginParseError::WrongLength { expected: 46, actual: 9 });
    }
}
