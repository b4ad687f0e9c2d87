//! Wire codec
//!
//! Requests are free-form text containing an RFID wrapped in braces and a
//! MAC wrapped in angle brackets, e.g. `{0A1B2C}<AA:BB:CC:DD:EE:FF>`.
//! Replies are one of three short ASCII forms.

use kiosk_core::{AppError, AppResult};
use kiosk_services::AuthorizationOutcome;
use std::borrow::Cow;
use std::fmt;

/// Parsed device request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRequest {
    /// RFID token, braces included
    pub rfid: String,
    /// Device MAC, brackets stripped
    pub mac: String,
}

/// Decode a datagram payload; invalid UTF-8 becomes U+FFFD
pub fn decode_payload(payload: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(payload)
}

/// Extract RFID and MAC from request text
///
/// The RFID runs from the first `{` through the first `}` after it. The MAC
/// is everything strictly between the first `<` and the first `>` in the
/// text; a `>` that comes before the `<` makes the request malformed.
pub fn parse_request(text: &str) -> AppResult<DeviceRequest> {
    let rfid_start = text
        .find('{')
        .ok_or_else(|| malformed("missing '{'", text))?;
    let rfid_len = text[rfid_start..]
        .find('}')
        .ok_or_else(|| malformed("missing '}'", text))?;
    let rfid = &text[rfid_start..=rfid_start + rfid_len];

    let mac_start = text
        .find('<')
        .ok_or_else(|| malformed("missing '<'", text))?
        + 1;
    let mac_end = text
        .find('>')
        .ok_or_else(|| malformed("missing '>'", text))?;
    if mac_end < mac_start {
        return Err(malformed("'>' before '<'", text));
    }

    let mac = &text[mac_start..mac_end];
    if mac.is_empty() {
        return Err(malformed("empty MAC", text));
    }

    Ok(DeviceRequest {
        rfid: rfid.to_string(),
        mac: mac.to_string(),
    })
}

fn malformed(reason: &str, text: &str) -> AppError {
    AppError::MalformedMessage(format!("{} in {:?}", reason, text))
}

/// Reply sent back to a device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    /// `@ERROR`
    Error,
    /// `(@0NNN)` carrying the balance after the play
    Granted { post_balance: i64 },
    /// `<@NNN>` carrying the untouched balance
    Denied { current_balance: i64 },
}

impl Reply {
    pub fn encode(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Error => f.write_str("@ERROR"),
            Reply::Granted { post_balance } => write!(f, "(@0{})", Padded(*post_balance)),
            Reply::Denied { current_balance } => write!(f, "<@{}>", Padded(*current_balance)),
        }
    }
}

impl From<&AuthorizationOutcome> for Reply {
    fn from(outcome: &AuthorizationOutcome) -> Self {
        match outcome {
            AuthorizationOutcome::Granted { post_balance, .. } => Reply::Granted {
                post_balance: *post_balance,
            },
            AuthorizationOutcome::Denied { current_balance } => Reply::Denied {
                current_balance: *current_balance,
            },
        }
    }
}

/// Minimum three digits; the sign goes before the padded magnitude
struct Padded(i64);

impl fmt::Display for Padded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 < 0 {
            write!(f, "-{:03}", self.0.unsigned_abs())
        } else {
            write!(f, "{:03}", self.0)
        }
    }
}
