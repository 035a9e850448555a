//! Phone number canonicalization.
//!
//! Every phone number entering the system is normalized to E.164
//! (`+<country><subscriber>`, no separators) before lookup, comparison, or
//! storage. Raw user input is never persisted or compared directly.

use phonenumber::Mode;

/// The input could not be parsed as a phone number for any region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid phone number")]
pub struct InvalidPhoneNumber;

/// Canonicalize `raw` into E.164 form, e.g. `"+1 (555) 123-4567"` → `"+15551234567"`.
///
/// Numbers must carry their country prefix (`+..`); without one there is no
/// region to resolve the number against and parsing fails.
pub fn normalize(raw: &str) -> Result<String, InvalidPhoneNumber> {
    let number = phonenumber::parse(None, raw).map_err(|_| InvalidPhoneNumber)?;
    Ok(number.format().mode(Mode::E164).to_string())
}
