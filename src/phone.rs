use blake2::{Blake2b, Digest};

/// Shortest phone number accepted after normalization.
const MIN_DIGITS: usize = 10;
/// Longest phone number accepted (E.164 ceiling).
const MAX_DIGITS: usize = 15;

/// Strip formatting from a client-supplied phone number, keeping digits
/// only. Returns `None` when the digit count is outside the accepted range.
pub fn normalize(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if (MIN_DIGITS..=MAX_DIGITS).contains(&digits.len()) {
        Some(digits)
    } else {
        None
    }
}

/// One-way lookup key for a normalized phone number. Hex-encoded so it can
/// be stored and compared as a plain string.
pub fn hash(digits: &str) -> String {
    format!("{:x}", Blake2b::digest(digits.as_bytes()))
}
