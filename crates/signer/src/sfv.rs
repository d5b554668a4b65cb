//! Structured field value dictionaries (RFC 8941) with string members.
//!
//! Only the subset used by the `expo-signature` header is supported:
//! dictionaries whose members are bare strings without parameters.

use crate::error::{SignerError, SignerResult};

/// Validate and normalize a dictionary key. Keys are lower-cased first
/// because the wire format is case-sensitive and only accepts lowercase.
fn normalize_key(key: &str) -> SignerResult<String> {
    let key = key.to_ascii_lowercase();
    let mut chars = key.chars();
    let valid_first = chars
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c == '*');
    let valid_rest =
        chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || "_-.*".contains(c));
    if !valid_first || !valid_rest {
        return Err(SignerError::InvalidHeader(format!("invalid key: {key:?}")));
    }
    Ok(key)
}

fn serialize_string(value: &str, out: &mut String) -> SignerResult<()> {
    out.push('"');
    for c in value.chars() {
        match c {
            '"' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            ' '..='~' => out.push(c),
            _ => {
                return Err(SignerError::InvalidHeader(format!(
                    "string contains non-printable or non-ASCII character {c:?}"
                )));
            }
        }
    }
    out.push('"');
    Ok(())
}

/// Serialize `(key, string)` members as a dictionary, e.g. `sig="abc", keyid="main"`.
///
/// Member order is preserved. A later member with the same (normalized) key
/// replaces the earlier value in place.
pub fn serialize_dictionary<'a, I>(members: I) -> SignerResult<String>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut entries: Vec<(String, &str)> = Vec::new();
    for (key, value) in members {
        let key = normalize_key(key)?;
        match entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => entries.push((key, value)),
        }
    }

    let mut out = String::new();
    for (i, (key, value)) in entries.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(key);
        out.push('=');
        serialize_string(value, &mut out)?;
    }
    Ok(out)
}

/// Parse a dictionary whose members are all strings.
pub fn parse_dictionary(input: &str) -> SignerResult<Vec<(String, String)>> {
    let mut members = Vec::new();
    let mut rest = input.trim_matches(' ');

    while !rest.is_empty() {
        let key_len = rest
            .find(|c: char| !(c.is_ascii_lowercase() || c.is_ascii_digit() || "_-.*".contains(c)))
            .unwrap_or(rest.len());
        let key = normalize_key(&rest[..key_len])?;
        rest = rest[key_len..]
            .strip_prefix("=\"")
            .ok_or_else(|| SignerError::InvalidHeader(format!("expected string for {key}")))?;

        let mut value = String::new();
        let mut chars = rest.char_indices();
        let end = loop {
            match chars.next() {
                Some((_, '\\')) => match chars.next() {
                    Some((_, c @ ('"' | '\\'))) => value.push(c),
                    _ => return Err(SignerError::InvalidHeader("invalid escape".to_string())),
                },
                Some((i, '"')) => break i,
                Some((_, c)) => value.push(c),
                None => return Err(SignerError::InvalidHeader("unterminated string".to_string())),
            }
        };
        members.push((key, value));

        rest = rest[end + 1..].trim_start_matches(' ');
        if rest.is_empty() {
            break;
        }
        rest = rest
            .strip_prefix(',')
            .ok_or_else(|| SignerError::InvalidHeader("expected ','".to_string()))?
            .trim_start_matches(' ');
        if rest.is_empty() {
            return Err(SignerError::InvalidHeader("trailing comma".to_string()));
        }
    }

    Ok(members)
}
