//! URL-encoded form and cookie parsing.

use std::borrow::Cow;

use thiserror::Error;

/// Form parsing failure.
#[derive(Debug, Error)]
pub enum FormError {
    #[error("invalid URL escape {0:?}")]
    InvalidEscape(String),

    #[error("cannot read form body: {0}")]
    Io(#[from] std::io::Error),

    #[error("form body exceeds {0} bytes")]
    TooLarge(u64),
}

/// Ordered multi-valued form fields.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Form {
    pairs: Vec<(String, String)>,
}

impl Form {
    /// First value for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// All values for `name`, in order of appearance.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.pairs
            .iter()
            .filter(move |(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Parse `application/x-www-form-urlencoded` data.
///
/// `+` decodes to a space. A `%` not followed by two hex digits is an
/// error rather than being passed through.
pub fn parse_urlencoded(input: &str) -> Result<Form, FormError> {
    let mut pairs = Vec::with_capacity((input.matches('&').count() + 1).min(16));

    for pair in input.split('&') {
        if pair.is_empty() {
            continue;
        }

        let (key, value) = match pair.find('=') {
            Some(pos) => (&pair[..pos], &pair[pos + 1..]),
            None => (pair, ""),
        };

        let key = decode_component(key)?;
        if key.is_empty() {
            continue;
        }
        let value = decode_component(value)?;
        pairs.push((key.into_owned(), value.into_owned()));
    }

    Ok(Form { pairs })
}

/// Decode one form component, borrowing when nothing needs decoding.
fn decode_component(s: &str) -> Result<Cow<'_, str>, FormError> {
    if !s.contains(['%', '+']) {
        return Ok(Cow::Borrowed(s));
    }

    validate_escapes(s)?;

    let spaced = s.replace('+', " ");
    let decoded = percent_encoding::percent_decode_str(&spaced)
        .decode_utf8_lossy()
        .into_owned();
    Ok(Cow::Owned(decoded))
}

fn validate_escapes(s: &str) -> Result<(), FormError> {
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes
                .get(i + 1..i + 3)
                .is_some_and(|h| h.iter().all(u8::is_ascii_hexdigit));
            if !valid {
                let end = (i + 3).min(s.len());
                return Err(FormError::InvalidEscape(
                    String::from_utf8_lossy(&bytes[i..end]).into_owned(),
                ));
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    Ok(())
}

/// Parse a `Cookie` header into name/value pairs.
///
/// Malformed entries without `=` are skipped.
pub fn parse_cookies(cookie_header: &str) -> Vec<(String, String)> {
    let mut cookies = Vec::with_capacity((cookie_header.matches(';').count() + 1).min(16));

    for cookie in cookie_header.split(';') {
        let cookie = cookie.trim();
        if cookie.is_empty() {
            continue;
        }

        let Some((name, value)) = cookie.split_once('=') else {
            continue;
        };
        let name = name.trim();
        if name.is_empty() {
            continue;
        }

        let value = value.trim().trim_matches('"');
        let value = percent_encoding::percent_decode_str(value)
            .decode_utf8_lossy()
            .into_owned();
        cookies.push((name.to_string(), value));
    }

    cookies
}
