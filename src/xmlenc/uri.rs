//! Escaped-path form of resource references.
//!
//! Cipher references are compared as escaped URI paths. A reference is parsed
//! as a URI reference: query and fragment are dropped, an already valid
//! escaping is kept verbatim, and anything else is decoded and re-escaped.
//! No other normalization happens, so `./a.xhtml` and `a.xhtml` stay distinct.

/// Compute the escaped path of a URI reference.
///
/// Returns `None` when the reference cannot be parsed: control characters,
/// malformed `%` escapes, or a colon in the first segment of a relative path.
///
/// # Examples
/// ```
/// use pubpack::xmlenc::escaped_path;
///
/// assert_eq!(escaped_path("OEBPS/chapter 1.xhtml").as_deref(), Some("OEBPS/chapter%201.xhtml"));
/// assert_eq!(escaped_path("OEBPS/chapter%201.xhtml").as_deref(), Some("OEBPS/chapter%201.xhtml"));
/// assert_eq!(escaped_path("image.png#frag").as_deref(), Some("image.png"));
/// assert_eq!(escaped_path("bad%zz"), None);
/// ```
pub fn escaped_path(reference: &str) -> Option<String> {
    if reference.bytes().any(|b| b < 0x20 || b == 0x7f) {
        return None;
    }

    let reference = reference.split('#').next().unwrap_or_default();
    let reference = reference.split('?').next().unwrap_or_default();
    let raw = path_component(reference)?;

    if !has_valid_escapes(raw) {
        return None;
    }
    if is_valid_encoded(raw) {
        return Some(raw.to_string());
    }

    let decoded = urlencoding::decode(raw).ok()?;
    Some(escape_path(&decoded))
}

/// Strip an optional scheme and authority, leaving the path of the reference.
fn path_component(reference: &str) -> Option<&str> {
    match split_scheme(reference) {
        Some(rest) => {
            if let Some(authority_and_path) = rest.strip_prefix("//") {
                let start = authority_and_path.find('/').unwrap_or(authority_and_path.len());
                Some(&authority_and_path[start..])
            } else if rest.starts_with('/') {
                Some(rest)
            } else {
                // Opaque reference (e.g. "urn:isbn:123") has no path
                Some("")
            }
        },
        None => {
            let first_segment = reference.split('/').next().unwrap_or_default();
            if first_segment.contains(':') {
                None
            } else {
                Some(reference)
            }
        },
    }
}

/// Return the text after `scheme:` if the reference starts with a scheme.
fn split_scheme(reference: &str) -> Option<&str> {
    for (i, c) in reference.char_indices() {
        match c {
            'a'..='z' | 'A'..='Z' => {},
            '0'..='9' | '+' | '-' | '.' if i > 0 => {},
            ':' if i > 0 => return Some(&reference[i + 1..]),
            _ => return None,
        }
    }
    None
}

fn has_valid_escapes(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes.len() > i + 2
                && bytes[i + 1].is_ascii_hexdigit()
                && bytes[i + 2].is_ascii_hexdigit();
            if !valid {
                return false;
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    true
}

/// Whether `raw` can be used as an escaped path without re-encoding.
fn is_valid_encoded(raw: &str) -> bool {
    raw.bytes().all(|b| {
        matches!(
            b,
            b'!' | b'$' | b'&' | b'\'' | b'(' | b')' | b'*' | b'+' | b',' | b';' | b'='
                | b':' | b'@' | b'[' | b']' | b'%'
        ) || !should_escape(b)
    })
}

fn should_escape(b: u8) -> bool {
    !(b.is_ascii_alphanumeric()
        || matches!(
            b,
            b'-' | b'_' | b'.' | b'~' | b'$' | b'&' | b'+' | b',' | b'/' | b':' | b';' | b'='
                | b'@'
        ))
}

fn escape_path(decoded: &str) -> String {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    let mut out = String::with_capacity(decoded.len());
    for b in decoded.bytes() {
        if should_escape(b) {
            out.push('%');
            out.push(HEX[(b >> 4) as usize] as char);
            out.push(HEX[(b & 0x0f) as usize] as char);
        } else {
            out.push(b as char);
        }
    }
    out
}
