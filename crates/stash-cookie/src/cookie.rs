//! Cookie parsing, rendering, and the request/response seams.
//!
//! The session manager only needs two things from HTTP:
//! - read one named cookie from the request ([`CookieSource`])
//! - append one `Set-Cookie` to the response ([`CookieSink`])
//!
//! Anything that can do those two things can host sessions. The bundled
//! [`RequestCookies`] and [`ResponseCookies`] types cover the common case
//! of "I have raw header strings".

use std::fmt;

use chrono::{DateTime, Utc};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use tracing::trace;

use crate::CookieError;

/// Characters left alone when escaping a cookie value as a path segment:
/// RFC 3986 unreserved characters plus the sub-delimiters that are legal
/// inside a segment. Everything else (`/`, `?`, `%`, spaces, ...) is
/// percent-encoded.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b',')
    .remove(b':')
    .remove(b';')
    .remove(b'=')
    .remove(b'@');

/// IMF-fixdate, the only date format `Expires` should carry.
const HTTP_DATE: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Escapes a client-supplied cookie value so it is safe to use as a key.
///
/// Well-formed session ids are URL-safe base64 and pass through unchanged.
///
/// ```rust
/// use stash_cookie::path_escape;
///
/// assert_eq!(path_escape("abc-_XYZ09"), "abc-_XYZ09");
/// assert_eq!(path_escape("../etc/passwd"), "..%2Fetc%2Fpasswd");
/// ```
pub fn path_escape(value: &str) -> String {
    utf8_percent_encode(value, PATH_SEGMENT).to_string()
}

// ---------------------------------------------------------------------------
// Seams
// ---------------------------------------------------------------------------

/// The request side: somewhere cookies can be read from.
pub trait CookieSource {
    /// Returns the value of the first cookie called `name`, if any.
    fn cookie(&self, name: &str) -> Option<String>;
}

/// The response side: somewhere `Set-Cookie` instructions can be written.
pub trait CookieSink {
    /// Queues a cookie to be sent back to the client.
    fn set_cookie(&mut self, cookie: SetCookie);
}

// ---------------------------------------------------------------------------
// SetCookie
// ---------------------------------------------------------------------------

/// One outbound `Set-Cookie` instruction.
///
/// `Display` renders the header value:
///
/// ```rust
/// use stash_cookie::SetCookie;
///
/// let c = SetCookie::session("sid", "abc", 3600);
/// assert_eq!(c.to_string(), "sid=abc; Path=/; Max-Age=3600; HttpOnly");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookie {
    pub name: String,
    pub value: String,
    pub path: Option<String>,
    pub expires: Option<DateTime<Utc>>,
    /// Seconds until the client discards the cookie. Zero or negative
    /// means "discard now" and renders as `Max-Age=0`; `None` omits the
    /// attribute.
    pub max_age: Option<i64>,
    pub http_only: bool,
}

impl SetCookie {
    /// A cookie carrying a session id, valid for `max_age_secs`.
    pub fn session(
        name: impl Into<String>,
        id: impl Into<String>,
        max_age_secs: u64,
    ) -> Self {
        Self {
            name: name.into(),
            value: id.into(),
            path: Some("/".to_string()),
            expires: None,
            max_age: Some(i64::try_from(max_age_secs).unwrap_or(i64::MAX)),
            http_only: true,
        }
    }

    /// A cookie instructing the client to forget `name` immediately.
    pub fn expired(name: impl Into<String>) -> Self {
        Self::expired_at(name, Utc::now())
    }

    /// Like [`expired`](Self::expired) with an explicit `Expires` instant.
    pub fn expired_at(name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            value: String::new(),
            path: Some("/".to_string()),
            expires: Some(now),
            max_age: Some(-1),
            http_only: true,
        }
    }

    /// Returns `true` if this cookie tells the client to delete it.
    pub fn is_removal(&self) -> bool {
        matches!(self.max_age, Some(age) if age <= 0)
    }
}

impl fmt::Display for SetCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)?;
        if let Some(path) = &self.path {
            write!(f, "; Path={path}")?;
        }
        if let Some(expires) = &self.expires {
            write!(f, "; Expires={}", expires.format(HTTP_DATE))?;
        }
        match self.max_age {
            Some(age) if age > 0 => write!(f, "; Max-Age={age}")?,
            Some(_) => f.write_str("; Max-Age=0")?,
            None => {}
        }
        if self.http_only {
            f.write_str("; HttpOnly")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// RequestCookies
// ---------------------------------------------------------------------------

/// Cookies parsed from one or more `Cookie` request headers.
///
/// Pairs keep their header order; lookups return the first match.
#[derive(Debug, Clone, Default)]
pub struct RequestCookies {
    pairs: Vec<(String, String)>,
}

impl RequestCookies {
    /// Creates an empty set (a request without a `Cookie` header).
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a single `Cookie` header value such as `a=1; b=2`.
    ///
    /// Malformed pairs are skipped, matching what browsers and servers do
    /// in practice: one bad cookie must not hide the session cookie.
    pub fn parse(header: &str) -> Self {
        Self::from_headers([header])
    }

    /// Parses every `Cookie` header of a request.
    pub fn from_headers<'a, I>(headers: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut pairs = Vec::new();
        for header in headers {
            for raw in header.split(';') {
                let raw = raw.trim();
                if raw.is_empty() {
                    continue;
                }
                match parse_pair(raw) {
                    Ok(pair) => pairs.push(pair),
                    Err(e) => trace!(error = %e, "skipping cookie"),
                }
            }
        }
        Self { pairs }
    }

    /// Adds a pair directly, bypassing header parsing.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((name.into(), value.into()));
    }

    /// Returns the first value stored under `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl CookieSource for RequestCookies {
    fn cookie(&self, name: &str) -> Option<String> {
        self.get(name).map(str::to_string)
    }
}

/// Splits `name=value`, trimming whitespace and one layer of quotes.
fn parse_pair(raw: &str) -> Result<(String, String), CookieError> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| CookieError::Malformed(raw.to_string()))?;
    let name = name.trim();
    if name.is_empty() || name.contains(char::is_whitespace) {
        return Err(CookieError::Malformed(raw.to_string()));
    }
    let value = value.trim();
    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value);
    Ok((name.to_string(), value.to_string()))
}

// ---------------------------------------------------------------------------
// ResponseCookies
// ---------------------------------------------------------------------------

/// Collects `Set-Cookie` instructions for one response.
#[derive(Debug, Clone, Default)]
pub struct ResponseCookies {
    cookies: Vec<SetCookie>,
}

impl ResponseCookies {
    pub fn new() -> Self {
        Self::default()
    }

    /// The queued cookies, in the order they were set.
    pub fn cookies(&self) -> &[SetCookie] {
        &self.cookies
    }

    /// The last cookie queued under `name`, if any.
    pub fn get(&self, name: &str) -> Option<&SetCookie> {
        self.cookies.iter().rev().find(|c| c.name == name)
    }

    /// Rendered `Set-Cookie` header values, ready to write out.
    pub fn header_values(&self) -> Vec<String> {
        self.cookies.iter().map(ToString::to_string).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }
}

impl CookieSink for ResponseCookies {
    fn set_cookie(&mut self, cookie: SetCookie) {
        self.cookies.push(cookie);
    }
}
