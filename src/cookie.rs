//! Cookie codec: signing, serialization and header parsing
//!
//! Signed values use the format `s:` + value + `.` + base64(HMAC-SHA256)
//! with the trailing `=` padding stripped, so a tampered cookie is
//! distinguishable from a plain one on read and verification never
//! panics. Non-string values are tagged with a `j:` prefix and JSON
//! encoded before signing so they round-trip through [`unsign`] and
//! [`decode_value`].

use std::collections::HashMap;

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Marker prefix for signed cookie values.
const SIGNED_PREFIX: &str = "s:";

/// Marker prefix for JSON-encoded cookie values.
const JSON_PREFIX: &str = "j:";

/// Sign a value: `s:` + value + `.` + base64 signature (no padding).
pub fn sign(value: &str, secret: &str) -> String {
    format!("{}{}.{}", SIGNED_PREFIX, value, signature(value, secret))
}

/// Verify and strip the signature from a signed value.
///
/// Returns the original value when the signature checks out, `None` for
/// anything else: missing `s:` prefix, missing separator, or a signature
/// that does not match. Tampering is never an error, just `None`.
pub fn unsign(signed_value: &str, secret: &str) -> Option<String> {
    let without_prefix = signed_value.strip_prefix(SIGNED_PREFIX)?;

    let dot = without_prefix.rfind('.')?;
    let value = &without_prefix[..dot];
    let provided = &without_prefix[dot + 1..];

    let expected = signature(value, secret);
    if constant_time_eq(&expected, provided) {
        Some(value.to_string())
    } else {
        None
    }
}

fn signature(value: &str, secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any size");
    mac.update(value.as_bytes());
    STANDARD
        .encode(mac.finalize().into_bytes())
        .trim_end_matches('=')
        .to_string()
}

/// Constant-time comparison to keep signature checks timing-safe.
fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut diff = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Encode a JSON value for transport in a cookie.
///
/// Strings pass through untouched, numbers are stringified, everything
/// else gets the `j:` prefix plus its JSON encoding. Callers apply this
/// before [`sign`]/[`serialize_cookie`]; neither does it for them, since
/// the session cookie itself carries a plain string id.
pub fn encode_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        other => format!("{}{}", JSON_PREFIX, other),
    }
}

/// Decode a raw cookie value, reversing [`encode_value`]'s tagging.
///
/// Applied by callers after [`parse_cookie_header`]/[`unsign`], which
/// both hand back the tagged string untouched. A `j:` payload that fails
/// to parse degrades to the raw string rather than erroring; stale
/// clients may carry arbitrary bytes.
pub fn decode_value(raw: &str) -> Value {
    match raw.strip_prefix(JSON_PREFIX) {
        Some(json) => {
            serde_json::from_str(json).unwrap_or_else(|_| Value::String(raw.to_string()))
        }
        None => Value::String(raw.to_string()),
    }
}

/// Attributes for a serialized `Set-Cookie` value.
#[derive(Clone, Debug, Default)]
pub struct CookieOptions {
    /// Cookie path; serialized as `/` when unset
    pub path: Option<String>,
    /// Cookie domain
    pub domain: Option<String>,
    /// Secure flag
    pub secure: bool,
    /// HttpOnly flag
    pub http_only: bool,
    /// Max age in milliseconds; also derives the `Expires` attribute
    pub max_age_ms: Option<u64>,
    /// Explicit expiry, overridden by `max_age_ms` when both are set
    pub expires: Option<DateTime<Utc>>,
}

/// Serialize one cookie into a `Set-Cookie` header value.
///
/// `max_age_ms` is converted to seconds for the wire `Max-Age` attribute
/// and to an absolute `Expires` timestamp. The value is URL-encoded.
pub fn serialize_cookie(name: &str, value: &str, options: &CookieOptions) -> String {
    let mut header = format!("{}={}", name, urlencoding::encode(value));

    let mut expires = options.expires;
    if let Some(max_age_ms) = options.max_age_ms {
        expires = Some(Utc::now() + chrono::Duration::milliseconds(max_age_ms as i64));
        header.push_str(&format!("; Max-Age={}", max_age_ms / 1000));
    }

    if let Some(domain) = &options.domain {
        header.push_str(&format!("; Domain={}", domain));
    }

    let path = options.path.as_deref().unwrap_or("/");
    header.push_str(&format!("; Path={}", path));

    if let Some(expires) = expires {
        header.push_str(&format!(
            "; Expires={}",
            expires.format("%a, %d %b %Y %H:%M:%S GMT")
        ));
    }

    if options.http_only {
        header.push_str("; HttpOnly");
    }
    if options.secure {
        header.push_str("; Secure");
    }

    header
}

/// Parse a `Cookie` request header into name/value pairs.
///
/// Values are URL-decoded; pairs without `=` are skipped. On duplicate
/// names the first occurrence wins, matching common client behavior.
pub fn parse_cookie_header(header: &str) -> HashMap<String, String> {
    let mut cookies = HashMap::new();

    for pair in header.split(';') {
        let Some((name, value)) = pair.split_once('=') else {
            continue;
        };
        let name = name.trim();
        let value = value.trim().trim_matches('"');
        if name.is_empty() {
            continue;
        }

        let decoded = urlencoding::decode(value)
            .map(|d| d.into_owned())
            .unwrap_or_else(|_| value.to_string());

        cookies.entry(name.to_string()).or_insert(decoded);
    }

    cookies
}

/// Ordered accumulator for `Set-Cookie` header values.
///
/// Multiple cookies set on one response accumulate in call order; the
/// jar never overwrites a previously added header.
#[derive(Clone, Debug, Default)]
pub struct CookieJar {
    headers: Vec<String>,
}

impl CookieJar {
    /// Create an empty jar.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one serialized `Set-Cookie` value.
    pub fn add(&mut self, header: String) {
        self.headers.push(header);
    }

    /// All accumulated `Set-Cookie` values, in insertion order.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sign_unsign_round_trip() {
        let secret = "keyboard cat";
        for value in ["session-id", "", "with.dots.inside", "unicode \u{2764}"] {
            let signed = sign(value, secret);
            assert!(signed.starts_with("s:"));
            assert_eq!(unsign(&signed, secret), Some(value.to_string()));
        }
    }

    #[test]
    fn unsign_rejects_tampering() {
        let secret = "keyboard cat";
        let signed = sign("session-id", secret);

        let mut tampered = signed.replace("session-id", "other-id");
        assert_eq!(unsign(&tampered, secret), None);

        tampered = signed.clone();
        tampered.push('x');
        assert_eq!(unsign(&tampered, secret), None);

        assert_eq!(unsign(&signed, "wrong secret"), None);
        assert_eq!(unsign("session-id.sig", secret), None);
        assert_eq!(unsign("s:no-separator", secret), None);
    }

    #[test]
    fn known_signature_vector() {
        // Matches Node's cookie-signature output for the same inputs.
        assert_eq!(
            sign("my session id", "secret"),
            "s:my session id.Jytwl6nuMV42lj6Ldd7aa4sboVs87ZnnCfYLCAm7OrU"
        );
    }

    #[test]
    fn value_tagging_round_trip() {
        assert_eq!(encode_value(&json!("plain")), "plain");
        assert_eq!(encode_value(&json!(42)), "42");

        let object = json!({"a": 1, "b": [true, null]});
        let encoded = encode_value(&object);
        assert!(encoded.starts_with("j:"));
        assert_eq!(decode_value(&encoded), object);

        assert_eq!(decode_value("plain"), json!("plain"));
        assert_eq!(decode_value("j:not json"), json!("j:not json"));
    }

    #[test]
    fn serialize_defaults_path_and_flags() {
        let header = serialize_cookie("sid", "abc", &CookieOptions::default());
        assert_eq!(header, "sid=abc; Path=/");
    }

    #[test]
    fn serialize_with_all_attributes() {
        let options = CookieOptions {
            path: Some("/app".to_string()),
            domain: Some("example.com".to_string()),
            secure: true,
            http_only: true,
            max_age_ms: Some(300_000),
            expires: None,
        };
        let header = serialize_cookie("sid", "a value", &options);

        assert!(header.starts_with("sid=a%20value"));
        assert!(header.contains("; Max-Age=300"));
        assert!(header.contains("; Domain=example.com"));
        assert!(header.contains("; Path=/app"));
        assert!(header.contains("; Expires="));
        assert!(header.contains(" GMT"));
        assert!(header.contains("; HttpOnly"));
        assert!(header.ends_with("; Secure"));
    }

    #[test]
    fn parse_header_decodes_values() {
        let cookies = parse_cookie_header("sid=s%3Aabc.def; theme=dark; bare");
        assert_eq!(cookies.get("sid").map(String::as_str), Some("s:abc.def"));
        assert_eq!(cookies.get("theme").map(String::as_str), Some("dark"));
        assert_eq!(cookies.len(), 2);
    }

    #[test]
    fn parse_header_first_duplicate_wins() {
        let cookies = parse_cookie_header("sid=first; sid=second");
        assert_eq!(cookies.get("sid").map(String::as_str), Some("first"));
    }

    #[test]
    fn jar_accumulates_in_order() {
        let mut jar = CookieJar::new();
        jar.add(serialize_cookie("a", "1", &CookieOptions::default()));
        jar.add(serialize_cookie("b", "2", &CookieOptions::default()));
        assert_eq!(jar.headers(), &["a=1; Path=/", "b=2; Path=/"]);
    }
}
