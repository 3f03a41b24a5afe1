//! URL parsing and navigation helpers for Gemini-style locations.

use gd_core::BrowserError;
use gd_core::BrowserResult;
use url::Url;

/// Parsed location of a session or media request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GemUrl {
    parsed: Url,
}

impl GemUrl {
    pub fn parse(input: &str) -> BrowserResult<Self> {
        let parsed = Url::parse(input.trim()).map_err(|error| {
            BrowserError::new(
                "net.url.invalid",
                format!("failed to parse URL `{input}`: {error}"),
            )
        })?;
        Ok(Self { parsed })
    }

    /// Resolves `reference` against this URL.
    pub fn join(&self, reference: &str) -> BrowserResult<Self> {
        let parsed = self.parsed.join(reference.trim()).map_err(|error| {
            BrowserError::new(
                "net.url.join_failed",
                format!("cannot resolve `{reference}` against `{}`: {error}", self.parsed),
            )
        })?;
        Ok(Self { parsed })
    }

    pub fn as_str(&self) -> &str {
        self.parsed.as_str()
    }

    pub fn scheme(&self) -> &str {
        self.parsed.scheme()
    }

    pub fn host(&self) -> &str {
        self.parsed.host_str().unwrap_or_default()
    }

    pub fn path(&self) -> &str {
        self.parsed.path()
    }

    pub fn query(&self) -> Option<&str> {
        self.parsed.query()
    }

    pub fn username(&self) -> &str {
        self.parsed.username()
    }

    /// `scheme://host[:port]` without a trailing slash.
    pub fn root(&self) -> String {
        let mut out = format!("{}://{}", self.scheme(), self.host());
        if let Some(port) = self.parsed.port() {
            out.push(':');
            out.push_str(&port.to_string());
        }
        out
    }

    /// One directory up, keeping the trailing slash; `None` at the root.
    pub fn parent(&self) -> Option<Self> {
        let path = self.path();
        if path.len() <= 1 {
            return None;
        }
        let trimmed = path.strip_suffix('/').unwrap_or(path);
        let cut = trimmed.rfind('/').map_or(0, |index| index + 1);
        let mut parsed = self.parsed.clone();
        parsed.set_path(&trimmed[..cut]);
        parsed.set_query(None);
        parsed.set_fragment(None);
        Some(Self { parsed })
    }

    /// Replaces the query with an already-encoded value.
    pub fn with_query(&self, encoded: &str) -> Self {
        let mut parsed = self.parsed.clone();
        parsed.set_fragment(None);
        parsed.set_query(Some(encoded));
        Self { parsed }
    }

    /// Last non-empty path segment, percent-decoded.
    pub fn basename(&self) -> Option<String> {
        let segment = self.path().rsplit('/').find(|segment| !segment.is_empty())?;
        Some(percent_decode(segment))
    }

    /// Lower-cased file extension of the basename, if any.
    pub fn extension(&self) -> Option<String> {
        let name = self.basename()?;
        let (_, ext) = name.rsplit_once('.')?;
        if ext.is_empty() {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }
}

/// Resolves `reference` against `base`, falling back to the reference itself
/// when it is already absolute or the base is unusable.
pub fn absolute_url(base: &str, reference: &str) -> String {
    if let Ok(base) = GemUrl::parse(base) {
        if let Ok(joined) = base.join(reference) {
            return joined.as_str().to_owned();
        }
    }
    match GemUrl::parse(reference) {
        Ok(parsed) => parsed.as_str().to_owned(),
        Err(_) => reference.to_owned(),
    }
}

/// Scheme of `url`, lower-cased; empty when it does not parse.
pub fn scheme_of(url: &str) -> String {
    GemUrl::parse(url)
        .map(|parsed| parsed.scheme().to_ascii_lowercase())
        .unwrap_or_default()
}

/// Whether the session can fetch `url` itself.
pub fn is_supported_scheme(scheme: &str) -> bool {
    matches!(
        scheme.to_ascii_lowercase().as_str(),
        "gemini" | "about" | "file" | "data"
    )
}

/// Percent-encodes everything outside the unreserved set.
pub fn percent_encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.' | b'~') {
            out.push(char::from(byte));
        } else {
            out.push('%');
            out.push(hex_digit(byte >> 4));
            out.push(hex_digit(byte & 0x0f));
        }
    }
    out
}

pub fn percent_decode(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut index = 0_usize;
    while index < bytes.len() {
        if bytes[index] == b'%' && index + 2 < bytes.len() {
            if let (Some(high), Some(low)) =
                (hex_value(bytes[index + 1]), hex_value(bytes[index + 2]))
            {
                out.push(high << 4 | low);
                index += 3;
                continue;
            }
        }
        out.push(bytes[index]);
        index += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_digit(nibble: u8) -> char {
    char::from(b"0123456789ABCDEF"[usize::from(nibble & 0x0f)])
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::GemUrl;
    use super::absolute_url;
    use super::percent_decode;
    use super::percent_encode;
    use super::scheme_of;

    fn parse(input: &str) -> GemUrl {
        match GemUrl::parse(input) {
            Ok(value) => value,
            Err(error) => panic!("{error}"),
        }
    }

    #[test]
    fn parses_gemini_url() {
        let url = parse("gemini://example.org:1966/docs/a.gmi?q");
        assert_eq!(url.scheme(), "gemini");
        assert_eq!(url.host(), "example.org");
        assert_eq!(url.root(), "gemini://example.org:1966");
        assert_eq!(url.query(), Some("q"));
        assert_eq!(url.basename().as_deref(), Some("a.gmi"));
        assert_eq!(url.extension().as_deref(), Some("gmi"));
    }

    #[test]
    fn parent_strips_one_segment() {
        let url = parse("gemini://example/a/b/c.gmi");
        assert_eq!(
            url.parent().map(|p| p.as_str().to_owned()).as_deref(),
            Some("gemini://example/a/b/")
        );
        let dir = parse("gemini://example/a/b/");
        assert_eq!(
            dir.parent().map(|p| p.as_str().to_owned()).as_deref(),
            Some("gemini://example/a/")
        );
        assert!(parse("gemini://example/").parent().is_none());
    }

    #[test]
    fn relative_references_resolve() {
        assert_eq!(
            absolute_url("gemini://example/a/b.gmi", "c.png"),
            "gemini://example/a/c.png"
        );
        assert_eq!(
            absolute_url("gemini://example/a/", "/root.gmi"),
            "gemini://example/root.gmi"
        );
        assert_eq!(
            absolute_url("gemini://example/", "https://other/x"),
            "https://other/x"
        );
    }

    #[test]
    fn query_is_replaced() {
        let url = parse("gemini://example/search?old");
        let next = url.with_query(&percent_encode("a b&c"));
        assert_eq!(next.as_str(), "gemini://example/search?a%20b%26c");
    }

    #[test]
    fn percent_codec_handles_utf8() {
        let encoded = percent_encode("ä/");
        assert_eq!(encoded, "%C3%A4%2F");
        assert_eq!(percent_decode(&encoded), "ä/");
        assert_eq!(percent_decode("100%"), "100%");
    }

    #[test]
    fn invalid_urls_report_code() {
        let parsed = GemUrl::parse("not a url");
        assert!(parsed.is_err());
        if let Err(error) = parsed {
            assert_eq!(error.code, "net.url.invalid");
        }
        assert_eq!(scheme_of("GEMINI://x/"), "gemini");
        assert_eq!(scheme_of("::"), "");
    }
}
