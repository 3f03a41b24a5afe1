//! Declared content type handling and text transcoding.

use encoding_rs::Encoding;

/// How a successful response body is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Gemini,
    PlainText,
    Image,
    Audio,
    Unsupported,
}

impl ContentKind {
    pub fn is_media(self) -> bool {
        matches!(self, Self::Image | Self::Audio)
    }
}

/// Parsed `meta` of a success response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    pub kind: ContentKind,
    pub essence: String,
    pub charset: Option<String>,
}

impl ContentType {
    pub fn parse(meta: &str) -> Self {
        let lower = meta.to_ascii_lowercase();
        let mut parts = lower.split(';');
        let essence = parts.next().unwrap_or_default().trim().to_owned();
        let kind = classify(&essence);
        Self {
            kind,
            essence,
            charset: parse_charset(meta),
        }
    }

    /// Whether the charset is absent or already UTF-8.
    pub fn is_utf8(&self) -> bool {
        self.charset.as_deref().is_none_or(|label| {
            label.eq_ignore_ascii_case("utf-8") || label.eq_ignore_ascii_case("utf8")
        })
    }
}

fn classify(essence: &str) -> ContentKind {
    if essence == "text/gemini" {
        return ContentKind::Gemini;
    }
    if essence.starts_with("text/") || essence == "application/json" {
        return ContentKind::PlainText;
    }
    if essence.starts_with("image/") {
        return ContentKind::Image;
    }
    if essence.starts_with("audio/") {
        return ContentKind::Audio;
    }
    ContentKind::Unsupported
}

/// `charset` parameter of a content type, with surrounding quotes removed.
pub fn parse_charset(content_type: &str) -> Option<String> {
    for part in content_type.split(';').skip(1) {
        let Some((name, value)) = part.split_once('=') else {
            continue;
        };
        if !name.trim().eq_ignore_ascii_case("charset") {
            continue;
        }

        let label = value.trim().trim_matches('"').trim_matches('\'');
        if !label.is_empty() {
            return Some(label.to_owned());
        }
    }

    None
}

/// Decodes `body` using `charset`; unknown labels fall back to lossy UTF-8.
pub fn decode_text(body: &[u8], charset: Option<&str>) -> String {
    if let Some(label) = charset {
        if let Some(encoding) = Encoding::for_label(label.as_bytes()) {
            let (decoded, _, had_errors) = encoding.decode(body);
            if had_errors {
                tracing::debug!(charset = label, "body contained undecodable bytes");
            }
            return decoded.into_owned();
        }
        tracing::debug!(charset = label, "unknown charset label");
    }

    String::from_utf8_lossy(body).into_owned()
}

/// Content type guessed from a file name, used by local transports.
pub fn guess_from_extension(ext: &str) -> &'static str {
    match ext.to_ascii_lowercase().as_str() {
        "gmi" | "gemini" => "text/gemini; charset=utf-8",
        "txt" | "md" | "rs" | "toml" => "text/plain; charset=utf-8",
        "json" => "application/json",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "mp3" => "audio/mpeg",
        "ogg" => "audio/ogg",
        "wav" => "audio/wave",
        _ => "application/octet-stream",
    }
}

/// File extension used when saving content of type `essence`.
pub fn extension_for(essence: &str) -> &'static str {
    match essence {
        "text/gemini" => "gmi",
        "text/plain" => "txt",
        "application/json" => "json",
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "audio/mpeg" => "mp3",
        "audio/ogg" => "ogg",
        "audio/wave" | "audio/wav" => "wav",
        _ => "bin",
    }
}
