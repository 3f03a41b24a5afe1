//! Response status codes, their categories and user-facing error texts.

/// Gemini status code; negative values are produced locally by the client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StatusCode(i32);

/// Coarse classification of a fetch outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCategory {
    None,
    Input,
    Success,
    Redirect,
    TemporaryFailure,
    PermanentFailure,
    Unknown,
}

/// Icon, title and explanation used to build an error document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusError {
    pub icon: char,
    pub title: &'static str,
    pub info: &'static str,
}

impl StatusCode {
    pub const NONE: Self = Self(0);
    pub const INPUT: Self = Self(10);
    pub const SENSITIVE_INPUT: Self = Self(11);
    pub const SUCCESS: Self = Self(20);
    pub const REDIRECT_TEMPORARY: Self = Self(30);
    pub const REDIRECT_PERMANENT: Self = Self(31);
    pub const TEMPORARY_FAILURE: Self = Self(40);
    pub const SERVER_UNAVAILABLE: Self = Self(41);
    pub const CGI_ERROR: Self = Self(42);
    pub const PROXY_ERROR: Self = Self(43);
    pub const SLOW_DOWN: Self = Self(44);
    pub const PERMANENT_FAILURE: Self = Self(50);
    pub const NOT_FOUND: Self = Self(51);
    pub const GONE: Self = Self(52);
    pub const PROXY_REQUEST_REFUSED: Self = Self(53);
    pub const BAD_REQUEST: Self = Self(59);
    pub const CLIENT_CERTIFICATE_REQUIRED: Self = Self(60);
    pub const CERTIFICATE_NOT_AUTHORIZED: Self = Self(61);
    pub const CERTIFICATE_NOT_VALID: Self = Self(62);

    pub const UNKNOWN_STATUS: Self = Self(-1);
    pub const INVALID_HEADER: Self = Self(-2);
    pub const INVALID_REDIRECT: Self = Self(-3);
    pub const SCHEME_CHANGE_REDIRECT: Self = Self(-4);
    pub const TOO_MANY_REDIRECTS: Self = Self(-5);
    pub const UNSUPPORTED_MIME_TYPE: Self = Self(-6);
    pub const FAILED_TO_OPEN_FILE: Self = Self(-7);
    pub const UNSUPPORTED_SCHEME: Self = Self(-8);

    pub const fn new(code: i32) -> Self {
        Self(code)
    }

    pub const fn as_i32(self) -> i32 {
        self.0
    }

    pub fn is_success(self) -> bool {
        self.category() == StatusCategory::Success
    }

    pub fn category(self) -> StatusCategory {
        match self.0 {
            0 => StatusCategory::None,
            10..=19 => StatusCategory::Input,
            20..=29 => StatusCategory::Success,
            30..=39 => StatusCategory::Redirect,
            40..=49 => StatusCategory::TemporaryFailure,
            50..=59 => StatusCategory::PermanentFailure,
            // Locally produced failures never succeed on retry.
            code if code < 0 => StatusCategory::PermanentFailure,
            _ => StatusCategory::Unknown,
        }
    }

    /// Error text defined specifically for this code, if any.
    pub fn defined_error(self) -> Option<StatusError> {
        let (icon, title, info) = match self {
            Self::TEMPORARY_FAILURE => (
                '\u{231b}',
                "Temporary Failure",
                "The request has failed, but may succeed if you try again in the future.",
            ),
            Self::SERVER_UNAVAILABLE => (
                '\u{1f525}',
                "Server Unavailable",
                "The server is unavailable due to overload or maintenance. Check back later.",
            ),
            Self::CGI_ERROR => (
                '\u{1f4a5}',
                "CGI Error",
                "Failure during dynamic content generation on the server.",
            ),
            Self::PROXY_ERROR => (
                '\u{1f310}',
                "Proxy Error",
                "A proxy request failed because the server was unable to complete a transaction with the remote host.",
            ),
            Self::SLOW_DOWN => (
                '\u{1f40c}',
                "Slow Down",
                "The server is rate limiting requests.",
            ),
            Self::PERMANENT_FAILURE => (
                '\u{1f6ab}',
                "Permanent Failure",
                "Your request has failed and will fail in the future as well if repeated.",
            ),
            Self::NOT_FOUND => (
                '\u{1f50d}',
                "Not Found",
                "The requested resource could not be found at this time.",
            ),
            Self::GONE => (
                '\u{1f47b}',
                "Gone",
                "The resource requested is no longer available and will not be available again.",
            ),
            Self::PROXY_REQUEST_REFUSED => (
                '\u{1f6c2}',
                "Proxy Request Refused",
                "The request was for a resource at a domain not served by the server and the server does not accept proxy requests.",
            ),
            Self::BAD_REQUEST => (
                '\u{1f44e}',
                "Bad Request",
                "The server did not understand your request.",
            ),
            Self::CLIENT_CERTIFICATE_REQUIRED => (
                '\u{1f511}',
                "Certificate Required",
                "Access to the requested resource requires identification via a client certificate.",
            ),
            Self::CERTIFICATE_NOT_AUTHORIZED => (
                '\u{1f512}',
                "Certificate Not Authorized",
                "The provided client certificate is valid but is not authorized for accessing the requested resource.",
            ),
            Self::CERTIFICATE_NOT_VALID => (
                '\u{1f6a8}',
                "Invalid Certificate",
                "The provided client certificate is expired or invalid.",
            ),
            Self::UNKNOWN_STATUS => (
                '\u{1f47d}',
                "Unknown Status Code",
                "The server responded with a status code that is not in the Gemini specification.",
            ),
            Self::INVALID_HEADER => (
                '\u{1f4a9}',
                "Invalid Header",
                "The received header did not conform to the Gemini specification.",
            ),
            Self::INVALID_REDIRECT => (
                '\u{27a0}',
                "Invalid Redirect",
                "The server responded with a redirect but did not provide a valid destination URL.",
            ),
            Self::SCHEME_CHANGE_REDIRECT => (
                '\u{27a0}',
                "Scheme-Changing Redirect",
                "The server attempted to redirect us to a URL whose scheme is different than the originating URL's scheme. Here is the link so you can open it manually if appropriate.",
            ),
            Self::TOO_MANY_REDIRECTS => (
                '\u{27a0}',
                "Too Many Redirects",
                "You may be stuck in a redirection loop. The next redirected URL is below if you want to continue manually.",
            ),
            Self::UNSUPPORTED_MIME_TYPE => (
                '\u{1f47e}',
                "Unsupported MIME Type",
                "The received content cannot be viewed with this application.",
            ),
            Self::FAILED_TO_OPEN_FILE => (
                '\u{1f4c1}',
                "Failed to Open File",
                "The requested file does not exist or is inaccessible.",
            ),
            Self::UNSUPPORTED_SCHEME => (
                '\u{1f50c}',
                "Unsupported Protocol",
                "No transport is available for this kind of URL.",
            ),
            _ => return None,
        };
        Some(StatusError { icon, title, info })
    }

    /// Defined error text, falling back to the category's generic text.
    pub fn error(self) -> StatusError {
        if let Some(defined) = self.defined_error() {
            return defined;
        }
        let fallback = match self.category() {
            StatusCategory::TemporaryFailure => Self::TEMPORARY_FAILURE,
            StatusCategory::PermanentFailure => Self::PERMANENT_FAILURE,
            _ => Self::UNKNOWN_STATUS,
        };
        fallback.defined_error().unwrap_or(StatusError {
            icon: '\u{2327}',
            title: "Error",
            info: "",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::StatusCategory;
    use super::StatusCode;

    #[test]
    fn categories_follow_first_digit() {
        assert_eq!(StatusCode::NONE.category(), StatusCategory::None);
        assert_eq!(StatusCode::SENSITIVE_INPUT.category(), StatusCategory::Input);
        assert_eq!(StatusCode::new(21).category(), StatusCategory::Success);
        assert_eq!(StatusCode::REDIRECT_PERMANENT.category(), StatusCategory::Redirect);
        assert_eq!(StatusCode::SLOW_DOWN.category(), StatusCategory::TemporaryFailure);
        assert_eq!(StatusCode::GONE.category(), StatusCategory::PermanentFailure);
        assert_eq!(StatusCode::new(77).category(), StatusCategory::Unknown);
        assert_eq!(
            StatusCode::CLIENT_CERTIFICATE_REQUIRED.category(),
            StatusCategory::Unknown
        );
    }

    #[test]
    fn undefined_codes_fall_back_by_category() {
        assert!(StatusCode::new(45).defined_error().is_none());
        assert_eq!(StatusCode::new(45).error().title, "Temporary Failure");
        assert_eq!(StatusCode::new(57).error().title, "Permanent Failure");
        assert_eq!(StatusCode::new(88).error().title, "Unknown Status Code");
    }

    #[test]
    fn client_side_codes_have_texts() {
        assert_eq!(
            StatusCode::TOO_MANY_REDIRECTS.error().title,
            "Too Many Redirects"
        );
        assert!(StatusCode::UNSUPPORTED_MIME_TYPE.defined_error().is_some());
    }
}
