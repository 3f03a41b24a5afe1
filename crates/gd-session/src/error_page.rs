use gd_net::StatusCode;

/// Gemtext shown in place of a response that cannot be displayed.
pub(crate) fn error_page_source(code: StatusCode, meta: Option<&str>, save_shortcut: &str) -> String {
    let error = code.error();
    let mut source = format!("# {} {}\n{}", error.icon, error.title, error.info);
    let Some(meta) = meta else {
        return source;
    };

    match code {
        StatusCode::SCHEME_CHANGE_REDIRECT | StatusCode::TOO_MANY_REDIRECTS => {
            source.push_str(&format!("\n=> {meta}\n"));
        }
        StatusCode::FAILED_TO_OPEN_FILE | StatusCode::CERTIFICATE_NOT_VALID => {
            source.push_str(&format!("\n\n{meta}"));
        }
        StatusCode::UNSUPPORTED_MIME_TYPE => {
            source.push_str(&format!(
                "\n```\n{meta}\n```\nYou can save it as a file to your Downloads folder, though. \
                 Press {save_shortcut} or select \"Save to Downloads\" from the menu."
            ));
        }
        StatusCode::SLOW_DOWN => {
            source.push_str(&format!("\n\nWait {meta} seconds before your next request."));
        }
        _ => {}
    }
    source
}

#[cfg(test)]
mod tests {
    use super::error_page_source;
    use gd_net::StatusCode;

    #[test]
    fn redirect_errors_link_to_the_target() {
        let page = error_page_source(
            StatusCode::TOO_MANY_REDIRECTS,
            Some("gemini://example/b"),
            "Ctrl+S",
        );
        assert!(page.starts_with("# \u{27a0} Too Many Redirects\n"));
        assert!(page.ends_with("\n=> gemini://example/b\n"));
    }

    #[test]
    fn slow_down_mentions_the_wait() {
        let page = error_page_source(StatusCode::SLOW_DOWN, Some("30"), "Ctrl+S");
        assert!(page.ends_with("Wait 30 seconds before your next request."));
    }

    #[test]
    fn unsupported_type_offers_saving() {
        let page = error_page_source(
            StatusCode::UNSUPPORTED_MIME_TYPE,
            Some("application/zip"),
            "Ctrl+S",
        );
        assert!(page.contains("\n```\napplication/zip\n```\n"));
        assert!(page.contains("Press Ctrl+S or select \"Save to Downloads\""));
    }

    #[test]
    fn meta_is_ignored_for_generic_failures() {
        let page = error_page_source(StatusCode::NOT_FOUND, Some("nope"), "Ctrl+S");
        assert!(!page.contains("nope"));
        assert!(page.starts_with("# \u{1f50d} Not Found\n"));
    }

    #[test]
    fn undefined_codes_use_the_category_text() {
        let page = error_page_source(StatusCode::new(47), None, "Ctrl+S");
        assert!(page.contains("Temporary Failure"));
    }
}
