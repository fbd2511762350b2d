//! Domain extraction from raw tab URLs.

use url::Url;

use crate::types::Domain;

/// URL schemes that belong to the browser itself or to extensions.
const EXCLUDED_SCHEMES: &[&str] = &[
    "chrome",
    "chrome-extension",
    "moz-extension",
    "edge",
    "about",
];

/// Extracts the canonical domain from a tab URL.
///
/// Returns `None` for internal browser pages, extension pages, URLs without a
/// host and anything that fails to parse. A leading `www.` is stripped.
pub fn normalize_url(raw: &str) -> Option<Domain> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let url = match Url::parse(trimmed) {
        Ok(url) => url,
        Err(err) => {
            tracing::debug!(url = trimmed, error = %err, "unparseable tab url");
            return None;
        }
    };

    if EXCLUDED_SCHEMES.contains(&url.scheme()) {
        return None;
    }

    let host = url.host_str()?;
    let host = host.strip_prefix("www.").unwrap_or(host);
    Domain::new(host).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn domain(raw: &str) -> Option<String> {
        normalize_url(raw).map(String::from)
    }

    #[test]
    fn strips_www_prefix() {
        assert_eq!(
            domain("https://www.github.com/rust-lang/rust").as_deref(),
            Some("github.com")
        );
    }

    #[test]
    fn keeps_other_subdomains() {
        assert_eq!(
            domain("https://docs.google.com/document/d/1").as_deref(),
            Some("docs.google.com")
        );
    }

    #[test]
    fn only_strips_leading_www() {
        assert_eq!(
            domain("https://api.www.example.com/").as_deref(),
            Some("api.www.example.com")
        );
    }

    #[test]
    fn drops_port_and_lowercases_host() {
        assert_eq!(
            domain("http://LocalHost:8080/admin").as_deref(),
            Some("localhost")
        );
    }

    #[test]
    fn rejects_internal_and_extension_pages() {
        assert_eq!(domain("chrome://extensions"), None);
        assert_eq!(domain("chrome-extension://abcdef/popup.html"), None);
        assert_eq!(domain("moz-extension://1234/dashboard.html"), None);
        assert_eq!(domain("about:blank"), None);
        assert_eq!(domain("edge://settings"), None);
    }

    #[test]
    fn rejects_absent_or_malformed_urls() {
        assert_eq!(domain(""), None);
        assert_eq!(domain("   "), None);
        assert_eq!(domain("not a url"), None);
        assert_eq!(domain("https://"), None);
    }

    #[test]
    fn rejects_urls_without_host() {
        assert_eq!(domain("file:///home/user/notes.txt"), None);
        assert_eq!(domain("data:text/plain,hello"), None);
    }
}
