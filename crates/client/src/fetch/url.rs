//! URL canonicalization and origin helpers.

use siteprofile_core::ErrorOutcome;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("URL has no host: {0}")]
    MissingHost(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl From<UrlError> for ErrorOutcome {
    fn from(err: UrlError) -> Self {
        ErrorOutcome::invalid_url(err.to_string())
    }
}

/// Canonicalize a URL string before fetching.
///
/// Trims whitespace, defaults the scheme to `https`, lowercases the host
/// and drops the fragment. The query string is kept as given.
pub fn canonicalize(input: &str) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let url_str = if trimmed.contains("://") { trimmed.to_string() } else { format!("https://{trimmed}") };
    let mut parsed = url::Url::parse(&url_str).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    let host = parsed
        .host_str()
        .filter(|host| !host.is_empty())
        .map(str::to_lowercase)
        .ok_or_else(|| UrlError::MissingHost(trimmed.to_string()))?;
    parsed
        .set_host(Some(&host))
        .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    parsed.set_fragment(None);

    Ok(parsed)
}

/// `scheme://host[:port]` of a URL, without a trailing slash.
pub fn origin(url: &url::Url) -> String {
    url.origin().ascii_serialization()
}

/// Resolve a possibly relative reference against `base`, keeping only web URLs.
pub fn resolve(base: &url::Url, reference: &str) -> Option<String> {
    let reference = reference.trim();
    if reference.is_empty() {
        return None;
    }
    let joined = base.join(reference).ok()?;
    matches!(joined.scheme(), "http" | "https").then(|| joined.to_string())
}

/// Registrable-looking host of a URL with any leading `www.` removed.
pub fn bare_host(url: &url::Url) -> String {
    let host = url.host_str().unwrap_or_default();
    host.strip_prefix("www.").unwrap_or(host).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize_default_scheme_and_case() {
        let url = canonicalize("  EXAMPLE.com/Path?q=1#frag ").unwrap();
        assert_eq!(url.as_str(), "https://example.com/Path?q=1");
    }

    #[test]
    fn test_canonicalize_rejects() {
        assert_eq!(canonicalize("   "), Err(UrlError::Empty));
        assert!(matches!(canonicalize("ftp://example.com"), Err(UrlError::UnsupportedScheme(s)) if s == "ftp"));
        assert!(matches!(canonicalize("https://"), Err(UrlError::InvalidUrl(_))));
    }

    #[test]
    fn test_canonicalize_keeps_http() {
        assert_eq!(canonicalize("http://example.com").unwrap().scheme(), "http");
    }

    #[test]
    fn test_origin() {
        let url = canonicalize("https://example.com:8443/a/b").unwrap();
        assert_eq!(origin(&url), "https://example.com:8443");
        assert_eq!(origin(&canonicalize("example.com/x").unwrap()), "https://example.com");
    }

    #[test]
    fn test_resolve() {
        let base = canonicalize("https://example.com/shop/").unwrap();
        assert_eq!(resolve(&base, "img/a.png").as_deref(), Some("https://example.com/shop/img/a.png"));
        assert_eq!(resolve(&base, "/logo.svg").as_deref(), Some("https://example.com/logo.svg"));
        assert_eq!(resolve(&base, "mailto:a@example.com"), None);
        assert_eq!(resolve(&base, " "), None);
    }

    #[test]
    fn test_bare_host() {
        assert_eq!(bare_host(&canonicalize("https://www.acme-bakery.co.uk").unwrap()), "acme-bakery.co.uk");
    }

    #[test]
    fn test_url_error_outcome() {
        let outcome: ErrorOutcome = UrlError::Empty.into();
        assert_eq!(outcome.status_code, 400);
        assert_eq!(outcome.code, ErrorOutcome::INVALID_URL);
    }
}
