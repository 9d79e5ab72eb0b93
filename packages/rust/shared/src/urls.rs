//! URL normalization helpers shared by navigation, crawling and stitching.

use url::Url;

/// Strip the fragment and any trailing slash.
///
/// This is the key pages are indexed by once loaded from disk and the form
/// navigation URLs are stored in.
pub fn normalize_url(raw: &str) -> String {
    match Url::parse(raw.trim()) {
        Ok(mut url) => {
            url.set_fragment(None);
            url.as_str().trim_end_matches('/').to_string()
        }
        Err(_) => raw
            .trim()
            .split('#')
            .next()
            .unwrap_or_default()
            .trim_end_matches('/')
            .to_string(),
    }
}

/// Visited-set key: scheme, host, port and path only.
///
/// Two URLs differing only by fragment, query or trailing slash share a key.
pub fn dedup_key(raw: &str) -> String {
    match Url::parse(raw.trim()) {
        Ok(url) => {
            let host = url.host_str().unwrap_or_default();
            let port = url.port().map(|p| format!(":{p}")).unwrap_or_default();
            let path = url.path().trim_end_matches('/');
            format!("{}://{host}{port}{path}", url.scheme())
        }
        Err(_) => normalize_url(raw.split('?').next().unwrap_or_default()),
    }
}

/// The path component with any trailing slash removed.
pub fn url_path(raw: &str) -> String {
    match Url::parse(raw.trim()) {
        Ok(url) => url.path().trim_end_matches('/').to_string(),
        Err(_) => String::new(),
    }
}
