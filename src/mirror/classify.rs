//! Decide whether a reference needs mirroring

use reqwest::Url;

/// Hosts treated as developer-local and never mirrored
const LOOPBACK_HOSTS: [&str; 2] = ["localhost", "127.0.0.1"];

/// How a candidate reference should be handled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlClass {
    /// Site-relative path (`/…` or `./…`)
    Local,
    /// Not an absolute http(s) URL; passed through untouched
    Opaque,
    /// Points at a local development server
    Loopback,
    /// Remote image that should be mirrored
    Remote(Url),
}

/// Classify a reference found in content.
pub fn classify(candidate: &str) -> UrlClass {
    if candidate.starts_with('/') || candidate.starts_with("./") {
        return UrlClass::Local;
    }

    let Ok(url) = Url::parse(candidate) else {
        return UrlClass::Opaque;
    };

    if !matches!(url.scheme(), "http" | "https") {
        return UrlClass::Opaque;
    }

    match url.host_str() {
        Some(host) if LOOPBACK_HOSTS.contains(&host) => UrlClass::Loopback,
        Some(_) => UrlClass::Remote(url),
        None => UrlClass::Opaque,
    }
}
