//! File extension resolution for mirrored images

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Used when neither the response nor the URL names a known type
pub const DEFAULT_EXTENSION: &str = ".jpg";

/// Image suffixes accepted from a URL path
const URL_IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "gif", "webp", "svg"];

/// Which source decides the extension when both are available
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtensionPrecedence {
    /// The response content-type, then the URL suffix
    #[default]
    ContentType,
    /// The URL suffix, then the response content-type
    UrlSuffix,
}

/// Extension declared by the URL itself, e.g. `.png` for `…/a.PNG?x=1`.
pub fn extension_from_url(url: &str) -> Option<String> {
    static SUFFIX_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\.([a-zA-Z0-9]+)(?:\?[^#]*)?(?:#.*)?$").unwrap());

    let ext = SUFFIX_RE.captures(url)?.get(1)?.as_str().to_ascii_lowercase();
    URL_IMAGE_EXTENSIONS
        .contains(&ext.as_str())
        .then(|| format!(".{}", ext))
}

/// Extension for a known image content-type. Parameters are ignored.
pub fn extension_from_content_type(content_type: &str) -> Option<&'static str> {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match mime.as_str() {
        "image/jpeg" | "image/jpg" => Some(".jpg"),
        "image/png" => Some(".png"),
        "image/gif" => Some(".gif"),
        "image/webp" => Some(".webp"),
        "image/svg+xml" => Some(".svg"),
        _ => None,
    }
}

/// Pick the extension for a mirrored file.
pub fn resolve_extension(
    url: &str,
    content_type: Option<&str>,
    precedence: ExtensionPrecedence,
) -> String {
    let from_type = || content_type.and_then(extension_from_content_type).map(str::to_string);
    let from_url = || extension_from_url(url);

    let resolved = match precedence {
        ExtensionPrecedence::ContentType => from_type().or_else(from_url),
        ExtensionPrecedence::UrlSuffix => from_url().or_else(from_type),
    };

    resolved.unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}
