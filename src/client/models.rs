//! Content store records
//!
//! Only the fields the mirror reads or rewrites are typed; everything else
//! is carried through `extra` so re-emitted records keep their shape.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Blog post or essay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    #[serde(default)]
    pub slug: String,

    #[serde(default)]
    pub title: String,

    /// Markdown/HTML body
    #[serde(default)]
    pub content: Option<String>,

    /// Single cover image URL
    #[serde(default)]
    pub cover_image: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Author profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    #[serde(default)]
    pub slug: String,

    #[serde(default)]
    pub name: String,

    /// Markdown/HTML biography
    #[serde(default)]
    pub bio: Option<String>,

    /// Single profile picture URL
    #[serde(default)]
    pub profile_picture: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
