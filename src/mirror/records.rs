//! Mirroring for content store records

use super::ImageMirror;
use crate::client::{Author, ImageSource, Post};

impl<S: ImageSource> ImageMirror<S> {
    /// Mirror a post's cover image and the images in its body
    pub async fn process_post(&self, mut post: Post) -> Post {
        if let Some(cover) = post.cover_image.take() {
            post.cover_image = Some(self.mirror(&cover).await);
        }
        if let Some(content) = post.content.take() {
            post.content = Some(self.rewrite(&content).await);
        }
        post
    }

    /// Mirror an author's profile picture and the images in their bio
    pub async fn process_author(&self, mut author: Author) -> Author {
        if let Some(picture) = author.profile_picture.take() {
            author.profile_picture = Some(self.mirror(&picture).await);
        }
        if let Some(bio) = author.bio.take() {
            author.bio = Some(self.rewrite(&bio).await);
        }
        author
    }
}
