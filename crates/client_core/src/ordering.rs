use shared::domain::{FeaturedMedia, MediaItem};

/// Anything the gallery can put on screen: project media or a featured reel entry.
pub trait GalleryItem: Clone {
    fn media(&self) -> &MediaItem;
}

impl GalleryItem for MediaItem {
    fn media(&self) -> &MediaItem {
        self
    }
}

impl GalleryItem for FeaturedMedia {
    fn media(&self) -> &MediaItem {
        &self.media
    }
}

/// Display order: every video ahead of every image, ties kept in input order.
pub fn order_for_display<T: GalleryItem>(items: &[T]) -> Vec<T> {
    let mut ordered = items.to_vec();
    // `sort_by_key` is stable; `false` (video) sorts before `true` (image).
    ordered.sort_by_key(|item| !item.media().is_video());
    ordered
}

#[cfg(test)]
#[path = "tests/ordering_tests.rs"]
mod tests;
