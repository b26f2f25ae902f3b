use std::collections::HashMap;
use std::path::Path;

use tracing::debug;

use crate::resource_keys::validate_resource_key;

use super::{load_image, AssetError, AssetKind, Image};

/// Name-indexed store of decoded images.
///
/// Lookups hand out owned copies so callers can tint or edit their image
/// without affecting the cached original or each other.
#[derive(Debug, Default)]
pub struct ResourceCache {
    images: HashMap<String, Image>,
}

impl ResourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_image(&mut self, name: &str, image: Image) -> Result<(), AssetError> {
        validate_resource_key(name).map_err(|source| AssetError::InvalidName {
            name: name.to_string(),
            source,
        })?;
        self.images.insert(name.to_string(), image);
        Ok(())
    }

    /// Decodes `path` and registers it under `name`. A missing file is a
    /// `NotFound` error.
    pub fn load_image(&mut self, name: &str, path: &Path) -> Result<(), AssetError> {
        let image = load_image(path)?;
        debug!(
            name,
            path = %path.display(),
            width = image.width(),
            height = image.height(),
            "resource_image_loaded"
        );
        self.insert_image(name, image)
    }

    pub fn get_image(&self, name: &str) -> Result<Image, AssetError> {
        self.images
            .get(name)
            .cloned()
            .ok_or_else(|| AssetError::not_found(AssetKind::CachedImage, name))
    }

    pub fn contains_image(&self, name: &str) -> bool {
        self.images.contains_key(name)
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }
}

#[cfg(test)]
mod tests {
    use image::RgbaImage;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn unknown_name_is_not_found() {
        let cache = ResourceCache::new();
        let err = cache.get_image("piece_black").expect_err("unknown");
        assert!(matches!(
            err,
            AssetError::NotFound {
                kind: AssetKind::CachedImage,
                ..
            }
        ));
    }

    #[test]
    fn repeated_lookups_return_independent_copies() {
        let mut cache = ResourceCache::new();
        cache
            .insert_image("piece_black", Image::filled(2, 2, [0, 0, 0, 255]))
            .expect("insert");

        let mut first = cache.get_image("piece_black").expect("first");
        let second = cache.get_image("piece_black").expect("second");
        assert!(first.set_pixel(0, 0, [255, 0, 0, 255]));

        assert_eq!(first.pixel(0, 0), Some([255, 0, 0, 255]));
        assert_eq!(second.pixel(0, 0), Some([0, 0, 0, 255]));
        assert_eq!(
            cache.get_image("piece_black").expect("third").pixel(0, 0),
            Some([0, 0, 0, 255])
        );
    }

    #[test]
    fn insert_rejects_invalid_names() {
        let mut cache = ResourceCache::new();
        let err = cache
            .insert_image("Piece Black", Image::filled(1, 1, [0; 4]))
            .expect_err("invalid");
        assert!(matches!(err, AssetError::InvalidName { .. }));
        assert_eq!(cache.image_count(), 0);
    }

    #[test]
    fn load_image_registers_decoded_file() {
        let temp = TempDir::new().expect("temp");
        let path = temp.path().join("piece.png");
        RgbaImage::new(4, 4).save(&path).expect("save");

        let mut cache = ResourceCache::new();
        cache.load_image("piece_black", &path).expect("load");
        assert!(cache.contains_image("piece_black"));
        assert_eq!(cache.get_image("piece_black").expect("get").width(), 4);
    }

    #[test]
    fn load_image_missing_file_is_not_found() {
        let temp = TempDir::new().expect("temp");
        let mut cache = ResourceCache::new();
        let err = cache
            .load_image("piece_black", &temp.path().join("checker_piece_black.png"))
            .expect_err("missing");
        assert!(err.is_not_found());
        assert!(!cache.contains_image("piece_black"));
    }
}
