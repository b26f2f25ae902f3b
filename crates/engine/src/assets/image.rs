use std::path::Path;

use image::ImageReader;

use super::{AssetError, AssetKind};

/// Decoded RGBA8 bitmap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl Image {
    pub fn filled(width: u32, height: u32, color: [u8; 4]) -> Self {
        let rgba = color
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        Self {
            width,
            height,
            rgba,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn rgba(&self) -> &[u8] {
        &self.rgba
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let offset = self.offset_of(x, y)?;
        let mut pixel = [0u8; 4];
        pixel.copy_from_slice(&self.rgba[offset..offset + 4]);
        Some(pixel)
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, color: [u8; 4]) -> bool {
        let Some(offset) = self.offset_of(x, y) else {
            return false;
        };
        self.rgba[offset..offset + 4].copy_from_slice(&color);
        true
    }

    /// Copies the `width x height` region at (`x`, `y`). `None` if the region
    /// is empty or leaves the image.
    pub fn sub_image(&self, x: u32, y: u32, width: u32, height: u32) -> Option<Image> {
        if width == 0 || height == 0 {
            return None;
        }
        let right = x.checked_add(width)?;
        let bottom = y.checked_add(height)?;
        if right > self.width || bottom > self.height {
            return None;
        }

        let row_len = width as usize * 4;
        let mut rgba = Vec::with_capacity(row_len * height as usize);
        for row in y..bottom {
            let start = (row as usize * self.width as usize + x as usize) * 4;
            rgba.extend_from_slice(&self.rgba[start..start + row_len]);
        }
        Some(Image {
            width,
            height,
            rgba,
        })
    }

    fn offset_of(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some((y as usize * self.width as usize + x as usize) * 4)
    }
}

pub fn load_image(path: &Path) -> Result<Image, AssetError> {
    if !path.is_file() {
        return Err(AssetError::not_found(
            AssetKind::Image,
            path.display().to_string(),
        ));
    }
    let reader = ImageReader::open(path).map_err(|source| AssetError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let decoded = reader.decode().map_err(|source| AssetError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    let image = decoded.to_rgba8();
    Ok(Image {
        width: image.width(),
        height: image.height(),
        rgba: image.into_raw(),
    })
}
