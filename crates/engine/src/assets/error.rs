use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::resource_keys::ResourceKeyError;

use super::tmx::MapError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Image,
    Map,
    Tileset,
    CachedImage,
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AssetKind::Image => "image file",
            AssetKind::Map => "map file",
            AssetKind::Tileset => "tileset file",
            AssetKind::CachedImage => "cached image",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to find {kind}: {name}")]
    NotFound { kind: AssetKind, name: String },
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode image {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: ::image::ImageError,
    },
    #[error("invalid resource name '{name}': {source}")]
    InvalidName {
        name: String,
        #[source]
        source: ResourceKeyError,
    },
    #[error("malformed map data in {path}: {source}")]
    Map {
        path: PathBuf,
        #[source]
        source: MapError,
    },
}

impl AssetError {
    pub(crate) fn not_found(kind: AssetKind, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_kind_and_asset() {
        let err = AssetError::not_found(AssetKind::CachedImage, "piece_red");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "failed to find cached image: piece_red");
    }
}
