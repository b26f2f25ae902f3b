mod cache;
mod error;
mod image;
mod tmx;

pub use self::image::{load_image, Image};
pub use cache::ResourceCache;
pub use error::{AssetError, AssetKind};
pub use tmx::{load_tile_map, MapError, TileMap};
