//! Loader for Tiled `.tmx` maps.
//!
//! Supported subset: orthogonal maps with `<tileset>` elements (embedded or
//! external `.tsx`) backed by a single image, and `<layer>` elements whose
//! `<data>` is CSV or plain `<tile gid>` children. Other layer kinds are
//! skipped.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use roxmltree::{Document, Node};
use thiserror::Error;
use tracing::{debug, warn};

use super::{load_image, AssetError, AssetKind, Image};

/// Tiled stores flip/rotation flags in the top four bits of a gid.
const GID_FLAG_MASK: u32 = 0x0FFF_FFFF;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapError {
    #[error("malformed XML at line {line}, column {column}: {message}")]
    Xml {
        message: String,
        line: u32,
        column: u32,
    },
    #[error("root element must be <{expected}>, found <{found}>")]
    InvalidRoot {
        expected: &'static str,
        found: String,
    },
    #[error("missing attribute '{attribute}' on <{element}>")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },
    #[error("invalid value '{value}' for attribute '{attribute}' on <{element}>")]
    InvalidAttribute {
        element: &'static str,
        attribute: &'static str,
        value: String,
    },
    #[error("missing <{element}> inside <{parent}>")]
    MissingElement {
        element: &'static str,
        parent: &'static str,
    },
    #[error("unsupported layer data encoding '{0}'; expected csv or plain XML")]
    UnsupportedEncoding(String),
    #[error("invalid tile gid '{0}'")]
    InvalidGid(String),
    #[error("layer '{layer}' has {actual} cells, expected {expected}")]
    CellCountMismatch {
        layer: String,
        expected: usize,
        actual: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct TileMapLayer {
    name: String,
    gids: Vec<u32>,
}

#[derive(Debug, Clone)]
pub struct TileMap {
    width: u32,
    height: u32,
    tile_width: u32,
    tile_height: u32,
    layers: Vec<TileMapLayer>,
    tile_images: HashMap<u32, Image>,
}

impl TileMap {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn tile_width(&self) -> u32 {
        self.tile_width
    }

    pub fn tile_height(&self) -> u32 {
        self.tile_height
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Gid of the cell with flip flags removed; `None` for empty cells and
    /// out-of-range coordinates.
    pub fn gid_at(&self, x: u32, y: u32, layer: usize) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let index = y as usize * self.width as usize + x as usize;
        let gid = self.layers.get(layer)?.gids.get(index)? & GID_FLAG_MASK;
        (gid != 0).then_some(gid)
    }

    pub fn tile_image(&self, x: u32, y: u32, layer: usize) -> Option<&Image> {
        self.gid_at(x, y, layer)
            .and_then(|gid| self.tile_images.get(&gid))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct MapDocument {
    width: u32,
    height: u32,
    tile_width: u32,
    tile_height: u32,
    tilesets: Vec<TilesetRef>,
    layers: Vec<TileMapLayer>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TilesetRef {
    Embedded(TilesetDef),
    External { first_gid: u32, source: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct TilesetDef {
    first_gid: u32,
    tile_width: u32,
    tile_height: u32,
    spacing: u32,
    margin: u32,
    columns: Option<u32>,
    tile_count: Option<u32>,
    image_source: String,
}

pub fn load_tile_map(path: &Path) -> Result<TileMap, AssetError> {
    let raw = read_asset_text(path, AssetKind::Map)?;
    let document = parse_map_document(&raw).map_err(|source| map_error(path, source))?;
    let map_dir = parent_dir(path);

    let mut tile_images = HashMap::new();
    for tileset in document.tilesets {
        let (def, def_path) = match tileset {
            TilesetRef::Embedded(def) => (def, path.to_path_buf()),
            TilesetRef::External { first_gid, source } => {
                let tsx_path = map_dir.join(&source);
                let raw = read_asset_text(&tsx_path, AssetKind::Tileset)?;
                let def = parse_tileset_document(&raw, first_gid)
                    .map_err(|source| map_error(&tsx_path, source))?;
                (def, tsx_path)
            }
        };
        let image = load_image(&parent_dir(&def_path).join(&def.image_source))?;
        slice_tileset(&def, &image, &mut tile_images)
            .map_err(|source| map_error(&def_path, source))?;
    }

    debug!(
        path = %path.display(),
        width = document.width,
        height = document.height,
        layers = document.layers.len(),
        tiles = tile_images.len(),
        "tile_map_loaded"
    );

    Ok(TileMap {
        width: document.width,
        height: document.height,
        tile_width: document.tile_width,
        tile_height: document.tile_height,
        layers: document.layers,
        tile_images,
    })
}

fn read_asset_text(path: &Path, kind: AssetKind) -> Result<String, AssetError> {
    if !path.is_file() {
        return Err(AssetError::not_found(kind, path.display().to_string()));
    }
    fs::read_to_string(path).map_err(|source| AssetError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn parent_dir(path: &Path) -> PathBuf {
    path.parent().map(Path::to_path_buf).unwrap_or_default()
}

fn map_error(path: &Path, source: MapError) -> AssetError {
    AssetError::Map {
        path: path.to_path_buf(),
        source,
    }
}

fn parse_xml(raw: &str) -> Result<Document<'_>, MapError> {
    Document::parse(raw).map_err(|error| MapError::Xml {
        message: error.to_string(),
        line: error.pos().row,
        column: error.pos().col,
    })
}

fn parse_map_document(raw: &str) -> Result<MapDocument, MapError> {
    let doc = parse_xml(raw)?;
    let root = doc.root_element();
    if root.tag_name().name() != "map" {
        return Err(MapError::InvalidRoot {
            expected: "map",
            found: root.tag_name().name().to_string(),
        });
    }

    let width = required_u32(root, "map", "width")?;
    let height = required_u32(root, "map", "height")?;
    let tile_width = required_u32(root, "map", "tilewidth")?;
    let tile_height = required_u32(root, "map", "tileheight")?;

    let mut tilesets = Vec::new();
    let mut layers = Vec::new();
    for child in root.children().filter(|node| node.is_element()) {
        match child.tag_name().name() {
            "tileset" => tilesets.push(parse_tileset_ref(child)?),
            "layer" => layers.push(parse_layer(child, width, height)?),
            _ => {}
        }
    }

    Ok(MapDocument {
        width,
        height,
        tile_width,
        tile_height,
        tilesets,
        layers,
    })
}

fn parse_tileset_ref(node: Node<'_, '_>) -> Result<TilesetRef, MapError> {
    let first_gid = required_u32(node, "tileset", "firstgid")?;
    match node.attribute("source") {
        Some(source) => Ok(TilesetRef::External {
            first_gid,
            source: source.to_string(),
        }),
        None => parse_tileset_def(node, first_gid).map(TilesetRef::Embedded),
    }
}

fn parse_tileset_document(raw: &str, first_gid: u32) -> Result<TilesetDef, MapError> {
    let doc = parse_xml(raw)?;
    let root = doc.root_element();
    if root.tag_name().name() != "tileset" {
        return Err(MapError::InvalidRoot {
            expected: "tileset",
            found: root.tag_name().name().to_string(),
        });
    }
    parse_tileset_def(root, first_gid)
}

fn parse_tileset_def(node: Node<'_, '_>, first_gid: u32) -> Result<TilesetDef, MapError> {
    let image = node
        .children()
        .find(|child| child.is_element() && child.tag_name().name() == "image")
        .ok_or(MapError::MissingElement {
            element: "image",
            parent: "tileset",
        })?;
    let image_source = image
        .attribute("source")
        .ok_or(MapError::MissingAttribute {
            element: "image",
            attribute: "source",
        })?
        .to_string();

    Ok(TilesetDef {
        first_gid,
        tile_width: required_u32(node, "tileset", "tilewidth")?,
        tile_height: required_u32(node, "tileset", "tileheight")?,
        spacing: optional_u32(node, "tileset", "spacing")?.unwrap_or(0),
        margin: optional_u32(node, "tileset", "margin")?.unwrap_or(0),
        columns: optional_u32(node, "tileset", "columns")?,
        tile_count: optional_u32(node, "tileset", "tilecount")?,
        image_source,
    })
}

fn parse_layer(node: Node<'_, '_>, width: u32, height: u32) -> Result<TileMapLayer, MapError> {
    let name = node.attribute("name").unwrap_or_default().to_string();
    let data = node
        .children()
        .find(|child| child.is_element() && child.tag_name().name() == "data")
        .ok_or(MapError::MissingElement {
            element: "data",
            parent: "layer",
        })?;
    if let Some(compression) = data.attribute("compression") {
        return Err(MapError::UnsupportedEncoding(compression.to_string()));
    }

    let gids = match data.attribute("encoding") {
        Some("csv") => parse_csv_gids(data.text().unwrap_or_default())?,
        None => data
            .children()
            .filter(|child| child.is_element() && child.tag_name().name() == "tile")
            .map(|tile| optional_u32(tile, "tile", "gid").map(Option::unwrap_or_default))
            .collect::<Result<Vec<_>, _>>()?,
        Some(other) => return Err(MapError::UnsupportedEncoding(other.to_string())),
    };

    let expected = width as usize * height as usize;
    if gids.len() != expected {
        return Err(MapError::CellCountMismatch {
            layer: name,
            expected,
            actual: gids.len(),
        });
    }

    Ok(TileMapLayer { name, gids })
}

fn parse_csv_gids(text: &str) -> Result<Vec<u32>, MapError> {
    text.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            entry
                .parse::<u32>()
                .map_err(|_| MapError::InvalidGid(entry.to_string()))
        })
        .collect()
}

fn required_u32(
    node: Node<'_, '_>,
    element: &'static str,
    attribute: &'static str,
) -> Result<u32, MapError> {
    optional_u32(node, element, attribute)?
        .ok_or(MapError::MissingAttribute { element, attribute })
}

fn optional_u32(
    node: Node<'_, '_>,
    element: &'static str,
    attribute: &'static str,
) -> Result<Option<u32>, MapError> {
    let Some(value) = node.attribute(attribute) else {
        return Ok(None);
    };
    value
        .trim()
        .parse::<u32>()
        .map(Some)
        .map_err(|_| MapError::InvalidAttribute {
            element,
            attribute,
            value: value.to_string(),
        })
}

/// Cuts `image` into tiles keyed by gid. Attribute values whose arithmetic
/// leaves the gid or pixel range are reported as `InvalidAttribute`.
fn slice_tileset(
    def: &TilesetDef,
    image: &Image,
    out: &mut HashMap<u32, Image>,
) -> Result<(), MapError> {
    if def.tile_width == 0 || def.tile_height == 0 {
        warn!(first_gid = def.first_gid, "tileset_has_zero_tile_size");
        return Ok(());
    }
    if def.first_gid == 0 || def.first_gid > GID_FLAG_MASK {
        return Err(invalid_tileset_attribute("firstgid", def.first_gid));
    }
    let stride_x = def
        .tile_width
        .checked_add(def.spacing)
        .ok_or_else(|| invalid_tileset_attribute("spacing", def.spacing))?;
    let stride_y = def
        .tile_height
        .checked_add(def.spacing)
        .ok_or_else(|| invalid_tileset_attribute("spacing", def.spacing))?;
    let margins = def.margin.saturating_mul(2);
    let usable_w = image
        .width()
        .saturating_sub(margins)
        .saturating_add(def.spacing);
    let usable_h = image
        .height()
        .saturating_sub(margins)
        .saturating_add(def.spacing);

    let columns = def
        .columns
        .filter(|columns| *columns > 0)
        .unwrap_or(usable_w / stride_x);
    if columns == 0 {
        warn!(
            first_gid = def.first_gid,
            image_width = image.width(),
            "tileset_image_narrower_than_tile"
        );
        return Ok(());
    }
    let rows = usable_h / stride_y;
    let tile_count = def.tile_count.unwrap_or(columns.saturating_mul(rows));

    for local_id in 0..tile_count {
        let gid = def
            .first_gid
            .checked_add(local_id)
            .filter(|gid| *gid <= GID_FLAG_MASK)
            .ok_or_else(|| invalid_tileset_attribute("firstgid", def.first_gid))?;
        let column = local_id % columns;
        let row = local_id / columns;
        let x = column
            .checked_mul(stride_x)
            .and_then(|offset| offset.checked_add(def.margin));
        let y = row
            .checked_mul(stride_y)
            .and_then(|offset| offset.checked_add(def.margin));
        let tile = x
            .zip(y)
            .and_then(|(x, y)| image.sub_image(x, y, def.tile_width, def.tile_height));
        match tile {
            Some(tile) => {
                out.insert(gid, tile);
            }
            None => {
                warn!(
                    first_gid = def.first_gid,
                    local_id, tile_count, "tileset_tile_outside_image"
                );
                break;
            }
        }
    }
    Ok(())
}

fn invalid_tileset_attribute(attribute: &'static str, value: u32) -> MapError {
    MapError::InvalidAttribute {
        element: "tileset",
        attribute,
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use image::{Rgba, RgbaImage};
    use tempfile::TempDir;

    use super::*;

    const TWO_LAYER_CSV_MAP: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<map version="1.10" orientation="orthogonal" width="2" height="2" tilewidth="2" tileheight="2">
  <tileset firstgid="1" name="wood" tilewidth="2" tileheight="2" tilecount="2" columns="2">
    <image source="wood.png" width="4" height="2"/>
  </tileset>
  <layer id="1" name="outer" width="2" height="2">
    <data encoding="csv">
1,1,
1,1
</data>
  </layer>
  <objectgroup id="3" name="notes"/>
  <layer id="2" name="inner" width="2" height="2">
    <data encoding="csv">
2,0,
0,2147483650
</data>
  </layer>
</map>"#;

    fn write_tileset_png(path: &Path) {
        let mut png = RgbaImage::new(4, 2);
        for y in 0..2 {
            png.put_pixel(0, y, Rgba([200, 0, 0, 255]));
            png.put_pixel(1, y, Rgba([200, 0, 0, 255]));
            png.put_pixel(2, y, Rgba([0, 0, 200, 255]));
            png.put_pixel(3, y, Rgba([0, 0, 200, 255]));
        }
        png.save(path).expect("save tileset");
    }

    #[test]
    fn parses_dimensions_layers_and_tilesets() {
        let doc = parse_map_document(TWO_LAYER_CSV_MAP).expect("parse");
        assert_eq!((doc.width, doc.height), (2, 2));
        assert_eq!((doc.tile_width, doc.tile_height), (2, 2));
        assert_eq!(doc.layers.len(), 2);
        assert_eq!(doc.layers[0].name, "outer");
        assert_eq!(doc.layers[1].gids, vec![2, 0, 0, 2_147_483_650]);
        assert_eq!(
            doc.tilesets,
            vec![TilesetRef::Embedded(TilesetDef {
                first_gid: 1,
                tile_width: 2,
                tile_height: 2,
                spacing: 0,
                margin: 0,
                columns: Some(2),
                tile_count: Some(2),
                image_source: "wood.png".to_string(),
            })]
        );
    }

    #[test]
    fn parses_plain_xml_tile_encoding() {
        let raw = r#"<map width="2" height="1" tilewidth="8" tileheight="8">
            <layer name="only"><data><tile gid="3"/><tile/></data></layer>
        </map>"#;
        let doc = parse_map_document(raw).expect("parse");
        assert_eq!(doc.layers[0].gids, vec![3, 0]);
    }

    #[test]
    fn rejects_base64_encoding() {
        let raw = r#"<map width="1" height="1" tilewidth="8" tileheight="8">
            <layer name="b64"><data encoding="base64">AQAAAA==</data></layer>
        </map>"#;
        assert_eq!(
            parse_map_document(raw).expect_err("unsupported"),
            MapError::UnsupportedEncoding("base64".to_string())
        );
    }

    #[test]
    fn rejects_cell_count_mismatch() {
        let raw = r#"<map width="2" height="2" tilewidth="8" tileheight="8">
            <layer name="short"><data encoding="csv">1,1,1</data></layer>
        </map>"#;
        assert_eq!(
            parse_map_document(raw).expect_err("mismatch"),
            MapError::CellCountMismatch {
                layer: "short".to_string(),
                expected: 4,
                actual: 3,
            }
        );
    }

    #[test]
    fn rejects_wrong_root_and_missing_attributes() {
        assert!(matches!(
            parse_map_document("<tileset/>").expect_err("root"),
            MapError::InvalidRoot { expected: "map", .. }
        ));
        assert_eq!(
            parse_map_document(r#"<map width="1" height="1" tilewidth="8"/>"#)
                .expect_err("attr"),
            MapError::MissingAttribute {
                element: "map",
                attribute: "tileheight",
            }
        );
        assert!(matches!(
            parse_map_document(r#"<map width="x" height="1" tilewidth="8" tileheight="8"/>"#)
                .expect_err("value"),
            MapError::InvalidAttribute {
                attribute: "width",
                ..
            }
        ));
    }

    #[test]
    fn malformed_xml_reports_location() {
        let err = parse_map_document("<map>\n<layer></map>").expect_err("xml");
        let MapError::Xml { line, .. } = err else {
            panic!("expected xml error, got {err:?}");
        };
        assert!(line >= 1);
    }

    #[test]
    fn load_slices_tiles_and_masks_flip_flags() {
        let temp = TempDir::new().expect("temp");
        write_tileset_png(&temp.path().join("wood.png"));
        let map_path = temp.path().join("board.tmx");
        fs::write(&map_path, TWO_LAYER_CSV_MAP).expect("write map");

        let map = load_tile_map(&map_path).expect("load");
        assert_eq!(map.layer_count(), 2);
        assert_eq!((map.width(), map.height()), (2, 2));
        assert_eq!((map.tile_width(), map.tile_height()), (2, 2));

        let outer = map.tile_image(1, 1, 0).expect("outer tile");
        assert_eq!(outer.pixel(0, 0), Some([200, 0, 0, 255]));

        let inner = map.tile_image(0, 0, 1).expect("inner tile");
        assert_eq!(inner.pixel(1, 1), Some([0, 0, 200, 255]));
        assert!(map.tile_image(1, 0, 1).is_none());
        assert_eq!(map.gid_at(1, 1, 1), Some(2));
        assert!(map.tile_image(1, 1, 1).is_some());

        assert!(map.tile_image(5, 0, 0).is_none());
        assert!(map.tile_image(0, 0, 7).is_none());
    }

    #[test]
    fn load_resolves_external_tileset_relative_to_map() {
        let temp = TempDir::new().expect("temp");
        fs::create_dir_all(temp.path().join("sets")).expect("mkdir");
        write_tileset_png(&temp.path().join("sets").join("wood.png"));
        fs::write(
            temp.path().join("sets").join("wood.tsx"),
            r#"<tileset name="wood" tilewidth="2" tileheight="2">
                <image source="wood.png" width="4" height="2"/>
            </tileset>"#,
        )
        .expect("write tsx");
        let map_path = temp.path().join("board.tmx");
        fs::write(
            &map_path,
            r#"<map width="1" height="1" tilewidth="2" tileheight="2">
                <tileset firstgid="5" source="sets/wood.tsx"/>
                <layer name="inner"><data encoding="csv">6</data></layer>
            </map>"#,
        )
        .expect("write map");

        let map = load_tile_map(&map_path).expect("load");
        let tile = map.tile_image(0, 0, 0).expect("tile");
        assert_eq!(tile.pixel(0, 0), Some([0, 0, 200, 255]));
    }

    #[test]
    fn missing_map_file_is_not_found() {
        let temp = TempDir::new().expect("temp");
        let err = load_tile_map(&temp.path().join("wood_board.tmx")).expect_err("missing");
        assert!(matches!(
            err,
            AssetError::NotFound {
                kind: AssetKind::Map,
                ..
            }
        ));
    }

    #[test]
    fn missing_tileset_image_is_not_found() {
        let temp = TempDir::new().expect("temp");
        let map_path = temp.path().join("board.tmx");
        fs::write(&map_path, TWO_LAYER_CSV_MAP).expect("write map");

        let err = load_tile_map(&map_path).expect_err("missing image");
        assert!(matches!(
            err,
            AssetError::NotFound {
                kind: AssetKind::Image,
                ..
            }
        ));
    }

    #[test]
    fn slicing_honours_margin_and_spacing() {
        let mut image = Image::filled(7, 3, [0, 0, 0, 255]);
        image.set_pixel(1, 1, [1, 1, 1, 255]);
        image.set_pixel(4, 1, [2, 2, 2, 255]);
        let def = TilesetDef {
            first_gid: 10,
            tile_width: 2,
            tile_height: 1,
            spacing: 1,
            margin: 1,
            columns: None,
            tile_count: None,
            image_source: String::new(),
        };

        let mut out = HashMap::new();
        slice_tileset(&def, &image, &mut out).expect("slice");
        assert_eq!(out.len(), 2);
        assert_eq!(out[&10].pixel(0, 0), Some([1, 1, 1, 255]));
        assert_eq!(out[&11].pixel(0, 0), Some([2, 2, 2, 255]));
    }

    fn single_tile_map(tileset_attributes: &str) -> String {
        format!(
            r#"<map width="1" height="1" tilewidth="2" tileheight="2">
                <tileset {tileset_attributes} tilewidth="2" tileheight="2">
                    <image source="wood.png" width="4" height="2"/>
                </tileset>
                <layer name="inner"><data encoding="csv">1</data></layer>
            </map>"#
        )
    }

    fn load_with_tileset(tileset_attributes: &str) -> Result<TileMap, AssetError> {
        let temp = TempDir::new().expect("temp");
        write_tileset_png(&temp.path().join("wood.png"));
        let map_path = temp.path().join("board.tmx");
        fs::write(&map_path, single_tile_map(tileset_attributes)).expect("write map");
        load_tile_map(&map_path)
    }

    fn rejected_attribute(err: AssetError) -> &'static str {
        match err {
            AssetError::Map {
                source: MapError::InvalidAttribute {
                    element: "tileset",
                    attribute,
                    ..
                },
                ..
            } => attribute,
            other => panic!("expected invalid tileset attribute, got {other:?}"),
        }
    }

    #[test]
    fn oversized_spacing_is_an_invalid_attribute() {
        let err = load_with_tileset(r#"firstgid="1" spacing="4294967295""#)
            .expect_err("spacing overflow");
        assert_eq!(rejected_attribute(err), "spacing");
    }

    #[test]
    fn firstgid_beyond_gid_range_is_an_invalid_attribute() {
        let err = load_with_tileset(r#"firstgid="4294967295""#).expect_err("firstgid overflow");
        assert_eq!(rejected_attribute(err), "firstgid");

        let err = load_with_tileset(r#"firstgid="268435455""#).expect_err("gid past mask");
        assert_eq!(rejected_attribute(err), "firstgid");
    }

    #[test]
    fn huge_margin_skips_tiles_without_failing() {
        let map = load_with_tileset(r#"firstgid="1" margin="4294967295""#).expect("load");
        assert!(map.tile_image(0, 0, 0).is_none());
    }
}
