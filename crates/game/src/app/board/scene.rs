use engine::{
    load_tile_map, AssetError, Canvas, Image, InputSampler, LoadContext, Rect, Scene,
    SceneCommand, TileMap, Vec2,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use super::controller::{Board, BoardEvent};
use super::model::{PieceId, TileId};

const INNER_LAYER: usize = 1;

const PIECE_IMAGE: &str = "piece_black";
const CROWNED_PIECE_IMAGE: &str = "piece_black_king";

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BoardConfig {
    pub(crate) map_file: String,
    pub(crate) piece_image_file: String,
    pub(crate) crowned_piece_image_file: String,
    pub(crate) origin: Vec2,
    pub(crate) tile_size: (u32, u32),
    pub(crate) piece_count: usize,
    pub(crate) seed: Option<u64>,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            map_file: "wood_board.tmx".to_string(),
            piece_image_file: "checker_piece_black.png".to_string(),
            crowned_piece_image_file: "checker_piece_black_king.png".to_string(),
            origin: Vec2::new(800.0 / 1.5, 300.0),
            tile_size: (32, 32),
            piece_count: 12,
            seed: None,
        }
    }
}

pub(crate) struct BoardScene {
    config: BoardConfig,
    board: Board,
    tile_images: Vec<Image>,
    piece_images: Vec<Image>,
}

impl BoardScene {
    pub(crate) fn new(config: BoardConfig) -> Self {
        Self {
            config,
            board: Board::new(INNER_LAYER),
            tile_images: Vec::new(),
            piece_images: Vec::new(),
        }
    }

    #[cfg(test)]
    pub(crate) fn board(&self) -> &Board {
        &self.board
    }

    fn log_event(&self, event: BoardEvent) {
        match event {
            BoardEvent::PieceSelected { piece, tile } => info!(
                piece = self.piece_index(piece),
                tile = self.tile_index(tile),
                "piece_selected"
            ),
            BoardEvent::SelectionSwitched { from, to } => info!(
                from_piece = self.piece_index(from),
                to_piece = self.piece_index(to),
                "selection_switched"
            ),
            BoardEvent::PieceMoved { piece, from, to } => info!(
                piece = self.piece_index(piece),
                from_tile = self.tile_index(from),
                to_tile = self.tile_index(to),
                "piece_moved"
            ),
        }
    }

    fn piece_index(&self, id: PieceId) -> u32 {
        self.board.piece(id).map_or(0, |piece| piece.index())
    }

    fn tile_index(&self, id: TileId) -> u32 {
        self.board.tile(id).map_or(0, |tile| tile.index())
    }
}

impl Scene for BoardScene {
    fn load(&mut self, ctx: &mut LoadContext<'_>) -> Result<(), AssetError> {
        let map = load_tile_map(&ctx.paths.asset(&self.config.map_file))?;
        if (map.tile_width(), map.tile_height()) != self.config.tile_size {
            debug!(
                map_tile_width = map.tile_width(),
                map_tile_height = map.tile_height(),
                tile_width = self.config.tile_size.0,
                tile_height = self.config.tile_size.1,
                "map_tile_size_overridden"
            );
        }

        ctx.resources.load_image(
            PIECE_IMAGE,
            &ctx.paths.asset(&self.config.piece_image_file),
        )?;
        ctx.resources.load_image(
            CROWNED_PIECE_IMAGE,
            &ctx.paths.asset(&self.config.crowned_piece_image_file),
        )?;

        let (mut board, tile_images) =
            build_board(&map, self.config.tile_size, self.config.origin);
        if board.layer_tiles(INNER_LAYER).is_empty() {
            warn!(
                layers = map.layer_count(),
                "board_has_no_interactive_tiles"
            );
        }

        let piece_template = ctx.resources.get_image(PIECE_IMAGE)?;
        let piece_size = (piece_template.width(), piece_template.height());
        let placed = match self.config.seed {
            Some(seed) => board.place_pieces_randomly(
                self.config.piece_count,
                piece_size,
                &mut StdRng::seed_from_u64(seed),
            ),
            None => {
                board.place_pieces_randomly(self.config.piece_count, piece_size, &mut rand::rng())
            }
        };

        let mut piece_images = Vec::with_capacity(placed.len());
        for _ in &placed {
            piece_images.push(ctx.resources.get_image(PIECE_IMAGE)?);
        }

        info!(
            map = %self.config.map_file,
            tiles = board.tile_count(),
            layers = board.layer_count(),
            pieces = placed.len(),
            seed = ?self.config.seed,
            "board_loaded"
        );

        self.board = board;
        self.tile_images = tile_images;
        self.piece_images = piece_images;
        Ok(())
    }

    fn update(&mut self, input: &InputSampler) -> SceneCommand {
        if let Some(event) = self.board.tick(input) {
            self.log_event(event);
        }
        SceneCommand::None
    }

    fn render(&self, canvas: &mut Canvas<'_>) {
        for layer in 0..self.board.layer_count() {
            for id in self.board.layer_tiles(layer) {
                let (Some(tile), Some(image)) = (self.board.tile(*id), self.tile_images.get(id.0))
                else {
                    continue;
                };
                let (x, y) = tile.position();
                canvas.blit(image, x, y, tile.alpha());
            }
        }
        for (id, piece) in self.board.pieces() {
            let Some(image) = self.piece_images.get(id.0) else {
                continue;
            };
            let (x, y) = piece.position();
            canvas.blit(image, x, y, piece.alpha());
        }
    }

    fn unload(&mut self) {
        debug!(
            tiles = self.board.tile_count(),
            pieces = self.board.piece_count(),
            "board_unloaded"
        );
    }
}

/// Creates one `tile_size` tile per non-empty map cell, walking columns then
/// rows then layers, and returns each tile's image indexed by its `TileId`.
fn build_board(map: &TileMap, tile_size: (u32, u32), origin: Vec2) -> (Board, Vec<Image>) {
    let mut board = Board::new(INNER_LAYER);
    let mut images = Vec::new();
    for x in 0..map.width() {
        for y in 0..map.height() {
            for layer in 0..map.layer_count() {
                let Some(image) = map.tile_image(x, y, layer) else {
                    continue;
                };
                let rect = Rect::new(
                    cell_origin(x, tile_size.0),
                    cell_origin(y, tile_size.1),
                    tile_size.0,
                    tile_size.1,
                );
                board.add_tile(layer, rect);
                images.push(image.clone());
            }
        }
    }

    let (dx, dy) = layout_offset(board.tile_count(), tile_size, origin);
    board.offset_tiles(dx, dy);
    (board, images)
}

/// Pixel coordinate of a cell edge, saturating at `i32::MAX`.
fn cell_origin(cell: u32, tile_extent: u32) -> i32 {
    i32::try_from(u64::from(cell) * u64::from(tile_extent)).unwrap_or(i32::MAX)
}

/// Shift applied to every tile: `origin - (tile_count + tile_size)` per axis.
fn layout_offset(tile_count: usize, tile_size: (u32, u32), origin: Vec2) -> (i32, i32) {
    let count = tile_count as f32;
    (
        (origin.x - (count + tile_size.0 as f32)) as i32,
        (origin.y - (count + tile_size.1 as f32)) as i32,
    )
}
