use engine::{InputSampler, MouseButton, Rect, Vec2};
use rand::seq::SliceRandom;
use rand::Rng;

use super::model::{Piece, PieceId, Tile, TileId};

/// Outcome of a tick that changed the selection or moved a piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BoardEvent {
    PieceSelected {
        piece: PieceId,
        tile: TileId,
    },
    SelectionSwitched {
        from: PieceId,
        to: PieceId,
    },
    PieceMoved {
        piece: PieceId,
        from: TileId,
        to: TileId,
    },
}

/// Owns every tile and piece and runs the per-tick selection state machine.
/// Only tiles on `interactive_layer` can be highlighted or receive pieces.
#[derive(Debug)]
pub(crate) struct Board {
    tiles: Vec<Tile>,
    layers: Vec<Vec<TileId>>,
    pieces: Vec<Piece>,
    interactive_layer: usize,
    highlighted_tile: Option<TileId>,
    selected_piece: Option<PieceId>,
}

impl Board {
    pub(crate) fn new(interactive_layer: usize) -> Self {
        Self {
            tiles: Vec::new(),
            layers: Vec::new(),
            pieces: Vec::new(),
            interactive_layer,
            highlighted_tile: None,
            selected_piece: None,
        }
    }

    pub(crate) fn add_tile(&mut self, layer: usize, rect: Rect) -> TileId {
        if self.layers.len() <= layer {
            self.layers.resize_with(layer + 1, Vec::new);
        }
        let id = TileId(self.tiles.len());
        let index = self.layers[layer].len() as u32 + 1;
        self.tiles.push(Tile::new(index, layer, rect));
        self.layers[layer].push(id);
        id
    }

    /// Puts a new piece on `tile`. Returns `None` when the tile is unknown,
    /// not interactive, or already occupied.
    pub(crate) fn place_piece(&mut self, tile: TileId, size: (u32, u32)) -> Option<PieceId> {
        let target = self.tiles.get(tile.0)?;
        if target.layer() != self.interactive_layer || target.occupant().is_some() {
            return None;
        }
        let (x, y) = target.position();
        let id = PieceId(self.pieces.len());
        let index = self.pieces.len() as u32 + 1;
        self.pieces
            .push(Piece::new(index, tile, Rect::new(x, y, size.0, size.1)));
        self.tiles[tile.0].set_occupant(Some(id));
        Some(id)
    }

    /// Places up to `count` pieces on distinct, randomly chosen free
    /// interactive tiles.
    pub(crate) fn place_pieces_randomly<R: Rng + ?Sized>(
        &mut self,
        count: usize,
        size: (u32, u32),
        rng: &mut R,
    ) -> Vec<PieceId> {
        let mut free: Vec<TileId> = self
            .layer_tiles(self.interactive_layer)
            .iter()
            .copied()
            .filter(|id| self.tiles[id.0].occupant().is_none())
            .collect();
        free.shuffle(rng);
        free.into_iter()
            .take(count)
            .filter_map(|tile| self.place_piece(tile, size))
            .collect()
    }

    pub(crate) fn offset_tiles(&mut self, dx: i32, dy: i32) {
        for tile in &mut self.tiles {
            let (x, y) = tile.position();
            tile.set_position(x.saturating_add(dx), y.saturating_add(dy));
        }
        for piece in &mut self.pieces {
            let (x, y) = self.tiles[piece.home_tile().0].position();
            piece.set_position(x, y);
        }
    }

    pub(crate) fn tile(&self, id: TileId) -> Option<&Tile> {
        self.tiles.get(id.0)
    }

    pub(crate) fn piece(&self, id: PieceId) -> Option<&Piece> {
        self.pieces.get(id.0)
    }

    pub(crate) fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    pub(crate) fn piece_count(&self) -> usize {
        self.pieces.len()
    }

    pub(crate) fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub(crate) fn layer_tiles(&self, layer: usize) -> &[TileId] {
        self.layers.get(layer).map(Vec::as_slice).unwrap_or(&[])
    }

    pub(crate) fn pieces(&self) -> impl Iterator<Item = (PieceId, &Piece)> {
        self.pieces
            .iter()
            .enumerate()
            .map(|(index, piece)| (PieceId(index), piece))
    }

    #[cfg(test)]
    pub(crate) fn highlighted_tile(&self) -> Option<TileId> {
        self.highlighted_tile
    }

    #[cfg(test)]
    pub(crate) fn selected_piece(&self) -> Option<PieceId> {
        self.selected_piece
    }

    pub(crate) fn tick(&mut self, input: &InputSampler) -> Option<BoardEvent> {
        self.refresh_highlight(input.position());
        let event = if input.pressed_edge(MouseButton::Left) {
            self.resolve_click()
        } else {
            None
        };
        for piece in &mut self.pieces {
            piece.tick_blink();
        }
        event
    }

    fn refresh_highlight(&mut self, pointer: Vec2) {
        let hovered = self
            .layer_tiles(self.interactive_layer)
            .iter()
            .copied()
            .rev()
            .find(|id| self.tiles[id.0].contains(pointer));
        if hovered == self.highlighted_tile {
            return;
        }
        if let Some(previous) = self.highlighted_tile.take() {
            self.tiles[previous.0].set_selected(false);
        }
        if let Some(tile) = hovered {
            self.tiles[tile.0].set_selected(true);
        }
        self.highlighted_tile = hovered;
    }

    fn resolve_click(&mut self) -> Option<BoardEvent> {
        let tile = self.highlighted_tile?;
        match (self.selected_piece, self.tiles[tile.0].occupant()) {
            (Some(current), Some(target)) => {
                self.select_piece(target);
                Some(BoardEvent::SelectionSwitched {
                    from: current,
                    to: target,
                })
            }
            (None, Some(target)) => {
                self.select_piece(target);
                Some(BoardEvent::PieceSelected {
                    piece: target,
                    tile,
                })
            }
            (Some(current), None) => {
                let from = self.move_piece(current, tile);
                Some(BoardEvent::PieceMoved {
                    piece: current,
                    from,
                    to: tile,
                })
            }
            (None, None) => None,
        }
    }

    fn select_piece(&mut self, piece: PieceId) {
        self.clear_selection();
        self.pieces[piece.0].select();
        self.selected_piece = Some(piece);
    }

    fn clear_selection(&mut self) {
        if let Some(previous) = self.selected_piece.take() {
            self.pieces[previous.0].deselect();
        }
    }

    /// Relocates `piece` onto the empty tile `to` and clears the selection.
    /// Returns the tile it left.
    fn move_piece(&mut self, piece: PieceId, to: TileId) -> TileId {
        let from = self.pieces[piece.0].home_tile();
        let (x, y) = self.tiles[to.0].position();

        self.tiles[from.0].set_occupant(None);
        self.tiles[to.0].set_occupant(Some(piece));
        let moved = &mut self.pieces[piece.0];
        moved.set_home_tile(to);
        moved.set_position(x, y);
        self.clear_selection();

        debug_assert!(self.links_consistent());
        from
    }

    /// Every occupant points back at its tile and every piece sits on a tile
    /// that names it.
    pub(crate) fn links_consistent(&self) -> bool {
        let occupants_agree = self.tiles.iter().enumerate().all(|(index, tile)| {
            tile.occupant().map_or(true, |piece| {
                self.pieces
                    .get(piece.0)
                    .is_some_and(|piece| piece.home_tile() == TileId(index))
            })
        });
        let homes_agree = self.pieces.iter().enumerate().all(|(index, piece)| {
            self.tiles
                .get(piece.home_tile().0)
                .is_some_and(|tile| tile.occupant() == Some(PieceId(index)))
        });
        occupants_agree && homes_agree
    }
}
