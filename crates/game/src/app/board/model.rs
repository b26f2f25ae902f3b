use engine::{Rect, Vec2, ALPHA_OPAQUE};

const ALPHA_DIMMED: u8 = 127;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct TileId(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct PieceId(pub(crate) usize);

/// One map cell on one layer. `index` is 1-based within its layer.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Tile {
    index: u32,
    layer: usize,
    rect: Rect,
    selected: bool,
    occupant: Option<PieceId>,
}

impl Tile {
    pub(crate) fn new(index: u32, layer: usize, rect: Rect) -> Self {
        Self {
            index,
            layer,
            rect,
            selected: false,
            occupant: None,
        }
    }

    pub(crate) fn index(&self) -> u32 {
        self.index
    }

    pub(crate) fn layer(&self) -> usize {
        self.layer
    }

    pub(crate) fn position(&self) -> (i32, i32) {
        (self.rect.x, self.rect.y)
    }

    pub(crate) fn set_position(&mut self, x: i32, y: i32) {
        self.rect = self.rect.moved_to(x, y);
    }

    pub(crate) fn contains(&self, point: Vec2) -> bool {
        self.rect.contains_point(point)
    }

    #[cfg(test)]
    pub(crate) fn is_selected(&self) -> bool {
        self.selected
    }

    pub(crate) fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }

    pub(crate) fn occupant(&self) -> Option<PieceId> {
        self.occupant
    }

    pub(crate) fn set_occupant(&mut self, occupant: Option<PieceId>) {
        self.occupant = occupant;
    }

    pub(crate) fn alpha(&self) -> u8 {
        if self.selected {
            ALPHA_DIMMED
        } else {
            ALPHA_OPAQUE
        }
    }
}

/// A token resting on exactly one tile.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Piece {
    index: u32,
    rect: Rect,
    home: TileId,
    selected: bool,
    blinking: bool,
}

impl Piece {
    pub(crate) fn new(index: u32, home: TileId, rect: Rect) -> Self {
        Self {
            index,
            rect,
            home,
            selected: false,
            blinking: false,
        }
    }

    pub(crate) fn index(&self) -> u32 {
        self.index
    }

    pub(crate) fn position(&self) -> (i32, i32) {
        (self.rect.x, self.rect.y)
    }

    pub(crate) fn set_position(&mut self, x: i32, y: i32) {
        self.rect = self.rect.moved_to(x, y);
    }

    pub(crate) fn home_tile(&self) -> TileId {
        self.home
    }

    pub(crate) fn set_home_tile(&mut self, home: TileId) {
        self.home = home;
    }

    #[cfg(test)]
    pub(crate) fn is_selected(&self) -> bool {
        self.selected
    }

    #[cfg(test)]
    pub(crate) fn is_blinking(&self) -> bool {
        self.blinking
    }

    pub(crate) fn select(&mut self) {
        self.selected = true;
        self.blinking = false;
    }

    pub(crate) fn deselect(&mut self) {
        self.selected = false;
        self.blinking = false;
    }

    /// Advances the blink animation by one tick. Unselected pieces stay solid.
    pub(crate) fn tick_blink(&mut self) {
        self.blinking = self.selected && !self.blinking;
    }

    pub(crate) fn alpha(&self) -> u8 {
        if self.blinking {
            ALPHA_DIMMED
        } else {
            ALPHA_OPAQUE
        }
    }
}
