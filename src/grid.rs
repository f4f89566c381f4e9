use egui::TextureHandle;

use crate::load::TileError;

/* ───────────────────────── tile / grid types ────────────────────── */

/// One square image at integer grid coordinates within a generation.
///
/// `tex` is the opaque pixel source, absent until the decoded image has been
/// uploaded (and possibly forever, if the decode fails). `ready` flips to
/// true exactly once and never reverts.
pub struct Tile {
    pub x: i32,
    pub y: i32,
    pub tex: Option<TextureHandle>,
    pub ready: bool,
}

/// One full tile set for a single folder selection: a load generation.
///
/// Built in one shot from the manifest's filename list: bounds come from the
/// parsed coordinates alone, before any image loads. After that the grid is
/// immutable except for tile readiness, textures, and the tile size observed
/// from the first decoded image.
pub struct TileGrid {
    pub generation: u64,
    pub folder: String,
    pub tiles: Vec<Tile>,
    /// Uniform tile edge in grid-local pixels; unknown until the first image
    /// of this generation decodes. The grid is not drawn before then.
    pub tile_size: Option<f32>,
    pub min_x: i32,
    pub max_x: i32,
    pub min_y: i32,
    pub max_y: i32,
    ready_count: usize,
}

impl TileGrid {
    /// Parse a filename list into a grid. Bounds are computed here,
    /// independent of load completion and of iteration order.
    pub fn build(folder: &str, generation: u64, filenames: &[String]) -> Result<Self, TileError> {
        if filenames.is_empty() {
            return Err(TileError::EmptyTileSet(folder.to_owned()));
        }

        let mut tiles = Vec::with_capacity(filenames.len());
        let (mut min_x, mut max_x) = (i32::MAX, i32::MIN);
        let (mut min_y, mut max_y) = (i32::MAX, i32::MIN);

        for name in filenames {
            let (x, y) = parse_coords(name)?;
            min_x = min_x.min(x);
            max_x = max_x.max(x);
            min_y = min_y.min(y);
            max_y = max_y.max(y);
            tiles.push(Tile {
                x,
                y,
                tex: None,
                ready: false,
            });
        }

        Ok(Self {
            generation,
            folder: folder.to_owned(),
            tiles,
            tile_size: None,
            min_x,
            max_x,
            min_y,
            max_y,
            ready_count: 0,
        })
    }

    /// Grid extent in whole tiles.
    pub fn cols(&self) -> i32 {
        self.max_x - self.min_x + 1
    }

    pub fn rows(&self) -> i32 {
        self.max_y - self.min_y + 1
    }

    /// Record the decoded width of a tile image. First writer wins — tiles
    /// within a generation are uniform, so later observations carry nothing.
    pub fn observe_tile_size(&mut self, width: f32) {
        if self.tile_size.is_none() && width > 0.0 {
            self.tile_size = Some(width);
        }
    }

    pub fn set_texture(&mut self, index: usize, tex: TextureHandle) {
        if let Some(tile) = self.tiles.get_mut(index) {
            tile.tex = Some(tex);
        }
    }

    /// Flip a tile to ready. Idempotent: the counter moves only on the
    /// not-ready → ready transition. Returns true if the tile newly became
    /// ready.
    pub fn mark_ready(&mut self, index: usize) -> bool {
        match self.tiles.get_mut(index) {
            Some(tile) if !tile.ready => {
                tile.ready = true;
                self.ready_count += 1;
                true
            }
            _ => false,
        }
    }

    pub fn ready_count(&self) -> usize {
        self.ready_count
    }

    /// More than half the tiles are ready, the threshold at which the
    /// generation behind this one stops being worth keeping.
    pub fn promotable(&self) -> bool {
        2 * self.ready_count > self.tiles.len()
    }
}

/// Filenames encode grid coordinates as `<x>_<y>` plus an image suffix,
/// e.g. `"-2_7.png"`.
fn parse_coords(name: &str) -> Result<(i32, i32), TileError> {
    let stem = name.split('.').next().unwrap_or(name);
    let malformed = || TileError::MalformedTileName(name.to_owned());

    let (x, y) = stem.split_once('_').ok_or_else(malformed)?;
    let x = x.parse::<i32>().map_err(|_| malformed())?;
    let y = y.parse::<i32>().map_err(|_| malformed())?;
    Ok((x, y))
}

/* ───────────────────────────── tests ────────────────────────────── */
