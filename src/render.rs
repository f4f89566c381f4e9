use egui::{pos2, Color32, Painter, Pos2, Rect};

use crate::generations::Generations;
use crate::grid::TileGrid;
use crate::viewport::Viewport;

/// Fixed canvas clear color, painted under both generations.
pub const BACKGROUND: Color32 = Color32::from_rgb(0x11, 0x11, 0x11);

/// Composite the current snapshot: background fill, then the previous
/// generation's ready tiles, then the incoming generation's ready tiles on
/// top. Never blocks — tiles without a texture or not yet ready are simply
/// skipped, letting the background or the older generation show through.
pub fn paint(painter: &Painter, canvas: Rect, viewport: &Viewport, gens: &Generations) {
    // Background is filled in screen space, independent of pan/zoom.
    painter.rect_filled(canvas, 0.0, BACKGROUND);

    if let Some(grid) = gens.previous() {
        paint_grid(painter, canvas.min, viewport, grid);
    }
    if let Some(grid) = gens.incoming() {
        paint_grid(painter, canvas.min, viewport, grid);
    }
}

fn paint_grid(painter: &Painter, origin: Pos2, viewport: &Viewport, grid: &TileGrid) {
    // Tile size comes from the first decoded image; defer until known.
    let Some(tile_size) = grid.tile_size else {
        return;
    };
    let uv = Rect::from_min_max(pos2(0.0, 0.0), pos2(1.0, 1.0));

    for tile in &grid.tiles {
        if !tile.ready {
            continue;
        }
        let Some(tex) = &tile.tex else {
            continue;
        };
        let rect = tile_rect(
            viewport,
            origin,
            grid.min_x,
            grid.min_y,
            tile_size,
            tile.x,
            tile.y,
        );
        painter.image(tex.id(), rect, uv, Color32::WHITE);
    }
}

/// Screen rect for the tile at grid coordinate `(x, y)`: positioned at
/// `((x - min_x) * tile_size, (y - min_y) * tile_size)` in grid-local pixels
/// and pushed through the viewport transform.
pub fn tile_rect(
    viewport: &Viewport,
    origin: Pos2,
    min_x: i32,
    min_y: i32,
    tile_size: f32,
    x: i32,
    y: i32,
) -> Rect {
    let gx = (x - min_x) as f32 * tile_size;
    let gy = (y - min_y) as f32 * tile_size;
    Rect::from_min_max(
        viewport.to_screen(origin, pos2(gx, gy)),
        viewport.to_screen(origin, pos2(gx + tile_size, gy + tile_size)),
    )
}

/* ───────────────────────────── tests ────────────────────────────── */

#[cfg(test)]
mod tests {
    use super::*;
    use egui::vec2;

    #[test]
    fn min_corner_tile_lands_at_transformed_origin() {
        let vp = Viewport::default();
        let rect = tile_rect(&vp, pos2(0.0, 0.0), -2, 3, 16.0, -2, 3);
        assert_eq!(rect.min, pos2(0.0, 0.0));
        assert_eq!(rect.size(), vec2(16.0, 16.0));
    }

    #[test]
    fn rects_scale_and_translate_with_the_viewport() {
        let mut vp = Viewport::default();
        vp.scale = 2.0;
        vp.offset = vec2(10.0, -4.0);

        let rect = tile_rect(&vp, pos2(100.0, 50.0), 0, 0, 16.0, 3, 1);
        // grid-local (48, 16) → screen origin + (48, 16) * 2 + offset
        assert_eq!(rect.min, pos2(100.0 + 96.0 + 10.0, 50.0 + 32.0 - 4.0));
        assert_eq!(rect.size(), vec2(32.0, 32.0));
    }

    #[test]
    fn adjacent_tiles_are_seamless() {
        let mut vp = Viewport::default();
        vp.scale = 1.5;
        let origin = pos2(7.0, 7.0);
        let left = tile_rect(&vp, origin, 0, 0, 32.0, 0, 0);
        let right = tile_rect(&vp, origin, 0, 0, 32.0, 1, 0);
        assert_eq!(left.max.x, right.min.x);
    }
}
