use crate::grid::TileGrid;

/* ───────────────────────── generation manager ───────────────────── */

/// Holds at most two tile-set generations: `incoming` (still loading) and
/// `previous` (kept on screen behind it until the incoming set is populated
/// enough). The previous generation is dropped once more than half of the
/// incoming tiles are ready, or immediately demoted when yet another switch
/// begins.
///
/// Known hazard of the count-based threshold: tile completion order is
/// unconstrained, so `previous` can be dropped while visible gaps remain in
/// `incoming` (all ready tiles clustered in one region), flashing background
/// where neither generation has a tile. Accepted tradeoff; the threshold
/// constant is part of the observable behavior.
#[derive(Default)]
pub struct Generations {
    incoming: Option<TileGrid>,
    previous: Option<TileGrid>,
}

impl Generations {
    /// Install a freshly built grid as the incoming generation. Whatever was
    /// incoming becomes previous; at most one generation of history is kept.
    pub fn begin(&mut self, grid: TileGrid) {
        self.previous = self.incoming.take();
        self.incoming = Some(grid);
    }

    pub fn incoming(&self) -> Option<&TileGrid> {
        self.incoming.as_ref()
    }

    pub fn previous(&self) -> Option<&TileGrid> {
        self.previous.as_ref()
    }

    /// Look up a held generation by its token. Completions for generations
    /// no longer held resolve to None and are dropped by the caller.
    pub fn grid_mut(&mut self, generation: u64) -> Option<&mut TileGrid> {
        match &mut self.incoming {
            Some(grid) if grid.generation == generation => return Some(grid),
            _ => {}
        }
        match &mut self.previous {
            Some(grid) if grid.generation == generation => Some(grid),
            _ => None,
        }
    }

    /// A decode completion for tile `index` of `generation`. Routes by
    /// token: readiness in `incoming` may clear `previous` once the ready
    /// count passes half; readiness in `previous` keeps rendering until it is
    /// dropped; anything else is a stale completion and is ignored.
    ///
    /// Returns true if visible state changed and a repaint is warranted.
    pub fn tile_ready(&mut self, generation: u64, index: usize) -> bool {
        if let Some(grid) = &mut self.incoming {
            if grid.generation == generation {
                let newly = grid.mark_ready(index);
                if newly && self.previous.is_some() && grid.promotable() {
                    self.previous = None;
                }
                return newly;
            }
        }
        if let Some(grid) = &mut self.previous {
            if grid.generation == generation {
                return grid.mark_ready(index);
            }
        }
        false
    }

    /// Total ready / total tiles across both held generations (status line).
    pub fn ready_totals(&self) -> (usize, usize) {
        let mut ready = 0;
        let mut total = 0;
        for grid in [self.incoming.as_ref(), self.previous.as_ref()]
            .into_iter()
            .flatten()
        {
            ready += grid.ready_count();
            total += grid.tiles.len();
        }
        (ready, total)
    }

    /// Drop both generations (new session).
    pub fn clear(&mut self) {
        self.incoming = None;
        self.previous = None;
    }
}

/* ───────────────────────────── tests ────────────────────────────── */

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_of(generation: u64, n: usize) -> TileGrid {
        let names: Vec<String> = (0..n).map(|i| format!("{i}_0.png")).collect();
        TileGrid::build("f", generation, &names).unwrap()
    }

    #[test]
    fn begin_demotes_incoming_and_drops_old_previous() {
        let mut gens = Generations::default();
        gens.begin(grid_of(1, 2));
        assert_eq!(gens.incoming().unwrap().generation, 1);
        assert!(gens.previous().is_none());

        gens.begin(grid_of(2, 2));
        assert_eq!(gens.incoming().unwrap().generation, 2);
        assert_eq!(gens.previous().unwrap().generation, 1);

        // A third switch keeps only one generation of history.
        gens.begin(grid_of(3, 2));
        assert_eq!(gens.incoming().unwrap().generation, 3);
        assert_eq!(gens.previous().unwrap().generation, 2);
        assert!(gens.grid_mut(1).is_none());
    }

    #[test]
    fn previous_clears_exactly_past_half() {
        // 4 tiles: the third distinct ready tile (⌊4/2⌋ + 1) clears previous,
        // regardless of which tiles those are.
        let mut gens = Generations::default();
        gens.begin(grid_of(1, 1));
        gens.begin(grid_of(2, 4));

        assert!(gens.tile_ready(2, 3));
        assert!(gens.previous().is_some());
        assert!(gens.tile_ready(2, 1));
        assert!(gens.previous().is_some());
        assert!(gens.tile_ready(2, 0));
        assert!(gens.previous().is_none());
    }

    #[test]
    fn duplicate_readiness_does_not_advance_promotion() {
        let mut gens = Generations::default();
        gens.begin(grid_of(1, 1));
        gens.begin(grid_of(2, 2));

        assert!(gens.tile_ready(2, 0));
        assert!(!gens.tile_ready(2, 0));
        assert!(gens.previous().is_some());

        assert!(gens.tile_ready(2, 1));
        assert!(gens.previous().is_none());
    }

    #[test]
    fn previous_still_accumulates_readiness_until_dropped() {
        let mut gens = Generations::default();
        gens.begin(grid_of(1, 3));
        gens.begin(grid_of(2, 3));

        // In-flight loads of the demoted generation keep landing and render.
        assert!(gens.tile_ready(1, 0));
        assert_eq!(gens.previous().unwrap().ready_count(), 1);

        // Readiness in previous never clears anything.
        assert!(gens.tile_ready(1, 1));
        assert!(gens.tile_ready(1, 2));
        assert!(gens.previous().is_some());
    }

    #[test]
    fn stale_generations_are_ignored() {
        let mut gens = Generations::default();
        gens.begin(grid_of(1, 2));
        gens.begin(grid_of(2, 2));
        gens.begin(grid_of(3, 2));

        // Generation 1 was dropped entirely; its completions are no-ops.
        assert!(!gens.tile_ready(1, 0));
        assert_eq!(gens.incoming().unwrap().ready_count(), 0);
        assert_eq!(gens.previous().unwrap().ready_count(), 0);
    }

    #[test]
    fn cleared_previous_is_never_touched_again() {
        let mut gens = Generations::default();
        gens.begin(grid_of(1, 2));
        gens.begin(grid_of(2, 1));

        assert!(gens.tile_ready(2, 0));
        assert!(gens.previous().is_none());

        // Late completion for the discarded generation: dropped harmlessly.
        assert!(!gens.tile_ready(1, 1));
        assert!(gens.previous().is_none());
        assert!(gens.grid_mut(1).is_none());
    }

    #[test]
    fn scenario_two_tile_switch() {
        // Manifest {"a": ["0_0","1_0"], "b": ["0_0"]}: after b is shown,
        // switching to a clears b only once both tiles of a are ready.
        let b = TileGrid::build("b", 1, &["0_0.png".to_owned()]).unwrap();
        let a = TileGrid::build("a", 2, &["0_0.png".to_owned(), "1_0.png".to_owned()]).unwrap();
        assert_eq!((a.min_x, a.max_x, a.min_y, a.max_y), (0, 1, 0, 0));

        let mut gens = Generations::default();
        gens.begin(b);
        gens.begin(a);

        assert!(gens.tile_ready(2, 0));
        assert!(gens.previous().is_some(), "1 of 2 is not past half");
        assert!(gens.tile_ready(2, 1));
        assert!(gens.previous().is_none(), "2 of 2 is past half");
    }
}
