use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use crossbeam_channel::{Receiver, Sender};
use eframe::egui;
use image::ImageReader;
use thiserror::Error;

/* ───────────────────────── errors ───────────────────────────────── */

/// Everything that can go wrong between a folder click and pixels on screen.
///
/// Folder-level errors (`FolderNotFound`, `MalformedTileName`, `EmptyTileSet`)
/// abort the switch and leave the prior display untouched. A decode failure
/// is isolated to its tile, which simply never becomes ready. Nothing here is
/// fatal after startup and nothing is retried.
#[derive(Debug, Error)]
pub enum TileError {
    #[error("could not load tile index from {}: {reason}", .path.display())]
    ManifestUnavailable { path: PathBuf, reason: String },

    #[error("folder {0:?} is not in the tile index")]
    FolderNotFound(String),

    #[error("tile name {0:?} does not encode an x_y coordinate pair")]
    MalformedTileName(String),

    #[error("folder {0:?} contains no tiles")]
    EmptyTileSet(String),

    #[error("could not decode tile {}: {reason}", .path.display())]
    ImageDecodeFailure { path: PathBuf, reason: String },
}

/* ───────────────────────── tile index ───────────────────────────── */

/// Folder name → ordered tile filenames. A `BTreeMap` keeps folders in
/// sorted order, which is also the order of the UI buttons; the last entry
/// is the startup selection.
pub type FolderIndex = BTreeMap<String, Vec<String>>;

pub const MANIFEST_NAME: &str = "index.json";

/// Read and parse `<base>/index.json`. Fetched once per session; the result
/// is immutable until a different tiles directory is opened.
pub fn load_manifest(base: &Path) -> Result<FolderIndex, TileError> {
    let path = base.join(MANIFEST_NAME);
    let unavailable = |reason: String| TileError::ManifestUnavailable {
        path: path.clone(),
        reason,
    };

    let text = std::fs::read_to_string(&path).map_err(|e| unavailable(e.to_string()))?;
    parse_manifest(&text).map_err(|e| unavailable(e.to_string()))
}

fn parse_manifest(text: &str) -> Result<FolderIndex, serde_json::Error> {
    serde_json::from_str(text)
}

/// Tile images live at `<base>/<folder>/<filename>`.
pub fn tile_path(base: &Path, folder: &str, name: &str) -> PathBuf {
    base.join(folder).join(name)
}

/* ───────────────────────── channel types / caps ─────────────────── */

/// Decoded tile pixels, emitted by a worker after loading one image.
pub struct TileMsg {
    pub generation: u64,
    pub index: usize,
    pub width: usize,
    pub height: usize,
    pub rgba: Vec<u8>,
}

/// (generation, tile index, image path) — one decode job per tile.
pub type JobMsg = (u64, usize, PathBuf);

pub const TILE_CHAN_CAP: usize = 1024;
pub const MAX_ENQUEUED_JOBS: usize = 8192;

/* ───────────────────────── decoding / workers ───────────────────── */

fn decode_worker_count() -> usize {
    const MIN: usize = 2;
    const MAX: usize = 8;
    let logical = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4);
    (logical / 2).clamp(MIN, MAX)
}

fn decode_rgba(path: &Path) -> Result<(usize, usize, Vec<u8>), TileError> {
    let fail = |reason: String| TileError::ImageDecodeFailure {
        path: path.to_path_buf(),
        reason,
    };

    let img = ImageReader::open(path)
        .map_err(|e| fail(e.to_string()))?
        .decode()
        .map_err(|e| fail(e.to_string()))?;
    let rgba = img.to_rgba8();
    Ok((rgba.width() as usize, rgba.height() as usize, rgba.into_raw()))
}

/// Spawn the long-lived decode workers. Each blocks on the job channel,
/// decodes to RGBA8, and sends the pixels back for the GUI thread to upload.
///
/// There is no cancellation: a superseded generation's jobs run to
/// completion and the GUI routes their results (they still render while the
/// generation is held as `previous`). Workers only skip jobs at least two
/// generations stale, which the manager provably no longer holds.
pub fn start_decode_workers(
    job_rx: Receiver<JobMsg>,
    tile_tx: Sender<TileMsg>,
    egui_ctx: egui::Context,
    current_gen: Arc<AtomicU64>,
) {
    for _ in 0..decode_worker_count() {
        let rx = job_rx.clone();
        let tx = tile_tx.clone();
        let ctx = egui_ctx.clone();
        let current = current_gen.clone();

        std::thread::spawn(move || {
            for (generation, index, path) in rx.iter() {
                if generation + 1 < current.load(Ordering::Relaxed) {
                    continue;
                }

                match decode_rgba(&path) {
                    Ok((width, height, rgba)) => {
                        let _ = tx.send(TileMsg {
                            generation,
                            index,
                            width,
                            height,
                            rgba,
                        });
                        ctx.request_repaint();
                    }
                    // The tile stays a permanent gap; the rest of its
                    // generation is unaffected.
                    Err(err) => eprintln!("{err}"),
                }
            }
        });
    }
}

/* ───────────────────────────── tests ────────────────────────────── */

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_parses_sorted_with_last_as_startup_pick() {
        let index =
            parse_manifest(r#"{"b": ["0_0.png"], "a": ["0_0.png", "1_0.png"]}"#).unwrap();
        let folders: Vec<&String> = index.keys().collect();
        assert_eq!(folders, ["a", "b"]);
        assert_eq!(index.keys().next_back().unwrap(), "b");
        assert_eq!(index["a"].len(), 2);
    }

    #[test]
    fn manifest_rejects_malformed_json() {
        assert!(parse_manifest("{\"a\": 3}").is_err());
        assert!(parse_manifest("not json").is_err());
    }

    #[test]
    fn missing_manifest_is_unavailable() {
        let err = load_manifest(Path::new("/nonexistent/tiles")).unwrap_err();
        match err {
            TileError::ManifestUnavailable { path, .. } => {
                assert_eq!(path, Path::new("/nonexistent/tiles/index.json"));
            }
            other => panic!("expected ManifestUnavailable, got {other:?}"),
        }
    }

    #[test]
    fn tile_paths_nest_under_folder() {
        let p = tile_path(Path::new("tiles"), "2024-05", "3_-1.png");
        assert_eq!(p, Path::new("tiles/2024-05/3_-1.png"));
    }
}
