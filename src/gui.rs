use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};
use eframe::egui;
use egui::{vec2, Color32, ColorImage, CursorIcon, Sense, TextureOptions};

use crate::generations::Generations;
use crate::grid::TileGrid;
use crate::load::{self, FolderIndex, JobMsg, TileError, TileMsg};
use crate::render;
use crate::viewport::{Viewport, ZOOM_STEP};

/* ───────────────────────── UI tuneables ─────────────────────────── */

// Keep the GUI thread responsive by capping per-frame texture uploads.
const UPLOADS_PER_FRAME: usize = 16;

/* ───────────────────────── app state ────────────────────────────── */

pub struct ViewerApp {
    /// Tiles directory; the manifest lives at `<base>/index.json`.
    base: PathBuf,
    /// Folder → ordered tile filenames, loaded once per session.
    index: FolderIndex,
    active_folder: Option<String>,

    viewport: Viewport,
    gens: Generations,

    tile_rx: Receiver<TileMsg>,
    job_tx: Sender<JobMsg>,

    // Generation token: bumped on every folder switch. Workers use it to
    // skip jobs whose generation can no longer be held.
    current_gen: Arc<AtomicU64>,

    // Most recent folder-level error, shown in the status bar until the
    // next successful switch.
    last_error: Option<TileError>,

    egui_ctx: egui::Context,
}

impl ViewerApp {
    pub fn new(egui_ctx: egui::Context, base: PathBuf, index: FolderIndex) -> Self {
        let (tile_tx, tile_rx) = bounded::<TileMsg>(load::TILE_CHAN_CAP);
        let (job_tx, job_rx) = bounded::<JobMsg>(load::MAX_ENQUEUED_JOBS);
        let current_gen = Arc::new(AtomicU64::new(0));

        load::start_decode_workers(job_rx, tile_tx, egui_ctx.clone(), current_gen.clone());

        let mut app = Self {
            base,
            index,
            active_folder: None,
            viewport: Viewport::default(),
            gens: Generations::default(),
            tile_rx,
            job_tx,
            current_gen,
            last_error: None,
            egui_ctx,
        };

        // The last folder in sorted order is the startup selection.
        if let Some(folder) = app.index.keys().next_back().cloned() {
            app.switch_folder(&folder);
        }
        app
    }

    /// Start loading `folder` as the incoming generation. Any failure leaves
    /// the current display (both generations, viewport) untouched.
    pub fn switch_folder(&mut self, folder: &str) {
        let files = match self.index.get(folder) {
            Some(files) => files.clone(),
            None => {
                self.last_error = Some(TileError::FolderNotFound(folder.to_owned()));
                return;
            }
        };

        let generation = self.current_gen.load(Ordering::Relaxed) + 1;
        let grid = match TileGrid::build(folder, generation, &files) {
            Ok(grid) => grid,
            Err(err) => {
                self.last_error = Some(err);
                return;
            }
        };

        // Build is good: commit the generation, then queue one decode job
        // per tile. Jobs of the demoted generation stay in flight.
        self.current_gen.store(generation, Ordering::Relaxed);
        self.gens.begin(grid);
        self.active_folder = Some(folder.to_owned());
        self.last_error = None;

        for (index, name) in files.iter().enumerate() {
            let path = load::tile_path(&self.base, folder, name);
            let _ = self.job_tx.send((generation, index, path));
        }
        self.egui_ctx.request_repaint();
    }

    /// Pick a different tiles directory. A readable manifest starts a fresh
    /// session (generations dropped, viewport back to identity); a bad pick
    /// keeps the current session and reports the error.
    fn open_tiles_dir(&mut self) {
        let Some(dir) = rfd::FileDialog::new().pick_folder() else {
            return;
        };
        match load::load_manifest(&dir) {
            Ok(index) => {
                self.base = dir;
                self.index = index;
                self.gens.clear();
                self.active_folder = None;
                self.viewport.reset();
                self.last_error = None;
                if let Some(folder) = self.index.keys().next_back().cloned() {
                    self.switch_folder(&folder);
                }
            }
            Err(err) => self.last_error = Some(err),
        }
    }

    /// Drain decoded tiles from the workers: upload a texture, note the
    /// generation's tile size, advance readiness. Completions for dropped
    /// generations are discarded here.
    fn drain_tiles(&mut self, ctx: &egui::Context) {
        let mut uploaded = 0usize;
        while uploaded < UPLOADS_PER_FRAME {
            let msg = match self.tile_rx.try_recv() {
                Ok(msg) => msg,
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            };

            let Some(grid) = self.gens.grid_mut(msg.generation) else {
                continue;
            };
            let Some(tile) = grid.tiles.get(msg.index) else {
                continue;
            };

            let name = format!("{}/{}_{}", grid.folder, tile.x, tile.y);
            grid.observe_tile_size(msg.width as f32);

            let tex = ctx.load_texture(
                name,
                ColorImage::from_rgba_unmultiplied([msg.width, msg.height], &msg.rgba),
                TextureOptions::NEAREST,
            );
            grid.set_texture(msg.index, tex);
            self.gens.tile_ready(msg.generation, msg.index);

            uploaded += 1;
        }
        if uploaded > 0 {
            ctx.request_repaint();
        }
    }
}

/* ─────────────────── eframe integration ───────────────────────── */

impl eframe::App for ViewerApp {
    fn update(&mut self, ctx: &egui::Context, _: &mut eframe::Frame) {
        let input = ctx.input(|i| i.clone());

        // 1) Drain decoded tiles → textures + readiness
        self.drain_tiles(ctx);

        // 2) Folder bar; clicks are deferred out of the borrow of the index
        let mut open_dir = false;
        let mut clicked: Option<String> = None;
        egui::TopBottomPanel::top("folders").show(ctx, |ui| {
            ui.horizontal_wrapped(|ui| {
                if ui.button("Open tiles folder...").clicked() {
                    open_dir = true;
                }
                ui.separator();
                for folder in self.index.keys() {
                    let active = self.active_folder.as_deref() == Some(folder.as_str());
                    if ui.selectable_label(active, folder).clicked() && !active {
                        clicked = Some(folder.clone());
                    }
                }
            });
        });
        if open_dir {
            self.open_tiles_dir();
        }
        if let Some(folder) = clicked {
            self.switch_folder(&folder);
        }

        // 3) Status bar
        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if let Some(folder) = &self.active_folder {
                    ui.label(folder);
                    ui.separator();
                }
                let (ready, total) = self.gens.ready_totals();
                ui.label(format!("{ready} / {total} tiles"));
                ui.separator();
                ui.label(format!("{:.0}%", self.viewport.scale * 100.0));
                if let Some(err) = &self.last_error {
                    ui.separator();
                    ui.colored_label(Color32::LIGHT_RED, err.to_string());
                }
            });
        });

        // 4) Canvas: pan, zoom, composite
        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| {
                let canvas = ui.available_rect_before_wrap();
                let resp = ui.allocate_rect(canvas, Sense::click_and_drag());

                // One-time centering, once the first generation's tile size
                // is known and only while the view was never touched.
                if self.viewport.is_identity() {
                    if let Some(grid) = self.gens.incoming() {
                        if let Some(tile_size) = grid.tile_size {
                            let content =
                                vec2(grid.cols() as f32, grid.rows() as f32) * tile_size;
                            self.viewport.center_on(content, canvas.size());
                        }
                    }
                }

                if resp.drag_started() {
                    if let Some(pos) = resp.interact_pointer_pos() {
                        self.viewport.begin_pan(pos);
                    }
                }
                if resp.dragged() {
                    if let Some(pos) = resp.interact_pointer_pos() {
                        if self.viewport.update_pan(pos) {
                            ctx.request_repaint();
                        }
                    }
                }
                if resp.drag_stopped() {
                    self.viewport.end_pan();
                }

                if let Some(hover) = resp.hover_pos() {
                    let scroll = input.raw_scroll_delta.y;
                    if scroll != 0.0 {
                        let factor = if scroll > 0.0 {
                            ZOOM_STEP
                        } else {
                            1.0 / ZOOM_STEP
                        };
                        self.viewport.zoom_at(hover, factor);
                        ctx.request_repaint();
                    }
                }

                let painter = ui.painter().with_clip_rect(canvas);
                render::paint(&painter, canvas, &self.viewport, &self.gens);

                if resp.dragged() {
                    ctx.output_mut(|o| o.cursor_icon = CursorIcon::Grabbing);
                } else if resp.hovered() {
                    ctx.output_mut(|o| o.cursor_icon = CursorIcon::Grab);
                }
            });
    }
}
