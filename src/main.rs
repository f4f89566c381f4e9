#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use std::{env, path::PathBuf};

use eframe::{egui::ViewportBuilder, NativeOptions};

mod generations;
mod grid;
mod gui;
mod load;
mod render;
mod viewport;

fn main() -> eframe::Result<()> {
    let base = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("tiles"));

    // An unreadable index at startup is fatal: there is no UI to populate.
    let index = match load::load_manifest(&base) {
        Ok(index) => index,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    let mut opts = NativeOptions::default();
    opts.viewport = ViewportBuilder::default().with_inner_size([1280.0, 800.0]);

    eframe::run_native(
        "tilescope",
        opts,
        Box::new(move |cc| Box::new(gui::ViewerApp::new(cc.egui_ctx.clone(), base, index))),
    )
}
