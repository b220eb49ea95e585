//! Dimerscreen - Primer-Dimer Screening Tool
//!
//! Desktop front-end for screening primer sets for 3' complementarity.

use env_logger::Env;
use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

mod analysis;
mod app;

use app::DimerscreenApp;

fn main() -> eframe::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1100.0, 750.0])
            .with_min_inner_size([800.0, 550.0])
            .with_title("Dimerscreen"),
        ..Default::default()
    };

    eframe::run_native(
        "Dimerscreen",
        native_options,
        Box::new(|cc| Ok(Box::new(DimerscreenApp::new(cc)))),
    )
}
