//! PersonaAgent Desktop: application entry.
//!
//! Optional first argument: start route (`/`, `/chat`, `/results`).

mod app;

use eframe::egui;
use persona::flow::Route;

fn main() -> eframe::Result<()> {
    let start = std::env::args()
        .nth(1)
        .map(|p| Route::from_path(&p))
        .unwrap_or_default();
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([900.0, 760.0])
            .with_min_inner_size([600.0, 480.0]),
        ..Default::default()
    };
    eframe::run_native(
        "PersonaAgent",
        options,
        Box::new(move |cc| Box::new(app::PersonaApp::new(cc, start))),
    )
}
