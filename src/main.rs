#![windows_subsystem = "windows"]

use easel::app::EaselApp;
use easel::logger;
use eframe::egui;

fn main() -> Result<(), eframe::Error> {
    // Initialize session log (overwrites previous session log)
    logger::init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1024.0, 768.0])
            .with_title("Easel"),
        ..Default::default()
    };

    eframe::run_native("Easel", options, Box::new(|cc| Box::new(EaselApp::new(cc))))
}
