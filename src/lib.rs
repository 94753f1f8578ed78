//! Easel — a raster paint application.
//!
//! The library half holds everything testable: coordinate mapping, shape
//! rasterization, the canvas engine, history, and file I/O.  The binary in
//! `main.rs` only bootstraps the egui shell.

pub mod app;
pub mod canvas;
pub mod history;
pub mod io;
pub mod logger;
pub mod mapping;
pub mod raster;
pub mod shapes;
