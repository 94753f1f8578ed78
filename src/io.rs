//! Image file I/O and native file dialogs.
//!
//! Failures surface as `Err(String)` so the UI shell can show them in the
//! status bar; nothing in here panics or partially mutates canvas state.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use image::codecs::bmp::BmpEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{Rgba, RgbaImage};
use rfd::FileDialog;

/// Extensions accepted by the open dialog.
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// Decode a raster file into RGBA.
pub fn load_image(path: &Path) -> Result<RgbaImage, String> {
    image::open(path)
        .map(|img| img.into_rgba8())
        .map_err(|e| format!("Failed to load {}: {}", path.display(), e))
}

/// Encode `img` to `path`, choosing the codec from the file extension.
/// Unknown or missing extensions fall back to PNG.
pub fn save_image(img: &RgbaImage, path: &Path) -> Result<(), String> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let file =
        File::create(path).map_err(|e| format!("Failed to create {}: {}", path.display(), e))?;
    let mut writer = BufWriter::new(file);

    match ext.as_str() {
        "jpg" | "jpeg" => {
            // JPEG has no alpha channel: flatten over white first.
            let flat = flatten_over_white(img);
            let mut rgb = Vec::with_capacity((flat.width() * flat.height() * 3) as usize);
            for p in flat.pixels() {
                rgb.extend_from_slice(&p.0[..3]);
            }
            let mut encoder = JpegEncoder::new_with_quality(&mut writer, 90);
            encoder
                .encode(&rgb, flat.width(), flat.height(), image::ColorType::Rgb8)
                .map_err(|e| format!("JPEG encode failed: {}", e))
        }
        "bmp" => {
            let mut encoder = BmpEncoder::new(&mut writer);
            encoder
                .encode(img.as_raw(), img.width(), img.height(), image::ColorType::Rgba8)
                .map_err(|e| format!("BMP encode failed: {}", e))
        }
        _ => {
            let encoder = PngEncoder::new(&mut writer);
            #[allow(deprecated)]
            encoder
                .encode(img.as_raw(), img.width(), img.height(), image::ColorType::Rgba8)
                .map_err(|e| format!("PNG encode failed: {}", e))
        }
    }
}

/// Source-over composite onto an opaque white sheet.
fn flatten_over_white(img: &RgbaImage) -> RgbaImage {
    let mut out = RgbaImage::from_pixel(img.width(), img.height(), Rgba([255, 255, 255, 255]));
    crate::raster::composite_over(&mut out, img);
    out
}

/// Native open dialog filtered to the supported raster formats.
pub fn open_dialog() -> Option<PathBuf> {
    FileDialog::new()
        .add_filter("Images", IMAGE_EXTENSIONS)
        .add_filter("All Files", &["*"])
        .pick_file()
}

/// Native save dialog.  PNG is offered first and is the default format.
pub fn save_dialog() -> Option<PathBuf> {
    FileDialog::new()
        .add_filter("PNG", &["png"])
        .add_filter("JPEG", &["jpg", "jpeg"])
        .add_filter("BMP", &["bmp"])
        .set_file_name("untitled.png")
        .save_file()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("easel-io-test-{}-{}", std::process::id(), name))
    }

    fn test_image() -> RgbaImage {
        let mut img = RgbaImage::from_pixel(20, 10, Rgba([255, 255, 255, 255]));
        img.put_pixel(3, 4, Rgba([255, 0, 0, 255]));
        img.put_pixel(15, 7, Rgba([0, 128, 255, 255]));
        img
    }

    #[test]
    fn png_round_trip_is_lossless() {
        let path = temp_path("round.png");
        let img = test_image();
        save_image(&img, &path).unwrap();
        let back = load_image(&path).unwrap();
        assert_eq!(img.dimensions(), back.dimensions());
        assert_eq!(img.as_raw(), back.as_raw());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn unknown_extension_falls_back_to_png() {
        let path = temp_path("fallback.raster");
        save_image(&test_image(), &path).unwrap();
        // PNG magic bytes.
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..4], &[0x89, b'P', b'N', b'G']);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn missing_file_reports_error() {
        let err = load_image(Path::new("/nonexistent/easel/missing.png"));
        assert!(err.is_err());
    }
}
