use std::path::PathBuf;

use image::{Rgba, RgbaImage, imageops};

use super::glyph::blend_pixel;

/// How the widget canvas is filled before icons are composited.
///
/// The shipped script existed in two near-duplicate variants (generated
/// gradient vs stored background image); here they are a single strategy
/// with the flat fill as the shared fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackgroundStyle {
    /// Diagonal semi-transparent white-to-black gradient over the base fill.
    Gradient,
    /// User-chosen image persisted at [`background_path`].
    Stored,
    /// Flat neutral fill; also the fallback when the stored image is unusable.
    Flat,
}

const BASE_FILL: Rgba<u8> = Rgba([0x2b, 0x2b, 0x2b, 0xff]);
// ~0.3, matching the translucent gradient stops of the generated variant.
const GRADIENT_ALPHA: u8 = 77;

/// Fixed well-known location of the user-chosen background image. Presence
/// or absence of this file is the only signal consumed.
pub fn background_path() -> PathBuf {
    crate::shared::config_dir().join("background.png")
}

/// Pick the style for non-interactive rendering: a stored image wins when
/// present, otherwise the generated gradient.
pub fn detect_background() -> BackgroundStyle {
    if background_path().is_file() {
        BackgroundStyle::Stored
    } else {
        BackgroundStyle::Gradient
    }
}

pub(super) fn render(style: BackgroundStyle, width: u32, height: u32) -> RgbaImage {
    match style {
        BackgroundStyle::Flat => RgbaImage::from_pixel(width, height, BASE_FILL),
        BackgroundStyle::Gradient => gradient(width, height),
        BackgroundStyle::Stored => match image::open(background_path()) {
            Ok(img) => img
                .resize_to_fill(width, height, imageops::FilterType::Triangle)
                .to_rgba8(),
            Err(err) => {
                log::warn!(
                    "Failed to load background image {}: {}",
                    background_path().display(),
                    err
                );
                RgbaImage::from_pixel(width, height, BASE_FILL)
            }
        },
    }
}

fn gradient(width: u32, height: u32) -> RgbaImage {
    let mut img = RgbaImage::from_pixel(width, height, BASE_FILL);
    let span = (width + height).saturating_sub(2).max(1) as f32;
    for y in 0..height {
        for x in 0..width {
            let t = (x + y) as f32 / span;
            let level = (255.0 * (1.0 - t)).round() as u8;
            blend_pixel(
                img.get_pixel_mut(x, y),
                Rgba([level, level, level, GRADIENT_ALPHA]),
            );
        }
    }
    img
}

/// Persist a picked background image to the fixed path, re-encoded as PNG.
pub fn store_background(source: &std::path::Path) -> Result<(), anyhow::Error> {
    use anyhow::Context as _;
    let img = image::open(source)
        .with_context(|| format!("failed to read picked background {}", source.display()))?;
    let dest = background_path();
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }
    img.save_with_format(&dest, image::ImageFormat::Png)
        .with_context(|| format!("failed to write background image {}", dest.display()))
}

/// Remove the stored background image, reverting to the generated gradient.
pub fn clear_background() -> Result<(), anyhow::Error> {
    let path = background_path();
    if path.exists() {
        std::fs::remove_file(&path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{BackgroundStyle, render};

    #[test]
    fn flat_fill_is_uniform_and_opaque() {
        let img = render(BackgroundStyle::Flat, 8, 8);
        let first = *img.get_pixel(0, 0);
        assert_eq!(first[3], 255);
        assert!(img.pixels().all(|p| *p == first));
    }

    #[test]
    fn stored_background_missing_falls_back_to_flat() {
        let dir = tempfile::tempdir().unwrap();
        crate::shared::init_paths(crate::shared::Paths {
            config_dir: dir.path().to_path_buf(),
            data_dir: dir.path().join("data"),
            log_dir: dir.path().join("logs"),
        });

        let img = render(BackgroundStyle::Stored, 8, 8);
        assert_eq!(img, render(BackgroundStyle::Flat, 8, 8));
    }

    #[test]
    fn gradient_darkens_along_the_diagonal() {
        let img = render(BackgroundStyle::Gradient, 32, 32);
        let top_left = img.get_pixel(0, 0);
        let bottom_right = img.get_pixel(31, 31);
        assert!(top_left[0] > bottom_right[0]);
        assert_eq!(top_left[3], 255);
    }
}
