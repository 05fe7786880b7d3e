//! Icon resolution and the two fallback policies.
//!
//! A shortcut's icon reference is either a local file (marked with
//! [`FILE_URL_PREFIX`]) or a remote address. The settings list uses the
//! *substitute* policy ([`load_or_placeholder`]): any failure yields the
//! placeholder icon instead of an error. The widget grid uses the *glyph*
//! policy: failures surface to the renderer, which draws a blocked marker in
//! the cell (see [`crate::render`]). The split is intentional UX, not an
//! accident of history.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context as _;
use image::{DynamicImage, Rgba, RgbaImage};

use crate::shared::{FILE_URL_PREFIX, config_dir, data_dir};

/// Where an icon reference points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IconSource {
    /// Local file; the `file://` prefix has already been stripped.
    Local(PathBuf),
    /// Remote address to fetch and decode.
    Remote(String),
}

impl IconSource {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match raw.strip_prefix(FILE_URL_PREFIX) {
            Some(path) => Self::Local(PathBuf::from(path)),
            None => Self::Remote(raw.to_owned()),
        }
    }
}

/// Load an icon image. Local references never issue a network request;
/// remote references never touch the filesystem.
pub async fn load(source: &IconSource) -> Result<DynamicImage, anyhow::Error> {
    match source {
        IconSource::Local(path) => image::open(path)
            .with_context(|| format!("failed to open icon file {}", path.display())),
        IconSource::Remote(address) => fetch_remote(address).await,
    }
}

async fn fetch_remote(address: &str) -> Result<DynamicImage, anyhow::Error> {
    let response = reqwest::get(address)
        .await
        .with_context(|| format!("failed to request icon {address:?}"))?;
    let bytes = response
        .error_for_status()
        .with_context(|| format!("icon request for {address:?} failed"))?
        .bytes()
        .await
        .context("failed to read icon response body")?;
    image::load_from_memory(&bytes).with_context(|| format!("failed to decode icon {address:?}"))
}

/// Substitute fallback policy (settings list): any failure yields the
/// placeholder icon instead of an error.
pub async fn load_or_placeholder(raw: &str) -> DynamicImage {
    match load(&IconSource::parse(raw)).await {
        Ok(img) => img,
        Err(err) => {
            log::debug!("Substituting placeholder for icon {raw:?}: {err:#}");
            match image::open(placeholder_path()) {
                Ok(img) => img,
                Err(_) => placeholder_image(),
            }
        }
    }
}

pub fn placeholder_path() -> PathBuf {
    config_dir().join("placeholder.png")
}

/// Generate the neutral placeholder icon used by the settings list.
pub fn placeholder_image() -> DynamicImage {
    let side = 64u32;
    let mut img = RgbaImage::from_pixel(side, side, Rgba([0x3a, 0x3a, 0x3a, 0xff]));
    let scale = 3;
    let glyph_side = 8 * scale;
    let offset = (side - glyph_side) / 2;
    crate::render::glyph::draw_text_8x8(
        &mut img,
        offset,
        offset,
        "?",
        scale,
        Rgba([0x9a, 0x9a, 0x9a, 0xff]),
    );
    crate::render::round_corners(DynamicImage::ImageRgba8(img), 12)
}

/// Ensure the placeholder icon exists on disk.
///
/// Written to the config dir so users can swap in their own; an existing
/// file is never overwritten.
pub fn ensure_placeholder_icon() {
    let path = placeholder_path();
    if path.is_file() {
        return;
    }
    if let Some(parent) = path.parent()
        && std::fs::create_dir_all(parent).is_err()
    {
        return;
    }
    if let Err(err) = placeholder_image().save_with_format(&path, image::ImageFormat::Png) {
        log::warn!("Failed to write placeholder icon {}: {}", path.display(), err);
    }
}

/// Copy a picked image into the data directory under a timestamp-unique name
/// and return the `file://` reference to persist.
pub fn import_icon(source: &Path) -> Result<String, anyhow::Error> {
    let img = image::open(source)
        .with_context(|| format!("failed to read picked image {}", source.display()))?;

    let millis = SystemTime::now().duration_since(UNIX_EPOCH)?.as_millis();
    let dir = data_dir().join("icons");
    std::fs::create_dir_all(&dir)?;
    let dest = dir.join(format!("icon_{millis}.png"));

    // Re-encode rather than raw-copy so the stored file is always a PNG,
    // whatever the picker handed us.
    img.save_with_format(&dest, image::ImageFormat::Png)
        .with_context(|| format!("failed to write imported icon {}", dest.display()))?;
    Ok(format!("{FILE_URL_PREFIX}{}", dest.display()))
}

#[cfg(test)]
mod tests {
    use super::{IconSource, load};
    use std::path::PathBuf;

    #[test]
    fn file_prefix_resolves_to_local_with_prefix_stripped() {
        assert_eq!(
            IconSource::parse("file:///home/user/icon_1.png"),
            IconSource::Local(PathBuf::from("/home/user/icon_1.png"))
        );
    }

    #[test]
    fn anything_else_resolves_to_remote() {
        assert_eq!(
            IconSource::parse("https://example.com/icon.png"),
            IconSource::Remote("https://example.com/icon.png".to_owned())
        );
        assert_eq!(IconSource::parse(""), IconSource::Remote(String::new()));
    }

    #[tokio::test]
    async fn local_load_never_fetches() {
        // A missing local file must fail with a filesystem error, not try the
        // string as an address.
        let err = load(&IconSource::parse("file:///nonexistent/icon.png"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("/nonexistent/icon.png"));
    }

    #[tokio::test]
    async fn empty_remote_reference_is_an_error() {
        assert!(load(&IconSource::parse("")).await.is_err());
    }
}
