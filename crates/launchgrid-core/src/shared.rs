use std::path::PathBuf;

use directories::BaseDirs;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

pub const PRODUCT_NAME: &str = include_str!("../../../product_name.txt").trim_ascii();

/// Prefix marking an icon reference that points at a local file rather than
/// a remote address.
pub const FILE_URL_PREFIX: &str = "file://";

/// Shown in the settings list in place of an empty link.
pub const UNSET_URL_LABEL: &str = "No link set";

#[derive(Debug, Clone)]
pub struct Paths {
    pub config_dir: PathBuf,
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
}

static PATHS: OnceCell<Paths> = OnceCell::new();

pub fn init_paths(paths: Paths) {
    let _ = PATHS.set(paths);
}

pub fn discover_paths() -> anyhow::Result<Paths> {
    let base =
        BaseDirs::new().ok_or_else(|| anyhow::anyhow!("failed to determine base directories"))?;
    let app_id = "io.github.launchgrid";

    let config_dir = base.config_dir().join(app_id);
    let data_dir = base.data_dir().join(app_id);
    let log_dir = data_dir.join("logs");

    Ok(Paths {
        config_dir,
        data_dir,
        log_dir,
    })
}

fn paths() -> &'static Paths {
    PATHS
        .get()
        .expect("launchgrid-core paths not initialised; call shared::init_paths() early in main()")
}

/// Get the application configuration directory.
pub fn config_dir() -> PathBuf {
    paths().config_dir.clone()
}

/// Get the application data directory.
pub fn data_dir() -> PathBuf {
    paths().data_dir.clone()
}

/// Get the application log directory.
pub fn log_dir() -> PathBuf {
    paths().log_dir.clone()
}

/// A single user-defined shortcut: where it goes and what it looks like.
///
/// `url` is the destination opened when the shortcut is activated; an empty
/// string means "unset". `icon_url` is either a remote address or a local
/// file reference carrying [`FILE_URL_PREFIX`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shortcut {
    pub url: String,
    #[serde(rename = "iconUrl")]
    pub icon_url: String,
}

impl Shortcut {
    pub fn empty() -> Self {
        Self {
            url: String::new(),
            icon_url: String::new(),
        }
    }

    pub fn has_url(&self) -> bool {
        !self.url.trim().is_empty()
    }
}
