//! LaunchGrid backend core.
//!
//! Persistence and rendering for the shortcut grid, kept free of any UI
//! dependency so multiple frontends (the egui settings app, the passive
//! widget renderer) can share it.

pub mod icons;
pub mod render;
pub mod shared;
pub mod store;
