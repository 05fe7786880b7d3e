//! The widget grid: a pure function of the shortcut list and a background
//! strategy, producing a fixed-height canvas plus per-cell tap regions.

mod background;
pub(crate) mod glyph;
mod rounding;

pub use background::{
    BackgroundStyle, background_path, clear_background, detect_background, store_background,
};
pub use rounding::round_corners;

use image::{Rgba, RgbaImage, imageops};

use crate::icons::{self, IconSource};
use crate::shared::Shortcut;

/// Tap-region tag used for cells whose shortcut has no link yet.
pub const UNSET_URL_TAG: &str = "#";

/// Fixed layout of the widget grid. Constants mirror the shipped widget.
#[derive(Debug, Clone, Copy)]
pub struct GridLayout {
    pub icon_size: u32,
    pub spacing: u32,
    pub items_per_row: u32,
    pub canvas_height: u32,
    /// Extra tappable margin around each icon.
    pub cell_padding: u32,
    pub side_padding: u32,
    /// The centred icon block is shifted up by this much. Cosmetic.
    pub vertical_bias: u32,
    pub corner_radius: u32,
}

impl Default for GridLayout {
    fn default() -> Self {
        Self {
            icon_size: 30,
            spacing: 5,
            items_per_row: 8,
            canvas_height: 168,
            cell_padding: 3,
            side_padding: 10,
            vertical_bias: 3,
            corner_radius: 6,
        }
    }
}

impl GridLayout {
    pub fn rows_for(&self, count: usize) -> u32 {
        (count as u32).div_ceil(self.items_per_row)
    }

    /// Side length of one tappable cell: the icon plus its margin.
    pub fn cell_size(&self) -> u32 {
        self.icon_size + 2 * self.cell_padding
    }

    pub fn canvas_width(&self) -> u32 {
        2 * self.side_padding
            + self.items_per_row * self.cell_size()
            + (self.items_per_row - 1) * self.spacing
    }

    // The centring maths deliberately counts icons only, not their cell
    // margins, matching the shipped widget. Close enough for a cosmetic
    // offset.
    fn occupied_height(&self, rows: u32) -> u32 {
        rows * self.icon_size + rows.saturating_sub(1) * self.spacing
    }

    fn top_padding(&self, rows: u32) -> u32 {
        let centred = self.canvas_height.saturating_sub(self.occupied_height(rows)) / 2;
        centred.saturating_sub(self.vertical_bias)
    }

    /// Top-left corner of the cell at `index`. Cells never overlap, so a
    /// point on the canvas maps to at most one cell.
    fn cell_origin(&self, index: usize, rows: u32) -> (u32, u32) {
        let row = index as u32 / self.items_per_row;
        let col = index as u32 % self.items_per_row;
        let step = self.cell_size() + self.spacing;
        let x = self.side_padding + col * step;
        let y = self.top_padding(rows) + row * step;
        (x, y)
    }
}

/// Pixel-space rectangle of one populated grid cell, tagged with the URL the
/// cell launches. The association is strictly per cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellRegion {
    pub index: usize,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub url: String,
}

impl CellRegion {
    pub fn contains(&self, px: u32, py: u32) -> bool {
        px >= self.x && px < self.x + self.width && py >= self.y && py < self.y + self.height
    }
}

/// A rendered widget: the canvas plus the tap region of every populated cell.
pub struct WidgetCanvas {
    pub image: RgbaImage,
    pub cells: Vec<CellRegion>,
}

const BLOCKED_MARKER_COLOR: Rgba<u8> = Rgba([0xff, 0x33, 0x33, 0xff]);
const BLOCKED_MARKER_SCALE: u32 = 2;

/// Render the widget canvas for `shortcuts`.
///
/// Read-only: nothing is persisted. Icons are fetched one at a time; a
/// failed icon renders the blocked marker in place so a cell is never blank.
pub async fn render_widget(
    shortcuts: &[Shortcut],
    layout: &GridLayout,
    style: BackgroundStyle,
) -> WidgetCanvas {
    let width = layout.canvas_width();
    let height = layout.canvas_height;
    let mut canvas = background::render(style, width, height);

    let rows = layout.rows_for(shortcuts.len());
    let mut cells = Vec::with_capacity(shortcuts.len());

    for (index, shortcut) in shortcuts.iter().enumerate() {
        let (cx, cy) = layout.cell_origin(index, rows);
        let (ix, iy) = (cx + layout.cell_padding, cy + layout.cell_padding);

        match icons::load(&IconSource::parse(&shortcut.icon_url)).await {
            Ok(img) => {
                let icon = round_corners(
                    img.resize_exact(
                        layout.icon_size,
                        layout.icon_size,
                        imageops::FilterType::Triangle,
                    ),
                    layout.corner_radius,
                );
                imageops::overlay(&mut canvas, &icon.to_rgba8(), ix as i64, iy as i64);
            }
            Err(err) => {
                log::debug!("Icon for cell {index} unavailable, drawing blocked marker: {err:#}");
                draw_blocked_marker(&mut canvas, ix, iy, layout.icon_size);
            }
        }

        cells.push(CellRegion {
            index,
            x: cx,
            y: cy,
            width: layout.cell_size(),
            height: layout.cell_size(),
            url: if shortcut.has_url() {
                shortcut.url.clone()
            } else {
                UNSET_URL_TAG.to_owned()
            },
        });
    }

    WidgetCanvas {
        image: canvas,
        cells,
    }
}

fn draw_blocked_marker(canvas: &mut RgbaImage, x: u32, y: u32, icon_size: u32) {
    let glyph_side = 8 * BLOCKED_MARKER_SCALE;
    let gx = x + icon_size.saturating_sub(glyph_side) / 2;
    let gy = y + icon_size.saturating_sub(glyph_side) / 2;
    glyph::draw_text_8x8(canvas, gx, gy, "X", BLOCKED_MARKER_SCALE, BLOCKED_MARKER_COLOR);
}

#[cfg(test)]
mod tests {
    use super::{BackgroundStyle, GridLayout, UNSET_URL_TAG, render_widget};
    use crate::shared::Shortcut;

    fn unloadable(url: &str) -> Shortcut {
        Shortcut {
            url: url.to_owned(),
            // Local reference to a file that does not exist: exercises the
            // glyph fallback without touching the network.
            icon_url: "file:///nonexistent/icon.png".to_owned(),
        }
    }

    #[test]
    fn ten_shortcuts_at_eight_per_row_make_two_rows() {
        let layout = GridLayout::default();
        assert_eq!(layout.rows_for(10), 2);
        assert_eq!(layout.rows_for(8), 1);
        assert_eq!(layout.rows_for(0), 0);
    }

    #[tokio::test]
    async fn cells_fill_rows_left_to_right_and_stop_when_exhausted() {
        let layout = GridLayout::default();
        let shortcuts: Vec<Shortcut> = (0..10)
            .map(|i| unloadable(&format!("https://example.com/{i}")))
            .collect();

        let canvas = render_widget(&shortcuts, &layout, BackgroundStyle::Flat).await;
        assert_eq!(canvas.cells.len(), 10);
        assert_eq!(canvas.image.height(), layout.canvas_height);
        assert_eq!(canvas.image.width(), layout.canvas_width());

        let row0_y = canvas.cells[0].y;
        let row0 = canvas.cells.iter().filter(|c| c.y == row0_y).count();
        let row1 = canvas.cells.iter().filter(|c| c.y != row0_y).count();
        assert_eq!(row0, 8);
        assert_eq!(row1, 2);
        // Second-row cells sit exactly one cell-plus-spacing step lower.
        assert_eq!(
            canvas.cells[8].y,
            row0_y + layout.cell_size() + layout.spacing
        );

        // No two tap regions may claim the same point.
        for a in &canvas.cells {
            for b in &canvas.cells {
                if a.index != b.index {
                    let overlap_x = a.x < b.x + b.width && b.x < a.x + a.width;
                    let overlap_y = a.y < b.y + b.height && b.y < a.y + a.height;
                    assert!(!(overlap_x && overlap_y), "cells {} and {} overlap", a.index, b.index);
                }
            }
        }
    }

    #[tokio::test]
    async fn tap_regions_are_tagged_per_cell() {
        let layout = GridLayout::default();
        let shortcuts = vec![
            unloadable("https://a.example"),
            unloadable(""),
            unloadable("https://c.example"),
        ];

        let canvas = render_widget(&shortcuts, &layout, BackgroundStyle::Flat).await;
        assert_eq!(canvas.cells[0].url, "https://a.example");
        assert_eq!(canvas.cells[1].url, UNSET_URL_TAG);
        assert_eq!(canvas.cells[2].url, "https://c.example");

        // Hit-testing the centre of a cell finds that cell and no other.
        let cell = &canvas.cells[2];
        let (cx, cy) = (cell.x + cell.width / 2, cell.y + cell.height / 2);
        let hits: Vec<usize> = canvas
            .cells
            .iter()
            .filter(|c| c.contains(cx, cy))
            .map(|c| c.index)
            .collect();
        assert_eq!(hits, vec![2]);
    }

    #[tokio::test]
    async fn a_broken_icon_never_blanks_its_cell() {
        let layout = GridLayout::default();
        let shortcuts = vec![unloadable("https://a.example")];

        let flat = super::background::render(BackgroundStyle::Flat, layout.canvas_width(), layout.canvas_height);
        let canvas = render_widget(&shortcuts, &layout, BackgroundStyle::Flat).await;

        // The blocked marker must have changed pixels inside the first cell.
        assert_ne!(canvas.image, flat);
    }

    #[tokio::test]
    async fn empty_list_renders_an_empty_canvas() {
        let layout = GridLayout::default();
        let canvas = render_widget(&[], &layout, BackgroundStyle::Flat).await;
        assert!(canvas.cells.is_empty());
        assert_eq!(canvas.image.width(), layout.canvas_width());
    }
}
