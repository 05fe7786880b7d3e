use font8x8::UnicodeFonts;
use image::{Rgba, RgbaImage};

/// Source-over blend of `src` onto `dst`.
pub(crate) fn blend_pixel(dst: &mut Rgba<u8>, src: Rgba<u8>) {
    let sa = src[3] as f32 / 255.0;
    if sa <= 0.0 {
        return;
    }
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        *dst = Rgba([0, 0, 0, 0]);
        return;
    }
    let blend = |sc: u8, dc: u8| -> u8 {
        let sc = sc as f32 / 255.0;
        let dc = dc as f32 / 255.0;
        let out_c = (sc * sa + dc * da * (1.0 - sa)) / out_a;
        (out_c * 255.0).round().clamp(0.0, 255.0) as u8
    };
    dst[0] = blend(src[0], dst[0]);
    dst[1] = blend(src[1], dst[1]);
    dst[2] = blend(src[2], dst[2]);
    dst[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
}

/// Draw `text` with the 8x8 raster font at an integer `scale`.
///
/// Stops at the first newline; glyphs outside the basic set render blank.
/// `font8x8` stores glyph bits LSB-first (col 0 = left).
pub(crate) fn draw_text_8x8(img: &mut RgbaImage, x: u32, y: u32, text: &str, scale: u32, color: Rgba<u8>) {
    let scale = scale.max(1);
    let mut cursor_x = x;
    for ch in text.chars() {
        if ch == '\n' {
            break;
        }
        let glyph = font8x8::BASIC_FONTS.get(ch).unwrap_or([0u8; 8]);
        for (row, bits) in glyph.iter().enumerate() {
            for col in 0..8 {
                if (bits >> col) & 1 == 1 {
                    let px = cursor_x + (col as u32) * scale;
                    let py = y + row as u32 * scale;
                    for dy in 0..scale {
                        for dx in 0..scale {
                            if px + dx < img.width() && py + dy < img.height() {
                                let p = img.get_pixel_mut(px + dx, py + dy);
                                blend_pixel(p, color);
                            }
                        }
                    }
                }
            }
        }
        cursor_x += 8 * scale + scale; // 1px spacing (scaled)
    }
}
