use image::{DynamicImage, Rgba};

/// Apply a rounded-rect alpha mask with the given `radius_px` and a 1px soft
/// edge on the corner arc. Only the four corner squares are touched.
pub fn round_corners(img: DynamicImage, radius_px: u32) -> DynamicImage {
    let mut rgba = img.to_rgba8();
    let (w, h) = (rgba.width(), rgba.height());
    if w == 0 || h == 0 {
        return DynamicImage::ImageRgba8(rgba);
    }
    let r = radius_px.min(w / 2).min(h / 2);
    if r == 0 {
        return DynamicImage::ImageRgba8(rgba);
    }

    let outer = r as f32;
    let inner = (outer - 1.0).max(0.0);

    // Corner centers: the circle each corner square is clipped against.
    let corners = [
        (0, 0, outer, outer),
        (w - r, 0, w as f32 - outer, outer),
        (0, h - r, outer, h as f32 - outer),
        (w - r, h - r, w as f32 - outer, h as f32 - outer),
    ];

    for (x0, y0, cx, cy) in corners {
        for y in y0..(y0 + r).min(h) {
            for x in x0..(x0 + r).min(w) {
                let dx = (x as f32 + 0.5) - cx;
                let dy = (y as f32 + 0.5) - cy;
                let d = (dx * dx + dy * dy).sqrt();
                if d <= inner {
                    continue;
                }
                let p = rgba.get_pixel_mut(x, y);
                if d >= outer {
                    p[3] = 0;
                } else {
                    scale_alpha(p, (outer - d).clamp(0.0, 1.0));
                }
            }
        }
    }

    DynamicImage::ImageRgba8(rgba)
}

fn scale_alpha(px: &mut Rgba<u8>, factor: f32) {
    if px[3] == 0 {
        return;
    }
    let a = (px[3] as f32) * factor;
    px[3] = a.round().clamp(0.0, 255.0) as u8;
}

#[cfg(test)]
mod tests {
    use super::round_corners;
    use image::{DynamicImage, Rgba, RgbaImage};

    #[test]
    fn corners_are_masked_and_the_centre_is_untouched() {
        let img = RgbaImage::from_pixel(30, 30, Rgba([10, 20, 30, 255]));
        let rounded = round_corners(DynamicImage::ImageRgba8(img), 6).to_rgba8();

        assert_eq!(rounded.get_pixel(0, 0)[3], 0);
        assert_eq!(rounded.get_pixel(29, 0)[3], 0);
        assert_eq!(rounded.get_pixel(0, 29)[3], 0);
        assert_eq!(rounded.get_pixel(29, 29)[3], 0);
        assert_eq!(*rounded.get_pixel(15, 15), Rgba([10, 20, 30, 255]));
        // Edge midpoints sit outside the corner squares entirely.
        assert_eq!(rounded.get_pixel(15, 0)[3], 255);
        assert_eq!(rounded.get_pixel(0, 15)[3], 255);
    }

    #[test]
    fn zero_radius_is_a_no_op() {
        let img = RgbaImage::from_pixel(4, 4, Rgba([1, 2, 3, 255]));
        let rounded = round_corners(DynamicImage::ImageRgba8(img.clone()), 0).to_rgba8();
        assert_eq!(rounded, img);
    }
}
