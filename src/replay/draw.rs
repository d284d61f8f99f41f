//! Alpha-blended drawing primitives on RGBA frames
//!
//! Everything here clips silently to the image bounds, so callers can pass
//! coordinates that fall partly or wholly off-frame.

use image::{Rgba, RgbaImage};

pub const GLYPH_WIDTH: u32 = 5;
pub const GLYPH_HEIGHT: u32 = 7;
/// Horizontal advance per character, before scaling
const GLYPH_ADVANCE: u32 = GLYPH_WIDTH + 1;

/// Blend `color` over the pixel at (x, y). `opacity` scales the colour's own
/// alpha channel.
pub fn blend_pixel(img: &mut RgbaImage, x: i32, y: i32, color: Rgba<u8>, opacity: f32) {
    if x < 0 || y < 0 || x as u32 >= img.width() || y as u32 >= img.height() {
        return;
    }
    let a = (opacity.clamp(0.0, 1.0) * color[3] as f32 / 255.0).clamp(0.0, 1.0);
    if a <= 0.0 {
        return;
    }
    let px = img.get_pixel_mut(x as u32, y as u32);
    for c in 0..3 {
        let blended = px[c] as f32 * (1.0 - a) + color[c] as f32 * a;
        px[c] = blended.round() as u8;
    }
    let out_alpha = px[3] as f32 + (255.0 - px[3] as f32) * a;
    px[3] = out_alpha.round() as u8;
}

pub fn fill_circle(img: &mut RgbaImage, center: (i32, i32), radius: f32, color: Rgba<u8>, opacity: f32) {
    let r = radius.max(0.0);
    let reach = r.ceil() as i32;
    for dy in -reach..=reach {
        for dx in -reach..=reach {
            if ((dx * dx + dy * dy) as f32) <= r * r {
                blend_pixel(
                    img,
                    center.0.saturating_add(dx),
                    center.1.saturating_add(dy),
                    color,
                    opacity,
                );
            }
        }
    }
}

/// Circle outline of the given stroke width, centred on `radius`
pub fn draw_ring(
    img: &mut RgbaImage,
    center: (i32, i32),
    radius: f32,
    thickness: f32,
    color: Rgba<u8>,
    opacity: f32,
) {
    let half = thickness.max(1.0) / 2.0;
    let inner = (radius - half).max(0.0);
    let outer = radius + half;
    let reach = outer.ceil() as i32;
    for dy in -reach..=reach {
        for dx in -reach..=reach {
            let d = ((dx * dx + dy * dy) as f32).sqrt();
            if d >= inner && d <= outer {
                blend_pixel(
                    img,
                    center.0.saturating_add(dx),
                    center.1.saturating_add(dy),
                    color,
                    opacity,
                );
            }
        }
    }
}

pub fn fill_rect(img: &mut RgbaImage, x: i32, y: i32, w: u32, h: u32, color: Rgba<u8>, opacity: f32) {
    let (x0, y0) = (x.max(0), y.max(0));
    let x1 = x.saturating_add_unsigned(w).min(img.width() as i32);
    let y1 = y.saturating_add_unsigned(h).min(img.height() as i32);
    for py in y0..y1 {
        for px in x0..x1 {
            blend_pixel(img, px, py, color, opacity);
        }
    }
}

pub fn draw_rect_outline(
    img: &mut RgbaImage,
    x: i32,
    y: i32,
    w: u32,
    h: u32,
    thickness: u32,
    color: Rgba<u8>,
    opacity: f32,
) {
    let t = thickness.min(w / 2).min(h / 2).max(1);
    fill_rect(img, x, y, w, t, color, opacity);
    let inner_h = h.saturating_sub(2 * t);
    let bottom = y.saturating_add_unsigned(h.saturating_sub(t));
    let right = x.saturating_add_unsigned(w.saturating_sub(t));
    fill_rect(img, x, bottom, w, t, color, opacity);
    fill_rect(img, x, y.saturating_add_unsigned(t), t, inner_h, color, opacity);
    fill_rect(img, right, y.saturating_add_unsigned(t), t, inner_h, color, opacity);
}

/// Thick line made of overlapping discs. Each pixel is blended once.
pub fn draw_line(
    img: &mut RgbaImage,
    from: (i32, i32),
    to: (i32, i32),
    thickness: f32,
    color: Rgba<u8>,
    opacity: f32,
) {
    let r = f64::from((thickness.max(1.0) / 2.0).max(0.5));
    let (x0, y0) = (f64::from(from.0), f64::from(from.1));
    let (x1, y1) = (f64::from(to.0), f64::from(to.1));
    let (vx, vy) = (x1 - x0, y1 - y0);
    let len_sq = vx * vx + vy * vy;

    let reach = r.ceil() as i32;
    let min_x = from.0.min(to.0).saturating_sub(reach);
    let max_x = from.0.max(to.0).saturating_add(reach);
    let min_y = from.1.min(to.1).saturating_sub(reach);
    let max_y = from.1.max(to.1).saturating_add(reach);

    for py in min_y.max(0)..=max_y.min(img.height() as i32 - 1) {
        for px in min_x.max(0)..=max_x.min(img.width() as i32 - 1) {
            let (fx, fy) = (f64::from(px), f64::from(py));
            let t = if len_sq == 0.0 {
                0.0
            } else {
                (((fx - x0) * vx + (fy - y0) * vy) / len_sq).clamp(0.0, 1.0)
            };
            let (cx, cy) = (x0 + t * vx, y0 + t * vy);
            let (dx, dy) = (fx - cx, fy - cy);
            if dx * dx + dy * dy <= r * r {
                blend_pixel(img, px, py, color, opacity);
            }
        }
    }
}

/// Line with a two-stroke head at `to`
pub fn draw_arrow(
    img: &mut RgbaImage,
    from: (i32, i32),
    to: (i32, i32),
    thickness: f32,
    color: Rgba<u8>,
    opacity: f32,
) {
    draw_line(img, from, to, thickness, color, opacity);

    let (vx, vy) = (to.0 as f32 - from.0 as f32, to.1 as f32 - from.1 as f32);
    let len = (vx * vx + vy * vy).sqrt();
    if len == 0.0 {
        return;
    }
    let head = (len * 0.35).clamp(4.0, 14.0);
    let (ux, uy) = (vx / len, vy / len);
    for (sx, sy) in [(-uy, ux), (uy, -ux)] {
        let wing = (
            (to.0 as f32 - ux * head + sx * head * 0.6).round() as i32,
            (to.1 as f32 - uy * head + sy * head * 0.6).round() as i32,
        );
        draw_line(img, to, wing, thickness, color, opacity);
    }
}

/// Pixel size of `text` rendered at `scale`
pub fn text_size(text: &str, scale: u32) -> (u32, u32) {
    let chars = text.chars().count() as u32;
    if chars == 0 {
        return (0, 0);
    }
    let scale = scale.max(1);
    (
        (chars.saturating_mul(GLYPH_ADVANCE) - 1).saturating_mul(scale),
        GLYPH_HEIGHT * scale,
    )
}

/// Draw `text` with its top-left corner at (x, y). Characters outside
/// printable ASCII are drawn as `?`.
pub fn draw_text(img: &mut RgbaImage, x: i32, y: i32, text: &str, scale: u32, color: Rgba<u8>, opacity: f32) {
    let scale = scale.max(1) as i32;
    for (i, ch) in text.chars().enumerate() {
        let rows = glyph(ch);
        let advance = GLYPH_ADVANCE as i32 * scale;
        let origin_x = x.saturating_add((i as i32).saturating_mul(advance));
        for (row, &bits) in rows.iter().enumerate() {
            for col in 0..GLYPH_WIDTH as i32 {
                if (bits >> (GLYPH_WIDTH as i32 - 1 - col)) & 1 == 0 {
                    continue;
                }
                fill_rect(
                    img,
                    origin_x.saturating_add(col * scale),
                    y.saturating_add(row as i32 * scale),
                    scale as u32,
                    scale as u32,
                    color,
                    opacity,
                );
            }
        }
    }
}

fn glyph(ch: char) -> &'static [u8; 7] {
    let code = ch as u32;
    let index = if (32..128).contains(&code) { code - 32 } else { '?' as u32 - 32 };
    &FONT[index as usize]
}

/// 5x7 bitmap font for ASCII 32..=127; bit 4 is the leftmost column
const FONT: [[u8; 7]; 96] = [
    [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00], // ' '
    [0x04, 0x04, 0x04, 0x04, 0x04, 0x00, 0x04], // '!'
    [0x0a, 0x0a, 0x00, 0x00, 0x00, 0x00, 0x00], // '"'
    [0x0a, 0x1f, 0x0a, 0x0a, 0x1f, 0x0a, 0x00], // '#'
    [0x04, 0x0f, 0x14, 0x0e, 0x05, 0x1e, 0x04], // '$'
    [0x19, 0x1a, 0x04, 0x04, 0x0b, 0x13, 0x00], // '%'
    [0x0c, 0x12, 0x0c, 0x0d, 0x12, 0x0d, 0x00], // '&'
    [0x04, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00], // "'"
    [0x02, 0x04, 0x08, 0x08, 0x08, 0x04, 0x02], // '('
    [0x08, 0x04, 0x02, 0x02, 0x02, 0x04, 0x08], // ')'
    [0x00, 0x04, 0x15, 0x0e, 0x15, 0x04, 0x00], // '*'
    [0x00, 0x04, 0x04, 0x1f, 0x04, 0x04, 0x00], // '+'
    [0x00, 0x00, 0x00, 0x00, 0x00, 0x04, 0x08], // ','
    [0x00, 0x00, 0x00, 0x1f, 0x00, 0x00, 0x00], // '-'
    [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x04], // '.'
    [0x01, 0x02, 0x02, 0x04, 0x08, 0x08, 0x10], // '/'
    [0x0e, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0e], // '0'
    [0x04, 0x0c, 0x04, 0x04, 0x04, 0x04, 0x0e], // '1'
    [0x0e, 0x11, 0x01, 0x06, 0x08, 0x10, 0x1f], // '2'
    [0x0e, 0x11, 0x01, 0x06, 0x01, 0x11, 0x0e], // '3'
    [0x02, 0x06, 0x0a, 0x12, 0x1f, 0x02, 0x02], // '4'
    [0x1f, 0x10, 0x1e, 0x01, 0x01, 0x11, 0x0e], // '5'
    [0x06, 0x08, 0x10, 0x1e, 0x11, 0x11, 0x0e], // '6'
    [0x1f, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08], // '7'
    [0x0e, 0x11, 0x11, 0x0e, 0x11, 0x11, 0x0e], // '8'
    [0x0e, 0x11, 0x11, 0x0f, 0x01, 0x02, 0x0c], // '9'
    [0x00, 0x00, 0x04, 0x00, 0x00, 0x04, 0x00], // ':'
    [0x00, 0x00, 0x04, 0x00, 0x00, 0x04, 0x08], // ';'
    [0x02, 0x04, 0x08, 0x10, 0x08, 0x04, 0x02], // '<'
    [0x00, 0x00, 0x1f, 0x00, 0x1f, 0x00, 0x00], // '='
    [0x08, 0x04, 0x02, 0x01, 0x02, 0x04, 0x08], // '>'
    [0x0e, 0x11, 0x01, 0x06, 0x04, 0x00, 0x04], // '?'
    [0x0e, 0x11, 0x17, 0x15, 0x17, 0x10, 0x0e], // '@'
    [0x0e, 0x11, 0x11, 0x1f, 0x11, 0x11, 0x11], // 'A'
    [0x1e, 0x11, 0x11, 0x1e, 0x11, 0x11, 0x1e], // 'B'
    [0x0e, 0x11, 0x10, 0x10, 0x10, 0x11, 0x0e], // 'C'
    [0x1e, 0x11, 0x11, 0x11, 0x11, 0x11, 0x1e], // 'D'
    [0x1f, 0x10, 0x10, 0x1e, 0x10, 0x10, 0x1f], // 'E'
    [0x1f, 0x10, 0x10, 0x1e, 0x10, 0x10, 0x10], // 'F'
    [0x0e, 0x11, 0x10, 0x17, 0x11, 0x11, 0x0f], // 'G'
    [0x11, 0x11, 0x11, 0x1f, 0x11, 0x11, 0x11], // 'H'
    [0x0e, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0e], // 'I'
    [0x07, 0x02, 0x02, 0x02, 0x02, 0x12, 0x0c], // 'J'
    [0x11, 0x12, 0x14, 0x18, 0x14, 0x12, 0x11], // 'K'
    [0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x1f], // 'L'
    [0x11, 0x1b, 0x15, 0x15, 0x11, 0x11, 0x11], // 'M'
    [0x11, 0x19, 0x15, 0x13, 0x11, 0x11, 0x11], // 'N'
    [0x0e, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0e], // 'O'
    [0x1e, 0x11, 0x11, 0x1e, 0x10, 0x10, 0x10], // 'P'
    [0x0e, 0x11, 0x11, 0x11, 0x15, 0x12, 0x0d], // 'Q'
    [0x1e, 0x11, 0x11, 0x1e, 0x14, 0x12, 0x11], // 'R'
    [0x0e, 0x11, 0x10, 0x0e, 0x01, 0x11, 0x0e], // 'S'
    [0x1f, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04], // 'T'
    [0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0e], // 'U'
    [0x11, 0x11, 0x11, 0x11, 0x11, 0x0a, 0x04], // 'V'
    [0x11, 0x11, 0x11, 0x15, 0x15, 0x1b, 0x11], // 'W'
    [0x11, 0x11, 0x0a, 0x04, 0x0a, 0x11, 0x11], // 'X'
    [0x11, 0x11, 0x0a, 0x04, 0x04, 0x04, 0x04], // 'Y'
    [0x1f, 0x01, 0x02, 0x04, 0x08, 0x10, 0x1f], // 'Z'
    [0x0e, 0x08, 0x08, 0x08, 0x08, 0x08, 0x0e], // '['
    [0x10, 0x08, 0x08, 0x04, 0x02, 0x02, 0x01], // '\\'
    [0x0e, 0x02, 0x02, 0x02, 0x02, 0x02, 0x0e], // ']'
    [0x04, 0x0a, 0x11, 0x00, 0x00, 0x00, 0x00], // '^'
    [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x1f], // '_'
    [0x08, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00], // '`'
    [0x00, 0x00, 0x0e, 0x01, 0x0f, 0x11, 0x0f], // 'a'
    [0x10, 0x10, 0x1e, 0x11, 0x11, 0x11, 0x1e], // 'b'
    [0x00, 0x00, 0x0e, 0x10, 0x10, 0x10, 0x0e], // 'c'
    [0x01, 0x01, 0x0f, 0x11, 0x11, 0x11, 0x0f], // 'd'
    [0x00, 0x00, 0x0e, 0x11, 0x1f, 0x10, 0x0e], // 'e'
    [0x06, 0x09, 0x08, 0x1e, 0x08, 0x08, 0x08], // 'f'
    [0x00, 0x00, 0x0f, 0x11, 0x0f, 0x01, 0x0e], // 'g'
    [0x10, 0x10, 0x1e, 0x11, 0x11, 0x11, 0x11], // 'h'
    [0x04, 0x00, 0x0c, 0x04, 0x04, 0x04, 0x0e], // 'i'
    [0x02, 0x00, 0x06, 0x02, 0x02, 0x12, 0x0c], // 'j'
    [0x10, 0x10, 0x12, 0x14, 0x18, 0x14, 0x12], // 'k'
    [0x0c, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0e], // 'l'
    [0x00, 0x00, 0x1a, 0x15, 0x15, 0x15, 0x11], // 'm'
    [0x00, 0x00, 0x1e, 0x11, 0x11, 0x11, 0x11], // 'n'
    [0x00, 0x00, 0x0e, 0x11, 0x11, 0x11, 0x0e], // 'o'
    [0x00, 0x00, 0x1e, 0x11, 0x1e, 0x10, 0x10], // 'p'
    [0x00, 0x00, 0x0f, 0x11, 0x0f, 0x01, 0x01], // 'q'
    [0x00, 0x00, 0x16, 0x19, 0x10, 0x10, 0x10], // 'r'
    [0x00, 0x00, 0x0f, 0x10, 0x0e, 0x01, 0x1e], // 's'
    [0x04, 0x04, 0x0e, 0x04, 0x04, 0x04, 0x03], // 't'
    [0x00, 0x00, 0x11, 0x11, 0x11, 0x11, 0x0f], // 'u'
    [0x00, 0x00, 0x11, 0x11, 0x11, 0x0a, 0x04], // 'v'
    [0x00, 0x00, 0x11, 0x15, 0x15, 0x15, 0x0a], // 'w'
    [0x00, 0x00, 0x11, 0x0a, 0x04, 0x0a, 0x11], // 'x'
    [0x00, 0x00, 0x11, 0x11, 0x0f, 0x01, 0x0e], // 'y'
    [0x00, 0x00, 0x1f, 0x02, 0x04, 0x08, 0x1f], // 'z'
    [0x03, 0x04, 0x04, 0x08, 0x04, 0x04, 0x03], // '{'
    [0x04, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04], // '|'
    [0x18, 0x04, 0x04, 0x02, 0x04, 0x04, 0x18], // '}'
    [0x00, 0x00, 0x08, 0x15, 0x02, 0x00, 0x00], // '~'
    [0x1f, 0x1f, 0x1f, 0x1f, 0x1f, 0x1f, 0x1f], // '\x7f'
];
