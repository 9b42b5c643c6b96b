/*
 *  draw.rs
 *
 *  shiftwall - keep the watch
 *  (c) 2024-26 shiftwall authors
 *
 *  Painting one shift onto a frame: background flood plus the banner
 *  scaled to the frame height and centered, with alpha compositing for
 *  the crossfade
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyleBuilder, Rectangle};
use thiserror::Error;

use crate::shift::{BannerArt, Shift, background_color, banner_art};
use crate::surface::FrameBuf;

#[derive(Debug, Error)]
pub enum DrawError {
    #[error("no banner art for shift {0}")]
    MissingBanner(Shift),
}

/// Clamp a 0..1 float alpha to the 0..255 blend weight the pixel loops use.
#[inline]
fn alpha_to_weight(alpha: f32) -> u8 {
    (255.0 * alpha.clamp(0.0, 1.0)).round() as u8
}

/// Linear per-channel blend of `src` over `dst` at weight `a` (0..255).
#[inline]
fn blend_px(dst: Rgb888, src: Rgb888, a: u8) -> Rgb888 {
    let mix = |d: u8, s: u8| -> u8 {
        ((d as u16 * (255 - a) as u16 + s as u16 * a as u16 + 127) / 255) as u8
    };
    Rgb888::new(mix(dst.r(), src.r()), mix(dst.g(), src.g()), mix(dst.b(), src.b()))
}

/// Flood a rectangular region with `color` at the given weight, blending
/// over whatever is already in the frame.  Opaque fills go through the
/// styled-rectangle path; translucent ones read-modify-write.
fn fill_region(frame: &mut FrameBuf, region: Rectangle, color: Rgb888, a: u8) {
    if a == 0 {
        return;
    }
    if a == 255 {
        // Infallible target, the error leg cannot happen.
        let _ = region
            .into_styled(PrimitiveStyleBuilder::new().fill_color(color).build())
            .draw(frame);
        return;
    }
    let (w, h) = (frame.width() as i32, frame.height() as i32);
    let x0 = region.top_left.x.max(0);
    let y0 = region.top_left.y.max(0);
    let x1 = (region.top_left.x + region.size.width as i32).min(w);
    let y1 = (region.top_left.y + region.size.height as i32).min(h);
    if x0 >= x1 || y0 >= y1 {
        return;
    }
    let stride = frame.width();
    let buf = frame.as_mut_slice();
    for y in y0..y1 {
        let row = y as usize * stride;
        for x in x0..x1 {
            let i = row + x as usize;
            buf[i] = blend_px(buf[i], color, a);
        }
    }
}

/// Flood the whole frame with a background color.
pub fn fill_background(frame: &mut FrameBuf, color: Rgb888, alpha: f32) {
    let size = frame.size();
    fill_region(frame, Rectangle::new(Point::zero(), size), color, alpha_to_weight(alpha));
}

/// Banner placement for a given frame: scaled to the full frame height,
/// preserving the intrinsic aspect ratio, horizontally centered.
pub fn banner_bounds(art: &BannerArt, frame_width: u32, frame_height: u32) -> Rectangle {
    let scaled_width = (frame_height as f32 * art.aspect()).round() as i32;
    let left = (frame_width as i32 - scaled_width) / 2;
    Rectangle::new(
        Point::new(left, 0),
        Size::new(scaled_width.max(0) as u32, frame_height),
    )
}

/// Draw the banner bands into their scaled, centered bounds.
pub fn draw_banner(frame: &mut FrameBuf, art: &BannerArt, alpha: f32) {
    let a = alpha_to_weight(alpha);
    if a == 0 {
        return;
    }
    let (fw, fh) = (frame.width() as u32, frame.height() as u32);
    let bounds = banner_bounds(art, fw, fh);

    let total_weight: u32 = art.bands.iter().map(|(_, w)| *w).sum();
    if total_weight == 0 {
        return;
    }
    let mut cursor = 0u32;
    for (color, weight) in art.bands {
        let y0 = (fh as u64 * cursor as u64 / total_weight as u64) as i32;
        cursor += weight;
        let y1 = (fh as u64 * cursor as u64 / total_weight as u64) as i32;
        if y1 <= y0 {
            continue;
        }
        fill_region(
            frame,
            Rectangle::new(
                Point::new(bounds.top_left.x, y0),
                Size::new(bounds.size.width, (y1 - y0) as u32),
            ),
            *color,
            a,
        );
    }
}

/// Paint one shift layer: background flood, then the banner on top, both
/// at the same layer alpha (the crossfade composites two of these).
pub fn paint_shift(
    frame: &mut FrameBuf,
    shift: Shift,
    alpha: f32,
    bee_shed: bool,
) -> Result<(), DrawError> {
    let bg = background_color(shift, bee_shed).ok_or(DrawError::MissingBanner(shift))?;
    fill_background(frame, bg, alpha);
    let art = banner_art(shift, bee_shed).ok_or(DrawError::MissingBanner(shift))?;
    draw_banner(frame, art, alpha);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blend_endpoints() {
        let d = Rgb888::new(10, 20, 30);
        let s = Rgb888::new(200, 100, 50);
        assert_eq!(blend_px(d, s, 0), d);
        assert_eq!(blend_px(d, s, 255), s);
    }

    #[test]
    fn test_blend_midpoint() {
        let mixed = blend_px(Rgb888::new(0, 0, 0), Rgb888::new(255, 255, 255), 128);
        assert!(mixed.r() >= 127 && mixed.r() <= 129);
    }

    #[test]
    fn test_fill_background_translucent() {
        let mut fb = FrameBuf::new(4, 4, Rgb888::BLACK);
        fill_background(&mut fb, Rgb888::new(255, 255, 255), 0.5);
        let px = fb.pixel(0, 0).unwrap();
        assert!(px.r() >= 126 && px.r() <= 129);
    }

    #[test]
    fn test_banner_bounds_centered_and_full_height() {
        let art = BannerArt {
            intrinsic_width: 450,
            intrinsic_height: 800,
            bands: &[(Rgb888::BLACK, 1)],
        };
        // 800 tall frame: banner keeps its intrinsic width, centered.
        let bounds = banner_bounds(&art, 1280, 800);
        assert_eq!(bounds.size.height, 800);
        assert_eq!(bounds.size.width, 450);
        assert_eq!(bounds.top_left.x, (1280 - 450) / 2);

        // Half-height frame scales the width with it.
        let bounds = banner_bounds(&art, 1280, 400);
        assert_eq!(bounds.size.width, 225);
    }

    #[test]
    fn test_paint_shift_fills_frame() {
        let mut fb = FrameBuf::new(64, 32, Rgb888::BLACK);
        paint_shift(&mut fb, Shift::ZetaShift, 1.0, false).unwrap();
        let bg = background_color(Shift::ZetaShift, false).unwrap();
        // Far left edge is outside the banner: pure background.
        assert_eq!(fb.pixel(0, 0), Some(bg));
    }

    #[test]
    fn test_paint_unset_is_an_error() {
        let mut fb = FrameBuf::new(8, 8, Rgb888::BLACK);
        assert!(matches!(
            paint_shift(&mut fb, Shift::Unset, 1.0, false),
            Err(DrawError::MissingBanner(Shift::Unset))
        ));
    }

    #[test]
    fn test_zero_alpha_leaves_frame_untouched() {
        let mut fb = FrameBuf::new(8, 8, Rgb888::new(1, 2, 3));
        paint_shift(&mut fb, Shift::DawnGuard, 0.0, false).unwrap();
        assert_eq!(fb.pixel(4, 4), Some(Rgb888::new(1, 2, 3)));
    }
}
