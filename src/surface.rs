/*
 *  surface.rs
 *
 *  shiftwall - keep the watch
 *  (c) 2024-26 shiftwall authors
 *
 *  Render-surface abstraction: the frame type, the surface trait, and an
 *  in-memory surface for tests and headless runs
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

use core::convert::Infallible;
use embedded_graphics::geometry::{OriginDimensions, Size};
use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use std::sync::{Arc, Mutex};

/// A runtime-sized RGB framebuffer for embedded-graphics.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameBuf {
    buf: Vec<Rgb888>,
    w: usize,
    h: usize,
}

impl FrameBuf {
    pub fn new(width: u32, height: u32, fill: Rgb888) -> Self {
        let (w, h) = (width as usize, height as usize);
        Self { buf: vec![fill; w * h], w, h }
    }

    pub fn width(&self) -> usize { self.w }
    pub fn height(&self) -> usize { self.h }

    /// Immutable raw access
    pub fn as_slice(&self) -> &[Rgb888] { &self.buf }

    /// Mutable raw access (the blend paths read-modify-write pixels)
    pub fn as_mut_slice(&mut self) -> &mut [Rgb888] { &mut self.buf }

    pub fn pixel(&self, x: usize, y: usize) -> Option<Rgb888> {
        if x < self.w && y < self.h {
            Some(self.buf[y * self.w + x])
        } else {
            None
        }
    }

    /// Map (x,y) to linear index; returns None if out of bounds
    #[inline]
    fn idx(&self, p: Point) -> Option<usize> {
        if p.x >= 0 && p.y >= 0 {
            let (x, y) = (p.x as usize, p.y as usize);
            if x < self.w && y < self.h {
                return Some(y * self.w + x);
            }
        }
        None
    }
}

impl OriginDimensions for FrameBuf {
    fn size(&self) -> Size {
        Size::new(self.w as u32, self.h as u32)
    }
}

impl DrawTarget for FrameBuf {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(p, c) in pixels {
            if let Some(i) = self.idx(p) {
                self.buf[i] = c;
            }
        }
        Ok(())
    }
}

/// The display surface the scheduler paints onto.  The surface lifecycle
/// (creation, destruction, resize, visibility) is owned by whoever hosts
/// the engine; the scheduler only locks, draws, and presents.
pub trait BannerSurface: Send {
    /// Surface dimensions as (width, height).
    fn dimensions(&self) -> (u32, u32);

    /// Borrow a drawable frame, or `None` if the surface cannot currently
    /// provide one (mid-teardown, for instance).  A `None` frame skips the
    /// paint; it is not an error.
    fn lock_frame(&mut self) -> Option<FrameBuf>;

    /// Push a finished frame to the surface.
    fn present_frame(&mut self, frame: FrameBuf);
}

/// In-memory surface.  Serves headless runs and doubles as the test
/// double; the shared state records every operation for inspection.
#[derive(Debug, Clone)]
pub struct MemorySurface {
    width: u32,
    height: u32,
    state: Arc<Mutex<MemorySurfaceState>>,
}

/// Internal state for the memory surface (shared for inspection in tests)
#[derive(Debug, Default)]
pub struct MemorySurfaceState {
    /// Number of times lock_frame() handed out a frame
    pub lock_count: usize,

    /// Number of times present_frame() was called
    pub present_count: usize,

    /// The most recently presented frame
    pub last_frame: Option<FrameBuf>,

    /// When set, lock_frame() returns None (simulates a torn-down surface)
    pub refuse_lock: bool,
}

impl MemorySurface {
    pub fn new(width: u32, height: u32) -> Self {
        MemorySurface {
            width,
            height,
            state: Arc::new(Mutex::new(MemorySurfaceState::default())),
        }
    }

    /// Handle to the shared state, for assertions.
    pub fn state(&self) -> Arc<Mutex<MemorySurfaceState>> {
        Arc::clone(&self.state)
    }
}

impl BannerSurface for MemorySurface {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn lock_frame(&mut self) -> Option<FrameBuf> {
        let mut state = self.state.lock().unwrap();
        if state.refuse_lock {
            return None;
        }
        state.lock_count += 1;
        Some(FrameBuf::new(self.width, self.height, Rgb888::BLACK))
    }

    fn present_frame(&mut self, frame: FrameBuf) {
        let mut state = self.state.lock().unwrap();
        state.present_count += 1;
        state.last_frame = Some(frame);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::primitives::{PrimitiveStyleBuilder, Rectangle};

    #[test]
    fn test_framebuf_draws_and_clips() {
        let mut fb = FrameBuf::new(8, 4, Rgb888::BLACK);
        Rectangle::new(Point::new(6, 2), Size::new(4, 4))
            .into_styled(PrimitiveStyleBuilder::new().fill_color(Rgb888::WHITE).build())
            .draw(&mut fb)
            .unwrap();
        assert_eq!(fb.pixel(6, 2), Some(Rgb888::WHITE));
        assert_eq!(fb.pixel(7, 3), Some(Rgb888::WHITE));
        assert_eq!(fb.pixel(5, 2), Some(Rgb888::BLACK));
        // Out of bounds reads are None, out of bounds writes were clipped.
        assert_eq!(fb.pixel(8, 2), None);
    }

    #[test]
    fn test_memory_surface_records_presents() {
        let mut surface = MemorySurface::new(16, 8);
        let state = surface.state();

        let frame = surface.lock_frame().expect("lockable");
        surface.present_frame(frame);

        let st = state.lock().unwrap();
        assert_eq!(st.lock_count, 1);
        assert_eq!(st.present_count, 1);
        assert!(st.last_frame.is_some());
    }

    #[test]
    fn test_memory_surface_can_refuse_lock() {
        let mut surface = MemorySurface::new(16, 8);
        surface.state().lock().unwrap().refuse_lock = true;
        assert!(surface.lock_frame().is_none());
    }
}
