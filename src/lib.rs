/*
 *  lib.rs
 *
 *  shiftwall - keep the watch
 *  (c) 2024-26 shiftwall authors
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

//! Shift-schedule banner wallpaper engine.
//!
//! The daemon tracks the current shift from the wall clock, crossfades
//! the banner whenever the shift changes, and runs a debounced network
//! poller for the Omega override.

pub mod config;
pub mod draw;
pub mod fade;
pub mod omega;
pub mod scheduler;
pub mod shift;
pub mod surface;

pub use fade::{Crossfade, FramePlan, FADE_DURATION_MS};
pub use scheduler::{EngineEvent, RenderScheduler, FRAME_INTERVAL};
pub use shift::{Shift, TimezonePolicy};
pub use surface::{BannerSurface, FrameBuf, MemorySurface};
