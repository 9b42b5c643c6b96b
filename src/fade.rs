/*
 *  fade.rs
 *
 *  shiftwall - keep the watch
 *  (c) 2024-26 shiftwall authors
 *
 *  Crossfade state machine: decides per wake whether to settle, start a
 *  fade, continue one, or recover from a corrupt transition
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

use chrono::{DateTime, TimeDelta, Utc};
use log::{debug, warn};

use crate::shift::Shift;

/// How long a crossfade between two shifts takes.
pub const FADE_DURATION_MS: i64 = 1000;

/// Deadline sentinel meaning "no fade in progress".  Any past instant
/// works; the epoch is conveniently const.
const FADE_IDLE: DateTime<Utc> = DateTime::UNIX_EPOCH;

/// What one wake should put on screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FramePlan {
    /// Banner drawn first, at full opacity.
    pub base: Shift,
    /// Banner composited on top, with its ramp alpha.  `None` when settled.
    pub overlay: Option<(Shift, f32)>,
    /// `Some(shift)` when this wake left the machine settled; the scheduler
    /// reports the palette and drops to the hourly cadence.  `None` while a
    /// fade is running (frame cadence).
    pub settled: Option<Shift>,
}

impl FramePlan {
    fn settled(shift: Shift) -> Self {
        FramePlan { base: shift, overlay: None, settled: Some(shift) }
    }

    fn fading(from: Shift, to: Shift, alpha: f32) -> Self {
        FramePlan { base: from, overlay: Some((to, alpha)), settled: None }
    }
}

/// Crossfade bookkeeping for one render surface.
///
/// Invariant: `last_drawn == target` exactly when no fade is active, and
/// then `fade_ends_at` holds the idle sentinel.  While fading the deadline
/// is in the future until the instant it elapses.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Crossfade {
    last_drawn: Shift,
    target: Shift,
    fade_ends_at: DateTime<Utc>,
}

impl Default for Crossfade {
    fn default() -> Self {
        Self::new()
    }
}

impl Crossfade {
    /// A fresh surface has no visual history.
    pub fn new() -> Self {
        Crossfade {
            last_drawn: Shift::Unset,
            target: Shift::Unset,
            fade_ends_at: FADE_IDLE,
        }
    }

    /// Drop all history, as on surface recreation or corruption recovery.
    pub fn reset(&mut self) {
        *self = Crossfade::new();
    }

    pub fn last_drawn(&self) -> Shift {
        self.last_drawn
    }

    pub fn target(&self) -> Shift {
        self.target
    }

    pub fn is_fading(&self) -> bool {
        self.last_drawn != self.target
    }

    fn settle_on(&mut self, shift: Shift) {
        self.last_drawn = shift;
        self.target = shift;
        self.fade_ends_at = FADE_IDLE;
    }

    /// One tick of the machine: given the shift the clock (and override)
    /// actually resolve to right now, mutate state and say what to draw.
    pub fn advance(&mut self, real: Shift, now: DateTime<Utc>) -> FramePlan {
        debug_assert!(real != Shift::Unset, "resolved shift is never the sentinel");

        // Three pairwise-distinct shifts inside an active fade means the
        // shift changed twice faster than one fade window.  Anomalous but
        // not fatal; drop history and re-derive from scratch.
        if self.is_fading() && real != self.target && real != self.last_drawn {
            warn!(
                "shift moved twice within one fade (last drawn {}, fading to {}, clock says {}); resetting",
                self.last_drawn, self.target, real
            );
            self.reset();
        }

        if self.last_drawn == Shift::Unset {
            // First draw on this surface.  A fade from nothing is not
            // meaningful; settle directly.
            debug!("initial draw, settling on {real}");
            self.settle_on(real);
            return FramePlan::settled(real);
        }

        if self.last_drawn == real {
            if self.is_fading() {
                // The clock swung back to the banner already on screen
                // before the fade finished.  Nothing to fade to.
                debug!("fade toward {} abandoned, clock is back on {real}", self.target);
                self.settle_on(real);
            }
            return FramePlan::settled(real);
        }

        // Crossfading toward `real`.
        if self.fade_ends_at <= now && self.target != real {
            // Either a brand-new fade out of a settled state, or a stale
            // window that ran out before we saw it finish.  Both restart
            // the window from now; progress from an earlier fade is not
            // preserved, so a restart is visible.
            self.target = real;
            self.fade_ends_at = now + TimeDelta::milliseconds(FADE_DURATION_MS);
            debug!("fading {} -> {} until {}", self.last_drawn, self.target, self.fade_ends_at);
        }

        if self.fade_ends_at <= now {
            // Window elapsed: adopt whatever the clock says now.
            debug!("fade complete, settling on {real}");
            self.settle_on(real);
            return FramePlan::settled(real);
        }

        self.target = real;
        let alpha = fade_alpha(self.fade_ends_at, now);
        FramePlan::fading(self.last_drawn, self.target, alpha)
    }
}

/// Linear opacity ramp of the incoming banner: 0 at fade start, 1 at the
/// deadline, clamped outside that window.
pub fn fade_alpha(ends_at: DateTime<Utc>, now: DateTime<Utc>) -> f32 {
    let remaining = (ends_at - now).num_milliseconds();
    let progressed = (FADE_DURATION_MS - remaining) as f32 / FADE_DURATION_MS as f32;
    progressed.clamp(0.0, 1.0)
}
