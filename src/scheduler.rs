/*
 *  scheduler.rs
 *
 *  shiftwall - keep the watch
 *  (c) 2024-26 shiftwall authors
 *
 *  Render scheduler: one wake entry point, driven by its own timer and by
 *  surface lifecycle events, feeding the crossfade machine and planning
 *  the next wakeup (top of the hour when settled, frame cadence mid-fade)
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

use chrono::{DateTime, Utc};
use log::{debug, error, info};
use std::time::Duration;
use tokio::sync::{mpsc, watch};

use crate::draw::{DrawError, paint_shift};
use crate::fade::{Crossfade, FramePlan};
use crate::shift::{Shift, ShiftPalette, TimezonePolicy, palette_for, resolve_shift, until_next_hour};
use crate::surface::{BannerSurface, FrameBuf};

/// Redraw cadence while a fade is running (30 fps).
pub const FRAME_INTERVAL: Duration = Duration::from_millis(1000 / 30);

pub type BoxedSurface = Box<dyn BannerSurface>;

/// Everything that can poke the scheduler from outside its own timer.
/// The state machine only ever reacts to messages it dequeues itself;
/// nothing mutates scheduler state from another task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    /// A new surface attached; prior visual history is meaningless.
    SurfaceCreated,
    /// The surface changed identity (rotation, resize).
    SurfaceChanged,
    VisibilityChanged(bool),
    /// The omega poller flipped the override flag.
    OmegaChanged(bool),
    Shutdown,
}

pub struct RenderScheduler {
    surface: BoxedSurface,
    fade: Crossfade,
    policy: TimezonePolicy,
    bee_shed: bool,
    override_active: bool,
    visible: bool,
    /// At most one pending wake; every wake (or event) replaces it, so
    /// paints can never pile up or overlap.
    next_wake: Option<tokio::time::Instant>,
    events_tx: mpsc::Sender<EngineEvent>,
    events_rx: mpsc::Receiver<EngineEvent>,
    omega_kick: Option<mpsc::Sender<()>>,
    palette_tx: watch::Sender<Option<ShiftPalette>>,
}

impl RenderScheduler {
    pub fn new(surface: BoxedSurface, policy: TimezonePolicy, bee_shed: bool) -> Self {
        let (events_tx, events_rx) = mpsc::channel(16);
        let (palette_tx, _) = watch::channel(None);
        RenderScheduler {
            surface,
            fade: Crossfade::new(),
            policy,
            bee_shed,
            override_active: false,
            visible: false,
            next_wake: None,
            events_tx,
            events_rx,
            omega_kick: None,
            palette_tx,
        }
    }

    /// Sender half of the inbox, for lifecycle hosts and the poller.
    pub fn events(&self) -> mpsc::Sender<EngineEvent> {
        self.events_tx.clone()
    }

    /// Wire the omega poller's kick channel so surface events can nudge a
    /// debounce-eligible check.
    pub fn set_omega_kick(&mut self, kick: mpsc::Sender<()>) {
        self.omega_kick = Some(kick);
    }

    /// Ambient palette hook: receives the settle palette after every
    /// completed settle, `None` until the first one.
    pub fn palette_watch(&self) -> watch::Receiver<Option<ShiftPalette>> {
        self.palette_tx.subscribe()
    }

    pub fn override_active(&self) -> bool {
        self.override_active
    }

    pub fn last_drawn(&self) -> Shift {
        self.fade.last_drawn()
    }

    pub fn has_pending_wake(&self) -> bool {
        self.next_wake.is_some()
    }

    /// Run until shutdown.  Single task: the timer arm and the inbox arm
    /// both resolve into plain method calls on `self`.
    pub async fn run(mut self) {
        info!("render scheduler running");
        loop {
            let wake_at = self.next_wake;
            tokio::select! {
                _ = async {
                    match wake_at {
                        Some(at) => tokio::time::sleep_until(at).await,
                        None => std::future::pending().await,
                    }
                } => {
                    self.on_wake(Utc::now());
                }
                ev = self.events_rx.recv() => {
                    match ev {
                        None | Some(EngineEvent::Shutdown) => {
                            info!("render scheduler stopping");
                            break;
                        }
                        Some(ev) => self.on_event_at(ev, Utc::now()),
                    }
                }
            }
        }
    }

    pub fn handle_event(&mut self, ev: EngineEvent) {
        self.on_event_at(ev, Utc::now());
    }

    /// Event entry point with an explicit clock, used directly by tests.
    pub fn on_event_at(&mut self, ev: EngineEvent, now: DateTime<Utc>) {
        match ev {
            EngineEvent::SurfaceCreated => {
                // Visibility is tracked only through its own event; a
                // surface can attach while the host still reports hidden.
                // The attach wake paints once either way.
                info!("surface created");
                self.fade.reset();
                self.kick_omega();
                self.on_wake(now);
            }
            EngineEvent::SurfaceChanged => {
                // Rotation or resize: no guarantee a visibility change
                // follows, so redraw and re-arm here.  Worst case we paint
                // one extra frame.
                debug!("surface changed");
                self.fade.reset();
                self.kick_omega();
                self.on_wake(now);
            }
            EngineEvent::VisibilityChanged(visible) => {
                debug!("visibility -> {visible}");
                self.visible = visible;
                if visible {
                    self.kick_omega();
                    self.on_wake(now);
                } else {
                    // Stop all callbacks while hidden.
                    self.next_wake = None;
                }
            }
            EngineEvent::OmegaChanged(active) => {
                debug!("omega override -> {active}");
                self.override_active = active;
                self.on_wake(now);
            }
            EngineEvent::Shutdown => {
                // run() consumes this before dispatching here.
                self.next_wake = None;
            }
        }
    }

    /// One wake: resolve the shift, advance the fade, paint, plan the
    /// next wake.  Returns the planned delay (None while hidden), which
    /// the tests lean on.
    pub fn on_wake(&mut self, now: DateTime<Utc>) -> Option<Duration> {
        // This wake consumes any previously pending one.
        self.next_wake = None;

        let real = resolve_shift(now, self.policy, self.override_active);
        let plan = self.fade.advance(real, now);

        if let Err(e) = self.paint(&plan) {
            // Fatal to this paint only; the cadence continues.
            error!("paint failed, frame skipped: {e}");
        }

        let delay = match plan.settled {
            Some(shift) => {
                self.notify_palette(shift);
                until_next_hour(now, self.policy)
            }
            None => FRAME_INTERVAL,
        };

        if !self.visible {
            debug!("surface not visible, not rescheduling");
            return None;
        }
        debug!("next wake in {delay:?}");
        self.next_wake = Some(tokio::time::Instant::now() + delay);
        Some(delay)
    }

    fn paint(&mut self, plan: &FramePlan) -> Result<(), DrawError> {
        let Some(mut frame) = self.surface.lock_frame() else {
            debug!("no drawable frame, skipping paint");
            return Ok(());
        };
        let result = self.render_into(&mut frame, plan);
        // Present whatever was painted, complete or not.
        self.surface.present_frame(frame);
        result
    }

    fn render_into(&self, frame: &mut FrameBuf, plan: &FramePlan) -> Result<(), DrawError> {
        paint_shift(frame, plan.base, 1.0, self.bee_shed)?;
        if let Some((top, alpha)) = plan.overlay {
            paint_shift(frame, top, alpha, self.bee_shed)?;
        }
        Ok(())
    }

    fn notify_palette(&self, shift: Shift) {
        if let Some(palette) = palette_for(shift, self.bee_shed) {
            let _ = self.palette_tx.send_replace(Some(palette));
        }
    }

    fn kick_omega(&self) {
        if let Some(kick) = &self.omega_kick {
            let _ = kick.try_send(());
        }
    }
}
