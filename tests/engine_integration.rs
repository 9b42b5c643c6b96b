/*
 *  tests/engine_integration.rs
 *
 *  End-to-end engine tests: lifecycle events in, presented frames out.
 *
 *  shiftwall - keep the watch
 *  (c) 2024-26 shiftwall authors
 */

use chrono::TimeDelta;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use shiftwall::shift::{background_color, palette_for, reference_time};
use shiftwall::surface::MemorySurfaceState;
use shiftwall::{
    EngineEvent, MemorySurface, RenderScheduler, Shift, TimezonePolicy, FRAME_INTERVAL,
};

const WIDTH: u32 = 96;
const HEIGHT: u32 = 48;

fn engine(bee_shed: bool) -> (RenderScheduler, Arc<Mutex<MemorySurfaceState>>) {
    let surface = MemorySurface::new(WIDTH, HEIGHT);
    let state = surface.state();
    let sched = RenderScheduler::new(Box::new(surface), TimezonePolicy::Reference, bee_shed);
    (sched, state)
}

/// The host lifecycle order: surface first, then it becomes visible.
fn attach(sched: &mut RenderScheduler, now: chrono::DateTime<chrono::Utc>) {
    sched.on_event_at(EngineEvent::SurfaceCreated, now);
    sched.on_event_at(EngineEvent::VisibilityChanged(true), now);
}

/// Background pixel of the most recently presented frame.  The banner is
/// centered and narrower than the frame, so (0, 0) is always flood fill.
fn corner_pixel(state: &Arc<Mutex<MemorySurfaceState>>) -> embedded_graphics::pixelcolor::Rgb888 {
    state
        .lock()
        .unwrap()
        .last_frame
        .as_ref()
        .expect("a frame was presented")
        .pixel(0, 0)
        .unwrap()
}

#[tokio::test]
async fn test_full_day_walkthrough() {
    // Drive the scheduler through every boundary of a day and check the
    // settled shift and background after each fade runs out.
    let (mut sched, state) = engine(false);

    attach(&mut sched, reference_time(2026, 3, 10, 0, 0, 0));
    assert_eq!(sched.last_drawn(), Shift::ZetaShift);

    for (hour, expected) in [
        (6u32, Shift::DawnGuard),
        (12, Shift::AlphaFlight),
        (18, Shift::NightWatch),
    ] {
        let boundary = reference_time(2026, 3, 10, hour, 0, 0);
        assert_eq!(sched.on_wake(boundary).unwrap(), FRAME_INTERVAL);

        // Walk the frame cadence until the fade deadline passes.
        let mut t = boundary;
        loop {
            t += TimeDelta::milliseconds(33);
            if sched.on_wake(t).unwrap() != FRAME_INTERVAL {
                break;
            }
        }
        assert_eq!(sched.last_drawn(), expected);
        assert_eq!(
            corner_pixel(&state),
            background_color(expected, false).unwrap()
        );
    }
}

#[tokio::test]
async fn test_mid_fade_frame_blends_backgrounds() {
    let (mut sched, state) = engine(false);
    attach(&mut sched, reference_time(2026, 3, 10, 11, 30, 0));
    let old_bg = background_color(Shift::DawnGuard, false).unwrap();
    let new_bg = background_color(Shift::AlphaFlight, false).unwrap();

    let noon = reference_time(2026, 3, 10, 12, 0, 0);
    sched.on_wake(noon);
    // Halfway through the crossfade the flood fill is a mix of the two
    // backgrounds, not either endpoint.
    sched.on_wake(noon + TimeDelta::milliseconds(500));
    let px = corner_pixel(&state);
    assert_ne!(px, old_bg);
    assert_ne!(px, new_bg);

    // Past the deadline it lands exactly on the new background.
    sched.on_wake(noon + TimeDelta::milliseconds(1100));
    assert_eq!(corner_pixel(&state), new_bg);
}

#[tokio::test]
async fn test_omega_override_round_trip() {
    // An override flip fades into Omega from whatever is on screen, and a
    // mid-fade clear falls straight back to the clock's shift.
    let (mut sched, state) = engine(false);
    let evening = reference_time(2026, 11, 14, 20, 0, 0);
    attach(&mut sched, evening);
    assert_eq!(sched.last_drawn(), Shift::NightWatch);

    let t = evening + TimeDelta::minutes(5);
    sched.on_event_at(EngineEvent::OmegaChanged(true), t);
    assert!(sched.override_active());

    let mut t2 = t;
    loop {
        t2 += TimeDelta::milliseconds(33);
        if sched.on_wake(t2).unwrap() != FRAME_INTERVAL {
            break;
        }
    }
    assert_eq!(sched.last_drawn(), Shift::OmegaShift);
    assert_eq!(
        corner_pixel(&state),
        background_color(Shift::OmegaShift, false).unwrap()
    );

    // Clearing the override fades back out again.
    let t3 = t2 + TimeDelta::minutes(1);
    sched.on_event_at(EngineEvent::OmegaChanged(false), t3);
    let mut t4 = t3;
    loop {
        t4 += TimeDelta::milliseconds(33);
        if sched.on_wake(t4).unwrap() != FRAME_INTERVAL {
            break;
        }
    }
    assert_eq!(sched.last_drawn(), Shift::NightWatch);
}

#[tokio::test]
async fn test_bee_shed_swaps_palette_and_background() {
    let (mut sched, state) = engine(true);
    let mut palette_rx = sched.palette_watch();
    attach(&mut sched, reference_time(2026, 3, 10, 13, 0, 0));

    assert_eq!(sched.last_drawn(), Shift::AlphaFlight);
    // Beta Flight, not Alpha Flight colors.
    assert_eq!(
        corner_pixel(&state),
        background_color(Shift::AlphaFlight, true).unwrap()
    );
    assert_ne!(
        background_color(Shift::AlphaFlight, true),
        background_color(Shift::AlphaFlight, false)
    );
    assert!(palette_rx.has_changed().unwrap());
    assert_eq!(
        palette_rx.borrow_and_update().unwrap(),
        palette_for(Shift::AlphaFlight, true).unwrap()
    );
}

#[tokio::test]
async fn test_detach_mid_fade_resumes_cleanly() {
    // Hide the surface while a fade is running; on resume the engine must
    // not be stuck mid-fade forever.
    let (mut sched, _state) = engine(false);
    attach(&mut sched, reference_time(2026, 3, 10, 17, 59, 0));

    let six = reference_time(2026, 3, 10, 18, 0, 0);
    sched.on_wake(six);
    sched.on_event_at(EngineEvent::VisibilityChanged(false), six + TimeDelta::milliseconds(100));
    assert!(!sched.has_pending_wake());

    // Resume long after the fade deadline expired: the overdue fade is
    // collapsed and the clock's shift settles on the resume wake.
    let resume = six + TimeDelta::minutes(10);
    sched.on_event_at(EngineEvent::VisibilityChanged(true), resume);
    assert!(sched.has_pending_wake());
    assert_eq!(sched.last_drawn(), Shift::NightWatch);
}

#[tokio::test]
async fn test_run_loop_end_to_end() {
    // Feed the real event loop and watch frames come out the other side.
    let surface = MemorySurface::new(WIDTH, HEIGHT);
    let state = surface.state();
    let sched = RenderScheduler::new(Box::new(surface), TimezonePolicy::Reference, false);
    let events = sched.events();

    let task = tokio::spawn(sched.run());
    events.send(EngineEvent::SurfaceCreated).await.unwrap();
    events.send(EngineEvent::VisibilityChanged(true)).await.unwrap();

    // Give the loop a moment to process and paint.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(state.lock().unwrap().present_count >= 1);

    events.send(EngineEvent::Shutdown).await.unwrap();
    task.await.unwrap();
}
