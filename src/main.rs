/*
 *  main.rs
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

use anyhow::Context;
use env_logger::Env;
use log::info;
use tokio::signal::unix::{signal, SignalKind};

use shiftwall::config;
use shiftwall::omega::OmegaPoller;
use shiftwall::{EngineEvent, MemorySurface, RenderScheduler};

include!(concat!(env!("OUT_DIR"), "/build_info.rs"));

/// Wait for SIGINT, SIGTERM, or SIGHUP.  Logs the signal and returns so
/// main can shut the tasks down in order.
async fn signal_handler() -> Result<(), std::io::Error> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sighup = signal(SignalKind::hangup())?;

    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT received. Initiating graceful shutdown.");
        }
        _ = sigterm.recv() => {
            info!("SIGTERM received. Initiating graceful shutdown.");
        }
        _ = sighup.recv() => {
            info!("SIGHUP received. Initiating graceful shutdown.");
        }
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cfg = config::load().context("loading configuration")?;

    env_logger::Builder::from_env(Env::default().default_filter_or(cfg.log_level()))
        .format_timestamp_secs()
        .init();

    info!("{} - keep the watch", env!("CARGO_PKG_NAME"));
    info!("v.{} built {}", env!("CARGO_PKG_VERSION"), BUILD_DATE);

    let (width, height) = cfg.surface_size();
    let surface = MemorySurface::new(width, height);

    let mut scheduler =
        RenderScheduler::new(Box::new(surface), cfg.timezone_policy(), cfg.bee_shed());
    let events = scheduler.events();

    let mut poller =
        OmegaPoller::spawn(cfg.omega(), events.clone()).context("starting omega poller")?;
    scheduler.set_omega_kick(poller.kick_sender());

    // Bring the surface up.  A real compositor would feed these from its
    // own lifecycle callbacks.
    events.send(EngineEvent::SurfaceCreated).await?;
    events.send(EngineEvent::VisibilityChanged(true)).await?;

    // The scheduler runs as its own task so a signal can hand it a
    // Shutdown event and let its loop exit on its own terms.
    let mut scheduler_task = tokio::spawn(scheduler.run());

    tokio::select! {
        res = &mut scheduler_task => {
            res.context("render scheduler task")?;
            info!("render scheduler exited");
        }
        res = signal_handler() => {
            res.context("installing signal handlers")?;
            let _ = events.send(EngineEvent::Shutdown).await;
            scheduler_task.await.context("render scheduler task")?;
        }
    }

    poller.cancel_all().await;
    info!("shutdown complete");

    Ok(())
}
