/*
 *  omega.rs
 *
 *  shiftwall - keep the watch
 *  (c) 2024-26 shiftwall authors
 *
 *  Omega Shift poller: a debounced, cancellable one-byte probe against
 *  the shift checker endpoint.  Owns the override flag for the process
 *  lifetime; surfaces come and go, the poll cadence does not.
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

use chrono::{Datelike, Local};
use log::{debug, error, info, warn};
use reqwest::{Client, header};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::scheduler::EngineEvent;

/// The shift checker endpoint (default; overridable in config).
pub const OMEGA_CHECK_URL: &str = "http://vst.ninja/Resources/isitomegashift.html";

/// Checks never happen more often than this.
pub const OMEGA_MIN_INTERVAL: Duration = Duration::from_secs(600);

/// Hard cap on one probe; past this the request is aborted.
pub const OMEGA_TIMEOUT: Duration = Duration::from_secs(10);

/// Omega Shift only happens in November.
pub const OMEGA_ACTIVE_MONTH: u32 = 11;

#[derive(Debug, Clone)]
pub struct OmegaConfig {
    pub enabled: bool,
    pub check_url: String,
}

impl Default for OmegaConfig {
    fn default() -> Self {
        OmegaConfig {
            enabled: false,
            check_url: OMEGA_CHECK_URL.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum PollError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("check timed out after {OMEGA_TIMEOUT:?} and was aborted")]
    TimedOut,
}

/// What one resolved probe told us.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The endpoint answered with a definite '0' or '1'.
    Flag(bool),
    /// The endpoint answered, but not with anything usable.
    NoInformation,
}

/// Gate evaluated before any network traffic: the feature must be turned
/// on and the calendar must agree.
pub fn eligible(enabled: bool, month: u32) -> bool {
    enabled && month == OMEGA_ACTIVE_MONTH
}

/// Debounce and override bookkeeping, separated from the task plumbing so
/// it can be driven directly in tests.
#[derive(Debug, Clone, Copy)]
pub struct OmegaState {
    pub override_active: bool,
    /// `None` until the first check, so process start probes immediately.
    pub last_checked_at: Option<Instant>,
}

impl Default for OmegaState {
    fn default() -> Self {
        Self::new()
    }
}

impl OmegaState {
    pub fn new() -> Self {
        OmegaState { override_active: false, last_checked_at: None }
    }

    /// Zero when a check is due, otherwise the remaining debounce wait.
    pub fn time_until_due(&self, now: Instant) -> Duration {
        match self.last_checked_at {
            None => Duration::ZERO,
            Some(at) => (at + OMEGA_MIN_INTERVAL).saturating_duration_since(now),
        }
    }

    /// Stamp the check time.  Called before the probe resolves, so the
    /// next check lands at `last_checked_at + OMEGA_MIN_INTERVAL` whether
    /// or not this one succeeds.
    pub fn mark_checked(&mut self, now: Instant) {
        self.last_checked_at = Some(now);
    }

    /// Fold a probe result into the override flag.  Returns the new value
    /// when the flag flipped.  Failures and non-answers carry no
    /// information and leave the flag alone.
    pub fn apply(&mut self, outcome: Result<ProbeOutcome, PollError>) -> Option<bool> {
        match outcome {
            Ok(ProbeOutcome::Flag(v)) if v != self.override_active => {
                self.override_active = v;
                Some(v)
            }
            Ok(ProbeOutcome::Flag(_)) => None,
            Ok(ProbeOutcome::NoInformation) => None,
            Err(e) => {
                warn!("omega check failed, leaving override unchanged: {e}");
                None
            }
        }
    }

    /// Clear the override when the eligibility gate is closed.  Returns
    /// true when the flag actually flipped (forces a redraw so a stale
    /// Omega banner clears).
    pub fn clear_if_ineligible(&mut self) -> bool {
        if self.override_active {
            self.override_active = false;
            true
        } else {
            false
        }
    }
}

/// One probe: fetch the flag byte with a hard timeout.  A timed-out
/// request is dropped on the spot and can never report a late result.
pub async fn probe(client: &Client, url: &str) -> Result<ProbeOutcome, PollError> {
    match tokio::time::timeout(OMEGA_TIMEOUT, fetch_flag(client, url)).await {
        Ok(res) => res,
        Err(_) => Err(PollError::TimedOut),
    }
}

async fn fetch_flag(client: &Client, url: &str) -> Result<ProbeOutcome, PollError> {
    let response = client.get(url).send().await?.error_for_status()?;
    let body = response.bytes().await?;
    // The endpoint answers with a single ASCII digit.  Read the first
    // byte; anything else is noise, not an error.
    match body.first() {
        Some(b'1') => Ok(ProbeOutcome::Flag(true)),
        Some(b'0') => Ok(ProbeOutcome::Flag(false)),
        Some(other) => {
            warn!("omega endpoint returned unexpected byte {other:#04x}, ignoring");
            Ok(ProbeOutcome::NoInformation)
        }
        None => {
            warn!("omega endpoint returned an empty body, ignoring");
            Ok(ProbeOutcome::NoInformation)
        }
    }
}

/// Handle to the background poll task.
pub struct OmegaPoller {
    kick_tx: mpsc::Sender<()>,
    stop_tx: Option<mpsc::Sender<()>>,
    poll_handle: Option<JoinHandle<()>>,
    override_rx: watch::Receiver<bool>,
}

impl OmegaPoller {
    /// Spawn the poll task.  Flips of the override flag are sent into the
    /// scheduler inbox as [`EngineEvent::OmegaChanged`]; the watch channel
    /// carries the current value for anyone who only needs a snapshot.
    pub fn spawn(
        config: OmegaConfig,
        events: mpsc::Sender<EngineEvent>,
    ) -> Result<Self, PollError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            "User-Agent",
            header::HeaderValue::from_static(concat!(
                env!("CARGO_PKG_NAME"),
                " v",
                env!("CARGO_PKG_VERSION")
            )),
        );
        headers.insert("Connection", header::HeaderValue::from_static("close"));
        let client = Client::builder()
            .connect_timeout(OMEGA_TIMEOUT)
            .default_headers(headers)
            .build()?;

        let (kick_tx, kick_rx) = mpsc::channel(4);
        let (stop_tx, stop_rx) = mpsc::channel(1);
        let (override_tx, override_rx) = watch::channel(false);

        let task = PollTask {
            config,
            client,
            state: OmegaState::new(),
            events,
            override_tx,
            kick_rx,
            stop_rx,
        };
        let poll_handle = tokio::spawn(task.run());

        Ok(OmegaPoller {
            kick_tx,
            stop_tx: Some(stop_tx),
            poll_handle: Some(poll_handle),
            override_rx,
        })
    }

    /// Current override value without waiting on the task.
    pub fn override_active(&self) -> bool {
        *self.override_rx.borrow()
    }

    /// Nudge the task: probe now if the debounce allows, otherwise keep
    /// waiting out the remaining interval.  Surface lifecycle events call
    /// this so a fresh surface picks up a pending Omega quickly.
    pub fn kick(&self) {
        // A full kick queue already means a wakeup is coming.
        let _ = self.kick_tx.try_send(());
    }

    /// Clone of the kick channel, for wiring into the scheduler.
    pub fn kick_sender(&self) -> mpsc::Sender<()> {
        self.kick_tx.clone()
    }

    /// Stop the task and abort any in-flight probe.  Idempotent: calling
    /// twice, or after the task already exited, is a no-op.
    pub async fn cancel_all(&mut self) {
        if let Some(stop) = self.stop_tx.take() {
            let _ = stop.send(()).await;
        }
        if let Some(handle) = self.poll_handle.take() {
            if let Err(e) = handle.await {
                error!("omega poll task failed to join: {e}");
            }
        }
        info!("omega polling stopped");
    }
}

/// Task-side state.  Everything here is owned by the one spawned task;
/// the probe itself is the only thing that touches the network, and it is
/// awaited inline, so at most one is ever in flight.
struct PollTask {
    config: OmegaConfig,
    client: Client,
    state: OmegaState,
    events: mpsc::Sender<EngineEvent>,
    override_tx: watch::Sender<bool>,
    kick_rx: mpsc::Receiver<()>,
    stop_rx: mpsc::Receiver<()>,
}

impl PollTask {
    async fn run(mut self) {
        loop {
            let wait = self.state.time_until_due(Instant::now());
            tokio::select! {
                _ = tokio::time::sleep(wait) => {
                    if !self.check_now(Local::now().month()).await {
                        debug!("omega poll task stopped mid-check, exiting");
                        break;
                    }
                }
                kicked = self.kick_rx.recv() => {
                    if kicked.is_none() {
                        break;
                    }
                    // Recompute the wait on the next pass; a due kick
                    // probes immediately, an early one keeps waiting.
                    debug!(
                        "omega kick, next check due in {:?}",
                        self.state.time_until_due(Instant::now())
                    );
                }
                _ = self.stop_rx.recv() => {
                    debug!("omega poll task received stop signal, exiting");
                    break;
                }
            }
        }
    }

    /// One check.  Returns false when a stop arrived while the probe was
    /// in flight: the request future is dropped on the spot and its
    /// outcome is never applied or announced.
    async fn check_now(&mut self, month: u32) -> bool {
        self.state.mark_checked(Instant::now());

        if !eligible(self.config.enabled, month) {
            debug!(
                "not checking omega (enabled={}, month={month})",
                self.config.enabled
            );
            if self.state.clear_if_ineligible() {
                self.announce(false).await;
            }
            return true;
        }

        debug!("checking omega endpoint {}", self.config.check_url);
        let outcome = tokio::select! {
            outcome = probe(&self.client, &self.config.check_url) => outcome,
            _ = self.stop_rx.recv() => return false,
        };
        if let Some(flipped) = self.state.apply(outcome) {
            self.announce(flipped).await;
        }
        true
    }

    async fn announce(&self, value: bool) {
        info!("omega override is now {value}");
        let _ = self.override_tx.send(value);
        if self.events.send(EngineEvent::OmegaChanged(value)).await.is_err() {
            warn!("scheduler inbox closed, omega change not delivered");
        }
    }
}
