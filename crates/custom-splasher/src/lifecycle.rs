//! The splash lifecycle state machine.
//!
//! A run moves strictly forward through
//!
//! ```text
//! Initializing -> MediaArmed -> Launching -> TargetLaunched -> ShuttingDown -> Terminated
//! ```
//!
//! and may jump to `ShuttingDown` from any earlier state. All timed work is
//! a [`SplashAction`] in the lifecycle's [`TimerRegistry`]; [`poll`] takes due
//! actions out one at a time and dispatches them to completion before taking
//! the next. The exit timer and video exhaustion can both ask for shutdown,
//! but [`shutdown`] checks the state first, so whichever comes second is a
//! no-op and teardown runs exactly once.
//!
//! [`poll`]: SplashLifecycle::poll
//! [`shutdown`]: SplashLifecycle::shutdown

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use custom_splasher_core::logging::targets;
use custom_splasher_core::{Clock, TimerId, TimerRegistry};
use custom_splasher_media::{FramePull, FrameSource, FrameStyle, MediaKind, MediaSource};

use crate::config::Snapshot;
use crate::error::InitError;
use crate::geometry::OverlayGeometry;
use crate::launcher::ProcessLauncher;
use crate::surface::{Surface, window_title};

/// How often the overlay is pulled back to the foreground.
pub const TOPMOST_INTERVAL: Duration = Duration::from_millis(100);

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LifecycleState {
    Initializing,
    /// Media is open and the overlay is styled.
    MediaArmed,
    /// Rendering is scheduled and the launch timer is pending.
    Launching,
    /// The target has been started and the exit timer is pending.
    TargetLaunched,
    ShuttingDown,
    Terminated,
}

/// Work the timer registry hands back to the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SplashAction {
    /// Show the next video frame.
    RenderTick,
    /// Run the pre-launch command and start the target.
    Launch,
    /// The overlay's time is up.
    Exit,
    /// Pull the overlay back to the foreground.
    EnforceTopmost,
}

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    ExitTimer,
    MediaExhausted,
    InitFailure,
    /// The overlay was closed from outside.
    Closed,
    /// The lifecycle was dropped before reaching `Terminated`.
    Dropped,
}

/// Drives one splash run.
pub struct SplashLifecycle<M, S, L>
where
    M: FrameSource,
    S: Surface,
    L: ProcessLauncher,
{
    snapshot: Snapshot,
    style: FrameStyle,
    timers: TimerRegistry<SplashAction>,
    media: Option<M>,
    surface: S,
    launcher: L,
    state: LifecycleState,
    geometry: Option<OverlayGeometry>,
    render_timer: Option<TimerId>,
    shutdown_reason: Option<ShutdownReason>,
    frames_presented: u64,
    decode_errors: u64,
}

impl<M, S, L> SplashLifecycle<M, S, L>
where
    M: FrameSource,
    S: Surface,
    L: ProcessLauncher,
{
    /// Create a lifecycle in `Initializing`. Nothing happens until `start`.
    pub fn new(snapshot: Snapshot, surface: S, launcher: L, clock: Arc<dyn Clock>) -> Self {
        Self {
            style: snapshot.frame_style(),
            snapshot,
            timers: TimerRegistry::new(clock),
            media: None,
            surface,
            launcher,
            state: LifecycleState::Initializing,
            geometry: None,
            render_timer: None,
            shutdown_reason: None,
            frames_presented: 0,
            decode_errors: 0,
        }
    }

    /// Open the media with `opener`, show the overlay and schedule the launch.
    ///
    /// On failure the run is torn down before returning, so the lifecycle is
    /// `Terminated` and nothing was ever presented.
    pub fn start_with<F>(&mut self, opener: F) -> Result<(), InitError>
    where
        F: FnOnce(&Path, f64) -> custom_splasher_media::Result<M>,
    {
        if self.state != LifecycleState::Initializing {
            return Err(InitError::AlreadyStarted);
        }

        if let Err(e) = self.arm(opener) {
            tracing::error!(target: targets::LIFECYCLE, "failed to initialize: {e}");
            self.shutdown(ShutdownReason::InitFailure);
            return Err(e);
        }

        self.schedule();
        Ok(())
    }

    /// `Initializing -> MediaArmed`.
    fn arm<F>(&mut self, opener: F) -> Result<(), InitError>
    where
        F: FnOnce(&Path, f64) -> custom_splasher_media::Result<M>,
    {
        let media = opener(self.snapshot.media.file.as_path(), self.snapshot.media.speed)?;
        self.media = Some(media);

        let geometry = OverlayGeometry::centered(self.surface.screen_size(), &self.snapshot.layout);
        self.surface
            .apply_style(&geometry, &window_title(std::process::id()))?;
        self.geometry = Some(geometry);
        tracing::debug!(target: targets::LIFECYCLE, ?geometry, "overlay styled");

        if self.snapshot.layout.force_topmost {
            self.timers
                .schedule_repeating(TOPMOST_INTERVAL, SplashAction::EnforceTopmost);
        }

        self.transition(LifecycleState::MediaArmed);
        Ok(())
    }

    /// `MediaArmed -> Launching`.
    fn schedule(&mut self) {
        let Some(media) = self.media.as_ref() else {
            return;
        };

        match (media.kind(), media.frame_interval()) {
            (MediaKind::Video, Some(interval)) => {
                self.render_timer = Some(
                    self.timers
                        .schedule_repeating(interval, SplashAction::RenderTick),
                );
            }
            _ => self.render(),
        }

        self.timers
            .schedule_once(self.snapshot.launch_delay, SplashAction::Launch);
        self.transition(LifecycleState::Launching);
    }

    /// Dispatch every action that is due, one at a time.
    pub fn poll(&mut self) -> LifecycleState {
        while self.state != LifecycleState::Terminated {
            let Some((_, action)) = self.timers.pop_due() else {
                break;
            };
            self.dispatch(action);
        }
        self.state
    }

    /// Run one action to completion.
    pub fn dispatch(&mut self, action: SplashAction) {
        if self.state >= LifecycleState::ShuttingDown {
            tracing::trace!(target: targets::LIFECYCLE, ?action, "ignoring action after shutdown");
            return;
        }

        match action {
            SplashAction::RenderTick => self.render(),
            SplashAction::Launch => self.launch(),
            SplashAction::Exit => {
                self.shutdown(ShutdownReason::ExitTimer);
            }
            SplashAction::EnforceTopmost => {
                if let Err(e) = self.surface.request_foreground() {
                    tracing::warn!(target: targets::LIFECYCLE, "failed to bring overlay to foreground: {e}");
                }
            }
        }
    }

    fn render(&mut self) {
        let Some(media) = self.media.as_mut() else {
            return;
        };

        match media.next_frame() {
            Ok(FramePull::Frame(frame)) => {
                let styled = self.style.apply(&frame);
                match self.surface.present(&styled) {
                    Ok(()) => self.frames_presented += 1,
                    Err(e) => tracing::warn!(target: targets::LIFECYCLE, "failed to present frame: {e}"),
                }
            }
            Ok(FramePull::Exhausted) => self.media_exhausted(),
            Err(e) => {
                self.decode_errors += 1;
                tracing::warn!(target: targets::LIFECYCLE, "skipping frame: {e}");
            }
        }
    }

    fn media_exhausted(&mut self) {
        if self.state == LifecycleState::TargetLaunched {
            tracing::info!(target: targets::LIFECYCLE, "video finished playing ahead of the exit timer");
            self.shutdown(ShutdownReason::MediaExhausted);
            return;
        }

        // Before launch: hold the last frame and let the launch go ahead.
        if let Some(id) = self.render_timer.take() {
            self.timers.cancel(id);
            tracing::info!(
                target: targets::LIFECYCLE,
                "video finished before launch, holding the last frame"
            );
        }
    }

    /// `Launching -> TargetLaunched`.
    fn launch(&mut self) {
        if self.state != LifecycleState::Launching {
            return;
        }

        if let Some(command) = self.snapshot.pre_launch.as_deref() {
            if let Err(e) = self.launcher.run_command(command) {
                tracing::warn!(target: targets::LIFECYCLE, "pre-launch command failed: {e}");
            }
        }

        if let Err(e) = self.launcher.spawn(&self.snapshot.target_program) {
            tracing::warn!(target: targets::LIFECYCLE, "failed to launch target: {e}");
        }

        self.timers
            .schedule_once(self.snapshot.exit_delay, SplashAction::Exit);
        self.transition(LifecycleState::TargetLaunched);

        if self.media.as_ref().is_some_and(|m| m.is_exhausted()) {
            self.shutdown(ShutdownReason::MediaExhausted);
        }
    }

    /// Tear the run down: cancel every timer, release the media, close the surface.
    ///
    /// Runs once per lifecycle. Returns `false` if shutdown had already begun.
    pub fn shutdown(&mut self, reason: ShutdownReason) -> bool {
        if self.state >= LifecycleState::ShuttingDown {
            tracing::debug!(target: targets::LIFECYCLE, ?reason, "shutdown already done");
            return false;
        }

        self.shutdown_reason = Some(reason);
        self.transition(LifecycleState::ShuttingDown);

        let cancelled = self.timers.cancel_all();
        self.render_timer = None;
        if let Some(mut media) = self.media.take() {
            media.release();
        }
        self.surface.close();

        tracing::debug!(target: targets::LIFECYCLE, cancelled, "resources released");
        self.transition(LifecycleState::Terminated);
        true
    }

    fn transition(&mut self, next: LifecycleState) {
        debug_assert!(next > self.state, "{:?} -> {next:?}", self.state);
        tracing::info!(target: targets::LIFECYCLE, from = ?self.state, to = ?next, "state transition");
        self.state = next;
    }

    /// When the next action is due. `None` once terminated.
    pub fn next_deadline(&mut self) -> Option<Instant> {
        if self.state == LifecycleState::Terminated {
            return None;
        }
        self.timers.next_deadline()
    }

    /// Drive the run on the current thread until it terminates.
    ///
    /// Sleeps on the registry's clock between deadlines. Returns early if
    /// nothing is scheduled, which only happens before `start`.
    pub fn run_blocking(&mut self) -> LifecycleState {
        loop {
            if self.poll() == LifecycleState::Terminated {
                return self.state;
            }
            let Some(deadline) = self.next_deadline() else {
                return self.state;
            };
            self.timers.clock().sleep_until(deadline);
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Why the run ended, once it has.
    pub fn shutdown_reason(&self) -> Option<ShutdownReason> {
        self.shutdown_reason
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    pub fn decode_errors(&self) -> u64 {
        self.decode_errors
    }

    /// Where the overlay was placed, once styled.
    pub fn geometry(&self) -> Option<OverlayGeometry> {
        self.geometry
    }

    /// Number of live timers.
    pub fn active_timers(&self) -> usize {
        self.timers.active_count()
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }
}

impl<S, L> SplashLifecycle<MediaSource, S, L>
where
    S: Surface,
    L: ProcessLauncher,
{
    /// Start with the configured media file.
    pub fn start(&mut self) -> Result<(), InitError> {
        self.start_with(|path, speed| MediaSource::open(path, speed))
    }
}

impl<M, S, L> Drop for SplashLifecycle<M, S, L>
where
    M: FrameSource,
    S: Surface,
    L: ProcessLauncher,
{
    fn drop(&mut self) {
        if self.state != LifecycleState::Terminated {
            self.shutdown(ShutdownReason::Dropped);
        }
    }
}

impl<M, S, L> fmt::Debug for SplashLifecycle<M, S, L>
where
    M: FrameSource,
    S: Surface,
    L: ProcessLauncher,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SplashLifecycle")
            .field("state", &self.state)
            .field("timers", &self.timers)
            .field("frames_presented", &self.frames_presented)
            .field("decode_errors", &self.decode_errors)
            .field("shutdown_reason", &self.shutdown_reason)
            .finish_non_exhaustive()
    }
}
