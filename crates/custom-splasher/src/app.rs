//! Drivers that run a [`SplashLifecycle`] to completion.
//!
//! [`run`] drives the real overlay from the winit event loop: the loop sleeps
//! until the lifecycle's next deadline, polls it, and exits once it reaches
//! `Terminated`. [`run_headless`] does the same on the current thread
//! without any window.

use std::sync::Arc;

use winit::application::ApplicationHandler;
use winit::error::EventLoopError;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::WindowId;

use custom_splasher_core::SystemClock;
use custom_splasher_core::logging::targets;
use custom_splasher_media::MediaSource;

use crate::config::Snapshot;
use crate::launcher::SystemLauncher;
use crate::lifecycle::{LifecycleState, ShutdownReason, SplashLifecycle};
use crate::overlay::OverlayWindow;
use crate::surface::NullSurface;

type OverlayLifecycle = SplashLifecycle<MediaSource, OverlayWindow, SystemLauncher>;

/// Run the splash with a real overlay window until it terminates.
///
/// # Errors
///
/// Returns an error only if the event loop itself cannot be created or run.
/// Initialization failures end the run and are logged.
pub fn run(snapshot: Snapshot) -> Result<(), EventLoopError> {
    tracing::info!(target: targets::OVERLAY, "starting event loop");
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = SplashApp::new(snapshot);
    event_loop.run_app(&mut app)?;
    Ok(())
}

/// Run the splash without a window, sleeping between deadlines.
pub fn run_headless(snapshot: Snapshot) -> LifecycleState {
    let mut lifecycle = SplashLifecycle::new(
        snapshot,
        NullSurface::new(),
        SystemLauncher::new(),
        Arc::new(SystemClock),
    );
    if lifecycle.start().is_err() {
        return lifecycle.state();
    }
    lifecycle.run_blocking()
}

struct SplashApp {
    /// Taken when the window is created on the first resume.
    snapshot: Option<Snapshot>,
    lifecycle: Option<OverlayLifecycle>,
}

impl SplashApp {
    fn new(snapshot: Snapshot) -> Self {
        Self {
            snapshot: Some(snapshot),
            lifecycle: None,
        }
    }

    fn update_control_flow(&mut self, event_loop: &ActiveEventLoop) {
        let Some(lifecycle) = self.lifecycle.as_mut() else {
            return;
        };

        if lifecycle.state() == LifecycleState::Terminated {
            event_loop.exit();
            return;
        }

        let control_flow = match lifecycle.next_deadline() {
            Some(deadline) => ControlFlow::WaitUntil(deadline),
            None => ControlFlow::Wait,
        };
        event_loop.set_control_flow(control_flow);
    }
}

impl ApplicationHandler for SplashApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let Some(snapshot) = self.snapshot.take() else {
            return;
        };

        let window = match OverlayWindow::create(event_loop) {
            Ok(window) => window,
            Err(e) => {
                tracing::error!(target: targets::OVERLAY, "failed to initialize: {e}");
                event_loop.exit();
                return;
            }
        };

        let mut lifecycle = SplashLifecycle::new(
            snapshot,
            window,
            SystemLauncher::new(),
            Arc::new(SystemClock),
        );
        if lifecycle.start().is_err() {
            // Already torn down and logged; the next control-flow update exits.
            tracing::debug!(target: targets::OVERLAY, "splash did not start");
        }
        self.lifecycle = Some(lifecycle);

        self.update_control_flow(event_loop);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        if let Some(lifecycle) = self.lifecycle.as_mut() {
            match event {
                WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                    lifecycle.shutdown(ShutdownReason::Closed);
                }
                WindowEvent::RedrawRequested => {
                    if lifecycle.state() < LifecycleState::ShuttingDown {
                        if let Err(e) = lifecycle.surface_mut().redraw() {
                            tracing::warn!(target: targets::OVERLAY, "redraw failed: {e}");
                        }
                    }
                }
                _ => {}
            }
        }

        self.update_control_flow(event_loop);
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(lifecycle) = self.lifecycle.as_mut() {
            lifecycle.poll();
        }
        self.update_control_flow(event_loop);
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(lifecycle) = self.lifecycle.as_mut() {
            lifecycle.shutdown(ShutdownReason::Closed);
        }
    }
}
