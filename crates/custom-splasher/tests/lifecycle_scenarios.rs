//! End-to-end lifecycle scenarios on a manual clock.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use custom_splasher::{
    LaunchError, LifecycleState, OverlayGeometry, ProcessLauncher, ShutdownReason, SplashConfig,
    SplashLifecycle, Surface, SurfaceError,
};
use custom_splasher_core::ManualClock;
use custom_splasher_media::{Frame, FramePull, FrameSource, MediaKind, MediaSource};

#[derive(Debug, Default)]
struct Log {
    styled: Vec<(OverlayGeometry, String)>,
    presented: Vec<(u32, u32)>,
    closed: usize,
    spawned: Vec<(Duration, String)>,
    released: usize,
}

type SharedLog = Rc<RefCell<Log>>;

struct RecordingSurface(SharedLog);

impl Surface for RecordingSurface {
    fn screen_size(&self) -> Option<(u32, u32)> {
        Some((1920, 1080))
    }

    fn apply_style(&mut self, geometry: &OverlayGeometry, title: &str) -> Result<(), SurfaceError> {
        self.0.borrow_mut().styled.push((*geometry, title.to_string()));
        Ok(())
    }

    fn present(&mut self, frame: &Frame) -> Result<(), SurfaceError> {
        self.0
            .borrow_mut()
            .presented
            .push((frame.width(), frame.height()));
        Ok(())
    }

    fn request_foreground(&mut self) -> Result<(), SurfaceError> {
        Ok(())
    }

    fn close(&mut self) {
        self.0.borrow_mut().closed += 1;
    }
}

struct RecordingLauncher {
    clock: Arc<ManualClock>,
    log: SharedLog,
}

impl ProcessLauncher for RecordingLauncher {
    fn run_command(&mut self, _command: &str) -> Result<(), LaunchError> {
        Ok(())
    }

    fn spawn(&mut self, target: &str) -> Result<(), LaunchError> {
        self.log
            .borrow_mut()
            .spawned
            .push((self.clock.elapsed(), target.to_string()));
        Ok(())
    }
}

/// A video of `frames` frames at 25 fps that counts releases.
struct CountingVideo {
    frames: usize,
    exhausted: bool,
    log: SharedLog,
}

impl FrameSource for CountingVideo {
    fn kind(&self) -> MediaKind {
        MediaKind::Video
    }

    fn frame_interval(&self) -> Option<Duration> {
        Some(Duration::from_millis(40))
    }

    fn next_frame(&mut self) -> custom_splasher_media::Result<FramePull> {
        if self.frames == 0 {
            self.exhausted = true;
            return Ok(FramePull::Exhausted);
        }
        self.frames -= 1;
        Ok(FramePull::Frame(Frame::solid(8, 8, [0, 0, 0])))
    }

    fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    fn release(&mut self) {
        self.log.borrow_mut().released += 1;
    }
}

fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

fn lifecycle<M: FrameSource>(
    config: &SplashConfig,
) -> (
    Arc<ManualClock>,
    SharedLog,
    SplashLifecycle<M, RecordingSurface, RecordingLauncher>,
) {
    let clock = Arc::new(ManualClock::new());
    let log = SharedLog::default();
    let lifecycle = SplashLifecycle::new(
        config.snapshot(),
        RecordingSurface(log.clone()),
        RecordingLauncher {
            clock: clock.clone(),
            log: log.clone(),
        },
        clock.clone(),
    );
    (clock, log, lifecycle)
}

fn write_still(dir: &std::path::Path) -> String {
    let path = dir.join("still.png");
    image::RgbImage::from_pixel(16, 9, image::Rgb([200, 100, 50]))
        .save(&path)
        .unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
fn still_image_launches_then_exits() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = SplashConfig::default();
    config.launch_interval = 1500;
    config.exit_interval = 2000;
    config.media.file = write_still(dir.path());
    config.layout.force_topmost = false;

    let (clock, log, mut lifecycle) = lifecycle::<MediaSource>(&config);
    lifecycle.start().unwrap();

    // Opened and rendered once, resized to the overlay.
    assert_eq!(lifecycle.state(), LifecycleState::Launching);
    assert_eq!(log.borrow().presented, [(700, 400)]);
    let (geometry, title) = log.borrow().styled[0].clone();
    assert_eq!((geometry.x, geometry.y), (600, 330));
    assert_eq!(title, format!("Custom Splasher (PID {})", std::process::id()));

    clock.set_elapsed(ms(1499));
    assert_eq!(lifecycle.poll(), LifecycleState::Launching);
    clock.set_elapsed(ms(1500));
    assert_eq!(lifecycle.poll(), LifecycleState::TargetLaunched);
    assert_eq!(log.borrow().spawned, [(ms(1500), "cmd".to_string())]);

    clock.set_elapsed(ms(3499));
    assert_eq!(lifecycle.poll(), LifecycleState::TargetLaunched);
    clock.set_elapsed(ms(3500));
    assert_eq!(lifecycle.poll(), LifecycleState::Terminated);
    assert_eq!(lifecycle.shutdown_reason(), Some(ShutdownReason::ExitTimer));

    // Nothing fires after termination.
    assert_eq!(lifecycle.next_deadline(), None);
    clock.set_elapsed(ms(60_000));
    assert_eq!(lifecycle.poll(), LifecycleState::Terminated);
    assert_eq!(log.borrow().presented.len(), 1);
    assert_eq!(log.borrow().spawned.len(), 1);
    assert_eq!(log.borrow().closed, 1);
    assert_eq!(lifecycle.active_timers(), 0);
}

#[test]
fn missing_media_terminates_before_arming() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = SplashConfig::default();
    config.media.file = dir.path().join("nope.mp4").to_string_lossy().into_owned();

    let (clock, log, mut lifecycle) = lifecycle::<MediaSource>(&config);
    let err = lifecycle.start().unwrap_err();

    assert!(matches!(
        err,
        custom_splasher::InitError::Media(custom_splasher_media::MediaError::NotFound { .. })
    ));
    assert_eq!(lifecycle.state(), LifecycleState::Terminated);
    assert_eq!(lifecycle.shutdown_reason(), Some(ShutdownReason::InitFailure));
    // The overlay was never styled or shown.
    assert!(log.borrow().styled.is_empty());
    assert!(log.borrow().presented.is_empty());

    clock.set_elapsed(ms(10_000));
    assert_eq!(lifecycle.poll(), LifecycleState::Terminated);
    assert!(log.borrow().spawned.is_empty());
}

#[test]
fn exit_timer_and_exhaustion_due_together_shut_down_once() {
    let mut config = SplashConfig::default();
    config.launch_interval = 100;
    config.exit_interval = 100;
    config.layout.force_topmost = false;

    let (clock, log, mut lifecycle) = lifecycle::<CountingVideo>(&config);
    let video_log = log.clone();
    lifecycle
        .start_with(|_, _| {
            Ok(CountingVideo {
                frames: 4,
                exhausted: false,
                log: video_log,
            })
        })
        .unwrap();

    // Ticks at 40..160 show four frames; at 200 the exit timer and the
    // exhausting tick are due at the same instant.
    for t in (20..=180).step_by(20) {
        clock.set_elapsed(ms(t));
        lifecycle.poll();
    }
    assert_eq!(lifecycle.state(), LifecycleState::TargetLaunched);
    assert_eq!(lifecycle.frames_presented(), 4);

    clock.set_elapsed(ms(200));
    assert_eq!(lifecycle.poll(), LifecycleState::Terminated);
    assert_eq!(lifecycle.shutdown_reason(), Some(ShutdownReason::ExitTimer));
    assert_eq!(log.borrow().released, 1);
    assert_eq!(log.borrow().closed, 1);

    // A late trigger observes the terminal state.
    assert!(!lifecycle.shutdown(ShutdownReason::MediaExhausted));
    drop(lifecycle);
    assert_eq!(log.borrow().released, 1);
}

#[test]
fn exhaustion_wins_when_it_comes_first() {
    let mut config = SplashConfig::default();
    config.launch_interval = 10;
    config.exit_interval = 5000;
    config.layout.force_topmost = false;

    let (clock, log, mut lifecycle) = lifecycle::<CountingVideo>(&config);
    let video_log = log.clone();
    lifecycle
        .start_with(|_, _| {
            Ok(CountingVideo {
                frames: 2,
                exhausted: false,
                log: video_log,
            })
        })
        .unwrap();

    for t in [10, 40, 80, 120] {
        clock.set_elapsed(ms(t));
        lifecycle.poll();
    }
    assert_eq!(lifecycle.state(), LifecycleState::Terminated);
    assert_eq!(lifecycle.shutdown_reason(), Some(ShutdownReason::MediaExhausted));

    // The exit timer was cancelled with everything else.
    clock.set_elapsed(ms(10_000));
    lifecycle.poll();
    assert_eq!(log.borrow().released, 1);
    assert_eq!(log.borrow().closed, 1);
}

#[test]
fn non_positive_launch_interval_is_clamped() {
    for raw in [0, -250] {
        let mut config = SplashConfig::default();
        config.launch_interval = raw;
        config.exit_interval = raw;
        config.layout.force_topmost = false;

        let (clock, log, mut lifecycle) = lifecycle::<CountingVideo>(&config);
        let video_log = log.clone();
        lifecycle
            .start_with(|_, _| {
                Ok(CountingVideo {
                    frames: 100,
                    exhausted: false,
                    log: video_log,
                })
            })
            .unwrap();

        assert_eq!(lifecycle.poll(), LifecycleState::Launching);
        clock.set_elapsed(ms(1));
        assert_eq!(lifecycle.poll(), LifecycleState::TargetLaunched);
        clock.set_elapsed(ms(2));
        assert_eq!(lifecycle.poll(), LifecycleState::Terminated);
        assert_eq!(log.borrow().spawned, [(ms(1), "cmd".to_string())]);
    }
}

#[test]
fn launch_and_exit_never_fire_early() {
    for (launch, exit) in [(1500, 2000), (2000, 500), (1, 1), (250, 3000)] {
        let mut config = SplashConfig::default();
        config.launch_interval = launch;
        config.exit_interval = exit;

        let (clock, log, mut lifecycle) = lifecycle::<CountingVideo>(&config);
        let video_log = log.clone();
        lifecycle
            .start_with(|_, _| {
                Ok(CountingVideo {
                    frames: usize::MAX,
                    exhausted: false,
                    log: video_log,
                })
            })
            .unwrap();

        let launch = launch as u64;
        let exit = exit as u64;

        // Walk the clock one frame at a time, like a real driver would.
        let mut t = 0;
        while lifecycle.state() != LifecycleState::Terminated {
            t += 1;
            clock.set_elapsed(ms(t));
            lifecycle.poll();

            if t < launch {
                assert!(log.borrow().spawned.is_empty(), "launched at {t} ms, before {launch} ms");
            }
            if t < launch + exit {
                assert_ne!(lifecycle.state(), LifecycleState::Terminated, "exited at {t} ms");
            }
        }

        let launched_at = log.borrow().spawned[0].0;
        assert!(launched_at >= ms(launch));
        assert!(clock.elapsed() >= ms(launch + exit));
        assert_eq!(lifecycle.shutdown_reason(), Some(ShutdownReason::ExitTimer));
    }
}

#[test]
fn image_pulls_are_identical() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_still(dir.path());
    let mut media = MediaSource::open(&path, 2.5).unwrap();

    let first = media.next_frame().unwrap();
    for _ in 0..10 {
        assert_eq!(media.next_frame().unwrap(), first);
    }
}
