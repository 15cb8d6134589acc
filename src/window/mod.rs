use std::time::{Duration, Instant};

use anyhow::Result;
use ash::vk::Extent2D;
use tracing::{debug, trace};
use winit::{
    dpi::PhysicalSize,
    event::{ElementState, Event, KeyEvent, WindowEvent},
    event_loop::EventLoop,
    keyboard::{Key, NamedKey},
    platform::pump_events::{EventLoopExtPumpEvents, PumpStatus},
    raw_window_handle::{
        DisplayHandle, HandleError, HasDisplayHandle, HasWindowHandle, WindowHandle,
    },
    window::{Window, WindowBuilder, WindowButtons},
};

use crate::config::WindowConfig;

const FRAME_TIME: Duration = Duration::from_millis(16);
const FPS_INTERVAL: Duration = Duration::from_secs(1);

/// Counts frames and reports the rate at most once per interval.
#[derive(Debug, Clone, Copy)]
pub struct FpsCounter {
    last_report: Instant,
    frames: u32,
}

impl FpsCounter {
    pub fn new(now: Instant) -> Self {
        Self {
            last_report: now,
            frames: 0,
        }
    }

    /// Counts one frame. Returns frames per second once a full interval has
    /// passed since the last report, then starts counting again.
    pub fn tick(&mut self, now: Instant) -> Option<f64> {
        self.frames += 1;
        let elapsed = now.saturating_duration_since(self.last_report);
        if elapsed < FPS_INTERVAL {
            return None;
        }
        let fps = f64::from(self.frames) / elapsed.as_secs_f64();
        self.frames = 0;
        self.last_report = now;
        Some(fps)
    }
}

pub fn fps_title(title: &str, fps: f64) -> String {
    format!("{} [FPS: {:.2}]", title, fps)
}

/// What the bootstrap needs from the window system: native handles to bind a
/// surface to, and the framebuffer size in pixels.
pub trait NativeWindow: HasDisplayHandle + HasWindowHandle {
    fn framebuffer_size(&self) -> Extent2D;

    /// Handles pending events. Waits at most one frame for new ones.
    fn poll_events(&mut self);

    fn should_close(&self) -> bool;
}

pub struct WindowManager {
    // dropped before the event loop
    window: Window,
    event_loop: EventLoop<()>,
    title: String,
    fps: FpsCounter,
    should_close: bool,
}

impl WindowManager {
    pub fn try_new(config: &WindowConfig) -> Result<Self> {
        let event_loop = EventLoop::new()?;
        let window = WindowBuilder::new()
            .with_inner_size(PhysicalSize::<u32>::from((config.width, config.height)))
            .with_resizable(false)
            .with_enabled_buttons(WindowButtons::CLOSE)
            .with_active(true)
            .with_title(config.title.as_str())
            .build(&event_loop)?;
        debug!("Window created: {}x{}", config.width, config.height);

        Ok(Self {
            window,
            event_loop,
            title: config.title.clone(),
            fps: FpsCounter::new(Instant::now()),
            should_close: false,
        })
    }
}

impl NativeWindow for WindowManager {
    fn framebuffer_size(&self) -> Extent2D {
        let size = self.window.inner_size();
        Extent2D {
            width: size.width,
            height: size.height,
        }
    }

    fn poll_events(&mut self) {
        let mut should_close = self.should_close;
        let status = self
            .event_loop
            .pump_events(Some(FRAME_TIME), |event, _| {
                trace!("{:?}", event);
                if let Event::WindowEvent { event, .. } = event {
                    match event {
                        WindowEvent::CloseRequested => should_close = true,
                        WindowEvent::KeyboardInput {
                            event:
                                KeyEvent {
                                    logical_key: Key::Named(NamedKey::Escape),
                                    state: ElementState::Pressed,
                                    ..
                                },
                            ..
                        } => should_close = true,
                        _ => {}
                    }
                }
            });
        if let PumpStatus::Exit(code) = status {
            debug!("Event loop exited with code {}", code);
            should_close = true;
        }
        self.should_close = should_close;

        if let Some(fps) = self.fps.tick(Instant::now()) {
            self.window.set_title(&fps_title(&self.title, fps));
        }
    }

    fn should_close(&self) -> bool {
        self.should_close
    }
}

impl HasDisplayHandle for WindowManager {
    fn display_handle(&self) -> Result<DisplayHandle<'_>, HandleError> {
        self.window.display_handle()
    }
}

impl HasWindowHandle for WindowManager {
    fn window_handle(&self) -> Result<WindowHandle<'_>, HandleError> {
        self.window.window_handle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_report_within_the_first_second() {
        let start = Instant::now();
        let mut counter = FpsCounter::new(start);
        for ms in [0, 100, 500, 999] {
            assert_eq!(counter.tick(start + Duration::from_millis(ms)), None);
        }
    }

    #[test]
    fn reports_frames_over_elapsed_time_then_resets() {
        let start = Instant::now();
        let mut counter = FpsCounter::new(start);
        for ms in [250, 500, 750] {
            assert_eq!(counter.tick(start + Duration::from_millis(ms)), None);
        }
        let fps = counter.tick(start + Duration::from_secs(2)).unwrap();
        assert!((fps - 2.0).abs() < 1e-9);

        // counting restarts from the last report
        assert_eq!(
            counter.tick(start + Duration::from_millis(2500)),
            None
        );
        let fps = counter.tick(start + Duration::from_secs(3)).unwrap();
        assert!((fps - 2.0).abs() < 1e-9);
    }

    #[test]
    fn title_shows_rate_with_two_decimals() {
        assert_eq!(fps_title("Vulkan", 59.94), "Vulkan [FPS: 59.94]");
        assert_eq!(fps_title("Vulkan", 60.0), "Vulkan [FPS: 60.00]");
    }
}
