use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use pixels::Error as PixelsError;
use thiserror::Error;
use tracing::{info, warn};
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{ElementState, Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowBuilder;

use crate::assets::{AssetError, ResourceCache};
use crate::{resolve_app_paths, StartupError};

use super::input::BUTTON_COUNT;
use super::metrics::{LoopMetricsSnapshot, MetricsAccumulator};
use super::{
    InputSampler, LoadContext, MouseButton, PointerState, Renderer, Scene, SceneCommand, Vec2,
};

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    pub target_tps: u32,
    pub clear_color: [u8; 4],
    pub metrics_log_interval: Duration,
    pub show_fps_in_title: bool,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            window_title: "Board".to_string(),
            window_width: 800,
            window_height: 600,
            target_tps: 60,
            clear_color: [0, 0, 0, 255],
            metrics_log_interval: Duration::from_secs(1),
            show_fps_in_title: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error("failed to load scene assets: {0}")]
    SceneLoad(#[from] AssetError),
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to initialize renderer: {0}")]
    CreateRenderer(#[source] PixelsError),
    #[error("renderer failed while running: {0}")]
    Render(#[source] PixelsError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

/// Loads `scene`, opens the window and drives one sample/update/render pass
/// per frame until the window closes, Escape is pressed or the scene quits.
/// A renderer failure also ends the loop and is returned as `AppError::Render`.
pub fn run_app(config: LoopConfig, mut scene: Box<dyn Scene>) -> Result<(), AppError> {
    let app_paths = resolve_app_paths()?;
    info!(
        root = %app_paths.root.display(),
        asset_dir = %app_paths.asset_dir.display(),
        "startup"
    );

    let mut resources = ResourceCache::new();
    scene.load(&mut LoadContext {
        paths: &app_paths,
        resources: &mut resources,
    })?;
    info!(resource_count = resources.image_count(), "scene_loaded");

    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(config.window_title.clone())
            .with_inner_size(LogicalSize::new(
                config.window_width as f64,
                config.window_height as f64,
            ))
            .build(&event_loop)
            .map_err(AppError::CreateWindow)?,
    );
    let mut renderer = Renderer::new(
        Arc::clone(&window),
        config.window_width,
        config.window_height,
    )
    .map_err(AppError::CreateRenderer)?;

    event_loop.set_control_flow(ControlFlow::Poll);

    let target_tps = config.target_tps.max(1);
    let frame_target = target_frame_duration(target_tps);
    let metrics_log_interval = if config.metrics_log_interval.is_zero() {
        Duration::from_secs(1)
    } else {
        config.metrics_log_interval
    };
    info!(
        target_tps,
        window_width = config.window_width,
        window_height = config.window_height,
        metrics_log_interval_ms = metrics_log_interval.as_millis() as u64,
        "loop_config"
    );

    let mut input_collector = InputCollector::default();
    let mut sampler = InputSampler::new();
    let mut metrics_accumulator = MetricsAccumulator::new(metrics_log_interval);
    let mut last_frame_instant = Instant::now();
    let render_failure: Rc<RefCell<Option<PixelsError>>> = Rc::default();
    let loop_render_failure = Rc::clone(&render_failure);

    let run_result = event_loop.run(move |event, window_target| match event {
        Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
            WindowEvent::CloseRequested => {
                input_collector.request_shutdown("window_close");
            }
            WindowEvent::Resized(new_size) => {
                if let Err(error) = renderer.resize(new_size.width, new_size.height) {
                    warn!(error = %error, "renderer_resize_failed");
                    loop_render_failure.borrow_mut().get_or_insert(error);
                    input_collector.request_shutdown("renderer_failure");
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                let buffer_position =
                    renderer.window_to_buffer(position.x as f32, position.y as f32);
                input_collector.set_cursor_position(buffer_position);
            }
            WindowEvent::MouseInput { state, button, .. } => {
                if let Some(button) = map_mouse_button(button) {
                    input_collector.handle_mouse_input(button, state);
                }
            }
            WindowEvent::KeyboardInput { event, .. } => {
                input_collector.handle_key(event.physical_key, event.state);
            }
            WindowEvent::RedrawRequested => {
                if input_collector.shutdown_requested {
                    return;
                }

                // The only blocking point in the loop: hold the frame rate at the tick cap.
                let elapsed = Instant::now().saturating_duration_since(last_frame_instant);
                let cap_sleep = compute_cap_sleep(elapsed, frame_target);
                if cap_sleep > Duration::ZERO {
                    thread::sleep(cap_sleep);
                }
                let now = Instant::now();
                let frame_dt = now.saturating_duration_since(last_frame_instant);
                last_frame_instant = now;

                sampler.sample(input_collector.snapshot_for_tick());
                if scene.update(&sampler) == SceneCommand::Quit {
                    input_collector.request_shutdown("scene_quit");
                }
                metrics_accumulator.record_tick();

                if let Err(error) = renderer.render_scene(scene.as_ref(), config.clear_color) {
                    warn!(error = %error, "renderer_draw_failed");
                    loop_render_failure.borrow_mut().get_or_insert(error);
                    input_collector.request_shutdown("renderer_failure");
                }
                metrics_accumulator.record_frame(frame_dt);

                if let Some(snapshot) = metrics_accumulator.maybe_snapshot(now) {
                    info!(
                        fps = snapshot.fps,
                        tps = snapshot.tps,
                        frame_time_ms = snapshot.frame_time_ms,
                        "loop_metrics"
                    );
                    if config.show_fps_in_title {
                        window.set_title(&format_title(&config.window_title, &snapshot));
                    }
                }
            }
            _ => {}
        },
        Event::AboutToWait => {
            if input_collector.shutdown_requested {
                window_target.exit();
            } else {
                window.request_redraw();
            }
        }
        Event::LoopExiting => {
            scene.unload();
            info!("shutdown");
        }
        _ => {}
    });

    let render_failure = render_failure.borrow_mut().take();
    finish_run(run_result, render_failure)
}

/// A renderer failure that ended the loop outranks the loop's own result.
fn finish_run(
    run_result: Result<(), EventLoopError>,
    render_failure: Option<PixelsError>,
) -> Result<(), AppError> {
    if let Some(error) = render_failure {
        return Err(AppError::Render(error));
    }
    run_result.map_err(AppError::EventLoopRun)
}

/// Accumulates window events between ticks into the pointer state the next
/// tick samples.
#[derive(Debug, Default)]
struct InputCollector {
    shutdown_requested: bool,
    pointer: PointerState,
    latches: [ButtonLatch; BUTTON_COUNT],
}

/// Button transitions seen since the last tick, plus the level that tick
/// reported.
#[derive(Debug, Default, Clone, Copy)]
struct ButtonLatch {
    sampled_down: bool,
    pressed: bool,
    released: bool,
}

impl InputCollector {
    fn request_shutdown(&mut self, reason: &'static str) {
        if !self.shutdown_requested {
            info!(reason, "shutdown_requested");
        }
        self.shutdown_requested = true;
    }

    fn set_cursor_position(&mut self, position: Vec2) {
        self.pointer.set_position(position);
    }

    fn handle_mouse_input(&mut self, button: MouseButton, state: ElementState) {
        let latch = &mut self.latches[button.index()];
        match state {
            ElementState::Pressed => {
                if !self.pointer.is_down(button) {
                    latch.pressed = true;
                }
                self.pointer.set_button(button, true);
            }
            ElementState::Released => {
                if self.pointer.is_down(button) {
                    latch.released = true;
                }
                self.pointer.set_button(button, false);
            }
        }
    }

    fn handle_key(&mut self, key: PhysicalKey, state: ElementState) {
        if state == ElementState::Pressed && key == PhysicalKey::Code(KeyCode::Escape) {
            self.request_shutdown("escape_key");
        }
    }

    /// A press that was released again before the tick still reads as down
    /// for that one tick. A release and re-press of a button the last tick
    /// saw down reads as up for one tick and down on the next, so neither
    /// click loses its press edge.
    fn snapshot_for_tick(&mut self) -> PointerState {
        let mut snapshot = self.pointer;
        for button in MouseButton::ALL {
            let latch = &mut self.latches[button.index()];
            let reported = if latch.sampled_down && latch.released && latch.pressed {
                latch.released = false;
                false
            } else {
                let reported = latch.pressed || self.pointer.is_down(button);
                latch.pressed = false;
                latch.released = false;
                reported
            };
            latch.sampled_down = reported;
            snapshot.set_button(button, reported);
        }
        snapshot
    }
}

fn map_mouse_button(button: winit::event::MouseButton) -> Option<MouseButton> {
    match button {
        winit::event::MouseButton::Left => Some(MouseButton::Left),
        winit::event::MouseButton::Middle => Some(MouseButton::Middle),
        winit::event::MouseButton::Right => Some(MouseButton::Right),
        _ => None,
    }
}

fn target_frame_duration(target_tps: u32) -> Duration {
    Duration::from_secs_f64(1.0 / target_tps.max(1) as f64)
}

fn compute_cap_sleep(elapsed: Duration, target: Duration) -> Duration {
    target.saturating_sub(elapsed)
}

fn format_title(base: &str, snapshot: &LoopMetricsSnapshot) -> String {
    format!("{base} - {:.1} fps", snapshot.fps)
}
