//! Windowed sessions on winit.
//!
//! A single [`EventLoop`] is reused for the whole batch: each session runs
//! `run_app_on_demand` until its window closes, then the next one opens.

use std::path::PathBuf;
use std::sync::Arc;

use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::platform::run_on_demand::EventLoopExtRunOnDemand;
use winit::window::{Window, WindowId};

use volscope_core::{InteractionOutcome, Options, PointerEvent, Volume};
use volscope_render::{GpuBackend, GpuContext, RenderError};

use crate::driver::SessionRunner;
use crate::error::SessionError;
use crate::session::Session;

/// Opens one window per volume on a shared event loop and GPU context.
pub struct WindowedRunner {
    event_loop: EventLoop<()>,
    context: Option<Arc<GpuContext>>,
}

impl WindowedRunner {
    pub fn new() -> Result<Self, SessionError> {
        Ok(Self {
            event_loop: EventLoop::new()?,
            context: None,
        })
    }
}

impl SessionRunner for WindowedRunner {
    fn run_session(&mut self, label: &str, volume: Volume, options: &Options) -> Result<u64, SessionError> {
        let mut app = VolumeApp::new(label, volume, options.clone(), self.context.clone());
        self.event_loop.run_app_on_demand(&mut app)?;
        if self.context.is_none() {
            self.context.clone_from(&app.context);
        }
        app.finish()
    }
}

/// Pointer buttons held for camera navigation.
#[derive(Debug, Default, Clone, Copy)]
struct Navigation {
    orbiting: bool,
    panning: bool,
}

/// Application state for one windowed session.
struct VolumeApp {
    label: String,
    volume: Option<Volume>,
    options: Options,
    context: Option<Arc<GpuContext>>,
    window: Option<Arc<Window>>,
    session: Option<Session<GpuBackend>>,
    error: Option<SessionError>,
    cursor: (f32, f32),
    navigation: Navigation,
    screenshots: u32,
}

impl VolumeApp {
    fn new(label: &str, volume: Volume, options: Options, context: Option<Arc<GpuContext>>) -> Self {
        Self {
            label: label.to_owned(),
            volume: Some(volume),
            options,
            context,
            window: None,
            session: None,
            error: None,
            cursor: (0.0, 0.0),
            navigation: Navigation::default(),
            screenshots: 0,
        }
    }

    fn start(&mut self, event_loop: &ActiveEventLoop) -> Result<(), SessionError> {
        let Some(volume) = self.volume.take() else {
            return Ok(());
        };
        let window_options = &self.options.window;
        let attributes = Window::default_attributes()
            .with_title(format!("{} - {}", window_options.title, self.label))
            .with_inner_size(LogicalSize::new(window_options.width, window_options.height));
        let window = Arc::new(event_loop.create_window(attributes)?);

        let (context, surface) = match &self.context {
            Some(context) => (Arc::clone(context), context.create_surface(window.clone())?),
            None => GpuContext::for_window(window.clone())?,
        };
        self.context = Some(Arc::clone(&context));

        let size = window.inner_size();
        let backend = GpuBackend::windowed(context, surface, size.width, size.height)?;
        let session = Session::new(self.label.clone(), volume, backend, &self.options)?;

        window.request_redraw();
        self.window = Some(window);
        self.session = Some(session);
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: SessionError) {
        log::error!("session '{}' failed: {err}", self.label);
        self.error = Some(err);
        if let Some(session) = &mut self.session {
            session.close();
        }
        event_loop.exit();
    }

    fn request_redraw(&self) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn pointer(&mut self, event_loop: &ActiveEventLoop, event: PointerEvent) -> Option<InteractionOutcome> {
        let session = self.session.as_mut()?;
        match session.handle_pointer(event) {
            Ok(outcome) => Some(outcome),
            Err(err) => {
                self.render_failed(event_loop, err);
                None
            }
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(session) = &mut self.session else {
            return;
        };
        if let Err(err) = session.render() {
            self.render_failed(event_loop, err);
        }
    }

    /// Lost and outdated surfaces were reconfigured by the backend; try again.
    fn render_failed(&mut self, event_loop: &ActiveEventLoop, err: RenderError) {
        match err {
            RenderError::SurfaceLost | RenderError::SurfaceOutdated | RenderError::Timeout => {
                log::debug!("frame skipped: {err}");
                self.request_redraw();
            }
            err => self.fail(event_loop, err.into()),
        }
    }

    fn close(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(session) = &mut self.session {
            session.close();
        }
        event_loop.exit();
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, code: KeyCode) {
        let Some(session) = &mut self.session else {
            return;
        };
        match code {
            KeyCode::Escape => {
                self.close(event_loop);
                return;
            }
            KeyCode::BracketLeft => session.scale_step(0.5),
            KeyCode::BracketRight => session.scale_step(2.0),
            KeyCode::KeyR => session.refit_camera(),
            KeyCode::KeyP => {
                self.screenshots += 1;
                let path = PathBuf::from(format!("{}_{:03}.png", self.label, self.screenshots));
                if let Err(err) = session.save_screenshot(&path) {
                    log::warn!("screenshot failed: {err}");
                }
                return;
            }
            _ => return,
        }
        self.request_redraw();
    }

    fn finish(self) -> Result<u64, SessionError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        Ok(self.session.map_or(0, |s| s.frames_rendered()))
    }
}

impl ApplicationHandler for VolumeApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() || self.error.is_some() {
            return;
        }
        if let Err(err) = self.start(event_loop) {
            self.fail(event_loop, err);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                self.pointer(event_loop, PointerEvent::CloseRequested);
                self.close(event_loop);
            }
            WindowEvent::Resized(size) => {
                if let Some(session) = &mut self.session {
                    session.resize(size.width, size.height);
                }
                self.request_redraw();
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            WindowEvent::CursorMoved { position, .. } => {
                let (x, y) = (position.x as f32, position.y as f32);
                let (dx, dy) = (x - self.cursor.0, y - self.cursor.1);
                self.cursor = (x, y);

                let outcome = self.pointer(event_loop, PointerEvent::Move { x, y });
                if outcome != Some(InteractionOutcome::Ignored) {
                    return;
                }
                let navigation = self.navigation;
                if let Some(session) = &mut self.session {
                    if navigation.orbiting {
                        session.orbit(dx, dy);
                    } else if navigation.panning {
                        session.pan(dx, dy);
                    } else {
                        return;
                    }
                }
                self.request_redraw();
            }
            WindowEvent::MouseInput { state, button, .. } => match (button, state) {
                (MouseButton::Left, ElementState::Pressed) => {
                    let (x, y) = self.cursor;
                    let outcome = self.pointer(event_loop, PointerEvent::Down { x, y });
                    self.navigation.orbiting = outcome == Some(InteractionOutcome::Unhandled);
                }
                (MouseButton::Left, ElementState::Released) => {
                    self.navigation.orbiting = false;
                    self.pointer(event_loop, PointerEvent::Up);
                }
                (MouseButton::Right, pressed) => {
                    self.navigation.panning = pressed == ElementState::Pressed;
                }
                _ => {}
            },
            WindowEvent::MouseWheel { delta, .. } => {
                let amount = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(p) => p.y as f32 / 50.0,
                };
                if let Some(session) = &mut self.session {
                    session.zoom(amount);
                }
                self.request_redraw();
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => self.handle_key(event_loop, code),
            _ => {}
        }
    }
}
