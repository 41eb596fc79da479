//! Window shell: event loop, camera input and one driver frame per redraw.

use std::sync::Arc;

use winit::{
    application::ApplicationHandler,
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

use crate::config::EchoConfig;
use crate::driver::FrameDriver;
use crate::error::SimulationError;
use crate::field::FieldSlot;
use crate::gpu::{Camera, GpuBackend, GpuContext};

const ORBIT_SENSITIVITY: f32 = 0.005;
const ZOOM_SENSITIVITY: f32 = 0.3;

/// Open a window and run the particle field until it is closed.
///
/// Frames published to `field` from any thread are picked up on the next
/// redraw.
pub fn run(config: EchoConfig, field: FieldSlot) -> Result<(), SimulationError> {
    config.validate()?;

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config, field);
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

struct App {
    config: EchoConfig,
    field: FieldSlot,
    window: Option<Arc<Window>>,
    driver: Option<FrameDriver<GpuBackend>>,
    camera: Camera,
    mouse_pressed: bool,
    last_mouse_pos: Option<(f64, f64)>,
    error: Option<SimulationError>,
}

impl App {
    fn new(config: EchoConfig, field: FieldSlot) -> Self {
        Self {
            config,
            field,
            window: None,
            driver: None,
            camera: Camera::new(),
            mouse_pressed: false,
            last_mouse_pos: None,
            error: None,
        }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<(), SimulationError> {
        let window_attrs = Window::default_attributes()
            .with_title("Quantum Echo")
            .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));

        let window = Arc::new(event_loop.create_window(window_attrs)?);
        let context =
            pollster::block_on(GpuContext::new(window.clone(), self.config.grid.resolution))?;
        let (backend, slots) = GpuBackend::new(context, &self.config)?;

        self.driver = Some(FrameDriver::new(backend, slots, self.field.clone()));
        self.window = Some(window);
        Ok(())
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(driver) = &mut self.driver else {
            return;
        };

        self.camera.update(driver.clock().delta(), driver.state());
        let (width, height) = driver.backend().context().viewport();
        driver
            .backend_mut()
            .set_view(self.camera.view_projection(width, height));

        match driver.frame() {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                driver.backend_mut().resize(width, height);
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("GPU out of memory, exiting");
                event_loop.exit();
            }
            Err(e) => log::warn!("Render error: {:?}", e),
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.init(event_loop) {
                log::error!("Startup failed: {}", e);
                self.error = Some(e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(physical_size) => {
                if let Some(driver) = &mut self.driver {
                    driver
                        .backend_mut()
                        .resize(physical_size.width, physical_size.height);
                }
            }
            WindowEvent::MouseInput { state, button, .. } => {
                if button == MouseButton::Left {
                    self.mouse_pressed = state == ElementState::Pressed;
                    if !self.mouse_pressed {
                        self.last_mouse_pos = None;
                    }
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                if self.mouse_pressed {
                    if let Some((last_x, last_y)) = self.last_mouse_pos {
                        let dx = (position.x - last_x) as f32;
                        let dy = (position.y - last_y) as f32;
                        self.camera
                            .orbit(-dx * ORBIT_SENSITIVITY, dy * ORBIT_SENSITIVITY);
                    }
                    self.last_mouse_pos = Some((position.x, position.y));
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let scroll = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 * 0.1,
                };
                self.camera.zoom(scroll * ZOOM_SENSITIVITY);
            }
            WindowEvent::RedrawRequested => {
                self.redraw(event_loop);
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }
}
