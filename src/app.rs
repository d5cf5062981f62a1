// Window and event loop wiring for lamp-viewer

use std::path::PathBuf;
use std::sync::Arc;

use winit::{
    event::{ElementState, Event, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ControlFlow, EventLoop, EventLoopBuilder, EventLoopProxy, EventLoopWindowTarget},
    window::{Window, WindowBuilder},
};

use crate::config::ViewerConfig;
use crate::error::Result;
use crate::loader;
use crate::renderer::Renderer;
use crate::scene::Scene;
use crate::viewer::{LoadPhase, Viewer};

/// Pixels of trackpad scroll treated as one wheel line.
const PIXELS_PER_LINE: f32 = 40.0;

pub enum AppEvent {
    SceneLoaded(Result<Scene>),
}

pub fn build_event_loop() -> Result<EventLoop<AppEvent>> {
    Ok(EventLoopBuilder::<AppEvent>::with_user_event().build()?)
}

/// Loads the model off the event loop and posts the result back to it.
pub fn spawn_model_load(proxy: EventLoopProxy<AppEvent>, path: PathBuf) {
    tokio::spawn(async move {
        let result = loader::load_scene_async(path).await;
        if proxy.send_event(AppEvent::SceneLoaded(result)).is_err() {
            log::warn!("Event loop closed before the model finished loading");
        }
    });
}

pub struct App {
    window: Arc<Window>,
    renderer: Renderer,
    viewer: Viewer,
    title: String,
}

impl App {
    pub async fn new(event_loop: &EventLoop<AppEvent>, config: ViewerConfig) -> Result<Self> {
        let window = Arc::new(WindowBuilder::new().with_title(&config.title).build(event_loop)?);
        let renderer = Renderer::new(window.clone()).await?;

        let size = window.inner_size();
        let viewer = Viewer::new(config, size.width, size.height);
        let title = viewer.title();
        window.set_title(&title);

        Ok(Self {
            window,
            renderer,
            viewer,
            title,
        })
    }

    pub fn run(mut self, event_loop: EventLoop<AppEvent>) -> Result<()> {
        event_loop.run(move |event, target| {
            // Frames are drawn on demand only.
            target.set_control_flow(ControlFlow::Wait);

            match event {
                Event::UserEvent(AppEvent::SceneLoaded(result)) => {
                    self.viewer.on_scene_loaded(result);
                    if matches!(self.viewer.phase(), LoadPhase::Ready { .. }) {
                        self.renderer.upload_scene(self.viewer.scene());
                    }
                }
                Event::WindowEvent { window_id, event } if window_id == self.window.id() => {
                    self.handle_window_event(event, target);
                }
                Event::AboutToWait => {
                    if self.viewer.take_redraw() {
                        self.window.request_redraw();
                    }
                    let title = self.viewer.title();
                    if title != self.title {
                        self.window.set_title(&title);
                        self.title = title;
                    }
                }
                _ => {}
            }
        })?;
        Ok(())
    }

    fn handle_window_event(&mut self, event: WindowEvent, target: &EventLoopWindowTarget<AppEvent>) {
        match event {
            WindowEvent::CloseRequested => target.exit(),
            WindowEvent::Resized(physical_size) => {
                self.renderer.resize(physical_size);
                self.viewer.resize(physical_size.width, physical_size.height);
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.viewer.pointer_moved(position.x as f32, position.y as f32);
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => match state {
                ElementState::Pressed => self.viewer.pointer_pressed(),
                ElementState::Released => {
                    if let Some(lamp) = self.viewer.pointer_released() {
                        log::info!("Lamp switched {:?}", lamp);
                    }
                }
            },
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(position) => position.y as f32 / PIXELS_PER_LINE,
                };
                self.viewer.scrolled(lines);
            }
            WindowEvent::RedrawRequested => self.renderer.render(&self.viewer),
            _ => {}
        }
    }
}
