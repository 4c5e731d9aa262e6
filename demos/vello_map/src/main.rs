// Copyright 2024 the Vello Authors
// Copyright 2025 the Carta Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Interactive map viewer.
//!
//! Drag with the left mouse button to pan, scroll to zoom, `1`-`3` to toggle
//! layers, Escape to quit.

use anyhow::Result;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing_subscriber::prelude::*;
use vello::kurbo::{Point, Rect, Size};
use vello::peniko::{color::palette, Color};
use vello::util::{RenderContext, RenderSurface};
use vello::{AaConfig, Renderer, RendererOptions, Scene};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::window::Window;

use carta::source::MemoryFeatureSource;
use carta::style::{Filter, Property, Rule, Selector, Value};
use carta::{Feature, Layer, Map, Style, Viewport};
use carta_vello::VelloCanvas;
use geo::{line_string, point, polygon};

use vello::wgpu;

enum RenderState<'s> {
    /// `RenderSurface` and `Window` for active rendering.
    Active {
        // The `RenderSurface` and the `Window` must be in this order, so that the surface is dropped first.
        surface: Box<RenderSurface<'s>>,
        window: Arc<Window>,
    },
    /// Cache a window so that it can be reused when the app is resumed after being suspended.
    Suspended(Option<Arc<Window>>),
}

/// Map, view and interaction state.
struct Viewer {
    map: Map,
    view: Viewport,
    renderer: carta::Renderer,
    cursor_pos: Point,
    dragging: bool,
}

impl Viewer {
    fn new(width: u32, height: u32) -> Result<Self> {
        let view = Viewport::new(Rect::new(0.0, 0.0, 1000.0, 800.0), width, height)?;
        let mut renderer = carta::Renderer::new();
        renderer.init(view.clone())?;
        Ok(Self {
            map: demo_map(),
            view,
            renderer,
            cursor_pos: Point::ORIGIN,
            dragging: false,
        })
    }

    fn commit(&mut self) {
        if let Err(e) = self.renderer.update_viewport(self.view.clone()) {
            tracing::error!("Failed to update viewport: {e}");
        }
    }

    /// Show or hide the layer called `name`.
    fn toggle(&mut self, name: &str) {
        let Some(layer) = self.map.layer_mut(name) else {
            return;
        };
        layer.set_visible(!layer.visible());
        tracing::info!(layer = name, visible = layer.visible(), "toggled layer");
    }
}

struct MapApp<'s> {
    // The vello RenderContext which is a global context that lasts for the
    // lifetime of the application
    context: RenderContext,

    // An array of renderers, one per wgpu device
    renderers: Vec<Option<Renderer>>,

    // State for our example where we store the winit Window and the wgpu Surface
    state: RenderState<'s>,

    // A vello Scene which is a data structure which allows one to build up a
    // description a scene to be drawn (with paths, fills, images, text, etc)
    // which is then passed to a renderer for rendering
    scene: Scene,

    /// Carta Vello environment.
    cv_environment: carta_vello::Environment,

    viewer: Option<Viewer>,
}

impl ApplicationHandler for MapApp<'_> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let RenderState::Suspended(cached_window) = &mut self.state else {
            return;
        };

        // Get the winit window cached in a previous Suspended event or else create a new window
        let window = cached_window
            .take()
            .unwrap_or_else(|| create_winit_window(event_loop));

        // Create a vello Surface
        let size = window.inner_size();
        let surface_future = self.context.create_surface(
            window.clone(),
            size.width,
            size.height,
            wgpu::PresentMode::AutoVsync,
        );
        let surface = pollster::block_on(surface_future).expect("Error creating surface");

        // Create a vello Renderer for the surface (using its device id)
        self.renderers
            .resize_with(self.context.devices.len(), || None);
        self.renderers[surface.dev_id]
            .get_or_insert_with(|| create_vello_renderer(&self.context, &surface));

        if self.viewer.is_none() {
            match Viewer::new(size.width.max(1), size.height.max(1)) {
                Ok(viewer) => self.viewer = Some(viewer),
                Err(e) => tracing::error!("Failed to create viewer: {e}"),
            }
        }

        // Save the Window and Surface to a state variable
        self.state = RenderState::Active {
            surface: Box::new(surface),
            window,
        };
    }

    fn suspended(&mut self, _event_loop: &ActiveEventLoop) {
        if let RenderState::Active { window, .. } = &self.state {
            self.state = RenderState::Suspended(Some(window.clone()));
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let (surface, window) = match &mut self.state {
            RenderState::Active { surface, window } if window.id() == window_id => {
                (surface, window.clone())
            }
            _ => return,
        };

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),

            WindowEvent::KeyboardInput { event, .. } => {
                use winit::keyboard::{Key, NamedKey};
                if !event.state.is_pressed() {
                    return;
                }
                match event.logical_key.as_ref() {
                    Key::Named(NamedKey::Escape) => event_loop.exit(),
                    Key::Character(c) => {
                        let name = match c {
                            "1" => "land",
                            "2" => "lines",
                            "3" => "towns",
                            _ => return,
                        };
                        if let Some(viewer) = &mut self.viewer {
                            viewer.toggle(name);
                            window.request_redraw();
                        }
                    }
                    _ => {}
                }
            }

            WindowEvent::Resized(size) => {
                self.context
                    .resize_surface(surface, size.width, size.height);
                if let Some(viewer) = &mut self.viewer {
                    match viewer.view.set_size(size.width.max(1), size.height.max(1)) {
                        Ok(()) => viewer.commit(),
                        Err(e) => tracing::error!("Failed to resize view: {e}"),
                    }
                }
                window.request_redraw();
            }

            WindowEvent::CursorMoved { position, .. } => {
                let p = {
                    let winit::dpi::PhysicalPosition::<f64> { x, y } = position;
                    Point { x, y }
                };
                let Some(viewer) = &mut self.viewer else {
                    return;
                };
                if viewer.dragging {
                    let d = p - viewer.cursor_pos;
                    viewer.view.pan(d.x, d.y);
                    viewer.commit();
                    window.request_redraw();
                }
                viewer.cursor_pos = p;
            }

            WindowEvent::MouseInput {
                state,
                button: winit::event::MouseButton::Left,
                ..
            } => {
                if let Some(viewer) = &mut self.viewer {
                    viewer.dragging = state.is_pressed();
                }
            }

            WindowEvent::MouseWheel { delta, .. } => {
                let Some(viewer) = &mut self.viewer else {
                    return;
                };

                use winit::{dpi::PhysicalPosition, event::MouseScrollDelta::*};
                let d = match delta {
                    LineDelta(_, y) => f64::from(y) * 0.1,
                    PixelDelta(PhysicalPosition::<f64> { y, .. }) => y * 0.05,
                };

                match viewer.view.zoom_about(viewer.cursor_pos, 1. + d) {
                    Ok(()) => viewer.commit(),
                    Err(e) => tracing::warn!("Ignoring zoom: {e}"),
                }
                window.request_redraw();
            }

            WindowEvent::RedrawRequested => {
                // Empty the scene of objects to draw. You could create a new Scene each time, but in this case
                // the same Scene is reused so that the underlying memory allocation can also be reused.
                self.scene.reset();

                let wgpu::SurfaceConfiguration { width, height, .. } = surface.config;

                if let Some(viewer) = &mut self.viewer {
                    let size = Size::new(f64::from(width), f64::from(height));
                    let mut canvas =
                        VelloCanvas::new(&mut self.scene, &mut self.cv_environment, size);
                    match viewer.renderer.render(&viewer.map, &mut canvas) {
                        Ok(report) => tracing::debug!(?report, "rendered"),
                        Err(e) => tracing::error!("Failed to render map: {e}"),
                    }
                }

                let device_handle = &self.context.devices[surface.dev_id];

                let surface_texture = tracing::info_span!("get_current_texture").in_scope(|| {
                    surface
                        .surface
                        .get_current_texture()
                        .expect("failed to get surface texture")
                });

                // Render to the surface's texture
                tracing::info_span!("render_to_surface").in_scope(|| {
                    self.renderers[surface.dev_id]
                        .as_mut()
                        .unwrap()
                        .render_to_texture(
                            &device_handle.device,
                            &device_handle.queue,
                            &self.scene,
                            &surface.target_view,
                            &vello::RenderParams {
                                base_color: palette::css::BLACK, // Background color
                                width,
                                height,
                                antialiasing_method: AaConfig::Msaa16,
                            },
                        )
                        .expect("failed to render to surface");
                });

                let mut encoder =
                    device_handle
                        .device
                        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                            label: Some("Surface Blit"),
                        });
                surface.blitter.copy(
                    &device_handle.device,
                    &mut encoder,
                    &surface.target_view,
                    &surface_texture
                        .texture
                        .create_view(&wgpu::TextureViewDescriptor::default()),
                );
                device_handle.queue.submit([encoder.finish()]);
                // Queue the texture to be presented on the surface
                surface_texture.present();

                device_handle.device.poll(wgpu::Maintain::Poll);
            }
            _ => {}
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(tracing::level_filters::LevelFilter::WARN.into())
                .from_env_lossy(),
        )
        .init();

    let mut app = MapApp {
        context: RenderContext::new(),
        renderers: vec![],
        state: RenderState::Suspended(None),
        scene: Scene::new(),
        cv_environment: Default::default(),
        viewer: None,
    };

    let event_loop = EventLoop::new()?;
    event_loop
        .run_app(&mut app)
        .expect("Couldn't run event loop");
    Ok(())
}

/// Helper function that creates a Winit window and returns it (wrapped in an Arc for sharing between threads)
fn create_winit_window(event_loop: &ActiveEventLoop) -> Arc<Window> {
    let attr = Window::default_attributes()
        .with_inner_size(LogicalSize::new(1000, 800))
        .with_resizable(true)
        .with_title("Carta");
    Arc::new(event_loop.create_window(attr).unwrap())
}

/// Helper function that creates a vello `Renderer` for a given `RenderContext` and `RenderSurface`
fn create_vello_renderer(render_cx: &RenderContext, surface: &RenderSurface<'_>) -> Renderer {
    Renderer::new(
        &render_cx.devices[surface.dev_id].device,
        RendererOptions {
            use_cpu: false,
            antialiasing_support: vello::AaSupport::all(),
            num_init_threads: NonZeroUsize::new(1),
            pipeline_cache: None,
        },
    )
    .expect("Couldn't create renderer")
}

/// A small island with a lake, a river, a road and a few towns.
fn demo_map() -> Map {
    let land: MemoryFeatureSource = [
        Feature::new("island")
            .with_attribute("kind", "land")
            .with_geometry(polygon![
                (x: 80.0, y: 120.0),
                (x: 900.0, y: 60.0),
                (x: 960.0, y: 600.0),
                (x: 520.0, y: 760.0),
                (x: 60.0, y: 640.0),
            ]),
        Feature::new("lake")
            .with_attribute("kind", "water")
            .with_attribute("name", "Still Lake")
            .with_geometry(polygon![
                (x: 300.0, y: 300.0),
                (x: 420.0, y: 280.0),
                (x: 460.0, y: 380.0),
                (x: 340.0, y: 420.0),
            ]),
    ]
    .into_iter()
    .collect();

    let lines: MemoryFeatureSource = [
        Feature::new("river")
            .with_attribute("kind", "river")
            .with_attribute("name", "Long River")
            .with_geometry(line_string![
                (x: 380.0, y: 350.0),
                (x: 470.0, y: 330.0),
                (x: 560.0, y: 300.0),
                (x: 660.0, y: 280.0),
                (x: 760.0, y: 250.0),
                (x: 920.0, y: 220.0),
            ]),
        Feature::new("road")
            .with_attribute("kind", "road")
            .with_attribute("name", "Coast Road")
            .with_geometry(line_string![
                (x: 120.0, y: 200.0),
                (x: 300.0, y: 180.0),
                (x: 520.0, y: 170.0),
                (x: 800.0, y: 120.0),
            ]),
    ]
    .into_iter()
    .collect();

    let towns: MemoryFeatureSource = [
        ("Northport", 700.0, 560.0, 12000.0),
        ("Westfield", 180.0, 420.0, 3400.0),
        ("Eastwick", 820.0, 380.0, 800.0),
        ("Southby", 500.0, 220.0, 5600.0),
    ]
    .into_iter()
    .map(|(name, x, y, pop)| {
        Feature::new(name)
            .with_attribute("name", name)
            .with_attribute("population", pop)
            .with_geometry(point!(x: x, y: y))
    })
    .collect();

    let water = Color::from_rgb8(120, 170, 220);
    let style = Style::new(vec![
        Rule::new(Selector::name("Map")).with(Property::BackgroundColor, water),
        Rule::new(Selector::id("land").filter(Filter::equals("kind", "land")))
            .with(Property::PolygonFill, Color::from_rgb8(236, 230, 210))
            .with(Property::LineColor, Color::from_rgb8(150, 140, 120))
            .with(Property::LineWidth, 1.5),
        Rule::new(Selector::id("land").filter(Filter::equals("kind", "water")))
            .with(Property::PolygonFill, water)
            .with(Property::TextName, Value::attr("name"))
            .with(Property::TextFill, Color::from_rgb8(30, 70, 130))
            .with(Property::TextAlign, Value::keyword("center")),
        Rule::new(Selector::id("lines").filter(Filter::equals("kind", "river")))
            .with(Property::LineColor, water)
            .with(Property::LineWidth, 4.0)
            .with(Property::LineCap, Value::keyword("round"))
            .with(Property::TextName, Value::attr("name"))
            .with(Property::TextFill, Color::from_rgb8(30, 70, 130)),
        Rule::new(Selector::id("lines").filter(Filter::equals("kind", "road")))
            .with(Property::LineColor, Color::from_rgb8(90, 90, 90))
            .with(Property::LineWidth, 5.0),
        Rule::new(Selector::id("lines").filter(Filter::equals("kind", "road")))
            .with(Property::ZIndex, 1.0)
            .with(Property::LineColor, Color::from_rgb8(250, 210, 120))
            .with(Property::LineWidth, 3.0)
            .with(Property::TextName, Value::attr("name")),
        Rule::new(Selector::id("towns"))
            .with(Property::MarkerFill, Color::from_rgb8(180, 40, 40))
            .with(Property::MarkerLineColor, Color::WHITE)
            .with(Property::MarkerWidth, 8.0)
            .with(Property::TextName, Value::attr("name"))
            .with(Property::TextDx, 6.0)
            .with(Property::TextMinPadding, 2.0)
            .with(Property::TextHaloFill, Color::WHITE)
            .with(Property::TextHaloRadius, 1.5),
    ]);

    Map::new(style)
        .with_layer(Layer::vector("land", Arc::new(land)))
        .with_layer(Layer::vector("lines", Arc::new(lines)))
        .with_layer(Layer::vector("towns", Arc::new(towns)))
}
