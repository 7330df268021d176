//! Combined-mesh demo.
//!
//! Builds a torus, a sphere and a cube, combines them into one
//! device-resident mesh and draws every instance of every shape with a
//! single multi-draw-indirect dispatch into a multisampled viewport, which
//! is then resolved and blitted to the window.
//!
//! Run with:
//!   cargo run --example demo
//!   cargo run --example demo -- --shader-dir path/to/shaders
//!
//! Controls:
//!   Left drag   - Orbit
//!   Right drag  - Pan
//!   Middle drag - Roll
//!   Wheel       - Zoom (Ctrl: far clip, Ctrl+Shift: near clip)

use std::ffi::CString;
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::rc::Rc;

use clap::Parser;
use glam::{Mat4, Vec2, Vec3, Vec4};

use glutin::config::ConfigTemplateBuilder;
use glutin::context::{ContextApi, ContextAttributesBuilder, PossiblyCurrentContext, Version};
use glutin::display::GetGlDisplay;
use glutin::prelude::*;
use glutin::surface::{Surface, SurfaceAttributesBuilder, SwapInterval, WindowSurface};
use glutin_winit::{DisplayBuilder, GlWindow};
use raw_window_handle::HasWindowHandle;
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::ModifiersState;
use winit::window::{Window, WindowId};

use glkit::asset_io;
use glkit::backend::Gl46Backend;
use glkit::prelude::*;

const INSTANCES_PER_SHAPE: u32 = 64;
const SAMPLE_COUNT: u32 = 4;

#[derive(Parser)]
#[command(about = "glkit combined-mesh demo")]
struct Args {
    /// Directory containing the demo's shader sources.
    #[arg(long, default_value = "shaders")]
    shader_dir: PathBuf,
}

/// Per-instance record consumed by the multi-draw vertex shader through a
/// shader-storage binding.
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct Instance {
    object_to_world: Mat4,
    color: Vec4,
}

struct Scene {
    combined: Mesh,
    program: Program,
    instance_buffer: Buffer,
    instance_offset_buffer: Buffer,
    viewport: Viewport3D,
    frame_query: Query,
    frame_counter: u64,
}

struct GlWindowState {
    window: Window,
    surface: Surface<WindowSurface>,
    gl_context: PossiblyCurrentContext,
}

struct App {
    args: Args,
    ctx: Option<Context>,
    window_state: Option<GlWindowState>,
    scene: Option<Scene>,
    cursor: Vec2,
    modifiers: ModifiersState,
}

/// Cheap deterministic value in [0, 1) for scattering instances.
fn hash01(seed: u32) -> f32 {
    let mut x = seed.wrapping_mul(0x9e37_79b9).wrapping_add(0x85eb_ca6b);
    x ^= x >> 16;
    x = x.wrapping_mul(0x7feb_352d);
    x ^= x >> 15;
    (x & 0x00ff_ffff) as f32 / 0x0100_0000 as f32
}

fn build_instances(submesh_count: usize) -> (Vec<Instance>, Vec<i32>) {
    let mut instances = Vec::with_capacity(submesh_count * INSTANCES_PER_SHAPE as usize);
    let mut offsets = Vec::with_capacity(submesh_count);
    for shape in 0..submesh_count {
        offsets.push(instances.len() as i32);
        for index in 0..INSTANCES_PER_SHAPE {
            let seed = (shape as u32) << 16 | index;
            let position = 20.0
                * (Vec3::new(hash01(seed), hash01(seed ^ 0xa5a5), hash01(seed ^ 0x5a5a))
                    - Vec3::splat(0.5));
            let scale = 0.3 + 0.5 * hash01(seed ^ 0xbeef);
            let color = Vec4::new(
                0.3 + 0.7 * hash01(seed ^ 0x11),
                0.3 + 0.7 * hash01(seed ^ 0x22),
                0.3 + 0.7 * hash01(seed ^ 0x33),
                1.0,
            );
            instances.push(Instance {
                object_to_world: Mat4::from_translation(position) * Mat4::from_scale(Vec3::splat(scale)),
                color,
            });
        }
    }
    (instances, offsets)
}

fn build_scene(ctx: &Context, shader_dir: &PathBuf) -> glkit::Result<Scene> {
    let torus = asset_io::make_torus(ctx, 1.0, 0.35, 32)?;
    let sphere = asset_io::make_sphere(ctx, 32)?;
    let cube = asset_io::make_cube(ctx)?;

    let mut combined = Mesh::combine(&[&torus.mesh, &sphere.mesh, &cube.mesh])?;
    combined.set_instance_counts(&vec![INSTANCES_PER_SHAPE; combined.submesh_count()])?;

    let (instances, offsets) = build_instances(combined.submesh_count());
    let instance_buffer = Buffer::from_slice(
        ctx,
        BufferTarget::ShaderStorage,
        &instances,
        BufferUsage::StaticDraw,
    )?;
    let instance_offset_buffer = Buffer::from_slice(
        ctx,
        BufferTarget::ShaderStorage,
        &offsets,
        BufferUsage::StaticDraw,
    )?;

    let vertex = Shader::compile(
        ctx,
        ShaderStage::Vertex,
        &asset_io::load_string(shader_dir.join("mesh_multi_draw.vert"))?,
    )?;
    let fragment = Shader::compile(
        ctx,
        ShaderStage::Fragment,
        &asset_io::load_string(shader_dir.join("phong_multi.frag"))?,
    )?;
    let program = Program::link(ctx, &[&vertex, &fragment])?;
    if !program.linked() {
        log::error!("demo program is broken:\n{}", program.log());
    }

    let mut viewport = Viewport3D::new(ctx, "main", &[])?;
    viewport.camera.position = Vec3::new(18.0, 18.0, 12.0);
    viewport.controller.scene_diagonal = Vec3::splat(20.0);

    Ok(Scene {
        combined,
        program,
        instance_buffer,
        instance_offset_buffer,
        viewport,
        frame_query: Query::new(ctx, QueryTarget::TimeElapsed)?,
        frame_counter: 0,
    })
}

impl App {
    fn new(args: Args) -> Self {
        Self {
            args,
            ctx: None,
            window_state: None,
            scene: None,
            cursor: Vec2::splat(0.5),
            modifiers: ModifiersState::empty(),
        }
    }

    fn render(&mut self) {
        let (Some(ctx), Some(window_state), Some(scene)) =
            (&self.ctx, &self.window_state, &mut self.scene)
        else {
            return;
        };

        let size = window_state.window.inner_size();
        if scene
            .viewport
            .resize(size.width, size.height, SAMPLE_COUNT)
            .is_err()
        {
            return;
        }

        let framebuffer = scene.viewport.viewport.framebuffer();
        scene.frame_query.begin();

        ctx.set_viewport(0, 0, framebuffer.width(), framebuffer.height());
        framebuffer.clear([0.05, 0.05, 0.08, 1.0], ClearMask::COLOR | ClearMask::DEPTH);

        let camera = &scene.viewport.camera;
        scene
            .program
            .set_uniform("view_proj", camera.view_proj())
            .set_uniform("light_position", camera.position)
            .set_uniform("camera_position", camera.position);
        scene.instance_buffer.bind_as_storage(0);
        scene.instance_offset_buffer.bind_as_storage(1);
        scene.combined.draw();

        scene.frame_query.end();

        scene.viewport.viewport.resolve();
        let surface = Framebuffer::default_surface(ctx, size.width, size.height);
        scene
            .viewport
            .final_framebuffer()
            .blit_to(&surface, 0, BlitFilter::Nearest, 0);

        window_state
            .surface
            .swap_buffers(&window_state.gl_context)
            .expect("failed to present");

        scene.frame_counter += 1;
        if scene.frame_counter % 120 == 0 {
            let nanoseconds = scene.frame_query.poll();
            log::info!("draw pass: {:.2} ms", nanoseconds as f64 / 1.0e6);
            ctx.poll_errors();
        }
    }

    fn normalized_cursor(&self, position: Vec2) -> Vec2 {
        let Some(window_state) = &self.window_state else {
            return Vec2::splat(0.5);
        };
        let size = window_state.window.inner_size();
        position / Vec2::new(size.width.max(1) as f32, size.height.max(1) as f32)
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window_state.is_some() {
            return;
        }

        let attributes = Window::default_attributes()
            .with_title("glkit demo")
            .with_inner_size(LogicalSize::new(1280.0, 720.0));
        let template = ConfigTemplateBuilder::new().with_depth_size(24);
        let display_builder = DisplayBuilder::new().with_window_attributes(Some(attributes));
        let (window, gl_config) = display_builder
            .build(event_loop, template, |mut configs| {
                configs.next().expect("no matching GL configuration")
            })
            .expect("failed to build window and GL display");
        let window = window.expect("window was not created");

        let raw_window_handle = window
            .window_handle()
            .expect("window has no native handle")
            .as_raw();
        let gl_display = gl_config.display();
        let context_attributes = ContextAttributesBuilder::new()
            .with_context_api(ContextApi::OpenGl(Some(Version::new(4, 6))))
            .build(Some(raw_window_handle));
        let not_current = unsafe {
            gl_display
                .create_context(&gl_config, &context_attributes)
                .expect("failed to create a GL 4.6 context")
        };

        let surface_attributes = window
            .build_surface_attributes(SurfaceAttributesBuilder::<WindowSurface>::new())
            .expect("failed to build surface attributes");
        let surface = unsafe {
            gl_display
                .create_window_surface(&gl_config, &surface_attributes)
                .expect("failed to create the window surface")
        };
        let gl_context = not_current
            .make_current(&surface)
            .expect("failed to make the context current");
        let _ = surface.set_swap_interval(&gl_context, SwapInterval::Wait(NonZeroU32::new(1).unwrap()));

        let backend = unsafe {
            Gl46Backend::from_loader(|symbol| {
                let symbol = CString::new(symbol).unwrap();
                gl_display.get_proc_address(&symbol)
            })
        };
        let ctx = Context::new(Rc::new(backend));
        ctx.enable(Capability::DepthTest);
        ctx.enable(Capability::Multisample);

        let scene = build_scene(&ctx, &self.args.shader_dir).expect("failed to build the demo scene");

        self.ctx = Some(ctx);
        self.scene = Some(scene);
        self.window_state = Some(GlWindowState {
            window,
            surface,
            gl_context,
        });
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                if let Some(window_state) = &self.window_state {
                    window_state.surface.resize(
                        &window_state.gl_context,
                        NonZeroU32::new(size.width.max(1)).unwrap(),
                        NonZeroU32::new(size.height.max(1)).unwrap(),
                    );
                }
            }
            WindowEvent::ModifiersChanged(modifiers) => {
                self.modifiers = modifiers.state();
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = self.normalized_cursor(Vec2::new(position.x as f32, position.y as f32));
                if let Some(scene) = &mut self.scene {
                    let cursor = self.cursor;
                    let viewport = &mut scene.viewport;
                    viewport.controller.update_drag(&mut viewport.camera, cursor);
                }
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let Some(scene) = &mut self.scene else { return };
                let viewport = &mut scene.viewport;
                match state {
                    ElementState::Pressed => {
                        let mode = match button {
                            MouseButton::Left => DragMode::Orbit,
                            MouseButton::Right => DragMode::Pan,
                            MouseButton::Middle => DragMode::Roll,
                            _ => return,
                        };
                        viewport
                            .controller
                            .begin_drag(&viewport.camera, self.cursor, mode);
                    }
                    ElementState::Released => viewport.controller.end_drag(),
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let Some(scene) = &mut self.scene else { return };
                let steps = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(position) => position.y as f32 / 40.0,
                };
                let action = if self.modifiers.control_key() && self.modifiers.shift_key() {
                    WheelAction::AdjustNear
                } else if self.modifiers.control_key() {
                    WheelAction::AdjustFar
                } else {
                    WheelAction::Zoom
                };
                let viewport = &mut scene.viewport;
                viewport
                    .controller
                    .apply_wheel(&mut viewport.camera, steps, action);
            }
            WindowEvent::RedrawRequested => {
                self.render();
                if let Some(window_state) = &self.window_state {
                    window_state.window.request_redraw();
                }
            }
            _ => {}
        }
    }
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let event_loop = EventLoop::new().expect("failed to create the event loop");
    event_loop.set_control_flow(ControlFlow::Poll);
    let mut app = App::new(args);
    event_loop.run_app(&mut app).expect("event loop error");
}
