use std::collections::BTreeMap;
use std::mem::{offset_of, size_of};
use std::sync::Arc;

use backdrop_common::Viewport;
use backdrop_render::{
    BackendError, BufferId, CompositeOptions, ProgramId, RenderBackend, ShaderStage,
    UniformLocation, UniformName, UniformValue,
};
use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::shaders;

/// Fragment uniform block, laid out to match `struct Uniforms` in WGSL.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, Pod, Zeroable)]
pub struct UniformBlock {
    pub resolution: [f32; 2],
    pub time: f32,
    _pad0: f32,
    pub color1: [f32; 3],
    _pad1: f32,
    pub color2: [f32; 3],
    _pad2: f32,
    pub color3: [f32; 3],
    _pad3: f32,
    pub color4: [f32; 3],
    _pad4: f32,
}

const UNIFORM_BLOCK_SIZE: usize = size_of::<UniformBlock>();

/// Byte offset of a uniform inside [`UniformBlock`]. Used as its location.
pub fn uniform_offset(name: UniformName) -> usize {
    match name {
        UniformName::Resolution => offset_of!(UniformBlock, resolution),
        UniformName::Time => offset_of!(UniformBlock, time),
        UniformName::Color1 => offset_of!(UniformBlock, color1),
        UniformName::Color2 => offset_of!(UniformBlock, color2),
        UniformName::Color3 => offset_of!(UniformBlock, color3),
        UniformName::Color4 => offset_of!(UniformBlock, color4),
    }
}

fn uniform_at(location: UniformLocation) -> Option<UniformName> {
    UniformName::ALL
        .into_iter()
        .find(|n| uniform_offset(*n) == location.0 as usize)
}

struct GpuContext {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    max_dimension: u32,
}

struct GpuProgram {
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    staging: [u8; UNIFORM_BLOCK_SIZE],
}

struct GpuQuad {
    buffer: wgpu::Buffer,
    vertex_count: u32,
}

/// wgpu implementation of [`RenderBackend`] drawing into a window surface.
pub struct WgpuBackend {
    window: Arc<Window>,
    context: Option<GpuContext>,
    programs: BTreeMap<ProgramId, GpuProgram>,
    quads: BTreeMap<BufferId, GpuQuad>,
    viewport: Viewport,
    pending: Option<wgpu::SurfaceTexture>,
    next_id: u64,
}

impl WgpuBackend {
    pub fn new(window: Arc<Window>) -> Self {
        Self {
            window,
            context: None,
            programs: BTreeMap::new(),
            quads: BTreeMap::new(),
            viewport: Viewport::default(),
            pending: None,
            next_id: 0,
        }
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn context(&self) -> Result<&GpuContext, BackendError> {
        self.context
            .as_ref()
            .ok_or_else(|| BackendError::ContextUnavailable("no wgpu device".into()))
    }

    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn shader_module(
        device: &wgpu::Device,
        stage: ShaderStage,
        source: String,
    ) -> Result<wgpu::ShaderModule, BackendError> {
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(match stage {
                ShaderStage::Vertex => "backdrop_vertex",
                ShaderStage::Fragment => "backdrop_fragment",
            }),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });
        match pollster::block_on(device.pop_error_scope()) {
            Some(err) => Err(BackendError::Compile {
                stage,
                log: err.to_string(),
            }),
            None => Ok(module),
        }
    }
}

impl RenderBackend for WgpuBackend {
    fn acquire_context(&mut self) -> Result<(), BackendError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(self.window.clone())
            .map_err(|e| BackendError::ContextUnavailable(e.to_string()))?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::LowPower,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| BackendError::ContextUnavailable("no compatible adapter".into()))?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("backdrop_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults()
                    .using_resolution(adapter.limits()),
                memory_hints: Default::default(),
            },
            None,
        ))
        .map_err(|e| BackendError::ContextUnavailable(e.to_string()))?;

        let size = self.window.inner_size();
        let caps = surface.get_capabilities(&adapter);
        // The fragment stage writes display-ready values; avoid a second sRGB encode.
        let format = caps
            .formats
            .iter()
            .find(|f| !f.is_srgb())
            .or_else(|| caps.formats.first())
            .copied()
            .ok_or_else(|| BackendError::ContextUnavailable("surface has no formats".into()))?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        tracing::info!(
            adapter = %adapter.get_info().name,
            ?format,
            width = config.width,
            height = config.height,
            "wgpu context acquired"
        );

        self.context = Some(GpuContext {
            max_dimension: device.limits().max_texture_dimension_2d,
            surface,
            device,
            queue,
            config,
        });
        Ok(())
    }

    fn compile_program(&mut self, options: &CompositeOptions) -> Result<ProgramId, BackendError> {
        let ctx = self.context()?;
        let device = &ctx.device;

        let vertex =
            Self::shader_module(device, ShaderStage::Vertex, shaders::VERTEX_SHADER.into())?;
        let fragment = Self::shader_module(
            device,
            ShaderStage::Fragment,
            shaders::fragment_source(options),
        )?;

        let staging = [0u8; UNIFORM_BLOCK_SIZE];
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("backdrop_uniforms"),
            contents: &staging,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("backdrop_uniform_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("backdrop_uniform_group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("backdrop_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("backdrop_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &vertex,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: size_of::<[f32; 2]>() as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![0 => Float32x2],
                }],
            },
            fragment: Some(wgpu::FragmentState {
                module: &fragment,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: ctx.config.format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: Default::default(),
            multiview: None,
            cache: None,
        });
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            uniform_buffer.destroy();
            return Err(BackendError::Link {
                log: err.to_string(),
            });
        }

        let id = ProgramId(self.allocate_id());
        self.programs.insert(
            id,
            GpuProgram {
                pipeline,
                uniform_buffer,
                bind_group,
                staging,
            },
        );
        tracing::debug!(program = id.0, ?options, "pipeline linked");
        Ok(id)
    }

    fn upload_quad(&mut self, vertices: &[[f32; 2]]) -> Result<BufferId, BackendError> {
        let buffer = self
            .context()?
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("backdrop_quad"),
                contents: bytemuck::cast_slice(vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let id = BufferId(self.allocate_id());
        self.quads.insert(
            id,
            GpuQuad {
                buffer,
                vertex_count: vertices.len() as u32,
            },
        );
        Ok(id)
    }

    fn uniform_location(&self, program: ProgramId, name: UniformName) -> Option<UniformLocation> {
        self.programs
            .get(&program)
            .map(|_| UniformLocation(uniform_offset(name) as u32))
    }

    fn resize_surface(&mut self, viewport: Viewport) -> Result<(), BackendError> {
        // a frame acquired at the old size must not outlive the reconfigure
        self.pending = None;
        let ctx = self
            .context
            .as_mut()
            .ok_or_else(|| BackendError::ContextUnavailable("no wgpu device".into()))?;
        ctx.config.width = viewport.width.clamp(1, ctx.max_dimension);
        ctx.config.height = viewport.height.clamp(1, ctx.max_dimension);
        ctx.surface.configure(&ctx.device, &ctx.config);
        self.viewport = Viewport {
            width: ctx.config.width,
            height: ctx.config.height,
            device_pixel_ratio: viewport.device_pixel_ratio,
        };
        Ok(())
    }

    fn set_uniform(
        &mut self,
        program: ProgramId,
        location: UniformLocation,
        value: UniformValue,
    ) -> Result<(), BackendError> {
        let state = self
            .programs
            .get_mut(&program)
            .ok_or(BackendError::UnknownProgram(program))?;
        let name = uniform_at(location).ok_or(BackendError::UnknownLocation(location))?;
        if name.kind() != value.kind() {
            return Err(BackendError::UniformType {
                name,
                expected: name.kind(),
                found: value.kind(),
            });
        }
        let (lanes, len) = match value {
            UniformValue::Float(v) => ([v, 0.0, 0.0], 1),
            UniformValue::Vec2(v) => ([v.x, v.y, 0.0], 2),
            UniformValue::Vec3(v) => (v.to_array(), 3),
        };
        let bytes: &[u8] = bytemuck::cast_slice(&lanes[..len]);
        let offset = location.0 as usize;
        state.staging[offset..offset + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    fn draw(&mut self, program: ProgramId, quad: BufferId) -> Result<(), BackendError> {
        let ctx = self
            .context
            .as_ref()
            .ok_or_else(|| BackendError::ContextUnavailable("no wgpu device".into()))?;
        let state = self
            .programs
            .get(&program)
            .ok_or(BackendError::UnknownProgram(program))?;
        let quad = self.quads.get(&quad).ok_or(BackendError::UnknownBuffer(quad))?;

        let output = match ctx.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                ctx.surface.configure(&ctx.device, &ctx.config);
                return Err(BackendError::Surface("surface lost, reconfigured".into()));
            }
            Err(e) => return Err(BackendError::Surface(e.to_string())),
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        ctx.queue.write_buffer(&state.uniform_buffer, 0, &state.staging);

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("backdrop_encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("backdrop_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                ..Default::default()
            });
            pass.set_viewport(
                0.0,
                0.0,
                ctx.config.width as f32,
                ctx.config.height as f32,
                0.0,
                1.0,
            );
            pass.set_pipeline(&state.pipeline);
            pass.set_bind_group(0, &state.bind_group, &[]);
            pass.set_vertex_buffer(0, quad.buffer.slice(..));
            pass.draw(0..quad.vertex_count, 0..1);
        }
        ctx.queue.submit(std::iter::once(encoder.finish()));

        self.pending = Some(output);
        Ok(())
    }

    fn present(&mut self) -> Result<(), BackendError> {
        if let Some(frame) = self.pending.take() {
            self.window.pre_present_notify();
            frame.present();
        }
        Ok(())
    }

    fn release_program(&mut self, program: ProgramId) {
        if let Some(state) = self.programs.remove(&program) {
            state.uniform_buffer.destroy();
        }
    }

    fn release_buffer(&mut self, buffer: BufferId) {
        if let Some(quad) = self.quads.remove(&buffer) {
            quad.buffer.destroy();
        }
    }

    fn release_context(&mut self) {
        self.pending = None;
        for (_, state) in std::mem::take(&mut self.programs) {
            state.uniform_buffer.destroy();
        }
        for (_, quad) in std::mem::take(&mut self.quads) {
            quad.buffer.destroy();
        }
        if self.context.take().is_some() {
            tracing::info!("wgpu context released");
        }
    }
}
