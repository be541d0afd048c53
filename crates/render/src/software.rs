//! CPU reference backend.
//!
//! Evaluates the compositor for every pixel. Slow, but bit-for-bit
//! deterministic, and it records enough bookkeeping for tests to observe what
//! a driver did to it.

use std::cell::Cell;
use std::collections::BTreeMap;

use backdrop_common::{Palette, Viewport};
use glam::{Vec2, Vec3, vec2};
use sha2::{Digest, Sha256};
use tracing::{debug, trace};

use crate::compose::{CompositeOptions, FrameUniforms, shade_pixel, to_rgba8};
use crate::renderer::{
    BackendError, BufferId, ProgramId, RenderBackend, ShaderStage, UniformLocation, UniformName,
    UniformValue,
};

/// An RGBA8 image, rows top to bottom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Frame {
    pub fn new(width: u32, height: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 4],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let mut px = [0; 4];
        px.copy_from_slice(&self.pixels[i..i + 4]);
        Some(px)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.pixels
    }

    /// Hex SHA-256 of the pixel bytes.
    pub fn digest(&self) -> String {
        let hash = Sha256::digest(&self.pixels);
        hash.iter().map(|b| format!("{b:02x}")).collect()
    }

    fn shade(&mut self, uniforms: &FrameUniforms, options: &CompositeOptions) {
        let width = self.width as usize;
        for (i, px) in self.pixels.chunks_exact_mut(4).enumerate() {
            let frag = vec2((i % width) as f32 + 0.5, (i / width) as f32 + 0.5);
            px.copy_from_slice(&to_rgba8(shade_pixel(frag, uniforms, options)));
        }
    }
}

/// Render one frame directly, without a driver.
pub fn render_frame(
    viewport: Viewport,
    time: f32,
    palette: Palette,
    options: CompositeOptions,
) -> Frame {
    let uniforms = FrameUniforms {
        resolution: viewport.resolution(),
        time,
        palette,
    };
    let mut frame = Frame::new(viewport.width, viewport.height);
    frame.shade(&uniforms, &options);
    frame
}

/// One `set_uniform` call as seen by the backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformWrite {
    pub program: ProgramId,
    pub name: UniformName,
    pub value: UniformValue,
}

#[derive(Debug, Clone)]
enum CompileFault {
    Stage(ShaderStage, String),
    Link(String),
}

#[derive(Debug, Clone)]
struct ProgramState {
    options: CompositeOptions,
    values: [Option<UniformValue>; 6],
}

impl ProgramState {
    fn value(&self, name: UniformName) -> Option<UniformValue> {
        self.values[location_of(name).0 as usize]
    }

    /// Unset uniforms read as zero.
    fn frame_uniforms(&self) -> FrameUniforms {
        let vec3 = |name| match self.value(name) {
            Some(UniformValue::Vec3(v)) => v,
            _ => Vec3::ZERO,
        };
        FrameUniforms {
            resolution: match self.value(UniformName::Resolution) {
                Some(UniformValue::Vec2(v)) => v,
                _ => Vec2::ZERO,
            },
            time: match self.value(UniformName::Time) {
                Some(UniformValue::Float(v)) => v,
                _ => 0.0,
            },
            palette: Palette {
                color1: vec3(UniformName::Color1),
                color2: vec3(UniformName::Color2),
                color3: vec3(UniformName::Color3),
                color4: vec3(UniformName::Color4),
            },
        }
    }
}

fn location_of(name: UniformName) -> UniformLocation {
    let index = UniformName::ALL
        .iter()
        .position(|n| *n == name)
        .unwrap_or_default();
    UniformLocation(index as u32)
}

/// CPU backend that shades into an in-memory [`Frame`].
#[derive(Debug, Default)]
pub struct SoftwareBackend {
    context: bool,
    context_fault: Option<String>,
    compile_fault: Option<CompileFault>,
    next_id: u64,
    programs: BTreeMap<ProgramId, ProgramState>,
    buffers: BTreeMap<BufferId, Vec<[f32; 2]>>,
    viewport: Viewport,
    pending: Option<Frame>,
    presented: Option<Frame>,
    compiles: u64,
    draws: u64,
    presents: u64,
    resizes: u64,
    location_lookups: Cell<u64>,
    writes: Vec<UniformWrite>,
}

impl SoftwareBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse to create a context, as a machine without graphics would.
    pub fn with_context_failure(mut self, reason: impl Into<String>) -> Self {
        self.context_fault = Some(reason.into());
        self
    }

    pub fn with_compile_failure(mut self, stage: ShaderStage, log: impl Into<String>) -> Self {
        self.compile_fault = Some(CompileFault::Stage(stage, log.into()));
        self
    }

    pub fn with_link_failure(mut self, log: impl Into<String>) -> Self {
        self.compile_fault = Some(CompileFault::Link(log.into()));
        self
    }

    pub fn has_context(&self) -> bool {
        self.context
    }

    pub fn live_programs(&self) -> usize {
        self.programs.len()
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    pub fn buffer_data(&self, buffer: BufferId) -> Option<&[[f32; 2]]> {
        self.buffers.get(&buffer).map(Vec::as_slice)
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn compile_count(&self) -> u64 {
        self.compiles
    }

    pub fn draw_count(&self) -> u64 {
        self.draws
    }

    pub fn present_count(&self) -> u64 {
        self.presents
    }

    pub fn resize_count(&self) -> u64 {
        self.resizes
    }

    pub fn location_lookups(&self) -> u64 {
        self.location_lookups.get()
    }

    /// Every uniform write since the backend was created, oldest first.
    pub fn uniform_writes(&self) -> &[UniformWrite] {
        &self.writes
    }

    /// Last frame handed to `present`.
    pub fn presented(&self) -> Option<&Frame> {
        self.presented.as_ref()
    }

    fn require_context(&self) -> Result<(), BackendError> {
        if self.context {
            Ok(())
        } else {
            Err(BackendError::ContextUnavailable("no context acquired".into()))
        }
    }

    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

impl RenderBackend for SoftwareBackend {
    fn acquire_context(&mut self) -> Result<(), BackendError> {
        if let Some(reason) = &self.context_fault {
            return Err(BackendError::ContextUnavailable(reason.clone()));
        }
        self.context = true;
        debug!("software context acquired");
        Ok(())
    }

    fn compile_program(&mut self, options: &CompositeOptions) -> Result<ProgramId, BackendError> {
        self.require_context()?;
        match &self.compile_fault {
            Some(CompileFault::Stage(stage, log)) => {
                return Err(BackendError::Compile {
                    stage: *stage,
                    log: log.clone(),
                });
            }
            Some(CompileFault::Link(log)) => {
                return Err(BackendError::Link { log: log.clone() });
            }
            None => {}
        }
        let id = ProgramId(self.allocate_id());
        self.programs.insert(
            id,
            ProgramState {
                options: *options,
                values: [None; 6],
            },
        );
        self.compiles += 1;
        Ok(id)
    }

    fn upload_quad(&mut self, vertices: &[[f32; 2]]) -> Result<BufferId, BackendError> {
        self.require_context()?;
        let id = BufferId(self.allocate_id());
        self.buffers.insert(id, vertices.to_vec());
        Ok(id)
    }

    fn uniform_location(&self, program: ProgramId, name: UniformName) -> Option<UniformLocation> {
        self.location_lookups.set(self.location_lookups.get() + 1);
        self.programs.get(&program).map(|_| location_of(name))
    }

    fn resize_surface(&mut self, viewport: Viewport) -> Result<(), BackendError> {
        self.require_context()?;
        self.viewport = viewport;
        self.resizes += 1;
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
        let name = *UniformName::ALL
            .get(location.0 as usize)
            .ok_or(BackendError::UnknownLocation(location))?;
        if name.kind() != value.kind() {
            return Err(BackendError::UniformType {
                name,
                expected: name.kind(),
                found: value.kind(),
            });
        }
        state.values[location.0 as usize] = Some(value);
        self.writes.push(UniformWrite {
            program,
            name,
            value,
        });
        Ok(())
    }

    fn draw(&mut self, program: ProgramId, quad: BufferId) -> Result<(), BackendError> {
        self.require_context()?;
        let state = self
            .programs
            .get(&program)
            .ok_or(BackendError::UnknownProgram(program))?;
        if !self.buffers.contains_key(&quad) {
            return Err(BackendError::UnknownBuffer(quad));
        }
        let uniforms = state.frame_uniforms();
        let mut frame = Frame::new(self.viewport.width, self.viewport.height);
        frame.shade(&uniforms, &state.options);
        trace!(time = uniforms.time, "software draw");
        self.pending = Some(frame);
        self.draws += 1;
        Ok(())
    }

    fn present(&mut self) -> Result<(), BackendError> {
        self.require_context()?;
        if let Some(frame) = self.pending.take() {
            self.presented = Some(frame);
        }
        self.presents += 1;
        Ok(())
    }

    fn release_program(&mut self, program: ProgramId) {
        self.programs.remove(&program);
    }

    fn release_buffer(&mut self, buffer: BufferId) {
        self.buffers.remove(&buffer);
    }

    fn release_context(&mut self) {
        if self.context {
            debug!("software context released");
        }
        self.context = false;
        self.pending = None;
    }
}
