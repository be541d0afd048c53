use std::collections::BTreeMap;
use std::fmt;

use backdrop_common::Viewport;
use glam::{Vec2, Vec3};
use thiserror::Error;

use crate::compose::{CompositeOptions, FrameUniforms};

/// Uniforms exposed by the fragment stage. Names are part of the shader contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UniformName {
    Resolution,
    Time,
    Color1,
    Color2,
    Color3,
    Color4,
}

impl UniformName {
    pub const ALL: [UniformName; 6] = [
        UniformName::Resolution,
        UniformName::Time,
        UniformName::Color1,
        UniformName::Color2,
        UniformName::Color3,
        UniformName::Color4,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            UniformName::Resolution => "resolution",
            UniformName::Time => "time",
            UniformName::Color1 => "color1",
            UniformName::Color2 => "color2",
            UniformName::Color3 => "color3",
            UniformName::Color4 => "color4",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|n| n.as_str() == name)
    }

    pub fn kind(self) -> UniformKind {
        match self {
            UniformName::Resolution => UniformKind::Vec2,
            UniformName::Time => UniformKind::Float,
            _ => UniformKind::Vec3,
        }
    }

    pub fn is_color(self) -> bool {
        self.kind() == UniformKind::Vec3
    }
}

impl fmt::Display for UniformName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformKind {
    Float,
    Vec2,
    Vec3,
}

impl fmt::Display for UniformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UniformKind::Float => "float",
            UniformKind::Vec2 => "vec2",
            UniformKind::Vec3 => "vec3",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec2(Vec2),
    Vec3(Vec3),
}

impl UniformValue {
    pub fn kind(&self) -> UniformKind {
        match self {
            UniformValue::Float(_) => UniformKind::Float,
            UniformValue::Vec2(_) => UniformKind::Vec2,
            UniformValue::Vec3(_) => UniformKind::Vec3,
        }
    }
}

/// Backend-specific handle to a uniform slot in a linked program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UniformLocation(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProgramId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BufferId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        })
    }
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("rendering context unavailable: {0}")]
    ContextUnavailable(String),
    #[error("{stage} shader failed to compile: {log}")]
    Compile { stage: ShaderStage, log: String },
    #[error("program failed to link: {log}")]
    Link { log: String },
    #[error("uniform `{0}` is not exposed by the linked program")]
    MissingUniform(UniformName),
    #[error("uniform `{name}` expects {expected}, got {found}")]
    UniformType {
        name: UniformName,
        expected: UniformKind,
        found: UniformKind,
    },
    #[error("unknown uniform location {0:?}")]
    UnknownLocation(UniformLocation),
    #[error("unknown program {0:?}")]
    UnknownProgram(ProgramId),
    #[error("unknown buffer {0:?}")]
    UnknownBuffer(BufferId),
    #[error("surface error: {0}")]
    Surface(String),
}

/// Two clip-space triangles covering the whole viewport.
pub const FULL_SCREEN_QUAD: [[f32; 2]; 6] = [
    [-1.0, -1.0],
    [1.0, -1.0],
    [-1.0, 1.0],
    [-1.0, 1.0],
    [1.0, -1.0],
    [1.0, 1.0],
];

/// Graphics backend contract used by the frame driver.
///
/// A backend owns one context at a time and hands out opaque ids for the
/// programs and buffers it creates. Implementations must tolerate releasing
/// ids they no longer know about.
pub trait RenderBackend {
    fn acquire_context(&mut self) -> Result<(), BackendError>;

    /// Compile both stages and link them into a program baked with `options`.
    fn compile_program(&mut self, options: &CompositeOptions) -> Result<ProgramId, BackendError>;

    fn upload_quad(&mut self, vertices: &[[f32; 2]]) -> Result<BufferId, BackendError>;

    /// Look up a uniform by name. Callers are expected to cache the result.
    fn uniform_location(&self, program: ProgramId, name: UniformName) -> Option<UniformLocation>;

    /// Resize the drawing buffer and the viewport transform.
    fn resize_surface(&mut self, viewport: Viewport) -> Result<(), BackendError>;

    fn set_uniform(
        &mut self,
        program: ProgramId,
        location: UniformLocation,
        value: UniformValue,
    ) -> Result<(), BackendError>;

    fn draw(&mut self, program: ProgramId, quad: BufferId) -> Result<(), BackendError>;

    fn present(&mut self) -> Result<(), BackendError>;

    fn release_program(&mut self, program: ProgramId);

    fn release_buffer(&mut self, buffer: BufferId);

    fn release_context(&mut self);
}

/// A borrowed backend is a backend, so one device can serve successive driver sessions.
impl<T: RenderBackend + ?Sized> RenderBackend for &mut T {
    fn acquire_context(&mut self) -> Result<(), BackendError> {
        (**self).acquire_context()
    }

    fn compile_program(&mut self, options: &CompositeOptions) -> Result<ProgramId, BackendError> {
        (**self).compile_program(options)
    }

    fn upload_quad(&mut self, vertices: &[[f32; 2]]) -> Result<BufferId, BackendError> {
        (**self).upload_quad(vertices)
    }

    fn uniform_location(&self, program: ProgramId, name: UniformName) -> Option<UniformLocation> {
        (**self).uniform_location(program, name)
    }

    fn resize_surface(&mut self, viewport: Viewport) -> Result<(), BackendError> {
        (**self).resize_surface(viewport)
    }

    fn set_uniform(
        &mut self,
        program: ProgramId,
        location: UniformLocation,
        value: UniformValue,
    ) -> Result<(), BackendError> {
        (**self).set_uniform(program, location, value)
    }

    fn draw(&mut self, program: ProgramId, quad: BufferId) -> Result<(), BackendError> {
        (**self).draw(program, quad)
    }

    fn present(&mut self) -> Result<(), BackendError> {
        (**self).present()
    }

    fn release_program(&mut self, program: ProgramId) {
        (**self).release_program(program)
    }

    fn release_buffer(&mut self, buffer: BufferId) {
        (**self).release_buffer(buffer)
    }

    fn release_context(&mut self) {
        (**self).release_context()
    }
}

/// Uniform locations resolved once after link.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UniformTable {
    locations: BTreeMap<UniformName, UniformLocation>,
}

impl UniformTable {
    /// Query every uniform the shader contract names. Any missing name is an error.
    pub fn resolve<B: RenderBackend + ?Sized>(
        backend: &B,
        program: ProgramId,
    ) -> Result<Self, BackendError> {
        let mut locations = BTreeMap::new();
        for name in UniformName::ALL {
            let location = backend
                .uniform_location(program, name)
                .ok_or(BackendError::MissingUniform(name))?;
            locations.insert(name, location);
        }
        Ok(Self { locations })
    }

    pub fn get(&self, name: UniformName) -> Option<UniformLocation> {
        self.locations.get(&name).copied()
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (UniformName, UniformLocation)> + '_ {
        self.locations.iter().map(|(n, l)| (*n, *l))
    }
}

/// The six values pushed for one frame, in contract order.
pub fn frame_uniform_values(uniforms: &FrameUniforms) -> [(UniformName, UniformValue); 6] {
    let p = &uniforms.palette;
    [
        (UniformName::Resolution, UniformValue::Vec2(uniforms.resolution)),
        (UniformName::Time, UniformValue::Float(uniforms.time)),
        (UniformName::Color1, UniformValue::Vec3(p.color1)),
        (UniformName::Color2, UniformValue::Vec3(p.color2)),
        (UniformName::Color3, UniformValue::Vec3(p.color3)),
        (UniformName::Color4, UniformValue::Vec3(p.color4)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::software::SoftwareBackend;
    use backdrop_common::Palette;
    use glam::vec2;

    #[test]
    fn uniform_names_round_trip() {
        for name in UniformName::ALL {
            assert_eq!(UniformName::parse(name.as_str()), Some(name));
        }
        assert_eq!(UniformName::parse("iTime"), None);
        assert_eq!(UniformName::Resolution.kind(), UniformKind::Vec2);
        assert_eq!(UniformName::Time.kind(), UniformKind::Float);
        assert!(UniformName::Color3.is_color());
        assert!(!UniformName::Time.is_color());
    }

    #[test]
    fn quad_covers_clip_space() {
        for v in FULL_SCREEN_QUAD {
            assert!(v[0].abs() == 1.0 && v[1].abs() == 1.0);
        }
        assert!(FULL_SCREEN_QUAD.contains(&[-1.0, -1.0]));
        assert!(FULL_SCREEN_QUAD.contains(&[1.0, 1.0]));
    }

    #[test]
    fn frame_values_follow_the_palette() {
        let u = FrameUniforms {
            resolution: vec2(640.0, 360.0),
            time: 2.5,
            palette: Palette::DARK,
        };
        let values = frame_uniform_values(&u);
        assert_eq!(values[0], (UniformName::Resolution, UniformValue::Vec2(u.resolution)));
        assert_eq!(values[1], (UniformName::Time, UniformValue::Float(2.5)));
        assert_eq!(values[5], (UniformName::Color4, UniformValue::Vec3(Palette::DARK.color4)));
        for (name, value) in values {
            assert_eq!(name.kind(), value.kind());
        }
    }

    #[test]
    fn table_resolves_every_uniform() {
        let mut backend = SoftwareBackend::new();
        backend.acquire_context().unwrap();
        let program = backend.compile_program(&CompositeOptions::default()).unwrap();
        let table = UniformTable::resolve(&backend, program).unwrap();
        assert_eq!(table.len(), UniformName::ALL.len());
        for name in UniformName::ALL {
            assert!(table.get(name).is_some());
        }
    }

    #[test]
    fn table_resolves_through_a_borrowed_backend() {
        let mut backend = SoftwareBackend::new();
        let mut borrowed = &mut backend;
        borrowed.acquire_context().unwrap();
        let program = RenderBackend::compile_program(&mut borrowed, &CompositeOptions::default())
            .unwrap();
        let table = UniformTable::resolve(&borrowed, program).unwrap();
        let names: Vec<UniformName> = table.iter().map(|(name, _)| name).collect();
        assert_eq!(names, UniformName::ALL.to_vec());
        assert!(table.iter().all(|(name, loc)| table.get(name) == Some(loc)));
        assert_eq!(backend.compile_count(), 1);
    }

    #[test]
    fn table_fails_for_unknown_program() {
        let backend = SoftwareBackend::new();
        let err = UniformTable::resolve(&backend, ProgramId(99)).unwrap_err();
        assert!(matches!(err, BackendError::MissingUniform(UniformName::Resolution)));
    }
}
