use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// Handle to a compiled vertex/fragment program.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramId(pub u32);

/// Handle to a backend texture surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// Half-float RGBA; holds the raw iteration state between passes.
    Rgba16Float,
    /// 8-bit normalised RGBA; enough precision for a gradient lookup.
    Rgba8Unorm,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FilterMode {
    Nearest,
    Linear,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AddressMode {
    MirroredRepeat,
    Repeat,
    ClampToEdge,
}

impl FromStr for AddressMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mirrored-repeat" | "mirror-repeat" | "mirror" | "mirrored" => {
                Ok(AddressMode::MirroredRepeat)
            }
            "repeat" | "wrap" => Ok(AddressMode::Repeat),
            "clamp" | "clamp-to-edge" => Ok(AddressMode::ClampToEdge),
            other => Err(format!(
                "unknown address mode '{other}' (expected mirrored-repeat, repeat, or clamp)"
            )),
        }
    }
}

impl fmt::Display for AddressMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AddressMode::MirroredRepeat => "mirrored-repeat",
            AddressMode::Repeat => "repeat",
            AddressMode::ClampToEdge => "clamp",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SurfaceDescriptor {
    pub label: &'static str,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub filter: FilterMode,
    pub address: AddressMode,
}

impl SurfaceDescriptor {
    /// Number of `f32` components a full upload for this surface carries.
    pub fn texel_components(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UniformKind {
    Float,
    Int,
    Vec2,
    Sampler,
}

/// One entry of a program's uniform contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UniformDecl {
    pub name: &'static str,
    pub kind: UniformKind,
}

impl UniformDecl {
    pub const fn new(name: &'static str, kind: UniformKind) -> Self {
        Self { name, kind }
    }
}

/// Sources and declared interface of a program.
#[derive(Clone, Debug)]
pub struct ProgramSource {
    pub label: &'static str,
    pub vertex: Cow<'static, str>,
    pub fragment: Cow<'static, str>,
    /// Vertex attribute name to location. Empty for buffer-less draws.
    pub attributes: Vec<(&'static str, u32)>,
    /// Uniforms in declaration order; non-sampler entries follow the
    /// std140 block layout of the fragment program.
    pub uniforms: Vec<UniformDecl>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Int(i32),
    Vec2([f32; 2]),
    /// A surface fed to a sampler uniform.
    Surface(SurfaceId),
}

impl UniformValue {
    pub fn kind(&self) -> UniformKind {
        match self {
            UniformValue::Float(_) => UniformKind::Float,
            UniformValue::Int(_) => UniformKind::Int,
            UniformValue::Vec2(_) => UniformKind::Vec2,
            UniformValue::Surface(_) => UniformKind::Sampler,
        }
    }
}

/// Destination of subsequent draws.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderTarget {
    Surface(SurfaceId),
    Display,
}

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("failed to compile program '{label}': {message}")]
    Compile { label: String, message: String },
    #[error("program {0:?} does not exist")]
    UnknownProgram(ProgramId),
    #[error("surface {0:?} does not exist")]
    UnknownSurface(SurfaceId),
    #[error("surface {0:?} is sampled while bound as the render target")]
    FeedbackLoop(SurfaceId),
    #[error("sampler uniform '{0}' has no surface bound")]
    UnboundSampler(String),
    #[error("surface data has {actual} components, expected {expected}")]
    DataLength { expected: usize, actual: usize },
    #[error("invalid surface size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },
    #[error("no render target bound")]
    NoTarget,
    #[error("no frame in progress")]
    NoFrame,
    #[error("display unavailable: {0}")]
    Display(String),
    #[error("missing GPU capability: {0}")]
    MissingCapability(String),
    #[error("unsupported operation: {0}")]
    Unsupported(String),
}

/// Capability set a rendering backend provides to the render pipeline.
///
/// All calls happen on the host's event-loop thread. Draws are always a
/// full-viewport primitive into the currently bound target.
pub trait GraphicsBackend {
    fn compile_program(&mut self, source: &ProgramSource) -> Result<ProgramId, BackendError>;

    /// Creates a surface; `data` holds RGBA `f32` components, `None` zero-fills.
    fn create_surface(
        &mut self,
        descriptor: &SurfaceDescriptor,
        data: Option<&[f32]>,
    ) -> Result<SurfaceId, BackendError>;

    fn write_surface(&mut self, surface: SurfaceId, data: &[f32]) -> Result<(), BackendError>;

    fn release_surface(&mut self, surface: SurfaceId);

    fn resize_display(&mut self, width: u32, height: u32);

    fn begin_frame(&mut self) -> Result<(), BackendError>;

    fn bind_render_target(&mut self, target: RenderTarget) -> Result<(), BackendError>;

    fn set_viewport(&mut self, width: u32, height: u32);

    /// Issues one draw. Uniform names outside the program's contract are
    /// skipped with a warning instead of failing the draw.
    fn draw(
        &mut self,
        program: ProgramId,
        uniforms: &[(&str, UniformValue)],
    ) -> Result<(), BackendError>;

    fn end_frame(&mut self) -> Result<(), BackendError>;

    /// Drops a partially encoded frame without presenting it.
    fn cancel_frame(&mut self) {}
}
