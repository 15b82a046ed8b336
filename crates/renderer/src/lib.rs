//! Renderer crate for quadmap.
//!
//! Evaluates a generalized quadratic map over a fixed number of full-screen
//! ping/pong passes and colorizes the result through a gradient table. The
//! overall flow of one frame is:
//!
//! ```text
//!   host tick ─▶ RenderContext::render_frame
//!                  │ gradient / size checks   (ResourceSet)
//!                  ├─▶ seed ─────────▶ ping
//!                  ├─▶ ping ⇄ pong   × iterations
//!                  └─▶ last written ─▶ colorize ─▶ display
//! ```
//!
//! `RenderContext` is generic over [`GraphicsBackend`]; [`WgpuBackend`] is the
//! production implementation and tests drive the same pipeline with a
//! recording backend.

pub mod backend;
pub mod colormap;
mod compile;
pub mod fractal;
mod gpu;
pub mod pipeline;
pub mod resources;
pub mod shaders;
pub mod uniforms;

pub use backend::{
    AddressMode, BackendError, FilterMode, GraphicsBackend, PixelFormat, ProgramId,
    ProgramSource, RenderTarget, SurfaceDescriptor, SurfaceId, UniformDecl, UniformKind,
    UniformValue,
};
pub use colormap::{ColormapError, ColormapTable};
pub use gpu::WgpuBackend;
pub use pipeline::{FrameReport, FrameState, RenderContext, RenderError, RenderOptions, Viewport};
pub use resources::{ResourceSet, SurfaceIds, SurfaceOptions};
