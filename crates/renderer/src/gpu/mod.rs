//! wgpu implementation of [`GraphicsBackend`](crate::backend::GraphicsBackend).
//!
//! Programs are GLSL 450 pairs compiled through naga; every draw is a
//! buffer-less full-screen triangle into either an iteration surface or the
//! window's swapchain image.

mod context;
mod pipeline;
mod state;
mod surfaces;

pub use state::WgpuBackend;
