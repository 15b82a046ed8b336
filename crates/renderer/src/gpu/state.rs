use std::collections::HashMap;

use anyhow::Result;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use tracing::{debug, warn};
use wgpu::util::DeviceExt;

use crate::backend::{
    BackendError, GraphicsBackend, ProgramId, ProgramSource, RenderTarget, SurfaceDescriptor,
    SurfaceId, UniformValue,
};
use crate::uniforms::UniformWarnings;

use super::context::GpuContext;
use super::pipeline::ProgramEntry;
use super::surfaces::GpuSurface;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct PipelineKey {
    program: ProgramId,
    format: wgpu::TextureFormat,
}

#[derive(Default)]
struct PipelineCache {
    entries: HashMap<PipelineKey, wgpu::RenderPipeline>,
}

impl PipelineCache {
    fn get_or_build(
        &mut self,
        key: PipelineKey,
        device: &wgpu::Device,
        program: &ProgramEntry,
    ) -> wgpu::RenderPipeline {
        self.entries
            .entry(key)
            .or_insert_with(|| {
                debug!(program = program.label, format = ?key.format, "building pipeline");
                program.build_pipeline(device, key.format)
            })
            .clone()
    }
}

struct FrameInFlight {
    encoder: wgpu::CommandEncoder,
    display: wgpu::SurfaceTexture,
    display_view: wgpu::TextureView,
}

/// [`GraphicsBackend`] on top of wgpu, presenting to a window surface.
pub struct WgpuBackend {
    context: GpuContext,
    programs: Vec<ProgramEntry>,
    surfaces: HashMap<SurfaceId, GpuSurface>,
    next_surface: u32,
    pipeline_cache: PipelineCache,
    frame: Option<FrameInFlight>,
    target: Option<RenderTarget>,
    viewport: (u32, u32),
    warnings: UniformWarnings,
}

impl WgpuBackend {
    /// Creates the device and configures the display surface for `target`.
    pub fn new<T>(target: &T, width: u32, height: u32) -> Result<Self>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let context = GpuContext::new(target, width, height)?;
        Ok(Self {
            viewport: (context.config.width, context.config.height),
            context,
            programs: Vec::new(),
            surfaces: HashMap::new(),
            next_surface: 0,
            pipeline_cache: PipelineCache::default(),
            frame: None,
            target: None,
            warnings: UniformWarnings::default(),
        })
    }

    pub fn display_format(&self) -> wgpu::TextureFormat {
        self.context.surface_format
    }
}

fn lookup(
    surfaces: &HashMap<SurfaceId, GpuSurface>,
    id: SurfaceId,
) -> Result<&GpuSurface, BackendError> {
    surfaces.get(&id).ok_or(BackendError::UnknownSurface(id))
}

impl GraphicsBackend for WgpuBackend {
    fn compile_program(&mut self, source: &ProgramSource) -> Result<ProgramId, BackendError> {
        let entry = ProgramEntry::new(&self.context.device, source)?;
        let id = ProgramId(self.programs.len() as u32);
        self.programs.push(entry);
        Ok(id)
    }

    fn create_surface(
        &mut self,
        descriptor: &SurfaceDescriptor,
        data: Option<&[f32]>,
    ) -> Result<SurfaceId, BackendError> {
        let surface = GpuSurface::create(
            &self.context.device,
            &self.context.queue,
            descriptor,
            data,
            self.context.max_dimension,
        )?;
        let id = SurfaceId(self.next_surface);
        self.next_surface = self.next_surface.wrapping_add(1);
        self.surfaces.insert(id, surface);
        Ok(id)
    }

    fn write_surface(&mut self, surface: SurfaceId, data: &[f32]) -> Result<(), BackendError> {
        lookup(&self.surfaces, surface)?.write(&self.context.queue, data)
    }

    fn release_surface(&mut self, surface: SurfaceId) {
        match self.surfaces.remove(&surface) {
            Some(released) => released.texture.destroy(),
            None => warn!(?surface, "release of unknown surface ignored"),
        }
        if self.target == Some(RenderTarget::Surface(surface)) {
            self.target = None;
        }
    }

    fn resize_display(&mut self, width: u32, height: u32) {
        self.context.resize(width, height);
    }

    fn begin_frame(&mut self) -> Result<(), BackendError> {
        if self.frame.is_some() {
            warn!("previous frame was never finished; dropping it");
            self.frame = None;
        }
        let display = match self.context.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(err @ (wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
                self.context.reconfigure();
                return Err(BackendError::Display(err.to_string()));
            }
            Err(err) => return Err(BackendError::Display(err.to_string())),
        };
        let display_view = display
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let encoder = self
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame encoder"),
            });
        self.frame = Some(FrameInFlight {
            encoder,
            display,
            display_view,
        });
        self.target = None;
        Ok(())
    }

    fn bind_render_target(&mut self, target: RenderTarget) -> Result<(), BackendError> {
        if let RenderTarget::Surface(id) = target {
            lookup(&self.surfaces, id)?;
        }
        self.target = Some(target);
        Ok(())
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = (width, height);
    }

    fn draw(
        &mut self,
        program: ProgramId,
        uniforms: &[(&str, UniformValue)],
    ) -> Result<(), BackendError> {
        let target = self.target.ok_or(BackendError::NoTarget)?;
        let entry = self
            .programs
            .get(program.0 as usize)
            .ok_or(BackendError::UnknownProgram(program))?;
        let packed = entry.layout.pack(uniforms);
        self.warnings.report(entry.label, &packed.skipped);

        let mut sampled = Vec::with_capacity(packed.surfaces.len());
        for (slot, surface) in packed.surfaces.iter().enumerate() {
            let id = surface.ok_or_else(|| {
                BackendError::UnboundSampler(entry.layout.samplers()[slot].to_string())
            })?;
            if target == RenderTarget::Surface(id) {
                return Err(BackendError::FeedbackLoop(id));
            }
            sampled.push(lookup(&self.surfaces, id)?);
        }

        let format = match target {
            RenderTarget::Surface(id) => lookup(&self.surfaces, id)?.format(),
            RenderTarget::Display => self.context.surface_format,
        };
        let pipeline = self.pipeline_cache.get_or_build(
            PipelineKey { program, format },
            &self.context.device,
            entry,
        );

        let mut sampler_entries = Vec::with_capacity(sampled.len() * 2);
        for (index, surface) in sampled.iter().enumerate() {
            sampler_entries.push(wgpu::BindGroupEntry {
                binding: (index as u32) * 2,
                resource: wgpu::BindingResource::TextureView(&surface.view),
            });
            sampler_entries.push(wgpu::BindGroupEntry {
                binding: (index as u32) * 2 + 1,
                resource: wgpu::BindingResource::Sampler(&surface.sampler),
            });
        }
        let sampler_bind_group = self
            .context
            .device
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("sampler bind group"),
                layout: &entry.sampler_layout,
                entries: &sampler_entries,
            });

        let frame = self.frame.as_mut().ok_or(BackendError::NoFrame)?;
        let target_view = match target {
            RenderTarget::Surface(id) => &lookup(&self.surfaces, id)?.view,
            RenderTarget::Display => &frame.display_view,
        };

        // Each pass gets its own staged copy of the uniform block.
        let staging = self
            .context
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("uniform staging"),
                contents: &packed.bytes,
                usage: wgpu::BufferUsages::COPY_SRC,
            });
        frame.encoder.copy_buffer_to_buffer(
            &staging,
            0,
            &entry.uniform_buffer,
            0,
            packed.bytes.len() as u64,
        );

        let (width, height) = self.viewport;
        let mut render_pass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(entry.label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target_view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        render_pass.set_pipeline(&pipeline);
        render_pass.set_bind_group(0, &entry.uniform_bind_group, &[]);
        render_pass.set_bind_group(1, &sampler_bind_group, &[]);
        render_pass.set_viewport(0.0, 0.0, width as f32, height as f32, 0.0, 1.0);
        render_pass.draw(0..3, 0..1);
        Ok(())
    }

    fn end_frame(&mut self) -> Result<(), BackendError> {
        let frame = self.frame.take().ok_or(BackendError::NoFrame)?;
        self.context.queue.submit(Some(frame.encoder.finish()));
        frame.display.present();
        self.target = None;
        Ok(())
    }

    fn cancel_frame(&mut self) {
        if self.frame.take().is_some() {
            debug!("discarded partially encoded frame");
        }
        self.target = None;
    }
}
