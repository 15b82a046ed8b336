#![allow(dead_code)]

use std::collections::HashMap;

use renderer::uniforms::UniformLayout;
use renderer::{
    BackendError, GraphicsBackend, ProgramId, ProgramSource, RenderTarget, SurfaceDescriptor,
    SurfaceId, UniformValue,
};

#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    Compile(&'static str),
    Create {
        id: SurfaceId,
        label: &'static str,
        width: u32,
        height: u32,
    },
    Write(SurfaceId),
    Release(SurfaceId),
    ResizeDisplay(u32, u32),
    BeginFrame,
    Draw(Draw),
    EndFrame,
    CancelFrame,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Draw {
    pub program: &'static str,
    pub target: RenderTarget,
    /// Sampler name to bound surface, in slot order.
    pub sampled: Vec<(&'static str, SurfaceId)>,
    pub uniforms: Vec<String>,
    pub step: Option<i32>,
}

impl Draw {
    pub fn sampled(&self, name: &str) -> Option<SurfaceId> {
        self.sampled
            .iter()
            .find(|(slot, _)| *slot == name)
            .map(|(_, surface)| *surface)
    }

    pub fn target_surface(&self) -> Option<SurfaceId> {
        match self.target {
            RenderTarget::Surface(id) => Some(id),
            RenderTarget::Display => None,
        }
    }
}

/// Records every backend call and checks the binding rules a GPU would.
#[derive(Default)]
pub struct RecordingBackend {
    pub calls: Vec<Call>,
    pub skipped: Vec<String>,
    programs: Vec<(&'static str, UniformLayout)>,
    live: HashMap<SurfaceId, SurfaceDescriptor>,
    next_surface: u32,
    target: Option<RenderTarget>,
    in_frame: bool,
    draws: usize,
    /// Program label whose compilation fails.
    pub fail_compile: Option<&'static str>,
    /// Number of further surface creations that succeed before one fails.
    pub fail_create_after: Option<usize>,
    /// Zero-based draw index, counted over the backend's lifetime, that fails.
    pub fail_draw_at: Option<usize>,
    pub fail_write: bool,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub fn live_surfaces(&self) -> usize {
        self.live.len()
    }

    pub fn descriptor(&self, id: SurfaceId) -> Option<&SurfaceDescriptor> {
        self.live.get(&id)
    }

    pub fn draws(&self) -> Vec<&Draw> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::Draw(draw) => Some(draw),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|call| pred(call)).count()
    }

    pub fn draw_count(&self) -> usize {
        self.draws
    }
}

impl GraphicsBackend for RecordingBackend {
    fn compile_program(&mut self, source: &ProgramSource) -> Result<ProgramId, BackendError> {
        self.calls.push(Call::Compile(source.label));
        if self.fail_compile == Some(source.label) {
            return Err(BackendError::Compile {
                label: source.label.to_string(),
                message: "injected failure".to_string(),
            });
        }
        let id = ProgramId(self.programs.len() as u32);
        self.programs
            .push((source.label, UniformLayout::new(&source.uniforms)));
        Ok(id)
    }

    fn create_surface(
        &mut self,
        descriptor: &SurfaceDescriptor,
        data: Option<&[f32]>,
    ) -> Result<SurfaceId, BackendError> {
        if let Some(remaining) = self.fail_create_after.as_mut() {
            if *remaining == 0 {
                return Err(BackendError::InvalidSize {
                    width: descriptor.width,
                    height: descriptor.height,
                });
            }
            *remaining -= 1;
        }
        if let Some(data) = data {
            if data.len() != descriptor.texel_components() {
                return Err(BackendError::DataLength {
                    expected: descriptor.texel_components(),
                    actual: data.len(),
                });
            }
        }
        let id = SurfaceId(self.next_surface);
        self.next_surface += 1;
        self.live.insert(id, descriptor.clone());
        self.calls.push(Call::Create {
            id,
            label: descriptor.label,
            width: descriptor.width,
            height: descriptor.height,
        });
        Ok(id)
    }

    fn write_surface(&mut self, surface: SurfaceId, data: &[f32]) -> Result<(), BackendError> {
        let descriptor = self
            .live
            .get(&surface)
            .ok_or(BackendError::UnknownSurface(surface))?;
        if self.fail_write {
            return Err(BackendError::Unsupported("injected write failure".to_string()));
        }
        if data.len() != descriptor.texel_components() {
            return Err(BackendError::DataLength {
                expected: descriptor.texel_components(),
                actual: data.len(),
            });
        }
        self.calls.push(Call::Write(surface));
        Ok(())
    }

    fn release_surface(&mut self, surface: SurfaceId) {
        assert!(
            self.live.remove(&surface).is_some(),
            "released {surface:?} twice or never created it"
        );
        self.calls.push(Call::Release(surface));
    }

    fn resize_display(&mut self, width: u32, height: u32) {
        self.calls.push(Call::ResizeDisplay(width, height));
    }

    fn begin_frame(&mut self) -> Result<(), BackendError> {
        assert!(!self.in_frame, "frame begun while another was open");
        self.in_frame = true;
        self.target = None;
        self.calls.push(Call::BeginFrame);
        Ok(())
    }

    fn bind_render_target(&mut self, target: RenderTarget) -> Result<(), BackendError> {
        if let RenderTarget::Surface(id) = target {
            if !self.live.contains_key(&id) {
                return Err(BackendError::UnknownSurface(id));
            }
        }
        self.target = Some(target);
        Ok(())
    }

    fn set_viewport(&mut self, _width: u32, _height: u32) {}

    fn draw(
        &mut self,
        program: ProgramId,
        uniforms: &[(&str, UniformValue)],
    ) -> Result<(), BackendError> {
        let index = self.draws;
        self.draws += 1;
        if !self.in_frame {
            return Err(BackendError::NoFrame);
        }
        let target = self.target.ok_or(BackendError::NoTarget)?;
        let (label, layout) = self
            .programs
            .get(program.0 as usize)
            .ok_or(BackendError::UnknownProgram(program))?;
        if self.fail_draw_at == Some(index) {
            return Err(BackendError::Unsupported("injected draw failure".to_string()));
        }

        let packed = layout.pack(uniforms);
        self.skipped.extend(packed.skipped.iter().cloned());
        let mut sampled = Vec::new();
        for (name, surface) in layout.samplers().iter().zip(&packed.surfaces) {
            let id = surface.ok_or_else(|| BackendError::UnboundSampler(name.to_string()))?;
            if !self.live.contains_key(&id) {
                return Err(BackendError::UnknownSurface(id));
            }
            if target == RenderTarget::Surface(id) {
                return Err(BackendError::FeedbackLoop(id));
            }
            sampled.push((*name, id));
        }
        let step = uniforms.iter().find_map(|(name, value)| match value {
            UniformValue::Int(step) if *name == "u_step" => Some(*step),
            _ => None,
        });
        self.calls.push(Call::Draw(Draw {
            program: *label,
            target,
            sampled,
            uniforms: uniforms.iter().map(|(name, _)| name.to_string()).collect(),
            step,
        }));
        Ok(())
    }

    fn end_frame(&mut self) -> Result<(), BackendError> {
        if !self.in_frame {
            return Err(BackendError::NoFrame);
        }
        self.in_frame = false;
        self.calls.push(Call::EndFrame);
        Ok(())
    }

    fn cancel_frame(&mut self) {
        self.in_frame = false;
        self.target = None;
        self.calls.push(Call::CancelFrame);
    }
}
