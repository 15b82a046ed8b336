use params::ParameterGroup;
use tracing::{debug, warn};

use crate::backend::{
    BackendError, GraphicsBackend, ProgramId, RenderTarget, SurfaceId, UniformValue,
};
use crate::colormap::{self, ColormapError, ColormapTable};
use crate::fractal;
use crate::resources::{ResourceSet, SurfaceIds, SurfaceOptions};
use crate::shaders;

/// Physical pixel size of the drawable area.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderOptions {
    pub surfaces: SurfaceOptions,
    pub colormap_resolution: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            surfaces: SurfaceOptions::default(),
            colormap_resolution: colormap::DEFAULT_RESOLUTION,
        }
    }
}

/// What happened to one requested frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameReport {
    Rendered {
        frame: u64,
        iterations: u32,
        /// Surface the colorize pass sampled.
        final_surface: SurfaceId,
    },
    /// No resources for the current viewport; the next frame retries.
    NotReady,
    /// A backend call failed mid-frame and the partial frame was dropped.
    Abandoned,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameState {
    pub frames: u64,
    pub last_time: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("renderer failed to start: {0}")]
    Startup(#[source] BackendError),
    #[error(transparent)]
    Colormap(#[from] ColormapError),
    #[error("parameter '{0}' is missing or has the wrong type")]
    MissingParameter(&'static str),
}

#[derive(Clone, Copy, Debug)]
struct Programs {
    iterate: ProgramId,
    colorize: ProgramId,
}

/// Owns the backend and everything a frame needs.
///
/// One context exists per display. Frames are rendered to completion on the
/// calling thread; nothing here is shared.
pub struct RenderContext<B: GraphicsBackend> {
    backend: B,
    programs: Programs,
    resources: Option<ResourceSet>,
    options: RenderOptions,
    state: FrameState,
}

impl<B: GraphicsBackend> RenderContext<B> {
    /// Compiles both programs and allocates surfaces for `viewport`.
    ///
    /// Any failure here is fatal; no context is returned.
    pub fn new(
        mut backend: B,
        viewport: Viewport,
        view: &ParameterGroup,
        options: RenderOptions,
    ) -> Result<Self, RenderError> {
        let iterate = backend
            .compile_program(&shaders::iterate_program())
            .map_err(RenderError::Startup)?;
        let colorize = backend
            .compile_program(&shaders::colorize_program())
            .map_err(RenderError::Startup)?;

        let mut context = Self {
            backend,
            programs: Programs { iterate, colorize },
            resources: None,
            options,
            state: FrameState::default(),
        };

        if !viewport.is_empty() {
            let table = context.colormap_table(view)?;
            context.backend.resize_display(viewport.width, viewport.height);
            let resources = ResourceSet::allocate(
                &mut context.backend,
                viewport.width,
                viewport.height,
                &table,
                options.surfaces,
            )
            .map_err(RenderError::Startup)?;
            context.resources = Some(resources);
        }
        Ok(context)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn resources(&self) -> Option<&ResourceSet> {
        self.resources.as_ref()
    }

    pub fn options(&self) -> RenderOptions {
        self.options
    }

    pub fn frame_state(&self) -> FrameState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.resources.is_some()
    }

    /// Releases all surfaces and hands the backend back.
    pub fn into_backend(mut self) -> B {
        if let Some(resources) = self.resources.take() {
            resources.release(&mut self.backend);
        }
        self.backend
    }

    fn colormap_table(&self, view: &ParameterGroup) -> Result<ColormapTable, RenderError> {
        let name = view
            .choice(fractal::COLORMAP)
            .ok_or(RenderError::MissingParameter(fractal::COLORMAP))?;
        Ok(colormap::generate(name, self.options.colormap_resolution)?)
    }

    /// Renders one frame: seed, `iterations` ping/pong passes, colorize.
    ///
    /// Gradient and size checks both complete before seeding. The iteration
    /// count is read once here and holds for the whole frame.
    pub fn render_frame(
        &mut self,
        params: &mut ParameterGroup,
        view: &mut ParameterGroup,
        viewport: Viewport,
        time: f64,
    ) -> Result<FrameReport, RenderError> {
        // Every simulation parameter is a plain uniform; nothing to rebuild.
        params.consume_changed();
        let view_changed = view.consume_changed();

        if viewport.is_empty() {
            if view_changed {
                view.mark_changed();
            }
            return Ok(FrameReport::NotReady);
        }

        let size = (viewport.width, viewport.height);
        let mismatched = self
            .resources
            .as_ref()
            .map_or(true, |resources| resources.size() != size);

        if mismatched {
            let table = self.colormap_table(view)?;
            self.backend.resize_display(viewport.width, viewport.height);
            if let Some(previous) = self.resources.take() {
                previous.release(&mut self.backend);
            }
            match ResourceSet::allocate(
                &mut self.backend,
                viewport.width,
                viewport.height,
                &table,
                self.options.surfaces,
            ) {
                Ok(resources) => self.resources = Some(resources),
                Err(err) => {
                    warn!(
                        width = viewport.width,
                        height = viewport.height,
                        error = %err,
                        "surface allocation failed; renderer not ready"
                    );
                    return Ok(FrameReport::NotReady);
                }
            }
        } else if view_changed {
            let table = self.colormap_table(view)?;
            if let Some(resources) = self.resources.as_mut() {
                if let Err(err) = resources.update_gradient(&mut self.backend, &table) {
                    warn!(error = %err, "gradient rebuild failed; abandoning frame");
                    view.mark_changed();
                    return Ok(FrameReport::Abandoned);
                }
            }
        }

        let Some(resources) = self.resources.as_ref() else {
            return Ok(FrameReport::NotReady);
        };
        let surfaces = resources.ids();

        let iterations = params
            .integer(fractal::ITERATIONS)
            .ok_or(RenderError::MissingParameter(fractal::ITERATIONS))?;
        let iterations = u32::try_from(iterations.max(0)).unwrap_or(u32::MAX);
        let simulation = SimulationUniforms::read(params, viewport, time, iterations)?;
        let presentation = PresentationUniforms::read(view, iterations)?;

        match self.encode_frame(surfaces, viewport, &simulation, &presentation) {
            Ok(final_surface) => {
                self.state.frames += 1;
                self.state.last_time = time;
                debug!(frame = self.state.frames, iterations, time, "rendered frame");
                Ok(FrameReport::Rendered {
                    frame: self.state.frames,
                    iterations,
                    final_surface,
                })
            }
            Err(err) => {
                warn!(error = %err, "abandoning frame");
                self.backend.cancel_frame();
                Ok(FrameReport::Abandoned)
            }
        }
    }

    fn encode_frame(
        &mut self,
        surfaces: SurfaceIds,
        viewport: Viewport,
        simulation: &SimulationUniforms,
        presentation: &PresentationUniforms,
    ) -> Result<SurfaceId, BackendError> {
        self.backend.begin_frame()?;

        let seed = simulation.with_input(surfaces.seed, 0);
        self.pass(
            RenderTarget::Surface(surfaces.ping),
            viewport,
            self.programs.iterate,
            &seed,
        )?;

        // Roles restart every frame: seeding always wrote ping.
        let mut source = surfaces.ping;
        let mut destination = surfaces.pong;
        for step in 0..simulation.iterations {
            let uniforms = simulation.with_input(source, step);
            self.pass(
                RenderTarget::Surface(destination),
                viewport,
                self.programs.iterate,
                &uniforms,
            )?;
            std::mem::swap(&mut source, &mut destination);
        }

        let colorize = presentation.with_inputs(surfaces.gradient, source);
        self.pass(
            RenderTarget::Display,
            viewport,
            self.programs.colorize,
            &colorize,
        )?;

        self.backend.end_frame()?;
        Ok(source)
    }

    fn pass(
        &mut self,
        target: RenderTarget,
        viewport: Viewport,
        program: ProgramId,
        uniforms: &[(&str, UniformValue)],
    ) -> Result<(), BackendError> {
        self.backend.bind_render_target(target)?;
        self.backend.set_viewport(viewport.width, viewport.height);
        self.backend.draw(program, uniforms)
    }
}

/// Per-frame inputs of the iteration program.
#[derive(Clone, Copy, Debug)]
struct SimulationUniforms {
    time: f32,
    iterations: u32,
    scale: [f32; 2],
    alpha: f32,
    beta: f32,
    freq0: f32,
    freq1: f32,
    growth: f32,
}

impl SimulationUniforms {
    fn read(
        params: &ParameterGroup,
        viewport: Viewport,
        time: f64,
        iterations: u32,
    ) -> Result<Self, RenderError> {
        let number = |id: &'static str| {
            params
                .number(id)
                .map(|value| value as f32)
                .ok_or(RenderError::MissingParameter(id))
        };
        Ok(Self {
            time: time as f32,
            iterations,
            scale: [viewport.aspect(), 1.0],
            alpha: number(fractal::ALPHA)?,
            beta: number(fractal::BETA)?,
            freq0: number(fractal::FREQ0)?,
            freq1: number(fractal::FREQ1)?,
            growth: number(fractal::GROWTH)?,
        })
    }

    fn with_input(&self, input: SurfaceId, step: u32) -> [(&'static str, UniformValue); 10] {
        [
            ("u_input", UniformValue::Surface(input)),
            ("u_time", UniformValue::Float(self.time)),
            ("u_iter", UniformValue::Int(clamp_i32(self.iterations))),
            ("u_step", UniformValue::Int(clamp_i32(step))),
            ("u_scale", UniformValue::Vec2(self.scale)),
            ("u_alpha", UniformValue::Float(self.alpha)),
            ("u_beta", UniformValue::Float(self.beta)),
            ("u_freq0", UniformValue::Float(self.freq0)),
            ("u_freq1", UniformValue::Float(self.freq1)),
            ("u_growth", UniformValue::Float(self.growth)),
        ]
    }
}

/// Per-frame inputs of the colorize program; it takes no time input.
#[derive(Clone, Copy, Debug)]
struct PresentationUniforms {
    mix: f32,
    rmix: f32,
    rscale: f32,
    iterations: u32,
}

impl PresentationUniforms {
    fn read(view: &ParameterGroup, iterations: u32) -> Result<Self, RenderError> {
        let number = |id: &'static str| {
            view.number(id)
                .map(|value| value as f32)
                .ok_or(RenderError::MissingParameter(id))
        };
        Ok(Self {
            mix: number(fractal::MIX)?,
            rmix: number(fractal::RMIX)?,
            rscale: number(fractal::RSCALE)?,
            iterations,
        })
    }

    fn with_inputs(
        &self,
        gradient: SurfaceId,
        input: SurfaceId,
    ) -> [(&'static str, UniformValue); 6] {
        [
            ("u_cmap", UniformValue::Surface(gradient)),
            ("u_input", UniformValue::Surface(input)),
            ("u_mix", UniformValue::Float(self.mix)),
            ("u_rmix", UniformValue::Float(self.rmix)),
            ("u_rscale", UniformValue::Float(self.rscale)),
            ("u_iter", UniformValue::Int(clamp_i32(self.iterations))),
        ]
    }
}

fn clamp_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}
