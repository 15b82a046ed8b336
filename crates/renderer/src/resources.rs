use crate::backend::{
    AddressMode, BackendError, FilterMode, GraphicsBackend, PixelFormat, SurfaceDescriptor,
    SurfaceId,
};
use crate::colormap::ColormapTable;

/// Sampler addressing for the two surface families.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SurfaceOptions {
    /// Seed and ping/pong surfaces. Mirrored repeat by default.
    pub iteration_address: AddressMode,
    /// Gradient lookup. Repeat by default.
    pub gradient_address: AddressMode,
}

impl Default for SurfaceOptions {
    fn default() -> Self {
        Self {
            iteration_address: AddressMode::MirroredRepeat,
            gradient_address: AddressMode::Repeat,
        }
    }
}

/// Surface handles of one live [`ResourceSet`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SurfaceIds {
    pub seed: SurfaceId,
    pub ping: SurfaceId,
    pub pong: SurfaceId,
    pub gradient: SurfaceId,
}

/// The four surfaces a frame needs, sized to one viewport.
///
/// Releasing consumes the set, so a generation cannot be freed twice or used
/// after release. The render context holds `Option<ResourceSet>`; `None` is the
/// not-ready state between a release and the next successful allocation.
#[derive(Debug)]
pub struct ResourceSet {
    width: u32,
    height: u32,
    ids: SurfaceIds,
    gradient_len: usize,
    options: SurfaceOptions,
}

impl ResourceSet {
    pub fn allocate<B>(
        backend: &mut B,
        width: u32,
        height: u32,
        gradient: &ColormapTable,
        options: SurfaceOptions,
    ) -> Result<Self, BackendError>
    where
        B: GraphicsBackend + ?Sized,
    {
        let mut created = Vec::with_capacity(4);
        match create_all(backend, width, height, gradient, options, &mut created) {
            Ok(ids) => {
                tracing::debug!(width, height, gradient = gradient.name(), "allocated surfaces");
                Ok(Self {
                    width,
                    height,
                    ids,
                    gradient_len: gradient.len(),
                    options,
                })
            }
            Err(err) => {
                for surface in created {
                    backend.release_surface(surface);
                }
                Err(err)
            }
        }
    }

    pub fn release<B>(self, backend: &mut B)
    where
        B: GraphicsBackend + ?Sized,
    {
        let SurfaceIds {
            seed,
            ping,
            pong,
            gradient,
        } = self.ids;
        for surface in [seed, ping, pong, gradient] {
            backend.release_surface(surface);
        }
        tracing::debug!(
            width = self.width,
            height = self.height,
            "released surfaces"
        );
    }

    /// Replaces the gradient contents, recreating the surface only when the
    /// table length differs.
    pub fn update_gradient<B>(
        &mut self,
        backend: &mut B,
        table: &ColormapTable,
    ) -> Result<(), BackendError>
    where
        B: GraphicsBackend + ?Sized,
    {
        if table.len() == self.gradient_len {
            backend.write_surface(self.ids.gradient, table.as_flat())?;
        } else {
            let replacement = backend.create_surface(
                &gradient_descriptor(table.len(), self.options),
                Some(table.as_flat()),
            )?;
            backend.release_surface(self.ids.gradient);
            self.ids.gradient = replacement;
            self.gradient_len = table.len();
        }
        tracing::debug!(gradient = table.name(), "rebuilt gradient");
        Ok(())
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn ids(&self) -> SurfaceIds {
        self.ids
    }

    pub fn seed(&self) -> SurfaceId {
        self.ids.seed
    }

    pub fn ping(&self) -> SurfaceId {
        self.ids.ping
    }

    pub fn pong(&self) -> SurfaceId {
        self.ids.pong
    }

    pub fn gradient(&self) -> SurfaceId {
        self.ids.gradient
    }

    pub fn gradient_len(&self) -> usize {
        self.gradient_len
    }
}

fn create_all<B>(
    backend: &mut B,
    width: u32,
    height: u32,
    gradient: &ColormapTable,
    options: SurfaceOptions,
    created: &mut Vec<SurfaceId>,
) -> Result<SurfaceIds, BackendError>
where
    B: GraphicsBackend + ?Sized,
{
    let mut iteration = |label: &'static str| -> Result<SurfaceId, BackendError> {
        let id = backend.create_surface(
            &SurfaceDescriptor {
                label,
                width,
                height,
                format: PixelFormat::Rgba16Float,
                filter: FilterMode::Nearest,
                address: options.iteration_address,
            },
            None,
        )?;
        created.push(id);
        Ok(id)
    };
    let seed = iteration("seed")?;
    let ping = iteration("ping")?;
    let pong = iteration("pong")?;

    let gradient_id = backend.create_surface(
        &gradient_descriptor(gradient.len(), options),
        Some(gradient.as_flat()),
    )?;
    created.push(gradient_id);

    Ok(SurfaceIds {
        seed,
        ping,
        pong,
        gradient: gradient_id,
    })
}

fn gradient_descriptor(len: usize, options: SurfaceOptions) -> SurfaceDescriptor {
    SurfaceDescriptor {
        label: "gradient",
        width: len as u32,
        height: 1,
        format: PixelFormat::Rgba8Unorm,
        filter: FilterMode::Linear,
        address: options.gradient_address,
    }
}
