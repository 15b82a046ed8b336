use wgpu::util::{DeviceExt, TextureDataOrder};

use crate::backend::{AddressMode, BackendError, FilterMode, PixelFormat, SurfaceDescriptor};

pub(crate) struct GpuSurface {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    pub descriptor: SurfaceDescriptor,
}

impl GpuSurface {
    pub(crate) fn create(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        descriptor: &SurfaceDescriptor,
        data: Option<&[f32]>,
        max_dimension: u32,
    ) -> Result<Self, BackendError> {
        let SurfaceDescriptor { width, height, .. } = *descriptor;
        if width == 0 || height == 0 || width > max_dimension || height > max_dimension {
            return Err(BackendError::InvalidSize { width, height });
        }

        let bytes = encode_texels(descriptor, data)?;
        let texture = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some(descriptor.label),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: texture_format(descriptor.format),
                usage: wgpu::TextureUsages::TEXTURE_BINDING
                    | wgpu::TextureUsages::RENDER_ATTACHMENT
                    | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            TextureDataOrder::LayerMajor,
            &bytes,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let address = address_mode(descriptor.address);
        let filter = filter_mode(descriptor.filter);
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(descriptor.label),
            address_mode_u: address,
            address_mode_v: address,
            address_mode_w: address,
            mag_filter: filter,
            min_filter: filter,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Ok(Self {
            texture,
            view,
            sampler,
            descriptor: descriptor.clone(),
        })
    }

    pub(crate) fn write(&self, queue: &wgpu::Queue, data: &[f32]) -> Result<(), BackendError> {
        let bytes = encode_texels(&self.descriptor, Some(data))?;
        let SurfaceDescriptor { width, height, .. } = self.descriptor;
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &bytes,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * bytes_per_texel(self.descriptor.format)),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        Ok(())
    }

    pub(crate) fn format(&self) -> wgpu::TextureFormat {
        texture_format(self.descriptor.format)
    }
}

pub(crate) fn texture_format(format: PixelFormat) -> wgpu::TextureFormat {
    match format {
        PixelFormat::Rgba16Float => wgpu::TextureFormat::Rgba16Float,
        PixelFormat::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
    }
}

fn address_mode(mode: AddressMode) -> wgpu::AddressMode {
    match mode {
        AddressMode::MirroredRepeat => wgpu::AddressMode::MirrorRepeat,
        AddressMode::Repeat => wgpu::AddressMode::Repeat,
        AddressMode::ClampToEdge => wgpu::AddressMode::ClampToEdge,
    }
}

fn filter_mode(mode: FilterMode) -> wgpu::FilterMode {
    match mode {
        FilterMode::Nearest => wgpu::FilterMode::Nearest,
        FilterMode::Linear => wgpu::FilterMode::Linear,
    }
}

fn bytes_per_texel(format: PixelFormat) -> u32 {
    match format {
        PixelFormat::Rgba16Float => 8,
        PixelFormat::Rgba8Unorm => 4,
    }
}

/// Converts RGBA `f32` components into the texture's byte layout.
///
/// Half-float surfaces only ever start zeroed; uploading non-zero data to them
/// is refused rather than converted.
fn encode_texels(
    descriptor: &SurfaceDescriptor,
    data: Option<&[f32]>,
) -> Result<Vec<u8>, BackendError> {
    let expected = descriptor.texel_components();
    let texels = descriptor.width as usize * descriptor.height as usize;
    let size = texels * bytes_per_texel(descriptor.format) as usize;
    let Some(data) = data else {
        return Ok(vec![0u8; size]);
    };
    if data.len() != expected {
        return Err(BackendError::DataLength {
            expected,
            actual: data.len(),
        });
    }
    match descriptor.format {
        PixelFormat::Rgba8Unorm => Ok(data
            .iter()
            .map(|component| (component.clamp(0.0, 1.0) * 255.0).round() as u8)
            .collect()),
        PixelFormat::Rgba16Float if data.iter().all(|component| *component == 0.0) => {
            Ok(vec![0u8; size])
        }
        PixelFormat::Rgba16Float => Err(BackendError::Unsupported(format!(
            "uploading non-zero data to half-float surface '{}'",
            descriptor.label
        ))),
    }
}
