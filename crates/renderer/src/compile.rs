use std::borrow::Cow;

use wgpu::naga::ShaderStage;

use crate::backend::BackendError;

/// Compiles one GLSL stage through wgpu's GLSL frontend.
///
/// Validation runs inside an error scope so a bad shader is reported here, at
/// startup, instead of through the device's uncaptured error handler.
pub(crate) fn compile_glsl(
    device: &wgpu::Device,
    label: &str,
    source: &str,
    stage: ShaderStage,
) -> Result<wgpu::ShaderModule, BackendError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Owned(source.to_string()),
            stage,
            defines: &[],
        },
    });
    match pollster::block_on(device.pop_error_scope()) {
        None => Ok(module),
        Some(err) => Err(BackendError::Compile {
            label: format!("{label} ({})", stage_name(stage)),
            message: err.to_string(),
        }),
    }
}

fn stage_name(stage: ShaderStage) -> &'static str {
    match stage {
        ShaderStage::Vertex => "vertex",
        ShaderStage::Fragment => "fragment",
        ShaderStage::Compute => "compute",
        _ => "other",
    }
}

/// Rejects sources that are not Vulkan-flavoured GLSL 450 before they reach
/// the frontend, which reports such mistakes far less clearly.
pub(crate) fn check_version(label: &str, source: &str) -> Result<(), BackendError> {
    let first = source
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with("//"));
    match first {
        Some(line) if line.starts_with("#version 450") => Ok(()),
        Some(line) => Err(BackendError::Compile {
            label: label.to_string(),
            message: format!("expected '#version 450', found '{line}'"),
        }),
        None => Err(BackendError::Compile {
            label: label.to_string(),
            message: "source is empty".to_string(),
        }),
    }
}
