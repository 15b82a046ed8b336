use std::borrow::Cow;

use crate::backend::{ProgramSource, UniformDecl, UniformKind};

const VS_RECT: &str = include_str!("../assets/glsl/vs-rect.glsl");
const FS_QUADRATIC_MAP: &str = include_str!("../assets/glsl/fs-quadratic-map.glsl");
const FS_COLOR_MAP: &str = include_str!("../assets/glsl/fs-color-map.glsl");

/// Uniform contract of the iteration program. Non-sampler order mirrors the
/// `QuadraticMap` block.
pub const ITERATE_UNIFORMS: &[UniformDecl] = &[
    UniformDecl::new("u_input", UniformKind::Sampler),
    UniformDecl::new("u_time", UniformKind::Float),
    UniformDecl::new("u_iter", UniformKind::Int),
    UniformDecl::new("u_step", UniformKind::Int),
    UniformDecl::new("u_scale", UniformKind::Vec2),
    UniformDecl::new("u_alpha", UniformKind::Float),
    UniformDecl::new("u_beta", UniformKind::Float),
    UniformDecl::new("u_freq0", UniformKind::Float),
    UniformDecl::new("u_freq1", UniformKind::Float),
    UniformDecl::new("u_growth", UniformKind::Float),
];

/// Uniform contract of the colorization program, mirroring `ColorMap`.
pub const COLORIZE_UNIFORMS: &[UniformDecl] = &[
    UniformDecl::new("u_cmap", UniformKind::Sampler),
    UniformDecl::new("u_input", UniformKind::Sampler),
    UniformDecl::new("u_mix", UniformKind::Float),
    UniformDecl::new("u_rmix", UniformKind::Float),
    UniformDecl::new("u_rscale", UniformKind::Float),
    UniformDecl::new("u_iter", UniformKind::Int),
];

pub fn iterate_program() -> ProgramSource {
    ProgramSource {
        label: "quadratic-map",
        vertex: Cow::Borrowed(VS_RECT),
        fragment: Cow::Borrowed(FS_QUADRATIC_MAP),
        attributes: Vec::new(),
        uniforms: ITERATE_UNIFORMS.to_vec(),
    }
}

pub fn colorize_program() -> ProgramSource {
    ProgramSource {
        label: "color-map",
        vertex: Cow::Borrowed(VS_RECT),
        fragment: Cow::Borrowed(FS_COLOR_MAP),
        attributes: Vec::new(),
        uniforms: COLORIZE_UNIFORMS.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block_members(source: &str) -> Vec<&str> {
        let start = source.find("uniform ").expect("uniform block");
        let open = start + source[start..].find('{').expect("block open");
        let close = open + source[open..].find('}').expect("block close");
        source[open + 1..close]
            .split(';')
            .filter_map(|member| member.split_whitespace().last())
            .collect()
    }

    fn block_order(decls: &[UniformDecl]) -> Vec<&'static str> {
        decls
            .iter()
            .filter(|decl| decl.kind != UniformKind::Sampler)
            .map(|decl| decl.name)
            .collect()
    }

    #[test]
    fn contracts_match_glsl_blocks() {
        assert_eq!(block_members(FS_QUADRATIC_MAP), block_order(ITERATE_UNIFORMS));
        assert_eq!(block_members(FS_COLOR_MAP), block_order(COLORIZE_UNIFORMS));
    }

    #[test]
    fn samplers_are_declared_in_slot_order() {
        let cmap = FS_COLOR_MAP.find("u_cmap_texture").unwrap();
        let input = FS_COLOR_MAP.find("u_input_texture").unwrap();
        assert!(cmap < input);
        assert!(FS_COLOR_MAP.contains("binding = 2) uniform texture2D u_input_texture"));
    }

    #[test]
    fn colorize_takes_no_time() {
        assert!(!COLORIZE_UNIFORMS.iter().any(|decl| decl.name == "u_time"));
    }
}
