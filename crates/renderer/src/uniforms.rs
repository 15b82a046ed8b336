use std::collections::HashSet;

use crate::backend::{SurfaceId, UniformDecl, UniformKind, UniformValue};

/// std140 placement of one non-sampler uniform.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Field {
    name: &'static str,
    kind: UniformKind,
    offset: usize,
}

/// Maps a program's uniform contract onto a std140 block plus sampler slots.
///
/// Scalars and vectors are laid out in declaration order. Samplers are kept
/// out of the block; slot `k` binds texture `2k` and sampler `2k + 1`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UniformLayout {
    fields: Vec<Field>,
    samplers: Vec<&'static str>,
    size: usize,
}

/// Uniform values resolved against a [`UniformLayout`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PackedUniforms {
    pub bytes: Vec<u8>,
    pub surfaces: Vec<Option<SurfaceId>>,
    /// Names that matched nothing in the layout, or matched with the wrong kind.
    pub skipped: Vec<String>,
}

impl UniformLayout {
    pub fn new(decls: &[UniformDecl]) -> Self {
        let mut fields = Vec::new();
        let mut samplers = Vec::new();
        let mut cursor = 0usize;
        for decl in decls {
            let (align, size) = match decl.kind {
                UniformKind::Float | UniformKind::Int => (4, 4),
                UniformKind::Vec2 => (8, 8),
                UniformKind::Sampler => {
                    samplers.push(decl.name);
                    continue;
                }
            };
            cursor = cursor.next_multiple_of(align);
            fields.push(Field {
                name: decl.name,
                kind: decl.kind,
                offset: cursor,
            });
            cursor += size;
        }
        // Uniform blocks occupy whole vec4 slots and may not be empty.
        let size = cursor.next_multiple_of(16).max(16);
        Self {
            fields,
            samplers,
            size,
        }
    }

    /// Block size in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn offset_of(&self, name: &str) -> Option<usize> {
        self.fields
            .iter()
            .find(|field| field.name == name)
            .map(|field| field.offset)
    }

    pub fn samplers(&self) -> &[&'static str] {
        &self.samplers
    }

    pub fn pack(&self, uniforms: &[(&str, UniformValue)]) -> PackedUniforms {
        let mut packed = PackedUniforms {
            bytes: vec![0u8; self.size],
            surfaces: vec![None; self.samplers.len()],
            skipped: Vec::new(),
        };
        for (name, value) in uniforms {
            if let UniformValue::Surface(surface) = value {
                match self.samplers.iter().position(|slot| slot == name) {
                    Some(slot) => packed.surfaces[slot] = Some(*surface),
                    None => packed.skipped.push((*name).to_string()),
                }
                continue;
            }

            let Some(field) = self
                .fields
                .iter()
                .find(|field| field.name == *name && field.kind == value.kind())
            else {
                packed.skipped.push((*name).to_string());
                continue;
            };
            let at = field.offset;
            match value {
                UniformValue::Float(v) => {
                    packed.bytes[at..at + 4].copy_from_slice(bytemuck::bytes_of(v))
                }
                UniformValue::Int(v) => {
                    packed.bytes[at..at + 4].copy_from_slice(bytemuck::bytes_of(v))
                }
                UniformValue::Vec2(v) => {
                    packed.bytes[at..at + 8].copy_from_slice(bytemuck::bytes_of(v))
                }
                UniformValue::Surface(_) => {}
            }
        }
        packed
    }
}

/// Remembers which unknown uniforms were already reported so each
/// program/name pair warns once.
#[derive(Debug, Default)]
pub struct UniformWarnings {
    seen: HashSet<(String, String)>,
}

impl UniformWarnings {
    pub fn report(&mut self, program: &str, skipped: &[String]) {
        for name in skipped {
            if self.seen.insert((program.to_string(), name.clone())) {
                tracing::warn!(program, uniform = %name, "uniform does not exist; skipping");
            }
        }
    }

    pub fn reported(&self) -> usize {
        self.seen.len()
    }
}
