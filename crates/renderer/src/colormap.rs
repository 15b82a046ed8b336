use std::f32::consts::PI;

/// Samples per generated table unless configured otherwise.
pub const DEFAULT_RESOLUTION: usize = 100;

/// Colormap selected on startup and after a reset.
pub const DEFAULT_COLORMAP: &str = "twilight";

const NAMES: [&str; 4] = ["twilight", "red", "green", "blue"];

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ColormapError {
    #[error("unknown colormap '{0}'")]
    Unknown(String),
    #[error("colormap resolution must be at least one sample")]
    EmptyResolution,
}

/// Fixed-size RGBA lookup table with every channel in `[0, 1]`.
#[derive(Clone, Debug, PartialEq)]
pub struct ColormapTable {
    name: String,
    samples: Vec<[f32; 4]>,
}

impl ColormapTable {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[[f32; 4]] {
        &self.samples
    }

    /// Components flattened as `r, g, b, a, r, g, ...`.
    pub fn as_flat(&self) -> &[f32] {
        bytemuck::cast_slice(&self.samples)
    }
}

/// Names accepted by [`generate`], default first.
pub fn names() -> &'static [&'static str] {
    &NAMES
}

/// Builds the named table with `resolution` samples.
pub fn generate(name: &str, resolution: usize) -> Result<ColormapTable, ColormapError> {
    if resolution == 0 {
        return Err(ColormapError::EmptyResolution);
    }
    let sample: fn(f32) -> [f32; 3] = match name {
        "twilight" => twilight,
        "red" => red,
        "green" => green,
        "blue" => blue,
        other => return Err(ColormapError::Unknown(other.to_string())),
    };
    let samples = (0..resolution)
        .map(|i| {
            let t = i as f32 / resolution as f32;
            let [r, g, b] = sample(t);
            [r.clamp(0.0, 1.0), g.clamp(0.0, 1.0), b.clamp(0.0, 1.0), 1.0]
        })
        .collect();
    Ok(ColormapTable {
        name: name.to_string(),
        samples,
    })
}

fn ramp(t: f32) -> f32 {
    t
}

fn saturate(t: f32) -> f32 {
    (1.0 - (-t * 2.0).exp()) * 0.3
}

fn arc(t: f32) -> f32 {
    0.2 + (t - 0.5).atan() / PI * 0.2
}

fn red(t: f32) -> [f32; 3] {
    [ramp(t), saturate(t), arc(t)]
}

fn green(t: f32) -> [f32; 3] {
    [arc(t), ramp(t), saturate(t)]
}

fn blue(t: f32) -> [f32; 3] {
    [saturate(t), arc(t), ramp(t)]
}

/// Cyclic cosine palette: pale at both ends, deep violet in the middle.
fn twilight(t: f32) -> [f32; 3] {
    const BASE: [f32; 3] = [0.55, 0.48, 0.62];
    const AMPLITUDE: [f32; 3] = [0.38, 0.42, 0.3];
    const PHASE: [f32; 3] = [0.0, 0.04, -0.06];
    let mut rgb = [0.0; 3];
    for (channel, out) in rgb.iter_mut().enumerate() {
        let angle = 2.0 * PI * (t + PHASE[channel]);
        *out = BASE[channel] + AMPLITUDE[channel] * angle.cos();
    }
    rgb
}
