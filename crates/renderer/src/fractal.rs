//! Parameter tables for the quadratic map and its presentation.

use params::{ParamDecl, ParamError, ParamValue, ParameterGroup};

use crate::colormap;

/// Group name of the simulation parameters in session tokens.
pub const SIMULATION_GROUP: &str = "params";
/// Group name of the presentation parameters in session tokens.
pub const VIEW_GROUP: &str = "view";

pub const ITERATIONS: &str = "iterations";
pub const ALPHA: &str = "alpha";
pub const BETA: &str = "beta";
pub const FREQ0: &str = "freq0";
pub const FREQ1: &str = "freq1";
pub const GROWTH: &str = "growth";

pub const INTERVAL: &str = "interval";
pub const DT: &str = "dt";
pub const MIX: &str = "mix";
pub const RMIX: &str = "rmix";
pub const RSCALE: &str = "rscale";
pub const COLORMAP: &str = "colormap";

pub type Declarations = Vec<(&'static str, ParamDecl)>;

/// Parameters that feed the iteration program.
pub fn simulation_declarations() -> Declarations {
    vec![
        (ITERATIONS, ParamDecl::integer("Iterations", 15, 1, 2)),
        (ALPHA, ParamDecl::number("Alpha", -4.0, 0.1)),
        (BETA, ParamDecl::number("Beta", 2.0, 0.1)),
        (FREQ0, ParamDecl::number("Frequency 0", 2.0, 0.1)),
        (FREQ1, ParamDecl::number("Frequency 1", 4.0, 0.1)),
        (GROWTH, ParamDecl::number("Growth", 1.1, 0.05)),
    ]
}

/// Frame pacing and colorization parameters.
pub fn view_declarations() -> Declarations {
    vec![
        (INTERVAL, ParamDecl::number("Interval (ms)", 60.0, 10.0)),
        (DT, ParamDecl::number("Time step", 0.001, 0.001).with_width(10)),
        (MIX, ParamDecl::number("Colormap mix", 1.0, 0.05)),
        (RMIX, ParamDecl::number("Mirror mix", 0.0, 0.05)),
        (RSCALE, ParamDecl::number("Mirror scale", 2.5, 0.05)),
        (
            COLORMAP,
            ParamDecl::choice(
                "Colormap",
                colormap::DEFAULT_COLORMAP,
                colormap::names().iter().copied(),
            ),
        ),
    ]
}

/// Replaces declared defaults before a group is built.
///
/// Each override is coerced to the parameter's kind, so the new default obeys
/// the same rules as a live update.
pub fn apply_overrides<I, S>(decls: &mut Declarations, overrides: I) -> Result<(), ParamError>
where
    I: IntoIterator<Item = (S, ParamValue)>,
    S: AsRef<str>,
{
    for (id, value) in overrides {
        let id = id.as_ref();
        let (_, decl) = decls
            .iter_mut()
            .find(|(name, _)| *name == id)
            .ok_or_else(|| ParamError::UnknownParameter(id.to_string()))?;
        decl.value = decl
            .kind
            .coerce(value)
            .map_err(|reason| ParamError::InvalidValue {
                id: id.to_string(),
                reason,
            })?;
    }
    Ok(())
}

pub fn simulation_group() -> Result<ParameterGroup, ParamError> {
    ParameterGroup::new(simulation_declarations())
}

pub fn view_group() -> Result<ParameterGroup, ParamError> {
    ParameterGroup::new(view_declarations())
}
