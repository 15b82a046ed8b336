use serde::{Deserialize, Serialize};

/// Width budget applied to plain numbers when a declaration does not set one.
pub const DEFAULT_NUMBER_WIDTH: usize = 5;

/// A parameter's current or default value.
///
/// Serialized untagged so tokens carry plain JSON scalars (`20`, `2.5`,
/// `"twilight"`). Integers are tried first so whole JSON numbers land in
/// [`ParamValue::Integer`]; [`ParamKind::coerce`] reconciles the two numeric
/// variants against the declared kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Integer(i64),
    Number(f64),
    Choice(String),
}

impl ParamValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Integer(value) => Some(*value as f64),
            ParamValue::Number(value) => Some(*value),
            ParamValue::Choice(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParamValue::Integer(value) => Some(*value),
            ParamValue::Number(value) if value.is_finite() => Some(value.trunc() as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Choice(value) => Some(value.as_str()),
            _ => None,
        }
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Number(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Integer(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Choice(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Choice(value)
    }
}

/// Declared shape of a parameter; every stored value satisfies it.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamKind {
    /// Finite floating point value shown with at most `width` characters.
    Number { width: usize },
    /// Whole number shown with at most `max_digits` characters.
    Integer { max_digits: usize },
    /// One of a fixed set of names.
    Choice { options: Vec<String> },
}

impl ParamKind {
    /// Converts `value` into this kind, or explains why it cannot be.
    ///
    /// Numbers given to integer parameters are truncated toward zero. Range is
    /// never checked.
    pub fn coerce(&self, value: ParamValue) -> Result<ParamValue, String> {
        match self {
            ParamKind::Number { .. } => match value {
                ParamValue::Integer(raw) => Ok(ParamValue::Number(raw as f64)),
                ParamValue::Number(raw) if raw.is_finite() => Ok(ParamValue::Number(raw)),
                ParamValue::Number(raw) => Err(format!("{raw} is not a finite number")),
                ParamValue::Choice(raw) => Err(format!("expected a number, got '{raw}'")),
            },
            ParamKind::Integer { .. } => match value {
                ParamValue::Integer(raw) => Ok(ParamValue::Integer(raw)),
                ParamValue::Number(raw) if raw.is_finite() => {
                    Ok(ParamValue::Integer(raw.trunc() as i64))
                }
                ParamValue::Number(raw) => Err(format!("{raw} is not a finite number")),
                ParamValue::Choice(raw) => Err(format!("expected an integer, got '{raw}'")),
            },
            ParamKind::Choice { options } => match value {
                ParamValue::Choice(raw) if options.iter().any(|option| *option == raw) => {
                    Ok(ParamValue::Choice(raw))
                }
                ParamValue::Choice(raw) => Err(format!(
                    "'{raw}' is not one of {}",
                    options.join(", ")
                )),
                other => Err(format!("expected one of {}, got {other:?}", options.join(", "))),
            },
        }
    }

    pub fn is_steppable(&self) -> bool {
        !matches!(self, ParamKind::Choice { .. })
    }
}

/// Declaration of a single parameter: default value, kind, step and label.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamDecl {
    pub value: ParamValue,
    pub kind: ParamKind,
    pub step: f64,
    pub display_name: String,
}

impl ParamDecl {
    pub fn number(display_name: impl Into<String>, value: f64, step: f64) -> Self {
        Self {
            value: ParamValue::Number(value),
            kind: ParamKind::Number {
                width: DEFAULT_NUMBER_WIDTH,
            },
            step,
            display_name: display_name.into(),
        }
    }

    pub fn integer(
        display_name: impl Into<String>,
        value: i64,
        step: i64,
        max_digits: usize,
    ) -> Self {
        Self {
            value: ParamValue::Integer(value),
            kind: ParamKind::Integer { max_digits },
            step: step as f64,
            display_name: display_name.into(),
        }
    }

    pub fn choice<I, S>(display_name: impl Into<String>, value: &str, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            value: ParamValue::Choice(value.to_string()),
            kind: ParamKind::Choice {
                options: options.into_iter().map(Into::into).collect(),
            },
            step: 0.0,
            display_name: display_name.into(),
        }
    }

    /// Overrides the display width of a number declaration.
    pub fn with_width(mut self, width: usize) -> Self {
        if let ParamKind::Number { width: current } = &mut self.kind {
            *current = width;
        }
        self
    }

    pub(crate) fn width(&self) -> Option<usize> {
        match self.kind {
            ParamKind::Number { width } => Some(width),
            ParamKind::Integer { max_digits } => Some(max_digits),
            ParamKind::Choice { .. } => None,
        }
    }
}
