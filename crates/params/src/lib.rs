//! Typed, observable parameter groups.
//!
//! A [`ParameterGroup`] is an ordered set of named parameters sharing one
//! `changed` flag. The render loop consumes that flag once per frame to decide
//! whether derived resources need rebuilding; plain values are read directly
//! as uniforms. Observers let the host react to individual edits.

mod value;

use std::collections::HashMap;
use std::fmt;

use serde_json::{Map, Value};

pub use value::{ParamDecl, ParamKind, ParamValue, DEFAULT_NUMBER_WIDTH};

#[derive(Debug, thiserror::Error)]
pub enum ParamError {
    #[error("parameter '{0}' not found")]
    UnknownParameter(String),
    #[error("parameter '{0}' declared more than once")]
    DuplicateParameter(String),
    #[error("invalid value for parameter '{id}': {reason}")]
    InvalidValue { id: String, reason: String },
    #[error("parameter '{0}' is a choice and cannot be stepped")]
    NotSteppable(String),
}

/// Callback invoked with the new value after a notifying update.
pub type Observer = Box<dyn FnMut(&ParamValue)>;

pub struct Parameter {
    id: String,
    decl: ParamDecl,
    value: ParamValue,
    observers: Vec<Observer>,
}

impl Parameter {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn value(&self) -> &ParamValue {
        &self.value
    }

    pub fn default_value(&self) -> &ParamValue {
        &self.decl.value
    }

    pub fn step(&self) -> f64 {
        self.decl.step
    }

    pub fn kind(&self) -> &ParamKind {
        &self.decl.kind
    }

    pub fn display_name(&self) -> &str {
        &self.decl.display_name
    }
}

impl fmt::Debug for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parameter")
            .field("id", &self.id)
            .field("value", &self.value)
            .field("default", &self.decl.value)
            .field("observers", &self.observers.len())
            .finish()
    }
}

#[derive(Debug)]
pub struct ParameterGroup {
    params: Vec<Parameter>,
    index: HashMap<String, usize>,
    changed: bool,
}

impl ParameterGroup {
    /// Builds a group with every parameter at its declared default.
    pub fn new<I, S>(declarations: I) -> Result<Self, ParamError>
    where
        I: IntoIterator<Item = (S, ParamDecl)>,
        S: Into<String>,
    {
        let mut params = Vec::new();
        let mut index = HashMap::new();
        for (id, decl) in declarations {
            let id = id.into();
            let value = decl
                .kind
                .coerce(decl.value.clone())
                .map_err(|reason| ParamError::InvalidValue {
                    id: id.clone(),
                    reason,
                })?;
            if index.insert(id.clone(), params.len()).is_some() {
                return Err(ParamError::DuplicateParameter(id));
            }
            let decl = ParamDecl {
                value: value.clone(),
                ..decl
            };
            params.push(Parameter {
                id,
                decl,
                value,
                observers: Vec::new(),
            });
        }
        Ok(Self {
            params,
            index,
            changed: false,
        })
    }

    fn position(&self, id: &str) -> Result<usize, ParamError> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| ParamError::UnknownParameter(id.to_string()))
    }

    pub fn parameter(&self, id: &str) -> Option<&Parameter> {
        self.index.get(id).map(|&pos| &self.params[pos])
    }

    pub fn get(&self, id: &str) -> Option<&ParamValue> {
        self.parameter(id).map(Parameter::value)
    }

    pub fn number(&self, id: &str) -> Option<f64> {
        self.get(id).and_then(ParamValue::as_f64)
    }

    pub fn integer(&self, id: &str) -> Option<i64> {
        self.get(id).and_then(ParamValue::as_i64)
    }

    pub fn choice(&self, id: &str) -> Option<&str> {
        self.get(id).and_then(ParamValue::as_str)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(Parameter::id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.params.iter()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn observer_count(&self, id: &str) -> usize {
        self.parameter(id).map_or(0, |param| param.observers.len())
    }

    /// Stores `value` for `id`, coerced to the declared kind.
    ///
    /// With `notify`, every observer registered for `id` runs in registration
    /// order. The group's changed flag is set on every successful update.
    pub fn update(
        &mut self,
        id: &str,
        value: impl Into<ParamValue>,
        notify: bool,
    ) -> Result<(), ParamError> {
        let pos = self.position(id)?;
        let param = &mut self.params[pos];
        let value = param
            .decl
            .kind
            .coerce(value.into())
            .map_err(|reason| ParamError::InvalidValue {
                id: id.to_string(),
                reason,
            })?;
        param.value = value;
        if notify {
            for observer in param.observers.iter_mut() {
                observer(&param.value);
            }
        }
        self.changed = true;
        Ok(())
    }

    /// Adds `delta` to a numeric parameter and notifies observers.
    pub fn step(&mut self, id: &str, delta: f64) -> Result<(), ParamError> {
        let pos = self.position(id)?;
        let param = &self.params[pos];
        let current = param
            .value
            .as_f64()
            .ok_or_else(|| ParamError::NotSteppable(id.to_string()))?;
        self.update(id, ParamValue::Number(current + delta), true)
    }

    /// Steps `id` by `direction` multiples of its declared step.
    pub fn nudge(&mut self, id: &str, direction: f64) -> Result<(), ParamError> {
        let pos = self.position(id)?;
        let param = &self.params[pos];
        if !param.decl.kind.is_steppable() {
            return Err(ParamError::NotSteppable(id.to_string()));
        }
        let delta = param.decl.step * direction;
        self.step(id, delta)
    }

    /// Restores every default and drops all observers.
    ///
    /// The changed flag is left as it was; callers that need derived state
    /// rebuilt follow up with [`ParameterGroup::mark_changed`].
    pub fn reset(&mut self) {
        for param in &mut self.params {
            param.value = param.decl.value.clone();
            param.observers.clear();
        }
    }

    /// Returns whether any update happened since the last call, and clears it.
    pub fn consume_changed(&mut self) -> bool {
        std::mem::take(&mut self.changed)
    }

    pub fn is_changed(&self) -> bool {
        self.changed
    }

    pub fn mark_changed(&mut self) {
        self.changed = true;
    }

    /// Registers an observer for `id`. Observers cannot be removed individually.
    pub fn observe<F>(&mut self, id: &str, observer: F) -> Result<(), ParamError>
    where
        F: FnMut(&ParamValue) + 'static,
    {
        let pos = self.position(id)?;
        self.params[pos].observers.push(Box::new(observer));
        Ok(())
    }

    /// Formats the current value of `id` the way an input field shows it,
    /// truncated to the declared width.
    pub fn display(&self, id: &str) -> Result<String, ParamError> {
        let pos = self.position(id)?;
        let param = &self.params[pos];
        let text = match &param.value {
            ParamValue::Integer(value) => value.to_string(),
            ParamValue::Number(value) => format_number(*value),
            ParamValue::Choice(value) => return Ok(value.clone()),
        };
        let width = param.decl.width().unwrap_or(text.len());
        Ok(text.chars().take(width).collect())
    }

    /// Parses text typed into an input field into a value for `id`.
    pub fn parse_input(&self, id: &str, text: &str) -> Result<ParamValue, ParamError> {
        let pos = self.position(id)?;
        let param = &self.params[pos];
        let trimmed = text.trim();
        let invalid = |reason: String| ParamError::InvalidValue {
            id: id.to_string(),
            reason,
        };
        let raw = match &param.decl.kind {
            ParamKind::Number { .. } => trimmed
                .parse::<f64>()
                .map(ParamValue::Number)
                .map_err(|err| invalid(format!("'{trimmed}': {err}")))?,
            ParamKind::Integer { .. } => match trimmed.parse::<i64>() {
                Ok(value) => ParamValue::Integer(value),
                Err(_) => trimmed
                    .parse::<f64>()
                    .map(ParamValue::Number)
                    .map_err(|err| invalid(format!("'{trimmed}': {err}")))?,
            },
            ParamKind::Choice { .. } => ParamValue::Choice(trimmed.to_string()),
        };
        param.decl.kind.coerce(raw).map_err(invalid)
    }

    /// Current values keyed by id, in JSON form.
    pub fn snapshot(&self) -> Map<String, Value> {
        self.params
            .iter()
            .filter_map(|param| {
                serde_json::to_value(&param.value)
                    .ok()
                    .map(|value| (param.id.clone(), value))
            })
            .collect()
    }

    /// Applies every known id present in `values` with notification.
    ///
    /// Unknown ids and values that do not fit their parameter are skipped.
    /// Returns the number of parameters updated.
    pub fn apply_snapshot(&mut self, values: &Map<String, Value>) -> usize {
        let mut applied = 0;
        for (id, raw) in values {
            if !self.contains(id) {
                tracing::warn!(parameter = %id, "ignoring unknown parameter");
                continue;
            }
            let value = match serde_json::from_value::<ParamValue>(raw.clone()) {
                Ok(value) => value,
                Err(err) => {
                    tracing::warn!(parameter = %id, error = %err, "ignoring malformed value");
                    continue;
                }
            };
            match self.update(id, value, true) {
                Ok(()) => applied += 1,
                Err(err) => tracing::warn!(error = %err, "ignoring parameter value"),
            }
        }
        applied
    }
}

/// Plain decimal, except below `1e-6` or from `1e21` up in magnitude, where
/// exponent form keeps the leading digits inside a narrow field.
fn format_number(value: f64) -> String {
    let magnitude = value.abs();
    if magnitude == 0.0 || (1e-6..1e21).contains(&magnitude) {
        return value.to_string();
    }
    let text = format!("{value:e}");
    match text.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            format!("{mantissa}e+{exponent}")
        }
        _ => text,
    }
}
