//! Shareable session tokens.
//!
//! A token is the JSON object `{ "<group>": { "<id>": value, .. }, .., "time": t }`
//! encoded as URL-safe base64 without padding, small enough to live in a URL
//! fragment. Decoding never fails loudly: anything unreadable is "no state".

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use params::ParameterGroup;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// What loading a token does with the simulation time it carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeMode {
    /// Continue from the token's time when it has one.
    #[default]
    Restore,
    /// Always start again from zero.
    Zero,
}

impl FromStr for TimeMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "restore" => Ok(TimeMode::Restore),
            "zero" | "reset" => Ok(TimeMode::Zero),
            other => Err(format!("unknown time mode '{other}' (expected restore or zero)")),
        }
    }
}

impl fmt::Display for TimeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TimeMode::Restore => "restore",
            TimeMode::Zero => "zero",
        })
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Payload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    time: Option<f64>,
    #[serde(flatten)]
    groups: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SessionCodec {
    time_mode: TimeMode,
}

impl SessionCodec {
    pub fn new(time_mode: TimeMode) -> Self {
        Self { time_mode }
    }

    pub fn time_mode(&self) -> TimeMode {
        self.time_mode
    }

    /// Serializes every group's current values, plus `time` when given.
    pub fn encode(&self, groups: &[(&str, &ParameterGroup)], time: Option<f64>) -> String {
        let mut object = Map::new();
        for (name, group) in groups {
            object.insert((*name).to_string(), Value::Object(group.snapshot()));
        }
        if let Some(time) = time.filter(|time| time.is_finite()) {
            object.insert("time".to_string(), Value::from(time));
        }
        URL_SAFE_NO_PAD.encode(Value::Object(object).to_string())
    }

    /// Reads a token, a `#token` fragment or a URL ending in one.
    ///
    /// Both the URL-safe and the standard base64 alphabets are accepted, with
    /// or without padding.
    pub fn decode(&self, input: &str) -> Option<SessionSnapshot> {
        let token = fragment(input);
        if token.is_empty() {
            return None;
        }
        let Some(bytes) = [URL_SAFE_NO_PAD, URL_SAFE, STANDARD, STANDARD_NO_PAD]
            .iter()
            .find_map(|engine| engine.decode(token).ok())
        else {
            tracing::debug!(token, "session token is not base64");
            return None;
        };
        let payload: Payload = match serde_json::from_slice(&bytes) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::debug!(error = %err, "session token does not hold a session");
                return None;
            }
        };
        let time = payload.time.filter(|time| time.is_finite());
        Some(SessionSnapshot {
            groups: payload.groups,
            time,
            time_mode: self.time_mode,
        })
    }
}

fn fragment(input: &str) -> &str {
    let input = input.trim();
    match input.rsplit_once('#') {
        Some((_, fragment)) => fragment.trim(),
        None => input,
    }
}

/// Decoded session state, not yet applied.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    groups: Map<String, Value>,
    time: Option<f64>,
    time_mode: TimeMode,
}

impl SessionSnapshot {
    pub fn time(&self) -> Option<f64> {
        self.time
    }

    /// Updates each group carried by the token and returns the simulation
    /// time to continue from, if any.
    ///
    /// Groups absent from the token keep their values. Within a group only
    /// the ids present are touched.
    pub fn apply(&self, groups: &mut [(&str, &mut ParameterGroup)]) -> Option<f64> {
        for (name, group) in groups.iter_mut() {
            match self.groups.get(*name) {
                Some(Value::Object(values)) => {
                    let applied = group.apply_snapshot(values);
                    tracing::debug!(group = %name, applied, "restored session group");
                }
                Some(other) => {
                    tracing::warn!(group = %name, value = %other, "ignoring malformed session group");
                }
                None => {}
            }
        }
        match self.time_mode {
            TimeMode::Restore => self.time,
            TimeMode::Zero => Some(0.0),
        }
    }
}

/// Appends `token` as the fragment of `base`, replacing any fragment it had.
pub fn share_url(base: &str, token: &str) -> String {
    let base = base.split_once('#').map_or(base, |(head, _)| head);
    format!("{base}#{token}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use params::{ParamDecl, ParamValue};

    fn params() -> ParameterGroup {
        ParameterGroup::new(vec![
            ("iterations", ParamDecl::integer("Iterations", 15, 1, 2)),
            ("alpha", ParamDecl::number("Alpha", -4.0, 0.1)),
        ])
        .unwrap()
    }

    fn view() -> ParameterGroup {
        ParameterGroup::new(vec![(
            "colormap",
            ParamDecl::choice("Colormap", "twilight", ["twilight", "red"]),
        )])
        .unwrap()
    }

    #[test]
    fn round_trips_values_and_time() {
        let codec = SessionCodec::default();
        let mut source = params();
        source.update("iterations", 20i64, false).unwrap();

        let token = codec.encode(&[("params", &source)], Some(3.5));
        let snapshot = codec.decode(&token).unwrap();
        assert_eq!(snapshot.time(), Some(3.5));

        let mut restored = params();
        let time = snapshot.apply(&mut [("params", &mut restored)]);
        assert_eq!(time, Some(3.5));
        assert_eq!(restored.integer("iterations"), Some(20));
        assert_eq!(restored.number("alpha"), Some(-4.0));
    }

    #[test]
    fn token_is_url_safe() {
        let codec = SessionCodec::default();
        let mut group = params();
        group.update("alpha", -3.999_999_1, false).unwrap();
        let token = codec.encode(&[("params", &group), ("view", &view())], None);
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn garbage_leaves_groups_untouched() {
        let codec = SessionCodec::default();
        assert!(codec.decode("not-a-token").is_none());
        assert!(codec.decode("").is_none());
        assert!(codec.decode("#").is_none());
        assert!(codec.decode(&URL_SAFE_NO_PAD.encode("42")).is_none());
    }

    #[test]
    fn accepts_fragments_and_urls() {
        let codec = SessionCodec::default();
        let token = codec.encode(&[("view", &view())], Some(1.0));
        for input in [
            format!("#{token}"),
            format!("https://example.org/quadmap/#{token}"),
            format!("  {token}\n"),
        ] {
            assert_eq!(codec.decode(&input).unwrap().time(), Some(1.0));
        }
    }

    #[test]
    fn accepts_standard_padded_alphabet() {
        let codec = SessionCodec::default();
        let token = STANDARD.encode(r#"{"params":{"iterations":7},"time":0.25}"#);
        let snapshot = codec.decode(&token).unwrap();
        let mut group = params();
        snapshot.apply(&mut [("params", &mut group)]);
        assert_eq!(group.integer("iterations"), Some(7));
    }

    #[test]
    fn absent_groups_and_ids_are_kept() {
        let codec = SessionCodec::default();
        let token = URL_SAFE_NO_PAD.encode(r#"{"params":{"alpha":1.5,"bogus":3}}"#);
        let snapshot = codec.decode(&token).unwrap();

        let mut simulation = params();
        let mut presentation = view();
        presentation.update("colormap", "red", false).unwrap();
        let time = snapshot.apply(&mut [
            ("params", &mut simulation),
            ("view", &mut presentation),
        ]);

        assert_eq!(time, None);
        assert_eq!(simulation.number("alpha"), Some(1.5));
        assert_eq!(simulation.integer("iterations"), Some(15));
        assert_eq!(presentation.choice("colormap"), Some("red"));
    }

    #[test]
    fn zero_mode_discards_token_time() {
        let codec = SessionCodec::new(TimeMode::Zero);
        let token = codec.encode(&[("params", &params())], Some(9.0));
        let snapshot = codec.decode(&token).unwrap();
        assert_eq!(snapshot.time(), Some(9.0));
        assert_eq!(snapshot.apply(&mut []), Some(0.0));
    }

    #[test]
    fn malformed_group_is_ignored() {
        let codec = SessionCodec::default();
        let token = URL_SAFE_NO_PAD.encode(r#"{"params":12,"view":{"colormap":"red"}}"#);
        let snapshot = codec.decode(&token).unwrap();
        let mut simulation = params();
        let mut presentation = view();
        snapshot.apply(&mut [
            ("params", &mut simulation),
            ("view", &mut presentation),
        ]);
        assert_eq!(simulation.integer("iterations"), Some(15));
        assert_eq!(
            presentation.get("colormap"),
            Some(&ParamValue::Choice("red".to_string()))
        );
    }

    #[test]
    fn share_url_replaces_fragment() {
        assert_eq!(
            share_url("https://example.org/q/#old", "abc"),
            "https://example.org/q/#abc"
        );
        assert_eq!(share_url("", "abc"), "#abc");
    }

    #[test]
    fn time_mode_parses() {
        assert_eq!("Zero".parse::<TimeMode>().unwrap(), TimeMode::Zero);
        assert_eq!(TimeMode::Restore.to_string(), "restore");
        assert!("later".parse::<TimeMode>().is_err());
    }
}
