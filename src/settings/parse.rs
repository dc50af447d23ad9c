//! Lenient configuration decoding.
//!
//! Elements declare configuration as a loosely-JSON-like inline string:
//! unquoted keys, single quotes, bare numeric breakpoint keys. The decoder
//! normalizes the string and hands it to a strict JSON parse, then folds the
//! resulting loose value into a [`SettingsPatch`] defensively: malformed
//! option shapes become safe defaults, never errors.
//!
//! Named configurations live in a [`ConfigRegistry`]: a key either maps to a
//! static patch or to a factory invoked per element.

use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use super::{Peak, SettingsPatch, SinkSet};
use crate::types::{ElementId, Margins, Metric};

// =============================================================================
// Errors
// =============================================================================

/// Failure to decode an inline option string.
///
/// Always recovered by the caller (empty configuration + logged diagnostic);
/// never fatal.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("option string is not an object")]
    NotAnObject,
    #[error("malformed option string: {0}")]
    Syntax(#[from] serde_json::Error),
}

// =============================================================================
// Inline decoding
// =============================================================================

/// Bare keys (`visibility:`, `768:`) get quoted before the strict parse.
/// Already-quoted keys are untouched: the quote between the word and the
/// colon keeps the pattern from matching.
static BARE_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Za-z0-9_]+)\s*:").expect("static pattern"));

/// Decode a loosely-JSON-like option string into a patch.
pub fn parse_inline(input: &str) -> Result<SettingsPatch, ParseError> {
    let normalized = input.replace('\'', "\"");
    let quoted = BARE_KEY.replace_all(&normalized, "\"$1\":");
    let value: Value = serde_json::from_str(&quoted)?;
    if !value.is_object() {
        return Err(ParseError::NotAnObject);
    }
    Ok(patch_from_value(&value))
}

/// Fold a loose JSON value into a patch, normalizing every recognized option
/// shape defensively. Unknown keys are ignored.
pub fn patch_from_value(value: &Value) -> SettingsPatch {
    let mut patch = SettingsPatch::default();
    let Some(map) = value.as_object() else {
        return patch;
    };

    for (key, v) in map {
        match key.as_str() {
            "visibility" => patch.visibility = Some(sink_set(v)),
            "fill" => patch.fill = Some(sink_set(v)),
            "cover" => patch.cover = Some(sink_set(v)),
            "enter" => patch.enter = Some(sink_set(v)),
            "exit" => patch.exit = Some(sink_set(v)),
            "offsetEnter" => patch.offset_enter = Some(sink_set(v)),
            "offsetExit" => patch.offset_exit = Some(sink_set(v)),
            "peak" => patch.peak = Some(peak_range(v)),
            "visibilityStep" => patch.visibility_step = Some(step_thresholds(v)),
            "fillStep" => patch.fill_step = Some(step_thresholds(v)),
            "coverStep" => patch.cover_step = Some(step_thresholds(v)),
            "enterStep" => patch.enter_step = Some(step_thresholds(v)),
            "exitStep" => patch.exit_step = Some(step_thresholds(v)),
            "once" => patch.once = Some(truthy(v)),
            "horizontal" => patch.horizontal = Some(truthy(v)),
            "trigger" => patch.trigger = Some(margins(v)),
            "container" => patch.container = Some(selector(v)),
            "receiver" => patch.receiver = Some(selector(v)),
            "delay" => patch.delay = Some(selector(v)),
            "breakpoint" => patch.breakpoint = Some(breakpoints(v)),
            "eventListen" => patch.event_listen = Some(event_list(v)),
            "prefix" => {
                if let Some(s) = v.as_str() {
                    patch.prefix = Some(s.to_string());
                }
            }
            _ => {}
        }
    }
    patch
}

// =============================================================================
// Option shapes
// =============================================================================

/// JS-style truthiness for loose flag values.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn sink_kind(name: &str) -> Option<SinkSet> {
    match name {
        "style" | "css" => Some(SinkSet::STYLE),
        "data" | "attr" => Some(SinkSet::DATA),
        _ => None,
    }
}

/// Normalize a sink option: falsy disables, `true` means the default sink,
/// strings/sequences are filtered to known kinds with the default sink as the
/// fallback for an empty filtered set.
fn sink_set(value: &Value) -> SinkSet {
    if !truthy(value) {
        return SinkSet::empty();
    }
    let filtered = match value {
        Value::String(s) => sink_kind(s).unwrap_or(SinkSet::empty()),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| item.as_str().and_then(sink_kind))
            .fold(SinkSet::empty(), |acc, kind| acc | kind),
        _ => return SinkSet::DEFAULT,
    };
    if filtered.is_empty() {
        SinkSet::DEFAULT
    } else {
        filtered
    }
}

/// Normalize `peak`: a 3-element ordered sequence or a named triple.
fn peak_range(value: &Value) -> Option<Peak> {
    match value {
        Value::Array(items) if items.len() == 3 => {
            let mut nums = items.iter().filter_map(Value::as_f64);
            Some(Peak {
                start: nums.next()?,
                peak: nums.next()?,
                end: nums.next()?,
            })
        }
        Value::Object(map) => Some(Peak {
            start: map.get("start")?.as_f64()?,
            peak: map.get("peak")?.as_f64()?,
            end: map.get("end")?.as_f64()?,
        }),
        _ => None,
    }
}

/// Step thresholds must be a sequence; anything else disables the dimension.
fn step_thresholds(value: &Value) -> Option<Vec<f64>> {
    match value {
        Value::Array(items) => Some(items.iter().filter_map(Value::as_f64).collect()),
        _ => None,
    }
}

fn margins(value: &Value) -> Option<Margins> {
    value
        .as_str()
        .filter(|s| !s.trim().is_empty())
        .map(Margins::from_shorthand)
}

fn selector(value: &Value) -> Option<String> {
    value
        .as_str()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Breakpoint map: numeric min-width keys to nested patches, non-numeric
/// keys dropped. `BTreeMap` keeps the ascending application order.
fn breakpoints(value: &Value) -> BTreeMap<u32, SettingsPatch> {
    let mut map = BTreeMap::new();
    if let Some(object) = value.as_object() {
        for (key, child) in object {
            if let Ok(threshold) = key.parse::<u32>() {
                map.insert(threshold, patch_from_value(child));
            }
        }
    }
    map
}

/// Metric-event allow-list: a single name or a sequence, unknown names
/// dropped.
fn event_list(value: &Value) -> Option<Vec<Metric>> {
    match value {
        Value::String(s) => Some(Metric::from_option_name(s).into_iter().collect()),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(|item| item.as_str().and_then(Metric::from_option_name))
                .collect(),
        ),
        _ => None,
    }
}

// =============================================================================
// Named configurations
// =============================================================================

/// A named configuration: a static patch or a per-element factory.
#[derive(Clone)]
pub enum ConfigSource {
    Static(SettingsPatch),
    Factory(Rc<dyn Fn(ElementId) -> SettingsPatch>),
}

impl std::fmt::Debug for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Static(patch) => f.debug_tuple("Static").field(patch).finish(),
            Self::Factory(_) => f.debug_tuple("Factory").finish(),
        }
    }
}

/// Key-to-configuration lookup consulted before inline parsing.
#[derive(Debug, Clone, Default)]
pub struct ConfigRegistry {
    entries: HashMap<String, ConfigSource>,
}

impl ConfigRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a static configuration under a key.
    pub fn insert(&mut self, key: impl Into<String>, patch: SettingsPatch) {
        self.entries.insert(key.into(), ConfigSource::Static(patch));
    }

    /// Register a factory invoked with the element being configured.
    pub fn insert_factory(
        &mut self,
        key: impl Into<String>,
        factory: impl Fn(ElementId) -> SettingsPatch + 'static,
    ) {
        self.entries
            .insert(key.into(), ConfigSource::Factory(Rc::new(factory)));
    }

    /// Resolve a key for an element. `None` when the key is unregistered.
    pub fn resolve(&self, key: &str, element: ElementId) -> Option<SettingsPatch> {
        match self.entries.get(key)? {
            ConfigSource::Static(patch) => Some(patch.clone()),
            ConfigSource::Factory(factory) => Some(factory(element)),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_unquoted_keys_and_single_quotes() {
        let patch = parse_inline("{visibility: true, fill: ['data', 'style'], prefix: 'sc'}")
            .expect("lenient parse");
        assert_eq!(patch.visibility, Some(SinkSet::STYLE));
        assert_eq!(patch.fill, Some(SinkSet::STYLE | SinkSet::DATA));
        assert_eq!(patch.prefix.as_deref(), Some("sc"));
    }

    #[test]
    fn test_parse_already_quoted_keys() {
        let patch = parse_inline(r#"{"once": true, "horizontal": 1}"#).expect("strict input");
        assert_eq!(patch.once, Some(true));
        assert_eq!(patch.horizontal, Some(true));
    }

    #[test]
    fn test_parse_failure_is_reported() {
        assert!(parse_inline("{visibility: ").is_err());
        assert!(parse_inline("[1, 2, 3]").is_err());
    }

    #[test]
    fn test_sink_shapes_normalized_defensively() {
        assert_eq!(sink_set(&serde_json::json!(false)), SinkSet::empty());
        assert_eq!(sink_set(&serde_json::json!(null)), SinkSet::empty());
        assert_eq!(sink_set(&serde_json::json!(0)), SinkSet::empty());
        assert_eq!(sink_set(&serde_json::json!(true)), SinkSet::DEFAULT);
        assert_eq!(sink_set(&serde_json::json!("data")), SinkSet::DATA);
        assert_eq!(sink_set(&serde_json::json!("css")), SinkSet::STYLE);
        // Unknown kinds are filtered; an empty filtered set falls back
        assert_eq!(sink_set(&serde_json::json!("bogus")), SinkSet::DEFAULT);
        assert_eq!(
            sink_set(&serde_json::json!(["bogus", "data"])),
            SinkSet::DATA
        );
        assert_eq!(sink_set(&serde_json::json!([])), SinkSet::DEFAULT);
    }

    #[test]
    fn test_peak_from_sequence_and_triple() {
        let patch = parse_inline("{peak: [0, 0.5, 1]}").expect("sequence");
        assert_eq!(
            patch.peak,
            Some(Some(Peak {
                start: 0.0,
                peak: 0.5,
                end: 1.0
            }))
        );

        let patch = parse_inline("{peak: {start: 0.2, peak: 0.4, end: 0.9}}").expect("triple");
        let peak = patch.peak.unwrap().unwrap();
        assert_eq!(peak.peak, 0.4);

        // Wrong arity disables
        let patch = parse_inline("{peak: [0, 1]}").expect("short");
        assert_eq!(patch.peak, Some(None));
    }

    #[test]
    fn test_steps_and_selectors() {
        let patch = parse_inline("{visibilityStep: [0.25, 0.5], container: '.wrap', delay: ''}")
            .expect("parse");
        assert_eq!(patch.visibility_step, Some(Some(vec![0.25, 0.5])));
        assert_eq!(patch.container, Some(Some(".wrap".to_string())));
        // Empty selector disables
        assert_eq!(patch.delay, Some(None));
    }

    #[test]
    fn test_trigger_shorthand() {
        let patch = parse_inline("{trigger: '10px 0'}").expect("parse");
        let margins = patch.trigger.unwrap().unwrap();
        assert_eq!(margins.top, "10px");
        assert_eq!(margins.right, "0");
        assert_eq!(margins.bottom, "10px");
        assert_eq!(margins.left, "0");
    }

    #[test]
    fn test_breakpoints_numeric_keys() {
        let patch =
            parse_inline("{fill: true, breakpoint: {768: {fill: false}, 1024: {fill: 'data'}}}")
                .expect("parse");
        let breakpoints = patch.breakpoint.unwrap();
        assert_eq!(breakpoints.len(), 2);
        assert_eq!(breakpoints[&768].fill, Some(SinkSet::empty()));
        assert_eq!(breakpoints[&1024].fill, Some(SinkSet::DATA));
    }

    #[test]
    fn test_event_listen_list() {
        let patch = parse_inline("{eventListen: ['visibility', 'nope', 'fill']}").expect("parse");
        assert_eq!(
            patch.event_listen,
            Some(Some(vec![Metric::Visibility, Metric::Fill]))
        );

        let patch = parse_inline("{eventListen: 'cover'}").expect("parse");
        assert_eq!(patch.event_listen, Some(Some(vec![Metric::Cover])));
    }

    #[test]
    fn test_registry_static_and_factory() {
        let mut registry = ConfigRegistry::new();
        registry.insert(
            "hero",
            SettingsPatch {
                once: Some(true),
                ..Default::default()
            },
        );
        registry.insert_factory("per-element", |element| SettingsPatch {
            horizontal: Some(element.0 % 2 == 0),
            ..Default::default()
        });

        assert_eq!(
            registry.resolve("hero", ElementId(1)).unwrap().once,
            Some(true)
        );
        assert_eq!(
            registry
                .resolve("per-element", ElementId(2))
                .unwrap()
                .horizontal,
            Some(true)
        );
        assert_eq!(
            registry
                .resolve("per-element", ElementId(3))
                .unwrap()
                .horizontal,
            Some(false)
        );
        assert!(registry.resolve("missing", ElementId(1)).is_none());
    }
}
