//! Settings - Layered per-element configuration.
//!
//! A controller's active settings are resolved from three layers:
//! library defaults -> engine-level options -> the element's declared
//! configuration, with breakpoint overrides applied cumulatively on top for
//! the current window width. Resolution is a pure function re-derived from
//! the element's original declared patch on every resize, which is what makes
//! breakpoint overrides reversible when the width drops back below a
//! threshold.
//!
//! Option shapes arriving from lenient configuration strings are normalized
//! defensively in [`parse`]; nothing in this module rejects input.

use std::collections::BTreeMap;

use crate::types::{Margins, Metric, StepDimension};

pub mod parse;

pub use parse::{ConfigRegistry, ConfigSource, ParseError, parse_inline};

// =============================================================================
// Sink sets
// =============================================================================

bitflags::bitflags! {
    /// Output channels for one metric.
    ///
    /// Combine with bitwise OR: `SinkSet::STYLE | SinkSet::DATA`.
    /// An empty set means the metric is disabled.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SinkSet: u8 {
        /// Style custom property (`--<prefix><metric>`).
        const STYLE = 1 << 0;
        /// Data attribute (`data-<prefix><metric>`).
        const DATA = 1 << 1;
    }
}

impl SinkSet {
    /// The sink used when an option enables a metric without naming one.
    pub const DEFAULT: Self = Self::STYLE;

    /// Whether the metric writes anywhere at all.
    pub fn is_enabled(&self) -> bool {
        !self.is_empty()
    }
}

// =============================================================================
// Peak range
// =============================================================================

/// Normalized `peak` thresholds: the triangular ramp rises on
/// [`start`, `peak`] and falls on [`peak`, `end`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak {
    pub start: f64,
    pub peak: f64,
    pub end: f64,
}

// =============================================================================
// Settings
// =============================================================================

/// Fully resolved configuration for one element, immutable per update cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub visibility: SinkSet,
    pub fill: SinkSet,
    pub cover: SinkSet,
    pub enter: SinkSet,
    pub exit: SinkSet,
    pub offset_enter: SinkSet,
    pub offset_exit: SinkSet,
    /// Peak thresholds; `Some` enables the peak metric on the default sink.
    pub peak: Option<Peak>,
    pub visibility_step: Option<Vec<f64>>,
    pub fill_step: Option<Vec<f64>>,
    pub cover_step: Option<Vec<f64>>,
    pub enter_step: Option<Vec<f64>>,
    pub exit_step: Option<Vec<f64>>,
    /// Record the first enter and suppress the exit event afterwards.
    pub once: bool,
    /// Trigger probe margins; `Some` creates a probe for the element.
    pub trigger: Option<Margins>,
    /// Track the horizontal axis instead of the vertical one.
    pub horizontal: bool,
    /// Custom scrolling container selector (`None` = viewport).
    pub container: Option<String>,
    /// Additional elements receiving this element's sink writes.
    pub receiver: Option<String>,
    /// Selector for delay sub-elements.
    pub delay: Option<String>,
    /// Min-width breakpoints applied cumulatively in ascending order.
    pub breakpoint: BTreeMap<u32, SettingsPatch>,
    /// Metric-update event allow-list; `None` emits for every enabled metric.
    pub event_listen: Option<Vec<Metric>>,
    /// Prefix for derived sink names.
    pub prefix: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            visibility: SinkSet::empty(),
            fill: SinkSet::empty(),
            cover: SinkSet::empty(),
            enter: SinkSet::empty(),
            exit: SinkSet::empty(),
            offset_enter: SinkSet::empty(),
            offset_exit: SinkSet::empty(),
            peak: None,
            visibility_step: None,
            fill_step: None,
            cover_step: None,
            enter_step: None,
            exit_step: None,
            once: false,
            trigger: None,
            horizontal: false,
            container: None,
            receiver: None,
            delay: None,
            breakpoint: BTreeMap::new(),
            event_listen: None,
            prefix: String::new(),
        }
    }
}

impl Settings {
    /// The axis this element is tracked along.
    pub fn axis(&self) -> crate::types::Axis {
        if self.horizontal {
            crate::types::Axis::Horizontal
        } else {
            crate::types::Axis::Vertical
        }
    }

    /// Sink set for a metric. Peak has no sink option of its own: when
    /// configured it writes to the default sink.
    pub fn sinks(&self, metric: Metric) -> SinkSet {
        match metric {
            Metric::Visibility => self.visibility,
            Metric::Fill => self.fill,
            Metric::Cover => self.cover,
            Metric::Enter => self.enter,
            Metric::Exit => self.exit,
            Metric::Peak => {
                if self.peak.is_some() {
                    SinkSet::DEFAULT
                } else {
                    SinkSet::empty()
                }
            }
            Metric::OffsetEnter => self.offset_enter,
            Metric::OffsetExit => self.offset_exit,
        }
    }

    /// Raw step thresholds for a dimension, if configured.
    pub fn steps(&self, dimension: StepDimension) -> Option<&[f64]> {
        match dimension {
            StepDimension::Visibility => self.visibility_step.as_deref(),
            StepDimension::Fill => self.fill_step.as_deref(),
            StepDimension::Cover => self.cover_step.as_deref(),
            StepDimension::Enter => self.enter_step.as_deref(),
            StepDimension::Exit => self.exit_step.as_deref(),
        }
    }

    /// Whether a metric-update event may be emitted for `metric`.
    pub fn allows_event(&self, metric: Metric) -> bool {
        match &self.event_listen {
            None => true,
            Some(listed) => listed.contains(&metric),
        }
    }
}

// =============================================================================
// Patches
// =============================================================================

/// Partial settings overlay. `None` leaves the underlying value untouched;
/// nullable settings use a nested `Option` so an overlay can disable them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsPatch {
    pub visibility: Option<SinkSet>,
    pub fill: Option<SinkSet>,
    pub cover: Option<SinkSet>,
    pub enter: Option<SinkSet>,
    pub exit: Option<SinkSet>,
    pub offset_enter: Option<SinkSet>,
    pub offset_exit: Option<SinkSet>,
    pub peak: Option<Option<Peak>>,
    pub visibility_step: Option<Option<Vec<f64>>>,
    pub fill_step: Option<Option<Vec<f64>>>,
    pub cover_step: Option<Option<Vec<f64>>>,
    pub enter_step: Option<Option<Vec<f64>>>,
    pub exit_step: Option<Option<Vec<f64>>>,
    pub once: Option<bool>,
    pub trigger: Option<Option<Margins>>,
    pub horizontal: Option<bool>,
    pub container: Option<Option<String>>,
    pub receiver: Option<Option<String>>,
    pub delay: Option<Option<String>>,
    pub breakpoint: Option<BTreeMap<u32, SettingsPatch>>,
    pub event_listen: Option<Option<Vec<Metric>>>,
    pub prefix: Option<String>,
}

impl SettingsPatch {
    /// Overlay this patch onto resolved settings.
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(v) = self.visibility {
            settings.visibility = v;
        }
        if let Some(v) = self.fill {
            settings.fill = v;
        }
        if let Some(v) = self.cover {
            settings.cover = v;
        }
        if let Some(v) = self.enter {
            settings.enter = v;
        }
        if let Some(v) = self.exit {
            settings.exit = v;
        }
        if let Some(v) = self.offset_enter {
            settings.offset_enter = v;
        }
        if let Some(v) = self.offset_exit {
            settings.offset_exit = v;
        }
        if let Some(v) = self.peak {
            settings.peak = v;
        }
        if let Some(v) = &self.visibility_step {
            settings.visibility_step = v.clone();
        }
        if let Some(v) = &self.fill_step {
            settings.fill_step = v.clone();
        }
        if let Some(v) = &self.cover_step {
            settings.cover_step = v.clone();
        }
        if let Some(v) = &self.enter_step {
            settings.enter_step = v.clone();
        }
        if let Some(v) = &self.exit_step {
            settings.exit_step = v.clone();
        }
        if let Some(v) = self.once {
            settings.once = v;
        }
        if let Some(v) = &self.trigger {
            settings.trigger = v.clone();
        }
        if let Some(v) = self.horizontal {
            settings.horizontal = v;
        }
        if let Some(v) = &self.container {
            settings.container = v.clone();
        }
        if let Some(v) = &self.receiver {
            settings.receiver = v.clone();
        }
        if let Some(v) = &self.delay {
            settings.delay = v.clone();
        }
        if let Some(v) = &self.breakpoint {
            settings.breakpoint = v.clone();
        }
        if let Some(v) = &self.event_listen {
            settings.event_listen = v.clone();
        }
        if let Some(v) = &self.prefix {
            settings.prefix = v.clone();
        }
    }
}

// =============================================================================
// Resolution
// =============================================================================

/// Resolve the active settings for one element at the given window width.
///
/// Layers in precedence order: library defaults, the engine's element
/// defaults, the element's declared patch, then every breakpoint patch whose
/// min-width threshold the current width meets, ascending. Never mutates its
/// inputs, so dropping below a threshold simply resolves without that layer.
pub fn resolve(engine: &SettingsPatch, declared: &SettingsPatch, width: f64) -> Settings {
    let mut settings = Settings::default();
    engine.apply(&mut settings);
    declared.apply(&mut settings);

    let breakpoints = settings.breakpoint.clone();
    for (threshold, patch) in &breakpoints {
        if width >= f64::from(*threshold) {
            patch.apply(&mut settings);
        }
    }
    settings
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sink_patch(fill: SinkSet) -> SettingsPatch {
        SettingsPatch {
            fill: Some(fill),
            ..Default::default()
        }
    }

    #[test]
    fn test_sink_set_default_and_enabled() {
        assert!(!SinkSet::empty().is_enabled());
        assert!(SinkSet::DEFAULT.is_enabled());
        assert_eq!(SinkSet::DEFAULT, SinkSet::STYLE);
        assert!((SinkSet::STYLE | SinkSet::DATA).contains(SinkSet::DATA));
    }

    #[test]
    fn test_resolution_precedence() {
        let engine = SettingsPatch {
            fill: Some(SinkSet::STYLE),
            once: Some(true),
            ..Default::default()
        };
        let declared = sink_patch(SinkSet::DATA);

        let settings = resolve(&engine, &declared, 1024.0);
        // Declared wins over engine for fill; engine's once survives
        assert_eq!(settings.fill, SinkSet::DATA);
        assert!(settings.once);
        // Untouched settings keep library defaults
        assert_eq!(settings.visibility, SinkSet::empty());
        assert!(!settings.horizontal);
    }

    #[test]
    fn test_breakpoints_apply_ascending_and_cumulative() {
        let mut breakpoints = BTreeMap::new();
        breakpoints.insert(
            600,
            SettingsPatch {
                fill: Some(SinkSet::STYLE),
                once: Some(true),
                ..Default::default()
            },
        );
        breakpoints.insert(900, sink_patch(SinkSet::DATA));

        let declared = SettingsPatch {
            breakpoint: Some(breakpoints),
            ..Default::default()
        };

        let narrow = resolve(&SettingsPatch::default(), &declared, 500.0);
        assert_eq!(narrow.fill, SinkSet::empty());
        assert!(!narrow.once);

        let medium = resolve(&SettingsPatch::default(), &declared, 700.0);
        assert_eq!(medium.fill, SinkSet::STYLE);
        assert!(medium.once);

        // Both thresholds met: the wider one wins for fill, once persists
        let wide = resolve(&SettingsPatch::default(), &declared, 1000.0);
        assert_eq!(wide.fill, SinkSet::DATA);
        assert!(wide.once);
    }

    #[test]
    fn test_breakpoints_revert_for_any_resize_sequence() {
        let mut breakpoints = BTreeMap::new();
        breakpoints.insert(768, sink_patch(SinkSet::DATA));
        let declared = SettingsPatch {
            fill: Some(SinkSet::STYLE),
            breakpoint: Some(breakpoints),
            ..Default::default()
        };

        let widths = [320.0, 800.0, 1200.0, 700.0, 769.0, 100.0];
        for width in widths {
            let settings = resolve(&SettingsPatch::default(), &declared, width);
            if width >= 768.0 {
                assert_eq!(settings.fill, SinkSet::DATA, "width {width}");
            } else {
                // Fully reverted to the declared value
                assert_eq!(settings.fill, SinkSet::STYLE, "width {width}");
            }
        }
    }

    #[test]
    fn test_patch_can_disable_nullable_settings() {
        let declared = SettingsPatch {
            peak: Some(Some(Peak {
                start: 0.0,
                peak: 0.5,
                end: 1.0,
            })),
            container: Some(Some(".wrap".to_string())),
            ..Default::default()
        };
        let mut breakpoints = BTreeMap::new();
        breakpoints.insert(
            768,
            SettingsPatch {
                peak: Some(None),
                container: Some(None),
                ..Default::default()
            },
        );
        let declared = SettingsPatch {
            breakpoint: Some(breakpoints),
            ..declared
        };

        let narrow = resolve(&SettingsPatch::default(), &declared, 320.0);
        assert!(narrow.peak.is_some());
        assert_eq!(narrow.container.as_deref(), Some(".wrap"));

        let wide = resolve(&SettingsPatch::default(), &declared, 1024.0);
        assert!(wide.peak.is_none());
        assert!(wide.container.is_none());
    }

    #[test]
    fn test_peak_enables_default_sink() {
        let mut settings = Settings::default();
        assert_eq!(settings.sinks(Metric::Peak), SinkSet::empty());

        settings.peak = Some(Peak {
            start: 0.0,
            peak: 0.5,
            end: 1.0,
        });
        assert_eq!(settings.sinks(Metric::Peak), SinkSet::DEFAULT);
    }

    #[test]
    fn test_event_allow_list() {
        let mut settings = Settings::default();
        assert!(settings.allows_event(Metric::Fill));

        settings.event_listen = Some(vec![Metric::Visibility]);
        assert!(settings.allows_event(Metric::Visibility));
        assert!(!settings.allows_event(Metric::Fill));
    }
}
