//! Element Controller - Per-element progress state machine.
//!
//! One controller per observed element. It owns the element's resolved
//! settings, geometry cache, computed metric values and step state, and on
//! every update cycle:
//!
//! 1. re-resolves breakpoint overrides (resize only) and the container size
//! 2. reads geometry from the host and runs the progress math
//! 3. writes every enabled metric to its configured sinks
//! 4. advances the step trackers and maintains the marker attributes
//! 5. emits the lifecycle/transition events for this cycle
//!
//! The controller records every style property and data attribute it has
//! ever written, on the element and on its receivers, so `destroy` can
//! remove exactly that set.

use std::collections::BTreeSet;

use crate::events::Event;
use crate::host::Host;
use crate::progress::{self, DelaySegment, Geometry};
use crate::settings::{self, Settings, SettingsPatch, SinkSet};
use crate::step::StepTracker;
use crate::types::{Axis, Edge, ElementId, Metric, ProbeId, ScopeId, StepDimension};

// =============================================================================
// Marker attributes
// =============================================================================

/// Present while the element intersects the container ("1"/"0").
pub const IN_MARKER: &str = "data-spark-in";
/// Present while the element covers the container from its leading edge.
pub const START_MARKER: &str = "data-spark-start";
/// Present while the element covers the container to its trailing edge.
pub const END_MARKER: &str = "data-spark-end";
/// Present while the element span overlaps its trigger probe.
pub const COLLISION_MARKER: &str = "data-spark-collision";
/// Set once on the first probe collision and never cleared by updates.
pub const FIRE_MARKER: &str = "data-spark-fire";

/// Inline configuration attribute read from the element.
pub const CONFIG_ATTR: &str = "data-spark";
/// Named-configuration key attribute.
pub const CONFIG_KEY_ATTR: &str = "data-spark-config";
/// Title attribute consulted for boundary-target resolution.
pub const TITLE_ATTR: &str = "data-spark-title";

// =============================================================================
// Metric values
// =============================================================================

/// The computed outputs of the last update cycle.
#[derive(Debug, Clone, Copy, Default)]
struct MetricValues {
    visibility: f64,
    fill: f64,
    cover: f64,
    enter: f64,
    exit: f64,
    peak: f64,
    offset_enter: f64,
    offset_exit: f64,
}

impl MetricValues {
    fn get(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Visibility => self.visibility,
            Metric::Fill => self.fill,
            Metric::Cover => self.cover,
            Metric::Enter => self.enter,
            Metric::Exit => self.exit,
            Metric::Peak => self.peak,
            Metric::OffsetEnter => self.offset_enter,
            Metric::OffsetExit => self.offset_exit,
        }
    }
}

const METRIC_ORDER: [Metric; 8] = [
    Metric::Visibility,
    Metric::Fill,
    Metric::Cover,
    Metric::Enter,
    Metric::Exit,
    Metric::Peak,
    Metric::OffsetEnter,
    Metric::OffsetExit,
];

// =============================================================================
// Controller
// =============================================================================

/// Per-element progress state machine.
pub struct ElementController {
    element: ElementId,
    scope: ScopeId,
    engine_patch: SettingsPatch,
    declared: SettingsPatch,
    settings: Settings,

    init: bool,
    destroyed: bool,
    mounted: bool,
    unmounted: bool,
    done: bool,

    container: Option<ElementId>,
    container_size: f64,
    probe: Option<ProbeId>,

    values: MetricValues,
    was_in: bool,
    was_full: bool,
    colliding: bool,
    fired: bool,

    steps: Vec<(StepDimension, StepTracker)>,

    written_styles: BTreeSet<(ElementId, String)>,
    written_data: BTreeSet<(ElementId, String)>,
}

impl ElementController {
    /// Attach a controller to an element.
    ///
    /// Resolves the settings layers for the current window width, creates the
    /// trigger probe if configured, resolves the container reference, then
    /// performs the initial update (events from it carry `is_initial: true`).
    pub fn new<H: Host>(
        host: &mut H,
        element: ElementId,
        engine_patch: &SettingsPatch,
        declared: SettingsPatch,
        scope: ScopeId,
        events: &mut Vec<Event>,
    ) -> Self {
        let width = host.viewport_size().width;
        let resolved = settings::resolve(engine_patch, &declared, width);
        let probe = resolved
            .trigger
            .as_ref()
            .map(|margins| host.create_probe(scope, margins));

        let mut controller = Self {
            element,
            scope,
            engine_patch: engine_patch.clone(),
            declared,
            settings: resolved,
            init: false,
            destroyed: false,
            mounted: false,
            unmounted: false,
            done: false,
            container: None,
            container_size: 0.0,
            probe,
            values: MetricValues::default(),
            was_in: false,
            was_full: false,
            colliding: false,
            fired: false,
            steps: Vec::new(),
            written_styles: BTreeSet::new(),
            written_data: BTreeSet::new(),
        };
        controller.rebuild_steps();
        controller.refresh_container(host);
        controller.update(host, false, events);
        controller.init = true;
        controller
    }

    // -- engine-facing state --------------------------------------------------

    pub fn element(&self) -> ElementId {
        self.element
    }

    /// Active settings for the current width.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Whether the element currently intersects the container.
    pub fn is_in(&self) -> bool {
        self.was_in
    }

    /// Whether a `once` match has been recorded.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Intersection watcher result: mounted controllers recompute on scroll,
    /// unmounted ones skip updates until remounted.
    pub fn set_mounted(&mut self, mounted: bool) {
        if mounted {
            self.mounted = true;
            self.unmounted = false;
        } else {
            self.mounted = false;
        }
    }

    /// Lift unmount suppression for one forced update pass.
    pub fn clear_unmount(&mut self) {
        self.unmounted = false;
    }

    // -- update cycle ---------------------------------------------------------

    /// Recompute this element: geometry, metrics, sinks, steps, events.
    ///
    /// No-op while unmount-suppressed (after initialization) or destroyed.
    pub fn update<H: Host>(&mut self, host: &mut H, is_resize: bool, events: &mut Vec<Event>) {
        if self.destroyed || (self.unmounted && self.init) {
            return;
        }
        if !self.mounted {
            self.unmounted = true;
        }

        if is_resize && !self.settings.breakpoint.is_empty() {
            let width = host.viewport_size().width;
            self.settings = settings::resolve(&self.engine_patch, &self.declared, width);
            self.rebuild_steps();
        }
        if is_resize || self.container_size == 0.0 {
            self.refresh_container(host);
        }

        let axis = self.settings.axis();
        let rect = host.bounds(self.element);
        let element_start = rect.start(axis);
        let element_size = host.intrinsic_size(self.element).along(axis);

        let delay_offset = self.compute_delay_offset(host, axis, element_start);
        let geometry = Geometry {
            element_start,
            element_size,
            container_size: self.container_size,
            delay_offset,
        };
        self.compute_metrics(&geometry);

        self.write_outputs(host, events);
        self.check_steps(host, events);
        self.handle_edges(host, &geometry, events);
        if self.probe.is_some() {
            self.handle_collision(host, axis, &geometry, events);
        }
    }

    fn refresh_container<H: Host>(&mut self, host: &H) {
        // The container selector may resolve differently after a breakpoint
        self.container = self
            .settings
            .container
            .as_deref()
            .and_then(|selector| host.query(selector).into_iter().next());
        let axis = self.settings.axis();
        self.container_size = match self.container {
            Some(container) => host.intrinsic_size(container).along(axis),
            None => host.viewport_size().along(axis),
        };
    }

    fn rebuild_steps(&mut self) {
        let mut kept = std::mem::take(&mut self.steps);
        for dimension in StepDimension::ALL {
            let Some(raw) = self.settings.steps(dimension) else {
                kept.retain(|(d, _)| *d != dimension);
                continue;
            };
            if let Some((_, tracker)) = kept.iter_mut().find(|(d, _)| *d == dimension) {
                tracker.retune(raw);
            } else {
                kept.push((dimension, StepTracker::new(raw)));
            }
        }
        self.steps = kept;
    }

    fn compute_delay_offset<H: Host>(&self, host: &H, axis: Axis, element_start: f64) -> f64 {
        let Some(selector) = self.settings.delay.as_deref() else {
            return 0.0;
        };
        let segments: Vec<DelaySegment> = host
            .delay_children(self.element, selector)
            .into_iter()
            .map(|child| DelaySegment {
                size: child.size.along(axis),
                position: match axis {
                    Axis::Vertical => child.top,
                    Axis::Horizontal => child.left,
                },
                is_end: child.is_end,
            })
            .collect();
        progress::delay_offset(&segments, element_start, self.container_size)
    }

    fn compute_metrics(&mut self, geometry: &Geometry) {
        // Visibility always: peak and the in/out classification depend on it
        self.values.visibility = progress::visibility(geometry);

        let want_fill = self.settings.fill.is_enabled() || self.settings.fill_step.is_some();
        self.values.fill = if want_fill {
            progress::fill(geometry)
        } else {
            0.0
        };

        let want_cover = self.settings.cover.is_enabled() || self.settings.cover_step.is_some();
        self.values.cover = if want_cover {
            progress::cover(geometry)
        } else {
            0.0
        };

        self.values.enter = progress::enter(geometry);
        self.values.exit = progress::exit(geometry);

        self.values.peak = match self.settings.peak {
            Some(range) => progress::peak(self.values.visibility, range.start, range.peak, range.end),
            None => 0.0,
        };

        self.values.offset_enter = progress::offset_enter(geometry);
        self.values.offset_exit = progress::offset_exit(geometry);
    }

    // -- sinks and events -----------------------------------------------------

    fn sink_prefix(&self) -> String {
        if self.settings.prefix.is_empty() {
            String::new()
        } else {
            format!("{}-", self.settings.prefix)
        }
    }

    fn write_outputs<H: Host>(&mut self, host: &mut H, events: &mut Vec<Event>) {
        let targets: Vec<ElementId> = std::iter::once(self.element)
            .chain(
                self.settings
                    .receiver
                    .as_deref()
                    .map(|selector| host.query(selector))
                    .unwrap_or_default(),
            )
            .collect();
        let prefix = self.sink_prefix();

        for metric in METRIC_ORDER {
            let sinks = self.settings.sinks(metric);
            if !sinks.is_enabled() {
                continue;
            }
            let value = self.values.get(metric);
            let rendered = format!("{value}");

            if sinks.contains(SinkSet::STYLE) {
                let property = format!("--{prefix}{}", metric.name());
                for &target in &targets {
                    host.set_style(target, &property, &rendered);
                    self.written_styles.insert((target, property.clone()));
                }
            }
            if sinks.contains(SinkSet::DATA) {
                let name = format!("data-{prefix}{}", metric.name());
                for &target in &targets {
                    host.set_data(target, &name, &rendered);
                    self.written_data.insert((target, name.clone()));
                }
            }
            if self.settings.allows_event(metric) {
                events.push(Event::MetricUpdate {
                    element: self.element,
                    metric,
                    value,
                });
            }
        }
    }

    fn write_marker<H: Host>(&mut self, host: &mut H, name: &str, value: &str) {
        host.set_data(self.element, name, value);
        self.written_data.insert((self.element, name.to_string()));
    }

    fn check_steps<H: Host>(&mut self, host: &mut H, events: &mut Vec<Event>) {
        let is_initial = !self.init;
        let values = self.values;
        let mut transitions = Vec::new();
        for (dimension, tracker) in &mut self.steps {
            let value = values.get(dimension.metric());
            if let Some(transition) = tracker.advance(value, is_initial) {
                transitions.push((*dimension, transition));
            }
        }
        for (dimension, transition) in transitions {
            self.write_marker(
                host,
                &format!("data-{}-step", dimension.name()),
                &transition.step.to_string(),
            );
            events.push(Event::StepChange {
                element: self.element,
                dimension,
                step: transition.step,
                prev_step: transition.prev_step,
                max_step: transition.max_step,
                is_initial: transition.is_initial,
            });
        }
    }

    fn handle_edges<H: Host>(
        &mut self,
        host: &mut H,
        geometry: &Geometry,
        events: &mut Vec<Event>,
    ) {
        let is_initial = !self.init;
        let element_start = geometry.element_start;
        let element_end = geometry.element_end();
        let container_size = geometry.container_size;

        let is_in = element_end > 0.0 && element_start < container_size;
        if is_in != self.was_in {
            self.write_marker(host, IN_MARKER, if is_in { "1" } else { "0" });
            if is_in {
                events.push(Event::ScrollEnter {
                    element: self.element,
                    from: if element_start < 0.0 {
                        Edge::Start
                    } else {
                        Edge::End
                    },
                    is_initial,
                });
            } else if !(self.settings.once && self.done) {
                events.push(Event::ScrollExit {
                    element: self.element,
                    from: if element_end < container_size {
                        Edge::Start
                    } else {
                        Edge::End
                    },
                    is_initial,
                });
            }
            if self.settings.once && is_in {
                self.done = true;
            }
            self.was_in = is_in;
        }

        if is_in {
            let covering_start = element_start <= 0.0;
            let covering_end = element_end >= container_size;
            self.write_marker(host, START_MARKER, if covering_start { "1" } else { "0" });
            self.write_marker(host, END_MARKER, if covering_end { "1" } else { "0" });

            let is_full = covering_start && covering_end;
            if is_full != self.was_full {
                if is_full {
                    events.push(Event::FullIn {
                        element: self.element,
                        from: if element_start < 0.0 {
                            Edge::Start
                        } else {
                            Edge::End
                        },
                        is_initial,
                    });
                } else {
                    events.push(Event::FullOut {
                        element: self.element,
                        from: if covering_start { Edge::End } else { Edge::Start },
                        is_initial,
                    });
                }
                self.was_full = is_full;
            }
        } else {
            self.write_marker(host, START_MARKER, "0");
            self.write_marker(host, END_MARKER, "0");
        }
    }

    fn handle_collision<H: Host>(
        &mut self,
        host: &mut H,
        axis: Axis,
        geometry: &Geometry,
        events: &mut Vec<Event>,
    ) {
        let Some(probe) = self.probe else { return };
        let is_initial = !self.init;
        let element_start = geometry.element_start;
        let element_end = geometry.element_end();

        let bounds = host.probe_bounds(probe);
        let probe_start = bounds.start(axis);
        let probe_end = bounds.end(axis);

        let is_colliding = element_start <= probe_end && element_end >= probe_start;
        if is_colliding && !self.colliding {
            self.colliding = true;
            self.write_marker(host, COLLISION_MARKER, "1");
            events.push(Event::CollisionEnter {
                element: self.element,
                from: if element_start <= probe_end {
                    Edge::Start
                } else {
                    Edge::End
                },
                is_initial,
            });
            if !self.fired {
                self.fired = true;
                self.write_marker(host, FIRE_MARKER, "1");
                events.push(Event::Fire {
                    element: self.element,
                    from: if element_start <= probe_end {
                        Edge::Start
                    } else {
                        Edge::End
                    },
                    is_initial,
                });
            }
        } else if !is_colliding && self.colliding {
            self.colliding = false;
            self.write_marker(host, COLLISION_MARKER, "0");
            events.push(Event::CollisionExit {
                element: self.element,
                from: if element_end >= probe_start {
                    Edge::Start
                } else {
                    Edge::End
                },
                is_initial,
            });
        }
    }

    // -- teardown -------------------------------------------------------------

    /// Remove every attribute and style property this controller ever wrote
    /// and the trigger probe, if any. Safe to call more than once.
    pub fn destroy<H: Host>(&mut self, host: &mut H) {
        if self.destroyed {
            return;
        }
        for (target, property) in std::mem::take(&mut self.written_styles) {
            host.remove_style(target, &property);
        }
        for (target, name) in std::mem::take(&mut self.written_data) {
            host.remove_data(target, &name);
        }
        if let Some(probe) = self.probe.take() {
            host.remove_probe(self.scope, probe);
        }
        self.destroyed = true;
        tracing::debug!(element = self.element.0, "controller destroyed");
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Event;
    use crate::host::MemoryHost;
    use crate::settings::Peak;
    use crate::types::{Rect, Size};

    const VIEW: Size = Size::new(800.0, 600.0);

    fn host_with_element(bounds: Rect) -> (MemoryHost, ElementId, ScopeId) {
        let mut host = MemoryHost::new(VIEW);
        let element = host.add_element(&[".tracked"]);
        host.place(element, bounds);
        let scope = host.create_probe_scope();
        (host, element, scope)
    }

    fn attach(
        host: &mut MemoryHost,
        element: ElementId,
        scope: ScopeId,
        declared: SettingsPatch,
    ) -> (ElementController, Vec<Event>) {
        let mut events = Vec::new();
        let mut controller = ElementController::new(
            host,
            element,
            &SettingsPatch::default(),
            declared,
            scope,
            &mut events,
        );
        controller.set_mounted(true);
        (controller, events)
    }

    fn count_kind(events: &[Event], matcher: impl Fn(&Event) -> bool) -> usize {
        events.iter().filter(|e| matcher(e)).count()
    }

    #[test]
    fn test_initial_update_writes_enabled_sinks() {
        // Oversized element with its leading edge at the container's near edge
        let (mut host, element, scope) = host_with_element(Rect::new(0.0, 0.0, 100.0, 1200.0));
        let declared = SettingsPatch {
            visibility: Some(SinkSet::STYLE | SinkSet::DATA),
            fill: Some(SinkSet::STYLE),
            ..Default::default()
        };
        let (_controller, events) = attach(&mut host, element, scope, declared);

        let visibility: f64 = host.style(element, "--visibility").unwrap().parse().unwrap();
        assert!((visibility - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(
            host.data(element, "data-visibility"),
            host.style(element, "--visibility")
        );
        // Fully covering boundary case
        assert_eq!(host.style(element, "--fill"), Some("0"));

        // One metric-update event per enabled metric
        assert_eq!(
            count_kind(&events, |e| matches!(
                e,
                Event::MetricUpdate { metric: Metric::Visibility, .. }
            )),
            1
        );
        assert_eq!(
            count_kind(&events, |e| matches!(
                e,
                Event::MetricUpdate { metric: Metric::Fill, .. }
            )),
            1
        );
        // Disabled metrics stay silent
        assert_eq!(
            count_kind(&events, |e| matches!(
                e,
                Event::MetricUpdate { metric: Metric::Cover, .. }
            )),
            0
        );
    }

    #[test]
    fn test_event_listen_narrows_metric_events() {
        let (mut host, element, scope) = host_with_element(Rect::new(0.0, 0.0, 100.0, 1200.0));
        let declared = SettingsPatch {
            visibility: Some(SinkSet::STYLE),
            fill: Some(SinkSet::STYLE),
            event_listen: Some(Some(vec![Metric::Fill])),
            ..Default::default()
        };
        let (_controller, events) = attach(&mut host, element, scope, declared);

        assert_eq!(
            count_kind(&events, |e| matches!(
                e,
                Event::MetricUpdate { metric: Metric::Fill, .. }
            )),
            1
        );
        assert_eq!(
            count_kind(&events, |e| matches!(e, Event::MetricUpdate { metric: Metric::Visibility, .. })),
            0
        );
        // Sink writes are never gated by the allow-list
        assert!(host.style(element, "--visibility").is_some());
    }

    #[test]
    fn test_enter_exit_and_in_marker() {
        // Element below the viewport: out initially
        let (mut host, element, scope) = host_with_element(Rect::new(0.0, 700.0, 100.0, 200.0));
        let (mut controller, events) = attach(&mut host, element, scope, SettingsPatch::default());
        assert_eq!(count_kind(&events, |e| matches!(e, Event::ScrollEnter { .. })), 0);
        assert!(!controller.is_in());

        // Scrolled into view from the trailing edge
        host.place(element, Rect::new(0.0, 400.0, 100.0, 200.0));
        let mut events = Vec::new();
        controller.update(&mut host, false, &mut events);
        assert_eq!(
            count_kind(&events, |e| matches!(
                e,
                Event::ScrollEnter { from: Edge::End, is_initial: false, .. }
            )),
            1
        );
        assert_eq!(host.data(element, IN_MARKER), Some("1"));

        // Same geometry again: no duplicate edge events
        let mut events = Vec::new();
        controller.update(&mut host, false, &mut events);
        assert_eq!(count_kind(&events, |e| matches!(e, Event::ScrollEnter { .. })), 0);

        // Scrolled out past the leading edge
        host.place(element, Rect::new(0.0, -300.0, 100.0, 200.0));
        let mut events = Vec::new();
        controller.update(&mut host, false, &mut events);
        assert_eq!(
            count_kind(&events, |e| matches!(
                e,
                Event::ScrollExit { from: Edge::Start, .. }
            )),
            1
        );
        assert_eq!(host.data(element, IN_MARKER), Some("0"));
    }

    #[test]
    fn test_once_suppresses_exit_forever() {
        let (mut host, element, scope) = host_with_element(Rect::new(0.0, 700.0, 100.0, 200.0));
        let declared = SettingsPatch {
            once: Some(true),
            ..Default::default()
        };
        let (mut controller, _) = attach(&mut host, element, scope, declared);

        // Enter
        host.place(element, Rect::new(0.0, 400.0, 100.0, 200.0));
        let mut events = Vec::new();
        controller.update(&mut host, false, &mut events);
        assert_eq!(count_kind(&events, |e| matches!(e, Event::ScrollEnter { .. })), 1);
        assert!(controller.is_done());

        // Exit, re-enter, exit again: no ScrollExit ever
        for bounds in [
            Rect::new(0.0, -300.0, 100.0, 200.0),
            Rect::new(0.0, 400.0, 100.0, 200.0),
            Rect::new(0.0, 700.0, 100.0, 200.0),
        ] {
            host.place(element, bounds);
            let mut events = Vec::new();
            controller.update(&mut host, false, &mut events);
            assert_eq!(
                count_kind(&events, |e| matches!(e, Event::ScrollExit { .. })),
                0
            );
        }
    }

    #[test]
    fn test_full_in_out_and_covering_markers() {
        let (mut host, element, scope) = host_with_element(Rect::new(0.0, 100.0, 100.0, 700.0));
        let (mut controller, _) = attach(&mut host, element, scope, SettingsPatch::default());
        assert_eq!(host.data(element, START_MARKER), Some("0"));
        assert_eq!(host.data(element, END_MARKER), Some("1"));

        // Covers both edges now
        host.place(element, Rect::new(0.0, -10.0, 100.0, 700.0));
        let mut events = Vec::new();
        controller.update(&mut host, false, &mut events);
        assert_eq!(
            count_kind(&events, |e| matches!(e, Event::FullIn { from: Edge::Start, .. })),
            1
        );
        assert_eq!(host.data(element, START_MARKER), Some("1"));

        // Leading edge drops back below the near edge
        host.place(element, Rect::new(0.0, 50.0, 100.0, 700.0));
        let mut events = Vec::new();
        controller.update(&mut host, false, &mut events);
        assert_eq!(
            count_kind(&events, |e| matches!(e, Event::FullOut { from: Edge::Start, .. })),
            1
        );
    }

    #[test]
    fn test_collision_and_one_time_fire() {
        let (mut host, element, scope) = host_with_element(Rect::new(0.0, 400.0, 100.0, 100.0));
        let declared = SettingsPatch {
            trigger: Some(Some(crate::types::Margins::from_shorthand("250px 0"))),
            ..Default::default()
        };
        let (mut controller, events) = attach(&mut host, element, scope, declared);
        // Probe spans y 250..350; element at 400..500 does not collide yet
        assert_eq!(host.probe_count(), 1);
        assert_eq!(count_kind(&events, |e| matches!(e, Event::CollisionEnter { .. })), 0);

        host.place(element, Rect::new(0.0, 300.0, 100.0, 100.0));
        let mut events = Vec::new();
        controller.update(&mut host, false, &mut events);
        assert_eq!(count_kind(&events, |e| matches!(e, Event::CollisionEnter { .. })), 1);
        assert_eq!(count_kind(&events, |e| matches!(e, Event::Fire { .. })), 1);
        assert_eq!(host.data(element, COLLISION_MARKER), Some("1"));
        assert_eq!(host.data(element, FIRE_MARKER), Some("1"));

        host.place(element, Rect::new(0.0, 400.0, 100.0, 100.0));
        let mut events = Vec::new();
        controller.update(&mut host, false, &mut events);
        assert_eq!(count_kind(&events, |e| matches!(e, Event::CollisionExit { .. })), 1);
        assert_eq!(host.data(element, COLLISION_MARKER), Some("0"));

        // Second collision: enter again, but fire stays one-time
        host.place(element, Rect::new(0.0, 300.0, 100.0, 100.0));
        let mut events = Vec::new();
        controller.update(&mut host, false, &mut events);
        assert_eq!(count_kind(&events, |e| matches!(e, Event::CollisionEnter { .. })), 1);
        assert_eq!(count_kind(&events, |e| matches!(e, Event::Fire { .. })), 0);
    }

    #[test]
    fn test_steps_transition_and_marker() {
        let (mut host, element, scope) = host_with_element(Rect::new(0.0, 0.0, 100.0, 1200.0));
        let declared = SettingsPatch {
            visibility_step: Some(Some(vec![0.5])),
            ..Default::default()
        };
        // visibility = 1/3 at construction: initial classification into step 0
        let (mut controller, events) = attach(&mut host, element, scope, declared);
        assert_eq!(
            count_kind(&events, |e| matches!(
                e,
                Event::StepChange { step: 0, prev_step: None, max_step: 1, is_initial: true, .. }
            )),
            1
        );
        assert_eq!(host.data(element, "data-visibility-step"), Some("0"));

        // visibility = ramp(600, 1800, 0) = 2/3: crosses the 0.5 threshold
        host.place(element, Rect::new(0.0, -600.0, 100.0, 1200.0));
        let mut events = Vec::new();
        controller.update(&mut host, false, &mut events);
        assert_eq!(
            count_kind(&events, |e| matches!(
                e,
                Event::StepChange { step: 1, prev_step: Some(0), is_initial: false, .. }
            )),
            1
        );
        assert_eq!(host.data(element, "data-visibility-step"), Some("1"));

        // Unchanged classification emits nothing
        let mut events = Vec::new();
        controller.update(&mut host, false, &mut events);
        assert_eq!(count_kind(&events, |e| matches!(e, Event::StepChange { .. })), 0);
    }

    #[test]
    fn test_peak_written_to_default_sink() {
        // visibility = 1/2 when half-way through
        let (mut host, element, scope) = host_with_element(Rect::new(0.0, -300.0, 100.0, 1200.0));
        let declared = SettingsPatch {
            peak: Some(Some(Peak {
                start: 0.0,
                peak: 0.5,
                end: 1.0,
            })),
            ..Default::default()
        };
        let (_controller, _) = attach(&mut host, element, scope, declared);

        let peak: f64 = host.style(element, "--peak").unwrap().parse().unwrap();
        assert!((peak - 1.0).abs() < 1e-9);
        assert_eq!(host.data(element, "data-peak"), None);
    }

    #[test]
    fn test_prefix_and_receivers() {
        let mut host = MemoryHost::new(VIEW);
        let element = host.add_element(&[".tracked"]);
        host.place(element, Rect::new(0.0, 0.0, 100.0, 1200.0));
        let receiver = host.add_element(&[".mirror"]);
        let scope = host.create_probe_scope();

        let declared = SettingsPatch {
            visibility: Some(SinkSet::STYLE),
            receiver: Some(Some(".mirror".to_string())),
            prefix: Some("sc".to_string()),
            ..Default::default()
        };
        let (mut controller, _) = attach(&mut host, element, scope, declared);

        assert!(host.style(element, "--sc-visibility").is_some());
        assert!(host.style(receiver, "--sc-visibility").is_some());

        // Destroy cleans receivers too
        controller.destroy(&mut host);
        assert_eq!(host.written_count(element), 0);
        assert_eq!(host.written_count(receiver), 0);
    }

    #[test]
    fn test_breakpoint_applied_and_reverted_on_resize() {
        let (mut host, element, scope) = host_with_element(Rect::new(0.0, 0.0, 100.0, 1200.0));
        let mut breakpoints = std::collections::BTreeMap::new();
        breakpoints.insert(
            768,
            SettingsPatch {
                fill: Some(SinkSet::DATA),
                ..Default::default()
            },
        );
        let declared = SettingsPatch {
            fill: Some(SinkSet::STYLE),
            breakpoint: Some(breakpoints),
            ..Default::default()
        };

        // Width 800 >= 768: override active
        let (mut controller, _) = attach(&mut host, element, scope, declared);
        assert_eq!(controller.settings().fill, SinkSet::DATA);
        assert!(host.data(element, "data-fill").is_some());

        // Shrink below the threshold: fully reverted to the declared value
        host.set_viewport(Size::new(600.0, 600.0));
        let mut events = Vec::new();
        controller.update(&mut host, true, &mut events);
        assert_eq!(controller.settings().fill, SinkSet::STYLE);
        assert!(host.style(element, "--fill").is_some());

        // Grow again: override returns
        host.set_viewport(Size::new(1024.0, 600.0));
        let mut events = Vec::new();
        controller.update(&mut host, true, &mut events);
        assert_eq!(controller.settings().fill, SinkSet::DATA);
    }

    #[test]
    fn test_unmounted_controller_skips_updates() {
        let (mut host, element, scope) = host_with_element(Rect::new(0.0, 700.0, 100.0, 200.0));
        let (mut controller, _) = attach(&mut host, element, scope, SettingsPatch::default());
        controller.set_mounted(false);

        // First not-mounted update still runs and arms the suppression
        host.place(element, Rect::new(0.0, 400.0, 100.0, 200.0));
        let mut events = Vec::new();
        controller.update(&mut host, false, &mut events);
        assert_eq!(count_kind(&events, |e| matches!(e, Event::ScrollEnter { .. })), 1);

        // Suppressed from here on
        host.place(element, Rect::new(0.0, -500.0, 100.0, 200.0));
        let mut events = Vec::new();
        controller.update(&mut host, false, &mut events);
        assert!(events.is_empty());

        // clear_unmount lifts it for one forced pass
        controller.clear_unmount();
        let mut events = Vec::new();
        controller.update(&mut host, false, &mut events);
        assert_eq!(count_kind(&events, |e| matches!(e, Event::ScrollExit { .. })), 1);
    }

    #[test]
    fn test_delay_children_shift_cover() {
        let (mut host, element, scope) = host_with_element(Rect::new(0.0, -150.0, 100.0, 300.0));
        host.set_delay_children(
            element,
            vec![crate::host::DelayChild {
                size: Size::new(100.0, 100.0),
                left: 0.0,
                top: 200.0,
                is_end: false,
            }],
        );
        let declared = SettingsPatch {
            cover: Some(SinkSet::STYLE),
            delay: Some(Some(".reveal".to_string())),
            ..Default::default()
        };
        let (_controller, _) = attach(&mut host, element, scope, declared);

        // Delay child viewed = 100 + 200 - 150 = 150 > size: fully revealed,
        // so cover behaves as without delay: (-150)/-(300-600)... container 600
        // exceeds the element, cover stays 0
        assert_eq!(host.style(element, "--cover"), Some("0"));

        // Taller element, partially revealed delay child contributes
        host.place(element, Rect::new(0.0, -350.0, 100.0, 800.0));
        host.set_delay_children(
            element,
            vec![crate::host::DelayChild {
                size: Size::new(100.0, 100.0),
                left: 0.0,
                top: 300.0,
                is_end: false,
            }],
        );
        let mut events = Vec::new();
        let declared = SettingsPatch {
            cover: Some(SinkSet::STYLE),
            delay: Some(Some(".reveal".to_string())),
            ..Default::default()
        };
        let mut controller = ElementController::new(
            &mut host,
            element,
            &SettingsPatch::default(),
            declared,
            scope,
            &mut events,
        );
        controller.set_mounted(true);
        // viewed = 100 + 300 - 350 = 50: delay = 100 - 50 = 50
        // cover = (-350 + 50) / -(800 - 50 - 600) = 300/150 -> clamped to 1
        assert_eq!(host.style(element, "--cover"), Some("1"));
    }

    #[test]
    fn test_destroy_removes_everything_and_is_idempotent() {
        let (mut host, element, scope) = host_with_element(Rect::new(0.0, 100.0, 100.0, 700.0));
        let declared = SettingsPatch {
            visibility: Some(SinkSet::STYLE | SinkSet::DATA),
            fill: Some(SinkSet::STYLE),
            visibility_step: Some(Some(vec![0.5])),
            trigger: Some(Some(crate::types::Margins::from_shorthand("0"))),
            ..Default::default()
        };
        let (mut controller, _) = attach(&mut host, element, scope, declared);
        assert!(host.written_count(element) > 0);
        assert_eq!(host.probe_count(), 1);

        controller.destroy(&mut host);
        assert_eq!(host.written_count(element), 0);
        assert_eq!(host.probe_count(), 0);

        // Second destroy is a no-op
        controller.destroy(&mut host);
        assert_eq!(host.written_count(element), 0);

        // Updates after destroy are ignored
        let mut events = Vec::new();
        controller.update(&mut host, false, &mut events);
        assert!(events.is_empty());
        assert_eq!(host.written_count(element), 0);
    }
}
