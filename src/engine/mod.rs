//! Scroll Engine - Per-instance orchestrator.
//!
//! One engine owns a host, a roster of element controllers and an event bus.
//! Input notifications (scroll, resize, wheel, keydown, intersection) arrive
//! from the host; scroll/resize/wheel are coalesced into pending flags and
//! drained by [`ScrollEngine::tick`], at most one recomputation per event
//! source per tick. Alongside the per-element cycles the engine maintains the
//! global state: scroll direction, total page progress, wheel momentum and
//! the boundary target.
//!
//! All state is instance state. Two engines over two hosts never observe
//! each other, and a tick arriving after [`ScrollEngine::destroy`] is a
//! no-op.

use std::collections::BTreeSet;
use std::time::Instant;

use spark_signals::{Signal, signal};

use crate::controller::{CONFIG_ATTR, CONFIG_KEY_ATTR, ElementController, TITLE_ATTR};
use crate::events::{Event, EventBus, EventKind, HandlerId};
use crate::host::{Host, IntersectionEntry};
use crate::progress::{clamp01, ratio};
use crate::settings::{self, ConfigRegistry, SettingsPatch};
use crate::types::{ElementId, ScopeId, ScrollDirection};

pub mod momentum;

pub use momentum::{MomentumTracker, MomentumTuning};

// =============================================================================
// Constants
// =============================================================================

/// Root-level scroll direction marker.
pub const SCROLL_MARKER: &str = "data-spark-scroll";
/// Root-level total progress marker.
pub const PROGRESS_MARKER: &str = "data-spark-progress";
/// Root-level boundary target marker.
pub const TARGET_MARKER: &str = "data-spark-target";

/// An offset jump larger than this landing exactly at 0 is treated as an
/// instant reset rather than scrolling.
pub const JUMP_RESET_DISTANCE: f64 = 300.0;

/// Intersection watcher thresholds: near 0 and near 1 on both ends, so
/// partial entry and exit both notify.
pub const INTERSECTION_THRESHOLDS: [f64; 4] = [0.0, 0.00001, 0.99999, 1.0];

/// Boundary line fraction used when boundary tracking is enabled without an
/// explicit fraction.
pub const DEFAULT_BOUNDARY_FRACTION: f64 = 0.5;

// =============================================================================
// Options
// =============================================================================

/// Engine construction options.
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Selector matching the observed elements.
    pub target: String,
    /// Custom root scroll container selector (`None` = viewport).
    pub root: Option<String>,
    /// Maintain the root-level total progress marker.
    pub total_progress: bool,
    /// Boundary target tracking: the viewport-height fraction of the
    /// boundary line (see [`DEFAULT_BOUNDARY_FRACTION`]).
    pub boundary: Option<f64>,
    /// Momentum heuristic tuning.
    pub momentum: MomentumTuning,
    /// Element defaults merged beneath every element's declared config.
    pub element: SettingsPatch,
    /// Named configuration registry.
    pub configs: ConfigRegistry,
}

impl Options {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            total_progress: true,
            ..Default::default()
        }
    }
}

// =============================================================================
// Keyboard input
// =============================================================================

/// One key press as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyInput {
    /// Key name ("Tab", "Home", "ArrowDown", "a", ...).
    pub key: String,
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
}

impl KeyInput {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }

    pub fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn with_meta(mut self) -> Self {
        self.meta = true;
        self
    }
}

/// Keys that jump the scroll position rather than scrolling continuously.
fn is_jump_key(input: &KeyInput) -> bool {
    matches!(
        input.key.as_str(),
        "Tab" | "Home" | "End" | "PageUp" | "PageDown"
    ) || ((input.meta || input.ctrl)
        && matches!(input.key.as_str(), "ArrowUp" | "ArrowDown"))
}

// =============================================================================
// Pending input
// =============================================================================

/// Frame-coalesced input flags. Multiple notifications within one tick
/// collapse; for wheel the first delta of the tick wins.
#[derive(Debug, Default)]
struct PendingInput {
    scroll: bool,
    resize: bool,
    wheel: Option<f64>,
}

// =============================================================================
// Engine
// =============================================================================

/// Per-instance scroll orchestrator.
pub struct ScrollEngine<H: Host> {
    host: H,
    options: Options,
    controllers: Vec<ElementController>,
    root: Option<ElementId>,
    scope: Option<ScopeId>,
    bus: EventBus,

    direction: Signal<ScrollDirection>,
    total_progress: Signal<f64>,
    momentum_active: Signal<bool>,
    momentum: MomentumTracker,

    prev_scroll: Option<f64>,
    boundary_target: Option<String>,
    pending: PendingInput,
    settle_anchor: Option<f64>,
    settle_armed: bool,
    root_keys: BTreeSet<String>,
    destroyed: bool,
}

impl<H: Host> ScrollEngine<H> {
    /// Construct an engine over a host with explicit options and run the
    /// initial full update.
    pub fn new(host: H, options: Options) -> Self {
        let momentum = MomentumTracker::new(options.momentum);
        let mut engine = Self {
            host,
            options,
            controllers: Vec::new(),
            root: None,
            scope: None,
            bus: EventBus::new(),
            direction: signal(ScrollDirection::Idle),
            total_progress: signal(0.0),
            momentum_active: signal(false),
            momentum,
            prev_scroll: None,
            boundary_target: None,
            pending: PendingInput::default(),
            settle_anchor: None,
            settle_armed: false,
            root_keys: BTreeSet::new(),
            destroyed: false,
        };
        engine.init();
        engine
    }

    /// Construct with defaults for a target selector.
    pub fn with_target(host: H, target: impl Into<String>) -> Self {
        Self::new(host, Options::new(target))
    }

    fn init(&mut self) {
        self.root = self
            .options
            .root
            .as_deref()
            .and_then(|selector| self.host.query(selector).into_iter().next());

        let targets = self.host.query(&self.options.target);
        let scope = self.host.create_probe_scope();
        self.scope = Some(scope);

        let mut events = Vec::new();
        for element in targets {
            let declared = self.declared_patch(element);
            let controller = ElementController::new(
                &mut self.host,
                element,
                &self.options.element,
                declared,
                scope,
                &mut events,
            );
            self.controllers.push(controller);
        }
        for event in events.drain(..) {
            self.bus.emit(&event);
        }

        tracing::debug!(elements = self.controllers.len(), "engine attached");
        self.update();
    }

    /// Resolve an element's declared configuration: named registry entry
    /// first, then the lenient inline parse. A parse failure degrades to an
    /// empty configuration with a logged diagnostic.
    fn declared_patch(&self, element: ElementId) -> SettingsPatch {
        if let Some(key) = self.host.attribute(element, CONFIG_KEY_ATTR)
            && let Some(patch) = self.options.configs.resolve(&key, element)
        {
            return patch;
        }
        if let Some(inline) = self.host.attribute(element, CONFIG_ATTR) {
            match settings::parse_inline(&inline) {
                Ok(patch) => return patch,
                Err(error) => {
                    tracing::warn!(%error, element = element.0, "failed to parse inline options");
                }
            }
        }
        SettingsPatch::default()
    }

    // -- public state ---------------------------------------------------------

    /// Current roster, in discovery order.
    pub fn elements(&self) -> Vec<ElementId> {
        self.controllers.iter().map(|c| c.element()).collect()
    }

    /// Current scroll direction.
    pub fn scroll(&self) -> ScrollDirection {
        self.direction.get()
    }

    /// Reactive scroll direction signal.
    pub fn direction_signal(&self) -> Signal<ScrollDirection> {
        self.direction.clone()
    }

    /// Total page progress in [0, 1].
    pub fn total_progress(&self) -> f64 {
        self.total_progress.get()
    }

    /// Reactive total progress signal.
    pub fn total_progress_signal(&self) -> Signal<f64> {
        self.total_progress.clone()
    }

    /// Whether the current wheel gesture was flagged as momentum scrolling.
    pub fn is_momentum(&self) -> bool {
        self.momentum_active.get()
    }

    /// Reactive momentum flag signal.
    pub fn momentum_signal(&self) -> Signal<bool> {
        self.momentum_active.clone()
    }

    /// Current boundary target title, if one has been resolved.
    pub fn boundary_target(&self) -> Option<&str> {
        self.boundary_target.as_deref()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// The host this engine drives.
    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    // -- event subscription ---------------------------------------------------

    /// Subscribe to an event kind.
    pub fn on(&self, kind: EventKind, handler: impl Fn(&Event) + 'static) -> HandlerId {
        self.bus.on(kind, handler)
    }

    /// Unsubscribe a previously registered handler.
    pub fn off(&self, kind: EventKind, id: HandlerId) -> bool {
        self.bus.off(kind, id)
    }

    // -- input notifications --------------------------------------------------

    /// Host scroll notification; coalesced until the next tick.
    pub fn notify_scroll(&mut self) {
        if !self.destroyed {
            self.pending.scroll = true;
        }
    }

    /// Host resize notification; coalesced until the next tick.
    pub fn notify_resize(&mut self) {
        if !self.destroyed {
            self.pending.resize = true;
        }
    }

    /// Host wheel notification; the first delta per tick wins.
    pub fn notify_wheel(&mut self, delta: f64) {
        if !self.destroyed && self.pending.wheel.is_none() {
            self.pending.wheel = Some(delta);
        }
    }

    /// Host keydown notification. Jump-scroll keys arm the settle poll:
    /// the engine watches the offset across ticks and issues one full
    /// update once it stops moving.
    pub fn notify_keydown(&mut self, input: &KeyInput) {
        if self.destroyed || !is_jump_key(input) {
            return;
        }
        self.settle_anchor = Some(self.host.scroll_offset(self.root));
        self.settle_armed = true;
    }

    /// Intersection watcher notifications toggle mount/unmount flags.
    /// A `once`-done controller never remounts.
    pub fn notify_intersection(&mut self, entries: &[IntersectionEntry]) {
        if self.destroyed {
            return;
        }
        for entry in entries {
            if let Some(controller) = self
                .controllers
                .iter_mut()
                .find(|c| c.element() == entry.element)
            {
                controller.set_mounted(entry.ratio != 0.0 && !controller.is_done());
            }
        }
    }

    // -- tick -----------------------------------------------------------------

    /// Drain pending input using the current time.
    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    /// Drain pending input: at most one recomputation per event source.
    pub fn tick_at(&mut self, now: Instant) {
        if self.destroyed {
            return;
        }
        if std::mem::take(&mut self.pending.resize) {
            self.on_resize();
        }
        if std::mem::take(&mut self.pending.scroll) {
            self.on_scroll();
        }
        if let Some(delta) = self.pending.wheel.take() {
            self.on_wheel(delta, now);
        } else if self.momentum.expire(now) {
            self.momentum_active.set(false);
        }
        self.settle_poll();
    }

    // -- handlers -------------------------------------------------------------

    fn on_resize(&mut self) {
        self.update_controllers(true);
    }

    fn on_scroll(&mut self) {
        let current = self.host.scroll_offset(self.root);

        // An abrupt jump landing exactly at 0 is a reset: one full update,
        // no direction inference for this frame
        if let Some(prev) = self.prev_scroll
            && (prev - current).abs() > JUMP_RESET_DISTANCE
            && current == 0.0
        {
            self.prev_scroll = Some(0.0);
            self.update();
            return;
        }

        if let Some(prev) = self.prev_scroll {
            let direction = if current > prev {
                ScrollDirection::Forward
            } else if current < prev {
                ScrollDirection::Backward
            } else {
                ScrollDirection::Idle
            };
            if direction != self.direction.get() {
                self.direction.set(direction);
                self.write_root(SCROLL_MARKER, direction.marker());
                if direction != ScrollDirection::Idle {
                    self.bus.emit(&Event::ScrollTurn { direction });
                }
            }
        }
        self.prev_scroll = Some(current);

        if self.options.total_progress {
            let viewport = self.host.viewport_size().height;
            let extent = self.host.scroll_extent();
            let progress = clamp01(ratio(current, extent - viewport));
            self.total_progress.set(progress);
            self.write_root(PROGRESS_MARKER, &format!("{progress}"));
        }

        self.update_controllers(false);

        if let Some(fraction) = self.options.boundary {
            self.update_boundary_target(fraction);
        }
    }

    fn on_wheel(&mut self, delta: f64, now: Instant) {
        match self.momentum.record(delta, now) {
            Some(direction) => {
                self.momentum_active.set(true);
                self.bus.emit(&Event::Momentum { direction });
            }
            None => {
                if !self.momentum.is_momentum() {
                    self.momentum_active.set(false);
                }
            }
        }
    }

    /// Poll the offset after a jump-scroll key until it stabilizes, then
    /// issue exactly one full update.
    fn settle_poll(&mut self) {
        let Some(anchor) = self.settle_anchor else {
            return;
        };
        let current = self.host.scroll_offset(self.root);
        if self.settle_armed || anchor != current {
            self.settle_armed = false;
            self.settle_anchor = Some(current);
        } else {
            self.settle_anchor = None;
            self.update();
        }
    }

    // -- update cycle ---------------------------------------------------------

    fn update_controllers(&mut self, is_resize: bool) {
        let mut events = Vec::new();
        for i in 0..self.controllers.len() {
            self.controllers[i].update(&mut self.host, is_resize, &mut events);
            for event in events.drain(..) {
                self.bus.emit(&event);
            }
        }
    }

    /// Force a full recomputation of every controller, bypassing unmount
    /// suppression for this pass.
    pub fn update(&mut self) {
        if self.destroyed {
            return;
        }
        for controller in &mut self.controllers {
            controller.clear_unmount();
        }
        self.update_controllers(false);
    }

    fn update_boundary_target(&mut self, fraction: f64) {
        let line = self.host.viewport_size().height * fraction;
        let mut best: Option<(f64, String)> = None;
        for controller in &self.controllers {
            if !controller.is_in() {
                continue;
            }
            let Some(title) = self.host.attribute(controller.element(), TITLE_ATTR) else {
                continue;
            };
            let bounds = self.host.bounds(controller.element());
            let distance = (bounds.y + bounds.height / 2.0 - line).abs();
            let closer = best.as_ref().is_none_or(|(d, _)| distance < *d);
            if closer {
                best = Some((distance, title));
            }
        }
        match best {
            Some((_, title)) => {
                self.boundary_target = Some(title.clone());
                self.write_root(TARGET_MARKER, &title);
            }
            None => {
                // Keep a "previous target" marker once everything scrolled out
                if let Some(previous) = self.boundary_target.clone() {
                    self.write_root(TARGET_MARKER, &format!("# {previous}"));
                }
            }
        }
    }

    fn write_root(&mut self, name: &str, value: &str) {
        self.host.set_root_data(name, value);
        self.root_keys.insert(name.to_string());
    }

    // -- teardown -------------------------------------------------------------

    /// Tear the engine down: destroy every controller (removing everything
    /// they wrote), remove the probe scope and the root markers, and mark
    /// the engine inert. All further calls are no-ops; repeated destroy is
    /// safe.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        for i in 0..self.controllers.len() {
            self.controllers[i].destroy(&mut self.host);
        }
        self.controllers.clear();
        if let Some(scope) = self.scope.take() {
            self.host.remove_probe_scope(scope);
        }
        for name in std::mem::take(&mut self.root_keys) {
            self.host.remove_root_data(&name);
        }
        self.destroyed = true;
        tracing::debug!("engine destroyed");
    }
}

// =============================================================================
// Tests
// =============================================================================
