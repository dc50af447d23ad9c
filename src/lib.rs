//! # spark-scroll
//!
//! Reactive Scroll Progress Engine for Rust.
//!
//! Built on [spark-signals](https://github.com/RLabs-Inc/spark-signals) for
//! fine-grained reactivity of the engine-level state.
//!
//! ## Architecture
//!
//! spark-scroll is headless: the environment (DOM bridge, TUI, test fixture)
//! sits behind the [`Host`] trait and supplies geometry, selector queries and
//! output sinks. The engine computes continuous progress metrics per observed
//! element and emits typed lifecycle events.
//!
//! ```text
//! Host input notifications → pending flags → ScrollEngine::tick
//!   → ElementController::update → progress math → step tracker
//!   → sink writes + events → engine state (direction, progress, momentum)
//! ```
//!
//! Input notifications are frame-coalesced: any number of scroll/resize/wheel
//! notifications collapse into at most one recomputation per event source per
//! tick.
//!
//! ## Modules
//!
//! - [`types`] - Core types (ids, geometry, axis, metrics, directions)
//! - [`progress`] - Pure metric formulas over geometry snapshots
//! - [`step`] - Threshold intervals and transition detection
//! - [`settings`] - Layered configuration and the lenient option decoder
//! - [`host`] - The environment boundary and the in-memory fixture
//! - [`events`] - Typed event bus
//! - [`controller`] - Per-element progress state machine
//! - [`engine`] - The per-instance orchestrator
//!
//! ## Example
//!
//! ```ignore
//! use spark_scroll::{MemoryHost, Options, ScrollEngine, Size};
//!
//! let host = MemoryHost::new(Size::new(800.0, 600.0));
//! let mut engine = ScrollEngine::new(host, Options::new(".tracked"));
//!
//! // Host event loop: forward inputs, tick once per frame
//! engine.notify_scroll();
//! engine.tick();
//! ```

pub mod controller;
pub mod engine;
pub mod events;
pub mod host;
pub mod progress;
pub mod settings;
pub mod step;
pub mod types;

// Re-export commonly used items
pub use types::*;

pub use controller::{
    COLLISION_MARKER, CONFIG_ATTR, CONFIG_KEY_ATTR, ElementController, END_MARKER, FIRE_MARKER,
    IN_MARKER, START_MARKER, TITLE_ATTR,
};

pub use engine::{
    DEFAULT_BOUNDARY_FRACTION, INTERSECTION_THRESHOLDS, JUMP_RESET_DISTANCE, KeyInput,
    MomentumTracker, MomentumTuning, Options, PROGRESS_MARKER, SCROLL_MARKER, ScrollEngine,
    TARGET_MARKER,
};

pub use events::{Event, EventBus, EventKind, HandlerId};

pub use host::{DelayChild, Host, IntersectionEntry, MemoryHost};

pub use progress::{DelaySegment, Geometry, clamp, clamp01, ramp, ratio};

pub use settings::{
    ConfigRegistry, ConfigSource, ParseError, Peak, Settings, SettingsPatch, SinkSet, parse_inline,
    resolve,
};

pub use step::{StepTracker, StepTransition, normalize_thresholds};
