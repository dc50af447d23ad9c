//! Event Bus - Typed publish/subscribe for engine and controller events.
//!
//! Every discrete output is a variant of [`Event`] with a structured payload;
//! subscription is by [`EventKind`] tag and handler identity. Handlers are
//! plain `Fn(&Event)` callbacks; the dispatch loop snapshots the handler list
//! first so a handler may subscribe or unsubscribe without upsetting the
//! iteration.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use crate::types::{Edge, ElementId, Metric, ScrollDirection, StepDimension};

// =============================================================================
// Events
// =============================================================================

/// Discrete event emitted by the engine or one of its controllers.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Element started intersecting the container.
    ScrollEnter {
        element: ElementId,
        from: Edge,
        is_initial: bool,
    },
    /// Element stopped intersecting (suppressed after a `once` match).
    ScrollExit {
        element: ElementId,
        from: Edge,
        is_initial: bool,
    },
    /// Element began fully covering the container.
    FullIn {
        element: ElementId,
        from: Edge,
        is_initial: bool,
    },
    /// Element stopped fully covering the container.
    FullOut {
        element: ElementId,
        from: Edge,
        is_initial: bool,
    },
    /// Element span started overlapping its trigger probe.
    CollisionEnter {
        element: ElementId,
        from: Edge,
        is_initial: bool,
    },
    /// Element span stopped overlapping its trigger probe.
    CollisionExit {
        element: ElementId,
        from: Edge,
        is_initial: bool,
    },
    /// First-ever probe collision for the element.
    Fire {
        element: ElementId,
        from: Edge,
        is_initial: bool,
    },
    /// A tracked dimension crossed into another step interval.
    StepChange {
        element: ElementId,
        dimension: StepDimension,
        step: usize,
        prev_step: Option<usize>,
        max_step: usize,
        is_initial: bool,
    },
    /// Per-cycle value report for one enabled metric.
    MetricUpdate {
        element: ElementId,
        metric: Metric,
        value: f64,
    },
    /// Global scroll direction flipped.
    ScrollTurn { direction: ScrollDirection },
    /// Momentum scrolling detected for the current wheel gesture.
    Momentum { direction: ScrollDirection },
}

/// Stable tag for event subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ScrollEnter,
    ScrollExit,
    FullIn,
    FullOut,
    CollisionEnter,
    CollisionExit,
    Fire,
    StepChange,
    MetricUpdate(Metric),
    ScrollTurn,
    Momentum,
}

impl Event {
    /// The subscription tag this event dispatches under.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::ScrollEnter { .. } => EventKind::ScrollEnter,
            Self::ScrollExit { .. } => EventKind::ScrollExit,
            Self::FullIn { .. } => EventKind::FullIn,
            Self::FullOut { .. } => EventKind::FullOut,
            Self::CollisionEnter { .. } => EventKind::CollisionEnter,
            Self::CollisionExit { .. } => EventKind::CollisionExit,
            Self::Fire { .. } => EventKind::Fire,
            Self::StepChange { .. } => EventKind::StepChange,
            Self::MetricUpdate { metric, .. } => EventKind::MetricUpdate(*metric),
            Self::ScrollTurn { .. } => EventKind::ScrollTurn,
            Self::Momentum { .. } => EventKind::Momentum,
        }
    }
}

// =============================================================================
// Bus
// =============================================================================

/// Subscription token; pass back to [`EventBus::off`] to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

type Handler = Rc<dyn Fn(&Event)>;

/// Engine-owned handler registry.
///
/// Not a global: each engine instance carries its own bus, so independent
/// engines never observe each other's events.
#[derive(Default)]
pub struct EventBus {
    handlers: RefCell<HashMap<EventKind, Vec<(HandlerId, Handler)>>>,
    next_id: Cell<u64>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to one event kind. Returns the token identifying the
    /// callback for [`off`](Self::off).
    pub fn on(&self, kind: EventKind, handler: impl Fn(&Event) + 'static) -> HandlerId {
        let id = HandlerId(self.next_id.get());
        self.next_id.set(self.next_id.get() + 1);
        self.handlers
            .borrow_mut()
            .entry(kind)
            .or_default()
            .push((id, Rc::new(handler)));
        id
    }

    /// Unsubscribe. Returns whether the handler was registered.
    pub fn off(&self, kind: EventKind, id: HandlerId) -> bool {
        let mut handlers = self.handlers.borrow_mut();
        let Some(list) = handlers.get_mut(&kind) else {
            return false;
        };
        let before = list.len();
        list.retain(|(handler_id, _)| *handler_id != id);
        list.len() != before
    }

    /// Dispatch an event to its kind's subscribers.
    pub fn emit(&self, event: &Event) {
        let snapshot: Vec<Handler> = {
            let handlers = self.handlers.borrow();
            match handlers.get(&event.kind()) {
                Some(list) => list.iter().map(|(_, h)| h.clone()).collect(),
                None => return,
            }
        };
        for handler in snapshot {
            handler(event);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
