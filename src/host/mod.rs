//! Host boundary - Geometry provider and output sinks.
//!
//! The engine is headless: everything environment-specific sits behind the
//! [`Host`] trait. A host supplies element and viewport geometry, selector
//! and attribute lookups, delay sub-element geometry and trigger probes, and
//! accepts the engine's sink writes (style properties, data attributes,
//! root-level markers).
//!
//! Geometry is read in host units along whichever axis an element tracks;
//! the engine never interprets units. Bounding boxes are reported relative
//! to the container's leading edge, negative once scrolled past it.
//!
//! [`MemoryHost`] is an in-memory implementation used by the crate's own
//! tests and usable as a headless fixture.

use crate::types::{ElementId, Margins, ProbeId, Rect, ScopeId, Size};

pub mod memory;

pub use memory::MemoryHost;

// =============================================================================
// Records
// =============================================================================

/// One designated delay sub-element, as reported by the host
/// (already filtered to the non-disabled ones).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DelayChild {
    /// Bounding size.
    pub size: Size,
    /// Offset position within the parent element.
    pub left: f64,
    pub top: f64,
    /// Trailing-edge delay variant.
    pub is_end: bool,
}

/// One intersection-watcher notification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntersectionEntry {
    pub element: ElementId,
    /// Visible fraction of the element, 0 when fully outside.
    pub ratio: f64,
}

// =============================================================================
// Host trait
// =============================================================================

/// The environment collaborator: geometry in, sink writes out.
///
/// Reads take `&self`, writes `&mut self`. A host is free to cache; the
/// engine re-reads geometry on every update cycle and never stores host
/// state beyond container sizes.
pub trait Host {
    // -- discovery and configuration ------------------------------------------

    /// Elements matching a selector, in document order.
    fn query(&self, selector: &str) -> Vec<ElementId>;

    /// Read an attribute from an element (`None` when absent).
    fn attribute(&self, element: ElementId, name: &str) -> Option<String>;

    // -- geometry -------------------------------------------------------------

    /// Bounding box relative to the container's leading edge.
    fn bounds(&self, element: ElementId) -> Rect;

    /// Intrinsic (layout) size of an element.
    fn intrinsic_size(&self, element: ElementId) -> Size;

    /// Viewport size.
    fn viewport_size(&self) -> Size;

    /// Current scroll offset of the root container (`None` = viewport).
    fn scroll_offset(&self, container: Option<ElementId>) -> f64;

    /// Total scrollable extent of the document.
    fn scroll_extent(&self) -> f64;

    /// Delay sub-elements of an element matching a selector.
    fn delay_children(&self, element: ElementId, selector: &str) -> Vec<DelayChild>;

    // -- trigger probes -------------------------------------------------------

    /// Create the isolated scope that hosts all trigger probes.
    fn create_probe_scope(&mut self) -> ScopeId;

    /// Tear the probe scope down (probes inside go with it).
    fn remove_probe_scope(&mut self, scope: ScopeId);

    /// Create a fixed-position probe with the given margins.
    fn create_probe(&mut self, scope: ScopeId, margins: &Margins) -> ProbeId;

    /// Remove a single probe.
    fn remove_probe(&mut self, scope: ScopeId, probe: ProbeId);

    /// Current bounding box of a probe.
    fn probe_bounds(&self, probe: ProbeId) -> Rect;

    // -- output sinks ---------------------------------------------------------

    /// Write a style custom property on an element.
    fn set_style(&mut self, element: ElementId, property: &str, value: &str);

    /// Remove a style custom property.
    fn remove_style(&mut self, element: ElementId, property: &str);

    /// Write a data attribute on an element.
    fn set_data(&mut self, element: ElementId, name: &str, value: &str);

    /// Remove a data attribute.
    fn remove_data(&mut self, element: ElementId, name: &str);

    /// Write a root-level (document) data attribute.
    fn set_root_data(&mut self, name: &str, value: &str);

    /// Remove a root-level data attribute.
    fn remove_root_data(&mut self, name: &str);
}
