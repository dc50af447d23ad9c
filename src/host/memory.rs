//! In-memory host.
//!
//! A [`Host`] backed by plain maps: tests place elements, move the scroll
//! offset and read back what the engine wrote. Probe geometry is derived
//! from the margins at creation time, treating numeric/`px` values as host
//! units and anything else as 0.

use std::collections::{BTreeMap, HashMap};

use super::{DelayChild, Host};
use crate::types::{ElementId, Margins, ProbeId, Rect, ScopeId, Size};

// =============================================================================
// Element record
// =============================================================================

#[derive(Debug, Clone, Default)]
struct MemElement {
    selectors: Vec<String>,
    bounds: Rect,
    size: Size,
    attributes: BTreeMap<String, String>,
    styles: BTreeMap<String, String>,
    data: BTreeMap<String, String>,
    delay_children: Vec<DelayChild>,
    scroll_offset: f64,
}

// =============================================================================
// MemoryHost
// =============================================================================

/// Headless host fixture. Elements keep insertion order.
#[derive(Debug, Default)]
pub struct MemoryHost {
    elements: Vec<(ElementId, MemElement)>,
    root_data: BTreeMap<String, String>,
    viewport: Size,
    scroll: f64,
    scroll_extent: f64,
    probes: HashMap<ProbeId, (ScopeId, Rect)>,
    scopes: Vec<ScopeId>,
    next_id: u64,
}

impl MemoryHost {
    pub fn new(viewport: Size) -> Self {
        Self {
            viewport,
            ..Default::default()
        }
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn element(&self, id: ElementId) -> Option<&MemElement> {
        self.elements.iter().find(|(el, _)| *el == id).map(|(_, e)| e)
    }

    fn element_mut(&mut self, id: ElementId) -> Option<&mut MemElement> {
        self.elements
            .iter_mut()
            .find(|(el, _)| *el == id)
            .map(|(_, e)| e)
    }

    // -- building -------------------------------------------------------------

    /// Add an element matching the given selectors.
    pub fn add_element(&mut self, selectors: &[&str]) -> ElementId {
        let id = ElementId(self.next_id());
        let element = MemElement {
            selectors: selectors.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        };
        self.elements.push((id, element));
        id
    }

    /// Place an element: bounding box and intrinsic size in one call.
    pub fn place(&mut self, id: ElementId, bounds: Rect) {
        if let Some(element) = self.element_mut(id) {
            element.bounds = bounds;
            element.size = bounds.size();
        }
    }

    pub fn set_attribute(&mut self, id: ElementId, name: &str, value: &str) {
        if let Some(element) = self.element_mut(id) {
            element.attributes.insert(name.to_string(), value.to_string());
        }
    }

    pub fn set_delay_children(&mut self, id: ElementId, children: Vec<DelayChild>) {
        if let Some(element) = self.element_mut(id) {
            element.delay_children = children;
        }
    }

    pub fn set_viewport(&mut self, viewport: Size) {
        self.viewport = viewport;
    }

    pub fn set_scroll(&mut self, offset: f64) {
        self.scroll = offset;
    }

    pub fn set_container_scroll(&mut self, id: ElementId, offset: f64) {
        if let Some(element) = self.element_mut(id) {
            element.scroll_offset = offset;
        }
    }

    pub fn set_scroll_extent(&mut self, extent: f64) {
        self.scroll_extent = extent;
    }

    // -- inspection -----------------------------------------------------------

    pub fn style(&self, id: ElementId, property: &str) -> Option<&str> {
        self.element(id)?.styles.get(property).map(String::as_str)
    }

    pub fn data(&self, id: ElementId, name: &str) -> Option<&str> {
        self.element(id)?.data.get(name).map(String::as_str)
    }

    pub fn root_data(&self, name: &str) -> Option<&str> {
        self.root_data.get(name).map(String::as_str)
    }

    /// Count of style properties + data attributes written on an element.
    pub fn written_count(&self, id: ElementId) -> usize {
        self.element(id)
            .map(|e| e.styles.len() + e.data.len())
            .unwrap_or(0)
    }

    pub fn root_data_count(&self) -> usize {
        self.root_data.len()
    }

    pub fn probe_count(&self) -> usize {
        self.probes.len()
    }

    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }

    // -- probe geometry -------------------------------------------------------

    fn margin_units(value: &str) -> f64 {
        value.trim().trim_end_matches("px").parse().unwrap_or(0.0)
    }

    fn probe_rect(&self, margins: &Margins) -> Rect {
        let top = Self::margin_units(&margins.top);
        let right = Self::margin_units(&margins.right);
        let bottom = Self::margin_units(&margins.bottom);
        let left = Self::margin_units(&margins.left);
        Rect::new(
            left,
            top,
            (self.viewport.width - left - right).max(0.0),
            (self.viewport.height - top - bottom).max(0.0),
        )
    }
}

impl Host for MemoryHost {
    fn query(&self, selector: &str) -> Vec<ElementId> {
        self.elements
            .iter()
            .filter(|(_, e)| e.selectors.iter().any(|s| s == selector))
            .map(|(id, _)| *id)
            .collect()
    }

    fn attribute(&self, element: ElementId, name: &str) -> Option<String> {
        self.element(element)?.attributes.get(name).cloned()
    }

    fn bounds(&self, element: ElementId) -> Rect {
        self.element(element).map(|e| e.bounds).unwrap_or_default()
    }

    fn intrinsic_size(&self, element: ElementId) -> Size {
        self.element(element).map(|e| e.size).unwrap_or_default()
    }

    fn viewport_size(&self) -> Size {
        self.viewport
    }

    fn scroll_offset(&self, container: Option<ElementId>) -> f64 {
        match container {
            None => self.scroll,
            Some(id) => self.element(id).map(|e| e.scroll_offset).unwrap_or(0.0),
        }
    }

    fn scroll_extent(&self) -> f64 {
        self.scroll_extent
    }

    fn delay_children(&self, element: ElementId, _selector: &str) -> Vec<DelayChild> {
        self.element(element)
            .map(|e| e.delay_children.clone())
            .unwrap_or_default()
    }

    fn create_probe_scope(&mut self) -> ScopeId {
        let scope = ScopeId(self.next_id());
        self.scopes.push(scope);
        scope
    }

    fn remove_probe_scope(&mut self, scope: ScopeId) {
        self.scopes.retain(|s| *s != scope);
        self.probes.retain(|_, (owner, _)| *owner != scope);
    }

    fn create_probe(&mut self, scope: ScopeId, margins: &Margins) -> ProbeId {
        let rect = self.probe_rect(margins);
        let probe = ProbeId(self.next_id());
        self.probes.insert(probe, (scope, rect));
        probe
    }

    fn remove_probe(&mut self, _scope: ScopeId, probe: ProbeId) {
        self.probes.remove(&probe);
    }

    fn probe_bounds(&self, probe: ProbeId) -> Rect {
        self.probes
            .get(&probe)
            .map(|(_, rect)| *rect)
            .unwrap_or_default()
    }

    fn set_style(&mut self, element: ElementId, property: &str, value: &str) {
        if let Some(e) = self.element_mut(element) {
            e.styles.insert(property.to_string(), value.to_string());
        }
    }

    fn remove_style(&mut self, element: ElementId, property: &str) {
        if let Some(e) = self.element_mut(element) {
            e.styles.remove(property);
        }
    }

    fn set_data(&mut self, element: ElementId, name: &str, value: &str) {
        if let Some(e) = self.element_mut(element) {
            e.data.insert(name.to_string(), value.to_string());
        }
    }

    fn remove_data(&mut self, element: ElementId, name: &str) {
        if let Some(e) = self.element_mut(element) {
            e.data.remove(name);
        }
    }

    fn set_root_data(&mut self, name: &str, value: &str) {
        self.root_data.insert(name.to_string(), value.to_string());
    }

    fn remove_root_data(&mut self, name: &str) {
        self.root_data.remove(name);
    }
}

// =============================================================================
// Tests
// =============================================================================
