//! Core types for spark-scroll.
//!
//! These types define the foundation that everything builds on.
//! They flow from the host geometry queries through the progress math
//! and out through the sink writes and event payloads.

// =============================================================================
// Identifiers
// =============================================================================

/// Opaque handle to a host element.
///
/// The host assigns these; the engine only compares and stores them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub u64);

/// Handle to a trigger probe created by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProbeId(pub u64);

/// Handle to the shared probe scope that hosts all trigger probes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(pub u64);

// =============================================================================
// Geometry
// =============================================================================

/// Width/height pair in host units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Extent along the tracked axis.
    pub fn along(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Vertical => self.height,
            Axis::Horizontal => self.width,
        }
    }
}

/// Bounding box in container-relative coordinates.
///
/// `x`/`y` are the leading edges relative to the container's leading edge,
/// matching what host geometry queries report for a scrolled element
/// (negative once the element has scrolled past the leading edge).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Leading edge along the tracked axis.
    pub fn start(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Vertical => self.y,
            Axis::Horizontal => self.x,
        }
    }

    /// Trailing edge along the tracked axis.
    pub fn end(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Vertical => self.y + self.height,
            Axis::Horizontal => self.x + self.width,
        }
    }

    /// Midpoint along the tracked axis.
    pub fn center(&self, axis: Axis) -> f64 {
        (self.start(axis) + self.end(axis)) / 2.0
    }

    pub const fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

// =============================================================================
// Axis and edges
// =============================================================================

/// The scroll axis an element is tracked along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Axis {
    #[default]
    Vertical,
    Horizontal,
}

/// Which edge of the container an element approached from, relative to the
/// tracked axis. `Start` is the leading edge (top / left), `End` the trailing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Start,
    End,
}

// =============================================================================
// Scroll direction
// =============================================================================

/// Global scroll direction as classified by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScrollDirection {
    /// Scrolling toward larger offsets.
    Forward,
    /// Scrolling toward smaller offsets.
    Backward,
    /// Offset unchanged since the previous frame.
    #[default]
    Idle,
}

impl ScrollDirection {
    /// Marker value written to the root data attribute.
    pub const fn marker(&self) -> &'static str {
        match self {
            Self::Forward => "1",
            Self::Backward => "-1",
            Self::Idle => "0",
        }
    }
}

// =============================================================================
// Metrics
// =============================================================================

/// One of the continuous outputs a controller can compute per cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    /// Linear entry-to-exit ramp, 0..=1.
    Visibility,
    /// Signed coverage ramp, -1..=1.
    Fill,
    /// Coverage progress of an oversized element, 0..=1.
    Cover,
    /// Leading-edge crossing progress, 0..=1.
    Enter,
    /// Trailing-edge crossing progress, 0..=1.
    Exit,
    /// Triangular ramp over visibility, 0..=1.
    Peak,
    /// Raw leading offset in host units.
    OffsetEnter,
    /// Raw distance from the container's trailing edge in host units.
    OffsetExit,
}

impl Metric {
    /// Kebab-case name used for sink derivation and event payloads.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Visibility => "visibility",
            Self::Fill => "fill",
            Self::Cover => "cover",
            Self::Enter => "enter",
            Self::Exit => "exit",
            Self::Peak => "peak",
            Self::OffsetEnter => "offset-enter",
            Self::OffsetExit => "offset-exit",
        }
    }

    /// Parse a configuration name (as written in option strings).
    pub fn from_option_name(name: &str) -> Option<Self> {
        match name {
            "visibility" => Some(Self::Visibility),
            "fill" => Some(Self::Fill),
            "cover" => Some(Self::Cover),
            "enter" => Some(Self::Enter),
            "exit" => Some(Self::Exit),
            "peak" => Some(Self::Peak),
            "offsetEnter" | "offset-enter" => Some(Self::OffsetEnter),
            "offsetExit" | "offset-exit" => Some(Self::OffsetExit),
            _ => None,
        }
    }
}

/// The progress dimensions that can carry step thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepDimension {
    Visibility,
    Fill,
    Cover,
    Enter,
    Exit,
}

impl StepDimension {
    pub const ALL: [StepDimension; 5] = [
        Self::Visibility,
        Self::Fill,
        Self::Cover,
        Self::Enter,
        Self::Exit,
    ];

    /// Kebab-case name used for the step attribute (`data-<name>-step`).
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Visibility => "visibility",
            Self::Fill => "fill",
            Self::Cover => "cover",
            Self::Enter => "enter",
            Self::Exit => "exit",
        }
    }

    /// The metric this dimension tracks.
    pub const fn metric(&self) -> Metric {
        match self {
            Self::Visibility => Metric::Visibility,
            Self::Fill => Metric::Fill,
            Self::Cover => Metric::Cover,
            Self::Enter => Metric::Enter,
            Self::Exit => Metric::Exit,
        }
    }
}

// =============================================================================
// Trigger margins
// =============================================================================

/// Fixed-position inset box for a trigger probe.
///
/// Parsed from a whitespace shorthand with CSS-style fallback order:
/// one value applies to all sides, two to (vertical, horizontal),
/// three to (top, horizontal, bottom), four to (top, right, bottom, left).
/// Values are opaque to the engine; the host interprets the units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Margins {
    pub top: String,
    pub right: String,
    pub bottom: String,
    pub left: String,
}

impl Margins {
    /// Parse the shorthand. Missing positions fall back in CSS order.
    pub fn from_shorthand(shorthand: &str) -> Self {
        let parts: Vec<&str> = shorthand.split_whitespace().collect();
        let pick = |candidates: &[usize]| -> String {
            candidates
                .iter()
                .find_map(|&i| parts.get(i).copied())
                .unwrap_or("0")
                .to_string()
        };
        Self {
            top: pick(&[0]),
            right: pick(&[1, 0]),
            bottom: pick(&[2, 0]),
            left: pick(&[3, 1, 0]),
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
    fn test_rect_edges_per_axis() {
        let rect = Rect::new(10.0, 20.0, 100.0, 200.0);

        assert_eq!(rect.start(Axis::Vertical), 20.0);
        assert_eq!(rect.end(Axis::Vertical), 220.0);
        assert_eq!(rect.start(Axis::Horizontal), 10.0);
        assert_eq!(rect.end(Axis::Horizontal), 110.0);
        assert_eq!(rect.center(Axis::Vertical), 120.0);
    }

    #[test]
    fn test_size_along() {
        let size = Size::new(80.0, 24.0);
        assert_eq!(size.along(Axis::Vertical), 24.0);
        assert_eq!(size.along(Axis::Horizontal), 80.0);
    }

    #[test]
    fn test_direction_markers() {
        assert_eq!(ScrollDirection::Forward.marker(), "1");
        assert_eq!(ScrollDirection::Backward.marker(), "-1");
        assert_eq!(ScrollDirection::Idle.marker(), "0");
    }

    #[test]
    fn test_metric_names_round_trip() {
        for metric in [
            Metric::Visibility,
            Metric::Fill,
            Metric::Cover,
            Metric::Enter,
            Metric::Exit,
            Metric::Peak,
        ] {
            assert_eq!(Metric::from_option_name(metric.name()), Some(metric));
        }
        assert_eq!(
            Metric::from_option_name("offsetEnter"),
            Some(Metric::OffsetEnter)
        );
        assert_eq!(Metric::from_option_name("bogus"), None);
    }

    #[test]
    fn test_margins_fallback_order() {
        let one = Margins::from_shorthand("10px");
        assert_eq!(one.top, "10px");
        assert_eq!(one.right, "10px");
        assert_eq!(one.bottom, "10px");
        assert_eq!(one.left, "10px");

        let two = Margins::from_shorthand("10px 20px");
        assert_eq!(two.top, "10px");
        assert_eq!(two.right, "20px");
        assert_eq!(two.bottom, "10px");
        assert_eq!(two.left, "20px");

        let four = Margins::from_shorthand("1 2 3 4");
        assert_eq!(four.top, "1");
        assert_eq!(four.right, "2");
        assert_eq!(four.bottom, "3");
        assert_eq!(four.left, "4");

        let empty = Margins::from_shorthand("   ");
        assert_eq!(empty.top, "0");
        assert_eq!(empty.left, "0");
    }
}
