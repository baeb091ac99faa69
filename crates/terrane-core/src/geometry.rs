//! Geometric primitives for diagram layout and positioning.
//!
//! # Coordinate System
//!
//! Terrane uses a screen-style coordinate system:
//!
//! ```text
//!   (0,0) ────────► +X
//!     │
//!     ▼
//!    +Y
//! ```
//!
//! - **Origin**: Top-left corner at `(0, 0)`
//! - **X-axis**: Increases rightward
//! - **Y-axis**: Increases downward

/// A 2D point in diagram coordinate space.
///
/// # Examples
///
/// ```
/// # use terrane_core::geometry::Point;
/// let p = Point::new(10.0, 20.0);
/// let moved = p.add_point(Point::new(5.0, -5.0));
/// assert_eq!(moved.x(), 15.0);
/// assert_eq!(moved.y(), 15.0);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point {
    x: f32,
    y: f32,
}

impl Point {
    /// Creates a new point with the specified coordinates.
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Returns the x-coordinate of the point.
    pub fn x(self) -> f32 {
        self.x
    }

    /// Returns the y-coordinate of the point.
    pub fn y(self) -> f32 {
        self.y
    }

    /// Adds another point to this point, returning a new point.
    pub fn add_point(self, other: Point) -> Self {
        Self {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }

    /// Subtracts another point from this point, returning a new point.
    pub fn sub_point(self, other: Point) -> Self {
        Self {
            x: self.x - other.x,
            y: self.y - other.y,
        }
    }

    /// Calculates the midpoint between this point and another point.
    pub fn midpoint(self, other: Point) -> Self {
        Self {
            x: (self.x + other.x) / 2.0,
            y: (self.y + other.y) / 2.0,
        }
    }
}

/// Width and height dimensions.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Size {
    width: f32,
    height: f32,
}

impl Size {
    /// Creates a new size with the specified dimensions.
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Returns the width.
    pub fn width(self) -> f32 {
        self.width
    }

    /// Returns the height.
    pub fn height(self) -> f32 {
        self.height
    }

    /// Grows the size by the given insets on all four sides.
    pub fn grow(self, insets: Insets) -> Self {
        Self {
            width: self.width + insets.horizontal(),
            height: self.height + insets.vertical(),
        }
    }
}

/// Padding values for the four sides of a rectangle.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Insets {
    top: f32,
    right: f32,
    bottom: f32,
    left: f32,
}

impl Insets {
    /// Creates insets with individual values for each side.
    pub fn new(top: f32, right: f32, bottom: f32, left: f32) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    /// Creates uniform insets with the same value on all sides.
    pub fn uniform(value: f32) -> Self {
        Self::new(value, value, value, value)
    }

    /// Returns the top inset.
    pub fn top(self) -> f32 {
        self.top
    }

    /// Returns the right inset.
    pub fn right(self) -> f32 {
        self.right
    }

    /// Returns the bottom inset.
    pub fn bottom(self) -> f32 {
        self.bottom
    }

    /// Returns the left inset.
    pub fn left(self) -> f32 {
        self.left
    }

    /// Returns the combined left and right insets.
    pub fn horizontal(self) -> f32 {
        self.left + self.right
    }

    /// Returns the combined top and bottom insets.
    pub fn vertical(self) -> f32 {
        self.top + self.bottom
    }
}

/// A rectangular bounding box defined by minimum and maximum coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    min: Point,
    max: Point,
}

impl Bounds {
    /// Creates a bounding box from minimum and maximum corner points.
    pub fn new(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    /// Creates an empty bounding box suitable as a fold seed.
    ///
    /// Extending an empty bounds with any rectangle yields that rectangle.
    pub fn empty() -> Self {
        Self {
            min: Point::new(f32::MAX, f32::MAX),
            max: Point::new(f32::MIN, f32::MIN),
        }
    }

    /// Returns the minimum corner.
    pub fn min(self) -> Point {
        self.min
    }

    /// Returns the maximum corner.
    pub fn max(self) -> Point {
        self.max
    }

    /// Extends the bounds to include a rectangle at `origin` with `size`.
    pub fn extend(self, origin: Point, size: Size) -> Self {
        Self {
            min: Point::new(self.min.x().min(origin.x()), self.min.y().min(origin.y())),
            max: Point::new(
                self.max.x().max(origin.x() + size.width()),
                self.max.y().max(origin.y() + size.height()),
            ),
        }
    }

    /// Returns the size spanned by the bounds, or zero for an empty bounds.
    pub fn size(self) -> Size {
        if self.min.x() > self.max.x() || self.min.y() > self.max.y() {
            return Size::default();
        }
        Size::new(self.max.x() - self.min.x(), self.max.y() - self.min.y())
    }
}

#[cfg(test)]
mod tests {
    use float_cmp::approx_eq;

    use super::*;

    #[test]
    fn test_point_arithmetic() {
        let p = Point::new(10.0, 20.0).add_point(Point::new(2.0, 3.0));
        assert!(approx_eq!(f32, p.x(), 12.0));
        assert!(approx_eq!(f32, p.y(), 23.0));

        let d = p.sub_point(Point::new(2.0, 3.0));
        assert!(approx_eq!(f32, d.x(), 10.0));
        assert!(approx_eq!(f32, d.y(), 20.0));
    }

    #[test]
    fn test_point_midpoint() {
        let mid = Point::new(0.0, 0.0).midpoint(Point::new(10.0, 30.0));
        assert!(approx_eq!(f32, mid.x(), 5.0));
        assert!(approx_eq!(f32, mid.y(), 15.0));
    }

    #[test]
    fn test_size_grow() {
        let size = Size::new(100.0, 50.0).grow(Insets::new(10.0, 5.0, 10.0, 5.0));
        assert!(approx_eq!(f32, size.width(), 110.0));
        assert!(approx_eq!(f32, size.height(), 70.0));
    }

    #[test]
    fn test_insets_sums() {
        let insets = Insets::uniform(8.0);
        assert!(approx_eq!(f32, insets.horizontal(), 16.0));
        assert!(approx_eq!(f32, insets.vertical(), 16.0));
    }

    #[test]
    fn test_bounds_extend_and_size() {
        let bounds = Bounds::empty()
            .extend(Point::new(10.0, 10.0), Size::new(20.0, 20.0))
            .extend(Point::new(0.0, 15.0), Size::new(5.0, 40.0));

        assert!(approx_eq!(f32, bounds.min().x(), 0.0));
        assert!(approx_eq!(f32, bounds.min().y(), 10.0));
        assert!(approx_eq!(f32, bounds.size().width(), 30.0));
        assert!(approx_eq!(f32, bounds.size().height(), 45.0));
    }

    #[test]
    fn test_empty_bounds_size_is_zero() {
        assert_eq!(Bounds::empty().size(), Size::default());
    }
}
