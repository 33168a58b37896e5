use geo::{Coord, Rect};

/// Grows rectangles to cover coordinates or other rectangles
///
/// # Examples
///
/// ```rust
/// use geo::{coord, Rect};
/// use gisview_core::util::extend_rect::ExtendRect;
///
/// let mut bounds = Rect::new(coord! { x: 90.0, y: 23.0 }, coord! { x: 90.0, y: 23.0 });
///
/// bounds.extend_coord(coord! { x: 91.5, y: 22.0 });
/// assert_eq!(bounds.min(), coord! { x: 90.0, y: 22.0 });
/// assert_eq!(bounds.max(), coord! { x: 91.5, y: 23.0 });
///
/// bounds.extend_rect(&Rect::new(coord! { x: 88.0, y: 24.0 }, coord! { x: 89.0, y: 26.0 }));
/// assert_eq!(bounds.min(), coord! { x: 88.0, y: 22.0 });
/// assert_eq!(bounds.max(), coord! { x: 91.5, y: 26.0 });
/// ```
pub trait ExtendRect {
    /// Extends the rectangle so it covers the given coordinate
    fn extend_coord(&mut self, c: Coord);

    /// Extends the rectangle so it covers the given other rectangle
    fn extend_rect(&mut self, other: &Rect);
}

impl ExtendRect for Rect {
    fn extend_coord(&mut self, c: Coord) {
        let min = self.min();
        let max = self.max();
        self.set_min((min.x.min(c.x), min.y.min(c.y)));
        self.set_max((max.x.max(c.x), max.y.max(c.y)));
    }

    fn extend_rect(&mut self, other: &Rect) {
        self.extend_coord(other.min());
        self.extend_coord(other.max());
    }
}

/// Extends an optional rectangle, creating it from the first coordinate
pub fn extend_bounds(bounds: &mut Option<Rect>, c: Coord) {
    match bounds {
        Some(b) => b.extend_coord(c),
        None => *bounds = Some(Rect::new(c, c)),
    }
}
