#![forbid(unsafe_code)]

//! Minimal integer geometry for node frames.
//!
//! Coordinates are absolute display pixels. Negative origins are legal;
//! nodes animate in from off-screen.

/// A position in display pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Width and height in display pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    #[must_use]
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

/// An axis-aligned rectangle: origin plus size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Rect {
    #[must_use]
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            origin: Point::new(x, y),
            size: Size::new(width, height),
        }
    }

    #[must_use]
    pub const fn center(&self) -> Point {
        Point::new(
            self.origin.x + self.size.width / 2,
            self.origin.y + self.size.height / 2,
        )
    }

    /// The same rectangle repositioned so its center is `center`.
    #[must_use]
    pub const fn with_center(&self, center: Point) -> Self {
        Self {
            origin: Point::new(
                center.x - self.size.width / 2,
                center.y - self.size.height / 2,
            ),
            size: self.size,
        }
    }

    /// The same rectangle with a different origin.
    #[must_use]
    pub const fn with_origin(&self, origin: Point) -> Self {
        Self {
            origin,
            size: self.size,
        }
    }

    /// The same rectangle with a different size; the origin stays put.
    #[must_use]
    pub const fn with_size(&self, size: Size) -> Self {
        Self {
            origin: self.origin,
            size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_rounds_toward_origin() {
        let rect = Rect::new(0, 0, 5, 5);
        assert_eq!(rect.center(), Point::new(2, 2));
        let even = Rect::new(10, 20, 4, 8);
        assert_eq!(even.center(), Point::new(12, 24));
    }

    #[test]
    fn with_center_keeps_the_size() {
        let rect = Rect::new(0, 0, 40, 20).with_center(Point::new(64, 32));
        assert_eq!(rect.size, Size::new(40, 20));
        assert_eq!(rect.center(), Point::new(64, 32));
        assert_eq!(rect.origin, Point::new(44, 22));
    }

    #[test]
    fn negative_origins_are_allowed() {
        let rect = Rect::new(-10, -4, 8, 8).with_center(Point::new(0, 0));
        assert_eq!(rect.origin, Point::new(-4, -4));
    }
}
