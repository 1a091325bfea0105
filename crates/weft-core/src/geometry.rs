//! Geometric primitives for diagram models.
//!
//! # Overview
//!
//! - [`Coords`] - A 2D position in canvas space
//! - [`Dimensions`] - Width and height of an entity
//! - [`Rect`] - Position plus dimensions, as reported by a canvas collaborator
//! - [`CoordsPatch`] / [`DimensionsPatch`] - Partial updates merged over an existing value
//!
//! # Coordinate System
//!
//! ```text
//!   (0,0) ────────► +X
//!     │
//!     │
//!     ▼
//!    +Y
//! ```
//!
//! Origin at the top-left with Y increasing downward, matching SVG.

/// A 2D position in canvas space.
///
/// # Examples
///
/// ```
/// # use weft_core::geometry::Coords;
/// let from = Coords::new(10.0, 20.0);
/// let to = Coords::new(15.0, 10.0);
///
/// let delta = to.sub(from);
/// assert_eq!(delta, Coords::new(5.0, -10.0));
/// assert_eq!(from.add(delta), to);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Coords {
    x: f32,
    y: f32,
}

impl Coords {
    /// Creates new coordinates.
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Returns the x-coordinate.
    pub fn x(self) -> f32 {
        self.x
    }

    /// Returns the y-coordinate.
    pub fn y(self) -> f32 {
        self.y
    }

    /// Returns a copy with the x-coordinate replaced.
    pub fn with_x(mut self, x: f32) -> Self {
        self.x = x;
        self
    }

    /// Returns a copy with the y-coordinate replaced.
    pub fn with_y(mut self, y: f32) -> Self {
        self.y = y;
        self
    }

    /// Component-wise addition; used to translate by a delta.
    pub fn add(self, other: Coords) -> Self {
        Self {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }

    /// Component-wise subtraction; `to.sub(from)` is the delta from `from` to `to`.
    pub fn sub(self, other: Coords) -> Self {
        Self {
            x: self.x - other.x,
            y: self.y - other.y,
        }
    }

    /// Checks if both coordinates are zero
    pub fn is_zero(self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

impl From<(f32, f32)> for Coords {
    fn from((x, y): (f32, f32)) -> Self {
        Self::new(x, y)
    }
}

/// Width and height of an entity.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Dimensions {
    width: f32,
    height: f32,
}

impl Dimensions {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn width(self) -> f32 {
        self.width
    }

    pub fn height(self) -> f32 {
        self.height
    }

    pub fn is_zero(self) -> bool {
        self.width == 0.0 && self.height == 0.0
    }
}

/// A rectangle as reported by the canvas: a reference position plus size.
///
/// The canvas decides what the position denotes; ports merge the canvas
/// center into it (see [`Rect::with_origin`]) so that the origin is the center.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    origin: Coords,
    dimensions: Dimensions,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            origin: Coords::new(x, y),
            dimensions: Dimensions::new(width, height),
        }
    }

    pub fn origin(self) -> Coords {
        self.origin
    }

    pub fn dimensions(self) -> Dimensions {
        self.dimensions
    }

    /// Returns a copy positioned at `origin`, keeping the size.
    pub fn with_origin(mut self, origin: Coords) -> Self {
        self.origin = origin;
        self
    }
}

/// A partial coordinate update. Unset components keep their current value.
///
/// # Examples
///
/// ```
/// # use weft_core::geometry::{Coords, CoordsPatch};
/// let current = Coords::new(3.0, 4.0);
/// assert_eq!(CoordsPatch::x(10.0).apply(current), Coords::new(10.0, 4.0));
/// assert_eq!(CoordsPatch::from(Coords::new(1.0, 2.0)).apply(current), Coords::new(1.0, 2.0));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CoordsPatch {
    x: Option<f32>,
    y: Option<f32>,
}

impl CoordsPatch {
    /// A patch that only sets x.
    pub fn x(x: f32) -> Self {
        Self {
            x: Some(x),
            y: None,
        }
    }

    /// A patch that only sets y.
    pub fn y(y: f32) -> Self {
        Self {
            x: None,
            y: Some(y),
        }
    }

    /// Merges this patch over `current`.
    pub fn apply(self, current: Coords) -> Coords {
        Coords {
            x: self.x.unwrap_or(current.x),
            y: self.y.unwrap_or(current.y),
        }
    }
}

impl From<Coords> for CoordsPatch {
    fn from(coords: Coords) -> Self {
        Self {
            x: Some(coords.x),
            y: Some(coords.y),
        }
    }
}

/// A partial dimensions update. Unset components keep their current value.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DimensionsPatch {
    width: Option<f32>,
    height: Option<f32>,
}

impl DimensionsPatch {
    pub fn width(width: f32) -> Self {
        Self {
            width: Some(width),
            height: None,
        }
    }

    pub fn height(height: f32) -> Self {
        Self {
            width: None,
            height: Some(height),
        }
    }

    pub fn apply(self, current: Dimensions) -> Dimensions {
        Dimensions {
            width: self.width.unwrap_or(current.width),
            height: self.height.unwrap_or(current.height),
        }
    }
}

impl From<Dimensions> for DimensionsPatch {
    fn from(dimensions: Dimensions) -> Self {
        Self {
            width: Some(dimensions.width),
            height: Some(dimensions.height),
        }
    }
}
