//! SVG path hints for links.
//!
//! A link's path is a rendering hint derived from its endpoints; it is never
//! authoritative geometry. These helpers build the path data with the `svg`
//! crate so that renderers can use the string directly in a `d` attribute.

use svg::node::{Value, element::path::Data};

use crate::geometry::Coords;

/// Straight line from `from` to `to`.
///
/// # Examples
///
/// ```
/// # use weft_core::{geometry::Coords, path::line_path};
/// let d = line_path(Coords::new(0.0, 0.0), Coords::new(10.0, 20.0));
/// assert!(d.starts_with('M'));
/// assert!(d.contains('L'));
/// ```
pub fn line_path(from: Coords, to: Coords) -> String {
    let data = Data::new()
        .move_to((from.x(), from.y()))
        .line_to((to.x(), to.y()));
    Value::from(data).to_string()
}

/// Cubic curve from `from` to `to`.
///
/// Control points are pushed `curvy` units along the dominant axis: when the
/// endpoints are further apart horizontally than vertically the curve bends
/// horizontally, otherwise vertically. `curvy == 0` degenerates to a straight
/// curve.
pub fn curve_path(from: Coords, to: Coords, curvy: f32) -> String {
    let horizontal = (from.x() - to.x()).abs() > (from.y() - to.y()).abs();
    let (curvy_x, curvy_y) = if horizontal { (curvy, 0.0) } else { (0.0, curvy) };

    let data = Data::new()
        .move_to((from.x(), from.y()))
        .cubic_curve_to(vec![
            from.x() + curvy_x,
            from.y() + curvy_y,
            to.x() - curvy_x,
            to.y() - curvy_y,
            to.x(),
            to.y(),
        ]);
    Value::from(data).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_path_commands() {
        let d = line_path(Coords::new(1.0, 2.0), Coords::new(30.0, 40.0));

        assert!(d.starts_with('M'));
        assert!(d.contains('L'));
        assert!(!d.contains('C'));
        assert!(d.contains("30"));
        assert!(d.contains("40"));
    }

    #[test]
    fn test_curve_path_commands() {
        let d = curve_path(Coords::new(0.0, 0.0), Coords::new(100.0, 10.0), 25.0);

        assert!(d.starts_with('M'));
        assert!(d.contains('C'));
        // Horizontal dominance: first control point moves along x.
        assert!(d.contains("25"));
        assert!(d.contains("75"));
    }

    #[test]
    fn test_curve_path_vertical_bends_on_y() {
        let d = curve_path(Coords::new(0.0, 0.0), Coords::new(10.0, 200.0), 40.0);

        assert!(d.contains("40"));
        assert!(d.contains("160"));
    }
}
