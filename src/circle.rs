use anyhow::Context;
use std::path::Path;

// ── Geometry ────────────────────────────────────────────────────────────────

/// Pixel coordinates in image space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance, never rounded.
    pub fn distance_to(&self, other: Point) -> f64 {
        let dx = (self.x - other.x) as f64;
        let dy = (self.y - other.y) as f64;
        (dx * dx + dy * dy).sqrt()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Circle {
    pub center: Point,
    pub radius: f64,
}

impl Circle {
    /// Circle through `edge`, centered at `center`.
    pub fn through(center: Point, edge: Point) -> Self {
        Self {
            center,
            radius: center.distance_to(edge),
        }
    }

    /// Ring radius in whole pixels, as drawn on screen.
    pub fn ring_radius(&self) -> u32 {
        self.radius.trunc() as u32
    }
}

// ── Output Record ───────────────────────────────────────────────────────────

/// One `x,y,radius` line per circle.
///
/// The radius keeps its shortest round-trip decimal form with at least one
/// fractional digit, so `5.0` stays `5.0` rather than `5`.
pub fn format_record(circles: &[Circle]) -> String {
    let mut out = String::new();
    for circle in circles {
        out.push_str(&format!(
            "{},{},{:?}\n",
            circle.center.x, circle.center.y, circle.radius
        ));
    }
    out
}

pub fn write_record(path: &Path, circles: &[Circle]) -> anyhow::Result<()> {
    std::fs::write(path, format_record(circles))
        .with_context(|| format!("failed to write record {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn radius_is_euclidean_distance() {
        let c = Circle::through(Point::new(0, 0), Point::new(3, 4));
        assert_eq!(c.radius, 5.0);
    }

    #[test]
    fn radius_is_symmetric_and_unrounded() {
        let a = Point::new(10, 10);
        let b = Point::new(11, 12);
        assert_eq!(a.distance_to(b), b.distance_to(a));
        assert!((a.distance_to(b) - 5f64.sqrt()).abs() < 1e-12);
        assert_eq!(Circle::through(a, b).ring_radius(), 2);
    }

    #[test]
    fn zero_radius_when_edge_equals_center() {
        let p = Point::new(-4, 7);
        assert_eq!(Circle::through(p, p).radius, 0.0);
    }

    #[test]
    fn record_uses_natural_decimal_radius() {
        let circles = [
            Circle {
                center: Point::new(10, 10),
                radius: 5.0,
            },
            Circle {
                center: Point::new(50, 60),
                radius: 12.5,
            },
        ];
        assert_eq!(format_record(&circles), "10,10,5.0\n50,60,12.5\n");
    }

    #[test]
    fn empty_list_gives_empty_record() {
        assert_eq!(format_record(&[]), "");
    }

    #[test]
    fn write_record_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("img.txt");
        let circles = [Circle::through(Point::new(1, 2), Point::new(1, 5))];
        write_record(&path, &circles).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "1,2,3.0\n");
    }
}
