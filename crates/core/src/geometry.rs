use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GeometryError {
    #[error("Text box polygon has no points")]
    EmptyPolygon,
}

/// A pixel coordinate on the source image. `y` grows downwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// One recognized text region: the string plus the polygon it was read from.
///
/// The polygon is usually the four corners reported by the detector, but any
/// non-empty point set works since only its extremes are used.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextBox {
    text: String,
    points: Vec<Point>,
}

impl TextBox {
    pub fn new(text: impl Into<String>, points: Vec<Point>) -> Result<Self, GeometryError> {
        if points.is_empty() {
            return Err(GeometryError::EmptyPolygon);
        }
        Ok(Self { text: text.into(), points })
    }

    /// Axis-aligned rectangle helper, mostly for tests and line-level engines.
    pub fn from_rect(text: impl Into<String>, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            text: text.into(),
            points: vec![
                Point::new(x, y),
                Point::new(x + width, y),
                Point::new(x + width, y + height),
                Point::new(x, y + height),
            ],
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn x_left(&self) -> f64 {
        self.points.iter().map(|p| p.x).fold(f64::INFINITY, f64::min)
    }

    pub fn x_right(&self) -> f64 {
        self.points.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn y_top(&self) -> f64 {
        self.points.iter().map(|p| p.y).fold(f64::INFINITY, f64::min)
    }

    pub fn y_bottom(&self) -> f64 {
        self.points.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn width(&self) -> f64 {
        self.x_right() - self.x_left()
    }

    pub fn height(&self) -> f64 {
        self.y_bottom() - self.y_top()
    }
}
