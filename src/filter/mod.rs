use crate::{Float, Point2f, Vec2f};

/// Pixel reconstruction kernel; evaluated over its positive quadrant into the
/// film's weight table.
pub trait Filter: Send + Sync {
    fn evaluate(&self, p: Point2f) -> Float;

    fn radius(&self) -> Vec2f;
}

pub struct BoxFilter {
    pub radius: Vec2f,
}

impl BoxFilter {
    pub fn new(radius: Vec2f) -> Self {
        Self { radius }
    }
}

impl Filter for BoxFilter {
    fn evaluate(&self, _p: Point2f) -> Float {
        1.0
    }

    fn radius(&self) -> Vec2f {
        self.radius
    }
}
