/// Axis-aligned box in `x1 y1 x2 y2` order. Corners are not required to be ordered;
/// a box with `x2 <= x1` or `y2 <= y1` has zero area.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BBox {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> f64 {
        (self.x2 - self.x1).max(0.0)
    }

    pub fn height(&self) -> f64 {
        (self.y2 - self.y1).max(0.0)
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn is_degenerate(&self) -> bool {
        self.x2 <= self.x1 || self.y2 <= self.y1
    }

    pub fn intersection_area(&self, other: &BBox) -> f64 {
        let x1 = self.x1.max(other.x1);
        let y1 = self.y1.max(other.y1);
        let x2 = self.x2.min(other.x2);
        let y2 = self.y2.min(other.y2);
        (x2 - x1).max(0.0) * (y2 - y1).max(0.0)
    }

    pub fn iou(&self, other: &BBox) -> f64 {
        let inter = self.intersection_area(other);
        if inter <= 0.0 {
            return 0.0;
        }
        let union = self.area() + other.area() - inter;
        if union <= 0.0 {
            return 0.0;
        }
        inter / union
    }

    pub fn coords(&self) -> [f64; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }

    pub fn from_coords(c: [f64; 4]) -> Self {
        Self::new(c[0], c[1], c[2], c[3])
    }
}

/// Keeps a weighted mean from dividing by zero when every weight is zero.
pub const WEIGHT_EPS: f64 = 1e-9;

/// Confidence-weighted mean of `(box, confidence)` pairs.
///
/// Each weight is `confidence_i / (sum + WEIGHT_EPS)` and the mean is accumulated
/// in member order, so calling this on the same members always gives the same bits.
pub fn weighted_mean_box<I>(members: I) -> BBox
where
    I: IntoIterator<Item = (BBox, f64)> + Clone,
{
    let total: f64 = members.clone().into_iter().map(|(_, c)| c).sum();
    let denom = total + WEIGHT_EPS;
    let mut acc = [0.0f64; 4];
    for (b, conf) in members {
        let w = conf / denom;
        for (slot, v) in acc.iter_mut().zip(b.coords()) {
            *slot += v * w;
        }
    }
    BBox::from_coords(acc)
}

#[cfg(test)]
#[path = "../../tests/src_inline/model/geometry.rs"]
mod tests;
