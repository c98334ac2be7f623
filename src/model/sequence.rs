use std::cmp::Ordering;

/// Detection confidence as read from a sequence record. `Unknown` always ranks
/// below every known value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Confidence {
    Known(f64),
    Unknown,
}

impl Confidence {
    pub fn from_token(token: Option<&str>) -> Self {
        match token.and_then(|t| t.parse::<f64>().ok()) {
            Some(v) if v.is_finite() => Confidence::Known(v),
            _ => Confidence::Unknown,
        }
    }

    /// Ordering for a confidence-descending sort: higher first, unknown last.
    pub fn descending(a: &Confidence, b: &Confidence) -> Ordering {
        match (a, b) {
            (Confidence::Known(x), Confidence::Known(y)) => y.total_cmp(x),
            (Confidence::Known(_), Confidence::Unknown) => Ordering::Less,
            (Confidence::Unknown, Confidence::Known(_)) => Ordering::Greater,
            (Confidence::Unknown, Confidence::Unknown) => Ordering::Equal,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SequenceEntry {
    pub subject_id: String,
    pub frame_index: u64,
    pub confidence: Confidence,
    pub raw_record: String,
}

/// Best tolerant window `[l, r]` for one subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeResult {
    pub subject_id: String,
    pub l: u64,
    pub r: u64,
    pub window_length: u64,
    pub unique_count: u64,
}

impl RangeResult {
    pub fn contains(&self, frame_index: u64) -> bool {
        self.l <= frame_index && frame_index <= self.r
    }

    pub fn missing_inside(&self) -> u64 {
        self.window_length - self.unique_count
    }
}
