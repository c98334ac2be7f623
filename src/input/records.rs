use crate::model::geometry::BBox;

pub const RECORD_FIELDS: usize = 7;

/// One `<id> <class> <conf> <x1> <y1> <x2> <y2>` line. Extra trailing fields
/// are ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionRecord {
    pub id: String,
    pub class_id: i64,
    pub confidence: f64,
    pub bbox: BBox,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordIssue {
    #[error("expected at least 7 fields, found {0}")]
    TooFewFields(usize),
    #[error("non-numeric {field}: {value:?}")]
    NonNumeric { field: &'static str, value: String },
}

/// Returns `Ok(None)` for blank lines.
pub fn parse_record_line(line: &str) -> Result<Option<DetectionRecord>, RecordIssue> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.is_empty() {
        return Ok(None);
    }
    if parts.len() < RECORD_FIELDS {
        return Err(RecordIssue::TooFewFields(parts.len()));
    }

    // Class ids are sometimes written as floats ("0.0"); truncate like an int cast.
    let class_id = parse_finite("class_id", parts[1])?.trunc() as i64;
    let confidence = parse_finite("confidence", parts[2])?;
    let x1 = parse_finite("x1", parts[3])?;
    let y1 = parse_finite("y1", parts[4])?;
    let x2 = parse_finite("x2", parts[5])?;
    let y2 = parse_finite("y2", parts[6])?;

    Ok(Some(DetectionRecord {
        id: parts[0].to_string(),
        class_id,
        confidence,
        bbox: BBox::new(x1, y1, x2, y2),
    }))
}

fn parse_finite(field: &'static str, token: &str) -> Result<f64, RecordIssue> {
    match token.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(RecordIssue::NonNumeric {
            field,
            value: token.to_string(),
        }),
    }
}
