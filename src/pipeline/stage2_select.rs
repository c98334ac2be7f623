use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::input::{SequenceInput, UnparsedLine};
use crate::model::params::SelectorParams;
use crate::model::sequence::{Confidence, RangeResult, SequenceEntry};

#[derive(Debug, Clone)]
pub struct SubjectSelection {
    pub subject_id: String,
    /// `None` when the subject has no frame indices at all.
    pub range: Option<RangeResult>,
    pub kept: Vec<SequenceEntry>,
    pub removed: Vec<SequenceEntry>,
}

impl SubjectSelection {
    pub fn original_count(&self) -> usize {
        self.kept.len() + self.removed.len()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Stage2Output {
    /// Per-subject results in sorted subject-id order.
    pub subjects: Vec<SubjectSelection>,
    pub kept: Vec<SequenceEntry>,
    pub removed: Vec<SequenceEntry>,
    pub removed_by_confidence: Vec<SequenceEntry>,
    pub unparsed: Vec<UnparsedLine>,
}

impl Stage2Output {
    pub fn total_original(&self) -> usize {
        self.kept.len() + self.removed.len()
    }

    pub fn no_data_subjects(&self) -> Vec<&str> {
        self.subjects
            .iter()
            .filter(|s| s.range.is_none())
            .map(|s| s.subject_id.as_str())
            .collect()
    }
}

pub fn run_stage2(input: SequenceInput, params: &SelectorParams) -> Stage2Output {
    let mut by_subject: BTreeMap<String, Vec<SequenceEntry>> = BTreeMap::new();
    for entry in input.entries {
        by_subject
            .entry(entry.subject_id.clone())
            .or_default()
            .push(entry);
    }

    let subjects: Vec<SubjectSelection> = by_subject
        .into_iter()
        .map(|(subject_id, entries)| select_subject(subject_id, entries, params.tolerance))
        .collect();

    for s in &subjects {
        log_subject(s, params.tolerance);
    }

    let out = aggregate(subjects, input.unparsed);
    info!(
        "selection done: original={}, kept={}, removed={}, unparsed={}",
        out.total_original(),
        out.kept.len(),
        out.removed.len(),
        out.unparsed.len()
    );
    out
}

pub fn select_subject(
    subject_id: String,
    entries: Vec<SequenceEntry>,
    tolerance: u64,
) -> SubjectSelection {
    let mut indices: Vec<u64> = entries.iter().map(|e| e.frame_index).collect();
    indices.sort_unstable();
    indices.dedup();

    let Some(range) = find_best_range(&subject_id, &indices, tolerance) else {
        return SubjectSelection {
            subject_id,
            range: None,
            kept: Vec::new(),
            removed: Vec::new(),
        };
    };

    let (kept, removed): (Vec<_>, Vec<_>) = entries
        .into_iter()
        .partition(|e| range.contains(e.frame_index));

    SubjectSelection {
        subject_id,
        range: Some(range),
        kept,
        removed,
    }
}

/// Longest window `[L, R]` over sorted distinct `indices` whose number of
/// absent indices is at most `tolerance`. Equal lengths prefer more present
/// indices; remaining ties keep the window found first.
pub fn find_best_range(subject_id: &str, indices: &[u64], tolerance: u64) -> Option<RangeResult> {
    let first = *indices.first()?;
    let mut best = RangeResult {
        subject_id: subject_id.to_string(),
        l: first,
        r: first,
        window_length: 1,
        unique_count: 1,
    };

    let mut left = 0usize;
    for right in 0..indices.len() {
        while left <= right {
            let window_length = (indices[right] - indices[left]).saturating_add(1);
            let unique_count = (right - left + 1) as u64;
            if window_length - unique_count > tolerance {
                left += 1;
                continue;
            }
            if window_length > best.window_length
                || (window_length == best.window_length && unique_count > best.unique_count)
            {
                best.l = indices[left];
                best.r = indices[right];
                best.window_length = window_length;
                best.unique_count = unique_count;
            }
            break;
        }
    }

    Some(best)
}

fn aggregate(subjects: Vec<SubjectSelection>, unparsed: Vec<UnparsedLine>) -> Stage2Output {
    let mut kept = Vec::new();
    let mut removed = Vec::new();
    for s in &subjects {
        kept.extend(s.kept.iter().cloned());
        removed.extend(s.removed.iter().cloned());
    }

    let mut removed_by_confidence = removed.clone();
    removed_by_confidence.sort_by(|a, b| Confidence::descending(&a.confidence, &b.confidence));

    Stage2Output {
        subjects,
        kept,
        removed,
        removed_by_confidence,
        unparsed,
    }
}

fn log_subject(s: &SubjectSelection, tolerance: u64) {
    let Some(range) = &s.range else {
        warn!("{}: no data", s.subject_id);
        return;
    };
    info!(
        "{}: best range {}..={} (length {}), original={}, kept={}, removed={}",
        s.subject_id,
        range.l,
        range.r,
        range.window_length,
        s.original_count(),
        s.kept.len(),
        s.removed.len()
    );
    let missing = range.missing_inside();
    if missing > 0 {
        warn!(
            "{}: {} index(es) missing inside {}..={}, within tolerance {}",
            s.subject_id, missing, range.l, range.r, tolerance
        );
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage2_select.rs"]
mod tests;
