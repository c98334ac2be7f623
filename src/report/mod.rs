use std::path::PathBuf;

use serde::Serialize;

use crate::model::detection::FusedDetection;
use crate::model::params::{EnsembleParams, SelectorParams};

pub mod json;
pub mod text;

#[derive(Debug, Clone, Serialize)]
pub struct FoldSummary {
    pub fold_id: u32,
    pub path: PathBuf,
    pub missing: bool,
    pub records: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnsembleSummary {
    pub params: EnsembleParams,
    pub folds: Vec<FoldSummary>,
    pub n_images: usize,
    pub boxes_before: usize,
    pub low_conf_dropped: usize,
    pub clusters: usize,
    pub clusters_below_min_folds: usize,
    pub boxes_after: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubjectSummary {
    pub subject_id: String,
    pub range: Option<(u64, u64)>,
    pub window_length: u64,
    pub missing_inside: u64,
    pub original: usize,
    pub kept: usize,
    pub removed: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SelectionSummary {
    pub params: SelectorParams,
    pub subjects: Vec<SubjectSummary>,
    pub total_original: usize,
    pub total_kept: usize,
    pub total_removed: usize,
    pub unparsed_lines: usize,
    pub no_data_subjects: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub tool: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ensemble: Option<EnsembleSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection: Option<SelectionSummary>,
    pub outputs: Vec<PathBuf>,
}

impl RunSummary {
    pub fn new() -> Self {
        Self {
            tool: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            ensemble: None,
            selection: None,
            outputs: Vec::new(),
        }
    }
}

impl Default for RunSummary {
    fn default() -> Self {
        Self::new()
    }
}

pub fn format_confidence(v: f64) -> String {
    format!("{:.5}", v)
}

/// Pixel coordinates are written as integers, rounding halves to even.
pub fn round_coord(v: f64) -> i64 {
    v.round_ties_even() as i64
}

pub fn format_fused_line(d: &FusedDetection) -> String {
    format!(
        "{} {} {} {} {} {} {}",
        d.image_id,
        d.class_id,
        format_confidence(d.confidence),
        round_coord(d.bbox.x1),
        round_coord(d.bbox.y1),
        round_coord(d.bbox.x2),
        round_coord(d.bbox.y2),
    )
}
