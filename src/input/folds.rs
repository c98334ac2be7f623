use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::input::InputError;
use crate::input::reader::{for_each_line, open_maybe_gz};
use crate::input::records::parse_record_line;
use crate::model::detection::FoldDetection;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FoldStatus {
    Loaded { records: usize, skipped: usize },
    Missing,
}

#[derive(Debug, Clone)]
pub struct FoldLoadReport {
    pub fold_id: u32,
    pub path: PathBuf,
    pub status: FoldStatus,
}

/// All fold detections grouped by image id. Images iterate in sorted id order;
/// within an image, detections keep fold order then file order.
#[derive(Debug, Clone, Default)]
pub struct FoldSet {
    pub images: BTreeMap<String, Vec<FoldDetection>>,
    pub folds: Vec<FoldLoadReport>,
}

impl FoldSet {
    pub fn n_detections(&self) -> usize {
        self.images.values().map(Vec::len).sum()
    }

    pub fn n_folds_loaded(&self) -> usize {
        self.folds
            .iter()
            .filter(|f| matches!(f.status, FoldStatus::Loaded { .. }))
            .count()
    }

    pub fn missing_folds(&self) -> Vec<&FoldLoadReport> {
        self.folds
            .iter()
            .filter(|f| f.status == FoldStatus::Missing)
            .collect()
    }
}

/// Loads fold files; the fold id is the position in `paths`. A fold whose file
/// does not exist is skipped with a warning, which lowers the number of folds
/// that can vote for a cluster.
pub fn load_folds(paths: &[PathBuf]) -> Result<FoldSet, InputError> {
    let mut set = FoldSet::default();

    for (idx, path) in paths.iter().enumerate() {
        let fold_id = u32::try_from(idx)
            .map_err(|_| InputError::InvalidInput(format!("too many folds: {}", paths.len())))?;
        if !path.exists() {
            warn!("fold file not found, skipping fold {}: {}", fold_id, path.display());
            set.folds.push(FoldLoadReport {
                fold_id,
                path: path.clone(),
                status: FoldStatus::Missing,
            });
            continue;
        }

        info!("reading fold {}: {}", fold_id, path.display());
        let (records, skipped) = read_fold_file(path, fold_id, &mut set.images)?;
        set.folds.push(FoldLoadReport {
            fold_id,
            path: path.clone(),
            status: FoldStatus::Loaded { records, skipped },
        });
    }

    info!(
        "loaded {} detections for {} images from {} folds",
        set.n_detections(),
        set.images.len(),
        set.n_folds_loaded()
    );
    Ok(set)
}

fn read_fold_file(
    path: &Path,
    fold_id: u32,
    images: &mut BTreeMap<String, Vec<FoldDetection>>,
) -> Result<(usize, usize), InputError> {
    let mut reader = open_maybe_gz(path)?;
    let mut records = 0usize;
    let mut skipped = 0usize;
    let mut degenerate = 0usize;

    for_each_line(reader.as_mut(), |line_no, line| match parse_record_line(line) {
        Ok(Some(rec)) => {
            records += 1;
            if rec.bbox.is_degenerate() {
                degenerate += 1;
            }
            images.entry(rec.id.clone()).or_default().push(FoldDetection {
                image_id: rec.id,
                class_id: rec.class_id,
                confidence: rec.confidence,
                bbox: rec.bbox,
                fold_id,
            });
        }
        Ok(None) => {}
        Err(issue) => {
            skipped += 1;
            warn!(
                "skipping record {}:{}: {} ({:?})",
                path.display(),
                line_no,
                issue,
                line
            );
        }
    })?;

    if degenerate > 0 {
        warn!(
            "fold {}: {} zero-area boxes in {}; they overlap nothing",
            fold_id,
            degenerate,
            path.display()
        );
    }
    Ok((records, skipped))
}
