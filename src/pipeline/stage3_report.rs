use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::input::{FoldSet, FoldStatus};
use crate::model::detection::FusedDetection;
use crate::model::params::{EnsembleParams, SelectorParams};
use crate::model::sequence::SequenceEntry;
use crate::pipeline::stage1_ensemble::Stage1Output;
use crate::pipeline::stage2_select::Stage2Output;
use crate::report::json::render_summary_json;
use crate::report::text::render_report_text;
use crate::report::{
    EnsembleSummary, FoldSummary, RunSummary, SelectionSummary, SubjectSummary, format_fused_line,
};

pub const FUSED_FILE: &str = "final_ensemble.txt";
pub const KEPT_FILE: &str = "final_output.txt";
pub const REMOVED_FILE: &str = "removed_output.txt";
pub const REMOVED_SORTED_FILE: &str = "removed_sorted_by_conf.txt";
pub const SUMMARY_FILE: &str = "summary.json";
pub const REPORT_FILE: &str = "report.txt";

/// One fused record per line: `<image_id> <class> <conf:.5> <x1> <y1> <x2> <y2>`.
pub fn write_fused(path: &Path, fused: &[FusedDetection]) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut w = BufWriter::new(File::create(path)?);
    for d in fused {
        writeln!(w, "{}", format_fused_line(d))?;
    }
    w.flush()?;
    info!("wrote {} fused detections to {}", fused.len(), path.display());
    Ok(())
}

/// Writes the kept, removed and confidence-sorted removed records. Records are
/// copied verbatim. Returns the written paths.
pub fn write_selection(out_dir: &Path, sel: &Stage2Output) -> std::io::Result<Vec<PathBuf>> {
    fs::create_dir_all(out_dir)?;

    let outputs = [
        (KEPT_FILE, &sel.kept),
        (REMOVED_FILE, &sel.removed),
        (REMOVED_SORTED_FILE, &sel.removed_by_confidence),
    ];
    let mut paths = Vec::with_capacity(outputs.len());
    for (name, entries) in outputs {
        let path = out_dir.join(name);
        write_entries(&path, entries)?;
        info!("wrote {} records to {}", entries.len(), path.display());
        paths.push(path);
    }
    Ok(paths)
}

/// Writes `summary.json` and `report.txt` into `out_dir`.
pub fn write_summary(out_dir: &Path, summary: &RunSummary) -> std::io::Result<()> {
    fs::create_dir_all(out_dir)?;

    let json = render_summary_json(summary)?;
    write_text(&out_dir.join(SUMMARY_FILE), &json)?;

    let report = render_report_text(summary);
    write_text(&out_dir.join(REPORT_FILE), &report)?;
    Ok(())
}

pub fn ensemble_summary(
    folds: &FoldSet,
    out: &Stage1Output,
    params: &EnsembleParams,
) -> EnsembleSummary {
    let folds = folds
        .folds
        .iter()
        .map(|f| {
            let (missing, records, skipped) = match f.status {
                FoldStatus::Loaded { records, skipped } => (false, records, skipped),
                FoldStatus::Missing => (true, 0, 0),
            };
            FoldSummary {
                fold_id: f.fold_id,
                path: f.path.clone(),
                missing,
                records,
                skipped,
            }
        })
        .collect();

    EnsembleSummary {
        params: params.clone(),
        folds,
        n_images: out.stats.n_images,
        boxes_before: out.stats.total_before,
        low_conf_dropped: out.stats.low_conf_dropped,
        clusters: out.stats.n_clusters,
        clusters_below_min_folds: out.stats.clusters_below_min_folds,
        boxes_after: out.stats.total_after,
    }
}

pub fn selection_summary(out: &Stage2Output, params: &SelectorParams) -> SelectionSummary {
    let subjects = out
        .subjects
        .iter()
        .map(|s| SubjectSummary {
            subject_id: s.subject_id.clone(),
            range: s.range.as_ref().map(|r| (r.l, r.r)),
            window_length: s.range.as_ref().map_or(0, |r| r.window_length),
            missing_inside: s.range.as_ref().map_or(0, |r| r.missing_inside()),
            original: s.original_count(),
            kept: s.kept.len(),
            removed: s.removed.len(),
        })
        .collect();

    SelectionSummary {
        params: params.clone(),
        subjects,
        total_original: out.total_original(),
        total_kept: out.kept.len(),
        total_removed: out.removed.len(),
        unparsed_lines: out.unparsed.len(),
        no_data_subjects: out
            .no_data_subjects()
            .into_iter()
            .map(str::to_string)
            .collect(),
    }
}

fn write_entries(path: &Path, entries: &[SequenceEntry]) -> std::io::Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    for e in entries {
        writeln!(w, "{}", e.raw_record)?;
    }
    w.flush()
}

fn write_text(path: &Path, contents: &str) -> std::io::Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    w.write_all(contents.as_bytes())?;
    w.flush()
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage3_report.rs"]
mod tests;
