use crate::report::{EnsembleSummary, RunSummary, SelectionSummary, format_confidence};

pub fn render_report_text(summary: &RunSummary) -> String {
    let mut out = String::new();

    out.push_str("Fold Ensemble & Sequence Range Report\n");
    out.push_str("=====================================\n");
    out.push_str(&format!("{} {}\n\n", summary.tool, summary.version));

    if let Some(ens) = &summary.ensemble {
        render_ensemble(&mut out, ens);
    }
    if let Some(sel) = &summary.selection {
        render_selection(&mut out, sel);
    }

    if !summary.outputs.is_empty() {
        out.push_str("Outputs\n");
        for path in &summary.outputs {
            out.push_str(&format!("  {}\n", path.display()));
        }
    }

    out
}

fn render_ensemble(out: &mut String, ens: &EnsembleSummary) {
    out.push_str("1. Fold ensemble\n");
    out.push_str(&format!(
        "IoU threshold: {}, min folds: {}, min confidence to join: {}\n",
        format_confidence(ens.params.iou_threshold),
        ens.params.min_folds,
        format_confidence(ens.params.min_conf_join)
    ));
    for fold in &ens.folds {
        if fold.missing {
            out.push_str(&format!(
                "Fold {}: missing ({})\n",
                fold.fold_id,
                fold.path.display()
            ));
        } else {
            out.push_str(&format!(
                "Fold {}: {} boxes, {} skipped lines ({})\n",
                fold.fold_id,
                fold.records,
                fold.skipped,
                fold.path.display()
            ));
        }
    }
    out.push_str(&format!("Images: {}\n", ens.n_images));
    out.push_str(&format!("Boxes before ensembling: {}\n", ens.boxes_before));
    out.push_str(&format!(
        "Dropped below join confidence: {}\n",
        ens.low_conf_dropped
    ));
    out.push_str(&format!(
        "Clusters: {} ({} below min folds)\n",
        ens.clusters, ens.clusters_below_min_folds
    ));
    out.push_str(&format!("Boxes after ensembling: {}\n\n", ens.boxes_after));
}

fn render_selection(out: &mut String, sel: &SelectionSummary) {
    out.push_str("2. Sequence range selection\n");
    out.push_str(&format!(
        "Tolerance: {}, subject prefix: {}\n",
        sel.params.tolerance, sel.params.subject_prefix
    ));
    for s in &sel.subjects {
        match s.range {
            Some((l, r)) => {
                out.push_str(&format!(
                    "{}: best range {}..={} (length {}, missing {}), original {}, kept {}, removed {}\n",
                    s.subject_id,
                    l,
                    r,
                    s.window_length,
                    s.missing_inside,
                    s.original,
                    s.kept,
                    s.removed
                ));
            }
            None => out.push_str(&format!("{}: no data\n", s.subject_id)),
        }
    }
    out.push_str(&format!(
        "Total: original {}, kept {}, removed {}\n",
        sel.total_original, sel.total_kept, sel.total_removed
    ));
    if sel.unparsed_lines > 0 {
        out.push_str(&format!("Unparsed lines: {}\n", sel.unparsed_lines));
    }
    if !sel.no_data_subjects.is_empty() {
        out.push_str(&format!(
            "Subjects without data: {}\n",
            sel.no_data_subjects.join(", ")
        ));
    }
    out.push('\n');
}
