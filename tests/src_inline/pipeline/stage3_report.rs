use super::*;
use crate::input::{FrameIdParser, load_folds, load_sequence_entries};
use crate::model::geometry::BBox;
use crate::pipeline::stage1_ensemble::run_stage1;
use crate::pipeline::stage2_select::run_stage2;
use std::sync::atomic::{AtomicUsize, Ordering};

static DIR_COUNTER: AtomicUsize = AtomicUsize::new(0);

fn make_temp_dir() -> PathBuf {
    let mut dir = std::env::temp_dir();
    let id = DIR_COUNTER.fetch_add(1, Ordering::SeqCst);
    dir.push(format!("seqfuse_report_test_{}_{}", std::process::id(), id));
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn test_write_fused_format() {
    let dir = make_temp_dir();
    let path = dir.join("nested").join(FUSED_FILE);
    let fused = vec![
        FusedDetection {
            image_id: "img1".to_string(),
            class_id: 0,
            confidence: 0.9,
            bbox: BBox::new(0.4857, 0.4857, 10.4857, 10.4857),
            n_members: 2,
            n_folds: 2,
        },
        FusedDetection {
            image_id: "img2".to_string(),
            class_id: 3,
            confidence: 0.123456,
            bbox: BBox::new(2.5, 3.5, 20.5, 21.5),
            n_members: 3,
            n_folds: 3,
        },
    ];
    write_fused(&path, &fused).unwrap();
    assert_eq!(
        read_lines(&path),
        vec!["img1 0 0.90000 0 0 10 10", "img2 3 0.12346 2 4 20 22"]
    );
}

#[test]
fn test_fold_files_to_selection_outputs() {
    let dir = make_temp_dir();
    let fold0 = dir.join("fold0.txt");
    let fold1 = dir.join("fold1.txt");
    let fold2 = dir.join("fold2_missing.txt");
    fs::write(
        &fold0,
        "patient1_0001 0 0.9 0 0 10 10\n\
         patient1_0002 0 0.8 0 0 10 10\n\
         patient1_0009 0 0.7 0 0 10 10\n\
         patient1_0030 0 0.6 40 40 60 60\n",
    )
    .unwrap();
    fs::write(
        &fold1,
        "patient1_0001 0 0.5 0 0 10 10\n\
         patient1_0002 0 0.5 0 0 10 10\n\
         patient1_0009 0 0.5 0 0 10 10\n\
         broken line\n",
    )
    .unwrap();

    let ens_params = EnsembleParams::default();
    let folds = load_folds(&[fold0, fold1, fold2]).unwrap();
    let stage1 = run_stage1(&folds, &ens_params);

    let fused_path = dir.join(FUSED_FILE);
    write_fused(&fused_path, &stage1.fused).unwrap();
    assert_eq!(
        read_lines(&fused_path),
        vec![
            "patient1_0001 0 0.90000 0 0 10 10",
            "patient1_0002 0 0.80000 0 0 10 10",
            "patient1_0009 0 0.70000 0 0 10 10",
        ]
    );

    let sel_params = SelectorParams::default();
    let parser = FrameIdParser::new(&sel_params.subject_prefix).unwrap();
    let seq = load_sequence_entries(&fused_path, &parser).unwrap();
    let stage2 = run_stage2(seq, &sel_params);

    let out_dir = dir.join("out");
    let written = write_selection(&out_dir, &stage2).unwrap();
    assert_eq!(written.len(), 3);
    assert_eq!(
        read_lines(&out_dir.join(KEPT_FILE)),
        vec![
            "patient1_0001 0 0.90000 0 0 10 10",
            "patient1_0002 0 0.80000 0 0 10 10",
        ]
    );
    assert_eq!(
        read_lines(&out_dir.join(REMOVED_FILE)),
        vec!["patient1_0009 0 0.70000 0 0 10 10"]
    );
    assert_eq!(
        read_lines(&out_dir.join(REMOVED_SORTED_FILE)),
        vec!["patient1_0009 0 0.70000 0 0 10 10"]
    );

    let mut summary = RunSummary::new();
    summary.ensemble = Some(ensemble_summary(&folds, &stage1, &ens_params));
    summary.selection = Some(selection_summary(&stage2, &sel_params));
    summary.outputs = written;
    write_summary(&out_dir, &summary).unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out_dir.join(SUMMARY_FILE)).unwrap()).unwrap();
    assert_eq!(json["ensemble"]["boxes_before"], 7);
    assert_eq!(json["ensemble"]["clusters"], 4);
    assert_eq!(json["ensemble"]["clusters_below_min_folds"], 1);
    assert_eq!(json["ensemble"]["boxes_after"], 3);
    assert_eq!(json["ensemble"]["folds"][1]["skipped"], 1);
    assert_eq!(json["ensemble"]["folds"][2]["missing"], true);
    assert_eq!(json["selection"]["total_original"], 3);
    assert_eq!(json["selection"]["total_kept"], 2);
    assert_eq!(json["selection"]["subjects"][0]["subject_id"], "patient1");
    assert_eq!(json["selection"]["subjects"][0]["range"][0], 1);
    assert_eq!(json["selection"]["subjects"][0]["range"][1], 2);

    let report = fs::read_to_string(out_dir.join(REPORT_FILE)).unwrap();
    assert!(report.contains("Fold 2: missing"));
    assert!(report.contains("Boxes after ensembling: 3"));
    assert!(report.contains("patient1: best range 1..=2"));
}

#[test]
fn test_selection_summary_lists_no_data_subjects() {
    let out = Stage2Output {
        subjects: vec![crate::pipeline::stage2_select::SubjectSelection {
            subject_id: "patient7".to_string(),
            range: None,
            kept: Vec::new(),
            removed: Vec::new(),
        }],
        ..Stage2Output::default()
    };
    let summary = selection_summary(&out, &SelectorParams::default());
    assert_eq!(summary.no_data_subjects, vec!["patient7".to_string()]);
    assert_eq!(summary.subjects[0].range, None);
    assert_eq!(summary.subjects[0].window_length, 0);
}
