use std::fs::{self, File};
use std::io::{BufWriter, Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use flate2::Compression;
use flate2::write::GzEncoder;

use super::records::{RecordIssue, parse_record_line};
use super::sequence::parse_sequence_lines;
use super::*;
use crate::model::sequence::Confidence;

static DIR_COUNTER: AtomicUsize = AtomicUsize::new(0);

fn make_temp_dir() -> PathBuf {
    let mut dir = std::env::temp_dir();
    let id = DIR_COUNTER.fetch_add(1, Ordering::SeqCst);
    dir.push(format!("seqfuse_input_test_{}_{}", std::process::id(), id));
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_file(path: &Path, contents: &str) {
    let mut f = BufWriter::new(File::create(path).unwrap());
    f.write_all(contents.as_bytes()).unwrap();
}

fn write_gz(path: &Path, contents: &str) {
    let mut enc = GzEncoder::new(File::create(path).unwrap(), Compression::default());
    enc.write_all(contents.as_bytes()).unwrap();
    enc.finish().unwrap();
}

#[test]
fn test_parse_record_line_basic() {
    let rec = parse_record_line("patient0001_0005 0 0.91234 10 20 30.5 40")
        .unwrap()
        .unwrap();
    assert_eq!(rec.id, "patient0001_0005");
    assert_eq!(rec.class_id, 0);
    assert!((rec.confidence - 0.91234).abs() < 1e-12);
    assert_eq!(rec.bbox.coords(), [10.0, 20.0, 30.5, 40.0]);
}

#[test]
fn test_parse_record_line_float_class_and_extra_fields() {
    let rec = parse_record_line("img 2.0 0.5 1 2 3 4 trailing junk")
        .unwrap()
        .unwrap();
    assert_eq!(rec.class_id, 2);
}

#[test]
fn test_parse_record_line_blank_and_errors() {
    assert_eq!(parse_record_line("   \t ").unwrap(), None);
    assert_eq!(
        parse_record_line("img 0 0.5 1 2 3"),
        Err(RecordIssue::TooFewFields(6))
    );
    match parse_record_line("img 0 high 1 2 3 4") {
        Err(RecordIssue::NonNumeric { field, value }) => {
            assert_eq!(field, "confidence");
            assert_eq!(value, "high");
        }
        other => panic!("unexpected: {other:?}"),
    }
    assert!(parse_record_line("img 0 NaN 1 2 3 4").is_err());
    assert!(parse_record_line("img 0 0.5 inf 2 3 4").is_err());
}

#[test]
fn test_load_folds_groups_by_image_and_tags_folds() {
    let dir = make_temp_dir();
    let f0 = dir.join("fold0.txt");
    let f1 = dir.join("fold1.txt.gz");
    write_file(&f0, "imgB 0 0.9 0 0 10 10\nimgA 0 0.8 1 1 5 5\n\n");
    write_gz(&f1, "imgA 1 0.7 1 1 6 6\nbroken line\n");

    let set = load_folds(&[f0.clone(), f1.clone()]).unwrap();
    let ids: Vec<&String> = set.images.keys().collect();
    assert_eq!(ids, vec!["imgA", "imgB"]);

    let a = &set.images["imgA"];
    assert_eq!(a.len(), 2);
    assert_eq!(a[0].fold_id, 0);
    assert_eq!(a[1].fold_id, 1);
    assert_eq!(a[1].class_id, 1);

    assert_eq!(
        set.folds[0].status,
        FoldStatus::Loaded {
            records: 2,
            skipped: 0
        }
    );
    assert_eq!(
        set.folds[1].status,
        FoldStatus::Loaded {
            records: 1,
            skipped: 1
        }
    );
    assert_eq!(set.n_detections(), 3);
}

#[test]
fn test_load_folds_skips_missing_file() {
    let dir = make_temp_dir();
    let present = dir.join("fold1.txt");
    write_file(&present, "img 0 0.9 0 0 10 10\n");
    let absent = dir.join("fold0.txt");

    let set = load_folds(&[absent, present]).unwrap();
    assert_eq!(set.folds[0].status, FoldStatus::Missing);
    assert_eq!(set.n_folds_loaded(), 1);
    assert_eq!(set.missing_folds().len(), 1);
    // Fold ids stay positional even when an earlier fold is missing.
    assert_eq!(set.images["img"][0].fold_id, 1);
}

#[test]
fn test_frame_id_parser() {
    let parser = FrameIdParser::new("patient").unwrap();
    assert_eq!(
        parser.parse("patient0012_0007 0 0.5 1 2 3 4"),
        Some(("patient0012".to_string(), 7))
    );
    assert_eq!(
        parser.parse("x/patient3_000"),
        Some(("patient3".to_string(), 0))
    );
    assert_eq!(parser.parse("subject1_0001 0 0.5 1 2 3 4"), None);
    assert_eq!(parser.parse("patient_0001"), None);

    let custom = FrameIdParser::new("P").unwrap();
    assert_eq!(custom.parse("P1_0005"), Some(("P1".to_string(), 5)));
}

#[test]
fn test_frame_id_parser_escapes_prefix() {
    let parser = FrameIdParser::new("a.b").unwrap();
    assert_eq!(parser.parse("a.b1_02"), Some(("a.b1".to_string(), 2)));
    assert_eq!(parser.parse("axb1_02"), None);
}

#[test]
fn test_parse_sequence_lines_confidence_and_unparsed() {
    let parser = FrameIdParser::new("patient").unwrap();
    let text = "patient1_0001 0 0.75 1 2 3 4\nnoise line\npatient1_0002 0 n/a\n\npatient2_0010\r\n";
    let mut cursor = Cursor::new(text.as_bytes().to_vec());
    let input = parse_sequence_lines(&mut cursor, &parser).unwrap();

    assert_eq!(input.entries.len(), 3);
    assert_eq!(input.entries[0].confidence, Confidence::Known(0.75));
    assert_eq!(input.entries[1].confidence, Confidence::Unknown);
    assert_eq!(input.entries[2].confidence, Confidence::Unknown);
    assert_eq!(input.entries[2].raw_record, "patient2_0010");
    assert_eq!(input.entries[2].frame_index, 10);

    assert_eq!(
        input.unparsed,
        vec![UnparsedLine {
            line_no: 2,
            text: "noise line".to_string()
        }]
    );
}

#[test]
fn test_load_sequence_entries_missing_primary_input() {
    let dir = make_temp_dir();
    let parser = FrameIdParser::new("patient").unwrap();
    let err = load_sequence_entries(&dir.join("nope.txt"), &parser).unwrap_err();
    assert!(matches!(err, InputError::MissingInput(_)));
}

#[test]
fn test_load_sequence_entries_gz() {
    let dir = make_temp_dir();
    let path = dir.join("fused.txt.gz");
    write_gz(&path, "patient1_0003 0 0.50000 1 2 3 4\n");
    let parser = FrameIdParser::new("patient").unwrap();
    let input = load_sequence_entries(&path, &parser).unwrap();
    assert_eq!(input.entries.len(), 1);
    assert_eq!(input.entries[0].frame_index, 3);
}
