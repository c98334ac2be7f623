use std::io::BufRead;
use std::path::Path;

use regex::Regex;
use tracing::{info, warn};

use crate::input::reader::{for_each_line, open_maybe_gz};
use crate::input::{InputError, require_file};
use crate::model::sequence::{Confidence, SequenceEntry};

/// Extracts `(subject_id, frame_index)` from a record line. The subject token is
/// the prefix followed by digits; the frame index follows an underscore and may
/// be zero padded.
#[derive(Debug, Clone)]
pub struct FrameIdParser {
    re: Regex,
}

impl FrameIdParser {
    pub fn new(subject_prefix: &str) -> Result<Self, InputError> {
        let pattern = format!(r"({}[0-9]+)_0*([0-9]+)", regex::escape(subject_prefix));
        let re = Regex::new(&pattern).map_err(|e| {
            InputError::InvalidInput(format!("bad subject prefix {subject_prefix:?}: {e}"))
        })?;
        Ok(Self { re })
    }

    pub fn parse(&self, line: &str) -> Option<(String, u64)> {
        let caps = self.re.captures(line)?;
        let subject = caps.get(1)?.as_str().to_string();
        let frame = caps.get(2)?.as_str().parse::<u64>().ok()?;
        Some((subject, frame))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnparsedLine {
    pub line_no: usize,
    pub text: String,
}

#[derive(Debug, Clone, Default)]
pub struct SequenceInput {
    pub entries: Vec<SequenceEntry>,
    pub unparsed: Vec<UnparsedLine>,
}

pub fn load_sequence_entries(
    path: &Path,
    parser: &FrameIdParser,
) -> Result<SequenceInput, InputError> {
    let path = require_file(path)?;
    let mut reader = open_maybe_gz(&path)?;
    let input = parse_sequence_lines(reader.as_mut(), parser)?;
    info!(
        "read {} sequence entries from {} ({} unparsed)",
        input.entries.len(),
        path.display(),
        input.unparsed.len()
    );
    Ok(input)
}

pub fn parse_sequence_lines(
    reader: &mut dyn BufRead,
    parser: &FrameIdParser,
) -> Result<SequenceInput, InputError> {
    let mut out = SequenceInput::default();
    for_each_line(reader, |line_no, line| {
        if line.trim().is_empty() {
            return;
        }
        match parser.parse(line) {
            Some((subject_id, frame_index)) => out.entries.push(SequenceEntry {
                subject_id,
                frame_index,
                confidence: Confidence::from_token(line.split_whitespace().nth(2)),
                raw_record: line.to_string(),
            }),
            None => {
                warn!("cannot parse subject/frame, skipping line {}: {}", line_no, line);
                out.unparsed.push(UnparsedLine {
                    line_no,
                    text: line.to_string(),
                });
            }
        }
    })?;
    Ok(out)
}
