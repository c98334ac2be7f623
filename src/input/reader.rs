use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use flate2::read::MultiGzDecoder;

use crate::input::InputError;

pub fn open_maybe_gz(path: &Path) -> Result<Box<dyn BufRead>, InputError> {
    let file = File::open(path)?;
    if path.extension().is_some_and(|ext| ext == "gz") {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Calls `f(line_no, line)` for every line, 1-based, with the line terminator
/// (`\n` or `\r\n`) removed.
pub fn for_each_line(
    reader: &mut dyn BufRead,
    mut f: impl FnMut(usize, &str),
) -> Result<(), InputError> {
    let mut buf = String::new();
    let mut line_no = 0usize;
    loop {
        buf.clear();
        let read = reader.read_line(&mut buf)?;
        if read == 0 {
            break;
        }
        line_no += 1;
        let line = buf
            .strip_suffix('\n')
            .map(|l| l.strip_suffix('\r').unwrap_or(l))
            .unwrap_or(&buf);
        f(line_no, line);
    }
    Ok(())
}
