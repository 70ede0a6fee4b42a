//! Reading and writing record archives.
//!
//! Archives are JSON lines, one [`GameRecord`] per line, gzip-compressed
//! when the file name ends in `.gz`.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result, bail};
use flate2::Compression;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;

use crate::error::ReadError;
use crate::record::GameRecord;

/// Anything that yields records for a pipeline run.
pub trait RecordSource: Iterator<Item = Result<GameRecord, ReadError>> + Send {}

impl<T> RecordSource for T where T: Iterator<Item = Result<GameRecord, ReadError>> + Send {}

/// Destination for accepted records.
pub trait RecordSink {
    fn write_record(&mut self, game: &GameRecord) -> Result<()>;

    /// Push buffered output down to storage.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

impl RecordSink for Vec<GameRecord> {
    fn write_record(&mut self, game: &GameRecord) -> Result<()> {
        self.push(game.clone());
        Ok(())
    }
}

fn is_gzip(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("gz"))
}

/// File name used to identify an archive.
pub fn archive_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// =============================================================================
// Reading
// =============================================================================

/// Iterator over the records of a JSON-lines stream.
///
/// Blank lines are skipped. A line that is not a record yields
/// [`ReadError::Malformed`] and reading continues; a failing reader yields
/// [`ReadError::Io`] and ends the iteration.
pub struct JsonLinesReader<R> {
    reader: R,
    line: String,
    line_no: usize,
    done: bool,
}

impl<R: BufRead> JsonLinesReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            line_no: 0,
            done: false,
        }
    }
}

impl<R: BufRead> Iterator for JsonLinesReader<R> {
    type Item = Result<GameRecord, ReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            self.line.clear();
            match self.reader.read_line(&mut self.line) {
                Ok(0) => self.done = true,
                Ok(_) => {
                    self.line_no += 1;
                    let text = self.line.trim();
                    if text.is_empty() {
                        continue;
                    }
                    return Some(serde_json::from_str(text).map_err(|e| ReadError::Malformed {
                        line: self.line_no,
                        message: e.to_string(),
                    }));
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(ReadError::Io(e)));
                }
            }
        }
        None
    }
}

/// Open an archive for reading.
pub fn open_records(path: &Path) -> Result<JsonLinesReader<Box<dyn BufRead + Send>>> {
    let file =
        File::open(path).with_context(|| format!("failed to open archive {}", path.display()))?;
    let reader: Box<dyn BufRead + Send> = if is_gzip(path) {
        Box::new(BufReader::new(MultiGzDecoder::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };
    Ok(JsonLinesReader::new(reader))
}

// =============================================================================
// Writing
// =============================================================================

enum Output {
    Plain(BufWriter<File>),
    Gzip(GzEncoder<BufWriter<File>>),
}

impl Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Output::Plain(w) => w.write(buf),
            Output::Gzip(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Output::Plain(w) => w.flush(),
            Output::Gzip(w) => w.flush(),
        }
    }
}

/// Writes records as JSON lines to a file.
pub struct JsonLinesWriter {
    out: Output,
}

impl JsonLinesWriter {
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("failed to create output file {}", path.display()))?;
        let buffered = BufWriter::new(file);
        let out = if is_gzip(path) {
            Output::Gzip(GzEncoder::new(buffered, Compression::default()))
        } else {
            Output::Plain(buffered)
        };
        Ok(Self { out })
    }

    /// Flush and, for gzip output, write the stream trailer.
    pub fn finish(mut self) -> Result<()> {
        if let Output::Gzip(w) = &mut self.out {
            w.try_finish().context("failed to finish gzip stream")?;
        }
        self.out.flush().context("output file write error")
    }
}

impl RecordSink for JsonLinesWriter {
    fn write_record(&mut self, game: &GameRecord) -> Result<()> {
        serde_json::to_writer(&mut self.out, game).context("failed to marshal record")?;
        self.out
            .write_all(b"\n")
            .context("output file write error")
    }

    fn flush(&mut self) -> Result<()> {
        self.out.flush().context("output file write error")
    }
}

// =============================================================================
// Side files
// =============================================================================

/// Parse a two-column `archive, source name` file. Single-column lines
/// are ignored.
pub fn parse_source_names(text: &str) -> Result<HashMap<String, String>> {
    let mut names = HashMap::new();
    for line in text.lines() {
        let cols: Vec<&str> = line.split(',').collect();
        match cols.as_slice() {
            [_] => {}
            [archive, source] => {
                names.insert(archive.trim().to_string(), source.trim().to_string());
            }
            _ => bail!("sources file should have two columns, found {}", cols.len()),
        }
    }
    Ok(names)
}

pub fn load_source_names(path: &Path) -> Result<HashMap<String, String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to open sources file {}", path.display()))?;
    parse_source_names(&text)
}

/// One pattern per non-empty line.
pub fn load_blacklist(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to open blacklist file {}", path.display()))?;
    Ok(text
        .lines()
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}
