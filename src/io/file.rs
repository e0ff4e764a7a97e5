//! Reading and writing plaintext or gzip-compressed files.
//!
//! [`InputFile`] sniffs the gzip magic number, so compressed measurement
//! tables and feature files need no special extension. [`OutputFile`]
//! compresses when the output path ends in `.gz`, and writes to standard
//! output when no path is given.

use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::error::PimmsError;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Extensions that only name a compression layer.
const COMPRESSION_EXTENSIONS: [&str; 2] = ["gz", "bgz"];

/// Open a file, decompressing it if it starts with the gzip magic number.
/// Multi-member (e.g. bgzip) streams are read to the end.
fn open_decompressed(path: &Path) -> io::Result<Box<dyn Read>> {
    let mut file = BufReader::new(File::open(path)?);
    if file.fill_buf()?.starts_with(&GZIP_MAGIC) {
        Ok(Box::new(MultiGzDecoder::new(file)))
    } else {
        Ok(Box::new(file))
    }
}

/// Decode one raw line of a feature file. Bytes that are not valid UTF-8
/// are a [`PimmsError::GffParse`] at `line_number`.
pub fn decode_line(bytes: &[u8], line_number: usize) -> Result<String, PimmsError> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|_| PimmsError::GffParse {
            line_number,
            reason: "is not valid UTF-8".to_string(),
            line: String::from_utf8_lossy(bytes).trim_end().to_string(),
        })
}

/// Read the next line into `buffer` and decode it. `Ok(None)` at the end
/// of input.
pub fn read_decoded_line<R: BufRead>(
    reader: &mut R,
    buffer: &mut Vec<u8>,
    line_number: usize,
) -> Result<Option<String>, PimmsError> {
    buffer.clear();
    if reader.read_until(b'\n', buffer)? == 0 {
        return Ok(None);
    }
    decode_line(buffer, line_number).map(Some)
}

/// The extension that identifies a file's format, skipping a trailing
/// compression extension: `inserts.gff.gz` gives `gff`.
pub fn get_base_extension<P: AsRef<Path>>(filepath: P) -> Option<String> {
    let name = filepath.as_ref().file_name()?.to_str()?;
    let mut extensions: Vec<&str> = name.split('.').skip(1).collect();
    if extensions.len() > 1 && COMPRESSION_EXTENSIONS.contains(extensions.last()?) {
        extensions.pop();
    }
    extensions.last().map(|ext| ext.to_string())
}

/// A file to read, plaintext or gzip-compressed.
///
/// After [`InputFile::collect_metadata()`], `comments` holds the leading
/// comment lines and `skip_lines` their count, and
/// [`InputFile::continue_reading()`] resumes after them.
#[derive(Clone, Debug)]
pub struct InputFile {
    pub filepath: PathBuf,
    pub comments: Option<Vec<String>>,
    pub skip_lines: usize,
}

impl InputFile {
    pub fn new(filepath: impl Into<PathBuf>) -> Self {
        Self {
            filepath: filepath.into(),
            comments: None,
            skip_lines: 0,
        }
    }

    /// A buffered reader over the (decompressed) contents.
    pub fn reader(&self) -> io::Result<BufReader<Box<dyn Read>>> {
        Ok(BufReader::new(open_decompressed(&self.filepath)?))
    }

    /// Collect the lines starting with `comment` at the top of the file.
    /// Lines are kept verbatim, line endings included, so a header can be
    /// written back out unchanged.
    ///
    /// Returns whether any comment lines were found.
    ///
    /// # Errors
    /// A [`PimmsError::GffParse`] if a comment line is not valid UTF-8.
    pub fn collect_metadata(&mut self, comment: &str) -> Result<bool, PimmsError> {
        let mut reader = self.reader()?;
        let mut buffer = Vec::new();
        let mut comments = Vec::new();
        loop {
            buffer.clear();
            // the first non-comment line is left for the caller to decode
            if reader.read_until(b'\n', &mut buffer)? == 0
                || !buffer.starts_with(comment.as_bytes())
            {
                break;
            }
            comments.push(decode_line(&buffer, comments.len() + 1)?);
        }
        self.skip_lines = comments.len();
        let found = !comments.is_empty();
        self.comments = Some(comments);
        Ok(found)
    }

    /// A reader positioned after the comment lines found by
    /// [`InputFile::collect_metadata()`].
    pub fn continue_reading(&self) -> io::Result<BufReader<Box<dyn Read>>> {
        let mut reader = self.reader()?;
        let mut discard = Vec::new();
        for _ in 0..self.skip_lines {
            discard.clear();
            reader.read_until(b'\n', &mut discard)?;
        }
        Ok(reader)
    }
}

enum OutputTarget {
    File(PathBuf),
    Stdout,
}

/// A destination for output: a file (gzip-compressed when its name ends
/// in `.gz`) or standard output, with optional `header` text written
/// before anything else.
pub struct OutputFile {
    target: OutputTarget,
    pub header: Option<String>,
}

impl OutputFile {
    pub fn new(filepath: impl Into<PathBuf>, header: Option<String>) -> Self {
        Self {
            target: OutputTarget::File(filepath.into()),
            header,
        }
    }

    pub fn new_stdout(header: Option<String>) -> Self {
        Self {
            target: OutputTarget::Stdout,
            header,
        }
    }

    /// Create (or truncate) the destination and return a buffered writer
    /// that has already written the header.
    pub fn writer(&self) -> io::Result<Box<dyn Write>> {
        let mut writer: Box<dyn Write> = match &self.target {
            OutputTarget::Stdout => Box::new(BufWriter::new(io::stdout())),
            OutputTarget::File(path) if path.extension().map_or(false, |ext| ext == "gz") => {
                Box::new(GzEncoder::new(
                    BufWriter::new(File::create(path)?),
                    Compression::default(),
                ))
            }
            OutputTarget::File(path) => Box::new(BufWriter::new(File::create(path)?)),
        };
        if let Some(header) = &self.header {
            writer.write_all(header.as_bytes())?;
        }
        Ok(writer)
    }
}
