use memchr::{memchr, memchr_iter};
use memmap2::Mmap;
use serde::Deserialize;
use std::{fs::File, io::Read, path::Path, str};

use crate::processor::{
    LoadError,
    diagnostics::{Diagnostic, DiagnosticSink, TracingSink},
    row::{Row, Table},
};

/// Loader settings. The defaults give plain comma-separated parsing with one
/// tolerated trailing delimiter per data line.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Field separator, must be ASCII
    pub delimiter: char,
    /// Accept data lines with exactly one extra (ignored) field
    pub allow_trailing_delimiter: bool,
    /// Drop empty data lines silently instead of validating them
    pub skip_blank_lines: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        LoaderConfig {
            delimiter: ',',
            allow_trailing_delimiter: true,
            skip_blank_lines: false,
        }
    }
}

/// A data line the loader dropped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLine {
    pub line: usize,
    pub expected: usize,
    pub found: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub rows_loaded: usize,
    pub skipped: Vec<SkippedLine>,
}

/// Reads delimiter-separated text into a [`Table`] of raw string fields.
///
/// # Examples
///
/// ```rust,no_run
/// # use miniquery::{CsvLoader, TracingSink};
/// let table = CsvLoader::new().load("people.csv", &TracingSink).unwrap();
/// println!("{} rows", table.len());
/// ```
#[derive(Debug, Clone)]
pub struct CsvLoader {
    config: LoaderConfig,
}

impl CsvLoader {
    /// Loader with the default configuration
    pub fn new() -> Self {
        CsvLoader {
            config: LoaderConfig::default(),
        }
    }

    /// # Errors
    /// [`LoadError::InvalidDelimiter`] if the delimiter is not ASCII or is a
    /// line terminator.
    pub fn with_config(config: LoaderConfig) -> Result<Self, LoadError> {
        if !config.delimiter.is_ascii() || matches!(config.delimiter, '\n' | '\r') {
            return Err(LoadError::InvalidDelimiter(config.delimiter));
        }
        Ok(CsvLoader { config })
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Loads a file into memory using memory mapping.
    ///
    /// The first non-empty line is the header. Data lines whose field count
    /// does not match are dropped and reported to `sink`.
    ///
    /// # Errors
    /// Returns a [`LoadError`] if:
    /// - the file cannot be opened or mapped
    /// - the content is not valid UTF-8
    /// - there is no header line
    pub fn load<S>(&self, path: impl AsRef<Path>, sink: &S) -> Result<Table<String>, LoadError>
    where
        S: DiagnosticSink + ?Sized,
    {
        self.load_with_summary(path, sink).map(|(table, _)| table)
    }

    /// Same as [`CsvLoader::load`], also returning which lines were dropped
    pub fn load_with_summary<S>(
        &self,
        path: impl AsRef<Path>,
        sink: &S,
    ) -> Result<(Table<String>, LoadSummary), LoadError>
    where
        S: DiagnosticSink + ?Sized,
    {
        let path = path.as_ref();
        let file = File::open(path)?;

        // Mapping a zero-length file is not portable
        if file.metadata()?.len() == 0 {
            return Err(LoadError::MissingHeader);
        }

        let mmap = unsafe { Mmap::map(&file)? };
        let result = self.parse(&mmap[..], sink)?;
        tracing::debug!(
            path = %path.display(),
            rows = result.1.rows_loaded,
            skipped = result.1.skipped.len(),
            "csv loaded"
        );
        Ok(result)
    }

    /// Loads from any byte stream
    pub fn load_reader<R, S>(&self, mut reader: R, sink: &S) -> Result<Table<String>, LoadError>
    where
        R: Read,
        S: DiagnosticSink + ?Sized,
    {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        self.parse(&buf, sink).map(|(table, _)| table)
    }

    /// Parses an in-memory buffer
    pub fn load_bytes<S>(&self, buf: &[u8], sink: &S) -> Result<Table<String>, LoadError>
    where
        S: DiagnosticSink + ?Sized,
    {
        self.parse(buf, sink).map(|(table, _)| table)
    }

    fn parse<S>(&self, buf: &[u8], sink: &S) -> Result<(Table<String>, LoadSummary), LoadError>
    where
        S: DiagnosticSink + ?Sized,
    {
        let text = str::from_utf8(buf)?;
        let mut lines = Lines::new(text);

        // Parse header
        let headers: Vec<&str> = loop {
            match lines.next() {
                Some((_, line)) if line.is_empty() => continue,
                Some((_, line)) => break self.split_fields(line),
                None => return Err(LoadError::MissingHeader),
            }
        };
        let num_cols = headers.len();

        let mut table = Table::new();
        let mut summary = LoadSummary::default();
        let mut fields = Vec::with_capacity(num_cols + 1);

        for (line_no, line) in lines {
            if line.is_empty() && self.config.skip_blank_lines {
                continue;
            }

            fields.clear();
            self.split_into(line, &mut fields);

            let accepted = fields.len() == num_cols
                || (self.config.allow_trailing_delimiter && fields.len() == num_cols + 1);
            if !accepted {
                summary.skipped.push(SkippedLine {
                    line: line_no,
                    expected: num_cols,
                    found: fields.len(),
                });
                sink.emit(Diagnostic::RowValidation {
                    line: line_no,
                    expected: num_cols,
                    found: fields.len(),
                });
                continue;
            }

            let mut row = Row::with_capacity(num_cols);
            for (name, value) in headers.iter().zip(&fields) {
                row.insert(*name, value.to_string());
            }
            table.push(row);
        }

        summary.rows_loaded = table.len();
        Ok((table, summary))
    }

    fn split_fields<'a>(&self, line: &'a str) -> Vec<&'a str> {
        let mut fields = Vec::new();
        self.split_into(line, &mut fields);
        fields
    }

    fn split_into<'a>(&self, line: &'a str, fields: &mut Vec<&'a str>) {
        // ASCII is checked in `with_config`
        let delimiter = self.config.delimiter as u8;
        let mut field_start = 0;
        for pos in memchr_iter(delimiter, line.as_bytes()) {
            fields.push(&line[field_start..pos]);
            field_start = pos + 1;
        }
        fields.push(&line[field_start..]);
    }
}

impl Default for CsvLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Loads `path` with the default configuration, logging diagnostics via `tracing`
pub fn load(path: impl AsRef<Path>) -> Result<Table<String>, LoadError> {
    CsvLoader::new().load(path, &TracingSink)
}

/// Iterates `(1-based line number, line)` pairs, accepting `\n` and `\r\n`.
/// A terminator at the very end does not produce an extra empty line.
struct Lines<'a> {
    text: &'a str,
    pos: usize,
    line_no: usize,
}

impl<'a> Lines<'a> {
    fn new(text: &'a str) -> Self {
        Lines {
            text,
            pos: 0,
            line_no: 0,
        }
    }
}

impl<'a> Iterator for Lines<'a> {
    type Item = (usize, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.text.len() {
            return None;
        }

        let rest = &self.text[self.pos..];
        let (line, advance) = match memchr(b'\n', rest.as_bytes()) {
            Some(end) => (&rest[..end], end + 1),
            None => (rest, rest.len()),
        };
        self.pos += advance;
        self.line_no += 1;

        Some((self.line_no, line.strip_suffix('\r').unwrap_or(line)))
    }
}
