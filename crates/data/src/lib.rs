pub mod csv_loader;
pub mod date_parsers;

pub use csv_loader::ColumnLayout;
pub use date_parsers::{DateFormat, TextDateParser};

use std::io;
use std::path::PathBuf;
use tickstream_core::{Bar, DataError};
use tracing::debug;

/// A delimited-text bar file with a fixed column layout.
pub struct CsvFeed<P = DateFormat> {
    pub path: PathBuf,
    pub layout: ColumnLayout,
    parser: P,
    has_headers: bool,
}

impl CsvFeed<DateFormat> {
    /// `date, open, high, low, close, volume` with a header row.
    pub fn dohlcv(path: impl Into<PathBuf>, format: DateFormat) -> Self {
        Self::new(path, ColumnLayout::dohlcv(), format)
    }
}

impl<P: TextDateParser> CsvFeed<P> {
    pub fn new(path: impl Into<PathBuf>, layout: ColumnLayout, parser: P) -> Self {
        Self {
            path: path.into(),
            layout,
            parser,
            has_headers: true,
        }
    }

    /// Whether the first row is a header to skip (default `true`).
    pub fn has_headers(mut self, yes: bool) -> Self {
        self.has_headers = yes;
        self
    }

    /// Read the whole file.
    pub fn load(&self) -> Result<Vec<Bar>, DataError> {
        if !self.path.exists() {
            return Err(DataError::NotFound(format!(
                "CSV file not found: {}",
                self.path.display()
            )));
        }
        let file = std::fs::File::open(&self.path)?;
        let bars = self.from_reader(file)?;
        debug!(path = %self.path.display(), bars = bars.len(), "Loaded bar file");
        Ok(bars)
    }

    /// Read bars from any byte source using this feed's layout and parser.
    pub fn from_reader(&self, source: impl io::Read) -> Result<Vec<Bar>, DataError> {
        csv_loader::read_bars(source, &self.layout, &self.parser, self.has_headers)
    }
}

impl<P> std::fmt::Debug for CsvFeed<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsvFeed")
            .field("path", &self.path)
            .field("layout", &self.layout)
            .field("has_headers", &self.has_headers)
            .finish_non_exhaustive()
    }
}
