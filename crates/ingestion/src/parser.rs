//! Citation dataset parser
//!
//! Records look like:
//!
//! ```text
//! #*Title of the paper
//! #@Author One, Author Two
//! #t2008
//! #cVenue name
//! #index42
//! #%17
//! #%23
//! #!Abstract text
//! ```
//!
//! A record starts at its `#*` line and ends at the next `#*` line or at the
//! end of the stream.

use crate::errors::IngestionError;
use paperrank_common::embeddings::SemanticEncoder;
use paperrank_common::models::Paper;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::Instant;
use tracing::{info, instrument, warn};

/// Field marker at the start of a dataset line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Title,
    Authors,
    Year,
    Venue,
    Id,
    Reference,
    Abstract,
}

impl Marker {
    const PREFIXES: [(&'static str, Marker); 7] = [
        ("#*", Marker::Title),
        ("#@", Marker::Authors),
        ("#t", Marker::Year),
        ("#c", Marker::Venue),
        ("#index", Marker::Id),
        ("#%", Marker::Reference),
        ("#!", Marker::Abstract),
    ];

    /// Split a line into its marker and trimmed value.
    ///
    /// Returns `None` for lines that carry no known marker.
    pub fn split(line: &str) -> Option<(Marker, &str)> {
        Self::PREFIXES.iter().find_map(|(prefix, marker)| {
            line.strip_prefix(prefix).map(|value| (*marker, value.trim()))
        })
    }

    /// Dataset prefix for this marker
    pub fn prefix(&self) -> &'static str {
        Self::PREFIXES
            .iter()
            .find(|(_, marker)| marker == self)
            .map(|(prefix, _)| *prefix)
            .unwrap_or("#")
    }
}

/// Parser configuration
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Log progress every N records (0 disables progress logs)
    pub progress_every: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            progress_every: 10_000,
        }
    }
}

/// Counters collected while parsing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseStats {
    pub lines: usize,
    pub records: usize,
    pub identified: usize,
    pub with_abstract: usize,
    pub references: usize,
    pub ignored_lines: usize,
}

/// Output of a parse run: records in dataset order
#[derive(Debug, Clone)]
pub struct ParsedCorpus {
    pub papers: Vec<Paper>,
    pub stats: ParseStats,
}

/// Fields of the record currently being read.
///
/// Nothing outside the parser sees a record until `finish` is called.
#[derive(Debug)]
struct RecordBuilder {
    title: String,
    authors: Option<String>,
    year: Option<String>,
    venue: Option<String>,
    id: Option<String>,
    references: Vec<String>,
    abstract_text: Option<String>,
}

impl RecordBuilder {
    fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            authors: None,
            year: None,
            venue: None,
            id: None,
            references: Vec::new(),
            abstract_text: None,
        }
    }

    fn apply(&mut self, marker: Marker, value: &str) {
        match marker {
            Marker::Title => self.title = value.to_string(),
            Marker::Authors => self.authors = Some(value.to_string()),
            Marker::Year => self.year = Some(value.to_string()),
            Marker::Venue => self.venue = Some(value.to_string()),
            Marker::Id => self.id = Some(value.to_string()).filter(|id| !id.is_empty()),
            Marker::Reference => {
                if !value.is_empty() {
                    self.references.push(value.to_string());
                }
            }
            Marker::Abstract => self.abstract_text = Some(value.to_string()),
        }
    }

    /// Finalize the record, encoding the title when an abstract was seen
    fn finish(self, encoder: &SemanticEncoder) -> Paper {
        let semantic_vector = self
            .abstract_text
            .as_ref()
            .map(|_| encoder.encode(&self.title));

        Paper {
            id: self.id,
            title: self.title,
            authors: self.authors.unwrap_or_default(),
            year: self.year.unwrap_or_default(),
            venue: self.venue.unwrap_or_default(),
            abstract_text: self.abstract_text,
            references: self.references,
            semantic_vector,
            authority_score: 0.0,
        }
    }
}

/// Streaming parser for the citation dataset
pub struct CorpusParser {
    encoder: SemanticEncoder,
    config: ParserConfig,
}

impl CorpusParser {
    pub fn new(encoder: SemanticEncoder, config: ParserConfig) -> Self {
        Self { encoder, config }
    }

    /// Parse a dataset file
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn parse_file(&self, path: impl AsRef<Path>) -> Result<ParsedCorpus, IngestionError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => IngestionError::FileNotFound(path.display().to_string()),
            _ => IngestionError::IoError(e),
        })?;
        self.parse_reader(BufReader::new(file))
    }

    /// Parse any buffered byte stream. Invalid UTF-8 is replaced, not rejected.
    pub fn parse_reader<R: BufRead>(&self, mut reader: R) -> Result<ParsedCorpus, IngestionError> {
        let mut run = ParseRun::new(self);
        let mut buf = Vec::new();

        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            let line = String::from_utf8_lossy(&buf);
            run.feed(line.trim_end_matches(['\n', '\r']))?;
        }

        Ok(run.finish())
    }

    /// Parse lines already in memory
    pub fn parse_lines<I, S>(&self, lines: I) -> Result<ParsedCorpus, IngestionError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut run = ParseRun::new(self);
        for line in lines {
            run.feed(line.as_ref())?;
        }
        Ok(run.finish())
    }
}

/// State of one pass over a dataset
struct ParseRun<'a> {
    parser: &'a CorpusParser,
    current: Option<RecordBuilder>,
    papers: Vec<Paper>,
    stats: ParseStats,
    started: Instant,
}

impl<'a> ParseRun<'a> {
    fn new(parser: &'a CorpusParser) -> Self {
        Self {
            parser,
            current: None,
            papers: Vec::new(),
            stats: ParseStats::default(),
            started: Instant::now(),
        }
    }

    fn feed(&mut self, line: &str) -> Result<(), IngestionError> {
        self.stats.lines += 1;

        let Some((marker, value)) = Marker::split(line) else {
            self.stats.ignored_lines += 1;
            return Ok(());
        };

        if marker == Marker::Title {
            self.flush();
            self.current = Some(RecordBuilder::new(value));
            return Ok(());
        }

        match self.current.as_mut() {
            Some(record) => {
                record.apply(marker, value);
                Ok(())
            }
            None => Err(IngestionError::Parse {
                line: self.stats.lines,
                message: format!("'{}' field appears before any title", marker.prefix()),
            }),
        }
    }

    fn flush(&mut self) {
        let Some(record) = self.current.take() else {
            return;
        };
        let paper = record.finish(&self.parser.encoder);

        self.stats.records += 1;
        self.stats.references += paper.references.len();
        if paper.id.is_some() {
            self.stats.identified += 1;
        } else {
            warn!(title = %paper.title, line = self.stats.lines, "Record has no id; it will not be searchable");
        }
        if paper.abstract_text.is_some() {
            self.stats.with_abstract += 1;
        }

        let every = self.parser.config.progress_every;
        if every > 0 && self.stats.records % every == 0 {
            info!(records = self.stats.records, lines = self.stats.lines, "Parsing progress");
        }

        self.papers.push(paper);
    }

    fn finish(mut self) -> ParsedCorpus {
        self.flush();

        let elapsed = self.started.elapsed();
        paperrank_common::metrics::record_ingestion(elapsed.as_secs_f64(), self.stats.records);
        info!(
            records = self.stats.records,
            identified = self.stats.identified,
            with_abstract = self.stats.with_abstract,
            references = self.stats.references,
            elapsed_ms = elapsed.as_millis() as u64,
            "Dataset parsed"
        );

        ParsedCorpus {
            papers: self.papers,
            stats: self.stats,
        }
    }
}
