//! PaperRank Ingestion
//!
//! Turns a line-oriented citation dataset into paper records:
//! 1. Reads the dataset line by line
//! 2. Accumulates each record's fields in a builder
//! 3. Encodes the title of every record that carries an abstract
//! 4. Emits finished records in dataset order

pub mod errors;
pub mod parser;

pub use errors::IngestionError;
pub use parser::{CorpusParser, Marker, ParseStats, ParsedCorpus, ParserConfig};
