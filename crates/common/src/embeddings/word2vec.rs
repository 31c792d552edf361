//! word2vec model loading
//!
//! Supports the two formats the reference word2vec tool writes:
//! - Text: optional `<count> <dim>` header, then `<word> <v1> ... <vN>` lines
//!   (GloVe files, which have no header, load the same way)
//! - Binary: `<count> <dim>\n` header, then per word the token, a space and
//!   `dim` little-endian `f32` values

use super::EmbeddingTable;
use crate::errors::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::time::Instant;
use tracing::{info, instrument, warn};

/// Largest vector width a model header may declare
pub const MAX_DIMENSION: usize = 65_536;

/// Reject header dimensions that are zero or implausibly large
fn check_dimension(dimension: usize) -> std::result::Result<usize, String> {
    if dimension == 0 {
        return Err("header declares zero dimensions".to_string());
    }
    if dimension > MAX_DIMENSION {
        return Err(format!(
            "header declares {} dimensions, more than the supported {}",
            dimension, MAX_DIMENSION
        ));
    }
    Ok(dimension)
}

/// On-disk format of a word2vec model
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingFormat {
    /// `.bin` files are binary, everything else is text
    #[default]
    Auto,
    Text,
    Binary,
}

/// Options for `Word2VecTable::load`
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub format: EmbeddingFormat,

    /// Stop after this many words (models are usually frequency sorted)
    pub max_words: Option<usize>,
}

/// Embedding table backed by one contiguous buffer.
#[derive(Debug, Clone)]
pub struct Word2VecTable {
    dimension: usize,
    rows: HashMap<String, usize>,
    data: Vec<f32>,
}

impl Word2VecTable {
    /// Build a table from in-memory entries.
    ///
    /// Every vector must have `dimension` values. The first entry for a
    /// duplicated word wins.
    pub fn from_entries(
        dimension: usize,
        entries: impl IntoIterator<Item = (String, Vec<f32>)>,
    ) -> Result<Self> {
        let mut table = Self::with_dimension(dimension);
        for (word, vector) in entries {
            if vector.len() != dimension {
                return Err(AppError::Validation {
                    message: format!(
                        "vector for '{}' has {} values, expected {}",
                        word,
                        vector.len(),
                        dimension
                    ),
                });
            }
            table.insert(word, &vector);
        }
        Ok(table)
    }

    /// Load a model file
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>, options: &LoadOptions) -> Result<Self> {
        let path = path.as_ref();
        let started = Instant::now();
        let load_error = |message: String| AppError::EmbeddingLoad {
            path: path.display().to_string(),
            message,
        };

        let file = File::open(path).map_err(|e| load_error(e.to_string()))?;
        let reader = BufReader::new(file);

        let format = match options.format {
            EmbeddingFormat::Auto => {
                let is_binary = path
                    .extension()
                    .map(|ext| ext.eq_ignore_ascii_case("bin"))
                    .unwrap_or(false);
                if is_binary {
                    EmbeddingFormat::Binary
                } else {
                    EmbeddingFormat::Text
                }
            }
            explicit => explicit,
        };

        let table = match format {
            EmbeddingFormat::Binary => Self::read_binary(reader, options.max_words),
            _ => Self::read_text(reader, options.max_words),
        }
        .map_err(load_error)?;

        if table.is_empty() {
            return Err(load_error("model contains no vectors".to_string()));
        }

        info!(
            words = table.vocabulary_size(),
            dimension = table.dimension,
            format = ?format,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Embedding model loaded"
        );

        Ok(table)
    }

    fn with_dimension(dimension: usize) -> Self {
        Self {
            dimension,
            rows: HashMap::new(),
            data: Vec::new(),
        }
    }

    fn insert(&mut self, word: String, vector: &[f32]) {
        if self.rows.contains_key(&word) {
            return;
        }
        let row = self.rows.len();
        self.rows.insert(word, row);
        self.data.extend_from_slice(vector);
    }

    fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn read_text<R: BufRead>(
        reader: R,
        max_words: Option<usize>,
    ) -> std::result::Result<Self, String> {
        let mut table: Option<Self> = None;
        let limit = max_words.unwrap_or(usize::MAX);

        for (index, line) in reader.lines().enumerate() {
            let line_no = index + 1;
            let line = line.map_err(|e| format!("line {}: {}", line_no, e))?;
            let mut parts = line.split_whitespace();
            let Some(word) = parts.next() else {
                continue;
            };
            let values: Vec<&str> = parts.collect();

            if index == 0 && values.len() == 1 {
                if let (Ok(_), Ok(dimension)) = (word.parse::<usize>(), values[0].parse::<usize>()) {
                    table = Some(Self::with_dimension(check_dimension(dimension)?));
                    continue;
                }
            }

            let table = table.get_or_insert_with(|| Self::with_dimension(values.len()));
            if table.rows.len() >= limit {
                break;
            }
            if values.len() != table.dimension || values.is_empty() {
                return Err(format!(
                    "line {}: expected {} values for '{}', found {}",
                    line_no,
                    table.dimension,
                    word,
                    values.len()
                ));
            }

            let vector = values
                .iter()
                .map(|v| v.parse::<f32>())
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| format!("line {}: {}", line_no, e))?;
            table.insert(word.to_string(), &vector);
        }

        table.ok_or_else(|| "model file is empty".to_string())
    }

    fn read_binary<R: BufRead>(
        mut reader: R,
        max_words: Option<usize>,
    ) -> std::result::Result<Self, String> {
        let mut header = String::new();
        reader
            .read_line(&mut header)
            .map_err(|e| format!("header: {}", e))?;
        let mut fields = header.split_whitespace();
        let (Some(count), Some(dimension)) = (fields.next(), fields.next()) else {
            return Err(format!("malformed header '{}'", header.trim()));
        };
        let count: usize = count
            .parse()
            .map_err(|_| format!("malformed word count '{}'", count))?;
        let dimension: usize = dimension
            .parse()
            .map_err(|_| format!("malformed dimension '{}'", dimension))?;
        let dimension = check_dimension(dimension)?;
        let vector_len = dimension
            .checked_mul(std::mem::size_of::<f32>())
            .ok_or_else(|| format!("dimension {} overflows the vector size", dimension))?;

        let wanted = max_words.map_or(count, |limit| limit.min(count));
        let mut table = Self::with_dimension(dimension);
        let mut word_bytes = Vec::new();
        let mut vector_bytes = vec![0u8; vector_len];
        let mut vector = vec![0.0f32; dimension];

        for position in 0..wanted {
            word_bytes.clear();
            reader
                .read_until(b' ', &mut word_bytes)
                .map_err(|e| format!("word {}: {}", position, e))?;
            if word_bytes.last() != Some(&b' ') {
                return Err(format!(
                    "unexpected end of file at word {} of {}",
                    position, count
                ));
            }
            word_bytes.pop();
            let word = String::from_utf8_lossy(&word_bytes).trim().to_string();

            reader
                .read_exact(&mut vector_bytes)
                .map_err(|e| format!("vector for '{}': {}", word, e))?;
            for (value, bytes) in vector.iter_mut().zip(vector_bytes.chunks_exact(4)) {
                *value = f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
            }

            if word.is_empty() {
                warn!(position, "Skipping embedding with empty token");
                continue;
            }
            table.insert(word, &vector);
        }

        Ok(table)
    }
}

impl EmbeddingTable for Word2VecTable {
    fn dimensionality(&self) -> usize {
        self.dimension
    }

    fn lookup(&self, token: &str) -> Option<&[f32]> {
        let row = *self.rows.get(token)?;
        let start = row * self.dimension;
        self.data.get(start..start + self.dimension)
    }

    fn vocabulary_size(&self) -> usize {
        self.rows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_binary(words: &[(&str, [f32; 2])]) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".bin").tempfile().unwrap();
        write!(file, "{} 2\n", words.len()).unwrap();
        for (word, vector) in words {
            file.write_all(word.as_bytes()).unwrap();
            file.write_all(b" ").unwrap();
            for value in vector {
                file.write_all(&value.to_le_bytes()).unwrap();
            }
            file.write_all(b"\n").unwrap();
        }
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_text_with_header() {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        writeln!(file, "2 3").unwrap();
        writeln!(file, "neural 1 0 0").unwrap();
        writeln!(file, "network 0 1 0.5").unwrap();

        let table = Word2VecTable::load(file.path(), &LoadOptions::default()).unwrap();
        assert_eq!(table.dimensionality(), 3);
        assert_eq!(table.vocabulary_size(), 2);
        assert_eq!(table.lookup("network"), Some(&[0.0, 1.0, 0.5][..]));
        assert!(table.lookup("Network").is_none());
    }

    #[test]
    fn test_load_text_without_header() {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        writeln!(file, "graph 0.25 0.75").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "mining 1 1").unwrap();

        let table = Word2VecTable::load(file.path(), &LoadOptions::default()).unwrap();
        assert_eq!(table.dimensionality(), 2);
        assert_eq!(table.lookup("graph"), Some(&[0.25, 0.75][..]));
        assert_eq!(table.vocabulary_size(), 2);
    }

    #[test]
    fn test_text_dimension_mismatch_is_load_error() {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        writeln!(file, "graph 0.25 0.75").unwrap();
        writeln!(file, "mining 1").unwrap();

        let err = Word2VecTable::load(file.path(), &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, AppError::EmbeddingLoad { .. }));
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_load_binary() {
        let file = write_binary(&[("neural", [1.0, 2.0]), ("networks", [-0.5, 0.25])]);

        let table = Word2VecTable::load(file.path(), &LoadOptions::default()).unwrap();
        assert_eq!(table.dimensionality(), 2);
        assert_eq!(table.lookup("neural"), Some(&[1.0, 2.0][..]));
        assert_eq!(table.lookup("networks"), Some(&[-0.5, 0.25][..]));
    }

    #[test]
    fn test_max_words_caps_vocabulary() {
        let file = write_binary(&[("a", [1.0, 0.0]), ("b", [0.0, 1.0]), ("c", [1.0, 1.0])]);
        let options = LoadOptions {
            max_words: Some(2),
            ..LoadOptions::default()
        };

        let table = Word2VecTable::load(file.path(), &options).unwrap();
        assert_eq!(table.vocabulary_size(), 2);
        assert!(table.lookup("c").is_none());
    }

    #[test]
    fn test_truncated_binary_is_load_error() {
        let mut file = tempfile::Builder::new().suffix(".bin").tempfile().unwrap();
        write!(file, "3 2\nneural ").unwrap();
        file.write_all(&1.0f32.to_le_bytes()).unwrap();
        file.flush().unwrap();

        let err = Word2VecTable::load(file.path(), &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, AppError::EmbeddingLoad { .. }));
    }

    #[test]
    fn test_oversized_header_dimension_is_load_error() {
        let mut file = tempfile::Builder::new().suffix(".bin").tempfile().unwrap();
        write!(file, "1 4611686018427387905\nneural ").unwrap();
        file.flush().unwrap();

        let err = Word2VecTable::load(file.path(), &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, AppError::EmbeddingLoad { .. }));

        let mut file = tempfile::Builder::new().suffix(".bin").tempfile().unwrap();
        write!(file, "1 {}\n", MAX_DIMENSION + 1).unwrap();
        file.flush().unwrap();

        let err = Word2VecTable::load(file.path(), &LoadOptions::default()).unwrap_err();
        assert!(err.to_string().contains("dimensions"));

        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        write!(file, "1 4611686018427387905\nneural 1.0\n").unwrap();
        file.flush().unwrap();

        let err = Word2VecTable::load(file.path(), &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, AppError::EmbeddingLoad { .. }));
    }

    #[test]
    fn test_missing_file_is_load_error() {
        let err = Word2VecTable::load("/nonexistent/model.bin", &LoadOptions::default())
            .unwrap_err();
        assert!(matches!(err, AppError::EmbeddingLoad { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_from_entries_rejects_wrong_width() {
        let result = Word2VecTable::from_entries(2, vec![("a".to_string(), vec![1.0])]);
        assert!(result.is_err());
    }
}
