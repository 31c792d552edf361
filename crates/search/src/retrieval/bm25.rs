//! BM25 text index on tantivy
//!
//! Title and abstract are analyzed text fields (English stemming unless
//! disabled); authors, year, venue and id are raw keyword fields matched on
//! their whole value. Queries use tantivy's query syntax with title as the
//! default field.
//!
//! An index can live in RAM or in a directory. A directory index carries a
//! fingerprint of the documents it was built from in its commit payload, so
//! a later start can tell whether it still matches the corpus.

use super::{IndexDocument, LexicalHit, TextIndex};
use paperrank_common::config::IndexConfig;
use paperrank_common::errors::{AppError, Result};
use sha2::{Digest, Sha256};
use std::fmt::Display;
use std::path::Path;
use std::time::Instant;
use tantivy::collector::TopDocs;
use tantivy::directory::MmapDirectory;
use tantivy::query::QueryParser;
use tantivy::schema::{
    Field, IndexRecordOption, Schema, TextFieldIndexing, TextOptions, Value, STORED, STRING,
};
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument};
use tracing::{debug, info, instrument};

/// Bumped whenever the schema or the fingerprint layout changes
const FINGERPRINT_VERSION: &[u8] = b"paperrank-index-v1";

/// File tantivy writes at the root of every directory index
const META_FILE: &str = "meta.json";

/// Fields a query may name
const QUERY_FIELDS: [&str; 6] = ["title", "abstract", "authors", "year", "venue", "id"];

fn unavailable(e: impl Display) -> AppError {
    AppError::IndexUnavailable {
        message: e.to_string(),
    }
}

fn unavailable_at(path: &Path, e: impl Display) -> AppError {
    unavailable(format!("{}: {}", path.display(), e))
}

fn schema(stemming: bool) -> Schema {
    let tokenizer = if stemming { "en_stem" } else { "default" };
    let analyzed = TextOptions::default().set_indexing_options(
        TextFieldIndexing::default()
            .set_tokenizer(tokenizer)
            .set_index_option(IndexRecordOption::WithFreqsAndPositions),
    );

    let mut builder = Schema::builder();
    builder.add_text_field("id", STRING | STORED);
    builder.add_u64_field("ord", STORED);
    builder.add_text_field("title", analyzed.clone());
    builder.add_text_field("abstract", analyzed);
    builder.add_text_field("authors", STRING);
    builder.add_text_field("year", STRING);
    builder.add_text_field("venue", STRING);
    builder.build()
}

/// Hex SHA-256 over every field of every document, in order
fn fingerprint(documents: &[IndexDocument], stemming: bool) -> String {
    let mut hasher = Sha256::new();
    hasher.update(FINGERPRINT_VERSION);
    hasher.update([u8::from(stemming)]);

    for document in documents {
        for value in [
            &document.id,
            &document.title,
            &document.abstract_text,
            &document.authors,
            &document.year,
            &document.venue,
        ] {
            hasher.update((value.len() as u64).to_le_bytes());
            hasher.update(value.as_bytes());
        }
    }

    hex::encode(hasher.finalize())
}

#[derive(Debug, Clone, Copy)]
struct Fields {
    id: Field,
    ord: Field,
    title: Field,
    abstract_text: Field,
    authors: Field,
    year: Field,
    venue: Field,
}

impl Fields {
    fn resolve(schema: &Schema) -> tantivy::Result<Self> {
        Ok(Self {
            id: schema.get_field("id")?,
            ord: schema.get_field("ord")?,
            title: schema.get_field("title")?,
            abstract_text: schema.get_field("abstract")?,
            authors: schema.get_field("authors")?,
            year: schema.get_field("year")?,
            venue: schema.get_field("venue")?,
        })
    }
}

/// BM25 text index
pub struct Bm25Index {
    index: Index,
    reader: IndexReader,
    fields: Fields,
    default_field: Field,
    fingerprint: Option<String>,
}

impl std::fmt::Debug for Bm25Index {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bm25Index")
            .field("documents", &self.document_count())
            .field("fingerprint", &self.fingerprint)
            .finish()
    }
}

impl Bm25Index {
    /// Index documents in memory. Document order breaks score ties.
    #[instrument(skip_all, fields(documents = documents.len()))]
    pub fn build(documents: Vec<IndexDocument>, config: &IndexConfig) -> Result<Self> {
        check_default_field(config)?;
        let index = Index::create_in_ram(schema(config.stemming));
        Self::populate(index, documents, config)
    }

    /// Index documents into `path`, replacing any index already there
    #[instrument(skip_all, fields(documents = documents.len(), path = %path.as_ref().display()))]
    pub fn build_in_dir(
        documents: Vec<IndexDocument>,
        config: &IndexConfig,
        path: impl AsRef<Path>,
    ) -> Result<Self> {
        check_default_field(config)?;
        let path = path.as_ref();

        if path.join(META_FILE).exists() {
            std::fs::remove_dir_all(path)?;
        }
        std::fs::create_dir_all(path)?;

        let directory = MmapDirectory::open(path).map_err(unavailable)?;
        let index = Index::create(directory, schema(config.stemming), Default::default())
            .map_err(unavailable)?;
        Self::populate(index, documents, config)
    }

    /// Open a directory index written by [`Bm25Index::build_in_dir`]
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>, config: &IndexConfig) -> Result<Self> {
        let path = path.as_ref();

        let directory = MmapDirectory::open(path).map_err(|e| unavailable_at(path, e))?;
        let index = Index::open(directory).map_err(|e| unavailable_at(path, e))?;
        let fingerprint = index
            .load_metas()
            .map_err(|e| unavailable_at(path, e))?
            .payload;

        let opened = Self::from_index(index, config, fingerprint)?;
        info!(documents = opened.document_count(), "Text index opened");
        Ok(opened)
    }

    /// Whether this index was built from exactly `documents`, in order,
    /// with the analysis settings in `config`
    pub fn is_snapshot_of(&self, documents: &[IndexDocument], config: &IndexConfig) -> bool {
        self.fingerprint.as_deref() == Some(fingerprint(documents, config.stemming).as_str())
    }

    fn populate(index: Index, documents: Vec<IndexDocument>, config: &IndexConfig) -> Result<Self> {
        let started = Instant::now();
        let fields = Fields::resolve(&index.schema()).map_err(unavailable)?;
        let fingerprint = fingerprint(&documents, config.stemming);
        let count = documents.len();

        {
            // One indexing thread keeps documents in a single ordered segment
            let mut writer: IndexWriter = index
                .writer_with_num_threads(1, config.writer_memory_bytes)
                .map_err(unavailable)?;

            for (ord, document) in documents.into_iter().enumerate() {
                writer
                    .add_document(doc!(
                        fields.id => document.id,
                        fields.ord => ord as u64,
                        fields.title => document.title,
                        fields.abstract_text => document.abstract_text,
                        fields.authors => document.authors,
                        fields.year => document.year,
                        fields.venue => document.venue,
                    ))
                    .map_err(unavailable)?;
            }

            let mut commit = writer.prepare_commit().map_err(unavailable)?;
            commit.set_payload(&fingerprint);
            commit.commit().map_err(unavailable)?;
        }

        let built = Self::from_index(index, config, Some(fingerprint))?;
        info!(
            documents = count,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Text index built"
        );
        paperrank_common::metrics::record_index_build(started.elapsed().as_secs_f64(), count);
        Ok(built)
    }

    fn from_index(index: Index, config: &IndexConfig, fingerprint: Option<String>) -> Result<Self> {
        check_default_field(config)?;
        let schema = index.schema();
        let fields = Fields::resolve(&schema).map_err(unavailable)?;
        let default_field = schema.get_field(&config.default_field).map_err(unavailable)?;

        let reader: IndexReader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(unavailable)?;

        Ok(Self {
            index,
            reader,
            fields,
            default_field,
            fingerprint,
        })
    }
}

fn check_default_field(config: &IndexConfig) -> Result<()> {
    if QUERY_FIELDS.contains(&config.default_field.as_str()) {
        return Ok(());
    }
    Err(AppError::Configuration {
        message: format!("index.default_field '{}' is not a field", config.default_field),
    })
}

impl TextIndex for Bm25Index {
    fn search(&self, query: &str, limit: usize) -> Result<Vec<LexicalHit>> {
        let syntax = |message: String| AppError::QuerySyntax {
            query: query.to_string(),
            message,
        };

        if query.trim().is_empty() {
            return Err(syntax("empty query".to_string()));
        }
        let parsed = QueryParser::for_index(&self.index, vec![self.default_field])
            .parse_query(query)
            .map_err(|e| syntax(e.to_string()))?;

        if limit == 0 {
            return Ok(Vec::new());
        }

        let searcher = self.reader.searcher();
        let top_docs = searcher
            .search(&parsed, &TopDocs::with_limit(limit))
            .map_err(unavailable)?;

        let mut ranked = Vec::with_capacity(top_docs.len());
        for (score, address) in top_docs {
            let stored: TantivyDocument = searcher.doc(address).map_err(unavailable)?;
            let id = stored
                .get_first(self.fields.id)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            let ord = stored
                .get_first(self.fields.ord)
                .and_then(|v| v.as_u64())
                .unwrap_or(u64::MAX);
            ranked.push((ord, LexicalHit { id, score: score as f64 }));
        }

        ranked.sort_by(|a, b| b.1.score.total_cmp(&a.1.score).then(a.0.cmp(&b.0)));
        debug!(query, hits = ranked.len(), "Lexical search");

        Ok(ranked.into_iter().map(|(_, hit)| hit).collect())
    }

    fn document_count(&self) -> usize {
        self.reader.searcher().num_docs() as usize
    }
}
