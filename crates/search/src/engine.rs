//! Search pipeline
//!
//! `Corpus` freezes the parsed papers together with their citation graph and
//! authority scores. `SearchEngine` owns the corpus and the collaborators and
//! answers queries; it is immutable and shared across queries through `Arc`.

use crate::citation::{AuthorityScorer, CitationGraph};
use crate::clustering::{Cluster, ClusterInputBuilder, ClusteringEngine, KMeansEngine};
use crate::retrieval::{Bm25Index, IndexDocument, ScoreFusion, ScoredCandidate, TextIndex};
use paperrank_common::config::{AppConfig, AuthorityConfig, IndexConfig};
use paperrank_common::embeddings::{SemanticEncoder, Word2VecTable};
use paperrank_common::errors::{AppError, Result};
use paperrank_common::models::{Paper, PaperId};
use paperrank_ingestion::{CorpusParser, ParserConfig};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, instrument, warn};

/// Immutable paper collection with authority scores assigned
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    papers: Vec<Arc<Paper>>,
    by_id: HashMap<PaperId, usize>,
    graph: CitationGraph,
}

impl Corpus {
    /// Freeze parsed papers.
    ///
    /// A repeated id replaces the earlier record in place. Authority is
    /// computed over the resulting papers and stored scaled on each paper.
    #[instrument(skip_all, fields(papers = papers.len()))]
    pub fn build(papers: Vec<Paper>, config: &AuthorityConfig) -> Self {
        let mut unique: Vec<Paper> = Vec::with_capacity(papers.len());
        let mut by_id: HashMap<PaperId, usize> = HashMap::with_capacity(papers.len());

        for paper in papers {
            match paper.id().and_then(|id| by_id.get(id)).copied() {
                Some(position) => {
                    warn!(id = paper.id(), "Duplicate paper id, keeping the later record");
                    unique[position] = paper;
                }
                None => {
                    if let Some(id) = paper.id() {
                        by_id.insert(id.to_string(), unique.len());
                    }
                    unique.push(paper);
                }
            }
        }

        let graph = CitationGraph::build(&unique);
        let scores = AuthorityScorer::new(config.clone()).compute(&graph);

        let papers: Vec<Arc<Paper>> = unique
            .into_iter()
            .zip(scores.scaled(config.scale))
            .map(|(mut paper, authority)| {
                paper.authority_score = authority;
                Arc::new(paper)
            })
            .collect();

        info!(
            papers = papers.len(),
            identified = by_id.len(),
            edges = graph.edge_count(),
            unresolved_references = graph.unresolved_references(),
            "Corpus frozen"
        );

        Self {
            papers,
            by_id,
            graph,
        }
    }

    /// Look up a paper by id
    pub fn get(&self, id: &str) -> Option<Arc<Paper>> {
        self.by_id.get(id).map(|&i| Arc::clone(&self.papers[i]))
    }

    pub fn len(&self) -> usize {
        self.papers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.papers.is_empty()
    }

    /// Papers in corpus order
    pub fn papers(&self) -> &[Arc<Paper>] {
        &self.papers
    }

    pub fn graph(&self) -> &CitationGraph {
        &self.graph
    }

    /// Documents for the text index, in corpus order
    pub fn index_documents(&self) -> Vec<IndexDocument> {
        self.papers
            .iter()
            .filter_map(|paper| IndexDocument::from_paper(paper))
            .collect()
    }
}

/// Reuse the index in `index.directory` when it was built from this corpus,
/// otherwise rebuild it there. Without a directory the index lives in RAM.
fn open_or_build_index(corpus: &Corpus, config: &IndexConfig) -> Result<Bm25Index> {
    let documents = corpus.index_documents();

    let Some(path) = &config.directory else {
        return Bm25Index::build(documents, config);
    };

    if path.exists() {
        match Bm25Index::open(path, config) {
            Ok(index) if index.is_snapshot_of(&documents, config) => {
                info!(path = %path.display(), "Reusing text index");
                return Ok(index);
            }
            Ok(_) => info!(path = %path.display(), "Text index is stale, rebuilding"),
            Err(e) => warn!(error = %e, "Text index unreadable, rebuilding"),
        }
    }

    match Bm25Index::build_in_dir(documents.clone(), config, path) {
        Ok(index) => Ok(index),
        Err(e @ AppError::Configuration { .. }) => Err(e),
        Err(e) => {
            warn!(error = %e, path = %path.display(), "Failed to write text index, keeping it in memory");
            Bm25Index::build(documents, config)
        }
    }
}

/// Query pipeline over a frozen corpus
pub struct SearchEngine {
    corpus: Corpus,
    encoder: SemanticEncoder,
    index: Arc<dyn TextIndex>,
    clustering: Arc<dyn ClusteringEngine>,
    fusion: ScoreFusion,
    cluster_builder: ClusterInputBuilder,
}

impl std::fmt::Debug for SearchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchEngine")
            .field("papers", &self.corpus.len())
            .field("indexed", &self.index.document_count())
            .field("clustering", &self.clustering.name())
            .field("fusion", &self.fusion)
            .finish()
    }
}

impl SearchEngine {
    pub fn new(
        corpus: Corpus,
        encoder: SemanticEncoder,
        index: Arc<dyn TextIndex>,
        clustering: Arc<dyn ClusteringEngine>,
    ) -> Self {
        Self {
            corpus,
            encoder,
            index,
            clustering,
            fusion: ScoreFusion::default(),
            cluster_builder: ClusterInputBuilder::default(),
        }
    }

    pub fn with_fusion(mut self, fusion: ScoreFusion) -> Self {
        self.fusion = fusion;
        self
    }

    pub fn with_cluster_builder(mut self, cluster_builder: ClusterInputBuilder) -> Self {
        self.cluster_builder = cluster_builder;
        self
    }

    /// Load the embedding model and dataset named in `config` and build
    /// every collaborator. Blocking; can take minutes on large corpora.
    #[instrument(skip_all, fields(dataset = %config.dataset.path.display()))]
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let started = Instant::now();

        let table = Word2VecTable::load(&config.embedding.model_path, &config.embedding_load_options())?;
        let encoder = SemanticEncoder::new(Arc::new(table));

        let parser = CorpusParser::new(
            encoder.clone(),
            ParserConfig {
                progress_every: config.dataset.progress_every,
            },
        );
        let parsed = parser.parse_file(&config.dataset.path)?;

        let corpus = Corpus::build(parsed.papers, &config.authority);
        let index = open_or_build_index(&corpus, &config.index)?;

        let engine = Self::new(
            corpus,
            encoder,
            Arc::new(index),
            Arc::new(KMeansEngine::new(config.clustering.tolerance)),
        )
        .with_fusion(ScoreFusion::from_config(&config.fusion, config.authority.scale))
        .with_cluster_builder(ClusterInputBuilder::new(config.clustering.max_iterations));

        info!(
            papers = engine.corpus.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Search engine ready"
        );
        Ok(engine)
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    /// Fused candidates for `query`, best first
    pub fn search(&self, query: &str, top_n: usize) -> Result<Vec<ScoredCandidate>> {
        if top_n == 0 {
            return Ok(Vec::new());
        }

        let query_vector = self.encoder.encode(query);
        let hits = self.index.search(query, self.fusion.candidate_limit(top_n))?;

        Ok(self
            .fusion
            .fuse(hits, &query_vector, |id| self.corpus.get(id)))
    }

    fn run_query(&self, query: &str, top_n: usize, num_clusters: usize) -> Result<(usize, Vec<Cluster>)> {
        let candidates = self.search(query, top_n)?;
        let clusters =
            self.cluster_builder
                .build(self.clustering.as_ref(), &candidates, top_n, num_clusters)?;
        Ok((candidates.len(), clusters))
    }

    /// Record the outcome of one query. Called once per query, at the
    /// boundary the caller sees.
    fn finish_query(result: Result<(usize, Vec<Cluster>)>, elapsed: Duration) -> Result<Vec<Cluster>> {
        match result {
            Ok((candidates, clusters)) => {
                paperrank_common::metrics::record_search(elapsed.as_secs_f64(), "success", candidates);
                paperrank_common::metrics::record_clusters(clusters.len());
                info!(
                    candidates,
                    clusters = clusters.len(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Query complete"
                );
                Ok(clusters)
            }
            Err(e) => {
                paperrank_common::metrics::record_search(elapsed.as_secs_f64(), "error", 0);
                warn!(error = %e, code = e.code().as_code(), "Query failed");
                Err(e)
            }
        }
    }

    /// Rank papers for `query` and cluster the best `top_n` of them into at
    /// most `num_clusters` groups
    #[instrument(skip(self))]
    pub fn semantic_search_with_clustering(
        &self,
        query: &str,
        top_n: usize,
        num_clusters: usize,
    ) -> Result<Vec<Cluster>> {
        let started = Instant::now();
        let result = self.run_query(query, top_n, num_clusters);
        Self::finish_query(result, started.elapsed())
    }

    /// Run a query on the blocking pool, giving up after `timeout`.
    ///
    /// The query keeps running to completion in the background after a
    /// timeout; its result is discarded and only the timeout is recorded.
    #[instrument(skip(self, timeout), fields(timeout_ms = timeout.as_millis() as u64))]
    pub async fn query_with_timeout(
        self: Arc<Self>,
        query: String,
        top_n: usize,
        num_clusters: usize,
        timeout: Duration,
    ) -> Result<Vec<Cluster>> {
        let started = Instant::now();
        let task = tokio::task::spawn_blocking(move || self.run_query(&query, top_n, num_clusters));

        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(result)) => Self::finish_query(result, started.elapsed()),
            Ok(Err(e)) => Self::finish_query(
                Err(AppError::Internal {
                    message: format!("query task failed: {}", e),
                }),
                started.elapsed(),
            ),
            Err(_) => {
                paperrank_common::metrics::record_search(timeout.as_secs_f64(), "timeout", 0);
                warn!("Query timed out");
                Err(AppError::Timeout {
                    timeout_ms: timeout.as_millis() as u64,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const DATASET: &str = "\
#*Neural Network Basics
#@Ada Lovelace
#t2001
#cNIPS
#index1
#%3
#!An introduction to neural networks.
#*Deep Networks for Vision
#@Alan Turing
#t2005
#cCVPR
#index2
#%1
#%3
#!Stacked network models.
#*Graph Mining
#index3
#!Frequent patterns in graphs.
#*Neural Cells
#index4
#%1
#*Networks of Neurons
#index5
#%1
#%2
#!Biological networks.
#*Recurrent Neural Models
#index6
#%5
#!Sequence models.
";

    fn encoder() -> SemanticEncoder {
        let table = Word2VecTable::from_entries(
            3,
            vec![
                ("neural".to_string(), vec![1.0, 0.0, 0.0]),
                ("network".to_string(), vec![0.8, 0.2, 0.0]),
                ("networks".to_string(), vec![0.8, 0.2, 0.0]),
                ("deep".to_string(), vec![0.5, 0.5, 0.0]),
                ("graph".to_string(), vec![0.0, 0.0, 1.0]),
                ("neurons".to_string(), vec![0.9, 0.0, 0.1]),
            ],
        )
        .unwrap();
        SemanticEncoder::new(Arc::new(table))
    }

    fn corpus_from(dataset: &str, encoder: &SemanticEncoder) -> Corpus {
        let parsed = CorpusParser::new(encoder.clone(), ParserConfig::default())
            .parse_lines(dataset.lines())
            .unwrap();
        Corpus::build(parsed.papers, &AuthorityConfig::default())
    }

    fn engine_with(dataset: &str, clustering: Arc<dyn ClusteringEngine>) -> SearchEngine {
        let encoder = encoder();
        let corpus = corpus_from(dataset, &encoder);
        let index = Bm25Index::build(corpus.index_documents(), &IndexConfig::default()).unwrap();
        SearchEngine::new(corpus, encoder, Arc::new(index), clustering)
    }

    fn engine() -> SearchEngine {
        engine_with(DATASET, Arc::new(KMeansEngine::default()))
    }

    fn ids(candidates: &[ScoredCandidate]) -> Vec<String> {
        candidates
            .iter()
            .filter_map(|c| c.paper.id().map(str::to_string))
            .collect()
    }

    #[test]
    fn test_corpus_assigns_scaled_authority() {
        let corpus = corpus_from(DATASET, &encoder());
        assert_eq!(corpus.len(), 6);

        let total: f64 = corpus.papers().iter().map(|p| p.authority_score).sum();
        assert!((total - 100_000.0).abs() < 1e-6);

        let cited = corpus.get("1").unwrap().authority_score;
        let uncited = corpus.get("6").unwrap().authority_score;
        assert!(cited > uncited);
    }

    #[test]
    fn test_duplicate_ids_keep_later_record_in_place() {
        let dataset = "#*First\n#index7\n#!a\n#*Other\n#index8\n#!b\n#*Second\n#index7\n#!c\n";
        let corpus = corpus_from(dataset, &encoder());

        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.papers()[0].title, "Second");
        assert_eq!(corpus.get("7").unwrap().title, "Second");
    }

    #[test]
    fn test_search_sorted_and_deterministic() {
        let engine = engine();
        let first = engine.search("neural networks", 20).unwrap();
        let second = engine.search("neural networks", 20).unwrap();

        assert!(!first.is_empty());
        assert!(first
            .windows(2)
            .all(|w| w[0].combined_score >= w[1].combined_score));
        assert_eq!(ids(&first), ids(&second));

        // Paper 4 has no abstract, so no vector, so it is never ranked
        assert!(!ids(&first).contains(&"4".to_string()));
    }

    #[test]
    fn test_stemmed_match_without_exact_tokens() {
        let dataset = "#*Neurals and their Network\n#index1\n#!x\n#*Graph Mining\n#index2\n#!y\n";
        let engine = engine_with(dataset, Arc::new(KMeansEngine::default()));

        let results = engine.search("neural networks", 5).unwrap();
        assert_eq!(ids(&results), vec!["1"]);
    }

    #[test]
    fn test_no_hits_is_empty_not_error() {
        let engine = engine();
        assert!(engine.search("quantum chromodynamics", 10).unwrap().is_empty());
        assert!(engine
            .semantic_search_with_clustering("quantum chromodynamics", 10, 3)
            .unwrap()
            .is_empty());
        assert!(engine.search("neural", 0).unwrap().is_empty());
    }

    #[test]
    fn test_syntax_error_surfaces() {
        let err = engine().search("venue_name:NIPS", 10).unwrap_err();
        assert!(matches!(err, AppError::QuerySyntax { .. }));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_single_cluster_holds_everything() {
        let engine = engine();
        let candidates = engine.search("neural networks", 3).unwrap();
        let expected: Vec<String> = ids(&candidates).into_iter().take(3).collect();

        let clusters = engine
            .semantic_search_with_clustering("neural networks", 3, 1)
            .unwrap();

        assert_eq!(clusters.len(), 1);
        assert_eq!(ids(&clusters[0].papers), expected);
    }

    #[test]
    fn test_cluster_union_is_selected_set() {
        let engine = engine();
        let top_n = 4;
        let selected: HashSet<String> = ids(&engine.search("neural OR networks OR graph", top_n).unwrap())
            .into_iter()
            .take(top_n)
            .collect();

        let clusters = engine
            .semantic_search_with_clustering("neural OR networks OR graph", top_n, 2)
            .unwrap();
        let clustered: Vec<String> = clusters.iter().flat_map(|c| ids(&c.papers)).collect();

        assert_eq!(clustered.len(), selected.len());
        assert_eq!(clustered.into_iter().collect::<HashSet<_>>(), selected);
    }

    #[test]
    fn test_zero_clusters_is_validation_error() {
        let err = engine()
            .semantic_search_with_clustering("neural", 5, 0)
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    struct SlowEngine;

    impl ClusteringEngine for SlowEngine {
        fn partition(&self, vectors: &[Vec<f64>], _k: usize, _max: u64) -> Result<Vec<usize>> {
            std::thread::sleep(Duration::from_millis(300));
            Ok(vec![0; vectors.len()])
        }

        fn name(&self) -> &str {
            "slow"
        }
    }

    #[tokio::test]
    async fn test_query_times_out() {
        let engine = Arc::new(engine_with(DATASET, Arc::new(SlowEngine)));

        let err = engine
            .query_with_timeout("neural".to_string(), 5, 2, Duration::from_millis(20))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Timeout { timeout_ms: 20 }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_queries_agree() {
        let engine = Arc::new(engine());

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let engine = Arc::clone(&engine);
                tokio::spawn(engine.query_with_timeout(
                    "neural networks".to_string(),
                    5,
                    1,
                    Duration::from_secs(30),
                ))
            })
            .collect();

        let mut results = Vec::new();
        for task in tasks {
            let clusters = task.await.unwrap().unwrap();
            results.push(ids(&clusters[0].papers));
        }
        assert!(results.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn test_from_config_with_index_directory() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = dir.path().join("dataset.txt");
        let model = dir.path().join("model.txt");
        let index_dir = dir.path().join("index");

        std::fs::write(&dataset, DATASET).unwrap();
        std::fs::write(
            &model,
            "3 2\nneural 1.0 0.0\nnetwork 0.8 0.2\nnetworks 0.8 0.2\n",
        )
        .unwrap();

        let mut config = AppConfig::default();
        config.dataset.path = dataset;
        config.embedding.model_path = model;
        config.index.directory = Some(index_dir.clone());

        let engine = SearchEngine::from_config(&config).unwrap();
        assert!(index_dir.join("meta.json").exists());
        let first = engine
            .semantic_search_with_clustering("neural networks", 5, 2)
            .unwrap();

        // Second start reuses the index
        let engine = SearchEngine::from_config(&config).unwrap();
        let second = engine
            .semantic_search_with_clustering("neural networks", 5, 2)
            .unwrap();

        let flatten = |clusters: &[Cluster]| -> Vec<String> {
            clusters.iter().flat_map(|c| ids(&c.papers)).collect()
        };
        assert_eq!(flatten(&first), flatten(&second));
        assert_eq!(engine.corpus().len(), 6);
    }

    #[test]
    fn test_edited_dataset_rebuilds_index() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = dir.path().join("dataset.txt");
        let model = dir.path().join("model.txt");
        std::fs::write(&model, "2 2\nneural 1.0 0.0\ngraph 0.0 1.0\n").unwrap();

        let mut config = AppConfig::default();
        config.dataset.path = dataset.clone();
        config.embedding.model_path = model;
        config.index.directory = Some(dir.path().join("index"));

        std::fs::write(&dataset, "#*Graph Mining\n#index1\n#!x\n").unwrap();
        let engine = SearchEngine::from_config(&config).unwrap();
        assert_eq!(ids(&engine.search("graph", 5).unwrap()), vec!["1"]);
        drop(engine);

        // Same id, new title
        std::fs::write(&dataset, "#*Neural Networks\n#index1\n#!x\n").unwrap();
        let engine = SearchEngine::from_config(&config).unwrap();
        assert_eq!(ids(&engine.search("neural", 5).unwrap()), vec!["1"]);
        assert!(engine.search("graph", 5).unwrap().is_empty());
    }

    #[test]
    fn test_from_config_missing_model() {
        let mut config = AppConfig::default();
        config.embedding.model_path = "/nonexistent/model.bin".into();

        let err = SearchEngine::from_config(&config).unwrap_err();
        assert!(matches!(err, AppError::EmbeddingLoad { .. }));
        assert!(err.is_fatal());
    }
}
