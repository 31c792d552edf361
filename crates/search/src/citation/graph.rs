//! Citation graph representation
//!
//! Provides the in-memory citation graph used for authority scoring.
//! Nodes are positions in the corpus paper list.

use paperrank_common::models::{Paper, PaperId};
use std::collections::{HashMap, HashSet};

/// Node handle: position of a paper in the corpus
pub type NodeIndex = usize;

/// In-memory citation graph
#[derive(Debug, Clone, Default)]
pub struct CitationGraph {
    /// Adjacency list: node -> in-corpus papers it cites (deduplicated)
    outgoing: Vec<Vec<NodeIndex>>,

    /// Reverse adjacency: node -> papers citing it
    incoming: Vec<Vec<NodeIndex>>,

    /// Size of each node's distinct reference set, unknown ids included
    out_degree: Vec<usize>,

    /// Paper id -> node
    index_by_id: HashMap<PaperId, NodeIndex>,

    /// References naming papers outside the corpus
    unresolved: usize,
}

impl CitationGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph from papers in corpus order.
    ///
    /// Duplicate references collapse. References to ids that are not in
    /// `papers` still count toward the citing paper's out-degree but create
    /// no edge.
    pub fn build(papers: &[Paper]) -> Self {
        let n = papers.len();
        let mut graph = Self {
            outgoing: vec![Vec::new(); n],
            incoming: vec![Vec::new(); n],
            out_degree: vec![0; n],
            index_by_id: HashMap::with_capacity(n),
            unresolved: 0,
        };

        for (node, paper) in papers.iter().enumerate() {
            if let Some(id) = paper.id() {
                graph.index_by_id.insert(id.to_string(), node);
            }
        }

        for (citing, paper) in papers.iter().enumerate() {
            let mut seen: HashSet<&str> = HashSet::with_capacity(paper.references.len());
            for reference in &paper.references {
                if !seen.insert(reference.as_str()) {
                    continue;
                }
                match graph.index_by_id.get(reference.as_str()) {
                    Some(&cited) => graph.add_edge(citing, cited),
                    None => graph.unresolved += 1,
                }
            }
            graph.out_degree[citing] = seen.len();
        }

        graph
    }

    fn add_edge(&mut self, citing: NodeIndex, cited: NodeIndex) {
        self.outgoing[citing].push(cited);
        self.incoming[cited].push(citing);
    }

    /// Papers cited by this node that are in the corpus
    pub fn references(&self, node: NodeIndex) -> &[NodeIndex] {
        self.outgoing.get(node).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Papers citing this node
    pub fn citations(&self, node: NodeIndex) -> &[NodeIndex] {
        self.incoming.get(node).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Distinct references of this node, including unknown ids
    pub fn out_degree(&self, node: NodeIndex) -> usize {
        self.out_degree.get(node).copied().unwrap_or(0)
    }

    /// Look up a node by paper id
    pub fn node_of(&self, id: &str) -> Option<NodeIndex> {
        self.index_by_id.get(id).copied()
    }

    /// Get node count
    pub fn node_count(&self) -> usize {
        self.outgoing.len()
    }

    /// Number of in-corpus citation edges
    pub fn edge_count(&self) -> usize {
        self.outgoing.iter().map(Vec::len).sum()
    }

    /// Number of distinct references that name papers outside the corpus
    pub fn unresolved_references(&self) -> usize {
        self.unresolved
    }

    /// Get citation count (incoming edges)
    pub fn citation_count(&self, node: NodeIndex) -> usize {
        self.citations(node).len()
    }

    /// Get reference count (outgoing in-corpus edges)
    pub fn reference_count(&self, node: NodeIndex) -> usize {
        self.references(node).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paper(id: &str, refs: &[&str]) -> Paper {
        refs.iter()
            .fold(Paper::new(format!("Paper {id}")).with_id(id), |p, r| p.with_reference(*r))
    }

    #[test]
    fn test_graph_construction() {
        // A cites B, B cites C
        let papers = vec![paper("a", &["b"]), paper("b", &["c"]), paper("c", &[])];
        let graph = CitationGraph::build(&papers);

        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.references(0), &[1]);
        assert_eq!(graph.citations(1), &[0]);
        assert_eq!(graph.references(1), &[2]);
        assert!(graph.references(2).is_empty());
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn test_citation_counts() {
        // Both A and C cite B
        let papers = vec![paper("a", &["b"]), paper("b", &[]), paper("c", &["b"])];
        let graph = CitationGraph::build(&papers);

        assert_eq!(graph.citation_count(1), 2);
        assert_eq!(graph.reference_count(0), 1);
        assert_eq!(graph.node_of("c"), Some(2));
        assert_eq!(graph.node_of("zzz"), None);
    }

    #[test]
    fn test_duplicate_references_collapse() {
        let papers = vec![paper("a", &["b", "b", "b"]), paper("b", &[])];
        let graph = CitationGraph::build(&papers);

        assert_eq!(graph.references(0), &[1]);
        assert_eq!(graph.out_degree(0), 1);
        assert_eq!(graph.citation_count(1), 1);
    }

    #[test]
    fn test_unknown_references_count_toward_degree() {
        let papers = vec![paper("a", &["b", "ghost", "ghost"]), paper("b", &[])];
        let graph = CitationGraph::build(&papers);

        assert_eq!(graph.out_degree(0), 2);
        assert_eq!(graph.reference_count(0), 1);
        assert_eq!(graph.unresolved_references(), 1);
    }

    #[test]
    fn test_unidentified_papers_can_cite() {
        let papers = vec![Paper::new("Anonymous").with_reference("b"), paper("b", &[])];
        let graph = CitationGraph::build(&papers);

        assert_eq!(graph.citations(1), &[0]);
        assert_eq!(graph.node_of("b"), Some(1));
    }

    #[test]
    fn test_out_of_range_nodes() {
        let graph = CitationGraph::new();
        assert!(graph.references(5).is_empty());
        assert!(graph.citations(5).is_empty());
        assert_eq!(graph.out_degree(5), 0);
    }
}
