pub mod analytics;

use std::collections::{BTreeMap, HashSet};

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::extract::{extract_links, hierarchy_links, normalize_doc_id, DOC_EXTENSION};

lazy_static! {
    // Strict calendar-day filename: 4-2-2 digits, dash separators, nothing else
    static ref DAILY_NOTE_RE: Regex = Regex::new(r"^(\d{4})-(\d{2})-(\d{2})\.md$").unwrap();
}

/// Directed multigraph of document-id -> outgoing link targets.
///
/// Outgoing lists are ordered by first appearance and may contain
/// duplicates; keys iterate in sorted order (BTreeMap), which also keeps
/// the cache JSON deterministic.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(transparent)]
pub struct WikiGraph(BTreeMap<String, Vec<String>>);

impl WikiGraph {
    pub fn new() -> Self {
        WikiGraph(BTreeMap::new())
    }

    pub fn insert(&mut self, doc_id: String, links: Vec<String>) {
        self.0.insert(doc_id, links);
    }

    pub fn links(&self, doc_id: &str) -> Option<&Vec<String>> {
        self.0.get(doc_id)
    }

    pub fn contains(&self, doc_id: &str) -> bool {
        self.0.contains_key(doc_id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Total number of edges, duplicates included.
    pub fn total_links(&self) -> usize {
        self.0.values().map(|l| l.len()).sum()
    }

    fn entry(&mut self, doc_id: &str) -> &mut Vec<String> {
        self.0.entry(doc_id.to_string()).or_default()
    }

    fn push_unique(&mut self, doc_id: &str, target: String) {
        let links = self.entry(doc_id);
        if !links.contains(&target) {
            links.push(target);
        }
    }
}

/// Final path segment of a document id.
fn file_name(doc_id: &str) -> &str {
    doc_id.rsplit('/').next().unwrap_or(doc_id)
}

/// Build a graph from document bodies.
///
/// Each document's outgoing list is its extracted links (order preserved,
/// literal duplicates kept) followed by its own implicit hierarchy links;
/// an own-hierarchy id already produced by the body is not appended again.
/// When the full id universe is supplied, every known id becomes a key and
/// virtual temporal nodes are overlaid; without it, the graph is built from
/// content alone.
pub fn build_graph(
    bodies: &BTreeMap<String, String>,
    known_ids: Option<&[String]>,
) -> WikiGraph {
    let mut graph = WikiGraph::new();

    for (doc_id, body) in bodies {
        let mut links = extract_links(body);
        for implicit in hierarchy_links(doc_id) {
            if !links.contains(&implicit) {
                links.push(implicit);
            }
        }
        graph.insert(doc_id.clone(), links);
    }

    if let Some(ids) = known_ids {
        for id in ids {
            graph.entry(id);
        }
        overlay_temporal_nodes(&mut graph, ids);
    }

    graph
}

/// Overlay virtual year and year-month nodes for daily notes.
///
/// A document whose filename is a strict `YYYY-MM-DD.md` contributes edges
/// `YYYY.md -> YYYY-MM.md -> <day id>`; the day node itself is untouched.
/// Derived purely from filename shape, and idempotent: re-running with the
/// same id set adds no duplicate edges.
fn overlay_temporal_nodes(graph: &mut WikiGraph, known_ids: &[String]) {
    let mut daily: Vec<&String> = known_ids
        .iter()
        .filter(|id| DAILY_NOTE_RE.is_match(file_name(id.as_str())))
        .collect();
    // Month edges follow filename order (chronological for this shape)
    daily.sort_by_key(|id| file_name(id.as_str()).to_string());

    for day_id in daily {
        let name = file_name(day_id);
        let caps = match DAILY_NOTE_RE.captures(name) {
            Some(c) => c,
            None => continue,
        };
        let year_node = normalize_doc_id(&caps[1]);
        let month_node = format!("{}-{}{}", &caps[1], &caps[2], DOC_EXTENSION);

        graph.push_unique(&year_node, month_node.clone());
        graph.push_unique(&month_node, day_id.clone());
    }
}

/// Copy of the graph with every edge whose target is not an existing
/// document removed. Total function; keys are kept even when all their
/// edges are dropped.
pub fn validate_graph(graph: &WikiGraph, existing: &HashSet<String>) -> WikiGraph {
    let mut validated = WikiGraph::new();
    for (doc_id, links) in graph.iter() {
        let kept: Vec<String> = links
            .iter()
            .filter(|target| existing.contains(*target))
            .cloned()
            .collect();
        validated.insert(doc_id.clone(), kept);
    }
    validated
}
