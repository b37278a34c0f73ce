use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tantivy::collector::TopDocs;
use tantivy::query::QueryParser;
use tantivy::schema::{Field, Schema, Value, STORED, STRING, TEXT};
use tantivy::{doc, Index, IndexReader, ReloadPolicy, TantivyDocument};

/// Result cap for a single query.
const MAX_RESULTS: usize = 20;

const WRITER_HEAP_BYTES: usize = 50_000_000;

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SearchResult {
    pub path: String,
    pub title: String,
    pub snippet: String,
    pub score: f32,
}

/// Full-text index over one batch of document bodies.
///
/// Lives entirely in RAM and is rebuilt from scratch on every full indexing
/// pass, so there is no on-disk state to version, lock, or recover.
pub struct SearchIndex {
    index: Index,
    reader: IndexReader,
    f_path: Field,
    f_title: Field,
    f_body: Field,
}

impl SearchIndex {
    /// Build an index from `(doc_id, body)` pairs. The title field is the
    /// filename stem, so `Projects/Plan.md` is findable as "Plan".
    pub fn build(docs: &BTreeMap<String, String>) -> Result<Self, String> {
        let mut schema_builder = Schema::builder();
        let f_path = schema_builder.add_text_field("path", STRING | STORED);
        let f_title = schema_builder.add_text_field("title", TEXT | STORED);
        let f_body = schema_builder.add_text_field("body", TEXT | STORED);
        let schema = schema_builder.build();

        let index = Index::create_in_ram(schema);
        let mut writer = index
            .writer(WRITER_HEAP_BYTES)
            .map_err(|e| format!("Failed to create index writer: {}", e))?;

        for (doc_id, body) in docs {
            let title = title_of(doc_id);
            writer
                .add_document(doc!(
                    f_path => doc_id.as_str(),
                    f_title => title,
                    f_body => body.as_str(),
                ))
                .map_err(|e| format!("Failed to add document {}: {}", doc_id, e))?;
        }
        writer
            .commit()
            .map_err(|e| format!("Failed to commit index: {}", e))?;

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(|e| format!("Failed to create index reader: {}", e))?;
        reader.reload().map_err(|e| e.to_string())?;

        Ok(SearchIndex {
            index,
            reader,
            f_path,
            f_title,
            f_body,
        })
    }

    /// Ranked search across title and body, bounded to the top 20 hits.
    /// An unparseable query is treated as matching nothing.
    pub fn search(&self, query_str: &str) -> Result<Vec<SearchResult>, String> {
        let searcher = self.reader.searcher();
        let query_parser = QueryParser::for_index(&self.index, vec![self.f_title, self.f_body]);

        let query = match query_parser.parse_query(query_str) {
            Ok(q) => q,
            Err(e) => {
                log::debug!("[SearchIndex] Unparseable query {:?}: {}", query_str, e);
                return Ok(Vec::new());
            }
        };

        let top_docs = searcher
            .search(&query, &TopDocs::with_limit(MAX_RESULTS))
            .map_err(|e| e.to_string())?;

        let mut results = Vec::new();
        for (score, doc_address) in top_docs {
            let doc: TantivyDocument = searcher.doc(doc_address).map_err(|e| e.to_string())?;
            let path = doc
                .get_first(self.f_path)
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();
            let title = doc
                .get_first(self.f_title)
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();
            let body_text = doc.get_first(self.f_body).and_then(|v| v.as_str()).unwrap_or("");

            results.push(SearchResult {
                path,
                title,
                snippet: extract_snippet(body_text, query_str, 150),
                score,
            });
        }

        Ok(results)
    }
}

fn title_of(doc_id: &str) -> &str {
    doc_id
        .rsplit('/')
        .next()
        .unwrap_or(doc_id)
        .trim_end_matches(".md")
}

/// Context window around the first query-term hit; falls back to the
/// leading characters when nothing matches.
fn extract_snippet(text: &str, query: &str, max_len: usize) -> String {
    if text.is_empty() {
        return String::new();
    }

    let text_lower = text.to_lowercase();
    let match_pos = query
        .split_whitespace()
        .filter_map(|term| text_lower.find(&term.to_lowercase()))
        .min();

    match match_pos {
        Some(pos) => {
            let lead = max_len / 3;
            let start = text_lower[..pos].chars().count().saturating_sub(lead);
            let snippet: String = text.chars().skip(start).take(max_len).collect();
            if start > 0 {
                format!("...{}", snippet.trim())
            } else {
                snippet.trim().to_string()
            }
        }
        None => text.chars().take(max_len).collect(),
    }
}
