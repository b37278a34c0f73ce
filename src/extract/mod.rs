use std::collections::{BTreeSet, HashMap};

use lazy_static::lazy_static;
use regex::Regex;

/// Canonical document extension. Every link target is normalized to end
/// with this so graph keys and edge targets compare equal.
pub const DOC_EXTENSION: &str = ".md";

lazy_static! {
    // Non-greedy so filenames containing ] still terminate at the first ]]
    static ref WIKI_LINK_RE: Regex = Regex::new(r"\[\[(.+?)\]\]").unwrap();
    static ref HASH_TAG_RE: Regex = Regex::new(r"#([A-Za-z0-9_][A-Za-z0-9_/-]*)").unwrap();
}

/// Append the canonical extension when a link target omits it.
pub fn normalize_doc_id(raw: &str) -> String {
    if raw.ends_with(DOC_EXTENSION) {
        raw.to_string()
    } else {
        format!("{}{}", raw, DOC_EXTENSION)
    }
}

/// Implicit hierarchy links for a document id: `A/B/C.md` links to
/// `A.md` and `A/B.md`, shallowest first. A flat id yields nothing.
pub fn hierarchy_links(doc_id: &str) -> Vec<String> {
    let segments: Vec<&str> = doc_id.split('/').collect();
    (1..segments.len())
        .map(|depth| normalize_doc_id(&segments[..depth].join("/")))
        .collect()
}

/// Extract wiki-link targets (`[[...]]`) from content, in order of first
/// appearance. Interior whitespace is trimmed and empty spans are skipped.
/// A nested target like `[[A/B/C]]` is followed immediately by its implicit
/// hierarchy ids (`A.md`, `A/B.md`) before the next match is considered.
/// Malformed bracket usage simply fails to match; this never errors.
pub fn extract_links(content: &str) -> Vec<String> {
    let mut links = Vec::new();
    for cap in WIKI_LINK_RE.captures_iter(content) {
        let target = cap[1].trim();
        if target.is_empty() {
            continue;
        }
        let id = normalize_doc_id(target);
        if id.contains('/') {
            let hierarchy = hierarchy_links(&id);
            links.push(id);
            links.extend(hierarchy);
        } else {
            links.push(id);
        }
    }
    links
}

/// Split a leading front-matter block (`---` fenced) from the body.
/// Returns `(Some(frontmatter), body)` or `(None, content)` when the fence
/// is absent or unterminated.
pub fn split_front_matter(content: &str) -> (Option<&str>, &str) {
    if !content.starts_with("---") {
        return (None, content);
    }
    match content[3..].find("\n---") {
        Some(end_idx) => {
            let front = content[3..end_idx + 3].trim();
            let body_start = end_idx + 3 + 4;
            let body = if body_start < content.len() {
                &content[body_start..]
            } else {
                ""
            };
            (Some(front), body)
        }
        None => (None, content),
    }
}

/// Extract tags from the first front-matter block only.
///
/// A `tags:` declaration is read through YAML: a flow sequence
/// (`tags: [a, b]`) wins over a comma-separated scalar (`tags: a, b`);
/// the two are mutually exclusive. Hash-prefixed tokens anywhere inside
/// the block are collected on top. Output is lowercased, deduplicated
/// and sorted. No front matter, or no declaration, yields an empty list.
pub fn extract_tags(content: &str) -> Vec<String> {
    let (front, _) = split_front_matter(content);
    let front = match front {
        Some(f) => f,
        None => return Vec::new(),
    };

    let mut tags: BTreeSet<String> = BTreeSet::new();

    let fields: HashMap<String, serde_yaml::Value> =
        serde_yaml::from_str(front).unwrap_or_default();
    if let Some(declared) = fields.get("tags") {
        if let Some(seq) = declared.as_sequence() {
            for value in seq {
                if let Some(tag) = value.as_str() {
                    if !tag.trim().is_empty() {
                        tags.insert(tag.trim().to_lowercase());
                    }
                }
            }
        } else if let Some(scalar) = declared.as_str() {
            for tag in scalar.split(',') {
                if !tag.trim().is_empty() {
                    tags.insert(tag.trim().to_lowercase());
                }
            }
        }
    }

    // YAML treats `#token` lines as comments, so these only surface here
    for cap in HASH_TAG_RE.captures_iter(front) {
        tags.insert(cap[1].to_lowercase());
    }

    tags.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_links_in_order() {
        let links = extract_links("[[index]] and [[about]]");
        assert_eq!(links, vec!["index.md".to_string(), "about.md".to_string()]);
    }

    #[test]
    fn test_appends_extension_only_when_missing() {
        let links = extract_links("[[already.md]] [[bare]]");
        assert_eq!(links, vec!["already.md".to_string(), "bare.md".to_string()]);
    }

    #[test]
    fn test_trims_interior_whitespace_and_skips_empty() {
        let links = extract_links("[[ padded ]] [[  ]] [[ok]]");
        assert_eq!(links, vec!["padded.md".to_string(), "ok.md".to_string()]);
    }

    #[test]
    fn test_nested_link_appends_hierarchy_inline() {
        let links = extract_links("[[Projects/Work/Plan]] then [[next]]");
        assert_eq!(
            links,
            vec![
                "Projects/Work/Plan.md".to_string(),
                "Projects.md".to_string(),
                "Projects/Work.md".to_string(),
                "next.md".to_string(),
            ]
        );
    }

    #[test]
    fn test_malformed_brackets_contribute_nothing() {
        assert!(extract_links("[single] [[unclosed").is_empty());
    }

    #[test]
    fn test_extract_links_is_pure() {
        let content = "[[a]] [[b/c]] [[a]]";
        assert_eq!(extract_links(content), extract_links(content));
    }

    #[test]
    fn test_literal_duplicates_preserved() {
        let links = extract_links("[[a]] [[a]]");
        assert_eq!(links, vec!["a.md".to_string(), "a.md".to_string()]);
    }

    #[test]
    fn test_hierarchy_links_shallow_to_deep() {
        assert_eq!(
            hierarchy_links("A/B/C.md"),
            vec!["A.md".to_string(), "A/B.md".to_string()]
        );
        assert!(hierarchy_links("flat.md").is_empty());
    }

    #[test]
    fn test_hierarchy_link_count_matches_depth() {
        // N path segments produce exactly N-1 implicit links
        for depth in 1..6 {
            let id = (0..depth).map(|i| format!("s{}", i)).collect::<Vec<_>>().join("/") + ".md";
            assert_eq!(hierarchy_links(&id).len(), depth - 1, "id: {}", id);
        }
    }

    #[test]
    fn test_tags_bracketed_list() {
        let content = "---\ntags: [Alpha, beta, alpha]\n---\nbody";
        assert_eq!(extract_tags(content), vec!["alpha".to_string(), "beta".to_string()]);
    }

    #[test]
    fn test_tags_comma_scalar() {
        let content = "---\ntags: work, Home\n---\n";
        assert_eq!(extract_tags(content), vec!["home".to_string(), "work".to_string()]);
    }

    #[test]
    fn test_tags_hash_tokens_in_front_matter_only() {
        let content = "---\ntitle: x\n#project\n---\nbody with #ignored";
        assert_eq!(extract_tags(content), vec!["project".to_string()]);
    }

    #[test]
    fn test_hash_tokens_combine_with_declaration() {
        let content = "---\ntags: [a]\n#b\n---\n";
        assert_eq!(extract_tags(content), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_no_front_matter_no_tags() {
        assert!(extract_tags("tags: [a, b]\nno fences here").is_empty());
        assert!(extract_tags("---\nunterminated").is_empty());
    }

    #[test]
    fn test_split_front_matter() {
        let (front, body) = split_front_matter("---\ntitle: t\n---\nhello");
        assert_eq!(front, Some("title: t"));
        assert_eq!(body.trim_start_matches('\n'), "hello");
    }
}
