use std::collections::{HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use super::WikiGraph;

/// Documents whose outgoing list contains `target`, sorted ascending.
/// Derived on demand, never stored, so it cannot diverge from the graph;
/// duplicates in an outgoing list contribute a single backlink.
pub fn backlinks(graph: &WikiGraph, target: &str) -> Vec<String> {
    graph
        .iter()
        .filter(|(_, links)| links.iter().any(|t| t == target))
        .map(|(id, _)| id.clone())
        .collect()
}

/// Connected component containing `start`, treating the graph as
/// undirected: both forward edges and backlinks are followed. Visited
/// membership is checked before enqueue, so this terminates on any
/// finite graph, cycles included.
pub fn connected_component(graph: &WikiGraph, start: &str) -> HashSet<String> {
    let mut component: HashSet<String> = HashSet::new();
    let mut frontier: VecDeque<String> = VecDeque::new();

    component.insert(start.to_string());
    frontier.push_back(start.to_string());

    while let Some(node) = frontier.pop_front() {
        let mut neighbors: Vec<String> = graph
            .links(&node)
            .map(|links| links.clone())
            .unwrap_or_default();
        neighbors.extend(backlinks(graph, &node));

        for next in neighbors {
            if !component.contains(&next) && graph.contains(&next) {
                component.insert(next.clone());
                frontier.push_back(next);
            }
        }
    }

    component
}

/// Documents with no outgoing links and no backlinks, sorted.
pub fn isolated_nodes(graph: &WikiGraph) -> Vec<String> {
    graph
        .ids()
        .filter(|id| {
            graph.links(id).map(|l| l.is_empty()).unwrap_or(true)
                && backlinks(graph, id).is_empty()
        })
        .cloned()
        .collect()
}

/// Rotate a cycle so its smallest node comes first. Structurally identical
/// cycles found from different entry points normalize to the same key.
fn canonical_cycle(cycle: &[String]) -> Vec<String> {
    let pivot = cycle
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.cmp(b))
        .map(|(i, _)| i)
        .unwrap_or(0);
    let mut rotated = Vec::with_capacity(cycle.len());
    rotated.extend_from_slice(&cycle[pivot..]);
    rotated.extend_from_slice(&cycle[..pivot]);
    rotated
}

/// All distinct cycles in the graph.
///
/// Iterative depth-first search tracking the current path; an edge back
/// into the path yields the path slice from the revisited node. A document
/// linking to itself is a one-node cycle. Disjoint cycles are all found:
/// whichever traversal first reaches a cycle walks it in full.
pub fn detect_cycles(graph: &WikiGraph) -> Vec<Vec<String>> {
    let mut cycles: Vec<Vec<String>> = Vec::new();
    let mut reported: HashSet<Vec<String>> = HashSet::new();
    let mut visited: HashSet<String> = HashSet::new();

    for root in graph.ids() {
        if visited.contains(root.as_str()) {
            continue;
        }
        visited.insert(root.clone());

        // (node, next neighbor index) frames; path mirrors the stack
        let mut stack: Vec<(String, usize)> = vec![(root.clone(), 0)];
        let mut path: Vec<String> = vec![root.clone()];
        let mut on_path: HashSet<String> = HashSet::new();
        on_path.insert(root.clone());

        while let Some(frame) = stack.last_mut() {
            let node = frame.0.clone();
            let idx = frame.1;
            let neighbors = graph.links(&node);
            let next = neighbors.and_then(|l| l.get(idx)).cloned();

            match next {
                Some(next) => {
                    frame.1 += 1;
                    if on_path.contains(&next) {
                        let pos = path.iter().position(|n| *n == next).unwrap_or(0);
                        let cycle: Vec<String> = path[pos..].to_vec();
                        if reported.insert(canonical_cycle(&cycle)) {
                            cycles.push(cycle);
                        }
                    } else if !visited.contains(&next) && graph.contains(&next) {
                        visited.insert(next.clone());
                        on_path.insert(next.clone());
                        path.push(next.clone());
                        stack.push((next, 0));
                    }
                }
                None => {
                    stack.pop();
                    on_path.remove(&node);
                    path.pop();
                }
            }
        }
    }

    cycles
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LinkCount {
    pub id: String,
    pub count: usize,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GraphStats {
    pub total_files: usize,
    pub total_links: usize,
    pub avg_links_per_file: f64,
    pub isolated_files: usize,
    pub cycles: usize,
    pub most_linked: Vec<LinkCount>,
}

/// Summary statistics over a graph snapshot. `most_linked` holds the top
/// five documents by backlink count, descending, ties broken by key order
/// (stable sort over the first-encountered iteration order). Documents
/// with zero backlinks are excluded, so the list can hold fewer than five
/// entries; an unlinked graph reports an empty list.
pub fn graph_stats(graph: &WikiGraph) -> GraphStats {
    let total_files = graph.len();
    let total_links = graph.total_links();
    let avg = if total_files == 0 {
        0.0
    } else {
        (total_links as f64 / total_files as f64 * 100.0).round() / 100.0
    };

    let mut counts: Vec<LinkCount> = graph
        .ids()
        .map(|id| LinkCount {
            id: id.clone(),
            count: backlinks(graph, id).len(),
        })
        .filter(|lc| lc.count > 0)
        .collect();
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts.truncate(5);

    GraphStats {
        total_files,
        total_links,
        avg_links_per_file: avg,
        isolated_files: isolated_nodes(graph).len(),
        cycles: detect_cycles(graph).len(),
        most_linked: counts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_of(edges: &[(&str, &[&str])]) -> WikiGraph {
        let mut graph = WikiGraph::new();
        for (id, links) in edges {
            graph.insert(
                id.to_string(),
                links.iter().map(|s| s.to_string()).collect(),
            );
        }
        graph
    }

    #[test]
    fn test_backlinks_sorted_and_deduped() {
        let graph = graph_of(&[
            ("c.md", &["x.md"]),
            ("a.md", &["x.md", "x.md"]),
            ("b.md", &["y.md"]),
        ]);
        assert_eq!(
            backlinks(&graph, "x.md"),
            vec!["a.md".to_string(), "c.md".to_string()]
        );
    }

    #[test]
    fn test_component_follows_both_directions() {
        // a -> b, c -> b: all one component through the undirected view
        let graph = graph_of(&[
            ("a.md", &["b.md"]),
            ("b.md", &[]),
            ("c.md", &["b.md"]),
            ("lone.md", &[]),
        ]);
        let component = connected_component(&graph, "a.md");
        assert_eq!(component.len(), 3);
        assert!(component.contains("c.md"));
        assert!(!component.contains("lone.md"));
    }

    #[test]
    fn test_component_terminates_on_cycles() {
        let graph = graph_of(&[("a.md", &["b.md"]), ("b.md", &["a.md"])]);
        let component = connected_component(&graph, "a.md");
        assert_eq!(component.len(), 2);
    }

    #[test]
    fn test_isolated_nodes() {
        let graph = graph_of(&[
            ("a.md", &["b.md"]),
            ("b.md", &[]),
            ("z.md", &[]),
            ("m.md", &[]),
        ]);
        assert_eq!(
            isolated_nodes(&graph),
            vec!["m.md".to_string(), "z.md".to_string()]
        );
    }

    #[test]
    fn test_self_loop_is_one_node_cycle() {
        let graph = graph_of(&[("a.md", &["a.md"])]);
        let cycles = detect_cycles(&graph);
        assert_eq!(cycles, vec![vec!["a.md".to_string()]]);
    }

    #[test]
    fn test_two_node_cycle_reported_once() {
        let graph = graph_of(&[("a.md", &["b.md"]), ("b.md", &["a.md"])]);
        let cycles = detect_cycles(&graph);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].len(), 2);
    }

    #[test]
    fn test_disjoint_cycles_all_reported() {
        let graph = graph_of(&[
            ("a.md", &["b.md"]),
            ("b.md", &["a.md"]),
            ("x.md", &["y.md"]),
            ("y.md", &["z.md"]),
            ("z.md", &["x.md"]),
            ("acyclic.md", &["a.md"]),
        ]);
        let mut lengths: Vec<usize> = detect_cycles(&graph).iter().map(|c| c.len()).collect();
        lengths.sort();
        assert_eq!(lengths, vec![2, 3]);
    }

    #[test]
    fn test_acyclic_graph_has_no_cycles() {
        let graph = graph_of(&[("a.md", &["b.md", "c.md"]), ("b.md", &["c.md"]), ("c.md", &[])]);
        assert!(detect_cycles(&graph).is_empty());
    }

    #[test]
    fn test_dangling_edges_do_not_break_cycle_detection() {
        let graph = graph_of(&[("a.md", &["ghost.md", "a.md"])]);
        assert_eq!(detect_cycles(&graph).len(), 1);
    }

    #[test]
    fn test_stats() {
        let graph = graph_of(&[
            ("a.md", &["hub.md"]),
            ("b.md", &["hub.md"]),
            ("c.md", &["hub.md", "a.md"]),
            ("hub.md", &[]),
            ("lone.md", &[]),
        ]);
        let stats = graph_stats(&graph);
        assert_eq!(stats.total_files, 5);
        assert_eq!(stats.total_links, 4);
        assert_eq!(stats.avg_links_per_file, 0.8);
        assert_eq!(stats.isolated_files, 1);
        assert_eq!(stats.cycles, 0);
        assert_eq!(stats.most_linked[0].id, "hub.md");
        assert_eq!(stats.most_linked[0].count, 3);
        assert_eq!(stats.most_linked[1].id, "a.md");
    }

    #[test]
    fn test_stats_rounding() {
        let graph = graph_of(&[("a.md", &["b.md"]), ("b.md", &[]), ("c.md", &[])]);
        // 1 link / 3 files = 0.333... -> 0.33
        assert_eq!(graph_stats(&graph).avg_links_per_file, 0.33);
    }

    #[test]
    fn test_most_linked_omits_unreferenced_documents() {
        let graph = graph_of(&[("a.md", &["hub.md"]), ("hub.md", &[]), ("lone.md", &[])]);
        let stats = graph_stats(&graph);
        assert_eq!(stats.most_linked.len(), 1);
        assert_eq!(stats.most_linked[0].id, "hub.md");
    }

    #[test]
    fn test_stats_empty_graph() {
        let stats = graph_stats(&WikiGraph::new());
        assert_eq!(stats.total_files, 0);
        assert_eq!(stats.avg_links_per_file, 0.0);
        assert!(stats.most_linked.is_empty());
    }
}
