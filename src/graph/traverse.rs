//! Bounded multi-hop path enumeration between two entities.
//!
//! Breadth-first over partial paths. Each partial path carries its own visited
//! set, so only simple paths are produced and cycles cannot keep a path alive;
//! the hop bound caps length on top of that.

use std::collections::{HashSet, VecDeque};

use super::index::ReferenceGraph;
use super::{Path, Triple};

/// Configuration for a path search.
#[derive(Debug, Clone)]
pub struct PathConfig {
    /// Maximum number of edges in a returned path.
    pub max_len: usize,
    /// Stop once this many paths have been collected.
    pub max_paths: usize,
}

/// Outcome of one path search.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathSearch {
    pub paths: Vec<Path>,
    /// The search hit `max_paths` and stopped early.
    pub truncated: bool,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            max_len: 3,
            max_paths: 10_000,
        }
    }
}

struct Partial<'a> {
    edges: Vec<(&'a str, &'a str, &'a str)>,
    visited: HashSet<&'a str>,
    last: &'a str,
}

/// Every simple path from `start` to `end` with at most `max_len` edges.
pub fn find_paths(graph: &ReferenceGraph, start: &str, end: &str, max_len: usize) -> Vec<Path> {
    find_paths_with(
        graph,
        start,
        end,
        &PathConfig {
            max_len,
            ..Default::default()
        },
    )
}

/// Path search with full configuration. Paths come out shortest first, and in
/// adjacency insertion order within one length.
pub fn find_paths_with(
    graph: &ReferenceGraph,
    start: &str,
    end: &str,
    config: &PathConfig,
) -> Vec<Path> {
    search_paths(graph, start, end, config).paths
}

/// Like [`find_paths_with`], but also reports whether `max_paths` cut the
/// search short. A truncated search is logged at warn level.
pub fn search_paths(
    graph: &ReferenceGraph,
    start: &str,
    end: &str,
    config: &PathConfig,
) -> PathSearch {
    if start == end || config.max_len == 0 || !graph.has_outgoing(start) {
        return PathSearch::default();
    }

    let mut paths: Vec<Path> = Vec::new();
    let mut queue: VecDeque<Partial<'_>> = VecDeque::new();
    let Some(start) = graph.entities().get(start).map(String::as_str) else {
        return PathSearch::default();
    };
    queue.push_back(Partial {
        edges: Vec::new(),
        visited: HashSet::from([start]),
        last: start,
    });

    while let Some(partial) = queue.pop_front() {
        if partial.edges.len() >= config.max_len {
            continue;
        }

        for (next, relation) in graph.neighbors(partial.last) {
            if partial.visited.contains(next) {
                continue;
            }

            let mut edges = partial.edges.clone();
            edges.push((partial.last, relation, next));

            if next == end {
                paths.push(
                    edges
                        .iter()
                        .map(|(s, r, t)| Triple::new(*s, *r, *t))
                        .collect(),
                );
                if paths.len() >= config.max_paths {
                    tracing::warn!(
                        start,
                        end,
                        cap = config.max_paths,
                        max_len = config.max_len,
                        "path search truncated; later paths are not scored"
                    );
                    return PathSearch {
                        paths,
                        truncated: true,
                    };
                }
            } else {
                let mut visited = partial.visited.clone();
                visited.insert(next);
                queue.push_back(Partial {
                    edges,
                    visited,
                    last: next,
                });
            }
        }
    }

    PathSearch {
        paths,
        truncated: false,
    }
}
