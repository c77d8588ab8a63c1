//! In-process catalog graph.
//!
//! Evaluates [`CatalogQuery`] with the same result shapes as the Neo4j
//! adapter. Listings sort by name; `CONTAINS` members and BFS neighbours come
//! back in insertion order, which makes tie-breaks between equal-length paths
//! deterministic.

use std::collections::VecDeque;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use insight_core::{EntityKind, GraphPath, HopLimit, PathRelationship};

use crate::client::{GraphError, GraphStore, Record};
use crate::queries::CatalogQuery;

const PROJECTED_PROPERTIES: &[&str] = &[
    "name",
    "description",
    "owner",
    "owner_email",
    "domain",
    "data_source",
    "last_updated",
];

#[derive(Debug, Clone)]
struct MemoryNode {
    label: String,
    properties: Map<String, Value>,
}

#[derive(Debug, Clone)]
struct MemoryEdge {
    from: usize,
    to: usize,
    rel_type: String,
}

/// A labeled property graph held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryGraph {
    nodes: Vec<MemoryNode>,
    edges: Vec<MemoryEdge>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node and return its index. Non-object `properties` are ignored.
    pub fn add_node(&mut self, label: &str, properties: Value) -> usize {
        let properties = match properties {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        self.nodes.push(MemoryNode {
            label: label.to_string(),
            properties,
        });
        self.nodes.len() - 1
    }

    /// Add a directed, typed edge between two existing nodes.
    pub fn add_edge(&mut self, from: usize, to: usize, rel_type: &str) {
        debug_assert!(from < self.nodes.len() && to < self.nodes.len());
        self.edges.push(MemoryEdge {
            from,
            to,
            rel_type: rel_type.to_string(),
        });
    }

    /// Evaluate a query synchronously.
    pub fn evaluate(&self, query: &CatalogQuery) -> Vec<Record> {
        match query {
            CatalogQuery::Ping => vec![Record::new().with("ok", 1)],
            CatalogQuery::ListEntities { kind } => self.summaries(*kind, |_| true),
            CatalogQuery::SearchByName { kind, substring } => {
                self.summaries(*kind, |name| name.contains(substring.as_str()))
            }
            CatalogQuery::ListNames { kind } => {
                let mut names: Vec<String> = self
                    .with_label(*kind)
                    .map(|idx| self.name_of(idx))
                    .collect();
                names.sort();
                names
                    .into_iter()
                    .map(|name| Record::new().with("name", name))
                    .collect()
            }
            CatalogQuery::EntityDetail { kind, name } => self
                .find(*kind, name)
                .map(|idx| vec![Record::new().with("entity", self.project(idx))])
                .unwrap_or_default(),
            CatalogQuery::ContainedMembers {
                container,
                name,
                member,
            } => self.contained(*container, name, *member),
            CatalogQuery::NodeExists { kind, name } => self
                .find(*kind, name)
                .map(|idx| vec![Record::new().with("name", self.name_of(idx))])
                .unwrap_or_default(),
            CatalogQuery::ShortestPath {
                kind,
                from,
                to,
                max_hops,
            } => {
                let path = match (self.find(*kind, from), self.find(*kind, to)) {
                    (Some(a), Some(b)) => self.shortest_path(a, b, *max_hops),
                    _ => None,
                };
                path.map(|p| {
                    vec![Record::new()
                        .with("nodes", json!(p.nodes))
                        .with("relationships", json!(p.relationships))]
                })
                .unwrap_or_default()
            }
        }
    }

    fn with_label(&self, kind: EntityKind) -> impl Iterator<Item = usize> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(move |(_, n)| n.label == kind.label())
            .map(|(idx, _)| idx)
    }

    fn find(&self, kind: EntityKind, name: &str) -> Option<usize> {
        self.with_label(kind).find(|&idx| {
            self.nodes[idx].properties.get("name").and_then(Value::as_str) == Some(name)
        })
    }

    /// Node name, falling back to a positional id for unnamed nodes.
    fn name_of(&self, idx: usize) -> String {
        self.nodes[idx]
            .properties
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("#{idx}"))
    }

    fn project(&self, idx: usize) -> Value {
        let props = &self.nodes[idx].properties;
        let projected: Map<String, Value> = PROJECTED_PROPERTIES
            .iter()
            .map(|&key| (key.to_string(), props.get(key).cloned().unwrap_or(Value::Null)))
            .collect();
        Value::Object(projected)
    }

    fn summaries(&self, kind: EntityKind, keep: impl Fn(&str) -> bool) -> Vec<Record> {
        let mut matched: Vec<usize> = self
            .with_label(kind)
            .filter(|&idx| keep(&self.name_of(idx)))
            .collect();
        matched.sort_by_key(|&idx| self.name_of(idx));
        matched
            .into_iter()
            .map(|idx| {
                let description = self.nodes[idx]
                    .properties
                    .get("description")
                    .cloned()
                    .unwrap_or(Value::Null);
                Record::new()
                    .with("name", self.name_of(idx))
                    .with("description", description)
            })
            .collect()
    }

    fn contained(&self, container: EntityKind, name: &str, member: EntityKind) -> Vec<Record> {
        let Some(c) = self.find(container, name) else {
            return Vec::new();
        };
        let members: Vec<Value> = self
            .edges
            .iter()
            .filter(|e| e.from == c && e.rel_type == "CONTAINS")
            .filter(|e| self.nodes[e.to].label == member.label())
            .map(|e| self.project(e.to))
            .collect();
        if members.is_empty() {
            return Vec::new();
        }
        vec![Record::new()
            .with("container", self.name_of(c))
            .with("members", Value::Array(members))]
    }

    /// Breadth-first search over edges in both directions, at most
    /// `max_hops` edges deep.
    fn shortest_path(&self, from: usize, to: usize, max_hops: HopLimit) -> Option<GraphPath> {
        if from == to {
            return Some(GraphPath::single(self.name_of(from)));
        }

        let limit = max_hops.get() as usize;
        let mut depth: Vec<Option<usize>> = vec![None; self.nodes.len()];
        // (previous node, edge index) for every reached node.
        let mut prev: Vec<Option<(usize, usize)>> = vec![None; self.nodes.len()];
        let mut queue = VecDeque::new();

        depth[from] = Some(0);
        queue.push_back(from);

        while let Some(node) = queue.pop_front() {
            let d = depth[node].unwrap_or(0);
            if d == limit {
                continue;
            }
            for (edge_idx, edge) in self.edges.iter().enumerate() {
                let next = if edge.from == node {
                    edge.to
                } else if edge.to == node {
                    edge.from
                } else {
                    continue;
                };
                if depth[next].is_some() {
                    continue;
                }
                depth[next] = Some(d + 1);
                prev[next] = Some((node, edge_idx));
                if next == to {
                    return Some(self.reconstruct(from, to, &prev));
                }
                queue.push_back(next);
            }
        }

        None
    }

    fn reconstruct(&self, from: usize, to: usize, prev: &[Option<(usize, usize)>]) -> GraphPath {
        let mut nodes = vec![to];
        let mut edges = Vec::new();
        let mut cursor = to;
        while cursor != from {
            let Some((parent, edge_idx)) = prev[cursor] else {
                break;
            };
            edges.push(edge_idx);
            nodes.push(parent);
            cursor = parent;
        }
        nodes.reverse();
        edges.reverse();

        GraphPath {
            nodes: nodes.into_iter().map(|idx| self.name_of(idx)).collect(),
            relationships: edges
                .into_iter()
                .map(|edge_idx| {
                    let edge = &self.edges[edge_idx];
                    PathRelationship {
                        start: self.name_of(edge.from),
                        end: self.name_of(edge.to),
                        rel_type: edge.rel_type.clone(),
                    }
                })
                .collect(),
        }
    }
}

#[async_trait]
impl GraphStore for MemoryGraph {
    async fn execute(&self, query: &CatalogQuery) -> Result<Vec<Record>, GraphError> {
        Ok(self.evaluate(query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hops(n: u32) -> HopLimit {
        HopLimit::new(n).unwrap()
    }

    fn dashboard(g: &mut MemoryGraph, name: &str) -> usize {
        g.add_node("Dashboard", json!({ "name": name, "description": format!("{name} board") }))
    }

    fn path_query(from: &str, to: &str, max_hops: u32) -> CatalogQuery {
        CatalogQuery::ShortestPath {
            kind: EntityKind::Dashboard,
            from: from.to_string(),
            to: to.to_string(),
            max_hops: hops(max_hops),
        }
    }

    fn decode_path(records: &[Record]) -> GraphPath {
        GraphPath {
            nodes: records[0].get("nodes").unwrap(),
            relationships: records[0].get("relationships").unwrap(),
        }
    }

    #[test]
    fn test_bfs_ignores_edge_direction() {
        let mut g = MemoryGraph::new();
        let a = dashboard(&mut g, "A");
        let b = dashboard(&mut g, "B");
        let c = g.add_node("Team", json!({ "name": "C" }));
        g.add_edge(a, c, "OWNED_BY");
        g.add_edge(b, c, "OWNED_BY");

        let path = decode_path(&g.evaluate(&path_query("A", "B", 5)));
        assert_eq!(path.nodes, vec!["A", "C", "B"]);
        assert_eq!(path.relationships[1].start, "B");
        assert_eq!(path.relationships[1].end, "C");
    }

    #[test]
    fn test_bfs_respects_hop_limit() {
        let mut g = MemoryGraph::new();
        let names = ["A", "B", "C", "D"];
        let idx: Vec<usize> = names.iter().map(|n| dashboard(&mut g, n)).collect();
        for pair in idx.windows(2) {
            g.add_edge(pair[0], pair[1], "LINKS_TO");
        }

        assert!(g.evaluate(&path_query("A", "D", 2)).is_empty());
        let path = decode_path(&g.evaluate(&path_query("A", "D", 3)));
        assert_eq!(path.hops(), 3);
    }

    #[test]
    fn test_bfs_prefers_shorter_route() {
        let mut g = MemoryGraph::new();
        let a = dashboard(&mut g, "A");
        let x = dashboard(&mut g, "X");
        let y = dashboard(&mut g, "Y");
        let b = dashboard(&mut g, "B");
        g.add_edge(a, x, "LINKS_TO");
        g.add_edge(x, y, "LINKS_TO");
        g.add_edge(y, b, "LINKS_TO");
        g.add_edge(a, b, "SHARES_METRIC");

        let path = decode_path(&g.evaluate(&path_query("A", "B", 5)));
        assert_eq!(path.nodes, vec!["A", "B"]);
        assert_eq!(path.relationships[0].rel_type, "SHARES_METRIC");
    }

    #[test]
    fn test_path_endpoints_must_match_kind() {
        let mut g = MemoryGraph::new();
        let a = dashboard(&mut g, "A");
        let m = g.add_node("Metric", json!({ "name": "B" }));
        g.add_edge(a, m, "CONTAINS");

        assert!(g.evaluate(&path_query("A", "B", 5)).is_empty());
    }

    #[test]
    fn test_search_is_case_sensitive_and_sorted() {
        let mut g = MemoryGraph::new();
        g.add_node("Metric", json!({ "name": "revenue_total" }));
        g.add_node("Metric", json!({ "name": "Revenue_net" }));
        g.add_node("Metric", json!({ "name": "arr_revenue" }));

        let records = g.evaluate(&CatalogQuery::SearchByName {
            kind: EntityKind::Metric,
            substring: "revenue".to_string(),
        });
        let names: Vec<String> = records.iter().map(|r| r.get("name").unwrap()).collect();
        assert_eq!(names, vec!["arr_revenue", "revenue_total"]);
        assert_eq!(records[0].value("description"), Some(&Value::Null));
    }

    #[test]
    fn test_contained_members_keep_insertion_order() {
        let mut g = MemoryGraph::new();
        let d = g.add_node("Domain", json!({ "name": "billing" }));
        let mrr = g.add_node("Metric", json!({ "name": "mrr" }));
        let churn = g.add_node("Metric", json!({ "name": "churn" }));
        let board = dashboard(&mut g, "finance");
        g.add_edge(d, mrr, "CONTAINS");
        g.add_edge(d, churn, "CONTAINS");
        g.add_edge(d, board, "CONTAINS");

        let records = g.evaluate(&CatalogQuery::ContainedMembers {
            container: EntityKind::Domain,
            name: "billing".to_string(),
            member: EntityKind::Metric,
        });
        let members: Vec<Value> = records[0].get("members").unwrap();
        let names: Vec<&str> = members.iter().filter_map(|m| m["name"].as_str()).collect();
        assert_eq!(names, vec!["mrr", "churn"]);
    }

    #[test]
    fn test_ping_returns_one_row() {
        assert_eq!(MemoryGraph::new().evaluate(&CatalogQuery::Ping).len(), 1);
    }
}
