//! Typed catalog queries and their Cypher rendering.
//!
//! Every value supplied by a caller travels as a bound parameter. The only
//! text spliced into a template is an [`EntityKind`] label (closed enum) or a
//! validated [`HopLimit`], since Neo4j accepts neither as a parameter.

use insight_core::{EntityKind, HopLimit};

/// A bound query parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Param {
    Text(String),
}

/// A rendered Cypher statement: template, bound parameters and the column
/// aliases it returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub cypher: String,
    pub params: Vec<(&'static str, Param)>,
    pub columns: &'static [&'static str],
}

/// Every read the catalog and path engine issue against the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogQuery {
    /// Trivial round-trip used for liveness checks.
    Ping,
    /// `{name, description}` of every node of a kind, ordered by name.
    ListEntities { kind: EntityKind },
    /// `{name, description}` of nodes whose name contains `substring`
    /// (case-sensitive), ordered by name.
    SearchByName { kind: EntityKind, substring: String },
    /// Names of every node of a kind, ordered by name.
    ListNames { kind: EntityKind },
    /// Property projection of a single node, as column `entity`.
    EntityDetail { kind: EntityKind, name: String },
    /// Nodes reached over outgoing `CONTAINS` edges, as columns `container`
    /// and `members`. No row when nothing matches.
    ContainedMembers {
        container: EntityKind,
        name: String,
        member: EntityKind,
    },
    /// One row with column `name` when the node exists.
    NodeExists { kind: EntityKind, name: String },
    /// Shortest undirected path of any relationship type, as columns `nodes`
    /// and `relationships`. No row when either endpoint is missing or no path
    /// exists within the bound.
    ShortestPath {
        kind: EntityKind,
        from: String,
        to: String,
        max_hops: HopLimit,
    },
}

const SUMMARY_COLUMNS: &[&str] = &["name", "description"];
const NAME_COLUMNS: &[&str] = &["name"];
const PATH_COLUMNS: &[&str] = &["nodes", "relationships"];

/// Properties projected for a catalog node. Metrics and containers share the
/// projection; absent properties come back as null.
const NODE_PROJECTION: &str = "{.name, .description, .owner, .owner_email, \
     .domain, .data_source, last_updated: toString(NODE.last_updated)}";

impl CatalogQuery {
    /// Short identifier for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ping => "ping",
            Self::ListEntities { .. } => "list_entities",
            Self::SearchByName { .. } => "search_by_name",
            Self::ListNames { .. } => "list_names",
            Self::EntityDetail { .. } => "entity_detail",
            Self::ContainedMembers { .. } => "contained_members",
            Self::NodeExists { .. } => "node_exists",
            Self::ShortestPath { .. } => "shortest_path",
        }
    }

    /// Render to Cypher with bound parameters.
    pub fn statement(&self) -> Statement {
        match self {
            Self::Ping => Statement {
                cypher: "RETURN 1 AS ok".to_string(),
                params: Vec::new(),
                columns: &["ok"],
            },
            Self::ListEntities { kind } => Statement {
                cypher: format!(
                    "MATCH (n:{label})
                     RETURN n.name AS name, n.description AS description
                     ORDER BY n.name",
                    label = kind.label()
                ),
                params: Vec::new(),
                columns: SUMMARY_COLUMNS,
            },
            Self::SearchByName { kind, substring } => Statement {
                cypher: format!(
                    "MATCH (n:{label})
                     WHERE n.name CONTAINS $substring
                     RETURN n.name AS name, n.description AS description
                     ORDER BY n.name",
                    label = kind.label()
                ),
                params: vec![("substring", Param::Text(substring.clone()))],
                columns: SUMMARY_COLUMNS,
            },
            Self::ListNames { kind } => Statement {
                cypher: format!(
                    "MATCH (n:{label})
                     RETURN n.name AS name
                     ORDER BY n.name",
                    label = kind.label()
                ),
                params: Vec::new(),
                columns: NAME_COLUMNS,
            },
            Self::EntityDetail { kind, name } => Statement {
                cypher: format!(
                    "MATCH (n:{label} {{name: $name}})
                     RETURN n {projection} AS entity
                     LIMIT 1",
                    label = kind.label(),
                    projection = NODE_PROJECTION.replace("NODE", "n"),
                ),
                params: vec![("name", Param::Text(name.clone()))],
                columns: &["entity"],
            },
            Self::ContainedMembers {
                container,
                name,
                member,
            } => Statement {
                cypher: format!(
                    "MATCH (c:{container} {{name: $name}})-[:CONTAINS]->(m:{member})
                     RETURN c.name AS container, collect(m {projection}) AS members",
                    container = container.label(),
                    member = member.label(),
                    projection = NODE_PROJECTION.replace("NODE", "m"),
                ),
                params: vec![("name", Param::Text(name.clone()))],
                columns: &["container", "members"],
            },
            Self::NodeExists { kind, name } => Statement {
                cypher: format!(
                    "MATCH (n:{label} {{name: $name}})
                     RETURN n.name AS name
                     LIMIT 1",
                    label = kind.label()
                ),
                params: vec![("name", Param::Text(name.clone()))],
                columns: NAME_COLUMNS,
            },
            Self::ShortestPath {
                kind,
                from,
                to,
                max_hops,
            } => Statement {
                cypher: format!(
                    "MATCH (a:{label} {{name: $from}}), (b:{label} {{name: $to}})
                     MATCH p = shortestPath((a)-[*..{max_hops}]-(b))
                     RETURN [n IN nodes(p) | coalesce(n.name, elementId(n))] AS nodes,
                            [r IN relationships(p) | {{
                               start: coalesce(startNode(r).name, elementId(startNode(r))),
                               end: coalesce(endNode(r).name, elementId(endNode(r))),
                               type: type(r)
                            }}] AS relationships
                     LIMIT 1",
                    label = kind.label(),
                    max_hops = max_hops.get(),
                ),
                params: vec![
                    ("from", Param::Text(from.clone())),
                    ("to", Param::Text(to.clone())),
                ],
                columns: PATH_COLUMNS,
            },
        }
    }
}
