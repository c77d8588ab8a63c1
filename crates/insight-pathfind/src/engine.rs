//! Bounded-hop path search and cross-domain path aggregation.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use insight_core::config::PathSettings;
use insight_core::{EntityKind, GraphPath, HopLimit};
use insight_graph::{Catalog, CatalogQuery, GraphError, GraphStore};

use crate::error::{PathfindError, Result};

/// Pair counts above this are logged as an aggregation hot spot.
const HOT_SPOT_PAIRS: usize = 256;

/// How `find_domain_path` picks its cross-product members and what it
/// searches between them.
///
/// The two kinds are independent. The defaults take a domain's contained
/// metrics as members and look those names up as dashboards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainPathOptions {
    pub member_kind: EntityKind,
    pub path_kind: EntityKind,
    pub max_concurrency: usize,
}

impl Default for DomainPathOptions {
    fn default() -> Self {
        Self {
            member_kind: EntityKind::Metric,
            path_kind: EntityKind::Dashboard,
            max_concurrency: 8,
        }
    }
}

impl From<&PathSettings> for DomainPathOptions {
    fn from(settings: &PathSettings) -> Self {
        Self {
            member_kind: settings.member_kind,
            path_kind: settings.path_kind,
            max_concurrency: settings.max_concurrency.max(1),
        }
    }
}

/// The path resolution engine.
///
/// Clone is cheap (inner Arc).
#[derive(Clone)]
pub struct PathEngine {
    catalog: Catalog,
    options: DomainPathOptions,
    default_max_hops: HopLimit,
}

impl PathEngine {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self {
            catalog: Catalog::new(store),
            options: DomainPathOptions::default(),
            default_max_hops: HopLimit::DEFAULT,
        }
    }

    pub fn with_options(mut self, options: DomainPathOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_default_max_hops(mut self, max_hops: HopLimit) -> Self {
        self.default_max_hops = max_hops;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn options(&self) -> &DomainPathOptions {
        &self.options
    }

    pub fn default_max_hops(&self) -> HopLimit {
        self.default_max_hops
    }

    /// Shortest undirected path between two named nodes of `kind`.
    ///
    /// Returns at most one path. Empty when either name is missing or no
    /// path fits within `max_hops`.
    pub async fn find_path(
        &self,
        kind: EntityKind,
        name1: &str,
        name2: &str,
        max_hops: HopLimit,
    ) -> Result<Vec<GraphPath>> {
        let path = shortest_path(self.catalog.store().as_ref(), kind, name1, name2, max_hops).await?;
        Ok(path.into_iter().collect())
    }

    /// Every non-empty path between members of `domain1` and members of
    /// `domain2`, in no particular order.
    ///
    /// Issues one path query per member pair, at most
    /// `options.max_concurrency` at a time. If any pair fails, or the
    /// returned future is dropped, outstanding pair queries are aborted and
    /// nothing partial is returned.
    pub async fn find_domain_path(
        &self,
        domain1: &str,
        domain2: &str,
        max_hops: HopLimit,
    ) -> Result<Vec<GraphPath>> {
        if domain1.is_empty() || domain2.is_empty() {
            tracing::debug!("Both domain names are required; skipping path search");
            return Ok(Vec::new());
        }

        let member_kind = self.options.member_kind;
        let (members1, members2) = tokio::try_join!(
            self.catalog
                .member_names(EntityKind::Domain, domain1, member_kind),
            self.catalog
                .member_names(EntityKind::Domain, domain2, member_kind),
        )?;

        let pairs: Vec<(String, String)> = members1
            .iter()
            .flat_map(|a| members2.iter().map(move |b| (a.clone(), b.clone())))
            .collect();

        if pairs.is_empty() {
            return Ok(Vec::new());
        }
        // TODO: batch all pairs into a single UNWIND query once the member
        // sets outgrow per-pair round-trips.
        if pairs.len() > HOT_SPOT_PAIRS {
            tracing::warn!(
                pairs = pairs.len(),
                domain1,
                domain2,
                "Large domain cross product; one path query per pair"
            );
        }

        let pair_count = pairs.len();
        let path_kind = self.options.path_kind;
        let permits = Arc::new(Semaphore::new(self.options.max_concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for (from, to) in pairs {
            let store = self.catalog.store().clone();
            let permits = permits.clone();
            tasks.spawn(async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|e| PathfindError::TaskFailed(e.to_string()))?;
                shortest_path(store.as_ref(), path_kind, &from, &to, max_hops).await
            });
        }

        let mut paths = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            let outcome = joined.map_err(|e| PathfindError::TaskFailed(e.to_string()))?;
            if let Some(path) = outcome? {
                paths.push(path);
            }
        }

        tracing::debug!(
            domain1,
            domain2,
            pairs = pair_count,
            paths = paths.len(),
            "Domain path aggregation complete"
        );
        Ok(paths)
    }
}

/// One bounded shortest-path lookup.
///
/// Identical endpoints resolve to a single-node path without a path query,
/// since Neo4j's `shortestPath` rejects zero-length paths.
async fn shortest_path(
    store: &dyn GraphStore,
    kind: EntityKind,
    from: &str,
    to: &str,
    max_hops: HopLimit,
) -> Result<Option<GraphPath>> {
    if from == to {
        let found = store
            .execute(&CatalogQuery::NodeExists {
                kind,
                name: from.to_string(),
            })
            .await?;
        return Ok((!found.is_empty()).then(|| GraphPath::single(from)));
    }

    let records = store
        .execute(&CatalogQuery::ShortestPath {
            kind,
            from: from.to_string(),
            to: to.to_string(),
            max_hops,
        })
        .await?;

    let Some(record) = records.first() else {
        return Ok(None);
    };
    let path = GraphPath {
        nodes: record.get("nodes")?,
        relationships: record.get("relationships")?,
    };
    check_path(&path, from, to, max_hops)?;
    Ok(Some(path))
}

/// Reject store output that breaks the path shape contract.
fn check_path(path: &GraphPath, from: &str, to: &str, max_hops: HopLimit) -> Result<()> {
    let malformed = |reason: &str| {
        PathfindError::Graph(GraphError::QueryFailed(format!(
            "malformed path between {from} and {to}: {reason}"
        )))
    };
    if path.is_empty() {
        return Err(malformed("no nodes"));
    }
    if !path.is_well_formed() {
        return Err(malformed("node and relationship counts disagree"));
    }
    if path.hops() > max_hops.get() as usize {
        return Err(malformed("path exceeds hop limit"));
    }
    if path.nodes.first().map(String::as_str) != Some(from)
        || path.nodes.last().map(String::as_str) != Some(to)
    {
        return Err(malformed("endpoints do not match"));
    }
    Ok(())
}
