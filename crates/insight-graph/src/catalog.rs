//! Entity-level catalog reads: listings, substring search, detail and
//! `CONTAINS` membership.
//!
//! "Not found" is never an error here. Missing entities come back as `None`
//! or as empty collections; only store failures propagate.

use std::sync::Arc;

use insight_core::{
    DashboardMetrics, DomainMetrics, EntityDetail, EntityKind, EntitySummary, Metric,
};

use crate::client::{GraphError, GraphStore};
use crate::queries::CatalogQuery;

/// Catalog query service over an injected store.
///
/// Clone is cheap (inner Arc).
#[derive(Clone)]
pub struct Catalog {
    store: Arc<dyn GraphStore>,
}

impl Catalog {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn GraphStore> {
        &self.store
    }

    // ── Listings & Search ────────────────────────────────────────

    /// All metrics, ordered by name.
    pub async fn list_metrics(&self) -> Result<Vec<EntitySummary>, GraphError> {
        self.summaries(CatalogQuery::ListEntities {
            kind: EntityKind::Metric,
        })
        .await
    }

    /// Metrics whose name contains `substring`.
    ///
    /// Matching is case-sensitive (`"Rev"` does not match `"revenue"`); the
    /// empty string matches every metric.
    pub async fn search_metrics(&self, substring: &str) -> Result<Vec<EntitySummary>, GraphError> {
        self.search(EntityKind::Metric, substring).await
    }

    /// Dashboards whose name contains `substring`. Same matching rules as
    /// [`Catalog::search_metrics`].
    pub async fn search_dashboards(
        &self,
        substring: &str,
    ) -> Result<Vec<EntitySummary>, GraphError> {
        self.search(EntityKind::Dashboard, substring).await
    }

    /// All domain names, ordered.
    pub async fn list_domains(&self) -> Result<Vec<String>, GraphError> {
        let records = self
            .store
            .execute(&CatalogQuery::ListNames {
                kind: EntityKind::Domain,
            })
            .await?;
        records.iter().map(|r| r.get("name")).collect()
    }

    // ── Detail & Membership ──────────────────────────────────────

    pub async fn get_domain_detail(&self, name: &str) -> Result<Option<EntityDetail>, GraphError> {
        self.detail(EntityKind::Domain, name).await
    }

    /// Metrics contained by a domain. A missing domain and an empty one look
    /// the same; use [`Catalog::get_domain_detail`] to tell them apart.
    pub async fn get_domain_metrics(&self, domain: &str) -> Result<DomainMetrics, GraphError> {
        let metrics = self
            .contained(EntityKind::Domain, domain, EntityKind::Metric)
            .await?;
        Ok(DomainMetrics {
            domain: domain.to_string(),
            metrics,
        })
    }

    pub async fn get_dashboard_detail(
        &self,
        name: &str,
    ) -> Result<Option<EntityDetail>, GraphError> {
        self.detail(EntityKind::Dashboard, name).await
    }

    pub async fn get_dashboard_metrics(
        &self,
        dashboard: &str,
    ) -> Result<DashboardMetrics, GraphError> {
        let metrics = self
            .contained(EntityKind::Dashboard, dashboard, EntityKind::Metric)
            .await?;
        Ok(DashboardMetrics {
            dashboard: dashboard.to_string(),
            metrics,
        })
    }

    /// Full attributes of one metric, matched by exact name.
    pub async fn get_metric_detail(&self, name: &str) -> Result<Option<Metric>, GraphError> {
        let records = self
            .store
            .execute(&CatalogQuery::EntityDetail {
                kind: EntityKind::Metric,
                name: name.to_string(),
            })
            .await?;
        records.first().map(|r| r.get("entity")).transpose()
    }

    /// Names of `member` nodes a container reaches over `CONTAINS`, in store
    /// order.
    pub async fn member_names(
        &self,
        container: EntityKind,
        name: &str,
        member: EntityKind,
    ) -> Result<Vec<String>, GraphError> {
        let members = self.contained(container, name, member).await?;
        Ok(members.into_iter().map(|m| m.name).collect())
    }

    // ── Helpers ──────────────────────────────────────────────────

    async fn search(
        &self,
        kind: EntityKind,
        substring: &str,
    ) -> Result<Vec<EntitySummary>, GraphError> {
        self.summaries(CatalogQuery::SearchByName {
            kind,
            substring: substring.to_string(),
        })
        .await
    }

    async fn summaries(&self, query: CatalogQuery) -> Result<Vec<EntitySummary>, GraphError> {
        let records = self.store.execute(&query).await?;
        records
            .iter()
            .map(|r| {
                Ok(EntitySummary {
                    name: r.get("name")?,
                    description: r.get::<Option<String>>("description")?.unwrap_or_default(),
                })
            })
            .collect()
    }

    async fn detail(
        &self,
        kind: EntityKind,
        name: &str,
    ) -> Result<Option<EntityDetail>, GraphError> {
        let records = self
            .store
            .execute(&CatalogQuery::EntityDetail {
                kind,
                name: name.to_string(),
            })
            .await?;
        records.first().map(|r| r.get("entity")).transpose()
    }

    async fn contained(
        &self,
        container: EntityKind,
        name: &str,
        member: EntityKind,
    ) -> Result<Vec<Metric>, GraphError> {
        let records = self
            .store
            .execute(&CatalogQuery::ContainedMembers {
                container,
                name: name.to_string(),
                member,
            })
            .await?;
        match records.first() {
            Some(record) => record.get("members"),
            None => Ok(Vec::new()),
        }
    }
}
