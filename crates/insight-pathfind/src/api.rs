//! JSON request/response contract.
//!
//! A request is one JSON object tagged by `operation`; the response is the
//! operation's result rendered as a JSON value.

use std::io::Read;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use insight_core::{EntityKind, HopLimit};
use insight_graph::{with_deadline, Catalog, GraphError};

use crate::engine::PathEngine;
use crate::error::{PathfindError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "operation", rename_all = "camelCase")]
pub enum CatalogRequest {
    ListMetrics,
    SearchMetrics {
        #[serde(default)]
        substring: String,
    },
    SearchDashboards {
        #[serde(default)]
        substring: String,
    },
    ListDomains,
    GetDomainDetail {
        name: String,
    },
    GetDomainMetrics {
        domain: String,
    },
    GetDashboardDetail {
        name: String,
    },
    GetDashboardMetrics {
        dashboard: String,
    },
    GetMetricDetail {
        name: String,
    },
    FindPath {
        kind: EntityKind,
        name1: String,
        name2: String,
        #[serde(default)]
        max_hops: Option<u32>,
    },
    FindDomainPath {
        domain1: String,
        domain2: String,
        #[serde(default)]
        max_hops: Option<u32>,
    },
}

impl CatalogRequest {
    /// Wire name of the operation, for logging.
    pub fn operation(&self) -> &'static str {
        match self {
            Self::ListMetrics => "listMetrics",
            Self::SearchMetrics { .. } => "searchMetrics",
            Self::SearchDashboards { .. } => "searchDashboards",
            Self::ListDomains => "listDomains",
            Self::GetDomainDetail { .. } => "getDomainDetail",
            Self::GetDomainMetrics { .. } => "getDomainMetrics",
            Self::GetDashboardDetail { .. } => "getDashboardDetail",
            Self::GetDashboardMetrics { .. } => "getDashboardMetrics",
            Self::GetMetricDetail { .. } => "getMetricDetail",
            Self::FindPath { .. } => "findPath",
            Self::FindDomainPath { .. } => "findDomainPath",
        }
    }
}

/// Read one request object from `reader`.
pub fn read_request(reader: impl Read) -> Result<CatalogRequest> {
    let input = std::io::read_to_string(reader)?;
    serde_json::from_str(&input).map_err(|e| PathfindError::InvalidRequest(e.to_string()))
}

/// Dispatches requests to the catalog and path engine.
#[derive(Clone)]
pub struct CatalogApi {
    catalog: Catalog,
    engine: PathEngine,
    deadline: Option<Duration>,
}

impl CatalogApi {
    pub fn new(engine: PathEngine) -> Self {
        Self {
            catalog: engine.catalog().clone(),
            engine,
            deadline: None,
        }
    }

    /// Bound every request; on expiry in-flight store calls are dropped and
    /// the request fails with `Timeout`.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub async fn handle(&self, request: CatalogRequest) -> Result<Value> {
        let operation = request.operation();
        tracing::debug!(operation, "Handling request");
        let result = with_deadline(self.deadline, self.dispatch(request)).await;
        if let Err(ref e) = result {
            tracing::warn!(operation, error = %e, "Request failed");
        }
        result
    }

    async fn dispatch(&self, request: CatalogRequest) -> Result<Value> {
        let value = match request {
            CatalogRequest::ListMetrics => serde_json::to_value(self.catalog.list_metrics().await?)?,
            CatalogRequest::SearchMetrics { substring } => {
                serde_json::to_value(self.catalog.search_metrics(&substring).await?)?
            }
            CatalogRequest::SearchDashboards { substring } => {
                serde_json::to_value(self.catalog.search_dashboards(&substring).await?)?
            }
            CatalogRequest::ListDomains => serde_json::to_value(self.catalog.list_domains().await?)?,
            CatalogRequest::GetDomainDetail { name } => {
                or_empty_object(self.catalog.get_domain_detail(&name).await?)?
            }
            CatalogRequest::GetDomainMetrics { domain } => {
                serde_json::to_value(self.catalog.get_domain_metrics(&domain).await?)?
            }
            CatalogRequest::GetDashboardDetail { name } => {
                or_empty_object(self.catalog.get_dashboard_detail(&name).await?)?
            }
            CatalogRequest::GetDashboardMetrics { dashboard } => {
                serde_json::to_value(self.catalog.get_dashboard_metrics(&dashboard).await?)?
            }
            CatalogRequest::GetMetricDetail { name } => {
                or_empty_object(self.catalog.get_metric_detail(&name).await?)?
            }
            CatalogRequest::FindPath {
                kind,
                name1,
                name2,
                max_hops,
            } => {
                let max_hops = self.hop_limit(max_hops)?;
                serde_json::to_value(self.engine.find_path(kind, &name1, &name2, max_hops).await?)?
            }
            CatalogRequest::FindDomainPath {
                domain1,
                domain2,
                max_hops,
            } => {
                let max_hops = self.hop_limit(max_hops)?;
                serde_json::to_value(
                    self.engine
                        .find_domain_path(&domain1, &domain2, max_hops)
                        .await?,
                )?
            }
        };
        Ok(value)
    }

    fn hop_limit(&self, requested: Option<u32>) -> Result<HopLimit> {
        match requested {
            None => Ok(self.engine.default_max_hops()),
            Some(hops) => HopLimit::new(hops).ok_or(GraphError::InvalidHopLimit(hops).into()),
        }
    }
}

/// Not-found detail lookups answer with `{}`.
fn or_empty_object<T: serde::Serialize>(found: Option<T>) -> Result<Value> {
    match found {
        Some(entity) => Ok(serde_json::to_value(entity)?),
        None => Ok(Value::Object(serde_json::Map::new())),
    }
}
