//! TeaRank: personalization, propagation and versioned persistence of ranks.

mod distribute;
mod personalize;
mod precision;

pub use distribute::{DistributeParams, Distribution, distribute};
pub use personalize::personalize;
pub use precision::DecimalContext;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::TeaRankConfig;
use crate::error::Result;
use crate::graph::{GraphBuild, StoreDependencies, build_graph};
use crate::pipeline::RunContext;
use crate::store::Store;
use crate::types::{TeaRank, TeaRankRun};

#[derive(Debug, Clone, Serialize)]
pub struct RankReport {
    pub run: i64,
    pub canons: usize,
    pub edges: usize,
    pub missing: usize,
    pub iterations: u64,
    pub truncated: bool,
    pub total: Decimal,
    pub persisted: bool,
}

/// Builds the canon graph from the store, ranks it and, when `persist` is set,
/// appends a new run.
///
/// Ranks are committed before the run record, so a failure in between leaves
/// orphaned ranks but never a run pointing at incomplete ranks.
pub fn run_ranking(
    store: &dyn Store,
    config: &TeaRankConfig,
    context: &RunContext,
    cancel: &CancellationToken,
    now: DateTime<Utc>,
    persist: bool,
) -> Result<RankReport> {
    let ctx = config.context()?;

    let package_to_canon = store.get_package_to_canon_mapping()?;
    info!("{} package to canon mappings", package_to_canon.len());

    let packages = store.get_packages_by_package_manager(&context.ranked_package_manager_ids)?;
    info!("{} packages", packages.len());

    let dependencies = StoreDependencies::new(
        store,
        context.legacy_package_manager_ids.iter().cloned(),
    );
    let GraphBuild { graph, missing } =
        build_graph(&package_to_canon, &packages, |package| {
            dependencies.dependencies_of(package)
        })?;
    if !missing.is_empty() {
        warn!("Missing {} packages without a canon", missing.len());
    }

    let personalization = personalize(graph.nodes(), &context.favorites, &ctx);
    let params = DistributeParams {
        split_ratio: config.split_ratio,
        tol: config.tol,
        max_iter: config.max_iter,
        ctx,
    };
    let distribution = distribute(&graph, &personalization, &params, cancel)?;
    let ranks = distribution.by_canon(&graph);

    let current_run = store
        .get_latest_rank_run()?
        .map_or(1, |latest| latest.run + 1);
    info!("Starting TeaRank run number: {}", current_run);

    let rows: Vec<TeaRank> = ranks
        .into_iter()
        .map(|(canon_id, rank)| TeaRank {
            id: Uuid::new_v4().to_string(),
            canon_id,
            run: current_run,
            rank,
            created_at: now,
        })
        .collect();

    if persist {
        store.insert_ranks(&rows)?;
        store.insert_rank_run(&TeaRankRun {
            id: Uuid::new_v4().to_string(),
            run: current_run,
            split_ratio: config.split_ratio,
            created_at: now,
        })?;
        info!("TeaRank run {} stored {} ranks", current_run, rows.len());
    } else {
        info!("Dry run, discarding {} ranks for run {}", rows.len(), current_run);
    }

    Ok(RankReport {
        run: current_run,
        canons: graph.node_count(),
        edges: graph.edge_count(),
        missing: missing.len(),
        iterations: distribution.iterations,
        truncated: distribution.truncated,
        total: ctx.round(distribution.total()),
        persisted: persist,
    })
}
