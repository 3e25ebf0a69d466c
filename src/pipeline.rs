//! One full TeaRank invocation: dedupe to completion, then rank.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;
use crate::dedupe::{CanonNamer, DedupeReport, run_dedupe};
use crate::error::{Error, Result};
use crate::rank::{RankReport, run_ranking};
use crate::store::Store;

/// Configuration resolved against the store's package-manager registry.
///
/// Built once per run; everything downstream works with ids only.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    pub ranked_package_manager_ids: Vec<String>,
    pub legacy_package_manager_ids: Vec<String>,
    /// Prior weight keyed by package manager id.
    pub favorites: HashMap<String, Decimal>,
}

impl RunContext {
    pub fn resolve(store: &dyn Store, config: &Config) -> Result<Self> {
        config.validate()?;

        let resolve_id = |name: &str| -> Result<Option<String>> {
            let id = store.get_package_manager_by_name(name)?.map(|pm| pm.id);
            if id.is_none() {
                warn!("Package manager {} is not registered, ignoring it", name);
            }
            Ok(id)
        };

        let mut context = Self::default();

        for name in &config.package_managers.ranked {
            if let Some(id) = resolve_id(name)? {
                context.ranked_package_manager_ids.push(id);
            }
        }
        if context.ranked_package_manager_ids.is_empty() {
            return Err(Error::UnknownPackageManager(
                config.package_managers.ranked.join(", "),
            ));
        }

        for name in &config.package_managers.legacy {
            if let Some(id) = resolve_id(name)? {
                context.legacy_package_manager_ids.push(id);
            }
        }

        for (name, weight) in &config.tearank.favorites {
            if let Some(id) = resolve_id(name)? {
                context.favorites.insert(id, *weight);
            }
        }

        Ok(context)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub dedupe: DedupeReport,
    pub rank: RankReport,
}

/// Runs deduplication and then ranking against the same store.
///
/// With `dry_run` nothing is written: canon changes and ranks are computed
/// and reported only. Ranking then sees the canons as they were before.
pub fn run(
    store: &dyn Store,
    config: &Config,
    namer: &dyn CanonNamer,
    cancel: &CancellationToken,
    now: DateTime<Utc>,
    dry_run: bool,
) -> Result<PipelineReport> {
    let context = RunContext::resolve(store, config)?;

    let mut dedupe_config = config.dedupe.clone();
    if dry_run {
        dedupe_config.load = false;
    }
    let dedupe = run_dedupe(store, &dedupe_config, namer, now)?;

    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }

    let rank = run_ranking(store, &config.tearank, &context, cancel, now, !dry_run)?;

    info!(
        "TeaRank run {}: {} canons, {} edges, {} iterations",
        rank.run, rank.canons, rank.edges, rank.iterations
    );

    Ok(PipelineReport { dedupe, rank })
}
