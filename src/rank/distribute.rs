//! Queue-driven weight propagation ("distribute").
//!
//! Weight enters at every personalized canon and flows toward dependencies:
//! each visit keeps `split_ratio` of the arriving weight and splits the rest
//! evenly across the node's dependencies. There is no visited set, so a node on
//! a cycle is revisited with ever smaller weights; propagation stops on a path
//! once the per-dependency share falls below `tol`, and `max_iter` bounds the
//! whole run.
//!
//! When the per-dependency share is below `tol` the remainder is dropped rather
//! than credited anywhere, so the ranks can sum to slightly less than the
//! personalization did.

use std::collections::{BTreeMap, HashMap, VecDeque};

use petgraph::graph::NodeIndex;
use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;

use super::DecimalContext;
use crate::error::{Error, Result};
use crate::graph::CanonGraph;

#[derive(Debug, Clone, Copy)]
pub struct DistributeParams {
    pub split_ratio: Decimal,
    pub tol: Decimal,
    pub max_iter: u64,
    pub ctx: DecimalContext,
}

#[derive(Debug, Clone)]
pub struct Distribution {
    pub ranks: HashMap<NodeIndex, Decimal>,
    /// Queue items processed.
    pub iterations: u64,
    /// True when `max_iter` stopped the run with weight still queued.
    pub truncated: bool,
}

impl Distribution {
    /// Translates node indices back to canon ids.
    pub fn by_canon(&self, graph: &CanonGraph) -> BTreeMap<String, Decimal> {
        self.ranks
            .iter()
            .filter_map(|(index, rank)| graph.canon_id(*index).map(|id| (id.to_string(), *rank)))
            .collect()
    }

    pub fn total(&self) -> Decimal {
        self.ranks.values().copied().sum()
    }
}

pub fn distribute(
    graph: &CanonGraph,
    personalization: &BTreeMap<String, Decimal>,
    params: &DistributeParams,
    cancel: &CancellationToken,
) -> Result<Distribution> {
    if personalization.is_empty() {
        return Err(Error::EmptyGraph);
    }
    if let Some(unknown) = personalization.keys().find(|id| graph.index_of(id).is_none()) {
        return Err(Error::UnknownCanon(unknown.clone()));
    }

    let ctx = &params.ctx;
    let mut ranks: HashMap<NodeIndex, Decimal> = HashMap::new();
    let mut queue: VecDeque<(NodeIndex, Decimal)> = graph
        .node_indices()
        .filter_map(|index| {
            let canon_id = graph.canon_id(index)?;
            personalization.get(canon_id).map(|weight| (index, *weight))
        })
        .collect();

    let mut iterations: u64 = 0;
    let mut truncated = false;

    while !queue.is_empty() {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        if iterations >= params.max_iter {
            tracing::warn!(
                "Max iterations reached: {}, {} queued weights left undistributed",
                params.max_iter,
                queue.len()
            );
            truncated = true;
            break;
        }
        let Some((node, weight)) = queue.pop_front() else {
            break;
        };
        iterations += 1;

        let dependencies = graph.dependencies(node);
        let entry = ranks.entry(node).or_insert(Decimal::ZERO);

        // Leaves and weights too small to split are credited in full.
        if dependencies.is_empty() || weight < params.tol {
            *entry = ctx.add(*entry, weight);
            continue;
        }

        let keep = ctx.mul(weight, params.split_ratio);
        *entry = ctx.add(*entry, keep);

        let split = ctx.sub(weight, keep);
        let Some(per_dependency) = ctx.div(split, Decimal::from(dependencies.len())) else {
            continue;
        };

        if per_dependency >= params.tol {
            queue.extend(dependencies.into_iter().map(|dep| (dep, per_dependency)));
        }
    }

    let distribution = Distribution {
        ranks,
        iterations,
        truncated,
    };

    tracing::info!(
        "Iterations: {}. Ranks sum to {}",
        distribution.iterations,
        ctx.round(distribution.total())
    );

    Ok(distribution)
}
