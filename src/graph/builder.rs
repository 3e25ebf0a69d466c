use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use super::CanonGraph;
use crate::error::Result;
use crate::types::PackageRef;

/// A package (or dependency target) that has no canon yet.
///
/// Expected for freshly discovered dependencies; they join the graph on a
/// later run once canonicalized.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct UnresolvedRef {
    pub package_id: String,
    pub package_manager_id: String,
}

#[derive(Debug)]
pub struct GraphBuild {
    pub graph: CanonGraph,
    pub missing: Vec<UnresolvedRef>,
}

/// Builds the canon-level graph from packages and their dependency ids.
///
/// `dependencies_of` picks the dependency representation per package; the
/// builder only sees the resolved list of package ids.
pub fn build_graph<F>(
    package_to_canon: &HashMap<String, String>,
    packages: &[PackageRef],
    mut dependencies_of: F,
) -> Result<GraphBuild>
where
    F: FnMut(&PackageRef) -> Result<Vec<String>>,
{
    let mut graph = CanonGraph::new();
    let mut missing = BTreeSet::new();

    for (i, package) in packages.iter().enumerate() {
        let Some(canon_id) = package_to_canon.get(&package.id) else {
            missing.insert(UnresolvedRef {
                package_id: package.id.clone(),
                package_manager_id: package.package_manager_id.clone(),
            });
            continue;
        };

        let node = graph.get_or_insert(canon_id);
        if let Some(weight) = graph.node_mut(node) {
            weight
                .package_manager_ids
                .insert(package.package_manager_id.clone());
        }

        for dependency_id in dependencies_of(package)? {
            let Some(dep_canon_id) = package_to_canon.get(&dependency_id) else {
                missing.insert(UnresolvedRef {
                    package_id: dependency_id,
                    package_manager_id: package.package_manager_id.clone(),
                });
                continue;
            };

            let dep_node = graph.get_or_insert(dep_canon_id);
            graph.add_edge(node, dep_node);
        }

        if i % 10_000 == 0 {
            tracing::debug!("Processing package {}/{} ({})", i + 1, packages.len(), package.id);
        }
    }

    tracing::info!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        missing = missing.len(),
        "Built canon graph"
    );

    Ok(GraphBuild {
        graph,
        missing: missing.into_iter().collect(),
    })
}
