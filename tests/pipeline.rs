//! End-to-end tests of dedupe and ranking against a real SQLite store.

mod common;

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use petgraph::graph::NodeIndex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio_util::sync::CancellationToken;

use common::Fixture;
use tearank::dedupe::{ScoredNamer, run_dedupe};
use tearank::error::Error;
use tearank::graph::{CanonGraph, StoreDependencies};
use tearank::pipeline::{RunContext, run};
use tearank::rank::{DecimalContext, DistributeParams, distribute};
use tearank::store::Store;
use tearank::types::{PackageRef, TeaRank};
use uuid::Uuid;

fn ranks_by_name(fixture: &Fixture, run: i64) -> BTreeMap<String, Decimal> {
    let names: BTreeMap<String, String> = fixture
        .store
        .list_canons()
        .unwrap()
        .into_iter()
        .map(|c| (c.id, c.name))
        .collect();
    fixture
        .store
        .list_ranks(run)
        .unwrap()
        .into_iter()
        .map(|r| (names[&r.canon_id].clone(), r.rank))
        .collect()
}

#[test]
fn test_runs_are_numbered_consecutively() {
    let mut fx = Fixture::new();
    let a = fx.project("homebrew", "a", "github.com/x/a");
    let b = fx.project("homebrew", "b", "github.com/x/b");
    let c = fx.project("homebrew", "c", "github.com/x/c");
    fx.version(&a, &[&b]);
    fx.version(&b, &[&c]);

    let cancel = CancellationToken::new();
    let first = run(&fx.store, &fx.config, &ScoredNamer, &cancel, Utc::now(), false).unwrap();
    assert_eq!(first.rank.run, 1);
    assert_eq!(first.rank.canons, 3);
    assert_eq!(first.rank.edges, 2);
    assert_eq!(first.dedupe.new_canons, 3);
    assert_eq!(first.dedupe.renamed_canons, 3);

    let second = run(&fx.store, &fx.config, &ScoredNamer, &cancel, Utc::now(), false).unwrap();
    assert_eq!(second.rank.run, 2);
    assert_eq!(second.dedupe.new_canons, 0);
    assert_eq!(second.dedupe.new_mappings, 0);
    assert_eq!(second.dedupe.updated_mappings, 0);
    assert_eq!(second.dedupe.renamed_canons, 0);

    let latest = fx.store.get_latest_rank_run().unwrap().unwrap();
    assert_eq!(latest.run, 2);
    assert_eq!(latest.split_ratio, dec!(0.5));

    let ranks = ranks_by_name(&fx, 1);
    assert_eq!(ranks.len(), 3);
    assert!(ranks["c"] > ranks["b"]);
    assert!(ranks["b"] > ranks["a"]);
    assert!(ranks.values().copied().sum::<Decimal>() <= Decimal::ONE);
    assert_eq!(ranks_by_name(&fx, 2), ranks);
}

#[test]
fn test_shared_homepage_merges_ecosystems() {
    let mut fx = Fixture::new();
    let openssl = fx.project("homebrew", "openssl", "github.com/openssl/openssl");
    fx.project("debian", "libssl3", "github.com/openssl/openssl");
    let zlib = fx.project("homebrew", "zlib", "zlib.net");
    fx.version(&openssl, &[&zlib]);

    let report = run(
        &fx.store,
        &fx.config,
        &ScoredNamer,
        &CancellationToken::new(),
        Utc::now(),
        false,
    )
    .unwrap();

    assert_eq!(report.dedupe.new_canons, 2);
    assert_eq!(report.dedupe.new_mappings, 3);
    assert_eq!(report.rank.canons, 2);

    // openssl spans homebrew and debian: 0.9 / 1.2 of the prior, zlib 0.3 / 1.2.
    let ranks = ranks_by_name(&fx, 1);
    assert_eq!(ranks["openssl"], dec!(0.375));
    assert_eq!(ranks["zlib"], dec!(0.625));
}

#[test]
fn test_changed_homepage_remaps_package() {
    let mut fx = Fixture::new();
    let pkg = fx.project("homebrew", "thing", "thing.org");
    let now = Utc::now();
    run_dedupe(&fx.store, &fx.config.dedupe, &ScoredNamer, now).unwrap();
    let before = fx.store.get_package_to_canon_mapping().unwrap()[&pkg].clone();

    fx.homepage(&pkg, "github.com/thing/thing");
    let report = run_dedupe(&fx.store, &fx.config.dedupe, &ScoredNamer, now).unwrap();

    assert_eq!(report.new_canons, 1);
    assert_eq!(report.new_mappings, 0);
    assert_eq!(report.updated_mappings, 1);

    let after = fx.store.get_package_to_canon_mapping().unwrap()[&pkg].clone();
    assert_ne!(before, after);
    assert_eq!(fx.store.list_canons().unwrap().len(), 2);
}

#[test]
fn test_non_canonical_homepage_is_rejected() {
    let mut fx = Fixture::new();
    let bad = fx.project("homebrew", "bad", "https://www.example.com/bad/");
    fx.project("homebrew", "good", "example.com/good");

    let report = run_dedupe(&fx.store, &fx.config.dedupe, &ScoredNamer, Utc::now()).unwrap();

    assert_eq!(report.new_canons, 1);
    assert_eq!(report.rejected.len(), 1);
    assert_eq!(report.rejected[0].package_id, bad);
    assert!(!fx.store.get_package_to_canon_mapping().unwrap().contains_key(&bad));
}

#[test]
fn test_dry_run_writes_nothing() {
    let mut fx = Fixture::new();
    fx.project("homebrew", "curl", "curl.se");
    let cancel = CancellationToken::new();
    run(&fx.store, &fx.config, &ScoredNamer, &cancel, Utc::now(), false).unwrap();

    fx.project("debian", "wget", "gnu.org/software/wget");
    let report = run(&fx.store, &fx.config, &ScoredNamer, &cancel, Utc::now(), true).unwrap();

    assert!(!report.dedupe.applied);
    assert_eq!(report.dedupe.new_canons, 1);
    assert!(!report.rank.persisted);
    assert_eq!(report.rank.run, 2);
    assert_eq!(fx.store.list_canons().unwrap().len(), 1);
    assert_eq!(fx.store.get_latest_rank_run().unwrap().unwrap().run, 1);
    assert!(fx.store.list_ranks(2).unwrap().is_empty());
}

#[test]
fn test_empty_graph_writes_no_run() {
    let fx = Fixture::new();

    let result = run(
        &fx.store,
        &fx.config,
        &ScoredNamer,
        &CancellationToken::new(),
        Utc::now(),
        false,
    );

    assert!(matches!(result, Err(Error::EmptyGraph)));
    assert!(fx.store.get_latest_rank_run().unwrap().is_none());
}

#[test]
fn test_cancelled_run_writes_no_ranks() {
    let mut fx = Fixture::new();
    fx.project("homebrew", "curl", "curl.se");
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = run(&fx.store, &fx.config, &ScoredNamer, &cancel, Utc::now(), false);

    assert!(matches!(result, Err(Error::Cancelled)));
    assert!(fx.store.get_latest_rank_run().unwrap().is_none());
}

#[test]
fn test_run_recovers_from_unfinished_run() {
    let mut fx = Fixture::new();
    let curl = fx.project("homebrew", "curl", "curl.se");
    let zlib = fx.project("homebrew", "zlib", "zlib.net");
    fx.version(&curl, &[&zlib]);
    let cancel = CancellationToken::new();
    run(&fx.store, &fx.config, &ScoredNamer, &cancel, Utc::now(), false).unwrap();

    // A crash between writing ranks and writing the run record leaves run 2 orphaned.
    let orphaned: Vec<TeaRank> = fx
        .store
        .list_canons()
        .unwrap()
        .into_iter()
        .map(|canon| TeaRank {
            id: Uuid::new_v4().to_string(),
            canon_id: canon.id,
            run: 2,
            rank: dec!(0.123),
            created_at: Utc::now(),
        })
        .collect();
    fx.store.insert_ranks(&orphaned).unwrap();
    assert_eq!(fx.store.get_latest_rank_run().unwrap().unwrap().run, 1);

    let second = run(&fx.store, &fx.config, &ScoredNamer, &cancel, Utc::now(), false).unwrap();
    let third = run(&fx.store, &fx.config, &ScoredNamer, &cancel, Utc::now(), false).unwrap();

    assert_eq!(second.rank.run, 2);
    assert_eq!(third.rank.run, 3);
    let ranks = ranks_by_name(&fx, 2);
    assert_eq!(fx.store.list_ranks(2).unwrap().len(), 2);
    assert!(ranks.values().all(|rank| *rank != dec!(0.123)));
    assert_eq!(ranks, ranks_by_name(&fx, 1));
}

#[tokio::test]
async fn test_pipeline_runs_on_blocking_pool() {
    let mut fx = Fixture::new();
    fx.project("homebrew", "curl", "curl.se");
    let config = fx.config.clone();
    let store = Arc::new(fx.store);
    let cancel = CancellationToken::new();

    let worker_store = Arc::clone(&store);
    let worker_cancel = cancel.clone();
    let report = tokio::task::spawn_blocking(move || {
        run(
            worker_store.as_ref(),
            &config,
            &ScoredNamer,
            &worker_cancel,
            Utc::now(),
            false,
        )
    })
    .await
    .unwrap()
    .unwrap();

    assert_eq!(report.rank.run, 1);
    // 0.3 * (1 / 0.3) at nine significant digits.
    assert_eq!(report.rank.total, dec!(0.999999999));
    assert_eq!(store.list_ranks(1).unwrap().len(), 1);
}

#[test]
fn test_run_context_resolves_names_to_ids() {
    let mut fx = Fixture::new();
    fx.config.package_managers.ranked.push("cargo".to_string());
    fx.config.tearank.favorites.insert("cargo".to_string(), dec!(1));

    let context = RunContext::resolve(&fx.store, &fx.config).unwrap();

    assert_eq!(context.ranked_package_manager_ids.len(), 3);
    assert_eq!(context.legacy_package_manager_ids, vec![fx.package_manager_id("npm")]);
    assert_eq!(context.favorites.len(), 3);
    assert_eq!(context.favorites[&fx.package_manager_id("debian")], dec!(0.6));

    fx.config.package_managers.ranked = vec!["cargo".to_string()];
    assert!(matches!(
        RunContext::resolve(&fx.store, &fx.config),
        Err(Error::UnknownPackageManager(_))
    ));
}

#[test]
fn test_oversized_favorite_is_rejected_before_ranking() {
    let mut fx = Fixture::new();
    fx.project("homebrew", "curl", "curl.se");
    fx.config
        .tearank
        .favorites
        .insert("homebrew".to_string(), Decimal::MAX);

    let result = run(
        &fx.store,
        &fx.config,
        &ScoredNamer,
        &CancellationToken::new(),
        Utc::now(),
        false,
    );

    assert!(matches!(result, Err(Error::Config(_))));
    assert!(fx.store.get_latest_rank_run().unwrap().is_none());
}

#[test]
fn test_dependency_source_follows_package_manager() {
    let mut fx = Fixture::new();
    let left_pad = fx.package("npm", "left-pad");
    let is_odd = fx.package("npm", "is-odd");
    let is_even = fx.package("npm", "is-even");
    fx.legacy(&is_even, &[&left_pad, &is_even]);
    fx.version(&is_even, &[&is_odd]);

    let old_dep = fx.package("homebrew", "old-dep");
    let new_dep = fx.package("homebrew", "new-dep");
    let app = fx.package("homebrew", "app");
    fx.version(&app, &[&old_dep]);
    fx.version(&app, &[&new_dep]);

    let npm = fx.package_manager_id("npm");
    let homebrew = fx.package_manager_id("homebrew");
    let source = StoreDependencies::new(&fx.store, [npm.clone()]);

    let legacy = source
        .dependencies_of(&PackageRef {
            id: is_even,
            package_manager_id: npm,
        })
        .unwrap();
    assert_eq!(legacy, vec![left_pad]);

    let versioned = source
        .dependencies_of(&PackageRef {
            id: app,
            package_manager_id: homebrew,
        })
        .unwrap();
    assert_eq!(versioned, vec![new_dep]);
}

fn random_graph(nodes: usize, seed: u64) -> (CanonGraph, BTreeMap<String, Decimal>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut graph = CanonGraph::new();
    let ids: Vec<String> = (0..nodes).map(|i| format!("canon-{i}")).collect();
    let indices: Vec<NodeIndex> = ids.iter().map(|id| graph.get_or_insert(id)).collect();

    for &from in &indices {
        for _ in 0..rng.gen_range(0..=3) {
            let to = indices[rng.gen_range(0..nodes)];
            graph.add_edge(from, to);
        }
    }

    let ctx = DecimalContext::default();
    let weight = ctx
        .div(Decimal::ONE, Decimal::from(nodes))
        .expect("non-zero node count");
    let personalization = ids.into_iter().map(|id| (id, weight)).collect();
    (graph, personalization)
}

fn assert_conserved(nodes: usize, seed: u64) {
    let (graph, personalization) = random_graph(nodes, seed);
    let initial: Decimal = personalization.values().copied().sum();
    let params = DistributeParams {
        split_ratio: dec!(0.95),
        tol: dec!(0.000000001),
        max_iter: 10_000_000,
        ctx: DecimalContext::default(),
    };

    let distribution =
        distribute(&graph, &personalization, &params, &CancellationToken::new()).unwrap();
    let total = distribution.total();

    assert!(!distribution.truncated);
    assert!(total > Decimal::ZERO);
    assert!(total <= initial, "ranks {total} exceed prior {initial}");
    assert!(initial - total < dec!(0.1), "lost {}", initial - total);
}

#[test]
fn test_rank_conservation_on_random_graph() {
    assert_conserved(20_000, 42);
}

#[test]
#[ignore = "slow; run with --ignored"]
fn test_rank_conservation_on_large_random_graph() {
    assert_conserved(100_000, 7);
}
