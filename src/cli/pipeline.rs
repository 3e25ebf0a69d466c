use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::dedupe::{DedupeReport, ScoredNamer, run_dedupe};
use crate::pipeline::{RunContext, run};
use crate::rank::{RankReport, run_ranking};

use super::{CommonArgs, init_store, load_config};

pub fn run_dedupe_command(common: &CommonArgs, dry_run: bool) -> anyhow::Result<()> {
    let mut config = load_config(common)?;
    let store = init_store(&config)?;
    if dry_run {
        config.dedupe.load = false;
    }

    let report = run_dedupe(&store, &config.dedupe, &ScoredNamer, Utc::now())?;
    print_dedupe(&report);
    Ok(())
}

pub fn run_rank_command(common: &CommonArgs, cancel: &CancellationToken) -> anyhow::Result<()> {
    let config = load_config(common)?;
    let store = init_store(&config)?;

    let context = RunContext::resolve(&store, &config)?;
    let report = run_ranking(&store, &config.tearank, &context, cancel, Utc::now(), true)?;
    print_rank(&report);
    Ok(())
}

pub fn run_pipeline_command(
    common: &CommonArgs,
    dry_run: bool,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let config = load_config(common)?;
    let store = init_store(&config)?;

    let report = run(&store, &config, &ScoredNamer, cancel, Utc::now(), dry_run)?;
    print_dedupe(&report.dedupe);
    print_rank(&report.rank);
    Ok(())
}

fn print_dedupe(report: &DedupeReport) {
    println!();
    println!("Packages with homepages: {}", report.packages_with_homepages);
    println!("New canons:              {}", report.new_canons);
    println!("New mappings:            {}", report.new_mappings);
    println!("Updated mappings:        {}", report.updated_mappings);
    println!("Renamed canons:          {}", report.renamed_canons);
    println!("Rejected homepages:      {}", report.rejected.len());
    if !report.applied {
        println!("Dry run, nothing written");
    }
    println!();
}

fn print_rank(report: &RankReport) {
    println!();
    if report.persisted {
        println!("TeaRank run {}", report.run);
    } else {
        println!("TeaRank run {} (dry run, not stored)", report.run);
    }
    println!("{}", "─".repeat(20));
    println!("Canons:     {}", report.canons);
    println!("Edges:      {}", report.edges);
    println!("Missing:    {}", report.missing);
    println!("Iterations: {}", report.iterations);
    println!("Total rank: {}", report.total);
    if report.truncated {
        println!("Stopped at the iteration limit, ranks are partial");
    }
    println!();
}
