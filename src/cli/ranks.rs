use std::collections::HashMap;

use serde::Serialize;

use crate::store::Store;

use super::{CommonArgs, init_store, load_config};

#[derive(Serialize)]
struct RankOutput {
    canon_id: String,
    name: String,
    rank: String,
}

#[derive(Serialize)]
struct RunOutput {
    run: i64,
    split_ratio: String,
    created_at: String,
    ranks: Vec<RankOutput>,
}

pub fn run_ranks(
    common: &CommonArgs,
    run: Option<i64>,
    limit: Option<usize>,
    json: bool,
) -> anyhow::Result<()> {
    let config = load_config(common)?;
    let store = init_store(&config)?;

    let record = match run {
        Some(run) => store
            .get_rank_run(run)?
            .ok_or_else(|| anyhow::anyhow!("TeaRank run {run} not found"))?,
        None => store
            .get_latest_rank_run()?
            .ok_or_else(|| anyhow::anyhow!("No TeaRank runs yet. Run 'tearank rank' first."))?,
    };
    let (run, split_ratio, created_at) = (
        record.run,
        record.split_ratio.to_string(),
        record.created_at.to_rfc3339(),
    );

    let names: HashMap<String, String> = store
        .list_canons()?
        .into_iter()
        .map(|canon| (canon.id, canon.name))
        .collect();

    let mut ranks = store.list_ranks(run)?;
    if let Some(limit) = limit {
        ranks.truncate(limit);
    }

    let output = RunOutput {
        run,
        split_ratio,
        created_at,
        ranks: ranks
            .into_iter()
            .map(|rank| RankOutput {
                name: names
                    .get(&rank.canon_id)
                    .cloned()
                    .unwrap_or_else(|| "<unknown>".to_string()),
                canon_id: rank.canon_id,
                rank: rank.rank.to_string(),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!();
    println!("TeaRank run {} (split ratio {})", output.run, output.split_ratio);
    println!("{}", "─".repeat(20));
    if output.ranks.is_empty() {
        println!("No ranks stored for this run");
    }
    for (position, rank) in output.ranks.iter().enumerate() {
        println!("{:>4}. {:<40} {}", position + 1, rank.name, rank.rank);
    }
    println!();

    Ok(())
}
