//! Display names for canons.
//!
//! Naming is cosmetic: it only ever rewrites `Canon::name`, never the URL a
//! canon is keyed on.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};

use super::url::repo_name;
use crate::types::{CanonMember, CanonNameUpdate};

/// Canons with more distinct package names than this are treated as monorepos
/// and keep their URL as name.
pub const MONOREPO_THRESHOLD: usize = 20;

const FORK_INDICATORS: [&str; 6] = ["@", "-", "_component", "_fork", "my-", "custom-"];

pub trait CanonNamer: Send + Sync {
    fn name(&self, url: &str, package_names: &[String], existing_name: &str) -> String;
}

/// Picks the package name closest to the repository name in the URL.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoredNamer;

impl CanonNamer for ScoredNamer {
    fn name(&self, url: &str, package_names: &[String], existing_name: &str) -> String {
        let distinct: BTreeSet<&str> = package_names.iter().map(String::as_str).collect();
        if distinct.is_empty() || distinct.len() > MONOREPO_THRESHOLD {
            return url.to_string();
        }

        let best_guess = repo_name(url);
        if distinct.contains(best_guess.as_str()) {
            return best_guess;
        }

        let Some((winner, winner_score)) = distinct
            .iter()
            .map(|name| (*name, score_name(name, &best_guess)))
            .min_by(|(a, a_score), (b, b_score)| {
                b_score
                    .cmp(a_score)
                    .then_with(|| a.chars().count().cmp(&b.chars().count()))
                    .then_with(|| a.cmp(b))
            })
        else {
            return url.to_string();
        };

        if !is_url_like(existing_name, url)
            && score_name(existing_name, &best_guess) >= winner_score
        {
            return existing_name.to_string();
        }

        winner.to_string()
    }
}

/// Higher is better. Favors short names containing `best_guess` and penalizes
/// names that look like forks or scoped republishes.
pub fn score_name(name: &str, best_guess: &str) -> i64 {
    let lowered = name.to_lowercase();
    let mut score = 0;

    if !best_guess.is_empty() && lowered.contains(best_guess) {
        score += 10;
    }
    score += 20i64.saturating_sub(name.chars().count() as i64).max(0);

    let forks = FORK_INDICATORS
        .iter()
        .filter(|indicator| lowered.contains(*indicator))
        .count() as i64;
    score -= 5 * forks;

    if name.starts_with('@') {
        score -= 3;
    }

    score
}

fn is_url_like(name: &str, url: &str) -> bool {
    name.is_empty() || name == url || name.contains('/')
}

/// Computes the renames for every canon whose chosen name differs from its
/// current one. Members may arrive in any order.
pub fn plan_canon_names(
    members: &[CanonMember],
    namer: &dyn CanonNamer,
    now: DateTime<Utc>,
) -> Vec<CanonNameUpdate> {
    struct Group<'a> {
        name: &'a str,
        url: &'a str,
        packages: Vec<String>,
    }

    let mut groups: BTreeMap<&str, Group> = BTreeMap::new();
    for member in members {
        groups
            .entry(member.canon_id.as_str())
            .or_insert_with(|| Group {
                name: &member.canon_name,
                url: &member.canon_url,
                packages: Vec::new(),
            })
            .packages
            .push(member.package_name.clone());
    }

    groups
        .into_iter()
        .filter_map(|(canon_id, group)| {
            let name = namer.name(group.url, &group.packages, group.name);
            (name != group.name).then(|| CanonNameUpdate {
                canon_id: canon_id.to_string(),
                name,
                updated_at: now,
            })
        })
        .collect()
}
