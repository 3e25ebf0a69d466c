use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;

use super::DecimalContext;
use crate::graph::CanonGraphNode;

/// Computes the prior weight of every canon from the package managers it spans.
///
/// A canon's raw weight is the sum of the favorite weights of its distinct
/// package managers, so presence in several favored ecosystems adds up. Raw
/// weights are then normalized to sum to one. If nothing carries weight, every
/// canon gets zero.
pub fn personalize<'a>(
    nodes: impl IntoIterator<Item = &'a CanonGraphNode>,
    favorites: &HashMap<String, Decimal>,
    ctx: &DecimalContext,
) -> BTreeMap<String, Decimal> {
    let mut raw_weights = BTreeMap::new();
    let mut total = Decimal::ZERO;

    for node in nodes {
        let weight = node
            .package_manager_ids
            .iter()
            .filter_map(|pm| favorites.get(pm))
            .fold(Decimal::ZERO, |acc, w| ctx.add(acc, *w));
        total = ctx.add(total, weight);
        raw_weights.insert(node.canon_id.clone(), weight);
    }

    let Some(constant) = ctx.div(Decimal::ONE, total) else {
        tracing::warn!(
            canons = raw_weights.len(),
            "No canon belongs to a favored package manager, personalization is all zeros"
        );
        return raw_weights
            .into_keys()
            .map(|canon_id| (canon_id, Decimal::ZERO))
            .collect();
    };

    let personalization: BTreeMap<String, Decimal> = raw_weights
        .into_iter()
        .map(|(canon_id, weight)| (canon_id, ctx.mul(weight, constant)))
        .collect();

    tracing::debug!(
        "Personalization sum: {}",
        personalization.values().copied().sum::<Decimal>()
    );

    personalization
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn node(canon_id: &str, pms: &[&str]) -> CanonGraphNode {
        let mut node = CanonGraphNode::new(canon_id);
        node.package_manager_ids
            .extend(pms.iter().map(ToString::to_string));
        node
    }

    fn favorites() -> HashMap<String, Decimal> {
        HashMap::from([
            ("homebrew".to_string(), dec!(0.3)),
            ("debian".to_string(), dec!(0.6)),
            ("pkgx".to_string(), dec!(0.1)),
        ])
    }

    #[test]
    fn test_weights_follow_favorites() {
        let ctx = DecimalContext::default();
        let nodes = vec![
            node("openssl", &["homebrew", "debian"]),
            node("zlib", &["pkgx"]),
        ];

        let p = personalize(&nodes, &favorites(), &ctx);

        assert_eq!(p["openssl"], dec!(0.9));
        assert_eq!(p["zlib"], dec!(0.1));
    }

    #[test]
    fn test_cross_ecosystem_presence_is_rewarded() {
        let ctx = DecimalContext::default();
        let nodes = vec![
            node("everywhere", &["homebrew", "debian", "pkgx"]),
            node("brew-only", &["homebrew"]),
        ];

        let p = personalize(&nodes, &favorites(), &ctx);

        assert!(p["everywhere"] > p["brew-only"]);
        assert_eq!(p["everywhere"], ctx.div(dec!(1.0), dec!(1.3)).unwrap());
    }

    #[test]
    fn test_unknown_package_managers_contribute_nothing() {
        let ctx = DecimalContext::default();
        let nodes = vec![node("left-pad", &["npm"]), node("jq", &["debian", "npm"])];

        let p = personalize(&nodes, &favorites(), &ctx);

        assert_eq!(p["left-pad"], Decimal::ZERO);
        assert_eq!(p["jq"], Decimal::ONE);
    }

    #[test]
    fn test_zero_total_yields_zeros() {
        let ctx = DecimalContext::default();
        let nodes = vec![node("a", &["npm"]), node("b", &[])];

        let p = personalize(&nodes, &favorites(), &ctx);

        assert_eq!(p.len(), 2);
        assert!(p.values().all(|w| w.is_zero()));
    }

    #[test]
    fn test_sums_to_one_within_epsilon() {
        let ctx = DecimalContext::default();
        let pms = ["homebrew", "debian", "pkgx", "npm"];
        let nodes: Vec<_> = (0..997)
            .map(|i| {
                let members: Vec<&str> = pms
                    .iter()
                    .enumerate()
                    .filter(|(bit, _)| (i >> bit) & 1 == 1)
                    .map(|(_, pm)| *pm)
                    .collect();
                node(&format!("canon-{i}"), &members)
            })
            .collect();

        let p = personalize(&nodes, &favorites(), &ctx);
        let sum: Decimal = p.values().copied().sum();

        assert_eq!(p.len(), 997);
        assert!((sum - Decimal::ONE).abs() <= ctx.epsilon(), "sum was {sum}");
    }
}
