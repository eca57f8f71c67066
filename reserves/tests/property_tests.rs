//! Property-based tests for PoR composition
//!
//! - Determinism: same input, same canonical bytes and hash
//! - Coverage: floor(assets * 10000 / liabilities), zero without liabilities
//! - Guard: undercollateralized inputs never produce a payload

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use reserves::{
    canonical_hash, canonical_json, coverage_ratio_bps, Cents, Error, PoRComposer, SnapshotInput,
};

/// Cent figures up to one billion dollars
fn cents_strategy() -> impl Strategy<Value = u128> {
    0u128..100_000_000_000u128
}

fn input_strategy() -> impl Strategy<Value = SnapshotInput> {
    (
        cents_strategy(),
        cents_strategy(),
        cents_strategy(),
        cents_strategy(),
        cents_strategy(),
        0i64..4_000_000_000i64,
        "[a-z]{1,12}",
    )
        .prop_map(|(bank, gold, other, fthusd, usdf, secs, name)| SnapshotInput {
            as_of: Utc.timestamp_opt(secs, 0).unwrap(),
            bank_usd_cents: Cents(bank),
            gold_usd_cents: Cents(gold),
            other_assets_usd_cents: Cents(other),
            fthusd_liabilities_cents: Cents(fthusd),
            usdf_off_balance_cents: Cents(usdf),
            uri: format!("https://example.com/por/{}.json", name),
        })
}

proptest! {
    #[test]
    fn prop_hash_is_deterministic(input in input_strategy()) {
        let first = canonical_hash(&input).unwrap();
        let second = canonical_hash(&input.clone()).unwrap();
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.len(), 66);
        prop_assert!(first.starts_with("0x"));
        prop_assert!(first[2..].chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn prop_canonical_json_keeps_key_order(input in input_strategy()) {
        let json = canonical_json(&input).unwrap();
        let keys = [
            "\"asOf\"", "\"bankUsdCents\"", "\"goldUsdCents\"", "\"otherAssetsUsdCents\"",
            "\"totalAssets\"", "\"totalLiabilities\"", "\"coverageRatioBps\"", "\"uri\"",
        ];
        let positions: Vec<usize> = keys.iter().map(|k| json.find(k).unwrap()).collect();
        prop_assert!(positions.windows(2).all(|w| w[0] < w[1]));
        prop_assert!(!json.contains(' '));
    }

    #[test]
    fn prop_coverage_is_floor_division(assets in cents_strategy(), liabilities in 1u128..100_000_000_000u128) {
        let bps = coverage_ratio_bps(Cents(assets), Cents(liabilities)).unwrap();
        prop_assert_eq!(bps, assets * 10_000 / liabilities);
    }

    #[test]
    fn prop_zero_liabilities_zero_coverage(assets in cents_strategy()) {
        prop_assert_eq!(coverage_ratio_bps(Cents(assets), Cents(0)).unwrap(), 0);
    }

    #[test]
    fn prop_guard_matches_asset_comparison(input in input_strategy()) {
        let assets = input.total_assets().unwrap();
        let liabilities = input.total_liabilities();
        match PoRComposer::compose(&input) {
            Ok(payload) => {
                prop_assert!(assets >= liabilities);
                prop_assert_eq!(payload.total_assets, assets);
            }
            Err(Error::Undercollateralized { total_assets, total_liabilities }) => {
                prop_assert!(assets < liabilities);
                prop_assert_eq!(total_assets, assets);
                prop_assert_eq!(total_liabilities, liabilities);
            }
            Err(Error::Overflow(_)) => prop_assert!(liabilities > Cents(0)),
            Err(other) => prop_assert!(false, "unexpected error: {}", other),
        }
    }
}
