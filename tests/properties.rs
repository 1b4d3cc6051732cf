//! Property tests over random citation graphs.
//!
//! - isolated ids never appear in a ranking
//! - rankings are ordered by score, then index
//! - the total matches the emitted scores
//! - output does not depend on the worker count
//! - uncited leaves reproduce the seed before any round

use articlerank::encode::{self, Record};
use articlerank::{rank, Graph, GraphBuilder, HeaderLayout, RankConfig, Ranking};
use proptest::prelude::*;

const MAX_ID: u32 = 40;

/// Up to one record per id, each citing a handful of ids.
fn arb_records() -> impl Strategy<Value = Vec<Record>> {
    prop::collection::btree_map(0..=MAX_ID, prop::collection::vec(0..=MAX_ID, 0..6), 0..30).prop_map(|lists| {
        lists.into_iter().map(|(node, citations)| Record { node, citations }).collect()
    })
}

fn build(records: &[Record]) -> Graph {
    let mut builder = GraphBuilder::new(MAX_ID).unwrap();
    for record in records {
        builder.add(record.node, &record.citations).unwrap();
    }
    builder.finish()
}

fn ranked(records: &[Record], config: &RankConfig) -> (Ranking, Vec<u8>) {
    let mut graph = build(records);
    rank::rank(&mut graph, config).unwrap();
    let ranking = Ranking::build(&graph, config);
    let mut out = Vec::new();
    ranking.write(&mut out).unwrap();
    (ranking, out)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn isolated_ids_are_not_ranked(records in arb_records()) {
        let (ranking, _) = ranked(&records, &RankConfig { workers: 3, ..RankConfig::default() });
        for entry in ranking.entries() {
            let node = entry.index;
            let cites = records.iter().any(|record| record.node == node && !record.citations.is_empty());
            let cited = records.iter().any(|record| record.citations.contains(&node));
            prop_assert!(cites || cited, "isolated node {} ranked", node);
        }
    }

    #[test]
    fn ranking_is_sorted(records in arb_records()) {
        let (ranking, _) = ranked(&records, &RankConfig { workers: 4, ..RankConfig::default() });
        for pair in ranking.entries().windows(2) {
            prop_assert!(pair[0].score >= pair[1].score);
            if pair[0].score == pair[1].score {
                prop_assert!(pair[0].index < pair[1].index);
            }
        }
    }

    #[test]
    fn total_matches_entries(records in arb_records()) {
        let (ranking, _) = ranked(&records, &RankConfig::reference());
        let sum: f64 = ranking.entries().iter().map(|entry| entry.score).sum();
        prop_assert!((sum - ranking.total()).abs() <= 1e-9 * sum.abs().max(1.0));
    }

    #[test]
    fn output_independent_of_workers(records in arb_records(), workers in 1usize..12, iterations in 0usize..15) {
        let single = RankConfig { workers: 1, iterations, ..RankConfig::default() };
        let many = RankConfig { workers, ..single };
        prop_assert_eq!(ranked(&records, &single).1, ranked(&records, &many).1);
    }

    #[test]
    fn leaves_reproduce_seed(records in arb_records()) {
        let mut bytes = Vec::new();
        encode::write(&mut bytes, &records, HeaderLayout::SizeAndCount).unwrap();
        let graph = Graph::from_bytes(&bytes, HeaderLayout::SizeAndCount).unwrap();
        let seeds = graph.scores();
        let config = RankConfig::reference();
        for node in 0..graph.len() {
            if graph.node(node).is_participating() && graph.citations(node).is_empty() {
                prop_assert_eq!(rank::citer_score(&graph, &seeds, node, &config), 1.0);
            }
        }
    }
}
