//! Parallel power iteration over a loaded graph.
//!
//! Worker `k` of `W` owns ids `k, k + W, k + 2W, ...` and is the only writer of
//! those slots. Scores are double-buffered: round `r` reads `buffers[r % 2]`
//! and writes `buffers[(r + 1) % 2]`, and all workers meet at a barrier before
//! the roles flip. Each score is a function of the previous round alone, so
//! the result does not depend on the number of workers or their scheduling.

use std::sync::atomic::Ordering;
use std::sync::Barrier;
use std::thread;

use atomic_float::AtomicF64;
use time::OffsetDateTime;
use tracing::{debug, info};

use crate::config::RankConfig;
use crate::error::Result;
use crate::graph::Graph;

/// Runs `config.iterations` rounds and stores the final scores in `graph`.
pub fn rank(graph: &mut Graph, config: &RankConfig) -> Result<()> {
    config.validate()?;
    let scores = iterate(graph, config);
    graph.set_scores(&scores);
    Ok(())
}

/// A node's score recomputed once from `scores`, with the same update rule a
/// round applies.
pub fn citer_score(graph: &Graph, scores: &[f64], node: usize, config: &RankConfig) -> f64 {
    let mut accum = 0.0;
    for &citation in graph.citations(node) {
        let citation = citation as usize;
        accum += share(scores[citation], graph.node(citation).cited_count());
    }
    config.hydration + config.dehydration * accum
}

/// The part of `score` passed along each of the `cited` edges naming its node.
#[inline]
fn share(score: f64, cited: u32) -> f64 {
    if cited == 0 { 0.0 } else { score / cited as f64 }
}

fn iterate(graph: &Graph, config: &RankConfig) -> Vec<f64> {
    let peers = config.workers;
    let seeds = graph.scores();
    let buffers = [
        seeds.iter().map(|&score| AtomicF64::new(score)).collect::<Vec<_>>(),
        seeds.iter().map(|&score| AtomicF64::new(score)).collect::<Vec<_>>(),
    ];
    let barrier = Barrier::new(peers);

    info!(workers = peers, iterations = config.iterations, nodes = graph.len(), "ranking");

    thread::scope(|scope| {
        for index in 0..peers {
            let buffers = &buffers;
            let barrier = &barrier;
            scope.spawn(move || work(index, peers, graph, config, buffers, barrier));
        }
    });

    buffers[config.iterations % 2].iter().map(|score| score.load(Ordering::Relaxed)).collect()
}

fn work(index: usize, peers: usize, graph: &Graph, config: &RankConfig, buffers: &[Vec<AtomicF64>; 2], barrier: &Barrier) {

    let start = OffsetDateTime::now_utc();
    let mut updated = 0usize;

    for round in 0..config.iterations {
        if index == 0 { info!(iteration = round, "starting iteration"); }

        let src = &buffers[round % 2][..];
        let dst = &buffers[(round + 1) % 2][..];

        for node in (index..graph.len()).step_by(peers) {
            // graph scores hold the seeds until the run ends; zero marks non-members
            if !graph.node(node).is_participating() { continue; }

            let mut accum = 0.0;
            for &citation in graph.citations(node) {
                let citation = citation as usize;
                // citation ids are checked against the id space at load
                let (score, cited) = unsafe {
                    (src.get_unchecked(citation).load(Ordering::Relaxed), graph.nodes().get_unchecked(citation).cited_count())
                };
                accum += share(score, cited);
            }
            dst[node].store(config.hydration + config.dehydration * accum, Ordering::Relaxed);
            updated += 1;
        }

        // the barrier orders this round's stores before next round's loads
        barrier.wait();
    }

    debug!(worker = index, updated, "worker finished");
    if index == 0 && config.iterations > 0 {
        let seconds = (OffsetDateTime::now_utc() - start).as_seconds_f64();
        info!(average = seconds / config.iterations as f64, "seconds per iteration");
    }
}

#[cfg(test)]
use crate::graph::GraphBuilder;

#[cfg(test)]
fn build(max_id: u32, records: &[(u32, &[u32])]) -> Graph {
    let mut builder = GraphBuilder::new(max_id).unwrap();
    for &(node, citations) in records {
        builder.add(node, citations).unwrap();
    }
    builder.finish()
}

#[test]
fn cycle_converges_to_equal_scores() {
    let mut graph = build(2, &[(0, &[1]), (1, &[2]), (2, &[0])]);
    let config = RankConfig { iterations: 50, workers: 2, ..RankConfig::default() };
    rank(&mut graph, &config).unwrap();
    let scores = graph.scores();
    assert!((scores[0] - scores[1]).abs() < 1e-9, "{:?}", scores);
    assert!((scores[1] - scores[2]).abs() < 1e-9, "{:?}", scores);
}

#[test]
fn isolated_node_stays_unscored() {
    let mut graph = build(3, &[(0, &[1]), (1, &[0])]);
    rank(&mut graph, &RankConfig::default()).unwrap();
    assert_eq!(graph.node(3).score, 0.0);
    assert_eq!(graph.node(2).score, 0.0);
    assert!(graph.node(0).score > 0.0);
}

#[test]
fn one_round_from_two_citers() {
    // 2 draws on 0 and 1, each named by exactly one list and seeded at one
    let mut graph = build(2, &[(2, &[0, 1])]);
    let config = RankConfig { iterations: 1, ..RankConfig::default() };
    rank(&mut graph, &config).unwrap();
    assert!((graph.node(2).score - (0.15 + 0.85 * 2.0)).abs() < 1e-12);
    // 0 and 1 cite nothing and fall back to hydration
    assert!((graph.node(0).score - 0.15).abs() < 1e-12);
}

#[test]
fn scores_split_across_citing_edges() {
    // 0 is named by two lists, so each draws half of its score
    let mut graph = build(2, &[(1, &[0]), (2, &[0])]);
    let config = RankConfig { iterations: 1, ..RankConfig::reference() };
    rank(&mut graph, &config).unwrap();
    assert!((graph.node(1).score - (1.0 + 0.9 * 0.5)).abs() < 1e-12);
    assert!((graph.node(2).score - (1.0 + 0.9 * 0.5)).abs() < 1e-12);
}

#[test]
fn worker_count_does_not_change_scores() {
    let records: Vec<(u32, Vec<u32>)> = (0..50u32).map(|node| (node, vec![(node * 7 + 3) % 50, (node * 13 + 1) % 50])).collect();
    let scores = |workers| {
        let mut builder = GraphBuilder::new(49).unwrap();
        for (node, citations) in &records { builder.add(*node, citations).unwrap(); }
        let mut graph = builder.finish();
        rank(&mut graph, &RankConfig { workers, ..RankConfig::default() }).unwrap();
        graph.scores()
    };
    let single = scores(1);
    assert_eq!(single, scores(3));
    assert_eq!(single, scores(16));
    assert_eq!(single, scores(64));
}

#[test]
fn zero_iterations_keep_seeds() {
    let mut graph = build(1, &[(0, &[1])]);
    rank(&mut graph, &RankConfig { iterations: 0, ..RankConfig::default() }).unwrap();
    assert_eq!(graph.scores(), vec![1.0, 1.0]);
}

#[test]
fn citer_score_matches_update() {
    let graph = build(2, &[(2, &[0, 1]), (0, &[1])]);
    let config = RankConfig::reference();
    // 1 is named twice, 0 once
    let expected = 1.0 + 0.9 * (1.0 / 1.0 + 1.0 / 2.0);
    assert!((citer_score(&graph, &graph.scores(), 2, &config) - expected).abs() < 1e-12);
}

#[test]
fn uncited_share_is_zero() {
    assert_eq!(share(3.0, 0), 0.0);
    assert_eq!(share(3.0, 2), 1.5);
}

#[test]
fn rejects_invalid_config() {
    let mut graph = build(1, &[(0, &[1])]);
    assert!(rank(&mut graph, &RankConfig { workers: 0, ..RankConfig::default() }).is_err());
}
