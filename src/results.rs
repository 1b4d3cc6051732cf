//! Ordering and reporting of final scores.

use std::io::Write;

use tracing::info;

use crate::config::RankConfig;
use crate::error::Result;
use crate::graph::Graph;
use crate::rank::citer_score;

/// One scored node of the output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Entry {
    pub index: u32,
    pub score: f64,
    pub citations: u32,
    /// The score recomputed from the final scores of the nodes it cites.
    pub derived: f64,
}

pub struct Ranking {
    entries: Vec<Entry>,
    total: f64,
}

impl Ranking {
    /// Collects every node with a non-zero score, highest score first and
    /// lowest index first among equal scores.
    pub fn build(graph: &Graph, config: &RankConfig) -> Ranking {
        let scores = graph.scores();

        let mut entries = scores.iter()
                                .enumerate()
                                .filter(|&(_, &score)| score != 0.0)
                                .map(|(index, &score)| Entry {
                                    index: index as u32,
                                    score,
                                    citations: graph.node(index).citation_count(),
                                    derived: citer_score(graph, &scores, index, config),
                                })
                                .collect::<Vec<_>>();

        entries.sort_unstable_by(|a, b| b.score.total_cmp(&a.score).then(a.index.cmp(&b.index)));

        let total = entries.iter().map(|entry| entry.score).sum();
        Ranking { entries, total }
    }

    pub fn entries(&self) -> &[Entry] { &self.entries[..] }
    pub fn len(&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    /// Sum of all emitted scores.
    pub fn total(&self) -> f64 { self.total }

    /// Writes `index,score,citations,derived` lines followed by the total.
    pub fn write<W: Write>(&self, mut writer: W) -> Result<()> {
        for entry in &self.entries {
            writeln!(writer, "{},{},{},{}", entry.index, entry.score, entry.citations, entry.derived)?;
        }
        writeln!(writer, "total score: {}", self.total)?;
        writer.flush()?;
        info!(ranked = self.entries.len(), total = self.total, "wrote ranking");
        Ok(())
    }
}

#[cfg(test)]
use crate::graph::GraphBuilder;

#[test]
fn ranking_orders_and_totals() {
    // 3 is cited by everyone; 0 and 1 tie
    let mut builder = GraphBuilder::new(4).unwrap();
    builder.add(0, &[3]).unwrap();
    builder.add(1, &[3]).unwrap();
    builder.add(2, &[3, 0]).unwrap();
    let mut graph = builder.finish();
    let config = RankConfig { iterations: 5, workers: 3, ..RankConfig::default() };
    crate::rank::rank(&mut graph, &config).unwrap();

    let ranking = Ranking::build(&graph, &config);
    let indices = ranking.entries().iter().map(|entry| entry.index).collect::<Vec<_>>();
    assert_eq!(indices.len(), 4);
    assert!(!indices.contains(&4));
    assert_eq!(indices[0], 2);
    assert!(ranking.entries().windows(2).all(|pair| pair[0].score >= pair[1].score));
    let position = |index| indices.iter().position(|&i| i == index).unwrap();
    assert!(position(0) < position(1));

    let sum: f64 = ranking.entries().iter().map(|entry| entry.score).sum();
    assert!((sum - ranking.total()).abs() < 1e-9);
}

#[test]
fn derived_score_tracks_fixed_point() {
    let mut builder = GraphBuilder::new(2).unwrap();
    builder.add(0, &[1]).unwrap();
    builder.add(1, &[2]).unwrap();
    builder.add(2, &[0]).unwrap();
    let mut graph = builder.finish();
    let config = RankConfig { iterations: 50, ..RankConfig::default() };
    crate::rank::rank(&mut graph, &config).unwrap();
    for entry in Ranking::build(&graph, &config).entries() {
        assert!((entry.score - entry.derived).abs() < 1e-9);
        assert_eq!(entry.citations, 1);
    }
}

#[test]
fn write_lines() {
    let mut builder = GraphBuilder::new(1).unwrap();
    builder.add(1, &[0]).unwrap();
    let mut graph = builder.finish();
    let config = RankConfig { iterations: 1, ..RankConfig::reference() };
    crate::rank::rank(&mut graph, &config).unwrap();

    let mut out = Vec::new();
    Ranking::build(&graph, &config).write(&mut out).unwrap();
    // 1 draws 0.9 from 0; 0 cites nothing and keeps hydration
    assert_eq!(String::from_utf8(out).unwrap(), "1,1.9,1,1.9\n0,1,0,1\ntotal score: 2.9\n");
}

#[test]
fn write_failure_is_returned() {
    use std::io;

    struct Refusing;
    impl Write for Refusing {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> { Err(io::Error::new(io::ErrorKind::Other, "disk full")) }
        fn flush(&mut self) -> io::Result<()> { Ok(()) }
    }

    let mut builder = GraphBuilder::new(1).unwrap();
    builder.add(0, &[1]).unwrap();
    let graph = builder.finish();
    match Ranking::build(&graph, &RankConfig::default()).write(Refusing) {
        Err(crate::error::Error::Io(_)) => {},
        _ => panic!("failed write reported as success"),
    }
}
