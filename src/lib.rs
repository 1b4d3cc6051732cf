pub mod config;
pub mod encode;
pub mod error;
pub mod graph;
pub mod mapped;
pub mod rank;
pub mod results;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use time::OffsetDateTime;
use tracing::info;

pub use config::RankConfig;
pub use error::{Error, Result};
pub use graph::{Graph, GraphBuilder, HeaderLayout, Node};
pub use results::{Entry, Ranking};

/// Loads the graph at `path`, ranks it, and writes the ordered scores.
pub fn run<P: AsRef<Path>, W: Write>(path: P, layout: HeaderLayout, config: &RankConfig, writer: W) -> Result<Ranking> {
    let start = OffsetDateTime::now_utc();
    let ranking = rank_file(path, layout, config)?;
    ranking.write(writer)?;
    info!(seconds = (OffsetDateTime::now_utc() - start).as_seconds_f64(), "finished");
    Ok(ranking)
}

/// As `run`, but `output` is only created once ranking has succeeded, so a
/// failed load leaves no file behind.
pub fn run_to_file<P: AsRef<Path>, Q: AsRef<Path>>(path: P, layout: HeaderLayout, config: &RankConfig, output: Q) -> Result<Ranking> {
    let start = OffsetDateTime::now_utc();
    let ranking = rank_file(path, layout, config)?;
    ranking.write(BufWriter::new(File::create(output)?))?;
    info!(seconds = (OffsetDateTime::now_utc() - start).as_seconds_f64(), "finished");
    Ok(ranking)
}

fn rank_file<P: AsRef<Path>>(path: P, layout: HeaderLayout, config: &RankConfig) -> Result<Ranking> {
    let mut graph = Graph::open(path, layout)?;
    rank::rank(&mut graph, config)?;
    Ok(Ranking::build(&graph, config))
}

#[test]
fn run_from_file() {
    use encode::Record;
    let dir = ::tempdir::TempDir::new("run_from_file").unwrap();
    let path = dir.path().join("links");
    let records = vec![
        Record { node: 1, citations: vec![2] },
        Record { node: 2, citations: vec![3] },
        Record { node: 3, citations: vec![1] },
    ];
    encode::write_file(&path, &records, HeaderLayout::SizeAndCount).unwrap();

    let config = RankConfig { iterations: 10, workers: 2, ..RankConfig::reference() };
    let mut first = Vec::new();
    let ranking = run(&path, HeaderLayout::SizeAndCount, &config, &mut first).unwrap();
    assert_eq!(ranking.len(), 3);
    assert_eq!(ranking.entries().iter().map(|entry| entry.index).collect::<Vec<_>>(), vec![1, 2, 3]);

    let mut second = Vec::new();
    run(&path, HeaderLayout::SizeAndCount, &config, &mut second).unwrap();
    assert_eq!(first, second);

    match run(dir.path().join("missing"), HeaderLayout::SizeAndCount, &config, Vec::new()) {
        Err(Error::Io(_)) => {},
        _ => panic!("missing input accepted"),
    }
}

#[test]
fn failed_load_creates_no_output() {
    let dir = ::tempdir::TempDir::new("failed_load_creates_no_output").unwrap();
    let input = dir.path().join("links");
    let output = dir.path().join("ranks");

    // header promises records that never arrive intact
    File::create(&input).unwrap().write_all(&[3, 0, 0, 0, 1, 0, 0, 0, 0, 0]).unwrap();
    match run_to_file(&input, HeaderLayout::SizeAndCount, &RankConfig::default(), &output) {
        Err(Error::TruncatedRecord { offset: 8 }) => {},
        _ => panic!("truncated input accepted"),
    }
    assert!(!output.exists());

    encode::write_file(&input, &[encode::Record { node: 0, citations: vec![1] }], HeaderLayout::SizeAndCount).unwrap();
    let ranking = run_to_file(&input, HeaderLayout::SizeAndCount, &RankConfig::default(), &output).unwrap();
    assert_eq!(ranking.len(), 2);
    assert!(::std::fs::read_to_string(&output).unwrap().ends_with(&format!("total score: {}\n", ranking.total())));
}
