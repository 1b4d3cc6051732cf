use std::io::{self, BufRead};
use std::process;

use articlerank::encode::{self, Record};
use articlerank::{HeaderLayout, Result};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

// reads lines `node,target,target,...` from stdin, where `node` cites each
// `target`. lines starting with '#' and blank lines are skipped. output is
//
//     header: [max_id: i32, node_count: i32]
//     record: [node: i32, count: i32, target: [i32; count]]

fn main() {

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let target = match std::env::args().nth(1) {
        Some(target) => target,
        None => {
            eprintln!("usage: parse <target> [--size-only]");
            eprintln!("will overwrite <target>");
            eprintln!("each node id may start at most one line; the ranker rejects repeated node ids");
            process::exit(2);
        }
    };
    let layout = if std::env::args().skip(2).any(|arg| arg == "--size-only") { HeaderLayout::SizeOnly } else { HeaderLayout::SizeAndCount };
    info!(target = %target, "parsing stdin");

    if let Err(err) = read(io::stdin().lock()).and_then(|records| encode::write_file(&target, &records, layout)) {
        error!("{}", err);
        process::exit(1);
    }
}

fn read<R: BufRead>(input: R) -> Result<Vec<Record>> {
    let mut records = Vec::new();
    for (number, line) in input.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() || line.starts_with('#') { continue; }
        records.push(encode::parse_line(&line, number + 1)?);
        if records.len() % 100_000 == 0 { info!(records = records.len(), "parsed"); }
    }
    Ok(records)
}

#[test]
fn read_skips_comments_and_blanks() {
    use std::io::Cursor;
    use articlerank::Error;

    let records = read(Cursor::new("# pmid,citers\n1,2,3\n\n   \n4\n")).unwrap();
    assert_eq!(records, vec![Record { node: 1, citations: vec![2, 3] }, Record { node: 4, citations: vec![] }]);

    match read(Cursor::new("# header\n\n1,2\n1,x\n")) {
        Err(Error::Parse { line: 4, .. }) => {},
        _ => panic!("malformed line accepted or misnumbered"),
    }
}
