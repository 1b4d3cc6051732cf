use std::io;
use std::process;

use articlerank::encode::{self, Record};
use articlerank::HeaderLayout;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

// writes a random citation graph with uniformly chosen endpoints, for timing
// the ranker on inputs of a chosen size.

fn main() {

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let mut opts = getopts::Options::new();
    opts.optopt("s", "seed", "random seed", "N");
    let brief = "usage:\tgenerate <target> <nodes> <edges> [options]";

    let matches = match opts.parse(std::env::args().skip(1)) {
        Ok(matches) if matches.free.len() == 3 => matches,
        _ => {
            eprintln!("{}", opts.usage(brief));
            process::exit(2);
        }
    };

    let target = &matches.free[0];
    let parsed = (matches.free[1].parse::<u32>(), matches.free[2].parse::<usize>(), matches.opt_str("s").map(|s| s.parse::<u64>()).unwrap_or(Ok(0)));
    let (nodes, edges, seed) = match parsed {
        (Ok(nodes), Ok(edges), Ok(seed)) if nodes > 0 => (nodes, edges, seed),
        _ => {
            eprintln!("{}", opts.usage(brief));
            process::exit(2);
        }
    };

    let mut rng = StdRng::seed_from_u64(seed);
    let mut lists = vec![Vec::new(); nodes as usize];
    for _ in 0..edges {
        let source = rng.gen_range(0..nodes);
        lists[source as usize].push(rng.gen_range(0..nodes));
    }

    let records = lists.into_iter()
                       .enumerate()
                       .filter(|(_, citations)| !citations.is_empty())
                       .map(|(node, citations)| Record { node: node as u32, citations })
                       .collect::<Vec<_>>();

    info!(nodes, edges, seed, records = records.len(), "generated graph");
    if let Err(err) = encode::write_file(target, &records, HeaderLayout::SizeAndCount) {
        error!("{}", err);
        process::exit(1);
    }
}
