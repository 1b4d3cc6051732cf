use std::io::{self, BufWriter};
use std::process;

use articlerank::{HeaderLayout, RankConfig};
use tracing::error;
use tracing_subscriber::EnvFilter;

const BRIEF: &str = "usage:\tarticlerank <input> [options]

<input> is a binary citation graph as written by `parse`. each node id may
head at most one record; a repeated node id fails the load, so merge the
citation lists of duplicate rows before encoding.";

fn usage(opts: &getopts::Options) -> String {
    opts.usage(BRIEF)
}

fn main() {

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let mut opts = getopts::Options::new();
    opts.optopt("o", "output", "write the ranking here instead of stdout", "FILE");
    opts.optopt("w", "workers", "number of worker threads", "N");
    opts.optopt("i", "iterations", "number of rounds", "N");
    opts.optopt("", "hydration", "score every node receives each round", "H");
    opts.optopt("", "dehydration", "weight of propagated scores", "D");
    opts.optflag("", "reference", "start from hydration 1 and dehydration 0.9");
    opts.optflag("", "size-only", "input header carries max id only");
    opts.optflag("h", "help", "print this message");

    let matches = match opts.parse(std::env::args().skip(1)) {
        Ok(matches) => matches,
        Err(err) => {
            eprintln!("error parsing arguments: {}", err);
            eprintln!("{}", usage(&opts));
            process::exit(2);
        }
    };
    if matches.opt_present("h") || matches.free.len() != 1 {
        eprintln!("{}", usage(&opts));
        process::exit(if matches.opt_present("h") { 0 } else { 2 });
    }

    let config = match configure(&matches) {
        Ok(config) => config,
        Err(message) => {
            eprintln!("{}", message);
            process::exit(2);
        }
    };
    let layout = if matches.opt_present("size-only") { HeaderLayout::SizeOnly } else { HeaderLayout::SizeAndCount };

    let input = &matches.free[0];
    let result = match matches.opt_str("o") {
        Some(output) => articlerank::run_to_file(input, layout, &config, &output),
        None => articlerank::run(input, layout, &config, BufWriter::new(io::stdout().lock())),
    };

    if let Err(err) = result {
        error!(input = %input, "{}", err);
        process::exit(1);
    }
}

fn configure(matches: &getopts::Matches) -> Result<RankConfig, String> {
    let mut config = if matches.opt_present("reference") { RankConfig::reference() } else { RankConfig::default() };
    if let Some(workers) = matches.opt_str("w") {
        config.workers = workers.parse().map_err(|_| format!("bad worker count: {}", workers))?;
    }
    if let Some(iterations) = matches.opt_str("i") {
        config.iterations = iterations.parse().map_err(|_| format!("bad iteration count: {}", iterations))?;
    }
    if let Some(hydration) = matches.opt_str("hydration") {
        config.hydration = hydration.parse().map_err(|_| format!("bad hydration: {}", hydration))?;
    }
    if let Some(dehydration) = matches.opt_str("dehydration") {
        config.dehydration = dehydration.parse().map_err(|_| format!("bad dehydration: {}", dehydration))?;
    }
    config.validate().map_err(|err| err.to_string())?;
    Ok(config)
}

#[test]
fn usage_mentions_duplicate_records() {
    let text = usage(&getopts::Options::new());
    assert!(text.contains("at most one record"));
    assert!(text.contains("repeated node id fails the load"));
}
