use clap::Parser;
use std::io;
use std::path::PathBuf;

use dagalign::align;
use dagalign::io::{graph_load, query_reader, tsv_output};
use dagalign::params::ScoreParams;

#[derive(Parser)]
#[command(name = "dagalign")]
#[command(about = "Local alignment of reads to a node-labeled reference DAG", long_about = None)]
#[command(version)]
struct Cli {
    /// Reference graph format [vg or txt]
    #[arg(short = 'm', long = "mode", value_name = "FORMAT")]
    mode: String,

    /// Reference graph file
    #[arg(short = 'r', long = "ref", value_name = "FILE")]
    rfile: PathBuf,

    /// Query file (FASTA/FASTQ, optionally gzip-compressed)
    #[arg(short = 'q', long = "query", value_name = "FILE")]
    qfile: PathBuf,

    /// Output file for alignment results
    #[arg(
        short = 'o',
        long = "output",
        value_name = "FILE",
        default_value = "dagalign_output.tsv"
    )]
    ofile: PathBuf,

    /// Score for a matching character
    #[arg(long = "match", value_name = "INT", default_value_t = 1)]
    match_score: i32,

    /// Penalty for a mismatching character
    #[arg(long, value_name = "INT", default_value_t = 1)]
    mismatch: i32,

    /// Penalty for an insertion in the read
    #[arg(long, value_name = "INT", default_value_t = 1)]
    ins: i32,

    /// Penalty for a deletion from the read
    #[arg(long, value_name = "INT", default_value_t = 1)]
    del: i32,

    /// Number of threads (default: all available cores)
    #[arg(short = 't', long, value_name = "INT")]
    threads: Option<usize>,
}

fn main() {
    // Exit 1 (not clap's default 2) on bad invocations; help and version
    // requests still exit 0.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            std::process::exit(if e.use_stderr() { 1 } else { 0 });
        }
    };

    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp(None)
        .format_target(false)
        .init();

    let format = match cli.mode.parse::<graph_load::GraphFormat>() {
        Ok(f) => f,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };

    let params = match ScoreParams::new(cli.match_score, cli.mismatch, cli.ins, cli.del) {
        Ok(p) => p,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };

    let num_threads = cli.threads.unwrap_or_else(num_cpus::get).max(1);
    if let Err(e) = rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()
    {
        log::warn!("failed to configure thread pool: {}", e);
    }
    log::info!("using {} thread(s)", num_threads);

    log::info!(
        "reference file = {} (in {} format)",
        cli.rfile.display(),
        cli.mode
    );
    log::info!("query file = {}", cli.qfile.display());
    log::info!(
        "scoring: match = {}, mismatch = {}, ins = {}, del = {}",
        params.match_score,
        params.mismatch,
        params.ins,
        params.del
    );

    if let Err(e) = run(format, &cli.rfile, &cli.qfile, &cli.ofile, &params) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(
    format: graph_load::GraphFormat,
    rfile: &PathBuf,
    qfile: &PathBuf,
    ofile: &PathBuf,
    params: &ScoreParams,
) -> io::Result<()> {
    let graph = graph_load::load_graph(format, rfile)?;

    let (reads, qmeta) = query_reader::read_queries(qfile)?;
    log::info!("total count of reads = {}", reads.len());

    let results = align::align_local(&reads, &graph, params);

    tsv_output::write_results(ofile, &qmeta, &graph, &results)?;
    log::info!("results written to {}", ofile.display());

    Ok(())
}
