use std::io::{self, BufWriter};
use std::time::Instant;
use std::{env, process};

use sv_evidence::{evidence, utils};
use sv_evidence::{ArchiveSession, ContigNamespace, ExtractionParams, SamSink, SvDatabase};
use getopts::Options;

//-----------------------------------------------------------------------------

fn main() -> Result<(), String> {
    let start_time = Instant::now();

    // Parse arguments.
    let config = Config::new();
    utils::init_logging(config.verbose, config.quiet);

    // Find the breakpoints for the sample.
    let database = SvDatabase::open(&config.db_file).map_err(|x| x.to_string())?;
    let pairs = database.breakpoints_for_sample(&config.accession).map_err(|x| x.to_string())?;
    if pairs.is_empty() {
        log::warn!("No breakpoint pairs for sample {} in {}", config.accession, config.db_file);
    } else {
        log::info!("Found {} breakpoint pairs for sample {}", pairs.len(), config.accession);
    }

    // Extract the evidence. Failed requests do not stop the batch.
    let mut failures = 0;
    let mut records = 0;
    if config.sam {
        let mut session = ArchiveSession::open(&config.bam_file).map_err(|x| x.to_string())?;
        let namespace = ContigNamespace::default();
        let output = BufWriter::new(io::stdout().lock());
        let mut sink = SamSink::new(output, session.header());
        for pair in pairs.iter() {
            match evidence::collect_evidence(&mut session, pair, &namespace, &config.params, &mut sink) {
                Ok(count) => records += count,
                Err(err) => {
                    log::error!("Extraction failed for {}: {}", pair, err);
                    failures += 1;
                },
            }
        }
        sink.into_inner().map_err(|x| x.to_string())?;
    } else {
        for pair in pairs.iter() {
            match evidence::extract(&config.bam_file, pair, &config.params) {
                Ok(report) => {
                    log::info!("{}: {} records in {}", pair, report.records, report.output.display());
                    records += report.records;
                },
                Err(err) => {
                    log::error!("{}", err);
                    failures += 1;
                },
            }
        }
    }
    log::info!("Extracted {} records for {} breakpoint pairs", records, pairs.len() - failures);

    let end_time = Instant::now();
    let seconds = end_time.duration_since(start_time).as_secs_f64();
    eprintln!("Used {:.3} seconds", seconds);

    if failures > 0 {
        return Err(format!("{} of {} extraction requests failed", failures, pairs.len()));
    }
    Ok(())
}

//-----------------------------------------------------------------------------

struct Config {
    pub db_file: String,
    pub accession: String,
    pub bam_file: String,
    pub params: ExtractionParams,
    pub sam: bool,
    pub verbose: usize,
    pub quiet: bool,
}

impl Config {
    pub fn new() -> Config {
        let args: Vec<String> = env::args().collect();
        let program = args[0].clone();

        let mut opts = Options::new();
        opts.optflag("h", "help", "print this help");
        opts.optopt("d", "database", "breakpoint database (required)", "FILE");
        let window_desc = format!("query window on each side of a breakpoint (default: {})", ExtractionParams::HALF_WINDOW);
        opts.optopt("w", "window", &window_desc, "INT");
        opts.optopt("", "min-tlen", "require this template length for breakpoints on the same reference", "INT");
        opts.optflag("", "no-index", "do not index the output files");
        opts.optflag("", "sam", "print SAM lines to stdout instead of writing BAM files");
        opts.optflagmulti("v", "verbose", "print more progress information (repeat for more)");
        opts.optflag("q", "quiet", "print only warnings and errors");
        let matches = match opts.parse(&args[1..]) {
            Ok(m) => m,
            Err(f) => {
                eprintln!("{}", f);
                process::exit(1);
            }
        };

        let header = format!("Usage: {} [options] -d breakpoints.db ACCESSION input.bam", program);
        if matches.opt_present("h") {
            eprint!("{}", opts.usage(&header));
            process::exit(0);
        }

        let db_file = if let Some(s) = matches.opt_str("d") {
            s
        } else {
            eprintln!("Breakpoint database must be specified with -d");
            eprint!("{}", opts.usage(&header));
            process::exit(1);
        };
        let mut params = ExtractionParams::default();
        if let Some(s) = matches.opt_str("w") {
            match s.parse::<usize>() {
                Ok(n) if n > 0 => params.half_window = n,
                _ => {
                    eprintln!("Invalid window size: {}", s);
                    process::exit(1);
                }
            }
        }
        if let Some(s) = matches.opt_str("min-tlen") {
            match s.parse::<usize>() {
                Ok(n) => params.min_template_length = Some(n),
                Err(f) => {
                    eprintln!("--min-tlen: {}", f);
                    process::exit(1);
                }
            }
        }
        params.build_index = !matches.opt_present("no-index");

        let (accession, bam_file) = if matches.free.len() == 2 {
            (matches.free[0].clone(), matches.free[1].clone())
        } else {
            eprint!("{}", opts.usage(&header));
            process::exit(1);
        };

        Config {
            db_file,
            accession,
            bam_file,
            params,
            sam: matches.opt_present("sam"),
            verbose: matches.opt_count("v"),
            quiet: matches.opt_present("q"),
        }
    }
}

//-----------------------------------------------------------------------------
