use std::time::Instant;
use std::{env, process};

use sv_evidence::{index, utils};
use getopts::Options;

//-----------------------------------------------------------------------------

fn main() -> Result<(), String> {
    let start_time = Instant::now();

    // Parse arguments.
    let config = Config::new();
    utils::init_logging(config.verbose, config.quiet);

    // Check if the index already exists.
    utils::prepare_output(&config.index_file, config.overwrite).map_err(|x| x.to_string())?;

    // Build the index.
    let index = index::build_index(&config.bam_file).map_err(|x| x.to_string())?;
    index.save(&config.index_file).map_err(|x| x.to_string())?;

    // Statistics.
    for reference_id in 0..index.references() {
        if let Some(stats) = index.reference_stats(reference_id) {
            log::info!("Reference {}: {} mapped, {} unmapped", reference_id, stats.mapped, stats.unmapped);
        }
    }
    if let Some(count) = index.unplaced_unmapped() {
        log::info!("{} unplaced unmapped records", count);
    }
    if let Some(size) = utils::file_size(&config.index_file) {
        log::info!("Wrote {} ({})", config.index_file, size);
    }

    let end_time = Instant::now();
    let seconds = end_time.duration_since(start_time).as_secs_f64();
    eprintln!("Used {:.3} seconds", seconds);

    Ok(())
}

//-----------------------------------------------------------------------------

struct Config {
    pub bam_file: String,
    pub index_file: String,
    pub overwrite: bool,
    pub verbose: usize,
    pub quiet: bool,
}

impl Config {
    pub fn new() -> Config {
        let args: Vec<String> = env::args().collect();
        let program = args[0].clone();

        let mut opts = Options::new();
        opts.optflag("h", "help", "print this help");
        opts.optopt("o", "output", "output file name (default: <input>.bai)", "FILE");
        opts.optflag("", "overwrite", "overwrite the index file if it exists");
        opts.optflagmulti("v", "verbose", "print more progress information (repeat for more)");
        opts.optflag("q", "quiet", "print only warnings and errors");
        let matches = match opts.parse(&args[1..]) {
            Ok(m) => m,
            Err(f) => {
                eprintln!("{}", f);
                process::exit(1);
            }
        };

        let header = format!("Usage: {} [options] input.bam", program);
        if matches.opt_present("h") {
            eprint!("{}", opts.usage(&header));
            process::exit(0);
        }

        let bam_file = if let Some(s) = matches.free.first() {
            s.clone()
        } else {
            eprint!("{}", opts.usage(&header));
            process::exit(1);
        };
        let index_file = matches.opt_str("o").unwrap_or(format!("{}.bai", bam_file));

        Config {
            bam_file,
            index_file,
            overwrite: matches.opt_present("overwrite"),
            verbose: matches.opt_count("v"),
            quiet: matches.opt_present("q"),
        }
    }
}

//-----------------------------------------------------------------------------
