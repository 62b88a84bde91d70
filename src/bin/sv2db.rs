use std::time::Instant;
use std::{env, process};

use sv_evidence::{utils, SvDatabase};
use getopts::Options;

//-----------------------------------------------------------------------------

fn main() -> Result<(), String> {
    let start_time = Instant::now();

    // Parse arguments.
    let config = Config::new();
    utils::init_logging(config.verbose, config.quiet);

    // Check if the database already exists.
    utils::prepare_output(&config.db_file, config.overwrite).map_err(|x| x.to_string())?;

    // Create the database.
    SvDatabase::create_from_tsv(&config.tsv_file, &config.db_file).map_err(|x| x.to_string())?;

    // Statistics.
    let database = SvDatabase::open(&config.db_file).map_err(|x| x.to_string())?;
    log::info!(
        "The database contains {} breakpoint pairs for {} samples",
        database.breakpoints(), database.samples()
    );
    if let Some(size) = database.file_size() {
        log::info!("Database size: {}", size);
    }

    let end_time = Instant::now();
    let seconds = end_time.duration_since(start_time).as_secs_f64();
    eprintln!("Used {:.3} seconds", seconds);

    Ok(())
}

//-----------------------------------------------------------------------------

struct Config {
    pub tsv_file: String,
    pub db_file: String,
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
        opts.optopt("o", "output", "output file name (default: <input>.db)", "FILE");
        opts.optflag("", "overwrite", "overwrite the database file if it exists");
        opts.optflagmulti("v", "verbose", "print more progress information (repeat for more)");
        opts.optflag("q", "quiet", "print only warnings and errors");
        let matches = match opts.parse(&args[1..]) {
            Ok(m) => m,
            Err(f) => {
                eprintln!("{}", f);
                process::exit(1);
            }
        };

        let header = format!("Usage: {} [options] breakpoints.tsv[.gz]", program);
        if matches.opt_present("h") {
            eprint!("{}", opts.usage(&header));
            process::exit(0);
        }

        let tsv_file = if let Some(s) = matches.free.first() {
            s.clone()
        } else {
            eprint!("{}", opts.usage(&header));
            process::exit(1);
        };
        let db_file = matches.opt_str("o").unwrap_or_else(|| {
            let base = tsv_file.strip_suffix(".gz").unwrap_or(&tsv_file);
            let base = base.strip_suffix(".tsv").unwrap_or(base);
            format!("{}.db", base)
        });

        Config {
            tsv_file,
            db_file,
            overwrite: matches.opt_present("overwrite"),
            verbose: matches.opt_count("v"),
            quiet: matches.opt_present("q"),
        }
    }
}

//-----------------------------------------------------------------------------
