use std::io::{self, BufWriter, Write};
use std::time::Instant;
use std::{env, process};

use sv_evidence::{region, utils};
use sv_evidence::{BamReader, RecordSink, SamSink};
use getopts::Options;

//-----------------------------------------------------------------------------

fn main() -> Result<(), String> {
    let start_time = Instant::now();

    // Parse arguments.
    let config = Config::new();
    utils::init_logging(config.verbose, config.quiet);

    let mut reader = BamReader::open(&config.bam_file).map_err(|x| x.to_string())?;
    let mut output = BufWriter::new(io::stdout().lock());
    if config.header {
        let mut sink = SamSink::new(&mut output, reader.header());
        sink.write_header().map_err(|x| x.to_string())?;
        sink.into_inner().map_err(|x| x.to_string())?;
    }

    let records = if let Some(region) = config.region.as_ref() {
        let (reference_id, start, end) = region::parse_region(region, reader.header()).map_err(|x| x.to_string())?;
        drop(reader);
        log::info!("Reference {} interval {}..{}", reference_id, start, end);
        region::view_region(&config.bam_file, reference_id, start, end, &mut output).map_err(|x| x.to_string())?
    } else {
        let mut sink = SamSink::new(&mut output, reader.header());
        for record in reader.records() {
            let record = record.map_err(|x| x.to_string())?;
            sink.write_record(&record).map_err(|x| x.to_string())?;
        }
        sink.records()
    };
    output.flush().map_err(|x| x.to_string())?;
    log::info!("Printed {} records", records);

    let end_time = Instant::now();
    let seconds = end_time.duration_since(start_time).as_secs_f64();
    log::info!("Used {:.3} seconds", seconds);

    Ok(())
}

//-----------------------------------------------------------------------------

struct Config {
    pub bam_file: String,
    pub region: Option<String>,
    pub header: bool,
    pub verbose: usize,
    pub quiet: bool,
}

impl Config {
    pub fn new() -> Config {
        let args: Vec<String> = env::args().collect();
        let program = args[0].clone();

        let mut opts = Options::new();
        opts.optflag("h", "help", "print this help");
        opts.optopt("r", "region", "print only records overlapping the region (NAME, NAME:START-END, or reference id)", "STR");
        opts.optflag("", "header", "print the SAM header");
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

        Config {
            bam_file,
            region: matches.opt_str("r"),
            header: matches.opt_present("header"),
            verbose: matches.opt_count("v"),
            quiet: matches.opt_present("q"),
        }
    }
}

//-----------------------------------------------------------------------------
