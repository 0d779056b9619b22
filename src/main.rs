
extern crate clap;
#[macro_use] extern crate log;
extern crate fern;
extern crate chrono;
extern crate regex;
extern crate term_grid;

pub mod assembler;
pub mod machine;

use clap::{Arg, ArgMatches, App};
use term_grid::{Grid, GridOptions, Direction, Filling, Cell};

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

use assembler::Options;
use machine::{Halt, Machine, Memory, Step};
use machine::opcode;

fn main() {
    let args = process_arguments();
    initialize_logging(args.occurrences_of("verbose"));

    let options = match build_options(&args) {
        Ok(options) => options,
        Err(err) => {
            error!("fatal: {}", err);
            std::process::exit(1);
        }
    };
    let debug = args.is_present("debug");
    let strict = args.is_present("strict");
    let files: Vec<&str> = args.values_of("INPUT").map(|v| v.collect()).unwrap_or_default();

    debug!("Arguments:\n\tMemory: {}\n\tMax labels: {:?}\n\tDebug: {}\n\tStrict: {}\n\tInfiles: {:?}",
        options.memory_size,
        options.max_labels,
        debug,
        strict,
        files
    );

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut input = stdin.lock();
    let mut output = stdout.lock();

    for ifile in files {
        let ipath = Path::new(ifile);
        let reason = run_file(ipath, &options, debug, &mut input, &mut output);

        if reason.is_clean() {
            info!("{}: completed successfully", ipath.display());
        } else if strict {
            error!("{}: aborted: {}", ipath.display(), reason);
            std::process::exit(2);
        } else {
            warn!("{}: stopped: {}", ipath.display(), reason);
        }
    }
}

/// Assembles and runs one source file, exiting the process if it cannot
/// be read or does not assemble.
fn run_file<I: Read, O: Write>(ipath: &Path, options: &Options, debug: bool, input: &mut I, output: &mut O) -> Halt {
    let ifile = match File::open(ipath) {
        Err(err) => {
            error!("fatal: unable to open input file `{}`: {}", ipath.display(), err);
            std::process::exit(1);
        },
        Ok(file) => file,
    };

    let assembly = match assembler::assemble(ifile, options) {
        Err(err) => {
            error!("fatal: {}", err);
            std::process::exit(1);
        },
        Ok(assembly) => assembly,
    };

    if !assembly.is_ok() {
        for diagnostic in assembly.diagnostics.iter() {
            error!("{}:{}: {}", ipath.display(), diagnostic.line, diagnostic.kind);
        }
        error!("{}: assembly encountered {} error(s)", ipath.display(), assembly.diagnostics.len());
        std::process::exit(1);
    }

    let mut machine = Machine::new(assembly.memory);
    if !debug {
        return machine.run(input, output);
    }

    eprintln!("Running {} with {} cells of memory", ipath.display(), machine.memory().len());
    loop {
        match machine.step(input, output) {
            Step::Continue => print_memory(&machine),
            Step::Halted(reason) => {
                if let Err(err) = output.flush() {
                    warn!("unable to flush output: {}", err);
                }
                return reason;
            },
        }
    }
}

/// Dumps every cell to STDERR, marking the cell the program counter
/// points at.
fn print_memory(machine: &Machine) {
    let mut grid = Grid::new(GridOptions {
        filling:     Filling::Spaces(1),
        direction:   Direction::LeftToRight,
    });

    for (idx, code) in machine.memory().cells().iter().enumerate() {
        if idx == machine.pc() {
            grid.add(Cell::from(format!("[{:02}]:", idx)));
        } else {
            grid.add(Cell::from(format!("{:02}:", idx)));
        }
        grid.add(Cell::from(opcode::describe(*code)));
    }

    eprintln!("reg: {} pc: {}", machine.register(), machine.pc());
    eprintln!("{}", grid.fit_into_columns(10 * 2));
}

fn build_options(args: &ArgMatches) -> Result<Options, String> {
    let mut options = Options::default();

    if let Some(size) = args.value_of("memory") {
        options.memory_size = size.parse::<usize>()
            .map_err(|err| format!("invalid memory size `{}`: {}", size, err))?;
        Memory::new(options.memory_size).map_err(|err| err.to_string())?;
    }

    if let Some(max) = args.value_of("max-labels") {
        let max = max.parse::<usize>()
            .map_err(|err| format!("invalid label limit `{}`: {}", max, err))?;
        options.max_labels = Some(max);
    }

    Ok(options)
}

fn process_arguments() -> ArgMatches<'static> {
    App::new(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .author(env!("CARGO_PKG_AUTHORS"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .arg(Arg::with_name("INPUT")
            .help("Sets the input file(s) to assemble and run, in order")
            .required(true)
            .multiple(true)
            .index(1))
        .arg(Arg::with_name("verbose")
            .short("v")
            .multiple(true)
            .takes_value(false)
            .help("Sets the level of verbosity"))
        .arg(Arg::with_name("memory")
            .short("m")
            .takes_value(true)
            .value_name("SIZE")
            .help("memory size in cells, at most 100 (default 100)"))
        .arg(Arg::with_name("max-labels")
            .long("max-labels")
            .takes_value(true)
            .value_name("N")
            .help("limits the number of distinct labels per file"))
        .arg(Arg::with_name("debug")
            .short("d")
            .takes_value(false)
            .help("prints the memory to STDERR after every instruction"))
        .arg(Arg::with_name("strict")
            .long("strict")
            .takes_value(false)
            .help("exit with an error if a program stops for any reason other than HLT"))
        .get_matches()
}

fn initialize_logging(verbosity: u64) {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(match verbosity {
            0 => log::LevelFilter::Error,
            1 => log::LevelFilter::Warn,
            2 => log::LevelFilter::Info,
            3 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        })
        // Program output owns STDOUT.
        .chain(std::io::stderr())
        .apply().ok();
}
