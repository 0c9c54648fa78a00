use clap::Parser;
use dtm::{
    ConsoleSink, DtmError, Machine, ProgramLoader, ProgramManager, Run, RunConfig, StepEvent,
};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Runs a deterministic Turing machine on an input string.
#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(after_help = "EXAMPLES:
  dtm-cli --name \"Binary Suffix Classifier\" -i 10100
  dtm-cli -p programs/binary-addition.dtm -i 1101011+1011 --tape-length 30 -d
  cat programs/binary-suffix.dtm | dtm-cli -i 1100")]
struct Cli {
    /// The machine description file (.dtm) to execute
    #[clap(short, long, conflicts_with = "name")]
    program: Option<PathBuf>,

    /// Name of a built-in machine
    #[clap(short, long)]
    name: Option<String>,

    /// The input string placed on the tape
    #[clap(short, long, default_value = "")]
    input: String,

    /// JSON run configuration; flags below override its values
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// Number of tape cells
    #[clap(long)]
    tape_length: Option<usize>,

    /// Cell where the input starts and the head is placed
    #[clap(long)]
    offset: Option<usize>,

    /// Maximum number of transitions before giving up
    #[clap(long, conflicts_with = "no_step_limit")]
    step_limit: Option<usize>,

    /// Run until the machine halts, however long that takes
    #[clap(long)]
    no_step_limit: bool,

    /// Export the trace only when the run takes more steps than this
    #[clap(long)]
    export_threshold: Option<usize>,

    /// Where to export the trace
    #[clap(short = 'o', long, default_value = "dtm_output.txt")]
    trace_out: PathBuf,

    /// Print each step of the execution
    #[clap(short = 'd', long)]
    debug: bool,

    /// List the built-in machines and exit
    #[clap(short, long)]
    list: bool,

    /// Enable debug logging (overridden by RUST_LOG)
    #[clap(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.list {
        for (index, name) in ProgramManager::list_program_names().iter().enumerate() {
            println!("{index}: {name}");
        }
        return ExitCode::SUCCESS;
    }

    match execute(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn execute(cli: &Cli) -> Result<(), DtmError> {
    let machine = load_machine(cli)?;
    let config = load_config(cli)?;

    let mut run = Run::new(&machine, &cli.input, config)?;

    let result = if cli.debug {
        println!("Start: {} in {}", run.tape(), run.state());
        run.run_with(&mut ConsoleSink::stdout())
    } else {
        run.run_with(&mut |event: &StepEvent| {
            tracing::trace!("{}. {}", event.step, event.snapshot);
        })
    };

    match result {
        Ok(state) => {
            println!("Halted in {} after {} steps", state, run.step_count());
            println!("{}", run.tape());

            if run.export_trace(&cli.trace_out)? {
                println!("Trace written to {}", cli.trace_out.display());
            }

            Ok(())
        }
        Err(fault) => {
            println!("{}", run.tape());
            Err(fault.into())
        }
    }
}

/// Loads the machine from a file, a built-in name, or stdin, falling back to the first
/// built-in machine.
fn load_machine(cli: &Cli) -> Result<Machine, DtmError> {
    if let Some(path) = &cli.program {
        ProgramLoader::load_program(path)
    } else if let Some(name) = &cli.name {
        ProgramManager::get_program_by_name(name)
    } else if atty::isnt(atty::Stream::Stdin) {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .map_err(|e| DtmError::FileError(format!("Failed to read from stdin: {}", e)))?;
        ProgramLoader::load_program_from_string(&buffer)
    } else {
        ProgramManager::get_program_by_index(0)
    }
}

fn load_config(cli: &Cli) -> Result<RunConfig, DtmError> {
    let mut config = match &cli.config {
        Some(path) => RunConfig::load(Path::new(path))?,
        None => RunConfig::default(),
    };

    if let Some(tape_length) = cli.tape_length {
        config = config.with_tape_length(tape_length);
    }
    if let Some(offset) = cli.offset {
        config = config.with_head_offset(offset);
    }
    if let Some(limit) = cli.step_limit {
        config = config.with_step_limit(Some(limit));
    }
    if cli.no_step_limit {
        config = config.with_step_limit(None);
    }
    if let Some(threshold) = cli.export_threshold {
        config = config.with_export_threshold(threshold);
    }

    config.validate()?;
    Ok(config)
}
