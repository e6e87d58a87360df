use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser};
use log::LevelFilter;
use simple_logger::SimpleLogger;

use sico::config::{Config, DEFAULT_IO_PORTS};
use sico::host::StdHost;
use sico::vm::{State, Vm, UNBOUNDED};
use sico::word::Modulus;

// prints the usage line through the stdout port
const USAGE: &str = "
  loop: len  ?    neg
        0-2  text ?+1
        ?-2  neg  loop
  text: 85 115 97 103 101 58 32 115 105 99 111 32
        102 105 108 101 46 115 105 99 111 10
  neg:  0-1
  len:  len-text
";

#[derive(Parser, Debug)]
#[command(
  name = "sico",
  version,
  about = "Assemble and run a SICO program",
  long_about = "Assemble and run a SICO program.\n\n\
    Every instruction is three words A B C: subtract mem[B] from mem[A] and \
    jump to C if mem[A] <= mem[B]. With no program the usage is printed by a \
    SICO program."
)]
struct Cli {
  /// Source file to assemble and run
  #[arg(value_name = "FILE", conflicts_with = "eval")]
  file: Option<PathBuf>,

  /// Assemble and run SRC instead of a file
  #[arg(short = 'e', long = "eval", value_name = "SRC")]
  eval: Option<String>,

  /// Word modulus; 0 means native 64-bit words
  #[arg(short = 'm', long = "modulus", default_value_t = 0)]
  modulus: u64,

  /// Number of reserved addresses at the top of memory
  #[arg(long = "io-ports", default_value_t = DEFAULT_IO_PORTS)]
  io_ports: u64,

  /// Stop after this many instructions
  #[arg(short = 'b', long = "budget")]
  budget: Option<u64>,

  /// Log more; repeat for trace output
  #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
  verbose: u8,
}

impl Cli {
  fn level(&self) -> LevelFilter {
    match self.verbose {
      0 => LevelFilter::Warn,
      1 => LevelFilter::Info,
      2 => LevelFilter::Debug,
      _ => LevelFilter::Trace,
    }
  }

  fn config(&self) -> Config {
    Config::default()
      .with_modulus(Modulus::new(self.modulus))
      .with_io_ports(self.io_ports)
  }
}

fn main() -> ExitCode {
  let cli = Cli::parse();
  if let Err(err) = SimpleLogger::new().with_level(cli.level()).init() {
    eprintln!("failed to install logger: {err}");
  }

  let mut vm = match Vm::with_config(cli.config()) {
    Ok(vm) => vm,
    Err(err) => {
      eprintln!("sico: {err}");
      return ExitCode::FAILURE;
    }
  };

  match (&cli.file, &cli.eval) {
    (Some(path), _) => vm.parse_file(path),
    (None, Some(source)) => vm.assemble(source),
    (None, None) => vm.assemble(USAGE),
  };
  log::info!("{} words of memory in use", vm.memory().capacity());

  let mut host = StdHost::new();
  let state = vm.run(&mut host, cli.budget.unwrap_or(UNBOUNDED));
  host.flush();
  log::info!("executed {} instructions", vm.instructions());

  if state == State::Completed {
    return ExitCode::SUCCESS;
  }
  eprint!("SICO state: {:08x}\n{}", state.code(), vm.status());
  ExitCode::from(state.code() as u8)
}
