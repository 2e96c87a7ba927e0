use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use cpusim::{Compilation, Cpu, Error, DEMO_PROGRAM};

/// Compile a loop-language program and run it on the virtual CPU
#[derive(Parser, Debug)]
#[command(name = "cpusim")]
#[command(about = "Compile and run programs on a minimal virtual CPU", long_about = None)]
struct Args {
  /// Source file to run (runs the built-in demo program if not provided)
  path: Option<PathBuf>,

  /// Treat the input as assembly rather than source code
  #[arg(long)]
  assembly: bool,

  /// Write the lexeme, assembly, bytecode and CPU listings to files
  #[arg(long)]
  debug: bool,

  /// Directory for the `--debug` listings
  #[arg(long, default_value = ".")]
  debug_dir: PathBuf,

  /// Stop with an error after this many instructions
  #[arg(long)]
  max_cycles: Option<u64>,

  /// Don't print the final machine state
  #[arg(long)]
  quiet: bool,
}

/// Writes one debug listing to `directory/name`, flushing before returning.
fn write_listing<F>(directory: &Path, name: &str, write: F) -> Result<(), Error>
  where F: FnOnce(&mut BufWriter<File>) -> std::io::Result<()>
{
  let mut sink = BufWriter::new(File::create(directory.join(name))?);
  write(&mut sink)?;
  sink.flush()?;
  Ok(())
}

fn run(args: &Args) -> Result<(), Error> {
  let source = match &args.path {
    Some(path) => std::fs::read_to_string(path)?,
    None       => DEMO_PROGRAM.to_string(),
  };

  let compilation = match args.assembly {
    true  => Compilation::from_assembly_text(&source)?,
    false => Compilation::compile(&source)?,
  };

  if args.debug {
    let directory = args.debug_dir.as_path();
    write_listing(directory, "lex_output.txt", |sink| compilation.write_lexemes(sink))?;
    write_listing(directory, "assembler_output.txt", |sink| compilation.write_assembly(sink))?;
    write_listing(directory, "compiler_output.txt", |sink| compilation.write_bytecode(sink))?;
  }

  let mut cpu = Cpu::load(&compilation);
  let outcome = match args.max_cycles {
    Some(limit) => cpu.run_with_limit(limit),
    None        => cpu.run(),
  };

  // Written even when execution fails.
  if args.debug {
    write_listing(args.debug_dir.as_path(), "cpu_output.txt", |sink| cpu.write_dump(sink))?;
  }
  outcome?;

  if !args.quiet {
    println!("{}", cpu);
  }
  Ok(())
}

fn main() -> ExitCode {
  let args = Args::parse();

  // RUST_LOG controls the log level, defaulting to warn.
  let filter = EnvFilter::try_from_default_env()
    .or_else(|_| EnvFilter::try_new("warn"))
    .unwrap_or_default();

  fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .with_target(false)
    .init();

  match run(&args) {
    Ok(()) => ExitCode::SUCCESS,
    Err(error) => {
      eprintln!("error: {}", error);
      ExitCode::FAILURE
    }
  }
}
