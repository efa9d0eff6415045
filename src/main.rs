use std::{
    ffi::OsStr,
    fs,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{debug, info, warn};
use vm_translator::{linker::DEFAULT_ENTRY, Bootstrap, Linker, Options, Unit};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum BootstrapMode {
    /// Only when some file defines the entry function
    Auto,
    Always,
    Never,
}

impl From<BootstrapMode> for Bootstrap {
    fn from(mode: BootstrapMode) -> Self {
        match mode {
            BootstrapMode::Auto => Bootstrap::Auto,
            BootstrapMode::Always => Bootstrap::Always,
            BootstrapMode::Never => Bootstrap::Never,
        }
    }
}

/// Translate Hack VM code into Hack assembly
#[derive(Parser, Debug)]
#[command(name = "vm-translator")]
#[command(version, about, long_about = None)]
struct Args {
    /// A .vm file, or a directory whose .vm files form one program
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output assembly file (defaults to X.asm for X.vm, or DIR/DIR.asm)
    #[arg(short, long, value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// When to emit the bootstrap code
    #[arg(long, value_enum, default_value_t = BootstrapMode::Auto)]
    bootstrap: BootstrapMode,

    /// Function called by the bootstrap code
    #[arg(long, default_value = DEFAULT_ENTRY)]
    entry: String,

    /// Don't echo VM commands as comments in the output
    #[arg(long)]
    no_comments: bool,

    /// Log level
    #[arg(long, default_value = "warn")]
    log_level: String,
}

/// Source files in translation order.
fn sources(input: &Path) -> Result<Vec<PathBuf>> {
    if !input.is_dir() {
        if input.extension() != Some(OsStr::new("vm")) {
            warn!("{} does not have a .vm extension", input.display());
        }
        return Ok(vec![input.to_path_buf()]);
    }

    let mut files = vec![];
    let entries =
        fs::read_dir(input).with_context(|| format!("Failed to read {}", input.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && path.extension() == Some(OsStr::new("vm")) {
            files.push(path);
        }
    }
    if files.is_empty() {
        bail!("no .vm files in {}", input.display());
    }
    files.sort();
    Ok(files)
}

fn unit_name(path: &Path) -> Result<&str> {
    path.file_stem()
        .and_then(OsStr::to_str)
        .with_context(|| format!("Invalid file name {}", path.display()))
}

fn default_output(input: &Path) -> Result<PathBuf> {
    if !input.is_dir() {
        return Ok(input.with_extension("asm"));
    }
    let dir = fs::canonicalize(input)
        .with_context(|| format!("Failed to resolve {}", input.display()))?;
    let name = dir
        .file_name()
        .and_then(OsStr::to_str)
        .with_context(|| format!("Cannot name output for {}", dir.display()))?
        .to_string();
    Ok(dir.join(name + ".asm"))
}

fn run(args: &Args) -> Result<PathBuf> {
    let options = Options {
        bootstrap: args.bootstrap.into(),
        entry: args.entry.clone(),
        annotate: !args.no_comments,
    };

    let mut linker = Linker::new(options);
    for path in sources(&args.input)? {
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Error while reading file: {}", path.display()))?;
        let unit = Unit::parse(unit_name(&path)?, &data)?;
        debug!(file = %path.display(), commands = unit.commands().len(), "parsed");
        linker.add_unit(&unit)?;
    }
    let translation = linker.finish();

    let outfilename = match &args.output {
        Some(path) => path.clone(),
        None => default_output(&args.input)?,
    };
    let outfile = fs::File::create(&outfilename)
        .with_context(|| format!("Failed to create {}", outfilename.display()))?;
    let mut outfile = BufWriter::new(outfile);
    for instruction in &translation {
        writeln!(outfile, "{}", instruction)
            .with_context(|| format!("Failed to write {}", outfilename.display()))?;
    }
    outfile.flush()?;

    info!("wrote {} lines to {}", translation.len(), outfilename.display());
    Ok(outfilename)
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(args.log_level.as_str())
        .with_writer(std::io::stderr)
        .init();

    run(&args)?;
    Ok(())
}
