//! Command-line interface.
//!
//! `ferrocc <input>` compiles one preprocessed C source file to x86-64
//! assembly on standard output (or to `-o <file>`). `-` reads the source
//! from standard input. On any lexical, syntactic, or semantic failure the
//! rendered diagnostic goes to standard error and the exit code is 1.

use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use clap::Parser;

#[derive(Parser)]
#[command(name = "ferrocc")]
#[command(about = "A small C compiler targeting x86-64", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Input file; "-" reads standard input
    pub input: String,

    /// Output file (defaults to standard output)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Entry point for the CLI.
pub fn run_cli() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let source = if cli.input == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        fs::read_to_string(&cli.input)?
    };

    match ferrocc_compile::compile(&source) {
        Ok(asm) => {
            match &cli.output {
                Some(path) => fs::write(path, asm)?,
                None => io::stdout().write_all(asm.as_bytes())?,
            }
            Ok(())
        }
        Err(err) => {
            eprintln!("{}", ferrocc_compile::render(&cli.input, &source, &err));
            std::process::exit(1);
        }
    }
}
