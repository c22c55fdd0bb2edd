use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use wasmc::ast::Program;
use wasmc::{compile, CompileOptions};

/// wasmc — compiles a statically-typed scripting language subset to WebAssembly modules.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Input program, as the JSON-serialized typed syntax tree the front end produced
    input: PathBuf,

    /// Output wasm binary
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Pointer / uintptr word size in bytes
    #[arg(long, default_value = "4", value_parser = ["4", "8"])]
    word_size: String,

    /// Initial linear memory size, in 64KiB pages
    #[arg(long, default_value = "256")]
    memory_initial_pages: u64,

    /// Exported memory name
    #[arg(long, default_value = "memory")]
    memory_export_name: String,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    eprintln!("wasmc: compiling {}", cli.input.display());

    let json = fs::read_to_string(&cli.input).with_context(|| format!("failed to read {}", cli.input.display()))?;
    let program: Program =
        serde_json::from_str(&json).with_context(|| format!("failed to parse {} as a program", cli.input.display()))?;

    let options = CompileOptions {
        word_size: cli.word_size.parse().expect("clap restricts this to 4 or 8"),
        memory_initial_pages: cli.memory_initial_pages,
        memory_maximum_pages: None,
        memory_export_name: cli.memory_export_name,
    };

    let output = compile(&program, &options).context("compilation failed")?;

    for diag in output.diagnostics.iter() {
        eprintln!("wasmc: {diag}");
    }

    if output.diagnostics.has_errors() {
        eprintln!("wasmc: compilation failed with errors, no module written");
        return Ok(ExitCode::FAILURE);
    }

    if let Some(path) = cli.output {
        fs::write(&path, &output.wasm).with_context(|| format!("failed to write {}", path.display()))?;
        eprintln!("wasmc: wrote {}", path.display());
    } else {
        use std::io::Write;
        std::io::stdout().write_all(&output.wasm).context("failed to write wasm to stdout")?;
    }

    eprintln!(
        "wasmc: compilation complete ({} diagnostic{})",
        output.diagnostics.len(),
        if output.diagnostics.len() == 1 { "" } else { "s" }
    );
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_defaults() {
        let cli = Cli::parse_from(["wasmc", "program.json"]);
        assert_eq!(cli.word_size, "4");
        assert_eq!(cli.memory_initial_pages, 256);
        assert_eq!(cli.memory_export_name, "memory");
    }

    #[test]
    fn cli_rejects_unsupported_word_size() {
        let result = Cli::try_parse_from(["wasmc", "program.json", "--word-size", "16"]);
        assert!(result.is_err());
    }
}
