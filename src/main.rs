#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[cfg(target_env = "msvc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use clap::{Parser as ClapParser, ValueEnum};
use gfmcore_lib::html::HtmlRenderer;
use gfmcore_lib::parser::Parser;
use gfmcore_lib::writer::Writer;
use gfmcore_lib::ParserConfig;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Tokens,
    Html,
    Roundtrip,
}

/// Tokenize (or render) a GitHub-Flavored-Markdown document.
#[derive(Debug, ClapParser)]
#[command(name = "gfmcore", version, about)]
struct Cli {
    /// Markdown file to parse; reads stdin when omitted.
    path: Option<PathBuf>,

    /// What to print.
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Tokens)]
    format: OutputFormat,

    /// Enable verbose (debug-level) logging.
    #[arg(short, long)]
    verbose: bool,

    /// Maximum container nesting depth.
    #[arg(long, default_value_t = 10)]
    max_container_depth: usize,

    /// Columns per tab stop.
    #[arg(long, default_value_t = 4)]
    tab_width: usize,

    /// Reproduce the source document's own line-ending style in roundtrip
    /// output instead of normalizing everything to `\n`.
    #[arg(long)]
    preserve_line_endings: bool,
}

fn read_input(path: &Option<PathBuf>) -> io::Result<String> {
    match path {
        Some(p) => fs::read_to_string(p),
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    env_logger::Builder::from_default_env().format_timestamp(None).format_target(false).init();
    if cli.verbose {
        log::set_max_level(log::LevelFilter::Debug);
    }

    let source = read_input(&cli.path)?;
    let config = ParserConfig::default()
        .with_max_container_depth(cli.max_container_depth)
        .with_tab_width(cli.tab_width)
        .with_normalize_line_endings(!cli.preserve_line_endings);
    let parser = Parser::new(config)?;
    let tokens = parser.parse(&source);

    match cli.format {
        OutputFormat::Tokens => {
            for token in &tokens {
                println!("{token}");
            }
        }
        OutputFormat::Html => print!("{}", HtmlRenderer::render(&tokens)),
        OutputFormat::Roundtrip => print!("{}", Writer::write_for(&tokens, &source, &config)),
    }
    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("gfmcore: {e}");
            ExitCode::FAILURE
        }
    }
}
