use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use ecnav::app::effective::effective_options;
use ecnav::app::highlight::{info_spans, render_tagged};
use ecnav::app::navigate::{ResolveOptions, goto_super};
use ecnav::app::report::{GotoReport, OptionsReport, OutputFormat};
use ecnav::domain::model::Document;
use ecnav::infra::config::Config;
use ecnav::infra::highlight::Highlighter;
use ecnav::infra::source::{document_path, load_document};

#[derive(Parser)]
#[command(author, version, about = "Navigate .editorconfig sections and overridden options", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find the headers or options the declaration under the cursor overrides
    Super {
        /// Document to inspect, or a directory containing one
        file: PathBuf,
        #[command(flatten)]
        position: Position,
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },
    /// Print the classified spans of a document
    Highlight {
        file: PathBuf,
        /// Emit the document with ANSI colors instead of a span listing
        #[arg(long)]
        color: bool,
        #[arg(long)]
        theme: Option<String>,
    },
    /// Show the options that apply to a file path
    Options {
        file: PathBuf,
        /// Path relative to the document's directory
        path: String,
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct Position {
    /// Zero-based byte offset of the cursor
    #[arg(long)]
    offset: Option<usize>,
    /// 1-based cursor position as LINE:COLUMN
    #[arg(long, value_name = "LINE:COLUMN")]
    at: Option<String>,
}

impl Position {
    fn resolve(&self, doc: &Document) -> Result<usize> {
        if let Some(offset) = self.offset {
            return Ok(doc.check_offset(offset)?);
        }
        let Some(at) = &self.at else {
            bail!("either --offset or --at is required");
        };
        let (line, column) = at
            .split_once(':')
            .with_context(|| format!("expected LINE:COLUMN, got `{at}`"))?;
        let line = line
            .trim()
            .parse()
            .with_context(|| format!("invalid line in `{at}`"))?;
        let column = column
            .trim()
            .parse()
            .with_context(|| format!("invalid column in `{at}`"))?;
        Ok(doc.offset_at(line, column)?)
    }
}

fn main() -> Result<()> {
    ecnav::init();

    match Cli::parse().command {
        Commands::Super {
            file,
            position,
            format,
        } => {
            let config = Config::load()?;
            let doc = load_document(&document_path(&file, config.defaults.file_name()))?;
            let offset = position.resolve(&doc)?;
            let result = goto_super(&doc, offset, &ResolveOptions::from_config(&config));
            let format = format.unwrap_or_else(|| OutputFormat::from_config(&config));
            print!("{}", GotoReport::new(&doc, &result).render(format)?);
        }
        Commands::Highlight { file, color, theme } => {
            let config = Config::load()?;
            let doc = load_document(&document_path(&file, config.defaults.file_name()))?;
            let spans = info_spans(&doc);
            if color || config.defaults.color() {
                let theme = theme.as_deref().unwrap_or(config.defaults.theme());
                print!("{}", Highlighter::new(theme).render_ansi(&doc, &spans));
            } else {
                print!("{}", render_tagged(&doc, &spans));
            }
        }
        Commands::Options { file, path, format } => {
            let config = Config::load()?;
            let doc = load_document(&document_path(&file, config.defaults.file_name()))?;
            let limits = ResolveOptions::from_config(&config).limits;
            let effective = effective_options(&doc, &path, &limits);
            let format = format.unwrap_or_else(|| OutputFormat::from_config(&config));
            print!("{}", OptionsReport::new(&doc, &path, &effective).render(format)?);
        }
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "ecnav", &mut io::stdout());
        }
    }
    Ok(())
}
