//! Command-line interface for the segmenter.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::{validate_identifier, CorpusConfig};
use crate::corpus::Corpus;
use crate::error::{Result, SegmenterError};
use crate::schema::SchemaRegistry;
use crate::types::WorkInput;
use crate::yaml::save_yaml;

/// Textus Segmenter - Split citation-tagged ancient texts into divisions, lines and sentences.
#[derive(Parser)]
#[command(name = "textus-segmenter")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Segment a converted text file and export it as YAML.
    Segment {
        /// Tag-annotated text produced by the converter
        file: PathBuf,

        /// Author identifier (e.g., 0059)
        #[arg(short, long)]
        author: String,

        /// Work identifier (e.g., 030)
        #[arg(short, long)]
        work: String,

        /// Corpus configuration file (authors, works, schemas)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output directory (default: corpus/)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the structure schema a work resolves to.
    Schema {
        /// Author identifier (e.g., 0059)
        #[arg(short, long)]
        author: String,

        /// Work identifier (e.g., 030)
        #[arg(short, long)]
        work: String,

        /// Corpus configuration file (authors, works, schemas)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

/// Run the CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Segment {
            file,
            author,
            work,
            config,
            output,
        } => segment_command(&file, &author, &work, config.as_deref(), output.as_deref()),
        Commands::Schema {
            author,
            work,
            config,
        } => schema_command(&author, &work, config.as_deref()),
    }
}

fn load_config(path: Option<&Path>) -> Result<CorpusConfig> {
    match path {
        Some(path) => CorpusConfig::load(path),
        None => Ok(CorpusConfig::default()),
    }
}

/// Execute the segment command.
fn segment_command(
    file: &Path,
    author: &str,
    work: &str,
    config: Option<&Path>,
    output: Option<&Path>,
) -> Result<()> {
    // Validate inputs before reading anything
    validate_identifier(author)?;
    validate_identifier(work)?;

    if let Some(output_dir) = output {
        if output_dir.exists() && !output_dir.is_dir() {
            return Err(SegmenterError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("Output path is not a directory: {}", output_dir.display()),
            )));
        }
    }

    let corpus = Corpus::from_config(&load_config(config)?)?;
    let text = std::fs::read_to_string(file)?;

    println!(
        "{} {} {}",
        style("Segmenting").bold(),
        style(format!("{author}/{work}")).cyan(),
        style(file.display()).dim()
    );
    println!();

    let pb = ProgressBar::new_spinner();
    #[allow(clippy::expect_used)] // Static template string that is guaranteed to be valid
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .expect("valid template"),
    );
    pb.set_message("Segmenting and aligning...");
    pb.enable_steady_tick(std::time::Duration::from_millis(100));

    let segmented = match corpus.segment_work(&WorkInput::new(author, work, text)) {
        Ok(segmented) => segmented,
        Err(e) => {
            pb.finish_and_clear();
            return Err(e);
        }
    };

    pb.set_message("Saving YAML...");
    let output_path = match save_yaml(&segmented, output) {
        Ok(path) => path,
        Err(e) => {
            pb.finish_and_clear();
            return Err(e);
        }
    };
    pb.finish_and_clear();

    let tree = &segmented.tree;
    println!("  Author: {}", style(&tree.author_name).green());
    println!("  Work: {}", style(&tree.work_name).green());
    println!("  Schema: {}", tree.schema.join(", "));
    println!("  Divisions: {}", tree.divisions.len());
    println!("  Lines: {}", segmented.line_count());
    println!("  Sentences: {}", segmented.sentence_count());

    println!();
    println!(
        "{} {}",
        style("Saved to:").green().bold(),
        output_path.display()
    );

    Ok(())
}

/// Execute the schema command.
fn schema_command(author: &str, work: &str, config: Option<&Path>) -> Result<()> {
    validate_identifier(author)?;
    validate_identifier(work)?;

    let registry = SchemaRegistry::from_config(&load_config(config)?)?;
    let resolved = registry.resolve(author, work);
    let schema = resolved.schema();

    let source = if resolved.is_fallback() {
        style("fallback").yellow()
    } else {
        style("registered").green()
    };
    println!(
        "{} {} ({source})",
        style("Schema").bold(),
        style(format!("{author}/{work}")).cyan()
    );
    println!("  Levels: {}", schema.levels().join(", "));
    println!(
        "  Ordered by: {}",
        schema.principal_level().unwrap_or("source order")
    );

    Ok(())
}
