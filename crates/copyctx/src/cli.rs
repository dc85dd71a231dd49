//! Command-line interface.

use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use crate::app::aggregate::Aggregator;
use crate::app::classify::{Classifier, ClassifyLimits};
use crate::app::resolve::{self, ResolveOptions};
use crate::app::tree::{self, TreeOptions};
use crate::domain::model::AggregateResult;
use crate::infra::clipboard::Clipboard;
use crate::infra::config::{self, Config};
use crate::infra::walk::{self, WalkOptions};

#[derive(Parser)]
#[command(
    name = "copyctx",
    version,
    about = "Copy files and folders as fenced Markdown to the clipboard"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate the selected files into one Markdown document
    Copy(CopyArgs),
    /// Render the selection as a folder tree diagram
    Tree(TreeArgs),
    /// Emit a shell completion script on stdout
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(clap::Args)]
struct CopyArgs {
    /// Files and folders to aggregate
    #[arg(default_value = ".")]
    paths: Vec<PathBuf>,

    #[command(flatten)]
    selection: SelectionFlags,

    /// Print the aggregate to stdout instead of the clipboard
    #[arg(long)]
    stdout: bool,

    /// Write the aggregate to a file instead of the clipboard
    #[arg(short, long, value_name = "FILE", conflicts_with = "stdout")]
    output: Option<PathBuf>,

    /// Override the per-file size ceiling in bytes
    #[arg(long, value_name = "BYTES")]
    max_file_size: Option<u64>,
}

#[derive(clap::Args)]
struct TreeArgs {
    /// Files and folders to render
    #[arg(default_value = ".")]
    paths: Vec<PathBuf>,

    #[command(flatten)]
    selection: SelectionFlags,

    /// Folders only, no file leaves
    #[arg(long)]
    dirs_only: bool,

    /// Print the tree to stdout instead of the clipboard
    #[arg(long)]
    stdout: bool,

    /// Write the tree to a file instead of the clipboard
    #[arg(short, long, value_name = "FILE", conflicts_with = "stdout")]
    output: Option<PathBuf>,
}

#[derive(clap::Args)]
struct SelectionFlags {
    /// Ignore .gitignore files while walking folders
    #[arg(long)]
    no_gitignore: bool,

    /// Include hidden files and folders
    #[arg(long)]
    hidden: bool,
}

impl SelectionFlags {
    fn apply(&self, mut options: WalkOptions) -> WalkOptions {
        if self.no_gitignore {
            options.respect_gitignore = false;
        }
        if self.hidden {
            options.include_hidden = true;
        }
        options
    }
}

/// Parse arguments and dispatch to the selected command.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Copy(args) => run_copy(args),
        Commands::Tree(args) => run_tree(args),
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "copyctx", &mut io::stdout());
            Ok(())
        }
    }
}

fn run_copy(args: CopyArgs) -> Result<()> {
    let config = Config::load()?;
    let options = args.selection.apply(WalkOptions::from_config(&config));
    let selection = walk::selection_from_paths(&args.paths, &config, &options)?;

    let resolve_options = ResolveOptions {
        workspace_root: workspace_root(),
    };
    let resolution = resolve::resolve(&selection, &resolve_options);

    let mut limits = ClassifyLimits::from_config(&config);
    if let Some(bytes) = args.max_file_size {
        limits.max_file_size = bytes;
    }
    let classifier = Classifier::new(limits, &config.exclude)?;
    let mut aggregator = Aggregator::new(classifier);
    let result = aggregator.aggregate(&resolution);

    // An empty aggregate never reaches a sink; the clipboard keeps its
    // previous contents.
    if result.is_empty() {
        eprintln!("{}", result.status_line());
        return Ok(());
    }

    let sink = Sink::from_flags(args.stdout, args.output);
    sink.deliver(&result.text)?;
    match &sink {
        Sink::Clipboard => eprintln!("{}", result.status_line()),
        Sink::Stdout => {}
        Sink::File(path) => eprintln!("{}", file_status(&result, path)),
    }

    Ok(())
}

fn run_tree(args: TreeArgs) -> Result<()> {
    let config = Config::load()?;
    let options = args.selection.apply(WalkOptions::from_config(&config));
    let selection = walk::selection_from_paths(&args.paths, &config, &options)?;

    let rendered = tree::render(
        &selection,
        TreeOptions {
            dirs_only: args.dirs_only,
        },
    );

    let sink = Sink::from_flags(args.stdout, args.output);
    sink.deliver(&rendered)?;
    match &sink {
        Sink::Clipboard => eprintln!("folder tree copied to the clipboard"),
        Sink::Stdout => {}
        Sink::File(path) => eprintln!("folder tree written to {}", path.display()),
    }

    Ok(())
}

fn workspace_root() -> Option<PathBuf> {
    env::current_dir()
        .ok()
        .and_then(|cwd| config::find_repo_root(&cwd))
}

fn file_status(result: &AggregateResult, path: &Path) -> String {
    let mut line = format!("wrote {} file(s) to {}", result.file_count, path.display());
    if !result.skipped.is_empty() {
        line.push_str(&format!(", {} skipped", result.skipped.len()));
    }
    line
}

/// Destination for the rendered output. Exactly one per invocation.
enum Sink {
    Clipboard,
    Stdout,
    File(PathBuf),
}

impl Sink {
    fn from_flags(stdout: bool, output: Option<PathBuf>) -> Self {
        if stdout {
            Sink::Stdout
        } else if let Some(path) = output {
            Sink::File(path)
        } else {
            Sink::Clipboard
        }
    }

    fn deliver(&self, text: &str) -> Result<()> {
        match self {
            Sink::Clipboard => Clipboard::new()
                .set_text(text)
                .context("failed to copy to the clipboard"),
            Sink::Stdout => io::stdout()
                .write_all(text.as_bytes())
                .context("failed to write to stdout"),
            Sink::File(path) => fs::write(path, text)
                .with_context(|| format!("failed to write {}", path.display())),
        }
    }
}
