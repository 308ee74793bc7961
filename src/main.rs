use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use repolens::config::{load_config, Config};
use repolens::imports::{ClassificationMode, ImportClassifier};
use repolens::indexer::{build_graph, Indexer};
use repolens::language::GrammarRegistry;
use repolens::logging::init_logging;
use repolens::model::RepoMap;
use repolens::render::{render_outline, render_tree};
use repolens::scanner::{load_repo_map, load_repo_map_json, ScanOptions};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

#[derive(Debug, Parser)]
#[command(name = "repolens")]
#[command(version)]
#[command(about = "Multi-language structural indexer: symbols, imports, dependency graph and tree views")]
struct Cli {
    /// Maximum directory depth to walk below ROOT
    #[arg(long, global = true, value_name = "N")]
    max_dir_depth: Option<usize>,

    /// Classify imports as standard/other only
    #[arg(long, global = true)]
    two_way: bool,

    /// Debug logging on stderr (RUST_LOG overrides)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Args)]
struct SourceArgs {
    /// Directory (or single file) to index
    #[arg(value_name = "ROOT", default_value = ".")]
    root: PathBuf,

    /// Read a RepoMap JSON object (path -> source) instead of walking ROOT
    #[arg(long, value_name = "FILE")]
    repo_map: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Parse every file and print the parsed repo as JSON
    Index {
        #[command(flatten)]
        source: SourceArgs,
        /// Leave syntax trees out of the output
        #[arg(long)]
        no_ast: bool,
    },
    /// Print the dependency graph (nodes + edges) as JSON
    Graph {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Print the depth-bounded structure and AST view
    Tree {
        #[command(flatten)]
        source: SourceArgs,
        /// AST/symbol depth limit (config `render.maxDepth` when omitted)
        #[arg(long, value_name = "N")]
        max_depth: Option<usize>,
        /// Repo-relative path to leave out; repeatable
        #[arg(long, value_name = "PATH")]
        exclude: Vec<String>,
    },
    /// Print the symbol outline of one file
    Outline {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Classify one import statement
    Classify {
        #[arg(value_name = "TEXT")]
        text: String,
    },
}

fn spinner(template: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::with_template(template)?.tick_strings(TICKS));
    pb.enable_steady_tick(Duration::from_millis(80));
    Ok(pb)
}

fn config_root(source: &SourceArgs) -> PathBuf {
    if source.repo_map.is_none() && source.root.is_dir() {
        source.root.clone()
    } else {
        PathBuf::from(".")
    }
}

fn apply_flags(cli: &Cli, cfg: &mut Config) {
    if cli.max_dir_depth.is_some() {
        cfg.scan.max_dir_depth = cli.max_dir_depth;
    }
    if cli.two_way {
        cfg.imports.mode = ClassificationMode::TwoWay;
    }
}

fn load_source(source: &SourceArgs, cfg: &Config) -> Result<RepoMap> {
    if let Some(path) = source.repo_map.as_ref() {
        return load_repo_map_json(path);
    }
    let scan = spinner("{spinner} scanning files...")?;
    let repo = load_repo_map(&ScanOptions::new(&source.root, &cfg.scan))?;
    scan.finish_with_message(format!("scanned {} files", repo.len()));
    Ok(repo)
}

fn index(indexer: &Indexer, repo: &RepoMap) -> Result<repolens::ParsedRepo> {
    let pb = ProgressBar::new(repo.len() as u64);
    pb.set_style(ProgressStyle::with_template("{spinner} parsing {pos}/{len} files")?.tick_strings(TICKS));
    let parsed = indexer.index_repo_with(repo, &pb);
    pb.finish_and_clear();
    Ok(parsed)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.cmd {
        Command::Index { source, no_ast } => {
            let mut cfg = load_config(&config_root(source));
            apply_flags(&cli, &mut cfg);
            if *no_ast {
                cfg.index.keep_ast = false;
            }
            let repo = load_source(source, &cfg)?;
            let registry = GrammarRegistry::new()?;
            let parsed = index(&Indexer::from_config(&registry, &cfg), &repo)?;
            println!("{}", serde_json::to_string_pretty(&parsed)?);
        }
        Command::Graph { source } => {
            let mut cfg = load_config(&config_root(source));
            apply_flags(&cli, &mut cfg);
            cfg.index.keep_ast = false;
            let repo = load_source(source, &cfg)?;
            let registry = GrammarRegistry::new()?;
            let parsed = index(&Indexer::from_config(&registry, &cfg), &repo)?;
            println!("{}", serde_json::to_string_pretty(&build_graph(&parsed))?);
        }
        Command::Tree {
            source,
            max_depth,
            exclude,
        } => {
            let mut cfg = load_config(&config_root(source));
            apply_flags(&cli, &mut cfg);
            let repo = load_source(source, &cfg)?;
            let registry = GrammarRegistry::new()?;
            let parsed = index(&Indexer::from_config(&registry, &cfg), &repo)?;

            let exclude: HashSet<String> = cfg
                .render
                .exclude_paths
                .iter()
                .chain(exclude.iter())
                .cloned()
                .collect();
            let depth = max_depth.unwrap_or(cfg.render.max_depth);
            print!("{}", render_tree(&parsed, &exclude, depth));
        }
        Command::Outline { file } => outline(&cli, file)?,
        Command::Classify { text } => {
            let mut cfg = load_config(Path::new("."));
            apply_flags(&cli, &mut cfg);
            let classifier = ImportClassifier::new(cfg.imports.mode)
                .with_extra_standard(cfg.imports.extra_standard.iter().cloned());
            println!("{}", classifier.classify(text));
        }
    }

    Ok(())
}

fn outline(cli: &Cli, file: &Path) -> Result<()> {
    let mut cfg = load_config(Path::new("."));
    apply_flags(cli, &mut cfg);
    cfg.index.keep_ast = false;
    cfg.index.skip_files_without_symbols = false;

    let source = std::fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let path = file.to_string_lossy().replace('\\', "/");

    let registry = GrammarRegistry::new()?;
    let indexer = Indexer::from_config(&registry, &cfg);
    let Some(parsed) = indexer.index_file(&path, &source) else {
        bail!("Unsupported file type: {}", file.display());
    };

    if let Some(err) = parsed.structure.symbols.error() {
        bail!("{path}: {err}");
    }
    print!("{}", render_outline(parsed.structure.symbols.as_slice(), &source));
    Ok(())
}
