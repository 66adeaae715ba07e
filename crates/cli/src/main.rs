use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use foldnav_core::{
    format_file, format_output, persist, render_code, render_file, render_file_ansi, resolve,
    CppParser, FileKind, OutlineScanner, OutputFormat, ParseConfig, Renderer, ScanConfig, Session,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mta_rust_foldnav")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Fold-aware outline parser and symbol navigator for block-structured C++")]
#[command(long_about = "Parses C/C++ sources line by line into a tree of foldable sections \
    and a symbol table. Files laid out as a preamble comment followed by marked blocks \
    are recognized structurally; anything else is outlined flat.\n\n\
    Without a subcommand, scans a directory and reports an outline of every file.")]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Project root directory to scan
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormatArg::Summary)]
    pub format: OutputFormatArg,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Only scan sources or headers
    #[arg(long, value_enum)]
    pub kind: Option<KindFilter>,

    /// Additional ignore patterns (glob style)
    #[arg(long, action = clap::ArgAction::Append)]
    pub ignore: Vec<String>,

    /// Ignore file path (defaults to .gitignore)
    #[arg(long)]
    pub ignore_file: Option<PathBuf>,

    /// Parse configuration (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Disable colors in rendered output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Verbose logging and progress
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Parallel threads (0 = auto)
    #[arg(long, default_value_t = 0)]
    pub threads: usize,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Render a file the way an editor view shows it
    Render {
        file: PathBuf,

        /// Unfold every section first
        #[arg(long)]
        expand_all: bool,

        /// Output with ANSI colors
        #[arg(long)]
        ansi: bool,
    },

    /// List the symbols declared in a file
    Symbols {
        file: PathBuf,

        #[arg(short, long, value_enum, default_value_t = OutputFormatArg::Summary)]
        format: OutputFormatArg,
    },

    /// Resolve the identifier at LINE:COLUMN (both 1-based) to its declaration
    Resolve {
        file: PathBuf,
        line: usize,
        column: usize,
    },

    /// Jump to a symbol and render the resulting view
    Goto {
        file: PathBuf,

        /// A type, function or global name, or `Type::member`
        symbol: String,
    },

    /// Parse a file and write a binary snapshot
    Save { file: PathBuf, out: PathBuf },

    /// Load a snapshot and render it
    Load {
        snapshot: PathBuf,

        #[arg(long)]
        expand_all: bool,
    },
}

#[derive(ValueEnum, Clone, Debug)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Summary,
    Ansi,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => OutputFormat::Json,
            OutputFormatArg::Yaml => OutputFormat::Yaml,
            OutputFormatArg::Summary => OutputFormat::Summary,
            OutputFormatArg::Ansi => OutputFormat::Ansi,
        }
    }
}

#[derive(ValueEnum, Clone, Debug)]
pub enum KindFilter {
    Source,
    Header,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let parse_config = match &args.config {
        Some(path) => ParseConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ParseConfig::default(),
    };
    debug!(
        num_blocks = parse_config.num_blocks,
        block_marker = %parse_config.block_marker,
        "parse configuration"
    );

    match &args.command {
        Some(Commands::Render {
            file,
            expand_all,
            ansi,
        }) => run_render(file, *expand_all, *ansi, parse_config, &args),
        Some(Commands::Symbols { file, format }) => {
            run_symbols(file, format.clone(), parse_config)
        }
        Some(Commands::Resolve { file, line, column }) => {
            run_resolve(file, *line, *column, parse_config)
        }
        Some(Commands::Goto { file, symbol }) => run_goto(file, symbol, parse_config, &args),
        Some(Commands::Save { file, out }) => run_save(file, out, parse_config),
        Some(Commands::Load {
            snapshot,
            expand_all,
        }) => run_load(snapshot, *expand_all, &args),
        None => run_scan(&args, parse_config),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn use_color(args: &Args, forced: bool) -> bool {
    forced || (atty::is(atty::Stream::Stdout) && !args.no_color)
}

fn run_scan(args: &Args, parse_config: ParseConfig) -> anyhow::Result<()> {
    let mut config = ScanConfig::new(args.path.clone())
        .with_ignore_patterns(args.ignore.clone())
        .with_threads(args.threads)
        .with_parse_config(parse_config);

    if let Some(kind) = &args.kind {
        config = config.with_kind_filter(vec![match kind {
            KindFilter::Source => FileKind::Source,
            KindFilter::Header => FileKind::Header,
        }]);
    }
    if let Some(ref ignore_file) = args.ignore_file {
        config = config.with_ignore_file(ignore_file.clone());
    }

    let spinner = if args.verbose {
        let pb = ProgressBar::new_spinner();
        pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message("Scanning project...");
        Some(pb)
    } else {
        None
    };

    let scanner = OutlineScanner::new(config)?;
    let result = scanner.scan()?;

    if let Some(ref pb) = spinner {
        pb.finish_with_message(format!(
            "Scanned {} files in {}ms",
            result.stats.total_files, result.metadata.scan_duration_ms
        ));
    }

    let output = format_output(&result, args.format.clone().into())?;

    if let Some(ref path) = args.output {
        fs::write(path, &output)?;
        if args.verbose {
            eprintln!("Output written to: {}", path.display());
        }
    } else {
        println!("{}", output);
    }

    Ok(())
}

fn run_render(
    file: &Path,
    expand_all: bool,
    ansi: bool,
    parse_config: ParseConfig,
    args: &Args,
) -> anyhow::Result<()> {
    let rendered = if use_color(args, ansi) {
        render_file_ansi(file, &parse_config, expand_all)?
    } else {
        render_file(file, &parse_config, expand_all)?
    };
    print!("{}", rendered.content);

    if args.verbose {
        eprintln!(
            "\n--- {} lines shown, {} hidden ---",
            rendered.visible_lines, rendered.lines_hidden
        );
    }
    Ok(())
}

fn run_symbols(file: &Path, format: OutputFormatArg, parse_config: ParseConfig) -> anyhow::Result<()> {
    let scanner = OutlineScanner::new(ScanConfig::default().with_parse_config(parse_config))?;
    let outline = scanner.scan_file(file)?;
    if let Some(error) = &outline.error {
        bail!("{}: {}", file.display(), error);
    }
    print!("{}", format_file(&outline, format.into())?);
    Ok(())
}

fn run_resolve(
    file: &Path,
    line: usize,
    column: usize,
    parse_config: ParseConfig,
) -> anyhow::Result<()> {
    if line == 0 || column == 0 {
        bail!("LINE and COLUMN are 1-based");
    }
    let code = CppParser::new(parse_config)?.parse_file(file)?;
    let Some(caret) = code.tree().leaf_at(line - 1) else {
        bail!("{} has only {} lines", file.display(), code.line_count());
    };

    match resolve(&code, caret, column - 1) {
        Some(found) => {
            let text = found
                .element
                .and_then(|e| code.element_line(e))
                .unwrap_or_default();
            println!("{}:{}: {}", file.display(), found.file_offset + 1, text.trim());
            Ok(())
        }
        None => bail!("no declaration found at {}:{}:{}", file.display(), line, column),
    }
}

fn run_goto(file: &Path, symbol: &str, parse_config: ParseConfig, args: &Args) -> anyhow::Result<()> {
    let mut session = Session::open(file, parse_config)?;
    let offset = session.goto_symbol(symbol)?;
    let rendered = render_code(session.code(), file, use_color(args, false))?;
    print!("{}", rendered.content);
    eprintln!("--> {}:{}", file.display(), offset + 1);
    Ok(())
}

fn run_save(file: &Path, out: &Path, parse_config: ParseConfig) -> anyhow::Result<()> {
    let code = CppParser::new(parse_config)?.parse_file(file)?;
    for diagnostic in code.diagnostics() {
        eprintln!("warning: {}", diagnostic);
    }
    persist::save(&code, out).with_context(|| format!("writing {}", out.display()))?;
    eprintln!(
        "Saved {} lines, {} symbols to {}",
        code.line_count(),
        code.symbols().entries().len(),
        out.display()
    );
    Ok(())
}

fn run_load(snapshot: &Path, expand_all: bool, args: &Args) -> anyhow::Result<()> {
    let mut code = persist::load(snapshot)
        .with_context(|| format!("reading snapshot {}", snapshot.display()))?;
    if expand_all {
        code.tree_mut().expand_all();
    }
    let renderer = Renderer::new();
    let content = if use_color(args, false) {
        renderer.render_ansi(code.tree())?
    } else {
        renderer.render(code.tree())?
    };
    print!("{}", content);
    Ok(())
}
