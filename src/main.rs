//! Component Guardian CLI - Command-line interface for convention conformance
//!
//! CDD Principle: Application Layer - CLI coordinates user interactions with domain services
//! - Translates user commands to checker operations
//! - Handles external concerns like configuration discovery, exit codes and terminal output
//! - Watch mode is the only asynchronous part of the program

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use component_guardian::{
    CheckerConfig, Confidence, ConformanceChecker, ConformanceError, EvaluationOptions, Layer,
    OutputFormat, ReportFormatter, ReportOptions, Rule, RuleKind, RuleRegistry, Severity,
    REGISTRY_VERSION,
};
use std::io;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Component Guardian - Convention conformance for component libraries
#[derive(Parser)]
#[command(name = "component-guardian")]
#[command(version)]
#[command(about = "Checks a component library against its folder, typing, styling and testing conventions")]
#[command(long_about = "Component Guardian scans atom, molecule, organism, page, hook and util directories, applies a versioned set of convention rules to every component unit, and reports violations for local use and CI pipelines.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a component library for convention violations
    Check(CheckArgs),

    /// Watch for file changes and re-run checks automatically
    Watch {
        /// Repository root to watch (defaults to current directory)
        root: Option<PathBuf>,

        /// File patterns that trigger a re-check (glob patterns)
        #[arg(short, long, action = clap::ArgAction::Append)]
        pattern: Vec<String>,

        /// Debounce delay in milliseconds
        #[arg(long, default_value = "500")]
        delay: u64,
    },

    /// Validate configuration file
    ValidateConfig {
        /// Configuration file to validate
        config_file: Option<PathBuf>,
    },

    /// Explain what a specific rule checks
    Explain {
        /// Rule ID to explain
        rule_id: String,
    },

    /// List the rules in force
    Rules {
        /// Show only rules applying to this layer
        #[arg(long)]
        layer: Option<String>,
    },
}

#[derive(Args, Clone)]
struct CheckArgs {
    /// Repository root (defaults to current directory)
    root: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "human")]
    format: OutputFormatArg,

    /// Minimum severity level to report
    #[arg(short, long, value_enum)]
    severity: Option<SeverityArg>,

    /// Maximum number of violations to report
    #[arg(long)]
    max_violations: Option<usize>,

    /// Additional exclude patterns
    #[arg(long, action = clap::ArgAction::Append)]
    exclude: Vec<String>,

    /// Disable parallel evaluation
    #[arg(long)]
    no_parallel: bool,
}

#[derive(Copy, Clone, ValueEnum, PartialEq)]
enum OutputFormatArg {
    Text,
    Human,
    Json,
    Junit,
    Sarif,
    Github,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Text => OutputFormat::Text,
            OutputFormatArg::Human => OutputFormat::Human,
            OutputFormatArg::Json => OutputFormat::Json,
            OutputFormatArg::Junit => OutputFormat::Junit,
            OutputFormatArg::Sarif => OutputFormat::Sarif,
            OutputFormatArg::Github => OutputFormat::GitHub,
        }
    }
}

#[derive(Copy, Clone, ValueEnum)]
enum SeverityArg {
    Info,
    Warning,
    Error,
}

impl From<SeverityArg> for Severity {
    fn from(arg: SeverityArg) -> Self {
        match arg {
            SeverityArg::Info => Severity::Info,
            SeverityArg::Warning => Severity::Warning,
            SeverityArg::Error => Severity::Error,
        }
    }
}

/// Exit code for configuration problems that prevent a run
const EXIT_CONFIG_ERROR: i32 = 2;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let exit_code = match run_command(cli).await {
        Ok(exit_code) => exit_code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            if is_config_error(&e) {
                EXIT_CONFIG_ERROR
            } else {
                1
            }
        }
    };
    process::exit(exit_code);
}

async fn run_command(cli: Cli) -> Result<i32> {
    let use_colors = !cli.no_color;
    match cli.command {
        Commands::Check(args) => run_check(cli.config.as_deref(), &args, use_colors),
        Commands::Watch { root, pattern, delay } => {
            run_watch(cli.config, root, pattern, delay, use_colors).await
        }
        Commands::ValidateConfig { config_file } => run_validate_config(config_file.or(cli.config)),
        Commands::Explain { rule_id } => run_explain(cli.config.as_deref(), &rule_id),
        Commands::Rules { layer } => run_list_rules(cli.config.as_deref(), layer.as_deref()),
    }
}

fn is_config_error(error: &anyhow::Error) -> bool {
    error.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<ConformanceError>(),
            Some(ConformanceError::Configuration { .. })
        )
    })
}

/// Load the explicit configuration, or discover one in the working directory or `root`
fn load_config(config_path: Option<&Path>, root: &Path) -> Result<CheckerConfig> {
    if let Some(path) = config_path {
        return CheckerConfig::load_from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()));
    }

    let discovered = CheckerConfig::discover(".").or_else(|| CheckerConfig::discover(root));
    match discovered {
        Some(path) => {
            tracing::debug!("Using configuration {}", path.display());
            CheckerConfig::load_from_file(&path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))
        }
        None => {
            tracing::debug!("No configuration file found, using defaults");
            Ok(CheckerConfig::with_defaults())
        }
    }
}

fn build_checker(
    config: CheckerConfig,
    args: &CheckArgs,
    use_colors: bool,
) -> Result<ConformanceChecker> {
    let checker = ConformanceChecker::new(config)
        .context("Invalid configuration")?
        .with_extra_excludes(args.exclude.iter().cloned())
        .context("Invalid --exclude pattern")?
        .with_evaluation_options(EvaluationOptions {
            parallel: !args.no_parallel,
        })
        .with_report_formatter(ReportFormatter::new(ReportOptions {
            use_colors,
            min_severity: args.severity.map(Severity::from),
            max_violations: args.max_violations,
            ..Default::default()
        }));
    Ok(checker)
}

fn run_check(config_path: Option<&Path>, args: &CheckArgs, use_colors: bool) -> Result<i32> {
    let root = args.root.clone().unwrap_or_else(|| PathBuf::from("."));
    let config = load_config(config_path, &root)?;
    let checker = build_checker(config, args, use_colors)?;

    let report = checker.check(&root);

    checker.write_report(&report, args.format.into(), io::stdout().lock())?;

    Ok(report.exit_code())
}

async fn run_watch(
    config_path: Option<PathBuf>,
    root: Option<PathBuf>,
    patterns: Vec<String>,
    delay_ms: u64,
    use_colors: bool,
) -> Result<i32> {
    use notify::{Event, RecursiveMode, Watcher};
    use tokio::sync::mpsc;

    let root = root.unwrap_or_else(|| PathBuf::from("."));

    println!("🔍 Starting Component Guardian watch mode...");
    println!("📂 Watching: {}", root.display());

    let watch_patterns = if patterns.is_empty() {
        vec!["**/*.ts".to_string(), "**/*.tsx".to_string()]
    } else {
        patterns
    };

    println!("🎯 Patterns: {}", watch_patterns.join(", "));
    println!("⏱️  Debounce delay: {delay_ms}ms");
    println!("Press Ctrl+C to stop watching\n");

    // notify delivers events on its own thread; forward them into the runtime
    let (tx, mut rx) = mpsc::unbounded_channel::<Event>();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) => {
            if let Err(e) = tx.send(event) {
                tracing::warn!("Error forwarding watch event: {}", e);
            }
        }
        Err(e) => tracing::warn!("Watch error: {}", e),
    })
    .context("Failed to create file watcher")?;

    watcher
        .watch(&root, RecursiveMode::Recursive)
        .with_context(|| format!("Failed to watch path '{}'", root.display()))?;

    let args = CheckArgs {
        root: Some(root.clone()),
        format: OutputFormatArg::Human,
        severity: None,
        max_violations: None,
        exclude: Vec::new(),
        no_parallel: false,
    };
    let config = load_config(config_path.as_deref(), &root)?;
    let mut checker = build_checker(config, &args, use_colors)?;

    println!("🚀 Running initial check...");
    run_watch_check(&checker, &root);

    let debounce = Duration::from_millis(delay_ms);
    while let Some(first) = rx.recv().await {
        let mut config_change = is_config_change(&first);
        let mut relevant = config_change.is_some() || should_trigger_check(&first, &watch_patterns);

        // Collapse bursts of events into one run
        let window = tokio::time::sleep(debounce);
        tokio::pin!(window);
        loop {
            tokio::select! {
                _ = &mut window => break,
                next = rx.recv() => match next {
                    Some(event) => {
                        if let Some(path) = is_config_change(&event) {
                            config_change = Some(path);
                        }
                        relevant |= should_trigger_check(&event, &watch_patterns);
                    }
                    None => break,
                },
            }
        }

        if let Some(path) = config_change {
            println!("🔄 Configuration file changed: {}", path.display());
            let reloaded = load_config(Some(&path), &root)
                .and_then(|config| build_checker(config, &args, use_colors));
            match reloaded {
                Ok(reloaded) => {
                    println!("✅ Configuration reloaded");
                    checker = reloaded;
                }
                Err(e) => eprintln!("⚠️  Keeping previous configuration: {e:#}"),
            }
            relevant = true;
        }

        if relevant {
            // Clear screen and move cursor to top
            print!("\x1B[2J\x1B[H");
            println!("📝 Changes detected, re-checking...");
            run_watch_check(&checker, &root);
        }
    }

    eprintln!("File watcher disconnected");
    Ok(0)
}

fn run_watch_check(checker: &ConformanceChecker, root: &Path) {
    let report = checker.check(root);
    match checker.format_report(&report, OutputFormat::Human) {
        Ok(formatted) => print!("{formatted}"),
        Err(e) => eprintln!("❌ Failed to format report: {e}"),
    }
    println!("⌚ Watching for changes... (Press Ctrl+C to stop)\n");
}

/// Check if an event should trigger a re-check
fn should_trigger_check(event: &notify::Event, patterns: &[String]) -> bool {
    use notify::EventKind;

    match event.kind {
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) => {}
        _ => return false,
    }

    let compiled: Vec<glob::Pattern> =
        patterns.iter().filter_map(|p| glob::Pattern::new(p).ok()).collect();

    event.paths.iter().any(|path| {
        let path_str = path.to_string_lossy();
        compiled.iter().any(|pattern| pattern.matches(&path_str))
    })
}

/// Check if an event indicates a config file change
fn is_config_change(event: &notify::Event) -> Option<PathBuf> {
    use notify::EventKind;

    match event.kind {
        EventKind::Create(_) | EventKind::Modify(_) => {}
        _ => return None,
    }

    event.paths.iter().find_map(|path| {
        let file_name = path.file_name()?.to_str()?;
        component_guardian::config::DEFAULT_CONFIG_FILES
            .contains(&file_name)
            .then(|| path.clone())
    })
}

fn run_validate_config(config_path: Option<PathBuf>) -> Result<i32> {
    let config_path = config_path
        .or_else(|| CheckerConfig::discover("."))
        .unwrap_or_else(|| PathBuf::from("component_guardian.yaml"));

    println!("Validating configuration: {}", config_path.display());

    let loaded = CheckerConfig::load_from_file(&config_path)
        .and_then(|config| RuleRegistry::from_config(&config).map(|registry| (config, registry)));

    match loaded {
        Ok((config, registry)) => {
            println!("✅ Configuration is valid");
            println!("📊 Configuration summary:");
            for (layer, root) in &config.roots_by_layer {
                println!("  {:<9} {}", layer.as_str(), root.display());
            }
            println!("  Rules: {} in force (registry v{})", registry.len(), REGISTRY_VERSION);
            println!("  Custom rules: {}", config.custom_rules.len());
            println!("  Disabled rules: {}", config.disabled_rules.len());
            println!("  Exclude patterns: {}", config.exclude_dirs.len());
            println!("  Fingerprint: {}", config.fingerprint());
            Ok(0)
        }
        Err(e) => {
            eprintln!("❌ Configuration validation failed: {e}");
            Ok(EXIT_CONFIG_ERROR)
        }
    }
}

fn load_registry(config_path: Option<&Path>) -> Result<RuleRegistry> {
    let config = load_config(config_path, Path::new("."))?;
    RuleRegistry::from_config(&config).context("Failed to build rule registry")
}

fn run_explain(config_path: Option<&Path>, rule_id: &str) -> Result<i32> {
    let registry = load_registry(config_path)?;

    if let Some(rule) = registry.get(rule_id) {
        println!("📖 Rule: {}", rule.id);
        println!("🧱 Layers: {}", rule.scope.describe());
        println!("⚠️ Severity: {}", rule.severity.as_str());
        println!("🎯 Confidence: {}", rule.confidence.as_str());
        println!("🔍 Check: {}", describe_kind(rule));
        println!();
        println!("📝 Description:");
        println!("   {}", rule.description);
        println!();
        println!("💬 Message template:");
        println!("   {}", rule.message);
        return Ok(0);
    }

    eprintln!("❌ Rule '{rule_id}' not found");
    println!();
    println!("Available rules:");
    for id in registry.ids() {
        println!("  - {id}");
    }

    Ok(1)
}

fn describe_kind(rule: &Rule) -> String {
    match &rule.kind {
        RuleKind::RequireFile(kind) => format!("requires a {} file", kind.as_str()),
        RuleKind::MaxLineCount(max) => format!("implementation at most {max} lines"),
        RuleKind::ForbidImport(pattern) => format!("no import matching '{}'", pattern.as_str()),
        RuleKind::RequireImport(pattern) => format!("an import matching '{}'", pattern.as_str()),
        RuleKind::LayerDependency(segments) => format!(
            "no imports through higher layer directories ({})",
            segments.values().map(String::as_str).collect::<Vec<_>>().join(", ")
        ),
        other => other.name().replace('_', " "),
    }
}

fn run_list_rules(config_path: Option<&Path>, layer_filter: Option<&str>) -> Result<i32> {
    let layer = match layer_filter {
        Some(name) => match Layer::parse(name) {
            Some(layer) => Some(layer),
            None => bail!(
                "Unknown layer '{}', expected one of: {}",
                name,
                Layer::ALL.iter().map(|l| l.as_str()).collect::<Vec<_>>().join(", ")
            ),
        },
        None => None,
    };

    let registry = load_registry(config_path)?;

    println!("📋 Rules (registry v{REGISTRY_VERSION})\n");

    let rules: Vec<&Rule> = match layer {
        Some(layer) => registry.for_layer(layer).collect(),
        None => registry.rules().iter().collect(),
    };

    for rule in rules {
        let marker = match rule.confidence {
            Confidence::Low => " (low confidence)",
            Confidence::High => "",
        };
        println!(
            "  🔍 {} [{}] {}{}",
            rule.id,
            rule.severity.as_str(),
            rule.description,
            marker
        );
        println!("     layers: {}", rule.scope.describe());
    }

    Ok(0)
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
