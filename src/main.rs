// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Result, anyhow, Context};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn, LevelFilter, Log, Metadata, Record, Level, SetLoggerError};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use subtrans::app_config::{self, BackendConfig, BackendKind, Config};
use subtrans::language_utils;
use subtrans::providers::create_backend;
use subtrans::{BatchTranslator, SubtitleCodec, SubtitleError, TranslationEvent};

/// CLI Wrapper for BackendKind to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliBackend {
    #[value(name = "openai")]
    OpenAI,
    Ollama,
}

impl From<CliBackend> for BackendKind {
    fn from(cli_backend: CliBackend) -> Self {
        match cli_backend {
            CliBackend::OpenAI => BackendKind::OpenAI,
            CliBackend::Ollama => BackendKind::Ollama,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate an SRT file (default command)
    Translate(TranslateArgs),

    /// Generate shell completions for subtrans
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(clap::Args, Debug)]
struct TranslateArgs {
    /// Input SRT file
    #[arg(value_name = "INPUT_PATH")]
    input_path: Option<PathBuf>,

    /// Output SRT file (defaults to <stem>.<target>.srt next to the input)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Force overwrite of an existing output file
    #[arg(short, long)]
    force_overwrite: bool,

    /// Translation backend to use
    #[arg(short, long, value_enum)]
    provider: Option<CliBackend>,

    /// Model name to use for translation
    #[arg(short, long)]
    model: Option<String>,

    /// API key for hosted backends
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Source language code (e.g., 'en', 'es', 'fr')
    #[arg(short, long)]
    source_language: Option<String>,

    /// Target language code (e.g., 'en', 'es', 'fr')
    #[arg(short, long)]
    target_language: Option<String>,

    /// Captions per backend request
    #[arg(short, long)]
    batch_size: Option<usize>,

    /// Maximum concurrent backend requests
    #[arg(short = 'j', long)]
    max_concurrency: Option<usize>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

/// subtrans - batched subtitle translation
///
/// Translates SRT files by sending their captions in batches to a translation
/// backend (OpenAI or Ollama) and writing a translated SRT file.
#[derive(Parser, Debug)]
#[command(name = "subtrans")]
#[command(version)]
#[command(about = "Batched SRT subtitle translation")]
#[command(args_conflicts_with_subcommands = true)]
#[command(long_about = "subtrans translates SRT subtitle files through a translation backend.

EXAMPLES:
    subtrans movie.srt                          # Translate using default config
    subtrans -f movie.srt                       # Force overwrite existing output
    subtrans -p ollama -m llama3.2 movie.srt    # Use a local Ollama model
    subtrans -s en -t es movie.srt              # Translate from English to Spanish
    subtrans -b 100 -j 4 movie.srt              # Smaller batches, 4 at a time
    subtrans completions bash > subtrans.bash   # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    translate: TranslateArgs,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger { level: LevelFilter::Trace }))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color code for log level
    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "1;31",
            Level::Warn => "1;33",
            Level::Info => "1;32",
            Level::Debug => "1;36",
            Level::Trace => "1;35",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let _ = writeln!(
                std::io::stderr(),
                "\x1B[{}m{} {:<5} {}\x1B[0m",
                Self::color_for_level(record.level()),
                now,
                record.level(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Info until the configuration says otherwise
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "subtrans", &mut std::io::stdout());
            Ok(())
        }
        Some(Commands::Translate(args)) => run_translate(args).await,
        None => run_translate(cli.translate).await,
    }
}

fn load_or_create_config(options: &TranslateArgs) -> Result<Config> {
    let config_path = Path::new(&options.config_path);
    let mut config = if config_path.exists() {
        Config::from_file(config_path)?
    } else {
        warn!("Config file not found at '{}', creating default config.", options.config_path);
        let config = Config::default();
        config.save(config_path)?;
        config
    };

    if let Some(provider) = &options.provider {
        let kind: BackendKind = provider.clone().into();
        if config.translation.backend.kind() != kind {
            config.translation.backend = BackendConfig::new(kind);
        }
    }
    if let Some(model) = &options.model {
        config.translation.backend.set_model(model.clone());
    }
    if let Some(api_key) = &options.api_key {
        config.translation.backend.set_api_key(api_key.clone());
    }
    if let Some(source_lang) = &options.source_language {
        config.source_language = source_lang.clone();
    }
    if let Some(target_lang) = &options.target_language {
        config.target_language = target_lang.clone();
    }
    if options.batch_size.is_some() {
        config.translation.batch_size = options.batch_size;
    }
    if options.max_concurrency.is_some() {
        config.translation.max_concurrency = options.max_concurrency;
    }
    if let Some(log_level) = options.log_level {
        config.log_level = log_level.into();
    }

    config.validate().context("Configuration validation failed")?;
    Ok(config)
}

fn default_output_path(input: &Path, target_language: &str) -> PathBuf {
    let stem = input.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "subtitles".to_string());
    input.with_file_name(format!("{}.{}.srt", stem, target_language))
}

fn progress_bar() -> ProgressBar {
    let bar = ProgressBar::new(0);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} batches ({percent}%) {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓▒░");
    bar.set_style(style);
    bar
}

async fn run_translate(options: TranslateArgs) -> Result<()> {
    if let Some(cmd_log_level) = options.log_level {
        log::set_max_level(app_config::LogLevel::from(cmd_log_level).to_level_filter());
    }

    let input_path = options.input_path.clone()
        .ok_or_else(|| anyhow!("INPUT_PATH is required when no subcommand is specified"))?;

    let config = load_or_create_config(&options)?;
    log::set_max_level(config.log_level.to_level_filter());

    if language_utils::language_codes_match(&config.source_language, &config.target_language) {
        warn!("Source and target language are both '{}'", config.target_language);
    }

    let output_path = options.output.clone()
        .unwrap_or_else(|| default_output_path(&input_path, &config.target_language));
    if output_path.exists() && !options.force_overwrite {
        warn!("Output file already exists: {:?}. Use -f to force overwrite.", output_path);
        return Ok(());
    }

    let content = std::fs::read_to_string(&input_path)
        .with_context(|| format!("Failed to read subtitle file: {}", input_path.display()))?;
    let captions = SubtitleCodec::parse(&content);
    if captions.is_empty() {
        return Err(SubtitleError::NoCaptions(input_path.display().to_string()).into());
    }

    info!(
        "Translating {} from {} to {} with {} model {}",
        input_path.display(),
        config.source_language,
        config.target_language,
        config.translation.backend.kind(),
        config.translation.backend.model()
    );
    let backend = create_backend(&config.translation.backend, &config.translation.system_prompt)?;
    let translator = BatchTranslator::new(backend, config.batch_options());

    let bar = progress_bar();
    let missing = Arc::new(AtomicUsize::new(0));
    let observer = {
        let bar = bar.clone();
        let missing = Arc::clone(&missing);
        move |event: &TranslationEvent| match event {
            TranslationEvent::Started { caption_count, batch_count } => {
                bar.set_length(*batch_count as u64);
                bar.set_message(format!("{} captions", caption_count));
            }
            TranslationEvent::BatchCompleted { completed, .. } => bar.set_position(*completed as u64),
            TranslationEvent::Finished { .. } => bar.finish_with_message("done"),
            TranslationEvent::Error { .. } => {
                missing.fetch_add(1, Ordering::SeqCst);
            }
        }
    };

    let translated = match translator.translate(&captions, &observer).await {
        Ok(translated) => translated,
        Err(e) => {
            bar.abandon_with_message("failed");
            return Err(e.into());
        }
    };

    let codec = SubtitleCodec::new(config.subtitle.line_ending);
    std::fs::write(&output_path, codec.stringify(&translated))
        .with_context(|| format!("Failed to write subtitle file: {}", output_path.display()))?;

    let missing = missing.load(Ordering::SeqCst);
    if missing > 0 {
        warn!("{} of {} captions kept their original text", missing, translated.len());
    }
    info!("Success: {:?}", output_path);

    Ok(())
}
