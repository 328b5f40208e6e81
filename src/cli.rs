use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "alt", author, version, about = "AI Localization Tool", long_about = None)]
#[command(after_help = "Environment variables:\n  \
    ANTHROPIC_API_KEY, OPENAI_API_KEY, GOOGLE_API_KEY   API key for the selected provider\n  \
    ALT_LANGUAGE                                        Display language for CLI messages\n  \
    RUST_LOG                                            Log filter directives")]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Enable trace logging
    #[arg(short, long, global = true)]
    pub trace: bool,

    /// Also write daily-rolling log files to this directory
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub translate: TranslateArgs,
}

impl Args {
    /// The selected command; `translate` when none is given.
    pub fn into_command(self) -> Commands {
        self.command.unwrap_or(Commands::Translate(self.translate))
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Translate the reference file into every target language (default)
    Translate(TranslateArgs),

    /// List the models a provider offers
    ListModels {
        /// Provider name (anthropic, google, openai)
        #[arg(short, long)]
        provider: String,
    },
}

#[derive(ClapArgs, Debug, Clone, Default)]
pub struct TranslateArgs {
    /// Path to the reference (source language) JSON/JSONC file
    #[arg(short, long)]
    pub reference_file: Option<PathBuf>,

    /// The reference file's language; overrides 'referenceLanguage' in config
    #[arg(long)]
    pub reference_language: Option<String>,

    /// Top-level member of the reference document holding the strings
    #[arg(short = 'j', long)]
    pub reference_exported_var_name: Option<String>,

    /// AI provider (anthropic, google, openai); overrides 'provider' in config
    #[arg(short, long)]
    pub provider: Option<String>,

    /// Provider model; overrides 'model' in config
    #[arg(long)]
    pub model: Option<String>,

    /// Output directory for localized files
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Target languages (comma-separated); overrides 'targetLanguages' in config
    #[arg(short = 'l', long, value_delimiter = ',')]
    pub target_languages: Vec<String>,

    /// Keys to process (comma-separated)
    #[arg(short, long, value_delimiter = ',')]
    pub keys: Vec<String>,

    /// Force regeneration of all translations, except manually edited ones
    #[arg(short, long)]
    pub force: bool,

    /// Write updates to disk immediately, rather than on shutdown
    #[arg(short = 'w', long)]
    pub realtime_writes: bool,

    /// Description of your app, passed with each translation request
    #[arg(short = 'm', long)]
    pub app_context_message: Option<String>,

    /// Plain output without a progress bar; useful for CI
    #[arg(short = 'y', long)]
    pub tty: bool,

    /// Config file path; defaults to config.json in the current directory
    #[arg(short, long)]
    pub config_file: Option<PathBuf>,

    /// Maximum retries per key on failure
    #[arg(short = 'x', long)]
    pub max_retries: Option<u32>,

    /// Lower-case output file names
    #[arg(short, long)]
    pub normalize_output_filenames: bool,

    /// Pass context entries from the reference file to the provider
    #[arg(long)]
    pub look_for_context_data: bool,

    /// Prefix marking context keys
    #[arg(long)]
    pub context_prefix: Option<String>,

    /// Suffix marking context keys
    #[arg(long)]
    pub context_suffix: Option<String>,
}
