use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use unic_langid::LanguageIdentifier;

use crate::cache::DEFAULT_CACHE_FILENAME;
use crate::cli::TranslateArgs;
use crate::context_keys::ContextKeyConvention;
use crate::error::{AltError, Result};
use crate::executor::DEFAULT_MAX_RETRIES;
use crate::provider::SUPPORTED_PROVIDERS;

pub const DEFAULT_CONFIG_FILENAME: &str = "config.json";

/// Optional config file. Every field can be overridden from the command line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Translation provider: anthropic, google or openai
    pub provider: Option<String>,
    /// Provider model; the provider default when unset
    pub model: Option<String>,
    pub target_languages: Vec<String>,
    pub reference_language: Option<String>,
    pub reference_file: Option<PathBuf>,
    /// Top-level member of the reference document holding the table
    pub reference_exported_var_name: Option<String>,
    /// Defaults to the reference file's directory
    pub output_dir: Option<PathBuf>,
    pub look_for_context_data: bool,
    pub context_prefix: Option<String>,
    pub context_suffix: Option<String>,
    /// Description of the application, sent with every request
    pub app_context_message: Option<String>,
    /// Lower-case output file names
    pub normalize_output_filenames: bool,
    pub max_retries: Option<u32>,
    pub realtime_writes: bool,
}

impl Config {
    /// Parse a config file; `.toml` files as TOML, anything else as JSON.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| AltError::Config(format!("Failed to read config file {}: {}", path.display(), e)))?;

        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        if is_toml {
            Ok(toml::from_str(&content)?)
        } else {
            serde_json::from_str(&content)
                .map_err(|e| AltError::Config(format!("Failed to parse config file: {}", e)))
        }
    }

    /// The explicit config file, else `config.json` in `cwd` when present,
    /// else defaults.
    pub fn discover(explicit: Option<&Path>, cwd: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            info!("Using config file {}...", path.display());
            return Self::from_file(path);
        }

        let candidate = cwd.join(DEFAULT_CONFIG_FILENAME);
        if candidate.is_file() {
            info!("Found {} in current directory, loading...", DEFAULT_CONFIG_FILENAME);
            Self::from_file(candidate)
        } else {
            debug!("No {} in {}; using defaults", DEFAULT_CONFIG_FILENAME, cwd.display());
            Ok(Self::default())
        }
    }
}

/// Fully resolved settings for one translate run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    pub reference_file: PathBuf,
    pub reference_language: String,
    pub reference_exported_var_name: Option<String>,
    pub target_languages: Vec<String>,
    pub provider: String,
    pub model: Option<String>,
    pub output_dir: PathBuf,
    /// Explicit keys to process, in order; empty means all
    pub keys: Vec<String>,
    pub force: bool,
    pub realtime_writes: bool,
    /// Set when context lookup is enabled
    pub context: Option<ContextKeyConvention>,
    pub app_context_message: Option<String>,
    pub normalize_output_filenames: bool,
    pub max_retries: u32,
    /// Plain output; no progress bar
    pub tty: bool,
}

impl RunOptions {
    /// Merge command-line arguments over `config` and validate the result.
    pub fn resolve(args: &TranslateArgs, config: Config) -> Result<Self> {
        let reference_file = args
            .reference_file
            .clone()
            .or(config.reference_file)
            .ok_or_else(|| AltError::Config("No reference file specified".to_string()))?;
        debug!("reference_file={}", reference_file.display());

        let reference_language = non_empty(args.reference_language.clone())
            .or_else(|| non_empty(config.reference_language))
            .ok_or_else(|| AltError::Config("No reference language specified".to_string()))?;
        validate_language_tag(&reference_language)?;

        let target_languages = if args.target_languages.is_empty() {
            config.target_languages
        } else {
            args.target_languages.clone()
        };
        let target_languages = language_list(&target_languages)?;
        if target_languages.is_empty() {
            return Err(AltError::Config("No target languages specified".to_string()));
        }

        let provider = non_empty(args.provider.clone())
            .or_else(|| non_empty(config.provider))
            .map(|p| p.to_lowercase())
            .ok_or_else(|| {
                AltError::Config(format!(
                    "No provider specified. Supported providers: {}",
                    SUPPORTED_PROVIDERS.join(", ")
                ))
            })?;
        if !SUPPORTED_PROVIDERS.contains(&provider.as_str()) {
            return Err(AltError::UnknownProvider(provider));
        }

        let look_for_context_data = args.look_for_context_data || config.look_for_context_data;
        let convention = ContextKeyConvention::new(
            args.context_prefix.clone().or(config.context_prefix).unwrap_or_default(),
            args.context_suffix.clone().or(config.context_suffix).unwrap_or_default(),
        );
        let context = if look_for_context_data {
            if !convention.is_usable() {
                return Err(AltError::Config(
                    "--look-for-context-data requires at least one of --context-prefix or --context-suffix to be non-empty"
                        .to_string(),
                ));
            }
            Some(convention)
        } else {
            None
        };

        let output_dir = match args.output_dir.clone().or(config.output_dir) {
            Some(dir) => dir,
            None => reference_file
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")),
        };
        debug!("output_dir={}", output_dir.display());

        Ok(Self {
            reference_file,
            reference_language,
            reference_exported_var_name: non_empty(args.reference_exported_var_name.clone())
                .or_else(|| non_empty(config.reference_exported_var_name)),
            target_languages,
            provider,
            model: non_empty(args.model.clone()).or_else(|| non_empty(config.model)),
            output_dir,
            keys: key_list(&args.keys),
            force: args.force,
            realtime_writes: args.realtime_writes || config.realtime_writes,
            context,
            app_context_message: non_empty(args.app_context_message.clone())
                .or_else(|| non_empty(config.app_context_message)),
            normalize_output_filenames: args.normalize_output_filenames || config.normalize_output_filenames,
            max_retries: args
                .max_retries
                .or(config.max_retries)
                .unwrap_or(DEFAULT_MAX_RETRIES),
            tty: args.tty,
        })
    }

    /// `{output_dir}/{lang}.json`, lower-cased when normalization is on.
    pub fn output_path_for(&self, lang: &str) -> PathBuf {
        let file_name = format!("{}.json", lang);
        if self.normalize_output_filenames {
            self.output_dir.join(file_name.to_lowercase())
        } else {
            self.output_dir.join(file_name)
        }
    }

    pub fn cache_path(&self) -> PathBuf {
        self.output_dir.join(DEFAULT_CACHE_FILENAME)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub fn validate_language_tag(tag: &str) -> Result<()> {
    tag.parse::<LanguageIdentifier>()
        .map(|_| ())
        .map_err(|e| AltError::Config(format!("Invalid language \"{}\": {}", tag, e)))
}

/// Trim, drop empties, de-duplicate keeping the first occurrence, and
/// validate each entry as a BCP-47 language identifier.
pub fn language_list(languages: &[String]) -> Result<Vec<String>> {
    let mut result: Vec<String> = Vec::new();
    let mut invalid = Vec::new();

    for lang in languages.iter().map(|l| l.trim()).filter(|l| !l.is_empty()) {
        if result.iter().any(|l| l == lang) {
            continue;
        }
        if validate_language_tag(lang).is_err() {
            invalid.push(lang.to_string());
            continue;
        }
        result.push(lang.to_string());
    }

    if !invalid.is_empty() {
        return Err(AltError::Config(format!(
            "Found invalid language(s): {}",
            invalid.join(", ")
        )));
    }
    Ok(result)
}

fn key_list(keys: &[String]) -> Vec<String> {
    keys.iter()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn args(argv: &[&str]) -> TranslateArgs {
        let mut full = vec!["alt"];
        full.extend_from_slice(argv);
        match crate::cli::Args::parse_from(full).into_command() {
            crate::cli::Commands::Translate(args) => args,
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_config_json_camel_case() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{ "provider": "openai", "targetLanguages": ["fr", "de"], "referenceLanguage": "en",
                "lookForContextData": true, "contextPrefix": "_ctx_", "maxRetries": 5 }"#,
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.provider.as_deref(), Some("openai"));
        assert_eq!(config.target_languages, vec!["fr", "de"]);
        assert!(config.look_for_context_data);
        assert_eq!(config.max_retries, Some(5));
        assert!(!config.realtime_writes);
    }

    #[test]
    fn test_config_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alt.toml");
        std::fs::write(&path, "provider = \"google\"\ntargetLanguages = [\"es\"]\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.provider.as_deref(), Some("google"));
        assert_eq!(config.target_languages, vec!["es"]);
    }

    #[test]
    fn test_broken_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ provider: ").unwrap();
        assert!(matches!(Config::from_file(&path), Err(AltError::Config(_))));

        let toml_path = dir.path().join("config.toml");
        std::fs::write(&toml_path, "provider = ").unwrap();
        assert!(matches!(Config::from_file(&toml_path), Err(AltError::Toml(_))));
    }

    #[test]
    fn test_discover_uses_cwd_config() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(Config::discover(None, dir.path()).unwrap(), Config::default());

        std::fs::write(dir.path().join(DEFAULT_CONFIG_FILENAME), r#"{ "provider": "anthropic" }"#).unwrap();
        let config = Config::discover(None, dir.path()).unwrap();
        assert_eq!(config.provider.as_deref(), Some("anthropic"));
    }

    #[test]
    fn test_cli_overrides_config() {
        let config = Config {
            provider: Some("google".to_string()),
            target_languages: vec!["es".to_string()],
            reference_language: Some("en".to_string()),
            max_retries: Some(7),
            ..Default::default()
        };
        let options = RunOptions::resolve(
            &args(&["-r", "locales/en.json", "-p", "OpenAI", "-l", "fr,de,fr"]),
            config,
        )
        .unwrap();

        assert_eq!(options.provider, "openai");
        assert_eq!(options.target_languages, vec!["fr", "de"]);
        assert_eq!(options.max_retries, 7);
        assert_eq!(options.output_dir, PathBuf::from("locales"));
        assert_eq!(options.cache_path(), PathBuf::from("locales/.localization.cache.json"));
    }

    #[test]
    fn test_missing_required_settings() {
        let base = Config {
            provider: Some("openai".to_string()),
            reference_language: Some("en".to_string()),
            target_languages: vec!["fr".to_string()],
            ..Default::default()
        };

        assert!(RunOptions::resolve(&args(&[]), base.clone()).is_err());

        let mut no_targets = base.clone();
        no_targets.target_languages.clear();
        assert!(RunOptions::resolve(&args(&["-r", "en.json"]), no_targets).is_err());

        let mut unknown = base.clone();
        unknown.provider = Some("deepl".to_string());
        assert!(matches!(
            RunOptions::resolve(&args(&["-r", "en.json"]), unknown),
            Err(AltError::UnknownProvider(_))
        ));

        assert!(RunOptions::resolve(&args(&["-r", "en.json"]), base).is_ok());
    }

    #[test]
    fn test_context_lookup_needs_prefix_or_suffix() {
        let base = Config {
            provider: Some("openai".to_string()),
            reference_language: Some("en".to_string()),
            target_languages: vec!["fr".to_string()],
            look_for_context_data: true,
            ..Default::default()
        };
        assert!(RunOptions::resolve(&args(&["-r", "en.json"]), base.clone()).is_err());

        let options = RunOptions::resolve(
            &args(&["-r", "en.json", "--context-suffix", ".ctx"]),
            base,
        )
        .unwrap();
        assert_eq!(options.context, Some(ContextKeyConvention::new("", ".ctx")));
    }

    #[test]
    fn test_language_list_rejects_invalid_tags() {
        let langs = vec!["fr-CA".to_string(), " de ".to_string(), "not a tag!".to_string()];
        let err = language_list(&langs).unwrap_err();
        assert!(err.to_string().contains("not a tag!"));

        let ok = language_list(&["zh-Hant".to_string(), "zh-Hant".to_string()]).unwrap();
        assert_eq!(ok, vec!["zh-Hant"]);
    }

    #[test]
    fn test_output_path_normalization() {
        let config = Config {
            provider: Some("openai".to_string()),
            reference_language: Some("en".to_string()),
            target_languages: vec!["pt-BR".to_string()],
            output_dir: Some(PathBuf::from("out")),
            ..Default::default()
        };
        let mut options = RunOptions::resolve(&args(&["-r", "en.json"]), config).unwrap();
        assert_eq!(options.output_path_for("pt-BR"), PathBuf::from("out/pt-BR.json"));
        options.normalize_output_filenames = true;
        assert_eq!(options.output_path_for("pt-BR"), PathBuf::from("out/pt-br.json"));
    }
}
