//! User-facing CLI messages.
//!
//! Messages are looked up by token and rendered through [`crate::template`].
//! Only English ships; `ALT_LANGUAGE` selecting anything else falls back to it.

use tracing::{debug, warn};

use crate::template;

pub const DEFAULT_DISPLAY_LANGUAGE: &str = "en";
pub const DISPLAY_LANGUAGE_ENV: &str = "ALT_LANGUAGE";

const EN: &[(&str, &str)] = &[
    ("msg-nothing-to-do", "Nothing to do"),
    ("msg-done", "Done"),
    ("msg-finished-with-errors", "Finished with %%errorsEncountered%% error%%s%%"),
    ("msg-translating-key", "Translating %%key%%"),
    ("msg-hitting-provider-endpoint", "Hitting %%providerName%% endpoint%%attemptStr%%..."),
    ("msg-rate-limited-sleeping", "Rate limited; sleeping for %%interval%%s...%%attemptStr%%"),
    ("msg-show-translation-result", "Translated %%key%%: \"%%newValue%%\""),
    ("msg-processing-lang-and-key", "[%%progress%%%] Processing %%targetLang%% – %%key%%..."),
    ("msg-translation-reason-forced", "Forced update"),
    ("msg-translation-reason-outputFileDidNotExist", "Output file did not exist"),
    ("msg-translation-reason-userMissingReferenceValueHash", "No reference hash found"),
    ("msg-translation-reason-userModifiedReferenceValue", "User modified reference string"),
    ("msg-translation-reason-missingOutputKey", "No existing translation found"),
    ("msg-translation-reason-missingOutputValueHash", "No hash found in cache file"),
    ("msg-errors-encountered", "ALT encountered some errors:\n%%errors%%"),
    (
        "error-value-not-a-string",
        "Value for reference key \"%%key%%\" was \"%%type%%\". Expected a string! Skipping...",
    ),
    ("error-value-not-in-reference-data", "Key \"%%key%%\" did not exist in reference file"),
    (
        "error-translation-failed",
        "Translation was empty; target language=%%targetLang%%; key=%%key%%; text=%%refValue%%",
    ),
];

#[derive(Debug, Clone)]
pub struct Messages {
    lang: String,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            lang: DEFAULT_DISPLAY_LANGUAGE.to_string(),
        }
    }
}

impl Messages {
    pub fn new(requested: Option<&str>) -> Self {
        match requested {
            Some(lang) if !lang.is_empty() && lang != DEFAULT_DISPLAY_LANGUAGE => {
                warn!(
                    "No localization data found for language \"{}\"; falling back to \"{}\"...",
                    lang, DEFAULT_DISPLAY_LANGUAGE
                );
                Self::default()
            }
            _ => Self::default(),
        }
    }

    /// Display language from the `ALT_LANGUAGE` environment variable.
    pub fn from_env() -> Self {
        Self::new(std::env::var(DISPLAY_LANGUAGE_ENV).ok().as_deref())
    }

    pub fn lang(&self) -> &str {
        &self.lang
    }

    pub fn localize(&self, token: &str) -> &'static str {
        match EN.iter().find(|(t, _)| *t == token) {
            Some((_, text)) => *text,
            None => {
                warn!("Failed to find localization string for language=\"{}\", token=\"{}\"", self.lang, token);
                ""
            }
        }
    }

    pub fn format(&self, token: &str, vars: &[(&str, String)]) -> String {
        let rendered = template::render(self.localize(token), vars);
        for warning in &rendered.warnings {
            warn!("[localize] warning for \"{}\": {}", token, warning);
        }
        debug!("[localize] {} -> {}", token, rendered.text);
        rendered.text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_language_falls_back_to_english() {
        assert_eq!(Messages::new(Some("fr-FR")).lang(), "en");
        assert_eq!(Messages::new(None).lang(), "en");
    }

    #[test]
    fn test_format_finished_with_errors() {
        let messages = Messages::default();
        let text = messages.format(
            "msg-finished-with-errors",
            &[("errorsEncountered", "2".to_string()), ("s", "s".to_string())],
        );
        assert_eq!(text, "Finished with 2 errors");
    }

    #[test]
    fn test_unknown_token_is_empty() {
        assert_eq!(Messages::default().localize("no-such-token"), "");
    }

    #[test]
    fn test_every_reason_has_a_message() {
        let messages = Messages::default();
        for reason in crate::queue::UpdateReasons::NAMES {
            let token = format!("msg-translation-reason-{}", reason);
            assert!(!messages.localize(&token).is_empty(), "{}", token);
        }
    }
}
