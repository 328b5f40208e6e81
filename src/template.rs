// `%%name%%` placeholder substitution. Rendering never fails; missing and
// unused variables come back as warnings.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::warn;

static PLACEHOLDER: LazyLock<Option<Regex>> = LazyLock::new(|| match Regex::new(r"%%([^%]+)%%") {
    Ok(re) => Some(re),
    Err(e) => {
        warn!("Placeholder pattern failed to compile: {}", e);
        None
    }
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateWarning {
    /// The format references a variable the caller did not supply.
    MissingVariable(String),
    /// The caller supplied a variable the format never references.
    UnusedVariable(String),
}

impl fmt::Display for TemplateWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingVariable(name) => {
                write!(f, "'format' string missing data for var \"{}\"", name)
            }
            Self::UnusedVariable(name) => {
                write!(f, "unknown var \"{}\" specified in data obj", name)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub text: String,
    pub warnings: Vec<TemplateWarning>,
}

/// Substitute every `%%name%%` in `format` with the matching value from `vars`.
pub fn render(format: &str, vars: &[(&str, String)]) -> Rendered {
    let mut unused: BTreeSet<&str> = vars.iter().map(|(name, _)| *name).collect();
    let mut warnings = Vec::new();

    let Some(placeholder) = PLACEHOLDER.as_ref() else {
        return Rendered {
            text: format.to_string(),
            warnings: unused
                .into_iter()
                .map(|name| TemplateWarning::UnusedVariable(name.to_string()))
                .collect(),
        };
    };

    let text = placeholder
        .replace_all(format, |caps: &Captures<'_>| {
            let name = &caps[1];
            match vars.iter().find(|(n, _)| *n == name) {
                Some((n, value)) => {
                    unused.remove(n);
                    value.clone()
                }
                None => {
                    warnings.push(TemplateWarning::MissingVariable(name.to_string()));
                    caps[0].to_string()
                }
            }
        })
        .into_owned();

    warnings.extend(
        unused
            .into_iter()
            .map(|name| TemplateWarning::UnusedVariable(name.to_string())),
    );

    Rendered { text, warnings }
}
