/// Naming rule for reference entries that only carry translation hints for
/// a sibling key: with prefix `_ctx_` the context key of `title` is `_ctx_title`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextKeyConvention {
    pub prefix: String,
    pub suffix: String,
}

impl ContextKeyConvention {
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }

    /// At least one of prefix or suffix must be non-empty to be usable.
    pub fn is_usable(&self) -> bool {
        !self.prefix.is_empty() || !self.suffix.is_empty()
    }

    pub fn is_context_key(&self, key: &str) -> bool {
        if !self.is_usable() {
            return false;
        }
        key.len() > self.prefix.len() + self.suffix.len()
            && key.starts_with(&self.prefix)
            && key.ends_with(&self.suffix)
    }

    pub fn context_key_for(&self, key: &str) -> String {
        format!("{}{}{}", self.prefix, key, self.suffix)
    }
}
