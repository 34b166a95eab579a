use std::fmt;

/// Identifier of a translation set (`"en"`, `"fr"`, `"es"`, ...).
///
/// Opaque: only surrounding whitespace is trimmed, the code is otherwise
/// used verbatim as a lookup key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LanguageCode(String);

impl LanguageCode {
    pub fn new(code: impl Into<String>) -> Self {
        let code = code.into();
        let trimmed = code.trim();
        if trimmed.len() == code.len() {
            Self(code)
        } else {
            Self(trimmed.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Safe to splice into a file name: non-empty, no separators, no `..`.
    pub(crate) fn is_path_safe(&self) -> bool {
        !self.0.is_empty()
            && !self.0.contains("..")
            && !self.0.chars().any(|c| c == '/' || c == '\\' || c == '\0')
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LanguageCode {
    fn from(v: &str) -> Self {
        Self::new(v)
    }
}

impl From<String> for LanguageCode {
    fn from(v: String) -> Self {
        Self::new(v)
    }
}

impl From<&String> for LanguageCode {
    fn from(v: &String) -> Self {
        Self::new(v.as_str())
    }
}

impl AsRef<str> for LanguageCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
