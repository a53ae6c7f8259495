//! Column schema inference from the first header-like line of a stream.

use crate::config::ScopeConfig;

/// Ordered column names, fixed for the lifetime of a connection.
///
/// Names are kept verbatim after trimming; duplicates and empty names are
/// allowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<String>,
}

impl Schema {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    /// Split a header line on `separator` and trim every name.
    pub fn from_header(line: &str, separator: char) -> Self {
        Self::new(line.split(separator).map(str::trim))
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Index of the first column called `name`.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.columns.get(index).map(String::as_str)
    }
}

/// Decides, once per connection, which line is the header.
#[derive(Debug, Clone)]
pub struct SchemaDetector {
    separator: char,
    // Lowercased for case-insensitive matching.
    denylist: Vec<String>,
    schema: Option<Schema>,
}

impl SchemaDetector {
    pub fn new<S: AsRef<str>>(separator: char, denylist: &[S]) -> Self {
        Self {
            separator,
            denylist: denylist
                .iter()
                .map(|w| w.as_ref().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect(),
            schema: None,
        }
    }

    pub fn from_config(cfg: &ScopeConfig) -> Self {
        Self::new(cfg.separator, &cfg.denylist)
    }

    /// True for boot/status chatter that must never be treated as header or data.
    pub fn is_noise(&self, line: &str) -> bool {
        if self.denylist.is_empty() {
            return false;
        }
        let lower = line.to_lowercase();
        self.denylist.iter().any(|w| lower.contains(w.as_str()))
    }

    /// A header has at least one letter and at least one separator.
    pub fn looks_like_header(&self, line: &str) -> bool {
        line.contains(self.separator) && line.chars().any(char::is_alphabetic)
    }

    /// Adopt `line` as the schema if none exists yet and it looks like a header.
    ///
    /// Returns the new schema only on the call that establishes it; once a
    /// schema is set every later call returns `None`.
    pub fn try_establish(&mut self, line: &str) -> Option<Schema> {
        if self.schema.is_some() || line.is_empty() || self.is_noise(line) {
            return None;
        }
        if !self.looks_like_header(line) {
            return None;
        }
        let schema = Schema::from_header(line, self.separator);
        self.schema = Some(schema.clone());
        Some(schema)
    }

    pub fn schema(&self) -> Option<&Schema> {
        self.schema.as_ref()
    }

    pub fn separator(&self) -> char {
        self.separator
    }

    /// Forget the schema so the next connection detects afresh.
    pub fn reset(&mut self) {
        self.schema = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> SchemaDetector {
        SchemaDetector::from_config(&ScopeConfig::default())
    }

    #[test]
    fn header_needs_letter_and_separator() {
        let d = detector();
        assert!(d.looks_like_header("time,temp"));
        assert!(!d.looks_like_header("1,2,3"));
        assert!(!d.looks_like_header("temperature"));
        assert!(d.looks_like_header("1e3,2"));
    }

    #[test]
    fn denylist_is_case_insensitive() {
        let d = detector();
        assert!(d.is_noise("SD card Initializing..."));
        assert!(d.is_noise("init SUCCESSFUL, ready"));
        assert!(d.is_noise("sensor,read,Failed"));
        assert!(!d.is_noise("time,temp"));
    }

    #[test]
    fn names_are_trimmed_and_kept_verbatim() {
        let mut d = detector();
        let schema = d.try_establish(" a , b,,a ").unwrap();
        assert_eq!(schema.columns(), &["a", "b", "", "a"]);
        assert_eq!(schema.position("a"), Some(0));
    }

    #[test]
    fn schema_is_established_once() {
        let mut d = detector();
        assert!(d.try_establish("1,2").is_none());
        assert!(d.try_establish("x,y").is_some());
        assert!(d.try_establish("other,header,line").is_none());
        assert_eq!(d.schema().unwrap().columns(), &["x", "y"]);
        d.reset();
        assert!(d.schema().is_none());
        assert!(d.try_establish("p,q").is_some());
    }

    #[test]
    fn noise_never_becomes_header() {
        let mut d = detector();
        assert!(d.try_establish("Initializing sensors, please wait").is_none());
        assert!(d.schema().is_none());
    }
}
