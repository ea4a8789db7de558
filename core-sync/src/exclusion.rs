//! # Exclusion Rules
//!
//! Decides which directory entries stay invisible to the explorer: the
//! record file, vendor security files, OS metadata folders and dot-files.
//!
//! Patterns are shell-style globs (`*` and `?`) matched against the entry
//! name only, case-insensitively, since the target media is FAT formatted.

use regex::{Regex, RegexBuilder};
use tracing::debug;

use crate::error::{Result, SyncError};

#[derive(Debug, Clone)]
pub struct ExclusionRules {
    patterns: Vec<(String, Regex)>,
}

impl ExclusionRules {
    /// Compile a list of glob patterns.
    ///
    /// # Errors
    ///
    /// [`SyncError::InvalidPattern`] for an empty pattern.
    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|glob| {
                let glob = glob.as_ref();
                compile_glob(glob).map(|re| (glob.to_string(), re))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    /// Rules that exclude nothing
    pub fn none() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    pub fn is_excluded(&self, name: &str) -> bool {
        match self.patterns.iter().find(|(_, re)| re.is_match(name)) {
            Some((glob, _)) => {
                debug!(name, pattern = %glob, "Excluded entry");
                true
            }
            None => false,
        }
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(|(glob, _)| glob.as_str())
    }
}

fn compile_glob(glob: &str) -> Result<Regex> {
    if glob.is_empty() {
        return Err(SyncError::InvalidPattern {
            pattern: glob.to_string(),
            message: "pattern is empty".to_string(),
        });
    }

    let mut source = String::with_capacity(glob.len() + 8);
    source.push('^');
    for c in glob.chars() {
        match c {
            '*' => source.push_str(".*"),
            '?' => source.push('.'),
            other => source.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }
    source.push('$');

    RegexBuilder::new(&source)
        .case_insensitive(true)
        .build()
        .map_err(|e| SyncError::InvalidPattern {
            pattern: glob.to_string(),
            message: e.to_string(),
        })
}
