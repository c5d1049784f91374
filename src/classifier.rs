use crate::config::FlagConfig;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Outcome of classifying a single file.
#[derive(Debug)]
pub enum Classification {
    /// Looks like text and should be scanned.
    Text,
    /// Deny-listed extension, or a NUL byte in the sniffed prefix.
    Binary,
    /// The file could not be opened or read.
    Unreadable(io::Error),
}

impl Classification {
    pub fn is_text(&self) -> bool {
        matches!(self, Classification::Text)
    }
}

/// Decides whether a file is scanned at all.
///
/// The extension check runs first and never touches the file. Anything else is
/// sniffed: a NUL within the first `sniff_bytes` bytes marks it binary. This is
/// a heuristic; a binary file without an early NUL is classified as text.
#[derive(Debug, Clone)]
pub struct BinaryClassifier {
    extensions: BTreeSet<String>,
    sniff_bytes: usize,
}

impl BinaryClassifier {
    pub fn new(extensions: BTreeSet<String>, sniff_bytes: usize) -> Self {
        Self {
            extensions,
            sniff_bytes,
        }
    }

    pub fn from_config(config: &FlagConfig) -> Self {
        Self::new(config.binary_extensions.clone(), config.sniff_bytes)
    }

    /// Returns `true` when the extension alone marks the file as binary.
    pub fn has_binary_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|os| os.to_str())
            .map(|s| self.extensions.contains(&s.to_lowercase()))
            .unwrap_or(false)
    }

    pub fn classify(&self, path: &Path) -> Classification {
        if self.has_binary_extension(path) {
            return Classification::Binary;
        }

        match self.sniff(path) {
            Ok(true) => Classification::Binary,
            Ok(false) => Classification::Text,
            Err(e) => Classification::Unreadable(e),
        }
    }

    /// Binary and unreadable files are both treated as "do not scan".
    pub fn is_binary(&self, path: &Path) -> bool {
        !self.classify(path).is_text()
    }

    fn sniff(&self, path: &Path) -> io::Result<bool> {
        let mut chunk = Vec::with_capacity(self.sniff_bytes);
        File::open(path)?
            .take(self.sniff_bytes as u64)
            .read_to_end(&mut chunk)?;
        Ok(chunk.contains(&0))
    }
}

impl Default for BinaryClassifier {
    fn default() -> Self {
        Self::from_config(&FlagConfig::default())
    }
}
