//! `flagfix` is a library for replacing a deprecated compiler flag across a source tree.
//!
//! It provides the core logic for the `flagfix` command-line tool. The main components are:
//!
//! - `BinaryClassifier`: decides whether a file is text worth scanning.
//! - `TreeWalker`: recursive traversal that prunes a fixed set of directory names.
//! - `Scanner`: finds every line containing the flag.
//! - `Replacer`: rewrites matching files in place, touching only the flag bytes.
//! - `committer`: stages and commits the rewritten files through git.
//! - `driver`: ties the pieces together in dry-run, apply or commit mode.
//!
//! Everything runs on the calling thread; a second `--apply` run is a no-op.

pub mod classifier;
pub mod cli;
pub mod committer;
pub mod config;
pub mod driver;
pub mod errors;
pub mod output_formatter;
pub mod patterns;
pub mod replacer;
pub mod scanner;
pub mod walker;

// Re-export main types for easier access by library users.
pub use classifier::BinaryClassifier;
pub use config::FlagConfig;
pub use errors::{Error, Result};
pub use output_formatter::{OutputFormat, OutputFormatter};
pub use patterns::FlagPattern;
pub use replacer::Replacer;
pub use scanner::Scanner;
pub use walker::TreeWalker;
