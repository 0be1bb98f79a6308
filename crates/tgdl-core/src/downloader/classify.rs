//! Artifact detection in subprocess output.
//!
//! yt-dlp is invoked with `--print post_process:filename`, so on success it
//! prints the final file path on its own line. That line starts with the
//! configured output directory and ends in a short extension; everything
//! else on stdout/stderr is progress noise. The pattern lives here, isolated,
//! so a structured detection scheme could replace it without touching the
//! orchestration.

use regex::Regex;
use std::path::Path;

/// A line recognized as the produced file's path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Base name of the file, for display.
    pub file_name: String,
    /// The full matched line (the path as printed).
    pub line: String,
}

/// Line classifier anchored to the output directory. Pure: the same line
/// always classifies the same way.
#[derive(Debug, Clone)]
pub struct OutputClassifier {
    pattern: Regex,
}

impl OutputClassifier {
    /// Build the classifier for a given output directory. The directory is
    /// escaped before interpolation so paths like `./downloads (new)` work.
    pub fn new(output_dir: &str) -> Result<Self, regex::Error> {
        let pattern = Regex::new(&format!(
            r"^({}).*\.(\w{{3,5}})$",
            regex::escape(output_dir)
        ))?;
        Ok(Self { pattern })
    }

    /// Classify one output line: Some(artifact) if it looks like the
    /// produced file's path, None for noise.
    pub fn classify(&self, line: &str) -> Option<Artifact> {
        if !self.pattern.is_match(line) {
            return None;
        }
        let file_name = Path::new(line)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Some(Artifact {
            file_name,
            line: line.to_string(),
        })
    }
}
