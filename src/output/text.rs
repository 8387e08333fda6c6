//! Human-readable output for the terminal.
//!
//! Prints one line per matching pair, most similar first:
//!
//! ```text
//!  92.19%  /photos/a.jpg  /photos/b.jpg
//! ```
//!
//! followed by a short summary. Colors come from `yansi` and are turned off
//! globally by `--no-color` / `NO_COLOR`.

use std::io::{self, Write};
use std::path::Path;

use yansi::Paint;

use crate::duplicates::{ImageMatch, ScanSummary};

/// Terminal table formatter.
pub struct TextOutput<'a> {
    matches: &'a [ImageMatch],
    summary: &'a ScanSummary,
}

impl<'a> TextOutput<'a> {
    /// Create a new text formatter.
    #[must_use]
    pub fn new(matches: &'a [ImageMatch], summary: &'a ScanSummary) -> Self {
        Self { matches, summary }
    }

    /// Write the match table and summary.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let folder = self.summary.folder.as_path();

        if !self.summary.folder_found {
            writeln!(
                writer,
                "{} {}",
                "Folder not found:".yellow(),
                folder.display()
            )?;
            return Ok(());
        }

        let width = self
            .matches
            .iter()
            .map(|m| display_path(folder, &m.first).chars().count())
            .max()
            .unwrap_or(0);

        for m in self.matches {
            let first = display_path(folder, &m.first);
            let second = display_path(folder, &m.second);
            let score = format!("{:>6.2}%", m.similarity);
            writeln!(
                writer,
                "{}  {:<width$}  {}",
                similarity_paint(&score, m.similarity),
                first,
                second,
            )?;
        }

        if !self.matches.is_empty() {
            writeln!(writer)?;
        }
        self.write_summary(writer)
    }

    fn write_summary<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let s = self.summary;
        let headline = match s.matches {
            0 => "No similar images found".to_string(),
            1 => "1 similar pair".to_string(),
            n => format!("{n} similar pairs"),
        };
        writeln!(writer, "{}", headline.bold())?;
        writeln!(
            writer,
            "{} images ({} cached, {} fingerprinted, {} removed from cache) in {:.2?}",
            s.total_images, s.cache_hits, s.fingerprinted, s.removed, s.scan_duration
        )?;

        for skipped in &s.skipped {
            writeln!(
                writer,
                "{} {}: {}",
                "skipped".yellow(),
                skipped.name,
                skipped.reason.dim()
            )?;
        }
        for warning in &s.cache_warnings {
            writeln!(writer, "{} {}", "cache:".yellow(), warning)?;
        }
        Ok(())
    }

    /// Render to a string.
    ///
    /// # Errors
    ///
    /// Returns an error if formatting fails.
    pub fn to_string(&self) -> io::Result<String> {
        let mut buffer = Vec::new();
        self.write_to(&mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

fn display_path(folder: &Path, name: &str) -> String {
    folder.join(name).display().to_string()
}

fn similarity_paint(score: &str, similarity: f64) -> yansi::Painted<&str> {
    if similarity >= 95.0 {
        score.green().bold()
    } else if similarity >= 85.0 {
        score.green()
    } else {
        score.yellow()
    }
}
