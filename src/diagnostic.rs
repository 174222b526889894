//! Cache-miss diagnostics: diff an unmatched request against every recording.
//!
//! Only runs on the miss path, so it re-renders every cached request on each
//! call instead of keeping canonical forms around.

use std::fmt;

use similar::TextDiff;

use crate::canonical;
use crate::cassette::cache::ReplayCache;
use crate::error::ReplayError;
use crate::fingerprint::Fingerprint;

/// Renders [`DiagnosticReport`]s.
#[derive(Debug, Clone, Copy)]
pub struct DiagnosticReporter {
    context_lines: usize,
}

impl Default for DiagnosticReporter {
    fn default() -> Self {
        Self { context_lines: 3 }
    }
}

impl DiagnosticReporter {
    /// Reporter with three lines of diff context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets how many unchanged lines surround each diff hunk.
    #[must_use]
    pub fn with_context_lines(mut self, context_lines: usize) -> Self {
        self.context_lines = context_lines;
        self
    }

    /// Diffs the canonical form of an unmatched request against every cached request.
    ///
    /// # Errors
    ///
    /// Returns an error if a cached request cannot be rendered.
    pub fn report(
        &self,
        fingerprint: &Fingerprint,
        canonical: &[u8],
        cache: &ReplayCache,
    ) -> Result<DiagnosticReport, ReplayError> {
        let incoming = canonical::to_display(canonical);
        let mut candidates = Vec::with_capacity(cache.len());
        for (key, interaction) in cache.iter() {
            let rendered = canonical::render(&mut interaction.request.to_request(), cache.filters())?;
            let cached = canonical::to_display(&rendered);
            let text_diff = TextDiff::from_lines(&cached, &incoming);
            let similarity = text_diff.ratio();
            let diff = text_diff
                .unified_diff()
                .context_radius(self.context_lines)
                .header("recorded", "incoming")
                .to_string();
            candidates.push(CandidateDiff {
                fingerprint: key.clone(),
                source: interaction.metadata.source.clone(),
                canonical: cached,
                diff,
                similarity,
            });
        }
        Ok(DiagnosticReport { fingerprint: fingerprint.clone(), canonical: incoming, candidates })
    }
}

/// One recorded request compared against the unmatched one.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateDiff {
    /// Fingerprint of the recorded request.
    pub fingerprint: Fingerprint,
    /// Where the recording came from.
    pub source: String,
    /// Canonical form of the recorded request, after filtering.
    pub canonical: String,
    /// Unified line diff from the recorded request to the incoming one.
    pub diff: String,
    /// Line similarity in `0.0..=1.0`.
    pub similarity: f32,
}

/// Everything a developer needs to fix a fixture or a filter after a miss.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosticReport {
    /// Fingerprint of the unmatched request.
    pub fingerprint: Fingerprint,
    /// Canonical form of the unmatched request, after filtering.
    pub canonical: String,
    /// One entry per cached recording, in fingerprint order.
    pub candidates: Vec<CandidateDiff>,
}

impl DiagnosticReport {
    /// The recorded request with the most lines in common with the incoming one.
    /// Ties go to the lower fingerprint.
    #[must_use]
    pub fn closest(&self) -> Option<&CandidateDiff> {
        self.candidates.iter().fold(None, |best: Option<&CandidateDiff>, candidate| match best {
            Some(best) if best.similarity >= candidate.similarity => Some(best),
            _ => Some(candidate),
        })
    }
}

impl fmt::Display for DiagnosticReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "incoming request {}:", self.fingerprint)?;
        writeln!(f, "{}", self.canonical.trim_end())?;
        writeln!(f)?;

        let Some(closest) = self.closest() else {
            return writeln!(f, "no recorded requests to compare against");
        };
        writeln!(
            f,
            "{} recorded request(s); closest is {} from {} ({:.0}% similar)",
            self.candidates.len(),
            closest.fingerprint,
            closest.source,
            closest.similarity * 100.0,
        )?;

        let total = self.candidates.len();
        for (i, candidate) in self.candidates.iter().enumerate() {
            writeln!(f)?;
            writeln!(f, "recorded {}/{total}: {} ({})", i + 1, candidate.fingerprint, candidate.source)?;
            writeln!(f, "{}", candidate.canonical.trim_end())?;
            writeln!(f, "diff:")?;
            write!(f, "{}", candidate.diff)?;
        }
        Ok(())
    }
}
