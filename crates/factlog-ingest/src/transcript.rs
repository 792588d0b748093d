//! Call-log transcript parsing.
//!
//! Transcripts are line-oriented `speaker: utterance` text, interleaved with
//! timestamp ranges (`00:00:01.000 --> 00:00:04.000`) that carry no content.

use std::fmt::Write;

/// Marker found on timestamp-range lines.
const TIMESTAMP_MARKER: &str = "-->";
/// Separator between speaker and utterance.
const SPEAKER_SEPARATOR: &str = ": ";

/// One spoken line of a call log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptLine<'a> {
    pub speaker: &'a str,
    pub utterance: &'a str,
}

/// A parsed call log. Owns the raw text; records are produced lazily and the
/// sequence can be walked any number of times.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    raw: String,
}

impl Transcript {
    pub fn parse(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    /// Speaker/utterance records in document order. Timestamp lines and lines
    /// without a `": "` separator are skipped.
    pub fn lines(&self) -> impl Iterator<Item = TranscriptLine<'_>> + '_ {
        self.raw
            .lines()
            .filter(|line| !line.contains(TIMESTAMP_MARKER))
            .filter_map(|line| {
                line.split_once(SPEAKER_SEPARATOR)
                    .map(|(speaker, utterance)| TranscriptLine { speaker, utterance })
            })
    }

    pub fn is_empty(&self) -> bool {
        self.lines().next().is_none()
    }

    pub fn len(&self) -> usize {
        self.lines().count()
    }

    /// Render the records for a prompt, one `speaker: utterance` per line.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.raw.len());
        for line in self.lines() {
            let _ = writeln!(out, "{}{}{}", line.speaker, SPEAKER_SEPARATOR, line.utterance);
        }
        out
    }
}
