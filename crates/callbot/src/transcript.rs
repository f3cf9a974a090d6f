//! Call transcripts and their export to text files

use std::path::{Path, PathBuf};

/// Who is speaking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    /// The human on the line
    Client,
    /// The simulated customer voiced by the model
    Support,
}

impl Speaker {
    pub fn label(&self) -> &'static str {
        match self {
            Speaker::Client => "Client",
            Speaker::Support => "Support",
        }
    }
}

/// One recorded line of a call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptLine {
    pub speaker: Speaker,
    pub text: String,
}

impl TranscriptLine {
    pub fn client(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Client,
            text: text.into(),
        }
    }

    pub fn support(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Support,
            text: text.into(),
        }
    }
}

impl std::fmt::Display for TranscriptLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.speaker.label(), self.text)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TranscriptError {
    #[error("Failed to write transcript {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result of an export request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Saved { file_name: String, lines: usize },
    NotFound,
}

impl ExportOutcome {
    /// Plain-text body returned to whoever asked for the export
    pub fn message(&self) -> String {
        match self {
            ExportOutcome::Saved { file_name, .. } => format!("Transcription saved to {file_name}"),
            ExportOutcome::NotFound => "Call SID not found.".to_string(),
        }
    }
}

/// File name used for a call's transcript.
///
/// Anything outside `[A-Za-z0-9_-]` is replaced so the name can never leave
/// the transcript directory.
pub fn transcript_file_name(call_sid: &str) -> String {
    let safe: String = call_sid
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("transcript_{safe}.txt")
}

/// Render lines as `Speaker: text`, one per line, newline-terminated
pub fn render(lines: &[TranscriptLine]) -> String {
    lines.iter().map(|line| format!("{line}\n")).collect()
}

/// Write a transcript into `dir`, replacing any earlier export of the same call
pub async fn write_transcript(
    dir: &Path,
    call_sid: &str,
    lines: &[TranscriptLine],
) -> Result<ExportOutcome, TranscriptError> {
    let file_name = transcript_file_name(call_sid);
    let path = dir.join(&file_name);

    tokio::fs::write(&path, render(lines))
        .await
        .map_err(|source| TranscriptError::Write {
            path: path.clone(),
            source,
        })?;

    tracing::info!("Saved {} transcript lines to {}", lines.len(), path.display());
    Ok(ExportOutcome::Saved {
        file_name,
        lines: lines.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_format() {
        assert_eq!(
            TranscriptLine::client("My toilet is running").to_string(),
            "Client: My toilet is running"
        );
        assert_eq!(TranscriptLine::support("Okay").to_string(), "Support: Okay");
    }

    #[test]
    fn test_file_name_is_deterministic_and_contained() {
        assert_eq!(transcript_file_name("CA123abc"), "transcript_CA123abc.txt");
        assert_eq!(transcript_file_name("../etc/passwd"), "transcript____etc_passwd.txt");
        assert_eq!(transcript_file_name("CA123abc"), transcript_file_name("CA123abc"));
    }

    #[test]
    fn test_outcome_messages() {
        let saved = ExportOutcome::Saved {
            file_name: "transcript_CA1.txt".to_string(),
            lines: 2,
        };
        assert_eq!(saved.message(), "Transcription saved to transcript_CA1.txt");
        assert_eq!(ExportOutcome::NotFound.message(), "Call SID not found.");
    }

    #[tokio::test]
    async fn test_write_overwrites_previous_export() {
        let dir = tempfile::tempdir().unwrap();

        write_transcript(
            dir.path(),
            "CA1",
            &[
                TranscriptLine::client("one"),
                TranscriptLine::support("two"),
                TranscriptLine::client("three"),
            ],
        )
        .await
        .unwrap();

        let outcome = write_transcript(dir.path(), "CA1", &[TranscriptLine::client("only")])
            .await
            .unwrap();

        assert_eq!(
            outcome,
            ExportOutcome::Saved {
                file_name: "transcript_CA1.txt".to_string(),
                lines: 1
            }
        );
        let content = std::fs::read_to_string(dir.path().join("transcript_CA1.txt")).unwrap();
        assert_eq!(content, "Client: only\n");
    }

    #[tokio::test]
    async fn test_write_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");

        let err = write_transcript(&missing, "CA1", &[]).await.unwrap_err();
        assert!(matches!(err, TranscriptError::Write { .. }));
    }
}
