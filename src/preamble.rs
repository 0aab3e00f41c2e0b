//! System preamble construction
//!
//! Every provider request starts with one system message: a fixed
//! domain instruction followed by the lecture transcript the model should
//! ground its answers in. The lecture comes from injected configuration, or
//! from a text file read on each request, or from a fixed fallback string.

use std::io::ErrorKind;
use std::path::PathBuf;

/// Fixed instruction establishing the assistant's domain and task
pub const INSTRUCTION: &str = "あなたは東洋医学に精通した専門家のAIです。ユーザーの質問を以下の講義録に紐づけて、関連性のある項目をまとめて的確な処置や過去の事例をまとめて、わかりやすく述べてください、それらを元に担当者が治療を行います。";

/// Used in place of the lecture when none can be loaded
pub const FALLBACK_LECTURE: &str = "講義録が読み込めませんでした。";

/// Lecture file location, relative to the working directory
pub const DEFAULT_PREAMBLE_PATH: &str = "data/lecture.txt";

/// Combine the instruction with a lecture body.
pub fn build_preamble(lecture: &str) -> String {
    format!("{INSTRUCTION}\n\n{lecture}")
}

/// Where the lecture text comes from.
#[derive(Debug, Clone)]
pub struct PreambleSource {
    text: Option<String>,
    path: Option<PathBuf>,
    fallback: String,
}

impl PreambleSource {
    pub fn new(text: Option<String>, path: Option<PathBuf>) -> Self {
        Self {
            text,
            path,
            fallback: FALLBACK_LECTURE.to_string(),
        }
    }

    /// Only the fallback lecture, never touching the filesystem
    pub fn fallback_only() -> Self {
        Self::new(None, None)
    }

    pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback = fallback.into();
        self
    }

    /// Resolve the lecture: injected text, then the file, then the fallback.
    pub async fn lecture(&self) -> String {
        if let Some(text) = &self.text {
            return text.clone();
        }

        if let Some(path) = &self.path {
            match tokio::fs::read_to_string(path).await {
                Ok(content) => return content,
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    tracing::debug!(path = %path.display(), "Lecture file absent, using fallback");
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to read lecture file, using fallback");
                }
            }
        }

        self.fallback.clone()
    }

    /// Full system preamble for one request
    pub async fn resolve(&self) -> String {
        build_preamble(&self.lecture().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_build_preamble_layout() {
        let preamble = build_preamble("第一講");
        assert!(preamble.starts_with(INSTRUCTION));
        assert!(preamble.ends_with("\n\n第一講"));
    }

    #[tokio::test]
    async fn test_missing_file_uses_fallback() {
        let temp = TempDir::new().unwrap();
        let source = PreambleSource::new(None, Some(temp.path().join("lecture.txt")));
        assert_eq!(source.lecture().await, FALLBACK_LECTURE);
        assert_eq!(source.resolve().await, build_preamble(FALLBACK_LECTURE));
    }

    #[tokio::test]
    async fn test_file_is_read_per_call() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("lecture.txt");
        let source = PreambleSource::new(None, Some(path.clone()));

        fs::write(&path, "肩こりの講義").unwrap();
        assert_eq!(source.lecture().await, "肩こりの講義");

        fs::write(&path, "腰痛の講義").unwrap();
        assert_eq!(source.lecture().await, "腰痛の講義");
    }

    #[tokio::test]
    async fn test_injected_text_wins_over_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("lecture.txt");
        fs::write(&path, "file lecture").unwrap();

        let source = PreambleSource::new(Some("injected".to_string()), Some(path));
        assert_eq!(source.lecture().await, "injected");
    }

    #[tokio::test]
    async fn test_unreadable_path_uses_fallback() {
        // A directory cannot be read as a string
        let temp = TempDir::new().unwrap();
        let source = PreambleSource::new(None, Some(temp.path().to_path_buf())).with_fallback("なし");
        assert_eq!(source.lecture().await, "なし");
    }

    #[tokio::test]
    async fn test_fallback_only() {
        let source = PreambleSource::fallback_only();
        assert_eq!(source.lecture().await, FALLBACK_LECTURE);
    }
}
