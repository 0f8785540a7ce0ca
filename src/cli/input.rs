//! Reading documents from input files.

use std::path::Path;

use anyhow::{Context, Result};
use incident_themes::{IncidentFeed, Ticket};

/// Documents read from an input file.
#[derive(Debug)]
pub enum InputDocuments {
    /// A ticket feed; documents are the short descriptions.
    Tickets(Vec<Ticket>),
    /// Plain text, one document per non-blank line.
    Lines(Vec<String>),
}

impl InputDocuments {
    /// Document texts in input order.
    pub fn texts(&self) -> Vec<String> {
        match self {
            InputDocuments::Tickets(tickets) => tickets
                .iter()
                .map(|t| t.short_description.clone())
                .collect(),
            InputDocuments::Lines(lines) => lines.clone(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            InputDocuments::Tickets(tickets) => tickets.len(),
            InputDocuments::Lines(lines) => lines.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Load documents from a JSON ticket feed or a line-delimited text file.
///
/// A `.json` file must parse as a feed. Other files are parsed as a feed
/// when their content looks like JSON and does parse, and are otherwise
/// read as one document per non-blank line.
pub async fn load(path: &Path) -> Result<InputDocuments> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let trimmed = content.trim_start();
    let is_json_file = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json_file {
        let tickets = IncidentFeed::from_json(trimmed)
            .with_context(|| format!("Failed to parse ticket feed {}", path.display()))?;
        tracing::debug!(tickets = tickets.len(), "Loaded ticket feed");
        return Ok(InputDocuments::Tickets(tickets));
    }

    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        match IncidentFeed::from_json(trimmed) {
            Ok(tickets) => {
                tracing::debug!(tickets = tickets.len(), "Loaded ticket feed");
                return Ok(InputDocuments::Tickets(tickets));
            }
            Err(e) => {
                tracing::debug!("Not a ticket feed, reading lines: {}", e);
            }
        }
    }

    let lines: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect();
    tracing::debug!(lines = lines.len(), "Loaded text documents");
    Ok(InputDocuments::Lines(lines))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_load_feed() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"result": [{{"id": "1", "short_description": "vpn down"}}]}}"#
        )
        .unwrap();

        let input = load(file.path()).await.unwrap();
        assert!(matches!(input, InputDocuments::Tickets(_)));
        assert_eq!(input.texts(), vec!["vpn down".to_string()]);
    }

    #[tokio::test]
    async fn test_load_lines_skips_blanks() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "disk full\n\n  printer jam  \n").unwrap();

        let input = load(file.path()).await.unwrap();
        assert_eq!(input.len(), 2);
        assert_eq!(input.texts(), vec!["disk full".to_string(), "printer jam".to_string()]);
    }

    #[tokio::test]
    async fn test_load_lines_with_bracketed_prefix() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "[P1] server down\nbilling issue\ninvoice wrong").unwrap();

        let input = load(file.path()).await.unwrap();
        assert!(matches!(input, InputDocuments::Lines(_)));
        assert_eq!(
            input.texts(),
            vec![
                "[P1] server down".to_string(),
                "billing issue".to_string(),
                "invoice wrong".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_load_invalid_json_file_fails() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, "[P1] server down").unwrap();

        assert!(load(file.path()).await.is_err());
    }
}
