use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Bulk ingest operation. Serializes lowercase, as the API expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Insert,
    Update,
    Upsert,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Insert => "insert",
            Operation::Update => "update",
            Operation::Upsert => "upsert",
            Operation::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// Column delimiter names the ingest API understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ColumnDelimiter {
    Backquote,
    Caret,
    Comma,
    Pipe,
    Semicolon,
    Tab,
}

impl ColumnDelimiter {
    /// Maps a delimiter as typed on the command line to its API name.
    /// Accepts both a literal tab and the escape `\t`.
    pub fn parse(delim: &str) -> Result<Self> {
        match delim {
            "`" => Ok(ColumnDelimiter::Backquote),
            "^" => Ok(ColumnDelimiter::Caret),
            "," => Ok(ColumnDelimiter::Comma),
            "|" => Ok(ColumnDelimiter::Pipe),
            ";" => Ok(ColumnDelimiter::Semicolon),
            "\t" | "\\t" => Ok(ColumnDelimiter::Tab),
            other => Err(Error::InvalidDelimiter(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ColumnDelimiter::Backquote => "BACKQUOTE",
            ColumnDelimiter::Caret => "CARET",
            ColumnDelimiter::Comma => "COMMA",
            ColumnDelimiter::Pipe => "PIPE",
            ColumnDelimiter::Semicolon => "SEMICOLON",
            ColumnDelimiter::Tab => "TAB",
        }
    }
}

/// Content type for uploaded batches. The ingest API only takes CSV.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentType {
    #[default]
    #[serde(rename = "CSV")]
    Csv,
}

/// Configuration for one ingest job. Built once and passed by value into a
/// [`Job`](crate::job::Job); never mutated after job creation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobConfig {
    pub object: String,
    pub operation: Operation,
    pub content_type: ContentType,
    pub column_delimiter: ColumnDelimiter,
}

impl JobConfig {
    pub fn new(object: impl Into<String>, operation: Operation, delimiter: ColumnDelimiter) -> Self {
        Self {
            object: object.into(),
            operation,
            content_type: ContentType::Csv,
            column_delimiter: delimiter,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delimiter_name_table() {
        let cases = [
            ("`", "BACKQUOTE"),
            ("^", "CARET"),
            (",", "COMMA"),
            ("|", "PIPE"),
            (";", "SEMICOLON"),
            ("\\t", "TAB"),
            ("\t", "TAB"),
        ];

        for (input, expected) in cases {
            assert_eq!(ColumnDelimiter::parse(input).unwrap().name(), expected);
        }
    }

    #[test]
    fn unknown_delimiter_is_rejected() {
        assert!(matches!(
            ColumnDelimiter::parse("~"),
            Err(Error::InvalidDelimiter(_))
        ));
    }

    #[test]
    fn config_serializes_to_ingest_request_shape() {
        let config = JobConfig::new("Contact", Operation::Insert, ColumnDelimiter::Comma);

        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "object": "Contact",
                "operation": "insert",
                "contentType": "CSV",
                "columnDelimiter": "COMMA"
            })
        );
    }
}
