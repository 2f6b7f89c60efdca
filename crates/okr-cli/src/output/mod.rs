//! Output formatting for okr.
//!
//! Provides text and JSON output formats for CLI output.

use anyhow::Result;
use serde::Serialize;
use serde_json::Value;
use std::io::{self, Write};

/// Output format selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON format - machine-readable output
    Json,
    /// Plain text format - one record per line
    #[default]
    Text,
}

/// Fields rendered first, without a label, when present.
const ID_KEYS: [&str; 2] = ["id", "objective_id"];

/// Formatter that can output data in text or JSON format
#[derive(Debug, Clone)]
pub struct Formatter {
    format: OutputFormat,
}

impl Formatter {
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    #[must_use]
    pub const fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    /// Format data according to the configured output format
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails
    pub fn format<T: Serialize>(&self, data: &T) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(data)?),
            OutputFormat::Text => Ok(render_text(&serde_json::to_value(data)?)),
        }
    }

    /// Format and print data to stdout
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails
    pub fn print<T: Serialize>(&self, data: &T) -> Result<()> {
        let output = self.format(data)?;
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{output}")?;
        Ok(())
    }

    /// Format and print a list with a custom empty message
    ///
    /// For JSON format, wraps the array in a named object with a count.
    /// For text, prints one item per line, or `empty_message` if there are none.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails
    pub fn print_list<T: Serialize>(
        &self,
        data: &[T],
        empty_message: &str,
        collection_name: &str,
    ) -> Result<()> {
        match self.format {
            OutputFormat::Json => self.print(&list_envelope(data, collection_name)?),
            OutputFormat::Text if data.is_empty() => {
                let mut stdout = io::stdout().lock();
                writeln!(stdout, "{empty_message}")?;
                Ok(())
            }
            OutputFormat::Text => self.print(&data),
        }
    }
}

impl Default for Formatter {
    fn default() -> Self {
        Self::new(OutputFormat::default())
    }
}

fn list_envelope<T: Serialize>(data: &[T], collection_name: &str) -> Result<Value> {
    let mut envelope = serde_json::Map::new();
    envelope.insert(collection_name.to_string(), serde_json::to_value(data)?);
    envelope.insert("count".to_string(), serde_json::json!(data.len()));
    Ok(Value::Object(envelope))
}

/// Render a JSON value as concise text
fn render_text(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut parts: Vec<String> = ID_KEYS
                .iter()
                .filter_map(|key| map.get(*key))
                .map(render_field_value)
                .collect();

            for (key, val) in map {
                let empty = val.is_null() || val.as_array().is_some_and(Vec::is_empty);
                if !empty && !ID_KEYS.contains(&key.as_str()) {
                    parts.push(format!("{key}:{}", render_field_value(val)));
                }
            }
            parts.join("  ")
        }
        Value::Array(arr) => arr.iter().map(render_text).collect::<Vec<_>>().join("\n"),
        _ => render_field_value(value),
    }
}

/// Render a single field value as concise text
fn render_field_value(value: &Value) -> String {
    match value {
        Value::String(s) => {
            if s.contains(' ') || s.contains('\n') {
                format!("\"{}\"", s.replace('\n', "\\n"))
            } else {
                s.clone()
            }
        }
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(render_field_value).collect();
            format!("[{}]", items.join(","))
        }
        Value::Object(map) => {
            let parts: Vec<String> = map
                .iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| format!("{k}:{}", render_field_value(v)))
                .collect();
            format!("{{{}}}", parts.join(","))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Serialize)]
    struct Row {
        title: String,
        id: String,
        progress: u8,
        #[serde(skip_serializing_if = "Option::is_none")]
        linked: Option<String>,
        key_results: Vec<String>,
    }

    fn row(id: &str, title: &str) -> Row {
        Row {
            title: title.to_string(),
            id: id.to_string(),
            progress: 40,
            linked: None,
            key_results: vec![],
        }
    }

    #[test]
    fn test_output_format_default() {
        assert_eq!(OutputFormat::default(), OutputFormat::Text);
        assert!(!Formatter::default().is_json());
    }

    #[test]
    fn test_json_output() {
        let output = Formatter::new(OutputFormat::Json)
            .format(&row("obj-1", "Ship"))
            .unwrap();
        let parsed: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["id"], "obj-1");
        assert_eq!(parsed["progress"], 40);
    }

    #[test]
    fn test_text_puts_id_first_and_quotes_spaces() {
        let output = Formatter::new(OutputFormat::Text)
            .format(&row("obj-1", "Ship the release"))
            .unwrap();
        assert!(output.starts_with("obj-1  "));
        assert!(output.contains("title:\"Ship the release\""));
        assert!(output.contains("progress:40"));
    }

    #[test]
    fn test_text_skips_null_and_empty() {
        let output = Formatter::new(OutputFormat::Text)
            .format(&row("obj-1", "Ship"))
            .unwrap();
        assert!(!output.contains("linked"));
        assert!(!output.contains("key_results"));
    }

    #[test]
    fn test_text_array_one_line_per_item() {
        let rows = vec![row("obj-1", "a"), row("obj-2", "b")];
        let output = Formatter::new(OutputFormat::Text).format(&rows).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("obj-2"));
    }

    #[test]
    fn test_text_nested_object_inline() {
        let value = serde_json::json!({"id": "obj-1", "stats": {"done": 2, "skip": null}});
        let output = render_text(&value);
        assert!(output.contains("stats:{done:2}"));
    }

    #[test]
    fn test_list_envelope() {
        let rows = vec![row("obj-1", "a"), row("obj-2", "b")];
        let envelope = list_envelope(&rows, "objectives").unwrap();
        assert_eq!(envelope["count"], 2);
        assert_eq!(envelope["objectives"].as_array().unwrap().len(), 2);
    }
}
