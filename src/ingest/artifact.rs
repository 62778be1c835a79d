//! Uploaded artifacts and the items they decode to.
//!
//! Both formats decode to the same lenient [`BatchItem`]: JSON artifacts are
//! a list of objects (a single object is accepted as a one-item batch), CSV
//! artifacts are header-driven rows. A malformed item is reported on its own
//! and does not stop the rest of the artifact from decoding.

use std::path::Path;

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::domain::DEFAULT_DIFFICULTY;
use crate::error::{EvalError, Result};

/// Raw artifact contents tagged with their format
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Artifact {
    Json(Vec<u8>),
    Csv(Vec<u8>),
}

impl Artifact {
    /// Read an artifact from disk; the extension picks the format
    pub fn from_path(path: &Path) -> Result<Self> {
        let name = path.to_string_lossy();
        // Reject before reading so an unsupported upload touches nothing
        Self::check_extension(&name)?;
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&name, bytes)
    }

    /// Wrap in-memory contents; `name` is the uploaded file name
    pub fn from_bytes(name: &str, bytes: impl Into<Vec<u8>>) -> Result<Self> {
        match Self::check_extension(name)? {
            Format::Json => Ok(Artifact::Json(bytes.into())),
            Format::Csv => Ok(Artifact::Csv(bytes.into())),
        }
    }

    pub fn format(&self) -> &'static str {
        match self {
            Artifact::Json(_) => "json",
            Artifact::Csv(_) => "csv",
        }
    }

    /// Decode into items, one result per object or row, in artifact order.
    ///
    /// The outer error means the artifact as a whole is unreadable (bad JSON
    /// document, unreadable CSV header); inner errors are per item.
    pub fn decode(&self) -> Result<Vec<Result<BatchItem>>> {
        match self {
            Artifact::Json(bytes) => decode_json(bytes),
            Artifact::Csv(bytes) => decode_csv(bytes),
        }
    }

    fn check_extension(name: &str) -> Result<Format> {
        let extension = Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        match extension.as_deref() {
            Some("json") => Ok(Format::Json),
            Some("csv") => Ok(Format::Csv),
            Some(other) => Err(EvalError::UnsupportedFormat(format!(".{}", other))),
            None => Err(EvalError::UnsupportedFormat(name.to_string())),
        }
    }
}

enum Format {
    Json,
    Csv,
}

fn decode_json(bytes: &[u8]) -> Result<Vec<Result<BatchItem>>> {
    let document: Value = serde_json::from_slice(bytes)?;
    let values = match document {
        Value::Array(values) => values,
        Value::Object(_) => vec![document],
        other => {
            return Err(EvalError::MalformedItem(format!(
                "expected a list of objects, found {}",
                value_kind(&other)
            )))
        }
    };

    Ok(values.into_iter().map(BatchItem::from_value).collect())
}

fn decode_csv(bytes: &[u8]) -> Result<Vec<Result<BatchItem>>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .flexible(true)
        .from_reader(bytes);

    let headers = reader.headers()?.clone();

    let items = reader
        .records()
        .map(|record| {
            let record = record.map_err(|e| EvalError::MalformedItem(e.to_string()))?;
            let row: Map<String, Value> = headers
                .iter()
                .zip(record.iter())
                .map(|(key, value)| (key.to_string(), Value::String(value.to_string())))
                .collect();
            BatchItem::from_value(Value::Object(row))
        })
        .collect();

    Ok(items)
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// One uploaded row or object; every field is optional until an entry point
/// decides what it requires
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BatchItem {
    #[serde(default, deserialize_with = "lenient_text")]
    pub question_id: Option<String>,

    #[serde(default, deserialize_with = "lenient_text")]
    pub question: Option<String>,

    #[serde(default, alias = "bot_response", deserialize_with = "lenient_text")]
    pub response: Option<String>,

    /// Source label given as a plain column
    #[serde(default, deserialize_with = "lenient_text")]
    pub source: Option<String>,

    #[serde(default)]
    pub sources: Option<Sources>,

    #[serde(default, deserialize_with = "lenient_text")]
    pub standard_answer: Option<String>,

    #[serde(default, deserialize_with = "lenient_text")]
    pub difficulty: Option<String>,

    #[serde(default, deserialize_with = "lenient_text")]
    pub tags: Option<String>,
}

/// Reference material attached to an item
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Sources {
    Documents(Vec<SourceDocument>),
    Label(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SourceDocument {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
}

impl BatchItem {
    pub fn from_value(value: Value) -> Result<Self> {
        if !value.is_object() {
            return Err(EvalError::MalformedItem(format!(
                "expected an object, found {}",
                value_kind(&value)
            )));
        }
        serde_json::from_value(value).map_err(|e| EvalError::MalformedItem(e.to_string()))
    }

    /// First attached source document, if any
    pub fn first_document(&self) -> Option<&SourceDocument> {
        match &self.sources {
            Some(Sources::Documents(documents)) => documents.first(),
            _ => None,
        }
    }

    /// Label used for StandardAnswer lookups: the first document's title,
    /// then a string `sources`, then the `source` column
    pub fn source_label(&self) -> Option<&str> {
        let from_sources = match &self.sources {
            Some(Sources::Documents(documents)) => documents.first().map(|d| d.title.as_str()),
            Some(Sources::Label(label)) => Some(label.as_str()),
            None => None,
        };

        from_sources
            .map(str::trim)
            .filter(|label| !label.is_empty())
            .or(self.source.as_deref().map(str::trim))
    }

    /// Content of the first source document when non-blank
    pub fn embedded_content(&self) -> Option<&str> {
        self.first_document()
            .map(|d| d.content.as_str())
            .filter(|content| !content.trim().is_empty())
    }

    /// Reference text carried by the item itself
    pub fn embedded_reference(&self) -> Option<&str> {
        self.embedded_content().or(self.standard_answer.as_deref())
    }

    /// Whether the item names or carries any source material
    pub fn has_sources(&self) -> bool {
        match &self.sources {
            Some(Sources::Documents(documents)) => !documents.is_empty(),
            Some(Sources::Label(label)) => !label.trim().is_empty(),
            None => self.source.is_some(),
        }
    }

    /// Response text, or empty when absent
    pub fn response_text(&self) -> &str {
        self.response.as_deref().unwrap_or_default()
    }

    /// Declared difficulty, defaulting when absent
    pub fn difficulty(&self) -> Result<u8> {
        match self.difficulty.as_deref().map(str::trim) {
            None => Ok(DEFAULT_DIFFICULTY),
            Some(raw) => raw
                .parse::<f64>()
                .ok()
                .filter(|value| value.fract() == 0.0 && (0.0..=255.0).contains(value))
                .map(|value| value as u8)
                .ok_or_else(|| EvalError::MalformedItem(format!("invalid difficulty '{}'", raw))),
        }
    }
}

/// Accept strings, numbers and booleans as text; blank text reads as absent
fn lenient_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let text = match value {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => Some(text),
        Some(Value::Number(number)) => Some(number.to_string()),
        Some(Value::Bool(flag)) => Some(flag.to_string()),
        Some(other) => {
            return Err(serde::de::Error::custom(format!(
                "expected text, found {}",
                value_kind(&other)
            )))
        }
    };
    Ok(text.filter(|t| !t.trim().is_empty()))
}
