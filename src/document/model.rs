use serde::{Deserialize, Serialize};
use std::fmt;

/// Text and file metadata for one PDF, before any oracle enrichment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDocument {
    pub id: String,
    pub name: String,
    pub path: String,
    pub size: u64,
    pub text: String,
}

/// Landlord ("locador") as written in the contract preamble.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Landlord {
    pub name: String,
    pub cnpj: String,
    pub rg: String,
}

/// Tenant ("locatário") as written in the contract preamble.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tenant {
    pub name: String,
    pub rg: String,
}

/// An ingested contract. Created once by the store and never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub name: String,
    pub path: String,
    pub size: u64,
    pub text: String,
    pub category: String,
    pub subcategory: String,
    pub observation: String,
    pub embedding: Vec<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locador: Option<Landlord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locatario: Option<Tenant>,
}

impl Document {
    /// First `max_chars` characters of the contract text.
    pub fn excerpt(&self, max_chars: usize) -> &str {
        truncate_chars(&self.text, max_chars)
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{} / {}] ({} bytes)", self.name, self.category.trim(), self.subcategory.trim(), self.size)
    }
}

/// Slices `text` to at most `max_chars` characters without splitting a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
