//! Translation lookup and the field resolution rule.
//!
//! Two indexes are consulted per entity: the requested language and the
//! fixed fallback language. A field resolves to the first non-empty value
//! of (requested, fallback). When neither has it, name-like fields show
//! the entity id and descriptive fields stay empty.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::rows::TranslationRow;

/// Kind of entity a translation belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Region,
    Country,
    Quest,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Region => "region",
            EntityKind::Country => "country",
            EntityKind::Quest => "quest",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a field behaves when no translation supplies it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldClass {
    /// Display names and titles: fall back to the entity id
    Name,
    /// Longer text: fall back to an empty string
    Descriptive,
}

/// Translation records for one language, keyed by `"{kind}:{id}"`
#[derive(Debug, Clone, Default)]
pub struct TranslationIndex {
    records: HashMap<String, HashMap<String, String>>,
}

impl TranslationIndex {
    /// Build an index from raw translation rows.
    ///
    /// Later rows for the same entity merge into earlier ones field by field.
    pub fn from_rows<'a>(rows: impl IntoIterator<Item = &'a TranslationRow>) -> Self {
        let mut records: HashMap<String, HashMap<String, String>> = HashMap::new();

        for row in rows {
            let key = format!("{}:{}", row.entity_type, row.entity_id);
            let fields = records.entry(key).or_default();
            for (name, value) in &row.fields {
                if let Some(text) = value.as_str() {
                    fields.insert(name.clone(), text.to_string());
                }
            }
        }

        Self { records }
    }

    /// Look up a non-empty field value
    pub fn field(&self, kind: EntityKind, id: &str, field: &str) -> Option<&str> {
        self.records
            .get(&format!("{}:{}", kind, id))
            .and_then(|fields| fields.get(field))
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Requested-language index layered over the fallback-language index
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    requested: &'a TranslationIndex,
    fallback: &'a TranslationIndex,
}

impl<'a> Resolver<'a> {
    pub fn new(requested: &'a TranslationIndex, fallback: &'a TranslationIndex) -> Self {
        Self {
            requested,
            fallback,
        }
    }

    /// Resolve one display field for an entity
    pub fn resolve(&self, kind: EntityKind, id: &str, field: &str, class: FieldClass) -> String {
        if let Some(value) = self
            .requested
            .field(kind, id, field)
            .or_else(|| self.fallback.field(kind, id, field))
        {
            return value.to_string();
        }

        match class {
            FieldClass::Name => id.to_string(),
            FieldClass::Descriptive => String::new(),
        }
    }

    pub fn name(&self, kind: EntityKind, id: &str, field: &str) -> String {
        self.resolve(kind, id, field, FieldClass::Name)
    }

    pub fn text(&self, kind: EntityKind, id: &str, field: &str) -> String {
        self.resolve(kind, id, field, FieldClass::Descriptive)
    }
}
