use std::fmt;

use serde::Serialize;
use serde::ser::SerializeMap;
use serde_json::Value;

/// Display value of one typed Notion page property.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Title(String),
    RichText(String),
    Number(Option<f64>),
    Select(Option<String>),
    MultiSelect(Vec<String>),
    /// Start of the date range.
    Date(Option<String>),
    Checkbox(bool),
    Url(Option<String>),
    Email(Option<String>),
    PhoneNumber(Option<String>),
    People(Vec<String>),
    /// Placeholder `"[<type>]"` for property types without a mapping.
    Unknown(String),
}

impl PropertyValue {
    pub fn is_empty(&self) -> bool {
        match self {
            PropertyValue::Title(text) | PropertyValue::RichText(text) => text.is_empty(),
            PropertyValue::Number(n) => n.is_none(),
            PropertyValue::Select(v)
            | PropertyValue::Date(v)
            | PropertyValue::Url(v)
            | PropertyValue::Email(v)
            | PropertyValue::PhoneNumber(v) => v.as_deref().is_none_or(str::is_empty),
            PropertyValue::MultiSelect(items) | PropertyValue::People(items) => items.is_empty(),
            PropertyValue::Checkbox(_) | PropertyValue::Unknown(_) => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            PropertyValue::Title(text) | PropertyValue::RichText(text) => Some(text),
            PropertyValue::Select(v)
            | PropertyValue::Date(v)
            | PropertyValue::Url(v)
            | PropertyValue::Email(v)
            | PropertyValue::PhoneNumber(v) => v.as_deref(),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Number(Some(n)) => write!(f, "{n}"),
            PropertyValue::Number(None) => Ok(()),
            PropertyValue::MultiSelect(items) | PropertyValue::People(items) => {
                f.write_str(&items.join(", "))
            }
            PropertyValue::Checkbox(checked) => write!(f, "{checked}"),
            PropertyValue::Unknown(placeholder) => f.write_str(placeholder),
            other => f.write_str(other.as_text().unwrap_or_default()),
        }
    }
}

fn joined_plain_text(items: Option<&Value>) -> String {
    items
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .filter_map(|part| part.get("plain_text").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default()
}

fn names(items: Option<&Value>) -> Vec<String> {
    items
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(|item| item.get("name").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn opt_string(value: Option<&Value>) -> Option<String> {
    value.and_then(Value::as_str).map(str::to_string)
}

/// Maps a single property object (`{"type": ..., <type>: ...}`) onto a display value.
/// Never fails; unmapped or malformed types degrade to a placeholder.
pub fn extract_property_value(prop: &Value) -> PropertyValue {
    let kind = prop.get("type").and_then(Value::as_str).unwrap_or("unknown");
    let body = prop.get(kind);
    match kind {
        "title" => PropertyValue::Title(joined_plain_text(body)),
        "rich_text" => PropertyValue::RichText(joined_plain_text(body)),
        "number" => PropertyValue::Number(body.and_then(Value::as_f64)),
        "select" => PropertyValue::Select(opt_string(body.and_then(|s| s.get("name")))),
        "multi_select" => PropertyValue::MultiSelect(names(body)),
        "date" => PropertyValue::Date(opt_string(body.and_then(|d| d.get("start")))),
        "checkbox" => PropertyValue::Checkbox(body.and_then(Value::as_bool).unwrap_or(false)),
        "url" => PropertyValue::Url(opt_string(body)),
        "email" => PropertyValue::Email(opt_string(body)),
        "phone_number" => PropertyValue::PhoneNumber(opt_string(body)),
        "people" => PropertyValue::People(names(body)),
        other => PropertyValue::Unknown(format!("[{other}]")),
    }
}

/// Page properties in the order Notion returned them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PageProperties {
    pub page_id: String,
    pub url: Option<String>,
    entries: Vec<(String, PropertyValue)>,
}

impl PageProperties {
    pub fn new(page_id: impl Into<String>) -> Self {
        Self {
            page_id: page_id.into(),
            ..Default::default()
        }
    }

    /// Builds from a page object as returned by `GET /v1/pages/{id}`.
    pub fn from_page(page: &Value) -> Self {
        let mut props = Self::new(page.get("id").and_then(Value::as_str).unwrap_or_default());
        props.url = opt_string(page.get("url"));
        if let Some(map) = page.get("properties").and_then(Value::as_object) {
            for (name, prop) in map {
                props.push(name.clone(), extract_property_value(prop));
            }
        }
        props
    }

    pub fn push(&mut self, name: impl Into<String>, value: PropertyValue) {
        self.entries.push((name.into(), value));
    }

    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keeps only the named properties; an empty selection keeps everything.
    pub fn retain_named(mut self, selected: &[String]) -> Self {
        if !selected.is_empty() {
            self.entries.retain(|(key, _)| selected.iter().any(|s| s == key));
        }
        self
    }
}

impl Serialize for PageProperties {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
