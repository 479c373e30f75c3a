use serde::Deserialize;
use serde::de::{DeserializeOwned, Deserializer};
use serde_json::{Map, Value};

/// Every field is optional and a value of the wrong JSON type reads as absent,
/// so an authenticated event always decodes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookEvent {
    #[serde(default, rename = "type", deserialize_with = "lenient")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub entity: Option<Entity>,
    #[serde(default, deserialize_with = "lenient")]
    pub data: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Entity {
    #[serde(default, rename = "type", deserialize_with = "lenient")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<String>,
}

fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

impl WebhookEvent {
    pub fn entity_id(&self) -> Option<&str> {
        self.entity
            .as_ref()
            .and_then(|e| e.id.as_deref())
            .filter(|id| !id.is_empty())
    }

    pub fn entity_kind(&self) -> Option<&str> {
        self.entity.as_ref().and_then(|e| e.kind.as_deref())
    }

    /// Names listed in `data.updated_properties`; empty when absent.
    pub fn updated_properties(&self) -> Vec<String> {
        self.data
            .get("updated_properties")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventClass {
    Page { extract: bool },
    Database,
    Block,
    Other,
}

pub fn classify(kind: &str, entity_kind: Option<&str>) -> EventClass {
    match kind.split_once('.').map(|(prefix, _)| prefix) {
        Some("page") => EventClass::Page {
            extract: matches!(kind, "page.created" | "page.properties_updated"),
        },
        Some("database") => EventClass::Database,
        Some("block") if matches!(entity_kind, None | Some("block")) => EventClass::Block,
        _ => EventClass::Other,
    }
}
