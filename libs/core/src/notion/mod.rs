//! Notion REST access and typed-property extraction.

pub mod client;
pub mod extract;
pub mod property;

pub use client::{HttpNotionClient, NOTION_VERSION, NotionApi, title_property_name};
pub use extract::{Extraction, PropertyExtractor, TOKEN_NOT_CONFIGURED};
pub use property::{PageProperties, PropertyValue, extract_property_value};
