//! Typed model of mini-tables
//!
//! Properties are declared per database; row values are a tagged union whose
//! variant must agree with the declared [`PropertyType`].

use crate::bail_constraint;
use crate::error::Result;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use super::view::ViewConfig;

/// Id of the mandatory title property
pub const TITLE_PROPERTY: &str = "title";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    Text,
    Number,
    Select,
    MultiSelect,
    Date,
    Checkbox,
    Url,
}

impl PropertyType {
    pub fn has_options(self) -> bool {
        matches!(self, PropertyType::Select | PropertyType::MultiSelect)
    }
}

impl std::fmt::Display for PropertyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PropertyType::Text => "text",
            PropertyType::Number => "number",
            PropertyType::Select => "select",
            PropertyType::MultiSelect => "multi_select",
            PropertyType::Date => "date",
            PropertyType::Checkbox => "checkbox",
            PropertyType::Url => "url",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// One column of a database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDef {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: PropertyType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<SelectOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
}

impl PropertyDef {
    pub fn new(id: &str, name: &str, kind: PropertyType) -> Self {
        PropertyDef {
            id: id.to_string(),
            name: name.to_string(),
            kind,
            options: Vec::new(),
            width: None,
        }
    }

    pub fn title() -> Self {
        PropertyDef::new(TITLE_PROPERTY, "Name", PropertyType::Text)
    }

    pub fn with_options(mut self, names: &[&str]) -> Self {
        self.options = names
            .iter()
            .map(|n| SelectOption {
                id: slug::slugify(n),
                name: n.to_string(),
                color: None,
            })
            .collect();
        self
    }

    fn knows_option(&self, value: &str) -> bool {
        self.options.is_empty()
            || self.options.iter().any(|o| o.id == value || o.name == value)
    }
}

/// A cell value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum PropertyValue {
    Text(String),
    Number(f64),
    Select(String),
    MultiSelect(Vec<String>),
    Date(NaiveDate),
    Checkbox(bool),
    Url(String),
}

impl PropertyValue {
    pub fn kind(&self) -> PropertyType {
        match self {
            PropertyValue::Text(_) => PropertyType::Text,
            PropertyValue::Number(_) => PropertyType::Number,
            PropertyValue::Select(_) => PropertyType::Select,
            PropertyValue::MultiSelect(_) => PropertyType::MultiSelect,
            PropertyValue::Date(_) => PropertyType::Date,
            PropertyValue::Checkbox(_) => PropertyType::Checkbox,
            PropertyValue::Url(_) => PropertyType::Url,
        }
    }

    /// Blank text, an empty multi-select and an unchecked box are all "empty"
    pub fn is_empty(&self) -> bool {
        match self {
            PropertyValue::Text(s) | PropertyValue::Select(s) | PropertyValue::Url(s) => {
                s.trim().is_empty()
            }
            PropertyValue::MultiSelect(v) => v.is_empty(),
            PropertyValue::Checkbox(b) => !b,
            PropertyValue::Number(_) | PropertyValue::Date(_) => false,
        }
    }

    /// Textual form used for text comparisons
    pub fn as_text(&self) -> String {
        match self {
            PropertyValue::Text(s) | PropertyValue::Select(s) | PropertyValue::Url(s) => s.clone(),
            PropertyValue::Number(n) => n.to_string(),
            PropertyValue::MultiSelect(v) => v.join(", "),
            PropertyValue::Date(d) => d.format("%Y-%m-%d").to_string(),
            PropertyValue::Checkbox(b) => b.to_string(),
        }
    }

    /// Reinterpret this value as `target`, or `None` when no faithful
    /// conversion exists
    pub fn coerce(self, target: PropertyType) -> Option<PropertyValue> {
        if self.kind() == target {
            return Some(self);
        }
        match (self, target) {
            (v, PropertyType::Text) => Some(PropertyValue::Text(v.as_text())),
            (PropertyValue::Text(s), PropertyType::Url) => Some(PropertyValue::Url(s)),
            (PropertyValue::Text(s), PropertyType::Select) if !s.trim().is_empty() => {
                Some(PropertyValue::Select(s))
            }
            (PropertyValue::Select(s), PropertyType::MultiSelect) => {
                Some(PropertyValue::MultiSelect(vec![s]))
            }
            (PropertyValue::MultiSelect(mut v), PropertyType::Select) if v.len() == 1 => {
                v.pop().map(PropertyValue::Select)
            }
            (PropertyValue::Text(s), PropertyType::Number) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(PropertyValue::Number),
            (PropertyValue::Text(s), PropertyType::Date) => {
                NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                    .ok()
                    .map(PropertyValue::Date)
            }
            (PropertyValue::Text(s), PropertyType::Checkbox) => match s.trim() {
                "true" => Some(PropertyValue::Checkbox(true)),
                "false" => Some(PropertyValue::Checkbox(false)),
                _ => None,
            },
            _ => None,
        }
    }
}

/// Property-id to value map of one row
pub type RowProperties = BTreeMap<String, PropertyValue>;

/// A mini-table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Database {
    pub id: String,
    pub title: String,
    pub properties_config: Vec<PropertyDef>,
    pub view_config: ViewConfig,
    /// Note that embeds this database, if any
    pub note_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Database {
    pub fn property(&self, id: &str) -> Option<&PropertyDef> {
        self.properties_config.iter().find(|p| p.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseRow {
    pub id: String,
    pub database_id: String,
    pub properties: RowProperties,
    pub order_index: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DatabaseRow {
    pub fn value(&self, property_id: &str) -> Option<&PropertyValue> {
        self.properties.get(property_id)
    }
}

/// Partial update of a database; `None` fields are left untouched
#[derive(Debug, Clone, Default)]
pub struct DatabaseUpdate {
    pub title: Option<String>,
    pub properties_config: Option<Vec<PropertyDef>>,
    pub view_config: Option<ViewConfig>,
}

/// Check the structural rules of a property list: unique non-empty ids and
/// exactly one text property with the title id
pub fn validate_properties_config(config: &[PropertyDef]) -> Result<()> {
    let mut seen = HashSet::new();
    for prop in config {
        if prop.id.trim().is_empty() {
            bail_constraint!("property ids must not be empty");
        }
        if !seen.insert(prop.id.as_str()) {
            bail_constraint!("duplicate property id '{}'", prop.id);
        }
    }

    match config.iter().find(|p| p.id == TITLE_PROPERTY) {
        None => bail_constraint!("the '{}' property cannot be removed", TITLE_PROPERTY),
        Some(p) if p.kind != PropertyType::Text => bail_constraint!(
            "the '{}' property must stay text, got {}",
            TITLE_PROPERTY,
            p.kind
        ),
        Some(_) => Ok(()),
    }
}

/// Reject values that target unknown properties or disagree with the
/// declared type
pub fn validate_values(config: &[PropertyDef], values: &RowProperties) -> Result<()> {
    for (id, value) in values {
        let Some(def) = config.iter().find(|p| &p.id == id) else {
            bail_constraint!("unknown property '{}'", id);
        };
        if value.kind() != def.kind {
            bail_constraint!(
                "property '{}' is {}, got a {} value",
                id,
                def.kind,
                value.kind()
            );
        }
        match value {
            PropertyValue::Number(n) if !n.is_finite() => {
                bail_constraint!("property '{}' needs a finite number", id)
            }
            PropertyValue::Select(s) if !def.knows_option(s) => {
                bail_constraint!("'{}' is not an option of property '{}'", s, id)
            }
            PropertyValue::MultiSelect(v) => {
                if let Some(bad) = v.iter().find(|s| !def.knows_option(s)) {
                    bail_constraint!("'{}' is not an option of property '{}'", bad, id);
                }
            }
            _ => {}
        }
    }
    Ok(())
}

/// Bring stored values in line with the current property list. Keys of
/// removed properties are dropped; values of retyped properties are coerced
/// or dropped.
pub fn conform_values(config: &[PropertyDef], raw: BTreeMap<String, serde_json::Value>) -> RowProperties {
    raw.into_iter()
        .filter_map(|(id, json)| {
            let def = config.iter().find(|p| p.id == id)?;
            let value: PropertyValue = serde_json::from_value(json).ok()?;
            value.coerce(def.kind).map(|v| (id, v))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Vec<PropertyDef> {
        vec![
            PropertyDef::title(),
            PropertyDef::new("estimate", "Estimate", PropertyType::Number),
            PropertyDef::new("status", "Status", PropertyType::Select)
                .with_options(&["Todo", "Done"]),
        ]
    }

    #[test]
    fn test_value_serializes_as_tagged_union() {
        let json = serde_json::to_value(PropertyValue::Number(3.5)).unwrap();
        assert_eq!(json, serde_json::json!({"type": "number", "value": 3.5}));
    }

    #[test]
    fn test_validate_config_requires_single_text_title() {
        assert!(validate_properties_config(&config()).is_ok());

        let without_title = vec![PropertyDef::new("x", "X", PropertyType::Text)];
        assert!(validate_properties_config(&without_title).is_err());

        let retyped = vec![PropertyDef::new(TITLE_PROPERTY, "Name", PropertyType::Number)];
        assert!(validate_properties_config(&retyped).is_err());

        let duplicated = vec![PropertyDef::title(), PropertyDef::title()];
        assert!(validate_properties_config(&duplicated).is_err());
    }

    #[test]
    fn test_validate_values_checks_type_and_options() {
        let config = config();
        let mut ok = RowProperties::new();
        ok.insert("estimate".into(), PropertyValue::Number(2.0));
        ok.insert("status".into(), PropertyValue::Select("Done".into()));
        assert!(validate_values(&config, &ok).is_ok());

        let mut wrong_type = RowProperties::new();
        wrong_type.insert("estimate".into(), PropertyValue::Text("two".into()));
        assert!(validate_values(&config, &wrong_type).is_err());

        let mut unknown = RowProperties::new();
        unknown.insert("missing".into(), PropertyValue::Checkbox(true));
        assert!(validate_values(&config, &unknown).is_err());

        let mut bad_option = RowProperties::new();
        bad_option.insert("status".into(), PropertyValue::Select("Blocked".into()));
        assert!(validate_values(&config, &bad_option).is_err());
    }

    #[test]
    fn test_conform_drops_removed_and_coerces_retyped() {
        let config = vec![
            PropertyDef::title(),
            PropertyDef::new("estimate", "Estimate", PropertyType::Text),
        ];
        let raw: BTreeMap<String, serde_json::Value> = serde_json::from_value(serde_json::json!({
            "title": {"type": "text", "value": "Row"},
            "estimate": {"type": "number", "value": 4.0},
            "gone": {"type": "checkbox", "value": true},
        }))
        .unwrap();

        let values = conform_values(&config, raw);
        assert_eq!(values.len(), 2);
        assert_eq!(values["estimate"], PropertyValue::Text("4".into()));
        assert!(!values.contains_key("gone"));
    }

    #[test]
    fn test_coerce_without_faithful_conversion() {
        assert_eq!(
            PropertyValue::Text("abc".into()).coerce(PropertyType::Number),
            None
        );
        assert_eq!(
            PropertyValue::Text("12".into()).coerce(PropertyType::Number),
            Some(PropertyValue::Number(12.0))
        );
        assert_eq!(
            PropertyValue::MultiSelect(vec!["a".into(), "b".into()]).coerce(PropertyType::Select),
            None
        );
    }
}
