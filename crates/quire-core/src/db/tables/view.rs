//! View display state and its in-memory evaluation

use super::types::{DatabaseRow, PropertyDef, PropertyType, PropertyValue};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewLayout {
    #[default]
    Table,
    Board,
    List,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    GreaterThan,
    LessThan,
    IsEmpty,
    IsNotEmpty,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterRule {
    pub property: String,
    pub operator: FilterOperator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<PropertyValue>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortRule {
    pub property: String,
    #[serde(default)]
    pub direction: SortDirection,
}

/// Display state of one view
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewState {
    pub id: String,
    pub name: String,
    pub layout: ViewLayout,
    pub filters: Vec<FilterRule>,
    pub sorts: Vec<SortRule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_by: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub hidden: Vec<String>,
}

/// All views of a database and the one currently shown
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_view: Option<String>,
    pub views: Vec<ViewState>,
}

impl ViewConfig {
    pub fn selected(&self) -> Option<&ViewState> {
        match &self.selected_view {
            Some(id) => self.views.iter().find(|v| &v.id == id),
            None => self.views.first(),
        }
    }

    /// Remove every reference to `property_id`; returns whether anything changed
    pub fn prune_property(&mut self, property_id: &str) -> bool {
        let mut changed = false;
        for view in &mut self.views {
            let before = (view.filters.len(), view.sorts.len(), view.hidden.len());
            view.filters.retain(|f| f.property != property_id);
            view.sorts.retain(|s| s.property != property_id);
            view.hidden.retain(|h| h != property_id);
            if view.group_by.as_deref() == Some(property_id) {
                view.group_by = None;
                changed = true;
            }
            changed |= before != (view.filters.len(), view.sorts.len(), view.hidden.len());
        }
        changed
    }
}

impl ViewState {
    /// Filter and sort `rows` as this view displays them.
    ///
    /// All filters must match. Rules naming a property that no longer exists
    /// are ignored. Rows without a sort key go last; ties keep manual order.
    pub fn apply(&self, config: &[PropertyDef], mut rows: Vec<DatabaseRow>) -> Vec<DatabaseRow> {
        rows.retain(|row| {
            self.filters.iter().all(|rule| {
                match config.iter().find(|p| p.id == rule.property) {
                    Some(def) => matches_rule(rule, def, row.value(&def.id)),
                    None => true,
                }
            })
        });

        let sorts: Vec<(&SortRule, PropertyType)> = self
            .sorts
            .iter()
            .filter_map(|s| {
                config
                    .iter()
                    .find(|p| p.id == s.property)
                    .map(|p| (s, p.kind))
            })
            .collect();

        rows.sort_by(|a, b| {
            for (rule, kind) in &sorts {
                let ord = match (a.value(&rule.property), b.value(&rule.property)) {
                    (Some(x), Some(y)) => {
                        let ord = compare_values(*kind, x, y);
                        match rule.direction {
                            SortDirection::Ascending => ord,
                            SortDirection::Descending => ord.reverse(),
                        }
                    }
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            a.order_index.cmp(&b.order_index)
        });

        rows
    }
}

fn compare_values(kind: PropertyType, a: &PropertyValue, b: &PropertyValue) -> Ordering {
    match (kind, a, b) {
        (PropertyType::Number, PropertyValue::Number(x), PropertyValue::Number(y)) => {
            x.partial_cmp(y).unwrap_or(Ordering::Equal)
        }
        (PropertyType::Date, PropertyValue::Date(x), PropertyValue::Date(y)) => x.cmp(y),
        (PropertyType::Checkbox, PropertyValue::Checkbox(x), PropertyValue::Checkbox(y)) => {
            x.cmp(y)
        }
        _ => a.as_text().to_lowercase().cmp(&b.as_text().to_lowercase()),
    }
}

fn matches_rule(rule: &FilterRule, def: &PropertyDef, value: Option<&PropertyValue>) -> bool {
    let empty = match value {
        Some(v) => v.is_empty(),
        None => true,
    };
    match rule.operator {
        FilterOperator::IsEmpty => return empty,
        FilterOperator::IsNotEmpty => return !empty,
        _ => {}
    }

    let Some(expected) = rule.value.clone().and_then(|v| v.coerce(def.kind)) else {
        // A comparison without an operand filters nothing
        return true;
    };

    match rule.operator {
        FilterOperator::Equals => value == Some(&expected),
        FilterOperator::NotEquals => value != Some(&expected),
        FilterOperator::Contains => value.is_some_and(|v| contains(v, &expected)),
        FilterOperator::NotContains => !value.is_some_and(|v| contains(v, &expected)),
        FilterOperator::GreaterThan => {
            value.is_some_and(|v| compare_values(def.kind, v, &expected) == Ordering::Greater)
        }
        FilterOperator::LessThan => {
            value.is_some_and(|v| compare_values(def.kind, v, &expected) == Ordering::Less)
        }
        FilterOperator::IsEmpty => empty,
        FilterOperator::IsNotEmpty => !empty,
    }
}

fn contains(value: &PropertyValue, needle: &PropertyValue) -> bool {
    match (value, needle) {
        (PropertyValue::MultiSelect(items), PropertyValue::MultiSelect(wanted)) => {
            wanted.iter().all(|w| items.contains(w))
        }
        _ => value
            .as_text()
            .to_lowercase()
            .contains(&needle.as_text().to_lowercase()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tables::types::RowProperties;
    use chrono::Utc;

    fn row(order: i64, title: &str, estimate: Option<f64>) -> DatabaseRow {
        let mut properties = RowProperties::new();
        properties.insert("title".into(), PropertyValue::Text(title.into()));
        if let Some(e) = estimate {
            properties.insert("estimate".into(), PropertyValue::Number(e));
        }
        DatabaseRow {
            id: format!("r{}", order),
            database_id: "db".into(),
            properties,
            order_index: order,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn config() -> Vec<PropertyDef> {
        vec![
            PropertyDef::title(),
            PropertyDef::new("estimate", "Estimate", PropertyType::Number),
        ]
    }

    #[test]
    fn test_sort_numbers_not_text() {
        let view = ViewState {
            sorts: vec![SortRule {
                property: "estimate".into(),
                direction: SortDirection::Descending,
            }],
            ..Default::default()
        };
        let rows = vec![row(0, "a", Some(9.0)), row(1, "b", None), row(2, "c", Some(10.0))];

        let out = view.apply(&config(), rows);
        let titles: Vec<_> = out.iter().map(|r| r.value("title").unwrap().as_text()).collect();
        assert_eq!(titles, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_filters_are_anded_and_unknown_ignored() {
        let view = ViewState {
            filters: vec![
                FilterRule {
                    property: "estimate".into(),
                    operator: FilterOperator::GreaterThan,
                    value: Some(PropertyValue::Number(1.0)),
                },
                FilterRule {
                    property: "title".into(),
                    operator: FilterOperator::Contains,
                    value: Some(PropertyValue::Text("AL".into())),
                },
                FilterRule {
                    property: "deleted".into(),
                    operator: FilterOperator::IsNotEmpty,
                    value: None,
                },
            ],
            ..Default::default()
        };
        let rows = vec![
            row(0, "alpha", Some(5.0)),
            row(1, "alps", Some(0.5)),
            row(2, "beta", Some(5.0)),
        ];

        let out = view.apply(&config(), rows);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "r0");
    }

    #[test]
    fn test_prune_property_clears_references() {
        let mut config = ViewConfig {
            selected_view: Some("v".into()),
            views: vec![ViewState {
                id: "v".into(),
                filters: vec![FilterRule {
                    property: "estimate".into(),
                    operator: FilterOperator::IsEmpty,
                    value: None,
                }],
                sorts: vec![SortRule {
                    property: "title".into(),
                    direction: SortDirection::Ascending,
                }],
                group_by: Some("estimate".into()),
                ..Default::default()
            }],
        };

        assert!(config.prune_property("estimate"));
        let view = config.selected().unwrap();
        assert!(view.filters.is_empty());
        assert_eq!(view.sorts.len(), 1);
        assert_eq!(view.group_by, None);
        assert!(!config.prune_property("estimate"));
    }
}
