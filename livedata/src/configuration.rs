//! The generic live data configuration and the metadata describing its
//! properties.

use serde::{Deserialize, Serialize};

use crate::value::JsonMap;
use crate::LiveDataQuery;

/// Everything a live data widget needs: what to fetch and how to display it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LiveDataConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<LiveDataQuery>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<LiveDataMeta>,
}

impl LiveDataConfiguration {
    pub fn meta_mut(&mut self) -> &mut LiveDataMeta {
        self.meta.get_or_insert_with(Default::default)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveDataMeta {
    /// Kept in declaration order; ids are unique.
    #[serde(default)]
    pub property_descriptors: Vec<PropertyDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationConfiguration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_descriptor: Option<EntryDescriptor>,
}

impl LiveDataMeta {
    pub fn property_descriptor(&self, id: &str) -> Option<&PropertyDescriptor> {
        self.property_descriptors.iter().find(|d| d.id == id)
    }
}

/// Metadata about a single property (column).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDescriptor {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub property_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sortable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filterable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub displayer: Option<DisplayerDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<FilterDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style_name: Option<String>,
}

impl PropertyDescriptor {
    /// A descriptor with nothing but its id set.
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }
}

/// Selects how the values of a property are rendered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayerDescriptor {
    pub id: String,
    #[serde(flatten)]
    pub parameters: JsonMap,
}

impl DisplayerDescriptor {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self {
            id: id.into(),
            parameters: JsonMap::new(),
        }
    }
}

/// Selects how a property is filtered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_operator: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub operators: Vec<OperatorDescriptor>,
    #[serde(flatten)]
    pub parameters: JsonMap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorDescriptor {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_shown_pages: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_page_size_dropdown: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_sizes: Option<Vec<u32>>,
}

/// Describes the entries themselves, most notably which property identifies
/// them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_property: Option<String>,
}
