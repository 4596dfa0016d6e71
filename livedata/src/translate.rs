//! Translation of legacy live table configurations into live data
//! configurations.

use std::borrow::Cow;
use std::collections::BTreeMap;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use url::Url;

use crate::value::{scalar_or_list, stringify, JsonMap, Node};
use crate::{
    ClassRepository, Constraint, DefaultConfigurationResolver, DisplayerDescriptor, Error, Filter,
    FilterDescriptor, LiveDataConfiguration, LiveDataMeta, LiveDataQuery, PropertyDescriptor,
    ReferenceResolver, SortEntry, Source,
};

/// The id of the live data source backed by the live table results pages.
pub const LIVE_TABLE_SOURCE: &str = "liveTable";

/// Legacy match types and the live data filter operators they stand for.
pub(crate) const MATCH_OPERATORS: &[(&str, &str)] = &[
    ("exact", "equals"),
    ("partial", "contains"),
    ("prefix", "startsWith"),
];

// Global options copied verbatim into the source parameters.
const SOURCE_OPTIONS: &[&str] = &["className", "resultPage", "translationPrefix"];

// Relative live table URLs are resolved against this base.
const URL_BASE: &str = "http://localhost/";

/// The configuration of a legacy live table: its columns, the properties of
/// each column and the global options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveTableConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub column_properties: JsonMap,
    #[serde(default)]
    pub options: JsonMap,
}

/// Converts live table configurations into resolved live data
/// configurations.
pub struct LiveTableConfigurationResolver<'a> {
    classes: &'a dyn ClassRepository,
    references: &'a dyn ReferenceResolver,
    defaults: &'a DefaultConfigurationResolver<'a>,
}

impl<'a> LiveTableConfigurationResolver<'a> {
    pub fn new(
        classes: &'a dyn ClassRepository,
        references: &'a dyn ReferenceResolver,
        defaults: &'a DefaultConfigurationResolver<'a>,
    ) -> Self {
        Self {
            classes,
            references,
            defaults,
        }
    }

    pub fn resolve(&self, live_table: &LiveTableConfiguration) -> Result<LiveDataConfiguration, Error> {
        let config = LiveDataConfiguration {
            id: live_table.id.clone(),
            query: Some(self.build_query(live_table)),
            meta: Some(LiveDataMeta {
                property_descriptors: self.build_property_descriptors(live_table),
                ..Default::default()
            }),
        };
        self.defaults.resolve(config)
    }

    fn build_query(&self, live_table: &LiveTableConfiguration) -> LiveDataQuery {
        let options = &live_table.options;
        let mut source = Source::new(LIVE_TABLE_SOURCE);
        for key in SOURCE_OPTIONS {
            if let Some(value) = Node::get(options, key).as_text() {
                source.set_parameter(*key, value);
            }
        }
        match Node::get(options, "queryFilters") {
            Node::Text(filters) => {
                source.set_parameter("queryFilters", filters);
            }
            Node::Array(filters) => {
                let joined = filters
                    .iter()
                    .filter_map(stringify)
                    .collect::<Vec<String>>()
                    .join(",");
                source.set_parameter("queryFilters", joined);
            }
            _ => {}
        }
        if let Some(url) = Node::get(options, "url").as_text() {
            match self.source_parameters_from_url(url) {
                Ok(parameters) => source.parameters.extend(parameters),
                Err(e) => warn!(
                    "Failed to extract the source parameters from the live table URL [{}]. Root cause: {}",
                    url, e
                ),
            }
        }

        let mut query = LiveDataQuery {
            properties: Some(live_table.columns.clone()),
            source: Some(source),
            ..Default::default()
        };
        if let Some(extra) = Node::get(options, "extraParams").as_text() {
            if let Err(e) = add_extra_params(&mut query, extra) {
                warn!(
                    "Failed to parse the live table extra parameters [{}]. Root cause: {}",
                    extra, e
                );
            }
        }

        let selected_column = Node::get(options, "selectedColumn").as_text();
        let default_order = Node::get(options, "defaultOrder").as_text();
        if selected_column.is_some() || default_order.is_some() {
            query.sort = Some(vec![SortEntry {
                property: selected_column.map(str::to_string),
                descending: default_order == Some("desc"),
            }]);
        }
        query.limit = Node::get(options, "rowCount").as_u64();
        query
    }

    // The live table results are often produced by a template (the `xpage`)
    // rendered in the context of the document targeted by the URL.
    fn source_parameters_from_url(&self, raw: &str) -> Result<JsonMap, Error> {
        let url = parse_url(raw)?;
        let mut grouped = group_pairs(url.query_pairs());
        let mut parameters = JsonMap::new();
        let xpage = grouped
            .iter()
            .position(|(key, _)| key == "xpage")
            .map(|pos| grouped.remove(pos).1);
        let template = xpage
            .and_then(|values| values.into_iter().next())
            .filter(|xpage| !xpage.is_empty() && xpage != "plain");
        if let Some(template) = template {
            let reference = self.references.resolve(url.path())?;
            debug!("Live table results template {}.vm for document {}", template, reference);
            parameters.insert("template".to_string(), json!(format!("{}.vm", template)));
            parameters.insert("$doc".to_string(), json!(reference));
        }
        for (key, values) in grouped {
            parameters.insert(key, scalar_or_list(values));
        }
        Ok(parameters)
    }

    fn build_property_descriptors(&self, live_table: &LiveTableConfiguration) -> Vec<PropertyDescriptor> {
        let no_properties = JsonMap::new();
        live_table
            .columns
            .iter()
            .map(|id| {
                let column = Column {
                    id,
                    properties: Node::get(&live_table.column_properties, id)
                        .as_object()
                        .unwrap_or(&no_properties),
                    options: &live_table.options,
                };
                self.build_property_descriptor(&column)
            })
            .collect()
    }

    fn build_property_descriptor(&self, column: &Column<'_>) -> PropertyDescriptor {
        // Action columns can be neither sorted nor filtered unless asked.
        let default_capability = !has_actions(column);
        PropertyDescriptor {
            name: column.get("displayName").as_text().map(str::to_string),
            property_type: self.property_type(column),
            sortable: Some(column.get("sortable").as_bool().unwrap_or(default_capability)),
            filterable: Some(column.get("filterable").as_bool().unwrap_or(default_capability)),
            visible: Some(column.column_type() != Some("hidden")),
            displayer: DISPLAYER_RULES
                .iter()
                .find(|(applies, _)| applies(column))
                .map(|(_, build)| build(column)),
            filter: build_filter(column),
            style_name: column.get("headerClass").as_text().map(str::to_string),
            ..PropertyDescriptor::new(column.id)
        }
    }

    fn property_type(&self, column: &Column<'_>) -> Option<String> {
        let class_name = column
            .get("class")
            .as_text()
            .or_else(|| column.class_name())?;
        self.classes.property_type(class_name, column.id)
    }
}

/// A live table column seen together with the global options.
struct Column<'c> {
    id: &'c str,
    properties: &'c JsonMap,
    options: &'c JsonMap,
}

impl<'c> Column<'c> {
    fn get(&self, key: &str) -> Node<'c> {
        Node::get(self.properties, key)
    }

    fn column_type(&self) -> Option<&'c str> {
        self.get("type").as_text()
    }

    fn class_name(&self) -> Option<&'c str> {
        Node::get(self.options, "className").as_text()
    }
}

type Rule = (fn(&Column<'_>) -> bool, fn(&Column<'_>) -> DisplayerDescriptor);

// Evaluated in order, the first applicable rule wins.
const DISPLAYER_RULES: &[Rule] = &[
    (has_actions, actions_displayer),
    (has_link, link_displayer),
    (is_html, html_displayer),
    (is_list, html_displayer),
];

fn has_actions(column: &Column<'_>) -> bool {
    column.get("actions").as_array().is_some()
}

fn has_link(column: &Column<'_>) -> bool {
    column.get("link").as_text().is_some()
}

fn is_html(column: &Column<'_>) -> bool {
    column.get("html").as_bool() == Some(true)
}

fn is_list(column: &Column<'_>) -> bool {
    column.column_type() == Some("list")
}

fn actions_displayer(column: &Column<'_>) -> DisplayerDescriptor {
    let actions = column.get("actions").as_array().unwrap_or(&[]).to_vec();
    let mut displayer = DisplayerDescriptor::new("actions");
    displayer
        .parameters
        .insert("actions".to_string(), Value::Array(actions));
    displayer
}

fn link_displayer(column: &Column<'_>) -> DisplayerDescriptor {
    let own_url = format!("{}_url", column.id);
    let targets = match column.get("link").as_text().unwrap_or_default() {
        "auto" => vec![own_url, "doc.url".to_string()],
        "field" => vec![own_url],
        other => vec![format!("doc.{}_url", other), "doc.url".to_string()],
    };
    let mut displayer = DisplayerDescriptor::new("link");
    displayer
        .parameters
        .insert("propertyHref".to_string(), json!(targets));
    displayer.parameters.insert(
        "html".to_string(),
        json!(column.get("html").as_bool().unwrap_or(false)),
    );
    displayer
}

// Rich content of an object property is rendered by the object itself when
// the class is known.
fn html_displayer(column: &Column<'_>) -> DisplayerDescriptor {
    if is_html(column) && column.class_name().is_some() {
        DisplayerDescriptor::new("xObjectProperty")
    } else {
        DisplayerDescriptor::new("html")
    }
}

fn build_filter(column: &Column<'_>) -> Option<FilterDescriptor> {
    let id = column.column_type().filter(|t| *t != "hidden");
    let default_operator = column.get("match").as_text().and_then(|match_type| {
        MATCH_OPERATORS
            .iter()
            .find(|(legacy, _)| *legacy == match_type)
            .map(|(_, operator)| *operator)
    });
    if id.is_none() && default_operator.is_none() {
        return None;
    }
    let mut filter = FilterDescriptor {
        id: id.map(str::to_string),
        default_operator: default_operator.map(str::to_string),
        ..Default::default()
    };
    if let Some(date_format) = column.get("dateFormat").as_text() {
        filter
            .parameters
            .insert("dateFormat".to_string(), json!(date_format));
    }
    Some(filter)
}

// Extra parameters naming a declared property become filters, the others
// are handed to the source.
fn add_extra_params(query: &mut LiveDataQuery, extra: &str) -> Result<(), Error> {
    let raw = format!("{}?{}", URL_BASE, extra.trim_start_matches(&['?', '&'][..]));
    let url = parse_url(&raw)?;
    for (key, values) in group_pairs(url.query_pairs()) {
        if query.declares(&key) {
            let constraints = values.into_iter().map(Constraint::value).collect();
            query.filters.push(Filter::new(key, false, constraints));
        } else {
            query
                .source
                .get_or_insert_with(|| Source::new(LIVE_TABLE_SOURCE))
                .set_parameter(key, scalar_or_list(values));
        }
    }
    Ok(())
}

fn parse_url(raw: &str) -> Result<Url, Error> {
    let base = Url::parse(URL_BASE).map_err(|e| Error::InvalidUrl(URL_BASE.to_string(), e))?;
    Url::options()
        .base_url(Some(&base))
        .parse(raw)
        .map_err(|e| Error::InvalidUrl(raw.to_string(), e))
}

// Groups repeated query string keys, keeping the order of first appearance.
fn group_pairs<'u, I>(pairs: I) -> Vec<(String, Vec<String>)>
where
    I: Iterator<Item = (Cow<'u, str>, Cow<'u, str>)>,
{
    let mut grouped: Vec<(String, Vec<String>)> = Vec::new();
    let mut positions: BTreeMap<String, usize> = BTreeMap::new();
    for (key, value) in pairs {
        if key.is_empty() {
            continue;
        }
        match positions.get(&*key) {
            Some(&pos) => grouped[pos].1.push(value.into_owned()),
            None => {
                positions.insert(key.to_string(), grouped.len());
                grouped.push((key.into_owned(), vec![value.into_owned()]));
            }
        }
    }
    grouped
}
