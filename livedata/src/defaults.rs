//! Fills the gaps of a partially specified live data configuration.

use log::{debug, trace};

use crate::{
    Error, LiveDataConfiguration, LiveDataQuery, PropertyDescriptor, PropertyDescriptorStore,
    SortEntry, Translator,
};

/// The compiled-in default configuration.
const DEFAULT_CONFIGURATION: &str = include_str!("defaults.json");

/// Source parameter holding the prefix of the property name translation keys.
pub const TRANSLATION_PREFIX: &str = "translationPrefix";

/// The type of properties whose type is not known.
pub const DEFAULT_PROPERTY_TYPE: &str = "String";

/// Properties starting with this prefix are internal (e.g. the row actions)
/// and are never picked as the default sort property.
const INTERNAL_PROPERTY_PREFIX: char = '_';

/// Normalizes live data configurations.
///
/// Resolving an already resolved configuration yields the same
/// configuration.
pub struct DefaultConfigurationResolver<'a> {
    defaults: LiveDataConfiguration,
    translator: &'a dyn Translator,
    property_store: &'a dyn PropertyDescriptorStore,
}

impl<'a> DefaultConfigurationResolver<'a> {
    /// Constructor. Loads the compiled-in default configuration.
    pub fn new(
        translator: &'a dyn Translator,
        property_store: &'a dyn PropertyDescriptorStore,
    ) -> Result<Self, Error> {
        Ok(Self {
            defaults: serde_json::from_str(DEFAULT_CONFIGURATION)?,
            translator,
            property_store,
        })
    }

    /// Replaces the compiled-in default configuration.
    pub fn with_defaults(mut self, defaults: LiveDataConfiguration) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn resolve(&self, mut config: LiveDataConfiguration) -> Result<LiveDataConfiguration, Error> {
        self.apply_defaults(&mut config);
        if let Some(query) = config.query.as_mut() {
            resolve_sort(query);
        }
        self.resolve_property_descriptors(&mut config)?;
        Ok(config)
    }

    fn apply_defaults(&self, config: &mut LiveDataConfiguration) {
        let defaults = match &self.defaults.meta {
            Some(meta) => meta,
            None => return,
        };
        let meta = config.meta_mut();
        if let Some(default_pagination) = &defaults.pagination {
            let pagination = meta.pagination.get_or_insert_with(Default::default);
            if pagination.max_shown_pages.is_none() {
                pagination.max_shown_pages = default_pagination.max_shown_pages;
            }
            if pagination.show_page_size_dropdown.is_none() {
                pagination.show_page_size_dropdown = default_pagination.show_page_size_dropdown;
            }
            if pagination.page_sizes.is_none() {
                pagination.page_sizes = default_pagination.page_sizes.clone();
            }
        }
        if let Some(default_entry) = &defaults.entry_descriptor {
            let entry = meta.entry_descriptor.get_or_insert_with(Default::default);
            if entry.id_property.is_none() {
                entry.id_property = default_entry.id_property.clone();
            }
        }
    }

    fn resolve_property_descriptors(&self, config: &mut LiveDataConfiguration) -> Result<(), Error> {
        let (properties, source) = match &config.query {
            Some(query) => (
                query.properties.clone().unwrap_or_default(),
                query.source.clone(),
            ),
            None => (Vec::new(), None),
        };
        let translation_prefix = source
            .as_ref()
            .and_then(|s| s.parameter(TRANSLATION_PREFIX).as_text())
            .map(str::to_string);
        let known = self.property_store.get(source.as_ref())?;

        let descriptors = &mut config.meta_mut().property_descriptors;
        for property in properties {
            if !descriptors.iter().any(|d| d.id == property) {
                trace!("Adding missing descriptor for property {}", property);
                descriptors.push(PropertyDescriptor::new(property));
            }
        }
        for descriptor in known {
            match descriptors.iter().position(|d| d.id == descriptor.id) {
                Some(pos) => descriptors[pos] = descriptor,
                None => descriptors.push(descriptor),
            }
        }
        for descriptor in descriptors.iter_mut() {
            self.complete_descriptor(descriptor, translation_prefix.as_deref());
        }
        Ok(())
    }

    fn complete_descriptor(&self, descriptor: &mut PropertyDescriptor, translation_prefix: Option<&str>) {
        if descriptor.name.is_none() {
            descriptor.name = match translation_prefix {
                // No fallback to the id here: the consumer falls back further.
                Some(prefix) => self.translator.translate(&format!("{}{}", prefix, descriptor.id)),
                None => Some(descriptor.id.clone()),
            };
        }
        if descriptor.property_type.is_none() {
            descriptor.property_type = Some(DEFAULT_PROPERTY_TYPE.to_string());
        }
    }
}

// Sort entries without a property get the first non-internal property, if
// any. Entries that cannot be resolved are dropped.
fn resolve_sort(query: &mut LiveDataQuery) {
    let declared = query.properties.as_deref().unwrap_or(&[]);
    let mut candidate = declared
        .iter()
        .find(|p| !p.starts_with(INTERNAL_PROPERTY_PREFIX))
        .cloned();
    let entries = match query.sort.take() {
        Some(entries) if !entries.is_empty() => entries,
        unsorted => {
            query.sort = if declared.is_empty() {
                unsorted
            } else {
                debug!("Defaulting sort to {:?}", candidate);
                candidate.map(|p| vec![SortEntry::new(p, false)])
            };
            return;
        }
    };
    let resolved = entries
        .into_iter()
        .filter_map(|entry| match entry.property {
            Some(_) => Some(entry),
            None => candidate.take().map(|p| SortEntry::new(p, entry.descending)),
        })
        .collect::<Vec<SortEntry>>();
    query.sort = if resolved.is_empty() {
        None
    } else {
        Some(resolved)
    };
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{MapTranslator, Source};
    use serde_json::json;

    fn resolve_with(
        config: serde_json::Value,
        translator: &MapTranslator,
        store: &Vec<PropertyDescriptor>,
    ) -> LiveDataConfiguration {
        let resolver = DefaultConfigurationResolver::new(translator, store).unwrap();
        resolver.resolve(serde_json::from_value(config).unwrap()).unwrap()
    }

    fn resolve(config: serde_json::Value) -> LiveDataConfiguration {
        resolve_with(config, &MapTranslator::default(), &Vec::new())
    }

    fn sort_of(config: &LiveDataConfiguration) -> Option<Vec<SortEntry>> {
        config.query.as_ref().unwrap().sort.clone()
    }

    #[test]
    fn default_sort_skips_internal_properties() {
        let config = resolve(json!({"query": {"properties": ["_alice", "carol"]}}));
        assert_eq!(sort_of(&config), Some(vec![SortEntry::new("carol", false)]));

        let config = resolve(json!({"query": {"properties": ["_alice", "bob", "carol"]}}));
        assert_eq!(sort_of(&config), Some(vec![SortEntry::new("bob", false)]));

        let config = resolve(json!({"query": {"properties": ["_alice", "_bob"]}}));
        assert_eq!(sort_of(&config), None);
    }

    #[test]
    fn default_sort_keeps_direction() {
        let config = resolve(json!({
            "query": {
                "properties": ["_actions", "doc.date"],
                "sort": [{"descending": true}],
            }
        }));
        assert_eq!(sort_of(&config), Some(vec![SortEntry::new("doc.date", true)]));

        let config = resolve(json!({
            "query": {"properties": ["_actions"], "sort": [{"descending": true}]}
        }));
        assert_eq!(sort_of(&config), None);
    }

    #[test]
    fn explicit_sort_is_kept() {
        let config = resolve(json!({
            "query": {
                "properties": ["doc.title", "doc.date"],
                "sort": [{"property": "doc.date", "descending": true}],
            }
        }));
        assert_eq!(sort_of(&config), Some(vec![SortEntry::new("doc.date", true)]));
    }

    #[test]
    fn missing_descriptors_are_synthesized() {
        let config = resolve(json!({
            "query": {"properties": ["doc.title", "doc.date"]},
            "meta": {"propertyDescriptors": [{"id": "doc.date", "name": "Date", "type": "Date"}]},
        }));
        let descriptors = &config.meta.as_ref().unwrap().property_descriptors;
        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[0].id, "doc.date");
        assert_eq!(descriptors[0].property_type.as_deref(), Some("Date"));
        assert_eq!(descriptors[1].id, "doc.title");
        assert_eq!(descriptors[1].name.as_deref(), Some("doc.title"));
        assert_eq!(descriptors[1].property_type.as_deref(), Some("String"));
    }

    #[test]
    fn name_translation_only_when_name_is_missing() {
        let translator = MapTranslator::default()
            .with("blog.title", "Title")
            .with("blog.author", "Author");
        let config = resolve_with(
            json!({
                "query": {
                    "properties": ["title", "author", "date"],
                    "source": {"id": "liveTable", "parameters": {"translationPrefix": "blog."}},
                },
                "meta": {"propertyDescriptors": [{"id": "author", "name": "Written by"}]},
            }),
            &translator,
            &Vec::new(),
        );
        let meta = config.meta.unwrap();
        assert_eq!(
            meta.property_descriptor("author").unwrap().name.as_deref(),
            Some("Written by")
        );
        assert_eq!(
            meta.property_descriptor("title").unwrap().name.as_deref(),
            Some("Title")
        );
        // No translation: left for the consumer to fall back on.
        assert_eq!(meta.property_descriptor("date").unwrap().name, None);
    }

    #[test]
    fn store_descriptors_replace_and_append() {
        let store = vec![
            PropertyDescriptor {
                property_type: Some("Date".to_string()),
                ..PropertyDescriptor::new("date")
            },
            PropertyDescriptor::new("category"),
        ];
        let config = resolve_with(
            json!({
                "query": {"properties": ["title", "date"]},
                "meta": {"propertyDescriptors": [
                    {"id": "date", "name": "When", "sortable": false},
                    {"id": "title"},
                ]},
            }),
            &MapTranslator::default(),
            &store,
        );
        let descriptors = config.meta.unwrap().property_descriptors;
        let ids = descriptors.iter().map(|d| d.id.as_str()).collect::<Vec<&str>>();
        assert_eq!(ids, vec!["date", "title", "category"]);
        assert_eq!(descriptors[0].name.as_deref(), Some("date"));
        assert_eq!(descriptors[0].sortable, None);
        assert_eq!(descriptors[0].property_type.as_deref(), Some("Date"));
        assert_eq!(descriptors[2].name.as_deref(), Some("category"));
    }

    #[test]
    fn compiled_in_defaults_fill_meta() {
        let config = resolve(json!({
            "meta": {"pagination": {"maxShownPages": 3}},
        }));
        let meta = config.meta.unwrap();
        let pagination = meta.pagination.unwrap();
        assert_eq!(pagination.max_shown_pages, Some(3));
        assert_eq!(pagination.show_page_size_dropdown, Some(true));
        assert_eq!(pagination.page_sizes, Some(vec![15, 25, 50, 100]));
        assert_eq!(
            meta.entry_descriptor.unwrap().id_property.as_deref(),
            Some("doc.fullName")
        );
    }

    #[test]
    fn replaced_defaults() {
        let translator = MapTranslator::default();
        let store: Vec<PropertyDescriptor> = Vec::new();
        let defaults: LiveDataConfiguration = serde_json::from_value(json!({
            "meta": {"pagination": {"maxShownPages": 5, "pageSizes": [10, 20]}},
        }))
        .unwrap();
        let resolver = DefaultConfigurationResolver::new(&translator, &store)
            .unwrap()
            .with_defaults(defaults);
        let meta = resolver
            .resolve(LiveDataConfiguration::default())
            .unwrap()
            .meta
            .unwrap();
        let pagination = meta.pagination.unwrap();
        assert_eq!(pagination.max_shown_pages, Some(5));
        assert_eq!(pagination.show_page_size_dropdown, None);
        assert_eq!(pagination.page_sizes, Some(vec![10, 20]));
        assert_eq!(meta.entry_descriptor, None);
    }

    #[test]
    fn resolving_twice_changes_nothing() {
        let translator = MapTranslator::default().with("p.bob", "Bob");
        let store = vec![PropertyDescriptor::new("extra")];
        let mut source = Source::new("liveTable");
        source.set_parameter(TRANSLATION_PREFIX, "p.");
        let config = LiveDataConfiguration {
            query: Some(LiveDataQuery {
                properties: Some(vec!["_alice".into(), "bob".into(), "carol".into()]),
                source: Some(source),
                sort: Some(vec![SortEntry::default()]),
                ..Default::default()
            }),
            ..Default::default()
        };
        let resolver = DefaultConfigurationResolver::new(&translator, &store).unwrap();
        let once = resolver.resolve(config).unwrap();
        let twice = resolver.resolve(once.clone()).unwrap();
        assert_eq!(once, twice);
        assert_eq!(sort_of(&once), Some(vec![SortEntry::new("bob", false)]));
    }
}
