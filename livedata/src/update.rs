//! Applies property updates coming from live data back onto documents.

use log::{debug, warn};
use serde_json::Value;

use crate::value::{stringify, JsonMap};
use crate::{Authorization, Document, DocumentStore, Error, HtmlConverter, Right};

/// The key listing the fields whose value is HTML that must be converted to
/// the document syntax before being applied.
pub const HTML_CONVERSION_KEY: &str = "RequiresHTMLConversion";

const DOCUMENT_PROPERTY_PREFIX: &str = "doc.";
// Part of every entry, but not something that can be updated.
const FULL_NAME_PROPERTY: &str = "fullName";
const SYNTAX_SUFFIX: &str = "_syntax";
const CACHE_SUFFIX: &str = "_cache";
const SAVE_COMMENT: &str = "Update from live data";

/// The object whose properties are updated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectTarget<'t> {
    pub class_name: &'t str,
    pub index: usize,
}

impl<'t> ObjectTarget<'t> {
    /// The first object of the given class.
    pub fn first(class_name: &'t str) -> Self {
        Self {
            class_name,
            index: 0,
        }
    }
}

pub struct EntryUpdater<'a> {
    authorization: &'a dyn Authorization,
    documents: &'a dyn DocumentStore,
    html_converter: &'a dyn HtmlConverter,
    html_conversion_key: String,
}

impl<'a> EntryUpdater<'a> {
    pub fn new(
        authorization: &'a dyn Authorization,
        documents: &'a dyn DocumentStore,
        html_converter: &'a dyn HtmlConverter,
    ) -> Self {
        Self {
            authorization,
            documents,
            html_converter,
            html_conversion_key: HTML_CONVERSION_KEY.to_string(),
        }
    }

    pub fn with_html_conversion_key<K: Into<String>>(mut self, key: K) -> Self {
        self.html_conversion_key = key.into();
        self
    }

    /// Updates a single property, returning its previous value if it
    /// changed. Fails if the targeted object property does not exist.
    pub fn update(
        &self,
        reference: &str,
        object: Option<ObjectTarget>,
        property: &str,
        value: Value,
    ) -> Result<Option<Value>, Error> {
        let mut document = self.load(reference)?;
        let previous = match apply(&mut document, object, property, value)? {
            Applied::Changed(previous) => Some(previous),
            Applied::Unchanged => None,
            Applied::NotFound(err) => return Err(err),
        };
        self.save(&mut document)?;
        Ok(previous)
    }

    /// Updates several properties at once, returning the previous values of
    /// those that changed. Properties that cannot be found are skipped.
    pub fn update_all(
        &self,
        reference: &str,
        object: Option<ObjectTarget>,
        values: JsonMap,
    ) -> Result<JsonMap, Error> {
        let mut document = self.load(reference)?;
        let values = self.convert_html(&document, values)?;
        let mut previous_values = JsonMap::new();
        for (property, value) in values {
            match apply(&mut document, object, &property, value)? {
                Applied::Changed(previous) => {
                    previous_values.insert(property, previous);
                }
                Applied::Unchanged => {}
                Applied::NotFound(err) => warn!("Skipping update: {}", err),
            }
        }
        self.save(&mut document)?;
        Ok(previous_values)
    }

    fn load(&self, reference: &str) -> Result<Document, Error> {
        self.authorization.check_access(Right::Edit, reference)?;
        let document = self.documents.load(reference)?;
        if document.is_new() {
            return Err(Error::DocumentNotFound(reference.to_string()));
        }
        Ok(document)
    }

    fn save(&self, document: &mut Document) -> Result<(), Error> {
        if !document.is_dirty() {
            debug!("Nothing changed in {}, not saving", document.reference());
            return Ok(());
        }
        if !self.documents.validate(document) {
            return Err(Error::NotValidated(document.reference().to_string()));
        }
        self.documents.save(document, SAVE_COMMENT)?;
        document.clear_dirty();
        Ok(())
    }

    // Converts the listed HTML fields and strips the conversion markers.
    fn convert_html(&self, document: &Document, mut values: JsonMap) -> Result<JsonMap, Error> {
        let fields = match values.remove(&self.html_conversion_key) {
            Some(Value::Array(items)) => items.iter().filter_map(stringify).collect(),
            Some(other) => stringify(&other).into_iter().collect::<Vec<String>>(),
            None => return Ok(values),
        };
        for field in fields {
            let syntax = values
                .remove(&format!("{}{}", field, SYNTAX_SUFFIX))
                .as_ref()
                .and_then(stringify)
                .unwrap_or_else(|| document.syntax().to_string());
            values.remove(&format!("{}{}", field, CACHE_SUFFIX));
            let html = match values.get(&field).and_then(stringify) {
                Some(html) => html,
                None => continue,
            };
            debug!("Converting HTML of {} to {}", field, syntax);
            let converted = self.html_converter.from_html(&html, &syntax)?;
            values.insert(field, Value::String(converted));
        }
        Ok(values)
    }
}

enum Applied {
    Changed(Value),
    Unchanged,
    NotFound(Error),
}

fn apply(
    document: &mut Document,
    object: Option<ObjectTarget>,
    property: &str,
    value: Value,
) -> Result<Applied, Error> {
    if let Some(field) = property.strip_prefix(DOCUMENT_PROPERTY_PREFIX) {
        return Ok(apply_document_field(document, field, &value));
    }
    let object = match object {
        Some(object) => object,
        None => return Ok(Applied::NotFound(Error::MissingClassName(property.to_string()))),
    };
    let value = match value {
        Value::Array(items) => Value::Array(
            items
                .iter()
                .filter_map(stringify)
                .map(Value::String)
                .collect(),
        ),
        other => other,
    };
    match document.set_object_field(object.class_name, object.index, property, value.clone()) {
        Some(previous) if previous != value => Ok(Applied::Changed(previous)),
        Some(_) => Ok(Applied::Unchanged),
        None => Ok(Applied::NotFound(Error::ObjectPropertyNotFound {
            reference: document.reference().to_string(),
            class_name: object.class_name.to_string(),
            index: object.index,
            property: property.to_string(),
        })),
    }
}

fn apply_document_field(document: &mut Document, field: &str, value: &Value) -> Applied {
    let text = stringify(value).unwrap_or_default();
    let previous = match field {
        "hidden" => {
            let hidden = match value {
                Value::Bool(b) => *b,
                _ => text.eq_ignore_ascii_case("true"),
            };
            let previous = document.is_hidden();
            document.set_hidden(hidden);
            (previous != hidden).then(|| Value::Bool(previous))
        }
        "title" => {
            let previous = document.title().to_string();
            document.set_title(text.as_str());
            (previous != text).then(|| Value::String(previous))
        }
        "content" => {
            let previous = document.content().to_string();
            document.set_content(text.as_str());
            (previous != text).then(|| Value::String(previous))
        }
        FULL_NAME_PROPERTY => None,
        _ => {
            warn!(
                "Ignoring unsupported document property {}{}",
                DOCUMENT_PROPERTY_PREFIX, field
            );
            None
        }
    };
    match previous {
        Some(previous) => Applied::Changed(previous),
        None => Applied::Unchanged,
    }
}
