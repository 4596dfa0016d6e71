//! The narrow interfaces through which the bridge reaches the hosting wiki,
//! plus simple implementations of the ones a standalone tool needs.

use std::collections::BTreeMap;

use log::debug;
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};

use crate::context::RequestContext;
use crate::{Document, Error, PropertyDescriptor, Source};

/// Access rights that are checked before touching a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Right {
    View,
    Edit,
}

impl std::fmt::Display for Right {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::View => "view",
                Self::Edit => "edit",
            }
        )
    }
}

pub trait Authorization {
    /// Whether the current user holds `right` on the referenced document.
    fn has_access(&self, right: Right, reference: &str) -> bool;

    /// Fails with [`Error::AccessDenied`] unless the right is held.
    fn check_access(&self, right: Right, reference: &str) -> Result<(), Error> {
        if self.has_access(right, reference) {
            Ok(())
        } else {
            Err(Error::AccessDenied {
                right,
                reference: reference.to_string(),
            })
        }
    }
}

/// Grants every right. Suitable for offline tooling only.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

impl Authorization for AllowAll {
    fn has_access(&self, _: Right, _: &str) -> bool {
        true
    }
}

pub trait DocumentStore {
    /// Loads a document. Documents that do not exist yet are returned with
    /// [`Document::is_new`] set.
    fn load(&self, reference: &str) -> Result<Document, Error>;

    /// Runs the document's validation rules.
    fn validate(&self, document: &Document) -> bool;

    fn save(&self, document: &Document, comment: &str) -> Result<(), Error>;
}

pub trait Translator {
    fn translate(&self, key: &str) -> Option<String>;
}

/// Translations held in memory, keyed by translation key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MapTranslator(BTreeMap<String, String>);

impl MapTranslator {
    pub fn with<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }
}

impl Translator for MapTranslator {
    fn translate(&self, key: &str) -> Option<String> {
        self.0.get(key).cloned()
    }
}

/// Converts rich HTML input into a document markup syntax.
pub trait HtmlConverter {
    fn from_html(&self, html: &str, syntax: &str) -> Result<String, Error>;
}

/// What the legacy endpoint renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderTarget {
    /// A template, e.g. `getdocuments.vm`.
    Template(String),
    /// The content of a wiki page.
    Page(String),
}

impl std::fmt::Display for RenderTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Template(name) => write!(f, "template {}", name),
            Self::Page(reference) => write!(f, "page {}", reference),
        }
    }
}

/// Renders the legacy endpoint. The request parameters are read from, and
/// output may be written to, the given context.
pub trait TemplateRenderer {
    fn render(&self, target: &RenderTarget, ctx: &mut RequestContext) -> Result<String, Error>;
}

/// A property declared by a class (content type).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassProperty {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pretty_name: Option<String>,
    #[serde(rename = "type")]
    pub property_type: String,
}

pub trait ClassRepository {
    /// Returns the properties declared by the class, or `None` if there is no
    /// such class.
    fn properties(&self, class_name: &str) -> Option<Vec<ClassProperty>>;

    fn property_type(&self, class_name: &str, property: &str) -> Option<String> {
        self.properties(class_name)?
            .into_iter()
            .find(|p| p.name == property)
            .map(|p| p.property_type)
    }
}

/// Class definitions held in memory, keyed by class name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaticClassRepository(BTreeMap<String, Vec<ClassProperty>>);

impl StaticClassRepository {
    pub fn with_class<N: Into<String>>(mut self, name: N, properties: Vec<ClassProperty>) -> Self {
        self.0.insert(name.into(), properties);
        self
    }
}

impl ClassRepository for StaticClassRepository {
    fn properties(&self, class_name: &str) -> Option<Vec<ClassProperty>> {
        self.0.get(class_name).cloned()
    }
}

/// Provides the property descriptors already known for a source, for
/// instance by inspecting the class it lists.
pub trait PropertyDescriptorStore {
    fn get(&self, source: Option<&Source>) -> Result<Vec<PropertyDescriptor>, Error>;
}

/// A fixed set of descriptors, regardless of the source.
impl PropertyDescriptorStore for Vec<PropertyDescriptor> {
    fn get(&self, _: Option<&Source>) -> Result<Vec<PropertyDescriptor>, Error> {
        Ok(self.clone())
    }
}

/// Derives descriptors from the class named by the `className` source
/// parameter.
pub struct ClassPropertyStore<'a> {
    classes: &'a dyn ClassRepository,
}

impl<'a> ClassPropertyStore<'a> {
    pub fn new(classes: &'a dyn ClassRepository) -> Self {
        Self { classes }
    }
}

impl<'a> PropertyDescriptorStore for ClassPropertyStore<'a> {
    fn get(&self, source: Option<&Source>) -> Result<Vec<PropertyDescriptor>, Error> {
        let class_name = match source.and_then(|s| s.parameter("className").as_text()) {
            Some(name) => name,
            None => return Ok(Vec::new()),
        };
        let properties = match self.classes.properties(class_name) {
            Some(properties) => properties,
            None => {
                debug!("No such class {}, no property descriptors provided", class_name);
                return Ok(Vec::new());
            }
        };
        Ok(properties
            .into_iter()
            .map(|p| PropertyDescriptor {
                name: p.pretty_name.filter(|n| !n.is_empty()),
                property_type: Some(p.property_type),
                ..PropertyDescriptor::new(p.name)
            })
            .collect())
    }
}

/// Resolves the path of a wiki URL into a document reference.
pub trait ReferenceResolver {
    fn resolve(&self, url_path: &str) -> Result<String, Error>;
}

/// Understands paths of the form `/<context>/bin/<action>/Space/Page`.
/// A trailing slash designates the space home page.
#[derive(Debug, Clone)]
pub struct PathReferenceResolver {
    pub home_page: String,
}

impl Default for PathReferenceResolver {
    fn default() -> Self {
        Self {
            home_page: "WebHome".to_string(),
        }
    }
}

impl ReferenceResolver for PathReferenceResolver {
    fn resolve(&self, url_path: &str) -> Result<String, Error> {
        let segments = url_path
            .trim_start_matches('/')
            .split('/')
            .collect::<Vec<&str>>();
        let names = match segments.iter().position(|s| *s == "bin") {
            // Skip "bin" and the action.
            Some(pos) => segments.get(pos + 2..).unwrap_or(&[]),
            // Skip the context path.
            None => segments.get(1..).unwrap_or(&[]),
        };
        let mut names = names
            .iter()
            .map(|s| decode_segment(s).replace('.', "\\."))
            .collect::<Vec<String>>();
        match names.last() {
            None => names.push(self.home_page.clone()),
            Some(last) if last.is_empty() => {
                names.pop();
                names.push(self.home_page.clone());
            }
            _ => {}
        }
        if names.len() == 1 {
            names.insert(0, "Main".to_string());
        }
        Ok(names.join("."))
    }
}

fn decode_segment(segment: &str) -> String {
    percent_decode_str(segment).decode_utf8_lossy().into_owned()
}
