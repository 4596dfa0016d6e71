//! A minimal view of a wiki document: the handful of document fields the
//! bridge may update, plus the objects attached to it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::value::JsonMap;

/// An instance of a class attached to a document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BaseObject {
    fields: JsonMap,
}

impl BaseObject {
    pub fn with<K: Into<String>, V: Into<Value>>(mut self, name: K, value: V) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    // Only reachable through `Document::set_object_field`, which tracks
    // dirtiness.
    fn set(&mut self, name: &str, value: Value) -> Option<Value> {
        self.fields.insert(name.to_string(), value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    reference: String,
    is_new: bool,
    hidden: bool,
    title: String,
    content: String,
    syntax: String,
    // Class name -> objects by index. Deleted objects leave a hole.
    objects: BTreeMap<String, Vec<Option<BaseObject>>>,
    content_dirty: bool,
    metadata_dirty: bool,
}

impl Document {
    /// A document that exists in storage.
    pub fn new<R: Into<String>>(reference: R) -> Self {
        Self {
            reference: reference.into(),
            is_new: false,
            hidden: false,
            title: String::new(),
            content: String::new(),
            syntax: "xwiki/2.1".to_string(),
            objects: BTreeMap::new(),
            content_dirty: false,
            metadata_dirty: false,
        }
    }

    /// A document that does not exist in storage yet.
    pub fn new_unsaved<R: Into<String>>(reference: R) -> Self {
        Self {
            is_new: true,
            ..Self::new(reference)
        }
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn is_new(&self) -> bool {
        self.is_new
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn syntax(&self) -> &str {
        &self.syntax
    }

    pub fn is_content_dirty(&self) -> bool {
        self.content_dirty
    }

    pub fn is_metadata_dirty(&self) -> bool {
        self.metadata_dirty
    }

    pub fn is_dirty(&self) -> bool {
        self.content_dirty || self.metadata_dirty
    }

    /// Marks the document as saved.
    pub fn clear_dirty(&mut self) {
        self.content_dirty = false;
        self.metadata_dirty = false;
    }

    pub fn set_hidden(&mut self, hidden: bool) {
        if self.hidden != hidden {
            self.hidden = hidden;
            self.metadata_dirty = true;
        }
    }

    pub fn set_title<S: Into<String>>(&mut self, title: S) {
        let title = title.into();
        if self.title != title {
            self.title = title;
            self.metadata_dirty = true;
        }
    }

    pub fn set_content<S: Into<String>>(&mut self, content: S) {
        let content = content.into();
        if self.content != content {
            self.content = content;
            self.content_dirty = true;
        }
    }

    pub fn set_syntax<S: Into<String>>(&mut self, syntax: S) {
        self.syntax = syntax.into();
    }

    /// Attaches an object at the next free index of its class. Used when
    /// building documents, so it does not mark the document as dirty.
    pub fn with_object<C: Into<String>>(mut self, class_name: C, object: BaseObject) -> Self {
        self.objects
            .entry(class_name.into())
            .or_default()
            .push(Some(object));
        self
    }

    pub fn object(&self, class_name: &str, index: usize) -> Option<&BaseObject> {
        self.objects.get(class_name)?.get(index)?.as_ref()
    }

    /// Replaces a field value of an existing object, returning the previous
    /// value. Returns `None` if there is no such object or the object lacks
    /// the field.
    pub fn set_object_field(
        &mut self,
        class_name: &str,
        index: usize,
        name: &str,
        value: Value,
    ) -> Option<Value> {
        let object = self.objects.get_mut(class_name)?.get_mut(index)?.as_mut()?;
        if !object.has_field(name) {
            return None;
        }
        let previous = object.set(name, value.clone());
        if previous.as_ref() != Some(&value) {
            self.metadata_dirty = true;
        }
        previous
    }
}
