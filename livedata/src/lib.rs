//! Live data aims to expose legacy live tables through the generic live data
//! model: live table configurations are translated into live data
//! configurations, live data queries are answered by running the live table
//! results pages and entry updates are applied back onto documents.
//!
//! This crate provides an API that allows for embedding the bridge into
//! another application. For the command line interface, see the
//! `livedata-cli` crate.

mod configuration;
pub mod context;
mod data;
mod defaults;
mod document;
mod entry_store;
mod error;
mod hash;
mod host;
mod query;
mod request;
mod settings;
mod template;
mod translate;
mod update;
pub mod value;

pub use configuration::{
    DisplayerDescriptor, EntryDescriptor, FilterDescriptor, LiveDataConfiguration, LiveDataMeta,
    OperatorDescriptor, PaginationConfiguration, PropertyDescriptor,
};
pub use context::{ContextGuard, Parameters, Request, RequestContext, Response};
pub use data::{load_data, parse_data};
pub use defaults::{DefaultConfigurationResolver, DEFAULT_PROPERTY_TYPE, TRANSLATION_PREFIX};
pub use document::{BaseObject, Document};
pub use entry_store::{LiveData, LiveTableEntryStore, DEFAULT_RESULTS_TEMPLATE, ENTRY_ID_PROPERTY};
pub use error::Error;
pub use host::{
    AllowAll, Authorization, ClassProperty, ClassPropertyStore, ClassRepository, DocumentStore,
    HtmlConverter, MapTranslator, PathReferenceResolver, PropertyDescriptorStore,
    ReferenceResolver, RenderTarget, Right, StaticClassRepository, TemplateRenderer, Translator,
};
pub use query::{Constraint, Filter, LiveDataQuery, SortEntry, Source};
pub use request::{
    LiveTableRequestHandler, DOCUMENT_PARAMETER, RESULT_PAGE_PARAMETER, TEMPLATE_PARAMETER,
};
pub use settings::{Settings, DEFAULT_SETTINGS_FILE};
pub use template::HandlebarsRenderer;
pub use translate::{LiveTableConfiguration, LiveTableConfigurationResolver, LIVE_TABLE_SOURCE};
pub use update::{EntryUpdater, ObjectTarget, HTML_CONVERSION_KEY};
