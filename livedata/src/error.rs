use std::path::PathBuf;

use thiserror::Error;

use crate::Right;

/// The primary error type that can be produced by the live data bridge.
#[derive(Debug, Error)]
pub enum Error {
    #[error("access denied: {right} right is required on document \"{reference}\"")]
    AccessDenied { right: Right, reference: String },
    #[error("document \"{0}\" does not exist")]
    DocumentNotFound(String),
    #[error("document \"{0}\" was not validated and was not saved")]
    NotValidated(String),
    #[error("property \"{property}\" of object {class_name}[{index}] not found in document \"{reference}\"")]
    ObjectPropertyNotFound {
        reference: String,
        class_name: String,
        index: usize,
        property: String,
    },
    #[error("no class name is configured, cannot update object property \"{0}\"")]
    MissingClassName(String),
    #[error("template not found: {0}")]
    TemplateNotFound(String),
    #[error("template \"{0}\" is already registered with different content")]
    TemplateAlreadyExists(String),
    #[error("failed to parse template \"{0}\": {1}")]
    TemplateParse(String, handlebars::TemplateError),
    #[error("failed to render template \"{0}\": {1}")]
    TemplateRender(String, handlebars::RenderError),
    #[error("failed to execute the query: {0}")]
    QueryFailed(#[source] serde_json::Error),
    #[error("failed to parse URL \"{0}\": {1}")]
    InvalidUrl(String, url::ParseError),
    #[error("failed to convert HTML to syntax \"{0}\": {1}")]
    HtmlConversion(String, String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("I/O error {0}: {1}")]
    Io(String, std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("unsupported file type: {0}")]
    UnsupportedFileType(String),
    #[error("cannot determine file type of file: {0}")]
    CannotDetermineFileType(PathBuf),
}
