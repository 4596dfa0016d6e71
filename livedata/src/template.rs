//! Renders live table results through [Handlebars](https://handlebarsjs.com/)
//! templates.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use eyre::{Result, WrapErr};
use handlebars::{Context, Handlebars, Helper, HelperResult, Output, RenderContext, RenderError};
use log::{debug, warn};
use serde_json::json;

use crate::context::RequestContext;
use crate::hash::sha256;
use crate::{Error, RenderTarget, TemplateRenderer};

/// Renders templates and pages registered by name.
///
/// Templates see the request parameters under `params`, the current document
/// reference under `doc` and the action under `action`. Pages are looked up
/// by their reference.
pub struct HandlebarsRenderer<'reg> {
    hb: Handlebars<'reg>,
    // Maps template content hashes -> names.
    template_hashes: HashMap<String, String>,
}

impl<'reg> Default for HandlebarsRenderer<'reg> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'reg> HandlebarsRenderer<'reg> {
    pub fn new() -> Self {
        let mut hb = Handlebars::new();
        // Results are JSON, not HTML.
        hb.register_escape_fn(handlebars::no_escape);
        hb.register_helper("param", Box::new(param));
        hb.register_helper("json", Box::new(to_json));
        Self {
            hb,
            template_hashes: HashMap::new(),
        }
    }

    /// Compiles the given template and registers it under the given name,
    /// returning an error if a different template with the same name already
    /// exists or if there was a problem parsing the template.
    pub fn register_template<N, T>(&mut self, name: N, template: T) -> Result<(), Error>
    where
        N: AsRef<str>,
        T: AsRef<str>,
    {
        let name = name.as_ref();
        let template = template.as_ref();
        let template_hash = sha256(template);
        if self.hb.has_template(name) {
            if self.template_hashes.get(&template_hash).map(String::as_str) == Some(name) {
                debug!(
                    "Already have template {} with hash {}, skipping",
                    name, template_hash
                );
                return Ok(());
            }
            return Err(Error::TemplateAlreadyExists(name.to_string()));
        }
        debug!("Registering template {} with hash {}", name, template_hash);
        self.hb
            .register_template_string(name, template)
            .map_err(|e| Error::TemplateParse(name.to_string(), e))?;
        self.template_hashes.insert(template_hash, name.to_string());
        Ok(())
    }

    /// Registers the template at the given path under its file name minus
    /// the last extension, e.g. `getdocuments.vm.hbs` becomes
    /// `getdocuments.vm`.
    pub fn load_template<P: AsRef<Path>>(&mut self, path: P) -> Result<String> {
        let path = path.as_ref();
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| Error::CannotDetermineFileType(path.to_path_buf()))?
            .to_string();
        let content = fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read template {}", path.display()))?;
        self.register_template(&name, content)?;
        Ok(name)
    }

    /// Loads all of the templates matching the given glob patterns.
    ///
    /// On success, returns the names of all of the templates loaded.
    pub fn load_templates(&mut self, patterns: &[&str]) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for pattern in patterns {
            for entry_result in glob::glob(pattern)? {
                let entry = entry_result?;
                if entry.is_file() {
                    names.push(self.load_template(&entry)?);
                }
            }
        }
        if names.is_empty() {
            warn!("No templates found matching {:?}", patterns);
        }
        Ok(names)
    }
}

impl<'reg> TemplateRenderer for HandlebarsRenderer<'reg> {
    fn render(&self, target: &RenderTarget, ctx: &mut RequestContext) -> Result<String, Error> {
        let name = match target {
            RenderTarget::Template(name) | RenderTarget::Page(name) => name.as_str(),
        };
        if !self.hb.has_template(name) {
            return Err(Error::TemplateNotFound(name.to_string()));
        }
        let data = json!({
            "params": ctx.request().parameters(),
            "doc": ctx.document(),
            "action": ctx.action(),
        });
        debug!("Rendering {}", target);
        self.hb
            .render_to_write(name, &data, ctx.response_mut())
            .map_err(|e| Error::TemplateRender(name.to_string(), e))?;
        Ok(String::new())
    }
}

/// Writes the first value of a request parameter.
///
/// Usage:
///
/// ```handlebars
/// {{param "offset"}}
/// ```
fn param(
    h: &Helper,
    _: &Handlebars,
    ctx: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let name = h
        .param(0)
        .and_then(|p| p.value().as_str())
        .ok_or_else(|| RenderError::new("param: expected the name of a request parameter"))?;
    let value = ctx
        .data()
        .get("params")
        .and_then(|params| params.get(name))
        .and_then(|values| values.get(0))
        .and_then(|value| value.as_str());
    if let Some(value) = value {
        out.write(value)?;
    }
    Ok(())
}

/// Serializes its parameter as JSON, e.g. `{{json params.tag}}`.
fn to_json(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let value = h
        .param(0)
        .map(|p| p.value().clone())
        .unwrap_or(serde_json::Value::Null);
    let s = serde_json::to_string(&value).map_err(|e| RenderError::new(e.to_string()))?;
    out.write(&s)?;
    Ok(())
}
