//! Translates live data queries into live table results requests.

use log::{debug, trace};
use serde_json::Value;

use crate::context::{Parameters, Request, RequestContext};
use crate::translate::MATCH_OPERATORS;
use crate::value::stringify;
use crate::{Error, LiveDataQuery};

/// Source parameters that only make sense to the bridge itself.
pub const TEMPLATE_PARAMETER: &str = "template";
pub const RESULT_PAGE_PARAMETER: &str = "resultPage";
pub const DOCUMENT_PARAMETER: &str = "$doc";

// Source parameters whose legacy request parameter is spelled differently.
const RENAMED_PARAMETERS: &[(&str, &str)] = &[
    ("className", "classname"),
    ("translationPrefix", "transprefix"),
];

/// The action under which the results are rendered.
const RESULTS_ACTION: &str = "get";

/// Runs live table results pages on behalf of live data queries.
#[derive(Debug, Default, Clone, Copy)]
pub struct LiveTableRequestHandler;

impl LiveTableRequestHandler {
    /// Builds the request parameters the live table results pages expect.
    pub fn parameters(&self, query: &LiveDataQuery) -> Parameters {
        let mut parameters = Parameters::new();
        parameters.insert("outputSyntax".to_string(), vec!["plain".to_string()]);
        // Checked by the live table script to discard out-of-order answers.
        parameters.insert("reqNo".to_string(), vec!["1".to_string()]);

        if let Some(source) = &query.source {
            for (key, value) in &source.parameters {
                let values = match value {
                    Value::Array(items) => items.iter().filter_map(stringify).collect(),
                    other => stringify(other).into_iter().collect::<Vec<String>>(),
                };
                if !values.is_empty() {
                    parameters.insert(key.clone(), values);
                }
            }
        }
        for key in [TEMPLATE_PARAMETER, RESULT_PAGE_PARAMETER, DOCUMENT_PARAMETER] {
            parameters.remove(key);
        }
        for (key, legacy_key) in RENAMED_PARAMETERS {
            if let Some(values) = parameters.remove(*key) {
                parameters.insert(legacy_key.to_string(), values);
            }
        }

        if let Some(properties) = &query.properties {
            parameters.insert("collist".to_string(), vec![properties.join(",")]);
        }

        let (sort, dir): (Vec<String>, Vec<String>) = query
            .sort
            .iter()
            .flatten()
            .filter_map(|entry| {
                let direction = if entry.descending { "desc" } else { "asc" };
                Some((entry.property.clone()?, direction.to_string()))
            })
            .unzip();
        if !sort.is_empty() {
            parameters.insert("sort".to_string(), sort);
            parameters.insert("dir".to_string(), dir);
        }

        for filter in &query.filters {
            let (values, match_types): (Vec<String>, Vec<String>) = filter
                .constraints
                .iter()
                .filter_map(|constraint| {
                    let value = stringify(&constraint.value)?;
                    Some((value, match_type(filter.operator_of(constraint))))
                })
                .unzip();
            if values.is_empty() {
                debug!("Skipping filter on {} without any value", filter.property);
                continue;
            }
            let join_mode = if filter.match_all { "AND" } else { "OR" };
            parameters
                .entry(filter.property.clone())
                .or_default()
                .extend(values);
            parameters
                .entry(format!("{}_match", filter.property))
                .or_default()
                .extend(match_types);
            parameters.insert(
                format!("{}/join_mode", filter.property),
                vec![join_mode.to_string()],
            );
        }

        // The live table offset is 1-based.
        if let Some(offset) = query.offset {
            parameters.insert(
                "offset".to_string(),
                vec![offset.saturating_add(1).to_string()],
            );
        }
        if let Some(limit) = query.limit {
            parameters.insert("limit".to_string(), vec![limit.to_string()]);
        }
        trace!("Live table request parameters: {:?}", parameters);
        parameters
    }

    /// Renders the live table results for the given query.
    ///
    /// The request context is substituted while `render` runs and restored
    /// afterwards, even if `render` fails. Output written to the response
    /// takes precedence over the string returned by `render`.
    pub fn handle<F>(&self, ctx: &mut RequestContext, query: &LiveDataQuery, render: F) -> Result<String, Error>
    where
        F: FnOnce(&mut RequestContext) -> Result<String, Error>,
    {
        let document = query
            .source_parameter(DOCUMENT_PARAMETER)
            .as_text()
            .map(str::to_string);
        let request = Request::new(self.parameters(query));
        let mut guard = ctx.substitute(request, document, RESULTS_ACTION);
        let returned = render(&mut *guard)?;
        let captured = guard.captured();
        Ok(if captured.is_empty() { returned } else { captured })
    }
}

// Translates a live data operator into a live table match type.
fn match_type(operator: Option<&str>) -> String {
    match operator {
        None => String::new(),
        Some(operator) => MATCH_OPERATORS
            .iter()
            .find(|(_, op)| *op == operator)
            .map(|(legacy, _)| *legacy)
            .unwrap_or(operator)
            .to_string(),
    }
}
