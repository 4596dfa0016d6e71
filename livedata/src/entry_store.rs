//! Serves live data entries from live table results pages.

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::RequestContext;
use crate::request::{DOCUMENT_PARAMETER, RESULT_PAGE_PARAMETER, TEMPLATE_PARAMETER};
use crate::update::ObjectTarget;
use crate::value::JsonMap;
use crate::{
    Authorization, Constraint, DocumentStore, EntryUpdater, Error, Filter, HtmlConverter,
    LiveDataQuery, LiveTableRequestHandler, RenderTarget, Right, Source, TemplateRenderer,
};

/// The template rendered when the source names neither a template nor a
/// results page.
pub const DEFAULT_RESULTS_TEMPLATE: &str = "getdocuments.vm";

/// The property identifying an entry.
pub const ENTRY_ID_PROPERTY: &str = "doc.fullName";

// Results pages use `doc_` instead of `doc.` for document fields.
const LEGACY_DOCUMENT_PREFIX: &str = "doc_";
const DOCUMENT_PREFIX: &str = "doc.";

/// A page of entries, along with the total number of entries matching the
/// query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LiveData {
    pub count: u64,
    pub entries: Vec<JsonMap>,
}

// What results pages answer.
#[derive(Debug, Deserialize)]
struct LiveTableResults {
    #[serde(default)]
    totalrows: u64,
    #[serde(default)]
    rows: Vec<JsonMap>,
}

pub struct LiveTableEntryStore<'a> {
    authorization: &'a dyn Authorization,
    renderer: &'a dyn TemplateRenderer,
    updater: EntryUpdater<'a>,
    handler: LiveTableRequestHandler,
    default_template: String,
}

impl<'a> LiveTableEntryStore<'a> {
    pub fn new(
        authorization: &'a dyn Authorization,
        renderer: &'a dyn TemplateRenderer,
        documents: &'a dyn DocumentStore,
        html_converter: &'a dyn HtmlConverter,
    ) -> Self {
        Self {
            authorization,
            renderer,
            updater: EntryUpdater::new(authorization, documents, html_converter),
            handler: LiveTableRequestHandler,
            default_template: DEFAULT_RESULTS_TEMPLATE.to_string(),
        }
    }

    pub fn with_default_template<S: Into<String>>(mut self, template: S) -> Self {
        self.default_template = template.into();
        self
    }

    pub fn with_html_conversion_key<K: Into<String>>(mut self, key: K) -> Self {
        self.updater = self.updater.with_html_conversion_key(key);
        self
    }

    /// Runs the query against the results page or template named by its
    /// source.
    pub fn get(&self, ctx: &mut RequestContext, query: &LiveDataQuery) -> Result<LiveData, Error> {
        let target = self.render_target(query)?;
        debug!("Executing live data query through {}", target);
        let output = self
            .handler
            .handle(ctx, query, |ctx| self.renderer.render(&target, ctx))?;
        let results: LiveTableResults = serde_json::from_str(&output).map_err(Error::QueryFailed)?;
        Ok(LiveData {
            count: results.totalrows,
            entries: results.rows.into_iter().map(rewrite_row).collect(),
        })
    }

    /// Looks up a single entry by its identifier.
    pub fn get_entry(
        &self,
        ctx: &mut RequestContext,
        source: &Source,
        entry_id: &str,
    ) -> Result<Option<JsonMap>, Error> {
        let query = LiveDataQuery {
            source: Some(source.clone()),
            filters: vec![Filter::new(
                ENTRY_ID_PROPERTY,
                true,
                vec![Constraint::new("equals", entry_id)],
            )],
            offset: Some(0),
            limit: Some(1),
            ..Default::default()
        };
        Ok(self.get(ctx, &query)?.entries.into_iter().next())
    }

    /// Updates a property of an entry, returning the previous value if it
    /// changed.
    pub fn update(
        &self,
        source: &Source,
        entry_id: &str,
        property: &str,
        value: Value,
    ) -> Result<Option<Value>, Error> {
        self.updater
            .update(entry_id, object_target(source), property, value)
    }

    /// Updates several properties of an entry at once.
    pub fn update_all(&self, source: &Source, entry_id: &str, values: JsonMap) -> Result<JsonMap, Error> {
        self.updater
            .update_all(entry_id, object_target(source), values)
    }

    // Checks that the page about to be rendered can be viewed.
    fn render_target(&self, query: &LiveDataQuery) -> Result<RenderTarget, Error> {
        if let Some(page) = query.source_parameter(RESULT_PAGE_PARAMETER).as_text() {
            self.authorization.check_access(Right::View, page)?;
            return Ok(RenderTarget::Page(page.to_string()));
        }
        if let Some(document) = query.source_parameter(DOCUMENT_PARAMETER).as_text() {
            self.authorization.check_access(Right::View, document)?;
        }
        let template = query
            .source_parameter(TEMPLATE_PARAMETER)
            .as_text()
            .unwrap_or(self.default_template.as_str());
        Ok(RenderTarget::Template(template.to_string()))
    }
}

fn object_target(source: &Source) -> Option<ObjectTarget<'_>> {
    source
        .parameter("className")
        .as_text()
        .map(ObjectTarget::first)
}

fn rewrite_row(row: JsonMap) -> JsonMap {
    row.into_iter()
        .map(|(key, value)| match key.strip_prefix(LEGACY_DOCUMENT_PREFIX) {
            Some(field) => (format!("{}{}", DOCUMENT_PREFIX, field), value),
            None => (key, value),
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::context::Parameters;
    use crate::update::test::{Deny, RecordingStore, TaggingConverter};
    use crate::{AllowAll, BaseObject, Document};
    use serde_json::json;
    use std::cell::RefCell;
    use std::io::Write;

    /// Writes a fixed answer and records what it was asked to render.
    struct FixedRenderer {
        answer: String,
        rendered: RefCell<Vec<(RenderTarget, Parameters)>>,
    }

    impl FixedRenderer {
        fn new(answer: Value) -> Self {
            Self::raw(answer.to_string())
        }

        fn raw<S: Into<String>>(answer: S) -> Self {
            Self {
                answer: answer.into(),
                rendered: RefCell::new(Vec::new()),
            }
        }
    }

    impl TemplateRenderer for FixedRenderer {
        fn render(&self, target: &RenderTarget, ctx: &mut RequestContext) -> Result<String, Error> {
            self.rendered
                .borrow_mut()
                .push((target.clone(), ctx.request().parameters().clone()));
            write!(ctx.response_mut(), "{}", self.answer)
                .map_err(|e| Error::Io("writing the answer".to_string(), e))?;
            Ok(String::new())
        }
    }

    fn source(parameters: Value) -> Source {
        serde_json::from_value(json!({"id": "liveTable", "parameters": parameters})).unwrap()
    }

    fn query(parameters: Value) -> LiveDataQuery {
        LiveDataQuery {
            source: Some(source(parameters)),
            ..Default::default()
        }
    }

    #[test]
    fn rows_are_rewritten() {
        let renderer = FixedRenderer::new(json!({
            "totalrows": 42,
            "rows": [{"doc_title": "Hello", "doc_url": "/Blog/Hello", "category": "News"}],
        }));
        let documents = RecordingStore::default();
        let store = LiveTableEntryStore::new(&AllowAll, &renderer, &documents, &TaggingConverter);
        let live_data = store
            .get(&mut RequestContext::default(), &query(json!({})))
            .unwrap();
        assert_eq!(live_data.count, 42);
        assert_eq!(
            Value::Object(live_data.entries[0].clone()),
            json!({"doc.title": "Hello", "doc.url": "/Blog/Hello", "category": "News"})
        );
        assert_eq!(
            renderer.rendered.borrow()[0].0,
            RenderTarget::Template("getdocuments.vm".to_string())
        );
    }

    #[test]
    fn render_target_selection() {
        let renderer = FixedRenderer::new(json!({"totalrows": 0, "rows": []}));
        let documents = RecordingStore::default();
        let store = LiveTableEntryStore::new(&AllowAll, &renderer, &documents, &TaggingConverter)
            .with_default_template("results.vm");
        let mut ctx = RequestContext::default();
        store.get(&mut ctx, &query(json!({}))).unwrap();
        store
            .get(&mut ctx, &query(json!({"template": "custom.vm"})))
            .unwrap();
        store
            .get(
                &mut ctx,
                &query(json!({"template": "custom.vm", "resultPage": "Blog.Results"})),
            )
            .unwrap();
        let targets = renderer
            .rendered
            .borrow()
            .iter()
            .map(|(target, _)| target.clone())
            .collect::<Vec<RenderTarget>>();
        assert_eq!(
            targets,
            vec![
                RenderTarget::Template("results.vm".to_string()),
                RenderTarget::Template("custom.vm".to_string()),
                RenderTarget::Page("Blog.Results".to_string()),
            ]
        );
    }

    #[test]
    fn malformed_answer_fails_the_query() {
        let renderer = FixedRenderer::raw("<html>oops</html>");
        let documents = RecordingStore::default();
        let store = LiveTableEntryStore::new(&AllowAll, &renderer, &documents, &TaggingConverter);
        let result = store.get(&mut RequestContext::default(), &query(json!({})));
        match result {
            Err(err @ Error::QueryFailed(_)) => {
                assert!(err.to_string().starts_with("failed to execute the query"))
            }
            other => panic!("expected query failure, got {:?}", other),
        }
    }

    #[test]
    fn denied_view_renders_nothing() {
        let renderer = FixedRenderer::new(json!({"totalrows": 0, "rows": []}));
        let documents = RecordingStore::default();
        let store = LiveTableEntryStore::new(&Deny, &renderer, &documents, &TaggingConverter);
        let mut ctx = RequestContext::default();
        let result = store.get(&mut ctx, &query(json!({"resultPage": "Blog.Results"})));
        assert!(matches!(
            result,
            Err(Error::AccessDenied { right: Right::View, reference }) if reference == "Blog.Results"
        ));
        let result = store.get(&mut ctx, &query(json!({"$doc": "Blog.WebHome"})));
        assert!(matches!(result, Err(Error::AccessDenied { .. })));
        assert!(renderer.rendered.borrow().is_empty());
    }

    #[test]
    fn single_entry_lookup() {
        let renderer = FixedRenderer::new(json!({
            "totalrows": 1,
            "rows": [{"doc_fullName": "Blog.Hello"}],
        }));
        let documents = RecordingStore::default();
        let store = LiveTableEntryStore::new(&AllowAll, &renderer, &documents, &TaggingConverter);
        let entry = store
            .get_entry(
                &mut RequestContext::default(),
                &source(json!({"className": "Blog.BlogPostClass"})),
                "Blog.Hello",
            )
            .unwrap();
        assert_eq!(entry.unwrap().get("doc.fullName"), Some(&json!("Blog.Hello")));
        let rendered = renderer.rendered.borrow();
        let parameters = &rendered[0].1;
        assert_eq!(parameters["doc.fullName"], vec!["Blog.Hello"]);
        assert_eq!(parameters["doc.fullName_match"], vec!["exact"]);
        assert_eq!(parameters["offset"], vec!["1"]);
        assert_eq!(parameters["limit"], vec!["1"]);
        assert_eq!(parameters["classname"], vec!["Blog.BlogPostClass"]);
    }

    #[test]
    fn updates_use_the_source_class() {
        let documents = RecordingStore::with(Document::new("Blog.Hello").with_object(
            "Blog.BlogPostClass",
            BaseObject::default().with("category", "News"),
        ));
        let renderer = FixedRenderer::raw("");
        let store = LiveTableEntryStore::new(&AllowAll, &renderer, &documents, &TaggingConverter);
        let class_source = source(json!({"className": "Blog.BlogPostClass"}));
        let previous = store
            .update(&class_source, "Blog.Hello", "category", json!("Events"))
            .unwrap();
        assert_eq!(previous, Some(json!("News")));
        let result = store.update(&source(json!({})), "Blog.Hello", "category", json!("Events"));
        assert!(matches!(result, Err(Error::MissingClassName(_))));
        let previous = store
            .update_all(
                &class_source,
                "Blog.Hello",
                json!({"category": "News", "doc.title": "Hello"})
                    .as_object()
                    .unwrap()
                    .clone(),
            )
            .unwrap();
        assert_eq!(previous.len(), 1);
        assert_eq!(previous.get("doc.title"), Some(&json!("")));
    }
}
