//! Per-request state shared by everything that runs while serving a request,
//! and the scoped substitution of that state.

use std::collections::BTreeMap;
use std::io;
use std::ops::{Deref, DerefMut};

use log::trace;

/// Request parameters; every parameter may have multiple values.
pub type Parameters = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    parameters: Parameters,
}

impl Request {
    pub fn new(parameters: Parameters) -> Self {
        Self { parameters }
    }

    /// The first value of the given parameter.
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn parameter_values(&self, name: &str) -> &[String] {
        self.parameters.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }
}

/// Collects whatever is written as the response body.
#[derive(Debug, Default)]
pub struct Response {
    body: Vec<u8>,
}

impl Response {
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    pub fn content(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

impl io::Write for Response {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.body.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// The state of the request being served.
#[derive(Debug, Default)]
pub struct RequestContext {
    request: Request,
    response: Response,
    // Reference of the current document.
    document: Option<String>,
    action: String,
}

impl RequestContext {
    pub fn new<A: Into<String>>(request: Request, document: Option<String>, action: A) -> Self {
        Self {
            request,
            response: Response::default(),
            document,
            action: action.into(),
        }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn response(&self) -> &Response {
        &self.response
    }

    pub fn response_mut(&mut self) -> &mut Response {
        &mut self.response
    }

    pub fn document(&self) -> Option<&str> {
        self.document.as_deref()
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    /// Swaps in the given request, a fresh response and, if given, the
    /// current document and action. Everything is put back when the returned
    /// guard is dropped, whichever way the caller exits.
    pub fn substitute<A: Into<String>>(
        &mut self,
        request: Request,
        document: Option<String>,
        action: A,
    ) -> ContextGuard<'_> {
        let saved = Saved {
            request: std::mem::replace(&mut self.request, request),
            response: std::mem::take(&mut self.response),
            document: match document {
                Some(document) => self.document.replace(document),
                None => self.document.clone(),
            },
            action: std::mem::replace(&mut self.action, action.into()),
        };
        trace!("Substituted request context: {:?}", self.request.parameters());
        ContextGuard {
            ctx: self,
            saved: Some(saved),
        }
    }
}

struct Saved {
    request: Request,
    response: Response,
    document: Option<String>,
    action: String,
}

/// Gives access to the substituted context and restores the original one on
/// drop.
pub struct ContextGuard<'a> {
    ctx: &'a mut RequestContext,
    saved: Option<Saved>,
}

impl<'a> ContextGuard<'a> {
    /// What has been written to the substituted response so far.
    pub fn captured(&self) -> String {
        self.ctx.response.content()
    }
}

impl<'a> Deref for ContextGuard<'a> {
    type Target = RequestContext;

    fn deref(&self) -> &Self::Target {
        &*self.ctx
    }
}

impl<'a> DerefMut for ContextGuard<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.ctx
    }
}

impl<'a> Drop for ContextGuard<'a> {
    fn drop(&mut self) {
        if let Some(saved) = self.saved.take() {
            self.ctx.request = saved.request;
            self.ctx.response = saved.response;
            self.ctx.document = saved.document;
            self.ctx.action = saved.action;
            trace!("Restored request context");
        }
    }
}
