//! Value extraction and template rendering.
//!
//! # Responsibilities
//! - Parse value specs (`id`, `query:sort`, `header:x-tenant`, `body:a.b.c`)
//! - Parse downstream URL/body templates once at compile time
//! - Resolve specs against a request's ExecutionContext, memoized per request
//!
//! # Design Decisions
//! - Specs are typed at compile time, not string-keyed lookups at runtime
//! - A bare name is a path placeholder; other sources carry a prefix
//! - Body extraction requires a parseable JSON body; an unparseable body is
//!   a distinguishable error, never a silent empty value
//! - URL rendering percent-encodes resolved values; a value can never alter
//!   the rendered URL's structure or smuggle in extra query parameters

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::pipeline::context::ExecutionContext;

/// Everything outside the RFC 3986 unreserved set is escaped when a
/// resolved value is substituted into URL context.
const URL_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// A named source of one request value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueSpec {
    /// Path placeholder captured by the route pattern.
    Path(String),
    /// Query-string parameter.
    Query(String),
    /// Request header.
    Header(String),
    /// Dotted path into the JSON request body.
    Body(Vec<String>),
}

impl ValueSpec {
    /// Parse a spec from its template form (without braces).
    pub fn parse(spec: &str) -> Result<Self, TemplateError> {
        let bad = || TemplateError::BadSpec {
            spec: spec.to_string(),
        };

        let parsed = match spec.split_once(':') {
            None => ValueSpec::Path(spec.to_string()),
            Some(("query", key)) => ValueSpec::Query(key.to_string()),
            Some(("header", key)) => ValueSpec::Header(key.to_ascii_lowercase()),
            Some(("body", path)) => {
                ValueSpec::Body(path.split('.').map(str::to_string).collect())
            }
            Some(_) => return Err(bad()),
        };

        let empty = match &parsed {
            ValueSpec::Path(k) | ValueSpec::Query(k) | ValueSpec::Header(k) => k.is_empty(),
            ValueSpec::Body(path) => path.iter().any(String::is_empty),
        };
        if empty {
            return Err(bad());
        }
        Ok(parsed)
    }
}

impl std::fmt::Display for ValueSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSpec::Path(k) => write!(f, "{k}"),
            ValueSpec::Query(k) => write!(f, "query:{k}"),
            ValueSpec::Header(k) => write!(f, "header:{k}"),
            ValueSpec::Body(path) => write!(f, "body:{}", path.join(".")),
        }
    }
}

/// Error raised while parsing a template at compile time.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("unclosed '{{' in template '{template}'")]
    UnclosedBrace { template: String },

    #[error("invalid value spec '{spec}'")]
    BadSpec { spec: String },

    #[error("placeholder '{{{name}}}' is not declared by the route pattern")]
    UnknownPlaceholder { name: String },
}

/// Error raised while resolving a spec at request time.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("no value for '{spec}'")]
    Missing { spec: String },

    #[error("request body is not valid JSON")]
    BodyNotJson,
}

#[derive(Debug, Clone)]
enum Chunk {
    Literal(String),
    Value(ValueSpec),
}

/// A parse-once template with literal chunks and value specs.
#[derive(Debug, Clone)]
pub struct Template {
    raw: String,
    chunks: Vec<Chunk>,
}

impl Template {
    /// Parse a template like `http://svc/users/{id}?sort={query:sort}`.
    pub fn parse(template: &str) -> Result<Self, TemplateError> {
        let mut chunks = Vec::new();
        let mut rest = template;

        while let Some(open) = rest.find('{') {
            if !rest[..open].is_empty() {
                chunks.push(Chunk::Literal(rest[..open].to_string()));
            }
            let after = &rest[open + 1..];
            let close = after
                .find('}')
                .ok_or_else(|| TemplateError::UnclosedBrace {
                    template: template.to_string(),
                })?;
            chunks.push(Chunk::Value(ValueSpec::parse(&after[..close])?));
            rest = &after[close + 1..];
        }
        if !rest.is_empty() {
            chunks.push(Chunk::Literal(rest.to_string()));
        }

        Ok(Self {
            raw: template.to_string(),
            chunks,
        })
    }

    /// The template as written in configuration.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Value specs referenced by this template.
    pub fn specs(&self) -> impl Iterator<Item = &ValueSpec> {
        self.chunks.iter().filter_map(|c| match c {
            Chunk::Value(spec) => Some(spec),
            Chunk::Literal(_) => None,
        })
    }

    /// Render the template against a request context. Extraction runs (and
    /// caches) before substitution for every referenced spec; values are
    /// substituted verbatim (body context).
    pub fn render(&self, ctx: &mut ExecutionContext) -> Result<String, ExtractError> {
        self.render_with(ctx, false)
    }

    /// Render for URL context: resolved values are percent-encoded, so a
    /// space cannot break the URL and a `&` cannot inject a parameter.
    pub fn render_url(&self, ctx: &mut ExecutionContext) -> Result<String, ExtractError> {
        self.render_with(ctx, true)
    }

    fn render_with(
        &self,
        ctx: &mut ExecutionContext,
        encode: bool,
    ) -> Result<String, ExtractError> {
        let mut out = String::with_capacity(self.raw.len());
        for chunk in &self.chunks {
            match chunk {
                Chunk::Literal(lit) => out.push_str(lit),
                Chunk::Value(spec) => {
                    let value = resolve(ctx, spec)?;
                    if encode {
                        out.extend(utf8_percent_encode(&value, URL_VALUE));
                    } else {
                        out.push_str(&value);
                    }
                }
            }
        }
        Ok(out)
    }
}

/// Resolve one value spec against the request, memoized per context.
pub fn resolve(ctx: &mut ExecutionContext, spec: &ValueSpec) -> Result<String, ExtractError> {
    if let Some(value) = ctx.cached_value(spec) {
        return Ok(value);
    }

    let missing = || ExtractError::Missing {
        spec: spec.to_string(),
    };

    let value = match spec {
        ValueSpec::Path(name) => ctx.path_param(name).ok_or_else(missing)?.to_string(),
        ValueSpec::Query(key) => ctx.query_param(key).ok_or_else(missing)?.to_string(),
        ValueSpec::Header(key) => ctx
            .headers
            .get(key.as_str())
            .and_then(|v| v.to_str().ok())
            .ok_or_else(missing)?
            .to_string(),
        ValueSpec::Body(path) => {
            let mut node = ctx.body_json()?;
            for key in path {
                node = node.get(key).ok_or_else(missing)?;
            }
            match node {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Null => return Err(missing()),
                other => other.to_string(),
            }
        }
    };

    ctx.cache_value(spec, value.clone());
    Ok(value)
}
