//! Content transforms applied to each document before it is aggregated:
//! HTML minification and HTML → Markdown conversion, composed by [`Pipeline`].

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::OnceLock;

use html2md::{Handle, NodeData, StructuredPrinter, TagHandler, TagHandlerFactory};
use regex::Regex;
use tracing::{debug, info};

use crate::config::TransformOptions;
use crate::contract::{Transform, TransformError};

/// Passes content through untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct Identity;

impl Transform for Identity {
    fn apply(&self, content: String) -> Result<String, TransformError> {
        Ok(content)
    }
}

/// Whitespace-collapsing HTML minifier.
///
/// Closing tags and the `<html>`/`<head>` opening tags are kept so that
/// documents concatenated into one batch stay well delimited.
#[derive(Clone)]
pub struct Minify {
    cfg: minify_html::Cfg,
}

impl Minify {
    pub fn new() -> Self {
        let mut cfg = minify_html::Cfg::new();
        cfg.keep_closing_tags = true;
        cfg.keep_html_and_head_opening_tags = true;
        Self { cfg }
    }
}

impl Default for Minify {
    fn default() -> Self {
        Self::new()
    }
}

impl Transform for Minify {
    fn apply(&self, content: String) -> Result<String, TransformError> {
        let minified = minify_html::minify(content.as_bytes(), &self.cfg);
        debug!(
            before = content.len(),
            after = minified.len(),
            "Minified document"
        );
        Ok(String::from_utf8(minified)?)
    }
}

/// HTML → Markdown with ATX (`# Title`) headings.
///
/// Only the inner content of `<body>` is converted when a body tag is present;
/// otherwise the whole document is. Every converted document ends with a blank
/// line so the next document in a batch starts on a fresh block.
#[derive(Debug, Default, Clone, Copy)]
pub struct Markdown;

impl Markdown {
    pub fn new() -> Self {
        Self
    }
}

fn body_pattern() -> &'static Regex {
    static BODY: OnceLock<Regex> = OnceLock::new();
    BODY.get_or_init(|| {
        Regex::new(r"(?is)<body\b[^>]*>(.*?)(?:</body\s*>|\z)").expect("body pattern is valid")
    })
}

/// Inner content of the first `<body>` element, or the whole input.
pub fn extract_body(html: &str) -> &str {
    body_pattern()
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or(html)
}

struct AtxHeaderFactory;

impl TagHandlerFactory for AtxHeaderFactory {
    fn instantiate(&self) -> Box<dyn TagHandler> {
        Box::new(AtxHeaderHandler)
    }
}

struct AtxHeaderHandler;

impl TagHandler for AtxHeaderHandler {
    fn handle(&mut self, tag: &Handle, printer: &mut StructuredPrinter) {
        let level = match tag.data {
            NodeData::Element { ref name, .. } => name
                .local
                .to_string()
                .trim_start_matches('h')
                .parse::<usize>()
                .unwrap_or(1),
            _ => 1,
        };
        printer.insert_newline();
        printer.insert_newline();
        printer.append_str(&"#".repeat(level.clamp(1, 6)));
        printer.append_str(" ");
    }

    fn after_handle(&mut self, printer: &mut StructuredPrinter) {
        printer.insert_newline();
        printer.insert_newline();
    }
}

impl Transform for Markdown {
    fn apply(&self, content: String) -> Result<String, TransformError> {
        let body = extract_body(&content);

        let mut handlers: HashMap<String, Box<dyn TagHandlerFactory>> = HashMap::new();
        for tag in ["h1", "h2", "h3", "h4", "h5", "h6"] {
            handlers.insert(tag.to_string(), Box::new(AtxHeaderFactory));
        }

        // html2md panics on some malformed tables; surface that as a failed document.
        let converted = catch_unwind(AssertUnwindSafe(|| {
            html2md::parse_html_custom(body, &handlers)
        }))
        .map_err(|panic| {
            let reason = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "converter panicked".to_string());
            TransformError::Conversion(reason)
        })?;

        let mut markdown = converted;
        if !markdown.is_empty() {
            markdown.push_str("\n\n");
        }
        Ok(markdown)
    }
}

/// Ordered composition of transforms. Empty means identity.
#[derive(Default)]
pub struct Pipeline {
    steps: Vec<Box<dyn Transform>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(mut self, step: impl Transform + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    /// Minify first, then convert to Markdown; each only if toggled on.
    pub fn from_options(options: &TransformOptions) -> Self {
        let mut pipeline = Pipeline::new();
        if options.minify {
            pipeline = pipeline.then(Minify::new());
        }
        if options.markdown {
            pipeline = pipeline.then(Markdown::new());
        }
        info!(
            minify = options.minify,
            markdown = options.markdown,
            steps = pipeline.len(),
            "Built transform pipeline"
        );
        pipeline
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl Transform for Pipeline {
    fn apply(&self, content: String) -> Result<String, TransformError> {
        self.steps
            .iter()
            .try_fold(content, |acc, step| step.apply(acc))
    }
}
