mod columns;
mod designs;
mod doc_context;
mod elements;
mod entity;
mod error;
mod finalize;
mod html;
mod section;
mod trace;
mod variables;

pub use columns::{
    PRODUCT_TAX_PLACEHOLDER, PRODUCT_TAX_RATE_COLUMNS, TaxColumnSpec, included_tax_columns,
    plan_tax_columns, remaining_colspan,
};
pub use designs::{Design, PLAIN_TEMPLATE, PlainDesign};
pub use doc_context::{DesignContext, DesignInput, RenderStage};
pub use elements::{CREATED_BY_BADGE_SRC, ElementSpec, SIGNATURE_VARIABLE, shared_footer_elements};
pub use entity::{
    Account, AccountPlan, Client, Credit, DocumentFields, Entity, FieldAccessible, Invoice,
    LineItem, LineItemType, Quote, User,
};
pub use error::{DesignError, DesignResult};
pub use finalize::{
    ComposedDocument, RenderedDocument, SectionElements, compose_sections, fingerprint_sha256,
    serialize_document,
};
pub use html::{
    DEFAULT_MAX_TEMPLATE_BYTES, DEFAULT_MAX_TREE_DEPTH, DocumentTree, Element, TemplateLimits,
};
pub use section::{SectionLookup, extract_section, pretty_html};
pub use trace::{
    FieldState, JsonlTraceSink, LogTraceSink, MemoryTraceSink, TraceRecord, TraceSink,
};
pub use variables::{
    classify, decompose_reference, entity_variable_check, is_empty_value, presence_attribute,
    resolve, should_hide, trace_classification,
};

use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesignConfig {
    pub limits: TemplateLimits,
    pub tax_columns: TaxColumnSpec,
}

impl DesignConfig {
    pub fn validate(&self) -> DesignResult<()> {
        if self.limits.max_bytes == 0 || self.limits.max_depth == 0 {
            return Err(DesignError::InvalidConfiguration(
                "template limits must be greater than zero".to_string(),
            ));
        }
        let spec = &self.tax_columns;
        if spec.placeholder.trim().is_empty() {
            return Err(DesignError::InvalidConfiguration(
                "tax placeholder column must not be empty".to_string(),
            ));
        }
        for (idx, column) in spec.rate_columns.iter().enumerate() {
            if column.trim().is_empty() || *column == spec.placeholder {
                return Err(DesignError::InvalidConfiguration(format!(
                    "tax rate column {} must be non-empty and differ from the placeholder",
                    idx + 1
                )));
            }
            if spec.rate_columns[..idx].contains(column) {
                return Err(DesignError::InvalidConfiguration(format!(
                    "tax rate column '{column}' is listed twice"
                )));
            }
        }
        Ok(())
    }
}

pub struct DesignEngine {
    config: DesignConfig,
    trace: Arc<dyn TraceSink>,
    jsonl: Option<JsonlTraceSink>,
}

#[derive(Clone)]
pub struct DesignEngineBuilder {
    config: DesignConfig,
    trace_path: Option<PathBuf>,
    trace_sink: Option<Arc<dyn TraceSink>>,
}

impl DesignEngineBuilder {
    pub fn new() -> Self {
        Self {
            config: DesignConfig::default(),
            trace_path: None,
            trace_sink: None,
        }
    }

    // Templates above this size are refused before parsing.
    pub fn max_template_bytes(mut self, bytes: usize) -> Self {
        self.config.limits.max_bytes = bytes;
        self
    }

    // Element nesting limit, checked right after parsing.
    pub fn max_tree_depth(mut self, depth: usize) -> Self {
        self.config.limits.max_depth = depth;
        self
    }

    pub fn tax_columns(mut self, spec: TaxColumnSpec) -> Self {
        self.config.tax_columns = spec;
        self
    }

    // Field classification records go to a JSON-lines file instead of the log.
    pub fn trace_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.trace_path = Some(path.into());
        self.trace_sink = None;
        self
    }

    pub fn trace_sink(mut self, sink: Arc<dyn TraceSink>) -> Self {
        self.trace_sink = Some(sink);
        self.trace_path = None;
        self
    }

    pub fn build(self) -> DesignResult<DesignEngine> {
        self.config.validate()?;
        let mut jsonl = None;
        let trace: Arc<dyn TraceSink> = match (self.trace_sink, self.trace_path) {
            (Some(sink), _) => sink,
            (None, Some(path)) => {
                let sink = JsonlTraceSink::new(path)?;
                jsonl = Some(sink.clone());
                Arc::new(sink)
            }
            (None, None) => Arc::new(LogTraceSink),
        };
        Ok(DesignEngine {
            config: self.config,
            trace,
            jsonl,
        })
    }
}

impl Default for DesignEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DesignEngine {
    pub fn builder() -> DesignEngineBuilder {
        DesignEngineBuilder::new()
    }

    pub fn config(&self) -> &DesignConfig {
        &self.config
    }

    pub fn bind(&self, input: DesignInput) -> DesignResult<DesignContext> {
        DesignContext::bind_with(input, &self.config, self.trace.clone())
    }

    /// One full render: bind, plan columns, extract the design's sections,
    /// build its elements and finalize.
    pub fn render(&self, design: &dyn Design, input: DesignInput) -> DesignResult<RenderedDocument> {
        let mut ctx = self.bind(input)?;
        ctx.plan_columns();
        for (key, lookup) in design.sections() {
            if ctx.section(&key, lookup).is_none() {
                log::debug!("design '{}' section '{}' absent from template", design.name(), key);
            }
        }
        let elements = design.elements(&ctx)?;
        Ok(ctx.finalize(&elements))
    }

    /// Independent renders on the rayon pool; results keep input order.
    pub fn render_batch(
        &self,
        design: &dyn Design,
        inputs: Vec<DesignInput>,
    ) -> Vec<DesignResult<RenderedDocument>> {
        use rayon::prelude::*;

        inputs
            .into_par_iter()
            .map(|input| self.render(design, input))
            .collect()
    }

    /// Writes the JSON-lines trace summary; a no-op for other sinks.
    pub fn emit_trace_summary(&self, context: &str) {
        if let Some(jsonl) = &self.jsonl {
            jsonl.emit_summary(context);
            jsonl.flush();
        }
    }
}
