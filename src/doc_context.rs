use crate::DesignConfig;
use crate::columns::{self, TaxColumnSpec};
use crate::elements::{self, ElementSpec};
use crate::entity::{Client, Entity};
use crate::error::DesignResult;
use crate::html::DocumentTree;
use crate::section::{self, SectionLookup};
use crate::trace::{LogTraceSink, TraceSink};
use crate::variables;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Everything the application hands over for one render.
#[derive(Debug, Clone)]
pub struct DesignInput {
    pub template: String,
    pub entity: Entity,
    pub client: Option<Client>,
    pub requested_columns: Vec<String>,
}

impl DesignInput {
    pub fn new(template: impl Into<String>, entity: Entity) -> Self {
        Self {
            template: template.into(),
            entity,
            client: None,
            requested_columns: Vec::new(),
        }
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requested_columns = columns.into_iter().map(Into::into).collect();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RenderStage {
    Bound,
    ColumnsPlanned,
    SectionsExtracted,
    Finalized,
}

/// Per-render state: the parsed template bound to its entity, client and
/// requested columns. Not shared between renders; a new render binds a new
/// context.
pub struct DesignContext {
    entity: Entity,
    client: Option<Client>,
    requested_columns: Vec<String>,
    template: String,
    tree: DocumentTree,
    stage: RenderStage,
    tax_columns: TaxColumnSpec,
    sections: BTreeMap<String, String>,
    trace: Arc<dyn TraceSink>,
}

impl DesignContext {
    pub fn bind(
        template: impl Into<String>,
        entity: Entity,
        client: Option<Client>,
        requested_columns: Vec<String>,
    ) -> DesignResult<Self> {
        let input = DesignInput {
            template: template.into(),
            entity,
            client,
            requested_columns,
        };
        Self::bind_with(input, &DesignConfig::default(), Arc::new(LogTraceSink))
    }

    pub(crate) fn bind_with(
        input: DesignInput,
        config: &DesignConfig,
        trace: Arc<dyn TraceSink>,
    ) -> DesignResult<Self> {
        let tree = DocumentTree::parse_with_limits(&input.template, &config.limits)?;
        log::debug!("design bound to {} {}", input.entity.alias(), input.entity.id());
        Ok(Self {
            entity: input.entity,
            client: input.client,
            requested_columns: input.requested_columns,
            template: input.template,
            tree,
            stage: RenderStage::Bound,
            tax_columns: config.tax_columns.clone(),
            sections: BTreeMap::new(),
            trace,
        })
    }

    pub fn stage(&self) -> RenderStage {
        self.stage
    }

    pub fn entity(&self) -> &Entity {
        &self.entity
    }

    pub fn client(&self) -> Option<&Client> {
        self.client.as_ref()
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn tree(&self) -> &DocumentTree {
        &self.tree
    }

    pub fn requested_columns(&self) -> &[String] {
        &self.requested_columns
    }

    pub(crate) fn trace_sink(&self) -> &dyn TraceSink {
        self.trace.as_ref()
    }

    pub(crate) fn extracted_sections(&self) -> &BTreeMap<String, String> {
        &self.sections
    }

    fn advance(&mut self, to: RenderStage) {
        if to > self.stage {
            log::debug!("{} {}: {:?} -> {:?}", self.entity.alias(), self.entity.id(), self.stage, to);
            self.stage = to;
        }
    }

    pub(crate) fn mark_finalized(&mut self) {
        self.advance(RenderStage::Finalized);
    }

    /// Expands the tax placeholder. Only the first call mutates the column
    /// list; later calls return the already planned columns.
    pub fn plan_columns(&mut self) -> &[String] {
        if self.stage == RenderStage::Bound {
            columns::plan_tax_columns(
                &mut self.requested_columns,
                self.entity.line_items(),
                &self.tax_columns,
            );
            self.advance(RenderStage::ColumnsPlanned);
        }
        &self.requested_columns
    }

    /// Remaining colspan against the current column count.
    pub fn calculate_colspan(&self, taken: usize) -> i64 {
        let total = i64::try_from(self.requested_columns.len()).unwrap_or(i64::MAX);
        let taken = i64::try_from(taken).unwrap_or(i64::MAX);
        columns::remaining_colspan(total, taken)
    }

    /// Extracts a section fragment. Plans the columns first if that has not
    /// happened, since section layout depends on the column count.
    pub fn section(&mut self, key: &str, lookup: SectionLookup) -> Option<String> {
        self.plan_columns();
        let html = section::extract_section(&self.tree, key, lookup);
        self.advance(RenderStage::SectionsExtracted);
        if let Some(html) = &html {
            self.sections.insert(key.to_string(), html.clone());
        }
        html
    }

    pub fn should_hide(&self, field: &str) -> bool {
        variables::should_hide(&self.entity, field, self.trace_sink())
    }

    pub fn entity_variable_check(&self, reference: &str) -> DesignResult<bool> {
        variables::entity_variable_check(&self.entity, reference, self.trace_sink())
    }

    /// `"true"`/`"false"` for an element's `hidden` property.
    pub fn hidden_attribute(&self, reference: &str) -> DesignResult<&'static str> {
        Ok(if self.entity_variable_check(reference)? {
            "true"
        } else {
            "false"
        })
    }

    pub fn shared_footer_elements(&self) -> ElementSpec {
        elements::shared_footer_elements(&self.entity)
    }
}
