use crate::doc_context::DesignContext;
use crate::elements::ElementSpec;
use crate::html::{DocumentTree, find_node_by_id};
use crate::section::pretty_html;
use kuchiki::NodeRef;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Section id -> elements appended to that section, in order.
pub type SectionElements = BTreeMap<String, Vec<ElementSpec>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    pub entity_id: String,
    pub html: String,
    pub columns: Vec<String>,
    pub sections: BTreeMap<String, String>,
    pub missing_sections: Vec<String>,
    pub fingerprint: String,
}

pub struct ComposedDocument {
    pub document: NodeRef,
    pub missing_sections: Vec<String>,
}

/// Appends each section's elements into a copy of the template. Sections the
/// template does not define are reported, not treated as errors.
pub fn compose_sections(tree: &DocumentTree, elements: &SectionElements) -> ComposedDocument {
    let document = tree.copy_document();
    let mut missing_sections = Vec::new();
    for (section_id, specs) in elements {
        let Some(target) = find_node_by_id(&document, section_id) else {
            log::warn!("design section '{section_id}' not found in template");
            missing_sections.push(section_id.clone());
            continue;
        };
        for spec in specs {
            if let Some(node) = spec.to_node() {
                target.append(node);
            }
        }
    }
    ComposedDocument {
        document,
        missing_sections,
    }
}

pub fn serialize_document(document: &NodeRef) -> String {
    let mut out = String::from("<!DOCTYPE html>\n");
    out.push_str(&pretty_html(document));
    out
}

pub fn fingerprint_sha256(html: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(html.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        use std::fmt::Write;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

impl DesignContext {
    /// Last stage of a render. Consumes the context.
    pub fn finalize(mut self, elements: &SectionElements) -> RenderedDocument {
        self.plan_columns();
        let composed = compose_sections(self.tree(), elements);
        let html = serialize_document(&composed.document);
        let fingerprint = fingerprint_sha256(&html);
        self.mark_finalized();
        self.trace_sink().flush();

        RenderedDocument {
            entity_id: self.entity().id().to_string(),
            html,
            columns: self.requested_columns().to_vec(),
            sections: self.extracted_sections().clone(),
            missing_sections: composed.missing_sections,
            fingerprint,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc_context::DesignInput;
    use crate::entity::{DocumentFields, Entity, Quote};
    use crate::section::SectionLookup;
    use crate::trace::MemoryTraceSink;
    use crate::DesignConfig;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    const TEMPLATE: &str = r##"<!DOCTYPE html>
<html><head><title>Quote</title></head>
<body><div id="details"></div><div id="footer"><p>Bye</p></div></body></html>"##;

    fn quote_context() -> DesignContext {
        let entity = Entity::Quote(Quote {
            fields: DocumentFields {
                id: "q_9".to_string(),
                ..DocumentFields::default()
            },
            ..Quote::default()
        });
        let input = DesignInput::new(TEMPLATE, entity).with_columns(["description", "$product.tax"]);
        DesignContext::bind_with(
            input,
            &DesignConfig::default(),
            Arc::new(MemoryTraceSink::new()),
        )
        .expect("bind")
    }

    fn elements() -> SectionElements {
        let mut elements = SectionElements::new();
        elements.insert(
            "details".to_string(),
            vec![
                ElementSpec::new("span").content("$quote.number"),
                ElementSpec::new("span").content("$quote.po_number").hidden(true),
            ],
        );
        elements.insert(
            "sidebar".to_string(),
            vec![ElementSpec::new("p").content("unused")],
        );
        elements
    }

    #[test]
    fn finalize_composes_into_a_copy() {
        let mut ctx = quote_context();
        let footer = ctx.section("footer", SectionLookup::Id);
        assert!(footer.is_some());

        let rendered = ctx.finalize(&elements());
        assert_eq!(
            rendered.html,
            "<!DOCTYPE html>\n<html>\n  <head>\n    <title>Quote</title>\n  </head>\n  <body>\n    <div id=\"details\">\n      <span>$quote.number</span>\n    </div>\n    <div id=\"footer\">\n      <p>Bye</p>\n    </div>\n  </body>\n</html>\n"
        );
        assert_eq!(rendered.entity_id, "q_9");
        assert_eq!(rendered.columns, vec!["description"]);
        assert_eq!(rendered.missing_sections, vec!["sidebar"]);
        assert_eq!(rendered.sections.get("footer"), footer.as_ref());
        assert_eq!(rendered.fingerprint.len(), 64);
    }

    #[test]
    fn identical_renders_share_a_fingerprint() {
        let first = quote_context().finalize(&elements());
        let second = quote_context().finalize(&elements());
        assert_eq!(first.fingerprint, second.fingerprint);

        let other = quote_context().finalize(&SectionElements::new());
        assert_ne!(first.fingerprint, other.fingerprint);
    }

    #[test]
    fn composition_leaves_the_parsed_tree_alone() {
        let ctx = quote_context();
        let _ = compose_sections(ctx.tree(), &elements());
        let details = ctx.tree().find_by_id("details").expect("details");
        assert!(details.children().is_empty());
    }

    #[test]
    fn fingerprint_is_hex_sha256() {
        assert_eq!(
            fingerprint_sha256(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
