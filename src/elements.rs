use crate::entity::Entity;
use html5ever::{LocalName, Namespace, QualName};
use kuchiki::{Attribute, ExpandedName, NodeRef};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

pub const SIGNATURE_VARIABLE: &str = "$contact.signature";
pub const CREATED_BY_BADGE_SRC: &str = "$app_url/images/created-by-invoiceninja-new.png";

/// Declarative element a design places into a template section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementSpec {
    pub element: String,
    pub properties: BTreeMap<String, String>,
    pub content: String,
    pub elements: Vec<ElementSpec>,
}

impl ElementSpec {
    pub fn new(element: impl Into<String>) -> Self {
        Self {
            element: element.into(),
            ..Self::default()
        }
    }

    pub fn property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn child(mut self, child: ElementSpec) -> Self {
        self.elements.push(child);
        self
    }

    pub fn hidden(self, hidden: bool) -> Self {
        self.property("hidden", if hidden { "true" } else { "false" })
    }

    pub fn is_hidden(&self) -> bool {
        self.properties.get("hidden").map(String::as_str) == Some("true")
    }

    /// Builds the element subtree; hidden elements (and their children) yield `None`.
    pub fn to_node(&self) -> Option<NodeRef> {
        if self.is_hidden() || self.element.trim().is_empty() {
            return None;
        }
        let name = QualName::new(
            None,
            Namespace::from(HTML_NAMESPACE),
            LocalName::from(self.element.trim().to_ascii_lowercase()),
        );
        let attributes = self
            .properties
            .iter()
            .filter(|(key, _)| key.as_str() != "hidden")
            .map(|(key, value)| {
                (
                    ExpandedName::new(Namespace::from(""), LocalName::from(key.as_str())),
                    Attribute {
                        prefix: None,
                        value: value.clone(),
                    },
                )
            });
        let node = NodeRef::new_element(name, attributes);
        if !self.content.is_empty() {
            node.append(NodeRef::new_text(self.content.clone()));
        }
        for child in &self.elements {
            if let Some(child) = child.to_node() {
                node.append(child);
            }
        }
        Some(node)
    }
}

/// Footer shared by every design: the contact signature plus the
/// "created by" badge, which paid accounts do not show.
pub fn shared_footer_elements(entity: &Entity) -> ElementSpec {
    ElementSpec::new("div")
        .property("class", "flex items-center justify-between mt-10")
        .child(
            ElementSpec::new("img")
                .property("src", SIGNATURE_VARIABLE)
                .property("class", "h-32"),
        )
        .child(
            ElementSpec::new("img")
                .property("src", CREATED_BY_BADGE_SRC)
                .property("class", "h-24")
                .hidden(entity.account_is_paid()),
        )
}
