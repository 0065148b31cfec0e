use crate::html::{DocumentTree, deep_clone};
use kuchiki::{NodeData, NodeRef};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SectionLookup {
    #[default]
    Id,
    Tag,
}

const INDENT: &str = "  ";

const VOID_ELEMENTS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

// Content written back as the raw text of the element.
const RAW_TEXT_ELEMENTS: [&str; 2] = ["script", "style"];

// Children written verbatim: markup kept, whitespace untouched.
const PREFORMATTED_ELEMENTS: [&str; 2] = ["pre", "textarea"];

/// Serialize one section of the template as a standalone, pretty-printed fragment.
///
/// Returns `None` when the section does not exist; callers decide whether that
/// means "render a default" or "skip".
pub fn extract_section(tree: &DocumentTree, key: &str, lookup: SectionLookup) -> Option<String> {
    let element = match lookup {
        SectionLookup::Id => tree.find_by_id(key),
        SectionLookup::Tag => tree.find_first_by_tag(key),
    }?;

    let fragment = NodeRef::new_document();
    fragment.append(deep_clone(element.node())?);
    Some(pretty_html(&fragment))
}

/// Deterministic pretty printer with a trailing newline.
///
/// Element-only content goes one node per line with a two-space indent and
/// whitespace-only text dropped. Content that mixes text and elements stays on
/// one line with whitespace runs collapsed, so the rendered text is unchanged.
/// `pre`/`textarea` children and `script`/`style` text are written verbatim.
pub fn pretty_html(root: &NodeRef) -> String {
    let mut out = String::new();
    for child in root.children() {
        write_node(&child, 0, &mut out);
    }
    out
}

fn write_node(node: &NodeRef, depth: usize, out: &mut String) {
    match node.data() {
        NodeData::Element(el) => {
            let tag = el.name.local.as_ref();
            push_indent(depth, out);
            write_open_tag(node, out);
            if is_void(tag) {
                out.push('\n');
                return;
            }

            if is_one_of(&RAW_TEXT_ELEMENTS, tag) || is_one_of(&PREFORMATTED_ELEMENTS, tag) {
                write_verbatim_children(node, out);
            } else {
                let children: Vec<NodeRef> = node.children().filter(is_significant).collect();
                if !children.is_empty() && children.iter().all(is_block_child) {
                    out.push('\n');
                    for child in &children {
                        write_node(child, depth + 1, out);
                    }
                    push_indent(depth, out);
                } else {
                    let mut inline = String::new();
                    for child in node.children() {
                        write_inline(&child, &mut inline);
                    }
                    out.push_str(inline.trim_matches(' '));
                }
            }
            close_tag(tag, out);
            out.push('\n');
        }
        NodeData::Text(text) => {
            let collapsed = collapse_whitespace(&text.borrow());
            if collapsed.is_empty() {
                return;
            }
            push_indent(depth, out);
            escape_text(&collapsed, out);
            out.push('\n');
        }
        NodeData::Comment(text) => {
            push_indent(depth, out);
            write_comment(&text.borrow(), out);
            out.push('\n');
        }
        _ => {
            for child in node.children() {
                write_node(&child, depth, out);
            }
        }
    }
}

// Mixed content: no line breaks or indentation, whitespace runs become one space.
fn write_inline(node: &NodeRef, out: &mut String) {
    match node.data() {
        NodeData::Element(el) => {
            let tag = el.name.local.as_ref();
            write_open_tag(node, out);
            if is_void(tag) {
                return;
            }
            if is_one_of(&RAW_TEXT_ELEMENTS, tag) || is_one_of(&PREFORMATTED_ELEMENTS, tag) {
                write_verbatim_children(node, out);
            } else {
                for child in node.children() {
                    write_inline(&child, out);
                }
            }
            close_tag(tag, out);
        }
        NodeData::Text(text) => escape_text(&squeeze_whitespace(&text.borrow()), out),
        NodeData::Comment(text) => write_comment(&text.borrow(), out),
        _ => {}
    }
}

fn write_verbatim_children(node: &NodeRef, out: &mut String) {
    let raw_text = node
        .as_element()
        .is_some_and(|el| is_one_of(&RAW_TEXT_ELEMENTS, el.name.local.as_ref()));
    if raw_text {
        out.push_str(&node.text_contents());
        return;
    }
    for child in node.children() {
        write_verbatim(&child, out);
    }
}

fn write_verbatim(node: &NodeRef, out: &mut String) {
    match node.data() {
        NodeData::Element(el) => {
            let tag = el.name.local.as_ref();
            write_open_tag(node, out);
            if is_void(tag) {
                return;
            }
            write_verbatim_children(node, out);
            close_tag(tag, out);
        }
        NodeData::Text(text) => escape_text(&text.borrow(), out),
        NodeData::Comment(text) => write_comment(&text.borrow(), out),
        _ => {}
    }
}

fn write_open_tag(node: &NodeRef, out: &mut String) {
    let Some(el) = node.as_element() else {
        return;
    };
    out.push('<');
    out.push_str(el.name.local.as_ref());
    let attrs = el.attributes.borrow();
    // BTreeMap keyed by expanded name keeps attribute order stable.
    for (name, attr) in attrs.map.iter() {
        out.push(' ');
        if let Some(prefix) = &attr.prefix {
            out.push_str(prefix.as_ref());
            out.push(':');
        }
        out.push_str(name.local.as_ref());
        out.push_str("=\"");
        escape_attr(&attr.value, out);
        out.push('"');
    }
    out.push('>');
}

fn write_comment(text: &str, out: &mut String) {
    out.push_str("<!--");
    out.push_str(text);
    out.push_str("-->");
}

fn close_tag(tag: &str, out: &mut String) {
    out.push_str("</");
    out.push_str(tag);
    out.push('>');
}

fn push_indent(depth: usize, out: &mut String) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
}

fn is_void(tag: &str) -> bool {
    is_one_of(&VOID_ELEMENTS, tag)
}

fn is_one_of(tags: &[&str], tag: &str) -> bool {
    tags.iter().any(|candidate| candidate.eq_ignore_ascii_case(tag))
}

fn is_significant(node: &NodeRef) -> bool {
    match node.data() {
        NodeData::Text(text) => !text.borrow().trim().is_empty(),
        NodeData::Element(_) | NodeData::Comment(_) => true,
        _ => false,
    }
}

fn is_block_child(node: &NodeRef) -> bool {
    matches!(node.data(), NodeData::Element(_) | NodeData::Comment(_))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

// Like `collapse_whitespace`, but a leading or trailing run survives as one space.
fn squeeze_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for ch in text.chars() {
        if ch.is_whitespace() && ch != '\u{a0}' {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(ch);
            in_space = false;
        }
    }
    out
}

pub(crate) fn escape_text(input: &str, out: &mut String) {
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
}

pub(crate) fn escape_attr(input: &str, out: &mut String) {
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const TEMPLATE: &str = r##"
    <html>
      <body>
        <div id="header">
          <img src="$company.logo" class="h-24">
          <h1>  Invoice
             #$invoice.number </h1>
        </div>
        <div id="footer" class="flex   mt-10">
          <p>Thanks &amp; regards</p>
          <!-- signature -->
          <span>Paid</span> in full
        </div>
        <pre id="terms">  keep
   this  </pre>
      </body>
    </html>
    "##;

    #[test]
    fn footer_section_is_a_single_pretty_printed_div() {
        let tree = DocumentTree::parse(TEMPLATE).expect("tree");
        let html = extract_section(&tree, "footer", SectionLookup::Id).expect("footer");
        assert_eq!(
            html,
            "<div class=\"flex   mt-10\" id=\"footer\"><p>Thanks &amp; regards</p> <!-- signature --> <span>Paid</span> in full</div>\n"
        );
    }

    #[test]
    fn missing_section_is_none() {
        let tree = DocumentTree::parse(TEMPLATE).expect("tree");
        assert_eq!(extract_section(&tree, "missing-id", SectionLookup::Id), None);
        assert_eq!(extract_section(&tree, "section", SectionLookup::Tag), None);
    }

    #[test]
    fn extraction_is_idempotent() {
        let tree = DocumentTree::parse(TEMPLATE).expect("tree");
        let first = extract_section(&tree, "header", SectionLookup::Id);
        let second = extract_section(&tree, "header", SectionLookup::Id);
        assert!(first.is_some());
        assert_eq!(first, second);
    }

    #[test]
    fn void_elements_and_collapsed_text() {
        let tree = DocumentTree::parse(TEMPLATE).expect("tree");
        let html = extract_section(&tree, "header", SectionLookup::Id).expect("header");
        assert_eq!(
            html,
            "<div id=\"header\">\n  <img class=\"h-24\" src=\"$company.logo\">\n  <h1>Invoice #$invoice.number</h1>\n</div>\n"
        );
    }

    #[test]
    fn lookup_by_tag_takes_first_in_document_order() {
        let tree = DocumentTree::parse(TEMPLATE).expect("tree");
        let html = extract_section(&tree, "h1", SectionLookup::Tag).expect("h1");
        assert_eq!(html, "<h1>Invoice #$invoice.number</h1>\n");
    }

    #[test]
    fn preformatted_text_is_kept() {
        let tree = DocumentTree::parse(TEMPLATE).expect("tree");
        let html = extract_section(&tree, "terms", SectionLookup::Id).expect("terms");
        assert_eq!(html, "<pre id=\"terms\">  keep\n   this  </pre>\n");
    }

    #[test]
    fn preformatted_markup_is_kept() {
        let tree = DocumentTree::parse(r#"<pre id="terms"><strong>Net 30</strong>  days</pre>"#)
            .expect("tree");
        let html = extract_section(&tree, "terms", SectionLookup::Id).expect("terms");
        assert_eq!(html, "<pre id=\"terms\"><strong>Net 30</strong>  days</pre>\n");
    }

    #[test]
    fn mixed_content_stays_on_one_line() {
        let tree =
            DocumentTree::parse(r#"<p id="t">Total:  <b>$invoice.amount</b>!</p>"#).expect("tree");
        let html = extract_section(&tree, "t", SectionLookup::Id).expect("t");
        assert_eq!(html, "<p id=\"t\">Total: <b>$invoice.amount</b>!</p>\n");

        let reparsed = DocumentTree::parse(&html).expect("reparsed");
        let text = reparsed.find_by_id("t").expect("t").text_contents();
        assert_eq!(text, "Total: $invoice.amount!");
    }

    #[test]
    fn element_only_content_inside_mixed_content_is_not_indented() {
        let tree = DocumentTree::parse(
            "<div id=\"d\">\n  <p>Due <span>\n  <b>now</b>\n  </span></p>\n</div>",
        )
        .expect("tree");
        let html = extract_section(&tree, "d", SectionLookup::Id).expect("d");
        assert_eq!(html, "<div id=\"d\">\n  <p>Due <span> <b>now</b> </span></p>\n</div>\n");
    }

    #[test]
    fn prefixed_attributes_keep_their_prefix() {
        let tree = DocumentTree::parse(
            r##"<div id="logo"><svg xmlns:xlink="http://www.w3.org/1999/xlink"><use xlink:href="#mark"></use></svg></div>"##,
        )
        .expect("tree");
        let html = extract_section(&tree, "logo", SectionLookup::Id).expect("logo");
        assert!(html.contains(r#"<svg xmlns:xlink="http://www.w3.org/1999/xlink">"#));
        assert!(html.contains(r##"<use xlink:href="#mark"></use>"##));
    }

    #[test]
    fn extraction_leaves_the_tree_untouched() {
        let tree = DocumentTree::parse(TEMPLATE).expect("tree");
        let _ = extract_section(&tree, "footer", SectionLookup::Id);
        assert!(tree.find_by_id("footer").is_some());
        assert_eq!(tree.find_by_id("footer").expect("footer").children().len(), 2);
    }
}
