use crate::doc_context::DesignContext;
use crate::elements::ElementSpec;
use crate::entity::{FieldAccessible, LineItem, LineItemType};
use crate::error::DesignResult;
use crate::finalize::SectionElements;
use crate::section::SectionLookup;
use crate::variables::decompose_reference;
use serde_json::Value;

/// A document design: which template sections are lifted out as fragments,
/// and which elements fill the template's sections for a bound entity.
pub trait Design: Send + Sync {
    fn name(&self) -> &str;

    fn sections(&self) -> Vec<(String, SectionLookup)> {
        Vec::new()
    }

    fn elements(&self, ctx: &DesignContext) -> DesignResult<SectionElements>;
}

pub const PLAIN_TEMPLATE: &str = r##"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>$entity_label</title>
</head>
<body>
  <div id="header">
    <img id="company-logo" src="$company.logo">
  </div>
  <table id="entity-details"></table>
  <table id="product-table"></table>
  <div id="footer"></div>
</body>
</html>"##;

const DETAIL_FIELDS: [&str; 5] = ["number", "po_number", "date", "due_date", "balance"];

// Label and amount cells of the totals row.
const TOTALS_CELLS: usize = 2;

#[derive(Debug, Clone, Copy, Default)]
pub struct PlainDesign;

impl PlainDesign {
    fn entity_details(&self, ctx: &DesignContext) -> DesignResult<Vec<ElementSpec>> {
        let alias = ctx.entity().alias();
        DETAIL_FIELDS
            .iter()
            .map(|field| -> DesignResult<ElementSpec> {
                let reference = format!("${alias}.{field}");
                Ok(ElementSpec::new("tr")
                    .hidden(ctx.entity_variable_check(&reference)?)
                    .child(ElementSpec::new("th").content(format!("{reference}_label")))
                    .child(ElementSpec::new("td").content(reference)))
            })
            .collect()
    }

    fn product_table(&self, ctx: &DesignContext) -> DesignResult<Vec<ElementSpec>> {
        let columns = ctx.requested_columns();

        let mut head = ElementSpec::new("tr");
        for column in columns {
            head = head.child(
                ElementSpec::new("th")
                    .property("data-ref", format!("product_table-{}-th", column_key(column)))
                    .content(column.clone()),
            );
        }

        let mut body = ElementSpec::new("tbody");
        let products = ctx
            .entity()
            .line_items()
            .iter()
            .filter(|item| item.type_id == LineItemType::Standard);
        for item in products {
            let mut row = ElementSpec::new("tr");
            for column in columns {
                row = row.child(ElementSpec::new("td").content(cell_text(item, column)?));
            }
            body = body.child(row);
        }

        // A table narrower than the totals row still gets a one-column spacer.
        let colspan = ctx.calculate_colspan(TOTALS_CELLS).max(1);
        let totals = ElementSpec::new("tfoot").child(
            ElementSpec::new("tr")
                .child(ElementSpec::new("td").property("colspan", colspan.to_string()))
                .child(ElementSpec::new("td").content("$total_label"))
                .child(ElementSpec::new("td").content(display_value(ctx.entity().get("amount")))),
        );

        Ok(vec![ElementSpec::new("thead").child(head), body, totals])
    }
}

impl Design for PlainDesign {
    fn name(&self) -> &str {
        "plain"
    }

    fn sections(&self) -> Vec<(String, SectionLookup)> {
        vec![
            ("header".to_string(), SectionLookup::Id),
            ("footer".to_string(), SectionLookup::Id),
        ]
    }

    fn elements(&self, ctx: &DesignContext) -> DesignResult<SectionElements> {
        let mut elements = SectionElements::new();
        elements.insert("entity-details".to_string(), self.entity_details(ctx)?);
        elements.insert("product-table".to_string(), self.product_table(ctx)?);
        elements.insert("footer".to_string(), vec![ctx.shared_footer_elements()]);
        Ok(elements)
    }
}

fn column_key(column: &str) -> String {
    column.trim_start_matches('$').replace('.', "_")
}

fn cell_text(item: &LineItem, column: &str) -> DesignResult<String> {
    let field = if column.starts_with('$') {
        decompose_reference(column)?
    } else {
        column
    };
    Ok(display_value(item.get(field)))
}

fn display_value(value: Option<Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text,
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_keys_are_attribute_safe() {
        assert_eq!(column_key("$product.tax_rate1"), "product_tax_rate1");
        assert_eq!(column_key("description"), "description");
    }

    #[test]
    fn cells_resolve_line_item_fields() {
        let item = LineItem::product("widget").with_tax(1, "VAT", 20.0);
        assert_eq!(cell_text(&item, "$product.item").expect("cell"), "widget");
        assert_eq!(cell_text(&item, "$product.tax_rate1").expect("cell"), "20.0");
        assert_eq!(cell_text(&item, "$product.unknown").expect("cell"), "");
        assert!(cell_text(&item, "$product").is_err());
    }
}
