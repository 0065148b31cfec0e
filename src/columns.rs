use crate::entity::{LineItem, LineItemType};

pub const PRODUCT_TAX_PLACEHOLDER: &str = "$product.tax";
pub const PRODUCT_TAX_RATE_COLUMNS: [&str; 3] = [
    "$product.tax_rate1",
    "$product.tax_rate2",
    "$product.tax_rate3",
];

/// Which placeholder expands into which tax-rate columns, and which line
/// items are counted when deciding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxColumnSpec {
    pub placeholder: String,
    pub rate_columns: [String; 3],
    pub counted_type: LineItemType,
}

impl TaxColumnSpec {
    pub fn product() -> Self {
        Self {
            placeholder: PRODUCT_TAX_PLACEHOLDER.to_string(),
            rate_columns: PRODUCT_TAX_RATE_COLUMNS.map(str::to_string),
            counted_type: LineItemType::Standard,
        }
    }
}

impl Default for TaxColumnSpec {
    fn default() -> Self {
        Self::product()
    }
}

/// Tax-rate columns that at least one counted line item needs, in slot order.
pub fn included_tax_columns<'a>(spec: &'a TaxColumnSpec, line_items: &[LineItem]) -> Vec<&'a str> {
    let counted: Vec<&LineItem> = line_items
        .iter()
        .filter(|item| item.type_id == spec.counted_type)
        .collect();

    (1..=3)
        .filter(|slot| {
            counted
                .iter()
                .filter(|item| item.tax_name(*slot).is_some_and(|name| !name.is_empty()))
                .count()
                > 0
        })
        .map(|slot| spec.rate_columns[slot - 1].as_str())
        .collect()
}

/// Replace the generic tax placeholder with the tax-rate columns the line
/// items actually use.
///
/// The placeholder's first occurrence is spliced in place (position 0
/// included). When no slot is used the placeholder is dropped and the table
/// loses a column, so colspans must be computed after this runs.
pub fn plan_tax_columns(columns: &mut Vec<String>, line_items: &[LineItem], spec: &TaxColumnSpec) {
    let Some(position) = columns.iter().position(|c| *c == spec.placeholder) else {
        return;
    };
    let replacement: Vec<String> = included_tax_columns(spec, line_items)
        .into_iter()
        .map(str::to_string)
        .collect();
    log::debug!(
        "tax columns: {} -> {:?} at position {}",
        spec.placeholder,
        replacement,
        position
    );
    columns.splice(position..=position, replacement);
}

/// Columns left for a spanning cell. Not clamped: callers that take more than
/// the total get zero or a negative number back.
pub fn remaining_colspan(total_columns: i64, columns_taken: i64) -> i64 {
    total_columns - columns_taken
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn columns(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    fn plan(tokens: &[&str], items: &[LineItem]) -> Vec<String> {
        let mut cols = columns(tokens);
        plan_tax_columns(&mut cols, items, &TaxColumnSpec::product());
        cols
    }

    #[test]
    fn single_tax_slot_replaces_placeholder_in_place() {
        let items = vec![
            LineItem::product("widget").with_tax(1, "VAT", 20.0),
            LineItem::product("gadget"),
        ];
        assert_eq!(
            plan(&["description", "$product.tax", "total"], &items),
            columns(&["description", "$product.tax_rate1", "total"])
        );
    }

    #[test]
    fn no_tax_names_drop_the_column() {
        let items = vec![LineItem::product("widget"), LineItem::product("gadget")];
        assert_eq!(
            plan(&["description", "$product.tax", "total"], &items),
            columns(&["description", "total"])
        );
    }

    #[test]
    fn all_slots_expand_in_slot_order() {
        let items = vec![
            LineItem::product("a").with_tax(3, "City", 1.0),
            LineItem::product("b").with_tax(2, "State", 4.0),
            LineItem::product("c").with_tax(1, "VAT", 20.0),
        ];
        assert_eq!(
            plan(&["description", "$product.tax", "total"], &items),
            columns(&[
                "description",
                "$product.tax_rate1",
                "$product.tax_rate2",
                "$product.tax_rate3",
                "total"
            ])
        );
    }

    #[test]
    fn only_standard_lines_are_counted() {
        let items = vec![
            LineItem::product("fee")
                .with_type(LineItemType::LateFee)
                .with_tax(1, "VAT", 20.0),
            LineItem::product("task")
                .with_type(LineItemType::Task)
                .with_tax(2, "GST", 5.0),
        ];
        assert_eq!(
            plan(&["description", "$product.tax", "total"], &items),
            columns(&["description", "total"])
        );
    }

    #[test]
    fn lines_without_a_type_are_not_counted() {
        let items: Vec<LineItem> = serde_json::from_value(serde_json::json!([
            {"product_key": "note", "tax_name1": "VAT"},
            {"product_key": "widget", "tax_name2": null, "tax_name3": "City", "type_id": 1}
        ]))
        .expect("items");
        assert_eq!(
            plan(&["description", "$product.tax", "total"], &items),
            columns(&["description", "$product.tax_rate3", "total"])
        );
    }

    #[test]
    fn placeholder_at_position_zero_is_spliced() {
        let items = vec![LineItem::product("a").with_tax(2, "GST", 5.0)];
        assert_eq!(
            plan(&["$product.tax", "total"], &items),
            columns(&["$product.tax_rate2", "total"])
        );
    }

    #[test]
    fn without_placeholder_nothing_changes() {
        let items = vec![LineItem::product("a").with_tax(1, "VAT", 20.0)];
        assert_eq!(
            plan(&["description", "total"], &items),
            columns(&["description", "total"])
        );
    }

    #[test]
    fn only_first_placeholder_is_replaced() {
        let items = vec![LineItem::product("a").with_tax(1, "VAT", 20.0)];
        assert_eq!(
            plan(&["$product.tax", "$product.tax"], &items),
            columns(&["$product.tax_rate1", "$product.tax"])
        );
    }

    #[test]
    fn never_more_than_three_rate_columns() {
        let names = ["", "VAT"];
        for a in names {
            for b in names {
                for c in names {
                    let items = vec![
                        LineItem::product("x")
                            .with_tax(1, a, 1.0)
                            .with_tax(2, b, 1.0)
                            .with_tax(3, c, 1.0),
                        LineItem::product("y").with_tax(1, "VAT", 1.0),
                    ];
                    let planned = plan(&["description", "$product.tax", "total"], &items);
                    let rate_columns = planned
                        .iter()
                        .filter(|c| c.starts_with("$product.tax_rate"))
                        .count();
                    assert!(rate_columns <= 3);
                    assert!(!planned.iter().any(|c| c == PRODUCT_TAX_PLACEHOLDER));
                }
            }
        }
    }

    #[test]
    fn colspan_is_plain_subtraction() {
        assert_eq!(remaining_colspan(5, 2), 3);
        assert_eq!(remaining_colspan(5, 5), 0);
        assert_eq!(remaining_colspan(0, 0), 0);
        assert_eq!(remaining_colspan(2, 4), -2);
    }
}
