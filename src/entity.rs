use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Named field lookup on an entity-like record.
///
/// `None` means the field is unknown or unset; both classify as null.
pub trait FieldAccessible {
    fn get(&self, field: &str) -> Option<Value>;
}

fn text(value: &Option<String>) -> Option<Value> {
    value.clone().map(Value::from)
}

// Exported records carry explicit nulls for unset columns; read them as the default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawTypeId", into = "u8")]
pub enum LineItemType {
    Standard,
    Task,
    UnpaidFee,
    PaidFee,
    LateFee,
    Expense,
    Other(u8),
}

impl LineItemType {
    pub fn id(self) -> u8 {
        match self {
            LineItemType::Standard => 1,
            LineItemType::Task => 2,
            LineItemType::UnpaidFee => 3,
            LineItemType::PaidFee => 4,
            LineItemType::LateFee => 5,
            LineItemType::Expense => 6,
            LineItemType::Other(id) => id,
        }
    }
}

// A line without a type is not a product line.
impl Default for LineItemType {
    fn default() -> Self {
        LineItemType::Other(0)
    }
}

impl From<u8> for LineItemType {
    fn from(value: u8) -> Self {
        match value {
            1 => LineItemType::Standard,
            2 => LineItemType::Task,
            3 => LineItemType::UnpaidFee,
            4 => LineItemType::PaidFee,
            5 => LineItemType::LateFee,
            6 => LineItemType::Expense,
            other => LineItemType::Other(other),
        }
    }
}

impl From<LineItemType> for u8 {
    fn from(value: LineItemType) -> Self {
        value.id()
    }
}

// Line items arrive with `type_id` either as a number or as a numeric string.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawTypeId {
    Number(u64),
    Text(String),
}

impl From<RawTypeId> for LineItemType {
    fn from(raw: RawTypeId) -> Self {
        let id = match raw {
            RawTypeId::Number(n) => u8::try_from(n).unwrap_or(0),
            RawTypeId::Text(s) => s.trim().parse::<u8>().unwrap_or(0),
        };
        LineItemType::from(id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineItem {
    #[serde(deserialize_with = "null_as_default")]
    pub product_key: String,
    #[serde(deserialize_with = "null_as_default")]
    pub notes: String,
    #[serde(deserialize_with = "null_as_default")]
    pub cost: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub quantity: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub discount: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub tax_name1: String,
    #[serde(deserialize_with = "null_as_default")]
    pub tax_rate1: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub tax_name2: String,
    #[serde(deserialize_with = "null_as_default")]
    pub tax_rate2: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub tax_name3: String,
    #[serde(deserialize_with = "null_as_default")]
    pub tax_rate3: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub line_total: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub type_id: LineItemType,
}

impl LineItem {
    pub fn product(product_key: impl Into<String>) -> Self {
        Self {
            product_key: product_key.into(),
            type_id: LineItemType::Standard,
            ..Self::default()
        }
    }

    pub fn with_type(mut self, type_id: LineItemType) -> Self {
        self.type_id = type_id;
        self
    }

    pub fn with_tax(mut self, slot: usize, name: impl Into<String>, rate: f64) -> Self {
        let name = name.into();
        match slot {
            1 => {
                self.tax_name1 = name;
                self.tax_rate1 = rate;
            }
            2 => {
                self.tax_name2 = name;
                self.tax_rate2 = rate;
            }
            3 => {
                self.tax_name3 = name;
                self.tax_rate3 = rate;
            }
            _ => {}
        }
        self
    }

    /// Tax name for slot 1..=3; `None` for any other slot.
    pub fn tax_name(&self, slot: usize) -> Option<&str> {
        match slot {
            1 => Some(&self.tax_name1),
            2 => Some(&self.tax_name2),
            3 => Some(&self.tax_name3),
            _ => None,
        }
    }
}

impl FieldAccessible for LineItem {
    fn get(&self, field: &str) -> Option<Value> {
        let value = match field {
            "product_key" | "item" => Value::from(self.product_key.clone()),
            "notes" | "description" => Value::from(self.notes.clone()),
            "cost" => Value::from(self.cost),
            "quantity" => Value::from(self.quantity),
            "discount" => Value::from(self.discount),
            "tax_name1" => Value::from(self.tax_name1.clone()),
            "tax_rate1" => Value::from(self.tax_rate1),
            "tax_name2" => Value::from(self.tax_name2.clone()),
            "tax_rate2" => Value::from(self.tax_rate2),
            "tax_name3" => Value::from(self.tax_name3.clone()),
            "tax_rate3" => Value::from(self.tax_rate3),
            "line_total" | "total" => Value::from(self.line_total),
            "type_id" => Value::from(self.type_id.id()),
            _ => return None,
        };
        Some(value)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountPlan {
    #[default]
    Free,
    Pro,
    Enterprise,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Account {
    pub plan: AccountPlan,
}

impl Account {
    pub fn is_paid(&self) -> bool {
        self.plan != AccountPlan::Free
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    pub account: Account,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Client {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    pub name: Option<String>,
    pub number: Option<String>,
    pub vat_number: Option<String>,
    pub id_number: Option<String>,
    pub address1: Option<String>,
    pub address2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub public_notes: Option<String>,
}

impl FieldAccessible for Client {
    fn get(&self, field: &str) -> Option<Value> {
        match field {
            "id" => Some(Value::from(self.id.clone())),
            "name" => text(&self.name),
            "number" => text(&self.number),
            "vat_number" => text(&self.vat_number),
            "id_number" => text(&self.id_number),
            "address1" => text(&self.address1),
            "address2" => text(&self.address2),
            "city" => text(&self.city),
            "state" => text(&self.state),
            "postal_code" => text(&self.postal_code),
            "phone" => text(&self.phone),
            "website" => text(&self.website),
            "public_notes" => text(&self.public_notes),
            _ => None,
        }
    }
}

/// Fields shared by every billable document kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentFields {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    pub number: Option<String>,
    pub date: Option<String>,
    pub po_number: Option<String>,
    pub public_notes: Option<String>,
    pub terms: Option<String>,
    pub footer: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub amount: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub balance: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub discount: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub line_items: Vec<LineItem>,
    pub user: Option<User>,
    pub custom_value1: Option<String>,
    pub custom_value2: Option<String>,
    pub custom_value3: Option<String>,
    pub custom_value4: Option<String>,
}

impl FieldAccessible for DocumentFields {
    fn get(&self, field: &str) -> Option<Value> {
        match field {
            "id" => Some(Value::from(self.id.clone())),
            "number" => text(&self.number),
            "date" => text(&self.date),
            "po_number" => text(&self.po_number),
            "public_notes" => text(&self.public_notes),
            "terms" => text(&self.terms),
            "footer" => text(&self.footer),
            "amount" => Some(Value::from(self.amount)),
            "balance" => Some(Value::from(self.balance)),
            "discount" => Some(Value::from(self.discount)),
            "line_items" => serde_json::to_value(&self.line_items).ok(),
            "custom_value1" => text(&self.custom_value1),
            "custom_value2" => text(&self.custom_value2),
            "custom_value3" => text(&self.custom_value3),
            "custom_value4" => text(&self.custom_value4),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Invoice {
    #[serde(flatten)]
    pub fields: DocumentFields,
    pub due_date: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub partial: f64,
    pub partial_due_date: Option<String>,
}

impl FieldAccessible for Invoice {
    fn get(&self, field: &str) -> Option<Value> {
        match field {
            "due_date" => text(&self.due_date),
            "partial" => Some(Value::from(self.partial)),
            "partial_due_date" => text(&self.partial_due_date),
            _ => self.fields.get(field),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Quote {
    #[serde(flatten)]
    pub fields: DocumentFields,
    pub valid_until: Option<String>,
}

impl FieldAccessible for Quote {
    fn get(&self, field: &str) -> Option<Value> {
        match field {
            // Quote designs reuse the invoice due date slot.
            "valid_until" | "due_date" => text(&self.valid_until),
            _ => self.fields.get(field),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Credit {
    #[serde(flatten)]
    pub fields: DocumentFields,
    pub invoice_number: Option<String>,
}

impl FieldAccessible for Credit {
    fn get(&self, field: &str) -> Option<Value> {
        match field {
            "invoice_number" => text(&self.invoice_number),
            _ => self.fields.get(field),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entity", rename_all = "snake_case")]
pub enum Entity {
    Invoice(Invoice),
    Quote(Quote),
    Credit(Credit),
}

impl Entity {
    fn fields(&self) -> &DocumentFields {
        match self {
            Entity::Invoice(invoice) => &invoice.fields,
            Entity::Quote(quote) => &quote.fields,
            Entity::Credit(credit) => &credit.fields,
        }
    }

    pub fn id(&self) -> &str {
        &self.fields().id
    }

    /// Alias used in variable references (`$invoice.number`).
    pub fn alias(&self) -> &'static str {
        match self {
            Entity::Invoice(_) => "invoice",
            Entity::Quote(_) => "quote",
            Entity::Credit(_) => "credit",
        }
    }

    pub fn line_items(&self) -> &[LineItem] {
        &self.fields().line_items
    }

    pub fn user(&self) -> Option<&User> {
        self.fields().user.as_ref()
    }

    pub fn account_is_paid(&self) -> bool {
        self.user().is_some_and(|user| user.account.is_paid())
    }
}

impl FieldAccessible for Entity {
    fn get(&self, field: &str) -> Option<Value> {
        match self {
            Entity::Invoice(invoice) => invoice.get(field),
            Entity::Quote(quote) => quote.get(field),
            Entity::Credit(credit) => credit.get(field),
        }
    }
}
