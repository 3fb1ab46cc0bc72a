use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Payload of a create or update call: column name → value.
pub type Fields = BTreeMap<String, FieldValue>;

/// Identifies one physical specimen: a plant identifier plus its instance
/// number. The number is always stored in normalised form, see
/// [`normalize_number`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SpecimenKey {
    pub plant_id: String,
    pub number: String,
}

impl SpecimenKey {
    /// Creates a key, normalising the sequence number.
    pub fn new(plant_id: impl Into<String>, number: &str) -> Self {
        Self {
            plant_id: plant_id.into(),
            number: normalize_number(number),
        }
    }
}

impl fmt::Display for SpecimenKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.plant_id, self.number)
    }
}

/// Brings numeric sequence numbers into one textual form so that `"1"`,
/// `"1.0"` and `1` address the same specimen. Non-numeric input is returned
/// trimmed.
pub fn normalize_number(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => format_number(value),
        _ => trimmed.to_string(),
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// A locally derived specimen the remote table should contain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantRecord {
    pub plant_id: String,
    pub number: String,
    pub name: String,
    /// Empty when the name tag carries no variety.
    pub variety: String,
    pub location: String,
    pub alive: bool,
}

impl PlantRecord {
    pub fn key(&self) -> SpecimenKey {
        SpecimenKey::new(self.plant_id.clone(), &self.number)
    }

    /// Value of a single column for this record.
    pub fn value(&self, field: Field) -> FieldValue {
        match field {
            Field::PlantId => FieldValue::Text(self.plant_id.clone()),
            Field::Number => match self.number.parse::<f64>() {
                Ok(number) if number.is_finite() => FieldValue::Number(number),
                _ => FieldValue::Text(self.number.clone()),
            },
            Field::Name => FieldValue::Text(self.name.clone()),
            Field::Variety => FieldValue::Text(self.variety.clone()),
            Field::Location => FieldValue::Text(self.location.clone()),
            Field::Alive => FieldValue::Bool(self.alive),
        }
    }

    /// Payload for a create call. Blank values are left out so that the
    /// remote side stores them as absent.
    pub fn create_fields(&self, field_set: &FieldSet) -> Fields {
        field_set
            .submitted
            .iter()
            .map(|field| (field.column().to_string(), self.value(*field)))
            .filter(|(_, value)| !value.is_blank())
            .collect()
    }

    /// Payload for an update call. Blank values are sent so the remote value
    /// is cleared.
    pub fn update_fields(&self, field_set: &FieldSet) -> Fields {
        field_set
            .submitted
            .iter()
            .map(|field| (field.column().to_string(), self.value(*field)))
            .collect()
    }
}

/// A record as returned by the remote table. Fields missing from `fields`
/// are absent, which is not the same as an empty value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRecord {
    pub id: String,
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
    #[serde(rename = "createdTime", default, skip_serializing_if = "Option::is_none")]
    pub created_time: Option<String>,
}

impl RemoteRecord {
    /// Value of a column, or `None` when absent or null.
    pub fn field(&self, column: &str) -> Option<FieldValue> {
        self.fields.get(column).and_then(FieldValue::from_json)
    }

    /// Textual value of a column, if present and not blank.
    pub fn text(&self, column: &str) -> Option<String> {
        self.field(column)
            .filter(|value| !value.is_blank())
            .map(|value| value.as_text())
    }

    /// The specimen key carried by the record's own fields. `None` marks a
    /// malformed record.
    pub fn specimen_key(&self) -> Option<SpecimenKey> {
        let plant_id = self.text(Field::PlantId.column())?;
        let number = self.field(Field::Number.column())?;
        match &number {
            FieldValue::Number(_) => Some(SpecimenKey::new(plant_id, &number.as_text())),
            FieldValue::Text(text) if text.trim().parse::<f64>().is_ok() => {
                Some(SpecimenKey::new(plant_id, text))
            }
            _ => None,
        }
    }
}

/// Scalar value of a remote column.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl FieldValue {
    /// Converts a raw JSON value. Arrays and objects keep their JSON text so
    /// they still compare by value.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Bool(flag) => Some(FieldValue::Bool(*flag)),
            Value::Number(number) => number.as_f64().map(FieldValue::Number),
            Value::String(text) => Some(FieldValue::Text(text.clone())),
            other => Some(FieldValue::Text(other.to_string())),
        }
    }

    /// Canonical textual representation used for comparisons.
    pub fn as_text(&self) -> String {
        match self {
            FieldValue::Bool(flag) => flag.to_string(),
            FieldValue::Number(number) => format_number(*number),
            FieldValue::Text(text) => text.clone(),
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, FieldValue::Text(text) if text.trim().is_empty())
    }

    /// Value equality on the canonical representation.
    pub fn same_value(&self, other: &FieldValue) -> bool {
        self.as_text() == other.as_text()
    }
}

impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        self.same_value(other)
    }
}

/// Columns of the garden plants table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    PlantId,
    Number,
    Name,
    Variety,
    Location,
    Alive,
}

impl Field {
    /// Column name in the remote table.
    pub fn column(self) -> &'static str {
        match self {
            Field::PlantId => "Plant ID",
            Field::Number => "Number",
            Field::Name => "Name",
            Field::Variety => "Variety",
            Field::Location => "Location",
            Field::Alive => "Alive",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// Which columns take part in comparison and which are written on create
/// and update. Script variants differ only in this set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSet {
    pub compared: Vec<Field>,
    pub submitted: Vec<Field>,
}

impl FieldSet {
    /// The garden plants table: name, variety and location are compared,
    /// every column is written.
    pub fn garden() -> Self {
        Self {
            compared: vec![Field::Name, Field::Variety, Field::Location],
            submitted: vec![
                Field::PlantId,
                Field::Number,
                Field::Name,
                Field::Variety,
                Field::Location,
                Field::Alive,
            ],
        }
    }
}

impl Default for FieldSet {
    fn default() -> Self {
        Self::garden()
    }
}
