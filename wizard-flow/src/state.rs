use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use crate::error::{Result, WizardError};

pub const EDIT_MODE: &str = "edit_mode";
pub const SUBMISSION_INFO: &str = "submission_info";

/// Answers collected so far by one wizard instance.
///
/// Fields are filled incrementally, one or more per step. A field that is
/// absent or `null` is treated as not yet answered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WizardState {
    fields: Map<String, Value>,
}

impl WizardState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a state from a JSON object. Anything else is rejected.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            Value::Null => Ok(Self::new()),
            other => Err(WizardError::InvalidArgument(format!(
                "wizard state must be a JSON object, got {other}"
            ))),
        }
    }

    /// Typed read. Missing, null and mistyped values all read as `None`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.fields
            .get(key)
            .filter(|v| !v.is_null())
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn get_value(&self, key: &str) -> Option<&Value> {
        self.fields.get(key).filter(|v| !v.is_null())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get_value(key).is_some()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Serialize) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.fields.insert(key.into(), value);
        Ok(())
    }

    /// Builder form of [`WizardState::set`].
    pub fn with(mut self, key: impl Into<String>, value: impl Serialize) -> Result<Self> {
        self.set(key, value)?;
        Ok(self)
    }

    /// Mark a field as answered-with-nothing. Merging this into a stored
    /// state clears the stored answer.
    pub fn unset(&mut self, key: impl Into<String>) {
        self.fields.insert(key.into(), Value::Null);
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.fields.remove(key)
    }

    /// Shallow merge: every key of `partial` overwrites the stored value,
    /// every other key is kept as is.
    pub fn merge(&mut self, partial: WizardState) {
        for (key, value) in partial.fields {
            self.fields.insert(key, value);
        }
    }

    pub fn merged(mut self, partial: WizardState) -> Self {
        self.merge(partial);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn edit_mode(&self) -> bool {
        self.get(EDIT_MODE).unwrap_or(false)
    }

    pub fn is_submitted(&self) -> bool {
        self.contains(SUBMISSION_INFO)
    }

    pub fn submission_info<T: DeserializeOwned>(&self) -> Option<T> {
        self.get(SUBMISSION_INFO)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }
}

impl From<Map<String, Value>> for WizardState {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn state(value: Value) -> WizardState {
        WizardState::from_value(value).unwrap()
    }

    #[test]
    fn test_merge_overwrites_only_present_keys() {
        let mut stored = state(json!({ "tax_filing": true, "marital_status": "1" }));
        stored.merge(state(json!({ "marital_status": "2", "dental_insurance": false })));

        assert_eq!(
            stored,
            state(json!({ "tax_filing": true, "marital_status": "2", "dental_insurance": false }))
        );
    }

    #[test]
    fn test_merge_replaces_arrays_and_objects_wholesale() {
        let mut stored = state(json!({
            "children": [{ "id": "a" }, { "id": "b" }],
            "mailing_address": { "city": "Ottawa", "country": "CAN" }
        }));
        stored.merge(state(json!({
            "children": [{ "id": "c" }],
            "mailing_address": { "city": "Gatineau" }
        })));

        assert_eq!(stored.get_value("children"), Some(&json!([{ "id": "c" }])));
        assert_eq!(stored.get_value("mailing_address"), Some(&json!({ "city": "Gatineau" })));
    }

    #[test]
    fn test_sequential_merges_match_single_union_merge() {
        let base = state(json!({ "terms_and_conditions": { "acknowledge_terms": true } }));
        let a = state(json!({ "tax_filing": true }));
        let b = state(json!({ "date_of_birth": "1990-04-02" }));

        let mut sequential = base.clone();
        sequential.merge(a.clone());
        sequential.merge(b.clone());
        sequential.merge(b.clone());

        let union = a.merged(b);
        assert_eq!(sequential, base.merged(union));
    }

    #[test]
    fn test_null_reads_as_absent() {
        let mut stored = state(json!({ "partner_information": { "first_name": "Ana" } }));
        let mut partial = WizardState::new();
        partial.unset("partner_information");
        stored.merge(partial);

        assert!(!stored.contains("partner_information"));
        assert_eq!(stored.get::<Value>("partner_information"), None);
    }

    #[test]
    fn test_reserved_flags() {
        let mut stored = WizardState::new();
        assert!(!stored.edit_mode());
        assert!(!stored.is_submitted());

        stored.set(EDIT_MODE, true).unwrap();
        stored.set(SUBMISSION_INFO, json!({ "confirmation_code": "123" })).unwrap();
        assert!(stored.edit_mode());
        assert!(stored.is_submitted());
    }

    #[test]
    fn test_rejects_non_object_state() {
        assert!(WizardState::from_value(json!([1, 2])).is_err());
        assert!(WizardState::from_value(Value::Null).unwrap().is_empty());
    }
}
