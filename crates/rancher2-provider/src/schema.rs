//! Field schemas, diff suppression and change sets.
//!
//! Tracked state is diffed field by field on its serialized form. Only fields
//! the user can declare take part; computed fields are owned by the remote.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

/// Name of the User field carrying the directory identity.
pub const DIRECTORY_USER_FIELD: &str = "directory_user";

/// Value type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// UTF-8 string.
    String,
    /// Boolean flag.
    Bool,
}

/// Who supplies a field's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    /// Must be declared.
    Required,
    /// May be declared.
    Optional,
    /// Set by the remote only.
    Computed,
}

/// Conditions under which a declared change is not reported as drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffSuppress {
    /// The new declared value is empty; the remote default stands.
    EmptyNewValue,
    /// A known value is being cleared; the remote never echoes it back.
    ClearingKnownValue,
    /// The new value is empty while the declared state names a directory
    /// identity, because the remote populates the field from the directory.
    EmptyWhenDirectoryIdentitySet,
}

impl DiffSuppress {
    fn suppresses(self, old: &FieldValue, new: &FieldValue, directory_identity_set: bool) -> bool {
        match self {
            Self::EmptyNewValue => new.is_empty(),
            Self::ClearingKnownValue => !old.is_empty() && new.is_empty(),
            Self::EmptyWhenDirectoryIdentitySet => directory_identity_set && new.is_empty(),
        }
    }
}

/// Schema entry for a single field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldSchema {
    /// Field name in tracked state.
    pub name: &'static str,
    /// Value type.
    #[serde(rename = "type")]
    pub ty: FieldType,
    /// Who supplies the value.
    pub presence: Presence,
    /// Whether the value must be masked in output.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub sensitive: bool,
    /// Whether a change requires replacing the resource.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub force_new: bool,
    /// Diff suppression rule.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff_suppress: Option<DiffSuppress>,
    /// Human-readable description.
    pub description: &'static str,
}

impl FieldSchema {
    /// A string field.
    #[must_use]
    pub const fn string(name: &'static str, presence: Presence, description: &'static str) -> Self {
        Self {
            name,
            ty: FieldType::String,
            presence,
            sensitive: false,
            force_new: false,
            diff_suppress: None,
            description,
        }
    }

    /// A boolean field.
    #[must_use]
    pub const fn bool(name: &'static str, presence: Presence, description: &'static str) -> Self {
        Self {
            ty: FieldType::Bool,
            ..Self::string(name, presence, description)
        }
    }

    /// Mark the field as sensitive.
    #[must_use]
    pub const fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    /// Mark the field as requiring replacement on change.
    #[must_use]
    pub const fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    /// Attach a diff suppression rule.
    #[must_use]
    pub const fn suppress(mut self, rule: DiffSuppress) -> Self {
        self.diff_suppress = Some(rule);
        self
    }

    /// Returns true if the user can declare this field.
    #[must_use]
    pub const fn is_declarable(&self) -> bool {
        !matches!(self.presence, Presence::Computed)
    }

    fn zero(&self) -> FieldValue {
        match self.ty {
            FieldType::String => FieldValue::Str(String::new()),
            FieldType::Bool => FieldValue::Bool(false),
        }
    }

    fn value_in(&self, snapshot: &Map<String, Value>) -> FieldValue {
        match snapshot.get(self.name) {
            Some(Value::String(value)) => FieldValue::Str(value.clone()),
            Some(Value::Bool(value)) => FieldValue::Bool(*value),
            _ => self.zero(),
        }
    }
}

/// The schema of a resource kind or data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Schema(&'static [FieldSchema]);

impl Schema {
    /// Wrap a static field list.
    #[must_use]
    pub const fn new(fields: &'static [FieldSchema]) -> Self {
        Self(fields)
    }

    /// All fields in declaration order.
    #[must_use]
    pub const fn fields(&self) -> &'static [FieldSchema] {
        self.0
    }

    /// Look up a field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&'static FieldSchema> {
        self.0.iter().find(|field| field.name == name)
    }

    /// Required fields that are empty in `snapshot`.
    #[must_use]
    pub fn missing_required(&self, snapshot: &Map<String, Value>) -> Vec<&'static str> {
        self.0
            .iter()
            .filter(|field| field.presence == Presence::Required)
            .filter(|field| field.value_in(snapshot).is_empty())
            .map(|field| field.name)
            .collect()
    }

    /// Compute the declared changes between two state snapshots.
    #[must_use]
    pub fn diff(&self, prior: &Map<String, Value>, desired: &Map<String, Value>) -> ChangeSet {
        let directory_identity_set = desired
            .get(DIRECTORY_USER_FIELD)
            .and_then(Value::as_str)
            .is_some_and(|dn| !dn.is_empty());

        let changes = self
            .0
            .iter()
            .filter(|field| field.is_declarable())
            .filter_map(|field| {
                let old = field.value_in(prior);
                let new = field.value_in(desired);
                if old == new {
                    return None;
                }
                if field
                    .diff_suppress
                    .is_some_and(|rule| rule.suppresses(&old, &new, directory_identity_set))
                {
                    tracing::trace!(field = field.name, "Suppressed diff");
                    return None;
                }
                Some(Change::new(field, old, new))
            })
            .collect();
        ChangeSet(changes)
    }
}

/// A typed field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// String value.
    Str(String),
    /// Boolean value.
    Bool(bool),
}

impl FieldValue {
    /// Returns true for the empty string and `false`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Str(value) => value.is_empty(),
            Self::Bool(value) => !value,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(value) => write!(f, "{value:?}"),
            Self::Bool(value) => write!(f, "{value}"),
        }
    }
}

/// A single declared change. Sensitive values are masked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Change {
    /// Field name.
    pub field: &'static str,
    /// Value in tracked state.
    pub old: FieldValue,
    /// Declared value.
    pub new: FieldValue,
    /// Whether the field forces replacement.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub force_new: bool,
}

impl Change {
    fn new(field: &FieldSchema, old: FieldValue, new: FieldValue) -> Self {
        let mask = |value: FieldValue| {
            if field.sensitive && !value.is_empty() {
                FieldValue::Str("(sensitive)".to_string())
            } else {
                value
            }
        };
        Self {
            field: field.name,
            old: mask(old),
            new: mask(new),
            force_new: field.force_new,
        }
    }
}

/// The set of declared changes for one resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ChangeSet(Vec<Change>);

impl ChangeSet {
    /// Returns true if `field` changed.
    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.0.iter().any(|change| change.field == field)
    }

    /// Returns true if nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Names of the changed fields.
    #[must_use]
    pub fn fields(&self) -> Vec<&'static str> {
        self.0.iter().map(|change| change.field).collect()
    }

    /// Names of the changed fields that force replacement.
    #[must_use]
    pub fn force_new_fields(&self) -> Vec<&'static str> {
        self.0
            .iter()
            .filter(|change| change.force_new)
            .map(|change| change.field)
            .collect()
    }

    /// Iterate over the changes.
    pub fn iter(&self) -> impl Iterator<Item = &Change> {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const USER: Schema = Schema::new(&[
        FieldSchema::string("user_id", Presence::Computed, "ID"),
        FieldSchema::string("username", Presence::Optional, "Login").force_new(),
        FieldSchema::string("password", Presence::Optional, "Password")
            .sensitive()
            .suppress(DiffSuppress::ClearingKnownValue),
        FieldSchema::string("name", Presence::Optional, "Display name")
            .suppress(DiffSuppress::EmptyWhenDirectoryIdentitySet),
        FieldSchema::string("description", Presence::Optional, "Description"),
        FieldSchema::string(DIRECTORY_USER_FIELD, Presence::Optional, "DN"),
    ]);

    const TOKEN: Schema = Schema::new(&[
        FieldSchema::string("cluster_id", Presence::Required, "Cluster").force_new(),
        FieldSchema::string("name", Presence::Optional, "Name")
            .suppress(DiffSuppress::EmptyNewValue),
        FieldSchema::bool("expired", Presence::Optional, "Expired"),
    ]);

    fn snapshot(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn computed_fields_are_ignored() {
        let prior = snapshot(json!({ "user_id": "u-1", "description": "a" }));
        let desired = snapshot(json!({ "user_id": "", "description": "a" }));
        assert!(USER.diff(&prior, &desired).is_empty());
    }

    #[test]
    fn plain_change_detected() {
        let prior = snapshot(json!({ "description": "a" }));
        let desired = snapshot(json!({ "description": "b" }));
        let changes = USER.diff(&prior, &desired);
        assert_eq!(changes.fields(), ["description"]);
        assert!(changes.force_new_fields().is_empty());
    }

    #[test]
    fn clearing_password_is_suppressed() {
        let prior = snapshot(json!({ "password": "hunter2" }));
        let desired = snapshot(json!({ "password": "" }));
        assert!(USER.diff(&prior, &desired).is_empty());
    }

    #[test]
    fn password_change_is_masked() {
        let prior = snapshot(json!({ "password": "hunter2" }));
        let desired = snapshot(json!({ "password": "hunter3" }));
        let changes = USER.diff(&prior, &desired);
        let change = changes.iter().next().unwrap();
        assert_eq!(change.new, FieldValue::Str("(sensitive)".into()));
        assert!(!serde_json::to_string(&changes).unwrap().contains("hunter"));
    }

    #[test]
    fn directory_name_suppressed_only_when_identity_set() {
        let prior = snapshot(json!({ "name": "Jane Doe", "directory_user": "CN=Jane" }));
        let desired = snapshot(json!({ "name": "", "directory_user": "CN=Jane" }));
        assert!(USER.diff(&prior, &desired).is_empty());

        let prior = snapshot(json!({ "name": "Jane Doe" }));
        let desired = snapshot(json!({ "name": "" }));
        assert_eq!(USER.diff(&prior, &desired).fields(), ["name"]);
    }

    #[test]
    fn clearing_directory_identity_applies_name_change() {
        let prior = snapshot(json!({ "name": "Jane", "directory_user": "CN=Jane" }));
        let desired = snapshot(json!({ "name": "", "directory_user": "" }));
        let changes = USER.diff(&prior, &desired);
        assert!(changes.contains("name"));
        assert!(changes.contains(DIRECTORY_USER_FIELD));
    }

    #[test]
    fn empty_new_value_is_suppressed() {
        let prior = snapshot(json!({ "cluster_id": "c-1", "name": "default-token" }));
        let desired = snapshot(json!({ "cluster_id": "c-1" }));
        assert!(TOKEN.diff(&prior, &desired).is_empty());
    }

    #[test]
    fn force_new_reported() {
        let prior = snapshot(json!({ "cluster_id": "c-1" }));
        let desired = snapshot(json!({ "cluster_id": "c-2" }));
        assert_eq!(TOKEN.diff(&prior, &desired).force_new_fields(), ["cluster_id"]);
    }

    #[test]
    fn absent_bool_equals_false() {
        let prior = snapshot(json!({ "cluster_id": "c-1", "expired": false }));
        let desired = snapshot(json!({ "cluster_id": "c-1" }));
        assert!(TOKEN.diff(&prior, &desired).is_empty());
    }

    #[test]
    fn missing_required_fields() {
        let desired = snapshot(json!({ "cluster_id": "" }));
        assert_eq!(TOKEN.missing_required(&desired), ["cluster_id"]);
    }
}
