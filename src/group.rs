use crate::error::Result;
use crate::stage::{Emitter, Stage};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::HashMap;

/// Field name used for the group key when none is configured
pub const DEFAULT_KEY_FIELD: &str = "k";
/// Field name used for the group members when none is configured
pub const DEFAULT_VALUE_FIELD: &str = "v";

/// One output record of a group-by stage: a key and the ordered members that
/// mapped to it, carrying the configured field names.
///
/// Serializes as a map with exactly two entries,
/// `{ <key_field>: key, <value_field>: [members...] }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupRecord<T> {
    key_field: String,
    value_field: String,
    key: String,
    members: Vec<T>,
}

impl<T> GroupRecord<T> {
    /// Create a record with explicit field names
    pub fn new(
        key_field: impl Into<String>,
        value_field: impl Into<String>,
        key: impl Into<String>,
        members: Vec<T>,
    ) -> Self {
        Self {
            key_field: key_field.into(),
            value_field: value_field.into(),
            key: key.into(),
            members,
        }
    }

    /// Name of the key field
    pub fn key_field(&self) -> &str {
        &self.key_field
    }

    /// Name of the members field
    pub fn value_field(&self) -> &str {
        &self.value_field
    }

    /// The group key
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Members of the group, in arrival order
    pub fn members(&self) -> &[T] {
        &self.members
    }

    /// Consume the record, returning its members
    pub fn into_members(self) -> Vec<T> {
        self.members
    }
}

impl<T: Serialize> Serialize for GroupRecord<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry(&self.key_field, &self.key)?;
        map.serialize_entry(&self.value_field, &self.members)?;
        map.end()
    }
}

/// A stage that computes a string key per item and accumulates items by key
/// across the entire stream.
///
/// At end-of-input it emits one [`GroupRecord`] per distinct key, in
/// first-occurrence order of the keys; members within a group keep arrival
/// order. Nothing is emitted before end-of-input. `None` field names fall
/// back to [`DEFAULT_KEY_FIELD`] / [`DEFAULT_VALUE_FIELD`].
pub struct GroupByStage<I, F>
where
    F: FnMut(&I) -> Result<String> + Send + 'static,
{
    key_field: String,
    value_field: String,
    classifier: F,
    // Groups in first-occurrence order, with a key -> slot index
    groups: Vec<(String, Vec<I>)>,
    index: HashMap<String, usize>,
}

impl<I, F> GroupByStage<I, F>
where
    F: FnMut(&I) -> Result<String> + Send + 'static,
{
    /// Create a new group-by stage
    pub fn new(key_field: Option<String>, value_field: Option<String>, classifier: F) -> Self {
        Self {
            key_field: key_field.unwrap_or_else(|| DEFAULT_KEY_FIELD.to_string()),
            value_field: value_field.unwrap_or_else(|| DEFAULT_VALUE_FIELD.to_string()),
            classifier,
            groups: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<I, F> Stage for GroupByStage<I, F>
where
    I: Send + 'static,
    F: FnMut(&I) -> Result<String> + Send + 'static,
{
    type In = I;
    type Out = GroupRecord<I>;

    fn process(&mut self, item: I, _out: &mut Emitter<GroupRecord<I>>) -> Result<()> {
        let key = (self.classifier)(&item)?;
        match self.index.get(&key) {
            Some(&slot) => self.groups[slot].1.push(item),
            None => {
                self.index.insert(key.clone(), self.groups.len());
                self.groups.push((key, vec![item]));
            }
        }
        Ok(())
    }

    fn flush(&mut self, out: &mut Emitter<GroupRecord<I>>) -> Result<()> {
        self.index.clear();
        for (key, members) in self.groups.drain(..) {
            out.emit(GroupRecord::new(
                self.key_field.clone(),
                self.value_field.clone(),
                key,
                members,
            ));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "group_by"
    }
}
