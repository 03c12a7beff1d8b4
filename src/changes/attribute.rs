use crate::core::{DataType, Value};
use indexmap::IndexMap;

/// One typed attribute of a record: the value last persisted and the value
/// currently assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    name: String,
    data_type: DataType,
    original: Value,
    value: Value,
}

impl Attribute {
    /// An attribute as read back from storage, with nothing assigned yet.
    pub fn from_database(name: impl Into<String>, data_type: DataType, value: Value) -> Self {
        Self {
            name: name.into(),
            data_type,
            original: value.clone(),
            value,
        }
    }

    pub fn new(name: impl Into<String>, data_type: DataType, original: Value, value: Value) -> Self {
        Self {
            name: name.into(),
            data_type,
            original,
            value,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn original(&self) -> &Value {
        &self.original
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn changed(&self) -> bool {
        self.original != self.value
    }

    /// Same attribute with a new assigned value; the original is kept.
    pub fn with_value(&self, value: Value) -> Self {
        Self {
            name: self.name.clone(),
            data_type: self.data_type,
            original: self.original.clone(),
            value,
        }
    }

    /// The assigned value becomes the new original.
    pub fn forgetting_assignment(&self) -> Self {
        Self::from_database(self.name.clone(), self.data_type, self.value.clone())
    }
}

/// Ordered, owned collection of a record's attributes. Cloning it is a deep
/// copy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeSet {
    attributes: IndexMap<String, Attribute>,
}

impl AttributeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, attribute: Attribute) {
        self.attributes.insert(attribute.name.clone(), attribute);
    }

    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Assigns a value to an existing attribute. Returns `false` if the
    /// attribute is unknown.
    pub fn write_value(&mut self, name: &str, value: Value) -> bool {
        match self.attributes.get_mut(name) {
            Some(attribute) => {
                *attribute = attribute.with_value(value);
                true
            }
            None => false,
        }
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name).map(Attribute::value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn forget_assignments(&mut self) {
        for attribute in self.attributes.values_mut() {
            *attribute = attribute.forgetting_assignment();
        }
    }
}

impl FromIterator<Attribute> for AttributeSet {
    fn from_iter<I: IntoIterator<Item = Attribute>>(iter: I) -> Self {
        let mut set = AttributeSet::new();
        for attribute in iter {
            set.insert(attribute);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded() -> AttributeSet {
        [
            Attribute::from_database("name", DataType::Text, Value::from("foo")),
            Attribute::from_database("value", DataType::Text, Value::from("bar")),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_write_keeps_original() {
        let mut set = loaded();
        assert!(set.write_value("name", Value::from("baz")));

        let name = set.get("name").unwrap();
        assert_eq!(name.original(), &Value::from("foo"));
        assert_eq!(name.value(), &Value::from("baz"));
        assert!(name.changed());
        assert!(!set.get("value").unwrap().changed());
    }

    #[test]
    fn test_write_unknown_attribute() {
        let mut set = loaded();
        assert!(!set.write_value("missing", Value::Null));
    }

    #[test]
    fn test_reassigning_original_is_not_a_value_change() {
        let mut set = loaded();
        set.write_value("name", Value::from("baz"));
        set.write_value("name", Value::from("foo"));
        assert!(!set.get("name").unwrap().changed());
    }

    #[test]
    fn test_clone_is_independent() {
        let set = loaded();
        let mut copy = set.clone();
        copy.write_value("name", Value::from("other"));
        assert_eq!(set.value("name"), Some(&Value::from("foo")));
    }

    #[test]
    fn test_forget_assignments() {
        let mut set = loaded();
        set.write_value("value", Value::from("biz"));
        set.forget_assignments();

        let value = set.get("value").unwrap();
        assert_eq!(value.original(), &Value::from("biz"));
        assert!(!value.changed());
    }
}
