use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    name: String,
    entries: Vec<Entry>,
}

impl Section {
    /// Creates an empty section. The name is trimmed and lower-cased.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: fold_name(name),
            entries: Vec::new(),
        }
    }

    #[must_use]
    pub(crate) fn with_entry(name: &str, entry: Entry) -> Self {
        let mut section = Self::new(name);
        section.push(entry);
        section
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Returns the first entry with the given name (compared case-insensitively).
    #[must_use]
    pub fn entry(&self, name: &str) -> Option<&Entry> {
        let name = fold_name(name);
        self.entries.iter().find(|entry| entry.name == name)
    }

    pub(crate) fn entry_mut(&mut self, name: &str) -> Option<&mut Entry> {
        let name = fold_name(name);
        self.entries.iter_mut().find(|entry| entry.name == name)
    }

    pub(crate) fn entries_mut(&mut self) -> &mut Vec<Entry> {
        &mut self.entries
    }

    pub(crate) fn push(&mut self, entry: Entry) {
        self.entries.push(entry);
    }

    /// The values of a section that consists of exactly one list entry.
    #[must_use]
    pub fn as_list(&self) -> Option<&[String]> {
        match self.entries.as_slice() {
            [entry] => entry.value().as_list(),
            _ => None,
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[{}]", self.name)?;
        for entry in &self.entries {
            write!(f, "{entry}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    name: String,
    value: Value,
}

impl Entry {
    #[must_use]
    pub fn new(name: &str, value: Value) -> Self {
        Self {
            name: fold_name(name),
            value,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }

    pub(crate) fn value_mut(&mut self) -> &mut Value {
        &mut self.value
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Value::Scalar(value) => writeln!(f, "{}={value}", self.name),
            Value::List(values) => {
                writeln!(f, "{}", self.name)?;
                values.iter().try_for_each(|value| writeln!(f, "{value}"))
            }
        }
    }
}

/// Either a single `key=value` string, or the bare lines following a header line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Scalar(String),
    List(Vec<String>),
}

impl Value {
    #[must_use]
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            Self::Scalar(value) => Some(value),
            Self::List(..) => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::Scalar(..) => None,
            Self::List(values) => Some(values),
        }
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Scalar(value)
    }
}

impl From<Vec<String>> for Value {
    fn from(value: Vec<String>) -> Self {
        Value::List(value)
    }
}

pub(crate) fn fold_name(name: &str) -> String {
    trim(name).to_lowercase()
}

pub(crate) fn trim(text: &str) -> &str {
    text.trim_matches([' ', '\t', '\r', '\n'])
}
