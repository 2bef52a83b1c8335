use serde::{Deserialize, Serialize};

/// A parsed INI document, sections in file order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IniDocument {
    pub sections: Vec<IniSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IniSection {
    pub name: String,
    /// 1-based line of the header
    pub line: usize,
    /// Lower-cased keys with trimmed values, file order
    pub properties: Vec<(String, String)>,
}

impl IniDocument {
    /// Case-insensitive section lookup
    pub fn section(&self, name: &str) -> Option<&IniSection> {
        self.sections
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
    }
}

impl IniSection {
    pub fn new(name: impl Into<String>, line: usize) -> Self {
        Self {
            name: name.into(),
            line,
            properties: Vec::new(),
        }
    }

    /// Insert or replace; later assignments win.
    pub fn set(&mut self, key: &str, value: &str) {
        let key = key.to_ascii_lowercase();
        match self.properties.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => *v = value.to_string(),
            None => self.properties.push((key, value.to_string())),
        }
    }

    /// Case-insensitive property lookup
    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.properties.iter().map(|(k, _)| k.as_str())
    }
}
