//! The hierarchical data source binders read from.
use serde_json::Value;

/// Separates segments in a key path (`Logging:Level`).
pub const PATH_SEPARATOR: char = ':';

/// Returned for lookups that miss, so callers never have to branch on absence.
static EMPTY: ConfigSection = ConfigSection {
    key: String::new(),
    path: String::new(),
    value: None,
    children: Vec::new(),
};

/// One node of a string-keyed, string-valued tree. Keys compare ASCII
/// case-insensitively; children keep insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigSection {
    key: String,
    path: String,
    value: Option<String>,
    children: Vec<ConfigSection>,
}

impl ConfigSection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Objects become keyed children, arrays children keyed `0`, `1`, …, scalars
    /// string values. `null` is an absent value.
    pub fn from_json(value: &Value) -> Self {
        let mut root = Self::new();
        root.fill_json(value);
        root
    }

    /// Flat `a:b:c = value` pairs, as environment or INI-style providers yield them.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut root = Self::new();
        for (path, value) in pairs {
            root.set(path.as_ref(), value);
        }
        root
    }

    pub fn set(&mut self, path: &str, value: impl Into<String>) {
        let mut node = self;
        for segment in path.split(PATH_SEPARATOR) {
            node = node.child_mut(segment);
        }
        node.value = Some(value.into());
    }

    fn fill_json(&mut self, value: &Value) {
        match value {
            Value::Null => {}
            Value::Bool(b) => self.value = Some(b.to_string()),
            Value::Number(n) => self.value = Some(n.to_string()),
            Value::String(s) => self.value = Some(s.clone()),
            Value::Array(items) => {
                for (index, item) in items.iter().enumerate() {
                    self.child_mut(&index.to_string()).fill_json(item);
                }
            }
            Value::Object(map) => {
                for (key, item) in map {
                    self.child_mut(key).fill_json(item);
                }
            }
        }
    }

    fn child_mut(&mut self, key: &str) -> &mut ConfigSection {
        if let Some(index) = self.children.iter().position(|c| c.key.eq_ignore_ascii_case(key)) {
            return &mut self.children[index];
        }
        let path = if self.path.is_empty() {
            key.to_owned()
        } else {
            format!("{}{PATH_SEPARATOR}{key}", self.path)
        };
        let index = self.children.len();
        self.children.push(ConfigSection {
            key: key.to_owned(),
            path,
            value: None,
            children: Vec::new(),
        });
        &mut self.children[index]
    }
}

// ————————————————————————————————————————————————————————————————————————————
// LOOKUP
// ————————————————————————————————————————————————————————————————————————————

impl ConfigSection {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Full path from the root, segments joined by `:`.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn children(&self) -> std::slice::Iter<'_, ConfigSection> {
        self.children.iter()
    }

    /// Has a value or at least one child.
    pub fn exists(&self) -> bool {
        self.value.is_some() || !self.children.is_empty()
    }

    pub fn child(&self, key: &str) -> Option<&ConfigSection> {
        self.children.iter().find(|c| c.key.eq_ignore_ascii_case(key))
    }

    fn find(&self, path: &str) -> Option<&ConfigSection> {
        path.split(PATH_SEPARATOR).try_fold(self, |node, segment| node.child(segment))
    }

    /// Value at `path`, if any.
    pub fn get(&self, path: &str) -> Option<&str> {
        self.find(path).and_then(ConfigSection::value)
    }

    /// Node at `path`; an empty node when there is none.
    pub fn section(&self, path: &str) -> &ConfigSection {
        self.find(path).unwrap_or(&EMPTY)
    }
}
