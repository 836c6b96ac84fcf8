use super::ConfigSection;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindError {
    /// A dictionary child whose key does not parse as the key type. Every other
    /// unparseable value falls back to its default; a key cannot, since dropping or
    /// merging entries would silently change the map.
    #[error("unable to parse `{key}` as a dictionary key at `{path}`")]
    InvalidKey { key: String, path: String },

    /// Two children whose keys parse to the same dictionary key, e.g. `High` and
    /// `10` for an enum with `High = 10`.
    #[error("duplicate dictionary key `{key}` at `{path}`")]
    DuplicateKey { key: String, path: String },

    #[error("no generated binder for `{type_name}`")]
    UnsupportedType { type_name: &'static str },
}

impl BindError {
    pub fn invalid_key(item: &ConfigSection) -> Self {
        BindError::InvalidKey {
            key: item.key().to_owned(),
            path: item.path().to_owned(),
        }
    }

    pub fn duplicate_key(item: &ConfigSection) -> Self {
        BindError::DuplicateKey {
            key: item.key().to_owned(),
            path: item.path().to_owned(),
        }
    }

    pub fn unsupported_type<T: ?Sized>() -> Self {
        BindError::UnsupportedType { type_name: std::any::type_name::<T>() }
    }
}
