use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;

use super::{BindError, ConfigSection};

type ErasedBinder = Box<dyn Fn(&ConfigSection, &mut dyn Any) -> Result<(), BindError> + Send + Sync>;

/// Binders looked up by the type they populate. Generated `register_binders`
/// fills one of these when registration is enabled.
#[derive(Default)]
pub struct BinderRegistry {
    binders: HashMap<TypeId, ErasedBinder>,
}

impl BinderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T: Any>(
        &mut self,
        binder: fn(&ConfigSection, &mut T) -> Result<(), BindError>,
    ) -> &mut Self {
        let erased: ErasedBinder = Box::new(move |node: &ConfigSection, value: &mut dyn Any| {
            match value.downcast_mut::<T>() {
                Some(value) => binder(node, value),
                None => Err(BindError::unsupported_type::<T>()),
            }
        });
        self.binders.insert(TypeId::of::<T>(), erased);
        self
    }

    pub fn contains<T: Any>(&self) -> bool {
        self.binders.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.binders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.binders.is_empty()
    }

    pub fn bind<T: Any>(&self, node: &ConfigSection, value: &mut T) -> Result<(), BindError> {
        match self.binders.get(&TypeId::of::<T>()) {
            Some(binder) => binder(node, value as &mut dyn Any),
            None => Err(BindError::unsupported_type::<T>()),
        }
    }

    pub fn get<T: Any + Default>(&self, node: &ConfigSection) -> Result<T, BindError> {
        let mut value = T::default();
        self.bind(node, &mut value)?;
        Ok(value)
    }
}

impl fmt::Debug for BinderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinderRegistry").field("binders", &self.binders.len()).finish()
    }
}
