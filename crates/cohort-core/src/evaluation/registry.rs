//! Handler registries.
//!
//! Registries are populated once through a [`RegistryBuilder`] and are
//! read-only afterwards, so concurrent lookups need no locking.
//!
//! Lookup is breadth-first over a definition type's supertypes: the exact
//! type is tried first, then its direct supertypes, and so on. The first
//! level holding a registration wins; two different handlers on that level
//! is a configuration error.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::debug;

use crate::domain::definition::{Definition, DefinitionType};
use crate::domain::error::{Capability, CohortError, CohortResult, RegistryError};

pub struct RegistryBuilder<H: ?Sized> {
    capability: Capability,
    handlers: HashMap<&'static str, Arc<H>>,
}

impl<H: ?Sized> RegistryBuilder<H> {
    pub fn new(capability: Capability) -> Self {
        Self {
            capability,
            handlers: HashMap::new(),
        }
    }

    /// Register `handler` for `definition_type` and all of its subtypes.
    pub fn register(
        &mut self,
        definition_type: &'static DefinitionType,
        handler: Arc<H>,
    ) -> Result<&mut Self, RegistryError> {
        if self.handlers.contains_key(definition_type.name) {
            return Err(RegistryError::DuplicateRegistration {
                capability: self.capability,
                definition_type: definition_type.name.to_string(),
            });
        }
        self.handlers.insert(definition_type.name, handler);
        Ok(self)
    }

    pub fn build(self) -> HandlerRegistry<H> {
        HandlerRegistry {
            capability: self.capability,
            handlers: self.handlers,
        }
    }
}

pub struct HandlerRegistry<H: ?Sized> {
    capability: Capability,
    handlers: HashMap<&'static str, Arc<H>>,
}

impl<H: ?Sized> HandlerRegistry<H> {
    pub fn capability(&self) -> Capability {
        self.capability
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Most specific handler registered for `definition`'s concrete type.
    pub fn resolve(&self, definition: &dyn Definition) -> CohortResult<&H> {
        let concrete = definition.definition_type();
        let mut seen: HashSet<&'static str> = HashSet::from([concrete.name]);
        let mut level: Vec<&'static DefinitionType> = vec![concrete];

        while !level.is_empty() {
            let mut matches: Vec<(&'static str, &Arc<H>)> = Vec::new();
            for ty in &level {
                if let Some(handler) = self.handlers.get(ty.name) {
                    if !matches.iter().any(|(_, h)| Arc::ptr_eq(h, handler)) {
                        matches.push((ty.name, handler));
                    }
                }
            }

            match matches.len() {
                0 => {}
                1 => {
                    let (registered, handler) = matches[0];
                    debug!(
                        capability = %self.capability,
                        definition_type = %concrete,
                        registered_for = %registered,
                        "resolved handler"
                    );
                    return Ok(&**handler);
                }
                _ => {
                    return Err(CohortError::AmbiguousHandler {
                        capability: self.capability,
                        definition_type: concrete.name.to_string(),
                        definition_name: definition.name().to_string(),
                        candidates: matches.iter().map(|(name, _)| name.to_string()).collect(),
                    });
                }
            }

            level = level
                .iter()
                .flat_map(|ty| ty.supertypes.iter().copied())
                .filter(|ty| seen.insert(ty.name))
                .collect();
        }

        Err(CohortError::NoHandler {
            capability: self.capability,
            definition_type: concrete.name.to_string(),
            definition_name: definition.name().to_string(),
        })
    }
}
