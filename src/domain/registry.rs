//! Generic tag → class registry used for open polymorphic dispatch.
//!
//! One implementation backs every independent hierarchy: the only thing a
//! hierarchy supplies is how its classes expose their tag ([`Tagged`]).

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use tracing::{debug, instrument, trace};

use crate::domain::error::{SyncError, SyncResult};
use crate::domain::record::StructuralRecord;

/// A class that carries a tag attribute.
pub trait Tagged {
    /// Tag declared by the class itself, ignoring anything inherited.
    fn own_tag(&self) -> Option<String>;

    /// Effective tag: own tag, else the nearest inherited one.
    fn tag(&self) -> Option<String>;

    /// Sets the own tag. Called only when the class has none yet.
    fn assign_tag(&self, tag: &str);

    /// Human readable name for diagnostics.
    fn describe(&self) -> String;
}

/// Anything a tag can be extracted from.
pub trait TagSource {
    fn type_tag(&self) -> Option<String>;
}

impl TagSource for str {
    fn type_tag(&self) -> Option<String> {
        Some(self.to_string())
    }
}

impl TagSource for String {
    fn type_tag(&self) -> Option<String> {
        Some(self.clone())
    }
}

impl TagSource for StructuralRecord {
    fn type_tag(&self) -> Option<String> {
        self.tag.clone()
    }
}

// A tag held in a cell is read through the cell.
impl<T: TagSource + ?Sized> TagSource for RefCell<T> {
    fn type_tag(&self) -> Option<String> {
        self.borrow().type_tag()
    }
}

impl<T: TagSource + ?Sized> TagSource for &T {
    fn type_tag(&self) -> Option<String> {
        (**self).type_tag()
    }
}

/// Registry mapping string ids to classes.
///
/// Re-adding the same class under its id is a no-op; adding a different
/// class under a used id is a [`SyncError::DuplicateRegistration`].
pub struct TypeRegistry<C> {
    name: String,
    entries: RefCell<BTreeMap<String, Rc<C>>>,
}

impl<C: Tagged> TypeRegistry<C> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: RefCell::new(BTreeMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has(&self, id: &str) -> bool {
        self.entries.borrow().contains_key(id)
    }

    /// Like [`has`](Self::has), resolving the class's own tag first.
    pub fn has_class(&self, class: &C) -> bool {
        class.own_tag().is_some_and(|tag| self.has(&tag))
    }

    /// Registers `class` under `id`, or under the class's tag when `id` is omitted.
    ///
    /// A class without an own tag receives `id` as its tag.
    #[instrument(level = "debug", skip(self, class), fields(registry = %self.name))]
    pub fn add(&self, id: Option<&str>, class: Rc<C>) -> SyncResult<()> {
        let id = match id.map(str::to_string).or_else(|| class.tag()) {
            Some(id) => id,
            None => {
                return Err(SyncError::Configuration(format!(
                    "{} has no type id to register under in {}",
                    class.describe(),
                    self.name
                )))
            }
        };

        {
            let entries = self.entries.borrow();
            if let Some(existing) = entries.get(&id) {
                if Rc::ptr_eq(existing, &class) {
                    trace!(id = %id, "already registered, skipping");
                    return Ok(());
                }
                return Err(SyncError::DuplicateRegistration {
                    id,
                    existing: existing.describe(),
                    attempted: class.describe(),
                });
            }
        }

        if class.own_tag().is_none() {
            class.assign_tag(&id);
        }
        debug!(id = %id, class = %class.describe(), "registered type");
        self.entries.borrow_mut().insert(id, class);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<Rc<C>> {
        self.entries.borrow().get(id).cloned()
    }

    /// Resolves a tag, or a record carrying one, to its class.
    pub fn lookup<S: TagSource + ?Sized>(&self, source: &S) -> SyncResult<Rc<C>> {
        let tag = source
            .type_tag()
            .ok_or_else(|| SyncError::UnknownType("<untagged>".to_string()))?;
        self.get(&tag).ok_or(SyncError::UnknownType(tag))
    }

    #[instrument(level = "debug", skip(self), fields(registry = %self.name))]
    pub fn invalidate(&self, id: &str) {
        if self.entries.borrow_mut().remove(id).is_some() {
            debug!(id, "invalidated type");
        }
    }

    #[instrument(level = "debug", skip(self), fields(registry = %self.name))]
    pub fn purge(&self) {
        self.entries.borrow_mut().clear();
    }

    /// Registered ids in sorted order.
    pub fn ids(&self) -> Vec<String> {
        self.entries.borrow().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

/// Bound registry aliases for a host object.
///
/// Implementing [`type_registry`](RegistryHost::type_registry) decorates the
/// host with `has_type`, `register_type`, `lookup_type`, `invalidate_type`
/// and `purge_cache`, all delegating to the injected registry.
pub trait RegistryHost<C: Tagged> {
    fn type_registry(&self) -> &TypeRegistry<C>;

    fn has_type(&self, id: &str) -> bool {
        self.type_registry().has(id)
    }

    fn register_type(&self, id: Option<&str>, class: Rc<C>) -> SyncResult<()> {
        self.type_registry().add(id, class)
    }

    fn lookup_type<S: TagSource + ?Sized>(&self, source: &S) -> SyncResult<Rc<C>> {
        self.type_registry().lookup(source)
    }

    fn invalidate_type(&self, id: &str) {
        self.type_registry().invalidate(id)
    }

    fn purge_cache(&self) {
        self.type_registry().purge()
    }
}

impl<C: Tagged> RegistryHost<C> for TypeRegistry<C> {
    fn type_registry(&self) -> &TypeRegistry<C> {
        self
    }
}
