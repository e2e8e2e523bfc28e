use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::fmt::{self, Debug, Formatter};

use crate::EventKey;
use crate::listener::{Listener, ListenerSet};

type KeyTable<K> = HashMap<K, ListenerSet<<K as EventKey>::Payload>>;

/// Listener storage for all key types of one emitter.
///
/// Each key type gets its own table, stored type-erased under the key type's `TypeId`.
/// Empty listener sets and empty tables are removed eagerly, so an absent key and a key
/// without listeners are indistinguishable.
#[derive(Default)]
pub(crate) struct Registry {
    tables: HashMap<TypeId, Box<dyn Any>>,
}

impl Registry {
    /// Returns `false` if the listener was already registered under the key.
    pub(crate) fn insert<K: EventKey>(&mut self, key: K, listener: &Listener<K::Payload>) -> bool {
        self.table_mut::<K>()
            .entry(key)
            .or_insert_with(ListenerSet::new)
            .insert(listener)
    }

    /// Takes the listener out of the key's set, returning the stored handle if it was present.
    ///
    /// The handle is returned rather than dropped so that the caller can release it after it
    /// stops borrowing the registry; dropping a listener may run arbitrary destructors.
    pub(crate) fn remove<K: EventKey>(
        &mut self,
        key: &K,
        listener: &Listener<K::Payload>,
    ) -> Option<Listener<K::Payload>> {
        let table = self.existing_table_mut::<K>()?;
        let set = table.get_mut(key)?;

        let removed = set.remove(listener);

        if set.is_empty() {
            table.remove(key);
        }

        if table.is_empty() {
            self.tables.remove(&TypeId::of::<K>());
        }

        removed
    }

    /// The listeners currently registered under the key, in registration order.
    pub(crate) fn snapshot<K: EventKey>(&self, key: &K) -> Vec<Listener<K::Payload>> {
        self.table::<K>()
            .and_then(|table| table.get(key))
            .map(ListenerSet::snapshot)
            .unwrap_or_default()
    }

    pub(crate) fn count<K: EventKey>(&self, key: &K) -> usize {
        self.table::<K>()
            .and_then(|table| table.get(key))
            .map_or(0, ListenerSet::len)
    }

    /// Number of key types that currently have at least one listener.
    pub(crate) fn key_types(&self) -> usize {
        self.tables.len()
    }

    fn table<K: EventKey>(&self) -> Option<&KeyTable<K>> {
        self.tables
            .get(&TypeId::of::<K>())
            .and_then(|table| table.downcast_ref::<KeyTable<K>>())
    }

    fn existing_table_mut<K: EventKey>(&mut self) -> Option<&mut KeyTable<K>> {
        self.tables
            .get_mut(&TypeId::of::<K>())
            .and_then(|table| table.downcast_mut::<KeyTable<K>>())
    }

    fn table_mut<K: EventKey>(&mut self) -> &mut KeyTable<K> {
        self.tables
            .entry(TypeId::of::<K>())
            .or_insert_with(|| Box::new(KeyTable::<K>::new()))
            .downcast_mut::<KeyTable<K>>()
            .expect("tables are only ever stored under the TypeId of their own key type")
    }
}

impl Debug for Registry {
    #[cfg_attr(test, mutants::skip)] // No API contract for debug output.
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("key_types", &self.key_types())
            .finish_non_exhaustive()
    }
}
