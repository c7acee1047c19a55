//! Scoped access to the key/value store.
//!
//! Every persistence operation opens the namespace, does its reads or
//! writes, and closes it again. [`StoreSession`] closes on drop so an early
//! return via `?` cannot leave the namespace open.

use std::ops::{Deref, DerefMut};

use brewscale_traits::{BoxError, KvStore};

use crate::error::ScaleError;

pub struct StoreSession<'a> {
    store: &'a mut dyn KvStore,
}

impl<'a> StoreSession<'a> {
    pub fn open(
        store: &'a mut dyn KvStore,
        namespace: &str,
        read_only: bool,
    ) -> Result<Self, ScaleError> {
        store.open(namespace, read_only).map_err(storage_error)?;
        Ok(Self { store })
    }
}

impl<'a> Deref for StoreSession<'a> {
    type Target = dyn KvStore + 'a;

    fn deref(&self) -> &Self::Target {
        self.store
    }
}

impl DerefMut for StoreSession<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.store
    }
}

impl Drop for StoreSession<'_> {
    fn drop(&mut self) {
        self.store.close();
    }
}

pub(crate) fn storage_error(e: BoxError) -> ScaleError {
    ScaleError::Storage(e.to_string())
}
