use std::sync::{Arc, PoisonError, RwLock};

/// A single-occupant handle for one presentation sink.
///
/// Registering replaces whatever was there. The returned registration clears
/// the slot when dropped, but only while its own sink is still the occupant,
/// so a stale teardown cannot unregister a newer mount.
pub struct SinkSlot<T: ?Sized> {
    inner: Arc<RwLock<Option<Arc<T>>>>,
}

impl<T: ?Sized> Clone for SinkSlot<T> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<T: ?Sized> Default for SinkSlot<T> {
    fn default() -> Self {
        Self { inner: Arc::new(RwLock::new(None)) }
    }
}

impl<T: ?Sized> SinkSlot<T> {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use = "dropping the registration clears the slot immediately"]
    pub fn register(&self, sink: Arc<T>) -> SinkRegistration<T> {
        let mut slot = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            tracing::debug!("Replacing registered notification sink");
        }
        *slot = Some(Arc::clone(&sink));

        SinkRegistration { slot: self.clone(), sink }
    }

    pub fn current(&self) -> Option<Arc<T>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn is_registered(&self) -> bool {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).is_some()
    }
}

pub struct SinkRegistration<T: ?Sized> {
    slot: SinkSlot<T>,
    sink: Arc<T>,
}

impl<T: ?Sized> Drop for SinkRegistration<T> {
    fn drop(&mut self) {
        let mut slot = self.slot.inner.write().unwrap_or_else(PoisonError::into_inner);
        let still_ours = slot
            .as_ref()
            .map(|current| Arc::ptr_eq(current, &self.sink))
            .unwrap_or(false);
        if still_ours {
            *slot = None;
        }
    }
}
