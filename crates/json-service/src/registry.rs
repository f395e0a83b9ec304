//! Service registry
//!
//! Maps service identifiers to their invokers. Every operation takes the lock
//! internally, so a registry can be shared through an `Arc` (or the
//! process-wide [`ServiceRegistry::global`] instance) and used from any number
//! of threads without outside synchronization. Lookups hand out `Arc`s, so no
//! lock is held while an operation runs.

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

use crate::invoker::ServiceInvoker;

static GLOBAL: Lazy<ServiceRegistry> = Lazy::new(ServiceRegistry::new);

#[derive(Default)]
pub struct ServiceRegistry {
    services: RwLock<HashMap<String, Arc<dyn ServiceInvoker>>>,
}

impl fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("services", &self.identifiers())
            .finish()
    }
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared process-wide registry, created on first access
    pub fn global() -> &'static ServiceRegistry {
        &GLOBAL
    }

    /// Is this the process-wide registry?
    pub fn is_global(&self) -> bool {
        std::ptr::eq(self, Self::global())
    }

    /// Register a service. Returns `false` and leaves the existing entry in
    /// place when the identifier is already taken.
    pub fn register<I>(&self, invoker: I) -> bool
    where
        I: ServiceInvoker + 'static,
    {
        self.register_arc(Arc::new(invoker))
    }

    pub fn register_arc(&self, invoker: Arc<dyn ServiceInvoker>) -> bool {
        let identifier = invoker.identifier().to_string();
        let mut services = self.services.write();
        match services.entry(identifier) {
            Entry::Vacant(entry) => {
                info!("Registered service: {}", entry.key());
                entry.insert(invoker);
                true
            }
            Entry::Occupied(entry) => {
                info!("Service already registered, keeping existing: {}", entry.key());
                false
            }
        }
    }

    /// Replace the whole registry with `invokers`
    pub fn set_registry<I>(&self, invokers: I)
    where
        I: IntoIterator<Item = Arc<dyn ServiceInvoker>>,
    {
        let mut services = self.services.write();
        services.clear();
        for invoker in invokers {
            let identifier = invoker.identifier().to_string();
            if let Entry::Vacant(entry) = services.entry(identifier) {
                info!("Registered service: {}", entry.key());
                entry.insert(invoker);
            }
        }
    }

    /// Remove a service. Returns whether an entry was removed.
    pub fn unregister(&self, identifier: &str) -> bool {
        let removed = self.services.write().remove(identifier).is_some();
        if removed {
            info!("Unregistered service: {}", identifier);
        } else {
            debug!("Unregister ignored, no service named {}", identifier);
        }
        removed
    }

    /// Remove every service
    pub fn clear(&self) {
        self.services.write().clear();
        info!("Unregistered all services");
    }

    pub fn lookup(&self, identifier: &str) -> Option<Arc<dyn ServiceInvoker>> {
        self.services.read().get(identifier).cloned()
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.services.read().contains_key(identifier)
    }

    /// Registered identifiers, sorted
    pub fn identifiers(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.services.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.services.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.read().is_empty()
    }
}
