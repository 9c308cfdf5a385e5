//! Network interfaces and their registry.

use std::collections::BTreeMap;
use std::fmt;
use std::net::Ipv6Addr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::RwLock;
use sasel_primitives::{InterfaceFlags, InterfaceId, Scope, SelectError, ZoneId};
use tracing::{debug, info};

use crate::AddrsError;

/// Number of distinct scope values (4-bit scope field).
const SCOPE_COUNT: usize = 16;

/// Per-interface mapping from scope to zone.
///
/// Interface-local and link-local zones are the interface index. Admin,
/// site and organization zones default to `1`: a single site unless
/// configured otherwise. The global zone is always `0`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ZoneTable([ZoneId; SCOPE_COUNT]);

impl ZoneTable {
    pub fn for_interface(id: InterfaceId) -> Self {
        let mut zones = [0; SCOPE_COUNT];
        for (scope, zone) in zones.iter_mut().enumerate() {
            *zone = match scope {
                0x1 | 0x2 => id.get(),
                0x3..=0xd => 1,
                _ => 0,
            };
        }
        Self(zones)
    }

    pub fn zone(&self, scope: Scope) -> ZoneId {
        self.0.get(usize::from(scope.value())).copied().unwrap_or(0)
    }

    /// Override the zone of a scope. The global zone cannot be changed.
    pub fn set(&mut self, scope: Scope, zone: ZoneId) {
        if scope == Scope::GLOBAL {
            return;
        }
        if let Some(slot) = self.0.get_mut(usize::from(scope.value())) {
            *slot = zone;
        }
    }
}

/// A network interface.
///
/// Flags are mutable in place so that link state changes are visible to
/// every holder of the handle.
#[derive(Debug)]
pub struct Interface {
    id: InterfaceId,
    name: String,
    flags: AtomicU32,
    zones: ZoneTable,
}

impl Interface {
    pub fn new(id: InterfaceId, name: impl Into<String>, flags: InterfaceFlags) -> Self {
        Self {
            id,
            name: name.into(),
            flags: AtomicU32::new(flags.bits()),
            zones: ZoneTable::for_interface(id),
        }
    }

    pub fn with_zone(mut self, scope: Scope, zone: ZoneId) -> Self {
        self.zones.set(scope, zone);
        self
    }

    pub fn id(&self) -> InterfaceId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn flags(&self) -> InterfaceFlags {
        InterfaceFlags::from_bits_retain(self.flags.load(Ordering::Acquire))
    }

    pub fn set_flags(&self, flags: InterfaceFlags) {
        self.flags.store(flags.bits(), Ordering::Release);
    }

    pub fn insert_flags(&self, flags: InterfaceFlags) {
        self.flags.fetch_or(flags.bits(), Ordering::AcqRel);
    }

    pub fn remove_flags(&self, flags: InterfaceFlags) {
        self.flags.fetch_and(!flags.bits(), Ordering::AcqRel);
    }

    pub fn is_up(&self) -> bool {
        self.flags().contains(InterfaceFlags::UP)
    }

    pub fn is_loopback(&self) -> bool {
        self.flags().contains(InterfaceFlags::LOOPBACK)
    }

    pub fn zones(&self) -> &ZoneTable {
        &self.zones
    }

    /// Zone `addr` belongs to when seen from this interface.
    ///
    /// The loopback address has no zone on anything but a loopback
    /// interface.
    pub fn zone_for(&self, addr: &Ipv6Addr) -> Result<ZoneId, SelectError> {
        if addr.is_loopback() && !self.is_loopback() {
            return Err(SelectError::InvalidScope);
        }
        Ok(self.zones.zone(Scope::of(addr)))
    }
}

impl fmt::Display for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.id)
    }
}

#[derive(Debug, Default)]
struct Registry {
    interfaces: BTreeMap<InterfaceId, Arc<Interface>>,
    primary: Option<InterfaceId>,
}

/// Registry of interfaces by index.
///
/// The first non-loopback interface inserted becomes the primary interface
/// until another one is chosen with [`set_primary`](Self::set_primary).
#[derive(Debug, Default)]
pub struct InterfaceTable {
    inner: RwLock<Registry>,
}

impl InterfaceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, interface: Interface) -> Result<Arc<Interface>, AddrsError> {
        let id = interface.id();
        if id.get() == 0 {
            return Err(AddrsError::ReservedIndex);
        }

        let mut inner = self.inner.write();
        if inner.interfaces.contains_key(&id) {
            return Err(AddrsError::DuplicateInterface(id));
        }

        let interface = Arc::new(interface);
        if inner.primary.is_none() && !interface.is_loopback() {
            inner.primary = Some(id);
        }
        inner.interfaces.insert(id, Arc::clone(&interface));
        debug!(%interface, flags = ?interface.flags(), "interface attached");
        Ok(interface)
    }

    /// Detach an interface. Handles already given out stay usable.
    pub fn remove(&self, id: InterfaceId) -> Option<Arc<Interface>> {
        let mut inner = self.inner.write();
        let removed = inner.interfaces.remove(&id)?;
        if inner.primary == Some(id) {
            inner.primary = None;
        }
        debug!(interface = %removed, "interface detached");
        Some(removed)
    }

    pub fn get(&self, id: InterfaceId) -> Option<Arc<Interface>> {
        self.inner.read().interfaces.get(&id).cloned()
    }

    pub fn by_name(&self, name: &str) -> Option<Arc<Interface>> {
        self.inner
            .read()
            .interfaces
            .values()
            .find(|interface| interface.name() == name)
            .cloned()
    }

    pub fn primary(&self) -> Option<Arc<Interface>> {
        let inner = self.inner.read();
        inner.primary.and_then(|id| inner.interfaces.get(&id).cloned())
    }

    pub fn set_primary(&self, id: InterfaceId) -> Result<(), AddrsError> {
        let mut inner = self.inner.write();
        if !inner.interfaces.contains_key(&id) {
            return Err(AddrsError::UnknownInterface(id));
        }
        if inner.primary != Some(id) {
            info!(interface = %id, "primary interface changed");
            inner.primary = Some(id);
        }
        Ok(())
    }

    /// All interfaces in index order.
    pub fn all(&self) -> Vec<Arc<Interface>> {
        self.inner.read().interfaces.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().interfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().interfaces.is_empty()
    }
}
