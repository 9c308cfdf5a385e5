//! The global candidate address list.

use std::net::Ipv6Addr;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard};
use sasel_primitives::{InterfaceId, ScopedAddr};
use tracing::debug;

use crate::{AddrsError, CandidateAddress, Interface};

#[derive(Debug, Default)]
struct Entries {
    addresses: Vec<Arc<CandidateAddress>>,
    generation: u64,
}

impl Entries {
    fn bump(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }
}

/// Every locally configured address, in configuration order.
///
/// Any insert or removal bumps the generation.
#[derive(Debug, Default)]
pub struct AddressTable {
    inner: RwLock<Entries>,
}

impl AddressTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, address: CandidateAddress) -> Result<Arc<CandidateAddress>, AddrsError> {
        let interface = address.interface().id();
        let mut inner = self.inner.write();
        let duplicate = inner
            .addresses
            .iter()
            .any(|a| a.addr() == address.addr() && a.interface().id() == interface);
        if duplicate {
            return Err(AddrsError::DuplicateAddress {
                addr: *address.addr(),
                interface,
            });
        }

        let address = Arc::new(address);
        inner.addresses.push(Arc::clone(&address));
        inner.bump();
        debug!(%address, generation = inner.generation, "address added");
        Ok(address)
    }

    pub fn remove(&self, addr: &Ipv6Addr, interface: InterfaceId) -> Option<Arc<CandidateAddress>> {
        let mut inner = self.inner.write();
        let index = inner
            .addresses
            .iter()
            .position(|a| a.addr() == addr && a.interface().id() == interface)?;
        let removed = inner.addresses.remove(index);
        inner.bump();
        debug!(address = %removed, generation = inner.generation, "address removed");
        Some(removed)
    }

    /// Remove every address owned by `interface`.
    pub fn remove_interface(&self, interface: InterfaceId) -> Vec<Arc<CandidateAddress>> {
        let mut inner = self.inner.write();
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut inner.addresses)
            .into_iter()
            .partition(|a| a.interface().id() == interface);
        inner.addresses = kept;
        if !removed.is_empty() {
            inner.bump();
            debug!(%interface, count = removed.len(), "interface addresses removed");
        }
        removed
    }

    /// Take the shared lock for a scan.
    pub fn read(&self) -> AddressGuard<'_> {
        AddressGuard {
            guard: self.inner.read(),
        }
    }

    pub fn generation(&self) -> u64 {
        self.inner.read().generation
    }

    /// First address equal to `addr`. A zero zone matches any zone.
    pub fn find(&self, addr: &ScopedAddr) -> Option<Arc<CandidateAddress>> {
        self.inner
            .read()
            .addresses
            .iter()
            .find(|a| a.addr() == addr.addr() && (addr.zone() == 0 || a.zone() == addr.zone()))
            .cloned()
    }

    /// The address `addr` as configured on `interface`.
    pub fn find_on(
        &self,
        addr: &Ipv6Addr,
        interface: InterfaceId,
    ) -> Option<Arc<CandidateAddress>> {
        self.inner
            .read()
            .addresses
            .iter()
            .find(|a| a.addr() == addr && a.interface().id() == interface)
            .cloned()
    }

    /// The interface owning `addr`, if the address is local.
    pub fn owner_of(&self, addr: &ScopedAddr) -> Option<Arc<Interface>> {
        self.find(addr).map(|a| Arc::clone(a.interface()))
    }

    pub fn snapshot(&self) -> Vec<Arc<CandidateAddress>> {
        self.inner.read().addresses.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.read().addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().addresses.is_empty()
    }
}

/// Shared access to the address list for the duration of a scan.
pub struct AddressGuard<'a> {
    guard: RwLockReadGuard<'a, Entries>,
}

impl AddressGuard<'_> {
    /// Generation observed under the lock.
    pub fn generation(&self) -> u64 {
        self.guard.generation
    }

    pub fn get(&self, index: usize) -> Option<&Arc<CandidateAddress>> {
        self.guard.addresses.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<CandidateAddress>> {
        self.guard.addresses.iter()
    }

    pub fn len(&self) -> usize {
        self.guard.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard.addresses.is_empty()
    }

    /// Run `f` with the lock released and re-acquire it afterwards.
    ///
    /// The list may have changed by the time this returns; compare
    /// [`generation`](Self::generation) before and after.
    pub fn unlocked<U>(&mut self, f: impl FnOnce() -> U) -> U {
        RwLockReadGuard::unlocked(&mut self.guard, f)
    }
}
