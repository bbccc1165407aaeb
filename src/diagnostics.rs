//! Motor fault log and panic diagnostics.
//!
//! Stores up to 4 [`MotorFault`] records in a storage-backed ring buffer
//! under the "fault" namespace.  The write index lives next to the slots,
//! so the ring survives restarts and the oldest record is overwritten
//! first.  A custom panic hook logs the reason before the process dies.

use log::warn;

use crate::app::ports::StoragePort;
use crate::error::StorageError;
use crate::jam::MotorFault;

const FAULT_RING_SLOTS: usize = 4;
const FAULT_NAMESPACE: &str = "fault";
const FAULT_INDEX_KEY: &str = "fault_idx";

/// Storage-backed ring buffer for motor faults.
#[derive(Default)]
pub struct FaultLog {
    write_index: usize,
}

impl FaultLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the write index from storage, or default to 0.
    pub fn init(&mut self, store: &dyn StoragePort) {
        let mut buf = [0u8; 4];
        if let Ok(4) = store.read(FAULT_NAMESPACE, FAULT_INDEX_KEY, &mut buf) {
            self.write_index = u32::from_le_bytes(buf) as usize % FAULT_RING_SLOTS;
        }
    }

    /// Write a fault to the next ring slot and advance the index.
    pub fn write_entry(
        &mut self,
        store: &mut dyn StoragePort,
        fault: &MotorFault,
    ) -> Result<(), StorageError> {
        let slot_key = Self::slot_key(self.write_index);
        let bytes = postcard::to_allocvec(fault).map_err(|_| StorageError::IoError)?;
        store.write(FAULT_NAMESPACE, &slot_key, &bytes)?;

        self.write_index = (self.write_index + 1) % FAULT_RING_SLOTS;
        let idx_bytes = (self.write_index as u32).to_le_bytes();
        store.write(FAULT_NAMESPACE, FAULT_INDEX_KEY, &idx_bytes)
    }

    /// Read all stored faults (up to 4), oldest first.
    pub fn read_all(&self, store: &dyn StoragePort) -> heapless::Vec<MotorFault, FAULT_RING_SLOTS> {
        let mut entries = heapless::Vec::new();
        for n in 0..FAULT_RING_SLOTS {
            let slot_key = Self::slot_key((self.write_index + n) % FAULT_RING_SLOTS);
            let mut buf = [0u8; 64];
            match store.read(FAULT_NAMESPACE, &slot_key, &mut buf) {
                Ok(len) => match postcard::from_bytes::<MotorFault>(&buf[..len]) {
                    Ok(fault) => {
                        let _ = entries.push(fault);
                    }
                    Err(_) => warn!("FAULT LOG: slot {} unreadable, skipped", slot_key),
                },
                Err(StorageError::NotFound) => {}
                Err(e) => warn!("FAULT LOG: reading slot {} failed: {}", slot_key, e),
            }
        }
        entries
    }

    /// Erase all faults and reset the index.
    pub fn clear(&mut self, store: &mut dyn StoragePort) {
        for i in 0..FAULT_RING_SLOTS {
            let _ = store.delete(FAULT_NAMESPACE, &Self::slot_key(i));
        }
        let _ = store.delete(FAULT_NAMESPACE, FAULT_INDEX_KEY);
        self.write_index = 0;
    }

    pub fn count(&self, store: &dyn StoragePort) -> usize {
        (0..FAULT_RING_SLOTS)
            .filter(|i| store.exists(FAULT_NAMESPACE, &Self::slot_key(*i)))
            .count()
    }

    fn slot_key(index: usize) -> heapless::String<16> {
        let mut s = heapless::String::new();
        let _ = core::fmt::Write::write_fmt(&mut s, format_args!("e{}", index));
        s
    }
}

// ───────────────────────────────────────────────────────────────
// Custom panic handler
// ───────────────────────────────────────────────────────────────

/// Install a panic hook that routes the panic reason through `log`
/// before the default hook runs.
pub fn install_panic_handler() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let reason = if let Some(msg) = info.payload().downcast_ref::<&str>() {
            *msg
        } else if let Some(msg) = info.payload().downcast_ref::<String>() {
            msg.as_str()
        } else {
            "unknown panic"
        };
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_default();
        log::error!("PANIC at {}: {}", location, reason);
        default_hook(info);
    }));
}
