//! Sample flat-memory host.
//!
//! A minimal [`Bus`] implementation: 32 KiB of RAM mirrored across the
//! 64 KiB address space (only A0-A14 are decoded, the way a small
//! single-board system wires it), plus a 256-entry I/O port latch. The
//! test suite uses it as its fixture; it also serves as the starting
//! point for a real host.

use crate::bus::Bus;

/// RAM size in bytes (32 KiB). Must stay a power of two for mirroring.
pub const RAM_SIZE: usize = 0x8000;

/// Flat 32 KiB RAM plus an I/O port latch.
pub struct Ram {
    bytes: Box<[u8; RAM_SIZE]>,
    ports: [u8; 256],
}

impl Ram {
    /// Create a zero-filled RAM with all ports reading 0.
    pub fn new() -> Self {
        Self {
            bytes: Box::new([0; RAM_SIZE]),
            ports: [0; 256],
        }
    }

    #[inline]
    fn index(addr: u16) -> usize {
        addr as usize & (RAM_SIZE - 1)
    }

    /// Write a byte directly, bypassing the bus (for test/host setup).
    pub fn poke_byte(&mut self, addr: u16, val: u8) {
        self.bytes[Self::index(addr)] = val;
    }

    /// Read a byte directly, bypassing the bus.
    pub fn peek_byte(&self, addr: u16) -> u8 {
        self.bytes[Self::index(addr)]
    }

    /// Copy a program image into RAM starting at `addr`.
    pub fn load(&mut self, addr: u16, data: &[u8]) {
        for (offset, &byte) in data.iter().enumerate() {
            self.poke_byte(addr.wrapping_add(offset as u16), byte);
        }
    }

    /// Preload the value a port will return for `io_read`.
    pub fn set_port(&mut self, port: u8, val: u8) {
        self.ports[port as usize] = val;
    }

    /// Last value written to a port (or the preloaded value).
    pub fn port(&self, port: u8) -> u8 {
        self.ports[port as usize]
    }
}

impl Bus for Ram {
    fn mem_read(&mut self, addr: u16) -> u8 {
        self.peek_byte(addr)
    }

    fn mem_write(&mut self, addr: u16, val: u8) {
        self.poke_byte(addr, val);
    }

    fn io_read(&mut self, port: u16) -> u8 {
        // Only the low byte selects the latch; the high byte is whatever
        // the instruction placed on the upper address lines.
        self.ports[(port & 0xFF) as usize]
    }

    fn io_write(&mut self, port: u16, val: u8) {
        self.ports[(port & 0xFF) as usize] = val;
    }
}

impl Default for Ram {
    fn default() -> Self {
        Self::new()
    }
}
