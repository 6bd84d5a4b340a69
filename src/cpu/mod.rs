//! Zilog Z80 CPU implementation.
//!
//! # Module Organization
//!
//! - `flags`: Flag bit constants for the F register
//! - `helpers`: Register access, fetch, push/pop, ALU kernels, flags
//! - `execute`: Instruction execution across the five opcode planes
//! - `tables`: Base T-state cost tables
//!
//! # Register Set
//!
//! The main bank (AF, BC, DE, HL) has a shadow copy reached only through
//! `EX AF,AF'` and `EXX`. IX and IY are also addressable as byte halves
//! through the undocumented DD/FD opcodes. I holds the interrupt vector
//! page, R the 7-bit refresh counter (bit 7 sticky, writable only by
//! `LD R,A`).
//!
//! # Execution model
//!
//! [`Cpu::step_instruction`] retires exactly one instruction per call and
//! returns the total T-states consumed; a halted CPU burns one T-state
//! per call until an interrupt arrives. [`Cpu::irq`] injects an NMI or a
//! maskable interrupt between instructions.

use crate::bus::Bus;

mod execute;
pub mod flags;
mod helpers;
mod tables;

#[cfg(test)]
mod tests;

/// Interrupt modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterruptMode {
    /// Mode 0: Execute the instruction placed on the data bus
    #[default]
    Mode0,
    /// Mode 1: Call to 0x0038
    Mode1,
    /// Mode 2: Vectored through the I register
    Mode2,
}

/// Z80 CPU state plus the host-supplied bus it executes against.
pub struct Cpu<B: Bus> {
    /// Memory and I/O bus
    pub bus: B,

    // Main registers
    /// Accumulator
    pub a: u8,
    /// Flags register
    pub f: u8,
    /// BC register pair
    pub bc: u16,
    /// DE register pair
    pub de: u16,
    /// HL register pair
    pub hl: u16,

    // Shadow registers (for EX AF,AF' and EXX)
    /// Shadow accumulator
    pub a_prime: u8,
    /// Shadow flags
    pub f_prime: u8,
    /// Shadow BC
    pub bc_prime: u16,
    /// Shadow DE
    pub de_prime: u16,
    /// Shadow HL
    pub hl_prime: u16,

    // Index registers
    /// IX index register
    pub ix: u16,
    /// IY index register
    pub iy: u16,

    // Special purpose registers
    /// Stack pointer
    pub sp: u16,
    /// Program counter
    pub pc: u16,
    /// Interrupt vector page
    pub i: u8,
    /// Refresh register (7-bit counter, bit 7 preserved)
    pub r: u8,

    // Interrupt state
    /// Interrupt enable flip-flop 1
    pub iff1: bool,
    /// Interrupt enable flip-flop 2 (saved across NMI)
    pub iff2: bool,
    /// Interrupt mode
    pub im: InterruptMode,

    // Run state
    /// CPU is halted (cleared by any accepted interrupt)
    pub halted: bool,
    /// DI executed; IFF1/IFF2 clear after the next instruction retires
    pub pending_di: bool,
    /// EI executed; IFF1/IFF2 set after the next instruction retires
    pub pending_ei: bool,

    /// T-states accumulated for the instruction in flight
    cycles: u32,
}

impl<B: Bus> Cpu<B> {
    /// Create a new CPU around the host bus, in reset state.
    pub fn new(bus: B) -> Self {
        let mut cpu = Self {
            bus,
            a: 0,
            f: 0,
            bc: 0,
            de: 0,
            hl: 0,
            a_prime: 0,
            f_prime: 0,
            bc_prime: 0,
            de_prime: 0,
            hl_prime: 0,
            ix: 0,
            iy: 0,
            sp: 0,
            pc: 0,
            i: 0,
            r: 0,
            iff1: false,
            iff2: false,
            im: InterruptMode::Mode0,
            halted: false,
            pending_di: false,
            pending_ei: false,
            cycles: 0,
        };
        cpu.reset();
        cpu
    }

    /// Reset the CPU.
    ///
    /// Only the state the hardware defines after /RESET is touched: SP,
    /// PC, A, R, F, the interrupt latches and the run state. Everything
    /// else keeps whatever it held, matching the undefined power-on
    /// contents of the remaining registers.
    pub fn reset(&mut self) {
        self.sp = 0xDFF0;
        self.pc = 0;
        self.a = 0;
        self.r = 0;
        self.f = 0;
        self.im = InterruptMode::Mode0;
        self.iff1 = false;
        self.iff2 = false;
        self.halted = false;
        self.pending_di = false;
        self.pending_ei = false;
        self.cycles = 0;
    }

    // ========== Instruction Execution ==========

    /// Execute one instruction; returns the T-states consumed.
    ///
    /// A halted CPU returns 1 without touching the bus, so the host can
    /// keep advancing virtual time until it posts an interrupt.
    ///
    /// EI and DI only latch a pending state; the flip-flops change after
    /// the *following* instruction retires, which is what keeps an
    /// interrupt from landing between EI and a trailing RETI/RET.
    pub fn step_instruction(&mut self) -> u32 {
        if self.halted {
            return 1;
        }

        // Snapshot the latches armed by the previous EI/DI; whatever this
        // instruction arms commits one instruction later.
        let commit_di = self.pending_di;
        let commit_ei = self.pending_ei;
        self.pending_di = false;
        self.pending_ei = false;

        let op = self.fetch_opcode();
        self.cycles += u32::from(tables::CYCLES_MAIN[op as usize]);
        self.execute_main(op);

        if commit_di {
            self.iff1 = false;
            self.iff2 = false;
        }
        if commit_ei {
            self.iff1 = true;
            self.iff2 = true;
        }

        std::mem::take(&mut self.cycles)
    }

    /// Inject an interrupt between instructions; returns the T-states
    /// consumed (0 when a maskable request is ignored).
    ///
    /// `data` is the byte the interrupting device drives onto the data
    /// bus: an opcode in mode 0, the vector low byte in mode 2, unused in
    /// mode 1 and for NMI.
    pub fn irq(&mut self, non_maskable: bool, data: u8) -> u32 {
        if non_maskable {
            self.bump_r();
            self.halted = false;
            self.iff2 = self.iff1;
            self.iff1 = false;
            self.push_word(self.pc);
            self.pc = 0x0066;
            return 11;
        }

        if !self.iff1 {
            return 0;
        }

        self.bump_r();
        self.halted = false;
        self.iff1 = false;
        self.iff2 = false;

        match self.im {
            InterruptMode::Mode0 => {
                // Execute the bus byte through the normal decoder. PC
                // already holds the resume address, so an RST pushes the
                // right return address with no adjustment.
                self.cycles += 2 + u32::from(tables::CYCLES_MAIN[data as usize]);
                self.execute_main(data);
                std::mem::take(&mut self.cycles)
            }
            InterruptMode::Mode1 => {
                self.push_word(self.pc);
                self.pc = 0x0038;
                13
            }
            InterruptMode::Mode2 => {
                self.push_word(self.pc);
                // Vector table entry at (I << 8) | data, low byte first.
                // The manual wants an even vector; the core reads from
                // whatever address forms.
                let entry = (u16::from(self.i) << 8) | u16::from(data);
                let lo = u16::from(self.bus.mem_read(entry));
                let hi = u16::from(self.bus.mem_read(entry.wrapping_add(1)));
                self.pc = lo | (hi << 8);
                19
            }
        }
    }
}

// ========== State Snapshot ==========

/// Complete architectural state of the CPU, detached from the bus.
///
/// Captured by [`Cpu::snapshot`] and restored by [`Cpu::load`]. Two
/// snapshots compare equal exactly when the full state vectors match.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    /// Accumulator
    pub a: u8,
    /// Flags
    pub f: u8,
    /// BC pair
    pub bc: u16,
    /// DE pair
    pub de: u16,
    /// HL pair
    pub hl: u16,
    /// Shadow accumulator
    pub a_prime: u8,
    /// Shadow flags
    pub f_prime: u8,
    /// Shadow BC
    pub bc_prime: u16,
    /// Shadow DE
    pub de_prime: u16,
    /// Shadow HL
    pub hl_prime: u16,
    /// IX
    pub ix: u16,
    /// IY
    pub iy: u16,
    /// Stack pointer
    pub sp: u16,
    /// Program counter
    pub pc: u16,
    /// Interrupt vector page
    pub i: u8,
    /// Refresh register
    pub r: u8,
    /// Interrupt enable flip-flop 1
    pub iff1: bool,
    /// Interrupt enable flip-flop 2
    pub iff2: bool,
    /// Interrupt mode
    pub im: InterruptMode,
    /// Halted state
    pub halted: bool,
    /// Pending DI commit
    pub pending_di: bool,
    /// Pending EI commit
    pub pending_ei: bool,
}

impl<B: Bus> Cpu<B> {
    /// Capture the full architectural state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            a: self.a,
            f: self.f,
            bc: self.bc,
            de: self.de,
            hl: self.hl,
            a_prime: self.a_prime,
            f_prime: self.f_prime,
            bc_prime: self.bc_prime,
            de_prime: self.de_prime,
            hl_prime: self.hl_prime,
            ix: self.ix,
            iy: self.iy,
            sp: self.sp,
            pc: self.pc,
            i: self.i,
            r: self.r,
            iff1: self.iff1,
            iff2: self.iff2,
            im: self.im,
            halted: self.halted,
            pending_di: self.pending_di,
            pending_ei: self.pending_ei,
        }
    }

    /// Restore a previously captured state.
    pub fn load(&mut self, snapshot: &Snapshot) {
        self.a = snapshot.a;
        self.f = snapshot.f;
        self.bc = snapshot.bc;
        self.de = snapshot.de;
        self.hl = snapshot.hl;
        self.a_prime = snapshot.a_prime;
        self.f_prime = snapshot.f_prime;
        self.bc_prime = snapshot.bc_prime;
        self.de_prime = snapshot.de_prime;
        self.hl_prime = snapshot.hl_prime;
        self.ix = snapshot.ix;
        self.iy = snapshot.iy;
        self.sp = snapshot.sp;
        self.pc = snapshot.pc;
        self.i = snapshot.i;
        self.r = snapshot.r;
        self.iff1 = snapshot.iff1;
        self.iff2 = snapshot.iff2;
        self.im = snapshot.im;
        self.halted = snapshot.halted;
        self.pending_di = snapshot.pending_di;
        self.pending_ei = snapshot.pending_ei;
        self.cycles = 0;
    }
}

impl<B: Bus + Default> Default for Cpu<B> {
    fn default() -> Self {
        Self::new(B::default())
    }
}
