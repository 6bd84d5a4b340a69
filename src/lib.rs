//! Zilog Z80 CPU emulator core.
//!
//! A non-cycle-accurate interpreter for the Z80 instruction set: the full
//! documented set, the major undocumented behaviors (DD/FD index-register
//! variants, DDCB/FDCB displaced bit operations with register write-back,
//! SLL, the X/Y flag bits, the ED-plane duplicates), and NMI plus maskable
//! interrupt modes 0/1/2.
//!
//! # Architecture
//!
//! The crate is organized into:
//! - `bus`: the byte-wide memory/I-O interface the host supplies
//! - `cpu`: register file, decode, execution, and interrupt handling
//! - `memory`: a mirrored 32 KiB RAM host used by the tests and as a demo
//!
//! The host drives [`Cpu::step_instruction`], which retires exactly one
//! instruction and returns the T-states it consumed, and [`Cpu::irq`] to
//! inject interrupts between instructions. Bus timing below the
//! instruction level (M-cycles, refresh contention) is not modeled; only
//! the total T-state count per retirement is reported.

pub mod bus;
pub mod cpu;
pub mod memory;

pub use bus::Bus;
pub use cpu::{Cpu, InterruptMode, Snapshot};
pub use memory::Ram;
