//! Z80 CPU tests.
//!
//! Test suite for the CPU core, organized into:
//! - instructions.rs: Individual instructions and instruction families
//! - alu.rs: Exhaustive flag-algebra sweeps against closed-form models
//! - interrupts.rs: EI/DI commit timing, NMI and interrupt modes 0/1/2

use super::*;
use crate::memory::Ram;

mod alu;

// ========== Test Helpers ==========

/// Fresh CPU over a zero-filled 32 KiB RAM.
fn cpu() -> Cpu<Ram> {
    Cpu::new(Ram::new())
}

/// Fresh CPU with `program` loaded at address 0.
fn cpu_with(program: &[u8]) -> Cpu<Ram> {
    let mut cpu = cpu();
    cpu.bus.load(0, program);
    cpu
}

/// Step until the CPU halts, returning the T-states consumed (the halted
/// ticks themselves are not counted). Panics if the program never halts.
fn run_to_halt(cpu: &mut Cpu<Ram>) -> u32 {
    let mut total = 0;
    for _ in 0..10_000 {
        total += cpu.step_instruction();
        if cpu.halted {
            return total;
        }
    }
    panic!("program did not halt");
}

/// Assert the full flag byte with a readable per-bit breakdown.
fn assert_flags(cpu: &Cpu<Ram>, expected: u8, context: &str) {
    assert_eq!(
        cpu.f, expected,
        "{}: flags mismatch. Expected {:08b}, got {:08b} (S={} Z={} F5={} H={} F3={} PV={} N={} C={})",
        context,
        expected,
        cpu.f,
        u8::from(cpu.flag_s()),
        u8::from(cpu.flag_z()),
        u8::from(cpu.f & flags::F5 != 0),
        u8::from(cpu.flag_h()),
        u8::from(cpu.f & flags::F3 != 0),
        u8::from(cpu.flag_pv()),
        u8::from(cpu.flag_n()),
        u8::from(cpu.flag_c()),
    );
}
