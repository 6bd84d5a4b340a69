//! Z80 instruction execution.
//!
//! Decode uses the x-y-z-p-q decomposition of the opcode byte
//! (x = op >> 6, y = bits 5-3, z = bits 2-0, p = y >> 1, q = y & 1) and is
//! split by plane:
//! - `execute_main` / `execute_x0` / `execute_alu` / `execute_x3`:
//!   unprefixed instructions
//! - `execute_cb` / `execute_rot`: CB plane (rotate/shift, BIT, RES, SET)
//! - `execute_ed` / `execute_bli`: ED plane and the block instructions
//! - `execute_index` / `execute_index_op`: DD/FD plane; FD runs the same
//!   code with the IY register selected
//! - `execute_index_cb`: the composite DDCB/FDCB plane
//!
//! Base T-state costs are charged from the tables in `tables`; the
//! handlers here only add the conditional extras (taken branches, block
//! repeats) on top.

use super::flags;
use super::tables;
use super::Cpu;
use super::InterruptMode;
use crate::bus::Bus;

impl<B: Bus> Cpu<B> {
    /// Decode and execute one main-plane opcode (also the entry point for
    /// an IM 0 instruction injected from the data bus).
    pub(super) fn execute_main(&mut self, op: u8) {
        let x = op >> 6;
        let y = (op >> 3) & 0x07;
        let z = op & 0x07;
        let p = (y >> 1) & 0x03;
        let q = y & 0x01;

        match x {
            0 => self.execute_x0(y, z, p, q),
            1 => {
                // HALT sits where LD (HL),(HL) would be and wins.
                if op == 0x76 {
                    self.halted = true;
                } else {
                    // LD r,r'
                    let val = self.get_reg8(z);
                    self.set_reg8(y, val);
                }
            }
            2 => {
                // ALU A,r
                let val = self.get_reg8(z);
                self.execute_alu(y, val);
            }
            3 => self.execute_x3(y, z, p, q),
            _ => {}
        }
    }

    /// Execute x=0 opcodes
    fn execute_x0(&mut self, y: u8, z: u8, p: u8, q: u8) {
        match z {
            0 => match y {
                0 => {} // NOP
                1 => self.ex_af(),
                2 => {
                    // DJNZ d
                    let d = self.fetch_byte() as i8;
                    self.set_b(self.b().wrapping_sub(1));
                    if self.b() != 0 {
                        self.cycles += 5;
                        self.pc = (i32::from(self.pc) + i32::from(d)) as u16;
                    }
                }
                3 => {
                    // JR d
                    let d = self.fetch_byte() as i8;
                    self.pc = (i32::from(self.pc) + i32::from(d)) as u16;
                }
                4..=7 => {
                    // JR cc,d
                    let d = self.fetch_byte() as i8;
                    if self.check_cc(y - 4) {
                        self.cycles += 5;
                        self.pc = (i32::from(self.pc) + i32::from(d)) as u16;
                    }
                }
                _ => {}
            },
            1 => {
                if q == 0 {
                    // LD rp,nn
                    let nn = self.fetch_word();
                    self.set_rp(p, nn);
                } else {
                    // ADD HL,rp
                    let rhs = self.get_rp(p);
                    self.hl = self.add16(self.hl, rhs);
                }
            }
            2 => match (p, q) {
                (0, 0) => {
                    // LD (BC),A
                    self.bus.mem_write(self.bc, self.a);
                }
                (1, 0) => {
                    // LD (DE),A
                    self.bus.mem_write(self.de, self.a);
                }
                (2, 0) => {
                    // LD (nn),HL
                    let addr = self.fetch_word();
                    self.bus.mem_write(addr, self.l());
                    self.bus.mem_write(addr.wrapping_add(1), self.h());
                }
                (3, 0) => {
                    // LD (nn),A
                    let addr = self.fetch_word();
                    self.bus.mem_write(addr, self.a);
                }
                (0, 1) => {
                    // LD A,(BC)
                    self.a = self.bus.mem_read(self.bc);
                }
                (1, 1) => {
                    // LD A,(DE)
                    self.a = self.bus.mem_read(self.de);
                }
                (2, 1) => {
                    // LD HL,(nn)
                    let addr = self.fetch_word();
                    let lo = self.bus.mem_read(addr);
                    let hi = self.bus.mem_read(addr.wrapping_add(1));
                    self.hl = u16::from(lo) | (u16::from(hi) << 8);
                }
                (3, 1) => {
                    // LD A,(nn)
                    let addr = self.fetch_word();
                    self.a = self.bus.mem_read(addr);
                }
                _ => {}
            },
            3 => {
                // INC/DEC rp (no flags)
                let val = self.get_rp(p);
                let val = if q == 0 {
                    val.wrapping_add(1)
                } else {
                    val.wrapping_sub(1)
                };
                self.set_rp(p, val);
            }
            4 => {
                // INC r
                let val = self.get_reg8(y);
                let result = self.alu_inc(val);
                self.set_reg8(y, result);
            }
            5 => {
                // DEC r
                let val = self.get_reg8(y);
                let result = self.alu_dec(val);
                self.set_reg8(y, result);
            }
            6 => {
                // LD r,n
                let n = self.fetch_byte();
                self.set_reg8(y, n);
            }
            7 => match y {
                0 => {
                    // RLCA - S, Z, P/V untouched; F5/F3 from A
                    let c = self.a >> 7;
                    self.a = (self.a << 1) | c;
                    self.set_flag_h(false);
                    self.set_flag_n(false);
                    self.set_flag_c(c != 0);
                    self.set_f53_from(self.a);
                }
                1 => {
                    // RRCA
                    let c = self.a & 1;
                    self.a = (self.a >> 1) | (c << 7);
                    self.set_flag_h(false);
                    self.set_flag_n(false);
                    self.set_flag_c(c != 0);
                    self.set_f53_from(self.a);
                }
                2 => {
                    // RLA
                    let old_c = u8::from(self.flag_c());
                    let new_c = self.a >> 7;
                    self.a = (self.a << 1) | old_c;
                    self.set_flag_h(false);
                    self.set_flag_n(false);
                    self.set_flag_c(new_c != 0);
                    self.set_f53_from(self.a);
                }
                3 => {
                    // RRA
                    let old_c = if self.flag_c() { 0x80 } else { 0 };
                    let new_c = self.a & 1;
                    self.a = (self.a >> 1) | old_c;
                    self.set_flag_h(false);
                    self.set_flag_n(false);
                    self.set_flag_c(new_c != 0);
                    self.set_f53_from(self.a);
                }
                4 => self.daa(),
                5 => {
                    // CPL
                    self.a = !self.a;
                    self.set_flag_h(true);
                    self.set_flag_n(true);
                    self.set_f53_from(self.a);
                }
                6 => {
                    // SCF - F5/F3 from A
                    self.set_flag_c(true);
                    self.set_flag_h(false);
                    self.set_flag_n(false);
                    self.set_f53_from(self.a);
                }
                7 => {
                    // CCF - old carry lands in H
                    let old_c = self.flag_c();
                    self.set_flag_h(old_c);
                    self.set_flag_c(!old_c);
                    self.set_flag_n(false);
                    self.set_f53_from(self.a);
                }
                _ => {}
            },
            _ => {}
        }
    }

    /// Execute ALU operation against A (x=2 and the immediate forms)
    pub(super) fn execute_alu(&mut self, y: u8, val: u8) {
        match y {
            0 => self.a = self.alu_add(val, false), // ADD
            1 => self.a = self.alu_add(val, true),  // ADC
            2 => self.a = self.alu_sub(val, false), // SUB
            3 => self.a = self.alu_sub(val, true),  // SBC
            4 => self.alu_and(val),                 // AND
            5 => self.alu_xor(val),                 // XOR
            6 => self.alu_or(val),                  // OR
            7 => self.alu_cp(val),                  // CP
            _ => {}
        }
    }

    /// Execute x=3 opcodes
    fn execute_x3(&mut self, y: u8, z: u8, p: u8, q: u8) {
        match z {
            0 => {
                // RET cc
                if self.check_cc(y) {
                    self.cycles += 6;
                    self.pc = self.pop_word();
                }
            }
            1 => {
                if q == 0 {
                    // POP rp2
                    let val = self.pop_word();
                    self.set_rp2(p, val);
                } else {
                    match p {
                        0 => {
                            // RET
                            self.pc = self.pop_word();
                        }
                        1 => self.exx(),
                        2 => {
                            // JP (HL)
                            self.pc = self.hl;
                        }
                        3 => {
                            // LD SP,HL
                            self.sp = self.hl;
                        }
                        _ => {}
                    }
                }
            }
            2 => {
                // JP cc,nn
                let nn = self.fetch_word();
                if self.check_cc(y) {
                    self.pc = nn;
                }
            }
            3 => match y {
                0 => {
                    // JP nn
                    self.pc = self.fetch_word();
                }
                1 => self.execute_cb(),
                2 => {
                    // OUT (n),A - port high byte carries A
                    let n = self.fetch_byte();
                    let port = (u16::from(self.a) << 8) | u16::from(n);
                    self.bus.io_write(port, self.a);
                }
                3 => {
                    // IN A,(n) - no flags
                    let n = self.fetch_byte();
                    let port = (u16::from(self.a) << 8) | u16::from(n);
                    self.a = self.bus.io_read(port);
                }
                4 => {
                    // EX (SP),HL
                    let lo = self.bus.mem_read(self.sp);
                    let hi = self.bus.mem_read(self.sp.wrapping_add(1));
                    self.bus.mem_write(self.sp, self.l());
                    self.bus.mem_write(self.sp.wrapping_add(1), self.h());
                    self.hl = u16::from(lo) | (u16::from(hi) << 8);
                }
                5 => self.ex_de_hl(),
                6 => {
                    // DI - committed after the next instruction retires
                    self.pending_di = true;
                }
                7 => {
                    // EI - committed after the next instruction retires
                    self.pending_ei = true;
                }
                _ => {}
            },
            4 => {
                // CALL cc,nn
                let nn = self.fetch_word();
                if self.check_cc(y) {
                    self.cycles += 7;
                    self.push_word(self.pc);
                    self.pc = nn;
                }
            }
            5 => {
                if q == 0 {
                    // PUSH rp2
                    let val = self.get_rp2(p);
                    self.push_word(val);
                } else {
                    match p {
                        0 => {
                            // CALL nn
                            let nn = self.fetch_word();
                            self.push_word(self.pc);
                            self.pc = nn;
                        }
                        1 => self.execute_index(true),  // DD
                        2 => self.execute_ed(),         // ED
                        3 => self.execute_index(false), // FD
                        _ => {}
                    }
                }
            }
            6 => {
                // ALU A,n
                let n = self.fetch_byte();
                self.execute_alu(y, n);
            }
            7 => {
                // RST y*8
                self.push_word(self.pc);
                self.pc = u16::from(y) * 8;
            }
            _ => {}
        }
    }

    // ========== CB Prefix (Bit Operations) ==========

    /// Execute CB-prefixed instruction
    fn execute_cb(&mut self) {
        let op = self.fetch_opcode();
        self.cycles += u32::from(tables::CYCLES_CB[op as usize]);

        let x = op >> 6;
        let y = (op >> 3) & 0x07;
        let z = op & 0x07;

        let val = self.get_reg8(z);
        match x {
            0 => {
                let result = self.execute_rot(y, val);
                self.set_reg8(z, result);
            }
            1 => self.bit_flags(y, val),
            2 => self.set_reg8(z, val & !(1 << y)),
            3 => self.set_reg8(z, val | (1 << y)),
            _ => {}
        }
    }

    /// Rotate/shift kernel shared by the CB and DDCB planes.
    /// C takes the shifted-out bit; S/Z/P and F5/F3 follow the result.
    fn execute_rot(&mut self, y: u8, val: u8) -> u8 {
        let result = match y {
            0 => {
                // RLC
                let c = val >> 7;
                self.set_flag_c(c != 0);
                (val << 1) | c
            }
            1 => {
                // RRC
                let c = val & 1;
                self.set_flag_c(c != 0);
                (val >> 1) | (c << 7)
            }
            2 => {
                // RL
                let old_c = u8::from(self.flag_c());
                self.set_flag_c(val & 0x80 != 0);
                (val << 1) | old_c
            }
            3 => {
                // RR
                let old_c = if self.flag_c() { 0x80 } else { 0 };
                self.set_flag_c(val & 1 != 0);
                (val >> 1) | old_c
            }
            4 => {
                // SLA
                self.set_flag_c(val & 0x80 != 0);
                val << 1
            }
            5 => {
                // SRA - sign preserved
                self.set_flag_c(val & 1 != 0);
                (val >> 1) | (val & 0x80)
            }
            6 => {
                // SLL (undocumented) - shifts a 1 into bit 0
                self.set_flag_c(val & 0x80 != 0);
                (val << 1) | 1
            }
            7 => {
                // SRL
                self.set_flag_c(val & 1 != 0);
                val >> 1
            }
            _ => val,
        };

        self.set_sz_flags(result);
        self.set_flag_h(false);
        self.set_flag_n(false);
        self.set_flag_pv(Self::parity(result));
        result
    }

    /// BIT n flag rule: Z (and P/V) from the masked bit, S only for a set
    /// bit 7, F5/F3 from the masked result, H=1, N=0, carry untouched.
    fn bit_flags(&mut self, y: u8, val: u8) {
        let result = val & (1 << y);
        self.set_sz_flags(result);
        self.set_flag_h(true);
        self.set_flag_n(false);
        self.set_flag_pv(result == 0);
    }

    // ========== ED Prefix (Extended Instructions) ==========

    /// Execute ED-prefixed instruction
    fn execute_ed(&mut self) {
        let op = self.fetch_opcode();
        let base = tables::CYCLES_ED[op as usize];
        if base == 0 {
            // Not an ED opcode: the pair executes as a two-byte NOP.
            self.cycles += 8;
            return;
        }
        self.cycles += u32::from(base);

        let x = op >> 6;
        let y = (op >> 3) & 0x07;
        let z = op & 0x07;
        let p = (y >> 1) & 0x03;
        let q = y & 0x01;

        match x {
            1 => match z {
                0 => {
                    // IN r,(C); y=6 is the undocumented IN (C): flags only
                    let val = self.bus.io_read(self.bc);
                    if y != 6 {
                        self.set_reg8(y, val);
                    }
                    self.in_flags(val);
                }
                1 => {
                    // OUT (C),r; y=6 is the undocumented OUT (C),0
                    let val = if y == 6 { 0 } else { self.get_reg8(y) };
                    self.bus.io_write(self.bc, val);
                }
                2 => {
                    // SBC/ADC HL,rp
                    let rhs = self.get_rp(p);
                    if q == 0 {
                        self.sbc16_hl(rhs);
                    } else {
                        self.adc16_hl(rhs);
                    }
                }
                3 => {
                    // LD (nn),rp / LD rp,(nn)
                    let addr = self.fetch_word();
                    if q == 0 {
                        let val = self.get_rp(p);
                        self.bus.mem_write(addr, val as u8);
                        self.bus.mem_write(addr.wrapping_add(1), (val >> 8) as u8);
                    } else {
                        let lo = self.bus.mem_read(addr);
                        let hi = self.bus.mem_read(addr.wrapping_add(1));
                        self.set_rp(p, u16::from(lo) | (u16::from(hi) << 8));
                    }
                }
                4 => {
                    // NEG (ED 44 plus its undocumented images)
                    self.neg();
                }
                5 => {
                    // RETN everywhere except ED 4D, which is RETI. Both
                    // pop PC; only RETN restores IFF1 from IFF2.
                    self.pc = self.pop_word();
                    if y != 1 {
                        self.iff1 = self.iff2;
                    }
                }
                6 => {
                    // IM, including the undocumented images
                    self.im = match y {
                        0 | 1 | 4 | 5 => InterruptMode::Mode0,
                        2 | 6 => InterruptMode::Mode1,
                        _ => InterruptMode::Mode2,
                    };
                }
                7 => match y {
                    0 => self.i = self.a, // LD I,A
                    1 => self.r = self.a, // LD R,A - the one write to bit 7
                    2 => {
                        // LD A,I - P/V exposes IFF2
                        self.a = self.i;
                        let a = self.a;
                        self.set_sz_flags(a);
                        self.set_flag_h(false);
                        self.set_flag_n(false);
                        let iff2 = self.iff2;
                        self.set_flag_pv(iff2);
                    }
                    3 => {
                        // LD A,R - P/V exposes IFF2
                        self.a = self.r;
                        let a = self.a;
                        self.set_sz_flags(a);
                        self.set_flag_h(false);
                        self.set_flag_n(false);
                        let iff2 = self.iff2;
                        self.set_flag_pv(iff2);
                    }
                    4 => {
                        // RRD - low nibble of A rotates through (HL)
                        let mem = self.bus.mem_read(self.hl);
                        let new_mem = (self.a << 4) | (mem >> 4);
                        self.a = (self.a & 0xF0) | (mem & 0x0F);
                        self.bus.mem_write(self.hl, new_mem);
                        let a = self.a;
                        self.set_sz_flags(a);
                        self.set_flag_h(false);
                        self.set_flag_n(false);
                        self.set_flag_pv(Self::parity(a));
                    }
                    5 => {
                        // RLD
                        let mem = self.bus.mem_read(self.hl);
                        let new_mem = (mem << 4) | (self.a & 0x0F);
                        self.a = (self.a & 0xF0) | (mem >> 4);
                        self.bus.mem_write(self.hl, new_mem);
                        let a = self.a;
                        self.set_sz_flags(a);
                        self.set_flag_h(false);
                        self.set_flag_n(false);
                        self.set_flag_pv(Self::parity(a));
                    }
                    _ => {}
                },
                _ => {}
            },
            2 => self.execute_bli(y, z),
            _ => {}
        }
    }

    /// Block instructions (ED plane, x=2). The repeating variants rewind
    /// PC by two so the opcode pair refetches, +5 T-states per pass.
    fn execute_bli(&mut self, y: u8, z: u8) {
        // y bit 0 selects direction, y bit 1 the repeating form.
        let increment = y & 1 == 0;
        let repeating = y & 2 != 0;

        match z {
            0 => {
                // LDI/LDD/LDIR/LDDR
                let val = self.bus.mem_read(self.hl);
                self.bus.mem_write(self.de, val);
                if increment {
                    self.hl = self.hl.wrapping_add(1);
                    self.de = self.de.wrapping_add(1);
                } else {
                    self.hl = self.hl.wrapping_sub(1);
                    self.de = self.de.wrapping_sub(1);
                }
                self.bc = self.bc.wrapping_sub(1);

                self.set_flag_h(false);
                self.set_flag_n(false);
                self.set_flag_pv(self.bc != 0);
                // F3 is bit 3 and F5 bit 1 of A plus the moved byte
                let n = self.a.wrapping_add(val);
                self.f = (self.f & !(flags::F5 | flags::F3)) | (n & flags::F3) | ((n & 0x02) << 4);

                if repeating && self.bc != 0 {
                    self.repeat_block();
                }
            }
            1 => {
                // CPI/CPD/CPIR/CPDR - compare A with (HL), carry preserved
                let val = self.bus.mem_read(self.hl);
                let a = self.a;
                let result = a.wrapping_sub(val);
                if increment {
                    self.hl = self.hl.wrapping_add(1);
                } else {
                    self.hl = self.hl.wrapping_sub(1);
                }
                self.bc = self.bc.wrapping_sub(1);

                let half = (a & 0x0F) < (val & 0x0F);
                self.set_sz_flags(result);
                self.set_flag_h(half);
                self.set_flag_n(true);
                self.set_flag_pv(self.bc != 0);
                // F3 is bit 3 and F5 bit 1 of the result less the half-borrow
                let n = result.wrapping_sub(u8::from(half));
                self.f = (self.f & !(flags::F5 | flags::F3)) | (n & flags::F3) | ((n & 0x02) << 4);

                if repeating && self.bc != 0 && result != 0 {
                    self.repeat_block();
                }
            }
            2 => {
                // INI/IND/INIR/INDR - port addressed with B still intact
                let val = self.bus.io_read(self.bc);
                self.bus.mem_write(self.hl, val);
                if increment {
                    self.hl = self.hl.wrapping_add(1);
                } else {
                    self.hl = self.hl.wrapping_sub(1);
                }
                let b = self.alu_dec(self.b());
                self.set_b(b);
                self.set_flag_n(true);

                if repeating && b != 0 {
                    self.repeat_block();
                }
            }
            3 => {
                // OUTI/OUTD/OTIR/OTDR - port addressed with B still intact
                let val = self.bus.mem_read(self.hl);
                self.bus.io_write(self.bc, val);
                if increment {
                    self.hl = self.hl.wrapping_add(1);
                } else {
                    self.hl = self.hl.wrapping_sub(1);
                }
                let b = self.alu_dec(self.b());
                self.set_b(b);
                self.set_flag_n(true);

                if repeating && b != 0 {
                    self.repeat_block();
                }
            }
            _ => {}
        }
    }

    /// Rewind a repeating block instruction onto its own opcode pair.
    #[inline]
    fn repeat_block(&mut self) {
        self.cycles += 5;
        self.pc = self.pc.wrapping_sub(2);
    }

    // ========== DD/FD Prefix (IX/IY Instructions) ==========

    /// Execute a DD/FD prefixed instruction. `use_ix` selects IX (DD) or
    /// IY (FD); both prefixes share this code, which is the re-entrant
    /// form of implementing FD by aliasing IX to IY around the DD
    /// handler.
    ///
    /// The plane is sparse: a zero cost-table entry means the prefix does
    /// not affect the opcode, which then executes as a plain main-plane
    /// instruction with the prefix costed as a NOP.
    fn execute_index(&mut self, use_ix: bool) {
        let op = self.fetch_opcode();
        match op {
            0xCB => self.execute_index_cb(use_ix),
            // A chain of prefixes resolves to the last one; each
            // superseded prefix burns a NOP.
            0xDD => {
                self.cycles += 4;
                self.execute_index(true);
            }
            0xFD => {
                self.cycles += 4;
                self.execute_index(false);
            }
            0xED => {
                self.cycles += 4;
                self.execute_ed();
            }
            _ => {
                let base = tables::CYCLES_INDEX[op as usize];
                if base == 0 {
                    self.cycles += 4 + u32::from(tables::CYCLES_MAIN[op as usize]);
                    self.execute_main(op);
                } else {
                    self.cycles += u32::from(base);
                    self.execute_index_op(op, use_ix);
                }
            }
        }
    }

    /// Execute an opcode the DD/FD plane does redefine.
    fn execute_index_op(&mut self, op: u8, use_ix: bool) {
        let x = op >> 6;
        let y = (op >> 3) & 0x07;
        let z = op & 0x07;
        let p = (y >> 1) & 0x03;
        let q = y & 0x01;

        match x {
            0 => match z {
                1 => {
                    if q == 0 {
                        // LD IX,nn
                        let nn = self.fetch_word();
                        if use_ix {
                            self.ix = nn;
                        } else {
                            self.iy = nn;
                        }
                    } else {
                        // ADD IX,rp (rp index 2 is the index register itself)
                        let lhs = if use_ix { self.ix } else { self.iy };
                        let rhs = self.get_index_rp(p, use_ix);
                        let result = self.add16(lhs, rhs);
                        if use_ix {
                            self.ix = result;
                        } else {
                            self.iy = result;
                        }
                    }
                }
                2 => {
                    let addr = self.fetch_word();
                    if q == 0 {
                        // LD (nn),IX
                        let val = if use_ix { self.ix } else { self.iy };
                        self.bus.mem_write(addr, val as u8);
                        self.bus.mem_write(addr.wrapping_add(1), (val >> 8) as u8);
                    } else {
                        // LD IX,(nn)
                        let lo = self.bus.mem_read(addr);
                        let hi = self.bus.mem_read(addr.wrapping_add(1));
                        let val = u16::from(lo) | (u16::from(hi) << 8);
                        if use_ix {
                            self.ix = val;
                        } else {
                            self.iy = val;
                        }
                    }
                }
                3 => {
                    // INC/DEC IX (no flags)
                    let val = if use_ix { self.ix } else { self.iy };
                    let val = if q == 0 {
                        val.wrapping_add(1)
                    } else {
                        val.wrapping_sub(1)
                    };
                    if use_ix {
                        self.ix = val;
                    } else {
                        self.iy = val;
                    }
                }
                4 | 5 => {
                    // INC/DEC on IXH/IXL or (IX+d)
                    if y == 6 {
                        let addr = self.index_addr(use_ix);
                        let val = self.bus.mem_read(addr);
                        let result = if z == 4 {
                            self.alu_inc(val)
                        } else {
                            self.alu_dec(val)
                        };
                        self.bus.mem_write(addr, result);
                    } else {
                        let val = self.get_index_reg8(y, use_ix);
                        let result = if z == 4 {
                            self.alu_inc(val)
                        } else {
                            self.alu_dec(val)
                        };
                        self.set_index_reg8(y, result, use_ix);
                    }
                }
                6 => {
                    // LD IXH/IXL,n or LD (IX+d),n
                    if y == 6 {
                        // the displacement precedes the immediate
                        let addr = self.index_addr(use_ix);
                        let n = self.fetch_byte();
                        self.bus.mem_write(addr, n);
                    } else {
                        let n = self.fetch_byte();
                        self.set_index_reg8(y, n, use_ix);
                    }
                }
                _ => {}
            },
            1 => {
                if y == 6 {
                    // LD (IX+d),r - the source register is never
                    // substituted (0x76 is not in this plane, so z != 6)
                    let addr = self.index_addr(use_ix);
                    let val = self.get_reg8(z);
                    self.bus.mem_write(addr, val);
                } else if z == 6 {
                    // LD r,(IX+d) - the destination is never substituted
                    let addr = self.index_addr(use_ix);
                    let val = self.bus.mem_read(addr);
                    self.set_reg8(y, val);
                } else {
                    // LD r,r' with H/L replaced by the index halves
                    let val = self.get_index_reg8(z, use_ix);
                    self.set_index_reg8(y, val, use_ix);
                }
            }
            2 => {
                // ALU A,IXH / A,IXL / A,(IX+d)
                let val = if z == 6 {
                    let addr = self.index_addr(use_ix);
                    self.bus.mem_read(addr)
                } else {
                    self.get_index_reg8(z, use_ix)
                };
                self.execute_alu(y, val);
            }
            3 => match op {
                0xE1 => {
                    // POP IX
                    let val = self.pop_word();
                    if use_ix {
                        self.ix = val;
                    } else {
                        self.iy = val;
                    }
                }
                0xE3 => {
                    // EX (SP),IX
                    let lo = self.bus.mem_read(self.sp);
                    let hi = self.bus.mem_read(self.sp.wrapping_add(1));
                    let val = if use_ix { self.ix } else { self.iy };
                    self.bus.mem_write(self.sp, val as u8);
                    self.bus.mem_write(self.sp.wrapping_add(1), (val >> 8) as u8);
                    let swapped = u16::from(lo) | (u16::from(hi) << 8);
                    if use_ix {
                        self.ix = swapped;
                    } else {
                        self.iy = swapped;
                    }
                }
                0xE5 => {
                    // PUSH IX
                    let val = if use_ix { self.ix } else { self.iy };
                    self.push_word(val);
                }
                0xE9 => {
                    // JP (IX)
                    self.pc = if use_ix { self.ix } else { self.iy };
                }
                0xF9 => {
                    // LD SP,IX
                    self.sp = if use_ix { self.ix } else { self.iy };
                }
                _ => {}
            },
            _ => {}
        }
    }

    /// Execute a DDCB/FDCB composite instruction: `DD CB d op`, with the
    /// displacement before the final opcode byte. The operation targets
    /// (IX+d); unless the low three bits select the (HL) column, the
    /// result is also copied into that register (undocumented double
    /// write; BIT excepted). Neither trailing byte is an M1 fetch, so R
    /// advances only for the two prefixes.
    fn execute_index_cb(&mut self, use_ix: bool) {
        let d = self.fetch_byte() as i8;
        let op = self.fetch_byte();

        let x = op >> 6;
        let y = (op >> 3) & 0x07;
        let z = op & 0x07;

        let base = if use_ix { self.ix } else { self.iy };
        let addr = (i32::from(base) + i32::from(d)) as u16;
        let val = self.bus.mem_read(addr);

        match x {
            0 => {
                self.cycles += 23;
                let result = self.execute_rot(y, val);
                self.bus.mem_write(addr, result);
                if z != 6 {
                    self.set_reg8(z, result);
                }
            }
            1 => {
                // BIT y,(IX+d) - no write-back
                self.cycles += 20;
                self.bit_flags(y, val);
            }
            2 => {
                self.cycles += 23;
                let result = val & !(1 << y);
                self.bus.mem_write(addr, result);
                if z != 6 {
                    self.set_reg8(z, result);
                }
            }
            3 => {
                self.cycles += 23;
                let result = val | (1 << y);
                self.bus.mem_write(addr, result);
                if z != 6 {
                    self.set_reg8(z, result);
                }
            }
            _ => {}
        }
    }
}
