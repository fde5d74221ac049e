// Copyright 2021 Nir H. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
//! Gameboy cpu's opcode decoder.
//!
//! Decoding is a lookup in one of two 256-entry tables: the base table, and
//! the extended table selected by the `0xCB` prefix. Both are built at compile
//! time out of the generic instruction implementations.

use core::fmt;

use super::alu::*;
use super::instructions::*;
use super::operands::*;
use super::operands::cond::{self, Always, NC, NZ, Z};

/// How an instruction affects the program flow.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Flow {
	/// Execution continues with the following instruction.
	Next,
	/// The instruction may move the program counter (jumps, calls, returns).
	Jump,
	/// The instruction stops or halts the cpu.
	Halt,
}

/// An entry of the opcode tables.
#[derive(Clone, Copy)]
pub struct Opcode {
	/// Assembly mnemonic, `"???"` for opcodes the hardware doesn't define.
	pub mnemonic: &'static str,
	/// The instruction's implementation.
	pub execute: Instruction,
	/// Encoded length in bytes (the prefix included, for extended opcodes).
	pub length: u8,
	/// Machine cycles taken (when a conditional instruction's branch is taken).
	pub cycles: u8,
	/// Machine cycles taken when the condition doesn't hold.
	pub skipped_cycles: u8,
	/// Program flow after the instruction.
	pub flow: Flow,
}

impl Opcode {
	/// Whether the instruction ends a basic block.
	pub fn ends_block(&self) -> bool {
		self.flow != Flow::Next
	}

	/// Whether the instruction's cost depends on a condition.
	pub fn is_conditional(&self) -> bool {
		self.cycles != self.skipped_cycles
	}
}

impl fmt::Debug for Opcode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Opcode")
			.field("mnemonic", &self.mnemonic)
			.field("length", &self.length)
			.field("cycles", &self.cycles)
			.field("skipped_cycles", &self.skipped_cycles)
			.field("flow", &self.flow)
			.finish()
	}
}

/// Returns the instruction that matches the given opcode.
#[inline(always)]
pub fn decode(opcode: u8) -> &'static Opcode {
	&OPCODES[opcode as usize]
}

/// Decode the second byte of an opcode that starts with 0xCB.
#[inline(always)]
pub fn decode_cb(opcode: u8) -> &'static Opcode {
	&CB_OPCODES[opcode as usize]
}

/// The base opcode table.
pub static OPCODES: [Opcode; 256] = base_table();

/// The extended opcode table, selected by the 0xCB prefix.
pub static CB_OPCODES: [Opcode; 256] = cb_table();

const fn next(mnemonic: &'static str, execute: Instruction, length: u8, cycles: u8) -> Opcode {
	Opcode { mnemonic, execute, length, cycles, skipped_cycles: cycles, flow: Flow::Next }
}

const fn branch(
	mnemonic: &'static str,
	execute: Instruction,
	length: u8,
	cycles: u8,
	skipped_cycles: u8) -> Opcode
{
	Opcode { mnemonic, execute, length, cycles, skipped_cycles, flow: Flow::Jump }
}

const fn halts(mnemonic: &'static str, execute: Instruction, length: u8, cycles: u8) -> Opcode {
	Opcode { mnemonic, execute, length, cycles, skipped_cycles: cycles, flow: Flow::Halt }
}

const UNDEFINED: Opcode = next("???", undefined, 1, 1);

type AtHL = BytePtr<HL>;

/// `LD dst, r` for every source register, in encoding order.
macro_rules! ld_row {
	($table:ident, $base:expr, $dst:ty, $name:literal, $cycles:expr) => {
		$table[$base] = next(concat!("LD ", $name, ",B"), ld::<$dst, B>, 1, $cycles);
		$table[$base + 1] = next(concat!("LD ", $name, ",C"), ld::<$dst, C>, 1, $cycles);
		$table[$base + 2] = next(concat!("LD ", $name, ",D"), ld::<$dst, D>, 1, $cycles);
		$table[$base + 3] = next(concat!("LD ", $name, ",E"), ld::<$dst, E>, 1, $cycles);
		$table[$base + 4] = next(concat!("LD ", $name, ",H"), ld::<$dst, H>, 1, $cycles);
		$table[$base + 5] = next(concat!("LD ", $name, ",L"), ld::<$dst, L>, 1, $cycles);
		$table[$base + 6] = next(concat!("LD ", $name, ",(HL)"), ld::<$dst, AtHL>, 1, $cycles + 1);
		$table[$base + 7] = next(concat!("LD ", $name, ",A"), ld::<$dst, A>, 1, $cycles);
	}
}

/// An accumulator operation for every source register, in encoding order.
macro_rules! alu_row {
	($table:ident, $base:expr, $op:ident, $dst:ty, $name:literal) => {
		$table[$base] = next(concat!($name, "B"), $op::<$dst, B>, 1, 1);
		$table[$base + 1] = next(concat!($name, "C"), $op::<$dst, C>, 1, 1);
		$table[$base + 2] = next(concat!($name, "D"), $op::<$dst, D>, 1, 1);
		$table[$base + 3] = next(concat!($name, "E"), $op::<$dst, E>, 1, 1);
		$table[$base + 4] = next(concat!($name, "H"), $op::<$dst, H>, 1, 1);
		$table[$base + 5] = next(concat!($name, "L"), $op::<$dst, L>, 1, 1);
		$table[$base + 6] = next(concat!($name, "(HL)"), $op::<$dst, AtHL>, 1, 2);
		$table[$base + 7] = next(concat!($name, "A"), $op::<$dst, A>, 1, 1);
	}
}

/// An extended operation for every target, in encoding order.
macro_rules! cb_row {
	($table:ident, $base:expr, $name:literal, $op:ident, $memory:expr $(, $arg:expr)?) => {
		$table[$base] = next(concat!($name, "B"), $op::<B $(, { $arg })?>, 2, 2);
		$table[$base + 1] = next(concat!($name, "C"), $op::<C $(, { $arg })?>, 2, 2);
		$table[$base + 2] = next(concat!($name, "D"), $op::<D $(, { $arg })?>, 2, 2);
		$table[$base + 3] = next(concat!($name, "E"), $op::<E $(, { $arg })?>, 2, 2);
		$table[$base + 4] = next(concat!($name, "H"), $op::<H $(, { $arg })?>, 2, 2);
		$table[$base + 5] = next(concat!($name, "L"), $op::<L $(, { $arg })?>, 2, 2);
		$table[$base + 6] = next(concat!($name, "(HL)"), $op::<AtHL $(, { $arg })?>, 2, $memory);
		$table[$base + 7] = next(concat!($name, "A"), $op::<A $(, { $arg })?>, 2, 2);
	}
}

const fn base_table() -> [Opcode; 256] {
	let mut table = [UNDEFINED; 256];

	table[0x00] = next("NOP", nop, 1, 1);
	table[0x01] = next("LD BC,d16", ld::<BC, Imm16>, 3, 3);
	table[0x02] = next("LD (BC),A", ld::<BytePtr<BC>, A>, 1, 2);
	table[0x03] = next("INC BC", inc_wide::<BC>, 1, 2);
	table[0x04] = next("INC B", inc::<B>, 1, 1);
	table[0x05] = next("DEC B", dec::<B>, 1, 1);
	table[0x06] = next("LD B,d8", ld::<B, Imm8>, 2, 2);
	table[0x07] = next("RLCA", rlc::<A, false>, 1, 1);
	table[0x08] = next("LD (a16),SP", ld::<WordPtr<Imm16>, SP>, 3, 5);
	table[0x09] = next("ADD HL,BC", add_hl::<BC>, 1, 2);
	table[0x0A] = next("LD A,(BC)", ld::<A, BytePtr<BC>>, 1, 2);
	table[0x0B] = next("DEC BC", dec_wide::<BC>, 1, 2);
	table[0x0C] = next("INC C", inc::<C>, 1, 1);
	table[0x0D] = next("DEC C", dec::<C>, 1, 1);
	table[0x0E] = next("LD C,d8", ld::<C, Imm8>, 2, 2);
	table[0x0F] = next("RRCA", rrc::<A, false>, 1, 1);

	table[0x10] = halts("STOP", stop, 2, 2);
	table[0x11] = next("LD DE,d16", ld::<DE, Imm16>, 3, 3);
	table[0x12] = next("LD (DE),A", ld::<BytePtr<DE>, A>, 1, 2);
	table[0x13] = next("INC DE", inc_wide::<DE>, 1, 2);
	table[0x14] = next("INC D", inc::<D>, 1, 1);
	table[0x15] = next("DEC D", dec::<D>, 1, 1);
	table[0x16] = next("LD D,d8", ld::<D, Imm8>, 2, 2);
	table[0x17] = next("RLA", rl::<A, false>, 1, 1);
	table[0x18] = branch("JR r8", jr::<Always>, 2, 3, 3);
	table[0x19] = next("ADD HL,DE", add_hl::<DE>, 1, 2);
	table[0x1A] = next("LD A,(DE)", ld::<A, BytePtr<DE>>, 1, 2);
	table[0x1B] = next("DEC DE", dec_wide::<DE>, 1, 2);
	table[0x1C] = next("INC E", inc::<E>, 1, 1);
	table[0x1D] = next("DEC E", dec::<E>, 1, 1);
	table[0x1E] = next("LD E,d8", ld::<E, Imm8>, 2, 2);
	table[0x1F] = next("RRA", rr::<A, false>, 1, 1);

	table[0x20] = branch("JR NZ,r8", jr::<NZ>, 2, 3, 2);
	table[0x21] = next("LD HL,d16", ld::<HL, Imm16>, 3, 3);
	table[0x22] = next("LD (HL+),A", ld::<BytePtr<HL, 1>, A>, 1, 2);
	table[0x23] = next("INC HL", inc_wide::<HL>, 1, 2);
	table[0x24] = next("INC H", inc::<H>, 1, 1);
	table[0x25] = next("DEC H", dec::<H>, 1, 1);
	table[0x26] = next("LD H,d8", ld::<H, Imm8>, 2, 2);
	table[0x27] = next("DAA", daa, 1, 1);
	table[0x28] = branch("JR Z,r8", jr::<Z>, 2, 3, 2);
	table[0x29] = next("ADD HL,HL", add_hl::<HL>, 1, 2);
	table[0x2A] = next("LD A,(HL+)", ld::<A, BytePtr<HL, 1>>, 1, 2);
	table[0x2B] = next("DEC HL", dec_wide::<HL>, 1, 2);
	table[0x2C] = next("INC L", inc::<L>, 1, 1);
	table[0x2D] = next("DEC L", dec::<L>, 1, 1);
	table[0x2E] = next("LD L,d8", ld::<L, Imm8>, 2, 2);
	table[0x2F] = next("CPL", cpl, 1, 1);

	table[0x30] = branch("JR NC,r8", jr::<NC>, 2, 3, 2);
	table[0x31] = next("LD SP,d16", ld::<SP, Imm16>, 3, 3);
	table[0x32] = next("LD (HL-),A", ld::<BytePtr<HL, -1>, A>, 1, 2);
	table[0x33] = next("INC SP", inc_wide::<SP>, 1, 2);
	table[0x34] = next("INC (HL)", inc::<AtHL>, 1, 3);
	table[0x35] = next("DEC (HL)", dec::<AtHL>, 1, 3);
	table[0x36] = next("LD (HL),d8", ld::<AtHL, Imm8>, 2, 3);
	table[0x37] = next("SCF", scf, 1, 1);
	table[0x38] = branch("JR C,r8", jr::<cond::C>, 2, 3, 2);
	table[0x39] = next("ADD HL,SP", add_hl::<SP>, 1, 2);
	table[0x3A] = next("LD A,(HL-)", ld::<A, BytePtr<HL, -1>>, 1, 2);
	table[0x3B] = next("DEC SP", dec_wide::<SP>, 1, 2);
	table[0x3C] = next("INC A", inc::<A>, 1, 1);
	table[0x3D] = next("DEC A", dec::<A>, 1, 1);
	table[0x3E] = next("LD A,d8", ld::<A, Imm8>, 2, 2);
	table[0x3F] = next("CCF", ccf, 1, 1);

	ld_row!(table, 0x40, B, "B", 1);
	ld_row!(table, 0x48, C, "C", 1);
	ld_row!(table, 0x50, D, "D", 1);
	ld_row!(table, 0x58, E, "E", 1);
	ld_row!(table, 0x60, H, "H", 1);
	ld_row!(table, 0x68, L, "L", 1);
	ld_row!(table, 0x70, AtHL, "(HL)", 2);
	ld_row!(table, 0x78, A, "A", 1);

	// LD (HL),(HL) doesn't exist; its encoding is HALT.
	table[0x76] = halts("HALT", halt, 1, 1);

	alu_row!(table, 0x80, add, A, "ADD A,");
	alu_row!(table, 0x88, adc, A, "ADC A,");
	alu_row!(table, 0x90, sub, A, "SUB ");
	alu_row!(table, 0x98, sbc, A, "SBC A,");
	alu_row!(table, 0xA0, and, A, "AND ");
	alu_row!(table, 0xA8, xor, A, "XOR ");
	alu_row!(table, 0xB0, or, A, "OR ");
	alu_row!(table, 0xB8, sub, Ignore<A>, "CP ");

	table[0xC0] = branch("RET NZ", ret::<NZ>, 1, 5, 2);
	table[0xC1] = next("POP BC", pop::<BC>, 1, 3);
	table[0xC2] = branch("JP NZ,a16", jp::<NZ, Imm16>, 3, 4, 3);
	table[0xC3] = branch("JP a16", jp::<Always, Imm16>, 3, 4, 4);
	table[0xC4] = branch("CALL NZ,a16", call::<NZ>, 3, 6, 3);
	table[0xC5] = next("PUSH BC", push::<BC>, 1, 4);
	table[0xC6] = next("ADD A,d8", add::<A, Imm8>, 2, 2);
	table[0xC7] = branch("RST 00H", rst::<Const16<0x00>>, 1, 4, 4);
	table[0xC8] = branch("RET Z", ret::<Z>, 1, 5, 2);
	table[0xC9] = branch("RET", ret::<Always>, 1, 4, 4);
	table[0xCA] = branch("JP Z,a16", jp::<Z, Imm16>, 3, 4, 3);
	table[0xCB] = next("PREFIX CB", prefix_cb, 1, 1);
	table[0xCC] = branch("CALL Z,a16", call::<Z>, 3, 6, 3);
	table[0xCD] = branch("CALL a16", call::<Always>, 3, 6, 6);
	table[0xCE] = next("ADC A,d8", adc::<A, Imm8>, 2, 2);
	table[0xCF] = branch("RST 08H", rst::<Const16<0x08>>, 1, 4, 4);

	table[0xD0] = branch("RET NC", ret::<NC>, 1, 5, 2);
	table[0xD1] = next("POP DE", pop::<DE>, 1, 3);
	table[0xD2] = branch("JP NC,a16", jp::<NC, Imm16>, 3, 4, 3);
	table[0xD4] = branch("CALL NC,a16", call::<NC>, 3, 6, 3);
	table[0xD5] = next("PUSH DE", push::<DE>, 1, 4);
	table[0xD6] = next("SUB d8", sub::<A, Imm8>, 2, 2);
	table[0xD7] = branch("RST 10H", rst::<Const16<0x10>>, 1, 4, 4);
	table[0xD8] = branch("RET C", ret::<cond::C>, 1, 5, 2);
	table[0xD9] = branch("RETI", reti, 1, 4, 4);
	table[0xDA] = branch("JP C,a16", jp::<cond::C, Imm16>, 3, 4, 3);
	table[0xDC] = branch("CALL C,a16", call::<cond::C>, 3, 6, 3);
	table[0xDE] = next("SBC A,d8", sbc::<A, Imm8>, 2, 2);
	table[0xDF] = branch("RST 18H", rst::<Const16<0x18>>, 1, 4, 4);

	table[0xE0] = next("LDH (a8),A", ld::<BytePtr<Imm8>, A>, 2, 3);
	table[0xE1] = next("POP HL", pop::<HL>, 1, 3);
	table[0xE2] = next("LD (C),A", ld::<BytePtr<C>, A>, 1, 2);
	table[0xE5] = next("PUSH HL", push::<HL>, 1, 4);
	table[0xE6] = next("AND d8", and::<A, Imm8>, 2, 2);
	table[0xE7] = branch("RST 20H", rst::<Const16<0x20>>, 1, 4, 4);
	table[0xE8] = next("ADD SP,r8", add_sp, 2, 4);
	table[0xE9] = branch("JP (HL)", jp_hl, 1, 1, 1);
	table[0xEA] = next("LD (a16),A", ld::<BytePtr<Imm16>, A>, 3, 4);
	table[0xEE] = next("XOR d8", xor::<A, Imm8>, 2, 2);
	table[0xEF] = branch("RST 28H", rst::<Const16<0x28>>, 1, 4, 4);

	table[0xF0] = next("LDH A,(a8)", ld::<A, BytePtr<Imm8>>, 2, 3);
	table[0xF1] = next("POP AF", pop::<AF>, 1, 3);
	table[0xF2] = next("LD A,(C)", ld::<A, BytePtr<C>>, 1, 2);
	table[0xF3] = next("DI", di, 1, 1);
	table[0xF5] = next("PUSH AF", push::<AF>, 1, 4);
	table[0xF6] = next("OR d8", or::<A, Imm8>, 2, 2);
	table[0xF7] = branch("RST 30H", rst::<Const16<0x30>>, 1, 4, 4);
	table[0xF8] = next("LD HL,SP+r8", ld_hl_sp, 2, 3);
	table[0xF9] = next("LD SP,HL", ld_sp_hl, 1, 2);
	table[0xFA] = next("LD A,(a16)", ld::<A, BytePtr<Imm16>>, 3, 4);
	table[0xFB] = next("EI", ei, 1, 1);
	table[0xFE] = next("CP d8", sub::<Ignore<A>, Imm8>, 2, 2);
	table[0xFF] = branch("RST 38H", rst::<Const16<0x38>>, 1, 4, 4);

	table
}

const fn cb_table() -> [Opcode; 256] {
	let mut table = [UNDEFINED; 256];

	cb_row!(table, 0x00, "RLC ", rlc, 4, true);
	cb_row!(table, 0x08, "RRC ", rrc, 4, true);
	cb_row!(table, 0x10, "RL ", rl, 4, true);
	cb_row!(table, 0x18, "RR ", rr, 4, true);
	cb_row!(table, 0x20, "SLA ", sla, 4, true);
	cb_row!(table, 0x28, "SRA ", sra, 4, true);
	cb_row!(table, 0x30, "SWAP ", swap, 4);
	cb_row!(table, 0x38, "SRL ", srl, 4, true);

	cb_row!(table, 0x40, "BIT 0,", bit, 3, 0);
	cb_row!(table, 0x48, "BIT 1,", bit, 3, 1);
	cb_row!(table, 0x50, "BIT 2,", bit, 3, 2);
	cb_row!(table, 0x58, "BIT 3,", bit, 3, 3);
	cb_row!(table, 0x60, "BIT 4,", bit, 3, 4);
	cb_row!(table, 0x68, "BIT 5,", bit, 3, 5);
	cb_row!(table, 0x70, "BIT 6,", bit, 3, 6);
	cb_row!(table, 0x78, "BIT 7,", bit, 3, 7);

	cb_row!(table, 0x80, "RES 0,", res, 4, 0);
	cb_row!(table, 0x88, "RES 1,", res, 4, 1);
	cb_row!(table, 0x90, "RES 2,", res, 4, 2);
	cb_row!(table, 0x98, "RES 3,", res, 4, 3);
	cb_row!(table, 0xA0, "RES 4,", res, 4, 4);
	cb_row!(table, 0xA8, "RES 5,", res, 4, 5);
	cb_row!(table, 0xB0, "RES 6,", res, 4, 6);
	cb_row!(table, 0xB8, "RES 7,", res, 4, 7);

	cb_row!(table, 0xC0, "SET 0,", set, 4, 0);
	cb_row!(table, 0xC8, "SET 1,", set, 4, 1);
	cb_row!(table, 0xD0, "SET 2,", set, 4, 2);
	cb_row!(table, 0xD8, "SET 3,", set, 4, 3);
	cb_row!(table, 0xE0, "SET 4,", set, 4, 4);
	cb_row!(table, 0xE8, "SET 5,", set, 4, 5);
	cb_row!(table, 0xF0, "SET 6,", set, 4, 6);
	cb_row!(table, 0xF8, "SET 7,", set, 4, 7);

	table
}
