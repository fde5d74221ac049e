// Copyright 2021 Nir H. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
//! Implementation of the Z80-like cpu's instructions.
//!
//! Loads, stack manipulation, control transfers and cpu control. The
//! arithmetic and logic instructions live in [`super::alu`].

use super::Cpu;
use super::decode;
use super::operands::*;
use super::operands::cond::Condition;

/// An instruction's method.
///
/// Executing an instruction can't fail: every byte sequence has some
/// deterministic behaviour on the hardware.
pub type Instruction = fn(&mut Cpu);

/// The stack's top, written with a pre-decrement of SP.
type Push = WordPtr<SP, -2, -2>;

/// The stack's top, read with a post-increment of SP.
type Pop = WordPtr<SP, 2>;

/// `NOP`.
pub fn nop(_cpu: &mut Cpu) {}

/// `LD dst, src`. No flags are affected.
pub fn ld<D, S>(cpu: &mut Cpu)
	where D: Writable, S: Operand<Value = D::Value>
{
	let value = S::get(cpu);
	D::set(cpu, value);
}

/// `LD SP, HL`, which takes an extra cycle.
pub fn ld_sp_hl(cpu: &mut Cpu) {
	ld::<SP, HL>(cpu);
	cpu.registers.tick();
}

/// `PUSH src`.
pub fn push<T: Operand<Value = u16>>(cpu: &mut Cpu) {
	let value = T::get(cpu);
	cpu.registers.tick();
	Push::set(cpu, value);
}

/// `POP dst`.
pub fn pop<T: Writable<Value = u16>>(cpu: &mut Cpu) {
	let value = Pop::get(cpu);
	T::set(cpu, value);
}

/// `JP cond, target`. The target is fetched even when the jump isn't taken.
pub fn jp<C: Condition, T: Operand<Value = u16>>(cpu: &mut Cpu) {
	let target = T::get(cpu);

	if C::get(cpu) {
		cpu.registers.tick();
		PC::set(cpu, target);
	}
}

/// `JP (HL)`.
pub fn jp_hl(cpu: &mut Cpu) {
	ld::<PC, HL>(cpu);
}

/// `JR cond, r8`: relative to the address following the instruction.
pub fn jr<C: Condition>(cpu: &mut Cpu) {
	let offset = Imm8::get(cpu) as i8;

	if C::get(cpu) {
		cpu.registers.tick();

		// Add the offset to the program counter (preserving the offset's sign)
		let address = PC::get(cpu).wrapping_add(offset as i16 as u16);
		PC::set(cpu, address);
	}
}

/// `CALL cond, a16`: pushes the address following the instruction.
pub fn call<C: Condition>(cpu: &mut Cpu) {
	let target = Imm16::get(cpu);

	if C::get(cpu) {
		push::<PC>(cpu);
		PC::set(cpu, target);
	}
}

/// `RET cond`.
pub fn ret<C: Condition>(cpu: &mut Cpu) {
	if C::CONDITIONAL {
		cpu.registers.tick();
	}

	if C::get(cpu) {
		pop::<PC>(cpu);
		cpu.registers.tick();
	}
}

/// `RETI`: returns and enables interrupts.
pub fn reti(cpu: &mut Cpu) {
	ret::<cond::Always>(cpu);
	cpu.registers.enable_interrupts();
}

/// `RST vector`: calls one of the fixed restart vectors.
pub fn rst<T: Operand<Value = u16>>(cpu: &mut Cpu) {
	push::<PC>(cpu);

	let target = T::get(cpu);
	PC::set(cpu, target);
}

/// `STOP`. The instruction is followed by a padding byte.
pub fn stop(cpu: &mut Cpu) {
	Imm8::get(cpu);
	cpu.registers.stop();

	let pc = PC::get(cpu);
	tracing::debug!(pc, cycles = cpu.registers.cycles(), "cpu stopped");
}

/// `HALT`.
pub fn halt(cpu: &mut Cpu) {
	cpu.registers.halt();

	let pc = PC::get(cpu);
	tracing::debug!(pc, cycles = cpu.registers.cycles(), "cpu halted");
}

/// `EI`.
pub fn ei(cpu: &mut Cpu) {
	cpu.registers.enable_interrupts();
}

/// `DI`.
pub fn di(cpu: &mut Cpu) {
	cpu.registers.disable_interrupts();
}

/// The `0xCB` prefix: executes an instruction from the extended table.
pub fn prefix_cb(cpu: &mut Cpu) {
	let opcode = Imm8::get(cpu);
	(decode::decode_cb(opcode).execute)(cpu);
}

/// Opcodes the hardware doesn't define execute as a no-op.
pub fn undefined(cpu: &mut Cpu) {
	let address = PC::get(cpu).wrapping_sub(1);
	let opcode = cpu.mmap.get(address);

	tracing::warn!(opcode, address, "undefined opcode executed as a no-op");
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::Config;
	use crate::cpu::Exit;
	use proptest::prelude::*;

	fn cpu_with(program: &[u8]) -> Cpu {
		let mut cpu = Cpu::new(Config::default());
		cpu.load(program);
		cpu
	}

	#[test]
	fn test_load_register() {
		// LD A, B; STOP
		let mut cpu = cpu_with(&[0x78, 0x10, 0x00]);
		cpu.set::<B>(0x42);

		assert_eq!(Exit::Stopped, cpu.run());
		assert_eq!(0x42, cpu.get::<A>());
		assert_eq!(0x42, cpu.get::<B>());
		assert!(cpu.is_stopped());
		assert_eq!(3, cpu.get::<PC>());
		assert_eq!(3, cpu.cycles());
	}

	#[test]
	fn test_load_immediate() {
		// LD A, d8; STOP
		let mut cpu = cpu_with(&[0x3E, 0x42, 0x10, 0x00]);

		assert_eq!(2, cpu.step());
		assert_eq!(0x42, cpu.get::<A>());
		assert_eq!(2, cpu.get::<PC>());

		assert_eq!(Exit::Stopped, cpu.run());
		assert_eq!(4, cpu.get::<PC>());
	}

	#[test]
	fn test_load_high_page() {
		// LD A, d8; LDH (a8), A; LD C, d8; LD A, (C); LD (C), A
		let mut cpu = cpu_with(&[0x3E, 0x42, 0xE0, 0x80, 0x0E, 0x81, 0xF2, 0xE2]);

		cpu.step();
		assert_eq!(3, cpu.step());
		assert_eq!(0x42, cpu.read(0xFF80));

		cpu.step();
		cpu.write(0xFF81, 0x24);
		assert_eq!(2, cpu.step());
		assert_eq!(0x24, cpu.get::<A>());

		cpu.set::<A>(0x99);
		cpu.step();
		assert_eq!(0x99, cpu.read(0xFF81));
	}

	#[test]
	fn test_load_increment() {
		// LD (HL+), A; LD (HL-), A; LD A, (HL+)
		let mut cpu = cpu_with(&[0x22, 0x32, 0x2A]);
		cpu.set::<HL>(0xC000);
		cpu.set::<A>(0x42);

		cpu.step();
		assert_eq!(0x42, cpu.read(0xC000));
		assert_eq!(0xC001, cpu.get::<HL>());

		cpu.step();
		assert_eq!(0x42, cpu.read(0xC001));
		assert_eq!(0xC000, cpu.get::<HL>());

		cpu.set::<A>(0);
		cpu.step();
		assert_eq!(0x42, cpu.get::<A>());
		assert_eq!(0xC001, cpu.get::<HL>());
	}

	#[test]
	fn test_load_stack_pointer() {
		// LD (a16), SP; LD SP, HL; LD HL, SP+1
		let mut cpu = cpu_with(&[0x08, 0x00, 0xC0, 0xF9, 0xF8, 0x01]);
		cpu.set::<SP>(0xBEEF);
		cpu.set::<HL>(0xFFFE);

		assert_eq!(5, cpu.step());
		assert_eq!(0xEF, cpu.read(0xC000));
		assert_eq!(0xBE, cpu.read(0xC001));

		assert_eq!(2, cpu.step());
		assert_eq!(0xFFFE, cpu.get::<SP>());

		assert_eq!(3, cpu.step());
		assert_eq!(0xFFFF, cpu.get::<HL>());
		assert_eq!(0xFFFE, cpu.get::<SP>());
	}

	#[test]
	fn test_push() {
		// PUSH BC
		let mut cpu = cpu_with(&[0xC5]);
		cpu.set::<BC>(0xBEEF);
		cpu.set::<SP>(0xFF00);

		assert_eq!(4, cpu.step());
		assert_eq!(0xFEFE, cpu.get::<SP>());
		assert_eq!(0xEF, cpu.read(0xFEFE));
		assert_eq!(0xBE, cpu.read(0xFEFF));
		assert_eq!(0xBEEF, cpu.get::<WordPtr<SP>>());
	}

	#[test]
	fn test_pop_af_masks_flags() {
		// PUSH DE; POP AF
		let mut cpu = cpu_with(&[0xD5, 0xF1]);
		cpu.set::<DE>(0x12FF);
		cpu.set::<SP>(0xFFFE);

		cpu.step();
		assert_eq!(3, cpu.step());
		assert_eq!(0x12F0, cpu.get::<AF>());
		assert_eq!(0xFFFE, cpu.get::<SP>());
	}

	#[test]
	fn test_jumps() {
		// JP a16; ...; JR -3 (back to the JP (HL) at 0x0010); JP (HL)
		let mut program = [0u8; 0x20];
		program[0x00..0x03].copy_from_slice(&[0xC3, 0x11, 0x00]);
		program[0x10] = 0xE9;
		program[0x11..0x13].copy_from_slice(&[0x18, 0xFD]);
		let mut cpu = cpu_with(&program);
		cpu.set::<HL>(0x0100);

		assert_eq!(4, cpu.step());
		assert_eq!(0x0011, cpu.get::<PC>());

		assert_eq!(3, cpu.step());
		assert_eq!(0x0010, cpu.get::<PC>());

		assert_eq!(1, cpu.step());
		assert_eq!(0x0100, cpu.get::<PC>());
	}

	#[test]
	fn test_conditional_jumps() {
		// JR NZ, +2; JP Z, a16; JR Z, +2
		let mut cpu = cpu_with(&[0x20, 0x02, 0xCA, 0x00, 0xC0, 0x28, 0x02]);
		cpu.set::<cond::Z>(true);

		// Not taken: the operand is still consumed.
		assert_eq!(2, cpu.step());
		assert_eq!(2, cpu.get::<PC>());

		assert_eq!(4, cpu.step());
		assert_eq!(0xC000, cpu.get::<PC>());

		cpu.set::<PC>(5);
		assert_eq!(3, cpu.step());
		assert_eq!(9, cpu.get::<PC>());
	}

	#[test]
	fn test_call_and_return() {
		// CALL 0x0010; ...; RET
		let mut program = [0u8; 0x11];
		program[0x00..0x03].copy_from_slice(&[0xCD, 0x10, 0x00]);
		program[0x10] = 0xC9;
		let mut cpu = cpu_with(&program);
		cpu.set::<SP>(0xFFFE);

		assert_eq!(6, cpu.step());
		assert_eq!(0x0010, cpu.get::<PC>());
		assert_eq!(0xFFFC, cpu.get::<SP>());
		assert_eq!(0x0003, cpu.get::<WordPtr<SP>>());

		assert_eq!(4, cpu.step());
		assert_eq!(0x0003, cpu.get::<PC>());
		assert_eq!(0xFFFE, cpu.get::<SP>());
	}

	#[test]
	fn test_conditional_call_and_return() {
		// CALL NC, 0x0010; RET C; RET NC
		let mut program = [0u8; 0x12];
		program[0x00..0x03].copy_from_slice(&[0xD4, 0x10, 0x00]);
		program[0x03] = 0xD8;
		program[0x10] = 0xD0;
		let mut cpu = cpu_with(&program);
		cpu.set::<SP>(0xFFFE);
		cpu.set::<cond::C>(true);

		assert_eq!(3, cpu.step());
		assert_eq!(0x0003, cpu.get::<PC>());
		assert_eq!(0xFFFE, cpu.get::<SP>());

		cpu.set::<cond::C>(false);
		cpu.set::<PC>(0);
		assert_eq!(6, cpu.step());
		assert_eq!(0x0010, cpu.get::<PC>());

		assert_eq!(5, cpu.step());
		assert_eq!(0x0003, cpu.get::<PC>());

		cpu.set::<cond::C>(false);
		assert_eq!(2, cpu.step());
		assert_eq!(0x0004, cpu.get::<PC>());
	}

	#[test]
	fn test_restart_and_reti() {
		// RST 0x38 at 0x0100, RETI at 0x0038
		let mut cpu = Cpu::new(Config::default());
		cpu.write(0x0100, 0xFF);
		cpu.write(0x0038, 0xD9);
		cpu.set::<PC>(0x0100);
		cpu.set::<SP>(0xD000);
		cpu.disable_interrupts();

		assert_eq!(4, cpu.step());
		assert_eq!(0x0038, cpu.get::<PC>());
		assert_eq!(0x0101, cpu.get::<WordPtr<SP>>());

		assert_eq!(4, cpu.step());
		assert_eq!(0x0101, cpu.get::<PC>());
		assert!(cpu.interrupts_enabled());
	}

	#[test]
	fn test_cpu_control() {
		// DI; EI; HALT
		let mut cpu = cpu_with(&[0xF3, 0xFB, 0x76]);

		cpu.step();
		assert!(!cpu.interrupts_enabled());

		cpu.step();
		assert!(cpu.interrupts_enabled());

		assert_eq!(Exit::Halted, cpu.run());
		assert!(cpu.is_halted());
		assert_eq!(3, cpu.get::<PC>());
	}

	#[test]
	fn test_undefined_opcode() {
		let mut cpu = cpu_with(&[0xD3, 0xFC]);
		let registers = cpu.registers.clone();

		assert_eq!(1, cpu.step());
		assert_eq!(1, cpu.step());
		assert_eq!(2, cpu.get::<PC>());
		assert_eq!(registers.get(crate::cpu::state::registers::Register::AF), cpu.get::<AF>());
	}

	#[test]
	fn test_prefix_cb() {
		// SWAP A; BIT 0, (HL); SET 3, (HL)
		let mut cpu = cpu_with(&[0xCB, 0x37, 0xCB, 0x46, 0xCB, 0xDE]);
		cpu.set::<A>(0x12);
		cpu.set::<HL>(0xC000);

		assert_eq!(2, cpu.step());
		assert_eq!(0x21, cpu.get::<A>());

		assert_eq!(3, cpu.step());
		assert!(cpu.get::<cond::Z>());

		assert_eq!(4, cpu.step());
		assert_eq!(0x08, cpu.read(0xC000));
		assert_eq!(6, cpu.get::<PC>());
	}

	proptest! {
		#[test]
		fn prop_push_pop_round_trip(value in any::<u16>(), sp in 0x0010u16..) {
			// PUSH BC; POP DE
			let mut cpu = cpu_with(&[0xC5, 0xD1]);
			cpu.set::<BC>(value);
			cpu.set::<SP>(sp);

			cpu.step();
			prop_assert_eq!(sp.wrapping_sub(2), cpu.get::<SP>());

			cpu.step();
			prop_assert_eq!(value, cpu.get::<DE>());
			prop_assert_eq!(sp, cpu.get::<SP>());
		}
	}
}
