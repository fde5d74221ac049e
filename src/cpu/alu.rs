// Copyright 2021 Nir H. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
//! Gameboy cpu's arithmetic and logic unit.
//!
//! Every operation is generic over its operands (see [`super::operands`]),
//! so `ADD A, B`, `ADD A, (HL)` and `ADD A, d8` are the same function.

use core::mem::size_of;

use num::PrimInt;
use num::traits::{WrappingAdd, WrappingSub};

use super::Cpu;
use super::operands::*;
use super::state::registers::*;

/// Values the arithmetic operations work on: bytes and words.
pub trait Arith: PrimInt + WrappingAdd + WrappingSub {}

impl<T: PrimInt + WrappingAdd + WrappingSub> Arith for T {}

/// Internal utilities for implementing repeating logic once.
mod util {
	use super::*;

	/// The bit receiving the carry out of the operand's top nibble boundary
	/// (bit 4 for bytes, bit 12 for words).
	#[inline(always)]
	fn half_carry_bit<T: Arith>() -> T {
		T::one() << (size_of::<T>() * 8 - 4)
	}

	/// Whether the operation carried or borrowed across the half-carry boundary.
	#[inline(always)]
	fn half_carry<T: Arith>(lhs: T, rhs: T, result: T) -> bool {
		((lhs ^ rhs ^ result) & half_carry_bit::<T>()) != T::zero()
	}

	/// Adds the given arguments (and the incoming carry), sets the flags
	/// accordinately and returns the result.
	pub fn add<T: Arith>(cpu: &mut Cpu, lhs: T, rhs: T, carry: bool) -> T {
		let carry: T = if carry { T::one() } else { T::zero() };
		let result: T = lhs.wrapping_add(&rhs).wrapping_add(&carry);

		// The full-width result doesn't fit.
		let overflow = lhs.checked_add(&rhs)
			.and_then(|value| value.checked_add(&carry))
			.is_none();

		cpu.registers.set_flag(Flag::Z, result == T::zero());
		cpu.registers.set_flag(Flag::N, false);
		cpu.registers.set_flag(Flag::H, half_carry(lhs, rhs, result));
		cpu.registers.set_flag(Flag::C, overflow);

		result
	}

	/// Subtracts the given arguments (and the incoming borrow), sets the
	/// flags accordinately and returns the result.
	pub fn sub<T: Arith>(cpu: &mut Cpu, lhs: T, rhs: T, carry: bool) -> T {
		let carry: T = if carry { T::one() } else { T::zero() };
		let result: T = lhs.wrapping_sub(&rhs).wrapping_sub(&carry);

		let borrow = lhs.checked_sub(&rhs)
			.and_then(|value| value.checked_sub(&carry))
			.is_none();

		cpu.registers.set_flag(Flag::Z, result == T::zero());
		cpu.registers.set_flag(Flag::N, true);
		cpu.registers.set_flag(Flag::H, half_carry(lhs, rhs, result));
		cpu.registers.set_flag(Flag::C, borrow);

		result
	}

	/// Sets the flags of a logic operation and returns its result.
	pub fn logic(cpu: &mut Cpu, result: u8, half_carry: bool) -> u8 {
		cpu.registers.set_flag(Flag::Z, result == 0);
		cpu.registers.set_flag(Flag::N, false);
		cpu.registers.set_flag(Flag::H, half_carry);
		cpu.registers.set_flag(Flag::C, false);

		result
	}

	/// Sets the flags of the rotate and shift family.
	///
	/// The accumulator forms always clear the zero flag.
	pub fn shifted<const ZERO: bool>(cpu: &mut Cpu, result: u8, carry: bool) -> u8 {
		cpu.registers.set_flag(Flag::Z, ZERO && result == 0);
		cpu.registers.set_flag(Flag::N, false);
		cpu.registers.set_flag(Flag::H, false);
		cpu.registers.set_flag(Flag::C, carry);

		result
	}

	/// Adds the signed immediate to SP, as `ADD SP, r8` and `LD HL, SP+r8` do.
	///
	/// Half-carry and carry come from the low byte; zero and subtract are cleared.
	pub fn offset_sp(cpu: &mut Cpu) -> u16 {
		let offset = Imm8::get(cpu) as i8 as i16 as u16;
		let sp = SP::get(cpu);
		let result = sp.wrapping_add(offset);
		let carries = sp ^ offset ^ result;

		cpu.registers.set_flag(Flag::Z, false);
		cpu.registers.set_flag(Flag::N, false);
		cpu.registers.set_flag(Flag::H, (carries & 0x10) != 0);
		cpu.registers.set_flag(Flag::C, (carries & 0x100) != 0);

		result
	}
}

/// `ADD dst, src`.
pub fn add<D, S>(cpu: &mut Cpu)
	where D: Writable, S: Operand<Value = D::Value>, D::Value: Arith
{
	let lhs = D::get(cpu);
	let rhs = S::get(cpu);

	let result = util::add(cpu, lhs, rhs, false);
	D::set(cpu, result);
}

/// `ADC dst, src`: add with carry.
pub fn adc<D, S>(cpu: &mut Cpu)
	where D: Writable, S: Operand<Value = D::Value>, D::Value: Arith
{
	let lhs = D::get(cpu);
	let rhs = S::get(cpu);
	let carry = cpu.registers.flag(Flag::C);

	let result = util::add(cpu, lhs, rhs, carry);
	D::set(cpu, result);
}

/// `SUB dst, src`. `CP` is a subtraction into [`Ignore`].
///
/// There is no 16-bit subtraction on the hardware, so operands are bytes.
pub fn sub<D, S>(cpu: &mut Cpu)
	where D: Writable<Value = u8>, S: Operand<Value = u8>
{
	let lhs = D::get(cpu);
	let rhs = S::get(cpu);

	let result = util::sub(cpu, lhs, rhs, false);
	D::set(cpu, result);
}

/// `SBC dst, src`: subtract with carry.
pub fn sbc<D, S>(cpu: &mut Cpu)
	where D: Writable<Value = u8>, S: Operand<Value = u8>
{
	let lhs = D::get(cpu);
	let rhs = S::get(cpu);
	let carry = cpu.registers.flag(Flag::C);

	let result = util::sub(cpu, lhs, rhs, carry);
	D::set(cpu, result);
}

/// `AND dst, src`.
pub fn and<D, S>(cpu: &mut Cpu)
	where D: Writable<Value = u8>, S: Operand<Value = u8>
{
	let lhs = D::get(cpu);
	let rhs = S::get(cpu);

	let result = util::logic(cpu, lhs & rhs, true);
	D::set(cpu, result);
}

/// `OR dst, src`.
pub fn or<D, S>(cpu: &mut Cpu)
	where D: Writable<Value = u8>, S: Operand<Value = u8>
{
	let lhs = D::get(cpu);
	let rhs = S::get(cpu);

	let result = util::logic(cpu, lhs | rhs, false);
	D::set(cpu, result);
}

/// `XOR dst, src`.
pub fn xor<D, S>(cpu: &mut Cpu)
	where D: Writable<Value = u8>, S: Operand<Value = u8>
{
	let lhs = D::get(cpu);
	let rhs = S::get(cpu);

	let result = util::logic(cpu, lhs ^ rhs, false);
	D::set(cpu, result);
}

/// `INC` of a byte; the carry flag is left as it was.
pub fn inc<T: Writable<Value = u8>>(cpu: &mut Cpu) {
	// Save the current carry flag.
	let carry = cpu.registers.flag(Flag::C);

	let value = T::get(cpu);
	let result = util::add(cpu, value, 1, false);
	T::set(cpu, result);

	// Restore carry because inc shouldn't affect it.
	cpu.registers.set_flag(Flag::C, carry);
}

/// `DEC` of a byte; the carry flag is left as it was.
pub fn dec<T: Writable<Value = u8>>(cpu: &mut Cpu) {
	// Save the current carry flag.
	let carry = cpu.registers.flag(Flag::C);

	let value = T::get(cpu);
	let result = util::sub(cpu, value, 1, false);
	T::set(cpu, result);

	// Restore carry because dec shouldn't affect it.
	cpu.registers.set_flag(Flag::C, carry);
}

/// `INC` of a word register. No flags are affected.
pub fn inc_wide<T: Writable<Value = u16>>(cpu: &mut Cpu) {
	let value = T::get(cpu).wrapping_add(1);
	cpu.registers.tick();
	T::set(cpu, value);
}

/// `DEC` of a word register. No flags are affected.
pub fn dec_wide<T: Writable<Value = u16>>(cpu: &mut Cpu) {
	let value = T::get(cpu).wrapping_sub(1);
	cpu.registers.tick();
	T::set(cpu, value);
}

/// `ADD HL, src`. The zero flag is not affected.
pub fn add_hl<S: Operand<Value = u16>>(cpu: &mut Cpu) {
	let zero = cpu.registers.flag(Flag::Z);

	add::<HL, S>(cpu);
	cpu.registers.tick();

	cpu.registers.set_flag(Flag::Z, zero);
}

/// `ADD SP, r8`.
pub fn add_sp(cpu: &mut Cpu) {
	let result = util::offset_sp(cpu);
	cpu.registers.tick();
	cpu.registers.tick();
	SP::set(cpu, result);
}

/// `LD HL, SP+r8`.
pub fn ld_hl_sp(cpu: &mut Cpu) {
	let result = util::offset_sp(cpu);
	cpu.registers.tick();
	HL::set(cpu, result);
}

/// `RLC`: rotate left, bit 7 goes both to the carry and to bit 0.
pub fn rlc<T: Writable<Value = u8>, const ZERO: bool>(cpu: &mut Cpu) {
	let value = T::get(cpu);
	let result = util::shifted::<ZERO>(cpu, value.rotate_left(1), value & 0x80 != 0);
	T::set(cpu, result);
}

/// `RRC`: rotate right, bit 0 goes both to the carry and to bit 7.
pub fn rrc<T: Writable<Value = u8>, const ZERO: bool>(cpu: &mut Cpu) {
	let value = T::get(cpu);
	let result = util::shifted::<ZERO>(cpu, value.rotate_right(1), value & 1 != 0);
	T::set(cpu, result);
}

/// `RL`: rotate left through the carry flag.
pub fn rl<T: Writable<Value = u8>, const ZERO: bool>(cpu: &mut Cpu) {
	let carry = cpu.registers.flag(Flag::C) as u8;
	let value = T::get(cpu);
	let result = util::shifted::<ZERO>(cpu, (value << 1) | carry, value & 0x80 != 0);
	T::set(cpu, result);
}

/// `RR`: rotate right through the carry flag.
pub fn rr<T: Writable<Value = u8>, const ZERO: bool>(cpu: &mut Cpu) {
	let carry = cpu.registers.flag(Flag::C) as u8;
	let value = T::get(cpu);
	let result = util::shifted::<ZERO>(cpu, (value >> 1) | (carry << 7), value & 1 != 0);
	T::set(cpu, result);
}

/// `SLA`: arithmetic shift left.
pub fn sla<T: Writable<Value = u8>, const ZERO: bool>(cpu: &mut Cpu) {
	let value = T::get(cpu);
	let result = util::shifted::<ZERO>(cpu, value << 1, value & 0x80 != 0);
	T::set(cpu, result);
}

/// `SRA`: arithmetic shift right, the MSB stays the same.
pub fn sra<T: Writable<Value = u8>, const ZERO: bool>(cpu: &mut Cpu) {
	let value = T::get(cpu);
	let result = util::shifted::<ZERO>(cpu, (value >> 1) | (value & 0x80), value & 1 != 0);
	T::set(cpu, result);
}

/// `SRL`: logical shift right.
pub fn srl<T: Writable<Value = u8>, const ZERO: bool>(cpu: &mut Cpu) {
	let value = T::get(cpu);
	let result = util::shifted::<ZERO>(cpu, value >> 1, value & 1 != 0);
	T::set(cpu, result);
}

/// `SWAP`: exchanges the lower and higher nibbles.
pub fn swap<T: Writable<Value = u8>>(cpu: &mut Cpu) {
	let value = T::get(cpu);
	let result = util::logic(cpu, value.rotate_left(4), false);
	T::set(cpu, result);
}

/// `BIT b, op`: sets Z to the complement of the tested bit.
pub fn bit<T: Operand<Value = u8>, const BIT: u8>(cpu: &mut Cpu) {
	let value = T::get(cpu);

	cpu.registers.set_flag(Flag::Z, (value >> BIT) & 1 == 0);
	cpu.registers.set_flag(Flag::N, false);
	cpu.registers.set_flag(Flag::H, true);
}

/// `SET b, op`.
pub fn set<T: Writable<Value = u8>, const BIT: u8>(cpu: &mut Cpu) {
	let value = T::get(cpu);
	T::set(cpu, value | (1 << BIT));
}

/// `RES b, op`.
pub fn res<T: Writable<Value = u8>, const BIT: u8>(cpu: &mut Cpu) {
	let value = T::get(cpu);
	T::set(cpu, value & !(1 << BIT));
}

/// `DAA`: corrects the accumulator to packed BCD after an addition
/// or a subtraction.
pub fn daa(cpu: &mut Cpu) {
	let subtract = cpu.registers.flag(Flag::N);
	let half_carry = cpu.registers.flag(Flag::H);
	let mut carry = cpu.registers.flag(Flag::C);

	let value = A::get(cpu);
	let mut adjust: u8 = 0;

	if half_carry || (!subtract && (value & 0x0F) > 0x09) {
		adjust |= 0x06;
	}

	if carry || (!subtract && value > 0x99) {
		adjust |= 0x60;
		carry = true;
	}

	let result = if subtract {
		value.wrapping_sub(adjust)
	} else {
		value.wrapping_add(adjust)
	};

	cpu.registers.set_flag(Flag::Z, result == 0);
	cpu.registers.set_flag(Flag::H, false);
	cpu.registers.set_flag(Flag::C, carry);

	A::set(cpu, result);
}

/// `CPL`: complements the accumulator.
pub fn cpl(cpu: &mut Cpu) {
	let value = A::get(cpu);
	A::set(cpu, !value);

	cpu.registers.set_flag(Flag::N, true);
	cpu.registers.set_flag(Flag::H, true);
}

/// `SCF`: sets the carry flag.
pub fn scf(cpu: &mut Cpu) {
	cpu.registers.set_flag(Flag::N, false);
	cpu.registers.set_flag(Flag::H, false);
	cpu.registers.set_flag(Flag::C, true);
}

/// `CCF`: complements the carry flag.
pub fn ccf(cpu: &mut Cpu) {
	let carry = cpu.registers.flag(Flag::C);

	cpu.registers.set_flag(Flag::N, false);
	cpu.registers.set_flag(Flag::H, false);
	cpu.registers.set_flag(Flag::C, !carry);
}
