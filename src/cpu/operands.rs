// Copyright 2021 Nir H. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
//! Uniform access to the cpu's operands.
//!
//! Every addressing mode of the cpu is a type implementing [`Operand`] (and
//! [`Writable`] when it can be stored into). Instructions are written once,
//! generically over their operand types, and get monomorphized into the
//! opcode tables. The accessors are the single place where an operand turns
//! into a register or memory access, and where memory accesses are charged:
//! every byte transferred from or to memory costs a single machine cycle.
//!
//! Register accessors never charge cycles; extra internal cycles are
//! charged by the instructions themselves.

use core::marker::PhantomData;

use super::Cpu;
use super::state::registers::{Register, Flag};
use crate::bus::consts::HIGH_PAGE;

/// An operand that can be read by an instruction.
pub trait Operand {
	/// The value transferred by the operand.
	type Value: Copy;

	/// Reads the operand, applying its side effects (cycles, auto-increment).
	fn get(cpu: &mut Cpu) -> Self::Value;
}

/// An operand that can be written by an instruction.
pub trait Writable: Operand {
	/// Writes the operand, applying its side effects (cycles, auto-increment).
	fn set(cpu: &mut Cpu, value: Self::Value);
}

/// An operand that can be dereferenced by [`BytePtr`] and [`WordPtr`].
///
/// 8-bit bases address the high page (0xFF00-0xFFFF).
pub trait Base {
	/// Evaluates the base into an address.
	fn address(cpu: &mut Cpu) -> u16;

	/// Moves the base by `delta` after a pointer access.
	///
	/// Immediates and constants have no storage to write back to,
	/// so stepping them does nothing.
	fn step(cpu: &mut Cpu, delta: i16) {
		let _ = (cpu, delta);
	}
}

macro_rules! byte_register {
	($($name:ident),*) => {$(
		#[doc = concat!("The 8-bit `", stringify!($name), "` register.")]
		pub struct $name;

		impl Operand for $name {
			type Value = u8;

			#[inline(always)]
			fn get(cpu: &mut Cpu) -> u8 {
				cpu.registers.get(Register::$name) as u8
			}
		}

		impl Writable for $name {
			#[inline(always)]
			fn set(cpu: &mut Cpu, value: u8) {
				cpu.registers.set(Register::$name, value as u16);
			}
		}

		impl Base for $name {
			fn address(cpu: &mut Cpu) -> u16 {
				HIGH_PAGE | <$name as Operand>::get(cpu) as u16
			}

			fn step(cpu: &mut Cpu, delta: i16) {
				let value = <$name as Operand>::get(cpu).wrapping_add(delta as u8);
				<$name as Writable>::set(cpu, value);
			}
		}
	)*}
}

macro_rules! word_register {
	($($name:ident),*) => {$(
		#[doc = concat!("The 16-bit `", stringify!($name), "` register.")]
		pub struct $name;

		impl Operand for $name {
			type Value = u16;

			#[inline(always)]
			fn get(cpu: &mut Cpu) -> u16 {
				cpu.registers.get(Register::$name)
			}
		}

		impl Writable for $name {
			#[inline(always)]
			fn set(cpu: &mut Cpu, value: u16) {
				cpu.registers.set(Register::$name, value);
			}
		}

		impl Base for $name {
			fn address(cpu: &mut Cpu) -> u16 {
				<$name as Operand>::get(cpu)
			}

			fn step(cpu: &mut Cpu, delta: i16) {
				let value = <$name as Operand>::get(cpu).wrapping_add(delta as u16);
				<$name as Writable>::set(cpu, value);
			}
		}
	)*}
}

byte_register!(A, F, B, C, D, E, H, L);
word_register!(AF, BC, DE, HL, SP, PC);

/// Condition codes, evaluated against the flags register.
pub mod cond {
	use super::*;

	/// Runtime descriptor of the condition codes.
	#[derive(Debug, PartialEq, Eq, Clone, Copy)]
	pub enum ConditionCode {
		/// Zero flag set.
		Z,
		/// Zero flag clear.
		NZ,
		/// Subtract flag set.
		N,
		/// Half-carry flag set.
		H,
		/// Carry flag set.
		C,
		/// Carry flag clear.
		NC,
		/// Always true, regardless of the flags.
		Always,
	}

	impl ConditionCode {
		/// The flag bit this condition tests, if any.
		pub fn flag(&self) -> Option<Flag> {
			match self {
				ConditionCode::Z | ConditionCode::NZ => Some(Flag::Z),
				ConditionCode::C | ConditionCode::NC => Some(Flag::C),
				ConditionCode::N => Some(Flag::N),
				ConditionCode::H => Some(Flag::H),
				ConditionCode::Always => None,
			}
		}

		/// Evaluates the condition.
		pub fn test(&self, cpu: &Cpu) -> bool {
			match (self, self.flag()) {
				(ConditionCode::NZ, Some(flag)) | (ConditionCode::NC, Some(flag)) => {
					!cpu.registers.flag(flag)
				}
				(_, Some(flag)) => cpu.registers.flag(flag),
				(_, None) => true,
			}
		}

		/// Writes the flag behind the condition.
		///
		/// Only Z, N, H and C name a flag bit; the negated and unconditional
		/// codes are read-only views and writing them does nothing.
		pub fn assign(&self, cpu: &mut Cpu, value: bool) {
			match self {
				ConditionCode::Z |
				ConditionCode::N |
				ConditionCode::H |
				ConditionCode::C => {
					if let Some(flag) = self.flag() {
						cpu.registers.set_flag(flag, value);
					}
				}
				_ => {}
			}
		}
	}

	/// A condition code operand, used to gate jumps, calls and returns.
	pub trait Condition: Operand<Value = bool> {
		/// Conditional returns spend a cycle evaluating their condition.
		const CONDITIONAL: bool = true;
	}

	macro_rules! condition {
		($($name:ident),*) => {$(
			#[doc = concat!("The `", stringify!($name), "` condition code.")]
			pub struct $name;

			impl Operand for $name {
				type Value = bool;

				#[inline(always)]
				fn get(cpu: &mut Cpu) -> bool {
					ConditionCode::$name.test(cpu)
				}
			}

			impl Condition for $name {}
		)*}
	}

	macro_rules! flag {
		($($name:ident),*) => {$(
			impl Writable for $name {
				#[inline(always)]
				fn set(cpu: &mut Cpu, value: bool) {
					ConditionCode::$name.assign(cpu, value);
				}
			}
		)*}
	}

	condition!(Z, NZ, N, H, C, NC);
	flag!(Z, N, H, C);

	/// The unconditional condition code.
	pub struct Always;

	impl Operand for Always {
		type Value = bool;

		#[inline(always)]
		fn get(_cpu: &mut Cpu) -> bool {
			true
		}
	}

	impl Condition for Always {
		const CONDITIONAL: bool = false;
	}
}

/// Memory byte pointed by the base operand `B`.
///
/// The address is `B` (biased to the high page when `B` is 8 bits wide) plus
/// `OFF`. After the access, `B` is moved by `INC`.
pub struct BytePtr<B, const INC: i16 = 0, const OFF: i16 = 0>(PhantomData<B>);

/// Memory word (little-endian) pointed by the base operand `B`.
///
/// Same addressing as [`BytePtr`]; the low byte is transferred first.
pub struct WordPtr<B, const INC: i16 = 0, const OFF: i16 = 0>(PhantomData<B>);

impl<B: Base, const INC: i16, const OFF: i16> Operand for BytePtr<B, INC, OFF> {
	type Value = u8;

	fn get(cpu: &mut Cpu) -> u8 {
		let address = B::address(cpu).wrapping_add(OFF as u16);

		let value = cpu.mmap.get(address);
		cpu.registers.tick();

		if INC != 0 {
			B::step(cpu, INC);
		}

		value
	}
}

impl<B: Base, const INC: i16, const OFF: i16> Writable for BytePtr<B, INC, OFF> {
	fn set(cpu: &mut Cpu, value: u8) {
		let address = B::address(cpu).wrapping_add(OFF as u16);

		cpu.mmap.set(address, value);
		cpu.registers.tick();

		if INC != 0 {
			B::step(cpu, INC);
		}
	}
}

impl<B: Base, const INC: i16, const OFF: i16> Operand for WordPtr<B, INC, OFF> {
	type Value = u16;

	fn get(cpu: &mut Cpu) -> u16 {
		let address = B::address(cpu).wrapping_add(OFF as u16);

		let low = cpu.mmap.get(address) as u16;
		cpu.registers.tick();
		let high = cpu.mmap.get(address.wrapping_add(1)) as u16;
		cpu.registers.tick();

		if INC != 0 {
			B::step(cpu, INC);
		}

		(high << 8) | low
	}
}

impl<B: Base, const INC: i16, const OFF: i16> Writable for WordPtr<B, INC, OFF> {
	fn set(cpu: &mut Cpu, value: u16) {
		let address = B::address(cpu).wrapping_add(OFF as u16);

		cpu.mmap.set(address, (value & 0xFF) as u8);
		cpu.registers.tick();
		cpu.mmap.set(address.wrapping_add(1), ((value >> 8) & 0xFF) as u8);
		cpu.registers.tick();

		if INC != 0 {
			B::step(cpu, INC);
		}
	}
}

/// The byte following the opcode, read through the program counter.
pub struct Imm8;

/// The little-endian word following the opcode, read through the program counter.
pub struct Imm16;

impl Operand for Imm8 {
	type Value = u8;

	#[inline(always)]
	fn get(cpu: &mut Cpu) -> u8 {
		BytePtr::<PC, 1>::get(cpu)
	}
}

impl Base for Imm8 {
	fn address(cpu: &mut Cpu) -> u16 {
		HIGH_PAGE | Imm8::get(cpu) as u16
	}
}

impl Operand for Imm16 {
	type Value = u16;

	#[inline(always)]
	fn get(cpu: &mut Cpu) -> u16 {
		WordPtr::<PC, 2>::get(cpu)
	}
}

impl Base for Imm16 {
	fn address(cpu: &mut Cpu) -> u16 {
		Imm16::get(cpu)
	}
}

/// A constant byte.
pub struct Const8<const V: u8>;

/// A constant word, such as a restart vector.
pub struct Const16<const V: u16>;

impl<const V: u8> Operand for Const8<V> {
	type Value = u8;

	#[inline(always)]
	fn get(_cpu: &mut Cpu) -> u8 {
		V
	}
}

impl<const V: u8> Base for Const8<V> {
	fn address(_cpu: &mut Cpu) -> u16 {
		HIGH_PAGE | V as u16
	}
}

impl<const V: u16> Operand for Const16<V> {
	type Value = u16;

	#[inline(always)]
	fn get(_cpu: &mut Cpu) -> u16 {
		V
	}
}

impl<const V: u16> Base for Const16<V> {
	fn address(_cpu: &mut Cpu) -> u16 {
		V
	}
}

/// Reads `T` as usual but discards writes (`CP` is a subtraction into `Ignore<A>`).
pub struct Ignore<T>(PhantomData<T>);

impl<T: Operand> Operand for Ignore<T> {
	type Value = T::Value;

	#[inline(always)]
	fn get(cpu: &mut Cpu) -> T::Value {
		T::get(cpu)
	}
}

impl<T: Operand> Writable for Ignore<T> {
	#[inline(always)]
	fn set(_cpu: &mut Cpu, _value: T::Value) {}
}

#[cfg(test)]
mod tests {
	use super::*;
	use super::cond::{self, ConditionCode, Z, NZ, N, NC, Always};
	use crate::config::Config;
	use proptest::prelude::*;

	fn cpu() -> Cpu {
		Cpu::new(Config::default())
	}

	#[test]
	fn test_byte_register() {
		let mut cpu = cpu();

		assert_eq!(0, cpu.get::<A>());

		cpu.set::<A>(0xDE);
		assert_eq!(0xDE, cpu.get::<A>());

		let value = cpu.get::<A>() + 1;
		cpu.set::<A>(value);
		assert_eq!(0xDF, cpu.get::<A>());

		cpu.set::<E>(0xAD);
		assert_eq!(0xAD, cpu.get::<E>());
		assert_eq!(0x00AD, cpu.get::<DE>());

		// Register accesses are free.
		assert_eq!(0, cpu.cycles());
	}

	#[test]
	fn test_word_register() {
		let mut cpu = cpu();

		cpu.set::<AF>(0xDEAD);
		assert_eq!(0xDEA0, cpu.get::<AF>());
		assert_eq!(0xDE, cpu.get::<A>());
		assert_eq!(0xA0, cpu.get::<F>());

		cpu.set::<DE>(0xBEEF);
		assert_eq!(0xBEEF, cpu.get::<DE>());
		assert_eq!(0xBE, cpu.get::<D>());
		assert_eq!(0xEF, cpu.get::<E>());

		let value = cpu.get::<DE>() + 1;
		cpu.set::<DE>(value);
		assert_eq!(0xBEF0, cpu.get::<DE>());
		assert_eq!(0xF0, cpu.get::<E>());
	}

	#[test]
	fn test_condition_codes() {
		let mut cpu = cpu();

		assert_eq!(false, cpu.get::<cond::C>());
		assert_eq!(true, cpu.get::<NC>());

		cpu.set::<cond::C>(true);
		assert_eq!(true, cpu.get::<cond::C>());
		assert_eq!(false, cpu.get::<NC>());
		assert_eq!(0x10, cpu.get::<F>());

		cpu.set::<Z>(true);
		assert_eq!(true, cpu.get::<Z>());
		assert_eq!(false, cpu.get::<NZ>());

		cpu.set::<cond::H>(true);
		cpu.set::<N>(true);
		assert_eq!(0xF0, cpu.get::<F>());

		cpu.set::<Z>(false);
		assert_eq!(0x70, cpu.get::<F>());

		assert!(cpu.get::<Always>());
		cpu.set::<F>(0);
		assert!(cpu.get::<Always>());
	}

	#[test]
	fn test_read_only_conditions() {
		let mut cpu = cpu();

		ConditionCode::NZ.assign(&mut cpu, true);
		ConditionCode::NC.assign(&mut cpu, true);
		ConditionCode::Always.assign(&mut cpu, true);
		assert_eq!(0, cpu.get::<F>());

		ConditionCode::H.assign(&mut cpu, true);
		assert!(ConditionCode::H.test(&cpu));
		assert_eq!(0x20, cpu.get::<F>());
	}

	#[test]
	fn test_byte_pointer() {
		let mut cpu = cpu();

		// 8-bit bases address the high page.
		cpu.set::<BytePtr<A>>(0xDE);
		assert_eq!(0xDE, cpu.read(0xFF00));
		let value = cpu.get::<BytePtr<A>>() + 1;
		cpu.set::<BytePtr<A>>(value);
		assert_eq!(0xDF, cpu.get::<BytePtr<A>>());

		assert_eq!(0, cpu.get::<BytePtr<HL>>());

		cpu.set::<HL>(0xFF00);
		assert_eq!(0xDF, cpu.get::<BytePtr<HL>>());

		cpu.set::<BytePtr<HL>>(0xBE);
		assert_eq!(0xBE, cpu.get::<BytePtr<HL>>());

		type Inc = BytePtr<HL, 1>;
		assert_eq!(0xBE, cpu.get::<Inc>());
		assert_eq!(0xFF01, cpu.get::<HL>());
		assert_eq!(0x00, cpu.get::<Inc>());
		assert_eq!(0xFF02, cpu.get::<HL>());

		type Dec = BytePtr<HL, -1>;
		assert_eq!(0x00, cpu.get::<Dec>());
		assert_eq!(0xFF01, cpu.get::<HL>());
		assert_eq!(0x00, cpu.get::<Dec>());
		assert_eq!(0xFF00, cpu.get::<HL>());
		assert_eq!(0xBE, cpu.get::<Dec>());
		assert_eq!(0xFEFF, cpu.get::<HL>());
	}

	#[test]
	fn test_word_pointer() {
		let mut cpu = cpu();

		cpu.set::<WordPtr<A>>(0xDEAD);
		assert_eq!(0xAD, cpu.read(0xFF00));
		assert_eq!(0xDE, cpu.read(0xFF01));
		assert_eq!(0xDEAD, cpu.get::<WordPtr<A>>());

		cpu.set::<HL>(0xFF00);
		cpu.set::<WordPtr<HL>>(0xBEF0);

		type Inc = WordPtr<HL, 1>;
		assert_eq!(0xBEF0, cpu.get::<Inc>());
		assert_eq!(0xFF01, cpu.get::<HL>());
		assert_eq!(0x00BE, cpu.get::<Inc>());
		assert_eq!(0xFF02, cpu.get::<HL>());

		type Dec = WordPtr<HL, -1>;
		assert_eq!(0x0000, cpu.get::<Dec>());
		assert_eq!(0xFF01, cpu.get::<HL>());
		assert_eq!(0x00BE, cpu.get::<Dec>());
		assert_eq!(0xFF00, cpu.get::<HL>());
		assert_eq!(0xBEF0, cpu.get::<Dec>());
	}

	#[test]
	fn test_pointer_offset_and_wrap() {
		let mut cpu = cpu();

		cpu.write(0xFFFF, 0x34);
		cpu.write(0x0000, 0x12);
		cpu.set::<SP>(0x0001);

		// Pre-decrement addressing, as used by the stack.
		assert_eq!(0x1234, cpu.get::<WordPtr<SP, 0, -2>>());
		assert_eq!(0x0001, cpu.get::<SP>());

		cpu.set::<WordPtr<SP, -2, -2>>(0xBEEF);
		assert_eq!(0xFFFF, cpu.get::<SP>());
		assert_eq!(0xEF, cpu.read(0xFFFF));
		assert_eq!(0xBE, cpu.read(0x0000));
	}

	#[test]
	fn test_pointer_cycles() {
		let mut cpu = cpu();

		cpu.get::<BytePtr<HL>>();
		assert_eq!(1, cpu.cycles());

		cpu.set::<BytePtr<HL, 1>>(0);
		assert_eq!(2, cpu.cycles());

		cpu.get::<WordPtr<BC>>();
		assert_eq!(4, cpu.cycles());

		cpu.set::<WordPtr<Const16<0xC000>>>(0xBEEF);
		assert_eq!(6, cpu.cycles());
		assert_eq!(0xBEEF, cpu.get::<WordPtr<Const16<0xC000>>>());
		assert_eq!(8, cpu.cycles());
	}

	#[test]
	fn test_byte_immediate() {
		let mut cpu = cpu();

		assert_eq!(0, cpu.get::<PC>());
		assert_eq!(0, cpu.get::<Imm8>());
		assert_eq!(1, cpu.get::<PC>());

		cpu.set::<HL>(1);
		cpu.set::<BytePtr<HL>>(0xDE);
		assert_eq!(0xDE, cpu.get::<Imm8>());
		assert_eq!(2, cpu.get::<PC>());

		// One cycle per immediate byte, plus the (HL) write.
		assert_eq!(3, cpu.cycles());
	}

	#[test]
	fn test_word_immediate() {
		let mut cpu = cpu();

		assert_eq!(0, cpu.get::<Imm16>());
		assert_eq!(2, cpu.get::<PC>());

		cpu.set::<HL>(2);
		cpu.set::<WordPtr<HL>>(0xDEAD);
		assert_eq!(0xDEAD, cpu.get::<Imm16>());
		assert_eq!(4, cpu.get::<PC>());
		assert_eq!(6, cpu.cycles());
	}

	#[test]
	fn test_immediate_bases() {
		let mut cpu = cpu();

		cpu.load(&[0x80, 0x00, 0xC0]);
		cpu.write(0xFF80, 0x42);
		cpu.write(0xC000, 0x24);

		// LDH-style (a8) and (a16) addressing.
		assert_eq!(0x42, cpu.get::<BytePtr<Imm8>>());
		assert_eq!(0x24, cpu.get::<BytePtr<Imm16>>());
		assert_eq!(3, cpu.get::<PC>());
		assert_eq!(5, cpu.cycles());
	}

	#[test]
	fn test_ignore() {
		let mut cpu = cpu();

		cpu.set::<A>(0x42);
		cpu.set::<Ignore<A>>(0x24);

		assert_eq!(0x42, cpu.get::<Ignore<A>>());
		assert_eq!(0x42, cpu.get::<A>());
		assert_eq!(7, cpu.get::<Const8<7>>());
	}

	proptest! {
		#[test]
		fn prop_byte_registers_round_trip(value in any::<u8>()) {
			let mut cpu = cpu();

			macro_rules! check {
				($($reg:ident),*) => {$(
					cpu.set::<$reg>(value);
					prop_assert_eq!(value, cpu.get::<$reg>());
				)*}
			}

			check!(A, B, C, D, E, H, L);

			cpu.set::<F>(value);
			prop_assert_eq!(value & 0xF0, cpu.get::<F>());
		}

		#[test]
		fn prop_af_masks_flags(value in any::<u16>()) {
			let mut cpu = cpu();

			cpu.set::<AF>(value);
			prop_assert_eq!(value & 0xFFF0, cpu.get::<AF>());
			prop_assert_eq!((value & 0xF0) as u8, cpu.get::<F>());
		}

		#[test]
		fn prop_word_pointer_steps(base in any::<u16>(), reads in 1usize..8) {
			let mut cpu = cpu();
			cpu.set::<BC>(base);

			for read in 1..=reads {
				cpu.get::<WordPtr<BC, -1>>();
				prop_assert_eq!(base.wrapping_sub(read as u16), cpu.get::<BC>());
			}

			prop_assert_eq!(2 * reads as u64, cpu.cycles());
		}
	}
}
