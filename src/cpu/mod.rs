// Copyright 2021 Nir H. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
//! Gameboy's processor emulation.

pub mod state;
pub mod operands;
pub mod alu;
pub mod instructions;
pub mod decode;

use state::*;
use state::registers::*;
use operands::{Operand, Writable, Imm8};

use crate::bus::*;
use crate::config::Config;
#[cfg(feature = "std")]
use crate::GameboyError;

/// Why the interpreter returned.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Exit {
	/// A `STOP` instruction was executed.
	Stopped,
	/// A `HALT` instruction was executed; the cpu waits for an interrupt.
	Halted,
	/// The cycle budget given to [`Cpu::run_for`] was spent.
	OutOfCycles,
}

/// The gameboy's processor.
///
/// This struct contains the complete emulator's state: the register file,
/// the address space and the cycle counter.
#[derive(Clone)]
pub struct Cpu {
	/// The cpu's registers.
	pub(crate) registers: CpuState,
	/// The address space.
	pub(crate) mmap: SystemBus,
	/// The emulator's configuration
	config: Config,
}

impl Cpu {
	/// Initializes a new virtual cpu with a zero-filled address space.
	pub fn new(config: Config) -> Self {
		Cpu {
			registers: CpuState::new(&config),
			mmap: SystemBus::new(),
			config,
		}
	}

	/// The configuration the cpu was created with.
	pub fn config(&self) -> &Config {
		&self.config
	}

	/// Emulates the execution of a single instruction.
	///
	/// A prefixed (0xCB) instruction is executed as a whole. Returns the
	/// number of machine cycles the instruction has taken.
	pub fn step(&mut self) -> usize {
		let start = self.registers.cycles();

		// Fetch the opcode from the memory.
		let opcode = Imm8::get(self);

		// Decode and execute.
		(decode::decode(opcode).execute)(self);

		(self.registers.cycles() - start) as usize
	}

	/// Executes instructions until the cpu stops or halts.
	pub fn run(&mut self) -> Exit {
		loop {
			if let Some(exit) = self.exit() {
				return exit;
			}

			self.step();
		}
	}

	/// Executes instructions until the cpu stops or halts, or until at least
	/// `cycles` machine cycles have elapsed.
	///
	/// Instructions are never interrupted, so the budget may be exceeded by
	/// the last instruction's length.
	pub fn run_for(&mut self, cycles: u64) -> Exit {
		let deadline = self.registers.cycles().saturating_add(cycles);

		loop {
			if let Some(exit) = self.exit() {
				return exit;
			}

			if self.registers.cycles() >= deadline {
				tracing::trace!(cycles = self.registers.cycles(), "cycle budget spent");
				return Exit::OutOfCycles;
			}

			self.step();
		}
	}

	/// The reason for the interpreter to return, if any.
	pub(crate) fn exit(&self) -> Option<Exit> {
		if self.registers.is_stopped() {
			Some(Exit::Stopped)
		} else if self.registers.is_halted() {
			Some(Exit::Halted)
		} else {
			None
		}
	}

	/// Leaves the stopped or halted state, as an interrupt would.
	pub fn resume(&mut self) {
		self.registers.resume();
	}

	/// Resets the registers and the cycle counter. Memory is left intact.
	pub fn reset(&mut self) {
		self.registers.reset(&self.config);
	}

	/// Reads an operand, with the same side effects an instruction has.
	pub fn get<T: Operand>(&mut self) -> T::Value {
		T::get(self)
	}

	/// Writes an operand, with the same side effects an instruction has.
	pub fn set<T: Writable>(&mut self, value: T::Value) {
		T::set(self, value)
	}

	/// Reads a register.
	pub fn register(&self, reg: Register) -> u16 {
		self.registers.get(reg)
	}

	/// Writes a register. Writes to F (or AF) clear F's low nibble.
	pub fn set_register(&mut self, reg: Register, value: u16) {
		self.registers.set(reg, value)
	}

	/// Returns the state of the given cpu flag.
	pub fn flag(&self, flag: Flag) -> bool {
		self.registers.flag(flag)
	}

	/// Reads a byte from memory, without spending cycles.
	pub fn read(&self, address: u16) -> u8 {
		self.mmap.get(address)
	}

	/// Writes a byte to memory, without spending cycles.
	pub fn write(&mut self, address: u16, value: u8) {
		self.mmap.set(address, value)
	}

	/// Writes the given bytes starting from `address`, without spending cycles.
	pub fn write_all(&mut self, address: u16, bytes: &[u8]) {
		self.mmap.write_all(address, bytes)
	}

	/// Replaces the address space with the given image (see [`SystemBus::load`]).
	pub fn load(&mut self, image: &[u8]) {
		self.mmap.load(image)
	}

	/// Replaces the address space with an image read from a stream.
	#[cfg(feature = "std")]
	pub fn load_reader<R: std::io::Read>(&mut self, reader: &mut R) -> Result<usize, GameboyError> {
		self.mmap.load_reader(reader)
	}

	/// The number of machine cycles elapsed since the last reset.
	pub fn cycles(&self) -> u64 {
		self.registers.cycles()
	}

	/// Whether a STOP instruction has been executed.
	pub fn is_stopped(&self) -> bool {
		self.registers.is_stopped()
	}

	/// Whether a HALT instruction has been executed.
	pub fn is_halted(&self) -> bool {
		self.registers.is_halted()
	}

	/// The interrupt master enable flag.
	pub fn interrupts_enabled(&self) -> bool {
		self.registers.interrupts_enabled()
	}

	/// Clears the interrupt master enable flag, as `DI` does.
	pub fn disable_interrupts(&mut self) {
		self.registers.disable_interrupts()
	}

	/// Sets the interrupt master enable flag, as `EI` does.
	pub fn enable_interrupts(&mut self) {
		self.registers.enable_interrupts()
	}
}
