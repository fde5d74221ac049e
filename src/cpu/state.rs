// Copyright 2021 Nir H. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Gameboy's processor state.

use crate::config::Config;
use registers::*;

#[allow(missing_docs)]
pub mod registers {
	/// The size of the register file
	pub const NUM_REGS: usize = 6;

	/// We have 6 registers and they're 16-bit wide.
	pub type RegisterFile = [u16; NUM_REGS];

	/// Runtime descriptor of every addressable register, as used by debuggers
	/// and front-ends.
	#[derive(Debug, PartialEq, Eq, Clone, Copy)]
	pub enum Register {
		/// Accumulator and Flag registers
		A, F, AF,
		B, C, BC,
		D, E, DE,
		/// Indirect access register
		H, L, HL,
		/// Stack pointer
		SP,
		/// Program counter
		PC,
	}

	/// The register's "type" is essentially the internal representation
	/// of the virtual register's bitmask within the register file.
	#[derive(Debug, PartialEq)]
	pub enum RegisterType {
		Wide,
		Low8,
		High8,
	}

	pub fn get_type(reg: &Register) -> RegisterType {
		match reg {
			Register::A |
			Register::B |
			Register::D |
			Register::H => RegisterType::High8,

			Register::F |
			Register::C |
			Register::E |
			Register::L => RegisterType::Low8,

			Register::AF |
			Register::BC |
			Register::DE |
			Register::HL |
			Register::SP |
			Register::PC => RegisterType::Wide,
		}
	}

	/// Get the index of a given register within the register file
	pub fn get_index(reg: &Register) -> usize {
		match reg {
			Register::A | Register::F | Register::AF => 0,
			Register::B | Register::C | Register::BC => 1,
			Register::D | Register::E | Register::DE => 2,
			Register::H | Register::L | Register::HL => 3,
			Register::SP => 4,
			Register::PC => 5,
		}
	}

	/// The flag register encodes the following flags within
	/// the register's bits.
	#[derive(Debug, PartialEq, Eq, Clone, Copy)]
	pub enum Flag {
		/// Carry flag
		C = 4,
		/// Half-Carry flag
		H = 5,
		/// Subtract flag
		N = 6,
		/// Zero flag
		Z = 7,
	}

	/// The low nibble of F doesn't exist in hardware and always reads as zero.
	pub const FLAGS_MASK: u16 = 0xF0;
}

/// Structure holding the current processor state.
#[derive(Debug, Clone)]
pub struct CpuState {
	regs: RegisterFile,
	/// Elapsed machine cycles.
	clock: u64,
	stopped: bool,
	halted: bool,
	interrupts: bool,
}

impl CpuState {
	/// Initializes a new cpu state
	pub fn new(config: &Config) -> Self {
		let mut state = CpuState {
			regs: [0; NUM_REGS],
			clock: 0,
			stopped: false,
			halted: false,
			interrupts: true,
		};

		// Reset the registers.
		state.reset(config);

		state
	}

	/// Reset registers to their initial state.
	///
	/// Registers are zeroed unless the configuration asks for the values
	/// the boot ROM leaves behind.
	pub fn reset(&mut self, config: &Config) {
		self.regs = [0; NUM_REGS];
		self.clock = 0;
		self.stopped = false;
		self.halted = false;
		self.interrupts = true;

		if config.post_boot {
			self.set(Register::F, 0xB0);
			self.set(Register::BC, 0x0013);
			self.set(Register::DE, 0x00D8);
			self.set(Register::HL, 0x014D);
			self.set(Register::SP, 0xFFFE);
			self.set(Register::PC, 0x0100);
			self.set(Register::A, config.model.boot_accumulator() as u16);
		}
	}

	/// Writes a value to a given register.
	///
	/// * `reg` - The register file identifier to write into.
	/// * `value` - The value to write. In cases of 8-bit register,
	///     the higher 8 bits will be discarded. Writes to F (or AF)
	///     always clear F's low nibble.
	pub fn set(&mut self, reg: Register, value: u16) {
		let value = match reg {
			Register::F => value & FLAGS_MASK,
			Register::AF => value & (0xFF00 | FLAGS_MASK),
			_ => value,
		};

		let reg_type: RegisterType = get_type(&reg);
		let reg: &mut u16 = &mut self.regs[get_index(&reg)];

		match reg_type {
			RegisterType::Wide => *reg = value,
			RegisterType::Low8 => *reg = (*reg & 0xFF00) | (value & 0x00FF),
			RegisterType::High8 => *reg = (*reg & 0x00FF) | ((value << 8) & 0xFF00),
		}
	}

	/// Reads the given register.
	pub fn get(&self, reg: Register) -> u16 {
		let reg_value: u16 = self.regs[get_index(&reg)];
		let reg_type: RegisterType = get_type(&reg);

		match reg_type {
			RegisterType::Wide => reg_value,
			RegisterType::Low8 => reg_value & 0x00FF,
			RegisterType::High8 => (reg_value >> 8) & 0x00FF,
		}
	}

	/// Returns the state of the given cpu flag, as stored in
	/// the 'F' register.
	pub fn flag(&self, flag: Flag) -> bool {
		let flags_value: u16 = self.get(Register::F);

		// Check whether the relevant bit is on
		((flags_value >> flag as u8) & 1) == 1
	}

	/// Sets the state of the given cpu flag.
	pub fn set_flag(&mut self, flag: Flag, value: bool) {
		let old_flags: u16 = self.get(Register::F);

		let new_flags = if value {
			// Turn on the relevant bit
			old_flags | (1 << (flag as u8))
		} else {
			// Turn off the relevant bit
			old_flags & !(1 << (flag as u8))
		};

		self.set(Register::F, new_flags);
	}

	/// Advances the cycle counter by a single machine cycle.
	#[inline(always)]
	pub fn tick(&mut self) {
		self.clock += 1;
	}

	/// The number of machine cycles elapsed since the last reset.
	pub fn cycles(&self) -> u64 {
		self.clock
	}

	/// Stops the cpu; the interpreter won't fetch any further instruction.
	pub fn stop(&mut self) {
		self.stopped = true;
	}

	/// Whether a STOP instruction has been executed.
	pub fn is_stopped(&self) -> bool {
		self.stopped
	}

	/// Halts the cpu until an (externally delivered) interrupt.
	pub fn halt(&mut self) {
		self.halted = true;
	}

	/// Whether a HALT instruction has been executed.
	pub fn is_halted(&self) -> bool {
		self.halted
	}

	/// Clears both the stopped and halted states.
	pub fn resume(&mut self) {
		self.stopped = false;
		self.halted = false;
	}

	/// Sets the interrupt master enable flag.
	pub fn enable_interrupts(&mut self) {
		self.interrupts = true;
	}

	/// Clears the interrupt master enable flag.
	pub fn disable_interrupts(&mut self) {
		self.interrupts = false;
	}

	/// The interrupt master enable flag, consulted by interrupt delivery.
	pub fn interrupts_enabled(&self) -> bool {
		self.interrupts
	}
}
