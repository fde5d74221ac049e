// Copyright 2021 Nir H. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
#![cfg_attr(not(feature = "std"), no_std)]
//! This library provides emulation of the gameboy's Z80-like CPU (the Sharp LR35902),
//! as described in the publicly available "Game Boy CPU Manual".
//!
//! The core executes machine code against a flat 64KB address space and keeps a
//! machine-cycle counter that advances with every memory access. Blocks of code can
//! optionally be compiled into chained native calls (see [`jit`]) which behave exactly
//! like the interpreter.
//!
//! ```
//! use lr35902_core::config::Config;
//! use lr35902_core::cpu::{Cpu, Exit};
//! use lr35902_core::cpu::state::registers::Register;
//!
//! // LD A, B; STOP
//! let mut cpu = Cpu::new(Config::default());
//! cpu.load(&[0x78, 0x10, 0x00]);
//! cpu.set_register(Register::B, 0x42);
//!
//! assert_eq!(Exit::Stopped, cpu.run());
//! assert_eq!(0x42, cpu.register(Register::A));
//! ```

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(all(test, not(feature = "std")))]
#[macro_use]
extern crate std;

pub mod bus;
pub mod cpu;
pub mod config;
#[cfg(feature = "alloc")]
pub mod jit;

/// Errors reported by the library.
///
/// Executing instructions never fails; only loading images from a stream and
/// compiling blocks of code can.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GameboyError {
	/// Reading an image from a stream has failed.
	#[error("io error: {0}")]
	Io(&'static str),
	/// A block compilation was requested for an empty byte run.
	#[error("empty block at {address:#06x}")]
	EmptyBlock {
		/// The block's start address.
		address: u16,
	},
	/// The byte run ends in the middle of an instruction.
	#[error("block ends inside the instruction at {address:#06x}")]
	TruncatedBlock {
		/// Address of the incomplete instruction.
		address: u16,
	},
	/// Bytes follow the instruction that terminates the basic block.
	#[error("trailing bytes after the block terminator at {address:#06x}")]
	TrailingBytes {
		/// Address of the first byte past the terminator.
		address: u16,
	},
}
