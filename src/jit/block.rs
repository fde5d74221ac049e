// Copyright 2021 Nir H. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Basic blocks: straight runs of instructions ending at a control transfer.

use alloc::vec::Vec;

use crate::cpu::Cpu;
use crate::cpu::decode::{self, Opcode};
use crate::GameboyError;

/// The longest block [`Block::discover`] produces.
pub const MAX_BLOCK_INSTRUCTIONS: usize = 64;

/// The prefix selecting the extended opcode table.
const PREFIX: u8 = 0xCB;

/// A decoded instruction of a block.
#[derive(Debug, Clone, Copy)]
pub struct Decoded {
	/// The instruction's address.
	pub address: u16,
	/// The table entry (from the extended table, for prefixed instructions).
	pub opcode: &'static Opcode,
	/// Whether the instruction is encoded with the 0xCB prefix.
	pub prefixed: bool,
}

/// A validated basic block.
#[derive(Debug, Clone)]
pub struct Block {
	start: u16,
	bytes: Vec<u8>,
	instructions: Vec<Decoded>,
}

impl Block {
	/// Decodes the given bytes as a basic block located at `start`.
	///
	/// The bytes must hold complete instructions, and nothing may follow
	/// the first instruction that ends the block.
	pub fn decode(start: u16, bytes: &[u8]) -> Result<Block, GameboyError> {
		if bytes.is_empty() {
			return Err(GameboyError::EmptyBlock { address: start });
		}

		let mut instructions: Vec<Decoded> = Vec::new();
		let mut offset: usize = 0;

		while offset < bytes.len() {
			let address = start.wrapping_add(offset as u16);

			let (opcode, prefixed) = match bytes[offset] {
				PREFIX => match bytes.get(offset + 1) {
					Some(next) => (decode::decode_cb(*next), true),
					None => return Err(GameboyError::TruncatedBlock { address }),
				},
				byte => (decode::decode(byte), false),
			};

			offset += opcode.length as usize;

			if offset > bytes.len() {
				return Err(GameboyError::TruncatedBlock { address });
			}

			instructions.push(Decoded { address, opcode, prefixed });

			if opcode.ends_block() {
				if offset < bytes.len() {
					return Err(GameboyError::TrailingBytes {
						address: start.wrapping_add(offset as u16),
					});
				}

				break;
			}
		}

		Ok(Block {
			start,
			bytes: bytes.to_vec(),
			instructions,
		})
	}

	/// Reads the block starting at `start` out of the cpu's memory.
	///
	/// The block ends at the first control transfer, or after
	/// [`MAX_BLOCK_INSTRUCTIONS`] instructions. Reading doesn't spend cycles.
	pub fn discover(cpu: &Cpu, start: u16) -> Result<Block, GameboyError> {
		let mut bytes: Vec<u8> = Vec::new();
		let mut address = start;

		for _ in 0..MAX_BLOCK_INSTRUCTIONS {
			let opcode = match cpu.read(address) {
				PREFIX => decode::decode_cb(cpu.read(address.wrapping_add(1))),
				byte => decode::decode(byte),
			};

			for index in 0..opcode.length as u16 {
				bytes.push(cpu.read(address.wrapping_add(index)));
			}

			address = address.wrapping_add(opcode.length as u16);

			if opcode.ends_block() {
				break;
			}
		}

		Block::decode(start, &bytes)
	}

	/// The block's address.
	pub fn start(&self) -> u16 {
		self.start
	}

	/// The block's machine code.
	pub fn bytes(&self) -> &[u8] {
		&self.bytes
	}

	/// The block's instructions, in execution order.
	pub fn instructions(&self) -> &[Decoded] {
		&self.instructions
	}

	/// Whether the byte at `address` belongs to the block.
	pub fn contains(&self, address: u16) -> bool {
		(address.wrapping_sub(self.start) as usize) < self.bytes.len()
	}

	/// Machine cycles the block takes when every condition holds.
	pub fn cycles(&self) -> usize {
		self.instructions.iter()
			.map(|insn| insn.opcode.cycles as usize)
			.sum()
	}
}
