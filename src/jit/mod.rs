// Copyright 2021 Nir H. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
//! Block compiler.
//!
//! Basic blocks are compiled into a single callable [`Entry`] that performs
//! the same accesses, in the same order and with the same cycle and flag
//! effects, as interpreting the block would. Compiled blocks are cached by
//! their start address.
//!
//! Cached blocks keep their source bytes. [`Jit::run`] checks them against
//! memory before entering a block and recompiles it when the code changed.
//! Hosts that call entries directly are responsible for calling
//! [`Jit::invalidate`] (or [`Jit::invalidate_range`]) after writing code.
//! A block overwriting its own instructions while it executes keeps running
//! the instructions it was compiled from.

pub mod block;

use alloc::collections::BTreeMap;
use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::cpu::{Cpu, Exit};
use crate::cpu::instructions::Instruction;
use crate::cpu::operands::{Operand, Imm8, PC};
use crate::GameboyError;

pub use block::{Block, Decoded, MAX_BLOCK_INSTRUCTIONS};

/// A compiled block's entry point.
///
/// Must be called with the program counter at the block's start address.
pub type Entry = Arc<dyn Fn(&mut Cpu) + Send + Sync>;

/// A code generator turning basic blocks into entry points.
pub trait Backend {
	/// Compiles the given block.
	fn compile(&self, block: &Block) -> Entry;
}

/// Compiles blocks into a chain of calls to the opcode tables' handlers.
///
/// Decoding happens once, at compile time; the compiled block still fetches
/// every instruction byte so the program counter and the cycle counter move
/// exactly like they do in the interpreter.
#[derive(Debug, Default, Clone, Copy)]
pub struct Threaded;

#[derive(Clone, Copy)]
struct Step {
	execute: Instruction,
	prefixed: bool,
}

impl Backend for Threaded {
	fn compile(&self, block: &Block) -> Entry {
		let steps: Vec<Step> = block.instructions()
			.iter()
			.map(|insn| Step { execute: insn.opcode.execute, prefixed: insn.prefixed })
			.collect();

		Arc::new(move |cpu: &mut Cpu| {
			for step in steps.iter() {
				Imm8::get(cpu);

				if step.prefixed {
					Imm8::get(cpu);
				}

				(step.execute)(cpu);
			}
		})
	}
}

/// A block together with its compiled code.
#[derive(Clone)]
pub struct CompiledBlock {
	block: Block,
	entry: Entry,
}

impl CompiledBlock {
	/// The source block.
	pub fn block(&self) -> &Block {
		&self.block
	}

	/// The compiled code.
	pub fn entry(&self) -> Entry {
		self.entry.clone()
	}
}

/// The block compiler and its code cache.
pub struct Jit<B: Backend = Threaded> {
	backend: B,
	cache: BTreeMap<u16, CompiledBlock>,
}

impl Jit<Threaded> {
	/// A compiler using the [`Threaded`] backend.
	pub fn new() -> Self {
		Jit::with_backend(Threaded)
	}
}

impl Default for Jit<Threaded> {
	fn default() -> Self {
		Jit::new()
	}
}

impl<B: Backend> Jit<B> {
	/// A compiler using the given backend.
	pub fn with_backend(backend: B) -> Self {
		Jit {
			backend,
			cache: BTreeMap::new(),
		}
	}

	/// Compiles the basic block made of `bytes`, located at `start`.
	///
	/// The result is cached; compiling the same bytes at the same address
	/// again returns the cached entry.
	pub fn compile(&mut self, start: u16, bytes: &[u8]) -> Result<Entry, GameboyError> {
		if let Some(compiled) = self.cache.get(&start) {
			if compiled.block.bytes() == bytes {
				return Ok(compiled.entry());
			}
		}

		let block = Block::decode(start, bytes)?;
		Ok(self.insert(block))
	}

	/// The cached entry for the block at `start`.
	pub fn get(&self, start: u16) -> Option<Entry> {
		self.cache.get(&start).map(CompiledBlock::entry)
	}

	/// The cached block at `start`.
	pub fn block(&self, start: u16) -> Option<&CompiledBlock> {
		self.cache.get(&start)
	}

	/// Drops the block at `start`. Returns whether it was cached.
	pub fn invalidate(&mut self, start: u16) -> bool {
		let removed = self.cache.remove(&start).is_some();

		if removed {
			tracing::trace!(start, "invalidated block");
		}

		removed
	}

	/// Drops every block containing code in `first..=last`.
	///
	/// Returns the number of blocks dropped.
	pub fn invalidate_range(&mut self, first: u16, last: u16) -> usize {
		let before = self.cache.len();
		let span = last.wrapping_sub(first) as usize;

		self.cache.retain(|_, compiled| {
			let block = &compiled.block;

			// The block starts inside the range, or the range starts inside the block.
			(block.start().wrapping_sub(first) as usize) > span && !block.contains(first)
		});

		let dropped = before - self.cache.len();
		tracing::trace!(first, last, dropped, "invalidated range");

		dropped
	}

	/// Drops every cached block.
	pub fn clear(&mut self) {
		self.cache.clear();
	}

	/// The number of cached blocks.
	pub fn len(&self) -> usize {
		self.cache.len()
	}

	/// Whether the cache is empty.
	pub fn is_empty(&self) -> bool {
		self.cache.is_empty()
	}

	/// Executes compiled blocks until the cpu stops or halts.
	pub fn run(&mut self, cpu: &mut Cpu) -> Result<Exit, GameboyError> {
		loop {
			if let Some(exit) = cpu.exit() {
				tracing::trace!(?exit, cycles = cpu.cycles(), "leaving compiled code");
				return Ok(exit);
			}

			let entry = self.lookup(cpu)?;
			entry(cpu);
		}
	}

	/// Executes compiled blocks until the cpu stops or halts, or until at
	/// least `cycles` machine cycles have elapsed.
	///
	/// Blocks run to completion, so the budget may be exceeded by up to a block.
	pub fn run_for(&mut self, cpu: &mut Cpu, cycles: u64) -> Result<Exit, GameboyError> {
		let deadline = cpu.cycles().saturating_add(cycles);

		loop {
			if let Some(exit) = cpu.exit() {
				return Ok(exit);
			}

			if cpu.cycles() >= deadline {
				return Ok(Exit::OutOfCycles);
			}

			let entry = self.lookup(cpu)?;
			entry(cpu);
		}
	}

	/// The entry of the block at the program counter, compiling it if it
	/// isn't cached or if its code has changed.
	fn lookup(&mut self, cpu: &mut Cpu) -> Result<Entry, GameboyError> {
		let pc = PC::get(cpu);

		if let Some(compiled) = self.cache.get(&pc) {
			if cpu.mmap.matches(pc, compiled.block.bytes()) {
				return Ok(compiled.entry());
			}

			tracing::trace!(start = pc, "block code changed, recompiling");
		}

		let block = Block::discover(cpu, pc)?;
		Ok(self.insert(block))
	}

	fn insert(&mut self, block: Block) -> Entry {
		let entry = self.backend.compile(&block);

		tracing::debug!(
			start = block.start(),
			instructions = block.instructions().len(),
			length = block.bytes().len(),
			"compiled block"
		);

		self.cache.insert(block.start(), CompiledBlock {
			block,
			entry: entry.clone(),
		});

		entry
	}
}
