// Copyright 2021 Nir H. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
//! Emulate the gameboy's flat address space.
//!
//! The cpu core sees a single 64KB array. Bank switching, memory-mapped
//! peripherals and the like belong to the host that owns the cpu.

#[cfg(feature = "std")]
use crate::GameboyError;

/// Bus locations-related constants.
pub mod consts {
	/// The size of the address space.
	pub const MEMORY_SIZE: usize = 0x10000;

	/// Base of the page addressed by 8-bit pointers (`LDH`, `LD (C), A`).
	pub const HIGH_PAGE: u16 = 0xFF00;
}

use consts::*;

/// A virtual representation of the Gameboy memory bus.
///
/// Addresses are 16 bits wide, so every access wraps around the 64KB space
/// and no access can fall out of range.
#[derive(Clone)]
pub struct SystemBus {
	memory: [u8; MEMORY_SIZE],
}

impl SystemBus {
	/// Initialize a new, zero-filled address space.
	pub fn new() -> Self {
		SystemBus {
			memory: [0; MEMORY_SIZE],
		}
	}

	/// Read a byte.
	#[inline(always)]
	pub fn get(&self, address: u16) -> u8 {
		self.memory[address as usize]
	}

	/// Write a byte.
	#[inline(always)]
	pub fn set(&mut self, address: u16, value: u8) {
		self.memory[address as usize] = value;
	}

	/// Replaces the whole address space with the given image.
	///
	/// The image is copied starting from address 0. Shorter images are
	/// zero-padded and bytes beyond the address space are dropped.
	pub fn load(&mut self, image: &[u8]) {
		let length = image.len().min(MEMORY_SIZE);

		self.memory.fill(0);
		self.memory[..length].copy_from_slice(&image[..length]);

		tracing::debug!(length, dropped = image.len() - length, "loaded image");
	}

	/// Replaces the whole address space with an image read from a stream.
	///
	/// Reads until the stream ends or the address space is full, and
	/// returns the number of bytes loaded.
	#[cfg(feature = "std")]
	pub fn load_reader<R: std::io::Read>(&mut self, reader: &mut R) -> Result<usize, GameboyError> {
		let mut length: usize = 0;

		self.memory.fill(0);

		while length < MEMORY_SIZE {
			match reader.read(&mut self.memory[length..]) {
				Ok(0) => break,
				Ok(count) => length += count,
				Err(ref err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
				Err(_) => return Err(GameboyError::Io("failed to read the image")),
			}
		}

		tracing::debug!(length, "loaded image from stream");

		Ok(length)
	}

	/// Writes the complete array's bytes starting at the given address,
	/// wrapping around the end of the address space.
	pub fn write_all(&mut self, address: u16, array: &[u8]) {
		for (index, value) in array.iter().enumerate() {
			self.set(address.wrapping_add(index as u16), *value);
		}
	}

	/// Returns whether memory starting at `address` holds exactly `bytes`.
	pub fn matches(&self, address: u16, bytes: &[u8]) -> bool {
		bytes.iter()
			.enumerate()
			.all(|(index, value)| self.get(address.wrapping_add(index as u16)) == *value)
	}
}

impl Default for SystemBus {
	fn default() -> Self {
		SystemBus::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_get_set() {
		let mut bus = SystemBus::new();

		assert_eq!(0, bus.get(0xC000));

		bus.set(0xC000, 0xDE);
		bus.set(0xFFFF, 0xAD);

		assert_eq!(0xDE, bus.get(0xC000));
		assert_eq!(0xAD, bus.get(0xFFFF));
	}

	#[test]
	fn test_load_pads_with_zeros() {
		let mut bus = SystemBus::new();
		bus.set(0x0003, 0xFF);
		bus.set(0x8000, 0xFF);

		bus.load(&[1, 2, 3]);

		assert_eq!(1, bus.get(0));
		assert_eq!(3, bus.get(2));
		assert_eq!(0, bus.get(3));
		assert_eq!(0, bus.get(0x8000));
	}

	#[test]
	fn test_load_drops_oversized_images() {
		let mut bus = SystemBus::new();
		let mut image = vec![0xAA; MEMORY_SIZE + 16];
		image[MEMORY_SIZE - 1] = 0x55;

		bus.load(&image);

		assert_eq!(0xAA, bus.get(0));
		assert_eq!(0x55, bus.get(0xFFFF));
	}

	#[test]
	fn test_write_all_wraps() {
		let mut bus = SystemBus::new();

		bus.write_all(0xFFFE, &[1, 2, 3]);

		assert_eq!(1, bus.get(0xFFFE));
		assert_eq!(2, bus.get(0xFFFF));
		assert_eq!(3, bus.get(0x0000));
		assert!(bus.matches(0xFFFE, &[1, 2, 3]));
		assert!(!bus.matches(0xFFFE, &[1, 2, 4]));
	}

	#[test]
	#[cfg(feature = "std")]
	fn test_load_reader() -> Result<(), GameboyError> {
		let mut bus = SystemBus::new();
		bus.set(0x10, 0xFF);

		let mut stream = std::io::Cursor::new(vec![0x3E, 0x42, 0x10, 0x00]);
		let length = bus.load_reader(&mut stream)?;

		assert_eq!(4, length);
		assert_eq!(0x42, bus.get(1));
		assert_eq!(0, bus.get(0x10));

		Ok(())
	}
}
