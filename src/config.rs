// Copyright 2021 Nir H. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
//! Emulator hardware emulation configuration and preferences.

/// The hardware specification for the different models differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HardwareModel {
	/// Original GameBoy
	GB,
	/// Gameboy Color
	GBC,
	/// GameBoy Pocket
	GBP,
	/// Super GameBoy
	SGB,
}

impl HardwareModel {
	/// The value the boot ROM leaves in the accumulator, which games use
	/// to detect the hardware they run on.
	pub fn boot_accumulator(&self) -> u8 {
		match self {
			HardwareModel::GB | HardwareModel::SGB => 0x01,
			HardwareModel::GBC => 0x11,
			HardwareModel::GBP => 0xFF,
		}
	}
}

/// Emulation settings and preferences goes here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
	/// The model of the emulated machine
	pub model: HardwareModel,
	/// Start with the registers the boot ROM leaves behind instead of zeros.
	pub post_boot: bool,
}

impl Config {
	/// A configuration whose resets emulate a completed boot sequence.
	pub fn post_boot(model: HardwareModel) -> Self {
		Config {
			model,
			post_boot: true,
		}
	}
}

impl Default for Config {
	fn default() -> Self {
		Config {
			model: HardwareModel::GB,
			post_boot: false,
		}
	}
}
