//! One disassembler session per input binary.

use crate::config::DatasetConfig;
use crate::core::disassembler::Disassembler;
use crate::error::Result;
use crate::formats::elf::relocations::{self, RelocationStats};
use crate::formats::elf::{self, MemoryImage, MemorySection, MemoryView};
use tracing::{debug, trace};

/// Text recorded when the bytes at an address do not decode.
pub const INVALID_INSTRUCTION: &str = "invalid";

/// A decoder bound to the relocated memory image of one binary.
pub struct DisasmSession<D: Disassembler = super::capstone::CapstoneDisassembler> {
    disassembler: D,
    image: MemoryImage,
    relocations: RelocationStats,
}

impl DisasmSession {
    /// Open a session over a parsed ELF file: select the decode target, map
    /// `sections`, and apply relocations when configured.
    pub fn open(
        file: &object::File<'_>,
        sections: &[MemorySection],
        config: &DatasetConfig,
    ) -> Result<Self> {
        let target = elf::target_of(file)?;
        let mut image =
            MemoryImage::build(file, sections, target.endianness, config.io.max_image_size)?;
        let stats = if config.apply_relocations {
            relocations::apply_relocations(file, &mut image)?
        } else {
            RelocationStats::default()
        };
        let disassembler = super::for_arch(target.architecture, target.endianness)?;
        debug!(
            backend = disassembler.name(),
            arch = %disassembler.architecture(),
            endian = %disassembler.endianness(),
            "Opened disassembler session"
        );
        let mut session = Self::with_disassembler(disassembler, image);
        session.relocations = stats;
        Ok(session)
    }
}

impl<D: Disassembler> DisasmSession<D> {
    pub fn with_disassembler(disassembler: D, image: MemoryImage) -> Self {
        Self {
            disassembler,
            image,
            relocations: RelocationStats::default(),
        }
    }

    /// Relocations applied to the image when the session was opened.
    pub fn relocation_stats(&self) -> RelocationStats {
        self.relocations
    }

    /// Raw word at `addr`, in file byte order.
    pub fn read_word(&self, addr: u64) -> [u8; 4] {
        self.image.read_word(addr)
    }

    /// Decoded instruction text at `addr`, or `None` when it does not decode.
    pub fn instruction_at(&self, addr: u64) -> Option<String> {
        let len = self.disassembler.max_instruction_length();
        let bytes = self.image.read_bytes(addr, len);
        match self.disassembler.disassemble_instruction(addr, &bytes) {
            Ok(insn) => Some(insn.text()),
            Err(e) => {
                trace!(addr = format_args!("{:#x}", addr), error = %e, "Decode failed");
                None
            }
        }
    }

    /// Like `instruction_at`, substituting `"invalid"` for failures.
    pub fn instruction_text(&self, addr: u64) -> String {
        self.instruction_at(addr)
            .unwrap_or_else(|| INVALID_INSTRUCTION.to_string())
    }
}
