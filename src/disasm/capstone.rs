use crate::core::binary::Endianness;
use crate::core::disassembler::{
    Architecture, Disassembler, DisassemblerError, DisassemblerResult,
};
use crate::core::instruction::Instruction;
use capstone::{Arch, Capstone, Endian, Mode, NO_EXTRA_MODE};

/// Capstone-backed MIPS decoder.
///
/// Detail mode stays off: the dataset only needs mnemonic and operand text.
pub struct CapstoneDisassembler {
    cs: Capstone,
    arch: Architecture,
    endianness: Endianness,
}

fn cs_arch_mode(arch: Architecture, end: Endianness) -> (Arch, Mode, Option<Endian>) {
    let endian = Some(if matches!(end, Endianness::Big) {
        Endian::Big
    } else {
        Endian::Little
    });
    match arch {
        Architecture::MIPS => (Arch::MIPS, Mode::Mips32, endian),
        Architecture::MIPS64 => (Arch::MIPS, Mode::Mips64, endian),
        Architecture::MIPS32R6 => (Arch::MIPS, Mode::Mips32R6, endian),
    }
}

impl CapstoneDisassembler {
    pub fn new(arch: Architecture, endianness: Endianness) -> DisassemblerResult<Self> {
        let (a, m, endian) = cs_arch_mode(arch, endianness);
        let cs = Capstone::new_raw(a, m, NO_EXTRA_MODE, endian)
            .map_err(|e| DisassemblerError::InternalError(e.to_string()))?;
        Ok(Self {
            cs,
            arch,
            endianness,
        })
    }
}

impl Disassembler for CapstoneDisassembler {
    fn disassemble_instruction(
        &self,
        address: u64,
        bytes: &[u8],
    ) -> DisassemblerResult<Instruction> {
        if bytes.len() < self.max_instruction_length() {
            return Err(DisassemblerError::InsufficientBytes());
        }
        let insns = self
            .cs
            .disasm_count(bytes, address, 1)
            .map_err(|_| DisassemblerError::InvalidInstruction())?;
        let insn = insns
            .iter()
            .next()
            .ok_or(DisassemblerError::InvalidInstruction())?;
        Ok(Instruction {
            mnemonic: insn.mnemonic().unwrap_or("").to_string(),
            op_str: insn.op_str().unwrap_or("").to_string(),
        })
    }

    fn max_instruction_length(&self) -> usize {
        4
    }
    fn architecture(&self) -> Architecture {
        self.arch
    }
    fn endianness(&self) -> Endianness {
        self.endianness
    }
    fn name(&self) -> &str {
        "capstone"
    }
}
