//! Shared test helpers: an in-memory builder for small MIPS ELF32 files.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

pub const SHT_PROGBITS: u32 = 1;
pub const SHT_SYMTAB: u32 = 2;
pub const SHT_STRTAB: u32 = 3;
pub const SHT_NOBITS: u32 = 8;
pub const SHT_REL: u32 = 9;

pub const SHF_WRITE: u32 = 0x1;
pub const SHF_ALLOC: u32 = 0x2;
pub const SHF_EXECINSTR: u32 = 0x4;

pub const ET_REL: u16 = 1;
pub const ET_EXEC: u16 = 2;
pub const EM_MIPS: u16 = 8;
pub const R_MIPS_32: u32 = 2;
/// n32 ABI marker in `e_flags`
pub const EF_MIPS_ABI2: u32 = 0x20;

/// `jr $ra`
pub const JR_RA: u32 = 0x03e0_0008;
/// `addiu $sp, $sp, -0x20`
pub const ADDIU_SP: u32 = 0x27bd_ffe0;
pub const NOP: u32 = 0;

#[derive(Debug, Clone)]
pub struct SectionSpec {
    pub name: String,
    pub sh_type: u32,
    pub flags: u32,
    pub addr: u32,
    pub data: Vec<u8>,
    /// Size for NOBITS sections
    pub size: u32,
    pub link: u32,
    pub info: u32,
    pub entsize: u32,
}

/// Builds a section-header-only ELF32 image for EM_MIPS.
#[derive(Debug, Clone)]
pub struct ElfBuilder {
    pub big_endian: bool,
    pub e_type: u16,
    pub e_flags: u32,
    pub sections: Vec<SectionSpec>,
}

impl ElfBuilder {
    pub fn new(big_endian: bool) -> Self {
        Self {
            big_endian,
            e_type: ET_EXEC,
            e_flags: 0,
            sections: Vec::new(),
        }
    }

    pub fn e_type(mut self, e_type: u16) -> Self {
        self.e_type = e_type;
        self
    }

    pub fn e_flags(mut self, e_flags: u32) -> Self {
        self.e_flags = e_flags;
        self
    }

    /// Encode instruction words in the file's byte order.
    pub fn words(&self, words: &[u32]) -> Vec<u8> {
        words
            .iter()
            .flat_map(|w| {
                if self.big_endian {
                    w.to_be_bytes()
                } else {
                    w.to_le_bytes()
                }
            })
            .collect()
    }

    pub fn progbits(mut self, name: &str, flags: u32, addr: u32, data: Vec<u8>) -> Self {
        let size = data.len() as u32;
        self.sections.push(SectionSpec {
            name: name.to_string(),
            sh_type: SHT_PROGBITS,
            flags,
            addr,
            data,
            size,
            link: 0,
            info: 0,
            entsize: 0,
        });
        self
    }

    pub fn nobits(mut self, name: &str, flags: u32, addr: u32, size: u32) -> Self {
        self.sections.push(SectionSpec {
            name: name.to_string(),
            sh_type: SHT_NOBITS,
            flags,
            addr,
            data: Vec::new(),
            size,
            link: 0,
            info: 0,
            entsize: 0,
        });
        self
    }

    pub fn raw(mut self, spec: SectionSpec) -> Self {
        self.sections.push(spec);
        self
    }

    fn u16(&self, v: u16) -> [u8; 2] {
        if self.big_endian {
            v.to_be_bytes()
        } else {
            v.to_le_bytes()
        }
    }

    fn u32(&self, v: u32) -> [u8; 4] {
        if self.big_endian {
            v.to_be_bytes()
        } else {
            v.to_le_bytes()
        }
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = vec![0u8; 52];

        let mut shstrtab = vec![0u8];
        let mut name_offsets = Vec::new();
        for s in &self.sections {
            name_offsets.push(shstrtab.len() as u32);
            shstrtab.extend_from_slice(s.name.as_bytes());
            shstrtab.push(0);
        }
        let shstrtab_name = shstrtab.len() as u32;
        shstrtab.extend_from_slice(b".shstrtab\0");

        let mut placed = Vec::new();
        for s in &self.sections {
            while out.len() % 4 != 0 {
                out.push(0);
            }
            let offset = out.len() as u32;
            if s.sh_type == SHT_NOBITS {
                placed.push((offset, s.size));
            } else {
                out.extend_from_slice(&s.data);
                placed.push((offset, s.data.len() as u32));
            }
        }
        let shstrtab_offset = out.len() as u32;
        out.extend_from_slice(&shstrtab);
        while out.len() % 4 != 0 {
            out.push(0);
        }

        let shoff = out.len() as u32;
        let shnum = self.sections.len() as u16 + 2;
        out.extend_from_slice(&[0u8; 40]);
        for (i, s) in self.sections.iter().enumerate() {
            let (offset, size) = placed[i];
            self.push_shdr(
                &mut out,
                [
                    name_offsets[i],
                    s.sh_type,
                    s.flags,
                    s.addr,
                    offset,
                    size,
                    s.link,
                    s.info,
                    4,
                    s.entsize,
                ],
            );
        }
        self.push_shdr(
            &mut out,
            [
                shstrtab_name,
                SHT_STRTAB,
                0,
                0,
                shstrtab_offset,
                shstrtab.len() as u32,
                0,
                0,
                1,
                0,
            ],
        );

        out[0..4].copy_from_slice(b"\x7fELF");
        out[4] = 1; // ELFCLASS32
        out[5] = if self.big_endian { 2 } else { 1 };
        out[6] = 1;
        let e_type = self.u16(self.e_type);
        out[16..18].copy_from_slice(&e_type);
        let machine = self.u16(EM_MIPS);
        out[18..20].copy_from_slice(&machine);
        let version = self.u32(1);
        out[20..24].copy_from_slice(&version);
        let shoff_b = self.u32(shoff);
        out[32..36].copy_from_slice(&shoff_b);
        let flags = self.u32(self.e_flags);
        out[36..40].copy_from_slice(&flags);
        let ehsize = self.u16(52);
        out[40..42].copy_from_slice(&ehsize);
        let phentsize = self.u16(32);
        out[42..44].copy_from_slice(&phentsize);
        let shentsize = self.u16(40);
        out[46..48].copy_from_slice(&shentsize);
        let shnum_b = self.u16(shnum);
        out[48..50].copy_from_slice(&shnum_b);
        let shstrndx = self.u16(shnum - 1);
        out[50..52].copy_from_slice(&shstrndx);
        out
    }

    fn push_shdr(&self, out: &mut Vec<u8>, fields: [u32; 10]) {
        for f in fields {
            out.extend_from_slice(&self.u32(f));
        }
    }

    /// Write the image to `dir/name` and return the path.
    pub fn write_to(&self, dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, self.build()).unwrap();
        path
    }
}

/// A typical small executable: `.text`, `.rodata`, `.data`, `.bss`, and a
/// non-allocated `.comment`.
pub fn sample_executable(big_endian: bool) -> ElfBuilder {
    let b = ElfBuilder::new(big_endian);
    let text = b.words(&[ADDIU_SP, NOP, JR_RA, NOP]);
    b.progbits(".text", SHF_ALLOC | SHF_EXECINSTR, 0x0040_0100, text)
        .progbits(".rodata", SHF_ALLOC, 0x0040_0200, b"hello, mips\0".to_vec())
        .progbits(".data", SHF_ALLOC | SHF_WRITE, 0x0041_0000, vec![0x11; 6])
        .nobits(".bss", SHF_ALLOC | SHF_WRITE, 0x0041_0010, 8)
        .progbits(".comment", 0, 0, b"GCC: (GNU) 13.2.0\0".to_vec())
}

/// Parse a CSV produced by the tool into `(header, rows)`.
pub fn read_csv(path: &Path) -> (String, Vec<Vec<String>>) {
    let text = std::fs::read_to_string(path).unwrap();
    let mut lines = text.split("\r\n");
    let header = lines.next().unwrap().to_string();
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(text.as_bytes());
    let rows = rdr
        .records()
        .map(|r| r.unwrap().iter().map(|f| f.to_string()).collect())
        .collect();
    (header, rows)
}
