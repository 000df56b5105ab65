// SPDX-License-Identifier: GPL-2.0

//! Instruction encoding and disassembly
//! 指令编码与反汇编
//!
//! Fixed-shape 8-byte instructions: an opcode, two 4-bit register operands,
//! a signed 16-bit offset and a signed 32-bit immediate. A 64-bit immediate
//! load occupies two consecutive slots.
//!
//! 固定形状的 8 字节指令：操作码、两个寄存器操作数、16 位有符号偏移和 32 位有符号立即数。

use core::fmt;

// Instruction classes
/// 64-bit immediate load (two slots)
pub const VM_LD: u8 = 0x00;
/// Load from memory into register
pub const VM_LDX: u8 = 0x01;
/// Store immediate to memory
pub const VM_ST: u8 = 0x02;
/// Store register to memory
pub const VM_STX: u8 = 0x03;
/// 32-bit arithmetic
pub const VM_ALU: u8 = 0x04;
/// 64-bit jumps and calls
pub const VM_JMP: u8 = 0x05;
/// 32-bit conditional jumps
pub const VM_JMP32: u8 = 0x06;
/// 64-bit arithmetic
pub const VM_ALU64: u8 = 0x07;

// Access sizes
/// 4 bytes
pub const VM_W: u8 = 0x00;
/// 2 bytes
pub const VM_H: u8 = 0x08;
/// 1 byte
pub const VM_B: u8 = 0x10;
/// 8 bytes
pub const VM_DW: u8 = 0x18;

// Modes
/// Immediate operand (LD_IMM64)
pub const VM_IMM: u8 = 0x00;
/// Register-relative memory operand
pub const VM_MEM: u8 = 0x60;
/// Speculation barrier (with class ST)
pub const VM_NOSPEC: u8 = 0xc0;

// Operand source
/// Immediate source operand
pub const VM_K: u8 = 0x00;
/// Register source operand
pub const VM_X: u8 = 0x08;

// ALU operations
/// dst += src
pub const VM_ADD: u8 = 0x00;
/// dst -= src
pub const VM_SUB: u8 = 0x10;
/// dst *= src
pub const VM_MUL: u8 = 0x20;
/// dst /= src (unsigned, x / 0 = 0)
pub const VM_DIV: u8 = 0x30;
/// dst |= src
pub const VM_OR: u8 = 0x40;
/// dst &= src
pub const VM_AND: u8 = 0x50;
/// dst <<= src
pub const VM_LSH: u8 = 0x60;
/// dst >>= src (logical)
pub const VM_RSH: u8 = 0x70;
/// dst = -dst
pub const VM_NEG: u8 = 0x80;
/// dst %= src (unsigned, x % 0 = x)
pub const VM_MOD: u8 = 0x90;
/// dst ^= src
pub const VM_XOR: u8 = 0xa0;
/// dst = src
pub const VM_MOV: u8 = 0xb0;
/// dst >>= src (arithmetic)
pub const VM_ARSH: u8 = 0xc0;
/// Byte swap, width in imm
pub const VM_END: u8 = 0xd0;

/// Byte swap target: little endian
pub const VM_TO_LE: u8 = 0x00;
/// Byte swap target: big endian
pub const VM_TO_BE: u8 = 0x08;

// Jump operations
/// Unconditional jump
pub const VM_JA: u8 = 0x00;
/// Jump if equal
pub const VM_JEQ: u8 = 0x10;
/// Jump if greater (unsigned)
pub const VM_JGT: u8 = 0x20;
/// Jump if greater or equal (unsigned)
pub const VM_JGE: u8 = 0x30;
/// Jump if dst & src
pub const VM_JSET: u8 = 0x40;
/// Jump if not equal
pub const VM_JNE: u8 = 0x50;
/// Jump if greater (signed)
pub const VM_JSGT: u8 = 0x60;
/// Jump if greater or equal (signed)
pub const VM_JSGE: u8 = 0x70;
/// Helper or subprogram call
pub const VM_CALL: u8 = 0x80;
/// Return from function
pub const VM_EXIT: u8 = 0x90;
/// Jump if less (unsigned)
pub const VM_JLT: u8 = 0xa0;
/// Jump if less or equal (unsigned)
pub const VM_JLE: u8 = 0xb0;
/// Jump if less (signed)
pub const VM_JSLT: u8 = 0xc0;
/// Jump if less or equal (signed)
pub const VM_JSLE: u8 = 0xd0;

/// LD_IMM64 `src_reg` marking the immediate as a map id
pub const VM_PSEUDO_MAP_FD: u8 = 1;
/// CALL `src_reg` marking a subprogram call
pub const VM_PSEUDO_CALL: u8 = 1;

/// One instruction slot
/// 一个指令槽
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Insn {
    /// Opcode
    pub code: u8,
    /// Destination register
    pub dst_reg: u8,
    /// Source register
    pub src_reg: u8,
    /// Offset
    pub off: i16,
    /// Immediate value
    pub imm: i32,
}

impl Insn {
    /// Create a new instruction
    pub const fn new(code: u8, dst_reg: u8, src_reg: u8, off: i16, imm: i32) -> Self {
        Self {
            code,
            dst_reg,
            src_reg,
            off,
            imm,
        }
    }

    /// 64-bit immediate load, as its two slots
    pub const fn ld_imm64(dst_reg: u8, imm: u64) -> [Insn; 2] {
        [
            Insn::new(VM_LD | VM_DW | VM_IMM, dst_reg, 0, 0, imm as u32 as i32),
            Insn::new(0, 0, 0, 0, (imm >> 32) as u32 as i32),
        ]
    }

    /// Load a constant map pointer, as its two slots
    pub const fn ld_map(dst_reg: u8, map_id: u32) -> [Insn; 2] {
        [
            Insn::new(VM_LD | VM_DW | VM_IMM, dst_reg, VM_PSEUDO_MAP_FD, 0, map_id as i32),
            Insn::new(0, 0, 0, 0, 0),
        ]
    }

    /// Speculation barrier
    pub const fn nospec() -> Self {
        Insn::new(VM_ST | VM_NOSPEC, 0, 0, 0, 0)
    }

    /// Get instruction class
    pub fn class(&self) -> u8 {
        self.code & 0x07
    }

    /// Get the ALU or jump operation
    pub fn op(&self) -> u8 {
        self.code & 0xf0
    }

    /// Get the raw size field
    pub fn size(&self) -> u8 {
        self.code & 0x18
    }

    /// Get the memory access width in bytes
    pub fn size_bytes(&self) -> u32 {
        match self.size() {
            VM_B => 1,
            VM_H => 2,
            VM_W => 4,
            _ => 8,
        }
    }

    /// Get instruction mode
    pub fn mode(&self) -> u8 {
        self.code & 0xe0
    }

    /// Source operand is a register
    pub fn src_is_reg(&self) -> bool {
        self.code & 0x08 == VM_X
    }

    /// First slot of a 64-bit immediate load
    pub fn is_ld_imm64(&self) -> bool {
        self.code == VM_LD | VM_DW | VM_IMM
    }

    /// Speculation barrier
    pub fn is_nospec(&self) -> bool {
        self.code == VM_ST | VM_NOSPEC
    }

    /// Any jump-class instruction
    pub fn is_jmp_class(&self) -> bool {
        matches!(self.class(), VM_JMP | VM_JMP32)
    }

    /// Call into a subprogram
    pub fn is_pseudo_call(&self) -> bool {
        self.code == VM_JMP | VM_CALL && self.src_reg == VM_PSEUDO_CALL
    }

    /// Call into a host helper
    pub fn is_helper_call(&self) -> bool {
        self.code == VM_JMP | VM_CALL && self.src_reg == 0
    }

    /// Function return
    pub fn is_exit(&self) -> bool {
        self.code == VM_JMP | VM_EXIT
    }

    /// Unconditional jump
    pub fn is_ja(&self) -> bool {
        self.code == VM_JMP | VM_JA
    }

    /// Two-way conditional jump
    pub fn is_cond_jmp(&self) -> bool {
        self.is_jmp_class() && !matches!(self.op(), VM_JA | VM_CALL | VM_EXIT)
    }

    /// Target of a jump at `idx`
    pub fn jmp_target(&self, idx: usize) -> i64 {
        idx as i64 + self.off as i64 + 1
    }

    /// Target of a pseudo call at `idx`
    pub fn call_target(&self, idx: usize) -> i64 {
        idx as i64 + self.imm as i64 + 1
    }
}

fn alu_mnemonic(op: u8) -> &'static str {
    match op {
        VM_ADD => "add",
        VM_SUB => "sub",
        VM_MUL => "mul",
        VM_DIV => "div",
        VM_OR => "or",
        VM_AND => "and",
        VM_LSH => "lsh",
        VM_RSH => "rsh",
        VM_NEG => "neg",
        VM_MOD => "mod",
        VM_XOR => "xor",
        VM_MOV => "mov",
        VM_ARSH => "arsh",
        VM_END => "end",
        _ => "alu?",
    }
}

fn jmp_mnemonic(op: u8) -> &'static str {
    match op {
        VM_JEQ => "jeq",
        VM_JGT => "jgt",
        VM_JGE => "jge",
        VM_JSET => "jset",
        VM_JNE => "jne",
        VM_JSGT => "jsgt",
        VM_JSGE => "jsge",
        VM_JLT => "jlt",
        VM_JLE => "jle",
        VM_JSLT => "jslt",
        VM_JSLE => "jsle",
        _ => "jmp?",
    }
}

fn size_suffix(size: u8) -> &'static str {
    match size {
        VM_B => "8",
        VM_H => "16",
        VM_W => "32",
        _ => "64",
    }
}

impl fmt::Display for Insn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.class() {
            VM_ALU | VM_ALU64 => {
                let width = if self.class() == VM_ALU { "32" } else { "" };
                let op = self.op();
                match op {
                    VM_NEG => write!(f, "neg{} r{}", width, self.dst_reg),
                    VM_END => {
                        let to = if self.code & VM_TO_BE != 0 { "be" } else { "le" };
                        write!(f, "{}{} r{}", to, self.imm, self.dst_reg)
                    }
                    _ if self.src_is_reg() => write!(
                        f,
                        "{}{} r{}, r{}",
                        alu_mnemonic(op),
                        width,
                        self.dst_reg,
                        self.src_reg
                    ),
                    _ => write!(f, "{}{} r{}, {}", alu_mnemonic(op), width, self.dst_reg, self.imm),
                }
            }
            VM_LDX => write!(
                f,
                "ldx{} r{}, [r{}{:+}]",
                size_suffix(self.size()),
                self.dst_reg,
                self.src_reg,
                self.off
            ),
            VM_STX => write!(
                f,
                "stx{} [r{}{:+}], r{}",
                size_suffix(self.size()),
                self.dst_reg,
                self.off,
                self.src_reg
            ),
            VM_ST if self.is_nospec() => write!(f, "nospec"),
            VM_ST => write!(
                f,
                "st{} [r{}{:+}], {}",
                size_suffix(self.size()),
                self.dst_reg,
                self.off,
                self.imm
            ),
            VM_JMP | VM_JMP32 => {
                let width = if self.class() == VM_JMP32 { "32" } else { "" };
                match self.op() {
                    VM_JA => write!(f, "goto {:+}", self.off),
                    VM_CALL if self.src_reg == VM_PSEUDO_CALL => write!(f, "call pc{:+}", self.imm),
                    VM_CALL => write!(f, "call #{}", self.imm),
                    VM_EXIT => write!(f, "exit"),
                    op if self.src_is_reg() => write!(
                        f,
                        "{}{} r{}, r{}, {:+}",
                        jmp_mnemonic(op),
                        width,
                        self.dst_reg,
                        self.src_reg,
                        self.off
                    ),
                    op => write!(
                        f,
                        "{}{} r{}, {}, {:+}",
                        jmp_mnemonic(op),
                        width,
                        self.dst_reg,
                        self.imm,
                        self.off
                    ),
                }
            }
            VM_LD if self.is_ld_imm64() && self.src_reg == VM_PSEUDO_MAP_FD => {
                write!(f, "lddw r{}, map[{}]", self.dst_reg, self.imm)
            }
            VM_LD if self.is_ld_imm64() => write!(f, "lddw r{}, {:#x}", self.dst_reg, self.imm),
            _ => write!(f, "??? {:#04x}", self.code),
        }
    }
}
