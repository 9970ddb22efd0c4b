//! Type tags and memory-access chunks.

use core::fmt;

/// Determines slot size (4 or 8 bytes) and whether a value is an integer or
/// a floating-point value.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum Ty {
    /// 32-bit integer.
    I32,
    /// 64-bit integer ("long" in C-flavoured naming).
    I64,
    /// 32-bit float ("single").
    F32,
    /// 64-bit float.
    F64,
    /// Either-width integer, used by moves whose width is inferred from
    /// context (e.g. a spill slot shared by two same-size pseudo-regs).
    Any32,
    /// Either-width 64-bit value (integer or pointer), analogous to
    /// `Any32` at 8 bytes.
    Any64,
}

impl Ty {
    /// Size in bytes of a value of this type, used to size stack slots.
    pub fn bytes(self) -> i64 {
        match self {
            Ty::I32 | Ty::F32 | Ty::Any32 => 4,
            Ty::I64 | Ty::F64 | Ty::Any64 => 8,
        }
    }

    /// Whether this type denotes a floating-point value.
    pub fn is_float(self) -> bool {
        matches!(self, Ty::F32 | Ty::F64)
    }

    /// Whether this type denotes an integer (or opaque 32/64-bit) value.
    pub fn is_integer(self) -> bool {
        !self.is_float()
    }

    /// Whether this type occupies a single 64-bit machine word.
    pub fn is_64(self) -> bool {
        matches!(self, Ty::I64 | Ty::F64 | Ty::Any64)
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Ty::I32 => "i32",
            Ty::I64 => "i64",
            Ty::F32 => "f32",
            Ty::F64 => "f64",
            Ty::Any32 => "any32",
            Ty::Any64 => "any64",
        };
        f.write_str(s)
    }
}

/// A memory access width and sign-extension descriptor, used by `Iload` /
/// `Istore` (CFG-IR) through `Mload` / `Mstore` (Mach-IR).
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum Chunk {
    /// 8-bit signed.
    I8S,
    /// 8-bit unsigned.
    I8U,
    /// 16-bit signed.
    I16S,
    /// 16-bit unsigned.
    I16U,
    /// 32-bit.
    I32,
    /// 64-bit.
    I64,
    /// 32-bit float.
    F32,
    /// 64-bit float.
    F64,
}

impl Chunk {
    /// Width in bytes moved by a load/store of this chunk.
    pub fn bytes(self) -> i64 {
        match self {
            Chunk::I8S | Chunk::I8U => 1,
            Chunk::I16S | Chunk::I16U => 2,
            Chunk::I32 | Chunk::F32 => 4,
            Chunk::I64 | Chunk::F64 => 8,
        }
    }

    /// The `Ty` a value loaded with this chunk is held as once it sits in a
    /// register (loads always widen to at least 32 bits).
    pub fn result_ty(self) -> Ty {
        match self {
            Chunk::I8S | Chunk::I8U | Chunk::I16S | Chunk::I16U | Chunk::I32 => Ty::I32,
            Chunk::I64 => Ty::I64,
            Chunk::F32 => Ty::F32,
            Chunk::F64 => Ty::F64,
        }
    }

    /// Whether this chunk denotes a floating-point access.
    pub fn is_float(self) -> bool {
        matches!(self, Chunk::F32 | Chunk::F64)
    }

    /// Whether a narrow (sub-word) load must sign-extend its result.
    pub fn is_signed(self) -> bool {
        matches!(self, Chunk::I8S | Chunk::I16S)
    }
}

impl fmt::Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Chunk::I8S => "i8s",
            Chunk::I8U => "i8u",
            Chunk::I16S => "i16s",
            Chunk::I16U => "i16u",
            Chunk::I32 => "i32",
            Chunk::I64 => "i64",
            Chunk::F32 => "f32",
            Chunk::F64 => "f64",
        };
        f.write_str(s)
    }
}
