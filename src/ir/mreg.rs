//! Machine registers: the AArch64 GPR and double-precision FP register
//! files, tagged with the capabilities the allocator and stacking passes
//! need.

use core::fmt;

/// A single AArch64 machine register: one of the 31 general-purpose
/// registers (plus SP), or one of the 32 double-precision FP registers.
///
/// `X31` is deliberately absent: depending on instruction context the
/// encoding `11111` means either the stack pointer or the zero register,
/// neither of which this backend hands to the allocator as an allocatable
/// color. `Sp` is its own variant for the cases (stack-slot addressing)
/// where code needs to name it explicitly.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum MReg {
    /// General-purpose integer registers X0..X30.
    X(u8),
    /// The stack pointer.
    Sp,
    /// Double-precision floating-point registers D0..D31.
    D(u8),
}

impl MReg {
    pub const FP: MReg = MReg::X(29);
    pub const LR: MReg = MReg::X(30);

    /// Integer argument-passing registers, in ABI order (X0..X7).
    pub const ARG_INT: [MReg; 8] = [
        MReg::X(0),
        MReg::X(1),
        MReg::X(2),
        MReg::X(3),
        MReg::X(4),
        MReg::X(5),
        MReg::X(6),
        MReg::X(7),
    ];

    /// Float argument-passing registers, in ABI order (D0..D7).
    pub const ARG_FLOAT: [MReg; 8] = [
        MReg::D(0),
        MReg::D(1),
        MReg::D(2),
        MReg::D(3),
        MReg::D(4),
        MReg::D(5),
        MReg::D(6),
        MReg::D(7),
    ];

    /// Integer return-value register.
    pub const RET_INT: MReg = MReg::X(0);
    /// Float return-value register.
    pub const RET_FLOAT: MReg = MReg::D(0);

    /// Reserved scratch register for entry parameter-copy cycle breaking.
    /// Caller-saved, never used for argument passing.
    pub const SCRATCH_ENTRY: MReg = MReg::X(8);

    /// Float counterpart of `SCRATCH_ENTRY`, for breaking a parameter
    /// parallel-move cycle in the float argument bank. `D29` is chosen to
    /// sit outside both `ALLOCATABLE_FLOAT` and `SCRATCH_BODY_FLOAT`
    /// (`D30`/`D31`), matching §9's "do not overlap these roles".
    pub const SCRATCH_ENTRY_FLOAT: MReg = MReg::D(29);

    /// Reserved scratch registers for in-body stack-slot staging.
    pub const SCRATCH_BODY: [MReg; 2] = [MReg::X(16), MReg::X(17)];

    /// Reserved float scratch registers, same role as `SCRATCH_BODY` but
    /// for spilled float operands. `D30`/`D31` are
    /// chosen because they sit outside `ALLOCATABLE_FLOAT` already (the
    /// highest-numbered float registers, never assigned as a color), so
    /// reserving them for staging adds no new exclusion (see DESIGN.md).
    pub const SCRATCH_BODY_FLOAT: [MReg; 2] = [MReg::D(30), MReg::D(31)];

    /// Allocatable integer colors, in allocation preference order: the
    /// caller-saved registers first (cheapest to use), then the
    /// callee-saved registers, then the argument registers. `X8` and
    /// `X16`/`X17` are excluded: they are reserved scratch registers (see
    /// `SCRATCH_ENTRY` / `SCRATCH_BODY`). `X18` is excluded as
    /// platform-reserved on AArch64 System-V-like ABIs.
    ///
    /// All eight argument registers are included at the tail so that every
    /// parameter pseudo-register not live across a call can be precolored
    /// to its own `ArgLocation`: a value that never leaves
    /// its arrival register has a valid color to name.
    pub const ALLOCATABLE_INT: [MReg; 25] = [
        MReg::X(9),
        MReg::X(10),
        MReg::X(11),
        MReg::X(12),
        MReg::X(13),
        MReg::X(14),
        MReg::X(15),
        MReg::X(19),
        MReg::X(20),
        MReg::X(21),
        MReg::X(22),
        MReg::X(23),
        MReg::X(24),
        MReg::X(25),
        MReg::X(26),
        MReg::X(27),
        MReg::X(28),
        // Argument registers are allocatable too: a non-parameter value can
        // be colored into X0..X7 once the parameter that arrived there has
        // been copied out (or never occupied it), and a parameter that is
        // never live across a call is precolored directly to one of these.
        MReg::X(0),
        MReg::X(1),
        MReg::X(2),
        MReg::X(3),
        MReg::X(4),
        MReg::X(5),
        MReg::X(6),
        MReg::X(7),
    ];

    /// Index (into a fixed color ordering) of the first callee-saved
    /// integer color. Colors at or above this index satisfy the
    /// live-across-call constraint.
    pub const FIRST_CALLEE_SAVED_INT_COLOR: usize = 7;

    /// Allocatable float colors, same shape as `ALLOCATABLE_INT`: caller-saved
    /// temporaries, then callee-saved, then the eight argument registers.
    pub const ALLOCATABLE_FLOAT: [MReg; 24] = [
        MReg::D(16),
        MReg::D(17),
        MReg::D(18),
        MReg::D(19),
        MReg::D(20),
        MReg::D(21),
        MReg::D(22),
        MReg::D(8),
        MReg::D(9),
        MReg::D(10),
        MReg::D(11),
        MReg::D(12),
        MReg::D(13),
        MReg::D(14),
        MReg::D(15),
        MReg::D(23),
        MReg::D(0),
        MReg::D(1),
        MReg::D(2),
        MReg::D(3),
        MReg::D(4),
        MReg::D(5),
        MReg::D(6),
        MReg::D(7),
    ];

    /// Index of the first callee-saved float color (D8..D15 are
    /// callee-saved on AArch64; see `is_callee_saved`).
    pub const FIRST_CALLEE_SAVED_FLOAT_COLOR: usize = 7;

    /// Whether this register is a general-purpose integer register (or SP).
    pub fn is_integer(self) -> bool {
        matches!(self, MReg::X(_) | MReg::Sp)
    }

    /// Whether this register is a double-precision float register.
    pub fn is_float(self) -> bool {
        matches!(self, MReg::D(_))
    }

    /// Whether the allocator is permitted to assign pseudo-registers to
    /// this machine register. FP, LR, SP, and the reserved scratch
    /// registers are never allocatable colors.
    pub fn is_allocatable(self) -> bool {
        match self {
            MReg::Sp => false,
            MReg::X(29) | MReg::X(30) => false, // FP, LR
            MReg::X(8) | MReg::X(16) | MReg::X(17) | MReg::X(18) => false,
            MReg::X(n) => n < 31,
            MReg::D(29) | MReg::D(30) | MReg::D(31) => false,
            MReg::D(n) => n < 32,
        }
    }

    /// Whether a called function must preserve this register's value
    /// across the call.
    pub fn is_callee_saved(self) -> bool {
        match self {
            MReg::X(n) => (19..=28).contains(&n),
            MReg::D(n) => (8..=15).contains(&n),
            MReg::Sp => true,
        }
    }

    /// Argument-home location for the `i`-th integer/pointer parameter
    /// (zero-indexed), or `None` if it arrives on the stack (8th and
    /// later).
    pub fn arg_int(i: usize) -> Option<MReg> {
        Self::ARG_INT.get(i).copied()
    }

    /// Argument-home location for the `i`-th float parameter.
    pub fn arg_float(i: usize) -> Option<MReg> {
        Self::ARG_FLOAT.get(i).copied()
    }

    /// The color index of `self` within `ALLOCATABLE_INT` or
    /// `ALLOCATABLE_FLOAT` (whichever matches `self`'s bank), used to
    /// precolor a parameter pseudo-register to its ABI arrival register.
    pub fn allocatable_color(self) -> Option<usize> {
        let table: &[MReg] = if self.is_float() {
            &Self::ALLOCATABLE_FLOAT
        } else {
            &Self::ALLOCATABLE_INT
        };
        table.iter().position(|&r| r == self)
    }
}

impl fmt::Display for MReg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MReg::X(29) => write!(f, "x29"),
            MReg::X(30) => write!(f, "x30"),
            MReg::X(n) => write!(f, "x{n}"),
            MReg::Sp => write!(f, "sp"),
            MReg::D(n) => write!(f, "d{n}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scratch_registers_are_never_allocatable() {
        assert!(!MReg::SCRATCH_ENTRY.is_allocatable());
        for r in MReg::SCRATCH_BODY {
            assert!(!r.is_allocatable());
        }
    }

    #[test]
    fn fp_lr_excluded_from_allocatable_set() {
        assert!(!MReg::FP.is_allocatable());
        assert!(!MReg::LR.is_allocatable());
        assert!(MReg::ALLOCATABLE_INT.iter().all(|&r| r != MReg::FP && r != MReg::LR));
    }

    #[test]
    fn callee_saved_classification_matches_abi() {
        assert!(MReg::X(19).is_callee_saved());
        assert!(!MReg::X(9).is_callee_saved());
        assert!(MReg::D(8).is_callee_saved());
        assert!(!MReg::D(0).is_callee_saved());
    }
}
