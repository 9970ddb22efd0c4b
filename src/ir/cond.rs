//! Comparison conditions.

use core::fmt;

/// A bare comparison relation, independent of operand type or signedness.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum Condition {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Condition {
    /// The relation that holds exactly when `self` does not.
    pub fn negate(self) -> Condition {
        match self {
            Condition::Eq => Condition::Ne,
            Condition::Ne => Condition::Eq,
            Condition::Lt => Condition::Ge,
            Condition::Le => Condition::Gt,
            Condition::Gt => Condition::Le,
            Condition::Ge => Condition::Lt,
        }
    }

    /// The relation that holds when the compared operands are swapped.
    pub fn swap_args(self) -> Condition {
        match self {
            Condition::Eq => Condition::Eq,
            Condition::Ne => Condition::Ne,
            Condition::Lt => Condition::Gt,
            Condition::Le => Condition::Ge,
            Condition::Gt => Condition::Lt,
            Condition::Ge => Condition::Le,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Condition::Eq => "eq",
            Condition::Ne => "ne",
            Condition::Lt => "lt",
            Condition::Le => "le",
            Condition::Gt => "gt",
            Condition::Ge => "ge",
        };
        f.write_str(s)
    }
}

/// A comparison instruction variant: combines a `Condition` with the
/// operand type/width and signedness it applies to. This is the tag
/// attached to `Icond`/`Lcond`/`Mcond` branches and to comparison
/// `Operation`s: the `Ccomp*` family.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum ConditionCode {
    /// 32-bit signed register compare.
    Ccomp(Condition),
    /// 32-bit unsigned register compare.
    Ccompu(Condition),
    /// 32-bit signed compare against an immediate.
    Ccompimm(Condition, i32),
    /// 32-bit unsigned compare against an immediate.
    Ccompuimm(Condition, u32),
    /// 64-bit signed register compare.
    Ccompl(Condition),
    /// 64-bit unsigned register compare.
    Ccomplu(Condition),
    /// 64-bit signed compare against an immediate.
    Ccomplimm(Condition, i64),
    /// 64-bit unsigned compare against an immediate.
    Ccompluimm(Condition, u64),
    /// `f64` compare.
    Ccompf(Condition),
    /// `f32` ("single") compare.
    Ccomps(Condition),
    /// Negated `f64` compare (true unless the comparison is unordered and
    /// the negated relation would otherwise hold — see AArch64 `FCMP`
    /// flag semantics for NaN handling).
    Cnotcompf(Condition),
    /// Negated `f32` compare.
    Cnotcomps(Condition),
}

impl ConditionCode {
    /// The base relation this condition code tests, ignoring type/sign tag.
    pub fn condition(self) -> Condition {
        match self {
            ConditionCode::Ccomp(c)
            | ConditionCode::Ccompu(c)
            | ConditionCode::Ccompimm(c, _)
            | ConditionCode::Ccompuimm(c, _)
            | ConditionCode::Ccompl(c)
            | ConditionCode::Ccomplu(c)
            | ConditionCode::Ccomplimm(c, _)
            | ConditionCode::Ccompluimm(c, _)
            | ConditionCode::Ccompf(c)
            | ConditionCode::Ccomps(c)
            | ConditionCode::Cnotcompf(c)
            | ConditionCode::Cnotcomps(c) => c,
        }
    }

    /// Whether this condition code tests a floating-point comparison.
    pub fn is_float(self) -> bool {
        matches!(
            self,
            ConditionCode::Ccompf(_)
                | ConditionCode::Ccomps(_)
                | ConditionCode::Cnotcompf(_)
                | ConditionCode::Cnotcomps(_)
        )
    }

    /// Negate the tested relation, keeping the type/sign tag (used by the
    /// linearizer's optional fall-through-on-true-side refinement).
    pub fn negate(self) -> ConditionCode {
        match self {
            ConditionCode::Ccomp(c) => ConditionCode::Ccomp(c.negate()),
            ConditionCode::Ccompu(c) => ConditionCode::Ccompu(c.negate()),
            ConditionCode::Ccompimm(c, i) => ConditionCode::Ccompimm(c.negate(), i),
            ConditionCode::Ccompuimm(c, i) => ConditionCode::Ccompuimm(c.negate(), i),
            ConditionCode::Ccompl(c) => ConditionCode::Ccompl(c.negate()),
            ConditionCode::Ccomplu(c) => ConditionCode::Ccomplu(c.negate()),
            ConditionCode::Ccomplimm(c, i) => ConditionCode::Ccomplimm(c.negate(), i),
            ConditionCode::Ccompluimm(c, i) => ConditionCode::Ccompluimm(c.negate(), i),
            ConditionCode::Ccompf(c) => ConditionCode::Ccompf(c.negate()),
            ConditionCode::Ccomps(c) => ConditionCode::Ccomps(c.negate()),
            ConditionCode::Cnotcompf(c) => ConditionCode::Cnotcompf(c.negate()),
            ConditionCode::Cnotcomps(c) => ConditionCode::Cnotcomps(c.negate()),
        }
    }
}
