use serde::{Deserialize, Serialize};

/// Host condition codes, in A32 encoding order.
///
/// Everything that needs "only execute if ..." is parameterised over this enum rather
/// than raw nibbles. `Nv` is the reserved slot and is never emitted.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cond {
    Eq = 0,
    Ne = 1,
    Cs = 2,
    Cc = 3,
    Mi = 4,
    Pl = 5,
    Vs = 6,
    Vc = 7,
    Hi = 8,
    Ls = 9,
    Ge = 10,
    Lt = 11,
    Gt = 12,
    Le = 13,
    Al = 14,
    Nv = 15,
}

const ALL: [Cond; 16] = [
    Cond::Eq,
    Cond::Ne,
    Cond::Cs,
    Cond::Cc,
    Cond::Mi,
    Cond::Pl,
    Cond::Vs,
    Cond::Vc,
    Cond::Hi,
    Cond::Ls,
    Cond::Ge,
    Cond::Lt,
    Cond::Gt,
    Cond::Le,
    Cond::Al,
    Cond::Nv,
];

// Guest condition field -> host condition. Index 1 ("never") has no host form.
const GUEST_MAP: [Option<Cond>; 16] = [
    Some(Cond::Al),
    None,
    Some(Cond::Hi),
    Some(Cond::Ls),
    Some(Cond::Cc),
    Some(Cond::Cs),
    Some(Cond::Ne),
    Some(Cond::Eq),
    Some(Cond::Vc),
    Some(Cond::Vs),
    Some(Cond::Pl),
    Some(Cond::Mi),
    Some(Cond::Ge),
    Some(Cond::Lt),
    Some(Cond::Gt),
    Some(Cond::Le),
];

impl Cond {
    /// Condition field already shifted into bits 31..28.
    #[inline]
    pub const fn bits(self) -> u32 {
        (self as u32) << 28
    }

    /// Logical negation. Only meaningful for `Eq..=Le`.
    #[inline]
    pub const fn invert(self) -> Cond {
        ALL[(self as usize) ^ 1]
    }

    pub const fn from_index(n: u8) -> Cond {
        ALL[(n & 0xF) as usize]
    }

    /// Host condition implementing guest condition field `cc` (0..=15).
    ///
    /// `Hi` and `Ls` come back as themselves, but the flag state they see holds the
    /// guest carry (not the inverted host borrow), so callers must realise them with
    /// the two-branch sequences in [`crate::encoder::composite`].
    pub const fn from_guest(cc: u8) -> Option<Cond> {
        GUEST_MAP[(cc & 0xF) as usize]
    }

    /// True for the two codes that need a two-branch realisation.
    #[inline]
    pub const fn needs_two_branches(self) -> bool {
        matches!(self, Cond::Hi | Cond::Ls)
    }

    pub const fn mnemonic(self) -> &'static str {
        match self {
            Cond::Eq => "eq",
            Cond::Ne => "ne",
            Cond::Cs => "cs",
            Cond::Cc => "cc",
            Cond::Mi => "mi",
            Cond::Pl => "pl",
            Cond::Vs => "vs",
            Cond::Vc => "vc",
            Cond::Hi => "hi",
            Cond::Ls => "ls",
            Cond::Ge => "ge",
            Cond::Lt => "lt",
            Cond::Gt => "gt",
            Cond::Le => "le",
            Cond::Al => "",
            Cond::Nv => "nv",
        }
    }
}
