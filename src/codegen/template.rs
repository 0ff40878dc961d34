//! Finalized routine bodies and their translation-time patching.
//!
//! A template is position independent with respect to everything the opcode word, its
//! extension words and the guest PC decide. Those values reach the code in three ways:
//!
//! * literal slots (`LDR rd,[pc]; B +0; .word v`) whose word is computed from the
//!   extension words or the guest PC,
//! * register-file offsets of `LDR`/`STR` words, grown by `4 * n` where `n` is a 3-bit
//!   register field of the opcode,
//! * the `#1` of an address-register step, which becomes `#2` when the field names A7.
//!
//! Guards are the may-fail checks: when one does not hold, the block is aborted and
//! the instruction is left to the interpreter.

use serde::{Deserialize, Serialize};

/// Value written into a literal slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LitValue {
    /// Low byte of extension word `at`.
    Ext8 { at: u8 },
    /// Extension word `at`, zero-extended.
    Ext16 { at: u8 },
    /// Extension word `at`, sign-extended.
    Ext16Signed { at: u8 },
    /// Extension words `at` and `at + 1`, high word first.
    Ext32 { at: u8 },
    /// Guest address of the opcode plus `addend`.
    Pc { addend: i32 },
    /// Address of extension word `at` plus its sign-extended value.
    PcExt16 { at: u8 },
    /// Address of extension word `at` plus the long formed with the following word.
    PcExt32 { at: u8 },
}

impl LitValue {
    pub fn resolve(self, ext: &[u16], pc: u32) -> Option<u32> {
        let word = |at: u8| ext.get(at as usize).copied();
        let long = |at: u8| Some((word(at)? as u32) << 16 | word(at + 1)? as u32);
        let ext_addr = |at: u8| pc.wrapping_add(2 + 2 * at as u32);
        Some(match self {
            LitValue::Ext8 { at } => word(at)? as u32 & 0xFF,
            LitValue::Ext16 { at } => word(at)? as u32,
            LitValue::Ext16Signed { at } => word(at)? as i16 as i32 as u32,
            LitValue::Ext32 { at } => long(at)?,
            LitValue::Pc { addend } => pc.wrapping_add(addend as u32),
            LitValue::PcExt16 { at } => ext_addr(at).wrapping_add(word(at)? as i16 as i32 as u32),
            LitValue::PcExt32 { at } => ext_addr(at).wrapping_add(long(at)?),
        })
    }

    /// C expression computing the value at translation time.
    pub fn c_expr(self) -> String {
        let at_ext = |at: u8| format!("m68k_pc_offset_thisinst + {}", 2 + 2 * at as u32);
        match self {
            LitValue::Ext8 { at } => format!("(comp_get_iword({}) & 0xff)", at_ext(at)),
            LitValue::Ext16 { at } => format!("(uae_u32)comp_get_iword({})", at_ext(at)),
            LitValue::Ext16Signed { at } => {
                format!("(uae_u32)(uae_s32)(uae_s16)comp_get_iword({})", at_ext(at))
            }
            LitValue::Ext32 { at } => format!("comp_get_ilong({})", at_ext(at)),
            LitValue::Pc { addend } if addend < 0 => {
                format!("comp_guest_pc(m68k_pc_offset_thisinst) - {}", addend.unsigned_abs())
            }
            LitValue::Pc { addend } => {
                format!("comp_guest_pc(m68k_pc_offset_thisinst) + {addend}")
            }
            LitValue::PcExt16 { at } => format!(
                "comp_guest_pc({0}) + (uae_s32)(uae_s16)comp_get_iword({0})",
                at_ext(at)
            ),
            LitValue::PcExt32 { at } => {
                format!("comp_guest_pc({0}) + comp_get_ilong({0})", at_ext(at))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Fixup {
    Literal { slot: u32, value: LitValue },
    /// Add `4 * ((opcode >> field) & 7)` to the immediate offset of the transfer at `at`.
    RegSlot { at: u32, field: u8 },
    /// Turn the `#1` operand of the instruction at `at` into `#2` when the field is 7.
    StackStep { at: u32, field: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Guard {
    /// Holds when the two 3-bit opcode fields name different registers.
    FieldsDiffer { a: u8, b: u8 },
    /// Holds when extension word `at` is a brief-format index word.
    BriefExtension { at: u8 },
}

impl Guard {
    pub fn holds(self, opcode: u16, ext: &[u16]) -> bool {
        match self {
            Guard::FieldsDiffer { a, b } => (opcode >> a) & 7 != (opcode >> b) & 7,
            Guard::BriefExtension { at } => ext.get(at as usize).is_some_and(|w| w & 0x0100 == 0),
        }
    }

    /// C expression, in terms of `opcode` and the extension fetchers, that is true when
    /// the guard fails.
    pub fn c_condition(self) -> String {
        match self {
            Guard::FieldsDiffer { a, b } => {
                format!("((opcode >> {a}) & 7) == ((opcode >> {b}) & 7)")
            }
            Guard::BriefExtension { at } => {
                format!("(comp_get_iword(m68k_pc_offset_thisinst + {}) & 0x100)", 2 + 2 * at as u32)
            }
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum InstantiateError {
    #[error("guard {0:?} failed")]
    GuardFailed(Guard),
    #[error("routine needs {needed} extension words, {got} supplied")]
    MissingExtension { needed: u8, got: usize },
    #[error("fixup {0:?} points outside the routine")]
    BadFixup(Fixup),
}

/// A finalized routine body.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Template {
    pub words: Vec<u32>,
    pub fixups: Vec<Fixup>,
    pub guards: Vec<Guard>,
    pub ext_words: u8,
}

impl Template {
    #[inline]
    pub fn ext_bytes(&self) -> u32 {
        2 * self.ext_words as u32
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Check the guards and patch every fixup for the instruction `opcode` at guest
    /// address `pc` followed by the extension words `ext`.
    pub fn instantiate(&self, opcode: u16, ext: &[u16], pc: u32) -> Result<Vec<u32>, InstantiateError> {
        if ext.len() < self.ext_words as usize {
            return Err(InstantiateError::MissingExtension { needed: self.ext_words, got: ext.len() });
        }
        if let Some(g) = self.guards.iter().find(|g| !g.holds(opcode, ext)) {
            return Err(InstantiateError::GuardFailed(*g));
        }
        let mut words = self.words.clone();
        for f in &self.fixups {
            let bad = || InstantiateError::BadFixup(*f);
            match *f {
                Fixup::Literal { slot, value } => {
                    let v = value.resolve(ext, pc).ok_or_else(bad)?;
                    *words.get_mut(slot as usize).ok_or_else(bad)? = v;
                }
                Fixup::RegSlot { at, field } => {
                    let w = words.get_mut(at as usize).ok_or_else(bad)?;
                    *w = add_offset(*w, 4 * ((opcode >> field) & 7) as u32);
                }
                Fixup::StackStep { at, field } => {
                    let w = words.get_mut(at as usize).ok_or_else(bad)?;
                    if (opcode >> field) & 7 == 7 {
                        *w = (*w & !0xFFF) | 2;
                    }
                }
            }
        }
        Ok(words)
    }
}

/// Grow the immediate offset of a single load/store word by `delta`.
pub fn add_offset(word: u32, delta: u32) -> u32 {
    if word & 0x0C00_0000 == 0x0400_0000 {
        let off = (word & 0xFFF) + delta;
        (word & !0xFFF) | (off & 0xFFF)
    } else {
        // Halfword/signed transfers split the 8-bit offset around the SH bits.
        let off = (((word >> 4) & 0xF0) | (word & 0xF)) + delta;
        (word & !0xF0F) | ((off & 0xF0) << 4) | (off & 0xF)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_values() {
        let ext = [0xFFFE, 0x1234];
        assert_eq!(LitValue::Ext16Signed { at: 0 }.resolve(&ext, 0), Some(0xFFFF_FFFE));
        assert_eq!(LitValue::Ext32 { at: 0 }.resolve(&ext, 0), Some(0xFFFE_1234));
        assert_eq!(LitValue::Ext8 { at: 1 }.resolve(&ext, 0), Some(0x34));
        assert_eq!(LitValue::PcExt16 { at: 0 }.resolve(&ext, 0x1000), Some(0x1000));
        assert_eq!(LitValue::Ext16 { at: 2 }.resolve(&ext, 0), None);
    }

    #[test]
    fn literal_expressions() {
        assert_eq!(
            LitValue::Pc { addend: 4 }.c_expr(),
            "comp_guest_pc(m68k_pc_offset_thisinst) + 4"
        );
        assert_eq!(
            LitValue::Ext16Signed { at: 1 }.c_expr(),
            "(uae_u32)(uae_s32)(uae_s16)comp_get_iword(m68k_pc_offset_thisinst + 4)"
        );
    }

    #[test]
    fn register_offsets_patch_both_forms() {
        // ldr r4, [r11, #32]
        assert_eq!(add_offset(0xe59b_4020, 12), 0xe59b_402c);
        // strh r4, [r11, #0]
        assert_eq!(add_offset(0xe1cb_40b0, 28), 0xe1cb_41bc);
    }

    #[test]
    fn guards_are_checked_before_patching() {
        let t = Template {
            words: vec![0],
            fixups: vec![],
            guards: vec![Guard::FieldsDiffer { a: 0, b: 9 }],
            ext_words: 0,
        };
        assert!(t.instantiate(0xE368, &[], 0).is_ok());
        assert_eq!(
            t.instantiate(0xE168, &[], 0),
            Err(InstantiateError::GuardFailed(Guard::FieldsDiffer { a: 0, b: 9 }))
        );
    }
}
