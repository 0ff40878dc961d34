use super::decoder::{A32Decoder, Decoded, Decoder, Insn};
use crate::encoder::{Offset, Operand, Shift};

fn shift(sh: Shift) -> String {
    match sh {
        Shift::Lsl(n) => format!("lsl #{n}"),
        Shift::Lsr(n) => format!("lsr #{n}"),
        Shift::Asr(n) => format!("asr #{n}"),
        Shift::Ror(n) => format!("ror #{n}"),
        Shift::Rrx => "rrx".to_string(),
        Shift::LslReg(r) => format!("lsl {r}"),
        Shift::LsrReg(r) => format!("lsr {r}"),
        Shift::AsrReg(r) => format!("asr {r}"),
        Shift::RorReg(r) => format!("ror {r}"),
    }
}

fn op2(o: Operand) -> String {
    match o {
        Operand::Reg(r) => r.to_string(),
        Operand::Shifted(r, sh) => format!("{r}, {}", shift(sh)),
        Operand::Imm(v) => format!("#{v:#x}"),
        Operand::Imm8Ror(base, rot) => format!("#{:#x}", (base as u32).rotate_right(rot as u32)),
    }
}

fn offset(o: Offset) -> String {
    match o {
        Offset::Imm(0) => String::new(),
        Offset::Imm(i) => format!(", #{i}"),
        Offset::Reg(r) => format!(", {r}"),
        Offset::NegReg(r) => format!(", -{r}"),
        Offset::Shifted { rm, shift: sh, subtract } => {
            format!(", {}{rm}, {}", if subtract { "-" } else { "" }, shift(sh))
        }
    }
}

fn reglist(list: u16) -> String {
    let regs: Vec<String> = (0..16u8)
        .filter(|i| list & (1 << i) != 0)
        .map(|i| crate::encoder::Reg::new(i).to_string())
        .collect();
    format!("{{{}}}", regs.join(", "))
}

/// UAL text of a decoded instruction.
pub fn fmt_decoded(d: &Decoded) -> String {
    let c = d.cond.mnemonic();
    match d.insn {
        Insn::Dp { op, s, rd, rn, op2: o } => {
            let s = if s && !op.is_compare() { "s" } else { "" };
            let m = op.mnemonic();
            if op.is_compare() {
                format!("{m}{c} {rn}, {}", op2(o))
            } else if op.is_move() {
                format!("{m}{s}{c} {rd}, {}", op2(o))
            } else {
                format!("{m}{s}{c} {rd}, {rn}, {}", op2(o))
            }
        }
        Insn::Mem { op, rt, rn, off } => format!("{}{c} {rt}, [{rn}{}]", op.mnemonic(), offset(off)),
        Insn::Branch { link, offset } => {
            let m = if link { "bl" } else { "b" };
            format!("{m}{c} #{}", 8 + 4 * offset)
        }
        Insn::Bx { link, rm } => format!("{}{c} {rm}", if link { "blx" } else { "bx" }),
        Insn::Mrs { rd } => format!("mrs{c} {rd}, apsr"),
        Insn::Msr { fields, src } => {
            let f = if fields == 0x8 { "apsr_nzcvq" } else { "cpsr_fc" };
            format!("msr{c} {f}, {}", op2(src))
        }
        Insn::Push { list } => format!("push{c} {}", reglist(list)),
        Insn::Pop { list } => format!("pop{c} {}", reglist(list)),
        Insn::Mul { s, rd, rm, rs } => format!("mul{}{c} {rd}, {rm}, {rs}", if s { "s" } else { "" }),
        Insn::MulLong { signed, s, lo, hi, rm, rs } => format!(
            "{}mull{}{c} {lo}, {hi}, {rm}, {rs}",
            if signed { "s" } else { "u" },
            if s { "s" } else { "" }
        ),
        Insn::Clz { rd, rm } => format!("clz{c} {rd}, {rm}"),
        Insn::Rev { rd, rm } => format!("rev{c} {rd}, {rm}"),
        Insn::Rev16 { rd, rm } => format!("rev16{c} {rd}, {rm}"),
        Insn::Revsh { rd, rm } => format!("revsh{c} {rd}, {rm}"),
        Insn::Extend { kind, rd, rm, ror: 0 } => format!("{}{c} {rd}, {rm}", kind.mnemonic()),
        Insn::Extend { kind, rd, rm, ror } => format!("{}{c} {rd}, {rm}, ror #{ror}", kind.mnemonic()),
        Insn::Pkh { top: false, rd, rn, rm, shift: 0 } => format!("pkhbt{c} {rd}, {rn}, {rm}"),
        Insn::Pkh { top: false, rd, rn, rm, shift } => format!("pkhbt{c} {rd}, {rn}, {rm}, lsl #{shift}"),
        Insn::Pkh { top: true, rd, rn, rm, shift } => {
            let n = if shift == 0 { 32 } else { shift };
            format!("pkhtb{c} {rd}, {rn}, {rm}, asr #{n}")
        }
    }
}

/// One word of a routine. Words outside the decodable subset (literal slots among
/// them) print as data.
pub fn disassemble(word: u32) -> String {
    match A32Decoder.decode(word) {
        Some(d) => fmt_decoded(&d),
        None => format!(".word {word:#010x}"),
    }
}

/// A listing of `words`, one line per word with its index and encoding. Words in
/// `data` (literal slots) are printed as data even when they happen to decode.
pub fn listing(words: &[u32], data: &[usize]) -> Vec<String> {
    words
        .iter()
        .enumerate()
        .map(|(i, &w)| {
            let text = if data.contains(&i) { format!(".word {w:#010x}") } else { disassemble(w) };
            format!("{i:4}: {w:08x}  {text}")
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn text_matches_ual() {
        assert_eq!(disassemble(0xe093_3002), "adds r3, r3, r2");
        assert_eq!(disassemble(0xe684_4853), "pkhtb r4, r4, r3, asr #16");
        assert_eq!(disassemble(0xe19a_40b5), "ldrh r4, [r10, r5]");
        assert_eq!(disassemble(0xe1cb_41bc), "strh r4, [r11, #28]");
        assert_eq!(disassemble(0xe79b_4103), "ldr r4, [r11, r3, lsl #2]");
        assert_eq!(disassemble(0xe328_f101), "msr apsr_nzcvq, #0x40000000");
        assert_eq!(disassemble(0xe1b0_3062), "movs r3, r2, rrx");
        assert_eq!(disassemble(0x13a0_4001), "movne r4, #0x1");
        assert_eq!(disassemble(0xe6af_4475), "sxtb r4, r5, ror #8");
        assert_eq!(disassemble(0xffff_ffff), ".word 0xffffffff");
    }
}
