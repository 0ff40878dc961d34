//! Literal encoding vectors for the word builders and a few composites.
//!
//! Every expected word was cross-checked against an independent assembler. [`run`]
//! rebuilds each vector into a fresh buffer and reports mismatches; it also checks
//! that every 8-bit-rotated immediate folds back to an encoding of the same value.

use crate::cond::Cond;
use crate::encoder::composite::{self, HostFeatures, Width};
use crate::encoder::imm::{decode_imm, encode_imm};
use crate::encoder::{Assembler, CodeBuffer, EncodeError, Offset, Reg, Shift};
use std::fmt;
use tracing::{debug, info};

pub type Build = fn(&mut Assembler<'_>) -> Result<(), EncodeError>;

pub struct Vector {
    pub name: &'static str,
    pub build: Build,
    pub expected: Result<Vec<u32>, EncodeError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub name: String,
    pub expected: Result<Vec<u32>, EncodeError>,
    pub got: Result<Vec<u32>, EncodeError>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    pub total: usize,
    pub failures: Vec<Failure>,
}

impl Report {
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }
}

fn words(r: &Result<Vec<u32>, EncodeError>) -> String {
    match r {
        Ok(w) => w.iter().map(|w| format!("{w:08x}")).collect::<Vec<_>>().join(" "),
        Err(e) => format!("error: {e}"),
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for x in &self.failures {
            writeln!(f, "FAIL {}: expected [{}], got [{}]", x.name, words(&x.expected), words(&x.got))?;
        }
        write!(f, "{} of {} vectors passed", self.total - self.failures.len(), self.total)
    }
}

macro_rules! vectors {
    ($($name:literal: |$a:ident| $build:expr => $expected:expr;)*) => {
        vec![$(Vector { name: $name, build: |$a| $build, expected: $expected },)*]
    };
}

fn ok(w: &[u32]) -> Result<Vec<u32>, EncodeError> {
    Ok(w.to_vec())
}

const ARMV6: HostFeatures = HostFeatures::ARMV6;

pub fn vectors() -> Vec<Vector> {
    use crate::encoder::imm as i;
    vectors! {
        // data processing
        "add reg": |a| a.add(Reg::R4, Reg::R5, Reg::R6) => ok(&[0xe085_4006]);
        "adds imm rot": |a| a.adds(Reg::R4, Reg::R5, i(0xff00_0000)) => ok(&[0xe295_44ff]);
        "sub lsl imm": |a| a.sub(Reg::R7, Reg::R8, Reg::R9.lsl(3)) => ok(&[0xe048_7189]);
        "subs asr 32": |a| a.subs(Reg::R2, Reg::R2, Reg::R3.asr(32)) => ok(&[0xe052_2043]);
        "rsb zero": |a| a.rsb(Reg::R4, Reg::R4, i(0)) => ok(&[0xe264_4000]);
        "rsbs lsr reg": |a| a.rsbs(Reg::R5, Reg::R6, Reg::R7.lsr_reg(Reg::R8)) => ok(&[0xe076_5837]);
        "adc": |a| a.adc(Reg::R4, Reg::R4, Reg::R5) => ok(&[0xe0a4_4005]);
        "adcs lsl 24": |a| a.adcs(Reg::R2, Reg::R2, Reg::R3.lsl(24)) => ok(&[0xe0b2_2c03]);
        "sbc": |a| a.sbc(Reg::R4, Reg::R4, Reg::R5) => ok(&[0xe0c4_4005]);
        "sbcs": |a| a.sbcs(Reg::R2, Reg::R2, Reg::R3) => ok(&[0xe0d2_2003]);
        "rsc imm": |a| a.rsc(Reg::R4, Reg::R5, i(1)) => ok(&[0xe2e5_4001]);
        "and imm": |a| a.and(Reg::R4, Reg::R5, i(0xff)) => ok(&[0xe205_40ff]);
        "ands ror": |a| a.ands(Reg::R4, Reg::R5, Reg::R6.ror(8)) => ok(&[0xe015_4466]);
        "orr lsl reg": |a| a.orr(Reg::R4, Reg::R4, Reg::R5.lsl_reg(Reg::R6)) => ok(&[0xe184_4615]);
        "orrs imm": |a| a.orrs(Reg::R2, Reg::R2, i(0x1_0000)) => ok(&[0xe392_2801]);
        "eor": |a| a.eor(Reg::R4, Reg::R5, Reg::R6) => ok(&[0xe025_4006]);
        "eors asr reg": |a| a.eors(Reg::R4, Reg::R5, Reg::R6.asr_reg(Reg::R7)) => ok(&[0xe035_4756]);
        "eor smallest rotation": |a| a.eor(Reg::R2, Reg::R2, i(composite::FLAG_C)) => ok(&[0xe222_2202]);
        "bic imm": |a| a.bic(Reg::R3, Reg::R3, i(0x4000_0000)) => ok(&[0xe3c3_3101]);
        "bics imm": |a| a.bics(Reg::R4, Reg::R5, i(0xff)) => ok(&[0xe3d5_40ff]);
        "mov reg": |a| a.mov(Reg::R4, Reg::R5) => ok(&[0xe1a0_4005]);
        "movs rrx": |a| a.movs(Reg::R3, Reg::R2.rrx()) => ok(&[0xe1b0_3062]);
        "mov imm rot 30": |a| a.mov(Reg::R4, i(0x3fc)) => ok(&[0xe3a0_4fff]);
        "mvn zero": |a| a.mvn(Reg::R4, i(0)) => ok(&[0xe3e0_4000]);
        "mvns lsr": |a| a.mvns(Reg::R4, Reg::R5.lsr(16)) => ok(&[0xe1f0_4825]);
        "cmp imm": |a| a.cmp(Reg::R4, i(0)) => ok(&[0xe354_0000]);
        "cmp lsl": |a| a.cmp(Reg::R2, Reg::R3.lsl(16)) => ok(&[0xe152_0803]);
        "cmn imm": |a| a.cmn(Reg::R2, i(0x1_0000)) => ok(&[0xe372_0801]);
        "tst imm": |a| a.tst(Reg::R4, i(0x80)) => ok(&[0xe314_0080]);
        "teq reg": |a| a.teq(Reg::R4, Reg::R5) => ok(&[0xe134_0005]);
        "lsl helper": |a| a.lsl(Reg::R2, Reg::R5, 24) => ok(&[0xe1a0_2c05]);
        "lsr helper": |a| a.lsr(Reg::R2, Reg::R2, 29) => ok(&[0xe1a0_2ea2]);
        "unencodable imm": |a| a.add(Reg::R4, Reg::R5, i(0x101))
            => Err(EncodeError::UnencodableImmediate { value: 0x101 });
        "lsl 32 rejected": |a| a.mov(Reg::R4, Reg::R5.lsl(32))
            => Err(EncodeError::ShiftOutOfRange { kind: "lsl", amount: 32 });
        // conditional execution
        "moveq": |a| a.cond(Cond::Eq).mov(Reg::R4, i(1)) => ok(&[0x03a0_4001]);
        "movne": |a| a.cond(Cond::Ne).mov(Reg::R4, i(0)) => ok(&[0x13a0_4000]);
        "movcs": |a| a.cond(Cond::Cs).mov(Reg::R4, Reg::R5) => ok(&[0x21a0_4005]);
        "addhi": |a| a.cond(Cond::Hi).add(Reg::R4, Reg::R4, i(1)) => ok(&[0x8284_4001]);
        "strbne": |a| a.cond(Cond::Ne).strb(Reg::R4, Reg::R11, 68) => ok(&[0x15cb_4044]);
        // memory
        "ldr imm": |a| a.ldr(Reg::R4, Reg::R11, 64) => ok(&[0xe59b_4040]);
        "ldr neg imm": |a| a.ldr(Reg::R4, Reg::R11, -4) => ok(&[0xe51b_4004]);
        "str zero": |a| a.str(Reg::R4, Reg::R11, 0) => ok(&[0xe58b_4000]);
        "ldr reg": |a| a.ldr(Reg::R4, Reg::R10, Reg::R5) => ok(&[0xe79a_4005]);
        "ldr neg reg": |a| a.ldr(Reg::R4, Reg::R10, Offset::NegReg(Reg::R5)) => ok(&[0xe71a_4005]);
        "ldr scaled": |a| a.ldr(Reg::R4, Reg::R11, Offset::Shifted { rm: Reg::R3, shift: Shift::Lsl(2), subtract: false })
            => ok(&[0xe79b_4103]);
        "ldrb reg": |a| a.ldrb(Reg::R4, Reg::R10, Reg::R5) => ok(&[0xe7da_4005]);
        "strb imm": |a| a.strb(Reg::R4, Reg::R11, 68) => ok(&[0xe5cb_4044]);
        "ldrh reg": |a| a.ldrh(Reg::R4, Reg::R10, Reg::R5) => ok(&[0xe19a_40b5]);
        "strh imm": |a| a.strh(Reg::R4, Reg::R11, 28) => ok(&[0xe1cb_41bc]);
        "ldrh neg imm": |a| a.ldrh(Reg::R4, Reg::R11, -2) => ok(&[0xe15b_40b2]);
        "ldrsb reg": |a| a.ldrsb(Reg::R4, Reg::R10, Reg::R5) => ok(&[0xe19a_40d5]);
        "ldrsh reg": |a| a.ldrsh(Reg::R4, Reg::R10, Reg::R5) => ok(&[0xe19a_40f5]);
        "ldrh offset too large": |a| a.ldrh(Reg::R4, Reg::R11, 256)
            => Err(EncodeError::OffsetOutOfRange { op: "ldrh", offset: 256 });
        "push": |a| a.push(Reg::R4.mask() | Reg::R5.mask() | Reg::LR.mask()) => ok(&[0xe92d_4030]);
        "pop": |a| a.pop(Reg::R4.mask() | Reg::R5.mask() | Reg::PC.mask()) => ok(&[0xe8bd_8030]);
        // branches and status
        "b back": |a| a.b(-2) => ok(&[0xeaff_fffe]);
        "bl forward": |a| a.bl(64) => ok(&[0xeb00_0040]);
        "bne": |a| a.cond(Cond::Ne).b(2) => ok(&[0x1a00_0002]);
        "bx lr": |a| a.bx(Reg::LR) => ok(&[0xe12f_ff1e]);
        "blx reg": |a| a.blx(Reg::R4) => ok(&[0xe12f_ff34]);
        "mrs": |a| a.mrs(Reg::R2) => ok(&[0xe10f_2000]);
        "msr reg": |a| a.msr_flags(Reg::R2) => ok(&[0xe128_f002]);
        "msr imm": |a| a.msr_flags(i(0x4000_0000)) => ok(&[0xe328_f101]);
        // multiply and misc
        "mul": |a| a.mul(Reg::R4, Reg::R5, Reg::R6) => ok(&[0xe004_0695]);
        "muls": |a| a.muls(Reg::R4, Reg::R5, Reg::R6) => ok(&[0xe014_0695]);
        "smull": |a| a.smull(Reg::R4, Reg::R5, Reg::R6, Reg::R7) => ok(&[0xe0c5_4796]);
        "umull": |a| a.umull(Reg::R4, Reg::R5, Reg::R6, Reg::R7) => ok(&[0xe085_4796]);
        "clz": |a| a.clz(Reg::R4, Reg::R5) => ok(&[0xe16f_4f15]);
        "rev": |a| a.rev(Reg::R4, Reg::R5) => ok(&[0xe6bf_4f35]);
        "rev16": |a| a.rev16(Reg::R4, Reg::R5) => ok(&[0xe6bf_4fb5]);
        "revsh": |a| a.revsh(Reg::R4, Reg::R5) => ok(&[0xe6ff_4fb5]);
        "sxtb": |a| a.sxtb(Reg::R4, Reg::R5) => ok(&[0xe6af_4075]);
        "sxth ror": |a| a.extend(crate::encoder::Extend::Sxth, Reg::R4, Reg::R5, 16) => ok(&[0xe6bf_4875]);
        "uxtb": |a| a.uxtb(Reg::R4, Reg::R5) => ok(&[0xe6ef_4075]);
        "uxth": |a| a.uxth(Reg::R4, Reg::R5) => ok(&[0xe6ff_4075]);
        "pkhbt": |a| a.pkhbt(Reg::R4, Reg::R5, Reg::R6, 16) => ok(&[0xe685_4816]);
        "pkhtb": |a| a.pkhtb(Reg::R4, Reg::R5, Reg::R6, 16) => ok(&[0xe685_4856]);
        "nop": |a| a.nop() => ok(&[0xe1a0_0000]);
        // constants
        "load_const rotated": |a| a.load_const(Reg::R4, 0x0100_0000) => ok(&[0xe3a0_4401]);
        "load_const mvn": |a| a.load_const(Reg::R4, 0xffff_ff00) => ok(&[0xe3e0_40ff]);
        "load_const literal": |a| a.load_const(Reg::R4, 0x1234_5678)
            => ok(&[0xe59f_4000, 0xea00_0000, 0x1234_5678]);
        // composites
        "invert_carry": |a| composite::invert_carry(a) => ok(&[0xe10f_2000, 0xe222_2202, 0xe128_f002]);
        "add.b": |a| composite::add(a, Width::B8, Reg::R4, Reg::R5, ARMV6)
            => ok(&[0xe1a0_2c05, 0xe1a0_3c04, 0xe093_3002, 0xe3c4_40ff, 0xe184_4c23]);
        "merge.w": |a| composite::merge(a, Width::B16, Reg::R4, ARMV6) => ok(&[0xe684_4853]);
        "duplicate_carry": |a| composite::duplicate_carry(a, Reg::R11, 68)
            => ok(&[0xe10f_2000, 0xe1a0_2ea2, 0xe202_2001, 0xe5cb_2044]);
        "cmov hi": |a| composite::cmov(a, Cond::Hi, Reg::R4, Reg::R5)
            => ok(&[0x0a00_0001, 0x2a00_0000, 0xe1a0_4005]);
        "setcc eq": |a| composite::setcc(a, Cond::Eq, Reg::R4) => ok(&[0x03a0_4001, 0x13a0_4000]);
    }
}

impl Vector {
    /// `name: [built] expected [words]`, one line per vector.
    pub fn line(&self) -> String {
        format!("{}: [{}] expected [{}]", self.name, words(&build(self)), words(&self.expected))
    }
}

fn build(v: &Vector) -> Result<Vec<u32>, EncodeError> {
    let mut buf = CodeBuffer::new(16);
    (v.build)(&mut Assembler::new(&mut buf))?;
    Ok(buf.finalize())
}

/// Every `base ror 2*rot` folds to some encoding of the same value.
fn immediate_failures() -> Vec<Failure> {
    let mut out = Vec::new();
    for field in 0..0x1000u32 {
        let value = decode_imm(field);
        match encode_imm(value) {
            Ok(f) if decode_imm(f) == value => {}
            got => out.push(Failure {
                name: format!("immediate {value:#010x}"),
                expected: Ok(vec![field]),
                got: got.map(|f| vec![f]),
            }),
        }
    }
    out
}

pub fn run() -> Report {
    let vs = vectors();
    let mut report = Report { total: vs.len() + 1, failures: Vec::new() };
    for v in &vs {
        let got = build(v);
        debug!(name = v.name, ok = got == v.expected, "vector");
        if got != v.expected {
            report.failures.push(Failure { name: v.name.to_string(), expected: v.expected.clone(), got });
        }
    }
    report.failures.extend(immediate_failures());
    info!(total = report.total, failed = report.failures.len(), "self-test finished");
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_vectors_pass() {
        let report = run();
        assert!(report.passed(), "{report}");
    }

    #[test]
    fn vector_lines_show_both_words() {
        let vs = vectors();
        let v = vs.iter().find(|v| v.name == "moveq").unwrap();
        assert_eq!(v.line(), "moveq: [03a04001] expected [03a04001]");
    }

    #[test]
    fn names_are_unique() {
        let vs = vectors();
        let mut names: Vec<_> = vs.iter().map(|v| v.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), vs.len());
    }
}
