use m68k_armjit::encoder::imm::{decode_imm, encode_imm, is_encodable};
use m68k_armjit::encoder::{imm, Assembler, CodeBuffer, EncodeError, Extend, Reg};
use m68k_armjit::host::Machine;
use m68k_armjit::selftest;
use pretty_assertions::assert_eq;

#[test]
fn literal_vectors_pass() {
    let report = selftest::run();
    assert!(report.passed(), "{report}");
    assert!(report.total > 50);
}

#[test]
fn every_immediate_field_folds_to_the_cheapest_form() {
    for field in 0..0x1000u32 {
        let value = decode_imm(field);
        let enc = encode_imm(value).unwrap_or_else(|e| panic!("{field:#05x}: {e}"));
        assert_eq!(decode_imm(enc), value, "{field:#05x}");
        assert!(enc >> 8 <= field >> 8, "{field:#05x} -> {enc:#05x}");
    }
}

#[test]
fn values_without_an_encoding_are_refused() {
    for value in [0x101u32, 0x1FF, 0x00FF_FFFF, 0xFF00_00FF, 0x1234_5678, 0x0001_0001] {
        assert!(!is_encodable(value), "{value:#x}");
        assert_eq!(encode_imm(value), Err(EncodeError::UnencodableImmediate { value }));
    }
    // Wrapping rotations are fine.
    assert!(is_encodable(0xF000_000F));
    assert!(is_encodable(0xC000_003F));
}

#[test]
fn builders_report_range_errors() {
    let mut buf = CodeBuffer::new(16);
    let mut a = Assembler::new(&mut buf);
    assert_eq!(a.b(1 << 23), Err(EncodeError::BranchOutOfRange { offset: 1 << 23 }));
    assert!(a.b((1 << 23) - 1).is_ok());
    assert_eq!(
        a.ldr(Reg::R4, Reg::R11, 4096),
        Err(EncodeError::OffsetOutOfRange { op: "ldr", offset: 4096 })
    );
    assert_eq!(
        a.ldrh(Reg::R4, Reg::R11, -256),
        Err(EncodeError::OffsetOutOfRange { op: "ldrh", offset: -256 })
    );
    assert!(a.ldrh(Reg::R4, Reg::R11, -255).is_ok());
    assert_eq!(a.mov(Reg::R4, imm(0x101)), Err(EncodeError::UnencodableImmediate { value: 0x101 }));
    assert!(matches!(a.lsl(Reg::R4, Reg::R4, 32), Err(EncodeError::ShiftOutOfRange { .. })));
    assert!(matches!(a.extend(Extend::Sxtb, Reg::R4, Reg::R5, 4), Err(EncodeError::BadRotation { .. })));
    // Failed builders emit nothing.
    assert_eq!(a.pos(), 2);
}

#[test]
fn full_buffers_refuse_more_words() {
    let mut buf = CodeBuffer::new(2);
    {
        let mut a = Assembler::new(&mut buf);
        a.nop().unwrap();
        a.nop().unwrap();
        assert_eq!(a.nop(), Err(EncodeError::BufferFull { capacity: 2 }));
    }
    assert_eq!(buf.remaining(), 0);
    assert_eq!(buf.finalize(), vec![0xE1A0_0000; 2]);
}

#[test]
fn patches_stay_inside_the_stream() {
    let mut buf = CodeBuffer::new(4);
    buf.emit(1).unwrap();
    buf.patch(0, 7).unwrap();
    assert_eq!(buf.patch(1, 7), Err(EncodeError::PatchOutOfRange { index: 1, len: 1 }));
    assert_eq!(buf.read(0), Some(7));
}

#[test]
fn constants_materialise_on_the_host_model() {
    let mut m = Machine::new();
    for value in [0u32, 0xFF, 0xFF00, 0xFFFF_FFFE, 0x1234_5678, 0x8000_0001, 0x00FF_FFFF] {
        let mut buf = CodeBuffer::new(8);
        Assembler::new(&mut buf).load_const(Reg::R4, value).unwrap();
        let words = buf.finalize();
        assert!(words.len() == 1 || words.len() == 3, "{value:#x}");
        m.run_code(&words).unwrap();
        assert_eq!(m.cpu.r[4], value, "{value:#x}");
    }
}

#[test]
fn conditional_prefix_applies_to_one_instruction() {
    let mut buf = CodeBuffer::new(4);
    {
        let mut a = Assembler::new(&mut buf);
        a.cond(m68k_armjit::Cond::Ne).mov(Reg::R4, imm(1)).unwrap();
        a.mov(Reg::R4, imm(1)).unwrap();
    }
    let w = buf.finalize();
    assert_eq!(w[0] >> 28, 0x1);
    assert_eq!(w[1] >> 28, 0xE);
    assert_eq!(w[0] & 0x0FFF_FFFF, w[1] & 0x0FFF_FFFF);
}
