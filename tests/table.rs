use m68k_armjit::guest::table::{decode, OPCODES};
use m68k_armjit::guest::{DecodeTable, Ea, Mnemonic, OpcodeEntry, RegRef, Size, TableError};
use pretty_assertions::assert_eq;

#[test]
fn entries_print_like_assembly() {
    for (op, text) in [
        (0xD041, "ADD.W D1,D0"),
        (0x2218, "MOVE.L (A0)+,D1"),
        (0x3F00, "MOVE.W D0,-(A7)"),
        (0x4E75, "RTS"),
        (0x4E71, "NOP"),
        (0x7205, "MOVE.L #5,D1"),
        (0x4840, "SWAP.W D0"),
    ] {
        assert_eq!(decode(op).to_string(), text, "{op:#06x}");
    }
}

#[test]
fn branch_line_is_fully_assigned() {
    for op in 0x6000..=0x6FFFu16 {
        let e = decode(op);
        let want = if (op >> 8) & 15 == 1 { Mnemonic::Bsr } else { Mnemonic::Bcc };
        assert_eq!(e.mnemonic, want, "{op:#06x}");
        assert_eq!(e.cc, ((op >> 8) & 15) as u8);
    }
    assert_eq!(decode(0x6700).ext_words(), 1);
    assert_eq!(decode(0x67FF).ext_words(), 2);
    assert_eq!(decode(0x67FF).clev, 2);
    assert_eq!(decode(0x67FE).src, Some(Ea::Quick(-2)));
}

#[test]
fn supervisor_and_late_cpu_entries_are_marked() {
    assert!(decode(0x4E73).privileged); // RTE
    assert!(decode(0x46FC).privileged); // MOVE #imm,SR
    assert!(!decode(0x44FC).privileged); // MOVE #imm,CCR
    assert_eq!(decode(0x49C0).clev, 2); // EXTB.L D0
    assert_eq!(decode(0x4880).clev, 0); // EXT.W D0
}

#[test]
fn register_fields_follow_the_opcode() {
    let e = decode(0x2A3C); // MOVE.L #imm,D5
    assert_eq!(e.dst, Some(Ea::Dreg(RegRef { n: 5, field: 9 })));
    assert_eq!(e.src, Some(Ea::Imm));
    assert_eq!(e.ext_words(), 2);
    assert_eq!(e.size, Some(Size::Long));
}

#[test]
fn validation_rejects_bad_rows() {
    assert_eq!(DecodeTable::from_entries(Vec::new()).validate(), Err(TableError::Length(0)));

    let rows = || DecodeTable::build().entries().to_vec();

    let mut bad = rows();
    bad[0x4E71] = OpcodeEntry { src: Some(Ea::Imm), ..OpcodeEntry::illegal(0x4E71) };
    assert!(matches!(
        DecodeTable::from_entries(bad).validate(),
        Err(TableError::Inconsistent { index: 0x4E71, .. })
    ));

    let mut bad = rows();
    // ADD.W D1,D0 claiming D3 in the low field
    bad[0xD041].src = Some(Ea::Dreg(RegRef { n: 3, field: 0 }));
    assert!(matches!(
        DecodeTable::from_entries(bad).validate(),
        Err(TableError::Inconsistent { index: 0xD041, .. })
    ));

    let mut bad = rows();
    bad[0x6000].cc = 16;
    assert!(DecodeTable::from_entries(bad).validate().is_err());
}

#[test]
fn serialized_rows_rebuild_the_table() {
    let built = DecodeTable::build();
    let json = serde_json::to_string(built.entries()).unwrap();
    let rows: Vec<OpcodeEntry> = serde_json::from_str(&json).unwrap();
    assert_eq!(rows.len(), OPCODES);
    let rebuilt = DecodeTable::from_entries(rows);
    assert_eq!(rebuilt.validate(), Ok(()));
    assert_eq!(rebuilt.get(0xD041), built.get(0xD041));
}
