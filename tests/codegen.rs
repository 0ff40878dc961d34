use m68k_armjit::codegen::{generate, GenEnv, InstantiateError, Variant};
use m68k_armjit::guest::table::decode;
use m68k_armjit::host::{Cpsr, GuestState, Machine, MachineError};
use m68k_armjit::RoutineFlags;
use pretty_assertions::assert_eq;

const PC: u32 = 0x1000;

fn state() -> GuestState {
    GuestState { pc: PC, ..GuestState::default() }
}

fn run_on(m: &mut Machine, op: u16, ext: &[u16], variant: Variant, s: &GuestState) -> GuestState {
    let routine = generate(&decode(op), variant, &GenEnv::default());
    m.execute(&routine, ext, s)
        .unwrap_or_else(|e| panic!("{op:#06x} {variant}: {e}"))
}

fn run(op: u16, ext: &[u16], s: &GuestState) -> GuestState {
    run_on(&mut Machine::new(), op, ext, Variant::Ff, s)
}

#[test]
fn add_byte_keeps_the_upper_bits() {
    // ADD.B D0,D1
    let mut s = state();
    s.d[0] = 0x80;
    s.d[1] = 0x1234_5680;
    let out = run(0xD200, &[], &s);
    assert_eq!(out.d[1], 0x1234_5600);
    assert_eq!(out.ccr, Cpsr::Z | Cpsr::V | Cpsr::C);
    assert!(out.x);
    assert_eq!(out.pc, PC + 2);
}

#[test]
fn sub_word_borrows() {
    // SUB.W D0,D1
    let mut s = state();
    s.d[0] = 2;
    s.d[1] = 0xAAAA_0001;
    let out = run(0x9240, &[], &s);
    assert_eq!(out.d[1], 0xAAAA_FFFF);
    assert_eq!(out.ccr, Cpsr::N | Cpsr::C);
    assert!(out.x);
}

#[test]
fn nf_add_leaves_x_alone() {
    let mut s = state();
    s.d[0] = 0xFF;
    s.d[1] = 0x01;
    let out = run_on(&mut Machine::new(), 0xD200, &[], Variant::Nf, &s);
    assert_eq!(out.d[1], 0x00);
    assert!(!out.x);
}

#[test]
fn move_long_postincrement() {
    // MOVE.L (A0)+,D1
    let mut m = Machine::new();
    m.guest_write_u32(0x100, 0xDEAD_BEEF).unwrap();
    let mut s = state();
    s.a[0] = 0x100;
    s.x = true;
    let out = run_on(&mut m, 0x2218, &[], Variant::Ff, &s);
    assert_eq!(out.d[1], 0xDEAD_BEEF);
    assert_eq!(out.a[0], 0x104);
    assert_eq!(out.ccr, Cpsr::N);
    assert!(out.x);
}

#[test]
fn predecrement_stores_big_endian() {
    // MOVE.W D0,-(A7)
    let mut m = Machine::new();
    let mut s = state();
    s.d[0] = 0xFFFF_1234;
    s.a[7] = 0x200;
    let out = run_on(&mut m, 0x3F00, &[], Variant::Ff, &s);
    assert_eq!(out.a[7], 0x1FE);
    assert_eq!(m.guest_read_u16(0x1FE).unwrap(), 0x1234);
    assert_eq!(m.guest_read_u8(0x1FE).unwrap(), 0x12);
}

#[test]
fn byte_push_keeps_the_stack_even() {
    // MOVE.B D0,-(A7)
    let mut m = Machine::new();
    let mut s = state();
    s.d[0] = 0x42;
    s.a[7] = 0x200;
    let out = run_on(&mut m, 0x1F00, &[], Variant::Nf, &s);
    assert_eq!(out.a[7], 0x1FE);
    assert_eq!(m.guest_read_u8(0x1FE).unwrap(), 0x42);

    // MOVE.B D0,-(A6) steps by one.
    s.a[6] = 0x200;
    let out = run_on(&mut m, 0x1D00, &[], Variant::Nf, &s);
    assert_eq!(out.a[6], 0x1FF);
}

#[test]
fn branches_write_the_pc_slot() {
    // BRA.S *+6
    let out = run(0x6004, &[], &state());
    assert_eq!(out.pc, PC + 6);

    // BEQ.W *+0x12
    let mut s = state();
    s.ccr = Cpsr::Z;
    assert_eq!(run(0x6700, &[0x0010], &s).pc, PC + 0x12);
    s.ccr = Cpsr::empty();
    assert_eq!(run(0x6700, &[0x0010], &s).pc, PC + 4);
}

#[test]
fn unsigned_branches_use_the_guest_carry() {
    // BHI.S *+0x12: taken when C and Z are both clear.
    for (ccr, taken) in [
        (Cpsr::empty(), true),
        (Cpsr::C, false),
        (Cpsr::Z, false),
        (Cpsr::N | Cpsr::V, true),
    ] {
        let s = GuestState { ccr, ..state() };
        let want = if taken { PC + 0x12 } else { PC + 2 };
        assert_eq!(run(0x6210, &[], &s).pc, want, "{ccr:?}");
        // BLS is the complement.
        let want = if taken { PC + 2 } else { PC + 0x12 };
        assert_eq!(run(0x6310, &[], &s).pc, want, "{ccr:?}");
    }
}

#[test]
fn dbf_counts_down_and_falls_through_at_minus_one() {
    // DBF D0,*-2
    let mut s = state();
    s.d[0] = 0xABCD_0002;
    s.ccr = Cpsr::N | Cpsr::C;
    let out = run(0x51C8, &[0xFFFC], &s);
    assert_eq!(out.d[0], 0xABCD_0001);
    assert_eq!(out.pc, PC + 2 - 4);
    assert_eq!(out.ccr, Cpsr::N | Cpsr::C);

    s.d[0] = 0xABCD_0000;
    let out = run(0x51C8, &[0xFFFC], &s);
    assert_eq!(out.d[0], 0xABCD_FFFF);
    assert_eq!(out.pc, PC + 4);
}

#[test]
fn dbeq_exits_when_the_condition_holds() {
    let mut s = state();
    s.d[0] = 5;
    s.ccr = Cpsr::Z;
    let out = run(0x57C8, &[0xFFFC], &s);
    assert_eq!(out.d[0], 5);
    assert_eq!(out.pc, PC + 4);
}

#[test]
fn scc_writes_a_byte_mask() {
    // SEQ D0
    let mut s = state();
    s.d[0] = 0x1234_5600;
    s.ccr = Cpsr::Z;
    assert_eq!(run(0x57C0, &[], &s).d[0], 0x1234_56FF);
    s.d[0] = 0x1234_56AA;
    s.ccr = Cpsr::empty();
    assert_eq!(run(0x57C0, &[], &s).d[0], 0x1234_5600);
}

#[test]
fn shifts_produce_carry_and_extend() {
    // LSR.B #1,D0
    let mut s = state();
    s.d[0] = 0xFFFF_FF81;
    let out = run(0xE208, &[], &s);
    assert_eq!(out.d[0], 0xFFFF_FF40);
    assert_eq!(out.ccr, Cpsr::C);
    assert!(out.x);

    // ROXL.B #1,D0 rotates X in at the bottom.
    let mut s = state();
    s.d[0] = 0x80;
    s.x = true;
    let out = run(0xE310, &[], &s);
    assert_eq!(out.d[0], 0x01);
    assert_eq!(out.ccr, Cpsr::C);
    assert!(out.x);
}

#[test]
fn shift_by_its_own_register_fails_the_guard() {
    // LSL.W D0,D0
    let r = generate(&decode(0xE168), Variant::Ff, &GenEnv::default());
    assert!(r.may_fail);
    let err = Machine::new().execute(&r, &[], &state()).unwrap_err();
    assert!(matches!(err, MachineError::Instantiate(InstantiateError::GuardFailed(_))), "{err}");

    // LSL.W D1,D0 shares the template and runs.
    let mut s = state();
    s.d[0] = 0xAAAA_0001;
    s.d[1] = 4;
    let out = run_on(&mut Machine::new(), 0xE368, &[], Variant::Ff, &s);
    assert_eq!(out.d[0], 0xAAAA_0010);
    assert_eq!(out.ccr, Cpsr::empty());
}

#[test]
fn bit_test_sets_z_from_the_inverted_bit() {
    // BTST #3,D0
    let mut s = state();
    s.d[0] = 0x08;
    let out = run(0x0800, &[0x0003], &s);
    assert!(!out.ccr.contains(Cpsr::Z));
    assert_eq!(out.pc, PC + 4);
    s.d[0] = 0xF7;
    assert!(run(0x0800, &[0x0003], &s).ccr.contains(Cpsr::Z));
}

#[test]
fn jsr_and_rts_pair_up() {
    let mut m = Machine::new();
    let mut s = state();
    s.a[0] = 0x4000;
    s.a[7] = 0x300;
    // JSR (A0)
    let called = run_on(&mut m, 0x4E90, &[], Variant::Nf, &s);
    assert_eq!(called.pc, 0x4000);
    assert_eq!(called.a[7], 0x2FC);
    assert_eq!(m.guest_read_u32(0x2FC).unwrap(), PC + 2);
    // RTS
    let back = run_on(&mut m, 0x4E75, &[], Variant::Nf, &called);
    assert_eq!(back.pc, PC + 2);
    assert_eq!(back.a[7], 0x300);
}

#[test]
fn bsr_pushes_the_return_address() {
    let mut m = Machine::new();
    let mut s = state();
    s.a[7] = 0x500;
    let out = run_on(&mut m, 0x6108, &[], Variant::Ff, &s);
    assert_eq!(out.pc, PC + 10);
    assert_eq!(out.a[7], 0x4FC);
    assert_eq!(m.guest_read_u32(0x4FC).unwrap(), PC + 2);
}

#[test]
fn jmp_absolute_long() {
    let out = run(0x4EF9, &[0x0001, 0x2345], &state());
    assert_eq!(out.pc, 0x0001_2345);
}

#[test]
fn link_and_unlk_build_and_drop_a_frame() {
    let mut m = Machine::new();
    let mut s = state();
    s.a[6] = 0x1111;
    s.a[7] = 0x400;
    // LINK A6,#-8
    let linked = run_on(&mut m, 0x4E56, &[0xFFF8], Variant::Ff, &s);
    assert_eq!(linked.a[6], 0x3FC);
    assert_eq!(linked.a[7], 0x3F4);
    assert_eq!(m.guest_read_u32(0x3FC).unwrap(), 0x1111);
    assert_eq!(linked.pc, PC + 4);
    // UNLK A6
    let unlinked = run_on(&mut m, 0x4E5E, &[], Variant::Ff, &linked);
    assert_eq!(unlinked.a[6], 0x1111);
    assert_eq!(unlinked.a[7], 0x400);
}

#[test]
fn register_only_operations() {
    let mut s = state();
    // SWAP D0
    s.d[0] = 0x1234_5678;
    let out = run(0x4840, &[], &s);
    assert_eq!(out.d[0], 0x5678_1234);
    assert_eq!(out.ccr, Cpsr::empty());

    // EXT.W D0
    s.d[0] = 0x1234_5680;
    let out = run(0x4880, &[], &s);
    assert_eq!(out.d[0], 0x1234_FF80);
    assert_eq!(out.ccr, Cpsr::N);

    // MULU.W D1,D0
    s.d[0] = 0xFFFF_0003;
    s.d[1] = 0x0007_0004;
    assert_eq!(run(0xC0C1, &[], &s).d[0], 12);

    // CLR.W D0
    s.d[0] = 0xFFFF_FFFF;
    let out = run(0x4240, &[], &s);
    assert_eq!(out.d[0], 0xFFFF_0000);
    assert_eq!(out.ccr, Cpsr::Z);

    // NEG.L D0
    s.d[0] = 5;
    let out = run(0x4480, &[], &s);
    assert_eq!(out.d[0], 0xFFFF_FFFB);
    assert_eq!(out.ccr, Cpsr::N | Cpsr::C);
    assert!(out.x);
}

#[test]
fn compare_only_touches_flags() {
    // CMP.L D0,D1
    let mut s = state();
    s.d[0] = 2;
    s.d[1] = 1;
    let out = run(0xB280, &[], &s);
    assert_eq!((out.d[0], out.d[1]), (2, 1));
    assert_eq!(out.ccr, Cpsr::N | Cpsr::C);
    assert!(!out.x);
}

#[test]
fn addx_keeps_zero_sticky() {
    // ADDX.B D0,D1
    let mut s = state();
    s.d[0] = 0xFF;
    s.d[1] = 0x00;
    s.x = true;
    s.ccr = Cpsr::Z;
    let out = run(0xD300, &[], &s);
    assert_eq!(out.d[1], 0x00);
    assert_eq!(out.ccr, Cpsr::Z | Cpsr::C);
    assert!(out.x);

    // A nonzero result clears Z and it stays cleared.
    s.d[1] = 0x01;
    let out = run(0xD300, &[], &s);
    assert_eq!(out.d[1], 0x01);
    assert_eq!(out.ccr, Cpsr::C);
}

#[test]
fn tst_memory_byte() {
    // TST.B (A0)
    let mut m = Machine::new();
    m.guest_write(0x100, &[0x80]).unwrap();
    let mut s = state();
    s.a[0] = 0x100;
    s.ccr = Cpsr::C | Cpsr::V;
    let out = run_on(&mut m, 0x4A10, &[], Variant::Ff, &s);
    assert_eq!(out.ccr, Cpsr::N);
}

#[test]
fn lea_displacement() {
    // LEA 16(A0),A1
    let mut s = state();
    s.a[0] = 0x100;
    let out = run(0x43E8, &[0x0010], &s);
    assert_eq!(out.a[1], 0x110);
    assert_eq!(out.pc, PC + 4);
}

#[test]
fn indexed_operands_decode_the_brief_word() {
    // MOVE.L 4(A0,D1.W),D2
    let mut m = Machine::new();
    m.guest_write_u32(0x10C, 0xCAFE_F00D).unwrap();
    let mut s = state();
    s.a[0] = 0x100;
    s.d[1] = 0xFFFF_0008;
    let out = run_on(&mut m, 0x2430, &[0x1004], Variant::Nf, &s);
    assert_eq!(out.d[2], 0xCAFE_F00D);

    // Long index with scale 2: 4 + (4 << 1)
    s.d[1] = 4;
    let out = run_on(&mut m, 0x2430, &[0x1A04], Variant::Nf, &s);
    assert_eq!(out.d[2], 0xCAFE_F00D);

    // The full extension format is left to the interpreter.
    let r = generate(&decode(0x2430), Variant::Nf, &GenEnv::default());
    assert!(r.may_fail);
    assert!(m.execute(&r, &[0x1104], &s).is_err());
}

#[test]
fn failed_routines_do_not_execute() {
    for op in [0xC100u16, 0x4E73, 0x0108] {
        let r = generate(&decode(op), Variant::Ff, &GenEnv::default());
        assert!(r.is_failed());
        assert!(matches!(
            Machine::new().execute(&r, &[0; 4], &state()),
            Err(MachineError::Hole { opcode }) if opcode == op
        ));
    }
}

#[test]
fn jump_flags_match_control_flow() {
    let env = GenEnv::default();
    let flags = |op: u16| generate(&decode(op), Variant::Ff, &env).flags;
    assert!(flags(0x6004).contains(RoutineFlags::JUMP));
    assert!(!flags(0x6004).contains(RoutineFlags::COND_JUMP));
    assert!(flags(0x6604).contains(RoutineFlags::COND_JUMP));
    assert!(flags(0x4E75).contains(RoutineFlags::JUMP));
    assert!(!flags(0xD200).contains(RoutineFlags::JUMP));
    assert!(flags(0xD300).contains(RoutineFlags::ADDX));
}

#[test]
fn armv5_sequences_compute_the_same_results() {
    let v5 = GenEnv { host: m68k_armjit::encoder::HostFeatures::ARMV5, ..GenEnv::default() };
    let mut m = Machine::new();
    m.guest_write_u32(0x100, 0x8000_1234).unwrap();
    let mut s = state();
    s.a[0] = 0x100;
    s.d[1] = 0x5555_5555;
    for op in [0x2218u16, 0x3218, 0x1218, 0xD240, 0x9240] {
        let a = m.execute(&generate(&decode(op), Variant::Ff, &GenEnv::default()), &[], &s).unwrap();
        let b = m.execute(&generate(&decode(op), Variant::Ff, &v5), &[], &s).unwrap();
        assert_eq!(a, b, "{op:#06x}");
    }
}

/// One data-register shift: D0 is the operand, D1 the count, C and V start set.
struct ShiftCase {
    op: u16,
    what: &'static str,
    d0: u32,
    d1: u32,
    x: bool,
    want: u32,
    ccr: Cpsr,
    want_x: bool,
}

#[test]
fn shift_edges() {
    let cases = [
        ShiftCase { op: 0xE500, what: "ASL.B #2 overflows through the sign", d0: 0x40, d1: 0, x: false, want: 0x00, ccr: Cpsr::Z | Cpsr::V | Cpsr::C, want_x: true },
        ShiftCase { op: 0xE240, what: "ASR.W #1 fills with the sign", d0: 0x0000_8001, d1: 0, x: false, want: 0x0000_C000, ccr: Cpsr::N | Cpsr::C, want_x: true },
        ShiftCase { op: 0xE2A0, what: "ASR.L by 40", d0: 0x8000_0000, d1: 40, x: false, want: 0xFFFF_FFFF, ccr: Cpsr::N | Cpsr::C, want_x: true },
        ShiftCase { op: 0xE3A8, what: "LSL.L by 0", d0: 0x1234_5678, d1: 0, x: true, want: 0x1234_5678, ccr: Cpsr::empty(), want_x: true },
        ShiftCase { op: 0xE228, what: "LSR.B by the operand size", d0: 0xAAAA_AA80, d1: 8, x: false, want: 0xAAAA_AA00, ccr: Cpsr::Z | Cpsr::C, want_x: true },
        ShiftCase { op: 0xE2A8, what: "LSR.L by 33", d0: 0xFFFF_FFFF, d1: 33, x: true, want: 0, ccr: Cpsr::Z, want_x: false },
        ShiftCase { op: 0xE378, what: "ROL.W by 16", d0: 0x1234_8001, d1: 16, x: true, want: 0x1234_8001, ccr: Cpsr::N | Cpsr::C, want_x: true },
        ShiftCase { op: 0xE218, what: "ROR.B #1 leaves X", d0: 0x01, d1: 0, x: false, want: 0x80, ccr: Cpsr::N | Cpsr::C, want_x: false },
        ShiftCase { op: 0xE3B0, what: "ROXL.L by 1", d0: 0x8000_0001, d1: 1, x: false, want: 0x0000_0002, ccr: Cpsr::C, want_x: true },
        ShiftCase { op: 0xE230, what: "ROXR.B by 3", d0: 0x05, d1: 3, x: true, want: 0x60, ccr: Cpsr::C, want_x: true },
        ShiftCase { op: 0xE270, what: "ROXR.W by 17 is a full turn", d0: 0xABCD_1234, d1: 17, x: true, want: 0xABCD_1234, ccr: Cpsr::C, want_x: true },
        ShiftCase { op: 0xE370, what: "ROXL.W by 64 copies X into C", d0: 0x8000, d1: 64, x: true, want: 0x8000, ccr: Cpsr::N | Cpsr::C, want_x: true },
    ];
    for c in &cases {
        let mut s = state();
        s.d[0] = c.d0;
        s.d[1] = c.d1;
        s.x = c.x;
        s.ccr = Cpsr::C | Cpsr::V;
        let out = run(c.op, &[], &s);
        assert_eq!((out.d[0], out.ccr, out.x), (c.want, c.ccr, c.want_x), "{}", c.what);
        assert_eq!(out.d[1], c.d1, "{}", c.what);

        let nf = run_on(&mut Machine::new(), c.op, &[], Variant::Nf, &s);
        assert_eq!(nf.d[0], c.want, "{} (nf)", c.what);
    }
}

#[test]
fn rotate_through_x_by_its_own_register_fails_the_guard() {
    // ROXL.L D0,D0
    let r = generate(&decode(0xE1B0), Variant::Ff, &GenEnv::default());
    assert!(r.may_fail);
    let err = Machine::new().execute(&r, &[], &state()).unwrap_err();
    assert!(matches!(err, MachineError::Instantiate(InstantiateError::GuardFailed(_))), "{err}");
}

#[test]
fn memory_shift_moves_one_bit() {
    // ASL.W (A0)
    let mut m = Machine::new();
    m.guest_write_u16(0x200, 0x4000).unwrap();
    let mut s = state();
    s.a[0] = 0x200;
    let out = run_on(&mut m, 0xE1D0, &[], Variant::Ff, &s);
    assert_eq!(m.guest_read_u16(0x200).unwrap(), 0x8000);
    assert_eq!(out.ccr, Cpsr::N | Cpsr::V);
    assert!(!out.x);
}

#[test]
fn signed_word_multiply() {
    // MULS.W D1,D0
    let mut s = state();
    s.d[0] = 0x7777_FFFE;
    s.d[1] = 0x0000_0003;
    s.ccr = Cpsr::C | Cpsr::V;
    let out = run(0xC1C1, &[], &s);
    assert_eq!(out.d[0], 0xFFFF_FFFA);
    assert_eq!(out.ccr, Cpsr::N);
}

#[test]
fn long_multiply_reads_its_extension_word() {
    // MULU.L D1,D0
    let mut s = state();
    s.d[0] = 3;
    s.d[1] = 7;
    let out = run(0x4C01, &[0x0000], &s);
    assert_eq!((out.d[0], out.ccr, out.pc), (21, Cpsr::empty(), PC + 4));

    s.d[0] = 0x1_0000;
    s.d[1] = 0x1_0000;
    let out = run(0x4C01, &[0x0000], &s);
    assert_eq!((out.d[0], out.ccr), (0, Cpsr::Z | Cpsr::V));

    // MULS.L D1,D0 overflowing into bit 31
    s.d[0] = 0x8000_0000;
    s.d[1] = 0xFFFF_FFFF;
    let out = run(0x4C01, &[0x0800], &s);
    assert_eq!((out.d[0], out.ccr), (0x8000_0000, Cpsr::N | Cpsr::V));

    // MULS.L D1,D3:D2
    let mut s = state();
    s.d[1] = 5;
    s.d[2] = 0xFFFF_FFFF;
    let out = run(0x4C01, &[0x2C03], &s);
    assert_eq!((out.d[2], out.d[3], out.ccr), (0xFFFF_FFFB, 0xFFFF_FFFF, Cpsr::N));
    assert_eq!(out.d[0], 0);

    // The flag-free form stores the same registers.
    let nf = run_on(&mut Machine::new(), 0x4C01, &[0x2C03], Variant::Nf, &s);
    assert_eq!((nf.d[2], nf.d[3]), (0xFFFF_FFFB, 0xFFFF_FFFF));
}

#[test]
fn movem_saves_and_restores_registers() {
    let mut m = Machine::new();
    let mut s = state();
    s.d[0] = 0x1111_1111;
    s.d[1] = 0x2222_2222;
    s.a[0] = 0x3333_3333;
    s.a[7] = 0x800;
    // MOVEM.L D0-D1/A0,-(A7)
    let saved = run_on(&mut m, 0x48E7, &[0xC080], Variant::Ff, &s);
    assert_eq!(saved.a[7], 0x7F4);
    assert_eq!(saved.pc, PC + 4);
    assert_eq!(m.guest_read_u32(0x7F4).unwrap(), 0x1111_1111);
    assert_eq!(m.guest_read_u32(0x7F8).unwrap(), 0x2222_2222);
    assert_eq!(m.guest_read_u32(0x7FC).unwrap(), 0x3333_3333);

    let mut cleared = saved;
    cleared.d[0] = 0;
    cleared.d[1] = 0;
    cleared.a[0] = 0;
    // MOVEM.L (A7)+,D0-D1/A0
    let restored = run_on(&mut m, 0x4CDF, &[0x0103], Variant::Nf, &cleared);
    assert_eq!(restored.d[0], 0x1111_1111);
    assert_eq!(restored.d[1], 0x2222_2222);
    assert_eq!(restored.a[0], 0x3333_3333);
    assert_eq!(restored.a[7], 0x800);
}

#[test]
fn movem_words_are_sign_extended() {
    // MOVEM.W (A0),D0/A1
    let mut m = Machine::new();
    m.guest_write_u16(0x200, 0x8001).unwrap();
    m.guest_write_u16(0x202, 0x1234).unwrap();
    let mut s = state();
    s.a[0] = 0x200;
    s.d[0] = 0x5555_5555;
    let out = run_on(&mut m, 0x4C90, &[0x0201], Variant::Ff, &s);
    assert_eq!(out.d[0], 0xFFFF_8001);
    assert_eq!(out.a[1], 0x0000_1234);
    assert_eq!(out.a[0], 0x200);
}

#[test]
fn rtd_pops_and_releases_arguments() {
    let mut m = Machine::new();
    m.guest_write_u32(0x600, 0x0000_4000).unwrap();
    let mut s = state();
    s.a[7] = 0x600;
    // RTD #8
    let r = generate(&decode(0x4E74), Variant::Ff, &GenEnv::default());
    assert!(r.flags.contains(RoutineFlags::JUMP));
    let out = m.execute(&r, &[0x0008], &s).unwrap();
    assert_eq!(out.pc, 0x4000);
    assert_eq!(out.a[7], 0x60C);
}
