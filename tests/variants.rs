//! Both variants of a routine must agree on everything but the flags.

use m68k_armjit::codegen::{generate, GenEnv, Variant};
use m68k_armjit::guest::table::decode;
use m68k_armjit::host::machine::{GUEST_BASE, GUEST_SIZE};
use m68k_armjit::host::{GuestState, Machine, MachineError};

fn initial() -> GuestState {
    let mut s = GuestState { pc: 0x2000, ..GuestState::default() };
    for i in 0..8 {
        s.d[i] = 0x8765_4300 + i as u32 + 1;
        s.a[i] = 0x3000 + 0x200 * i as u32;
    }
    s.a[7] = 0x8000;
    s
}

struct Outcome {
    state: GuestState,
    memory: Vec<u8>,
}

fn run(op: u16, variant: Variant) -> Option<Result<Outcome, MachineError>> {
    let entry = decode(op);
    let routine = generate(&entry, variant, &GenEnv::default());
    if routine.is_failed() {
        return None;
    }
    let ext = vec![0u16; entry.ext_words() as usize];
    let mut m = Machine::new();
    Some(m.execute(&routine, &ext, &initial()).map(|state| Outcome {
        state,
        memory: m.mem.bytes(GUEST_BASE, GUEST_SIZE as usize).unwrap_or_default().to_vec(),
    }))
}

#[test]
fn flag_free_variants_compute_the_same_state() {
    let mut mismatches = Vec::new();
    let mut compared = 0;
    for op in (0..=0xFFFFu16).step_by(7) {
        let entry = decode(op);
        if entry.is_illegal() || entry.privileged {
            continue;
        }
        let (Some(ff), Some(nf)) = (run(op, Variant::Ff), run(op, Variant::Nf)) else {
            continue;
        };
        match (ff, nf) {
            (Ok(ff), Ok(nf)) => {
                compared += 1;
                let (a, b) = (ff.state, nf.state);
                if a.d != b.d || a.a != b.a || a.pc != b.pc {
                    mismatches.push(format!("{op:#06x} {entry}: registers {a:x?} vs {b:x?}"));
                } else if ff.memory != nf.memory {
                    mismatches.push(format!("{op:#06x} {entry}: memory differs"));
                }
            }
            // A guard fails for both or neither.
            (Err(_), Err(_)) => {}
            (ff, nf) => mismatches.push(format!(
                "{op:#06x} {entry}: ff {:?} / nf {:?}",
                ff.err().map(|e| e.to_string()),
                nf.err().map(|e| e.to_string())
            )),
        }
    }
    assert!(compared > 1000, "only {compared} opcodes compared");
    assert!(mismatches.is_empty(), "{} mismatches:\n{}", mismatches.len(), mismatches.join("\n"));
}

#[test]
fn flag_free_variants_are_never_longer() {
    let env = GenEnv::default();
    for op in (0..=0xFFFFu16).step_by(13) {
        let entry = decode(op);
        let ff = generate(&entry, Variant::Ff, &env);
        let nf = generate(&entry, Variant::Nf, &env);
        if let (Some(f), Some(n)) = (ff.template(), nf.template()) {
            assert!(n.words.len() <= f.words.len(), "{op:#06x} {entry}");
            assert_eq!(n.ext_words, f.ext_words, "{op:#06x}");
        }
    }
}
