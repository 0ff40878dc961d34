use m68k_armjit::codegen::symbol;
use m68k_armjit::config::GenConfig;
use m68k_armjit::driver::{Artifacts, Generated, Generator};
use m68k_armjit::guest::table::DecodeTable;
use m68k_armjit::guest::Mnemonic;
use m68k_armjit::Variant;
use pretty_assertions::assert_eq;
use std::collections::HashSet;

fn full_run(cfg: &GenConfig) -> (Generated, Artifacts) {
    let table = DecodeTable::build();
    Generator::new(&table, cfg).unwrap().run().unwrap()
}

#[test]
fn generation_is_deterministic() {
    let cfg = GenConfig::default();
    let (_, a) = full_run(&cfg);
    let (_, b) = full_run(&cfg);
    assert!(a == b, "two runs produced different output");
}

#[test]
fn tables_are_consistent_with_the_routines() {
    let cfg = GenConfig { parts: 3, ..GenConfig::default() };
    let (g, a) = full_run(&cfg);

    // One line per entry plus the sentinel, per table.
    let rows = a.table.lines().filter(|l| l.starts_with("{ ")).count();
    assert_eq!(rows, g.ff.entries.len() + g.nf.entries.len() + 2);
    assert_eq!(a.table.matches("{ 0, 65536, 0 }};").count(), 2);
    assert!(a.table.contains("const struct comptbl op_smalltbl_0_comp_ff[] = {"));
    assert!(a.table.contains("const struct comptbl op_smalltbl_0_comp_nf[] = {"));

    let declared: HashSet<&str> = a
        .header
        .lines()
        .filter_map(|l| l.strip_prefix("extern compop_func "))
        .map(|l| l.trim_end_matches(';'))
        .collect();
    let leaders = g.ff.leaders.len() + g.nf.leaders.len();
    assert_eq!(declared.len(), leaders);
    assert_eq!(a.routines.matches("void REGPARAM2 ").count(), leaders);
    for sym in &declared {
        assert!(a.routines.contains(&format!("void REGPARAM2 {sym}(uae_u32 opcode)")), "{sym}");
    }

    for t in g.tables() {
        assert_eq!(t.covered.count_ones(), t.entries.len() - t.holes());
        for e in &t.entries {
            if let Some(leader) = e.handler {
                let l = t.leader(leader).unwrap_or_else(|| panic!("{:#06x} has no leader", e.opcode));
                assert_eq!(l.routine.variant, t.variant);
                assert_eq!(l.routine.flags, e.flags);
                assert!(t.covered[e.opcode as usize]);
            } else {
                assert!(!t.covered[e.opcode as usize]);
            }
        }
        assert!(t.leaders.len() < t.entries.len() - t.holes());
    }

    assert_eq!(a.routines.matches("#ifdef PART_").count(), 3);
    assert_eq!(a.routines.matches("#endif").count(), 3);
}

#[test]
fn known_rows() {
    let (g, a) = full_run(&GenConfig::default());
    // NOP translates to an empty body.
    let nop = g.ff.entry(0x4E71).unwrap();
    let leader = nop.handler.unwrap();
    assert!(g.ff.leader(leader).unwrap().routine.template().unwrap().is_empty());
    let row = format!("{{ {}, 20081, 0x00000000 }}, /* NOP */", symbol(leader, Variant::Ff));
    assert!(a.table.contains(&row), "{row}");

    // ABCD is a hole in both tables.
    assert_eq!(g.ff.entry(0xC100).unwrap().handler, None);
    assert!(a.table.contains("{ NULL, 0x0000c100, 0 }, /* ABCD */"));

    // Branch displacements are baked into the literal, so they do not share.
    let bra = g.ff.entry(0x6004).unwrap();
    assert_eq!(bra.flags.bits() & 1, 1);
    assert_ne!(g.ff.entry(0x6010).unwrap().handler, bra.handler);

    // Register fields are patched at translation time, so these do.
    assert_eq!(g.ff.entry(0xD480).unwrap().handler, g.ff.entry(0xD280).unwrap().handler);
    assert!(g.ff.entries.iter().all(|e| e.mnemonic != Mnemonic::Illegal));
}

#[test]
fn cpu_level_limits_the_tables() {
    let low = GenConfig { cpu_level: 0, ..GenConfig::default() };
    let (g, _) = full_run(&low);
    // EXTB.L is 68020 only.
    assert!(g.ff.entry(0x49C0).is_none());
    assert!(g.ff.entry(0x4880).is_some());
    let (full, _) = full_run(&GenConfig::default());
    assert!(full.ff.entries.len() > g.ff.entries.len());
    assert!(full.ff.entry(0x49C0).is_some());
}

#[test]
fn outputs_land_in_the_directory() {
    let cfg = GenConfig::from_json(r#"{ "parts": 1, "annotate": true }"#).unwrap();
    let table = DecodeTable::build();
    let gen = Generator::new(&table, &cfg).unwrap();
    let (_, a) = gen.run().unwrap();
    let dir = std::env::temp_dir().join(format!("gencomp-test-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    a.write_to(&dir, &cfg).unwrap();
    for name in ["comptbl.h", "compstbl.cpp", "compemu.cpp"] {
        let text = std::fs::read_to_string(dir.join(name)).unwrap();
        assert!(text.starts_with("/* Generated by gencomp. Do not edit. */"), "{name}");
    }
    let routines = std::fs::read_to_string(dir.join("compemu.cpp")).unwrap();
    assert!(routines.contains("/* literal */"));
    assert!(routines.contains("#include \"compiler/compemu.h\""));
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn both_tables_list_the_same_opcodes() {
    let (g, _) = full_run(&GenConfig::default());
    assert_eq!(g.ff.variant, Variant::Ff);
    assert_eq!(g.nf.variant, Variant::Nf);
    assert_eq!(g.ff.entries.len(), g.nf.entries.len());
    for (f, n) in g.ff.entries.iter().zip(&g.nf.entries) {
        assert_eq!(f.opcode, n.opcode);
        assert_eq!(f.mnemonic, n.mnemonic);
    }
}
