//! Consistency laws over the per-opcode behaviour descriptors.

use loki_core::isa::{descriptor, Computation, Format, Function, NetworkClass, Opcode};

fn all_opcodes() -> impl Iterator<Item = Opcode> {
    (0..=127u8).filter_map(Opcode::from_bits)
}

#[test]
fn layouts_never_read_more_registers_than_the_format_encodes() {
    for opcode in all_opcodes() {
        let desc = descriptor(opcode, Function::AddU);
        let format_regs = match desc.format {
            Format::R3 => 3,
            Format::R2 | Format::R2nc | Format::R2s => 2,
            Format::R1 | Format::R1nc => 1,
            Format::Ff | Format::Pff | Format::R0 | Format::R0nc => 0,
        };
        assert!(
            desc.layout.register_reads() <= format_regs.max(1),
            "{opcode:?}: layout reads more registers than {:?} encodes",
            desc.format
        );
    }
}

#[test]
fn memory_sends_only_come_from_memory_address_computations() {
    for opcode in all_opcodes() {
        let desc = descriptor(opcode, Function::AddU);
        if let NetworkClass::MemorySend { flits, .. } = desc.network {
            assert_eq!(desc.computation, Computation::MemoryAddress, "{opcode:?}");
            assert!(flits == 1 || flits == 2, "{opcode:?}");
        }
    }
}

#[test]
fn early_operations_never_touch_memory() {
    for opcode in all_opcodes() {
        let desc = descriptor(opcode, Function::AddU);
        if desc.early {
            assert!(
                !matches!(desc.network, NetworkClass::MemorySend { .. }),
                "{opcode:?} is early but sends memory packets"
            );
        }
    }
}

#[test]
fn fetch_family_computes_early() {
    for opcode in [
        Opcode::Fetch,
        Opcode::FetchR,
        Opcode::FetchPst,
        Opcode::FetchPstR,
        Opcode::Fill,
        Opcode::FillR,
        Opcode::PselFetch,
        Opcode::PselFetchR,
    ] {
        let desc = descriptor(opcode, Function::AddU);
        assert!(desc.early, "{opcode:?}");
        assert!(matches!(desc.computation, Computation::Fetch(_)), "{opcode:?}");
    }
}

#[test]
fn prefetches_do_not_jump_and_persistent_fetches_do() {
    let fill = descriptor(Opcode::Fill, Function::AddU);
    let fetchpst = descriptor(Opcode::FetchPst, Function::AddU);
    match (fill.computation, fetchpst.computation) {
        (Computation::Fetch(fill_kind), Computation::Fetch(pst_kind)) => {
            assert!(!fill_kind.execute);
            assert!(!fill_kind.persistent);
            assert!(pst_kind.execute);
            assert!(pst_kind.persistent);
        }
        other => panic!("unexpected computations: {other:?}"),
    }
}

#[test]
fn predicate_twins_differ_only_in_the_predicate_write() {
    for (plain, twin) in [
        (Opcode::NorI, Opcode::NorIP),
        (Opcode::AndI, Opcode::AndIP),
        (Opcode::AddUI, Opcode::AddUIP),
        (Opcode::SrlI, Opcode::SrlIP),
        (Opcode::TstChI, Opcode::TstChIP),
    ] {
        let a = descriptor(plain, Function::AddU);
        let b = descriptor(twin, Function::AddU);
        assert!(!a.writes_predicate && b.writes_predicate, "{plain:?}/{twin:?}");
        assert_eq!(a.layout, b.layout, "{plain:?}/{twin:?}");
        assert_eq!(a.computation, b.computation, "{plain:?}/{twin:?}");
    }
}
