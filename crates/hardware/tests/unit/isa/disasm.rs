//! Disassembly format checks: representative instructions print in the
//! canonical textual form.

use pretty_assertions::assert_eq;

use loki_core::isa::asm::{disassemble, parse_line, AsmLine};

/// Assembles one line, panicking on failure.
fn assemble(line: &str) -> loki_core::isa::Instruction {
    match parse_line(line) {
        Ok(AsmLine::Instruction(inst)) => inst,
        other => panic!("expected instruction from {line:?}, got {other:?}"),
    }
}

#[rstest::rstest]
// Register-register ALU group, with and without the predicate twin.
#[case("addu r5 r3 r4 -> 0", "addu r5 r3 r4 -> 0")]
#[case("subu.p r5 r3 r4", "subu.p r5 r3 r4")]
#[case("nor r1 r2 r3", "nor r1 r2 r3")]
// Immediate forms keep their (sign-extended) immediate.
#[case("addui r4 r3 -7", "addui r4 r3 -7")]
#[case("seteqi.p r0 r5 10", "seteqi.p r0 r5 10")]
#[case("slli r4 r3 31", "slli r4 r3 31")]
// Memory operations: two-register stores, one-register loads.
#[case("stw r3 r4 16 -> 2", "stw r3 r4 16 -> 2")]
#[case("ldw r4 16 -> 2", "ldw r4 16 -> 2")]
#[case("ldadd r3 r4 0 -> 2", "ldadd r3 r4 0 -> 2")]
// Control flow.
#[case("fetchr 16", "fetchr 16")]
#[case("fetchpstr.eop 4", "fetchpstr.eop 4")]
#[case("p?ibjmp -2", "p?ibjmp -2")]
#[case("!p?addui r2 r2 1", "!p?addui r2 r2 1")]
// Structure access and channel management.
#[case("scratchwri r3 17", "scratchwri r3 17")]
#[case("setchmapi r3 6", "setchmapi r3 6")]
#[case("selch r5 6", "selch r5 6")]
#[case("woche 1", "woche 1")]
#[case("syscall 1", "syscall 1")]
#[case("lui r7 1000", "lui r7 1000")]
fn canonical_form_is_stable(#[case] input: &str, #[case] expected: &str) {
    let inst = assemble(input);
    assert_eq!(disassemble(inst), expected);
}

#[test]
fn undefined_encodings_print_as_raw_words() {
    // Opcode 127 is undefined.
    let inst = loki_core::isa::Instruction::new(127 << 23);
    assert!(disassemble(inst).starts_with(".word"));
}

#[test]
fn aliases_for_predicates_parse_identically() {
    assert_eq!(assemble("p?addui r2 r2 1"), assemble("ifp?addui r2 r2 1"));
    assert_eq!(assemble("!p?addui r2 r2 1"), assemble("if!p?addui r2 r2 1"));
}
