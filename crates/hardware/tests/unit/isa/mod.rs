/// Behaviour-descriptor consistency laws.
pub mod descriptors;
/// Canonical disassembly formats.
pub mod disasm;
/// Assembly/disassembly and encoding round-trip laws.
pub mod roundtrip;
