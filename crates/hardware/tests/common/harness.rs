use loki_core::common::{RegisterIndex, Warnings, Word};
use loki_core::core::Core;
use loki_core::isa::asm::{parse_line, AsmLine};
use loki_core::isa::Instruction;
use loki_core::{Config, Simulator};

/// A simulator plus the conveniences the tests lean on.
pub struct TestContext {
    pub sim: Simulator,
    pub config: Config,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
        let sim = Simulator::new(&config, Warnings::default());
        Self { sim, config }
    }

    /// Borrows a core on tile (0,0).
    pub fn core(&mut self, index: usize) -> &mut Core {
        &mut self.sim.chip.tiles[0].cores[index]
    }

    /// Assembles a multi-line program, panicking with the offending line on
    /// failure.
    pub fn assemble(program: &str) -> Vec<Instruction> {
        let mut code = Vec::new();
        for line in program.lines() {
            match parse_line(line) {
                Ok(AsmLine::Instruction(inst)) => code.push(inst),
                Ok(AsmLine::Blank | AsmLine::Label(_)) => {}
                Err(message) => panic!("bad assembly line {line:?}: {message}"),
            }
        }
        code
    }

    /// Preloads an assembled program into a core's instruction cache at
    /// `base`; it begins executing when the clock runs.
    pub fn load_program(&mut self, core: usize, base: u32, program: &str) {
        let code = Self::assemble(program);
        self.core(core).store_code(&code, base);
    }

    /// Sets a general-purpose register directly.
    pub fn set_reg(&mut self, core: usize, reg: RegisterIndex, value: Word) {
        let warnings = Warnings::default();
        self.core(core).regs.write(reg, value, &warnings);
    }

    /// Reads a general-purpose register directly.
    pub fn reg(&mut self, core: usize, reg: RegisterIndex) -> Word {
        self.core(core).regs.read_debug(reg)
    }

    /// Runs the clock for `cycles` cycles (stopping early on exit).
    pub fn run(&mut self, cycles: u64) {
        for _ in 0..cycles {
            if self.sim.chip.stopped().is_some() {
                break;
            }
            if let Err(e) = self.sim.tick() {
                panic!("simulation fault: {e}");
            }
        }
    }
}
