use std::convert::Infallible;

use crate::cpu::Cpu;
use crate::display::Screen;
use crate::error::{Error, Result};
use crate::kernal::{self, Context, DispatchTable};
use crate::loader::LoadedProgram;

pub struct Emulator {
    pub cpu: Cpu,
    pub ctx: Context,
    table: DispatchTable,
}

impl Emulator {
    pub fn new(program: LoadedProgram, screen: Box<dyn Screen>) -> Self {
        let mut cpu = Cpu::new();
        cpu.reset();
        cpu.pc = program.pc;
        cpu.sp = program.sp;

        let ctx = Context::new(program.memory, program.machine, program.external_rom, screen);
        Emulator {
            cpu,
            ctx,
            table: DispatchTable::new(),
        }
    }

    /// Tells the screen its geometry. Without `columns` the machine's own width is used.
    pub fn init_screen(&mut self, columns: Option<u8>, text_mode: bool) {
        if let Some(columns) = columns {
            self.ctx.columns = columns;
        }
        self.ctx.screen.init(self.ctx.columns, text_mode);
    }

    /// Either runs the KERNAL routine at PC or executes one instruction.
    pub fn step(&mut self) -> Result<()> {
        let pc = self.cpu.pc;
        if let Some(routine) = self.table.lookup(self.ctx.machine, pc) {
            kernal::call(routine, &mut self.cpu, &mut self.ctx);
            return Ok(());
        }

        // Entry points without a ROM behind them read as $00.
        if self.ctx.memory.read(pc) == 0x00 {
            return Err(self.miss());
        }

        self.cpu.step(&mut self.ctx.memory);
        Ok(())
    }

    /// Runs until something goes wrong; there is no other way out.
    pub fn run(&mut self) -> Result<Infallible> {
        loop {
            self.step()?;
        }
    }

    pub fn run_for(&mut self, steps: u64) -> Result<()> {
        for _ in 0..steps {
            self.step()?;
        }
        Ok(())
    }

    fn miss(&self) -> Error {
        let caller = kernal::stack_word(&self.ctx.memory, self.cpu.sp).wrapping_add(1);
        log::debug!(
            "no routine for ${:04X} on {} after {} instructions",
            self.cpu.pc,
            self.ctx.machine,
            self.cpu.instructions()
        );
        Error::DispatchMiss {
            pc: self.cpu.pc,
            sp: self.cpu.sp,
            caller,
        }
    }
}
