// KERNAL entry points and the routines that stand in for them.
use std::collections::HashMap;

use crate::cpu::{Cpu, StatusFlags};
use crate::display::Screen;
use crate::machine::{MachineVariant, MemoryBoundaries};
use crate::memory::AddressSpace;

mod clock;
mod io;
mod memory_routines;

#[cfg(test)]
pub(crate) mod tests;

pub use clock::JiffyClock;
pub use io::Channels;

/// Everything a KERNAL routine may look at or change, apart from the CPU.
pub struct Context {
    pub memory: AddressSpace,
    pub boundaries: MemoryBoundaries,
    pub machine: MachineVariant,
    pub external_rom: bool,
    pub screen: Box<dyn Screen>,
    pub columns: u8,
    pub rows: u8,
    pub clock: JiffyClock,
    pub channels: Channels,
}

impl Context {
    pub fn new(
        memory: AddressSpace,
        machine: MachineVariant,
        external_rom: bool,
        screen: Box<dyn Screen>,
    ) -> Self {
        let profile = machine.profile();
        Context {
            memory,
            boundaries: MemoryBoundaries::default(),
            machine,
            external_rom,
            screen,
            columns: profile.columns,
            rows: profile.rows,
            clock: JiffyClock::default(),
            channels: Channels::default(),
        }
    }
}

/// Register values passed into a routine and handed back from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registers {
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub status: StatusFlags,
    pub sp: u8,
}

impl Registers {
    pub fn carry(&self) -> bool {
        self.status.contains(StatusFlags::CARRY)
    }

    pub fn set_carry(&mut self, on: bool) {
        self.status.set(StatusFlags::CARRY, on);
    }

    pub fn set_zero(&mut self, on: bool) {
        self.status.set(StatusFlags::ZERO, on);
    }

    /// Loads A and sets Z/N from it, as a `LDA` before `RTS` would.
    pub fn set_a(&mut self, value: u8) {
        self.a = value;
        self.status.set(StatusFlags::ZERO, value == 0);
        self.status.set(StatusFlags::NEGATIVE, value & 0x80 != 0);
    }

    /// X holds the low byte, Y the high byte.
    pub fn xy(&self) -> u16 {
        u16::from_le_bytes([self.x, self.y])
    }

    pub fn set_xy(&mut self, value: u16) {
        [self.x, self.y] = value.to_le_bytes();
    }

    pub fn from_cpu(cpu: &Cpu) -> Self {
        Registers {
            a: cpu.a,
            x: cpu.x,
            y: cpu.y,
            status: cpu.status,
            sp: cpu.sp,
        }
    }

    pub fn apply(self, cpu: &mut Cpu) {
        cpu.a = self.a;
        cpu.x = self.x;
        cpu.y = self.y;
        cpu.status = self.status;
        cpu.sp = self.sp;
    }
}

pub type Handler = fn(&mut Context, Registers) -> Registers;

pub struct Routine {
    pub name: &'static str,
    pub handler: Handler,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Models {
    All,
    /// Everything with the full jump table, i.e. not the PETs.
    JumpTable,
}

const ROUTINES: &[(u16, &str, Handler, Models)] = &[
    (0xFF87, "RAMTAS", memory_routines::ramtas, Models::JumpTable),
    (0xFF90, "SETMSG", io::setmsg, Models::JumpTable),
    (0xFF99, "MEMTOP", memory_routines::memtop, Models::JumpTable),
    (0xFF9C, "MEMBOT", memory_routines::membot, Models::JumpTable),
    (0xFFB7, "READST", io::readst, Models::JumpTable),
    (0xFFBA, "SETLFS", io::setlfs, Models::JumpTable),
    (0xFFBD, "SETNAM", io::setnam, Models::JumpTable),
    (0xFFCC, "CLRCHN", io::clrchn, Models::All),
    (0xFFCF, "CHRIN", io::chrin, Models::All),
    (0xFFD2, "CHROUT", io::chrout, Models::All),
    (0xFFDB, "SETTIM", clock::settim, Models::JumpTable),
    (0xFFDE, "RDTIM", clock::rdtim, Models::JumpTable),
    (0xFFE1, "STOP", io::stop, Models::All),
    (0xFFE4, "GETIN", io::getin, Models::All),
    (0xFFE7, "CLALL", io::clall, Models::All),
    (0xFFEA, "UDTIM", clock::udtim, Models::All),
    (0xFFED, "SCREEN", io::screen, Models::JumpTable),
    (0xFFF0, "PLOT", io::plot, Models::JumpTable),
    (0xFFF3, "IOBASE", io::iobase, Models::JumpTable),
];

/// (machine, entry address) -> routine. Fixed once built.
pub struct DispatchTable {
    entries: HashMap<(MachineVariant, u16), Routine>,
}

impl DispatchTable {
    pub fn new() -> Self {
        let mut entries = HashMap::new();
        for machine in MachineVariant::ALL {
            let is_pet = matches!(machine, MachineVariant::Pet | MachineVariant::Pet4);
            for &(addr, name, handler, models) in ROUTINES {
                if models == Models::JumpTable && is_pet {
                    continue;
                }
                entries.insert((machine, addr), Routine { name, handler });
            }
        }
        DispatchTable { entries }
    }

    pub fn lookup(&self, machine: MachineVariant, pc: u16) -> Option<&Routine> {
        self.entries.get(&(machine, pc))
    }
}

impl Default for DispatchTable {
    fn default() -> Self {
        Self::new()
    }
}

/// The word a `JSR` left on top of the stack.
pub fn stack_word(memory: &AddressSpace, sp: u8) -> u16 {
    let low = memory.read(0x0100 | sp.wrapping_add(1) as u16) as u16;
    let high = memory.read(0x0100 | sp.wrapping_add(2) as u16) as u16;
    (high << 8) | low
}

/// Runs `routine` against the CPU state and returns to the caller as `RTS` would.
pub fn call(routine: &Routine, cpu: &mut Cpu, ctx: &mut Context) {
    log::debug!("KERNAL {} at ${:04X}", routine.name, cpu.pc);
    let regs = (routine.handler)(ctx, Registers::from_cpu(cpu));
    regs.apply(cpu);

    cpu.pc = stack_word(&ctx.memory, cpu.sp).wrapping_add(1);
    cpu.sp = cpu.sp.wrapping_add(2);
}
