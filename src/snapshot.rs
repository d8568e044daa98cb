use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::cpu::StatusFlags;
use crate::display::Screen;
use crate::emulator::Emulator;
use crate::loader::{LoadedProgram, Overrides, ProgramImage, CARTRIDGE_ADDRESS};
use crate::machine::{MachineVariant, MemoryBoundaries};
use crate::memory::{AddressSpace, RAM_SIZE};

/// CPU registers, firmware state and main RAM at one instant of a run.
/// Expansion memory lives in its own image file and is not included.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub machine: MachineVariant,
    pub external_rom: bool,

    // CPU state
    pub cpu_a: u8,
    pub cpu_x: u8,
    pub cpu_y: u8,
    pub cpu_pc: u16,
    pub cpu_sp: u8,
    pub cpu_status: u8,
    pub cpu_instructions: u64,

    pub boundaries: MemoryBoundaries,

    // Main RAM
    pub ram: Vec<u8>,
}

impl Snapshot {
    pub fn capture(emu: &Emulator) -> Self {
        Snapshot {
            machine: emu.ctx.machine,
            external_rom: emu.ctx.external_rom,
            cpu_a: emu.cpu.a,
            cpu_x: emu.cpu.x,
            cpu_y: emu.cpu.y,
            cpu_pc: emu.cpu.pc,
            cpu_sp: emu.cpu.sp,
            cpu_status: emu.cpu.status.bits(),
            cpu_instructions: emu.cpu.instructions(),
            boundaries: emu.ctx.boundaries,
            ram: emu.ctx.memory.ram().to_vec(),
        }
    }

    /// Puts the captured state back. RAM is copied without going through the
    /// bus, so a command byte sitting at $DF01 does not start a transfer.
    pub fn restore(&self, emu: &mut Emulator) {
        if emu.ctx.machine != self.machine {
            log::warn!(
                "restoring a {} snapshot into a {} run",
                self.machine,
                emu.ctx.machine
            );
        }
        emu.ctx.boundaries = self.boundaries;
        emu.ctx.external_rom = self.external_rom;
        emu.ctx.memory.load(0x0000, &self.ram);

        emu.cpu.a = self.cpu_a;
        emu.cpu.x = self.cpu_x;
        emu.cpu.y = self.cpu_y;
        emu.cpu.pc = self.cpu_pc;
        emu.cpu.sp = self.cpu_sp;
        emu.cpu.status = StatusFlags::from_bits_retain(self.cpu_status);
        emu.cpu.set_instructions(self.cpu_instructions);
    }

    /// Continues a run from this snapshot. `images` are patched over the
    /// restored RAM, then the start overrides apply as they would to a fresh run.
    pub fn resume(
        &self,
        memory: AddressSpace,
        images: &[ProgramImage],
        overrides: &Overrides,
        screen: Box<dyn Screen>,
    ) -> Emulator {
        let program = LoadedProgram {
            memory,
            machine: overrides.machine.unwrap_or(self.machine),
            external_rom: self.external_rom,
            pc: self.cpu_pc,
            sp: self.cpu_sp,
        };
        let mut emu = Emulator::new(program, screen);
        self.restore(&mut emu);

        for image in images {
            emu.ctx.memory.load(image.load_address, &image.payload);
            if image.load_address == CARTRIDGE_ADDRESS {
                emu.ctx.external_rom = true;
            }
        }

        if let Some(vector) = overrides.start_indirect {
            emu.cpu.pc = emu.ctx.memory.read_word(vector);
        } else if let Some(start) = overrides.start {
            emu.cpu.pc = start;
        }
        log::info!("Resuming {} at ${:04X}", emu.ctx.machine, emu.cpu.pc);
        emu
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let data = bincode::serialize(self)?;
        std::fs::write(path, data)?;
        log::info!("Snapshot written to: {}", path.display());
        Ok(())
    }

    pub fn load_from_file(path: &Path) -> Result<Snapshot, Box<dyn std::error::Error>> {
        let data = std::fs::read(path)?;
        let snapshot: Snapshot = bincode::deserialize(&data)?;
        if snapshot.ram.len() != RAM_SIZE {
            return Err(format!(
                "{}: snapshot holds {} bytes of RAM, expected {}",
                path.display(),
                snapshot.ram.len(),
                RAM_SIZE
            )
            .into());
        }
        log::info!("Snapshot loaded from: {}", path.display());
        Ok(snapshot)
    }
}
