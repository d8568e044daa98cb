use crate::cpu::CpuBus;
use crate::reu;

pub const RAM_SIZE: usize = 0x10000;
pub const REU_SIZE: usize = 16 * 1024 * 1024;

/// 64K of main memory plus the REU's expansion memory behind it.
pub struct AddressSpace {
    pub(crate) ram: Box<[u8]>,
    pub(crate) reu: Box<[u8]>,
}

impl AddressSpace {
    #[cfg(test)]
    pub fn new() -> Self {
        Self::with_expansion(vec![0; REU_SIZE])
    }

    /// Uses `expansion` as-is for the REU, whatever its length.
    pub fn with_expansion(expansion: Vec<u8>) -> Self {
        AddressSpace {
            ram: vec![0; RAM_SIZE].into_boxed_slice(),
            reu: expansion.into_boxed_slice(),
        }
    }

    pub fn read(&self, addr: u16) -> u8 {
        self.ram[addr as usize]
    }

    pub fn read_word(&self, addr: u16) -> u16 {
        let low = self.read(addr) as u16;
        let high = self.read(addr.wrapping_add(1)) as u16;
        (high << 8) | low
    }

    pub fn write(&mut self, addr: u16, data: u8) {
        self.ram[addr as usize] = data;
        // The command byte is already in place when the controller looks at it.
        if addr == reu::COMMAND {
            reu::execute(&mut self.ram, &mut self.reu);
        }
    }

    pub fn fill(&mut self, start: u16, len: usize, value: u8) {
        let start = start as usize;
        self.ram[start..start + len].fill(value);
    }

    /// Copies `bytes` to `start` without going through the write hook.
    pub fn load(&mut self, start: u16, bytes: &[u8]) {
        let start = start as usize;
        self.ram[start..start + bytes.len()].copy_from_slice(bytes);
    }

    pub fn ram(&self) -> &[u8] {
        &self.ram
    }

    pub fn expansion(&self) -> &[u8] {
        &self.reu
    }

    #[cfg(test)]
    pub fn expansion_mut(&mut self) -> &mut [u8] {
        &mut self.reu
    }
}

impl CpuBus for AddressSpace {
    fn read(&mut self, addr: u16) -> u8 {
        AddressSpace::read(self, addr)
    }

    fn write(&mut self, addr: u16, data: u8) {
        AddressSpace::write(self, addr, data)
    }
}
