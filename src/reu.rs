// REU (RAM Expansion Unit) transfer controller.
//
// Only the two plain copy commands are emulated: no swap/verify, no
// autoload, no address fixing, no status register.

pub const COMMAND: u16 = 0xDF01;
pub const LOCAL_ADDR: u16 = 0xDF02; // 16 bit, little endian
pub const REU_ADDR: u16 = 0xDF04; // 24 bit, little endian
pub const LENGTH: u16 = 0xDF07; // 16 bit, little endian

/// Execute + expansion -> main memory.
pub const FETCH: u8 = 0b1001_0001;
/// Execute + main memory -> expansion.
pub const STASH: u8 = 0b1001_0000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferDescriptor {
    pub command: u8,
    pub local_addr: u16,
    pub reu_addr: u32,
    pub length: u16,
}

impl TransferDescriptor {
    pub fn decode(ram: &[u8]) -> Self {
        let byte = |addr: u16| ram[addr as usize];
        TransferDescriptor {
            command: byte(COMMAND),
            local_addr: u16::from_le_bytes([byte(LOCAL_ADDR), byte(LOCAL_ADDR + 1)]),
            reu_addr: u32::from_le_bytes([byte(REU_ADDR), byte(REU_ADDR + 1), byte(REU_ADDR + 2), 0]),
            length: u16::from_le_bytes([byte(LENGTH), byte(LENGTH + 1)]),
        }
    }

    fn local_range(&self) -> std::ops::Range<usize> {
        let start = self.local_addr as usize;
        start..start + self.length as usize
    }

    fn reu_range(&self) -> std::ops::Range<usize> {
        let start = self.reu_addr as usize;
        start..start + self.length as usize
    }

    /// Both ranges must fit entirely inside their memories.
    fn in_bounds(&self, ram_len: usize, reu_len: usize) -> bool {
        self.local_range().end <= ram_len && self.reu_range().end <= reu_len
    }
}

/// Runs whatever the registers in `ram` describe. Unknown commands and
/// transfers that would run off either memory are ignored.
pub fn execute(ram: &mut [u8], reu: &mut [u8]) {
    let xfer = TransferDescriptor::decode(ram);
    if xfer.command != FETCH && xfer.command != STASH {
        return;
    }
    if !xfer.in_bounds(ram.len(), reu.len()) {
        log::trace!("REU: ignoring out-of-range transfer {:?}", xfer);
        return;
    }

    log::debug!(
        "REU: {} ${:04X} <-> ${:06X} len ${:04X}",
        if xfer.command == FETCH { "fetch" } else { "stash" },
        xfer.local_addr,
        xfer.reu_addr,
        xfer.length
    );

    if xfer.command == FETCH {
        ram[xfer.local_range()].copy_from_slice(&reu[xfer.reu_range()]);
    } else {
        reu[xfer.reu_range()].copy_from_slice(&ram[xfer.local_range()]);
    }
}
