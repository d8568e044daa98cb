// Per-model memory layout and firmware facts.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MachineVariant {
    Pet,
    Pet4,
    Vic20,
    C64,
    Ted,
    C128,
    C65,
}

impl MachineVariant {
    pub const ALL: [MachineVariant; 7] = [
        MachineVariant::Pet,
        MachineVariant::Pet4,
        MachineVariant::Vic20,
        MachineVariant::C64,
        MachineVariant::Ted,
        MachineVariant::C128,
        MachineVariant::C65,
    ];

    pub fn name(self) -> &'static str {
        self.profile().name
    }

    pub fn profile(self) -> &'static MachineProfile {
        match self {
            MachineVariant::Pet => &PET,
            MachineVariant::Pet4 => &PET4,
            MachineVariant::Vic20 => &VIC20,
            MachineVariant::C64 => &C64,
            MachineVariant::Ted => &TED,
            MachineVariant::C128 => &C128,
            MachineVariant::C65 => &C65,
        }
    }

    /// Machine whose BASIC program area starts at `load_address`, if any.
    pub fn from_basic_start(load_address: u16) -> Option<MachineVariant> {
        Self::ALL
            .into_iter()
            .find(|v| v.profile().basic_start == Some(load_address))
    }
}

impl fmt::Display for MachineVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MachineVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|v| v.name() == s)
            .ok_or_else(|| {
                "Valid values for \"-machine\" are pet, pet4, vic20, c64, ted, c128, c65!".to_string()
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RamLayout {
    /// Firmware never runs a RAM test on this model.
    NoRamTest,
    Fixed { bottom: u16, top: u16 },
    /// Top of RAM drops when a cartridge image occupies $8000.
    CartridgeAware { bottom: u16, top: u16, top_with_rom: u16 },
}

#[derive(Debug)]
pub struct MachineProfile {
    pub name: &'static str,
    pub ram: RamLayout,
    pub io_base: u16,
    pub columns: u8,
    pub rows: u8,
    pub basic_start: Option<u16>,
}

static PET: MachineProfile = MachineProfile {
    name: "pet",
    ram: RamLayout::NoRamTest,
    io_base: 0xE810,
    columns: 40,
    rows: 25,
    basic_start: None,
};

static PET4: MachineProfile = MachineProfile {
    name: "pet4",
    ram: RamLayout::NoRamTest,
    io_base: 0xE810,
    columns: 80,
    rows: 25,
    basic_start: Some(0x0401),
};

// Assumes the common 8K+ expansion; an unexpanded VIC-20 would be $1000-$1E00.
static VIC20: MachineProfile = MachineProfile {
    name: "vic20",
    ram: RamLayout::Fixed { bottom: 0x1200, top: 0x8000 },
    io_base: 0x9110,
    columns: 22,
    rows: 23,
    basic_start: None,
};

static C64: MachineProfile = MachineProfile {
    name: "c64",
    ram: RamLayout::CartridgeAware {
        bottom: 0x0800,
        top: 0xA000,
        top_with_rom: 0x8000,
    },
    io_base: 0xDC00,
    columns: 40,
    rows: 25,
    basic_start: Some(0x0801),
};

static TED: MachineProfile = MachineProfile {
    name: "ted",
    ram: RamLayout::Fixed { bottom: 0x1000, top: 0xFD00 },
    io_base: 0xFD00,
    columns: 40,
    rows: 25,
    basic_start: Some(0x1001),
};

static C128: MachineProfile = MachineProfile {
    name: "c128",
    ram: RamLayout::Fixed { bottom: 0x1C00, top: 0xFF00 },
    io_base: 0xDC00,
    columns: 40,
    rows: 25,
    basic_start: Some(0x1C01),
};

static C65: MachineProfile = MachineProfile {
    name: "c65",
    ram: RamLayout::Fixed { bottom: 0x2000, top: 0xFF00 },
    io_base: 0xDC00,
    columns: 80,
    rows: 25,
    basic_start: None,
};

impl MachineProfile {
    /// Boundaries a RAM test leaves behind, or `None` on models whose
    /// firmware has no RAM test.
    pub fn reset_boundaries(&self, external_rom: bool) -> Option<MemoryBoundaries> {
        match self.ram {
            RamLayout::NoRamTest => None,
            RamLayout::Fixed { bottom, top } => Some(MemoryBoundaries { bottom, top }),
            RamLayout::CartridgeAware { bottom, top, top_with_rom } => Some(MemoryBoundaries {
                bottom,
                top: if external_rom { top_with_rom } else { top },
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    Bottom,
    Top,
}

/// The firmware's idea of usable RAM. Nothing enforces `bottom <= top`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryBoundaries {
    pub bottom: u16,
    pub top: u16,
}

impl MemoryBoundaries {
    pub fn get(&self, which: Boundary) -> u16 {
        match which {
            Boundary::Bottom => self.bottom,
            Boundary::Top => self.top,
        }
    }

    pub fn set(&mut self, which: Boundary, value: u16) {
        match which {
            Boundary::Bottom => self.bottom = value,
            Boundary::Top => self.top = value,
        }
    }
}
