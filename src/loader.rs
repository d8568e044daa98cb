// Loads PRG-style images: a little-endian load address followed by payload.
use std::path::{Path, PathBuf};

use crate::cli::split_number;
use crate::error::{Error, LoadError, Result};
use crate::machine::MachineVariant;
use crate::memory::{AddressSpace, REU_SIZE};

pub const INITIAL_SP: u8 = 0xFF;
// Cartridge images sit here; RAMTAS then leaves BASIC less memory on a C64.
pub const CARTRIDGE_ADDRESS: u16 = 0x8000;
const SYS_TOKEN: u8 = 0x9E;
const MAX_SYS_ARGUMENT: u16 = 16;

pub struct ProgramImage {
    pub path: PathBuf,
    pub load_address: u16,
    pub payload: Vec<u8>,
}

impl ProgramImage {
    pub fn from_bytes(path: impl Into<PathBuf>, bytes: &[u8]) -> std::result::Result<Self, LoadError> {
        let path = path.into();
        let [lo, hi, payload @ ..] = bytes else {
            return Err(LoadError::MissingHeader { path });
        };
        let load_address = u16::from_le_bytes([*lo, *hi]);
        if load_address as usize + payload.len() > 0x10000 {
            return Err(LoadError::Overflow {
                path,
                load_address,
                len: payload.len(),
            });
        }
        Ok(ProgramImage {
            path,
            load_address,
            payload: payload.to_vec(),
        })
    }

    pub fn load_from_file(path: &Path) -> std::result::Result<Self, LoadError> {
        let bytes = std::fs::read(path).map_err(|source| LoadError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(path, &bytes)
    }
}

/// Command line choices that override what the images imply.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Overrides {
    pub machine: Option<MachineVariant>,
    pub start: Option<u16>,
    pub start_indirect: Option<u16>,
}

/// Memory and CPU entry state once every image is in place.
pub struct LoadedProgram {
    pub memory: AddressSpace,
    pub machine: MachineVariant,
    pub external_rom: bool,
    pub pc: u16,
    pub sp: u8,
}

pub fn load_program(
    mut memory: AddressSpace,
    images: &[ProgramImage],
    overrides: &Overrides,
) -> Result<LoadedProgram> {
    let mut inferred_machine = None;
    let mut inferred_start = None;
    let mut external_rom = false;

    for image in images {
        memory.load(image.load_address, &image.payload);
        log::info!(
            "Loaded {} at ${:04X}-${:04X}",
            image.path.display(),
            image.load_address,
            image.load_address as usize + image.payload.len()
        );

        if image.load_address == CARTRIDGE_ADDRESS {
            external_rom = true;
        }

        let machine = MachineVariant::from_basic_start(image.load_address);
        if machine.is_some() {
            inferred_machine = machine;
        }

        if inferred_start.is_none() {
            let autostart = machine.and_then(|_| sys_address(&memory, image.load_address));
            inferred_start = Some(autostart.unwrap_or(image.load_address));
        }
    }

    let machine = overrides
        .machine
        .or(inferred_machine)
        .unwrap_or(MachineVariant::C64);

    let pc = match (overrides.start_indirect, overrides.start.or(inferred_start)) {
        (Some(vector), _) => memory.read_word(vector),
        (None, Some(start)) => start,
        (None, None) => {
            return Err(Error::Usage(
                "You need to specify at least one binary file!".to_string(),
            ))
        }
    };

    log::info!("Machine {}, starting at ${:04X}", machine, pc);
    Ok(LoadedProgram {
        memory,
        machine,
        external_rom,
        pc,
        sp: INITIAL_SP,
    })
}

/// Target of a `SYS` in the first BASIC line at `load_address`.
fn sys_address(memory: &AddressSpace, load_address: u16) -> Option<u16> {
    if memory.read(load_address.wrapping_add(4)) != SYS_TOKEN {
        return None;
    }
    let text: Vec<u8> = (0..MAX_SYS_ARGUMENT)
        .map(|i| memory.read(load_address.wrapping_add(5 + i)))
        .take_while(|&b| b != 0)
        .collect();
    let text = String::from_utf8_lossy(&text);
    let arg = text.trim_start();
    let arg = arg.strip_prefix('(').unwrap_or(arg).trim_start();
    let address = split_number(arg).map(|(value, _)| value);
    if address.is_none() {
        log::warn!("SYS line at ${:04X} has no usable address", load_address);
    }
    address
}

/// Reads the expansion memory backing file; it must cover all of expansion memory.
pub fn load_expansion(path: &Path) -> std::result::Result<Vec<u8>, LoadError> {
    let mut bytes = std::fs::read(path).map_err(|source| LoadError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    if bytes.len() < REU_SIZE {
        return Err(LoadError::ShortExpansionImage {
            path: path.to_path_buf(),
            got: bytes.len(),
            need: REU_SIZE,
        });
    }
    bytes.truncate(REU_SIZE);
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn memory() -> AddressSpace {
        AddressSpace::with_expansion(Vec::new())
    }

    fn image(load_address: u16, payload: &[u8]) -> ProgramImage {
        let mut bytes = load_address.to_le_bytes().to_vec();
        bytes.extend_from_slice(payload);
        ProgramImage::from_bytes("test.prg", &bytes).unwrap()
    }

    // 10 SYS<text>
    fn basic_sys(text: &str) -> Vec<u8> {
        let mut line = vec![0x0B, 0x08, 0x0A, 0x00, SYS_TOKEN];
        line.extend_from_slice(text.as_bytes());
        line.extend_from_slice(&[0x00, 0x00, 0x00]);
        line
    }

    #[test]
    fn test_missing_header() {
        assert!(matches!(
            ProgramImage::from_bytes("x.prg", &[0x01]),
            Err(LoadError::MissingHeader { .. })
        ));
    }

    #[test]
    fn test_payload_past_end_of_memory_is_rejected() {
        let mut bytes = vec![0xF0, 0xFF];
        bytes.extend_from_slice(&[0xEA; 0x20]);
        match ProgramImage::from_bytes("big.prg", &bytes) {
            Err(LoadError::Overflow { load_address, len, .. }) => {
                assert_eq!(load_address, 0xFFF0);
                assert_eq!(len, 0x20);
            }
            other => panic!("expected overflow, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_payload_ending_at_top_of_memory_fits() {
        let img = image(0xFFFE, &[0x34, 0x12]);
        let loaded = load_program(memory(), &[img], &Overrides::default()).unwrap();
        assert_eq!(loaded.memory.read_word(0xFFFE), 0x1234);
    }

    #[test]
    fn test_c64_basic_program_autostarts_at_sys() {
        let img = image(0x0801, &basic_sys("2061"));
        let loaded = load_program(memory(), &[img], &Overrides::default()).unwrap();
        assert_eq!(loaded.machine, MachineVariant::C64);
        assert_eq!(loaded.pc, 2061);
        assert_eq!(loaded.sp, INITIAL_SP);
        assert_eq!(loaded.memory.read(0x0805), SYS_TOKEN);
    }

    #[test]
    fn test_ted_program_with_parenthesised_sys() {
        let img = image(0x1001, &basic_sys("(4109)"));
        let loaded = load_program(memory(), &[img], &Overrides::default()).unwrap();
        assert_eq!(loaded.machine, MachineVariant::Ted);
        assert_eq!(loaded.pc, 4109);
    }

    #[test]
    fn test_sys_with_hex_and_spaces() {
        let img = image(0x1C01, &basic_sys(" $1C10"));
        let loaded = load_program(memory(), &[img], &Overrides::default()).unwrap();
        assert_eq!(loaded.machine, MachineVariant::C128);
        assert_eq!(loaded.pc, 0x1C10);
    }

    #[test]
    fn test_sys_without_digits_falls_back_to_load_address() {
        let img = image(0x0401, &basic_sys("X"));
        let loaded = load_program(memory(), &[img], &Overrides::default()).unwrap();
        assert_eq!(loaded.machine, MachineVariant::Pet4);
        assert_eq!(loaded.pc, 0x0401);
    }

    #[test]
    fn test_machine_code_image_starts_at_load_address() {
        let img = image(0xC000, &[0xA9, 0x00, 0x60]);
        let loaded = load_program(memory(), &[img], &Overrides::default()).unwrap();
        assert_eq!(loaded.machine, MachineVariant::C64);
        assert_eq!(loaded.pc, 0xC000);
        assert!(!loaded.external_rom);
    }

    #[test]
    fn test_sys_token_ignored_outside_basic_area() {
        let mut payload = vec![0; 4];
        payload.push(SYS_TOKEN);
        payload.extend_from_slice(b"4096");
        let loaded = load_program(memory(), &[image(0x3000, &payload)], &Overrides::default()).unwrap();
        assert_eq!(loaded.pc, 0x3000);
    }

    #[test]
    fn test_cartridge_image_sets_external_rom() {
        let images = [image(0x0801, &basic_sys("2061")), image(0x8000, &[0x09, 0x80])];
        let loaded = load_program(memory(), &images, &Overrides::default()).unwrap();
        assert!(loaded.external_rom);
        // The first image decides the start address.
        assert_eq!(loaded.pc, 2061);
    }

    #[test]
    fn test_overrides_win() {
        let overrides = Overrides {
            machine: Some(MachineVariant::Vic20),
            start: Some(0x1300),
            start_indirect: None,
        };
        let loaded = load_program(memory(), &[image(0x0801, &basic_sys("2061"))], &overrides).unwrap();
        assert_eq!(loaded.machine, MachineVariant::Vic20);
        assert_eq!(loaded.pc, 0x1300);
    }

    #[test]
    fn test_indirect_start_reads_vector_after_loading() {
        let overrides = Overrides {
            start_indirect: Some(0x8000),
            start: Some(0x1234),
            ..Overrides::default()
        };
        let loaded = load_program(memory(), &[image(0x8000, &[0x09, 0x80])], &overrides).unwrap();
        assert_eq!(loaded.pc, 0x8009);
    }

    #[test]
    fn test_no_images_and_no_start_is_usage_error() {
        assert!(matches!(
            load_program(memory(), &[], &Overrides::default()),
            Err(Error::Usage(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0x00, 0xC0, 0xEA, 0x60]).unwrap();
        let img = ProgramImage::load_from_file(file.path()).unwrap();
        assert_eq!(img.load_address, 0xC000);
        assert_eq!(img.payload, vec![0xEA, 0x60]);
    }

    #[test]
    fn test_missing_file_is_open_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ProgramImage::load_from_file(&dir.path().join("nope.prg")).err();
        assert!(matches!(err, Some(LoadError::Open { .. })));
    }

    #[test]
    fn test_short_expansion_image_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0u8; 1024]).unwrap();
        match load_expansion(file.path()) {
            Err(LoadError::ShortExpansionImage { got, need, .. }) => {
                assert_eq!(got, 1024);
                assert_eq!(need, REU_SIZE);
            }
            other => panic!("expected short image error, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_full_expansion_image_loads() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let mut data = vec![0u8; REU_SIZE + 10];
        data[REU_SIZE - 1] = 0x7E;
        file.write_all(&data).unwrap();
        let reu = load_expansion(file.path()).unwrap();
        assert_eq!(reu.len(), REU_SIZE);
        assert_eq!(reu[REU_SIZE - 1], 0x7E);
    }
}
