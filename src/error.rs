use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Error opening: {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{}: image is shorter than its 2-byte load address header", path.display())]
    MissingHeader { path: PathBuf },
    #[error("{}: {len} bytes at ${load_address:04X} run past the end of memory", path.display())]
    Overflow {
        path: PathBuf,
        load_address: u16,
        len: usize,
    },
    #[error("{}: expansion memory image has {got} bytes, need {need}", path.display())]
    ShortExpansionImage {
        path: PathBuf,
        got: usize,
        need: usize,
    },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Usage(String),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("unknown PC=${pc:04X} S=${sp:02X} (caller: ${caller:04X})")]
    DispatchMiss { pc: u16, sp: u8, caller: u16 },
}

pub type Result<T> = std::result::Result<T, Error>;
