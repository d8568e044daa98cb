use std::path::PathBuf;
use std::sync::OnceLock;

const DEFAULT_REU_IMAGE: &str = "reufile.linux";

fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "on" | "ON"))
        .unwrap_or(default)
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var_os(key)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

pub fn quiet() -> bool {
    static ON: OnceLock<bool> = OnceLock::new();
    *ON.get_or_init(|| env_flag("QUIET", false))
}

// Backing image for the 16MB expansion memory.
pub fn reu_image() -> &'static PathBuf {
    static PATH: OnceLock<PathBuf> = OnceLock::new();
    PATH.get_or_init(|| env_path("REU_IMAGE").unwrap_or_else(|| PathBuf::from(DEFAULT_REU_IMAGE)))
}

// Where to write a post-mortem snapshot when a run stops on an unknown PC.
pub fn dump_path() -> Option<&'static PathBuf> {
    static PATH: OnceLock<Option<PathBuf>> = OnceLock::new();
    PATH.get_or_init(|| env_path("KERNAL_DUMP")).as_ref()
}
