mod cli;
mod cpu;
mod debug_flags;
mod display;
mod emulator;
mod error;
mod kernal;
mod loader;
mod machine;
mod memory;
mod reu;
mod snapshot;

use std::env;
use std::io;
use std::process;

use cli::Options;
use display::TerminalScreen;
use emulator::Emulator;
use error::Error;
use loader::ProgramImage;
use memory::AddressSpace;
use snapshot::Snapshot;

fn build_emulator(options: &Options) -> Result<Emulator, Box<dyn std::error::Error>> {
    let expansion = loader::load_expansion(debug_flags::reu_image())?;
    if !debug_flags::quiet() {
        eprintln!("READ REU: {} bytes", expansion.len());
    }
    let memory = AddressSpace::with_expansion(expansion);

    let images = options
        .files
        .iter()
        .map(|path| ProgramImage::load_from_file(path))
        .collect::<Result<Vec<_>, _>>()?;

    let screen = Box::new(TerminalScreen::new(io::stdin().lock(), io::stdout()));

    let Some(path) = &options.resume else {
        let program = loader::load_program(memory, &images, &options.overrides)?;
        return Ok(Emulator::new(program, screen));
    };

    let snapshot = Snapshot::load_from_file(path)?;
    Ok(snapshot.resume(memory, &images, &options.overrides, screen))
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("kernal-emu");

    let options = match cli::parse_args(program, args.iter().skip(1).cloned()) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };

    let mut emulator = match build_emulator(&options) {
        Ok(emulator) => emulator,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };
    emulator.init_screen(options.columns, options.text_mode);

    let err = match emulator.run() {
        Ok(never) => match never {},
        Err(err) => err,
    };
    eprintln!("\n{}", err);

    if let (Error::DispatchMiss { .. }, Some(path)) = (&err, debug_flags::dump_path()) {
        if let Err(e) = Snapshot::capture(&emulator).save_to_file(path) {
            log::error!("Failed to write snapshot {}: {}", path.display(), e);
        }
    }
    process::exit(1);
}
