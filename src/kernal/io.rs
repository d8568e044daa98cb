// Console and channel routines. There are no devices besides keyboard and
// screen, so file routines only record their parameters.
use super::{Context, Registers};
use crate::display::CR;

const DEVICE_KEYBOARD: u8 = 0;
const DEVICE_SCREEN: u8 = 3;
const STATUS_EOF: u8 = 0x40;

#[derive(Debug, Clone)]
pub struct Channels {
    pub status: u8,
    pub messages: u8,
    pub logical_file: u8,
    pub device: u8,
    pub secondary: u8,
    pub file_name: Vec<u8>,
    pub input: u8,
    pub output: u8,
}

impl Default for Channels {
    fn default() -> Self {
        Channels {
            status: 0,
            messages: 0,
            logical_file: 0,
            device: 0,
            secondary: 0,
            file_name: Vec::new(),
            input: DEVICE_KEYBOARD,
            output: DEVICE_SCREEN,
        }
    }
}

pub fn chrout(ctx: &mut Context, mut regs: Registers) -> Registers {
    ctx.screen.put_char(regs.a);
    regs.set_carry(false);
    regs
}

pub fn chrin(ctx: &mut Context, mut regs: Registers) -> Registers {
    match ctx.screen.read_char() {
        Some(c) => regs.set_a(c),
        None => {
            ctx.channels.status |= STATUS_EOF;
            regs.set_a(CR);
        }
    }
    regs.set_carry(false);
    regs
}

pub fn getin(ctx: &mut Context, mut regs: Registers) -> Registers {
    regs.set_a(ctx.screen.poll_key().unwrap_or(0));
    regs.set_carry(false);
    regs
}

// Z set would mean STOP is held down; it never is.
pub fn stop(_ctx: &mut Context, mut regs: Registers) -> Registers {
    regs.set_zero(false);
    regs
}

pub fn clrchn(ctx: &mut Context, regs: Registers) -> Registers {
    ctx.channels.input = DEVICE_KEYBOARD;
    ctx.channels.output = DEVICE_SCREEN;
    regs
}

pub fn clall(ctx: &mut Context, regs: Registers) -> Registers {
    ctx.channels.logical_file = 0;
    clrchn(ctx, regs)
}

pub fn readst(ctx: &mut Context, mut regs: Registers) -> Registers {
    regs.set_a(ctx.channels.status);
    regs
}

pub fn setlfs(ctx: &mut Context, regs: Registers) -> Registers {
    ctx.channels.logical_file = regs.a;
    ctx.channels.device = regs.x;
    ctx.channels.secondary = regs.y;
    regs
}

pub fn setnam(ctx: &mut Context, regs: Registers) -> Registers {
    let start = regs.xy();
    let name: Vec<u8> = (0..regs.a as u16)
        .map(|i| ctx.memory.read(start.wrapping_add(i)))
        .collect();
    ctx.channels.file_name = name;
    log::debug!(
        "SETNAM \"{}\" for file {} on device {},{}",
        String::from_utf8_lossy(&ctx.channels.file_name),
        ctx.channels.logical_file,
        ctx.channels.device,
        ctx.channels.secondary
    );
    regs
}

pub fn setmsg(ctx: &mut Context, regs: Registers) -> Registers {
    log::trace!("SETMSG ${:02X} -> ${:02X}", ctx.channels.messages, regs.a);
    ctx.channels.messages = regs.a;
    regs
}

/// SCREEN: X = columns, Y = rows.
pub fn screen(ctx: &mut Context, mut regs: Registers) -> Registers {
    regs.x = ctx.columns;
    regs.y = ctx.rows;
    regs
}

/// PLOT: carry set reads the cursor into X (row) / Y (column), carry clear moves it.
pub fn plot(ctx: &mut Context, mut regs: Registers) -> Registers {
    if regs.carry() {
        let (row, col) = ctx.screen.cursor();
        regs.x = row;
        regs.y = col;
    } else {
        ctx.screen.set_cursor(regs.x, regs.y);
    }
    regs
}

pub fn iobase(ctx: &mut Context, mut regs: Registers) -> Registers {
    regs.set_xy(ctx.machine.profile().io_base);
    regs
}
