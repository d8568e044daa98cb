use super::{Context, Registers};
use crate::machine::Boundary;

/// RAMTAS: size RAM for this model and clear the low pages.
pub fn ramtas(ctx: &mut Context, regs: Registers) -> Registers {
    let profile = ctx.machine.profile();
    let Some(boundaries) = profile.reset_boundaries(ctx.external_rom) else {
        unreachable!("{} firmware has no RAMTAS", profile.name);
    };
    ctx.boundaries = boundaries;

    // zero page, then $0200-$03FF
    ctx.memory.fill(0x0000, 0x100, 0);
    ctx.memory.fill(0x0200, 0x200, 0);
    regs
}

pub fn memtop(ctx: &mut Context, regs: Registers) -> Registers {
    access_boundary(ctx, regs, Boundary::Top)
}

pub fn membot(ctx: &mut Context, regs: Registers) -> Registers {
    access_boundary(ctx, regs, Boundary::Bottom)
}

// Carry set reads the boundary into X/Y, carry clear sets it from X/Y.
fn access_boundary(ctx: &mut Context, mut regs: Registers, which: Boundary) -> Registers {
    if regs.carry() {
        regs.set_xy(ctx.boundaries.get(which));
    } else {
        ctx.boundaries.set(which, regs.xy());
    }
    regs
}
