use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use super::*;
use crate::display::CR;

/// Screen that records output and serves canned input.
#[derive(Default, Clone)]
pub(crate) struct TestScreen {
    pub printed: Rc<RefCell<Vec<u8>>>,
    pub input: Rc<RefCell<VecDeque<u8>>>,
    pub init: Rc<RefCell<Option<(u8, bool)>>>,
    cursor: (u8, u8),
}

impl Screen for TestScreen {
    fn init(&mut self, columns: u8, text_mode: bool) {
        *self.init.borrow_mut() = Some((columns, text_mode));
    }

    fn put_char(&mut self, petscii: u8) {
        self.printed.borrow_mut().push(petscii);
    }

    fn read_char(&mut self) -> Option<u8> {
        self.input.borrow_mut().pop_front()
    }

    fn poll_key(&mut self) -> Option<u8> {
        self.input.borrow_mut().pop_front()
    }

    fn cursor(&self) -> (u8, u8) {
        self.cursor
    }

    fn set_cursor(&mut self, row: u8, col: u8) {
        self.cursor = (row, col);
    }
}

pub(crate) fn test_context(machine: MachineVariant) -> (Context, TestScreen) {
    let screen = TestScreen::default();
    let memory = AddressSpace::with_expansion(vec![0; 0x10000]);
    let ctx = Context::new(memory, machine, false, Box::new(screen.clone()));
    (ctx, screen)
}

fn regs() -> Registers {
    Registers {
        a: 0,
        x: 0,
        y: 0,
        status: StatusFlags::UNUSED,
        sp: 0xFD,
    }
}

fn invoke(ctx: &mut Context, addr: u16, regs: Registers) -> Registers {
    let table = DispatchTable::new();
    let routine = table
        .lookup(ctx.machine, addr)
        .unwrap_or_else(|| panic!("no routine at ${:04X} on {}", addr, ctx.machine));
    (routine.handler)(ctx, regs)
}

#[test]
fn test_table_has_no_ram_routines_on_pet() {
    let table = DispatchTable::new();
    for machine in [MachineVariant::Pet, MachineVariant::Pet4] {
        assert!(table.lookup(machine, 0xFF87).is_none());
        assert!(table.lookup(machine, 0xFF99).is_none());
        assert!(table.lookup(machine, 0xFF9C).is_none());
        assert_eq!(table.lookup(machine, 0xFFD2).map(|r| r.name), Some("CHROUT"));
    }
}

#[test]
fn test_table_covers_every_jump_table_machine() {
    let table = DispatchTable::new();
    for machine in [
        MachineVariant::Vic20,
        MachineVariant::C64,
        MachineVariant::Ted,
        MachineVariant::C128,
        MachineVariant::C65,
    ] {
        assert_eq!(table.lookup(machine, 0xFF87).map(|r| r.name), Some("RAMTAS"));
        assert_eq!(table.lookup(machine, 0xFF99).map(|r| r.name), Some("MEMTOP"));
        assert_eq!(table.lookup(machine, 0xFF9C).map(|r| r.name), Some("MEMBOT"));
        assert!(table.lookup(machine, 0xFF88).is_none());
    }
}

#[test]
fn test_ramtas_sets_boundaries_per_machine() {
    let expect = [
        (MachineVariant::Vic20, 0x1200, 0x8000),
        (MachineVariant::C64, 0x0800, 0xA000),
        (MachineVariant::Ted, 0x1000, 0xFD00),
        (MachineVariant::C128, 0x1C00, 0xFF00),
        (MachineVariant::C65, 0x2000, 0xFF00),
    ];
    for (machine, bottom, top) in expect {
        let (mut ctx, _) = test_context(machine);
        invoke(&mut ctx, 0xFF87, regs());
        assert_eq!(ctx.boundaries, MemoryBoundaries { bottom, top }, "{}", machine);
    }
}

#[test]
fn test_ramtas_with_cartridge_on_c64() {
    let (mut ctx, _) = test_context(MachineVariant::C64);
    ctx.external_rom = true;
    invoke(&mut ctx, 0xFF87, regs());
    assert_eq!(ctx.boundaries.top, 0x8000);
}

#[test]
fn test_ramtas_clears_low_memory_only() {
    let (mut ctx, _) = test_context(MachineVariant::C64);
    ctx.memory.fill(0x0000, 0x1000, 0xA5);
    invoke(&mut ctx, 0xFF87, regs());

    let ram = ctx.memory.ram();
    assert!(ram[0x0000..0x0100].iter().all(|&b| b == 0));
    assert!(ram[0x0200..0x0400].iter().all(|&b| b == 0));
    assert!(ram[0x0100..0x0200].iter().all(|&b| b == 0xA5));
    assert!(ram[0x0400..0x1000].iter().all(|&b| b == 0xA5));
}

#[test]
fn test_memtop_write_then_read() {
    let (mut ctx, _) = test_context(MachineVariant::C64);
    let mut set = regs();
    set.x = 0x00;
    set.y = 0x9E;
    invoke(&mut ctx, 0xFF99, set);
    assert_eq!(ctx.boundaries.top, 0x9E00);

    let mut get = regs();
    get.set_carry(true);
    let out = invoke(&mut ctx, 0xFF99, get);
    assert_eq!((out.x, out.y), (0x00, 0x9E));
}

#[test]
fn test_membot_write_then_read() {
    let (mut ctx, _) = test_context(MachineVariant::Ted);
    let mut set = regs();
    set.x = 0x34;
    set.y = 0x12;
    invoke(&mut ctx, 0xFF9C, set);

    let mut get = regs();
    get.set_carry(true);
    let out = invoke(&mut ctx, 0xFF9C, get);
    assert_eq!((out.x, out.y), (0x34, 0x12));
    assert_eq!(ctx.boundaries.bottom, 0x1234);
    assert_eq!(ctx.boundaries.top, 0);
}

#[test]
fn test_call_returns_to_caller() {
    let (mut ctx, _) = test_context(MachineVariant::C64);
    let mut cpu = Cpu::new();
    // JSR $FFD2 from $0810 pushed $0812.
    cpu.sp = 0xFD;
    ctx.memory.write(0x01FE, 0x12);
    ctx.memory.write(0x01FF, 0x08);
    cpu.pc = 0xFFD2;
    cpu.a = b'A';

    let table = DispatchTable::new();
    let routine = table.lookup(MachineVariant::C64, cpu.pc).unwrap();
    call(routine, &mut cpu, &mut ctx);

    assert_eq!(cpu.pc, 0x0813);
    assert_eq!(cpu.sp, 0xFF);
    assert_eq!(cpu.a, b'A');
}

#[test]
fn test_stack_word_wraps_inside_page_one() {
    let (mut ctx, _) = test_context(MachineVariant::C64);
    ctx.memory.write(0x0100, 0x34);
    ctx.memory.write(0x01FF, 0x12);
    assert_eq!(stack_word(&ctx.memory, 0xFE), 0x3412);
}

#[test]
fn test_chrout_prints_and_clears_carry() {
    let (mut ctx, screen) = test_context(MachineVariant::C64);
    let mut r = regs();
    r.a = 0x41;
    r.x = 7;
    r.set_carry(true);
    let out = invoke(&mut ctx, 0xFFD2, r);
    assert_eq!(*screen.printed.borrow(), vec![0x41]);
    assert!(!out.carry());
    assert_eq!((out.a, out.x), (0x41, 7));
}

#[test]
fn test_chrin_reads_input_and_flags_eof() {
    let (mut ctx, screen) = test_context(MachineVariant::Pet4);
    screen.input.borrow_mut().extend([b'Y', CR]);
    assert_eq!(invoke(&mut ctx, 0xFFCF, regs()).a, b'Y');
    assert_eq!(invoke(&mut ctx, 0xFFCF, regs()).a, CR);
    assert_eq!(ctx.channels.status, 0);

    assert_eq!(invoke(&mut ctx, 0xFFCF, regs()).a, CR);
    assert_eq!(ctx.channels.status & 0x40, 0x40);
}

#[test]
fn test_getin_returns_zero_without_key() {
    let (mut ctx, _) = test_context(MachineVariant::C64);
    let out = invoke(&mut ctx, 0xFFE4, regs());
    assert_eq!(out.a, 0);
    assert!(out.status.contains(StatusFlags::ZERO));
}

#[test]
fn test_stop_reports_not_pressed() {
    let (mut ctx, _) = test_context(MachineVariant::C64);
    let mut r = regs();
    r.set_zero(true);
    assert!(!invoke(&mut ctx, 0xFFE1, r).status.contains(StatusFlags::ZERO));
}

#[test]
fn test_setlfs_setnam_readst() {
    let (mut ctx, _) = test_context(MachineVariant::C64);
    ctx.memory.load(0x2000, b"DATA");
    invoke(&mut ctx, 0xFFBA, Registers { a: 2, x: 8, y: 15, ..regs() });
    invoke(&mut ctx, 0xFFBD, Registers { a: 4, x: 0x00, y: 0x20, ..regs() });
    assert_eq!(ctx.channels.logical_file, 2);
    assert_eq!(ctx.channels.device, 8);
    assert_eq!(ctx.channels.secondary, 15);
    assert_eq!(ctx.channels.file_name, b"DATA");

    ctx.channels.status = 0x42;
    assert_eq!(invoke(&mut ctx, 0xFFB7, regs()).a, 0x42);
}

#[test]
fn test_clall_restores_default_channels() {
    let (mut ctx, _) = test_context(MachineVariant::C64);
    ctx.channels.input = 8;
    ctx.channels.output = 4;
    invoke(&mut ctx, 0xFFE7, regs());
    assert_eq!((ctx.channels.input, ctx.channels.output), (0, 3));
}

#[test]
fn test_screen_and_iobase() {
    let (mut ctx, _) = test_context(MachineVariant::Vic20);
    let out = invoke(&mut ctx, 0xFFED, regs());
    assert_eq!((out.x, out.y), (22, 23));
    let out = invoke(&mut ctx, 0xFFF3, regs());
    assert_eq!(out.xy(), 0x9110);
}

#[test]
fn test_plot_moves_and_reads_cursor() {
    let (mut ctx, _) = test_context(MachineVariant::C64);
    invoke(&mut ctx, 0xFFF0, Registers { x: 5, y: 12, ..regs() });
    let mut get = regs();
    get.set_carry(true);
    let out = invoke(&mut ctx, 0xFFF0, get);
    assert_eq!((out.x, out.y), (5, 12));
}

#[test]
fn test_settim_then_rdtim() {
    let (mut ctx, _) = test_context(MachineVariant::C64);
    invoke(&mut ctx, 0xFFDB, Registers { a: 0x10, x: 0x20, y: 0x03, ..regs() });
    let out = invoke(&mut ctx, 0xFFDE, regs());
    let read = u32::from_le_bytes([out.a, out.x, out.y, 0]);
    // A jiffy may tick between the two calls.
    assert!((0x032010..=0x032011).contains(&read), "read {:06X}", read);
}
