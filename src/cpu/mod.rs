use bitflags::bitflags;


bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct StatusFlags: u8 {
        const CARRY = 0b00000001;
        const ZERO = 0b00000010;
        const INTERRUPT_DISABLE = 0b00000100;
        const DECIMAL = 0b00001000;
        const BREAK = 0b00010000;
        const UNUSED = 0b00100000;
        const OVERFLOW = 0b01000000;
        const NEGATIVE = 0b10000000;
    }
}

pub trait CpuBus {
    fn read(&mut self, addr: u16) -> u8;
    fn write(&mut self, addr: u16, data: u8);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    IndexedIndirect,
    IndirectIndexed,
}

/// NMOS 6502, documented opcodes only, no cycle timing.
pub struct Cpu {
    pub a: u8,      // Accumulator
    pub x: u8,      // X register
    pub y: u8,      // Y register
    pub sp: u8,     // Stack pointer
    pub pc: u16,    // Program counter
    pub status: StatusFlags,
    instructions: u64,
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl Cpu {
    pub fn new() -> Self {
        Cpu {
            a: 0,
            x: 0,
            y: 0,
            sp: 0xFD,
            pc: 0,
            status: StatusFlags::from_bits_truncate(0x24),
            instructions: 0,
        }
    }

    /// Register reset. The program counter is left for the caller to set.
    pub fn reset(&mut self) {
        self.a = 0;
        self.x = 0;
        self.y = 0;
        self.sp = 0xFD;
        self.status = StatusFlags::from_bits_truncate(0x24);
        self.instructions = 0;
    }

    pub fn instructions(&self) -> u64 {
        self.instructions
    }

    pub fn set_instructions(&mut self, count: u64) {
        self.instructions = count;
    }

    pub fn step(&mut self, bus: &mut dyn CpuBus) {
        let opcode = self.read_byte(bus);
        self.instructions += 1;
        self.execute_instruction(opcode, bus);
    }

    fn execute_instruction(&mut self, opcode: u8, bus: &mut dyn CpuBus) {
        use Mode::*;

        match opcode {
            // Loads and stores
            0xA9 => self.lda(bus, Immediate),
            0xA5 => self.lda(bus, ZeroPage),
            0xB5 => self.lda(bus, ZeroPageX),
            0xAD => self.lda(bus, Absolute),
            0xBD => self.lda(bus, AbsoluteX),
            0xB9 => self.lda(bus, AbsoluteY),
            0xA1 => self.lda(bus, IndexedIndirect),
            0xB1 => self.lda(bus, IndirectIndexed),

            0xA2 => self.ldx(bus, Immediate),
            0xA6 => self.ldx(bus, ZeroPage),
            0xB6 => self.ldx(bus, ZeroPageY),
            0xAE => self.ldx(bus, Absolute),
            0xBE => self.ldx(bus, AbsoluteY),

            0xA0 => self.ldy(bus, Immediate),
            0xA4 => self.ldy(bus, ZeroPage),
            0xB4 => self.ldy(bus, ZeroPageX),
            0xAC => self.ldy(bus, Absolute),
            0xBC => self.ldy(bus, AbsoluteX),

            0x85 => self.store(bus, ZeroPage, self.a),
            0x95 => self.store(bus, ZeroPageX, self.a),
            0x8D => self.store(bus, Absolute, self.a),
            0x9D => self.store(bus, AbsoluteX, self.a),
            0x99 => self.store(bus, AbsoluteY, self.a),
            0x81 => self.store(bus, IndexedIndirect, self.a),
            0x91 => self.store(bus, IndirectIndexed, self.a),

            0x86 => self.store(bus, ZeroPage, self.x),
            0x96 => self.store(bus, ZeroPageY, self.x),
            0x8E => self.store(bus, Absolute, self.x),

            0x84 => self.store(bus, ZeroPage, self.y),
            0x94 => self.store(bus, ZeroPageX, self.y),
            0x8C => self.store(bus, Absolute, self.y),

            // Arithmetic
            0x69 | 0x65 | 0x75 | 0x6D | 0x7D | 0x79 | 0x61 | 0x71 => {
                let value = self.load(bus, group_one_mode(opcode));
                self.adc(value);
            }
            0xE9 | 0xE5 | 0xF5 | 0xED | 0xFD | 0xF9 | 0xE1 | 0xF1 => {
                let value = self.load(bus, group_one_mode(opcode));
                self.sbc(value);
            }

            // Logic
            0x29 | 0x25 | 0x35 | 0x2D | 0x3D | 0x39 | 0x21 | 0x31 => {
                self.a &= self.load(bus, group_one_mode(opcode));
                self.set_zero_negative_flags(self.a);
            }
            0x09 | 0x05 | 0x15 | 0x0D | 0x1D | 0x19 | 0x01 | 0x11 => {
                self.a |= self.load(bus, group_one_mode(opcode));
                self.set_zero_negative_flags(self.a);
            }
            0x49 | 0x45 | 0x55 | 0x4D | 0x5D | 0x59 | 0x41 | 0x51 => {
                self.a ^= self.load(bus, group_one_mode(opcode));
                self.set_zero_negative_flags(self.a);
            }
            0x24 => self.bit(bus, ZeroPage),
            0x2C => self.bit(bus, Absolute),

            // Compares
            0xC9 | 0xC5 | 0xD5 | 0xCD | 0xDD | 0xD9 | 0xC1 | 0xD1 => {
                let value = self.load(bus, group_one_mode(opcode));
                self.compare(self.a, value);
            }
            0xE0 => self.cpx(bus, Immediate),
            0xE4 => self.cpx(bus, ZeroPage),
            0xEC => self.cpx(bus, Absolute),
            0xC0 => self.cpy(bus, Immediate),
            0xC4 => self.cpy(bus, ZeroPage),
            0xCC => self.cpy(bus, Absolute),

            // Shifts and rotates
            0x0A => self.a = self.asl(self.a),
            0x06 => self.modify(bus, ZeroPage, Cpu::asl),
            0x16 => self.modify(bus, ZeroPageX, Cpu::asl),
            0x0E => self.modify(bus, Absolute, Cpu::asl),
            0x1E => self.modify(bus, AbsoluteX, Cpu::asl),

            0x4A => self.a = self.lsr(self.a),
            0x46 => self.modify(bus, ZeroPage, Cpu::lsr),
            0x56 => self.modify(bus, ZeroPageX, Cpu::lsr),
            0x4E => self.modify(bus, Absolute, Cpu::lsr),
            0x5E => self.modify(bus, AbsoluteX, Cpu::lsr),

            0x2A => self.a = self.rol(self.a),
            0x26 => self.modify(bus, ZeroPage, Cpu::rol),
            0x36 => self.modify(bus, ZeroPageX, Cpu::rol),
            0x2E => self.modify(bus, Absolute, Cpu::rol),
            0x3E => self.modify(bus, AbsoluteX, Cpu::rol),

            0x6A => self.a = self.ror(self.a),
            0x66 => self.modify(bus, ZeroPage, Cpu::ror),
            0x76 => self.modify(bus, ZeroPageX, Cpu::ror),
            0x6E => self.modify(bus, Absolute, Cpu::ror),
            0x7E => self.modify(bus, AbsoluteX, Cpu::ror),

            // Increments and decrements
            0xE6 => self.modify(bus, ZeroPage, Cpu::inc),
            0xF6 => self.modify(bus, ZeroPageX, Cpu::inc),
            0xEE => self.modify(bus, Absolute, Cpu::inc),
            0xFE => self.modify(bus, AbsoluteX, Cpu::inc),
            0xC6 => self.modify(bus, ZeroPage, Cpu::dec),
            0xD6 => self.modify(bus, ZeroPageX, Cpu::dec),
            0xCE => self.modify(bus, Absolute, Cpu::dec),
            0xDE => self.modify(bus, AbsoluteX, Cpu::dec),
            0xE8 => self.x = self.inc(self.x),
            0xC8 => self.y = self.inc(self.y),
            0xCA => self.x = self.dec(self.x),
            0x88 => self.y = self.dec(self.y),

            // Transfers
            0xAA => {
                self.x = self.a;
                self.set_zero_negative_flags(self.x);
            }
            0x8A => {
                self.a = self.x;
                self.set_zero_negative_flags(self.a);
            }
            0xA8 => {
                self.y = self.a;
                self.set_zero_negative_flags(self.y);
            }
            0x98 => {
                self.a = self.y;
                self.set_zero_negative_flags(self.a);
            }
            0xBA => {
                self.x = self.sp;
                self.set_zero_negative_flags(self.x);
            }
            0x9A => self.sp = self.x,

            // Stack
            0x48 => self.push(bus, self.a),
            0x68 => {
                self.a = self.pull(bus);
                self.set_zero_negative_flags(self.a);
            }
            0x08 => {
                let flags = self.status | StatusFlags::BREAK | StatusFlags::UNUSED;
                self.push(bus, flags.bits());
            }
            0x28 => {
                let flags = self.pull(bus);
                self.set_status_from_stack(flags);
            }

            // Jumps and subroutines
            0x4C => self.pc = self.read_word(bus),
            0x6C => {
                let ptr = self.read_word(bus);
                self.pc = read_word_page_wrapped(bus, ptr);
            }
            0x20 => {
                let target = self.read_word(bus);
                let ret = self.pc.wrapping_sub(1);
                self.push(bus, (ret >> 8) as u8);
                self.push(bus, ret as u8);
                self.pc = target;
            }
            0x60 => {
                let low = self.pull(bus) as u16;
                let high = self.pull(bus) as u16;
                self.pc = ((high << 8) | low).wrapping_add(1);
            }
            0x40 => {
                let flags = self.pull(bus);
                self.set_status_from_stack(flags);
                let low = self.pull(bus) as u16;
                let high = self.pull(bus) as u16;
                self.pc = (high << 8) | low;
            }
            0x00 => self.brk(bus),

            // Branches
            0x10 => self.branch(bus, !self.status.contains(StatusFlags::NEGATIVE)),
            0x30 => self.branch(bus, self.status.contains(StatusFlags::NEGATIVE)),
            0x50 => self.branch(bus, !self.status.contains(StatusFlags::OVERFLOW)),
            0x70 => self.branch(bus, self.status.contains(StatusFlags::OVERFLOW)),
            0x90 => self.branch(bus, !self.status.contains(StatusFlags::CARRY)),
            0xB0 => self.branch(bus, self.status.contains(StatusFlags::CARRY)),
            0xD0 => self.branch(bus, !self.status.contains(StatusFlags::ZERO)),
            0xF0 => self.branch(bus, self.status.contains(StatusFlags::ZERO)),

            // Flags
            0x18 => self.status.remove(StatusFlags::CARRY),
            0x38 => self.status.insert(StatusFlags::CARRY),
            0x58 => self.status.remove(StatusFlags::INTERRUPT_DISABLE),
            0x78 => self.status.insert(StatusFlags::INTERRUPT_DISABLE),
            0xB8 => self.status.remove(StatusFlags::OVERFLOW),
            0xD8 => self.status.remove(StatusFlags::DECIMAL),
            0xF8 => self.status.insert(StatusFlags::DECIMAL),

            0xEA => {}

            _ => {
                log::error!(
                    "Unknown opcode: 0x{:02X} at PC: 0x{:04X}, skipping",
                    opcode,
                    self.pc.wrapping_sub(1)
                );
            }
        }
    }

    fn read_byte(&mut self, bus: &mut dyn CpuBus) -> u8 {
        let byte = bus.read(self.pc);
        self.pc = self.pc.wrapping_add(1);
        byte
    }

    fn read_word(&mut self, bus: &mut dyn CpuBus) -> u16 {
        let low = self.read_byte(bus) as u16;
        let high = self.read_byte(bus) as u16;
        (high << 8) | low
    }

    fn operand_addr(&mut self, bus: &mut dyn CpuBus, mode: Mode) -> u16 {
        match mode {
            Mode::Immediate => {
                let addr = self.pc;
                self.pc = self.pc.wrapping_add(1);
                addr
            }
            Mode::ZeroPage => self.read_byte(bus) as u16,
            Mode::ZeroPageX => self.read_byte(bus).wrapping_add(self.x) as u16,
            Mode::ZeroPageY => self.read_byte(bus).wrapping_add(self.y) as u16,
            Mode::Absolute => self.read_word(bus),
            Mode::AbsoluteX => self.read_word(bus).wrapping_add(self.x as u16),
            Mode::AbsoluteY => self.read_word(bus).wrapping_add(self.y as u16),
            Mode::IndexedIndirect => {
                let zp = self.read_byte(bus).wrapping_add(self.x);
                read_zero_page_word(bus, zp)
            }
            Mode::IndirectIndexed => {
                let zp = self.read_byte(bus);
                read_zero_page_word(bus, zp).wrapping_add(self.y as u16)
            }
        }
    }

    fn load(&mut self, bus: &mut dyn CpuBus, mode: Mode) -> u8 {
        let addr = self.operand_addr(bus, mode);
        bus.read(addr)
    }

    fn store(&mut self, bus: &mut dyn CpuBus, mode: Mode, value: u8) {
        let addr = self.operand_addr(bus, mode);
        bus.write(addr, value);
    }

    fn modify(&mut self, bus: &mut dyn CpuBus, mode: Mode, op: fn(&mut Cpu, u8) -> u8) {
        let addr = self.operand_addr(bus, mode);
        let value = bus.read(addr);
        let result = op(self, value);
        bus.write(addr, result);
    }

    fn push(&mut self, bus: &mut dyn CpuBus, value: u8) {
        let addr = 0x0100 | self.sp as u16;
        bus.write(addr, value);
        self.sp = self.sp.wrapping_sub(1);
    }

    fn pull(&mut self, bus: &mut dyn CpuBus) -> u8 {
        self.sp = self.sp.wrapping_add(1);
        bus.read(0x0100 | self.sp as u16)
    }

    fn set_status_from_stack(&mut self, value: u8) {
        self.status = StatusFlags::from_bits_truncate(value);
        self.status.remove(StatusFlags::BREAK);
        self.status.insert(StatusFlags::UNUSED);
    }

    fn set_zero_negative_flags(&mut self, value: u8) {
        self.status.set(StatusFlags::ZERO, value == 0);
        self.status.set(StatusFlags::NEGATIVE, value & 0x80 != 0);
    }

    fn branch(&mut self, bus: &mut dyn CpuBus, condition: bool) {
        let offset = self.read_byte(bus) as i8;
        if condition {
            self.pc = self.pc.wrapping_add(offset as u16);
        }
    }

    fn brk(&mut self, bus: &mut dyn CpuBus) {
        // Skip the padding byte
        let ret = self.pc.wrapping_add(1);
        self.push(bus, (ret >> 8) as u8);
        self.push(bus, ret as u8);
        let flags = self.status | StatusFlags::BREAK | StatusFlags::UNUSED;
        self.push(bus, flags.bits());
        self.status.insert(StatusFlags::INTERRUPT_DISABLE);
        let low = bus.read(0xFFFE) as u16;
        let high = bus.read(0xFFFF) as u16;
        self.pc = (high << 8) | low;
    }

    fn lda(&mut self, bus: &mut dyn CpuBus, mode: Mode) {
        self.a = self.load(bus, mode);
        self.set_zero_negative_flags(self.a);
    }

    fn ldx(&mut self, bus: &mut dyn CpuBus, mode: Mode) {
        self.x = self.load(bus, mode);
        self.set_zero_negative_flags(self.x);
    }

    fn ldy(&mut self, bus: &mut dyn CpuBus, mode: Mode) {
        self.y = self.load(bus, mode);
        self.set_zero_negative_flags(self.y);
    }

    fn bit(&mut self, bus: &mut dyn CpuBus, mode: Mode) {
        let value = self.load(bus, mode);
        self.status.set(StatusFlags::ZERO, self.a & value == 0);
        self.status.set(StatusFlags::NEGATIVE, value & 0x80 != 0);
        self.status.set(StatusFlags::OVERFLOW, value & 0x40 != 0);
    }

    fn cpx(&mut self, bus: &mut dyn CpuBus, mode: Mode) {
        let value = self.load(bus, mode);
        self.compare(self.x, value);
    }

    fn cpy(&mut self, bus: &mut dyn CpuBus, mode: Mode) {
        let value = self.load(bus, mode);
        self.compare(self.y, value);
    }

    fn compare(&mut self, reg: u8, value: u8) {
        self.status.set(StatusFlags::CARRY, reg >= value);
        self.set_zero_negative_flags(reg.wrapping_sub(value));
    }

    fn adc_binary(&mut self, value: u8) {
        let carry = if self.status.contains(StatusFlags::CARRY) { 1 } else { 0 };
        let result = self.a as u16 + value as u16 + carry;

        self.status.set(StatusFlags::CARRY, result > 0xFF);
        self.status.set(
            StatusFlags::OVERFLOW,
            (self.a ^ result as u8) & (value ^ result as u8) & 0x80 != 0,
        );

        self.a = result as u8;
        self.set_zero_negative_flags(self.a);
    }

    // In decimal mode Z/N/V follow the binary sum, as on NMOS parts.
    fn adc(&mut self, value: u8) {
        if !self.status.contains(StatusFlags::DECIMAL) {
            self.adc_binary(value);
            return;
        }
        let carry = if self.status.contains(StatusFlags::CARRY) { 1 } else { 0 };
        let mut low = (self.a & 0x0F) as u16 + (value & 0x0F) as u16 + carry;
        let mut high = (self.a >> 4) as u16 + (value >> 4) as u16;
        if low > 9 {
            low += 6;
        }
        if low > 0x0F {
            high += 1;
        }
        if high > 9 {
            high += 6;
        }
        self.adc_binary(value);
        self.status.set(StatusFlags::CARRY, high > 0x0F);
        self.a = ((high << 4) | (low & 0x0F)) as u8;
    }

    fn sbc(&mut self, value: u8) {
        if !self.status.contains(StatusFlags::DECIMAL) {
            self.adc_binary(!value);
            return;
        }
        let borrow = if self.status.contains(StatusFlags::CARRY) { 0 } else { 1 };
        let mut low = (self.a & 0x0F) as i16 - (value & 0x0F) as i16 - borrow;
        let mut high = (self.a >> 4) as i16 - (value >> 4) as i16;
        if low < 0 {
            low -= 6;
            high -= 1;
        }
        if high < 0 {
            high -= 6;
        }
        let result = ((high << 4) | (low & 0x0F)) as u8;
        self.adc_binary(!value);
        self.a = result;
    }

    fn asl(&mut self, value: u8) -> u8 {
        self.status.set(StatusFlags::CARRY, value & 0x80 != 0);
        let result = value << 1;
        self.set_zero_negative_flags(result);
        result
    }

    fn lsr(&mut self, value: u8) -> u8 {
        self.status.set(StatusFlags::CARRY, value & 0x01 != 0);
        let result = value >> 1;
        self.set_zero_negative_flags(result);
        result
    }

    fn rol(&mut self, value: u8) -> u8 {
        let carry_in = self.status.contains(StatusFlags::CARRY) as u8;
        self.status.set(StatusFlags::CARRY, value & 0x80 != 0);
        let result = (value << 1) | carry_in;
        self.set_zero_negative_flags(result);
        result
    }

    fn ror(&mut self, value: u8) -> u8 {
        let carry_in = (self.status.contains(StatusFlags::CARRY) as u8) << 7;
        self.status.set(StatusFlags::CARRY, value & 0x01 != 0);
        let result = (value >> 1) | carry_in;
        self.set_zero_negative_flags(result);
        result
    }

    fn inc(&mut self, value: u8) -> u8 {
        let result = value.wrapping_add(1);
        self.set_zero_negative_flags(result);
        result
    }

    fn dec(&mut self, value: u8) -> u8 {
        let result = value.wrapping_sub(1);
        self.set_zero_negative_flags(result);
        result
    }
}

// ALU group opcodes share the addressing mode layout in bits 2-4.
fn group_one_mode(opcode: u8) -> Mode {
    match (opcode >> 2) & 0x07 {
        0 => Mode::IndexedIndirect,
        1 => Mode::ZeroPage,
        2 => Mode::Immediate,
        3 => Mode::Absolute,
        4 => Mode::IndirectIndexed,
        5 => Mode::ZeroPageX,
        6 => Mode::AbsoluteY,
        _ => Mode::AbsoluteX,
    }
}

fn read_zero_page_word(bus: &mut dyn CpuBus, zp: u8) -> u16 {
    let low = bus.read(zp as u16) as u16;
    let high = bus.read(zp.wrapping_add(1) as u16) as u16;
    (high << 8) | low
}

// JMP ($xxFF) fetches the high byte from $xx00.
fn read_word_page_wrapped(bus: &mut dyn CpuBus, ptr: u16) -> u16 {
    let low = bus.read(ptr) as u16;
    let high = bus.read((ptr & 0xFF00) | (ptr.wrapping_add(1) & 0x00FF)) as u16;
    (high << 8) | low
}
