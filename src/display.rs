// Text screen collaborator: PETSCII in, host terminal out.
use std::collections::VecDeque;
use std::io::{BufRead, Write};

pub const CR: u8 = 0x0D;
const CLEAR_SCREEN: u8 = 0x93;

pub trait Screen {
    /// Called once before the program starts.
    fn init(&mut self, columns: u8, text_mode: bool);
    fn put_char(&mut self, petscii: u8);
    /// Next character of the current input line, reading a new line when the
    /// previous one is used up. `None` at end of input.
    fn read_char(&mut self) -> Option<u8>;
    /// Next already-typed key, without waiting.
    fn poll_key(&mut self) -> Option<u8>;
    fn cursor(&self) -> (u8, u8);
    fn set_cursor(&mut self, row: u8, col: u8);
}

/// Maps PETSCII to ASCII (or a close Unicode stand-in).
pub fn petscii_to_char(c: u8, text_mode: bool) -> Option<char> {
    let ch = match c {
        0x20..=0x40 | 0x5B | 0x5D => c as char,
        0x5C => '£',
        0x5E => '↑',
        0x5F => '←',
        0x41..=0x5A if text_mode => (c + 0x20) as char,
        0x41..=0x5A => c as char,
        0x61..=0x7A | 0xC1..=0xDA if text_mode => ((c & 0x1F) + 0x40) as char,
        0xA0 => ' ',
        _ => return None,
    };
    Some(ch)
}

/// Host keystroke to PETSCII; swaps case in the lowercase character set.
pub fn ascii_to_petscii(c: u8, text_mode: bool) -> u8 {
    match c {
        b'\n' | b'\r' => CR,
        b'a'..=b'z' if text_mode => c - 0x20,
        b'A'..=b'Z' if text_mode => c + 0x80,
        b'a'..=b'z' => c - 0x20,
        _ => c,
    }
}

pub struct TerminalScreen<R: BufRead, W: Write> {
    input: R,
    output: W,
    columns: u8,
    text_mode: bool,
    row: u8,
    col: u8,
    line: VecDeque<u8>,
    // Set after the first failed write so a closed terminal is reported once.
    output_failed: bool,
}

impl<R: BufRead, W: Write> TerminalScreen<R, W> {
    pub fn new(input: R, output: W) -> Self {
        TerminalScreen {
            input,
            output,
            columns: 40,
            text_mode: false,
            row: 0,
            col: 0,
            line: VecDeque::new(),
            output_failed: false,
        }
    }

    fn emit(&mut self, bytes: &[u8]) {
        let result = self.output.write_all(bytes);
        self.check(result);
    }

    fn check(&mut self, result: std::io::Result<()>) {
        if let Err(e) = result {
            if !self.output_failed {
                log::warn!("Screen output failed: {}", e);
                self.output_failed = true;
            }
        }
    }

    #[cfg(test)]
    pub fn output(&self) -> &W {
        &self.output
    }

    fn newline(&mut self) {
        self.emit(b"\n");
        self.col = 0;
        self.row = self.row.saturating_add(1);
    }

    fn fill_line(&mut self) -> bool {
        let mut raw = String::new();
        match self.input.read_line(&mut raw) {
            Ok(0) => false,
            Err(e) => {
                log::warn!("Keyboard input failed: {}", e);
                false
            }
            Ok(_) => {
                let text = raw.trim_end_matches(['\n', '\r']);
                let text_mode = self.text_mode;
                self.line
                    .extend(text.bytes().map(|b| ascii_to_petscii(b, text_mode)));
                self.line.push_back(CR);
                // The typed line leaves the cursor at the start of the next row.
                self.col = 0;
                self.row = self.row.saturating_add(1);
                true
            }
        }
    }
}

impl<R: BufRead, W: Write> Screen for TerminalScreen<R, W> {
    fn init(&mut self, columns: u8, text_mode: bool) {
        self.columns = columns;
        self.text_mode = text_mode;
    }

    fn put_char(&mut self, petscii: u8) {
        match petscii {
            CR => self.newline(),
            CLEAR_SCREEN => {
                self.emit(b"\x1b[2J\x1b[H");
                self.row = 0;
                self.col = 0;
            }
            _ => {
                let Some(ch) = petscii_to_char(petscii, self.text_mode) else {
                    return;
                };
                let mut buf = [0u8; 4];
                self.emit(ch.encode_utf8(&mut buf).as_bytes());
                self.col = self.col.saturating_add(1);
                if self.columns != 0 && self.col >= self.columns {
                    self.newline();
                }
            }
        }
        let result = self.output.flush();
        self.check(result);
    }

    fn read_char(&mut self) -> Option<u8> {
        if self.line.is_empty() && !self.fill_line() {
            return None;
        }
        self.line.pop_front()
    }

    fn poll_key(&mut self) -> Option<u8> {
        self.line.pop_front()
    }

    fn cursor(&self) -> (u8, u8) {
        (self.row, self.col)
    }

    fn set_cursor(&mut self, row: u8, col: u8) {
        self.row = row;
        self.col = col;
        let result = write!(self.output, "\x1b[{};{}H", row as u16 + 1, col as u16 + 1);
        self.check(result);
    }
}
