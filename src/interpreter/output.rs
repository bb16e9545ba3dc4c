//! Where printed program output goes.
//!
//! [`OutputSink`] requires only [`print_char`](OutputSink::print_char) and
//! [`print_line`](OutputSink::print_line); every other method has a default
//! that formats through `print_char`. Adapters override whichever methods they
//! can render more directly.

use std::io::{self, Write};

/// Any value a sink can print.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Printable<'a> {
    Char(char),
    Str(&'a str),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
}

macro_rules! impl_printable_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Printable<'_> {
                fn from(value: $ty) -> Self {
                    Printable::$variant(value)
                }
            }
        )*
    };
}

impl_printable_from! {
    char => Char,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
}

impl<'a> From<&'a str> for Printable<'a> {
    fn from(value: &'a str) -> Self {
        Printable::Str(value)
    }
}

/// Text output capability used by the print opcodes.
pub trait OutputSink {
    fn print_char(&mut self, c: char);

    /// Emits a line terminator.
    fn print_line(&mut self);

    /// Emits one raw byte. Text sinks store it as the Latin-1 character.
    fn print_byte(&mut self, byte: u8) {
        self.print_char(char::from(byte));
    }

    fn print_str(&mut self, s: &str) {
        for c in s.chars() {
            self.print_char(c);
        }
    }

    fn print_i8(&mut self, value: i8) {
        self.print_str(&value.to_string());
    }

    fn print_i16(&mut self, value: i16) {
        self.print_str(&value.to_string());
    }

    fn print_i32(&mut self, value: i32) {
        self.print_str(&value.to_string());
    }

    fn print_i64(&mut self, value: i64) {
        self.print_str(&value.to_string());
    }

    fn print_u8(&mut self, value: u8) {
        self.print_str(&value.to_string());
    }

    fn print_u16(&mut self, value: u16) {
        self.print_str(&value.to_string());
    }

    fn print_u32(&mut self, value: u32) {
        self.print_str(&value.to_string());
    }

    fn print_u64(&mut self, value: u64) {
        self.print_str(&value.to_string());
    }

    fn print_f32(&mut self, value: f32) {
        self.print_str(&value.to_string());
    }

    fn print_f64(&mut self, value: f64) {
        self.print_str(&value.to_string());
    }

    /// Dispatches to the method for the value's type.
    fn print_value(&mut self, value: Printable<'_>) {
        match value {
            Printable::Char(c) => self.print_char(c),
            Printable::Str(s) => self.print_str(s),
            Printable::I8(v) => self.print_i8(v),
            Printable::I16(v) => self.print_i16(v),
            Printable::I32(v) => self.print_i32(v),
            Printable::I64(v) => self.print_i64(v),
            Printable::U8(v) => self.print_u8(v),
            Printable::U16(v) => self.print_u16(v),
            Printable::U32(v) => self.print_u32(v),
            Printable::U64(v) => self.print_u64(v),
            Printable::F32(v) => self.print_f32(v),
            Printable::F64(v) => self.print_f64(v),
        }
    }

    /// Prints each value in order with no separators.
    fn print_many(&mut self, values: &[Printable<'_>]) {
        for &value in values {
            self.print_value(value);
        }
    }

    /// Prints `value` followed by a line terminator.
    fn print_value_line(&mut self, value: Printable<'_>) {
        self.print_value(value);
        self.print_line();
    }

    /// Pushes buffered output to its destination.
    fn flush(&mut self) {}
}

/// Writes to stdout, flushing at every line terminator.
#[derive(Default)]
pub struct ConsoleSink {
    out: Vec<u8>,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OutputSink for ConsoleSink {
    fn print_char(&mut self, c: char) {
        let mut buf = [0u8; 4];
        self.out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
    }

    fn print_byte(&mut self, byte: u8) {
        self.out.push(byte);
    }

    fn print_str(&mut self, s: &str) {
        self.out.extend_from_slice(s.as_bytes());
    }

    fn print_line(&mut self) {
        self.out.push(b'\n');
        self.flush();
    }

    fn flush(&mut self) {
        let mut stdout = io::stdout().lock();
        // Program output has nowhere better to report a closed stdout.
        let _ = stdout.write_all(&self.out);
        let _ = stdout.flush();
        self.out.clear();
    }
}

impl Drop for ConsoleSink {
    fn drop(&mut self) {
        if !self.out.is_empty() {
            self.flush();
        }
    }
}

/// Collects output in memory.
#[derive(Clone, Debug, Default)]
pub struct StringSink {
    buffer: String,
}

impl StringSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    pub fn into_string(self) -> String {
        self.buffer
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl OutputSink for StringSink {
    fn print_char(&mut self, c: char) {
        self.buffer.push(c);
    }

    fn print_str(&mut self, s: &str) {
        self.buffer.push_str(s);
    }

    fn print_line(&mut self) {
        self.buffer.push('\n');
    }
}
