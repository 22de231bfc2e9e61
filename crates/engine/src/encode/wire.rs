//! Little-endian and VarInt primitives of the Bedrock chunk wire format.
//!
//! Unsigned VarInts are plain LEB128; signed ones are zig-zag mapped first.

use std::io;

use azalea_buf::AzaleaWriteVar;

pub fn write_var_u32(out: &mut Vec<u8>, value: u32) -> io::Result<()> {
    value.azalea_write_var(out)
}

pub fn write_var_i32(out: &mut Vec<u8>, value: i32) -> io::Result<()> {
    zigzag32(value).azalea_write_var(out)
}

pub fn write_var_i64(out: &mut Vec<u8>, value: i64) -> io::Result<()> {
    zigzag64(value).azalea_write_var(out)
}

pub fn write_u16_le(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_le_bytes());
}

pub fn write_u32_le(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

pub const fn zigzag32(value: i32) -> u32 {
    ((value << 1) ^ (value >> 31)) as u32
}

pub const fn zigzag64(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}
