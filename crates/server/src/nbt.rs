//! Little-endian network NBT, the variant the client expects inside chunk
//! payloads.
//!
//! Differs from the disk format in its integer encoding: `Int`, `Long` and
//! array/list lengths are zig-zag VarInts, string lengths are unsigned VarInts,
//! everything else is little-endian. Compound keys are written in sorted order
//! so the same tag always produces the same bytes.

use std::collections::HashMap;
use std::io;

use fastnbt::Value;
use veil_engine::encode::wire;

const TAG_END: u8 = 0;
const TAG_BYTE: u8 = 1;
const TAG_SHORT: u8 = 2;
const TAG_INT: u8 = 3;
const TAG_LONG: u8 = 4;
const TAG_FLOAT: u8 = 5;
const TAG_DOUBLE: u8 = 6;
const TAG_BYTE_ARRAY: u8 = 7;
const TAG_STRING: u8 = 8;
const TAG_LIST: u8 = 9;
const TAG_COMPOUND: u8 = 10;
const TAG_INT_ARRAY: u8 = 11;
const TAG_LONG_ARRAY: u8 = 12;

#[derive(Debug, thiserror::Error)]
pub enum NbtError {
    #[error("list mixes tag {expected} with tag {found}")]
    HeterogeneousList { expected: u8, found: u8 },
    #[error("length {0} does not fit a network NBT prefix")]
    TooLong(usize),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Write a compound root with an empty name.
pub fn write_compound(out: &mut Vec<u8>, entries: &HashMap<String, Value>) -> Result<(), NbtError> {
    out.push(TAG_COMPOUND);
    write_string(out, "")?;
    write_entries(out, entries)
}

fn tag_id(value: &Value) -> u8 {
    match value {
        Value::Byte(_) => TAG_BYTE,
        Value::Short(_) => TAG_SHORT,
        Value::Int(_) => TAG_INT,
        Value::Long(_) => TAG_LONG,
        Value::Float(_) => TAG_FLOAT,
        Value::Double(_) => TAG_DOUBLE,
        Value::ByteArray(_) => TAG_BYTE_ARRAY,
        Value::String(_) => TAG_STRING,
        Value::List(_) => TAG_LIST,
        Value::Compound(_) => TAG_COMPOUND,
        Value::IntArray(_) => TAG_INT_ARRAY,
        Value::LongArray(_) => TAG_LONG_ARRAY,
    }
}

fn write_payload(out: &mut Vec<u8>, value: &Value) -> Result<(), NbtError> {
    match value {
        Value::Byte(v) => out.push(*v as u8),
        Value::Short(v) => wire::write_u16_le(out, *v as u16),
        Value::Int(v) => wire::write_var_i32(out, *v)?,
        Value::Long(v) => wire::write_var_i64(out, *v)?,
        Value::Float(v) => out.extend_from_slice(&v.to_le_bytes()),
        Value::Double(v) => out.extend_from_slice(&v.to_le_bytes()),
        Value::ByteArray(bytes) => {
            write_len(out, bytes.len())?;
            out.extend(bytes.iter().map(|&b| b as u8));
        }
        Value::String(s) => write_string(out, s)?,
        Value::List(items) => {
            let element = match items.first() {
                Some(first) => tag_id(first),
                None => TAG_END,
            };
            out.push(element);
            write_len(out, items.len())?;
            for item in items {
                let found = tag_id(item);
                if found != element {
                    return Err(NbtError::HeterogeneousList { expected: element, found });
                }
                write_payload(out, item)?;
            }
        }
        Value::Compound(entries) => write_entries(out, entries)?,
        Value::IntArray(ints) => {
            write_len(out, ints.len())?;
            for &v in ints.iter() {
                wire::write_var_i32(out, v)?;
            }
        }
        Value::LongArray(longs) => {
            write_len(out, longs.len())?;
            for &v in longs.iter() {
                wire::write_var_i64(out, v)?;
            }
        }
    }
    Ok(())
}

fn write_entries(out: &mut Vec<u8>, entries: &HashMap<String, Value>) -> Result<(), NbtError> {
    let mut keys: Vec<&String> = entries.keys().collect();
    keys.sort();
    for key in keys {
        let value = &entries[key];
        out.push(tag_id(value));
        write_string(out, key)?;
        write_payload(out, value)?;
    }
    out.push(TAG_END);
    Ok(())
}

fn write_string(out: &mut Vec<u8>, s: &str) -> Result<(), NbtError> {
    let len = u32::try_from(s.len()).map_err(|_| NbtError::TooLong(s.len()))?;
    wire::write_var_u32(out, len)?;
    out.extend_from_slice(s.as_bytes());
    Ok(())
}

fn write_len(out: &mut Vec<u8>, len: usize) -> Result<(), NbtError> {
    let len = i32::try_from(len).map_err(|_| NbtError::TooLong(len))?;
    wire::write_var_i32(out, len)?;
    Ok(())
}
