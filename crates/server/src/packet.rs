//! Level-chunk packet framing and compressed batches.

use std::io::{self, Write};
use std::sync::Arc;

use flate2::Compression;
use flate2::write::DeflateEncoder;
use veil_engine::encode::wire;
use veil_engine::world::position::ChunkPos;

use crate::payload::ChunkPayload;

pub const LEVEL_CHUNK_PACKET_ID: u32 = 0x3A;

/// Level used for batch compression.
pub const BATCH_COMPRESSION: u32 = 7;

/// What a subscriber receives for one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkPacket {
    /// Bare payload; the connection frames it itself.
    Payload(ChunkPayload),
    /// A pre-framed, compressed batch holding one level-chunk packet.
    Batch(Arc<[u8]>),
}

/// Frame a payload as a level-chunk packet, id included.
pub fn encode_level_chunk(pos: ChunkPos, payload: &ChunkPayload) -> io::Result<Vec<u8>> {
    let mut out = Vec::with_capacity(payload.data.len() + 16);
    wire::write_var_u32(&mut out, LEVEL_CHUNK_PACKET_ID)?;
    wire::write_var_i32(&mut out, pos.x)?;
    wire::write_var_i32(&mut out, pos.z)?;
    wire::write_var_u32(&mut out, payload.sub_chunk_count as u32)?;
    // blob cache disabled
    out.push(0);
    wire::write_var_u32(&mut out, payload.data.len() as u32)?;
    out.extend_from_slice(&payload.data);
    Ok(out)
}

/// Length-prefix each packet and raw-deflate the lot.
pub fn batch<'a, I>(packets: I) -> io::Result<Vec<u8>>
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let mut raw = Vec::new();
    for packet in packets {
        wire::write_var_u32(&mut raw, packet.len() as u32)?;
        raw.extend_from_slice(packet);
    }
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::new(BATCH_COMPRESSION));
    encoder.write_all(&raw)?;
    encoder.finish()
}

/// The cacheable form of a column: one level-chunk packet in a batch.
pub fn batch_level_chunk(pos: ChunkPos, payload: &ChunkPayload) -> io::Result<Arc<[u8]>> {
    let packet = encode_level_chunk(pos, payload)?;
    Ok(Arc::from(batch([packet.as_slice()])?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::DeflateDecoder;
    use std::io::Read;

    fn payload() -> ChunkPayload {
        ChunkPayload {
            sub_chunk_count: 2,
            data: Arc::from(vec![9u8, 8, 7]),
        }
    }

    #[test]
    fn level_chunk_header() {
        let packet = encode_level_chunk(ChunkPos::new(-1, 2), &payload()).unwrap();
        assert_eq!(packet, [0x3A, 1, 4, 2, 0, 3, 9, 8, 7]);
    }

    #[test]
    fn batch_inflates_to_prefixed_packet() {
        let compressed = batch_level_chunk(ChunkPos::new(0, 0), &payload()).unwrap();
        let mut raw = Vec::new();
        DeflateDecoder::new(&compressed[..]).read_to_end(&mut raw).unwrap();
        let packet = encode_level_chunk(ChunkPos::new(0, 0), &payload()).unwrap();
        assert_eq!(raw[0] as usize, packet.len());
        assert_eq!(&raw[1..], packet.as_slice());
    }
}
