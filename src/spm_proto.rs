//! A minimal, hand-rolled reader for the subset of the SentencePiece
//! `ModelProto` wire format this crate needs: `pieces[i].{piece, score,
//! type}`, `trainer_spec.{unk_id, bos_id, eos_id}`, and
//! `normalizer_spec.{add_dummy_prefix, remove_extra_whitespaces}`.
//!
//! Full protobuf decoding is out of scope (it belongs to an external
//! collaborator per the crate's boundary with model-file parsing); this
//! reader walks the wire format generically (varint + length-delimited
//! fields, skipping unknown field numbers and message types) with the same
//! defensive size-limit discipline as this crate's other boundary readers.

use crate::normalizer::NormalizerSpec;
use crate::Error;

const MAX_FIELD_SIZE: usize = 16 * 1024 * 1024;
const MAX_PIECES: usize = 2_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PieceType {
    Normal,
    Unknown,
    Control,
    UserDefined,
    Unused,
    Byte,
}

impl From<i64> for PieceType {
    fn from(v: i64) -> Self {
        match v {
            2 => PieceType::Unknown,
            3 => PieceType::Control,
            4 => PieceType::UserDefined,
            5 => PieceType::Unused,
            6 => PieceType::Byte,
            _ => PieceType::Normal,
        }
    }
}

pub struct RawPiece {
    pub piece: String,
    pub score: f32,
    pub kind: PieceType,
}

pub struct ModelProto {
    pub pieces: Vec<RawPiece>,
    pub unk_id: u32,
    pub bos_id: u32,
    pub eos_id: u32,
    pub normalizer: NormalizerSpec,
}

impl ModelProto {
    pub fn parse(bytes: &[u8]) -> Result<Self, Error> {
        let mut pieces = Vec::new();
        let mut unk_id = 0i64;
        let mut bos_id = 1i64;
        let mut eos_id = 2i64;
        let mut normalizer = NormalizerSpec::default();

        let mut cursor = Cursor::new(bytes);
        while !cursor.is_empty() {
            let (field_num, wire_type) = cursor.read_tag()?;
            match (field_num, wire_type) {
                (1, WIRE_LEN) => {
                    let payload = cursor.read_length_delimited()?;
                    if pieces.len() >= MAX_PIECES {
                        return Err(Error::MalformedModel("too many pieces".into()));
                    }
                    pieces.push(parse_piece(payload)?);
                }
                (2, WIRE_LEN) => {
                    let payload = cursor.read_length_delimited()?;
                    let mut sub = Cursor::new(payload);
                    while !sub.is_empty() {
                        let (fnum, wt) = sub.read_tag()?;
                        match (fnum, wt) {
                            (40, WIRE_VARINT) => unk_id = sub.read_varint()? as i64,
                            (41, WIRE_VARINT) => bos_id = sub.read_varint()? as i64,
                            (42, WIRE_VARINT) => eos_id = sub.read_varint()? as i64,
                            _ => sub.skip_field(wt)?,
                        }
                    }
                }
                (3, WIRE_LEN) => {
                    let payload = cursor.read_length_delimited()?;
                    let mut sub = Cursor::new(payload);
                    while !sub.is_empty() {
                        let (fnum, wt) = sub.read_tag()?;
                        match (fnum, wt) {
                            (3, WIRE_VARINT) => normalizer.add_dummy_prefix = sub.read_varint()? != 0,
                            (4, WIRE_VARINT) => {
                                normalizer.remove_extra_whitespaces = sub.read_varint()? != 0
                            }
                            _ => sub.skip_field(wt)?,
                        }
                    }
                }
                (_, wt) => cursor.skip_field(wt)?,
            }
        }

        Ok(ModelProto {
            pieces,
            unk_id: unk_id.max(0) as u32,
            bos_id: bos_id.max(0) as u32,
            eos_id: eos_id.max(0) as u32,
            normalizer,
        })
    }
}

fn parse_piece(bytes: &[u8]) -> Result<RawPiece, Error> {
    let mut piece = String::new();
    let mut score = 0.0f32;
    let mut kind = PieceType::Normal;

    let mut cursor = Cursor::new(bytes);
    while !cursor.is_empty() {
        let (field_num, wire_type) = cursor.read_tag()?;
        match (field_num, wire_type) {
            (1, WIRE_LEN) => {
                let s = cursor.read_length_delimited()?;
                piece = String::from_utf8(s.to_vec())
                    .map_err(|e| Error::MalformedModel(format!("piece text not UTF-8: {e}")))?;
            }
            (2, WIRE_32BIT) => {
                let bits = cursor.read_fixed32()?;
                score = f32::from_bits(bits);
            }
            (3, WIRE_VARINT) => {
                kind = PieceType::from(cursor.read_varint()? as i64);
            }
            (_, wt) => cursor.skip_field(wt)?,
        }
    }
    Ok(RawPiece { piece, score, kind })
}

const WIRE_VARINT: u8 = 0;
const WIRE_64BIT: u8 = 1;
const WIRE_LEN: u8 = 2;
const WIRE_32BIT: u8 = 5;

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }

    fn read_tag(&mut self) -> Result<(u32, u8), Error> {
        let tag = self.read_varint()?;
        let field_num = (tag >> 3) as u32;
        let wire_type = (tag & 0x7) as u8;
        Ok((field_num, wire_type))
    }

    fn read_varint(&mut self) -> Result<u64, Error> {
        let mut result = 0u64;
        let mut shift = 0u32;
        loop {
            if self.pos >= self.buf.len() {
                return Err(Error::MalformedModel("truncated varint".into()));
            }
            let byte = self.buf[self.pos];
            self.pos += 1;
            result |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Ok(result);
            }
            shift += 7;
            if shift >= 64 {
                return Err(Error::MalformedModel("varint too long".into()));
            }
        }
    }

    fn read_fixed32(&mut self) -> Result<u32, Error> {
        if self.pos + 4 > self.buf.len() {
            return Err(Error::MalformedModel("truncated fixed32".into()));
        }
        let bytes = &self.buf[self.pos..self.pos + 4];
        self.pos += 4;
        Ok(u32::from_le_bytes(bytes.try_into().unwrap()))
    }

    fn read_fixed64(&mut self) -> Result<u64, Error> {
        if self.pos + 8 > self.buf.len() {
            return Err(Error::MalformedModel("truncated fixed64".into()));
        }
        let bytes = &self.buf[self.pos..self.pos + 8];
        self.pos += 8;
        Ok(u64::from_le_bytes(bytes.try_into().unwrap()))
    }

    fn read_length_delimited(&mut self) -> Result<&'a [u8], Error> {
        let len = self.read_varint()? as usize;
        if len > MAX_FIELD_SIZE {
            return Err(Error::MalformedModel(format!(
                "length-delimited field of {len} bytes exceeds MAX_FIELD_SIZE"
            )));
        }
        if self.pos + len > self.buf.len() {
            return Err(Error::MalformedModel("truncated length-delimited field".into()));
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn skip_field(&mut self, wire_type: u8) -> Result<(), Error> {
        match wire_type {
            WIRE_VARINT => {
                self.read_varint()?;
            }
            WIRE_64BIT => {
                self.read_fixed64()?;
            }
            WIRE_LEN => {
                self.read_length_delimited()?;
            }
            WIRE_32BIT => {
                self.read_fixed32()?;
            }
            other => {
                return Err(Error::MalformedModel(format!("unsupported wire type {other}")));
            }
        }
        Ok(())
    }
}
