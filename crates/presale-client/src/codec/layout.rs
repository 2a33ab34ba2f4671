//! Declarative fixed-offset record layouts and the one reader/writer that walks them.
//!
//! A [`Layout`] lists every field of an on-chain record as `(name, offset, kind)`.
//! Record types never index into buffers themselves; they ask a [`RecordReader`]
//! or [`RecordWriter`] for a field by name, so each offset lives in exactly one table.

use std::fmt;

use anchor_lang::prelude::Pubkey;

use crate::constants::DISCRIMINATOR_LEN;
use crate::errors::{DecodeError, EncodeError};

/// Identifies a record layout. Each kind owns one [`Layout`] table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    PresaleState,
    BuyerRecord,
    WhitelistEntry,
    StakingRecord,
    StakingPool,
    GovernanceProposal,
    ProposalCounter,
    DistributionRegistry,
    DistributionCycle,
    ClaimRecord,
}

impl RecordKind {
    pub const ALL: [RecordKind; 10] = [
        RecordKind::PresaleState,
        RecordKind::BuyerRecord,
        RecordKind::WhitelistEntry,
        RecordKind::StakingRecord,
        RecordKind::StakingPool,
        RecordKind::GovernanceProposal,
        RecordKind::ProposalCounter,
        RecordKind::DistributionRegistry,
        RecordKind::DistributionCycle,
        RecordKind::ClaimRecord,
    ];

    /// Account type name on-chain, the input of its discriminator hash.
    pub fn account_name(self) -> &'static str {
        self.layout().account_name
    }

    pub fn layout(self) -> &'static Layout {
        use crate::state::layouts;
        match self {
            RecordKind::PresaleState => &layouts::PRESALE_STATE,
            RecordKind::BuyerRecord => &layouts::BUYER_RECORD,
            RecordKind::WhitelistEntry => &layouts::WHITELIST_ENTRY,
            RecordKind::StakingRecord => &layouts::STAKING_RECORD,
            RecordKind::StakingPool => &layouts::STAKING_POOL,
            RecordKind::GovernanceProposal => &layouts::GOVERNANCE_PROPOSAL,
            RecordKind::ProposalCounter => &layouts::PROPOSAL_COUNTER,
            RecordKind::DistributionRegistry => &layouts::DISTRIBUTION_REGISTRY,
            RecordKind::DistributionCycle => &layouts::DISTRIBUTION_CYCLE,
            RecordKind::ClaimRecord => &layouts::CLAIM_RECORD,
        }
    }

    /// Finds the kind whose discriminator matches the first 8 bytes of `data`.
    pub fn sniff(data: &[u8]) -> Result<RecordKind, DecodeError> {
        let prefix = discriminator_of(data)?;
        RecordKind::ALL
            .into_iter()
            .find(|kind| kind.layout().discriminator == Some(prefix))
            .ok_or(DecodeError::UnknownRecordKind(prefix))
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.account_name())
    }
}

/// Wire type of a single field. All integers are little-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    U8,
    U16,
    U64,
    I64,
    /// One byte, 0 or 1
    Bool,
    Pubkey,
    /// Three consecutive u64 values, one per numbered phase
    U64x3,
    Bytes32,
    /// Length prefix of `len_width` bytes followed by `cap` bytes of storage
    Str { len_width: u8, cap: usize },
}

impl FieldKind {
    pub const fn width(self) -> usize {
        match self {
            FieldKind::U8 | FieldKind::Bool => 1,
            FieldKind::U16 => 2,
            FieldKind::U64 | FieldKind::I64 => 8,
            FieldKind::Pubkey | FieldKind::Bytes32 => 32,
            FieldKind::U64x3 => 24,
            FieldKind::Str { len_width, cap } => len_width as usize + cap,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub offset: usize,
    pub kind: FieldKind,
}

impl Field {
    pub const fn new(name: &'static str, offset: usize, kind: FieldKind) -> Self {
        Self { name, offset, kind }
    }

    pub const fn end(&self) -> usize {
        self.offset + self.kind.width()
    }
}

#[derive(Debug)]
pub struct Layout {
    pub kind: RecordKind,
    pub account_name: &'static str,
    pub discriminator: Option<[u8; DISCRIMINATOR_LEN]>,
    /// Minimum buffer length; longer buffers are accepted.
    pub size: usize,
    pub fields: &'static [Field],
}

impl Layout {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// First byte after the discriminator, if any.
    pub fn body_start(&self) -> usize {
        if self.discriminator.is_some() {
            DISCRIMINATOR_LEN
        } else {
            0
        }
    }
}

fn discriminator_of(data: &[u8]) -> Result<[u8; DISCRIMINATOR_LEN], DecodeError> {
    data.get(..DISCRIMINATOR_LEN)
        .and_then(|prefix| prefix.try_into().ok())
        .ok_or(DecodeError::MissingDiscriminator { actual: data.len() })
}

/// Read-only view over a buffer that has passed the length and discriminator checks.
pub struct RecordReader<'a> {
    layout: &'static Layout,
    data: &'a [u8],
}

impl<'a> RecordReader<'a> {
    /// The discriminator is checked first, so a short buffer of another kind is
    /// reported as that, not as truncated.
    pub fn new(layout: &'static Layout, data: &'a [u8]) -> Result<Self, DecodeError> {
        if let Some(expected) = layout.discriminator {
            if data.len() >= DISCRIMINATOR_LEN {
                let found = discriminator_of(data)?;
                if found != expected {
                    return Err(DecodeError::WrongRecordKind {
                        expected: layout.kind,
                        found,
                    });
                }
            }
        }
        if data.len() < layout.size {
            return Err(DecodeError::TooShort {
                kind: layout.kind,
                expected: layout.size,
                actual: data.len(),
            });
        }
        Ok(Self { layout, data })
    }

    fn slot(&self, name: &'static str, matches: fn(FieldKind) -> bool) -> Result<(&Field, &'a [u8]), DecodeError> {
        let mismatch = DecodeError::LayoutMismatch { field: name };
        let field = self
            .layout
            .field(name)
            .filter(|field| matches(field.kind))
            .ok_or(mismatch.clone())?;
        let bytes = self.data.get(field.offset..field.end()).ok_or(mismatch)?;
        Ok((field, bytes))
    }

    fn array<const N: usize>(&self, name: &'static str, matches: fn(FieldKind) -> bool) -> Result<[u8; N], DecodeError> {
        let (_, bytes) = self.slot(name, matches)?;
        bytes
            .try_into()
            .map_err(|_| DecodeError::LayoutMismatch { field: name })
    }

    pub fn u8(&self, name: &'static str) -> Result<u8, DecodeError> {
        self.array::<1>(name, |k| k == FieldKind::U8).map(|b| b[0])
    }

    pub fn u16(&self, name: &'static str) -> Result<u16, DecodeError> {
        self.array(name, |k| k == FieldKind::U16).map(u16::from_le_bytes)
    }

    pub fn u64(&self, name: &'static str) -> Result<u64, DecodeError> {
        self.array(name, |k| k == FieldKind::U64).map(u64::from_le_bytes)
    }

    pub fn i64(&self, name: &'static str) -> Result<i64, DecodeError> {
        self.array(name, |k| k == FieldKind::I64).map(i64::from_le_bytes)
    }

    pub fn bool(&self, name: &'static str) -> Result<bool, DecodeError> {
        match self.array::<1>(name, |k| k == FieldKind::Bool)?[0] {
            0 => Ok(false),
            1 => Ok(true),
            value => Err(DecodeError::InvalidBool { field: name, value }),
        }
    }

    pub fn pubkey(&self, name: &'static str) -> Result<Pubkey, DecodeError> {
        self.array(name, |k| k == FieldKind::Pubkey)
            .map(Pubkey::new_from_array)
    }

    pub fn bytes32(&self, name: &'static str) -> Result<[u8; 32], DecodeError> {
        self.array(name, |k| k == FieldKind::Bytes32)
    }

    pub fn u64x3(&self, name: &'static str) -> Result<[u64; 3], DecodeError> {
        let raw: [u8; 24] = self.array(name, |k| k == FieldKind::U64x3)?;
        let mut out = [0u64; 3];
        for (value, chunk) in out.iter_mut().zip(raw.chunks_exact(8)) {
            let mut word = [0u8; 8];
            word.copy_from_slice(chunk);
            *value = u64::from_le_bytes(word);
        }
        Ok(out)
    }

    /// Reads a one-byte tag and maps it through `TryFrom<u8>`.
    pub fn tag<T: TryFrom<u8>>(&self, name: &'static str) -> Result<T, DecodeError> {
        let value = self.u8(name)?;
        T::try_from(value).map_err(|_| DecodeError::InvalidEnumTag { field: name, value })
    }

    pub fn string(&self, name: &'static str) -> Result<String, DecodeError> {
        let (field, bytes) = self.slot(name, |k| matches!(k, FieldKind::Str { .. }))?;
        let FieldKind::Str { len_width, cap } = field.kind else {
            return Err(DecodeError::LayoutMismatch { field: name });
        };
        let (prefix, body) = bytes.split_at(len_width as usize);
        let len = prefix
            .iter()
            .rev()
            .fold(0usize, |acc, byte| (acc << 8) | *byte as usize);
        if len > cap {
            return Err(DecodeError::InvalidStringLength { field: name, len, cap });
        }
        String::from_utf8(body[..len].to_vec()).map_err(|_| DecodeError::InvalidUtf8 { field: name })
    }
}

/// Builds a zero-filled buffer of the layout's size with its discriminator in place.
pub struct RecordWriter {
    layout: &'static Layout,
    buf: Vec<u8>,
}

impl RecordWriter {
    pub fn new(layout: &'static Layout) -> Self {
        let mut buf = vec![0u8; layout.size];
        if let Some(discriminator) = layout.discriminator {
            buf[..DISCRIMINATOR_LEN].copy_from_slice(&discriminator);
        }
        Self { layout, buf }
    }

    fn slot(&mut self, name: &'static str, matches: fn(FieldKind) -> bool) -> Result<(FieldKind, &mut [u8]), EncodeError> {
        let field = self
            .layout
            .field(name)
            .filter(|field| matches(field.kind))
            .ok_or(EncodeError::LayoutMismatch { field: name })?;
        let kind = field.kind;
        let bytes = self
            .buf
            .get_mut(field.offset..field.end())
            .ok_or(EncodeError::LayoutMismatch { field: name })?;
        Ok((kind, bytes))
    }

    fn put(&mut self, name: &'static str, matches: fn(FieldKind) -> bool, value: &[u8]) -> Result<(), EncodeError> {
        let (_, bytes) = self.slot(name, matches)?;
        if bytes.len() != value.len() {
            return Err(EncodeError::LayoutMismatch { field: name });
        }
        bytes.copy_from_slice(value);
        Ok(())
    }

    pub fn put_u8(&mut self, name: &'static str, value: u8) -> Result<(), EncodeError> {
        self.put(name, |k| k == FieldKind::U8, &[value])
    }

    pub fn put_u16(&mut self, name: &'static str, value: u16) -> Result<(), EncodeError> {
        self.put(name, |k| k == FieldKind::U16, &value.to_le_bytes())
    }

    pub fn put_u64(&mut self, name: &'static str, value: u64) -> Result<(), EncodeError> {
        self.put(name, |k| k == FieldKind::U64, &value.to_le_bytes())
    }

    pub fn put_i64(&mut self, name: &'static str, value: i64) -> Result<(), EncodeError> {
        self.put(name, |k| k == FieldKind::I64, &value.to_le_bytes())
    }

    pub fn put_bool(&mut self, name: &'static str, value: bool) -> Result<(), EncodeError> {
        self.put(name, |k| k == FieldKind::Bool, &[u8::from(value)])
    }

    pub fn put_pubkey(&mut self, name: &'static str, value: &Pubkey) -> Result<(), EncodeError> {
        self.put(name, |k| k == FieldKind::Pubkey, value.as_ref())
    }

    pub fn put_bytes32(&mut self, name: &'static str, value: &[u8; 32]) -> Result<(), EncodeError> {
        self.put(name, |k| k == FieldKind::Bytes32, value)
    }

    pub fn put_u64x3(&mut self, name: &'static str, value: &[u64; 3]) -> Result<(), EncodeError> {
        let mut raw = [0u8; 24];
        for (chunk, word) in raw.chunks_exact_mut(8).zip(value) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        self.put(name, |k| k == FieldKind::U64x3, &raw)
    }

    pub fn put_tag(&mut self, name: &'static str, value: impl Into<u8>) -> Result<(), EncodeError> {
        self.put_u8(name, value.into())
    }

    pub fn put_string(&mut self, name: &'static str, value: &str) -> Result<(), EncodeError> {
        let (kind, bytes) = self.slot(name, |k| matches!(k, FieldKind::Str { .. }))?;
        let FieldKind::Str { len_width, cap } = kind else {
            return Err(EncodeError::LayoutMismatch { field: name });
        };
        let len = value.len();
        if len > cap {
            return Err(EncodeError::StringTooLong { field: name, len, cap });
        }
        let (prefix, body) = bytes.split_at_mut(len_width as usize);
        let len_bytes = (len as u64).to_le_bytes();
        prefix.copy_from_slice(&len_bytes[..len_width as usize]);
        body[..len].copy_from_slice(value.as_bytes());
        body[len..].fill(0);
        Ok(())
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// A record with a fixed on-chain layout.
pub trait AccountRecord: Sized {
    fn layout() -> &'static Layout;

    fn read(reader: &RecordReader<'_>) -> Result<Self, DecodeError>;

    fn write(&self, writer: &mut RecordWriter) -> Result<(), EncodeError>;

    fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        Self::read(&RecordReader::new(Self::layout(), data)?)
    }

    fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        let mut writer = RecordWriter::new(Self::layout());
        self.write(&mut writer)?;
        Ok(writer.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_FIELDS: &[Field] = &[
        Field::new("flag", 8, FieldKind::Bool),
        Field::new("count", 9, FieldKind::U16),
        Field::new("label", 11, FieldKind::Str { len_width: 1, cap: 4 }),
        Field::new("long_label", 16, FieldKind::Str { len_width: 2, cap: 3 }),
    ];

    static SAMPLE: Layout = Layout {
        kind: RecordKind::ProposalCounter,
        account_name: "Sample",
        discriminator: Some([7; 8]),
        size: 21,
        fields: SAMPLE_FIELDS,
    };

    #[test]
    fn test_reader_rejects_short_buffer_before_reading() {
        let err = RecordReader::new(&SAMPLE, &[7; 20]).err();
        assert_eq!(
            err,
            Some(DecodeError::TooShort {
                kind: RecordKind::ProposalCounter,
                expected: 21,
                actual: 20,
            })
        );
    }

    #[test]
    fn test_reader_checks_discriminator() {
        let mut data = vec![0u8; 21];
        data[..8].copy_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);
        match RecordReader::new(&SAMPLE, &data) {
            Err(DecodeError::WrongRecordKind { found, .. }) => {
                assert_eq!(found, [1, 2, 3, 4, 5, 6, 7, 8])
            }
            other => panic!("unexpected {:?}", other.err()),
        }
    }

    #[test]
    fn test_short_buffer_of_another_kind_reports_kind() {
        let mut data = vec![0u8; 12];
        data[..8].copy_from_slice(&[9; 8]);
        assert_eq!(
            RecordReader::new(&SAMPLE, &data).err(),
            Some(DecodeError::WrongRecordKind {
                expected: RecordKind::ProposalCounter,
                found: [9; 8],
            })
        );
        assert!(matches!(
            RecordReader::new(&SAMPLE, &[9; 5]).err(),
            Some(DecodeError::TooShort { actual: 5, .. })
        ));
    }

    #[test]
    fn test_strings_and_flags_round_trip() {
        let mut writer = RecordWriter::new(&SAMPLE);
        writer.put_bool("flag", true).unwrap();
        writer.put_u16("count", 0x0102).unwrap();
        writer.put_string("label", "abc").unwrap();
        writer.put_string("long_label", "xy").unwrap();
        let data = writer.finish();

        assert_eq!(&data[..8], &[7; 8]);
        assert_eq!(data[8], 1);
        assert_eq!(&data[9..11], &[0x02, 0x01]);
        assert_eq!(&data[11..16], &[3, b'a', b'b', b'c', 0]);
        assert_eq!(&data[16..21], &[2, 0, b'x', b'y', 0]);

        let reader = RecordReader::new(&SAMPLE, &data).unwrap();
        assert!(reader.bool("flag").unwrap());
        assert_eq!(reader.u16("count").unwrap(), 0x0102);
        assert_eq!(reader.string("label").unwrap(), "abc");
        assert_eq!(reader.string("long_label").unwrap(), "xy");
    }

    #[test]
    fn test_longer_buffers_are_accepted() {
        let mut data = RecordWriter::new(&SAMPLE).finish();
        data.extend_from_slice(&[0xff; 16]);
        let reader = RecordReader::new(&SAMPLE, &data).unwrap();
        assert_eq!(reader.string("label").unwrap(), "");
    }

    #[test]
    fn test_invalid_bool_and_string_length_are_reported() {
        let mut data = RecordWriter::new(&SAMPLE).finish();
        data[8] = 2;
        data[11] = 9;
        let reader = RecordReader::new(&SAMPLE, &data).unwrap();
        assert_eq!(
            reader.bool("flag"),
            Err(DecodeError::InvalidBool { field: "flag", value: 2 })
        );
        assert_eq!(
            reader.string("label"),
            Err(DecodeError::InvalidStringLength { field: "label", len: 9, cap: 4 })
        );
    }

    #[test]
    fn test_field_type_mismatch_is_an_error() {
        let data = RecordWriter::new(&SAMPLE).finish();
        let reader = RecordReader::new(&SAMPLE, &data).unwrap();
        assert_eq!(
            reader.u64("count"),
            Err(DecodeError::LayoutMismatch { field: "count" })
        );
        let mut writer = RecordWriter::new(&SAMPLE);
        assert_eq!(
            writer.put_string("label", "toolong"),
            Err(EncodeError::StringTooLong { field: "label", len: 7, cap: 4 })
        );
    }

    #[test]
    fn test_sniff_requires_a_prefix() {
        assert_eq!(
            RecordKind::sniff(&[1, 2, 3]),
            Err(DecodeError::MissingDiscriminator { actual: 3 })
        );
        assert_eq!(
            RecordKind::sniff(&[9; 8]),
            Err(DecodeError::UnknownRecordKind([9; 8]))
        );
    }
}
