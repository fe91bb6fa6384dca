//! Two-bit-per-member vote encoding.
//!
//! ```text
//! byte k:  [m(4k+3) | m(4k+2) | m(4k+1) | m(4k)]   two bits each, low bits first
//! ```
//!
//! A bitset is only meaningful together with the [`BitsetMapper`] it was built
//! for; reading it through any other mapper is rejected.

use crate::error::{Error, Result};
use crate::mapper::{BitsetMapper, MapperVersion};
use census_model::ShortNodeId;

const BITS_PER_MEMBER: usize = 2;
const MEMBERS_PER_BYTE: usize = 8 / BITS_PER_MEMBER;
const MEMBER_MASK: u8 = 0b11;

/// A reporter's opinion about one member in the current round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum MemberVote {
    /// No data about the member.
    #[default]
    Undecided = 0,
    /// The member behaved correctly.
    Trusted = 1,
    /// The member was late or inconsistent.
    Doubted = 2,
    /// The member provably misbehaved.
    Fraud = 3,
}

impl MemberVote {
    /// Largest encoded value.
    pub const MAX_VALUE: u8 = 3;

    /// All votes in encoding order.
    pub const ALL: [MemberVote; 4] = [Self::Undecided, Self::Trusted, Self::Doubted, Self::Fraud];

    /// Decode from the low two bits.
    pub const fn from_bits(bits: u8) -> Self {
        match bits & MEMBER_MASK {
            0 => Self::Undecided,
            1 => Self::Trusted,
            2 => Self::Doubted,
            _ => Self::Fraud,
        }
    }

    /// Encoded value.
    pub const fn bits(self) -> u8 {
        self as u8
    }
}

/// Compact per-member votes for one population version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteBitset {
    version: MapperVersion,
    len: usize,
    bytes: Vec<u8>,
}

impl VoteBitset {
    /// All members undecided.
    pub fn new(mapper: &BitsetMapper) -> Self {
        let len = mapper.len();
        Self {
            version: mapper.version(),
            len,
            bytes: vec![0; Self::encoded_len(len)],
        }
    }

    /// Bytes needed for `members` votes.
    pub const fn encoded_len(members: usize) -> usize {
        members.div_ceil(MEMBERS_PER_BYTE)
    }

    pub fn version(&self) -> MapperVersion {
        self.version
    }

    /// Number of members covered.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn position(&self, index: usize) -> (usize, u32) {
        if index >= self.len {
            panic!("member index {} out of range for {} members", index, self.len);
        }
        (
            index / MEMBERS_PER_BYTE,
            ((index % MEMBERS_PER_BYTE) * BITS_PER_MEMBER) as u32,
        )
    }

    /// Vote for the member at `index`.
    ///
    /// # Panics
    ///
    /// If `index >= len()`.
    pub fn get(&self, index: usize) -> MemberVote {
        let (byte, shift) = self.position(index);
        MemberVote::from_bits(self.bytes[byte] >> shift)
    }

    /// Set the vote for the member at `index`.
    ///
    /// # Panics
    ///
    /// If `index >= len()`.
    pub fn set(&mut self, index: usize, vote: MemberVote) {
        let (byte, shift) = self.position(index);
        self.bytes[byte] = (self.bytes[byte] & !(MEMBER_MASK << shift)) | (vote.bits() << shift);
    }

    fn check_mapper(&self, mapper: &BitsetMapper) -> Result<()> {
        let expected = mapper.version();
        if expected != self.version {
            return Err(Error::VersionMismatch {
                expected,
                found: self.version,
            });
        }
        Ok(())
    }

    /// Vote for a member, resolved through the mapper it was built with.
    pub fn get_by_id(&self, mapper: &BitsetMapper, id: ShortNodeId) -> Result<MemberVote> {
        self.check_mapper(mapper)?;
        let index = mapper.index_of(id).ok_or(Error::UnknownNode(id))?;
        Ok(self.get(index))
    }

    /// Set a member's vote, resolved through the mapper it was built with.
    pub fn set_by_id(
        &mut self,
        mapper: &BitsetMapper,
        id: ShortNodeId,
        vote: MemberVote,
    ) -> Result<()> {
        self.check_mapper(mapper)?;
        let index = mapper.index_of(id).ok_or(Error::UnknownNode(id))?;
        self.set(index, vote);
        Ok(())
    }

    /// Votes in index order.
    pub fn iter(&self) -> impl Iterator<Item = MemberVote> + '_ {
        (0..self.len).map(move |i| self.get(i))
    }

    /// How many members carry `vote`.
    pub fn count(&self, vote: MemberVote) -> usize {
        self.iter().filter(|v| *v == vote).count()
    }

    /// Wire bytes (the mapper version travels separately).
    pub fn encode(&self) -> Vec<u8> {
        self.bytes.clone()
    }

    /// Decode wire bytes for the population behind `mapper`.
    pub fn decode(mapper: &BitsetMapper, bytes: &[u8]) -> Result<Self> {
        let len = mapper.len();
        let expected = Self::encoded_len(len);
        if bytes.len() != expected {
            return Err(Error::Decode(format!(
                "expected {} bytes for {} members, got {}",
                expected,
                len,
                bytes.len()
            )));
        }

        let used_bits = len % MEMBERS_PER_BYTE * BITS_PER_MEMBER;
        if used_bits != 0 {
            let padding = bytes[expected - 1] >> used_bits;
            if padding != 0 {
                return Err(Error::Decode("non-zero padding bits".into()));
            }
        }

        Ok(Self {
            version: mapper.version(),
            len,
            bytes: bytes.to_vec(),
        })
    }
}
