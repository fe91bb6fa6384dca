//! Pulses: the discrete global time steps the membership protocol advances on.
//!
//! Pulse numbers below [`PulseNumber::MIN_TIME_PULSE`] are reserved for special
//! markers (`0` means "unknown"). Every time pulse is strictly later than its
//! predecessor; a pulse number is never reused.

use std::fmt;

/// A 32-bit round identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PulseNumber(pub u32);

impl PulseNumber {
    /// Marker for "no pulse yet".
    pub const UNKNOWN: Self = Self(0);

    /// First pulse number that denotes an actual round.
    pub const MIN_TIME_PULSE: Self = Self(65537);

    /// Largest representable time pulse.
    pub const MAX: Self = Self(0x3FFF_FFFF);

    /// Create a pulse number from a raw value.
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Raw value.
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Whether this is the "unknown" marker.
    pub const fn is_unknown(self) -> bool {
        self.0 == Self::UNKNOWN.0
    }

    /// Whether this number denotes a real round.
    pub const fn is_time_pulse(self) -> bool {
        self.0 >= Self::MIN_TIME_PULSE.0 && self.0 <= Self::MAX.0
    }

    /// Advance by `delta`, returning `None` if the result leaves the time pulse range.
    pub fn checked_add(self, delta: u16) -> Option<Self> {
        let next = self.0.checked_add(u32::from(delta))?;
        let next = Self(next);
        next.is_time_pulse().then_some(next)
    }
}

impl fmt::Display for PulseNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for PulseNumber {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

/// 32 bytes of round entropy published with each pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Entropy(pub [u8; 32]);

impl Entropy {
    /// Derive entropy from arbitrary seed bytes.
    pub fn from_seed(seed: &[u8]) -> Self {
        Self(*blake3::hash(seed).as_bytes())
    }

    /// Raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

/// Everything a census version needs to know about its pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PulseData {
    /// The round this data describes.
    pub pulse_number: PulseNumber,
    /// Distance to the next pulse number.
    pub next_pulse_delta: u16,
    /// Distance back to the previous pulse number (0 for the first pulse).
    pub prev_pulse_delta: u16,
    /// Unix seconds when the pulse was produced.
    pub timestamp: u32,
    /// Round entropy.
    pub entropy: Entropy,
}

impl PulseData {
    /// The first pulse of a network.
    pub fn genesis(pulse_number: PulseNumber, delta: u16, entropy: Entropy) -> Self {
        Self {
            pulse_number,
            next_pulse_delta: delta,
            prev_pulse_delta: 0,
            timestamp: 0,
            entropy,
        }
    }

    /// Whether the data describes a real, continuable round.
    pub fn is_valid(&self) -> bool {
        self.pulse_number.is_time_pulse() && self.next_pulse_delta > 0
    }

    /// Whether this is the first pulse of a chain.
    pub fn is_first_pulse(&self) -> bool {
        self.prev_pulse_delta == 0
    }

    /// Panics unless the data is valid.
    ///
    /// Malformed pulse data must be rejected by the caller before it reaches the
    /// census; receiving it here is a broken precondition.
    pub fn ensure_pulse_data(&self) {
        if !self.pulse_number.is_time_pulse() {
            panic!("illegal pulse data: {} is not a time pulse", self.pulse_number);
        }
        if self.next_pulse_delta == 0 {
            panic!("illegal pulse data: next delta of pulse {} is zero", self.pulse_number);
        }
    }

    /// The number the next pulse is expected to carry.
    pub fn next_pulse_number(&self) -> Option<PulseNumber> {
        self.pulse_number.checked_add(self.next_pulse_delta)
    }

    /// The previous pulse number, if this is not the first pulse.
    pub fn prev_pulse_number(&self) -> Option<PulseNumber> {
        if self.is_first_pulse() {
            return None;
        }
        self.pulse_number
            .0
            .checked_sub(u32::from(self.prev_pulse_delta))
            .map(PulseNumber)
            .filter(|pn| pn.is_time_pulse())
    }

    /// Build the expected successor with the same delta.
    pub fn create_next(&self, entropy: Entropy, timestamp: u32) -> Option<Self> {
        let pulse_number = self.next_pulse_number()?;
        Some(Self {
            pulse_number,
            next_pulse_delta: self.next_pulse_delta,
            prev_pulse_delta: self.next_pulse_delta,
            timestamp,
            entropy,
        })
    }
}

impl fmt::Display for PulseData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pulse[{}, -{}/+{}]",
            self.pulse_number, self.prev_pulse_delta, self.next_pulse_delta
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first() -> PulseData {
        PulseData::genesis(PulseNumber::MIN_TIME_PULSE, 10, Entropy::from_seed(b"genesis"))
    }

    #[test]
    fn time_pulse_range() {
        assert!(!PulseNumber::UNKNOWN.is_time_pulse());
        assert!(!PulseNumber(65536).is_time_pulse());
        assert!(PulseNumber::MIN_TIME_PULSE.is_time_pulse());
        assert!(PulseNumber::MAX.is_time_pulse());
        assert!(!PulseNumber(PulseNumber::MAX.0 + 1).is_time_pulse());
    }

    #[test]
    fn checked_add_stays_in_range() {
        assert_eq!(
            PulseNumber::MIN_TIME_PULSE.checked_add(10),
            Some(PulseNumber(65547))
        );
        assert_eq!(PulseNumber::MAX.checked_add(1), None);
    }

    #[test]
    fn successor_chains_deltas() {
        let pd = first();
        assert!(pd.is_valid());
        assert!(pd.is_first_pulse());
        assert_eq!(pd.prev_pulse_number(), None);

        let next = pd.create_next(Entropy::from_seed(b"next"), 5).unwrap();
        assert_eq!(next.pulse_number, PulseNumber(65547));
        assert_eq!(next.prev_pulse_delta, 10);
        assert_eq!(next.prev_pulse_number(), Some(pd.pulse_number));
        assert!(!next.is_first_pulse());
    }

    #[test]
    fn ensure_accepts_valid_data() {
        first().ensure_pulse_data();
    }

    #[test]
    #[should_panic(expected = "not a time pulse")]
    fn ensure_rejects_unknown_pulse() {
        PulseData::default().ensure_pulse_data();
    }

    #[test]
    #[should_panic(expected = "next delta")]
    fn ensure_rejects_zero_delta() {
        let mut pd = first();
        pd.next_pulse_delta = 0;
        pd.ensure_pulse_data();
    }
}
