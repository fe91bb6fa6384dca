//! Deterministic member-to-index mapping for one population snapshot.

use std::collections::HashMap;
use std::fmt;

use census_model::{PulseNumber, ShortNodeId};

use crate::population::Population;

/// Identifies the population a mapper was built from.
///
/// Two mappers only agree on indices when their versions are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MapperVersion {
    pub pulse: PulseNumber,
    pub digest: [u8; 32],
}

/// `pulse/digest-prefix`, e.g. `65537/3fa9c2e0`.
impl fmt::Display for MapperVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.pulse, hex::encode(&self.digest[..4]))
    }
}

/// Bijection between the online members of a population and `[0, len)`.
///
/// Index `i` is the i-th online member in ascending short-id order, so every
/// honest node derives the same mapping from the same population.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitsetMapper {
    version: MapperVersion,
    ids: Vec<ShortNodeId>,
    index: HashMap<ShortNodeId, usize>,
}

impl BitsetMapper {
    /// Build the mapping for the online members of `population`.
    pub fn new(population: &Population) -> Self {
        let ids: Vec<_> = population.online().iter().map(|n| n.short_id()).collect();
        let index = ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        Self {
            version: MapperVersion {
                pulse: population.pulse(),
                digest: *population.digest(),
            },
            ids,
            index,
        }
    }

    pub fn version(&self) -> MapperVersion {
        self.version
    }

    /// Number of mapped members.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Index of a member, if it is mapped.
    pub fn index_of(&self, id: ShortNodeId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    /// Member at an index, if the index is in range.
    pub fn id_at(&self, index: usize) -> Option<ShortNodeId> {
        self.ids.get(index).copied()
    }

    /// Mapped members in index order.
    pub fn ids(&self) -> &[ShortNodeId] {
        &self.ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use census_model::{MemberPower, NodeProfile, PublicKey, StaticProfile, StaticRole};
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn population(pulse: u32, ids: &[u32]) -> Population {
        let online = ids
            .iter()
            .map(|&id| {
                NodeProfile::new(
                    StaticProfile {
                        short_id: ShortNodeId(id),
                        public_key: PublicKey([0; 32]),
                        address: "127.0.0.1:7900".parse().unwrap(),
                        role: StaticRole::Neutral,
                    },
                    MemberPower(1),
                )
            })
            .collect();
        Population::new(PulseNumber(pulse), online, Vec::new()).unwrap()
    }

    #[test]
    fn unknown_member_has_no_index() {
        let mapper = BitsetMapper::new(&population(65537, &[4, 8]));
        assert_eq!(mapper.index_of(ShortNodeId(4)), Some(0));
        assert_eq!(mapper.index_of(ShortNodeId(8)), Some(1));
        assert_eq!(mapper.index_of(ShortNodeId(5)), None);
        assert_eq!(mapper.id_at(2), None);
    }

    #[test]
    fn versions_differ_between_populations() {
        let a = BitsetMapper::new(&population(65537, &[1, 2]));
        let b = BitsetMapper::new(&population(65538, &[1, 2]));
        let c = BitsetMapper::new(&population(65537, &[1, 3]));
        assert_ne!(a.version(), b.version());
        assert_ne!(a.version(), c.version());
    }

    proptest! {
        #[test]
        fn mapping_is_a_bijection(ids in prop::collection::hash_set(1u32..10_000, 0..200)) {
            let ids: Vec<u32> = ids.into_iter().collect();
            let mapper = BitsetMapper::new(&population(65537, &ids));

            prop_assert_eq!(mapper.len(), ids.len());
            let mut seen = HashSet::new();
            for &raw in &ids {
                let id = ShortNodeId(raw);
                let index = mapper.index_of(id).unwrap();
                prop_assert!(index < ids.len());
                prop_assert!(seen.insert(index));
                prop_assert_eq!(mapper.id_at(index), Some(id));
            }
        }
    }
}
