//! Static structure of one 16-team region.
//!
//! The opponent tables encode the standard NCAA seeding and are never derived
//! from ratings. Rounds 1-4 are played inside a region; the national semifinal
//! and final draw opponents from other regions and have no table here.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CalcuttaError, Result};

/// Teams per region.
pub const SEEDS: usize = 16;

/// Regions per bracket.
pub const REGIONS: usize = 4;

/// Rounds from the round of 64 to the championship game.
pub const ROUNDS: usize = 6;

/// Rounds played inside one region.
pub const REGIONAL_ROUNDS: usize = 4;

/// Historical average rating by seed (index 0 = seed 1).
///
/// Substituted whenever a ratings table is missing a seed. This is the only
/// copy of the table in the crate.
pub const DEFAULT_SEED_RATINGS: [f64; SEEDS] = [
    0.965, 0.945, 0.925, 0.910, 0.895, 0.885, 0.875, 0.860, 0.855, 0.850, 0.845, 0.820, 0.760,
    0.700, 0.620, 0.450,
];

pub const FIRST_ROUND: [u8; SEEDS] = [16, 15, 14, 13, 12, 11, 10, 9, 8, 7, 6, 5, 4, 3, 2, 1];

pub const SECOND_ROUND: [[u8; 2]; SEEDS] = [
    [8, 9],   // 1
    [7, 10],  // 2
    [6, 11],  // 3
    [5, 12],  // 4
    [4, 13],  // 5
    [3, 14],  // 6
    [2, 15],  // 7
    [1, 16],  // 8
    [1, 16],  // 9
    [2, 15],  // 10
    [3, 14],  // 11
    [4, 13],  // 12
    [5, 12],  // 13
    [6, 11],  // 14
    [7, 10],  // 15
    [8, 9],   // 16
];

const POD_1: [u8; 4] = [1, 8, 9, 16];
const POD_4: [u8; 4] = [4, 5, 12, 13];
const POD_2: [u8; 4] = [2, 7, 10, 15];
const POD_3: [u8; 4] = [3, 6, 11, 14];

pub const THIRD_ROUND: [[u8; 4]; SEEDS] = [
    POD_4, // 1
    POD_3, // 2
    POD_2, // 3
    POD_1, // 4
    POD_1, // 5
    POD_2, // 6
    POD_3, // 7
    POD_4, // 8
    POD_4, // 9
    POD_3, // 10
    POD_2, // 11
    POD_1, // 12
    POD_1, // 13
    POD_2, // 14
    POD_3, // 15
    POD_4, // 16
];

const TOP_HALF: [u8; 8] = [1, 4, 5, 8, 9, 12, 13, 16];
const BOTTOM_HALF: [u8; 8] = [2, 3, 6, 7, 10, 11, 14, 15];

pub const FOURTH_ROUND: [[u8; 8]; SEEDS] = [
    BOTTOM_HALF, // 1
    TOP_HALF,    // 2
    TOP_HALF,    // 3
    BOTTOM_HALF, // 4
    BOTTOM_HALF, // 5
    TOP_HALF,    // 6
    TOP_HALF,    // 7
    BOTTOM_HALF, // 8
    BOTTOM_HALF, // 9
    TOP_HALF,    // 10
    TOP_HALF,    // 11
    BOTTOM_HALF, // 12
    BOTTOM_HALF, // 13
    TOP_HALF,    // 14
    TOP_HALF,    // 15
    BOTTOM_HALF, // 16
];

/// A tournament round, in playing order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Round {
    FirstRound,
    SecondRound,
    RegionalSemifinal,
    RegionalFinal,
    NationalSemifinal,
    Championship,
}

impl Round {
    pub const ALL: [Round; ROUNDS] = [
        Round::FirstRound,
        Round::SecondRound,
        Round::RegionalSemifinal,
        Round::RegionalFinal,
        Round::NationalSemifinal,
        Round::Championship,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Number of possible opponents inside the region, `None` for the
    /// cross-region rounds.
    pub fn regional_branching(self) -> Option<usize> {
        match self {
            Round::FirstRound => Some(1),
            Round::SecondRound => Some(2),
            Round::RegionalSemifinal => Some(4),
            Round::RegionalFinal => Some(8),
            Round::NationalSemifinal | Round::Championship => None,
        }
    }

    /// Number of teams across the full bracket that win this round.
    pub fn winners(self) -> usize {
        64 >> (self.index() + 1)
    }

    pub fn label(self) -> &'static str {
        match self {
            Round::FirstRound => "R64",
            Round::SecondRound => "R32",
            Round::RegionalSemifinal => "S16",
            Round::RegionalFinal => "E8",
            Round::NationalSemifinal => "F4",
            Round::Championship => "Final",
        }
    }
}

impl fmt::Display for Round {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Round::FirstRound => "first round",
            Round::SecondRound => "second round",
            Round::RegionalSemifinal => "regional semifinal",
            Round::RegionalFinal => "regional final",
            Round::NationalSemifinal => "national semifinal",
            Round::Championship => "championship",
        };
        f.write_str(name)
    }
}

pub fn validate_seed(seed: u8) -> Result<u8> {
    if (1..=SEEDS as u8).contains(&seed) {
        Ok(seed)
    } else {
        Err(CalcuttaError::InvalidSeed(seed))
    }
}

fn idx(seed: u8) -> Result<usize> {
    validate_seed(seed).map(|s| s as usize - 1)
}

pub fn first_round_opponent(seed: u8) -> Result<u8> {
    Ok(FIRST_ROUND[idx(seed)?])
}

pub fn second_round_opponents(seed: u8) -> Result<[u8; 2]> {
    Ok(SECOND_ROUND[idx(seed)?])
}

pub fn third_round_opponents(seed: u8) -> Result<[u8; 4]> {
    Ok(THIRD_ROUND[idx(seed)?])
}

pub fn fourth_round_opponents(seed: u8) -> Result<[u8; 8]> {
    Ok(FOURTH_ROUND[idx(seed)?])
}

/// Historical default rating for a seed.
pub fn default_rating(seed: u8) -> Result<f64> {
    Ok(DEFAULT_SEED_RATINGS[idx(seed)?])
}

/// Opponent tables for the four regional rounds.
///
/// `tables[round][seed - 1]` lists the seeds the team could meet in that
/// round. Lookups check the set size against the round's branching factor,
/// so a broken table fails loudly instead of producing a short vector.
#[derive(Clone, Debug, PartialEq)]
pub struct BracketTopology {
    tables: [Vec<Vec<u8>>; REGIONAL_ROUNDS],
}

impl BracketTopology {
    /// The standard 16-team region.
    pub fn standard() -> Self {
        BracketTopology {
            tables: [
                FIRST_ROUND.iter().map(|&s| vec![s]).collect(),
                SECOND_ROUND.iter().map(|o| o.to_vec()).collect(),
                THIRD_ROUND.iter().map(|o| o.to_vec()).collect(),
                FOURTH_ROUND.iter().map(|o| o.to_vec()).collect(),
            ],
        }
    }

    /// Build from raw tables. No structural checks; call [`validate`] for those.
    ///
    /// [`validate`]: BracketTopology::validate
    pub fn from_tables(tables: [Vec<Vec<u8>>; REGIONAL_ROUNDS]) -> Self {
        BracketTopology { tables }
    }

    /// Possible opponents of `seed` in a regional `round`.
    pub fn opponents(&self, round: Round, seed: u8) -> Result<&[u8]> {
        let expected = round
            .regional_branching()
            .ok_or(CalcuttaError::CrossRegionRound(round))?;
        let i = idx(seed)?;
        let found: &[u8] = self.tables[round.index()]
            .get(i)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        if found.len() != expected {
            return Err(CalcuttaError::Topology {
                round,
                seed,
                expected,
                found: found.len(),
            });
        }
        Ok(found)
    }

    pub fn first_round_opponent(&self, seed: u8) -> Result<u8> {
        Ok(self.opponents(Round::FirstRound, seed)?[0])
    }

    /// Check the tables describe a coherent single-elimination region.
    pub fn validate(&self) -> Result<()> {
        for round in &Round::ALL[..REGIONAL_ROUNDS] {
            for seed in 1..=SEEDS as u8 {
                let opponents = self.opponents(*round, seed)?;
                for &opp in opponents {
                    validate_seed(opp)?;
                    if opp == seed {
                        return Err(CalcuttaError::MalformedTopology(format!(
                            "seed {seed} faces itself in the {round}"
                        )));
                    }
                    if !self.opponents(*round, opp)?.contains(&seed) {
                        return Err(CalcuttaError::MalformedTopology(format!(
                            "seed {seed} can meet {opp} in the {round} but not the reverse"
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

impl Default for BracketTopology {
    fn default() -> Self {
        BracketTopology::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_standard_topology_is_valid() {
        BracketTopology::standard().validate().unwrap();
    }

    #[test]
    fn test_first_round_pairs_sum_to_17() {
        for seed in 1..=16u8 {
            let opp = first_round_opponent(seed).unwrap();
            assert_eq!(seed + opp, 17);
            assert_eq!(first_round_opponent(opp).unwrap(), seed);
        }
    }

    #[test]
    fn test_published_tables() {
        assert_eq!(second_round_opponents(1).unwrap(), [8, 9]);
        assert_eq!(second_round_opponents(9).unwrap(), [1, 16]);
        assert_eq!(second_round_opponents(12).unwrap(), [4, 13]);
        assert_eq!(second_round_opponents(14).unwrap(), [6, 11]);
        assert_eq!(second_round_opponents(10).unwrap(), [2, 15]);
        assert_eq!(third_round_opponents(16).unwrap(), [4, 5, 12, 13]);
        assert_eq!(third_round_opponents(13).unwrap(), [1, 8, 9, 16]);
        assert_eq!(third_round_opponents(15).unwrap(), [3, 6, 11, 14]);
        assert_eq!(third_round_opponents(6).unwrap(), [2, 7, 10, 15]);
        assert_eq!(fourth_round_opponents(8).unwrap(), [2, 3, 6, 7, 10, 11, 14, 15]);
        assert_eq!(fourth_round_opponents(11).unwrap(), [1, 4, 5, 8, 9, 12, 13, 16]);
    }

    #[test]
    fn test_rounds_partition_the_region() {
        // A seed, its possible opponents in rounds 1-4 and their earlier
        // opponents together cover all 16 seeds exactly once.
        let topo = BracketTopology::standard();
        for seed in 1..=16u8 {
            let mut seen: HashSet<u8> = HashSet::from([seed]);
            for round in &Round::ALL[..REGIONAL_ROUNDS] {
                for &opp in topo.opponents(*round, seed).unwrap() {
                    assert!(seen.insert(opp), "seed {opp} repeated for {seed}");
                }
            }
            assert_eq!(seen.len(), 16);
        }
    }

    #[test]
    fn test_invalid_seed_rejected() {
        assert!(matches!(first_round_opponent(0), Err(CalcuttaError::InvalidSeed(0))));
        assert!(matches!(default_rating(17), Err(CalcuttaError::InvalidSeed(17))));
    }

    #[test]
    fn test_cross_region_round_has_no_table() {
        let topo = BracketTopology::standard();
        assert!(matches!(
            topo.opponents(Round::NationalSemifinal, 1),
            Err(CalcuttaError::CrossRegionRound(Round::NationalSemifinal))
        ));
    }

    #[test]
    fn test_short_opponent_set_fails_fast() {
        let mut tables = [
            FIRST_ROUND.iter().map(|&s| vec![s]).collect::<Vec<_>>(),
            SECOND_ROUND.iter().map(|o| o.to_vec()).collect(),
            THIRD_ROUND.iter().map(|o| o.to_vec()).collect(),
            FOURTH_ROUND.iter().map(|o| o.to_vec()).collect(),
        ];
        tables[2][0].pop();
        let topo = BracketTopology::from_tables(tables);

        match topo.opponents(Round::RegionalSemifinal, 1) {
            Err(CalcuttaError::Topology { expected, found, seed, .. }) => {
                assert_eq!((seed, expected, found), (1, 4, 3));
            }
            other => panic!("expected topology error, got {other:?}"),
        }
        assert!(topo.validate().is_err());
    }

    #[test]
    fn test_asymmetric_table_rejected() {
        let mut tables = BracketTopology::standard().tables;
        tables[1][0] = vec![7, 10];
        let topo = BracketTopology::from_tables(tables);
        assert!(matches!(topo.validate(), Err(CalcuttaError::MalformedTopology(_))));
    }

    #[test]
    fn test_round_winners() {
        let winners: Vec<usize> = Round::ALL.iter().map(|r| r.winners()).collect();
        assert_eq!(winners, vec![32, 16, 8, 4, 2, 1]);
    }

    #[test]
    fn test_default_ratings_decrease_by_seed() {
        for pair in DEFAULT_SEED_RATINGS.windows(2) {
            assert!(pair[0] >= pair[1]);
        }
    }
}
