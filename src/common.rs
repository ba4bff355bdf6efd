use enum_iterator::Sequence;
use serde::Serialize;
use std::fmt::{Display, Formatter};

/// Player colours 1-5 belong to the Sentinel, 7-11 to the Scourge.
/// 0 and 6 stand for the team itself in kill attribution and never
/// identify a player.
pub fn valid_colour(colour: u32) -> bool {
    (1..=5).contains(&colour) || (7..=11).contains(&colour)
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Ord, PartialOrd, Serialize)]
pub enum Team {
    Sentinel,
    Scourge,
}

impl Team {
    pub fn from_colour(colour: u32) -> Option<Team> {
        match colour {
            1..=5 => Some(Team::Sentinel),
            7..=11 => Some(Team::Scourge),
            _ => None,
        }
    }

    /// The winner value the map reports for this team.
    pub fn winner_value(self) -> u32 {
        match self {
            Team::Sentinel => 1,
            Team::Scourge => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Team::Sentinel => "Sentinel",
            Team::Scourge => "Scourge",
        }
    }
}

impl Display for Team {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.as_str().fmt(f)
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize)]
pub enum Outcome {
    Draw,
    Win,
    Loss,
}

impl Outcome {
    /// Outcome for a player of `colour` given the reported winner value.
    /// Winner values outside {1, 2} count as a loss for everyone, matching
    /// how the hosting bot has always scored unrecognised winner reports.
    pub fn resolve(colour: u32, winner: u32) -> Outcome {
        if winner == 0 {
            Outcome::Draw
        } else if Team::from_colour(colour).map(Team::winner_value) == Some(winner) {
            Outcome::Win
        } else {
            Outcome::Loss
        }
    }
}

impl Default for Outcome {
    fn default() -> Self {
        Outcome::Draw
    }
}

impl From<Outcome> for u32 {
    fn from(outcome: Outcome) -> u32 {
        match outcome {
            Outcome::Draw => 0,
            Outcome::Win => 1,
            Outcome::Loss => 2,
        }
    }
}

/// Which side a destroyed building belonged to, decoded from a key digit.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Alliance {
    Sentinel,
    Scourge,
    Unknown,
}

impl Alliance {
    pub fn from_digit(digit: u8) -> Alliance {
        match digit {
            b'0' => Alliance::Sentinel,
            b'1' => Alliance::Scourge,
            _ => Alliance::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Alliance::Sentinel => "Sentinel",
            Alliance::Scourge => "Scourge",
            Alliance::Unknown => "unknown",
        }
    }
}

impl Display for Alliance {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.as_str().fmt(f)
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Lane {
    Top,
    Mid,
    Bottom,
    Unknown,
}

impl Lane {
    pub fn from_digit(digit: u8) -> Lane {
        match digit {
            b'0' => Lane::Top,
            b'1' => Lane::Mid,
            b'2' => Lane::Bottom,
            _ => Lane::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Lane::Top => "top",
            Lane::Mid => "mid",
            Lane::Bottom => "bottom",
            Lane::Unknown => "unknown",
        }
    }
}

impl Display for Lane {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.as_str().fmt(f)
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum RaxKind {
    Melee,
    Ranged,
    Unknown,
}

impl RaxKind {
    pub fn from_digit(digit: u8) -> RaxKind {
        match digit {
            b'0' => RaxKind::Melee,
            b'1' => RaxKind::Ranged,
            _ => RaxKind::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RaxKind::Melee => "melee",
            RaxKind::Ranged => "ranged",
            RaxKind::Unknown => "unknown",
        }
    }
}

impl Display for RaxKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.as_str().fmt(f)
    }
}

/// The six inventory slots reported at the end of the game.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Sequence, Serialize)]
pub enum ItemSlot {
    First,
    Second,
    Third,
    Fourth,
    Fifth,
    Sixth,
}

impl ItemSlot {
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<ItemSlot> {
        enum_iterator::all::<ItemSlot>().nth(index)
    }
}
