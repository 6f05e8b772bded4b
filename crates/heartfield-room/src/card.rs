//! Cards and colors.
//!
//! The card set is closed: one placeable kind ([`HeartCard`]) and three
//! one-shot magic kinds. [`Card`] is a tagged enum, so every rule that
//! inspects a card is an exhaustive `match`.

use std::fmt;

use heartfield_protocol::CardId;
use rand::Rng;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// TileColor
// ---------------------------------------------------------------------------

/// Colors shared by tiles and heart cards.
///
/// `White` only ever appears on tiles: it is the wildcard a Recycle card
/// paints and scores a heart at face value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TileColor {
    Red,
    Yellow,
    Green,
    Blue,
    White,
}

impl TileColor {
    /// Every color a tile can be generated with.
    pub const TILE_COLORS: [TileColor; 5] = [
        Self::Red,
        Self::Yellow,
        Self::Green,
        Self::Blue,
        Self::White,
    ];

    /// Every color a heart card can have.
    pub const HEART_COLORS: [TileColor; 4] =
        [Self::Red, Self::Yellow, Self::Green, Self::Blue];

    /// Picks a tile color uniformly at random.
    pub fn random_tile(rng: &mut impl Rng) -> Self {
        Self::TILE_COLORS[rng.random_range(0..Self::TILE_COLORS.len())]
    }

    /// Emoji shown for a tile of this color.
    pub fn tile_emoji(self) -> &'static str {
        match self {
            Self::Red => "🟥",
            Self::Yellow => "🟨",
            Self::Green => "🟩",
            Self::Blue => "🟦",
            Self::White => "⬜",
        }
    }

    /// Emoji shown for a heart of this color.
    pub fn heart_emoji(self) -> &'static str {
        match self {
            Self::Red => "❤️",
            Self::Yellow => "💛",
            Self::Green => "💚",
            Self::Blue => "💙",
            Self::White => "🤍",
        }
    }
}

impl fmt::Display for TileColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Red => "red",
            Self::Yellow => "yellow",
            Self::Green => "green",
            Self::Blue => "blue",
            Self::White => "white",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Cards
// ---------------------------------------------------------------------------

/// Highest face value a heart card can carry.
pub const MAX_HEART_VALUE: u32 = 3;

/// A placeable heart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartCard {
    pub id: CardId,
    pub color: TileColor,
    pub value: u32,
    pub emoji: String,
}

impl HeartCard {
    pub fn new(id: CardId, color: TileColor, value: u32) -> Self {
        Self {
            id,
            color,
            value,
            emoji: color.heart_emoji().to_string(),
        }
    }

    /// Points this heart earns on a tile of `tile` color: double on a
    /// match, face value on white, nothing otherwise.
    pub fn score_on(&self, tile: TileColor) -> u32 {
        if tile == self.color {
            self.value * 2
        } else if tile == TileColor::White {
            self.value
        } else {
            0
        }
    }
}

/// The body shared by the three magic cards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MagicCard {
    pub id: CardId,
    pub emoji: String,
}

/// Any card a player can hold.
///
/// Internally tagged: `{ "type": "wind", "id": "card-7", "emoji": "💨" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Card {
    Heart(HeartCard),
    /// Removes an opponent's heart and the points it scored.
    Wind(MagicCard),
    /// Repaints an empty tile white.
    Recycle(MagicCard),
    /// Protects its holder from Wind and Recycle for two turns.
    Shield(MagicCard),
}

impl Card {
    pub fn id(&self) -> &CardId {
        match self {
            Self::Heart(c) => &c.id,
            Self::Wind(c) | Self::Recycle(c) | Self::Shield(c) => &c.id,
        }
    }

    pub fn is_magic(&self) -> bool {
        !matches!(self, Self::Heart(_))
    }

    /// The card's type name as it appears on the wire.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Heart(_) => "heart",
            Self::Wind(_) => "wind",
            Self::Recycle(_) => "recycle",
            Self::Shield(_) => "shield",
        }
    }

    pub fn wind(id: CardId) -> Self {
        Self::Wind(MagicCard {
            id,
            emoji: "💨".into(),
        })
    }

    pub fn recycle(id: CardId) -> Self {
        Self::Recycle(MagicCard {
            id,
            emoji: "♻️".into(),
        })
    }

    pub fn shield(id: CardId) -> Self {
        Self::Shield(MagicCard {
            id,
            emoji: "🛡️".into(),
        })
    }

    /// A heart with a random color and a value in `1..=3`.
    pub fn random_heart(id: CardId, rng: &mut impl Rng) -> Self {
        let colors = TileColor::HEART_COLORS;
        let color = colors[rng.random_range(0..colors.len())];
        let value = rng.random_range(1..=MAX_HEART_VALUE);
        Self::Heart(HeartCard::new(id, color, value))
    }

    /// A Wind, Recycle or Shield card, chosen uniformly.
    pub fn random_magic(id: CardId, rng: &mut impl Rng) -> Self {
        match rng.random_range(0..3) {
            0 => Self::wind(id),
            1 => Self::recycle(id),
            _ => Self::shield(id),
        }
    }

    /// Draws a random card of `kind`.
    pub fn random(kind: DrawKind, id: CardId, rng: &mut impl Rng) -> Self {
        match kind {
            DrawKind::Heart => Self::random_heart(id, rng),
            DrawKind::Magic => Self::random_magic(id, rng),
        }
    }
}

// ---------------------------------------------------------------------------
// DrawKind
// ---------------------------------------------------------------------------

/// Which deck a draw comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrawKind {
    Heart,
    Magic,
}

impl fmt::Display for DrawKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Heart => f.write_str("heart"),
            Self::Magic => f.write_str("magic"),
        }
    }
}
