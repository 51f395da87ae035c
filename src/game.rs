//! Model of the memory game page under test

use crate::browser::Locator;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Difficulty levels offered on the start screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    /// Text on the difficulty button
    pub fn label(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }

    /// Number of cards dealt for this difficulty
    pub fn expected_cards(&self) -> usize {
        match self {
            Difficulty::Easy => 4,
            Difficulty::Medium => 7,
            Difficulty::Hard => 10,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty '{}'", other)),
        }
    }
}

/// Where things live in the game's DOM.
///
/// Every difficulty counts cards with the same `cards` locator. The heading
/// locator is deliberately generic (the first `div` on the page), so it depends
/// on DOM order; override it here if the page layout changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameSelectors {
    pub heading: Locator,
    pub cards: Locator,
    /// Image inside a card, resolved relative to the card
    pub card_image: Locator,
    pub score: Locator,
    pub title: Locator,
    pub game_over: Locator,
}

impl Default for GameSelectors {
    fn default() -> Self {
        Self {
            heading: Locator::css("div"),
            cards: Locator::css(".poke-card"),
            card_image: Locator::css("img"),
            score: Locator::css(".gamebox-header > p"),
            title: Locator::css(".gamebox-header > h1 > span"),
            game_over: Locator::css("img[alt='gameover gif']"),
        }
    }
}

impl GameSelectors {
    /// The start-screen button for a difficulty
    pub fn difficulty_button(&self, difficulty: Difficulty) -> Locator {
        Locator::button_with_text(difficulty.label())
    }
}
