//! The memory game acceptance suite
//!
//! Ten checks that drive the game the way a player would: read the start
//! screen, pick each difficulty, inspect the dealt cards, watch the score and
//! play an Easy round to the end. They run in declaration order and each one
//! relies on the page state the previous ones left behind.

use crate::error::{CheckFailure, HarnessError, Result};
use crate::game::{Difficulty, GameSelectors};
use crate::harness::{Check, CheckResult};
use crate::page::PageDriver;
use crate::sync::{wait_for, Settle, SyncStrategy};
use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckId {
    Heading,
    DifficultyControls,
    HardCardCount,
    MediumCardCount,
    EasyCardCount,
    CardIntegrity,
    ScoreFormat,
    ScoreChanges,
    TitleVisible,
    GameOver,
}

impl CheckId {
    /// Execution order of the suite
    pub const ALL: [CheckId; 10] = [
        CheckId::Heading,
        CheckId::DifficultyControls,
        CheckId::HardCardCount,
        CheckId::MediumCardCount,
        CheckId::EasyCardCount,
        CheckId::CardIntegrity,
        CheckId::ScoreFormat,
        CheckId::ScoreChanges,
        CheckId::TitleVisible,
        CheckId::GameOver,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            CheckId::Heading => "Difficulty heading visible",
            CheckId::DifficultyControls => "All difficulty buttons found",
            CheckId::HardCardCount => "Hard mode shows 10 cards",
            CheckId::MediumCardCount => "Medium mode shows 7 cards",
            CheckId::EasyCardCount => "Easy mode shows 4 cards",
            CheckId::CardIntegrity => "All cards show image and text",
            CheckId::ScoreFormat => "Score text is visible and correctly formatted",
            CheckId::ScoreChanges => "Score updates after clicking a card",
            CheckId::TitleVisible => "Game title is displayed",
            CheckId::GameOver => "Game over modal appears after clicking all cards",
        }
    }

    /// Short name used on the command line
    pub fn name(&self) -> &'static str {
        match self {
            CheckId::Heading => "heading",
            CheckId::DifficultyControls => "difficulty-buttons",
            CheckId::HardCardCount => "hard-cards",
            CheckId::MediumCardCount => "medium-cards",
            CheckId::EasyCardCount => "easy-cards",
            CheckId::CardIntegrity => "card-integrity",
            CheckId::ScoreFormat => "score-format",
            CheckId::ScoreChanges => "score-changes",
            CheckId::TitleVisible => "title",
            CheckId::GameOver => "game-over",
        }
    }
}

impl fmt::Display for CheckId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CheckId {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        CheckId::ALL
            .iter()
            .copied()
            .find(|id| id.name() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = CheckId::ALL.iter().map(|id| id.name()).collect();
                format!("unknown check '{}' (expected one of: {})", s, names.join(", "))
            })
    }
}

/// Builds the checks with a shared set of selectors and one sync strategy
#[derive(Debug, Clone)]
pub struct GameSuite {
    selectors: Arc<GameSelectors>,
    sync: SyncStrategy,
}

impl GameSuite {
    pub fn new(selectors: GameSelectors, sync: SyncStrategy) -> Self {
        Self {
            selectors: Arc::new(selectors),
            sync,
        }
    }

    /// All ten checks in execution order
    pub fn checks(&self) -> Vec<GameCheck> {
        self.only(&CheckId::ALL)
    }

    /// A subset of the checks; suite order wins over the order of `ids`
    pub fn only(&self, ids: &[CheckId]) -> Vec<GameCheck> {
        CheckId::ALL
            .iter()
            .filter(|id| ids.contains(id))
            .map(|id| GameCheck {
                id: *id,
                selectors: Arc::clone(&self.selectors),
                sync: self.sync,
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct GameCheck {
    id: CheckId,
    selectors: Arc<GameSelectors>,
    sync: SyncStrategy,
}

impl GameCheck {
    pub fn id(&self) -> CheckId {
        self.id
    }
}

#[async_trait]
impl<P: PageDriver> Check<P> for GameCheck {
    fn label(&self) -> &str {
        self.id.label()
    }

    async fn run(&self, page: &P) -> CheckResult {
        let selectors = self.selectors.as_ref();
        let sync = &self.sync;

        match self.id {
            CheckId::Heading => heading_visible(page, selectors).await,
            CheckId::DifficultyControls => difficulty_controls(page, selectors).await,
            CheckId::HardCardCount => {
                card_count(page, selectors, sync, Difficulty::Hard, false).await
            }
            CheckId::MediumCardCount => {
                card_count(page, selectors, sync, Difficulty::Medium, true).await
            }
            CheckId::EasyCardCount => {
                card_count(page, selectors, sync, Difficulty::Easy, true).await
            }
            CheckId::CardIntegrity => card_integrity(page, selectors).await,
            CheckId::ScoreFormat => score_format(page, selectors).await,
            CheckId::ScoreChanges => score_changes(page, selectors, sync).await,
            CheckId::TitleVisible => title_visible(page, selectors).await,
            CheckId::GameOver => game_over(page, selectors, sync).await,
        }
    }
}

/// Optionally reload, then click the button for `difficulty`
pub async fn select_difficulty<P: PageDriver>(
    page: &P,
    selectors: &GameSelectors,
    sync: &SyncStrategy,
    difficulty: Difficulty,
    reload: bool,
) -> Result<()> {
    let locator = selectors.difficulty_button(difficulty);

    let button = if reload {
        page.reload().await?;
        wait_for(page, sync, Settle::Reload, || page.find_element(&locator), |_| true)
            .await?
            .value
    } else {
        page.find_element(&locator).await?
    };

    log::debug!("Selecting difficulty {}", difficulty);
    page.click(&button).await
}

/// Number of rendered cards once the deal has settled on `expected` (or the wait gave up)
pub async fn count_cards<P: PageDriver>(
    page: &P,
    selectors: &GameSelectors,
    sync: &SyncStrategy,
    expected: usize,
) -> Result<usize> {
    let waited = wait_for(
        page,
        sync,
        Settle::Action,
        || async move {
            page.find_elements(&selectors.cards)
                .await
                .map(|cards| cards.len())
        },
        |count| *count == expected,
    )
    .await?;

    Ok(waited.value)
}

async fn read_score<P: PageDriver>(page: &P, selectors: &GameSelectors) -> Result<String> {
    let element = page.find_element(&selectors.score).await?;
    page.inner_html(&element).await
}

async fn game_over_visible<P: PageDriver>(page: &P, selectors: &GameSelectors) -> Result<bool> {
    match page.find_element(&selectors.game_over).await {
        Ok(indicator) => page.is_displayed(&indicator).await,
        Err(HarnessError::ElementNotFound(_)) => Ok(false),
        Err(e) => Err(e),
    }
}

async fn heading_visible<P: PageDriver>(page: &P, selectors: &GameSelectors) -> CheckResult {
    let element = page.find_element(&selectors.heading).await?;
    let text = page.text(&element).await?;

    text.lines()
        .map(str::trim)
        .find(|line| line.to_lowercase().contains("difficulty"))
        .map(str::to_string)
        .ok_or_else(|| CheckFailure::new("Main heading not found"))
}

async fn difficulty_controls<P: PageDriver>(page: &P, selectors: &GameSelectors) -> CheckResult {
    let mut missing = Vec::new();

    for difficulty in Difficulty::ALL {
        match page.find_element(&selectors.difficulty_button(difficulty)).await {
            Ok(_) => {}
            Err(HarnessError::ElementNotFound(_)) => missing.push(difficulty.label()),
            Err(e) => return Err(e.into()),
        }
    }

    if missing.is_empty() {
        Ok("Easy, Medium and Hard".to_string())
    } else {
        Err(CheckFailure::new(format!(
            "Missing difficulty buttons: {}",
            missing.join(", ")
        )))
    }
}

async fn card_count<P: PageDriver>(
    page: &P,
    selectors: &GameSelectors,
    sync: &SyncStrategy,
    difficulty: Difficulty,
    reload: bool,
) -> CheckResult {
    select_difficulty(page, selectors, sync, difficulty, reload).await?;

    let expected = difficulty.expected_cards();
    let found = count_cards(page, selectors, sync, expected).await?;

    if found == expected {
        Ok(format!("{} cards dealt", found))
    } else {
        Err(CheckFailure::new(format!(
            "{} mode should show {} cards, found {}",
            difficulty, expected, found
        )))
    }
}

async fn card_integrity<P: PageDriver>(page: &P, selectors: &GameSelectors) -> CheckResult {
    let cards = page.find_elements(&selectors.cards).await?;
    if cards.is_empty() {
        return Err(CheckFailure::new("No cards rendered"));
    }

    for (i, card) in cards.iter().enumerate() {
        let missing = || CheckFailure::new(format!("Card {} missing image or text", i + 1));

        let image = match page.find_child(card, &selectors.card_image).await {
            Ok(image) => image,
            Err(HarnessError::ElementNotFound(_)) => return Err(missing()),
            Err(e) => return Err(e.into()),
        };

        let src = page.attribute(&image, "src").await?.unwrap_or_default();
        let alt = page.attribute(&image, "alt").await?.unwrap_or_default();
        if src.trim().is_empty() || alt.trim().is_empty() {
            return Err(missing());
        }
    }

    Ok(format!("{} cards checked", cards.len()))
}

async fn score_format<P: PageDriver>(page: &P, selectors: &GameSelectors) -> CheckResult {
    let score = read_score(page, selectors).await?;
    log::info!("Score text: {}", score);

    if score.contains('/') {
        Ok(score)
    } else {
        Err(CheckFailure::new(format!(
            "Score format is incorrect or not visible: '{}'",
            score
        )))
    }
}

async fn score_changes<P: PageDriver>(
    page: &P,
    selectors: &GameSelectors,
    sync: &SyncStrategy,
) -> CheckResult {
    let before = read_score(page, selectors).await?;

    let cards = page.find_elements(&selectors.cards).await?;
    let card = cards
        .first()
        .ok_or_else(|| CheckFailure::new("No card available to click"))?;
    page.click(card).await?;

    let waited = wait_for(
        page,
        sync,
        Settle::Action,
        || read_score(page, selectors),
        |after| *after != before,
    )
    .await?;

    if waited.met {
        Ok(format!("Score updated from {} to {}", before, waited.value))
    } else {
        Err(CheckFailure::new(format!(
            "Score did not change after clicking a card (still {})",
            before
        )))
    }
}

async fn title_visible<P: PageDriver>(page: &P, selectors: &GameSelectors) -> CheckResult {
    let element = page.find_element(&selectors.title).await?;
    let title = page.inner_html(&element).await?;

    let title = title.trim();
    if title.is_empty() {
        Err(CheckFailure::new("Game title is not displayed"))
    } else {
        Ok(title.to_string())
    }
}

async fn game_over<P: PageDriver>(
    page: &P,
    selectors: &GameSelectors,
    sync: &SyncStrategy,
) -> CheckResult {
    let difficulty = Difficulty::Easy;
    select_difficulty(page, selectors, sync, difficulty, true).await?;
    count_cards(page, selectors, sync, difficulty.expected_cards()).await?;

    let cards = page.find_elements(&selectors.cards).await?;
    if cards.is_empty() {
        return Err(CheckFailure::new("No cards rendered"));
    }

    for (i, card) in cards.iter().enumerate() {
        page.scroll_into_view(card).await?;
        page.click(card).await?;

        let waited = wait_for(
            page,
            sync,
            Settle::CardFlip,
            || game_over_visible(page, selectors),
            |visible| *visible,
        )
        .await?;

        if waited.met {
            log::info!("Game over modal detected after clicking card {}", i + 1);
            return Ok(format!("detected after clicking card {}", i + 1));
        }
    }

    Err(CheckFailure::new(format!(
        "Game over modal never appeared after clicking all {} cards",
        cards.len()
    )))
}
