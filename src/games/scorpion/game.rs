//! Scorpion rules.

use tracing::debug;

use crate::core::{
    Card, CardFlags, CardValue, Deck, GameKind, GameOptions, Result, ScorpionOptions, DECK_SIZE, RANK_COUNT,
};
use crate::history::{CardStore, Dealer, Highlight};
use crate::rules::{commit_step, GameStatus, Solitaire};
use crate::zones::{Layout, LayoutError};

/// Number of tableau columns (groups `0..7`).
pub const COLUMNS: u16 = 7;

/// Group of the three-card kitty.
pub const KITTY: u16 = 7;

/// Cards dealt to each column.
const COLUMN_DEPTH: usize = 7;

/// Face-down cards at the head of each face-down column.
const FACE_DOWN_DEPTH: u16 = 3;

/// What travels with a moved card.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Carry {
    /// The card and every card after it.
    Run,
    /// The card only; the rest of its column shifts up.
    Alone,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct MovePlan {
    carry: Carry,
    cheated: bool,
}

/// Scorpion: build four suits King to Ace inside the columns.
///
/// ## Groups
///
/// - `0..7`: columns, head at position 0
/// - `7`: the kitty, dealt onto the first three columns in one click
///
/// ## Cheats
///
/// `cheat_card_flip` lets the next reveal flip any face-down column card.
/// `cheat_move_card` lets the next move ignore rank, suit and king rules.
/// Both are one-shot: any successful move clears them, and each one that
/// was needed is counted in [`GameStatus::Won`].
#[derive(Clone, Debug, Default)]
pub struct Scorpion {
    options: ScorpionOptions,
    cheat_card_flip: bool,
    cheat_move_card: bool,
    cheats: u32,
}

impl Scorpion {
    #[must_use]
    pub fn new(options: ScorpionOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn scorpion_options(&self) -> ScorpionOptions {
        self.options
    }

    /// Replace the options. Takes effect on the next interaction.
    pub fn set_options(&mut self, options: ScorpionOptions) {
        self.options = options;
    }

    pub fn set_cheat_card_flip(&mut self, enabled: bool) {
        self.cheat_card_flip = enabled;
    }

    pub fn set_cheat_move_card(&mut self, enabled: bool) {
        self.cheat_move_card = enabled;
    }

    #[must_use]
    pub fn cheat_card_flip(&self) -> bool {
        self.cheat_card_flip
    }

    #[must_use]
    pub fn cheat_move_card(&self) -> bool {
        self.cheat_move_card
    }

    /// Cheats used since the deal.
    #[must_use]
    pub fn cheats(&self) -> u32 {
        self.cheats
    }

    /// Drop `value` (and whatever travels with it) onto `column`.
    ///
    /// Returns `true` when the move was legal and committed.
    ///
    /// Panics if `column` is the card's own column.
    pub fn drop_on<S: CardStore>(&mut self, dealer: &mut Dealer<S>, value: CardValue, column: u16) -> Result<bool> {
        assert!(
            dealer.find_card(value).group() != column,
            "cannot move column onto itself"
        );
        self.try_move(dealer, value, column)
    }

    /// Column a double-click on `value` would move it to.
    #[must_use]
    pub fn destination(&self, cards: &Deck, value: CardValue) -> Option<u16> {
        (0..COLUMNS).find(|&column| self.plan_move(cards, value, column, false).is_some())
    }

    /// Check if any legal, non-useless move exists.
    #[must_use]
    pub fn has_move(&self, cards: &Deck) -> bool {
        cards
            .iter()
            .filter(|card| card.group() < COLUMNS && card.face_up())
            .any(|card| self.destination(cards, card.value()).is_some())
    }

    fn plan_move(&self, cards: &Deck, value: CardValue, column: u16, allow_cheat: bool) -> Option<MovePlan> {
        let card = cards[value.index()];
        if column >= COLUMNS || card.group() >= COLUMNS || card.group() == column || card.face_down() {
            return None;
        }
        let layout = Layout::new(cards);
        let run = layout.run_from(&card);

        let (carry, legal) = match layout.group(column).last() {
            Some(foot) if foot.face_down() => return None,
            Some(foot) => (Carry::Run, foot.value().next_lower() == Some(value)),
            None if !value.is_king() => (Carry::Run, false),
            None => {
                let carries_queen = run
                    .get(1)
                    .is_some_and(|next| value.next_lower() == Some(next.value()));
                if carries_queen || run.len() == 1 {
                    (Carry::Run, true)
                } else if self.options.king_moves_alone {
                    (Carry::Alone, true)
                } else {
                    (Carry::Run, false)
                }
            }
        };

        // A whole column onto an empty one changes nothing
        if carry == Carry::Run && card.position() == 0 && layout.is_empty(column) {
            return None;
        }
        match (legal, allow_cheat) {
            (true, _) => Some(MovePlan { carry, cheated: false }),
            (false, true) => Some(MovePlan { carry, cheated: true }),
            (false, false) => None,
        }
    }

    fn try_move<S: CardStore>(&mut self, dealer: &mut Dealer<S>, value: CardValue, column: u16) -> Result<bool> {
        let Some(plan) = self.plan_move(dealer.cards(), value, column, self.cheat_move_card) else {
            return Ok(false);
        };

        let cards = *dealer.cards();
        let layout = Layout::new(&cards);
        let run = layout.run_from(&cards[value.index()]);
        let base = layout.len(column) as u16;

        let committed = commit_step(dealer, |d| {
            match plan.carry {
                Carry::Run => {
                    for (offset, moved) in run.iter().enumerate() {
                        d.change_card(moved.value(), |c| c.moved_to(column, base + offset as u16));
                    }
                }
                Carry::Alone => {
                    d.change_card(value, |c| c.moved_to(column, base));
                    for rest in &run[1..] {
                        d.change_card(rest.value(), |c| c.with_position(c.position() - 1));
                    }
                }
            }
            Ok(())
        })?;

        if committed {
            debug!(card = %value, column, carry = ?plan.carry, cheated = plan.cheated, "moved");
            dealer.clear_highlights()?;
            self.after_mutation(plan.cheated);
        }
        Ok(committed)
    }

    fn reveal<S: CardStore>(&mut self, dealer: &mut Dealer<S>, value: CardValue) -> Result<bool> {
        let card = dealer.find_card(value);
        if card.face_up() || card.group() >= COLUMNS {
            return Ok(false);
        }
        let at_foot = Layout::new(dealer.cards()).foot(card.group()) == Some(value);
        if !at_foot && !self.cheat_card_flip {
            return Ok(false);
        }

        let committed = commit_step(dealer, |d| {
            d.change_card(value, |c| c.with_face_down(false).with_spread(true));
            Ok(())
        })?;
        if committed {
            dealer.clear_highlights()?;
            self.after_mutation(!at_foot);
        }
        Ok(committed)
    }

    fn deal_kitty<S: CardStore>(&mut self, dealer: &mut Dealer<S>) -> Result<bool> {
        let layout = Layout::new(dealer.cards());
        let moves: Vec<(CardValue, u16, u16)> = layout
            .group(KITTY)
            .iter()
            .zip(0..COLUMNS)
            .map(|(card, column)| (card.value(), column, layout.len(column) as u16))
            .collect();
        if moves.is_empty() {
            return Ok(false);
        }

        let committed = commit_step(dealer, |d| {
            for &(value, column, position) in &moves {
                d.change_card(value, |c| {
                    c.moved_to(column, position).with_face_down(false).with_spread(true)
                });
            }
            Ok(())
        })?;
        if committed {
            debug!(cards = moves.len(), "dealt kitty");
            dealer.clear_highlights()?;
            self.after_mutation(false);
        }
        Ok(committed)
    }

    fn select<S: CardStore>(&self, dealer: &mut Dealer<S>, value: CardValue) -> Result<()> {
        let cards = dealer.cards();
        let mut marks = vec![(value, Highlight::Selected)];
        let in_play = |other: CardValue| {
            let card = cards[other.index()];
            card.group() < COLUMNS && card.face_up()
        };
        if let Some(lower) = value.next_lower().filter(|&lower| in_play(lower)) {
            marks.push((lower, Highlight::Target));
        }
        if let Some(higher) = value.next_higher().filter(|&higher| in_play(higher)) {
            marks.push((higher, Highlight::Hint));
        }

        dealer.clear_highlights()?;
        dealer.set_highlights(&marks)
    }

    fn after_mutation(&mut self, cheated: bool) {
        if cheated {
            self.cheats += 1;
        }
        self.cheat_card_flip = false;
        self.cheat_move_card = false;
    }
}

fn is_complete_suit(pile: &[Card]) -> bool {
    pile.len() == usize::from(RANK_COUNT)
        && pile[0].value().is_king()
        && pile.iter().all(Card::face_up)
        && pile
            .windows(2)
            .all(|pair| pair[0].value().next_lower() == Some(pair[1].value()))
}

impl Solitaire for Scorpion {
    fn kind(&self) -> GameKind {
        GameKind::Scorpion
    }

    fn options(&self) -> GameOptions {
        GameOptions::Scorpion(self.options)
    }

    fn deal(&self, shuffled: &[CardValue; DECK_SIZE]) -> Vec<Card> {
        let hidden = CardFlags::default().with_face_down(true);
        let shown = CardFlags::default().with_spread(true);
        let face_down_columns = u16::from(self.options.face_down_columns);

        let columns = shuffled[..COLUMNS as usize * COLUMN_DEPTH]
            .chunks(COLUMN_DEPTH)
            .zip(0..COLUMNS)
            .flat_map(|(chunk, column)| {
                chunk.iter().zip(0..).map(move |(&value, position)| {
                    let face_down = column < face_down_columns && position < FACE_DOWN_DEPTH;
                    Card::new(0, value, column, position, if face_down { hidden } else { shown })
                })
            });
        let kitty = shuffled[COLUMNS as usize * COLUMN_DEPTH..]
            .iter()
            .zip(0..)
            .map(|(&value, position)| Card::new(0, value, KITTY, position, hidden.with_spread(true)));

        columns.chain(kitty).collect()
    }

    fn is_clickable(&self, cards: &Deck, value: CardValue) -> bool {
        let card = cards[value.index()];
        match card.group() {
            KITTY => true,
            column if column < COLUMNS => {
                card.face_up() || self.cheat_card_flip || Layout::new(cards).foot(column) == Some(value)
            }
            _ => false,
        }
    }

    fn on_click<S: CardStore>(&mut self, dealer: &mut Dealer<S>, value: CardValue) -> Result<bool> {
        let card = dealer.find_card(value);
        if card.group() == KITTY {
            return self.deal_kitty(dealer);
        }
        if card.face_down() {
            return self.reveal(dealer, value);
        }

        match dealer.highlight(value) {
            Highlight::Selected => {
                dealer.clear_highlights()?;
                Ok(false)
            }
            Highlight::Target => {
                let column = dealer
                    .highlights()
                    .first(Highlight::Selected)
                    .map(|selected| dealer.find_card(selected).group())
                    .filter(|&column| column != card.group());
                if let Some(column) = column {
                    if self.try_move(dealer, value, column)? {
                        return Ok(true);
                    }
                }
                self.select(dealer, value)?;
                Ok(false)
            }
            _ => {
                self.select(dealer, value)?;
                Ok(false)
            }
        }
    }

    fn on_double_click<S: CardStore>(&mut self, dealer: &mut Dealer<S>, value: CardValue) -> Result<bool> {
        let card = dealer.find_card(value);
        if card.group() == KITTY {
            return self.deal_kitty(dealer);
        }
        if card.face_down() {
            return self.reveal(dealer, value);
        }
        match self.destination(dealer.cards(), value) {
            Some(column) => self.try_move(dealer, value, column),
            None => Ok(false),
        }
    }

    fn check_game_over(&self, cards: &Deck) -> GameStatus {
        let layout = Layout::new(cards);
        if !layout.is_empty(KITTY) {
            return GameStatus::Continue;
        }

        let piles: Vec<&[Card]> = (0..COLUMNS)
            .map(|column| layout.group(column))
            .filter(|pile| !pile.is_empty())
            .collect();
        if piles.len() == 4 && piles.iter().all(|pile| is_complete_suit(pile)) {
            return GameStatus::Won { cheats: self.cheats };
        }

        let hidden_foot = piles.iter().any(|pile| pile.last().is_some_and(Card::face_down));
        if hidden_foot || self.has_move(cards) {
            GameStatus::Continue
        } else {
            GameStatus::Lost
        }
    }

    fn is_valid(&self, cards: &Deck) -> Option<LayoutError> {
        Layout::validate(cards, KITTY)
    }

    fn reset(&mut self) {
        self.cheat_card_flip = false;
        self.cheat_move_card = false;
        self.cheats = 0;
    }
}
