//! Pyramid rules.

use smallvec::SmallVec;
use tracing::debug;

use crate::core::{Card, CardFlags, CardValue, Deck, GameKind, GameOptions, PyramidOptions, Result, DECK_SIZE};
use crate::history::{CardStore, Dealer, Highlight};
use crate::rules::{commit_step, GameStatus, Solitaire};
use crate::zones::{Layout, LayoutError};

/// Rows of the pyramid.
pub const ROWS: u16 = 7;

/// Number of pyramid slots (groups `0..28`).
pub const SLOTS: u16 = 28;

pub const STOCK: u16 = 28;
pub const WASTE: u16 = 29;
pub const DISCARD: u16 = 30;

/// Rank numbers of a pair add up to this.
const PAIR_SUM: u8 = 13;

/// Slot of the card at `index` in `row`.
#[must_use]
pub const fn slot_of(row: u16, index: u16) -> u16 {
    row * (row + 1) / 2 + index
}

/// Row and index of `slot`.
#[must_use]
pub fn row_of(slot: u16) -> (u16, u16) {
    let mut row = 0;
    while slot_of(row + 1, 0) <= slot {
        row += 1;
    }
    (row, slot - slot_of(row, 0))
}

/// The two slots covering `slot`, or `None` on the bottom row.
#[must_use]
pub fn coverers(slot: u16) -> Option<[u16; 2]> {
    let (row, index) = row_of(slot);
    (row + 1 < ROWS).then(|| [slot_of(row + 1, index), slot_of(row + 1, index + 1)])
}

/// Check if two cards pair off. Kings play alone and pair with nothing.
#[must_use]
pub fn pairs(a: CardValue, b: CardValue) -> bool {
    a.rank().number() + b.rank().number() == PAIR_SUM
}

fn present_coverers(layout: &Layout, slot: u16) -> SmallVec<[CardValue; 2]> {
    coverers(slot)
        .into_iter()
        .flatten()
        .filter_map(|cover| layout.head(cover))
        .collect()
}

/// Pyramid: pair off cards totalling 13 until the pyramid is gone.
///
/// ## Groups
///
/// - `0..28`: pyramid slots, one card each at position 0
/// - `28`: stock, top at the highest position
/// - `29`: waste, top at the highest position
/// - `30`: discard, in play order
///
/// The current stock pass is carried in the pass bits of stock and waste
/// cards, so recycling the waste is undone like any other move.
#[derive(Clone, Debug, Default)]
pub struct Pyramid {
    options: PyramidOptions,
}

impl Pyramid {
    #[must_use]
    pub fn new(options: PyramidOptions) -> Self {
        Self { options }
    }

    #[must_use]
    pub fn pyramid_options(&self) -> PyramidOptions {
        self.options
    }

    pub fn set_options(&mut self, options: PyramidOptions) {
        self.options = options;
    }

    /// Check if `card` can be played, optionally together with `partner`.
    fn is_available(&self, layout: &Layout, card: &Card, partner: Option<CardValue>) -> bool {
        match card.group() {
            slot if slot < SLOTS => present_coverers(layout, slot)
                .iter()
                .all(|&cover| self.options.partial_cover && Some(cover) == partner),
            WASTE => layout.foot(WASTE) == Some(card.value()),
            _ => false,
        }
    }

    fn mutually_available(&self, cards: &Deck, layout: &Layout, a: CardValue, b: CardValue) -> bool {
        a != b
            && self.is_available(layout, &cards[a.index()], Some(b))
            && self.is_available(layout, &cards[b.index()], Some(a))
    }

    /// Cards that could take part in a play: the pyramid and the waste top.
    fn candidates(cards: &Deck, layout: &Layout) -> Vec<CardValue> {
        cards
            .iter()
            .filter(|card| card.group() < SLOTS)
            .map(Card::value)
            .chain(layout.foot(WASTE))
            .collect()
    }

    /// Cards that would pair off with `value` right now.
    #[must_use]
    pub fn partners(&self, cards: &Deck, value: CardValue) -> Vec<CardValue> {
        let layout = Layout::new(cards);
        Self::candidates(cards, &layout)
            .into_iter()
            .filter(|&other| pairs(value, other) && self.mutually_available(cards, &layout, value, other))
            .collect()
    }

    /// Check if any king or pair can be played.
    #[must_use]
    pub fn has_play(&self, cards: &Deck) -> bool {
        let layout = Layout::new(cards);
        let candidates = Self::candidates(cards, &layout);
        candidates.iter().enumerate().any(|(i, &a)| {
            if a.is_king() {
                return self.is_available(&layout, &cards[a.index()], None);
            }
            candidates[i + 1..]
                .iter()
                .any(|&b| pairs(a, b) && self.mutually_available(cards, &layout, a, b))
        })
    }

    /// Pass through the stock currently in progress, counting from 0.
    #[must_use]
    pub fn pass(cards: &Deck) -> u8 {
        cards
            .iter()
            .filter(|card| card.group() == STOCK || card.group() == WASTE)
            .map(Card::pass)
            .max()
            .unwrap_or(0)
    }

    /// Check if the waste can go back to the stock.
    #[must_use]
    pub fn can_recycle(&self, cards: &Deck) -> bool {
        let layout = Layout::new(cards);
        layout.is_empty(STOCK)
            && !layout.is_empty(WASTE)
            && Self::pass(cards) + 1 < self.options.stock_pass_count
    }

    fn draw<S: CardStore>(&self, dealer: &mut Dealer<S>) -> Result<bool> {
        let layout = Layout::new(dealer.cards());
        let Some(top) = layout.foot(STOCK) else {
            return Ok(false);
        };
        let position = layout.len(WASTE) as u16;

        let committed = commit_step(dealer, |d| {
            d.change_card(top, |c| c.moved_to(WASTE, position).with_face_down(false).with_spread(true));
            Ok(())
        })?;
        if committed {
            dealer.clear_highlights()?;
        }
        Ok(committed)
    }

    fn recycle<S: CardStore>(&self, dealer: &mut Dealer<S>) -> Result<bool> {
        if !self.can_recycle(dealer.cards()) {
            return Ok(false);
        }
        let pass = Self::pass(dealer.cards()) + 1;
        let waste = Layout::new(dealer.cards()).values(WASTE);
        let top = waste.len() as u16 - 1;

        let committed = commit_step(dealer, |d| {
            for (position, &value) in (0..).zip(&waste) {
                d.change_card(value, |c| {
                    c.moved_to(STOCK, top - position)
                        .with_face_down(true)
                        .with_spread(false)
                        .with_pass(pass)
                });
            }
            Ok(())
        })?;
        if committed {
            debug!(pass, cards = waste.len(), "recycled waste");
            dealer.clear_highlights()?;
        }
        Ok(committed)
    }

    /// Discard `values` in order and turn up anything they uncovered.
    fn play<S: CardStore>(&self, dealer: &mut Dealer<S>, values: &[CardValue]) -> Result<bool> {
        let base = Layout::new(dealer.cards()).len(DISCARD) as u16;

        let committed = commit_step(dealer, |d| {
            for (offset, &value) in (0..).zip(values) {
                d.change_card(value, |c| c.moved_to(DISCARD, base + offset).with_face_down(false));
            }

            let cards = *d.cards();
            let layout = Layout::new(&cards);
            for slot in 0..SLOTS {
                if let Some(card) = layout.group(slot).first() {
                    if card.face_down() && present_coverers(&layout, slot).len() < 2 {
                        d.change_card(card.value(), |c| c.with_face_down(false));
                    }
                }
            }
            Ok(())
        })?;
        if committed {
            debug!(cards = values.len(), "played");
            dealer.clear_highlights()?;
        }
        Ok(committed)
    }

    fn select<S: CardStore>(&self, dealer: &mut Dealer<S>, value: CardValue) -> Result<()> {
        let mut marks = vec![(value, Highlight::Selected)];
        marks.extend(
            self.partners(dealer.cards(), value)
                .into_iter()
                .map(|partner| (partner, Highlight::Match)),
        );
        dealer.clear_highlights()?;
        dealer.set_highlights(&marks)
    }
}

impl Solitaire for Pyramid {
    fn kind(&self) -> GameKind {
        GameKind::Pyramid
    }

    fn options(&self) -> GameOptions {
        GameOptions::Pyramid(self.options)
    }

    fn deal(&self, shuffled: &[CardValue; DECK_SIZE]) -> Vec<Card> {
        let pyramid = shuffled[..usize::from(SLOTS)]
            .iter()
            .zip(0..SLOTS)
            .map(|(&value, slot)| {
                // Everything above the bottom row starts covered by two cards
                let flags = CardFlags::default()
                    .with_spread(true)
                    .with_face_down(coverers(slot).is_some());
                Card::new(0, value, slot, 0, flags)
            });
        let stock = shuffled[usize::from(SLOTS)..]
            .iter()
            .zip(0..)
            .map(|(&value, position)| Card::new(0, value, STOCK, position, CardFlags::default().with_face_down(true)));

        pyramid.chain(stock).collect()
    }

    fn is_clickable(&self, cards: &Deck, value: CardValue) -> bool {
        let card = cards[value.index()];
        let layout = Layout::new(cards);
        match card.group() {
            STOCK | WASTE => layout.foot(card.group()) == Some(value),
            slot if slot < SLOTS => {
                self.is_available(&layout, &card, None)
                    || (self.options.partial_cover && !self.partners(cards, value).is_empty())
            }
            _ => false,
        }
    }

    fn on_click<S: CardStore>(&mut self, dealer: &mut Dealer<S>, value: CardValue) -> Result<bool> {
        let cards = *dealer.cards();
        let layout = Layout::new(&cards);
        let card = cards[value.index()];

        match card.group() {
            STOCK if layout.foot(STOCK) == Some(value) => return self.draw(dealer),
            STOCK | DISCARD => return Ok(false),
            _ => {}
        }
        if value.is_king() && self.is_available(&layout, &card, None) {
            return self.play(dealer, &[value]);
        }
        if dealer.highlight(value) == Highlight::Selected {
            dealer.clear_highlights()?;
            return Ok(false);
        }
        if let Some(selected) = dealer.highlights().first(Highlight::Selected) {
            if pairs(selected, value) && self.mutually_available(&cards, &layout, selected, value) {
                return self.play(dealer, &[selected, value]);
            }
        }

        self.select(dealer, value)?;
        Ok(false)
    }

    fn on_double_click<S: CardStore>(&mut self, dealer: &mut Dealer<S>, value: CardValue) -> Result<bool> {
        match dealer.find_card(value).group() {
            STOCK | WASTE => {
                if Layout::new(dealer.cards()).is_empty(STOCK) {
                    self.recycle(dealer)
                } else {
                    self.draw(dealer)
                }
            }
            _ => self.on_click(dealer, value),
        }
    }

    fn check_game_over(&self, cards: &Deck) -> GameStatus {
        let layout = Layout::new(cards);
        let cleared = if self.options.clear_pyramid_only {
            (0..SLOTS).all(|slot| layout.is_empty(slot))
        } else {
            layout.len(DISCARD) == DECK_SIZE
        };
        if cleared {
            return GameStatus::Won { cheats: 0 };
        }

        if !layout.is_empty(STOCK) || self.can_recycle(cards) || self.has_play(cards) {
            GameStatus::Continue
        } else {
            GameStatus::Lost
        }
    }

    fn is_valid(&self, cards: &Deck) -> Option<LayoutError> {
        Layout::validate(cards, DISCARD)
    }
}
