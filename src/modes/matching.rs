use rand::seq::SliceRandom;
use rand::Rng;

use super::StudySession;
use crate::models::{StudyItem, StudyMode};
use crate::progress::SessionSummary;

/// Pairs dealt into one match round.
pub const MATCH_PAIRS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchSide {
    Term,
    Definition,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchTile {
    pub pair: usize,
    pub side: MatchSide,
    pub text: String,
    pub matched: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    Selected,
    Deselected,
    Matched,
    Mismatch,
    Ignored,
}

/// Deals every item of the set, `MATCH_PAIRS` at a time. Clearing a round
/// brings up the next one.
pub struct MatchSession {
    rounds: Vec<Vec<MatchTile>>,
    round: usize,
    pair_count: usize,
    cleared: usize,
    cursor: usize,
    selected: Option<usize>,
    mistakes: u32,
}

impl MatchSession {
    pub fn new<R: Rng + ?Sized>(items: &[StudyItem], rng: &mut R) -> Self {
        let mut chosen: Vec<&StudyItem> = items.iter().collect();
        chosen.shuffle(rng);

        let rounds = chosen
            .chunks(MATCH_PAIRS)
            .enumerate()
            .map(|(round, chunk)| {
                let mut tiles: Vec<MatchTile> = chunk
                    .iter()
                    .enumerate()
                    .flat_map(|(i, item)| {
                        let pair = round * MATCH_PAIRS + i;
                        [
                            MatchTile {
                                pair,
                                side: MatchSide::Term,
                                text: item.term.clone(),
                                matched: false,
                            },
                            MatchTile {
                                pair,
                                side: MatchSide::Definition,
                                text: item.definition.clone(),
                                matched: false,
                            },
                        ]
                    })
                    .collect();
                tiles.shuffle(rng);
                tiles
            })
            .collect();

        Self {
            rounds,
            round: 0,
            pair_count: chosen.len(),
            cleared: 0,
            cursor: 0,
            selected: None,
            mistakes: 0,
        }
    }

    /// Tiles of the round in play.
    pub fn tiles(&self) -> &[MatchTile] {
        self.rounds.get(self.round).map(Vec::as_slice).unwrap_or(&[])
    }

    /// One-based round in play and the number of rounds.
    pub fn round(&self) -> (usize, usize) {
        (self.round + 1, self.rounds.len())
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn mistakes(&self) -> u32 {
        self.mistakes
    }

    pub fn matched_pairs(&self) -> usize {
        self.cleared + self.tiles().iter().filter(|t| t.matched).count() / 2
    }

    pub fn move_cursor(&mut self, forward: bool) {
        let len = self.tiles().len();
        if len == 0 {
            return;
        }
        self.cursor = if forward {
            (self.cursor + 1) % len
        } else {
            (self.cursor + len - 1) % len
        };
    }

    pub fn select_cursor(&mut self) -> MatchOutcome {
        self.select(self.cursor)
    }

    /// Picks a tile. A second pick either clears the pair or counts a mistake.
    pub fn select(&mut self, index: usize) -> MatchOutcome {
        match self.tiles().get(index) {
            None => return MatchOutcome::Ignored,
            Some(tile) if tile.matched => return MatchOutcome::Ignored,
            Some(_) => {}
        }

        let Some(first) = self.selected else {
            self.selected = Some(index);
            return MatchOutcome::Selected;
        };
        if first == index {
            self.selected = None;
            return MatchOutcome::Deselected;
        }

        self.selected = None;
        let round_count = self.rounds.len();
        let Some(tiles) = self.rounds.get_mut(self.round) else {
            return MatchOutcome::Ignored;
        };
        let (a, b) = (&tiles[first], &tiles[index]);
        if a.pair == b.pair && a.side != b.side {
            tiles[first].matched = true;
            tiles[index].matched = true;
            if tiles.iter().all(|t| t.matched) && self.round + 1 < round_count {
                self.cleared += tiles.len() / 2;
                self.round += 1;
                self.cursor = 0;
            }
            MatchOutcome::Matched
        } else {
            self.mistakes += 1;
            MatchOutcome::Mismatch
        }
    }
}

impl StudySession for MatchSession {
    fn mode(&self) -> StudyMode {
        StudyMode::Match
    }

    fn is_complete(&self) -> bool {
        self.pair_count > 0 && self.matched_pairs() == self.pair_count
    }

    fn summary(&self) -> SessionSummary {
        let matched = self.matched_pairs() as u32;
        SessionSummary {
            items_studied: matched,
            correct_answers: matched,
            incorrect_answers: self.mistakes,
            completed: self.is_complete(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewStudyItem;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn session(count: usize) -> MatchSession {
        let items: Vec<_> = (0..count)
            .map(|i| NewStudyItem::new(format!("term {}", i), format!("def {}", i)).into_item())
            .collect();
        MatchSession::new(&items, &mut StdRng::seed_from_u64(11))
    }

    fn partner(s: &MatchSession, index: usize) -> usize {
        let tile = &s.tiles()[index];
        s.tiles()
            .iter()
            .position(|t| t.pair == tile.pair && t.side != tile.side)
            .unwrap()
    }

    fn non_partner(s: &MatchSession, index: usize) -> usize {
        let tile = &s.tiles()[index];
        s.tiles().iter().position(|t| t.pair != tile.pair).unwrap()
    }

    #[test]
    fn round_is_capped() {
        let s = session(10);
        assert_eq!(s.tiles().len(), MATCH_PAIRS * 2);
    }

    #[test]
    fn later_rounds_deal_the_rest() {
        let mut s = session(10);
        assert_eq!(s.round(), (1, 2));

        while s.round().0 == 1 {
            let open = s.tiles().iter().position(|t| !t.matched).unwrap();
            let other = partner(&s, open);
            s.select(open);
            s.select(other);
        }

        assert_eq!(s.tiles().len(), 8);
        assert_eq!(s.matched_pairs(), MATCH_PAIRS);
        assert_eq!(s.cursor(), 0);
        assert!(!s.is_complete());

        while let Some(open) = s.tiles().iter().position(|t| !t.matched) {
            let other = partner(&s, open);
            s.select(open);
            s.select(other);
        }

        assert!(s.is_complete());
        assert_eq!(s.round(), (2, 2));
        assert_eq!(s.summary().items_studied, 10);
    }

    #[test]
    fn small_set_uses_all_items() {
        let s = session(2);
        assert_eq!(s.tiles().len(), 4);
    }

    #[test]
    fn matching_pair_clears() {
        let mut s = session(3);
        assert_eq!(s.select(0), MatchOutcome::Selected);
        let other = partner(&s, 0);
        assert_eq!(s.select(other), MatchOutcome::Matched);
        assert_eq!(s.matched_pairs(), 1);
        assert_eq!(s.select(0), MatchOutcome::Ignored);
    }

    #[test]
    fn mismatch_counts_mistake() {
        let mut s = session(3);
        s.select(0);
        let wrong = non_partner(&s, 0);
        assert_eq!(s.select(wrong), MatchOutcome::Mismatch);
        assert_eq!(s.mistakes(), 1);
        assert!(s.selected().is_none());
    }

    #[test]
    fn reselecting_deselects() {
        let mut s = session(2);
        s.select(1);
        assert_eq!(s.select(1), MatchOutcome::Deselected);
        assert!(s.selected().is_none());
    }

    #[test]
    fn clearing_everything_completes() {
        let mut s = session(3);
        s.select(0);
        let wrong = non_partner(&s, 0);
        s.select(wrong);

        while let Some(open) = s.tiles().iter().position(|t| !t.matched) {
            let other = partner(&s, open);
            s.select(open);
            s.select(other);
        }

        assert!(s.is_complete());
        let summary = s.summary();
        assert_eq!(summary.items_studied, 3);
        assert_eq!(summary.correct_answers, 3);
        assert_eq!(summary.incorrect_answers, 1);
        assert!(summary.completed);
    }

    #[test]
    fn cursor_wraps() {
        let mut s = session(2);
        s.move_cursor(false);
        assert_eq!(s.cursor(), 3);
        s.move_cursor(true);
        assert_eq!(s.cursor(), 0);
    }
}
