use thiserror::Error;

pub const CARD_SIDE: usize = 5;
pub const CARD_CELLS: usize = CARD_SIDE * CARD_SIDE;
/// Index of the free centre cell.
pub const FREE_CELL: usize = 12;
pub const COLUMN_LETTERS: [char; CARD_SIDE] = ['B', 'I', 'N', 'G', 'O'];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CardError {
    #[error("card must have {CARD_CELLS} cells, got {0}")]
    WrongSize(usize),
}

/// A 5x5 card exactly as the server generated it. Read-only on the client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BingoCard {
    cells: [u8; CARD_CELLS],
}

impl BingoCard {
    pub fn from_values(values: Vec<u8>) -> Result<Self, CardError> {
        let cells: [u8; CARD_CELLS] = values
            .try_into()
            .map_err(|rest: Vec<u8>| CardError::WrongSize(rest.len()))?;
        Ok(Self { cells })
    }

    pub fn value(&self, index: usize) -> Option<u8> {
        self.cells.get(index).copied()
    }

    pub fn is_free(index: usize) -> bool {
        index == FREE_CELL
    }

    /// Label shown for a cell: the number, or a star for the free centre.
    pub fn label(&self, index: usize) -> String {
        if Self::is_free(index) {
            String::from("★")
        } else {
            self.value(index).map(|v| v.to_string()).unwrap_or_default()
        }
    }
}

/// Card plus the player's marks. Marks are display state only and are never
/// sent to the server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MarkedCard {
    card: BingoCard,
    marked: [bool; CARD_CELLS],
}

impl MarkedCard {
    pub fn new(card: BingoCard) -> Self {
        Self {
            card,
            marked: [false; CARD_CELLS],
        }
    }

    pub fn card(&self) -> &BingoCard {
        &self.card
    }

    pub fn is_marked(&self, index: usize) -> bool {
        self.marked.get(index).copied().unwrap_or(false)
    }

    pub fn toggle(&mut self, index: usize) {
        if let Some(mark) = self.marked.get_mut(index) {
            *mark = !*mark;
        }
    }

    /// Clears every mark, then marks the cells whose number has been called.
    pub fn mark_called(&mut self, called: &[u8]) {
        for (idx, value) in self.card.cells.iter().enumerate() {
            self.marked[idx] = !BingoCard::is_free(idx) && called.contains(value);
        }
    }

    pub fn replace_card(&mut self, card: BingoCard) {
        if card != self.card {
            self.card = card;
            self.marked = [false; CARD_CELLS];
        }
    }

    pub fn marked_count(&self) -> usize {
        self.marked.iter().filter(|m| **m).count()
    }
}
