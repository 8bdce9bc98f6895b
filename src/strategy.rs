use std::fmt;

use serde::{Serialize, Serializer};

use crate::{
    error::{ConfigError, Error},
    hand::Hand,
    player::{Decision, Policy},
};

pub const ROWS: usize = 35;
pub const COLS: usize = 23;

/// Row labels: hard 4-20, pairs 22-TT, AA, then soft A2-A9.
pub const ROW_LABELS: [&str; ROWS] = [
    "4", "5", "6", "7", "8", "9", "10", "11", "12", "13", "14", "15", "16", "17", "18", "19", "20",
    "22", "33", "44", "55", "66", "77", "88", "99", "TT", "AA", "A2", "A3", "A4", "A5", "A6", "A7",
    "A8", "A9",
];

/// Column labels: dealer hard 4-20, then soft AA-A6.
pub const COL_LABELS: [&str; COLS] = [
    "4", "5", "6", "7", "8", "9", "10", "11", "12", "13", "14", "15", "16", "17", "18", "19", "20",
    "AA", "A2", "A3", "A4", "A5", "A6",
];

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "PascalCase")]
pub enum Action {
    Stand,
    Hit,
    Double,
    Split,
    Surrender,
}

impl Action {
    pub const ALL: [Action; 5] = [
        Action::Stand,
        Action::Hit,
        Action::Double,
        Action::Split,
        Action::Surrender,
    ];

    pub fn from_code(code: char) -> Option<Action> {
        let action = match code.to_ascii_uppercase() {
            'S' => Action::Stand,
            'H' => Action::Hit,
            'D' => Action::Double,
            'P' => Action::Split,
            'R' => Action::Surrender,
            _ => return None,
        };
        Some(action)
    }

    pub fn as_code(&self) -> char {
        match self {
            Action::Stand => 'S',
            Action::Hit => 'H',
            Action::Double => 'D',
            Action::Split => 'P',
            Action::Surrender => 'R',
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Action::Stand => "Stand",
            Action::Hit => "Hit",
            Action::Double => "Double",
            Action::Split => "Split",
            Action::Surrender => "Surrender",
        }
    }

    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

/// A small set of actions, iterated in stand/hit/double/split/surrender order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ActionSet(u8);

impl ActionSet {
    pub fn of(actions: &[Action]) -> Self {
        ActionSet(actions.iter().fold(0, |bits, a| bits | a.bit()))
    }

    pub fn contains(&self, action: Action) -> bool {
        self.0 & action.bit() != 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Action> {
        let set = *self;
        Action::ALL.into_iter().filter(move |a| set.contains(*a))
    }
}

impl fmt::Display for ActionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for action in self.iter() {
            if !first {
                write!(f, " ")?;
            }
            write!(f, "{} ({})", action.name(), action.as_code())?;
            first = false;
        }
        Ok(())
    }
}

/// One chart entry: the recommended action and, for two-letter codes such as
/// `Dh`, what to do when it is not available.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cell {
    pub primary: Action,
    pub fallback: Option<Action>,
}

impl Cell {
    fn parse(code: &str, row: usize, col: usize) -> Result<Cell, ConfigError> {
        let bad = || ConfigError::BadCell {
            row,
            col,
            cell: code.to_string(),
        };
        let mut chars = code.chars();
        let primary = chars.next().and_then(Action::from_code).ok_or_else(bad)?;
        let fallback = match chars.next() {
            Some(c) => Some(Action::from_code(c).ok_or_else(bad)?),
            None => None,
        };
        if chars.next().is_some() {
            return Err(bad());
        }
        Ok(Cell { primary, fallback })
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.primary.as_code())?;
        if let Some(fallback) = self.fallback {
            write!(f, "{}", fallback.as_code().to_ascii_lowercase())?;
        }
        Ok(())
    }
}

/// The 35 x 23 strategy chart. Rows and columns are 1-based in lookups.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StrategyTable {
    cells: Vec<Cell>,
}

impl StrategyTable {
    pub fn from_rows<R, C>(rows: R) -> Result<Self, ConfigError>
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: AsRef<str>,
    {
        let mut cells = Vec::with_capacity(ROWS * COLS);
        let mut found = 0;
        for (r, row) in rows.into_iter().enumerate() {
            found += 1;
            let start = cells.len();
            for (c, code) in row.into_iter().enumerate() {
                cells.push(Cell::parse(code.as_ref(), r + 1, c + 1)?);
            }
            let width = cells.len() - start;
            if width != COLS {
                return Err(ConfigError::ColumnCount {
                    row: r + 1,
                    expected: COLS,
                    found: width,
                });
            }
        }
        if found != ROWS {
            return Err(ConfigError::RowCount {
                expected: ROWS,
                found,
            });
        }
        Ok(StrategyTable { cells })
    }

    /// Reads the chart text: a header line, then one line per row holding the
    /// row label and its cell codes.
    pub fn parse_chart(text: &str) -> Result<Self, ConfigError> {
        let rows = text
            .lines()
            .skip(1)
            .filter(|line| !line.trim().is_empty())
            .map(|line| line.split_whitespace().skip(1));
        Self::from_rows(rows)
    }

    /// Accepts either chart text or an array of rows of cell codes.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        match value {
            serde_json::Value::Null => Err(ConfigError::MissingTable),
            serde_json::Value::String(text) => Self::parse_chart(&text),
            serde_json::Value::Array(_) => {
                let rows: Vec<Vec<String>> =
                    serde_json::from_value(value).map_err(|_| ConfigError::UnsupportedFormat)?;
                Self::from_rows(rows)
            }
            _ => Err(ConfigError::UnsupportedFormat),
        }
    }

    pub(crate) fn from_cells(cells: Vec<Cell>) -> Self {
        debug_assert_eq!(cells.len(), ROWS * COLS);
        StrategyTable { cells }
    }

    /// The cell at a 1-based (row, column), or `None` outside the grid.
    pub fn cell(&self, row: usize, col: usize) -> Option<Cell> {
        if !(1..=ROWS).contains(&row) || !(1..=COLS).contains(&col) {
            return None;
        }
        Some(self.cells[(row - 1) * COLS + (col - 1)])
    }

    /// Maps the dealer's hand and the player's hand to a 1-based (row, column).
    pub fn locate(
        dealer: &Hand,
        hand: &Hand,
        splittable: bool,
    ) -> Result<(usize, usize), ConfigError> {
        let dealer_value = dealer.value() as i32;
        let col = if dealer.is_soft() && (12..=17).contains(&dealer_value) {
            dealer_value - 11 + 17
        } else {
            dealer_value - 3
        };

        let value = hand.value() as i32;
        let row = if hand.is_soft() && (13..=20).contains(&value) {
            value - 12 + 27
        } else if splittable {
            if hand.is_soft() {
                27
            } else {
                value / 2 + 16
            }
        } else {
            value - 3
        };

        if !(1..=ROWS as i32).contains(&row) || !(1..=COLS as i32).contains(&col) {
            return Err(ConfigError::OutOfRange { row, col });
        }
        Ok((row as usize, col as usize))
    }
}

/// Serializes as the chart text.
impl Serialize for StrategyTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl fmt::Display for StrategyTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>3}", "")?;
        for label in COL_LABELS {
            write!(f, " {label:>2}")?;
        }
        writeln!(f)?;
        for (r, label) in ROW_LABELS.iter().enumerate() {
            write!(f, "{label:>3}")?;
            for c in 0..COLS {
                write!(f, " {:>2}", self.cells[r * COLS + c].to_string())?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Plays every decision straight off a strategy chart.
pub struct TablePolicy {
    table: StrategyTable,
}

impl TablePolicy {
    pub fn new(table: StrategyTable) -> Self {
        TablePolicy { table }
    }

    pub fn table(&self) -> &StrategyTable {
        &self.table
    }

    /// Reads the chart cell for `decision`. A two-letter cell falls back to
    /// its second action when the first is not legal. A split cell is only
    /// reached on a pair row while the hand can split, so a split cell that
    /// cannot be played is a configuration error like any other mismatch.
    pub fn recommend(&self, decision: &Decision<'_>) -> Result<Action, ConfigError> {
        let splittable = decision.can_split();
        let (row, col) = StrategyTable::locate(decision.dealer(), decision.hand(), splittable)?;
        let cell = self.table.cell(row, col).ok_or(ConfigError::OutOfRange {
            row: row as i32,
            col: col as i32,
        })?;
        let legal = decision.legal_actions_with(splittable);

        let action = if legal.contains(cell.primary) {
            Some(cell.primary)
        } else {
            cell.fallback.filter(|fallback| legal.contains(*fallback))
        };
        action.ok_or_else(|| ConfigError::NoLegalAction {
            row,
            col,
            code: cell.to_string(),
        })
    }
}

impl Policy for TablePolicy {
    fn decide(&mut self, decision: &Decision<'_>) -> Result<Action, Error> {
        let action = self.recommend(decision)?;
        log::trace!(
            "table: {} vs dealer {} -> {}",
            decision.hand(),
            decision.dealer(),
            action.name()
        );
        Ok(action)
    }
}
