use thiserror::Error;

/// An action attempted outside its precondition. The caller offered an action
/// the hand could not take.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidAction {
    #[error("cannot double down: hand already holds {0} cards")]
    DoubleAfterDeal(usize),
    #[error("cannot surrender: an action was already taken on this hand")]
    SurrenderAfterAction,
    #[error("hand cannot be split")]
    SplitNotAllowed,
    #[error("cannot take a card from an empty hand")]
    EmptyHand,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no strategy table provided")]
    MissingTable,
    #[error("strategy table must have {expected} rows, found {found}")]
    RowCount { expected: usize, found: usize },
    #[error("strategy row {row} must have {expected} cells, found {found}")]
    ColumnCount {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("strategy cell {cell:?} at row {row}, column {col} is not a valid action code")]
    BadCell { row: usize, col: usize, cell: String },
    #[error("strategy lookup ({row}, {col}) falls outside the table")]
    OutOfRange { row: i32, col: i32 },
    #[error("strategy cell at row {row}, column {col} recommends {code} with no legal fallback")]
    NoLegalAction { row: usize, col: usize, code: String },
    #[error("strategy must be chart text or an array of rows")]
    UnsupportedFormat,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RoundError {
    #[error("round has not been started")]
    NotStarted,
    #[error("round was already started")]
    AlreadyStarted,
    #[error("round is already resolved")]
    AlreadyResolved,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    InvalidAction(#[from] InvalidAction),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Round(#[from] RoundError),
    #[error("player input closed")]
    InputClosed,
    #[error("invalid input: {0}")]
    Input(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
