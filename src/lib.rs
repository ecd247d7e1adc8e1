pub mod board;
pub mod game;
pub mod movegen;
pub mod session;

pub use board::{Board, BoardError, Color, Piece, PieceKind, Square};
pub use game::{apply_move, is_checkmate, is_stalemate, GameState, GameStatus, MoveError};
pub use movegen::{
    has_legal_move, is_in_check, is_legal, is_pseudo_legal, legal_destinations, legal_moves, Move,
};
pub use session::{Session, SessionOptions};
