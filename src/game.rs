use crate::board::{Board, Color, Piece, PieceKind, Square};
use crate::movegen::{has_legal_move, is_in_check, is_legal, Move};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MoveError {
    #[error("illegal move {from} -> {to}")]
    Illegal { from: Square, to: Square },
    #[error("move {from} -> {to} promotes a pawn; choose queen, rook, bishop or knight")]
    PromotionRequired { from: Square, to: Square },
    #[error("no piece of the side to move on {square}")]
    EmptyOrigin { square: Square },
    #[error("a pawn cannot promote to a {}", .0.name())]
    InvalidPromotion(PieceKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    Ongoing,
    Checkmate { winner: Color },
    Stalemate,
}

impl GameStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, GameStatus::Ongoing)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GameState {
    pub board: Board,
    pub turn: Color,
}

impl GameState {
    /// Standard starting position, White to move.
    pub fn new() -> Self {
        Self::from_board(Board::new(), Color::White)
    }

    pub fn from_board(board: Board, turn: Color) -> Self {
        Self { board, turn }
    }

    /// Applies `mv` in place. On error the state is left untouched.
    pub fn make_move(&mut self, mv: Move) -> Result<(), MoveError> {
        *self = apply_move(self, mv)?;
        Ok(())
    }

    pub fn status(&self) -> GameStatus {
        if has_legal_move(self) {
            GameStatus::Ongoing
        } else if is_in_check(self, self.turn) {
            GameStatus::Checkmate {
                winner: self.turn.opposite(),
            }
        } else {
            GameStatus::Stalemate
        }
    }
}

impl Default for GameState {
    fn default() -> Self {
        GameState::new()
    }
}

/// Validates `mv` for the side to move and returns the resulting state.
pub fn apply_move(state: &GameState, mv: Move) -> Result<GameState, MoveError> {
    let piece = match state.board.get_piece_at(mv.from) {
        Some(piece) if piece.color == state.turn => piece,
        _ => {
            debug!(from = %mv.from, turn = %state.turn, "no own piece on origin square");
            return Err(MoveError::EmptyOrigin { square: mv.from });
        }
    };

    if !is_legal(state, mv.from, mv.to) {
        debug!(from = %mv.from, to = %mv.to, kind = piece.kind.name(), "rejected illegal move");
        return Err(MoveError::Illegal {
            from: mv.from,
            to: mv.to,
        });
    }

    let promotes = piece.kind == PieceKind::Pawn && mv.to.rank() == piece.color.promotion_rank();
    let placed = if promotes {
        let kind = mv.promotion.ok_or(MoveError::PromotionRequired {
            from: mv.from,
            to: mv.to,
        })?;
        if !kind.is_promotion_target() {
            return Err(MoveError::InvalidPromotion(kind));
        }
        info!(square = %mv.to, kind = kind.name(), "pawn promoted");
        Piece::new(kind, piece.color)
    } else {
        // A promotion kind on any other move is ignored
        piece
    };

    let mut board = state.board;
    board.set_piece_at(mv.to, Some(placed));
    board.set_piece_at(mv.from, None);

    info!(from = %mv.from, to = %mv.to, kind = piece.kind.name(), color = %piece.color, "move applied");
    Ok(GameState {
        board,
        turn: state.turn.opposite(),
    })
}

/// In check with no legal move. Scans every own piece against every square
/// and stops at the first legal move.
pub fn is_checkmate(state: &GameState) -> bool {
    is_in_check(state, state.turn) && !has_legal_move(state)
}

/// Not in check, yet no legal move.
pub fn is_stalemate(state: &GameState) -> bool {
    !is_in_check(state, state.turn) && !has_legal_move(state)
}
