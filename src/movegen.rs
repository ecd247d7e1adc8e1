use crate::board::{Board, Color, PieceKind, Square};
use crate::game::GameState;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Move {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<PieceKind>,
}

impl Move {
    pub fn new(from: Square, to: Square) -> Self {
        Self {
            from,
            to,
            promotion: None,
        }
    }

    pub fn new_promotion(from: Square, to: Square, promotion: PieceKind) -> Self {
        Self {
            from,
            to,
            promotion: Some(promotion),
        }
    }
}

/// True when every square strictly between `from` and `to` is empty.
/// Walks one unit step per axis toward `to`, so the squares must share a
/// rank, a file or a diagonal for the walk to land on `to`.
pub fn is_path_clear(board: &Board, from: Square, to: Square) -> bool {
    let dr = (to.rank() as i8 - from.rank() as i8).signum();
    let df = (to.file() as i8 - from.file() as i8).signum();

    let mut current = from.offset(dr, df);
    while let Some(square) = current {
        if square == to {
            return true;
        }
        if !board.is_empty(square) {
            return false;
        }
        current = square.offset(dr, df);
    }
    false
}

/// Movement geometry for whatever piece stands on `from`, judged by that
/// piece's own colour. Ignores king safety.
pub fn can_reach(board: &Board, from: Square, to: Square) -> bool {
    let Some(piece) = board.get_piece_at(from) else {
        return false;
    };

    // Never onto a piece of our own colour (this also rules out from == to)
    if let Some(target) = board.get_piece_at(to) {
        if target.color == piece.color {
            return false;
        }
    }

    let rank_delta = to.rank() as i8 - from.rank() as i8;
    let row_diff = rank_delta.abs();
    let col_diff = (to.file() as i8 - from.file() as i8).abs();

    match piece.kind {
        PieceKind::Pawn => pawn_can_reach(board, from, to, piece.color),
        PieceKind::Knight => row_diff * col_diff == 2,
        PieceKind::Bishop => row_diff == col_diff && is_path_clear(board, from, to),
        PieceKind::Rook => (row_diff == 0) != (col_diff == 0) && is_path_clear(board, from, to),
        PieceKind::Queen => {
            let diagonal = row_diff == col_diff;
            let straight = (row_diff == 0) != (col_diff == 0);
            (diagonal || straight) && is_path_clear(board, from, to)
        }
        PieceKind::King => row_diff <= 1 && col_diff <= 1,
    }
}

fn pawn_can_reach(board: &Board, from: Square, to: Square, color: Color) -> bool {
    let direction = color.pawn_direction();
    let rank_delta = to.rank() as i8 - from.rank() as i8;
    let col_diff = (to.file() as i8 - from.file() as i8).abs();

    match (col_diff, rank_delta) {
        // Single step forward
        (0, d) if d == direction => board.is_empty(to),
        // Double step from the starting rank, through an empty square
        (0, d) if d == 2 * direction => {
            from.rank() == color.pawn_start_rank()
                && board.is_empty(to)
                && from
                    .offset(direction, 0)
                    .map_or(false, |mid| board.is_empty(mid))
        }
        // Diagonal capture
        (1, d) if d == direction => board
            .get_piece_at(to)
            .map_or(false, |target| target.color != color),
        _ => false,
    }
}

/// Whether any `attacker` piece could move onto `target` by geometry alone.
pub fn is_square_attacked(board: &Board, target: Square, attacker: Color) -> bool {
    board
        .pieces_of(attacker)
        .any(|(from, _)| can_reach(board, from, target))
}

/// # Panics
///
/// Panics if `color` has no king on the board. A well-formed game never
/// loses a king, so this only fires on a corrupted position.
pub fn is_king_attacked(board: &Board, color: Color) -> bool {
    let Some(king) = board.king_square(color) else {
        panic!("no {color} king on the board");
    };
    is_square_attacked(board, king, color.opposite())
}

/// Geometry check for a move by the side to move. Returns false when `from`
/// is empty or holds an opponent piece.
pub fn is_pseudo_legal(state: &GameState, from: Square, to: Square) -> bool {
    match state.board.get_piece_at(from) {
        Some(piece) if piece.color == state.turn => can_reach(&state.board, from, to),
        _ => false,
    }
}

/// # Panics
///
/// Panics if `color` has no king on the board.
pub fn is_in_check(state: &GameState, color: Color) -> bool {
    is_king_attacked(&state.board, color)
}

/// Pseudo-legal and leaves the mover's king safe. The king-safety test runs
/// on a scratch copy of the board so `state` is never touched.
pub fn is_legal(state: &GameState, from: Square, to: Square) -> bool {
    if !is_pseudo_legal(state, from, to) {
        return false;
    }

    let mut scratch = state.board;
    scratch.relocate(from, to);
    let exposed = is_king_attacked(&scratch, state.turn);
    if exposed {
        trace!(%from, %to, "move leaves own king attacked");
    }
    !exposed
}

/// Every square the piece on `from` may legally move to.
pub fn legal_destinations(state: &GameState, from: Square) -> Vec<Square> {
    Square::all().filter(|&to| is_legal(state, from, to)).collect()
}

/// All legal moves for the side to move. A pawn reaching its promotion rank
/// yields one move per promotion kind.
pub fn legal_moves(state: &GameState) -> Vec<Move> {
    let mut moves = Vec::new();
    for (from, piece) in state.board.pieces_of(state.turn) {
        for to in legal_destinations(state, from) {
            if piece.kind == PieceKind::Pawn && to.rank() == piece.color.promotion_rank() {
                for kind in PieceKind::PROMOTIONS {
                    moves.push(Move::new_promotion(from, to, kind));
                }
            } else {
                moves.push(Move::new(from, to));
            }
        }
    }
    moves
}

/// Stops at the first legal move found.
pub fn has_legal_move(state: &GameState) -> bool {
    state
        .board
        .pieces_of(state.turn)
        .any(|(from, _)| Square::all().any(|to| is_legal(state, from, to)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Piece;

    fn sq(rank: u8, file: u8) -> Square {
        Square::new(rank, file).unwrap()
    }

    fn position(rows: [&str; 8], turn: Color) -> GameState {
        GameState::from_board(Board::from_diagram(&rows).unwrap(), turn)
    }

    #[test]
    fn test_initial_position_moves() {
        let state = GameState::new();
        // 16 pawn moves and 4 knight moves
        assert_eq!(legal_moves(&state).len(), 20);
        assert!(is_legal(&state, sq(6, 4), sq(4, 4)));
        assert!(is_legal(&state, sq(6, 4), sq(5, 4)));
        assert!(!is_legal(&state, sq(6, 4), sq(3, 4)));
        assert!(is_legal(&state, sq(7, 6), sq(5, 5)));
        // Blocked bishop and rook
        assert!(!is_legal(&state, sq(7, 2), sq(5, 0)));
        assert!(!is_legal(&state, sq(7, 0), sq(5, 0)));
    }

    #[test]
    fn test_black_pieces_not_movable_on_white_turn() {
        let state = GameState::new();
        assert!(!is_pseudo_legal(&state, sq(1, 4), sq(3, 4)));
        assert!(!is_pseudo_legal(&state, sq(4, 4), sq(3, 4)));
    }

    #[test]
    fn test_never_onto_own_piece() {
        let state = position(
            [
                "r...k..r",
                "pp.n.ppp",
                "..p.b...",
                "...Q....",
                "..B.n...",
                ".N...N..",
                "PPP..PPP",
                "R...K..R",
            ],
            Color::White,
        );
        for (from, piece) in state.board.pieces() {
            for (to, target) in state.board.pieces() {
                if target.color == piece.color {
                    assert!(!can_reach(&state.board, from, to), "{from} -> {to}");
                }
            }
        }
    }

    #[test]
    fn test_path_clear() {
        let mut board = Board::empty();
        assert!(is_path_clear(&board, sq(7, 0), sq(0, 0)));
        assert!(is_path_clear(&board, sq(7, 0), sq(0, 7)));
        assert!(is_path_clear(&board, sq(3, 3), sq(3, 4)));
        board.set_piece_at(sq(4, 3), Some(Piece::new(PieceKind::Pawn, Color::Black)));
        assert!(!is_path_clear(&board, sq(7, 0), sq(1, 6)));
        assert!(is_path_clear(&board, sq(7, 0), sq(4, 3)));
        // Not aligned
        assert!(!is_path_clear(&board, sq(0, 0), sq(1, 2)));
    }

    #[test]
    fn test_sliders_blocked_by_any_intermediate_piece() {
        let blocker = Some(Piece::new(PieceKind::Knight, Color::Black));
        for kind in [PieceKind::Rook, PieceKind::Bishop, PieceKind::Queen] {
            let targets: &[(u8, u8)] = match kind {
                PieceKind::Rook => &[(4, 0), (4, 7), (0, 4), (7, 4)],
                PieceKind::Bishop => &[(0, 0), (7, 7), (1, 7), (7, 1)],
                _ => &[(4, 0), (0, 0), (7, 7), (0, 4)],
            };
            for &(r, f) in targets {
                let from = sq(4, 4);
                let to = sq(r, f);
                let mut board = Board::empty();
                board.set_piece_at(from, Some(Piece::new(kind, Color::White)));
                assert!(can_reach(&board, from, to), "{kind:?} {from} -> {to}");

                let dr = (r as i8 - 4).signum();
                let df = (f as i8 - 4).signum();
                let mut between = from.offset(dr, df).unwrap();
                while between != to {
                    let mut blocked = board;
                    blocked.set_piece_at(between, blocker);
                    assert!(!can_reach(&blocked, from, to), "{kind:?} through {between}");
                    between = between.offset(dr, df).unwrap();
                }
            }
        }
    }

    #[test]
    fn test_piece_geometry() {
        let mut board = Board::empty();
        let from = sq(4, 4);
        let cases = [
            (PieceKind::Knight, 8),
            (PieceKind::Bishop, 13),
            (PieceKind::Rook, 14),
            (PieceKind::Queen, 27),
            (PieceKind::King, 8),
        ];
        for (kind, expected) in cases {
            board.set_piece_at(from, Some(Piece::new(kind, Color::White)));
            let reachable = Square::all().filter(|&to| can_reach(&board, from, to)).count();
            assert_eq!(reachable, expected, "{kind:?}");
        }
    }

    #[test]
    fn test_pawn_rules() {
        let state = position(
            [
                "....k...",
                "...p....",
                "..P.....",
                "........",
                ".p......",
                "p.......",
                "PP.....P",
                "....K...",
            ],
            Color::White,
        );
        // Double step needs the intermediate square empty
        assert!(!is_legal(&state, sq(6, 0), sq(4, 0)));
        assert!(!is_legal(&state, sq(6, 0), sq(5, 0)));
        assert!(!is_legal(&state, sq(6, 1), sq(4, 1)));
        assert!(is_legal(&state, sq(6, 1), sq(5, 0)));
        assert!(is_legal(&state, sq(6, 7), sq(4, 7)));
        // Only one step from outside the starting rank
        assert!(is_legal(&state, sq(2, 2), sq(1, 2)));
        assert!(!is_legal(&state, sq(2, 2), sq(0, 2)));
        // Captures only diagonally forward onto an enemy piece
        assert!(is_legal(&state, sq(2, 2), sq(1, 3)));
        assert!(!is_legal(&state, sq(2, 2), sq(1, 1)));
        assert!(!is_legal(&state, sq(6, 7), sq(7, 6)));
        // No backwards moves
        assert!(!is_legal(&state, sq(6, 7), sq(7, 7)));

        let black = GameState::from_board(state.board, Color::Black);
        assert!(is_legal(&black, sq(1, 3), sq(3, 3)));
        assert!(is_legal(&black, sq(1, 3), sq(2, 2)));
        assert!(is_legal(&black, sq(4, 1), sq(5, 1)));
        assert!(!is_legal(&black, sq(4, 1), sq(6, 1)));
    }

    #[test]
    fn test_double_step_only_from_start_rank() {
        let mut board = Board::empty();
        board.set_piece_at(sq(0, 0), Some(Piece::new(PieceKind::King, Color::Black)));
        board.set_piece_at(sq(7, 7), Some(Piece::new(PieceKind::King, Color::White)));
        for rank in 2..=6u8 {
            let mut b = board;
            let from = sq(rank, 3);
            b.set_piece_at(from, Some(Piece::new(PieceKind::Pawn, Color::White)));
            let state = GameState::from_board(b, Color::White);
            let Some(to) = from.offset(-2, 0) else { continue };
            assert_eq!(is_legal(&state, from, to), rank == 6, "rank {rank}");
        }
    }

    #[test]
    fn test_rook_gives_check_along_file() {
        let state = position(
            [
                "....r..k",
                "........",
                "........",
                "........",
                "........",
                "........",
                "........",
                "....K...",
            ],
            Color::White,
        );
        assert!(is_in_check(&state, Color::White));
        assert!(!is_in_check(&state, Color::Black));
    }

    #[test]
    fn test_check_blocked() {
        let state = position(
            [
                "....r..k",
                "........",
                "........",
                "....n...",
                "........",
                "........",
                "........",
                "....K...",
            ],
            Color::White,
        );
        assert!(!is_in_check(&state, Color::White));
    }

    #[test]
    fn test_pawn_gives_check_only_diagonally() {
        let mut state = position(
            [
                "........",
                "........",
                "........",
                "...p....",
                "...K....",
                "........",
                "........",
                "k.......",
            ],
            Color::White,
        );
        assert!(!is_in_check(&state, Color::White));
        state.board.relocate(sq(3, 3), sq(3, 2));
        assert!(is_in_check(&state, Color::White));
    }

    #[test]
    fn test_pinned_piece_cannot_move() {
        let state = position(
            [
                "....r..k",
                "........",
                "........",
                "........",
                "........",
                "....B...",
                "........",
                "....K...",
            ],
            Color::White,
        );
        assert!(is_pseudo_legal(&state, sq(5, 4), sq(4, 3)));
        assert!(!is_legal(&state, sq(5, 4), sq(4, 3)));
        assert!(legal_destinations(&state, sq(5, 4)).is_empty());
        // The bishop still shields the file after the king steps up
        assert!(is_legal(&state, sq(7, 4), sq(6, 4)));
    }

    #[test]
    fn test_must_resolve_check() {
        let state = position(
            [
                "....r..k",
                "........",
                "........",
                "........",
                "........",
                "........",
                "R.......",
                "....K...",
            ],
            Color::White,
        );
        assert!(is_in_check(&state, Color::White));
        // Blocking on the file is fine, any other rook move is not
        assert!(is_legal(&state, sq(6, 0), sq(6, 4)));
        assert!(!is_legal(&state, sq(6, 0), sq(5, 0)));
        assert!(!is_legal(&state, sq(7, 4), sq(6, 4)));
        assert!(is_legal(&state, sq(7, 4), sq(7, 3)));
    }

    #[test]
    fn test_queries_do_not_mutate_state() {
        let state = position(
            [
                "....r..k",
                "........",
                "........",
                "........",
                "........",
                "....B...",
                "........",
                "....K...",
            ],
            Color::White,
        );
        let before = state.clone();
        for to in Square::all() {
            is_legal(&state, sq(5, 4), to);
        }
        let _ = legal_moves(&state);
        let _ = has_legal_move(&state);
        assert_eq!(state, before);
    }

    #[test]
    fn test_promotion_moves_enumerated() {
        let state = position(
            [
                "........",
                "P......k",
                "........",
                "........",
                "........",
                "........",
                "........",
                "....K...",
            ],
            Color::White,
        );
        let promotions: Vec<Move> = legal_moves(&state)
            .into_iter()
            .filter(|mv| mv.from == sq(1, 0))
            .collect();
        assert_eq!(promotions.len(), 4);
        assert!(promotions.iter().all(|mv| mv.to == sq(0, 0) && mv.promotion.is_some()));
    }

    #[test]
    #[should_panic(expected = "no White king")]
    fn test_missing_king_panics() {
        let state = GameState::from_board(Board::empty(), Color::White);
        is_in_check(&state, Color::White);
    }
}
