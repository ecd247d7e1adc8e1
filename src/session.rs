use crate::board::{PieceKind, Square};
use crate::game::{apply_move, GameState, GameStatus, MoveError};
use crate::movegen::{is_in_check, legal_destinations, Move};
use anyhow::{bail, Result};
use std::io::{BufRead, Write};
use tracing::{debug, info};

const HELP: &str = "\
commands:
  click <rank> <file>                 select a piece, or move the selected piece there
  move <rank> <file> <rank> <file> [queen|rook|bishop|knight]
  promote <queen|rook|bishop|knight>  finish a pending pawn promotion
  board                               show the board
  new                                 start a new game
  quit
";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    /// Mark the legal destinations of a selected piece.
    pub show_hints: bool,
    /// Print the board after every applied move.
    pub show_board: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            show_hints: true,
            show_board: true,
        }
    }
}

impl SessionOptions {
    /// Parses command-line flags. Returns `None` when `--help` was given.
    pub fn from_args<I, S>(args: I) -> Result<Option<Self>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut options = SessionOptions::default();
        for arg in args {
            match arg.as_ref() {
                "--no-hints" => options.show_hints = false,
                "--quiet-board" => options.show_board = false,
                "--help" | "-h" => return Ok(None),
                other => bail!("unknown option '{other}' (try --help)"),
            }
        }
        Ok(Some(options))
    }

    pub fn usage() -> &'static str {
        "usage: ruleboard [--no-hints] [--quiet-board]\n\nReads one command per line from stdin; type 'help' once running.\n"
    }
}

/// Drives one game from line-oriented commands, the way a board UI would
/// drive it from clicks.
pub struct Session {
    state: GameState,
    status: GameStatus,
    selected: Option<Square>,
    pending_promotion: Option<Move>,
    options: SessionOptions,
}

impl Session {
    pub fn new(options: SessionOptions) -> Self {
        Session {
            state: GameState::new(),
            status: GameStatus::Ongoing,
            selected: None,
            pending_promotion: None,
            options,
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn selected(&self) -> Option<Square> {
        self.selected
    }

    pub fn run<R: BufRead, W: Write>(&mut self, mut reader: R, mut writer: W) -> Result<()> {
        let mut line = String::new();
        write!(writer, "{}", self.state.board)?;
        writeln!(writer, "turn: {}", self.state.turn)?;
        writer.flush()?;

        while reader.read_line(&mut line)? > 0 {
            let command = line.trim();
            if command == "quit" {
                break;
            }
            let response = self.handle_command(command)?;
            write!(writer, "{}", response)?;
            writer.flush()?;
            line.clear();
        }
        Ok(())
    }

    pub fn handle_command(&mut self, command: &str) -> Result<String> {
        let parts: Vec<&str> = command.split_whitespace().collect();
        if parts.is_empty() {
            return Ok(String::new());
        }

        let response = match parts[0] {
            "help" => HELP.to_string(),
            "board" => self.render(),
            "new" => self.handle_new(),
            "click" => match parse_square(&parts[1..]) {
                Some(square) if parts.len() == 3 => self.handle_click(square),
                _ => "usage: click <rank> <file>\n".to_string(),
            },
            "move" => match parse_move(&parts[1..]) {
                Some(mv) => {
                    self.selected = None;
                    self.try_move(mv)
                }
                None => "usage: move <rank> <file> <rank> <file> [promotion]\n".to_string(),
            },
            "promote" => match parts.get(1).and_then(|s| parse_kind(s)) {
                Some(kind) if parts.len() == 2 => self.handle_promote(kind),
                _ => "usage: promote <queen|rook|bishop|knight>\n".to_string(),
            },
            other => format!("unknown command '{other}' (try help)\n"),
        };
        Ok(response)
    }

    fn handle_new(&mut self) -> String {
        *self = Session::new(self.options);
        info!("new game");
        format!("{}turn: {}\n", self.state.board, self.state.turn)
    }

    fn handle_click(&mut self, square: Square) -> String {
        if self.status.is_terminal() {
            return game_over();
        }
        self.pending_promotion = None;

        let owns = self
            .state
            .board
            .get_piece_at(square)
            .map_or(false, |piece| piece.color == self.state.turn);

        match self.selected {
            // Clicking another own piece switches the selection
            _ if owns => self.select(square),
            None => format!("nothing of {}'s to select on {}\n", self.state.turn, square),
            Some(from) => {
                self.selected = None;
                self.try_move(Move::new(from, square))
            }
        }
    }

    fn select(&mut self, square: Square) -> String {
        self.selected = Some(square);
        let destinations = legal_destinations(&self.state, square);
        debug!(%square, count = destinations.len(), "piece selected");

        let mut response = format!("selected {}\n", square);
        if self.options.show_hints {
            if destinations.is_empty() {
                response.push_str("no legal moves for this piece\n");
            } else {
                let listed: Vec<String> = destinations.iter().map(|sq| sq.to_string()).collect();
                response.push_str(&format!("moves: {}\n", listed.join(" ")));
                response.push_str(&self.state.board.render(&destinations));
            }
        }
        response
    }

    fn handle_promote(&mut self, kind: PieceKind) -> String {
        if self.status.is_terminal() {
            return game_over();
        }
        match self.pending_promotion.take() {
            Some(mv) => self.try_move(Move::new_promotion(mv.from, mv.to, kind)),
            None => "no promotion pending\n".to_string(),
        }
    }

    fn try_move(&mut self, mv: Move) -> String {
        if self.status.is_terminal() {
            return game_over();
        }
        self.pending_promotion = None;

        match apply_move(&self.state, mv) {
            Ok(next) => {
                self.state = next;
                self.status = self.state.status();
                self.describe_move(mv)
            }
            Err(MoveError::PromotionRequired { .. }) => {
                self.pending_promotion = Some(mv);
                "promote: queen|rook|bishop|knight\n".to_string()
            }
            Err(err @ MoveError::InvalidPromotion(_)) => {
                // Keep asking for a usable kind
                self.pending_promotion = Some(Move::new(mv.from, mv.to));
                format!("rejected: {}\n", err)
            }
            Err(err) => format!("rejected: {}\n", err),
        }
    }

    fn describe_move(&self, mv: Move) -> String {
        let mut response = format!("moved {} -> {}\n", mv.from, mv.to);
        if self.options.show_board {
            response.push_str(&self.state.board.to_string());
        }
        match self.status {
            GameStatus::Checkmate { winner } => {
                info!(%winner, "checkmate");
                response.push_str(&format!("checkmate: {} wins\n", winner));
            }
            GameStatus::Stalemate => {
                info!("stalemate");
                response.push_str("stalemate\n");
            }
            GameStatus::Ongoing => {
                if is_in_check(&self.state, self.state.turn) {
                    response.push_str("check\n");
                }
                response.push_str(&format!("turn: {}\n", self.state.turn));
            }
        }
        response
    }

    fn render(&self) -> String {
        let marks = match (self.selected, self.options.show_hints) {
            (Some(square), true) => legal_destinations(&self.state, square),
            _ => Vec::new(),
        };
        format!("{}turn: {}\n", self.state.board.render(&marks), self.state.turn)
    }
}

fn game_over() -> String {
    "game over; type 'new' to play again\n".to_string()
}

fn parse_square(parts: &[&str]) -> Option<Square> {
    let rank = parts.first()?.parse::<u8>().ok()?;
    let file = parts.get(1)?.parse::<u8>().ok()?;
    Square::new(rank, file)
}

fn parse_kind(s: &str) -> Option<PieceKind> {
    // Pawns and kings are rejected by the engine, not here
    match s.chars().count() {
        1 => PieceKind::from_letter(s.chars().next()?),
        _ => PieceKind::ALL.into_iter().find(|kind| kind.name() == s),
    }
}

fn parse_move(parts: &[&str]) -> Option<Move> {
    if parts.len() != 4 && parts.len() != 5 {
        return None;
    }
    let from = parse_square(&parts[0..2])?;
    let to = parse_square(&parts[2..4])?;
    match parts.get(4) {
        Some(kind) => Some(Move::new_promotion(from, to, parse_kind(kind)?)),
        None => Some(Move::new(from, to)),
    }
}
