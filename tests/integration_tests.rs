//! Integration tests for the legality engine
//!
//! The scripted sequences walk a 3x3 game through one case of every illegal
//! move kind, switching rulesets between moves. They run once per superko
//! confirmation strategy, and every step checks that `check` and `play`
//! agree.

use weiqi_dataset::board::{Board, Color, Vertex};
use weiqi_dataset::error::IllegalMove;
use weiqi_dataset::game::GameState;
use weiqi_dataset::group::Group;
use weiqi_dataset::history::SuperkoConfirm;
use weiqi_dataset::legality::{Phase, Validator, Verdict, check_legal};
use weiqi_dataset::moves::{Move, parse_moves};
use weiqi_dataset::rules::Ruleset;

// =============================================================================
// Helper functions
// =============================================================================

const STRATEGIES: [SuperkoConfirm; 3] = [
    SuperkoConfirm::Snapshot,
    SuperkoConfirm::Replay,
    SuperkoConfirm::FingerprintOnly,
];

/// One scripted step: the move, the ruleset to switch to before it (if
/// any), and the expected rejection.
struct Step {
    mv: &'static str,
    ruleset: Option<&'static str>,
    expected: Option<IllegalMove>,
}

fn ok(mv: &'static str) -> Step {
    Step {
        mv,
        ruleset: None,
        expected: None,
    }
}

fn err(mv: &'static str, expected: IllegalMove) -> Step {
    Step {
        mv,
        ruleset: None,
        expected: Some(expected),
    }
}

impl Step {
    fn under(mut self, ruleset: &'static str) -> Self {
        self.ruleset = Some(ruleset);
        self
    }
}

fn basic_sequence() -> Vec<Step> {
    vec![
        ok("Bba"),
        err("Bcc", IllegalMove::WrongPlayer),
        ok("W"),
        err("Bee", IllegalMove::OutsideBoard),
        err("Bba", IllegalMove::VertexNotEmpty),
        ok("Bab"),
        err("Waa", IllegalMove::Suicide).under("AGA"),
        ok("Waa").under("NZ"),
        ok("B"),
        ok("Wbb"),
        ok("B"),
        ok("Wca"),
        ok("B"),
        ok("Waa"),
        err("Bba", IllegalMove::SituationalSuperko),
        err("Bba", IllegalMove::PositionalSuperko).under("TT"),
    ]
}

fn extended_sequence() -> Vec<Step> {
    let mut steps = basic_sequence();
    steps.extend([
        ok("Bba").under(""),
        ok("W"),
        ok("Bcb"),
        ok("Wbc").under("TT"),
        ok("Bac"),
        ok("Waa"),
        err("Bab", IllegalMove::PositionalSuperko),
        ok("Bab").under("NZ"),
    ]);
    steps
}

fn run_script(steps: &[Step], confirm: SuperkoConfirm) {
    let mut g = GameState::with_confirm(3, 3, Ruleset::UNRESTRICTED, confirm).unwrap();

    for (i, step) in steps.iter().enumerate() {
        if let Some(name) = step.ruleset {
            g.set_ruleset(Ruleset::from_name(name).unwrap());
        }
        let mv: Move = step.mv.parse().unwrap();

        let checked = g.check(mv);
        let played = g.play(mv);
        assert_eq!(
            checked, played,
            "{confirm:?}: check and play disagree on step {i} ({})",
            step.mv
        );

        let actual = played.err().map(|e| e.kind);
        assert_eq!(
            actual, step.expected,
            "{confirm:?}: unexpected result on step {i} ({})",
            step.mv
        );
    }
}

fn snapshot(g: &GameState) -> (u64, Color, usize, usize) {
    (
        g.board().fingerprint(),
        g.turn(),
        g.history().len(),
        g.board().stone_count(),
    )
}

// =============================================================================
// Scripted sequences
// =============================================================================

#[test]
fn test_basic_sequence_all_strategies() {
    for confirm in STRATEGIES {
        run_script(&basic_sequence(), confirm);
    }
}

#[test]
fn test_extended_sequence_all_strategies() {
    for confirm in STRATEGIES {
        run_script(&extended_sequence(), confirm);
    }
}

#[test]
fn test_check_leaves_game_untouched() {
    for confirm in STRATEGIES {
        let mut g = GameState::with_confirm(3, 3, Ruleset::NEW_ZEALAND, confirm).unwrap();
        for step in basic_sequence() {
            if let Some(name) = step.ruleset {
                g.set_ruleset(Ruleset::from_name(name).unwrap());
            }
            let mv: Move = step.mv.parse().unwrap();
            let before = snapshot(&g);
            let _ = g.check(mv);
            assert_eq!(snapshot(&g), before, "{confirm:?}: check mutated on {}", step.mv);
            let _ = g.play(mv);
        }
    }
}

#[test]
fn test_rejected_play_leaves_game_untouched() {
    let mut g = GameState::new(3, 3, Ruleset::AGA).unwrap();
    for mv in parse_moves(&["Bba", "W", "Bab"]).unwrap() {
        g.play(mv).unwrap();
    }
    let before = snapshot(&g);
    let e = g.play("Waa".parse().unwrap()).unwrap_err();
    assert_eq!(e.kind, IllegalMove::Suicide);
    assert_eq!(snapshot(&g), before);
}

// =============================================================================
// Setup and reset
// =============================================================================

#[test]
fn test_setup_only_rejects_outside_board() {
    let mut g = GameState::new(3, 3, Ruleset::TROMP_TAYLOR).unwrap();
    g.play(Move::play(Color::Black, 0, 1)).unwrap();
    let root_fingerprint = g.history()[0].fingerprint;

    let e = g.setup(Move::play(Color::White, 5, 5)).unwrap_err();
    assert_eq!(e.kind, IllegalMove::OutsideBoard);

    // Overwriting an occupied vertex with the wrong color is fine in setup
    g.setup(Move::play(Color::White, 0, 1)).unwrap();
    assert_eq!(g.turn(), Color::White, "setup must not switch turns");
    assert_eq!(g.board().color_at(Vertex::new(0, 1)), Some(Color::White));
    assert_eq!(g.history()[0].fingerprint, root_fingerprint);
    assert_ne!(g.history()[1].fingerprint, g.board().fingerprint());
}

#[test]
fn test_setup_suicide_removes_stone() {
    let mut g = GameState::new(3, 3, Ruleset::AGA).unwrap();
    for (row, col) in [(0, 1), (1, 0)] {
        g.setup(Move::play(Color::Black, row, col)).unwrap();
    }
    g.setup(Move::play(Color::White, 0, 0)).unwrap();
    assert_eq!(g.board().color_at(Vertex::new(0, 0)), None);
    assert_eq!(g.board().stone_count(), 2);
}

#[test]
fn test_reset_matches_fresh_game() {
    let fresh = GameState::new(19, 19, Ruleset::NEW_ZEALAND).unwrap();
    let mut g = GameState::new(19, 19, Ruleset::NEW_ZEALAND).unwrap();
    g.play(Move::play(Color::Black, 1, 1)).unwrap();
    g.reset();
    assert_eq!(g.board(), fresh.board());
    assert_eq!(g.turn(), Color::Black);
    assert_eq!(g.history().len(), 1, "only the root remains");
}

// =============================================================================
// Groups and boards
// =============================================================================

#[test]
fn test_group_expansion() {
    // X X .
    // . X .
    // X O X
    let mut b = Board::new(3, 3);
    for (row, col) in [(0, 0), (0, 1), (1, 1), (2, 0), (2, 2)] {
        b.place(Move::play(Color::Black, row, col));
    }
    b.place(Move::play(Color::White, 2, 1));

    let g = Group::find(&b, Vertex::new(0, 1));
    assert_eq!(g.interior().len(), 3);
    assert!(g.is_alive());

    let g = Group::find(&b, Vertex::new(2, 1));
    assert!(!g.is_alive());
    assert_eq!(g.interior(), &[Vertex::new(2, 1)]);
}

#[test]
fn test_group_removal_spares_diagonals() {
    let mut b = Board::new(2, 2);
    b.place(Move::play(Color::Black, 0, 0));
    b.place(Move::play(Color::Black, 1, 1));
    b.remove_group(&Group::find(&b, Vertex::new(0, 0)));
    assert_eq!(b.color_at(Vertex::new(1, 1)), Some(Color::Black));

    b.place(Move::play(Color::Black, 1, 0));
    b.remove_group(&Group::find(&b, Vertex::new(1, 0)));
    assert_eq!(b.color_at(Vertex::new(1, 1)), None);
    assert_eq!(b.fingerprint(), Board::new(2, 2).fingerprint());
}

#[test]
fn test_rectangular_board_bounds() {
    let b = Board::new(5, 6);
    assert!(!b.exists(Vertex::new(4, 6)));
    assert!(b.exists(Vertex::new(4, 5)));
}

#[test]
fn test_board_copy_is_deep() {
    let mut b1 = Board::new(5, 5);
    let mut b2 = b1.clone();
    b1.place(Move::play(Color::Black, 1, 1));
    assert_eq!(b2.color_at(Vertex::new(1, 1)), None);
    b2.place(Move::play(Color::Black, 1, 1));
    assert_eq!(b1, b2);
    assert_eq!(b1.fingerprint(), b2.fingerprint());
}

// =============================================================================
// Whole records
// =============================================================================

/// First moves of AlphaGo vs. Lee Sedol, game 1.
const PRO_OPENING: &[&str] = &[
    "Bpd", "Wdp", "Bcd", "Wqp", "Bop", "Woq", "Bnq", "Wpq", "Bcn", "Wfq", "Bmp", "Wpo", "Biq",
    "Wec", "Bhd", "Wcg", "Bed", "Wcj", "Bdc", "Wbp", "Bnc", "Wqi", "Bep", "Weo", "Bdk", "Wfp",
    "Bck", "Wdj", "Bej", "Wei", "Bfi", "Weh", "Bfh", "Wbj", "Bfk", "Wfg", "Bgg", "Wff", "Bgf",
    "Wmc",
];

#[test]
fn test_professional_game_is_legal() {
    let moves = parse_moves(PRO_OPENING).unwrap();
    for name in ["", "NZ", "AGA", "TT"] {
        assert_eq!(check_legal(19, 19, &[], &moves, name), Ok(Verdict::Legal));
    }
}

#[test]
fn test_handicap_game_starts_with_white() {
    let setup = parse_moves(&["Bdd", "Bpp"]).unwrap();
    let moves = parse_moves(&["Wdp", "Bpd"]).unwrap();
    assert_eq!(check_legal(19, 19, &setup, &moves, "NZ"), Ok(Verdict::Legal));
}

#[test]
fn test_verdict_locates_failure() {
    let setup = parse_moves(&["Bdd"]).unwrap();
    let moves = parse_moves(&["Wpp", "Bpp"]).unwrap();
    match check_legal(19, 19, &setup, &moves, "NZ").unwrap() {
        Verdict::Illegal {
            phase,
            index,
            error,
        } => {
            assert_eq!(phase, Phase::Moves);
            assert_eq!(index, 1);
            assert_eq!(error.kind, IllegalMove::VertexNotEmpty);
        }
        Verdict::Legal => panic!("occupied vertex accepted"),
    }

    let setup = parse_moves(&["Bdd", "Bzz"]).unwrap();
    match check_legal(19, 19, &setup, &[], "NZ").unwrap() {
        Verdict::Illegal { phase, index, .. } => {
            assert_eq!((phase, index), (Phase::Setup, 1));
        }
        Verdict::Legal => panic!("off-board setup stone accepted"),
    }
}

#[test]
fn test_validator_reuse_matches_fresh_checks() {
    let records: Vec<(usize, Vec<Move>)> = vec![
        (19, parse_moves(PRO_OPENING).unwrap()),
        (3, parse_moves(&["Bba", "W", "Bab", "Waa"]).unwrap()),
        (9, parse_moves(&["Bee", "Wee"]).unwrap()),
        (19, parse_moves(&PRO_OPENING[..10]).unwrap()),
        (3, parse_moves(&["Bba", "W", "Bab", "Waa"]).unwrap()),
    ];

    for confirm in STRATEGIES {
        let mut validator = Validator::with_confirm(Ruleset::AGA, confirm);
        for (size, moves) in &records {
            let reused = validator.validate(*size, *size, &[], moves).unwrap();
            let fresh = check_legal(*size, *size, &[], moves, "AGA").unwrap();
            assert_eq!(reused, fresh, "{confirm:?}: validator state leaked between records");
        }
    }
}
