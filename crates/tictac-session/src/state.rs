//! The authoritative in-memory model of one game session.
//!
//! [`SessionState`] wraps a [`SessionSnapshot`] and only lets it change
//! through the session commands. Every successful change bumps the
//! snapshot revision; rejected commands leave the state untouched.

use tictac_types::{Cell, Mark, Outcome, ParticipantId, Phase, Seat, SessionSnapshot};
use tracing::debug;

use crate::rules;
use crate::{InvalidSnapshot, RuleViolation};

/// Maximum number of seated participants.
pub const MAX_PARTICIPANTS: usize = 2;

/// Result of an accepted move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// The mark that was placed.
    pub mark: Mark,
    /// Row of the placed mark.
    pub row: usize,
    /// Column of the placed mark.
    pub col: usize,
    /// Set when this move ended the game.
    pub outcome: Option<Outcome>,
}

/// One game session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    state: SessionSnapshot,
}

impl SessionState {
    /// An empty session: no participants, empty board, waiting.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current lifecycle phase.
    pub const fn phase(&self) -> Phase {
        self.state.phase
    }

    /// Mark whose move is accepted next.
    pub const fn turn(&self) -> Mark {
        self.state.turn
    }

    /// Outcome of a finished game.
    pub const fn outcome(&self) -> Option<Outcome> {
        self.state.outcome
    }

    /// Current revision.
    pub const fn revision(&self) -> u64 {
        self.state.revision
    }

    /// Number of seated participants.
    pub fn participant_count(&self) -> usize {
        self.state.participant_count()
    }

    /// Mark held by `participant`, if seated.
    pub fn mark_of(&self, participant: &ParticipantId) -> Option<Mark> {
        self.state.mark_of(participant)
    }

    /// Borrow the full state without copying it.
    pub const fn view(&self) -> &SessionSnapshot {
        &self.state
    }

    /// Seat `participant`.
    ///
    /// Re-seating an already seated participant returns their mark and
    /// changes nothing. A newcomer takes the first mark not held by the
    /// remaining participant, so a rejoin after a departure never
    /// duplicates a mark. The second seat starts play.
    ///
    /// # Errors
    ///
    /// Returns [`RuleViolation::GameFull`] when both seats are taken.
    pub fn add_participant(&mut self, participant: &ParticipantId) -> Result<Mark, RuleViolation> {
        if let Some(mark) = self.state.mark_of(participant) {
            return Ok(mark);
        }
        if self.state.participants.len() >= MAX_PARTICIPANTS {
            return Err(RuleViolation::GameFull);
        }
        let mark = Mark::ALL
            .into_iter()
            .find(|m| !self.state.participants.iter().any(|seat| seat.mark == *m))
            .ok_or(RuleViolation::GameFull)?;

        self.state.participants.push(Seat {
            participant: participant.clone(),
            mark,
        });
        if self.state.participants.len() == MAX_PARTICIPANTS && self.state.phase == Phase::Waiting {
            self.state.phase = Phase::InProgress;
        }
        self.bump();
        debug!(%participant, %mark, phase = %self.state.phase, "participant seated");
        Ok(mark)
    }

    /// Unseat `participant`.
    ///
    /// Returns `false` if they were not seated. Losing a participant
    /// mid-game pauses play (phase back to waiting) without clearing the
    /// board; a finished game stays finished until reset.
    pub fn remove_participant(&mut self, participant: &ParticipantId) -> bool {
        let before = self.state.participants.len();
        self.state
            .participants
            .retain(|seat| &seat.participant != participant);
        if self.state.participants.len() == before {
            return false;
        }
        if self.state.phase == Phase::InProgress
            && self.state.participants.len() < MAX_PARTICIPANTS
        {
            self.state.phase = Phase::Waiting;
        }
        self.bump();
        debug!(%participant, phase = %self.state.phase, "participant unseated");
        true
    }

    /// Place `participant`'s mark at `(row, col)`.
    ///
    /// # Errors
    ///
    /// Checked in order: [`RuleViolation::NotInProgress`],
    /// [`RuleViolation::UnknownParticipant`], [`RuleViolation::WrongTurn`],
    /// [`RuleViolation::OutOfBounds`], [`RuleViolation::CellOccupied`].
    /// The state is unchanged on error.
    pub fn apply_move(
        &mut self,
        participant: &ParticipantId,
        row: i64,
        col: i64,
    ) -> Result<Placement, RuleViolation> {
        if self.state.phase != Phase::InProgress {
            return Err(RuleViolation::NotInProgress);
        }
        let mark = self
            .state
            .mark_of(participant)
            .ok_or(RuleViolation::UnknownParticipant)?;
        if mark != self.state.turn {
            return Err(RuleViolation::WrongTurn {
                current: self.state.turn,
            });
        }
        let (row, col) = match (usize::try_from(row), usize::try_from(col)) {
            (Ok(r), Ok(c)) => (r, c),
            _ => return Err(RuleViolation::OutOfBounds),
        };
        match self.state.board.get(row, col) {
            None => return Err(RuleViolation::OutOfBounds),
            Some(cell) if !cell.is_empty() => return Err(RuleViolation::CellOccupied),
            Some(_) => {}
        }

        self.state.board.set(row, col, Cell::from(mark));
        let outcome = rules::evaluate(&self.state.board);
        match outcome {
            Some(result) => {
                self.state.phase = Phase::Finished;
                self.state.outcome = Some(result);
            }
            None => self.state.turn = mark.other(),
        }
        self.bump();

        Ok(Placement {
            mark,
            row,
            col,
            outcome,
        })
    }

    /// Clear the board, unseat everyone, and return to waiting.
    pub fn reset(&mut self) {
        let revision = self.state.revision;
        self.state = SessionSnapshot {
            revision,
            ..SessionSnapshot::default()
        };
        self.bump();
    }

    /// Copy out the whole state.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.clone()
    }

    /// Replace the whole state with `snapshot`.
    pub fn restore(&mut self, snapshot: SessionSnapshot) {
        self.state = snapshot;
    }

    fn bump(&mut self) {
        self.state.revision = self.state.revision.saturating_add(1);
    }
}

/// Check that a snapshot from outside this process respects the session
/// invariants before it is restored.
///
/// # Errors
///
/// Returns the first [`InvalidSnapshot`] violation found.
pub fn validate(snapshot: &SessionSnapshot) -> Result<(), InvalidSnapshot> {
    let seats = &snapshot.participants;
    if seats.len() > MAX_PARTICIPANTS {
        return Err(InvalidSnapshot::TooManyParticipants(seats.len()));
    }
    if let [a, b] = seats.as_slice() {
        if a.mark == b.mark {
            return Err(InvalidSnapshot::DuplicateMark(a.mark));
        }
        if a.participant == b.participant {
            return Err(InvalidSnapshot::DuplicateParticipant(a.participant.clone()));
        }
    }
    if snapshot.phase == Phase::InProgress && seats.len() != MAX_PARTICIPANTS {
        return Err(InvalidSnapshot::PhaseMismatch(
            "in_progress requires two participants",
        ));
    }
    let terminal = rules::evaluate(&snapshot.board);
    match (snapshot.phase, snapshot.outcome) {
        (Phase::Finished, Some(outcome)) if terminal == Some(outcome) => Ok(()),
        (Phase::Finished, _) => Err(InvalidSnapshot::PhaseMismatch(
            "finished session must record the board's outcome",
        )),
        (_, Some(_)) => Err(InvalidSnapshot::PhaseMismatch(
            "outcome set on an unfinished session",
        )),
        (_, None) if terminal.is_some() => Err(InvalidSnapshot::PhaseMismatch(
            "terminal board on an unfinished session",
        )),
        (_, None) => Ok(()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn p(id: &str) -> ParticipantId {
        ParticipantId::from(id)
    }

    fn started() -> SessionState {
        let mut session = SessionState::new();
        session.add_participant(&p("p1")).unwrap();
        session.add_participant(&p("p2")).unwrap();
        session
    }

    /// Play alternating moves, panicking on any rejection.
    fn play(session: &mut SessionState, moves: &[(&str, i64, i64)]) -> Option<Outcome> {
        let mut last = None;
        for &(who, row, col) in moves {
            last = session.apply_move(&p(who), row, col).unwrap().outcome;
        }
        last
    }

    #[test]
    fn seating_assigns_marks_in_join_order() {
        let mut session = SessionState::new();
        assert_eq!(session.add_participant(&p("p1")), Ok(Mark::X));
        assert_eq!(session.phase(), Phase::Waiting);
        assert_eq!(session.add_participant(&p("p2")), Ok(Mark::O));
        assert_eq!(session.phase(), Phase::InProgress);
        assert_eq!(session.turn(), Mark::X);
    }

    #[test]
    fn third_participant_is_rejected() {
        let mut session = started();
        let before = session.snapshot();
        assert_eq!(
            session.add_participant(&p("p3")),
            Err(RuleViolation::GameFull)
        );
        assert_eq!(session.snapshot(), before);
    }

    #[test]
    fn seating_is_idempotent() {
        let mut session = SessionState::new();
        session.add_participant(&p("p1")).unwrap();
        let revision = session.revision();
        assert_eq!(session.add_participant(&p("p1")), Ok(Mark::X));
        assert_eq!(session.participant_count(), 1);
        assert_eq!(session.revision(), revision);
    }

    #[test]
    fn departure_pauses_without_clearing_board() {
        let mut session = started();
        play(&mut session, &[("p1", 1, 1)]);
        assert!(session.remove_participant(&p("p2")));
        assert_eq!(session.phase(), Phase::Waiting);
        assert_eq!(session.view().board.get(1, 1), Some(Cell::X));
        assert!(!session.remove_participant(&p("p2")));
    }

    #[test]
    fn rejoin_takes_the_free_mark() {
        let mut session = started();
        session.remove_participant(&p("p1"));
        assert_eq!(session.add_participant(&p("p3")), Ok(Mark::X));
        assert_eq!(session.phase(), Phase::InProgress);
        assert_eq!(session.mark_of(&p("p2")), Some(Mark::O));
    }

    #[test]
    fn moves_before_second_join_are_rejected() {
        let mut session = SessionState::new();
        session.add_participant(&p("p1")).unwrap();
        assert_eq!(
            session.apply_move(&p("p1"), 0, 0),
            Err(RuleViolation::NotInProgress)
        );
    }

    #[test]
    fn violations_leave_state_untouched() {
        let mut session = started();
        play(&mut session, &[("p1", 0, 0)]);
        let before = session.snapshot();

        let cases = [
            (p("ghost"), 1, 1, RuleViolation::UnknownParticipant),
            (p("p1"), 1, 1, RuleViolation::WrongTurn { current: Mark::O }),
            (p("p2"), 3, 0, RuleViolation::OutOfBounds),
            (p("p2"), 0, -1, RuleViolation::OutOfBounds),
            (p("p2"), 0, 0, RuleViolation::CellOccupied),
        ];
        for (who, row, col, expected) in cases {
            assert_eq!(session.apply_move(&who, row, col), Err(expected));
            assert_eq!(session.snapshot(), before);
        }
    }

    #[test]
    fn row_win_finishes_the_game() {
        let mut session = started();
        let outcome = play(
            &mut session,
            &[
                ("p1", 0, 0),
                ("p2", 1, 0),
                ("p1", 0, 1),
                ("p2", 1, 1),
                ("p1", 0, 2),
            ],
        );
        assert_eq!(outcome, Some(Outcome::Win(Mark::X)));
        assert_eq!(session.phase(), Phase::Finished);
        assert_eq!(session.outcome(), Some(Outcome::Win(Mark::X)));
        assert_eq!(
            session.apply_move(&p("p2"), 2, 2),
            Err(RuleViolation::NotInProgress)
        );
    }

    #[test]
    fn finished_game_stays_finished_through_departures() {
        let mut session = started();
        play(
            &mut session,
            &[
                ("p1", 0, 0),
                ("p2", 1, 0),
                ("p1", 0, 1),
                ("p2", 1, 1),
                ("p1", 0, 2),
            ],
        );
        session.remove_participant(&p("p2"));
        session.add_participant(&p("p3")).unwrap();
        assert_eq!(session.phase(), Phase::Finished);
        assert_eq!(
            session.apply_move(&p("p3"), 2, 2),
            Err(RuleViolation::NotInProgress)
        );
    }

    #[test]
    fn full_board_without_line_is_a_draw() {
        let mut session = started();
        // X O X / X O O / O X X
        let outcome = play(
            &mut session,
            &[
                ("p1", 0, 0),
                ("p2", 0, 1),
                ("p1", 0, 2),
                ("p2", 1, 1),
                ("p1", 1, 0),
                ("p2", 1, 2),
                ("p1", 2, 1),
                ("p2", 2, 0),
                ("p1", 2, 2),
            ],
        );
        assert_eq!(outcome, Some(Outcome::Draw));
        assert_eq!(session.phase(), Phase::Finished);
    }

    #[test]
    fn reset_clears_everything_but_advances_revision() {
        let mut session = started();
        play(&mut session, &[("p1", 0, 0)]);
        let revision = session.revision();
        session.reset();
        assert_eq!(session.phase(), Phase::Waiting);
        assert_eq!(session.participant_count(), 0);
        assert!(session.view().board.is_empty());
        assert_eq!(session.turn(), Mark::X);
        assert!(session.revision() > revision);
    }

    #[test]
    fn restore_of_snapshot_is_identity() {
        let mut session = started();
        play(&mut session, &[("p1", 2, 0), ("p2", 0, 2)]);
        let snapshot = session.snapshot();

        let mut other = SessionState::new();
        other.restore(snapshot.clone());
        assert_eq!(other, session);

        let json = serde_json::to_string(&snapshot).unwrap();
        let decoded: SessionSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, snapshot);
    }

    #[test]
    fn reachable_states_validate() {
        let mut session = started();
        assert_eq!(validate(&session.snapshot()), Ok(()));
        play(
            &mut session,
            &[
                ("p1", 0, 0),
                ("p2", 1, 0),
                ("p1", 0, 1),
                ("p2", 1, 1),
                ("p1", 0, 2),
            ],
        );
        assert_eq!(validate(&session.snapshot()), Ok(()));
    }

    #[test]
    fn corrupt_snapshots_are_rejected() {
        let mut snapshot = started().snapshot();
        snapshot.participants.push(Seat {
            participant: p("p3"),
            mark: Mark::X,
        });
        assert_eq!(
            validate(&snapshot),
            Err(InvalidSnapshot::TooManyParticipants(3))
        );

        let mut snapshot = started().snapshot();
        if let Some(seat) = snapshot.participants.get_mut(1) {
            seat.mark = Mark::X;
        }
        assert_eq!(validate(&snapshot), Err(InvalidSnapshot::DuplicateMark(Mark::X)));

        let mut snapshot = SessionSnapshot::default();
        snapshot.outcome = Some(Outcome::Draw);
        assert!(validate(&snapshot).is_err());
    }
}
