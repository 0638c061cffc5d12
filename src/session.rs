use crate::circle::{Circle, Point};

// ── Draw State ──────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum DrawState {
    /// No center placed.
    #[default]
    Idle,
    /// Center placed, radius follows the pointer.
    Placing { center: Point, radius: f64 },
    /// Edge click just happened; collapses to `Idle` once appended.
    Committed(Circle),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Undo,
    Finish,
    Abort,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SessionEvent {
    PrimaryClick(Point),
    PointerMoved(Point),
    Command(Command),
}

#[derive(Clone, Debug, PartialEq)]
pub enum SessionEnd {
    Finished(Vec<Circle>),
    Aborted,
}

// ── Session ─────────────────────────────────────────────────────────────────

/// Annotation of a single image: the in-progress circle plus the committed
/// list. Once `handle` returns a `SessionEnd` the session is spent and later
/// events are ignored.
#[derive(Debug, Default)]
pub struct Session {
    state: DrawState,
    circles: Vec<Circle>,
    ended: bool,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DrawState {
        self.state
    }

    pub fn circles(&self) -> &[Circle] {
        &self.circles
    }

    /// The circle being placed, if any.
    pub fn pending(&self) -> Option<Circle> {
        match self.state {
            DrawState::Placing { center, radius } => Some(Circle { center, radius }),
            _ => None,
        }
    }

    pub fn handle(&mut self, event: SessionEvent) -> Option<SessionEnd> {
        if self.ended {
            return None;
        }
        match event {
            SessionEvent::PrimaryClick(pos) => {
                self.click(pos);
                None
            }
            SessionEvent::PointerMoved(pos) => {
                if let DrawState::Placing { center, radius } = &mut self.state {
                    *radius = center.distance_to(pos);
                }
                None
            }
            SessionEvent::Command(Command::Undo) => {
                self.undo();
                None
            }
            SessionEvent::Command(Command::Finish) => {
                self.ended = true;
                self.state = DrawState::Idle;
                Some(SessionEnd::Finished(std::mem::take(&mut self.circles)))
            }
            SessionEvent::Command(Command::Abort) => {
                self.ended = true;
                self.state = DrawState::Idle;
                self.circles.clear();
                Some(SessionEnd::Aborted)
            }
        }
    }

    fn click(&mut self, pos: Point) {
        match self.state {
            DrawState::Idle | DrawState::Committed(_) => {
                self.state = DrawState::Placing {
                    center: pos,
                    radius: 0.0,
                };
            }
            DrawState::Placing { center, .. } => {
                self.state = DrawState::Committed(Circle::through(center, pos));
                self.settle();
            }
        }
    }

    fn settle(&mut self) {
        if let DrawState::Committed(circle) = self.state {
            log::debug!(
                "committed circle at ({}, {}) r={}",
                circle.center.x,
                circle.center.y,
                circle.radius
            );
            self.circles.push(circle);
            self.state = DrawState::Idle;
        }
    }

    fn undo(&mut self) {
        if let DrawState::Placing { .. } = self.state {
            self.state = DrawState::Idle;
        } else {
            self.circles.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn click(session: &mut Session, x: i32, y: i32) -> Option<SessionEnd> {
        session.handle(SessionEvent::PrimaryClick(Point::new(x, y)))
    }

    fn command(session: &mut Session, cmd: Command) -> Option<SessionEnd> {
        session.handle(SessionEvent::Command(cmd))
    }

    #[test]
    fn starts_idle_and_empty() {
        let s = Session::new();
        assert_eq!(s.state(), DrawState::Idle);
        assert!(s.circles().is_empty());
        assert!(s.pending().is_none());
    }

    #[test]
    fn first_click_places_center_with_zero_radius() {
        let mut s = Session::new();
        click(&mut s, 7, 9);
        assert_eq!(
            s.state(),
            DrawState::Placing {
                center: Point::new(7, 9),
                radius: 0.0
            }
        );
        assert!(s.circles().is_empty());
    }

    #[test]
    fn pointer_move_tracks_radius_while_placing() {
        let mut s = Session::new();
        click(&mut s, 0, 0);
        s.handle(SessionEvent::PointerMoved(Point::new(3, 4)));
        assert_eq!(s.pending().unwrap().radius, 5.0);
        s.handle(SessionEvent::PointerMoved(Point::new(0, 2)));
        assert_eq!(s.pending().unwrap().radius, 2.0);
    }

    #[test]
    fn pointer_move_while_idle_is_ignored() {
        let mut s = Session::new();
        s.handle(SessionEvent::PointerMoved(Point::new(3, 4)));
        assert_eq!(s.state(), DrawState::Idle);
    }

    #[test]
    fn center_then_edge_commits_one_circle() {
        let mut s = Session::new();
        click(&mut s, 0, 0);
        click(&mut s, 3, 4);
        assert_eq!(s.state(), DrawState::Idle);
        assert_eq!(
            s.circles(),
            &[Circle {
                center: Point::new(0, 0),
                radius: 5.0
            }]
        );
    }

    #[test]
    fn edge_click_radius_wins_over_last_move() {
        let mut s = Session::new();
        click(&mut s, 0, 0);
        s.handle(SessionEvent::PointerMoved(Point::new(10, 0)));
        click(&mut s, 6, 8);
        assert_eq!(s.circles()[0].radius, 10.0);
        click(&mut s, 1, 1);
        s.handle(SessionEvent::PointerMoved(Point::new(40, 1)));
        click(&mut s, 1, 3);
        assert_eq!(s.circles()[1].radius, 2.0);
    }

    #[test]
    fn undo_while_placing_keeps_committed_circles() {
        let mut s = Session::new();
        click(&mut s, 0, 0);
        click(&mut s, 0, 5);
        click(&mut s, 20, 20);
        command(&mut s, Command::Undo);
        assert_eq!(s.state(), DrawState::Idle);
        assert_eq!(s.circles().len(), 1);
    }

    #[test]
    fn undo_while_placing_on_empty_list_cancels_center() {
        let mut s = Session::new();
        click(&mut s, 4, 4);
        command(&mut s, Command::Undo);
        assert_eq!(s.state(), DrawState::Idle);
        assert!(s.circles().is_empty());
    }

    #[test]
    fn undo_when_idle_removes_last_circle() {
        let mut s = Session::new();
        click(&mut s, 0, 0);
        click(&mut s, 0, 1);
        click(&mut s, 10, 10);
        click(&mut s, 10, 12);
        command(&mut s, Command::Undo);
        assert_eq!(s.circles().len(), 1);
        assert_eq!(s.circles()[0].center, Point::new(0, 0));
    }

    #[test]
    fn undo_on_empty_idle_session_is_noop() {
        let mut s = Session::new();
        assert_eq!(command(&mut s, Command::Undo), None);
        assert_eq!(s.state(), DrawState::Idle);
        assert!(s.circles().is_empty());
    }

    #[test]
    fn finish_returns_committed_circles_and_drops_pending() {
        let mut s = Session::new();
        click(&mut s, 10, 10);
        click(&mut s, 15, 10);
        click(&mut s, 50, 50);
        let end = command(&mut s, Command::Finish);
        assert_eq!(
            end,
            Some(SessionEnd::Finished(vec![Circle {
                center: Point::new(10, 10),
                radius: 5.0
            }]))
        );
        assert_eq!(command(&mut s, Command::Undo), None);
    }

    #[test]
    fn abort_discards_everything() {
        let mut s = Session::new();
        click(&mut s, 0, 0);
        click(&mut s, 3, 4);
        assert_eq!(command(&mut s, Command::Abort), Some(SessionEnd::Aborted));
        assert!(s.circles().is_empty());
    }

    #[test]
    fn events_after_end_are_ignored() {
        let mut s = Session::new();
        command(&mut s, Command::Finish);
        assert_eq!(click(&mut s, 1, 1), None);
        assert_eq!(command(&mut s, Command::Abort), None);
        assert_eq!(s.state(), DrawState::Idle);
    }
}
