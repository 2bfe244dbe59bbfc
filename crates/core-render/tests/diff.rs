//! Differential-rendering correctness against a virtual screen.
//!
//! Ops from an incremental redraw must leave the virtual screen in the
//! same state as a from-scratch paint of the new frame.

use core_render::{DisplayManager, FrameInput, TermOp};
use proptest::prelude::*;

const WIDTH: usize = 12;
const ROWS: usize = 8;

#[derive(Clone, PartialEq, Eq)]
struct Screen {
    cells: Vec<Vec<u8>>,
    row: usize,
    col: usize,
}

impl std::fmt::Debug for Screen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for row in &self.cells {
            writeln!(f, "[{}]", String::from_utf8_lossy(row))?;
        }
        Ok(())
    }
}

impl Screen {
    fn new() -> Self {
        Self {
            cells: vec![vec![b' '; WIDTH]; ROWS],
            row: 0,
            col: 0,
        }
    }

    fn put(&mut self, b: u8) {
        if self.col >= WIDTH {
            // Terminal autowrap: a pending write past the margin lands
            // on the next row.
            self.row = (self.row + 1).min(ROWS - 1);
            self.col = 0;
        }
        self.cells[self.row][self.col] = b;
        self.col += 1;
    }

    fn apply(&mut self, op: &TermOp) {
        match op {
            TermOp::MoveUp(n) => self.row = self.row.saturating_sub(*n as usize),
            TermOp::MoveDown(n) => self.row = (self.row + *n as usize).min(ROWS - 1),
            TermOp::MoveToCol(n) => self.col = (*n as usize).min(WIDTH),
            TermOp::CarriageReturn => self.col = 0,
            TermOp::Print { chars, .. } => {
                for &b in chars {
                    self.put(b);
                }
            }
            TermOp::Pad(n) => {
                for _ in 0..*n {
                    self.put(b' ');
                }
            }
            TermOp::InsertChars(n) => {
                let n = (*n as usize).min(WIDTH - self.col.min(WIDTH));
                if self.col < WIDTH {
                    let row = &mut self.cells[self.row];
                    for _ in 0..n {
                        row.insert(self.col, b' ');
                        row.pop();
                    }
                }
            }
            TermOp::DeleteChars(n) => {
                if self.col < WIDTH {
                    let row = &mut self.cells[self.row];
                    for _ in 0..(*n as usize).min(WIDTH - self.col) {
                        row.remove(self.col);
                        row.push(b' ');
                    }
                }
            }
            TermOp::ClearToEol => {
                if self.col < WIDTH {
                    for c in &mut self.cells[self.row][self.col..] {
                        *c = b' ';
                    }
                }
            }
        }
    }
}

fn render(mgr: &mut DisplayManager, prompt: &str, buffer: &str, point: usize) -> Vec<TermOp> {
    let mut ops = Vec::new();
    mgr.render(
        &FrameInput {
            prompt,
            buffer,
            point,
            ..Default::default()
        },
        &mut ops,
    );
    ops
}

fn paint(screen: &mut Screen, ops: &[TermOp]) {
    for op in ops {
        screen.apply(op);
    }
}

#[test]
fn incremental_insert_matches_full_repaint() {
    let mut incremental = DisplayManager::new(WIDTH as u32, ROWS as u32, ROWS as u32);
    let mut screen = Screen::new();
    paint(&mut screen, &render(&mut incremental, "> ", "abc def", 7));
    paint(&mut screen, &render(&mut incremental, "> ", "abc  def", 8));

    let mut fresh = DisplayManager::new(WIDTH as u32, ROWS as u32, ROWS as u32);
    let mut expected = Screen::new();
    paint(&mut expected, &render(&mut fresh, "> ", "abc  def", 8));

    assert_eq!(screen.cells, expected.cells);
}

#[test]
fn diff_does_not_rewrite_unchanged_segments() {
    let mut mgr = DisplayManager::new(80, 8, 8);
    let _ = render(&mut mgr, "", "abc def", 7);
    let ops = render(&mut mgr, "", "abc  def", 8);

    let printed: Vec<u8> = ops
        .iter()
        .filter_map(|op| match op {
            TermOp::Print { chars, .. } => Some(chars.clone()),
            _ => None,
        })
        .flatten()
        .collect();
    assert_eq!(printed, b" ");
    assert!(ops.contains(&TermOp::InsertChars(1)));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn incremental_always_matches_full_repaint(
        first in "[a-z ]{0,20}",
        second in "[a-z ]{0,20}",
        point_frac in 0..=100usize,
    ) {
        let point = second.len() * point_frac / 100;

        let mut incremental = DisplayManager::new(WIDTH as u32, ROWS as u32, ROWS as u32);
        let mut screen = Screen::new();
        paint(&mut screen, &render(&mut incremental, "> ", &first, first.len()));
        paint(&mut screen, &render(&mut incremental, "> ", &second, point));

        let mut fresh = DisplayManager::new(WIDTH as u32, ROWS as u32, ROWS as u32);
        let mut expected = Screen::new();
        paint(&mut expected, &render(&mut fresh, "> ", &second, point));

        prop_assert_eq!(screen.cells, expected.cells);
    }

    #[test]
    fn rendered_rows_fit_width(buffer in "[a-z ]{0,40}") {
        let mut mgr = DisplayManager::new(WIDTH as u32, ROWS as u32, ROWS as u32);
        let mut screen = Screen::new();
        paint(&mut screen, &render(&mut mgr, "> ", &buffer, buffer.len()));
        for row in &screen.cells {
            prop_assert_eq!(row.len(), WIDTH);
        }
    }
}
