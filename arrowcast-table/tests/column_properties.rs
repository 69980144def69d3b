//! Randomized checks of the column builder's structural guarantees: length
//! monotonicity, the transition graph shape, text-shadow fidelity, lossy
//! accounting, and UTF-8-safe truncation.

use arrow::array::{Array, StringArray};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use arrowcast_table::{ColumnBuilder, Dtype, StringBuffer};

#[derive(Debug, Clone)]
enum Op {
    Str(String),
    NumberLiteral(String),
    ParsedNumber(f64, String),
    Timestamp(i64, bool, String),
    Skip,
}

fn random_op(rng: &mut StdRng) -> Op {
    match rng.random_range(0..5) {
        0 => {
            let len = rng.random_range(0..8);
            let s: String = (0..len)
                .map(|_| char::from(rng.random_range(b'a'..=b'z')))
                .collect();
            Op::Str(s)
        }
        1 => {
            let v: i64 = rng.random_range(-1_000_000_000_000_000_000..1_000_000_000_000_000_000);
            Op::NumberLiteral(v.to_string())
        }
        2 => {
            let v: f64 = rng.random_range(-1e6..1e6);
            Op::NumberLiteral(format!("{v:e}"))
        }
        3 => {
            let v: f64 = rng.random_range(-1e9..1e9);
            Op::ParsedNumber(v, format!("{v}"))
        }
        _ => {
            let ns: i64 = rng.random_range(-4_000_000_000_000_000_000..4_000_000_000_000_000_000);
            Op::Timestamp(ns, rng.random_range(0..10) == 0, "2001-01-01".to_string())
        }
    }
}

fn apply(cb: &mut ColumnBuilder, row: usize, op: &Op) {
    match op {
        Op::Str(s) => cb.write_string(row, s),
        Op::NumberLiteral(s) => cb.write_number_literal(row, s),
        Op::ParsedNumber(v, s) => cb.write_parsed_number(row, *v, s),
        Op::Timestamp(ns, overflow, s) => cb.write_parsed_timestamp(row, *ns, *overflow, s),
        Op::Skip => {}
    }
}

#[test]
fn length_never_decreases_and_states_form_a_dag() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    for _ in 0..200 {
        let mut cb = ColumnBuilder::new("c");
        let mut prev_len = 0;
        let mut states: Vec<Dtype> = Vec::new();
        let mut row = 0;
        for _ in 0..rng.random_range(1..40) {
            let op = if rng.random_range(0..4) == 0 {
                Op::Skip
            } else {
                random_op(&mut rng)
            };
            let wrote = !matches!(op, Op::Skip);
            apply(&mut cb, row, &op);
            assert!(cb.len() >= prev_len, "length decreased");
            prev_len = cb.len();
            if wrote && states.last() != Some(&cb.dtype()) {
                // Once STRING, always STRING.
                assert_ne!(states.last(), Some(&Dtype::String));
                states.push(cb.dtype());
            }
            row += 1;
        }
        // At most one typed detour on the way to the STRING sink: a write
        // sequence never touches more than three distinct states.
        assert!(states.len() <= 3, "visited {states:?}");
    }
}

#[test]
fn string_terminal_columns_reproduce_submitted_bytes() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..100 {
        let mut cb = ColumnBuilder::new("c");
        let n_rows = rng.random_range(1..30);
        let mut expected: Vec<Option<String>> = vec![None; n_rows];
        // The last row is reserved for the sink write below.
        for (row, slot) in expected.iter_mut().enumerate().take(n_rows - 1) {
            if rng.random_range(0..5) == 0 {
                continue;
            }
            let op = random_op(&mut rng);
            apply(&mut cb, row, &op);
            *slot = match op {
                Op::Str(s) => Some(s),
                Op::NumberLiteral(s) | Op::ParsedNumber(_, s) | Op::Timestamp(_, _, s) => Some(s),
                Op::Skip => None,
            };
        }
        // Force the string sink so the text shadow is the output.
        cb.write_string(n_rows - 1, "sink");
        expected[n_rows - 1] = Some("sink".to_string());

        let array = cb.finish(n_rows);
        let strings = array
            .as_any()
            .downcast_ref::<StringArray>()
            .expect("string terminal");
        for (row, want) in expected.iter().enumerate() {
            match want {
                None => assert!(strings.is_null(row), "row {row} should be null"),
                Some(s) => assert_eq!(strings.value(row), s, "row {row}"),
            }
        }
    }
}

#[test]
fn finish_always_yields_exactly_n_rows() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..100 {
        let mut cb = ColumnBuilder::new("c");
        let writes = rng.random_range(0..20);
        for row in 0..writes {
            if rng.random_range(0..3) > 0 {
                apply(&mut cb, row, &random_op(&mut rng));
            }
        }
        let n_rows = writes + rng.random_range(0..10);
        let array = cb.finish(n_rows);
        assert_eq!(array.len(), n_rows);
    }
}

#[test]
fn buffer_views_are_always_valid_utf8() {
    let mut rng = StdRng::seed_from_u64(99);
    let alphabet = ["a", "é", "€", "🎉", "ß", "中"];
    for _ in 0..500 {
        let cap = rng.random_range(0..24);
        let mut buf = StringBuffer::new(cap);
        let mut input = String::new();
        for _ in 0..rng.random_range(0..12) {
            let piece = alphabet[rng.random_range(0..alphabet.len())];
            input.push_str(piece);
            buf.append(piece.as_bytes());
        }
        let view = buf.valid_utf8_view();
        // from_utf8 on the view's bytes must succeed (guaranteed by &str),
        // and the view must be a prefix of the input.
        assert!(input.starts_with(view));
        assert!(view.len() <= cap);
    }
}
