use proptest::prelude::*;

use super::*;

#[test]
fn new_orders_endpoints() {
	let r = Range::new(Position::new(3, 1), Position::new(1, 4));
	assert_eq!(r.start, Position::new(1, 4));
	assert_eq!(r.end, Position::new(3, 1));
}

#[test]
fn contains_is_inclusive_on_both_ends() {
	let r = Range::on_line(2, 4, 8);
	assert!(r.contains(Position::new(2, 4)));
	assert!(r.contains(Position::new(2, 8)));
	assert!(!r.contains(Position::new(2, 9)));
	assert!(!r.contains(Position::new(1, 5)));
}

#[test]
fn multi_line_contains_middle_lines_at_any_column() {
	let r = Range::new(Position::new(1, 10), Position::new(3, 0));
	assert!(r.contains(Position::new(2, 500)));
	assert!(!r.contains(Position::new(3, 1)));
}

#[test]
fn lines_range_is_anchored_at_column_zero() {
	let r = Range::lines(4, 6);
	assert_eq!(r.start, Position::line_start(4));
	assert_eq!(r.end, Position::line_start(6));
	assert_eq!(r.line_span().collect::<Vec<_>>(), vec![4, 5, 6]);
}

proptest! {
	#[test]
	fn endpoints_always_ordered(l1 in 0usize..100, c1 in 0usize..100, l2 in 0usize..100, c2 in 0usize..100) {
		let r = Range::new(Position::new(l1, c1), Position::new(l2, c2));
		prop_assert!(r.start <= r.end);
		prop_assert!(r.contains(r.start) && r.contains(r.end));
	}
}
