use position_ledger::domain::Position;
use rust_decimal::Decimal;

pub fn assert_decimal_near(actual: Decimal, expected: Decimal, tolerance: Decimal) {
    let diff = (actual - expected).abs();
    assert!(
        diff <= tolerance,
        "expected {} ± {}, got {}",
        expected,
        tolerance,
        actual
    );
}

/// Checks the invariants every stored position must hold.
pub fn assert_position_sane(position: &Position) {
    assert!(
        position.quantity() >= Decimal::ZERO,
        "negative quantity on {}: {}",
        position.id(),
        position.quantity()
    );
    if position.status().is_closed() {
        assert_eq!(position.quantity(), Decimal::ZERO, "closed position holds quantity");
        assert!(position.closed_at().is_some(), "closed position has no close time");
    }
}
