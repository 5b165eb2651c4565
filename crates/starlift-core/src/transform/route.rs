//! Row routing: every raw record lands in exactly one class.

use crate::record::RawRecord;

/// Invoice prefix marking a cancelled (reversed) sale.
pub const CANCELLATION_MARKER: char = 'C';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowClass {
    /// Valid sale: not cancelled, positive quantity, positive price.
    Sale,
    /// Cancellation-marked invoice or negative quantity.
    Return,
    /// Neither: e.g. a zero-price, non-cancellation row with positive
    /// quantity. Silently excluded from both fact tables. Deliberate;
    /// flagged to stakeholders rather than rerouted here.
    Dropped,
}

/// Classify one record. A null invoice, quantity, or price fails every
/// sale test — the not-a-cancellation check included — so rows missing
/// any of those fields route to [`RowClass::Dropped`] unless the return
/// tests already caught them.
pub fn classify(record: &RawRecord) -> RowClass {
    let cancelled = record
        .invoice_no
        .as_deref()
        .is_some_and(|inv| inv.starts_with(CANCELLATION_MARKER));
    let negative_quantity = record.quantity.is_some_and(|q| q < 0);
    if cancelled || negative_quantity {
        return RowClass::Return;
    }

    let not_cancelled = record
        .invoice_no
        .as_deref()
        .is_some_and(|inv| !inv.starts_with(CANCELLATION_MARKER));
    let positive_quantity = record.quantity.is_some_and(|q| q > 0);
    let positive_price = record.unit_price.is_some_and(|p| p > 0.0);
    if not_cancelled && positive_quantity && positive_price {
        RowClass::Sale
    } else {
        RowClass::Dropped
    }
}
