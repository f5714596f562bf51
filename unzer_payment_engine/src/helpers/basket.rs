use unzer_tools::data_objects::{BasketData, BasketItem};
use upg_common::Amount;

use crate::db_types::{Checkout, CheckoutLine, PaymentSession};

/// Builds the gateway basket for a payment session from the checkout it came from.
///
/// The basket total is the session amount, since that is what the buyer is charged, whatever the checkout snapshot
/// says.
pub fn basket_for_checkout(session: &PaymentSession, checkout: &Checkout) -> BasketData {
    BasketData {
        total_value_gross: session.amount,
        currency_code: session.currency.clone(),
        order_id: session.id.clone(),
        basket_items: checkout.lines.iter().map(basket_item).collect(),
    }
}

fn basket_item(line: &CheckoutLine) -> BasketItem {
    let discount: Amount = line.discount_allocations.iter().map(|d| d.amount).sum();
    let vat = line.tax_lines.first().and_then(|t| Amount::try_from(t.rate * 100.0).ok()).unwrap_or_default();
    BasketItem {
        basket_item_reference_id: line.key.clone(),
        quantity: line.quantity,
        vat,
        amount_discount_per_unit_gross: discount.per_unit(line.quantity),
        amount_per_unit_gross: line.variant_price,
        title: line.title.clone(),
    }
}
