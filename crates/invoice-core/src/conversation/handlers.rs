//! The ordered, state-gated free-text handler chain.
//!
//! ```text
//! ┌──────────────────────┬──────────────────────┬──────────────────────────┐
//! │ Handler              │ Gate (stored state)  │ Declines when            │
//! ├──────────────────────┼──────────────────────┼──────────────────────────┤
//! │ store_info           │ awaiting_store_info  │ never                    │
//! │ product_definition   │ adding_product       │ never                    │
//! │ product_selection    │ selecting_product    │ never                    │
//! │ quantity             │ awaiting_quantity    │ never                    │
//! │ customer_definition  │ adding_customer      │ never                    │
//! │ customer_selection   │ selecting_customer   │ never                    │
//! │ logo_intake          │ awaiting_logo_upload │ never                    │
//! │ quick_item           │ ready                │ text is not Name: Qty-P  │
//! └──────────────────────┴──────────────────────┴──────────────────────────┘
//! ```
//!
//! A handler whose gate holds but whose parse fails still consumes the
//! message and answers with a corrective prompt; the state is left as is.
//! Only `quick_item` shares its state with arbitrary chatter, so it is the
//! only one that declines.

use tracing::{info, warn};

use crate::catalog::{define_customer, define_product, find_customer_by_code, find_customer_by_name};
use crate::error::{CoreError, ValidationError};
use crate::money::Money;
use crate::types::{LineItem, StateTag};

use super::locale::fill;
use super::parse::{
    extract_product_id, parse_customer_code, parse_customer_definition, parse_product_definition,
    parse_quantity, parse_quick_item, parse_store_info,
};
use super::{Machine, Outbound, Reply, Turn};

/// What a handler did with a message.
#[derive(Debug)]
pub enum Outcome {
    /// Not mine; try the next handler.
    Declined,
    Consumed(Reply),
}

/// A (precondition, parser) pair in the chain.
pub struct Handler {
    pub name: &'static str,
    pub state: StateTag,
    pub run: fn(&Machine, &mut Turn<'_>, &str) -> Outcome,
}

impl Handler {
    /// The precondition: the stored state must be this handler's state.
    pub fn accepts(&self, state: StateTag) -> bool {
        self.state == state
    }
}

/// Evaluated top to bottom; the first handler that consumes wins.
pub const CHAIN: &[Handler] = &[
    Handler {
        name: "store_info",
        state: StateTag::AwaitingStoreInfo,
        run: store_info,
    },
    Handler {
        name: "product_definition",
        state: StateTag::AddingProduct,
        run: product_definition,
    },
    Handler {
        name: "product_selection",
        state: StateTag::SelectingProduct,
        run: product_selection,
    },
    Handler {
        name: "quantity",
        state: StateTag::AwaitingQuantity,
        run: quantity,
    },
    Handler {
        name: "customer_definition",
        state: StateTag::AddingCustomer,
        run: customer_definition,
    },
    Handler {
        name: "customer_selection",
        state: StateTag::SelectingCustomer,
        run: customer_selection,
    },
    Handler {
        name: "logo_intake",
        state: StateTag::AwaitingLogoUpload,
        run: logo_intake,
    },
    Handler {
        name: "quick_item",
        state: StateTag::Ready,
        run: quick_item,
    },
];

fn corrective(m: &Machine, turn: &Turn<'_>, err: &ValidationError, format: &str) -> Outcome {
    warn!(user_id = %turn.user_id, state = %turn.record.state, error = %err, "Malformed input");
    Outcome::Consumed(m.corrective(err, format))
}

fn rejected(m: &Machine, turn: &Turn<'_>, err: CoreError) -> Outcome {
    warn!(user_id = %turn.user_id, state = %turn.record.state, error = %err, "Request rejected");
    Outcome::Consumed(Reply::message(Outbound::text(m.error_message(&err))))
}

// =============================================================================
// Handlers
// =============================================================================

fn store_info(m: &Machine, turn: &mut Turn<'_>, text: &str) -> Outcome {
    let (store, seller) = match parse_store_info(text) {
        Ok(parsed) => parsed,
        Err(e) => return corrective(m, turn, &e, &m.prompts().store_info_format),
    };

    info!(user_id = %turn.user_id, store = %store, seller = %seller, "Store info saved");
    turn.record.store_name = Some(store);
    turn.record.seller_name = Some(seller);
    turn.record.state = StateTag::Ready;

    let reply = Reply::message(Outbound::text(&m.prompts().store_info_saved));
    Outcome::Consumed(reply.push(Outbound::with_keyboard(&m.prompts().choose, m.main_menu())))
}

fn product_definition(m: &Machine, turn: &mut Turn<'_>, text: &str) -> Outcome {
    let format = &m.prompts().product_format;
    let product = match parse_product_definition(text)
        .and_then(|(name, price)| define_product(turn.record, turn.user_id, &name, price))
    {
        Ok(product) => product,
        Err(e) => return corrective(m, turn, &e, format),
    };

    info!(user_id = %turn.user_id, product_id = %product.id, "Product added");
    turn.record.state = StateTag::Ready;
    Outcome::Consumed(m.menu_reply(fill(
        &m.prompts().product_added,
        &[
            ("name", &product.name),
            ("id", &product.id),
            ("price", &product.unit_price.to_string()),
        ],
    )))
}

fn product_selection(m: &Machine, turn: &mut Turn<'_>, text: &str) -> Outcome {
    let Some(id) = extract_product_id(text) else {
        let err = ValidationError::invalid_format("product", "missing (ID: ...)");
        return corrective(m, turn, &err, &m.prompts().product_pick_format);
    };

    let Some(product) = turn.record.products.get(id) else {
        return rejected(m, turn, CoreError::ProductNotFound(id.to_string()));
    };
    let name = product.name.clone();

    turn.cart.stage_product(id);
    turn.record.state = StateTag::AwaitingQuantity;
    Outcome::Consumed(Reply::message(Outbound::text(fill(
        &m.prompts().enter_quantity,
        &[("name", &name)],
    ))))
}

fn quantity(m: &Machine, turn: &mut Turn<'_>, text: &str) -> Outcome {
    let quantity = match parse_quantity(text) {
        Ok(q) => q,
        Err(e) => return corrective(m, turn, &e, &m.prompts().quantity_format),
    };

    let Some(product_id) = turn.cart.staged_product().map(str::to_string) else {
        return rejected(m, turn, CoreError::NoProductStaged);
    };
    let Some(product) = turn.record.products.get(&product_id) else {
        return rejected(m, turn, CoreError::ProductNotFound(product_id));
    };

    let item = LineItem::from_product(product, quantity);
    if let Err(e) = turn.cart.add_line(item.clone()) {
        return corrective(m, turn, &e, &m.prompts().quantity_format);
    }
    turn.cart.clear_staged();
    turn.record.state = StateTag::Ready;

    info!(user_id = %turn.user_id, product_id = %product_id, quantity, "Line item added");
    Outcome::Consumed(m.menu_reply(fill(
        &m.prompts().item_added,
        &[("quantity", &quantity.to_string()), ("name", &item.name)],
    )))
}

fn customer_definition(m: &Machine, turn: &mut Turn<'_>, text: &str) -> Outcome {
    let format = &m.prompts().customer_format;
    let customer = match parse_customer_definition(text).and_then(|f| {
        define_customer(turn.record, &f.name, &f.phone, &f.address, &f.code)
    }) {
        Ok(customer) => customer,
        Err(e) => return corrective(m, turn, &e, format),
    };

    info!(user_id = %turn.user_id, code = %customer.code, "Customer saved");
    turn.record.state = StateTag::Ready;
    Outcome::Consumed(m.menu_reply(fill(
        &m.prompts().customer_saved,
        &[("name", &customer.name), ("code", &customer.code)],
    )))
}

fn customer_selection(m: &Machine, turn: &mut Turn<'_>, text: &str) -> Outcome {
    let found = find_customer_by_name(turn.record, text).or_else(|| {
        parse_customer_code(text).and_then(|code| find_customer_by_code(turn.record, &code))
    });
    let Some(customer) = found.cloned() else {
        return rejected(m, turn, CoreError::CustomerNotFound(text.to_string()));
    };

    info!(user_id = %turn.user_id, code = %customer.code, "Customer selected");
    let reply = m.menu_reply(fill(&m.prompts().customer_selected, &[("name", &customer.name)]));
    turn.cart.select_customer(customer);
    turn.record.state = StateTag::Ready;
    Outcome::Consumed(reply)
}

fn logo_intake(m: &Machine, _turn: &mut Turn<'_>, _text: &str) -> Outcome {
    Outcome::Consumed(Reply::message(Outbound::text(&m.prompts().logo_expected)))
}

fn quick_item(m: &Machine, turn: &mut Turn<'_>, text: &str) -> Outcome {
    let item = match parse_quick_item(text) {
        None => return Outcome::Declined,
        Some(Err(e)) => return corrective(m, turn, &e, &m.prompts().quick_item_format),
        Some(Ok(item)) => item,
    };

    let line = LineItem {
        name: item.name,
        quantity: item.quantity,
        unit_price: Money::from_minor(item.unit_price),
    };
    if let Err(e) = turn.cart.add_line(line.clone()) {
        return corrective(m, turn, &e, &m.prompts().quick_item_format);
    }

    info!(user_id = %turn.user_id, name = %line.name, quantity = line.quantity, "Quick item added");
    Outcome::Consumed(Reply::message(Outbound::text(fill(
        &m.prompts().quick_item_added,
        &[
            ("name", &line.name),
            ("quantity", &line.quantity.to_string()),
            ("price", &line.unit_price.to_string()),
        ],
    ))))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::DisplayCalendar;
    use crate::cart::Cart;
    use crate::conversation::Locale;
    use crate::types::{FeeMultiplier, UserId, UserRecord};
    use chrono::NaiveDate;

    fn machine() -> Machine {
        Machine::new(Locale::default(), FeeMultiplier::default(), DisplayCalendar::Gregorian)
    }

    #[test]
    fn test_at_most_one_handler_per_state() {
        for state in StateTag::ALL {
            let count = CHAIN.iter().filter(|h| h.accepts(state)).count();
            assert_eq!(count, 1, "state {} has {} handlers", state, count);
        }
    }

    #[test]
    fn test_chain_order_is_stable() {
        let names: Vec<&str> = CHAIN.iter().map(|h| h.name).collect();
        assert_eq!(
            names,
            [
                "store_info",
                "product_definition",
                "product_selection",
                "quantity",
                "customer_definition",
                "customer_selection",
                "logo_intake",
                "quick_item",
            ]
        );
    }

    #[test]
    fn test_gated_handlers_ignore_other_states() {
        // Text that every free-text parser could read, sent in each state
        // other than the handler's own: the chain must not reach it.
        let m = machine();
        let user_id = UserId::from("501");
        let now = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();

        for handler in CHAIN {
            for state in StateTag::ALL.into_iter().filter(|s| !handler.accepts(*s)) {
                let mut record = UserRecord {
                    phone_number: Some("0912".to_string()),
                    state,
                    ..UserRecord::default()
                };
                let before = record.clone();
                let mut cart = Cart::new();
                let mut turn = Turn {
                    user_id: &user_id,
                    record: &mut record,
                    cart: &mut cart,
                    now,
                };

                let accepted: Vec<&Handler> = CHAIN
                    .iter()
                    .filter(|h| h.accepts(turn.record.state))
                    .collect();
                assert!(accepted.iter().all(|h| h.name != handler.name));

                // Route through the machine to be sure nothing else changed.
                m.handle(&mut turn, crate::conversation::Inbound::Text("Ali-5000".to_string()));
                if state != StateTag::AddingProduct {
                    assert!(record.products.is_empty(), "state {}", state);
                    assert_eq!(record.last_product_sequence, before.last_product_sequence);
                }
            }
        }
    }

    #[test]
    fn test_quick_item_declines_other_text() {
        let m = machine();
        let user_id = UserId::from("501");
        let mut record = UserRecord::default();
        let mut cart = Cart::new();
        let mut turn = Turn {
            user_id: &user_id,
            record: &mut record,
            cart: &mut cart,
            now: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        };

        assert!(matches!(quick_item(&m, &mut turn, "good morning"), Outcome::Declined));
        assert!(matches!(
            quick_item(&m, &mut turn, "Nozzle: 3 - 250"),
            Outcome::Consumed(_)
        ));
        assert_eq!(turn.cart.item_count(), 1);
    }

    #[test]
    fn test_quantity_without_staged_product_is_rejected() {
        let m = machine();
        let user_id = UserId::from("501");
        let mut record = UserRecord {
            state: StateTag::AwaitingQuantity,
            ..UserRecord::default()
        };
        let mut cart = Cart::new();
        let mut turn = Turn {
            user_id: &user_id,
            record: &mut record,
            cart: &mut cart,
            now: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        };

        let outcome = quantity(&m, &mut turn, "Q2");
        assert!(matches!(outcome, Outcome::Consumed(_)));
        assert_eq!(turn.record.state, StateTag::AwaitingQuantity);
        assert!(turn.cart.is_empty());
    }
}
