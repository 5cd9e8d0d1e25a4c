//! # Conversation State Machine
//!
//! Interprets one inbound chat message against the user's stored
//! [`StateTag`] and produces replies, record/cart mutations and at most one
//! side effect for the runtime to execute.
//!
//! ## Dispatch Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Inbound                                                                │
//! │     │                                                                   │
//! │     ├── contact shared ─────────────► store phone, awaiting_store_info  │
//! │     │                                                                   │
//! │     ├── no phone yet ───────────────► "share your phone" (not stored)   │
//! │     │                                                                   │
//! │     ├── /start ─────────────────────► greeting + main menu              │
//! │     │                                                                   │
//! │     ├── photo ──────────────────────► awaiting_logo_upload? StoreLogo   │
//! │     │                                                                   │
//! │     └── text                                                            │
//! │           ├── exact command keyword ► command (any state)               │
//! │           ├── handler chain ────────► first handler whose state gate    │
//! │           │                           holds and that does not decline   │
//! │           └── nobody took it ───────► "unrecognized", state unchanged   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The machine does no I/O. Logo persistence and invoice rendering are
//! returned as an [`Effect`]; the runtime performs them after the record
//! update has been committed.

pub mod handlers;
pub mod locale;
pub mod parse;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::calendar::DisplayCalendar;
use crate::cart::Cart;
use crate::catalog::{customers_by_name, products_in_order};
use crate::error::{CoreError, ValidationError};
use crate::invoice::{compute_invoice, Invoice, InvoiceRequest};
use crate::types::{FeeMultiplier, StateTag, UserId, UserRecord};

pub use handlers::{Handler, Outcome, CHAIN};
pub use locale::{fill, Command, Keywords, Locale, Prompts};

// =============================================================================
// Messages
// =============================================================================

/// An inbound chat message, already stripped of transport details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// The `/start` command.
    Start,
    Text(String),
    /// The user shared their own contact card.
    Contact { phone_number: String },
    /// Raw bytes of the largest photo size.
    Photo(Vec<u8>),
}

/// A reply-keyboard button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub label: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub request_contact: bool,
}

impl Button {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            request_contact: false,
        }
    }
}

/// A reply keyboard: rows of buttons.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyboard {
    pub rows: Vec<Vec<Button>>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub one_time: bool,
}

/// Something to send back to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outbound {
    Text {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        keyboard: Option<Keyboard>,
    },
    /// A rendered invoice file.
    Document { path: String, caption: String },
}

impl Outbound {
    pub fn text(text: impl Into<String>) -> Self {
        Outbound::Text {
            text: text.into(),
            keyboard: None,
        }
    }

    pub fn with_keyboard(text: impl Into<String>, keyboard: Keyboard) -> Self {
        Outbound::Text {
            text: text.into(),
            keyboard: Some(keyboard),
        }
    }
}

/// Work the runtime must perform after the record update commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Decode, re-encode and persist a logo.
    StoreLogo(Vec<u8>),
    /// Render, archive and deliver the invoice, then clear the cart.
    IssueInvoice(Box<Invoice>),
}

/// Result of handling one inbound message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply {
    pub messages: Vec<Outbound>,
    pub effect: Option<Effect>,
}

impl Reply {
    pub fn message(message: Outbound) -> Self {
        Self {
            messages: vec![message],
            effect: None,
        }
    }

    pub fn push(mut self, message: Outbound) -> Self {
        self.messages.push(message);
        self
    }
}

/// Mutable context for one message.
pub struct Turn<'a> {
    pub user_id: &'a UserId,
    pub record: &'a mut UserRecord,
    pub cart: &'a mut Cart,
    /// Local wall-clock time, used for invoice numbers and dates.
    pub now: NaiveDateTime,
}

// =============================================================================
// Machine
// =============================================================================

/// The conversation protocol, parameterized by locale and pricing settings.
#[derive(Debug, Clone)]
pub struct Machine {
    locale: Locale,
    fee: FeeMultiplier,
    calendar: DisplayCalendar,
}

impl Machine {
    pub fn new(locale: Locale, fee: FeeMultiplier, calendar: DisplayCalendar) -> Self {
        Self {
            locale,
            fee,
            calendar,
        }
    }

    pub fn locale(&self) -> &Locale {
        &self.locale
    }

    pub fn prompts(&self) -> &Prompts {
        &self.locale.prompts
    }

    /// Handles one message. Never fails: every error becomes a reply.
    pub fn handle(&self, turn: &mut Turn<'_>, inbound: Inbound) -> Reply {
        let before = turn.record.state;
        debug!(user_id = %turn.user_id, state = %before, "Handling message");

        let reply = self.dispatch(turn, inbound);

        let after = turn.record.state;
        if after != before {
            info!(user_id = %turn.user_id, from = %before, to = %after, "State transition");
        }
        reply
    }

    fn dispatch(&self, turn: &mut Turn<'_>, inbound: Inbound) -> Reply {
        let text = match inbound {
            Inbound::Contact { phone_number } => return self.on_contact(turn, &phone_number),
            _ if !turn.record.is_onboarded() => return self.request_phone(),
            Inbound::Start => return self.on_start(turn),
            Inbound::Photo(bytes) => return self.on_photo(turn, bytes),
            Inbound::Text(text) => text,
        };

        if let Some(command) = self.locale.keywords.resolve(&text) {
            debug!(user_id = %turn.user_id, ?command, "Command keyword");
            return self.run_command(turn, command);
        }

        for handler in CHAIN {
            if !handler.accepts(turn.record.state) {
                continue;
            }
            match (handler.run)(self, turn, text.trim()) {
                Outcome::Consumed(reply) => {
                    debug!(user_id = %turn.user_id, handler = handler.name, "Handler consumed message");
                    return reply;
                }
                Outcome::Declined => continue,
            }
        }

        debug!(user_id = %turn.user_id, state = %turn.record.state, "No handler accepted message");
        Reply::message(Outbound::text(&self.prompts().unrecognized))
    }

    // -------------------------------------------------------------------------
    // Onboarding
    // -------------------------------------------------------------------------

    fn request_phone(&self) -> Reply {
        let keyboard = Keyboard {
            rows: vec![vec![Button {
                label: self.prompts().share_phone_button.clone(),
                request_contact: true,
            }]],
            one_time: true,
        };
        Reply::message(Outbound::with_keyboard(&self.prompts().share_phone, keyboard))
    }

    fn on_contact(&self, turn: &mut Turn<'_>, phone_number: &str) -> Reply {
        let phone_number = phone_number.trim();
        if phone_number.is_empty() {
            warn!(user_id = %turn.user_id, "Contact without phone number");
            return self.request_phone();
        }

        turn.record.phone_number = Some(phone_number.to_string());
        turn.record.state = StateTag::AwaitingStoreInfo;
        Reply::message(Outbound::text(self.store_info_request()))
    }

    fn store_info_request(&self) -> String {
        let p = self.prompts();
        fill(&p.phone_saved, &[("format", &p.store_info_format)])
    }

    fn on_start(&self, turn: &mut Turn<'_>) -> Reply {
        if turn.record.state == StateTag::AwaitingStoreInfo {
            return Reply::message(Outbound::text(self.store_info_request()));
        }
        Reply::message(Outbound::with_keyboard(&self.prompts().greeting, self.main_menu()))
    }

    fn on_photo(&self, turn: &mut Turn<'_>, bytes: Vec<u8>) -> Reply {
        if turn.record.state != StateTag::AwaitingLogoUpload {
            debug!(user_id = %turn.user_id, state = %turn.record.state, "Photo outside logo upload");
            return Reply::message(Outbound::text(&self.prompts().unrecognized));
        }

        // Success or failure, the user is back at the menu afterwards.
        turn.record.state = StateTag::Ready;
        Reply {
            messages: Vec::new(),
            effect: Some(Effect::StoreLogo(bytes)),
        }
    }

    // -------------------------------------------------------------------------
    // Commands
    // -------------------------------------------------------------------------

    fn run_command(&self, turn: &mut Turn<'_>, command: Command) -> Reply {
        let p = self.prompts();
        let keywords = &self.locale.keywords;

        match command {
            Command::AddProduct => {
                turn.record.state = StateTag::AddingProduct;
                Reply::message(Outbound::text(fill(
                    &p.add_product,
                    &[("format", &p.product_format)],
                )))
            }
            Command::AddCustomer => {
                turn.record.state = StateTag::AddingCustomer;
                Reply::message(Outbound::text(fill(
                    &p.add_customer,
                    &[("format", &p.customer_format)],
                )))
            }
            Command::UploadLogo => {
                turn.record.state = StateTag::AwaitingLogoUpload;
                Reply::message(Outbound::text(&p.upload_logo))
            }
            Command::ViewProducts => {
                turn.record.state = StateTag::Ready;
                let products = products_in_order(turn.record);
                if products.is_empty() {
                    return self.menu_reply(fill(
                        &p.no_products,
                        &[("command", &keywords.add_product)],
                    ));
                }
                let mut text = p.product_list_header.clone();
                for product in products {
                    text.push_str(&format!(
                        "\n{} - {} (ID: {})",
                        product.name, product.unit_price, product.id
                    ));
                }
                self.menu_reply(text)
            }
            Command::ViewCustomers => {
                turn.record.state = StateTag::Ready;
                let customers = customers_by_name(turn.record);
                if customers.is_empty() {
                    return self.menu_reply(fill(
                        &p.no_customers,
                        &[("command", &keywords.add_customer)],
                    ));
                }
                let mut text = p.customer_list_header.clone();
                for c in customers {
                    text.push_str(&format!(
                        "\n{} - {} - {} (C{})",
                        c.name, c.phone, c.address, c.code
                    ));
                }
                self.menu_reply(text)
            }
            Command::AddItem => {
                turn.cart.clear_staged();
                let products = products_in_order(turn.record);
                if products.is_empty() {
                    turn.record.state = StateTag::Ready;
                    return self.menu_reply(fill(
                        &p.no_products,
                        &[("command", &keywords.add_product)],
                    ));
                }
                let rows = products
                    .iter()
                    .map(|product| {
                        vec![Button::new(format!(
                            "{} - {} (ID: {})",
                            product.name, product.unit_price, product.id
                        ))]
                    })
                    .collect();
                turn.record.state = StateTag::SelectingProduct;
                Reply::message(Outbound::with_keyboard(
                    &p.choose_product,
                    Keyboard {
                        rows,
                        one_time: true,
                    },
                ))
            }
            Command::SelectCustomer => {
                let customers = customers_by_name(turn.record);
                if customers.is_empty() {
                    turn.record.state = StateTag::Ready;
                    return self.menu_reply(fill(
                        &p.no_customers,
                        &[("command", &keywords.add_customer)],
                    ));
                }
                let rows = customers
                    .iter()
                    .map(|c| vec![Button::new(c.name.clone())])
                    .collect();
                turn.record.state = StateTag::SelectingCustomer;
                Reply::message(Outbound::with_keyboard(
                    &p.choose_customer,
                    Keyboard {
                        rows,
                        one_time: true,
                    },
                ))
            }
            Command::IssueInvoice => self.issue_invoice(turn),
        }
    }

    fn issue_invoice(&self, turn: &mut Turn<'_>) -> Reply {
        let seller = turn.record.seller();
        let request = InvoiceRequest {
            lines: &turn.cart.line_items,
            fee: self.fee,
            customer: turn.cart.selected_customer.as_ref(),
            seller: &seller,
            user_id: turn.user_id,
            now: turn.now,
            calendar: self.calendar,
        };

        match compute_invoice(request) {
            Ok(invoice) => {
                turn.record.state = StateTag::Ready;
                info!(
                    user_id = %turn.user_id,
                    number = %invoice.number,
                    lines = invoice.lines.len(),
                    grand_total = invoice.grand_total.minor(),
                    "Invoice computed"
                );
                Reply {
                    messages: Vec::new(),
                    effect: Some(Effect::IssueInvoice(Box::new(invoice))),
                }
            }
            Err(err) => {
                warn!(user_id = %turn.user_id, error = %err, "Invoice rejected");
                self.menu_reply(self.error_message(&err))
            }
        }
    }

    // -------------------------------------------------------------------------
    // Shared replies
    // -------------------------------------------------------------------------

    /// The main menu reply keyboard.
    pub fn main_menu(&self) -> Keyboard {
        let k = &self.locale.keywords;
        let pairs = [
            (&k.add_item, &k.issue_invoice),
            (&k.add_product, &k.view_products),
            (&k.add_customer, &k.view_customers),
            (&k.select_customer, &k.upload_logo),
        ];
        Keyboard {
            rows: pairs
                .into_iter()
                .map(|(a, b)| vec![Button::new(a.clone()), Button::new(b.clone())])
                .collect(),
            one_time: false,
        }
    }

    /// A text reply carrying the main menu.
    pub fn menu_reply(&self, text: impl Into<String>) -> Reply {
        Reply::message(Outbound::with_keyboard(text, self.main_menu()))
    }

    /// Corrective prompt for malformed input: the error plus the expected format.
    pub fn corrective(&self, err: &ValidationError, format: &str) -> Reply {
        Reply::message(Outbound::text(fill(
            &self.prompts().invalid_input,
            &[("error", &err.to_string()), ("format", format)],
        )))
    }

    /// User-facing text for a core error.
    pub fn error_message(&self, err: &CoreError) -> String {
        let p = self.prompts();
        match err {
            CoreError::ProductNotFound(id) => fill(&p.product_not_found, &[("id", id)]),
            CoreError::CustomerNotFound(query) => {
                fill(&p.customer_not_found, &[("query", query)])
            }
            CoreError::EmptyCart => p.empty_cart.clone(),
            CoreError::NoCustomerSelected => p.no_customer_selected.clone(),
            CoreError::NoProductStaged => fill(
                &p.no_product_staged,
                &[("command", &self.locale.keywords.add_item)],
            ),
            CoreError::Validation(e) => e.to_string(),
            CoreError::AmountOverflow { .. } => p.unavailable.clone(),
        }
    }

    /// Reply after the logo was stored.
    pub fn logo_saved_reply(&self) -> Reply {
        self.menu_reply(&self.prompts().logo_saved)
    }

    /// Reply when the logo could not be decoded or stored.
    pub fn logo_failed_reply(&self, cause: &str) -> Reply {
        self.menu_reply(fill(&self.prompts().logo_failed, &[("error", cause)]))
    }

    /// Caption sent with the rendered invoice.
    pub fn invoice_caption(&self, invoice: &Invoice) -> String {
        fill(
            &self.prompts().invoice_issued,
            &[
                ("number", &invoice.number),
                ("total", &invoice.grand_total.to_string()),
            ],
        )
    }

    /// Generic degraded reply for unexpected failures.
    pub fn unavailable_reply(&self) -> Reply {
        Reply::message(Outbound::text(&self.prompts().unavailable))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
