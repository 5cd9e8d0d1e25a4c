//! Keywords, prompts and document labels.
//!
//! Every struct here is `#[serde(default)]`, so a locale file only has to
//! list the strings it translates. English is compiled in; the bot ships a
//! Persian file (`locales/fa.toml`).

use serde::{Deserialize, Serialize};

use crate::layout::DocumentLabels;

// =============================================================================
// Commands
// =============================================================================

/// The eight command keywords. Recognized in every state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    AddProduct,
    ViewProducts,
    AddItem,
    IssueInvoice,
    AddCustomer,
    ViewCustomers,
    SelectCustomer,
    UploadLogo,
}

impl Command {
    pub const ALL: [Command; 8] = [
        Command::AddProduct,
        Command::ViewProducts,
        Command::AddItem,
        Command::IssueInvoice,
        Command::AddCustomer,
        Command::ViewCustomers,
        Command::SelectCustomer,
        Command::UploadLogo,
    ];
}

/// Exact-match command keywords.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Keywords {
    pub add_product: String,
    pub view_products: String,
    pub add_item: String,
    pub issue_invoice: String,
    pub add_customer: String,
    pub view_customers: String,
    pub select_customer: String,
    pub upload_logo: String,
}

impl Default for Keywords {
    fn default() -> Self {
        Self {
            add_product: "add product".to_string(),
            view_products: "view products".to_string(),
            add_item: "add item".to_string(),
            issue_invoice: "issue invoice".to_string(),
            add_customer: "add customer".to_string(),
            view_customers: "view customers".to_string(),
            select_customer: "select customer".to_string(),
            upload_logo: "upload logo".to_string(),
        }
    }
}

impl Keywords {
    /// Keyword text for `command`.
    pub fn keyword(&self, command: Command) -> &str {
        match command {
            Command::AddProduct => &self.add_product,
            Command::ViewProducts => &self.view_products,
            Command::AddItem => &self.add_item,
            Command::IssueInvoice => &self.issue_invoice,
            Command::AddCustomer => &self.add_customer,
            Command::ViewCustomers => &self.view_customers,
            Command::SelectCustomer => &self.select_customer,
            Command::UploadLogo => &self.upload_logo,
        }
    }

    /// Resolves a message to a command. Surrounding whitespace is ignored,
    /// everything else must match exactly.
    pub fn resolve(&self, text: &str) -> Option<Command> {
        let text = text.trim();
        Command::ALL
            .into_iter()
            .find(|command| self.keyword(*command) == text)
    }
}

// =============================================================================
// Prompts
// =============================================================================

/// Reply texts. `{placeholder}` markers are filled by [`fill`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Prompts {
    pub greeting: String,
    pub share_phone: String,
    pub share_phone_button: String,
    pub phone_saved: String,
    pub store_info_format: String,
    pub store_info_saved: String,
    pub choose: String,

    pub add_product: String,
    pub product_format: String,
    pub product_added: String,
    pub no_products: String,
    pub product_list_header: String,
    pub choose_product: String,
    pub product_pick_format: String,
    pub product_not_found: String,

    pub enter_quantity: String,
    pub quantity_format: String,
    pub no_product_staged: String,
    pub item_added: String,
    pub quick_item_format: String,
    pub quick_item_added: String,

    pub add_customer: String,
    pub customer_format: String,
    pub customer_saved: String,
    pub no_customers: String,
    pub customer_list_header: String,
    pub choose_customer: String,
    pub customer_not_found: String,
    pub customer_selected: String,

    pub upload_logo: String,
    pub logo_expected: String,
    pub logo_saved: String,
    pub logo_failed: String,

    pub empty_cart: String,
    pub no_customer_selected: String,
    pub invoice_issued: String,

    pub invalid_input: String,
    pub unrecognized: String,
    pub unavailable: String,
}

impl Default for Prompts {
    fn default() -> Self {
        Self {
            greeting: "Hello! Please choose an option:".to_string(),
            share_phone: "Please share your phone number:".to_string(),
            share_phone_button: "Share phone number".to_string(),
            phone_saved: "Your phone number was saved. Please enter your store and seller names like this:\n\n{format}".to_string(),
            store_info_format: "Store: store name - Seller: seller name".to_string(),
            store_info_saved: "Your store information was saved.".to_string(),
            choose: "Please choose:".to_string(),

            add_product: "Send the new product like this:\n{format}".to_string(),
            product_format: "Name-Price".to_string(),
            product_added: "Product {name} saved with ID {id} and price {price}.".to_string(),
            no_products: "You have no products yet. Use \"{command}\" first.".to_string(),
            product_list_header: "Your products:".to_string(),
            choose_product: "Choose a product:".to_string(),
            product_pick_format: "a product button from the keyboard".to_string(),
            product_not_found: "There is no product with ID {id}.".to_string(),

            enter_quantity: "How many {name}? Reply like Q3.".to_string(),
            quantity_format: "Q followed by a number, for example Q3".to_string(),
            no_product_staged: "Choose a product first with \"{command}\".".to_string(),
            item_added: "{quantity} × {name} added to the invoice.".to_string(),
            quick_item_format: "Name: Quantity - Unit price".to_string(),
            quick_item_added: "Item {name} with quantity {quantity} and unit price {price} added to the invoice.".to_string(),

            add_customer: "Send the customer like this:\n{format}".to_string(),
            customer_format: "Name - Phone - Address - Code".to_string(),
            customer_saved: "Customer {name} saved with code {code}.".to_string(),
            no_customers: "You have no customers yet. Use \"{command}\" first.".to_string(),
            customer_list_header: "Your customers:".to_string(),
            choose_customer: "Choose a customer:".to_string(),
            customer_not_found: "No customer matches {query}.".to_string(),
            customer_selected: "Customer {name} selected.".to_string(),

            upload_logo: "Send your logo as a photo.".to_string(),
            logo_expected: "Please send the logo as a photo.".to_string(),
            logo_saved: "Your logo was saved.".to_string(),
            logo_failed: "The logo could not be processed: {error}".to_string(),

            empty_cart: "There are no items to invoice.".to_string(),
            no_customer_selected: "Select a customer before issuing the invoice.".to_string(),
            invoice_issued: "Invoice {number} issued. Total: {total}".to_string(),

            invalid_input: "{error}. Please use this format:\n{format}".to_string(),
            unrecognized: "Sorry, I did not understand that. Please choose from the menu.".to_string(),
            unavailable: "Cannot process this input right now. Please try again later.".to_string(),
        }
    }
}

/// Replaces each `{key}` in `template` with its value.
///
/// The template is scanned once, so braces inside substituted values are
/// copied as-is.
///
/// ## Example
/// ```rust
/// use invoice_core::conversation::locale::fill;
///
/// assert_eq!(fill("{n} × {name}", &[("n", "2"), ("name", "Widget")]), "2 × Widget");
/// ```
pub fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let value = after.find('}').and_then(|close| {
            let key = &after[..close];
            values
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| (*v, close))
        });
        match value {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

// =============================================================================
// Locale
// =============================================================================

/// Everything user-visible, in one language.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Locale {
    pub keywords: Keywords,
    pub prompts: Prompts,
    pub labels: DocumentLabels,
}
