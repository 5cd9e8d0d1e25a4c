//! # Seed Data Generator
//!
//! Creates an onboarded demo user with a small catalog and address book, so
//! the bot can be driven straight to "issue invoice" during development.
//!
//! ## Usage
//! ```bash
//! # Seed user 1000 (default)
//! cargo run -p invoice-db --bin seed
//!
//! # Seed a different chat user
//! cargo run -p invoice-db --bin seed -- --user 501
//!
//! # Specify database path
//! cargo run -p invoice-db --bin seed -- --db ./data/invoice-bot.db
//! ```

use std::env;

use invoice_core::catalog::{define_customer, define_product};
use invoice_core::{StateTag, UserId};
use invoice_db::{Database, DbConfig};

/// `(name, unit price)` before the fee multiplier.
const PRODUCTS: &[(&str, i64)] = &[
    ("Widget", 10),
    ("Gasket", 4),
    ("Steel Nozzle", 25),
    ("Pressure Valve", 60),
    ("Copper Pipe 2m", 18),
];

/// `(name, phone, address, code)`
const CUSTOMERS: &[(&str, &str, &str, &str)] = &[
    ("Sara Ahmadi", "09121234567", "Tehran, Valiasr St 12", "12"),
    ("Reza Karimi", "09357654321", "Shiraz, Zand Blvd 3", "31"),
    ("Nasrin Co.", "02188776655", "Karaj, Industrial Park 7", "40"),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut user = String::from("1000");
    let mut db_path = String::from("./invoice_bot_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--user" | "-u" => {
                if i + 1 < args.len() {
                    user = args[i + 1].clone();
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Invoice Bot Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -u, --user <ID>    Chat user id to seed (default: 1000)");
                println!("  -d, --db <PATH>    Database file path (default: ./invoice_bot_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Invoice Bot Seed Data Generator");
    println!("==================================");
    println!("Database: {}", db_path);
    println!("User:     {}", user);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let user_id = UserId::new(user);
    let existing = db.user_records().load(&user_id).await?;
    if existing.is_onboarded() {
        println!("⚠ User {} already exists", user_id);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let (products, customers) = db
        .user_records()
        .update(&user_id, |record| {
            record.phone_number = Some("+989120000000".to_string());
            record.store_name = Some("Demo Hardware".to_string());
            record.seller_name = Some("Ali".to_string());
            record.state = StateTag::Ready;

            let mut products = 0;
            for (name, price) in PRODUCTS {
                match define_product(record, &user_id, name, *price) {
                    Ok(_) => products += 1,
                    Err(e) => eprintln!("Failed to define {}: {}", name, e),
                }
            }

            let mut customers = 0;
            for (name, phone, address, code) in CUSTOMERS {
                match define_customer(record, name, phone, address, code) {
                    Ok(_) => customers += 1,
                    Err(e) => eprintln!("Failed to define {}: {}", name, e),
                }
            }

            (products, customers)
        })
        .await?;

    println!();
    println!("✓ Defined {} products", products);
    println!("✓ Defined {} customers", customers);
    println!();
    println!("✓ Seed complete!");

    Ok(())
}
