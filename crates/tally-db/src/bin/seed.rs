//! # Seed Data Generator
//!
//! Populates the database with demo products, bills and journal entries
//! for development.
//!
//! ## Usage
//! ```bash
//! # Generate 200 products (default)
//! cargo run -p tally-db --bin seed
//!
//! # Custom amount and database
//! cargo run -p tally-db --bin seed -- --count 500 --db ./data/tally.db
//! ```
//!
//! Product codes are `{CATEGORY}-{NNN}`. Stock cycles through 0..=60 so the
//! low-stock dashboard has something to show.

use std::env;

use anyhow::Context;
use chrono::{Days, Utc};
use tally_core::{NewBill, NewProduct, NewTransaction, TransactionType};
use tally_db::{Database, DbConfig, DbError};

/// (code prefix, category, supplier, names)
const CATEGORIES: &[(&str, &str, &str, &[&str])] = &[
    (
        "BEV",
        "Beverages",
        "Metro Drinks Co.",
        &["Cola 330ml", "Orange Juice 1L", "Mineral Water 500ml", "Iced Tea", "Energy Drink"],
    ),
    (
        "SNK",
        "Snacks",
        "Crunch Foods",
        &["Potato Chips", "Salted Peanuts", "Chocolate Bar", "Cookies", "Granola Bar"],
    ),
    (
        "GRC",
        "Groceries",
        "Daily Staples Ltd.",
        &["Basmati Rice 5kg", "Sugar 1kg", "Cooking Oil 1L", "Flour 2kg", "Tea Leaves 500g"],
    ),
    (
        "HYG",
        "Personal Care",
        "CleanCo",
        &["Toothpaste", "Shampoo 400ml", "Hand Soap", "Tissue Box", "Detergent 1kg"],
    ),
    (
        "ELC",
        "Electronics",
        "Volt Supplies",
        &["AA Batteries 4pk", "USB Cable", "Phone Charger", "LED Bulb", "Earphones"],
    ),
];

/// (bill type, description, amount in cents, days until due)
const BILLS: &[(&str, &str, i64, u64)] = &[
    ("rent", "Shop rent", 150_000, 10),
    ("utilities", "Electricity", 18_500, 5),
    ("utilities", "Water", 4_200, 12),
    ("supplier", "Metro Drinks Co. restock", 62_000, 20),
];

/// Demo journal entries: (type, description, amount in cents).
const JOURNAL: &[(TransactionType, &str, i64)] = &[
    (TransactionType::Expense, "Receipt paper rolls", 1_250),
    (TransactionType::Expense, "Cleaning supplies", 3_400),
    (TransactionType::Income, "Opening float", 50_000),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 200;
    let mut db_path = String::from("./tally_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1]
                        .parse()
                        .with_context(|| format!("invalid --count value: {}", args[i + 1]))?;
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
                println!("Tally POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to generate (default: 200)");
                println!("  -d, --db <PATH>    Database file path (default: ./tally_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Tally POS Seed Data Generator");
    println!("=============================");
    println!("Database: {}", db_path);
    println!("Products: {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path))
        .await
        .context("failed to open database")?;

    println!("✓ Connected to database, migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let start = std::time::Instant::now();
    let mut generated = 0;

    'outer: for round in 0.. {
        for (category_idx, (prefix, category, supplier, names)) in CATEGORIES.iter().enumerate() {
            for (name_idx, name) in names.iter().enumerate() {
                if generated >= count {
                    break 'outer;
                }

                let seed = round * 100 + category_idx * 10 + name_idx;
                let product = generate_product(prefix, category, supplier, name, round, seed);

                match db.products().insert(&product).await {
                    Ok(_) => generated += 1,
                    Err(DbError::UniqueViolation { .. }) => continue,
                    Err(e) => eprintln!("Failed to insert {}: {}", product.code, e),
                }
            }
        }
    }

    println!("✓ Generated {} products in {:?}", generated, start.elapsed());

    let today = Utc::now().date_naive();
    for (bill_type, description, amount_cents, due_in) in BILLS {
        let due_date = today.checked_add_days(Days::new(*due_in)).unwrap_or(today);
        db.bills()
            .create(&NewBill {
                bill_type: bill_type.to_string(),
                amount_cents: *amount_cents,
                due_date,
                description: description.to_string(),
            })
            .await?;
    }
    println!("✓ Created {} pending bills", BILLS.len());

    for (txn_type, description, amount_cents) in JOURNAL {
        db.transactions()
            .record(&NewTransaction {
                txn_type: *txn_type,
                amount_cents: *amount_cents,
                description: description.to_string(),
                user_id: "seed".to_string(),
                sale_id: None,
            })
            .await?;
    }
    println!("✓ Recorded {} journal entries", JOURNAL.len());

    println!();
    println!("✓ Seed complete!");

    db.close().await;
    Ok(())
}

/// Generates a single product with deterministic pseudo-random data.
fn generate_product(
    prefix: &str,
    category: &str,
    supplier: &str,
    name: &str,
    round: usize,
    seed: usize,
) -> NewProduct {
    // $0.99 - $49.99
    let unit_price_cents = 99 + ((seed * 37) % 4900) as i64;

    let name = if round == 0 {
        name.to_string()
    } else {
        format!("{} (batch {})", name, round + 1)
    };

    NewProduct {
        code: format!("{}-{:03}", prefix, seed),
        name,
        category: category.to_string(),
        supplier: supplier.to_string(),
        stock: (seed % 61) as i64,
        unit_price_cents,
    }
}
