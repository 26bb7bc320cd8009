//! # Seed Data Generator
//!
//! Populates a development database with the water catalog, a handful of
//! customers and opening stock.
//!
//! ## Usage
//! ```bash
//! # Seed ./aquaroute_dev.db
//! cargo run -p aquaroute-db --bin seed
//!
//! # Specify database path
//! cargo run -p aquaroute-db --bin seed -- --db ./data/aquaroute.db
//! ```
//!
//! Opening stock is entered through the inventory counter as `adjustment`
//! movements, so the audit trail replays to the seeded quantities.

use chrono::Utc;
use std::env;
use uuid::Uuid;

use aquaroute_core::{Customer, CustomerKind, Money, Product, ProductCategory};
use aquaroute_db::{Database, DbConfig, NewMovement};

const SEED_ACTOR: &str = "seed";

/// (code, name, category, price, affects_bottle_deposit, opening stock)
const CATALOG: &[(&str, &str, ProductCategory, i64, bool, i64)] = &[
    ("BID-20L", "Recarga bidón 20 L", ProductCategory::Water, 2_500, true, 200),
    ("BID-20L-N", "Bidón 20 L nuevo (con agua)", ProductCategory::Water, 7_990, false, 40),
    ("BID-10L", "Bidón desechable 10 L", ProductCategory::Water, 2_290, false, 80),
    ("BOT-500", "Botella 500 ml x 24", ProductCategory::Pack, 6_490, false, 60),
    ("DISP-FRIO", "Dispensador frío/caliente", ProductCategory::Dispenser, 89_990, false, 8),
    ("DISP-MESA", "Dispensador de mesa", ProductCategory::Dispenser, 12_990, false, 15),
    ("BOMBA-USB", "Bomba eléctrica USB", ProductCategory::Accessory, 7_490, false, 30),
    ("VASO-01", "Vasos desechables x 50", ProductCategory::Accessory, 1_490, false, 120),
];

/// (name, kind, tax_id, street, number, district, bottles_owned, bottles_lent)
const CUSTOMERS: &[(&str, CustomerKind, Option<&str>, &str, &str, &str, i64, i64)] = &[
    ("Juana Pérez", CustomerKind::Personal, None, "Los Aromos", "123", "Maipú", 0, 2),
    ("Pedro Soto", CustomerKind::Personal, Some("12.345.678-5"), "Av. Pajaritos", "4510", "Maipú", 1, 1),
    ("Ferretería El Clavo Ltda.", CustomerKind::Business, Some("76.123.456-0"), "Camino Melipilla", "9800", "Cerrillos", 0, 6),
    ("Colegio San Andrés", CustomerKind::Business, Some("65.432.100-0"), "Los Pinos", "55", "Estación Central", 4, 12),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./aquaroute_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("AquaRoute Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./aquaroute_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("AquaRoute Seed Data Generator");
    println!("=============================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Seeding catalog and opening stock...");
    let now = Utc::now();

    for (code, name, category, price, deposit, opening) in CATALOG {
        let product = Product {
            id: Uuid::new_v4().to_string(),
            code: code.to_string(),
            name: name.to_string(),
            description: None,
            category: *category,
            price: Money::from_minor(*price),
            is_active: true,
            affects_bottle_deposit: *deposit,
            created_at: now,
            updated_at: now,
        };

        let product = match db.products().insert(&product).await {
            Ok(product) => product,
            Err(e) => {
                eprintln!("Failed to insert {}: {}", code, e);
                continue;
            }
        };

        db.inventory()
            .apply_movement(NewMovement::adjustment(
                &product.id,
                *opening,
                Some("Opening stock".to_string()),
                SEED_ACTOR,
            ))
            .await?;

        println!("  {:<10} {:>10}  stock {}", product.code, product.price.to_string(), opening);
    }

    println!();
    println!("Seeding customers...");

    for (name, kind, tax_id, street, number, district, owned, lent) in CUSTOMERS {
        let customer = Customer {
            id: Uuid::new_v4().to_string(),
            code: String::new(),
            tax_id: tax_id.map(str::to_string),
            name: name.to_string(),
            kind: *kind,
            street: street.to_string(),
            street_number: number.to_string(),
            district: district.to_string(),
            city: "Santiago".to_string(),
            reference: None,
            phone: None,
            email: None,
            contact: None,
            comments: None,
            bottles_owned: *owned,
            bottles_lent: *lent,
            created_at: now,
            updated_at: now,
        };

        match db.customers().insert(customer).await {
            Ok(saved) => println!("  {}  {}", saved.code, saved.name),
            Err(e) => eprintln!("Failed to insert customer {}: {}", name, e),
        }
    }

    println!();
    let low = db.reports().low_stock().await?;
    println!("Low-stock alerts: {}", low.len());
    println!("✓ Seed complete!");

    db.close().await;
    Ok(())
}
