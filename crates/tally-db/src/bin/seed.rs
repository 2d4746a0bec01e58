//! # Catalog Seed Generator
//!
//! Populates the database with a development product catalog.
//!
//! ## Usage
//! ```bash
//! # Generate 2,000 products (default)
//! cargo run -p tally-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p tally-db --bin seed -- --count 500
//!
//! # Specify database path
//! cargo run -p tally-db --bin seed -- --db ./data/tally.db
//! ```
//!
//! ## Generated Products
//! Trade-supply categories with Indian HSN tax codes and GST slabs:
//! - Plumbing (valves, pipes, fittings)
//! - Electrical (cable by the metre, switches)
//! - Building (cement by the bag, sand by the kg)
//! - Hardware (fasteners, hinges)
//! - Paint (litres)
//!
//! Each product has:
//! - Unique SKU: `{CATEGORY}-{NAME}-{INDEX}`
//! - Deterministic price, stock and variant derived from the index
//! - Some products deliberately low or out of stock, so warnings show up
//!   in the editor
//! - Fractional stock for weight/length/volume units

use rust_decimal::Decimal;
use std::env;
use tally_core::{Money, Product, Quantity, TaxRate};
use tally_db::{Database, DbConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// (category code, category name, HSN code, GST bps, unit, product names)
type CategorySpec = (&'static str, &'static str, &'static str, u32, &'static str, &'static [&'static str]);

const CATEGORIES: &[CategorySpec] = &[
    (
        "PLB",
        "Plumbing",
        "8481",
        1800,
        "pcs",
        &[
            "Brass Ball Valve",
            "Gate Valve",
            "Check Valve",
            "Float Valve",
            "Angle Cock",
            "Pillar Tap",
            "Bib Cock",
            "Flush Valve",
        ],
    ),
    (
        "PIP",
        "Plumbing",
        "3917",
        1800,
        "m",
        &["PVC Pipe", "CPVC Pipe", "UPVC Pipe", "HDPE Pipe", "Flexible Hose"],
    ),
    (
        "ELC",
        "Electrical",
        "8544",
        1800,
        "m",
        &[
            "Copper Wire 1.5sqmm",
            "Copper Wire 2.5sqmm",
            "Copper Wire 4sqmm",
            "Flat Cable",
            "Coaxial Cable",
        ],
    ),
    (
        "SWT",
        "Electrical",
        "8536",
        1800,
        "pcs",
        &["Modular Switch", "Socket 6A", "Socket 16A", "MCB Single Pole", "MCB Double Pole"],
    ),
    (
        "CEM",
        "Building",
        "2523",
        2800,
        "bag",
        &["OPC Cement 53", "PPC Cement", "White Cement", "Wall Putty"],
    ),
    (
        "AGG",
        "Building",
        "2505",
        500,
        "kg",
        &["River Sand", "M Sand", "Stone Aggregate 20mm", "Stone Aggregate 40mm"],
    ),
    (
        "HRD",
        "Hardware",
        "7318",
        1800,
        "box",
        &["Wood Screw", "Machine Screw", "Anchor Bolt", "Hex Bolt", "Washer Set"],
    ),
    (
        "HNG",
        "Hardware",
        "8302",
        1800,
        "pair",
        &["Butt Hinge", "Piano Hinge", "Tower Bolt", "Door Handle"],
    ),
    (
        "PNT",
        "Paint",
        "3209",
        1800,
        "l",
        &["Exterior Emulsion", "Interior Emulsion", "Enamel Paint", "Wood Primer"],
    ),
    (
        "BKS",
        "Books",
        "4901",
        0,
        "pcs",
        &["Plumbing Code Handbook", "Wiring Regulations Guide"],
    ),
];

/// Size variants with a price addon in cents.
const VARIANTS: &[(&str, i64)] = &[
    ("15mm", 0),
    ("20mm", 2500),
    ("25mm", 5000),
    ("32mm", 9000),
    ("40mm", 14000),
    ("50mm", 21000),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = env::args().collect();

    let mut count: usize = 2000;
    let mut db_path = String::from("./tally_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(2000);
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
                println!("Tally Catalog Seed Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to generate (default: 2000)");
                println!("  -d, --db <PATH>    Database file path (default: ./tally_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            other => warn!(arg = %other, "Ignoring unknown argument"),
        }
        i += 1;
    }

    info!(db = %db_path, count, "Seeding catalog");

    let db = Database::new(DbConfig::new(&db_path)).await?;
    let catalog = db.catalog();

    let existing = catalog.count().await?;
    if existing > 0 {
        warn!(existing, "Catalog already populated; delete the database file to regenerate");
        return Ok(());
    }

    let mut generated = 0;
    let start = std::time::Instant::now();

    'outer: for (category_idx, spec) in CATEGORIES.iter().enumerate() {
        for (product_idx, name) in spec.5.iter().enumerate() {
            for (variant_idx, variant) in VARIANTS.iter().enumerate() {
                if generated >= count {
                    break 'outer;
                }

                let seed = category_idx * 1000 + product_idx * 20 + variant_idx;
                let product = generate_product(spec, name, variant, seed);

                if let Err(e) = catalog.insert(&product).await {
                    warn!(sku = %product.sku, error = %e, "Failed to insert product");
                    continue;
                }

                generated += 1;
                if generated % 250 == 0 {
                    info!(generated, "Seeding progress");
                }
            }
        }
    }

    let elapsed = start.elapsed();
    info!(generated, elapsed_ms = elapsed.as_millis() as u64, "Catalog seeded");

    for query in ["valve", "8544", "Building"] {
        let hits = catalog.search(query, 10).await?;
        info!(query = %query, hits = hits.len(), "Search check");
    }

    db.close().await;
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tally=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Generates a single product; the same `seed` always yields the same data.
fn generate_product(spec: &CategorySpec, name: &str, variant: &(&str, i64), seed: usize) -> Product {
    let (code, category, hsn, bps, unit, _) = *spec;
    let (size, price_addon) = *variant;

    let short: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(4)
        .collect::<String>()
        .to_uppercase();
    let sku = format!("{}-{}-{:04}", code, short, seed);

    // 25.00 - 524.99 plus the size addon
    let base_cents = 2500 + ((seed * 37) % 50000) as i64;

    // sprinkle out-of-stock and low-stock items through the catalog
    let stock = match seed % 35 {
        0 => Decimal::ZERO,
        n if n % 5 == 0 => Decimal::from((seed % 9) as i64),
        _ => Decimal::from(20 + (seed % 480) as i64),
    };
    // loose goods carry a fractional remainder
    let stock = if matches!(unit, "kg" | "m" | "l") && !stock.is_zero() {
        stock + Decimal::new(((seed % 4) * 25) as i64, 2)
    } else {
        stock
    };

    Product {
        id: Uuid::new_v4().to_string(),
        sku,
        name: format!("{} {}", name, size),
        description: None,
        tax_code: Some(hsn.to_string()),
        base_price: Money::from_cents(base_cents + price_addon),
        unit: unit.to_string(),
        stock_level: Quantity::new(stock),
        category: Some(category.to_string()),
        tax_rate: TaxRate::from_bps(bps),
    }
}
