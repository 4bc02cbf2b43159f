//! # Seed Data Generator
//!
//! Populates the database with a small demo storefront.
//!
//! ## Usage
//! ```bash
//! cargo run -p maple-db --bin seed
//!
//! # Specify database path
//! cargo run -p maple-db --bin seed -- --db ./data/maple.db
//! ```
//!
//! ## Generated Data
//! - A category tree with one taxable root (`E-liquids`) and one exempt
//!   root (`Accessories`)
//! - Simple products, some on sale
//! - Variable flavours with 60ml / 120ml variations
//! - Rates for every province, surcharges for ON and BC, and a QC hide list

use std::env;

use maple_core::jurisdiction::Jurisdiction;
use maple_core::settings::SettingKey;
use maple_core::types::{CategoryId, Product, ProductId, ProductKind, SalePrice, SizeLabel};
use maple_db::{CategoryRecord, Database, DbConfig};
use rust_decimal::Decimal;

/// (id, name, parent)
const CATEGORIES: &[(u64, &str, Option<u64>)] = &[
    (1, "E-liquids", None),
    (2, "Freebase", Some(1)),
    (3, "Salt nic", Some(1)),
    (4, "Accessories", None),
];

/// (id, name, category, regular cents, sale cents)
const SIMPLE_PRODUCTS: &[(u64, &str, u64, i64, Option<i64>)] = &[
    (100, "Cotton Wick Pack", 4, 599, None),
    (101, "Replacement Coil 0.8Ω", 4, 1499, Some(1199)),
    (102, "Menthol Salt 30ml", 3, 1899, None),
    (103, "Tobacco Salt 30ml", 3, 1899, Some(1599)),
];

/// (parent id, flavour, category, 60ml cents, 120ml cents)
const FLAVOURS: &[(u64, &str, u64, i64, i64)] = &[
    (200, "Mango Ice", 2, 2499, 3999),
    (210, "Blue Razz", 2, 2499, 3999),
    (220, "Strawberry Kiwi", 2, 2299, 3699),
];

/// Rates as an operator would type them.
const RATES: &[(Jurisdiction, &str)] = &[
    (Jurisdiction::Alberta, "5"),
    (Jurisdiction::BritishColumbia, "12"),
    (Jurisdiction::Manitoba, "12"),
    (Jurisdiction::NewBrunswick, "15"),
    (Jurisdiction::NewfoundlandAndLabrador, "15"),
    (Jurisdiction::NovaScotia, "14"),
    (Jurisdiction::NorthwestTerritories, "5"),
    (Jurisdiction::Nunavut, "5"),
    (Jurisdiction::Ontario, "13"),
    (Jurisdiction::PrinceEdwardIsland, "15"),
    (Jurisdiction::Quebec, "14,975"),
    (Jurisdiction::Saskatchewan, "11"),
    (Jurisdiction::Yukon, "5"),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = "./maple_dev.db".to_string();

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
                println!("Maple Pricing Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./maple_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Maple Pricing Seed Data Generator");
    println!("====================================");
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

    for (id, name, parent) in CATEGORIES {
        db.categories()
            .insert(&CategoryRecord {
                id: CategoryId(*id),
                name: name.to_string(),
                parent_id: parent.map(CategoryId),
            })
            .await?;
    }
    println!("✓ Inserted {} categories", CATEGORIES.len());

    let mut inserted = 0;

    for (id, name, category, regular, sale) in SIMPLE_PRODUCTS {
        db.products()
            .insert(&Product {
                id: ProductId(*id),
                name: name.to_string(),
                kind: ProductKind::Simple,
                category_ids: vec![CategoryId(*category)],
                regular_price: Some(Decimal::new(*regular, 2)),
                sale: sale.map(|cents| SalePrice::open(Decimal::new(cents, 2))),
                size: None,
            })
            .await?;
        inserted += 1;
    }

    for (parent_id, flavour, category, small, large) in FLAVOURS {
        db.products()
            .insert(&Product {
                id: ProductId(*parent_id),
                name: flavour.to_string(),
                kind: ProductKind::Variable,
                category_ids: vec![CategoryId(*category)],
                regular_price: None,
                sale: None,
                size: None,
            })
            .await?;
        inserted += 1;

        for (offset, (size, cents)) in [(SizeLabel::Ml60, small), (SizeLabel::Ml120, large)]
            .into_iter()
            .enumerate()
        {
            db.products()
                .insert(&Product {
                    id: ProductId(parent_id + 1 + offset as u64),
                    name: format!("{} - {}", flavour, size.as_str()),
                    kind: ProductKind::Variation {
                        parent_id: ProductId(*parent_id),
                    },
                    category_ids: vec![],
                    regular_price: Some(Decimal::new(*cents, 2)),
                    sale: None,
                    size: Some(size.as_str().to_string()),
                })
                .await?;
            inserted += 1;
        }
    }
    println!("✓ Inserted {} products and variations", inserted);

    let settings = db.settings();
    for (jurisdiction, rate) in RATES {
        settings
            .set_text(&SettingKey::TaxRate(*jurisdiction), *rate)
            .await?;
    }
    settings.set_text(&SettingKey::GeneralMode, "percentage").await?;
    settings.set_text(&SettingKey::SizeMode, "fixed").await?;
    settings
        .set_text(&SettingKey::SizeSurcharge(SizeLabel::Ml60), "2.50")
        .await?;
    settings
        .set_text(&SettingKey::SizeSurcharge(SizeLabel::Ml120), "4")
        .await?;
    settings
        .set_list(&SettingKey::TaxableRootCategories, [1])
        .await?;
    settings
        .set_list(&SettingKey::SurchargeJurisdictions, ["ON", "BC"])
        .await?;
    settings
        .set_list(&SettingKey::HiddenProducts(Jurisdiction::Quebec), [210])
        .await?;
    settings
        .set_list(&SettingKey::HiddenCategories(Jurisdiction::Quebec), [3])
        .await?;
    println!("✓ Wrote pricing settings");

    let snapshot = db.snapshot().await?;
    println!();
    println!("✓ Seed complete! {} records in snapshot", snapshot.product_count());

    Ok(())
}
