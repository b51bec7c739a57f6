//! # Seed Data Generator
//!
//! Populates the database with agreements, stores and clients for
//! development.
//!
//! ## Usage
//! ```bash
//! # Generate 200 clients (default)
//! cargo run -p convenio-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p convenio-db --bin seed -- --count 1000
//!
//! # Specify database path
//! cargo run -p convenio-db --bin seed -- --db ./data/convenio.db
//! ```
//!
//! ## Generated Data
//! - One agreement per employer below, 1 to 12 installments
//! - Two stores
//! - Clients with Brazilian names, a salary between R$ 1.500,00 and
//!   R$ 9.000,00 and a 20-35% margin
//!
//! Every record goes through the same form cleaners as the HTTP layer, so a
//! seeded database never holds data the back office would reject.

use std::env;

use convenio_core::forms::{clean_agreement, clean_client, clean_company};
use convenio_core::RawForm;
use convenio_db::{Database, DbConfig};

/// Employers that run a payroll agreement.
const EMPLOYERS: &[(&str, u32)] = &[
    ("Prefeitura Municipal", 10),
    ("Hospital Regional", 6),
    ("Secretaria de Educação", 12),
    ("Cooperativa Agrícola", 4),
    ("Indústria Têxtil", 8),
];

const FIRST_NAMES: &[&str] = &[
    "Ana", "Bruno", "Carla", "Diego", "Eduarda", "Felipe", "Gabriela", "Heitor",
    "Isabela", "João", "Larissa", "Marcos", "Natália", "Otávio", "Paula", "Rafael",
    "Sabrina", "Thiago", "Vanessa", "Wagner",
];

const LAST_NAMES: &[&str] = &[
    "Almeida", "Barbosa", "Cardoso", "Dias", "Esteves", "Ferreira", "Gomes",
    "Lima", "Moreira", "Nunes", "Oliveira", "Pereira", "Rocha", "Souza",
];

const CITIES: &[(&str, &str)] = &[
    ("Curitiba", "PR"),
    ("Recife", "PE"),
    ("Belo Horizonte", "MG"),
    ("Porto Alegre", "RS"),
    ("Salvador", "BA"),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 200;
    let mut db_path = String::from("./convenio_dev.db");
    let mut clear_existing = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(200);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--clear-existing" => clear_existing = true,
            "--help" | "-h" => {
                println!("Convênio Back Office Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>     Number of clients to generate (default: 200)");
                println!("  -d, --db <PATH>     Database file path (default: ./convenio_dev.db)");
                println!("      --clear-existing  Delete seeded tables before generating");
                println!("  -h, --help          Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Convênio Seed Data Generator");
    println!("===============================");
    println!("Database: {}", db_path);
    println!("Clients:  {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    if clear_existing {
        // Children first; issuances and sales pin clients and agreements.
        for table in [
            "sales",
            "issuance_installments",
            "issuances",
            "clients",
            "agreements",
            "companies",
        ] {
            sqlx::query(&format!("DELETE FROM {}", table))
                .execute(db.pool())
                .await?;
        }
        println!("✓ Cleared existing registry data");
    }

    let existing = db.clients().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} clients", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Re-run with --clear-existing to regenerate.");
        return Ok(());
    }

    let start = std::time::Instant::now();

    for (idx, (name, max_installments)) in EMPLOYERS.iter().enumerate() {
        let form = RawForm::new()
            .with("store_code", "1")
            .with("name", *name)
            .with("tax_id", format!("{:08}0001{:02}", 10_000_000 + idx, idx))
            .with("active", "on")
            .with("max_installments", max_installments.to_string());
        let draft = clean_agreement(&form).map_err(|e| format!("agreement {}: {:?}", name, e))?;
        db.agreements().insert(&draft).await?;
    }
    println!("✓ Generated {} agreements", EMPLOYERS.len());

    for store in 1..=2 {
        let form = RawForm::new()
            .with("store_code", store.to_string())
            .with("tax_id", format!("{:08}0001{:02}", 20_000_000 + store, store))
            .with("name", format!("Loja {}", store))
            .with("legal_name", format!("Comércio Convênio Loja {} Ltda", store))
            .with("tax_regime", "1");
        let draft = clean_company(&form).map_err(|e| format!("store {}: {:?}", store, e))?;
        db.table::<convenio_db::Companies>().insert(&draft).await?;
    }
    println!("✓ Generated 2 stores");

    println!();
    println!("Generating clients...");

    let mut generated = 0;
    for seed in 0..count {
        let form = client_form(seed);
        let draft = match clean_client(&form) {
            Ok(draft) => draft,
            Err(e) => {
                eprintln!("Rejected client {}: {:?}", seed, e);
                continue;
            }
        };

        if let Err(e) = db.clients().insert(&draft).await {
            eprintln!("Failed to insert {}: {}", draft.internal_code, e);
            continue;
        }

        generated += 1;
        if generated % 100 == 0 {
            println!("  Generated {} clients...", generated);
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!("✓ Generated {} clients in {:?}", generated, elapsed);
    println!("✓ Seed complete!");

    Ok(())
}

/// Builds a deterministic client form for the given index.
fn client_form(seed: usize) -> RawForm {
    let first = FIRST_NAMES[seed % FIRST_NAMES.len()];
    let last = LAST_NAMES[(seed / FIRST_NAMES.len()) % LAST_NAMES.len()];
    let (city, state) = CITIES[seed % CITIES.len()];

    // R$ 1.500,00 .. R$ 9.000,00 in R$ 50,00 steps
    let salary_cents = 150_000 + ((seed * 37) % 151) as i64 * 5_000;
    let margin = 20 + (seed % 16);

    RawForm::new()
        .with("internal_code", format!("CLI-{:05}", seed + 1))
        .with("full_name", format!("{} {}", first, last))
        .with("tax_id", format!("{:011}", 10_000_000_000u64 + seed as u64 * 7_919))
        .with(
            "email",
            format!("{}.{}{}@example.com", first.to_lowercase(), last.to_lowercase(), seed),
        )
        .with("city", city)
        .with("state", state)
        .with(
            "salary",
            format!("{},{:02}", salary_cents / 100, salary_cents % 100),
        )
        .with("percentage", margin.to_string())
}
