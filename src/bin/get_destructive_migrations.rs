use anyhow::Context;
use portfolio_api::database::{
    CURRENT_SCHEMA, SchemaChanges, connect_existing, get_schema_changes,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let database_url =
        std::env::var("DATABASE_URL").context("DATABASE_URL environment variable not set")?;

    let pool = connect_existing(&database_url).await?;
    let changes = get_schema_changes(pool, CURRENT_SCHEMA).await?;

    if !changes.is_destructive() {
        println!("Changes passed the check ✓");
        return Ok(());
    }

    println!("Destructive changes detected:");
    print_destructive_changes(&changes);
    std::process::exit(1);
}

fn print_destructive_changes(changes: &SchemaChanges) {
    print_string_vec(&changes.removed_tables, "    Table removed:");
    print_string_vec(&changes.removed_indices, "    Index removed:");

    for table in &changes.modified_tables {
        let prefix = format!("    Column removed from table {}:", table.name);
        print_string_vec(&table.removed_columns, &prefix);
    }
}

fn print_string_vec(values: &[String], prefix: &str) {
    for value in values {
        println!("{} {}", prefix, value);
    }
}
