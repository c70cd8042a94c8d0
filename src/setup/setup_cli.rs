use clap::{Parser, Subcommand};
use rusqlite::Connection;
use sectionbase_backend::config::Config;
use sectionbase_backend::models::db_operations::content_db_operations;
use sectionbase_backend::models::SectionId;
use sectionbase_backend::setup::db_setup;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "setup_cli", author, version, about = "A CLI for initial application setup.", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the .env configuration file.
    #[arg(long, required = true, value_name = "FILE")]
    env_file: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
    Tree {
        #[command(subcommand)]
        action: TreeAction,
    },
}

#[derive(Subcommand, Debug)]
enum DbAction {
    /// Create the content database and its tables.
    Setup,
}

#[derive(Subcommand, Debug)]
enum TreeAction {
    /// Print every section with its id and item count.
    List,
}

fn main() {
    let cli = Cli::parse();

    let config = Config::from_env(&cli.env_file)
        .expect("FATAL: Failed to load or parse configuration.");

    match &cli.command {
        Commands::Db { action } => match action {
            DbAction::Setup => setup_content_database(&config),
        },
        Commands::Tree { action } => match action {
            TreeAction::List => list_tree(&config),
        },
    }
}

fn setup_content_database(config: &Config) {
    let db_path = config.content_db_path();
    println!("\nSetting up content database at '{}'...", db_path.display());

    match db_setup::open_content_db(&db_path) {
        Ok(_) => println!("✅ Content database setup completed successfully."),
        Err(e) => eprintln!("❌ Error setting up content database: {}", e),
    }
}

fn print_level(
    conn: &Connection,
    parent: Option<SectionId>,
    depth: usize,
) -> Result<usize, rusqlite::Error> {
    let mut printed = 0;
    for section in content_db_operations::read_child_sections(conn, parent)? {
        let items = content_db_operations::read_items(conn, section.id)?.len();
        println!(
            "{}- {} (ID={}, {} item(s))",
            "  ".repeat(depth),
            section.name,
            section.id,
            items
        );
        printed += 1 + print_level(conn, Some(section.id), depth + 1)?;
    }
    Ok(printed)
}

fn list_tree(config: &Config) {
    let db_path = config.content_db_path();
    if !db_path.exists() {
        eprintln!(
            "❌ Error: Content database not found at '{}'. Please run `setup_cli db setup` first.",
            db_path.display()
        );
        return;
    }
    let conn = match Connection::open(&db_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("❌ Error opening content database: {}", e);
            return;
        }
    };

    println!("Listing sections:");
    match print_level(&conn, None, 0) {
        Ok(0) => println!("(no sections yet)"),
        Ok(n) => println!("{} section(s).", n),
        Err(e) => eprintln!("❌ Error reading sections: {}", e),
    }
}
