use actix_web::{guard, middleware::{DefaultHeaders, Logger}, web, App, HttpServer};
use clap::Parser;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use sectionbase_backend::{
    bot::Dispatcher,
    config::Config,
    helper::content_store::SqliteContentStore,
    middleware::webhook_secret_guard,
    routes,
    setup::db_setup,
    AppState,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "sectionbase_server", author, version, about = "Starts the section browser backend.")]
struct Cli {
    /// Path to the .env configuration file.
    #[arg(long, required = true, value_name = "FILE")]
    env_file: PathBuf,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let cli = Cli::parse();

    let config = Config::from_env(&cli.env_file)
        .expect("FATAL: Failed to load or parse configuration.");

    env_logger::init_from_env(env_logger::Env::new().default_filter_or(&config.log_level));

    let db_path = config.content_db_path();
    db_setup::open_content_db(&db_path)
        .expect("FATAL: Could not open or initialize the content database.");

    let manager = SqliteConnectionManager::file(&db_path)
        .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
    let pool = Pool::builder()
        .build(manager)
        .expect("FATAL: Failed to create Rusqlite connection pool.");

    // Session state lives here, so it is shared by all workers and lost on restart.
    let app_state = web::Data::new(AppState {
        dispatcher: Dispatcher::new(config.admin_id, Arc::new(SqliteContentStore::new(pool))),
    });

    let server_address = format!("{}:{}", config.web.host, config.web.port);
    log::info!("Server starting at http://{}", server_address);
    log::info!("Administrator id: {}", config.admin_id);

    HttpServer::new(move || {
        let webhook_secret = config.webhook_secret.clone();

        App::new()
            .wrap(Logger::default())
            .wrap(DefaultHeaders::new().add(("X-Content-Type-Options", "nosniff")))
            .app_data(app_state.clone())
            .route("/api/is_server_active", web::get().to(routes::updates::is_server_active))
            .service(
                web::scope("/api")
                    .guard(guard::fn_guard(move |ctx| webhook_secret_guard(ctx, &webhook_secret)))
                    .configure(routes::updates::config_api),
            )
    })
    .bind(server_address)?
    .run()
    .await
}
