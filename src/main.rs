use std::io;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use jobboard::{
    auth::AuthMiddleware,
    config::Config,
    files::{FileStore, LocalFileStore},
    notify::{LogMailer, Mailer},
    routes::{self, health, uploads},
    state::AppState,
    store::{MemoryStore, PgStore, Store},
};
use log::{info, warn};

fn startup_error(context: &str, err: impl std::fmt::Display) -> io::Error {
    io::Error::new(io::ErrorKind::Other, format!("{}: {}", context, err))
}

async fn open_store(config: &Config) -> io::Result<Arc<dyn Store>> {
    match &config.database_url {
        Some(url) => {
            let store = PgStore::connect(url)
                .await
                .map_err(|e| startup_error("Failed to connect to database", e))?;
            store
                .migrate()
                .await
                .map_err(|e| startup_error("Failed to run migrations", e))?;
            info!("Connected to Postgres and applied migrations");
            Ok(Arc::new(store))
        }
        None => {
            warn!("DATABASE_URL is not set; data lives in memory and is lost on exit");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env().map_err(|e| startup_error("Invalid configuration", e))?;
    let store = open_store(&config).await?;
    let files: Arc<dyn FileStore> =
        Arc::new(LocalFileStore::new(&config.upload_dir, &config.public_url));
    let mailer: Arc<dyn Mailer> = Arc::new(LogMailer);

    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .map_err(|e| startup_error("Failed to create upload directory", e))?;

    let state = web::Data::new(AppState::new(&config, store, files, mailer));
    let upload_dir = config.upload_dir.clone();

    info!("Starting job board server at {}", config.server_url());
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Cors::permissive())
            .wrap(Logger::default())
            .service(health::health)
            .configure(|cfg| uploads::mount(cfg, &upload_dir))
            .service(
                web::scope("/api")
                    .wrap(AuthMiddleware::new(state.tokens.clone(), state.store.clone()))
                    .configure(routes::config),
            )
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .run()
    .await
}
