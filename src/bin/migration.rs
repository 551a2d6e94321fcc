use sea_orm::{ConnectOptions, Database, DbErr};
use sea_orm_migration::MigratorTrait;
use std::time::Duration;
use tender_tracker_api::{config, migrator::Migrator};
use tracing::{error, info};

#[derive(Debug, Clone, Copy)]
enum Action {
    Up,
    Down,
    Status,
    Fresh,
}

impl Action {
    fn parse(arg: Option<&str>) -> Option<Self> {
        match arg.unwrap_or("up") {
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            "status" => Some(Self::Status),
            "fresh" => Some(Self::Fresh),
            _ => None,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let arg = std::env::args().nth(1);
    let Some(action) = Action::parse(arg.as_deref()) else {
        error!("Unknown migration command; expected one of: up, down, status, fresh");
        return Err("unknown migration command".into());
    };

    let cfg = config::load_config()?;
    info!(?action, "Connecting to database");

    let mut options = ConnectOptions::new(cfg.database_url().to_string());
    options
        .max_connections(2)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(10))
        .acquire_timeout(Duration::from_secs(10))
        .sqlx_logging(false);

    let db = Database::connect(options).await?;

    let result: Result<(), DbErr> = match action {
        Action::Up => Migrator::up(&db, None).await,
        Action::Down => Migrator::down(&db, Some(1)).await,
        Action::Status => Migrator::status(&db).await,
        Action::Fresh => Migrator::fresh(&db).await,
    };

    match &result {
        Ok(()) => info!(?action, "Migration command completed"),
        Err(e) => error!(?action, "Migration command failed: {}", e),
    }

    result?;
    Ok(())
}
