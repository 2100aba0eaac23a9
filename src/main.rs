//! NetCare+
//!
//! Main entry point: HTTP server for the dashboard, or a one-shot intake demo.

use std::time::Duration;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_actix_web::TracingLogger;
use tracing_subscriber::EnvFilter;

use netcare::config::{self, Config};
use netcare::models::{PatientData, Severity};
use netcare::{api, NetCareSystem};

#[derive(Parser)]
#[command(name = "netcare", about = "NetCare+ emergency response engine")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the dashboard API
    Serve,
    /// Run one intake and print the case as it is monitored
    Demo {
        #[arg(long, default_value = "John Doe")]
        name: String,
        #[arg(long, default_value = "+1234567890")]
        phone: String,
        #[arg(long, default_value = "d1")]
        device_id: String,
        #[arg(long, default_value = "NYC")]
        area_code: String,
        #[arg(long, default_value_t = 45)]
        age: u8,
        #[arg(long, default_value = "chest pain, difficulty breathing")]
        symptoms: String,
        /// Monitor ticks to wait before the second snapshot
        #[arg(long, default_value_t = 3)]
        ticks: u32,
    },
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let config = config::load_config().context("failed to load configuration")?;
    init_tracing(&config);

    match Cli::parse().command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::Demo {
            name,
            phone,
            device_id,
            area_code,
            age,
            symptoms,
            ticks,
        } => {
            let patient = PatientData {
                name,
                phone_number: phone,
                device_id,
                area_code,
                age,
                symptoms,
                severity: Severity::default(),
            };
            demo(config, patient, ticks).await
        }
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if config.logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let bind = (config.server.host.clone(), config.server.port);
    let system = NetCareSystem::start(config)
        .await
        .context("failed to start engine")?;
    let engine = web::Data::new(system);

    info!(host = %bind.0, port = bind.1, "starting http server");
    HttpServer::new(move || {
        App::new()
            .app_data(engine.clone())
            .wrap(TracingLogger::default())
            .wrap(Cors::permissive())
            .configure(api::configure)
    })
    .bind(bind)?
    .run()
    .await?;

    info!("http server stopped");
    Ok(())
}

async fn demo(config: Config, patient: PatientData, ticks: u32) -> anyhow::Result<()> {
    let tick = config.monitoring.case_tick();
    let system = NetCareSystem::start(config)
        .await
        .context("failed to start engine")?;

    let created = system.create_case(patient).await?;
    println!("{}", serde_json::to_string_pretty(&created)?);

    tokio::time::sleep(tick * ticks + Duration::from_millis(100)).await;
    let monitored = system.get_case(&created.case_id)?;
    println!("{}", serde_json::to_string_pretty(&monitored)?);

    let closed = system.close_case(&created.case_id)?;
    info!(case_id = %closed.case_id, "demo case closed");
    system.shutdown().await;
    Ok(())
}
