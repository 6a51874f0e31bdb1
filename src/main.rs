use std::io;

use actix_web::{web, App, HttpServer};
use log::{error, info};
use student_events::{
    config::Config,
    db::{init_db_pool, run_migrations},
    handlers,
    service::{
        log::{init_logger, LoggerMiddleware},
        notification::run_reminder_sweeps,
        push::PushService,
        upload::UploadStore,
    },
};

fn startup_error(stage: &str, err: impl std::fmt::Display) -> io::Error {
    error!("startup failed while {}: {}", stage, err);
    io::Error::new(io::ErrorKind::Other, format!("{stage}: {err}"))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    init_logger();

    let config = Config::from_env().map_err(|e| startup_error("reading configuration", e))?;
    let pool = init_db_pool(&config.database_url, config.db_max_connections)
        .await
        .map_err(|e| startup_error("connecting to the database", e))?;
    run_migrations(&pool)
        .await
        .map_err(|e| startup_error("running migrations", e))?;
    let push = PushService::new(config.push.clone()).map_err(|e| startup_error("building the push client", e))?;
    let uploads = UploadStore::new(config.upload_dir.clone());

    if let Some(every) = config.reminder_sweep_interval {
        tokio::spawn(run_reminder_sweeps(pool.clone(), push.clone(), every));
    }

    let bind = (config.host.clone(), config.port);
    let jwt_secret = config.jwt_secret.clone();
    let config = web::Data::new(config);
    info!("listening on {}:{}", bind.0, bind.1);

    HttpServer::new(move || {
        App::new()
            .wrap(LoggerMiddleware)
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(push.clone()))
            .app_data(web::Data::new(uploads.clone()))
            .app_data(config.clone())
            .configure(|cfg| handlers::config(cfg, &jwt_secret))
    })
    .bind(bind)?
    .run()
    .await
}
