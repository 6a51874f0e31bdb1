use std::future::{ready, Ready};
use std::io::Write;
use std::time::Instant;

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
};
use colored::Colorize;
use env_logger::{Builder, Env};
use futures_util::future::LocalBoxFuture;
use log::{info, warn, Level};

/// Logs one line per request and one per response with status and latency.
pub struct LoggerMiddleware;

impl<S, B> Transform<S, ServiceRequest> for LoggerMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = LoggerMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(LoggerMiddlewareService { service }))
    }
}

pub struct LoggerMiddlewareService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for LoggerMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let method = req.method().clone();
        let path = req.path().to_string();
        info!("--> {} {}", method, path);
        let started = Instant::now();
        let fut = self.service.call(req);

        Box::pin(async move {
            let res = fut.await;
            let elapsed = started.elapsed().as_millis();
            match &res {
                Ok(resp) if resp.status().is_server_error() => {
                    warn!("<-- {} {} {} ({} ms)", method, path, resp.status(), elapsed)
                }
                Ok(resp) => info!("<-- {} {} {} ({} ms)", method, path, resp.status(), elapsed),
                Err(err) => warn!(
                    "<-- {} {} {} ({} ms)",
                    method,
                    path,
                    err.as_response_error().status_code(),
                    elapsed
                ),
            }
            res
        })
    }
}

/// Installs the global logger. Level comes from `RUST_LOG`, default `info`.
pub fn init_logger() {
    Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let level = match record.level() {
                Level::Error => "ERROR".red().bold(),
                Level::Warn => "WARN ".yellow().bold(),
                Level::Info => "INFO ".green().bold(),
                Level::Debug => "DEBUG".blue().bold(),
                Level::Trace => "TRACE".magenta().bold(),
            };
            writeln!(
                buf,
                "{} {} [{}] {}",
                buf.timestamp_millis(),
                level,
                record.target(),
                record.args()
            )
        })
        .init()
}
