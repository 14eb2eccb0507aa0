use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;

use actionserver::config::{ConfigStore, EmailSettings, ServerSettings, YamlConfig};
use actionserver::controller::ServerController;
use actionserver::dispatcher::InvocationPipeline;
use actionserver::escalation::{Escalator, MailTransport, NoopTransport, SmtpTransport};
use actionserver::logging::{init_logging, LogConfig};
use actionserver::middleware::{MetricsMiddleware, TracingMiddleware};
use actionserver::registry::RegistryBuilder;
use actionserver::router::Router;
use actionserver::runtime_config::RuntimeConfig;
use actionserver::server::Server;

/// Controller/action HTTP server
#[derive(Parser, Debug)]
#[command(name = "actionserver", version, about, long_about = None)]
struct Args {
    /// YAML configuration file
    #[arg(short, long, env = "ACTIONSERVER_CONFIG")]
    config: Option<PathBuf>,

    /// Override `server.host`
    #[arg(long)]
    host: Option<String>,

    /// Override `server.port`
    #[arg(long)]
    port: Option<u16>,
}

fn mail_transport(settings: &EmailSettings) -> Arc<dyn MailTransport> {
    match &settings.smtp_host {
        Some(host) => Arc::new(SmtpTransport::new(host.clone(), settings.smtp_port)),
        None => Arc::new(NoopTransport),
    }
}

/// Send `GET /server/ping` and require a 200.
fn self_ping(mut addr: SocketAddr) -> Result<()> {
    if addr.ip().is_unspecified() {
        addr.set_ip(std::net::Ipv4Addr::LOCALHOST.into());
    }
    let mut stream = TcpStream::connect_timeout(&addr, Duration::from_secs(5))
        .with_context(|| format!("connecting to {addr}"))?;
    stream.set_read_timeout(Some(Duration::from_secs(5)))?;
    write!(
        stream,
        "GET /server/ping HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n"
    )?;
    let mut reply = String::new();
    stream.read_to_string(&mut reply)?;
    let status = reply.split_whitespace().nth(1).unwrap_or_default();
    if status != "200" {
        bail!("ping returned status {status:?}");
    }
    Ok(())
}

#[cfg(unix)]
fn wait_for_signal() -> Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM]).context("installing signal handlers")?;
    if let Some(signal) = signals.forever().next() {
        info!(signal, "shutdown signal received");
    }
    Ok(())
}

#[cfg(not(unix))]
fn wait_for_signal() -> Result<()> {
    loop {
        std::thread::park();
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let _log_guard = init_logging(&LogConfig::from_env())?;

    let store = match &args.config {
        Some(path) => YamlConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => YamlConfig::from_env_only(),
    };
    let store: &dyn ConfigStore = &store;
    let mut settings = ServerSettings::from_store(store)?;
    if let Some(host) = args.host {
        settings.host = host;
    }
    if let Some(port) = args.port {
        settings.port = port;
    }
    let email = EmailSettings::from_store(store)?;
    let runtime = RuntimeConfig::from_env();

    info!(
        name = %settings.name,
        version = %settings.version,
        endpoint = %settings.endpoint(),
        "Preparing server"
    );

    let mut registry = RegistryBuilder::new();
    registry.register(ServerController::definition())?;
    let registry = registry.build();
    info!(controllers = ?registry.controller_names(), "Registered controllers");

    let pipeline = InvocationPipeline::new(Escalator::new(mail_transport(&email)));
    let mut router = Router::with_pipeline(registry, pipeline);
    router.add_middleware(Arc::new(TracingMiddleware));
    router.add_middleware(Arc::new(MetricsMiddleware::new()));

    let spawner = runtime.spawner().context("creating task spawner")?;
    let mut server = Server::new(settings.endpoint(), router, spawner)
        .with_shutdown_grace(runtime.shutdown_grace);
    server.start().context("starting server")?;

    let addr = server.local_addr()?;
    self_ping(addr).context("self-ping failed")?;
    info!(%addr, "Server ready to accept requests");

    wait_for_signal()?;
    server.shutdown().context("shutting down server")?;
    Ok(())
}
