use std::str::FromStr;

use anyhow::{bail, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use kectl_core::{wellknown, ResourceIdentity};
use kectl_encoding::StorageCodec;
use kectl_put::{open_input, put_objects, read_documents, PutRequest, PutTarget};
use kectl_store::{Client, Op, StoreError};
use metrics::counter;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

mod printer;

use printer::{Output, Printer};

#[derive(Parser, Debug)]
#[command(name = "kectl", version, about = "Read and write Kubernetes objects directly in etcd")]
struct Cli {
    /// etcd endpoints, comma separated
    #[arg(long, env = "KECTL_ENDPOINTS", value_delimiter = ',', global = true, default_value = "127.0.0.1:2379")]
    endpoints: Vec<String>,

    /// etcd credentials as user:password
    #[arg(long, env = "KECTL_USER", global = true)]
    #[cfg_attr(not(feature = "etcd"), allow(dead_code))]
    user: Option<String>,

    /// Seconds to wait for the etcd connection
    #[arg(long = "dial-timeout", global = true, default_value_t = 5)]
    #[cfg_attr(not(feature = "etcd"), allow(dead_code))]
    dial_timeout_secs: u64,

    /// Key prefix the API server stores objects under
    #[arg(long, global = true, default_value = "/registry")]
    prefix: String,

    /// Output format
    #[arg(short = 'o', long = "output", value_enum, global = true, default_value_t = Output::Key)]
    output: Output,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone, Default)]
struct TargetArgs {
    /// Resource, e.g. `pods`, `po`, `deployments.apps`
    resource: Option<String>,
    /// Object name
    name: Option<String>,
    /// Namespace of the objects
    #[arg(short = 'n', long = "namespace")]
    namespace: Option<String>,
    /// Ignore the namespace
    #[arg(short = 'A', long = "all-namespace", action = ArgAction::SetTrue)]
    all_namespaces: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write objects from a manifest file into etcd
    Put {
        #[command(flatten)]
        target: TargetArgs,
        /// Manifest path, `-` for stdin
        #[arg(long, default_value = "")]
        path: String,
        /// Write namespaced objects that have no namespace into `-n` (or `default`)
        #[arg(long = "default-namespace", action = ArgAction::SetTrue)]
        default_namespace: bool,
    },
    /// Read objects from etcd
    Get {
        #[command(flatten)]
        target: TargetArgs,
        /// Keys per range request, 0 for unlimited
        #[arg(long = "page-limit", default_value_t = 500)]
        page_limit: i64,
        /// Read at this store revision
        #[arg(long, default_value_t = 0)]
        revision: i64,
    },
    /// Delete objects from etcd
    Del {
        #[command(flatten)]
        target: TargetArgs,
    },
    /// Stream changes until interrupted
    Watch {
        #[command(flatten)]
        target: TargetArgs,
        /// Replay history from this store revision
        #[arg(long, default_value_t = 0)]
        revision: i64,
    },
}

fn init_tracing() {
    let env = std::env::var("KECTL_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env).unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_writer(std::io::stderr).init();
}

fn init_metrics() {
    if let Ok(addr) = std::env::var("KECTL_METRICS_ADDR") {
        if let Ok(sock) = addr.parse::<std::net::SocketAddr>() {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            match builder.with_http_listener(sock).install() {
                Ok(_) => info!(addr = %addr, "Prometheus metrics exporter listening"),
                Err(e) => warn!(error = %e, "failed to install metrics exporter"),
            }
        } else {
            warn!(addr = %addr, "invalid KECTL_METRICS_ADDR; expected host:port");
        }
    }
}

/// Build the addressing part of an op from `[resource] [name] -n -A`.
///
/// Well-known resources are corrected to their canonical identity and lose
/// the namespace when cluster scoped.
fn target_op<'a>(args: &TargetArgs) -> Result<Op<'a>> {
    let namespace = if args.all_namespaces { "" } else { args.namespace.as_deref().unwrap_or("") };
    let Some(arg) = args.resource.as_deref() else {
        // a bare namespace is rejected by key assembly
        return Ok(Op::new().name("", namespace));
    };
    let mut id = ResourceIdentity::parse(arg);
    if id.is_empty() {
        bail!("invalid resource {arg:?}");
    }
    let mut namespace = namespace;
    if let Some((canonical, namespaced)) = wellknown::correct(&id) {
        id = canonical;
        if !namespaced {
            namespace = "";
        }
    }
    Ok(Op::new().resource(id).name(args.name.clone().unwrap_or_default(), namespace))
}

async fn connect(cli: &Cli) -> Result<Client> {
    #[cfg(feature = "etcd")]
    {
        use std::time::Duration;

        use kectl_store::etcd::{EtcdConfig, EtcdTransport};
        let user = match cli.user.as_deref() {
            Some(creds) => match creds.split_once(':') {
                Some((u, p)) => Some((u.to_string(), p.to_string())),
                None => bail!("--user expects user:password"),
            },
            None => None,
        };
        let config = EtcdConfig {
            endpoints: cli.endpoints.clone(),
            user,
            dial_timeout: Some(Duration::from_secs(cli.dial_timeout_secs)),
        };
        Ok(Client::from_transport(EtcdTransport::connect(&config).await?))
    }
    #[cfg(not(feature = "etcd"))]
    {
        bail!("kectl was built without the etcd transport (enable the `etcd` feature); endpoints {:?}", cli.endpoints)
    }
}

/// Cancel on Ctrl-C.
fn interrupt_token() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupted");
            token.cancel();
        }
    });
    cancel
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    init_metrics();
    let cli = Cli::parse();
    let cancel = interrupt_token();
    let mut printer = Printer::new(std::io::stdout(), cli.output);

    match &cli.command {
        Commands::Put { target, path, default_namespace } => {
            counter!("kectl_commands_total", 1u64, "command" => "put");
            let put_target = PutTarget::resolve(
                target.resource.as_deref(),
                target.name.as_deref(),
                target.namespace.as_deref().unwrap_or(""),
                target.all_namespaces,
            )?;
            let input = open_input(path)?;
            let client = connect(&cli).await?;
            let request = PutRequest {
                prefix: cli.prefix.clone(),
                target: put_target,
                keys_only: cli.output.keys_only(),
                default_namespace: *default_namespace,
            };
            let summary = put_objects(
                &client,
                &StorageCodec,
                read_documents(input),
                &request,
                |r| printer.print(r),
                &cancel,
            )
            .await?;
            if cli.output == Output::Key {
                eprintln!("put {} keys", summary.written);
            }
        }
        Commands::Get { target, page_limit, revision } => {
            counter!("kectl_commands_total", 1u64, "command" => "get");
            let mut op = target_op(target)?.page_limit(*page_limit).revision(*revision);
            if cli.output.keys_only() {
                op = op.keys_only();
            }
            let client = connect(&cli).await?;
            let observed = client.get(&cancel, &cli.prefix, op.response(|r| printer.print(r))).await?;
            info!(count = printer.printed(), revision = observed, "get done");
        }
        Commands::Del { target } => {
            counter!("kectl_commands_total", 1u64, "command" => "del");
            if target.resource.is_none() {
                bail!("del needs a resource");
            }
            let mut op = target_op(target)?;
            if cli.output.keys_only() {
                op = op.keys_only();
            }
            let client = connect(&cli).await?;
            let deleted = client.delete(&cancel, &cli.prefix, op.response(|r| printer.print(r))).await?;
            if cli.output == Output::Key {
                eprintln!("delete {deleted} keys");
            }
        }
        Commands::Watch { target, revision } => {
            counter!("kectl_commands_total", 1u64, "command" => "watch");
            let mut op = target_op(target)?.revision(*revision);
            if cli.output.keys_only() {
                op = op.keys_only();
            }
            let client = connect(&cli).await?;
            match client.watch(&cancel, &cli.prefix, op.response(|r| printer.print(r))).await {
                Ok(()) | Err(StoreError::Cancelled) => info!(events = printer.printed(), "watch stopped"),
                Err(err) => return Err(err.into()),
            }
        }
    }
    Ok(())
}
