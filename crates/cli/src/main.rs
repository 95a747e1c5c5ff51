use clap::Parser;
use log::LevelFilter;
use std::ffi::OsString;
use std::sync::Arc;
use yaml2json_core::config::{resolve_config, version_line, ConfigOverrides};
use yaml2json_core::server::serve;
use yaml2json_core::translate::YamlToJson;

/// Long flags that may also be written with a single dash (`-port 80`).
const LONG_FLAGS: [&str; 6] = ["listen", "port", "key", "sub-path", "fetch-timeout", "version"];

#[derive(Debug, Parser)]
#[command(
    name = "yaml2json-server",
    about = "HTTP server that converts YAML documents to JSON",
    disable_version_flag = true
)]
struct Cli {
    /// HTTP listen address
    #[arg(long, value_name = "ADDR", allow_hyphen_values = true)]
    listen: Option<String>,
    /// HTTP listen port
    #[arg(long, allow_negative_numbers = true)]
    port: Option<i64>,
    /// Pre-shared auth key
    #[arg(long, allow_hyphen_values = true)]
    key: Option<String>,
    /// HTTP serve sub-path
    #[arg(long = "sub-path", value_name = "PATH", allow_hyphen_values = true)]
    sub_path: Option<String>,
    /// Remote fetch timeout in seconds, 0 disables it
    #[arg(long = "fetch-timeout", value_name = "SECS")]
    fetch_timeout: Option<u64>,
    /// Print the version and exit
    #[arg(long, default_value_t = false)]
    version: bool,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            listen_addr: self.listen.clone(),
            listen_port: self.port,
            auth_key: self.key.clone(),
            url_sub_path: self.sub_path.clone(),
            fetch_timeout_secs: self.fetch_timeout,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse_from(normalize_go_flags(std::env::args_os()));

    if cli.version {
        println!("{}", version_line());
        return Ok(());
    }

    init_logger().map_err(|e| anyhow::anyhow!("failed to install logger: {e}"))?;

    let config = resolve_config(|k| std::env::var(k).ok(), cli.overrides())?;
    if config.auth_enabled() {
        log::info!("pre-shared key authentication enabled");
    }
    serve(config, Arc::new(YamlToJson)).await
}

fn init_logger() -> Result<(), log::SetLoggerError> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    builder.filter_module("hyper", LevelFilter::Info);
    builder.filter_module("reqwest", LevelFilter::Info);
    builder.try_init()
}

/// Rewrites `-flag` and `-flag=value` for known long flags to `--flag`
/// so the single-dash spelling keeps working. Flag values and arguments
/// after `--` are left untouched.
fn normalize_go_flags<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    let mut out = Vec::new();
    let mut passthrough = false;
    let mut value_next = false;
    for (idx, arg) in args.into_iter().enumerate() {
        if idx == 0 || passthrough || value_next {
            value_next = false;
            out.push(arg);
            continue;
        }
        let Some(s) = arg.to_str() else {
            out.push(arg);
            continue;
        };
        if s == "--" {
            passthrough = true;
            out.push(arg);
            continue;
        }
        let body = s.strip_prefix("--").or_else(|| s.strip_prefix('-'));
        let Some(body) = body else {
            out.push(arg);
            continue;
        };
        let (name, inline_value) = match body.split_once('=') {
            Some((name, _)) => (name, true),
            None => (body, false),
        };
        if !LONG_FLAGS.contains(&name) {
            out.push(arg);
            continue;
        }
        value_next = !inline_value && name != "version";
        out.push(OsString::from(format!("--{body}")));
    }
    out
}
