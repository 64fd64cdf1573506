use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};

use crate::container::Container;
use crate::dispatcher::{Handler, ServiceContext};
use crate::echo::EchoHandler;
use crate::embedded::EmbeddedContainer;
use crate::error::Result;
use crate::exchange::{split_target, Request, Response};
use crate::runtime_config::ContainerConfig;

/// Command-line interface for brrtcontainer
#[derive(Parser, Debug)]
#[command(name = "brrtcontainer")]
#[command(about = "Handler container runtime CLI", long_about = None)]
pub struct Cli {
    /// YAML runtime configuration; environment variables are used when absent
    #[arg(short, long, global = true, env = "BRRTC_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Service one request against an embedded echo container
    Dispatch {
        /// Request path, optionally with a query string
        path: String,

        /// Forward to this target (path and optional query) before echoing
        #[arg(long)]
        forward: Option<String>,

        /// Extra request parameters as name=value
        #[arg(short = 'p', long = "param", value_name = "NAME=VALUE")]
        params: Vec<String>,
    },
    /// Print the effective runtime configuration as YAML
    Config,
}

/// Forwards every request to a fixed target.
struct ForwardTo(String);

impl Handler for ForwardTo {
    fn service(&self, request: &Request, response: &Response, ctx: &ServiceContext<'_>) -> Result<()> {
        ctx.request_dispatcher(&self.0)?.forward(request, response)
    }
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<ContainerConfig> {
    match path {
        Some(path) => ContainerConfig::from_yaml_file(path)
            .with_context(|| format!("loading {}", path.display())),
        None => ContainerConfig::from_env().context("reading BRRTC_* environment"),
    }
}

fn split_params(params: &[String]) -> anyhow::Result<Vec<&str>> {
    let mut flat = Vec::with_capacity(params.len() * 2);
    for param in params {
        let (name, value) = param
            .split_once('=')
            .ok_or_else(|| anyhow!("parameter '{param}' is not NAME=VALUE"))?;
        flat.push(name);
        flat.push(value);
    }
    Ok(flat)
}

fn echo_container(
    config: &ContainerConfig,
    path: &str,
    forward: Option<&str>,
) -> anyhow::Result<EmbeddedContainer> {
    let mut container = Container::new().with_config(config);
    if let Some(mut echo) = container.add_handler("echo", Arc::new(EchoHandler))? {
        echo.add_mapping(&["/"])?;
    }
    if let Some(target) = forward {
        let (servlet_path, _) = split_target(path);
        if let Some(mut forwarder) =
            container.add_handler("forward", Arc::new(ForwardTo(target.to_string())))?
        {
            let conflicts = forwarder.add_mapping(&[servlet_path])?;
            if !conflicts.is_empty() {
                return Err(anyhow!("path {servlet_path} is already mapped"));
            }
        }
    }
    Ok(EmbeddedContainer::new(container))
}

/// Execute a parsed command line.
pub fn run_cli(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_ref())?;
    match &cli.command {
        Commands::Dispatch {
            path,
            forward,
            params,
        } => {
            let mut embedded = echo_container(&config, path, forward.as_deref())?;
            embedded.initialize()?.start()?;
            let response = embedded.service_path(path, &split_params(params)?)?;
            println!("status: {}", response.status());
            for (name, value) in response.headers() {
                println!("{name}: {value}");
            }
            println!();
            println!("{}", response.body_string());
            embedded.stop()?.destroy()?;
            Ok(())
        }
        Commands::Config => {
            print!("{}", config.to_yaml()?);
            Ok(())
        }
    }
}
