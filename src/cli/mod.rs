//! # CLI Module
//!
//! Command-line front end for poking at a container without an HTTP server.
//!
//! ## Commands
//!
//! ### `dispatch`
//!
//! Run an embedded container with the echo handler mapped at `/` and print
//! the response to one request:
//!
//! ```bash
//! brrtcontainer dispatch '/orders?id=7' -p user=alice
//! ```
//!
//! With `--forward <target>` the request first hits a handler that forwards
//! to `target`, so the output shows the `FORWARD_*` attributes:
//!
//! ```bash
//! brrtcontainer dispatch /a --forward '/b?x=9'
//! ```
//!
//! ### `config`
//!
//! Print the effective runtime configuration (environment or `--config`
//! file) as YAML:
//!
//! ```bash
//! BRRTC_CONTEXT_PATH=/shop brrtcontainer config
//! ```
//!
//! ## Usage from Code
//!
//! ```rust,ignore
//! use brrtcontainer::cli::{run_cli, Cli};
//! use clap::Parser;
//!
//! run_cli(Cli::parse())?;
//! ```

mod commands;

pub use commands::{run_cli, Cli, Commands};
