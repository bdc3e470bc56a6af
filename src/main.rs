// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
#![deny(elided_lifetimes_in_paths)]
#![warn(
    rust_2018_idioms,
    future_incompatible,
    unused,
    unused_lifetimes,
    unused_qualifications,
    unused_results,
    anonymous_parameters,
    deprecated_in_future,
    elided_lifetimes_in_paths,
    explicit_outlives_requirements,
    keyword_idents,
    macro_use_extern_crate,
    missing_doc_code_examples,
    private_doc_tests,
    trivial_casts,
    trivial_numeric_casts,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    clippy::unseparated_literal_suffix,
    clippy::decimal_literal_representation,
    clippy::single_char_lifetime_names,
    clippy::fallible_impl_from,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::wildcard_enum_match_arm,
    clippy::deref_by_slicing,
    clippy::default_numeric_fallback,
    clippy::shadow_reuse,
    clippy::clone_on_ref_ptr,
    clippy::todo,
    clippy::string_add,
    clippy::use_debug,
    clippy::future_not_send
)]
#![cfg_attr(not(test), warn(clippy::panic_in_result_fn))]

mod api;
mod chat;
mod command;
mod error;
mod http;
mod metadata;
mod password;
mod session;
mod storage;

use std::{process, sync::Arc};

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use error::{Internal, Result};
use log::{error, info, warn};
use session::SessionManager;
use storage::{IsPersistent as _, Storage};
use url::Url;

#[derive(Debug, Subcommand)]
enum Command {
    Login(command::login::Command),
    Logout(command::logout::Command),
    Register(command::register::Command),
    Whoami(command::whoami::Command),
    Profile(command::profile::Command),
    Chats(command::chats::Command),
    Friends(command::friends::Command),
    Messages(command::messages::Command),
    Send(command::send::Command),
    Start(command::start::Command),
    Delete(command::delete::Command),
    Watch(command::watch::Command),
}

#[async_trait]
impl command::Command for Command {
    async fn execute(self, session: Arc<SessionManager>) -> Result<()> {
        match self {
            Self::Login(cmd) => cmd.execute(session).await,
            Self::Logout(cmd) => cmd.execute(session).await,
            Self::Register(cmd) => cmd.execute(session).await,
            Self::Whoami(cmd) => cmd.execute(session).await,
            Self::Profile(cmd) => cmd.execute(session).await,
            Self::Chats(cmd) => cmd.execute(session).await,
            Self::Friends(cmd) => cmd.execute(session).await,
            Self::Messages(cmd) => cmd.execute(session).await,
            Self::Send(cmd) => cmd.execute(session).await,
            Self::Start(cmd) => cmd.execute(session).await,
            Self::Delete(cmd) => cmd.execute(session).await,
            Self::Watch(cmd) => cmd.execute(session).await,
        }
    }
}

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// The base URL of the Campus Sphere API. Request paths are appended to
    /// it, so any prefix such as `/api` is kept.
    #[arg(long, env = "SPHERE_API_URL", default_value = "http://localhost:8000/api", value_parser = Url::parse)]
    url: Url,

    /// Keep credentials in memory only, so every invocation starts logged
    /// out.
    #[arg(long)]
    no_persist_session: bool,

    #[clap(subcommand)]
    command: Command,
}

fn get_token_storage(args: &Args) -> Arc<dyn Storage> {
    if !args.no_persist_session {
        match storage::File::new("tokens.json").ok_or(Internal::NoProjectDirs) {
            Ok(file_storage) => return Arc::new(file_storage),
            Err(e) => {
                warn!("We need to fall back to in-memory credential storage: {}", e);
            }
        }
    }

    Arc::new(storage::Memory::new())
}

async fn run(args: Args) -> Result<()> {
    let token_storage = get_token_storage(&args);
    if !token_storage.is_persistent() {
        info!("Credentials will not outlive this process");
    }

    let transport = http::Remote::new(args.url)?;
    let api = Arc::new(http::ApiClient::new(token_storage, Arc::new(transport)));
    let session = Arc::new(SessionManager::new(api));
    let tracker = session.track_credentials();

    let result = command::Command::execute(args.command, Arc::clone(&session)).await;
    tracker.abort();

    result
}

#[tokio::main]
async fn main() {
    let logger_env = env_logger::Env::new()
        .filter_or("SPHERE_LOG", "warn")
        .write_style("SPHERE_LOG_STYLE");
    env_logger::Builder::from_env(logger_env).init();

    if let Err(e) = run(Args::parse()).await {
        error!("We encountered an error: {}", e);
        process::exit(1);
    };
}
