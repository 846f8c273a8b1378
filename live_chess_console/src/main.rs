#![forbid(unsafe_code)]
#![cfg_attr(feature = "strict", deny(warnings))]

mod client_main;
mod replay_main;
mod rest;
mod stomp;
mod tui;

use anyhow::Context;
use clap::{ArgMatches, Command, arg};

use live_chess::config::ClientConfig;
use live_chess::game::GameId;


fn main() -> anyhow::Result<()> {
    env_logger::Builder::new()
        .target(env_logger::Target::Stdout)
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let config_arg =
        || arg!(-c --"config" <config_file> "Configuration file: yaml-serialized ClientConfig");
    let matches = Command::new("Live chess")
        .version(clap::crate_version!())
        .about("Live chess console client")
        .subcommand_required(true)
        .subcommand(
            Command::new("client")
                .about("Join a game on the server")
                .arg(arg!(<game_id> "Game ID").value_parser(clap::value_parser!(GameId)))
                .arg(arg!(<username> "User name"))
                .arg(arg!(--"password" <password> "Password").env("LIVE_CHESS_PASSWORD"))
                .arg(config_arg())
                .arg(arg!(--"server-url" <url> "Message broker WebSocket endpoint"))
                .arg(arg!(--"api-url" <url> "Base URL of the REST API")),
        )
        .subcommand(
            Command::new("replay")
                .about("Replay a saved game: JSON as returned by GET /api/games/{id}")
                .arg(arg!(<game_file> "Path to the game file"))
                .arg(config_arg())
                .arg(arg!(--"auto" "Start auto-play right away")),
        )
        .get_matches();

    match matches.subcommand() {
        Some(("client", sub_matches)) => {
            let mut client_config = read_config(sub_matches)?;
            if let Some(url) = sub_matches.get_one::<String>("server-url") {
                client_config.server_url = url.clone();
            }
            if let Some(url) = sub_matches.get_one::<String>("api-url") {
                client_config.api_url = url.clone();
            }
            client_main::run(client_main::ClientCommandConfig {
                client_config,
                game_id: *sub_matches.get_one::<GameId>("game_id").context("Missing game ID")?,
                username: sub_matches
                    .get_one::<String>("username")
                    .context("Missing user name")?
                    .clone(),
                password: sub_matches
                    .get_one::<String>("password")
                    .context("Missing password: pass --password or set LIVE_CHESS_PASSWORD")?
                    .clone(),
            })
        }
        Some(("replay", sub_matches)) => replay_main::run(replay_main::ReplayCommandConfig {
            client_config: read_config(sub_matches)?,
            game_file: sub_matches.get_one::<String>("game_file").context("Missing file")?.clone(),
            auto_play: sub_matches.get_flag("auto"),
        }),
        _ => unreachable!("Exhausted list of subcommands and subcommand_required prevents `None`"),
    }
}

fn read_config(matches: &ArgMatches) -> anyhow::Result<ClientConfig> {
    let Some(filename) = matches.get_one::<String>("config") else {
        return Ok(ClientConfig::default());
    };
    let contents = std::fs::read_to_string(filename)
        .with_context(|| format!("Cannot read config file {filename}"))?;
    serde_yaml::from_str(&contents).with_context(|| format!("Cannot parse config file {filename}"))
}
