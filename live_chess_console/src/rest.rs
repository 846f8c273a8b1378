// HTTP side of the server API: logging in and fetching a game snapshot.

use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::Serialize;

use live_chess::error::FetchError;
use live_chess::game::{Game, GameId};
use live_chess::session::{AuthResponse, Session};


#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

fn login_url(api_url: &str) -> String { format!("{}/auth/login", api_url.trim_end_matches('/')) }

pub fn login(
    http: &Client, api_url: &str, username: &str, password: &str,
) -> anyhow::Result<Session> {
    let response = http
        .post(login_url(api_url))
        .json(&LoginRequest { username, password })
        .send()?
        .error_for_status()?;
    let auth: AuthResponse = response.json()?;
    if auth.token.is_none() {
        let message = auth.message.unwrap_or_else(|| "no token in response".to_owned());
        anyhow::bail!("Login failed: {message}");
    }
    log::info!("Logged in as {} (id {})", auth.username, auth.user_id);
    Ok(Session::from(auth))
}

pub fn fetch_game(
    http: &Client, game_url: &str, game_id: GameId, session: &Session,
) -> Result<Game, FetchError> {
    let mut request = http.get(game_url);
    if let Some(token) = session.token() {
        request = request.bearer_auth(token);
    }
    let response = request.send().map_err(|err| FetchError::Unavailable(err.to_string()))?;
    match response.status() {
        StatusCode::NOT_FOUND => return Err(FetchError::NotFound(game_id)),
        status if !status.is_success() => {
            return Err(FetchError::Unavailable(format!("HTTP status {status}")));
        }
        _ => {}
    }
    let body = response.text().map_err(|err| FetchError::Unavailable(err.to_string()))?;
    parse_game(&body)
}

pub fn parse_game(body: &str) -> Result<Game, FetchError> {
    serde_json::from_str(body).map_err(|err| FetchError::Malformed(err.to_string()))
}
