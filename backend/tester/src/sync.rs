use std::time::Duration;

use anyhow::{Context, bail};
use indicatif::{ProgressBar, ProgressStyle};
use progress::level_from_xp;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::{Value, json};

const SHOWN_PLAYERS: usize = 5;

#[derive(Deserialize)]
struct Player {
    #[serde(default)]
    username: Option<String>,

    #[serde(default)]
    xp: Option<i64>,
}

impl Player {
    fn xp(&self) -> i64 {
        self.xp.unwrap_or(0)
    }
}

pub async fn run(base_url: &str, user_id: Option<&str>, xp: i64) -> anyhow::Result<()> {
    let base_url = base_url.trim_end_matches('/');
    let client = Client::new();

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner:.green} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(100));

    spinner.set_message("Fetching leaderboard");
    let response = client
        .get(format!("{base_url}/api/leaderboard"))
        .send()
        .await
        .context("leaderboard request failed")?;
    let players: Vec<Player> = ok(response).await?.json().await?;

    spinner.finish_and_clear();

    println!("Leaderboard: {} players", players.len());
    println!("\nTop {SHOWN_PLAYERS} Players:");
    for (rank, player) in players.iter().take(SHOWN_PLAYERS).enumerate() {
        println!(
            "  {}. {} - {} XP (Level {})",
            rank + 1,
            player.username.as_deref().unwrap_or("Unknown"),
            player.xp(),
            level_from_xp(player.xp())
        );
    }

    let Some(user_id) = user_id else {
        println!("\nPass --user-id to also test /api/addxp");
        return Ok(());
    };

    println!("\nAdding {xp} XP to {user_id}");

    let response = client
        .post(format!("{base_url}/api/addxp"))
        .json(&json!({ "user_id": user_id, "xp": xp }))
        .send()
        .await
        .context("addxp request failed")?;
    let result: Value = ok(response).await?.json().await?;

    println!("Response: {result}");

    Ok(())
}

async fn ok(response: Response) -> anyhow::Result<Response> {
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    bail!("server answered {status}: {body}")
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_player_null_xp() {
        let players: Vec<Player> = serde_json::from_value(json!([
            { "username": "a", "xp": 40 },
            { "username": null, "xp": null },
            {}
        ]))
        .unwrap();

        assert_eq!(players[0].xp(), 40);
        assert_eq!(players[1].xp(), 0);
        assert_eq!(players[1].username, None);
        assert_eq!(players[2].xp(), 0);
    }
}
