//! Line-driven text front end.
//!
//! Reads commands from stdin while printing client events as they arrive.
//! All game logic lives in [`GameClient`]; this module only parses input and
//! prints.

use anyhow::Result;
use fzmahjong_tiles::tile_image_path;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, instrument};

use crate::actions::{Action, Resolution};
use crate::client::{ClientEvent, GameClient};
use crate::presentation::{format_panel, format_prompt, render_view, status_line};
use crate::session_store::KeyValueStorage;

const HELP: &str = "\
Commands:
  show                 redraw the table
  d <n|tileId>         discard the n-th hand tile (or by id)
  k <n|tileId>         concealed kong on a hand tile
  <action>             chi peng gang hu pass an-gang replace-flower open-gold continue end
  <n>                  pick option n of the open prompt
  cancel               close the open prompt
  x                    hide the hand result
  images               list image paths for the hand
  sync                 ask the server to resend the table
  leave                leave the room and forget the session
  quit                 exit, keeping the session for restore
  help                 this text";

/// How the shell ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellExit {
    /// User left the room.
    Left,
    /// User quit; the session stays saved.
    Quit,
    /// Input closed or the channel ended.
    Ended,
}

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Input {
    Show,
    Discard(String),
    Kong(String),
    Act(Action),
    Choose(usize),
    Cancel,
    Dismiss,
    Images,
    Sync,
    Leave,
    Quit,
    Help,
    Unknown(String),
}

fn parse_input(line: &str) -> Option<Input> {
    let mut words = line.split_whitespace();
    let head = words.next()?;
    let arg = words.next().map(str::to_string);
    let input = match (head, arg) {
        ("show" | "s", _) => Input::Show,
        ("d", Some(tile)) => Input::Discard(tile),
        ("k", Some(tile)) => Input::Kong(tile),
        ("cancel", _) => Input::Cancel,
        ("x", _) => Input::Dismiss,
        ("images", _) => Input::Images,
        ("sync", _) => Input::Sync,
        ("leave", _) => Input::Leave,
        ("quit" | "q", _) => Input::Quit,
        ("help" | "?", _) => Input::Help,
        (other, _) => match (other.parse::<usize>(), other.parse::<Action>()) {
            (Ok(n), _) => Input::Choose(n),
            (_, Ok(action)) => Input::Act(action),
            _ => Input::Unknown(other.to_string()),
        },
    };
    Some(input)
}

/// Runs the shell until the user leaves or quits.
#[instrument(skip(client))]
pub async fn run_shell<S: KeyValueStorage>(client: &mut GameClient<S>) -> Result<ShellExit> {
    info!("Starting text shell");
    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    return Ok(ShellExit::Ended);
                };
                let Some(input) = parse_input(&line) else {
                    continue;
                };
                debug!(?input, "Shell input");
                if let Some(exit) = handle_input(client, input)? {
                    return Ok(exit);
                }
            }
            event = client.next_event() => {
                let Some(event) = event else {
                    return Ok(ShellExit::Ended);
                };
                if print_event(client, event) {
                    return Ok(ShellExit::Ended);
                }
            }
        }
    }
}

fn handle_input<S: KeyValueStorage>(
    client: &mut GameClient<S>,
    input: Input,
) -> Result<Option<ShellExit>> {
    match input {
        Input::Show => print_table(client),
        Input::Discard(tile) => {
            let id = resolve_tile_ref(client, &tile);
            let resolution = client.discard(&id);
            report(client, resolution);
        }
        Input::Kong(tile) => {
            let id = resolve_tile_ref(client, &tile);
            let resolution = client.kong_with(&id);
            report(client, resolution);
        }
        Input::Act(action) => {
            let resolution = client.select(action);
            report(client, resolution);
        }
        Input::Choose(n) => match n.checked_sub(1) {
            Some(index) => {
                let resolution = client.choose(index);
                report(client, resolution);
            }
            None => println!("Options start at 1"),
        },
        Input::Cancel => client.cancel_prompt(),
        Input::Dismiss => client.dismiss_result(),
        Input::Images => {
            let base = client.config().tile_image_base().clone();
            if let Some(reconciler) = client.reconciler() {
                for tile in reconciler.my_hand() {
                    let path = tile_image_path(&base, tile.kind(), i64::from(tile.rank()));
                    println!("{} {}", tile, path);
                }
            }
        }
        Input::Sync => {
            if !client.sync() {
                println!("Not connected");
            }
        }
        Input::Leave => {
            client.leave()?;
            println!("Left the room");
            return Ok(Some(ShellExit::Left));
        }
        Input::Quit => {
            client.disconnect();
            return Ok(Some(ShellExit::Quit));
        }
        Input::Help => println!("{HELP}"),
        Input::Unknown(word) => println!("Unknown command: {word} (try help)"),
    }
    Ok(None)
}

/// Accepts a 1-based hand position or a raw tile id.
fn resolve_tile_ref<S: KeyValueStorage>(client: &GameClient<S>, tile: &str) -> String {
    let by_index = tile.parse::<usize>().ok().and_then(|n| {
        let hand = client.reconciler()?.my_hand();
        hand.get(n.checked_sub(1)?).map(|t| t.id().to_string())
    });
    by_index.unwrap_or_else(|| tile.to_string())
}

fn report<S: KeyValueStorage>(client: &GameClient<S>, resolution: Resolution) {
    match resolution {
        Resolution::Send(command) => println!("-> {}", command.destination()),
        Resolution::Choose(prompt) => println!("Choose one:\n{}", format_prompt(&prompt)),
        Resolution::Stale => println!("Selection is out of date, please choose again"),
        Resolution::Unavailable(reason) => println!("{reason}"),
    }
    if client.pending_prompt().is_none() {
        let panel = format_panel(&client.panel());
        if !panel.is_empty() {
            println!("{panel}");
        }
    }
}

fn print_table<S: KeyValueStorage>(client: &GameClient<S>) {
    match client.reconciler() {
        Some(reconciler) => println!("{}", render_view(reconciler)),
        None => println!("Not in a room"),
    }
    let panel = format_panel(&client.panel());
    if !panel.is_empty() {
        println!("{panel}");
    }
}

/// Prints an event. Returns true when the shell should stop.
fn print_event<S: KeyValueStorage>(client: &GameClient<S>, event: ClientEvent) -> bool {
    match event {
        ClientEvent::ViewUpdated => {
            if let Some(reconciler) = client.reconciler() {
                println!("{}", status_line(reconciler));
            }
            let panel = format_panel(&client.panel());
            if !panel.is_empty() {
                println!("{panel}");
            }
        }
        ClientEvent::Connection(state) => println!("[{state}]"),
        ClientEvent::ResultShown(result) => {
            println!("*** {} {} ***", result.player_name(), result.label());
        }
        ClientEvent::ResultExpired => {}
        ClientEvent::GameOver => println!("Game Over"),
        ClientEvent::Closed => {
            println!("Connection ended");
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_input() {
        assert_eq!(parse_input("  "), None);
        assert_eq!(parse_input("d 3"), Some(Input::Discard("3".to_string())));
        assert_eq!(parse_input("2"), Some(Input::Choose(2)));
        assert_eq!(parse_input("chi"), Some(Input::Act(Action::Chi)));
        assert_eq!(parse_input("open-gold"), Some(Input::Act(Action::OpenGold)));
        assert_eq!(
            parse_input("dance"),
            Some(Input::Unknown("dance".to_string()))
        );
    }
}
