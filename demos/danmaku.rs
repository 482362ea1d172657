//! Danmaku printer - watch one live room from the terminal.
//!
//! This example demonstrates:
//! - Building a session with the builder pattern
//! - Registering a synchronous handler (`DANMU_MSG`)
//! - Registering a suspending handler (`SEND_GIFT`)
//! - Telling a missing room apart from a dropped connection
//!
//! # Running
//!
//! ```text
//! LOGLEVEL=debug cargo run --example danmaku -- 21452505
//! ```

use bililive_client::{commands, LiveError, LiveRoom, Message};
use clap::Parser;
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

/// Print danmaku and gifts of a live room.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Room id (canonical or short)
    room_id: u64,
}

/// Fields of a `SEND_GIFT` message this example prints.
#[derive(Deserialize, Debug)]
struct Gift {
    uname: String,
    action: String,
    #[serde(rename = "giftName")]
    gift_name: String,
    num: u64,
    timestamp: i64,
}

#[derive(Deserialize, Debug)]
struct GiftMessage {
    data: Gift,
}

fn print_danmaku(msg: Message) -> bililive_client::Result<()> {
    let json = msg.json()?;
    let info = &json["info"];
    println!(
        "[{}] {}({}): {}",
        info[9]["ts"], info[2][1], info[2][0], info[1]
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let level = std::env::var("LOGLEVEL").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(level.to_lowercase()))
        .init();

    let mut room = LiveRoom::builder(args.room_id)
        .on(commands::DANMU_MSG, print_danmaku)
        .on_async(commands::SEND_GIFT, |msg: Message| async move {
            let gift: GiftMessage = msg.decode()?;
            let gift = gift.data;
            println!(
                "[{}] {} {} {} x{}",
                gift.timestamp, gift.uname, gift.action, gift.gift_name, gift.num
            );
            Ok::<_, LiveError>(())
        })
        .build();

    match room.run().await {
        Err(LiveError::RoomNotFound(id)) => {
            eprintln!("room {} does not exist", id);
            std::process::exit(1);
        }
        Err(LiveError::RoomDisconnected(id)) => {
            tracing::info!(room_id = id, "room disconnected");
            Ok(())
        }
        Err(e) => Err(e.into()),
        Ok(()) => Ok(()),
    }
}
