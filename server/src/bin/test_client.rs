use clap::Parser;
use shared::protocol::{self, Payload};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

/// Guesses tried in order, wrapping around.
const GUESSES: [&str; 8] = [
    "crane", "slate", "pious", "mound", "light", "boxer", "fjord", "waltz",
];

#[derive(Parser, Debug)]
#[command(author, version, about = "Bot that plays one match against a running server")]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:8080")]
    server: String,

    /// Nickname to register with
    #[arg(short, long, default_value = "bot")]
    nickname: String,
}

async fn send_line(
    writer: &mut tokio::net::tcp::OwnedWriteHalf,
    payload: &Payload,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut frame = protocol::encode(payload)?;
    frame.push(b'\n');
    writer.write_all(&frame).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let stream = TcpStream::connect(&args.server).await?;
    println!("Connected to {}", args.server);

    let (reader, mut writer) = stream.into_split();
    writer
        .write_all(format!("{}\n", args.nickname).as_bytes())
        .await?;

    let mut lines = BufReader::new(reader).lines();
    let mut my_id = None;
    let mut next_guess = 0;

    while let Some(line) = lines.next_line().await? {
        let payload = match protocol::decode(line.as_bytes()) {
            Ok(payload) => payload,
            Err(e) => {
                println!("<- {} (undecodable: {})", line, e);
                continue;
            }
        };
        println!("<- {:?}", payload);

        match payload {
            Payload::PlayerInfo { id, .. } => my_id = Some(id),
            Payload::RoundStart { player, .. } if Some(&player.id) == my_id.as_ref() => {
                let word = GUESSES[next_guess % GUESSES.len()];
                next_guess += 1;
                println!("-> guess {}", word);
                send_line(
                    &mut writer,
                    &Payload::Typing {
                        player: None,
                        word: word[..2].to_string(),
                    },
                )
                .await?;
                send_line(
                    &mut writer,
                    &Payload::Guess {
                        word: word.to_string(),
                    },
                )
                .await?;
            }
            Payload::GameOver { .. } => {
                println!("-> declining replay");
                send_line(&mut writer, &Payload::PlayAgain { confirm: false }).await?;
            }
            Payload::QueueFull {} => println!("Server queue is full"),
            _ => {}
        }
    }

    println!("Server closed the connection");
    Ok(())
}
