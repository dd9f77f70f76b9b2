use std::env::args;
use std::process::exit;

use xmpp_client::{Connection, ConnectionConfig};

#[tokio::main]
async fn main() {
    env_logger::init();

    let args: Vec<String> = args().collect();
    if args.len() < 4 || args.len() > 5 {
        println!("Usage: {} <jid> <password> <host> [room]", args[0]);
        exit(1);
    }
    let config = ConnectionConfig::new(&args[1], args[2].clone(), args[3].clone())
        .with_resource("echo_bot");
    let mut conn = Connection::new(config);

    conn.connect().await.unwrap();
    conn.authenticate().await.unwrap();
    conn.bind().await.unwrap();
    conn.establish_session().await.unwrap();
    println!("Online at {}", conn.config().full_jid());
    conn.presence(Some("Echoing messages."), Some("chat"), None)
        .await
        .unwrap();

    let mut own_occupant = None;
    if let Some(room) = args.get(4) {
        if conn.is_muc_supported().await.unwrap() {
            let nick = conn.join(room, "echo_bot", false).await.unwrap();
            println!("Joined {} as {}", room, nick);
            own_occupant = Some(format!("{}/{}", room, nick));
        } else {
            println!("Server does not support multi-user chat");
        }
    }

    // Main loop, processes stanzas
    loop {
        match conn.wait().await {
            Ok(Some(name)) if name == "message" => {
                let message = conn.get_message().unwrap();
                let (Some(from), Some(body)) = (message.header.from.clone(), message.body())
                else {
                    continue;
                };
                if body == "die" {
                    println!("Secret die command triggered by {}", from);
                    break;
                }
                // the room reflects our own messages back
                if own_occupant.as_deref() == Some(from.as_str()) {
                    continue;
                }
                if message.error.is_none() && !message.delayed {
                    conn.message(&from, body).await.unwrap();
                }
            }
            Ok(Some(name)) if name == "iq" => {
                let iq = conn.get_iq().unwrap();
                let is_ping = iq
                    .payload
                    .as_ref()
                    .is_some_and(|p| p.is("ping", xmpp_client::ns::PING));
                if let (true, Some(from), Some(id)) = (is_ping, &iq.header.from, &iq.header.id) {
                    conn.pong(from, id).await.unwrap();
                }
            }
            Ok(_) => (),
            Err(e) => {
                println!("Connection lost: {}", e);
                break;
            }
        }
    }

    conn.disconnect().await.unwrap();
}
