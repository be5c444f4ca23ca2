use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use frames::{Data, Frame, Status, syscall};
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use uuid::Uuid;

type WsStream = tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("websocket error: {0}")]
    Ws(Box<tokio_tungstenite::tungstenite::Error>),
    #[error("websocket closed")]
    WsClosed,
    #[error("frame decode failed: {0}")]
    Decode(#[from] frames::CodecError),
    #[error("timed out waiting for websocket frame")]
    Timeout,
    #[error("server returned error for {syscall}: {message}")]
    ServerError { syscall: String, message: String },
    #[error("element is missing a string `{0}`")]
    MissingField(&'static str),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl From<tokio_tungstenite::tungstenite::Error> for CliError {
    fn from(error: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Ws(Box::new(error))
    }
}

#[derive(Parser, Debug)]
#[command(name = "canvas-cli", about = "Canvas relay REST and websocket CLI")]
struct Cli {
    #[arg(long, env = "CANVAS_BASE_URL", default_value = "http://127.0.0.1:3000")]
    base_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check that the relay is up.
    Ping,
    /// Print a room's elements in paint order.
    Snapshot { room: String },
    /// Insert or replace one element from a JSON object.
    Upsert {
        room: String,
        #[arg(help = "Element JSON, or - for stdin")]
        element: String,
    },
    /// Remove one element.
    Delete { room: String, id: String },
    /// Remove every element in a room.
    Clear { room: String },
    /// Replace the room's editor allow-list.
    Editors(EditorsArgs),
    /// Join a room and print every frame as a JSON line.
    Watch(WatchArgs),
    /// Upsert JSONL elements over a websocket session.
    Stream(StreamArgs),
}

#[derive(Args, Debug)]
struct EditorsArgs {
    room: String,
    /// Labels allowed to edit.
    labels: Vec<String>,
    #[arg(long, conflicts_with = "labels", help = "Remove the restriction entirely")]
    open: bool,
}

#[derive(Args, Debug)]
struct WatchArgs {
    room: String,
    #[arg(long, default_value = "canvas-cli")]
    label: String,
}

#[derive(Args, Debug)]
struct StreamArgs {
    room: String,
    #[arg(long, default_value = "-", help = "Input file path, or - for stdin")]
    input: String,
    #[arg(long, default_value = "canvas-cli")]
    label: String,
    #[arg(long, help = "Send without waiting for each reply")]
    no_ack: bool,
    #[arg(long, default_value_t = 1000)]
    progress_every: usize,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    let base_url = cli.base_url.trim_end_matches('/').to_owned();

    match cli.command {
        Command::Ping => run_ping(&base_url).await,
        Command::Snapshot { room } => {
            let elements = api_request(&base_url, reqwest::Method::GET, &elements_path(&room), None).await?;
            print_json(&elements)
        }
        Command::Upsert { room, element } => run_upsert(&base_url, &room, &element).await,
        Command::Delete { room, id } => {
            let path = format!("{}/{id}", elements_path(&room));
            api_request(&base_url, reqwest::Method::DELETE, &path, None).await?;
            eprintln!("deleted {id}");
            Ok(())
        }
        Command::Clear { room } => {
            api_request(&base_url, reqwest::Method::DELETE, &elements_path(&room), None).await?;
            eprintln!("cleared {room}");
            Ok(())
        }
        Command::Editors(args) => run_editors(&base_url, args).await,
        Command::Watch(args) => run_watch(&base_url, args).await,
        Command::Stream(args) => run_stream(&base_url, args).await,
    }
}

async fn run_ping(base_url: &str) -> Result<(), CliError> {
    let response = reqwest::Client::new().get(format!("{base_url}/healthz")).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(CliError::ServerError {
            syscall: format!("HTTP {}", status.as_u16()),
            message: "health check failed".to_owned(),
        });
    }
    println!("ok");
    Ok(())
}

async fn run_upsert(base_url: &str, room: &str, element: &str) -> Result<(), CliError> {
    let raw = if element == "-" { io::read_to_string(io::stdin())? } else { element.to_owned() };
    let body = serde_json::from_str::<Value>(&raw)?;
    let id = element_id(&body)?.to_owned();

    let path = format!("{}/{id}", elements_path(room));
    api_request(base_url, reqwest::Method::PUT, &path, Some(body)).await?;
    eprintln!("upserted {id}");
    Ok(())
}

async fn run_editors(base_url: &str, args: EditorsArgs) -> Result<(), CliError> {
    let editors = if args.open { Value::Null } else { json!(args.labels) };
    let path = format!("/api/rooms/{}/editors", args.room);
    api_request(base_url, reqwest::Method::PUT, &path, Some(json!({ "editors": editors }))).await?;
    eprintln!("updated editors for {}", args.room);
    Ok(())
}

async fn run_watch(base_url: &str, args: WatchArgs) -> Result<(), CliError> {
    let mut stream = join(base_url, &args.room, &args.label).await?;
    loop {
        let Some(message) = stream.next().await else {
            return Ok(());
        };
        match message? {
            Message::Binary(bytes) => {
                let frame = frames::decode_frame(&bytes)?;
                println!("{}", serde_json::to_string(&frame)?);
            }
            Message::Close(_) => return Ok(()),
            _ => {}
        }
    }
}

async fn run_stream(base_url: &str, args: StreamArgs) -> Result<(), CliError> {
    let mut stream = join(base_url, &args.room, &args.label).await?;

    let reader: Box<dyn BufRead> = if args.input == "-" {
        Box::new(BufReader::new(io::stdin()))
    } else {
        Box::new(BufReader::new(File::open(&args.input)?))
    };

    let mut sent = 0_usize;
    let mut skipped = 0_usize;
    for line in reader.lines() {
        let Some(element) = parse_element_line(&line?)? else {
            skipped = skipped.saturating_add(1);
            continue;
        };

        let req = Frame::request(syscall::ELEMENT_UPSERT, Data::new())
            .with_room_id(args.room.clone())
            .with_data("element", element);
        let req_id = req.id;
        stream.send(Message::Binary(frames::encode_frame(&req).into())).await?;
        if !args.no_ack {
            wait_for_terminal_response(&mut stream, req_id, syscall::ELEMENT_UPSERT).await?;
        }

        sent = sent.saturating_add(1);
        if args.progress_every > 0 && sent.is_multiple_of(args.progress_every) {
            eprintln!("streamed {sent} elements...");
        }
    }

    eprintln!(
        "stream complete: room={} upserted={} skipped={} acked={}",
        args.room, sent, skipped, !args.no_ack
    );
    stream.close(None).await?;
    Ok(())
}

/// Connect, wait for the greeting, and join `room` as `label`.
async fn join(base_url: &str, room: &str, label: &str) -> Result<WsStream, CliError> {
    let (mut stream, _) = connect_async(ws_url(base_url)?).await?;
    wait_for_session_connected(&mut stream).await?;

    let join = Frame::request(syscall::ROOM_JOIN, Data::new())
        .with_room_id(room)
        .with_data("label", label);
    let join_id = join.id;
    stream.send(Message::Binary(frames::encode_frame(&join).into())).await?;
    let reply = wait_for_terminal_response(&mut stream, join_id, syscall::ROOM_JOIN).await?;

    let count = reply.data.get("elements").and_then(Value::as_array).map_or(0, Vec::len);
    eprintln!("joined {room} with {count} elements");
    Ok(stream)
}

async fn api_request(
    base_url: &str,
    method: reqwest::Method,
    path: &str,
    body: Option<Value>,
) -> Result<Value, CliError> {
    let request = reqwest::Client::new().request(method, format!("{base_url}{path}"));
    let request = if let Some(json) = body { request.json(&json) } else { request };

    let response = request.send().await?;
    let status = response.status();
    let value = response.json::<Value>().await.unwrap_or(Value::Null);

    if !status.is_success() {
        return Err(CliError::ServerError {
            syscall: format!("HTTP {}", status.as_u16()),
            message: value.to_string(),
        });
    }

    Ok(value)
}

fn elements_path(room: &str) -> String {
    format!("/api/rooms/{room}/elements")
}

fn ws_url(base_url: &str) -> Result<String, CliError> {
    if let Some(rest) = base_url.strip_prefix("http://") {
        return Ok(format!("ws://{rest}/api/ws"));
    }
    if let Some(rest) = base_url.strip_prefix("https://") {
        return Ok(format!("wss://{rest}/api/ws"));
    }

    Err(CliError::InvalidBaseUrl(base_url.to_owned()))
}

async fn wait_for_session_connected(stream: &mut WsStream) -> Result<(), CliError> {
    loop {
        let frame = recv_next(stream, Duration::from_secs(5)).await?;
        if frame.syscall == syscall::SESSION_CONNECTED {
            return Ok(());
        }
    }
}

async fn wait_for_terminal_response(
    stream: &mut WsStream,
    request_id: Uuid,
    syscall: &str,
) -> Result<Frame, CliError> {
    loop {
        let frame = recv_next(stream, Duration::from_secs(15)).await?;
        if frame.parent_id != Some(request_id) || frame.syscall != syscall || !frame.status.is_terminal() {
            continue;
        }
        if frame.status == Status::Error {
            return Err(CliError::ServerError {
                syscall: frame.syscall,
                message: frame
                    .data
                    .get(frames::FRAME_MESSAGE)
                    .and_then(Value::as_str)
                    .unwrap_or("unknown websocket error")
                    .to_owned(),
            });
        }
        return Ok(frame);
    }
}

async fn recv_next(stream: &mut WsStream, timeout: Duration) -> Result<Frame, CliError> {
    let fut = async {
        loop {
            let Some(message) = stream.next().await else {
                return Err(CliError::WsClosed);
            };
            match message? {
                Message::Binary(bytes) => return frames::decode_frame(&bytes).map_err(CliError::from),
                Message::Close(_) => return Err(CliError::WsClosed),
                _ => {}
            }
        }
    };

    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| CliError::Timeout)?
}

fn element_id(body: &Value) -> Result<&str, CliError> {
    body.get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .ok_or(CliError::MissingField("id"))
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

/// Parse one JSONL line into an element body. Blank lines, non-objects, and
/// objects without an `id` and `type` are skipped.
fn parse_element_line(line: &str) -> Result<Option<Value>, CliError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let value = serde_json::from_str::<Value>(trimmed)?;
    let Some(map) = value.as_object() else {
        return Ok(None);
    };
    let has = |key: &str| map.get(key).and_then(Value::as_str).is_some_and(|s| !s.is_empty());
    if !has("id") || !has("type") {
        return Ok(None);
    }
    Ok(Some(value))
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
