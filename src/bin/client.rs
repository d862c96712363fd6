use anyhow::Result;
use async_std::channel::bounded;
use async_std::io::{stdin, BufReader};
use async_std::net::TcpStream;
use async_std::task;
use async_std::task::block_on;
use futures::future::ready;
use futures::{stream, stream_select, AsyncBufReadExt, StreamExt};
use log::{error, info, warn, LevelFilter};
use std::env;
use std::str::FromStr;
use std::time::Duration;
use twelve_pieces::{
    spawn_search, ClickOutcome, Conn, GameResult, GameState, Messages, Notice, Player, Position,
    Received, RemoteSession, Responses, RuleSet, SearchConfig, SearchOutcome, SessionError,
};

const PING_INTERVAL: Option<Duration> = Some(Duration::from_secs(5));
const MAX_DATA_SIZE: u32 = 1024 * 64;
/// the computer always plays the second side
const COMPUTER: Player = Player::Two;

enum Event {
    Input(String),
    Server(Received<Responses>),
    Computer(GameState, Option<SearchOutcome>),
}

enum Command {
    CreateRoom(String),
    JoinRoom(String, String),
    Leave,
    Click(Position),
    Computer(bool),
    Board,
    Exit,
}

fn main() {
    env_logger::builder()
        .filter_module("twelve_pieces", LevelFilter::Info)
        .init();
    if let Err(e) = block_on(run_client()) {
        error!("client stopped on error {}", e);
    }
}

async fn run_client() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    match args.get(1) {
        None => {
            println!("no server given, playing against the computer");
            play(None).await
        }
        Some(address) => {
            let tcp = TcpStream::connect(address.as_str()).await?;
            info!("connected to {address}");
            play(Some(Conn::init(tcp, PING_INTERVAL, MAX_DATA_SIZE))).await
        }
    }
}

async fn play(conn: Option<Conn<Messages, Responses>>) -> Result<()> {
    let mut session = RemoteSession::new(
        conn.as_ref().map(|conn| conn.sender().clone()),
        RuleSet::default(),
    );
    let (computer_sender, computer_receiver) = bounded(1);
    let input = BufReader::new(stdin())
        .lines()
        .filter_map(|line| ready(line.ok()))
        .map(Event::Input)
        .boxed();
    let server = match conn {
        Some(conn) => conn.map(Event::Server).boxed(),
        None => stream::pending::<Event>().boxed(),
    };
    let computer = computer_receiver
        .map(|(origin, outcome)| Event::Computer(origin, outcome))
        .boxed();
    let mut events = stream_select!(input, server, computer);
    let mut computer_on = true;
    let mut searching = false;

    print_help();
    print_board(&session);
    while let Some(event) = events.next().await {
        match event {
            Event::Input(line) => match parse_command(&line) {
                Some(Command::Exit) => break,
                Some(command) => {
                    if let Err(e) = run_command(command, &mut session, &mut computer_on).await {
                        println!("{e}");
                    }
                }
                None => print_help(),
            },
            Event::Server(Received::Response(rsp)) => {
                match session.receive(rsp).await {
                    Ok(Some(notice)) => print_notice(&notice, &session, computer_on),
                    Ok(None) => {}
                    Err(e) => println!("{e}"),
                }
            }
            Event::Server(Received::Ping) => {}
            Event::Server(Received::Error(e)) => {
                error!("connection error: {e}");
                break;
            }
            Event::Server(Received::RemoteError(e)) => {
                error!("server side connection error: {e}");
                break;
            }
            Event::Computer(origin, outcome) => {
                searching = false;
                // stale when the position changed while searching
                let current = computer_on && &origin == session.game();
                if let (true, Some(SearchOutcome { best: Some(mv), .. })) = (current, outcome) {
                    println!("computer plays {} -> {}", mv.from, mv.to);
                    match session.apply_move(&mv).await {
                        Ok(_) => print_board(&session),
                        Err(e) => warn!("computer move rejected: {e}"),
                    }
                }
            }
        }
        if computer_on && !searching && computer_to_move(&session) {
            searching = true;
            let origin = session.game().clone();
            let handle = spawn_search(origin.clone(), SearchConfig::default());
            let sender = computer_sender.clone();
            task::spawn(async move {
                let outcome = handle.result().await;
                let _ = sender.send((origin, outcome)).await;
            });
        }
    }
    println!("bye");
    Ok(())
}

fn computer_to_move(session: &RemoteSession) -> bool {
    let game = session.game();
    session.single_player_eligible() && !game.is_over() && game.current_player() == COMPUTER
}

async fn run_command(
    command: Command,
    session: &mut RemoteSession,
    computer_on: &mut bool,
) -> Result<(), SessionError> {
    match command {
        Command::CreateRoom(name) => session.create_room(&name).await,
        Command::JoinRoom(code, name) => session.join_room(&code, &name).await,
        Command::Leave => {
            session.leave_room().await?;
            println!("left room");
            Ok(())
        }
        Command::Click(pos) => {
            if *computer_on && computer_to_move(session) {
                println!("the computer is thinking");
                return Ok(());
            }
            match session.click(pos).await? {
                ClickOutcome::Selected(_) => println!("selected {pos}"),
                ClickOutcome::Moved(_) => print_board(session),
                ClickOutcome::Rejected(_, e) => println!("{e}"),
                ClickOutcome::Ignored => println!("nothing to do at {pos}"),
            }
            Ok(())
        }
        Command::Computer(on) => {
            *computer_on = on;
            println!("computer opponent {}", if on { "on" } else { "off" });
            Ok(())
        }
        Command::Board => {
            print_board(session);
            Ok(())
        }
        Command::Exit => Ok(()),
    }
}

fn parse_command(line: &str) -> Option<Command> {
    let words: Vec<&str> = line.split_whitespace().collect();
    match words.as_slice() {
        ["new", "room", name @ ..] if !name.is_empty() => Some(Command::CreateRoom(name.join(" "))),
        ["join", code, name @ ..] if !name.is_empty() => {
            Some(Command::JoinRoom(code.to_string(), name.join(" ")))
        }
        ["leave"] => Some(Command::Leave),
        ["ai", "on"] => Some(Command::Computer(true)),
        ["ai", "off"] => Some(Command::Computer(false)),
        ["board"] => Some(Command::Board),
        ["exit"] => Some(Command::Exit),
        [row, col] => match (u8::from_str(row), u8::from_str(col)) {
            (Ok(row), Ok(col)) => Some(Command::Click(Position::new(row, col))),
            _ => None,
        },
        _ => None,
    }
}

fn print_help() {
    println!(
        "commands:\n\
        - new room 'name'\n\
        - join 'code' 'name'\n\
        - leave\n\
        - 'row' 'col' (select or move)\n\
        - ai on|off\n\
        - board\n\
        - exit"
    );
}

fn print_board(session: &RemoteSession) {
    let game = session.game();
    println!("{}", game.board);
    match game.result {
        GameResult::InProgress => {
            let mut status = format!("{} to move", game.current_player());
            if game.sequential_capture() {
                status.push_str(", continue capturing");
            } else if game.turn.must_capture {
                status.push_str(", capture is mandatory");
            }
            println!("{status}");
        }
        GameResult::Win(player) => println!("game over, {player} wins"),
        GameResult::Draw => println!("game over, draw"),
    }
}

fn print_notice(notice: &Notice, session: &RemoteSession, computer_on: bool) {
    match notice {
        Notice::RoomCreated(code) => {
            println!("room created! code: {code}, waiting for an opponent")
        }
        Notice::RoomJoined(code) => {
            if let Some(me) = session.me() {
                println!("joined room {code}, you are {}", me.seat.player());
            }
            print_board(session);
        }
        Notice::OpponentJoined(player) => {
            println!("{} joins the room", player.name);
            print_board(session);
        }
        Notice::StateUpdated => print_board(session),
        Notice::OpponentDisconnected => {
            if computer_on {
                println!("opponent left, the computer takes over");
            } else {
                println!("opponent left");
            }
        }
        Notice::Failed(e) => println!("{e}"),
    }
}
