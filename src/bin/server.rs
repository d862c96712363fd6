use futures::executor::block_on;
use log::{error, info, LevelFilter};
use std::env;
use std::net::SocketAddrV4;
use std::str::FromStr;
use twelve_pieces::{start_server, ServerConfig};

fn main() {
    env_logger::builder()
        .filter_module("twelve_pieces", LevelFilter::Trace)
        .init();
    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        println!("usage: ./server {{ipv4 address}}, example: ./server 127.0.0.1:8080");
        return;
    }
    let address = match SocketAddrV4::from_str(&args[1]) {
        Ok(address) => address,
        Err(e) => {
            error!("bad ip address {}: {e}", args[1]);
            return;
        }
    };
    let config = ServerConfig {
        address,
        ..ServerConfig::default()
    };
    info!("server started");
    if let Err(e) = block_on(start_server(config)) {
        error!("server ended in error: {e}");
    }
}
