//! Drive the client against a live Redis on 127.0.0.1:6379.
//!
//! Sequential request/reply over a blocking socket: send a command, read
//! whatever the server gives back, feed it to the client, repeat. Run with
//! `cargo run --example pingpong`.

use std::io::{Read, Write};
use std::net::TcpStream;

use redispatch::Client;
use tracing_subscriber::EnvFilter;

fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let mut stream = TcpStream::connect("127.0.0.1:6379")?;
    let mut write_half = stream.try_clone()?;
    let client = Client::new(move |bytes: &[u8]| {
        let _ = write_half.write_all(bytes);
    });

    let mut buf = [0u8; 4096];
    let mut pump = |client: &Client| -> std::io::Result<()> {
        let n = stream.read(&mut buf)?;
        client.feed(&buf[..n]);
        Ok(())
    };

    client.ping(|v| println!("ping: {}", String::from_utf8_lossy(v.as_bytes())));
    pump(&client)?;

    client.set(b"abc", b"123", |v| {
        println!("set: {}", String::from_utf8_lossy(v.as_bytes()))
    });
    pump(&client)?;

    client.get(b"abc", |v| {
        println!("get: {}", String::from_utf8_lossy(v.as_bytes()))
    });
    pump(&client)?;

    client.del(b"abc", |v| println!("del: {}", v.as_integer()));
    pump(&client)?;

    client.hset(b"hash", b"abc", b"123", |v| println!("hset: {}", v.as_integer()));
    pump(&client)?;

    client.hget(b"hash", b"abc", |v| {
        println!("hget: {}", String::from_utf8_lossy(v.as_bytes()))
    });
    pump(&client)?;

    client.hdel(b"hash", b"abc", |v| println!("hdel: {}", v.as_integer()));
    pump(&client)?;

    Ok(())
}
