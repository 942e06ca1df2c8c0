//! Example: Register this machine with a Digital Paper device.
//!
//! The device must be on the same network with its registration screen
//! reachable. It shows a PIN during the exchange; type it when asked.
//!
//! Usage:
//!   cargo run -p dpt-pairing --example pair_with_device -- --host 192.168.0.17
//!   DPT_HOST=digitalpaper.local cargo run -p dpt-pairing --example pair_with_device -- --out creds.json
//!   RUST_LOG=dpt_pairing=debug cargo run -p dpt-pairing --example pair_with_device -- --host 10.0.0.5

use async_trait::async_trait;
use dpt_core::config::PairingConfig;
use dpt_core::error::{Result, TransportError};
use dpt_pairing::{PairingHandler, PairingSession, Transport};
use std::env;
use std::fs;
use std::io::{self, BufRead, Write};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing_subscriber::EnvFilter;

/// Plain HTTP/1.1 client, one connection per request.
struct HttpTransport {
    host: String,
    port: u16,
    timeout: Duration,
}

impl HttpTransport {
    fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            timeout: Duration::from_secs(30),
        }
    }

    async fn request(&self, method: &str, path: &str, body: &[u8]) -> Result<Vec<u8>> {
        tokio::time::timeout(self.timeout, self.exchange(method, path, body))
            .await
            .map_err(|_| TransportError::Http(format!("{} {} timed out", method, path)))?
    }

    async fn exchange(&self, method: &str, path: &str, body: &[u8]) -> Result<Vec<u8>> {
        let mut stream = TcpStream::connect((self.host.as_str(), self.port))
            .await
            .map_err(TransportError::from)?;

        let mut request = format!(
            "{} {} HTTP/1.1\r\nHost: {}:{}\r\nConnection: close\r\nContent-Length: {}\r\n",
            method,
            path,
            self.host,
            self.port,
            body.len()
        );
        if !body.is_empty() {
            request.push_str("Content-Type: application/json\r\n");
        }
        request.push_str("\r\n");

        stream
            .write_all(request.as_bytes())
            .await
            .map_err(TransportError::from)?;
        stream.write_all(body).await.map_err(TransportError::from)?;

        let mut response = Vec::new();
        stream
            .read_to_end(&mut response)
            .await
            .map_err(TransportError::from)?;
        parse_response(&response)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&mut self, path: &str) -> Result<Vec<u8>> {
        self.request("GET", path, &[]).await
    }

    async fn post(&mut self, path: &str, body: &[u8]) -> Result<Vec<u8>> {
        self.request("POST", path, body).await
    }

    async fn put(&mut self, path: &str, body: &[u8]) -> Result<Vec<u8>> {
        self.request("PUT", path, body).await
    }
}

fn parse_response(raw: &[u8]) -> Result<Vec<u8>> {
    let split = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .ok_or_else(|| TransportError::Http("truncated HTTP response".to_string()))?;
    let head = String::from_utf8_lossy(&raw[..split]);
    let body = &raw[split + 4..];

    let mut lines = head.lines();
    let status: u16 = lines
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|code| code.parse().ok())
        .ok_or_else(|| TransportError::Http("malformed status line".to_string()))?;
    if !(200..300).contains(&status) {
        return Err(TransportError::Status(status).into());
    }

    let chunked = lines.any(|line| {
        let line = line.to_ascii_lowercase();
        line.starts_with("transfer-encoding:") && line.contains("chunked")
    });
    if chunked {
        return decode_chunked(body);
    }
    Ok(body.to_vec())
}

fn decode_chunked(mut body: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    loop {
        let line_end = body
            .windows(2)
            .position(|w| w == b"\r\n")
            .ok_or_else(|| TransportError::Http("bad chunk header".to_string()))?;
        let size_text = String::from_utf8_lossy(&body[..line_end]);
        let size_text = size_text.split(';').next().unwrap_or("").trim();
        let size = usize::from_str_radix(size_text, 16)
            .map_err(|_| TransportError::Http("bad chunk size".to_string()))?;
        body = &body[line_end + 2..];
        if size == 0 {
            return Ok(out);
        }
        if body.len() < size + 2 {
            return Err(TransportError::Http("truncated chunk".to_string()).into());
        }
        out.extend_from_slice(&body[..size]);
        body = &body[size + 2..];
    }
}

/// Reads the PIN from stdin.
struct ConsolePrompt;

impl PairingHandler for ConsolePrompt {
    fn on_pin_required(&self) -> String {
        print!("Enter the PIN shown on the device: ");
        let _ = io::stdout().flush();
        let mut line = String::new();
        let _ = io::stdin().lock().read_line(&mut line);
        line.trim().to_string()
    }

    fn on_pairing_started(&self) {
        println!("Registering with device...");
    }

    fn on_pairing_complete(&self) {
        println!("Registration complete.");
    }

    fn on_pairing_failed(&self, error: &dpt_core::error::Error) {
        if error.is_pin_rejected() {
            eprintln!("The PIN was not accepted. Start again and enter the new PIN.");
        } else {
            eprintln!("Registration failed: {}", error);
        }
    }
}

fn usage() {
    println!("Usage:");
    println!("  cargo run -p dpt-pairing --example pair_with_device -- --host <addr> [--port 8080] [--out creds.json]");
    println!("  DPT_HOST=<addr> cargo run -p dpt-pairing --example pair_with_device");
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut host = env::var("DPT_HOST").ok();
    let mut config = PairingConfig::default();
    let mut out: Option<String> = None;
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--host" => host = args.next(),
            "--port" => {
                let port = args.next().and_then(|p| p.parse().ok());
                match port {
                    Some(port) => config = config.with_port(port),
                    None => {
                        eprintln!("--port requires a number.");
                        usage();
                        return Ok(());
                    }
                }
            }
            "--out" | "-o" => out = args.next(),
            "--help" | "-h" => {
                usage();
                return Ok(());
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                usage();
                return Ok(());
            }
        }
    }

    let Some(host) = host else {
        usage();
        return Ok(());
    };

    println!("=== Digital Paper Registration ===");
    println!("Device: {}\n", config.base_url(&host));

    let transport = HttpTransport::new(host, config.port);
    let mut session = PairingSession::new(transport, ConsolePrompt).with_config(config);

    let result = session.pair_until(async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await?;

    let json = serde_json::to_string_pretty(&result)?;
    match out {
        Some(path) => {
            fs::write(&path, json)?;
            println!("Credentials written to {}", path);
        }
        None => println!("{}", json),
    }
    println!("Client id: {}", result.client_id);
    Ok(())
}
