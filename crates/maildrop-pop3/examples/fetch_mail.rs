#![allow(clippy::expect_used, clippy::uninlined_format_args)]
//! Example: list and preview a maildrop over POP3.
//!
//! Connects with opportunistic TLS (STLS when the server advertises
//! it), negotiates authentication automatically, prints a mailbox
//! summary and the headers of the newest message.
//!
//! ## Running
//!
//! ```bash
//! RUST_LOG=maildrop_pop3=debug cargo run --package maildrop-pop3 --example fetch_mail
//! ```

use std::io::{self, Write};

use maildrop_pop3::{Credential, MechanismRegistry, SessionProfile, create_session};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    print!("POP3 server: ");
    io::stdout().flush()?;
    let mut host = String::new();
    io::stdin().read_line(&mut host)?;
    let host = host.trim();

    print!("User name: ");
    io::stdout().flush()?;
    let mut username = String::new();
    io::stdin().read_line(&mut username)?;
    let username = username.trim();

    print!("Password: ");
    io::stdout().flush()?;
    let mut password = String::new();
    io::stdin().read_line(&mut password)?;
    let password = password.trim();

    let mut profile = SessionProfile::new(host);
    profile.username = Some(username.to_string());

    let credential = Credential::new(username, password);
    let registry = MechanismRegistry::builtin();

    println!("\nConnecting to {}...", host);
    let mut session = create_session(&profile, &credential, &registry).await?;
    println!("✓ Authenticated as {}", session.authority());

    let (_, stat) = session.stat().await?;
    let stat = stat.expect("STAT succeeded");
    println!("{} message(s), {} octets total\n", stat.count, stat.octets);

    let (_, listings) = session.list().await?;
    for listing in &listings {
        println!("  #{}: {} octets", listing.number, listing.octets);
    }

    if let Some(newest) = listings.last() {
        println!("\nHeaders of message {}:", newest.number);
        let (result, body) = session.top(newest.number, 0).await?;
        match body {
            Some(body) => print!("{}", String::from_utf8_lossy(body.as_bytes())),
            None => println!("TOP rejected: {}", result.text()),
        }
    }

    session.quit().await?;
    println!("\n✓ Logged out");

    Ok(())
}
