//! Line-oriented terminal front-end for the relay.

use std::io::Write;

use chatbot_relay::client::{ChatClient, TurnOutcome};
use chatbot_relay::message::AssembledMessage;
use chatbot_relay::services::{
    models::{MODELS, find_model},
    personas::{DEFAULT_PERSONA, PERSONAS, find_persona},
};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser, Debug)]
#[command(name = "chat", about = "Chat with a persona through the streaming relay")]
struct Args {
    /// Relay root URL
    #[arg(long, default_value = "http://localhost:3000")]
    relay: String,

    /// Persona key (unknown keys become "You are <key>.")
    #[arg(short, long, default_value = DEFAULT_PERSONA)]
    persona: String,

    /// Model short name from --list, or a full upstream model id
    #[arg(short, long)]
    model: Option<String>,

    /// Print personas and models, then exit
    #[arg(long)]
    list: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if args.list {
        println!("Personas:");
        for persona in PERSONAS {
            println!("  {:<12} {}", persona.key, persona.label);
        }
        println!("Models:");
        for model in MODELS {
            println!("  {:<22} {} ({})", model.key, model.name, model.id);
        }
        return Ok(());
    }

    let mut client = ChatClient::new(&args.relay).with_persona(&args.persona);
    if let Some(model) = args.model.as_deref() {
        let id = find_model(model).map(|m| m.id).unwrap_or(model);
        client = client.with_model(id);
    }

    let label = find_persona(client.persona()).map(|p| p.label).unwrap_or(client.persona());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    print!("> ");
    std::io::stdout().flush()?;
    while let Some(line) = lines.next_line().await? {
        let mut renderer = Renderer::new(std::io::stdout(), label);
        let mut write_error = None;
        let outcome = client
            .send(&line, |message| {
                if write_error.is_none() {
                    write_error = renderer.render(message).err();
                }
            })
            .await;
        if let Some(e) = write_error {
            return Err(e.into());
        }

        if !matches!(outcome, TurnOutcome::EmptyInput) {
            println!();
        }
        print!("> ");
        std::io::stdout().flush()?;
    }

    Ok(())
}

/// Prints only the new suffix of each message update.
struct Renderer<'a, W> {
    out: W,
    label: &'a str,
    current: Option<String>,
    printed: usize,
}

impl<'a, W: Write> Renderer<'a, W> {
    fn new(out: W, label: &'a str) -> Self {
        Self { out, label, current: None, printed: 0 }
    }

    fn render(&mut self, message: &AssembledMessage) -> std::io::Result<()> {
        // Content only ever grows, so `printed` stays on a char boundary.
        if self.current.as_deref() != Some(message.id.as_str()) {
            if self.current.is_some() {
                writeln!(self.out)?;
            }
            write!(self.out, "{}: ", self.label)?;
            self.current = Some(message.id.clone());
            self.printed = 0;
        }
        write!(self.out, "{}", &message.content[self.printed..])?;
        self.out.flush()?;
        self.printed = message.content.len();
        Ok(())
    }
}
