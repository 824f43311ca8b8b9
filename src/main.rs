//! Primo - Cubetto Playset radio tool
//!
//! Drives either end of the playset link over an emulated radio and
//! inspects packets on the command line.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use primo::config::{self, Config};
use primo::endpoint::{Interface, Robot, RobotEvent};
use primo::protocol::{
    self, AckMessage, ChecksumKind, CommandsMessage, FunctionInstructions, MainInstructions,
    Packet, ACK_MESSAGE_LEN, COMMANDS_MESSAGE_LEN,
};
use primo::radio::UdpRadio;

/// Primo - Cubetto playset radio tool
#[derive(Parser)]
#[command(name = "primo")]
#[command(author = "Primo Playset Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Send, receive and inspect Cubetto playset radio packets", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Override the configured checksum (sum8, xor8)
    #[arg(long, global = true)]
    checksum: Option<ChecksumKind>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Act as the Interface: send one program and wait for its ack
    Interface {
        /// Main sequence, e.g. "FFLXR" (F forward, L left, R right, X function)
        #[arg(short, long)]
        main: String,

        /// Function subroutine, same letters
        #[arg(short, long, default_value = "")]
        function: String,

        /// Session id to use instead of a random one
        #[arg(short, long, value_parser = parse_u32)]
        session: Option<u32>,
    },

    /// Act as the Robot: acknowledge programs until interrupted
    Robot {
        /// Stop after this many new programs
        #[arg(short = 'n', long)]
        count: Option<u64>,
    },

    /// Encode a packet and print it as hex
    Encode {
        #[command(subcommand)]
        packet: EncodeCommand,
    },

    /// Decode a hex packet and print it as JSON
    Decode {
        /// Packet bytes as hex
        hex: String,
    },

    /// Show current configuration
    Config {
        /// Generate sample configuration
        #[arg(long)]
        generate: bool,

        /// Output path for generated config
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show protocol constants
    Info,
}

#[derive(Subcommand)]
enum EncodeCommand {
    /// Interface -> Robot program
    Commands {
        #[arg(short, long, value_parser = parse_u32)]
        session: u32,

        #[arg(short, long, default_value = "")]
        main: String,

        #[arg(short, long, default_value = "")]
        function: String,
    },

    /// Robot -> Interface acknowledgment
    Ack {
        #[arg(short, long, value_parser = parse_u32)]
        session: u32,

        #[arg(short = 'n', long)]
        counter: u32,
    },
}

/// Accept decimal or 0x-prefixed hex
fn parse_u32(text: &str) -> Result<u32, String> {
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => text.parse(),
    };
    parsed.map_err(|e| format!("invalid number {:?}: {}", text, e))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = if let Some(config_path) = &cli.config {
        Config::load(config_path)?
    } else {
        Config::load_default().unwrap_or_default()
    };
    if let Some(checksum) = cli.checksum {
        config.radio.checksum = checksum;
    }

    // Initialize logging
    let filter = if cli.verbose || config.general.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match cli.command {
        Commands::Interface {
            main,
            function,
            session,
        } => {
            run_interface(&config, &main, &function, session).await?;
        }
        Commands::Robot { count } => {
            run_robot(&config, count).await?;
        }
        Commands::Encode { packet } => {
            let packet = match packet {
                EncodeCommand::Commands {
                    session,
                    main,
                    function,
                } => Packet::Commands(CommandsMessage::new(
                    session,
                    MainInstructions::parse_program(&main)?,
                    FunctionInstructions::parse_program(&function)?,
                )),
                EncodeCommand::Ack { session, counter } => {
                    Packet::Ack(AckMessage::new(session, counter))
                }
            };
            println!("{}", hex::encode_upper(packet.to_bytes(config.radio.checksum)));
        }
        Commands::Decode { hex } => {
            let cleaned: String = hex.split_whitespace().collect();
            let bytes = hex::decode(cleaned)?;
            let packet = Packet::decode(&bytes, config.radio.checksum)?;
            println!("{}", serde_json::to_string_pretty(&packet)?);
        }
        Commands::Config { generate, output } => {
            if generate {
                let sample = config::generate_sample_config()?;
                if let Some(path) = output {
                    std::fs::write(&path, &sample)?;
                    println!("Configuration written to: {}", path.display());
                } else {
                    println!("{}", sample);
                }
            } else {
                println!("{}", toml::to_string_pretty(&config)?);
            }
        }
        Commands::Info => {
            print_protocol_info(&config);
        }
    }

    Ok(())
}

/// Send one program from an emulated Interface
async fn run_interface(
    config: &Config,
    main: &str,
    function: &str,
    session: Option<u32>,
) -> anyhow::Result<()> {
    let main = MainInstructions::parse_program(main)?;
    let function = FunctionInstructions::parse_program(function)?;

    let radio = UdpRadio::bind(
        config.radio.interface_radio(),
        config.link.interface_bind,
        config.link.robot_bind,
    )
    .await?;
    let mut interface = Interface::new(radio, config.link.link_config(), config.radio.checksum);

    tracing::info!(
        "Interface '{}' sending main '{}' function '{}'",
        config.general.name,
        main,
        function
    );

    let delivered = match session {
        Some(session_id) => {
            interface
                .deliver(CommandsMessage::new(session_id, main, function))
                .await?
        }
        None => interface.send_program(main, function).await?,
    };

    println!(
        "Delivered session {:#010x} in {} attempt(s); robot ack counter {}",
        delivered.message.session_id, delivered.attempts, delivered.ack.message_counter
    );

    Ok(())
}

/// Acknowledge programs on an emulated Robot
async fn run_robot(config: &Config, count: Option<u64>) -> anyhow::Result<()> {
    let radio = UdpRadio::bind(
        config.radio.robot_radio(),
        config.link.robot_bind,
        config.link.interface_bind,
    )
    .await?;
    let mut robot = Robot::new(radio, config.radio.checksum);

    let (event_tx, mut event_rx) = mpsc::channel(64);
    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);

    println!("Robot '{}' waiting for programs. Press Ctrl+C to stop.", config.general.name);

    let robot_task = tokio::spawn(async move { robot.run(event_tx, shutdown_rx).await });

    let mut programs = 0u64;
    tokio::select! {
        _ = report_robot_events(&mut event_rx, count, &mut programs) => {}
        _ = tokio::signal::ctrl_c() => {
            println!("\nShutting down...");
        }
    }

    let _ = shutdown_tx.send(()).await;
    robot_task.await??;
    tracing::info!("Robot stopped after {} program(s)", programs);

    Ok(())
}

/// Print robot events until `count` programs arrived or the robot stops
async fn report_robot_events(
    event_rx: &mut mpsc::Receiver<RobotEvent>,
    count: Option<u64>,
    programs: &mut u64,
) {
    while let Some(event) = event_rx.recv().await {
        match event {
            RobotEvent::ProgramReceived { message } => {
                *programs += 1;
                println!(
                    "+ Session {:#010x}: main '{}' function '{}'",
                    message.session_id,
                    message.main_instructions,
                    message.function_instructions
                );
                if count.is_some_and(|limit| *programs >= limit) {
                    return;
                }
            }
            RobotEvent::Reacknowledged { session_id, counter } => {
                tracing::debug!("Re-acked session {:#010x} ({})", session_id, counter);
            }
            RobotEvent::Rejected { reason } => {
                println!("- Rejected packet: {}", reason);
            }
        }
    }
    tracing::debug!("Robot event channel closed");
}

/// Print protocol constants
fn print_protocol_info(config: &Config) {
    println!("Cubetto Playset Protocol");
    println!("========================\n");

    println!("Version:            {}", protocol::PLAYSET_VERSION);
    println!("Interface id:       {:#010X}", protocol::INTERFACE_ID);
    println!("Robot id:           {:#010X}", protocol::CUBETTO_ROBOT_ID);
    println!("Commands packet:    {} bytes", COMMANDS_MESSAGE_LEN);
    println!("Ack packet:         {} bytes", ACK_MESSAGE_LEN);
    println!("Main capacity:      {}", protocol::MAX_MAIN_INSTRUCTIONS);
    println!("Function capacity:  {}", protocol::MAX_FUNCTION_INSTRUCTIONS);

    println!("\nCommand codes:");
    for command in protocol::Command::ALL {
        println!("  {:<9} {}", command.to_string(), command.code());
    }

    println!("\nRadio:");
    println!("  Checksum:             {}", config.radio.checksum);
    println!("  Interface -> Cubetto: {}", config.radio.interface_to_cubetto_pipe);
    println!("  Cubetto -> Interface: {}", config.radio.cubetto_to_interface_pipe);
}
