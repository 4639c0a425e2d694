//! Behringer X-Touch driver
//!
//! MIDI transport to and from the control surface. Incoming messages are
//! forwarded untouched as [`XTouchEvent`]s; interpretation belongs to the
//! router.

use anyhow::{Context, Result};
use midir::{MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::config::MidiConfig;
use crate::midi::format_hex;
use crate::router::SurfaceMessage;

/// Client name announced to the MIDI backend
const CLIENT_NAME: &str = "XTouch-Banks";

/// MIDI event from X-Touch
#[derive(Debug, Clone)]
pub struct XTouchEvent {
    /// Backend timestamp in microseconds
    pub timestamp: u64,
    pub raw_data: Vec<u8>,
}

/// X-Touch driver for hardware communication
pub struct XTouchDriver {
    input_conn: Option<MidiInputConnection<()>>,
    output_conn: Option<Arc<Mutex<MidiOutputConnection>>>,

    event_tx: mpsc::Sender<XTouchEvent>,
    event_rx: Option<mpsc::Receiver<XTouchEvent>>,

    /// Port name patterns (case-insensitive substring)
    input_port_name: String,
    output_port_name: String,
}

impl XTouchDriver {
    pub fn new(config: &MidiConfig) -> Self {
        let (event_tx, event_rx) = mpsc::channel(1000);

        Self {
            input_conn: None,
            output_conn: None,
            event_tx,
            event_rx: Some(event_rx),
            input_port_name: config.input_port.clone(),
            output_port_name: config.output_port.clone(),
        }
    }

    fn find_input_port(midi_in: &MidiInput, pattern: &str) -> Option<(midir::MidiInputPort, String)> {
        midi_in.ports().into_iter().find_map(|port| {
            let name = midi_in.port_name(&port).ok()?;
            port_matches(&name, pattern).then(|| {
                debug!("Found port '{}' matching pattern '{}'", name, pattern);
                (port, name)
            })
        })
    }

    fn find_output_port(
        midi_out: &MidiOutput,
        pattern: &str,
    ) -> Option<(midir::MidiOutputPort, String)> {
        midi_out.ports().into_iter().find_map(|port| {
            let name = midi_out.port_name(&port).ok()?;
            port_matches(&name, pattern).then(|| {
                debug!("Found port '{}' matching pattern '{}'", name, pattern);
                (port, name)
            })
        })
    }

    /// Connect to X-Touch MIDI ports
    pub async fn connect(&mut self) -> Result<()> {
        self.disconnect();

        info!(
            "Connecting to X-Touch - Input: '{}', Output: '{}'",
            self.input_port_name, self.output_port_name
        );

        let midi_in = MidiInput::new(&format!("{}-Input", CLIENT_NAME))
            .context("Failed to create MIDI input")?;
        debug!("Found {} MIDI input ports", midi_in.port_count());

        let (in_port, port_name) = Self::find_input_port(&midi_in, &self.input_port_name)
            .ok_or_else(|| anyhow::anyhow!("Input port '{}' not found", self.input_port_name))?;
        info!("Connecting to input port: {}", port_name);

        let event_tx = self.event_tx.clone();
        let input_conn = midi_in
            .connect(
                &in_port,
                CLIENT_NAME,
                move |timestamp, data, _| {
                    let event = XTouchEvent {
                        timestamp,
                        raw_data: data.to_vec(),
                    };
                    // Never block the MIDI backend thread
                    if event_tx.try_send(event).is_err() {
                        warn!("X-Touch event queue full, dropping {}", format_hex(data));
                    }
                },
                (),
            )
            .map_err(|e| anyhow::anyhow!("Failed to connect to input port: {}", e))?;
        self.input_conn = Some(input_conn);

        let midi_out = MidiOutput::new(&format!("{}-Output", CLIENT_NAME))
            .context("Failed to create MIDI output")?;
        debug!("Found {} MIDI output ports", midi_out.port_count());

        let (out_port, port_name) = Self::find_output_port(&midi_out, &self.output_port_name)
            .ok_or_else(|| anyhow::anyhow!("Output port '{}' not found", self.output_port_name))?;
        info!("Connecting to output port: {}", port_name);

        let output_conn = midi_out
            .connect(&out_port, CLIENT_NAME)
            .map_err(|e| anyhow::anyhow!("Failed to connect to output port: {}", e))?;
        self.output_conn = Some(Arc::new(Mutex::new(output_conn)));

        info!("X-Touch connected successfully");
        Ok(())
    }

    /// Disconnect from MIDI ports
    pub fn disconnect(&mut self) {
        if self.is_connected() {
            info!("X-Touch disconnected");
        }
        self.input_conn = None;
        self.output_conn = None;
    }

    pub fn is_connected(&self) -> bool {
        self.input_conn.is_some() && self.output_conn.is_some()
    }

    /// Send a surface message
    pub async fn send(&self, message: &SurfaceMessage) -> Result<()> {
        self.write(&message.bytes)?;
        trace!("Sent: {}", message);
        Ok(())
    }

    fn write(&self, data: &[u8]) -> Result<()> {
        let output = self
            .output_conn
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("Not connected to output port"))?;

        let mut conn = output
            .lock()
            .map_err(|_| anyhow::anyhow!("MIDI output connection lock poisoned"))?;
        conn.send(data).context("Failed to send MIDI message")
    }

    /// Take the event receiver (for the main loop to consume)
    pub fn take_event_receiver(&mut self) -> Option<mpsc::Receiver<XTouchEvent>> {
        self.event_rx.take()
    }
}

/// Case-insensitive substring match of a port name against a pattern
pub fn port_matches(name: &str, pattern: &str) -> bool {
    name.to_lowercase().contains(&pattern.to_lowercase())
}

/// Port discovery utilities
pub mod discovery {
    use super::*;
    use colored::*;

    /// Information about a MIDI port
    #[derive(Debug, Clone)]
    pub struct PortInfo {
        pub index: usize,
        pub name: String,
        pub is_virtual: bool,
    }

    pub fn is_virtual_port(name: &str) -> bool {
        name.contains("Virtual") || name.contains("loopMIDI") || name.contains("IAC")
    }

    fn port_info(index: usize, name: String) -> PortInfo {
        PortInfo {
            index,
            is_virtual: is_virtual_port(&name),
            name,
        }
    }

    pub fn discover_input_ports() -> Result<Vec<PortInfo>> {
        let midi_in = MidiInput::new(&format!("{}-Discovery", CLIENT_NAME))?;
        Ok(midi_in
            .ports()
            .iter()
            .enumerate()
            .filter_map(|(index, port)| Some(port_info(index, midi_in.port_name(port).ok()?)))
            .collect())
    }

    pub fn discover_output_ports() -> Result<Vec<PortInfo>> {
        let midi_out = MidiOutput::new(&format!("{}-Discovery", CLIENT_NAME))?;
        Ok(midi_out
            .ports()
            .iter()
            .enumerate()
            .filter_map(|(index, port)| Some(port_info(index, midi_out.port_name(port).ok()?)))
            .collect())
    }

    /// Print ports, marking the ones the configured patterns would pick
    pub fn print_ports(config: &MidiConfig) {
        println!("\n{}", "=== Available MIDI Ports ===".bold().cyan());

        print_section("Input Ports:", discover_input_ports(), &config.input_port);
        print_section("Output Ports:", discover_output_ports(), &config.output_port);

        println!();
    }

    fn print_section(title: &str, ports: Result<Vec<PortInfo>>, pattern: &str) {
        println!("\n{}", title.bold());

        let ports = match ports {
            Ok(ports) => ports,
            Err(e) => {
                println!("  {}", format!("Failed to list ports: {}", e).red());
                return;
            }
        };

        if ports.is_empty() {
            println!("  {}", "No ports found".dimmed());
            return;
        }

        let mut matched = false;
        for port in ports {
            let marker = if port.is_virtual {
                "[VIRTUAL]".yellow()
            } else {
                "[PHYSICAL]".green()
            };
            // The driver connects to the first match
            let selected = !matched && port_matches(&port.name, pattern);
            matched |= selected;
            if selected {
                println!(
                    "  {}: {} {} {}",
                    port.index,
                    marker,
                    port.name.bright_white(),
                    "<- selected".bright_green()
                );
            } else {
                println!("  {}: {} {}", port.index, marker, port.name);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_matching() {
        assert!(port_matches("X-Touch INT", "x-touch"));
        assert!(port_matches("2- X-TOUCH", "X-Touch"));
        assert!(!port_matches("loopMIDI Port", "X-Touch"));
    }

    #[test]
    fn test_virtual_port_detection() {
        assert!(discovery::is_virtual_port("loopMIDI Port 1"));
        assert!(discovery::is_virtual_port("IAC Driver Bus 1"));
        assert!(!discovery::is_virtual_port("X-Touch"));
    }

    #[tokio::test]
    async fn test_send_without_connection_fails() {
        let driver = XTouchDriver::new(&MidiConfig::default());
        assert!(!driver.is_connected());
        assert!(driver
            .send(&SurfaceMessage::motor([0xE0, 0, 0]))
            .await
            .is_err());
    }

    #[test]
    fn test_event_receiver_taken_once() {
        let mut driver = XTouchDriver::new(&MidiConfig::default());
        assert!(driver.take_event_receiver().is_some());
        assert!(driver.take_event_receiver().is_none());
    }
}
