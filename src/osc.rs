//! OSC network mirror
//!
//! Publishes normalized fader values as `/bank{n}/fader{i} <float>` over UDP
//! and decodes remote automation arriving on the same socket.

use anyhow::{Context, Result};
use rosc::{OscMessage, OscPacket, OscType};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::router::{MirrorCommand, MirrorMessage};

/// Large enough for any single OSC datagram we expect
const OSC_BUF_SIZE: usize = 1536;

/// Why an inbound OSC message was not applied
#[derive(Debug, Error, PartialEq)]
pub enum MirrorError {
    #[error("failed to decode OSC packet: {0}")]
    Decode(String),
    #[error("unknown OSC address: {0}")]
    UnknownAddress(String),
    #[error("OSC address {0} expects one numeric or boolean argument")]
    BadArgument(String),
}

/// UDP endpoint of the mirror
pub struct OscMirror {
    socket: Arc<UdpSocket>,
    target: SocketAddr,
}

impl OscMirror {
    /// Bind the local socket; messages go to `target`
    pub async fn bind(listen: &str, target: &str) -> Result<Self> {
        let target: SocketAddr = target
            .parse()
            .with_context(|| format!("Invalid OSC target address: {}", target))?;
        let socket = UdpSocket::bind(listen)
            .await
            .with_context(|| format!("Failed to bind OSC socket on {}", listen))?;

        info!("OSC mirror listening on {}, sending to {}", listen, target);

        Ok(Self {
            socket: Arc::new(socket),
            target,
        })
    }

    /// Send one mirror value
    pub async fn send(&self, message: &MirrorMessage) -> Result<()> {
        let packet = encode_message(message)?;
        self.socket
            .send_to(&packet, self.target)
            .await
            .with_context(|| format!("Failed to send OSC message to {}", self.target))?;

        trace!("OSC sent: {}", message);
        Ok(())
    }

    /// Spawn the receive loop; decoded remote writes arrive on the returned channel
    pub fn spawn_listener(&self) -> mpsc::Receiver<MirrorCommand> {
        let (tx, rx) = mpsc::channel(256);
        let socket = self.socket.clone();

        tokio::spawn(async move {
            let mut buf = [0u8; OSC_BUF_SIZE];
            loop {
                let (len, from) = match socket.recv_from(&mut buf).await {
                    Ok(received) => received,
                    Err(e) => {
                        warn!("OSC receive failed: {}", e);
                        continue;
                    }
                };

                for result in decode_packet(&buf[..len]) {
                    match result {
                        Ok(command) => {
                            if tx.send(command).await.is_err() {
                                debug!("OSC listener stopped: router gone");
                                return;
                            }
                        }
                        Err(e) => debug!("Ignoring OSC from {}: {}", from, e),
                    }
                }
            }
        });

        rx
    }
}

/// Encode a mirror value as an OSC message with one float argument
pub fn encode_message(message: &MirrorMessage) -> Result<Vec<u8>> {
    let packet = OscPacket::Message(OscMessage {
        addr: message.address.clone(),
        args: vec![OscType::Float(message.value)],
    });

    rosc::encoder::encode(&packet)
        .map_err(|e| anyhow::anyhow!("Failed to encode OSC message {}: {:?}", message.address, e))
}

/// Decode a datagram into remote writes (bundles are flattened)
pub fn decode_packet(data: &[u8]) -> Vec<Result<MirrorCommand, MirrorError>> {
    match rosc::decoder::decode_udp(data) {
        Ok((_, packet)) => {
            let mut commands = Vec::new();
            collect_commands(packet, &mut commands);
            commands
        }
        Err(e) => vec![Err(MirrorError::Decode(format!("{:?}", e)))],
    }
}

fn collect_commands(packet: OscPacket, out: &mut Vec<Result<MirrorCommand, MirrorError>>) {
    match packet {
        OscPacket::Message(message) => out.push(parse_command(&message.addr, &message.args)),
        OscPacket::Bundle(bundle) => {
            for inner in bundle.content {
                collect_commands(inner, out);
            }
        }
    }
}

/// Parse `/bank{n}/fader{i}` and `/bank{n}/buttons{i}/{b}`
pub fn parse_command(address: &str, args: &[OscType]) -> Result<MirrorCommand, MirrorError> {
    let unknown = || MirrorError::UnknownAddress(address.to_string());

    let mut parts = address.strip_prefix('/').ok_or_else(unknown)?.split('/');
    let bank = parts
        .next()
        .and_then(|p| p.strip_prefix("bank"))
        .and_then(|n| n.parse::<usize>().ok())
        .and_then(|n| n.checked_sub(1))
        .ok_or_else(unknown)?;
    let entity = parts.next().ok_or_else(unknown)?;
    let button = parts.next();
    if parts.next().is_some() {
        return Err(unknown());
    }

    let value = match args {
        [arg] => argument_value(arg).ok_or_else(|| MirrorError::BadArgument(address.to_string()))?,
        _ => return Err(MirrorError::BadArgument(address.to_string())),
    };

    if let Some(strip) = entity.strip_prefix("fader") {
        let strip = strip.parse::<u8>().map_err(|_| unknown())?;
        if button.is_some() {
            return Err(unknown());
        }
        return Ok(MirrorCommand::SetFader { bank, strip, value });
    }

    if let Some(strip) = entity.strip_prefix("buttons") {
        let strip = strip.parse::<u8>().map_err(|_| unknown())?;
        let button = button
            .and_then(|b| b.parse::<usize>().ok())
            .ok_or_else(unknown)?;
        return Ok(MirrorCommand::SetButton {
            bank,
            strip,
            button,
            on: value >= 0.5,
        });
    }

    Err(unknown())
}

fn argument_value(arg: &OscType) -> Option<f64> {
    match arg {
        OscType::Float(v) => Some(f64::from(*v)),
        OscType::Double(v) => Some(*v),
        OscType::Int(v) => Some(f64::from(*v)),
        OscType::Long(v) => Some(*v as f64),
        OscType::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decodes_as_osc_float() {
        let bytes = encode_message(&MirrorMessage::fader(0, 3, 0.5)).unwrap();
        let (_, packet) = rosc::decoder::decode_udp(&bytes).unwrap();
        match packet {
            OscPacket::Message(message) => {
                assert_eq!(message.addr, "/bank1/fader3");
                assert_eq!(message.args, vec![OscType::Float(0.5)]);
            }
            OscPacket::Bundle(_) => panic!("expected a message"),
        }
    }

    #[test]
    fn test_parse_fader() {
        assert_eq!(
            parse_command("/bank2/fader7", &[OscType::Float(0.25)]),
            Ok(MirrorCommand::SetFader {
                bank: 1,
                strip: 7,
                value: 0.25
            })
        );
    }

    #[test]
    fn test_parse_button() {
        assert_eq!(
            parse_command("/bank1/buttons3/2", &[OscType::Int(1)]),
            Ok(MirrorCommand::SetButton {
                bank: 0,
                strip: 3,
                button: 2,
                on: true
            })
        );
        assert_eq!(
            parse_command("/bank1/buttons3/2", &[OscType::Bool(false)]),
            Ok(MirrorCommand::SetButton {
                bank: 0,
                strip: 3,
                button: 2,
                on: false
            })
        );
    }

    #[test]
    fn test_parse_rejects_unknown_addresses() {
        let arg = [OscType::Float(1.0)];
        for address in [
            "bank1/fader1",
            "/bank0/fader1",
            "/bankX/fader1",
            "/bank1/knob1",
            "/bank1/fader1/2",
            "/bank1/buttons1",
            "/bank1/buttons1/2/3",
        ] {
            assert_eq!(
                parse_command(address, &arg),
                Err(MirrorError::UnknownAddress(address.to_string())),
                "{}",
                address
            );
        }
    }

    #[test]
    fn test_parse_rejects_bad_arguments() {
        assert_eq!(
            parse_command("/bank1/fader1", &[]),
            Err(MirrorError::BadArgument("/bank1/fader1".to_string()))
        );
        assert_eq!(
            parse_command("/bank1/fader1", &[OscType::String("up".to_string())]),
            Err(MirrorError::BadArgument("/bank1/fader1".to_string()))
        );
        assert_eq!(
            parse_command("/bank1/fader1", &[OscType::Float(f32::NAN)]),
            Err(MirrorError::BadArgument("/bank1/fader1".to_string()))
        );
    }

    #[test]
    fn test_decode_garbage() {
        let results = decode_packet(&[0x00, 0x01, 0x02]);
        assert_eq!(results.len(), 1);
        assert!(matches!(results[0], Err(MirrorError::Decode(_))));
    }

    #[tokio::test]
    async fn test_mirror_send_and_listen() {
        let receiver = OscMirror::bind("127.0.0.1:0", "127.0.0.1:9").await.unwrap();
        let receiver_addr = receiver.socket.local_addr().unwrap();
        let mut commands = receiver.spawn_listener();

        let sender = OscMirror::bind("127.0.0.1:0", &receiver_addr.to_string())
            .await
            .unwrap();
        sender.send(&MirrorMessage::fader(2, 4, 0.75)).await.unwrap();

        let command = tokio::time::timeout(std::time::Duration::from_secs(2), commands.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            command,
            MirrorCommand::SetFader {
                bank: 2,
                strip: 4,
                value: 0.75
            }
        );
    }
}
