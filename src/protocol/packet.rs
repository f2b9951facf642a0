//! Packet sets for each protocol phase.
//!
//! Packet ids are overloaded across phases and directions: on the
//! wire, 0x00 is the handshake, a status request, a login start, or
//! client information depending on where the connection stands.
//! Decoding is therefore always dispatched through the current
//! phase's serverbound or clientbound enum, so a frame can never be
//! confused with an id-sharing packet from another phase.

use crate::protocol::{Decode, Encode};
use std::fmt::Debug;

pub mod client;
pub mod server;

/// A phase of the connection, carrying the packet sets that are
/// legal while it lasts.
pub trait ProtocolState: Send + Sync + 'static {
    /// Phase name as it appears in connection logs.
    const NAME: &'static str;
    /// Packets the server may send in this phase.
    type Clientbound: Encode + Decode + Debug + AsRef<str> + Send + 'static;
    /// Packets the client may send in this phase.
    type Serverbound: Encode + Decode + Debug + AsRef<str> + Send + 'static;
}

/// Legal phase progressions. The handshake names status or login as
/// its successor; an authenticated login flows into configuration.
/// Status connections end where they are, and nothing past
/// configuration is served by this endpoint, so neither phase has a
/// successor.
pub trait SwitchesTo<Next: ProtocolState>: ProtocolState {}

pub mod state {
    use super::*;
    use crate::protocol::{DecodeError, Decoder, EncodeError, Encoder};

    /// The first frame of every connection: the client introduces
    /// itself and names the phase it wants next.
    #[derive(Debug, Copy, Clone)]
    pub struct Handshake;
    impl ProtocolState for Handshake {
        const NAME: &'static str = "handshake";
        type Clientbound = NoPackets;
        type Serverbound = client::handshake::Packet;
    }
    impl SwitchesTo<Status> for Handshake {}
    impl SwitchesTo<Login> for Handshake {}

    /// The server stays silent during the handshake, so its packet
    /// set for that phase has no inhabitants: nothing can be sent,
    /// and anything received in the other direction fails to decode.
    #[derive(Debug, Clone, Copy)]
    pub enum NoPackets {}

    impl Encode for NoPackets {
        fn encode(&self, _encoder: &mut Encoder) -> Result<(), EncodeError> {
            match *self {}
        }
    }

    impl Decode for NoPackets {
        fn decode(decoder: &mut Decoder) -> Result<Self, DecodeError> {
            Err(DecodeError::UnknownPacketId(i64::from(
                decoder.read_var_int()?,
            )))
        }
    }

    impl AsRef<str> for NoPackets {
        fn as_ref(&self) -> &str {
            match *self {}
        }
    }

    /// Server-list pings: the status document and the latency echo.
    /// The client hangs up once it has what it came for.
    #[derive(Debug, Copy, Clone)]
    pub struct Status;
    impl ProtocolState for Status {
        const NAME: &'static str = "status";
        type Clientbound = server::status::Packet;
        type Serverbound = client::status::Packet;
    }

    /// Name announcement, the RSA key exchange, and session
    /// authentication; both directions come out the far end
    /// encrypted.
    #[derive(Debug, Copy, Clone)]
    pub struct Login;
    impl ProtocolState for Login {
        const NAME: &'static str = "login";
        type Clientbound = server::login::Packet;
        type Serverbound = client::login::Packet;
    }
    impl SwitchesTo<Configuration> for Login {}

    /// Settings exchange under keepalive probing: the last phase this
    /// endpoint serves before a full server would enter play.
    #[derive(Debug, Copy, Clone)]
    pub struct Configuration;
    impl ProtocolState for Configuration {
        const NAME: &'static str = "configuration";
        type Clientbound = server::configuration::Packet;
        type Serverbound = client::configuration::Packet;
    }
}

/// The endpoint's role on the wire, mapping each phase's clientbound
/// and serverbound sets onto the send and receive directions.
pub trait Side: Send + Sync + 'static + Copy + Clone {
    type SendPacket<State: ProtocolState>: Encode + Debug + AsRef<str> + Send + 'static;
    type RecvPacket<State: ProtocolState>: Decode + Debug + AsRef<str> + Send + 'static;
}

pub mod side {
    use super::*;

    /// This endpoint: sends clientbound packets, receives serverbound
    /// ones.
    #[derive(Debug, Copy, Clone)]
    pub struct Server;
    impl Side for Server {
        type SendPacket<State: ProtocolState> = State::Clientbound;
        type RecvPacket<State: ProtocolState> = State::Serverbound;
    }

    /// The opposite role, for driving the endpoint the way a real
    /// client would in tests.
    #[derive(Debug, Copy, Clone)]
    pub struct Client;
    impl Side for Client {
        type SendPacket<State: ProtocolState> = State::Serverbound;
        type RecvPacket<State: ProtocolState> = State::Clientbound;
    }
}
