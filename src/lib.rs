//! A Minecraft Java Edition server endpoint speaking protocol 765
//! (game version 1.20.4).
//!
//! The endpoint accepts TCP connections and negotiates the wire
//! protocol through the end of the Configuration phase: Handshake →
//! Status/Ping for server list pings, or Handshake → Login (with
//! online-mode RSA authentication against the Mojang session service)
//! → Configuration with keepalive probing. The Play phase is never
//! entered.

pub mod auth;
pub mod connection;
pub mod keepalive;
pub mod keys;
pub mod protocol;
pub mod server;
pub mod status;
pub mod stream;
pub mod text;
