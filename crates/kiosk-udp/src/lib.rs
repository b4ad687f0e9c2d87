//! UDP front end for RFID arcade devices
//!
//! - `codec` - datagram text ↔ request / reply
//! - `server` - the session loop that binds the socket and answers devices

pub mod codec;
pub mod server;

pub use codec::{decode_payload, parse_request, DeviceRequest, Reply};
pub use server::UdpServer;
