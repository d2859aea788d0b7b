//! # Wire Protocol
//!
//! Payload encoding for one synchronized value per update message.
//!
//! ## Payload Structure
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ Envelope (transport-owned): channel, sender timestamp        │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Position │ Rotation (Euler) │ Velocity │ Angular velocity    │
//! │ each: selected axes only, f32 or quantized u16               │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Philosophy
//!
//! - Every byte counts: unselected axes are never written
//! - Quantization clamps instead of wrapping
//! - Fixed-size buffers, no allocation per message

mod axis;
mod codec;
mod compression;
mod serialization;

pub use axis::{Axis, AxisMask, Channel};
pub use codec::{ensure_carries, CompressionMode, WireFormat, WireValue};
pub use compression::{compress, decompress, precision, QuantizeRange, Quantizer, MAX_CODE};
pub use serialization::{PayloadReader, PayloadWriter, MAX_PAYLOAD_SIZE};
