//! # GLIDE Sync - Snapshot Synchronization
//!
//! Smooths remotely-controlled bodies across an unreliable, jittery link,
//! given only periodic timestamped snapshots from their owner.
//!
//! ## Architecture
//!
//! - **Buffer**: fixed-capacity, time-ordered snapshot history
//! - **Playback**: plays slightly in the past so there is a pair to blend
//! - **Interpolation**: linear or non-uniform Catmull-Rom, snapping on teleports
//! - **Extrapolation**: dead reckoning when data runs out
//! - **Correction**: residuals decay instead of popping
//! - **Wire**: axis-selectable, optionally quantized payloads
//!
//! ## Data Flow
//!
//! ```text
//! OWNER                                        PROXY
//!   |                                            |
//!   | need_to_update()?                          |
//!   | get_current_state() --- payload, time ---> | receive_current_state()
//!   |                                            |   -> StateBuffer
//!   |                                            | update() every tick
//!   |                                            |   select -> interpolate
//!   |                                            |          | extrapolate
//!   |                                            |          | hold
//!   |                                            |   ⊕ residual -> body
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use glide_sync::{Authority, ManualClock, PositionBody, SyncConfig, SyncContext, Synchronizer};
//!
//! let clock = Arc::new(ManualClock::new(0.0));
//! let mut proxy = Synchronizer::new(
//!     PositionBody::default(),
//!     SyncConfig::internet(),
//!     SyncContext::new(clock.clone()),
//!     Authority::Proxy,
//! )?;
//!
//! // Per received message:
//! proxy.receive_current_state(timestamp, &mut PayloadReader::new(&bytes))?;
//!
//! // Per frame:
//! clock.advance(1.0 / 60.0);
//! proxy.update();
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod body;
pub mod config;
pub mod context;
pub mod correction;
pub mod error;
pub mod extrapolation;
pub mod interpolation;
pub mod protocol;
pub mod simulation;
pub mod snapshot;
pub mod spline;
pub mod synchronizer;
pub mod value;

// Re-exports for convenience
pub use body::{BodyStats, CompositeBody, PositionBody, RotationBody, SynchronizedBody};
pub use config::{ExtrapolationConfig, InterpolationMode, SyncConfig};
pub use context::{Clock, ManualClock, SyncContext, SystemClock, TraceEvent, TraceHook};
pub use correction::ErrorCorrector;
pub use error::{SyncError, SyncResult};
pub use extrapolation::{ExtrapolationController, ExtrapolationState};
pub use interpolation::{InterpolationEngine, Interpolated};
pub use protocol::{AxisMask, CompressionMode, PayloadReader, PayloadWriter, WireFormat, WireValue};
pub use snapshot::{Playback, PlaybackSelector, Snapshot, StateBuffer};
pub use synchronizer::{Authority, Synchronizer};
pub use value::{Motion, SyncValue};

pub use glide_shared::{Quaternion, Transform, Vec3};
