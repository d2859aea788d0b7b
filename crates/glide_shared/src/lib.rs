//! # GLIDE Shared
//!
//! Math types shared by every synchronized body.
//!
//! ## CRITICAL RULE
//!
//! This crate must NEVER depend on a physics engine, renderer or window
//! system. Bodies translate their native vector and rotation types into
//! [`Vec3`], [`Quaternion`] and [`Transform`] at the adapter boundary so the
//! interpolation math stays engine-agnostic.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod math;

pub use math::{Quaternion, Transform, Vec3};
