// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Session Model
//!
//! Credential storage and password verification happen outside this crate.
//! The credential service hands over a [`Session`] carrying the principal's
//! [`Group`]; the gateway consumes it as-is.

pub mod groups;
pub mod session;

pub use groups::Group;
pub use session::Session;
