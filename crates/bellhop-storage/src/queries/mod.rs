// SPDX-FileCopyrightText: 2026 Bellhop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules, one per entity family.

pub mod conversations;
pub mod events;
pub mod messages;
pub mod orders;
pub mod tickets;
