// SPDX-FileCopyrightText: 2026 Bellhop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait seams between the pipeline and its external collaborators.

mod channel;
mod embedding;
mod provider;

pub use channel::ChannelSender;
pub use embedding::EmbeddingProvider;
pub use provider::ModelProvider;
