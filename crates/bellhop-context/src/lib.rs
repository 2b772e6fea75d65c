// SPDX-FileCopyrightText: 2026 Bellhop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-turn context assembly: history windows and knowledge blocks.

pub mod assembler;

pub use assembler::{render_knowledge_block, ContextAssembler, TurnContext};
