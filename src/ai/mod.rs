// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Advisory AI integration.
//!
//! Two bounded, strictly advisory touch points around a reconnaissance run:
//! - `planner`: proposes an ordered adapter subset before execution
//! - `analyzer`: synthesizes an insight record after execution
//!
//! Both degrade gracefully. A slow, wrong, or unreachable advisory service
//! falls back to the default adapter set (planning) or simply produces no
//! analysis record; it never fails a session.
//!
//! Architecture:
//! - `provider`: LLM backend abstraction (OpenRouter-compatible chat API)
//! - `planner`: execution-plan synthesis with registry-side validation
//! - `analyzer`: structured result analysis (summary, findings, risk level)

pub mod analyzer;
pub mod planner;
pub mod provider;

pub use analyzer::AiAnalyzer;
pub use planner::AiPlanner;
pub use provider::{LlmProvider, OpenRouterProvider};
