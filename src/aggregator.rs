// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Harava - Result Aggregator
 * Wraps adapter invocations into canonical tool results
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::adapter::ToolAdapter;
use crate::types::{InvocationError, ToolResult};

/// Run one adapter invocation and settle it into a ToolResult.
///
/// Whatever the adapter does - return normally, return a typed failure,
/// exceed its time budget, ignore cancellation, or panic - the caller
/// always receives a well-formed result and never a raw fault. Execution
/// time covers invocation start to settlement. The adapter future runs in
/// its own task so a panic is contained and a timed-out invocation can be
/// abandoned without waiting for it to cooperate.
pub async fn invoke(
    adapter: Arc<dyn ToolAdapter>,
    session_id: &str,
    target: &str,
    budget: Duration,
    cancel: &CancellationToken,
) -> ToolResult {
    let tool_name = adapter.name().to_string();
    let started = Instant::now();

    let task_target = target.to_string();
    let mut handle = tokio::spawn(async move { adapter.run(&task_target).await });

    let outcome = tokio::select! {
        _ = cancel.cancelled() => {
            warn!("Invocation of {} cancelled by session signal", tool_name);
            Err(InvocationError::cancelled("session cancelled"))
        }
        joined = tokio::time::timeout(budget, &mut handle) => match joined {
            Err(_) => {
                warn!(
                    "Invocation of {} exceeded budget of {:.1}s",
                    tool_name,
                    budget.as_secs_f64()
                );
                Err(InvocationError::timeout(format!(
                    "exceeded budget of {:.1}s",
                    budget.as_secs_f64()
                )))
            }
            Ok(Err(join_err)) => {
                let message = if join_err.is_panic() {
                    format!("adapter panicked: {}", join_err)
                } else {
                    "adapter task aborted".to_string()
                };
                warn!("Invocation of {} faulted: {}", tool_name, message);
                Err(InvocationError::adapter_fault(message))
            }
            Ok(Ok(Ok(output))) => Ok(output),
            Ok(Ok(Err(adapter_err))) => {
                debug!("Adapter {} reported failure: {}", tool_name, adapter_err);
                Err(InvocationError::adapter_fault(adapter_err.to_string()))
            }
        },
    };

    // An abandoned adapter task gets no further slot time; dropping the
    // handle alone would leave it running detached.
    if outcome.is_err() {
        handle.abort();
    }

    let execution_time = started.elapsed().as_secs_f64();
    match outcome {
        Ok(output) => ToolResult {
            session_id: session_id.to_string(),
            tool_name,
            target: target.to_string(),
            success: true,
            data: Some(output.data),
            error: None,
            execution_time,
            metadata: output.metadata,
            timestamp: Utc::now(),
        },
        Err(error) => failure(session_id, &tool_name, target, error, execution_time),
    }
}

/// Build a failed result for an invocation that never ran
pub fn unscheduled(
    session_id: &str,
    tool_name: &str,
    target: &str,
    error: InvocationError,
) -> ToolResult {
    failure(session_id, tool_name, target, error, 0.0)
}

fn failure(
    session_id: &str,
    tool_name: &str,
    target: &str,
    error: InvocationError,
    execution_time: f64,
) -> ToolResult {
    ToolResult {
        session_id: session_id.to_string(),
        tool_name: tool_name.to_string(),
        target: target.to_string(),
        success: false,
        data: None,
        error: Some(error),
        execution_time,
        metadata: HashMap::new(),
        timestamp: Utc::now(),
    }
}
