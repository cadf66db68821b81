//! Incremental tool-call assembly
//!
//! Vendors stream tool calls as fragments keyed by an index. The accumulator
//! grows one record per index and reports a call as complete the first time
//! its argument string parses as JSON while both id and name are known.
//! That surfaced call is frozen: later fragments never change it.

use crate::types::{DroppedToolCall, ToolCall, synthesize_tool_call_id};

/// How far past the highest seen index a new index may land
const MAX_INDEX_GAP: usize = 64;

/// One incremental tool-call update
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolCallDelta {
    /// Stream index of the call
    pub index: u32,
    /// Identifier, usually present on the first fragment only
    pub id: Option<String>,
    /// Function name fragment
    pub name: Option<String>,
    /// Argument JSON fragment
    pub arguments: Option<String>,
}

#[derive(Debug, Default)]
struct Slot {
    id: String,
    name: String,
    arguments: String,
    /// Arguments as surfaced to the caller; set at most once
    emitted: Option<String>,
}

impl Slot {
    fn is_placeholder(&self) -> bool {
        self.id.is_empty() && self.name.is_empty() && self.arguments.is_empty()
    }
}

/// Tool calls resolved at stream end
#[derive(Debug, Default)]
pub struct ToolCallSummary {
    /// Every usable call in index order
    pub completed: Vec<ToolCall>,
    /// Calls that became usable only now and were never surfaced
    pub late: Vec<ToolCall>,
    /// Calls whose arguments never parsed
    pub dropped: Vec<DroppedToolCall>,
}

/// Per-session table of tool calls in progress
#[derive(Debug, Default)]
pub struct ToolCallAccumulator {
    slots: Vec<Slot>,
}

impl ToolCallAccumulator {
    /// Create an empty accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of indices seen so far, including back-filled placeholders
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no fragment has been seen
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Apply one delta, returning the call if it just became complete
    ///
    /// Skipped indices are back-filled with empty placeholders. An index that
    /// has been returned once is never returned again. A delta whose index
    /// jumps more than a small gap past the known indices is ignored.
    pub fn apply(&mut self, delta: ToolCallDelta) -> Option<ToolCall> {
        let index = delta.index as usize;
        if index > self.slots.len() + MAX_INDEX_GAP {
            tracing::debug!(index, known = self.slots.len(), "ignoring tool call delta with out-of-range index");
            return None;
        }
        if index >= self.slots.len() {
            self.slots.resize_with(index + 1, Slot::default);
        }
        let slot = &mut self.slots[index];

        if let Some(id) = delta.id
            && !id.is_empty()
            && slot.id.is_empty()
        {
            slot.id = id;
        }
        if let Some(name) = delta.name {
            slot.name.push_str(&name);
        }
        if let Some(fragment) = delta.arguments {
            slot.arguments.push_str(&fragment);
        }

        if slot.emitted.is_some() || slot.id.is_empty() || slot.name.is_empty() || slot.arguments.is_empty() {
            return None;
        }
        if serde_json::from_str::<serde_json::Value>(&slot.arguments).is_err() {
            return None;
        }

        slot.emitted = Some(slot.arguments.clone());
        tracing::debug!(index, name = %slot.name, "tool call arguments complete");
        Some(ToolCall::new(slot.id.clone(), slot.name.clone(), slot.arguments.clone()))
    }

    /// Resolve every index at stream end
    ///
    /// Empty argument strings count as `{}`; calls without a vendor id get a
    /// synthesized one.
    pub fn finish(self) -> ToolCallSummary {
        let mut summary = ToolCallSummary::default();

        for (index, slot) in self.slots.into_iter().enumerate() {
            if slot.is_placeholder() {
                continue;
            }
            #[allow(clippy::cast_possible_truncation)]
            let index = index as u32;

            let was_emitted = slot.emitted.is_some();
            let arguments = if let Some(emitted) = slot.emitted {
                if emitted != slot.arguments {
                    tracing::debug!(index, "tool call arguments grew after completion, keeping surfaced value");
                }
                emitted
            } else {
                let arguments = if slot.arguments.trim().is_empty() {
                    "{}".to_owned()
                } else {
                    slot.arguments
                };
                if let Err(e) = serde_json::from_str::<serde_json::Value>(&arguments) {
                    tracing::warn!(index, name = %slot.name, error = %e, "dropping tool call with malformed arguments");
                    summary.dropped.push(DroppedToolCall {
                        index,
                        id: slot.id,
                        name: slot.name,
                        arguments,
                        reason: e.to_string(),
                    });
                    continue;
                }
                arguments
            };

            if slot.name.is_empty() {
                summary.dropped.push(DroppedToolCall {
                    index,
                    id: slot.id,
                    name: slot.name,
                    arguments,
                    reason: "missing function name".to_owned(),
                });
                continue;
            }

            let id = if slot.id.is_empty() {
                synthesize_tool_call_id()
            } else {
                slot.id
            };
            let call = ToolCall::new(id, slot.name, arguments);
            if !was_emitted {
                summary.late.push(call.clone());
            }
            summary.completed.push(call);
        }

        summary
    }
}
