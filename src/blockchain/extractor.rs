//! Recovers which program events fired in a transaction.
//!
//! The program emits events by invoking itself with the event payload, so an
//! event shows up as an inner instruction of the instruction that produced it.
//! Two shapes occur:
//!
//! * the program instruction is top level and its events sit in the inner
//!   group tagged with its position (pass A);
//! * the program instruction is itself nested, because another program
//!   composed it, and its event is the very next instruction of the same
//!   inner group (pass B).
//!
//! Results are all of pass A followed by all of pass B. When a transaction
//! mixes both shapes this is not execution order.

use crate::blockchain::models::{RawInstruction, RawTransaction};
use crate::decoder::{self, LaunchpadInstruction, ProgramEvent};
use std::collections::HashSet;
use tracing::debug;

/// One (instruction, emitted event) pair recovered from a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedEvent {
    pub signature: String,
    pub slot: u64,
    pub block_time: i64,
    pub accounts: Vec<String>,
    pub instruction: LaunchpadInstruction,
    pub event: ProgramEvent,
}

impl ExtractedEvent {
    pub fn event_type(&self) -> &'static str {
        self.event.name()
    }

    pub fn account(&self, index: usize) -> Option<&str> {
        self.accounts.get(index).map(String::as_str)
    }
}

/// Extracts events for one program, optionally scoped to a platform address.
#[derive(Debug, Clone)]
pub struct EventExtractor {
    program_id: String,
    platform_filter: Option<String>,
}

impl EventExtractor {
    pub fn new(program_id: impl Into<String>, platform_filter: Option<String>) -> Self {
        Self {
            program_id: program_id.into(),
            platform_filter,
        }
    }

    pub fn extract(&self, tx: &RawTransaction) -> Vec<ExtractedEvent> {
        if !tx.success {
            debug!(signature = %tx.signature, "skipping failed transaction");
            return Vec::new();
        }
        if tx.instructions.is_empty() {
            debug!(signature = %tx.signature, "no instructions found");
            return Vec::new();
        }
        if tx.inner_instructions.is_empty() {
            debug!(signature = %tx.signature, "no inner instructions found");
            return Vec::new();
        }

        // (group position, instruction position) of inner instructions
        // already consumed as pass A events.
        let mut attached: HashSet<(usize, usize)> = HashSet::new();
        let mut events = self.top_level_pass(tx, &mut attached);
        events.extend(self.nested_pass(tx, &attached));

        for event in &events {
            debug!(
                signature = %event.signature,
                instruction = event.instruction.name(),
                event_type = event.event_type(),
                "event found"
            );
        }

        match &self.platform_filter {
            Some(platform) => events
                .into_iter()
                .filter(|event| event.accounts.iter().any(|a| a.contains(platform.as_str())))
                .collect(),
            None => events,
        }
    }

    fn top_level_pass(
        &self,
        tx: &RawTransaction,
        attached: &mut HashSet<(usize, usize)>,
    ) -> Vec<ExtractedEvent> {
        let mut events = Vec::new();

        for (index, ix) in tx.instructions.iter().enumerate() {
            let Some(instruction) = self.decode_instruction(ix) else {
                continue;
            };

            for (group_pos, group) in tx.inner_instructions.iter().enumerate() {
                if group.index as usize != index {
                    continue;
                }
                for (inner_pos, inner) in group.instructions.iter().enumerate() {
                    if let Some(event) = self.decode_event(inner) {
                        attached.insert((group_pos, inner_pos));
                        events.push(self.build(tx, ix, instruction.clone(), event));
                    }
                }
            }
        }

        events
    }

    fn nested_pass(
        &self,
        tx: &RawTransaction,
        attached: &HashSet<(usize, usize)>,
    ) -> Vec<ExtractedEvent> {
        let mut events = Vec::new();

        for (group_pos, group) in tx.inner_instructions.iter().enumerate() {
            for (inner_pos, inner) in group.instructions.iter().enumerate() {
                if attached.contains(&(group_pos, inner_pos)) {
                    continue;
                }
                let Some(instruction) = self.decode_instruction(inner) else {
                    continue;
                };
                let event = group
                    .instructions
                    .get(inner_pos + 1)
                    .and_then(|next| self.decode_event(next));
                if let Some(event) = event {
                    events.push(self.build(tx, inner, instruction, event));
                }
            }
        }

        events
    }

    fn decode_instruction(&self, ix: &RawInstruction) -> Option<LaunchpadInstruction> {
        if !ix.is_program(&self.program_id) {
            return None;
        }
        decoder::decode_instruction(ix.data.as_deref()?)
    }

    fn decode_event(&self, ix: &RawInstruction) -> Option<ProgramEvent> {
        if !ix.is_program(&self.program_id) {
            return None;
        }
        decoder::decode_event(ix.data.as_deref()?)
    }

    fn build(
        &self,
        tx: &RawTransaction,
        ix: &RawInstruction,
        instruction: LaunchpadInstruction,
        event: ProgramEvent,
    ) -> ExtractedEvent {
        ExtractedEvent {
            signature: tx.signature.clone(),
            slot: tx.slot,
            block_time: tx.block_time,
            accounts: ix.accounts.clone(),
            instruction,
            event,
        }
    }
}
