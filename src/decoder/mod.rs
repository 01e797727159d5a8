//! Stateless decoding of LaunchLab instruction and event bytes.
//!
//! The layout is fixed for the lifetime of the process: each instruction is
//! identified by the first 8 bytes of `sha256("global:<name>")` and each event
//! by the first 8 bytes of `sha256("event:<Name>")`. Event payloads travel in a
//! self-invocation instruction that prefixes them with one more 8-byte tag.
//!
//! Nothing here returns an error. Most instructions in a transaction belong to
//! other programs or are not ones we care about, so "no match" is `None`.

pub mod accounts;
pub mod types;

use borsh::BorshDeserialize;
use solana_sdk::hash::hashv;
use std::collections::HashMap;
use std::sync::OnceLock;

pub use types::{
    CurveParams, LaunchpadInstruction, PoolCreateEvent, PoolStatus, ProgramEvent, TradeDirection,
    TradeEvent,
};

pub type Discriminator = [u8; 8];

/// Tag that prefixes every self-invoked event instruction.
pub const EVENT_IX_TAG: Discriminator = [0xe4, 0x45, 0xa5, 0x2e, 0x51, 0xcb, 0x9a, 0x1d];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InstructionKind {
    Initialize,
    BuyExactIn,
    BuyExactOut,
    SellExactIn,
    SellExactOut,
    ClaimPlatformFee,
    MigrateToAmm,
    MigrateToCpswap,
}

impl InstructionKind {
    const ALL: [InstructionKind; 8] = [
        InstructionKind::Initialize,
        InstructionKind::BuyExactIn,
        InstructionKind::BuyExactOut,
        InstructionKind::SellExactIn,
        InstructionKind::SellExactOut,
        InstructionKind::ClaimPlatformFee,
        InstructionKind::MigrateToAmm,
        InstructionKind::MigrateToCpswap,
    ];

    fn name(self) -> &'static str {
        match self {
            InstructionKind::Initialize => "initialize",
            InstructionKind::BuyExactIn => "buy_exact_in",
            InstructionKind::BuyExactOut => "buy_exact_out",
            InstructionKind::SellExactIn => "sell_exact_in",
            InstructionKind::SellExactOut => "sell_exact_out",
            InstructionKind::ClaimPlatformFee => "claim_platform_fee",
            InstructionKind::MigrateToAmm => "migrate_to_amm",
            InstructionKind::MigrateToCpswap => "migrate_to_cpswap",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EventKind {
    PoolCreate,
    Trade,
}

impl EventKind {
    const ALL: [EventKind; 2] = [EventKind::PoolCreate, EventKind::Trade];

    fn name(self) -> &'static str {
        match self {
            EventKind::PoolCreate => ProgramEvent::POOL_CREATE,
            EventKind::Trade => ProgramEvent::TRADE,
        }
    }
}

/// Discriminator tables for the program's instructions and events.
#[derive(Debug)]
pub struct Schema {
    instructions: HashMap<Discriminator, InstructionKind>,
    events: HashMap<Discriminator, EventKind>,
}

impl Schema {
    fn launchlab() -> Self {
        let instructions = InstructionKind::ALL
            .iter()
            .map(|kind| (instruction_discriminator(kind.name()), *kind))
            .collect();
        let events = EventKind::ALL
            .iter()
            .map(|kind| (event_discriminator(kind.name()), *kind))
            .collect();

        Self {
            instructions,
            events,
        }
    }

    /// Decode raw instruction data. Returns `None` for unknown discriminators
    /// or bodies that do not match the layout.
    pub fn decode_instruction(&self, data: &[u8]) -> Option<LaunchpadInstruction> {
        let (discriminator, mut body) = split_discriminator(data)?;
        let kind = self.instructions.get(&discriminator)?;

        let decoded = match kind {
            InstructionKind::Initialize => {
                LaunchpadInstruction::Initialize(BorshDeserialize::deserialize(&mut body).ok()?)
            }
            InstructionKind::BuyExactIn => {
                LaunchpadInstruction::BuyExactIn(BorshDeserialize::deserialize(&mut body).ok()?)
            }
            InstructionKind::BuyExactOut => {
                LaunchpadInstruction::BuyExactOut(BorshDeserialize::deserialize(&mut body).ok()?)
            }
            InstructionKind::SellExactIn => {
                LaunchpadInstruction::SellExactIn(BorshDeserialize::deserialize(&mut body).ok()?)
            }
            InstructionKind::SellExactOut => {
                LaunchpadInstruction::SellExactOut(BorshDeserialize::deserialize(&mut body).ok()?)
            }
            InstructionKind::ClaimPlatformFee => LaunchpadInstruction::ClaimPlatformFee,
            InstructionKind::MigrateToAmm => {
                LaunchpadInstruction::MigrateToAmm(BorshDeserialize::deserialize(&mut body).ok()?)
            }
            InstructionKind::MigrateToCpswap => LaunchpadInstruction::MigrateToCpswap,
        };

        Some(decoded)
    }

    /// Decode the data of a self-invocation instruction into an event. The
    /// leading 8-byte tag is stripped without inspection.
    pub fn decode_event(&self, data: &[u8]) -> Option<ProgramEvent> {
        let payload = data.get(8..)?;
        let (discriminator, mut body) = split_discriminator(payload)?;
        let kind = self.events.get(&discriminator)?;

        let decoded = match kind {
            EventKind::PoolCreate => {
                ProgramEvent::PoolCreate(BorshDeserialize::deserialize(&mut body).ok()?)
            }
            EventKind::Trade => ProgramEvent::Trade(BorshDeserialize::deserialize(&mut body).ok()?),
        };

        Some(decoded)
    }
}

fn split_discriminator(data: &[u8]) -> Option<(Discriminator, &[u8])> {
    let head = data.get(..8)?;
    let mut discriminator = [0u8; 8];
    discriminator.copy_from_slice(head);
    Some((discriminator, &data[8..]))
}

pub fn instruction_discriminator(name: &str) -> Discriminator {
    sighash("global", name)
}

pub fn event_discriminator(name: &str) -> Discriminator {
    sighash("event", name)
}

fn sighash(namespace: &str, name: &str) -> Discriminator {
    let preimage = format!("{}:{}", namespace, name);
    let hash = hashv(&[preimage.as_bytes()]).to_bytes();
    let mut discriminator = [0u8; 8];
    discriminator.copy_from_slice(&hash[..8]);
    discriminator
}

/// The process-wide schema, built on first use.
pub fn schema() -> &'static Schema {
    static SCHEMA: OnceLock<Schema> = OnceLock::new();
    SCHEMA.get_or_init(Schema::launchlab)
}

pub fn decode_instruction(data: &[u8]) -> Option<LaunchpadInstruction> {
    schema().decode_instruction(data)
}

pub fn decode_event(data: &[u8]) -> Option<ProgramEvent> {
    schema().decode_event(data)
}
