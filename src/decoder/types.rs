//! Borsh layouts for the LaunchLab program's instruction arguments and events.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_sdk::pubkey::Pubkey;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct MintParams {
    pub decimals: u8,
    pub name: String,
    pub symbol: String,
    pub uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct ConstantCurve {
    pub supply: u64,
    pub total_base_sell: u64,
    pub total_quote_fund_raising: u64,
    pub migrate_type: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct FixedCurve {
    pub supply: u64,
    pub total_quote_fund_raising: u64,
    pub migrate_type: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct LinearCurve {
    pub supply: u64,
    pub total_quote_fund_raising: u64,
    pub migrate_type: u8,
}

/// Bonding curve parameters chosen at pool creation.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum CurveParams {
    Constant { data: ConstantCurve },
    Fixed { data: FixedCurve },
    Linear { data: LinearCurve },
}

impl CurveParams {
    pub fn supply(&self) -> u64 {
        match self {
            CurveParams::Constant { data } => data.supply,
            CurveParams::Fixed { data } => data.supply,
            CurveParams::Linear { data } => data.supply,
        }
    }

    /// Only constant curves fix the amount of base sold up front.
    pub fn total_base_sell(&self) -> u64 {
        match self {
            CurveParams::Constant { data } => data.total_base_sell,
            CurveParams::Fixed { .. } | CurveParams::Linear { .. } => 0,
        }
    }

    pub fn total_quote_fund_raising(&self) -> u64 {
        match self {
            CurveParams::Constant { data } => data.total_quote_fund_raising,
            CurveParams::Fixed { data } => data.total_quote_fund_raising,
            CurveParams::Linear { data } => data.total_quote_fund_raising,
        }
    }

    pub fn migrate_type(&self) -> u8 {
        match self {
            CurveParams::Constant { data } => data.migrate_type,
            CurveParams::Fixed { data } => data.migrate_type,
            CurveParams::Linear { data } => data.migrate_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct VestingParams {
    pub total_locked_amount: u64,
    pub cliff_period: u64,
    pub unlock_period: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum TradeDirection {
    Buy,
    Sell,
}

impl TradeDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeDirection::Buy => "buy",
            TradeDirection::Sell => "sell",
        }
    }
}

impl fmt::Display for TradeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TradeDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buy" => Ok(TradeDirection::Buy),
            "sell" => Ok(TradeDirection::Sell),
            other => Err(format!("unknown trade direction: {}", other)),
        }
    }
}

/// Lifecycle phase of a bonding-curve pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum PoolStatus {
    Fund,
    Migrate,
    Trade,
}

impl PoolStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PoolStatus::Fund => "Fund",
            PoolStatus::Migrate => "Migrate",
            PoolStatus::Trade => "Trade",
        }
    }
}

impl fmt::Display for PoolStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PoolStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Fund" => Ok(PoolStatus::Fund),
            "Migrate" => Ok(PoolStatus::Migrate),
            "Trade" => Ok(PoolStatus::Trade),
            other => Err(format!("unknown pool status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct InitializeArgs {
    pub base_mint_param: MintParams,
    pub curve_param: CurveParams,
    pub vesting_param: VestingParams,
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct ExactInArgs {
    pub amount_in: u64,
    pub minimum_amount_out: u64,
    pub share_fee_rate: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct ExactOutArgs {
    pub amount_out: u64,
    pub maximum_amount_in: u64,
    pub share_fee_rate: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct MigrateToAmmArgs {
    pub base_lot_size: u64,
    pub quote_tick_size: u64,
    pub market_vault_signer_nonce: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct PoolCreateEvent {
    pub pool_state: Pubkey,
    pub creator: Pubkey,
    pub config: Pubkey,
    pub base_mint_param: MintParams,
    pub curve_param: CurveParams,
    pub vesting_param: VestingParams,
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct TradeEvent {
    pub pool_state: Pubkey,
    pub total_base_sell: u64,
    pub virtual_base: u64,
    pub virtual_quote: u64,
    pub real_base_before: u64,
    pub real_quote_before: u64,
    pub real_base_after: u64,
    pub real_quote_after: u64,
    pub amount_in: u64,
    pub amount_out: u64,
    pub protocol_fee: u64,
    pub platform_fee: u64,
    pub share_fee: u64,
    pub trade_direction: TradeDirection,
    pub pool_status: PoolStatus,
}

impl TradeEvent {
    /// Base and quote amounts that changed hands, independent of direction.
    pub fn base_and_quote_amounts(&self) -> (u64, u64) {
        match self.trade_direction {
            TradeDirection::Buy => (self.amount_out, self.amount_in),
            TradeDirection::Sell => (self.amount_in, self.amount_out),
        }
    }
}

/// A decoded top-level (or nested) program instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchpadInstruction {
    Initialize(InitializeArgs),
    BuyExactIn(ExactInArgs),
    BuyExactOut(ExactOutArgs),
    SellExactIn(ExactInArgs),
    SellExactOut(ExactOutArgs),
    ClaimPlatformFee,
    MigrateToAmm(MigrateToAmmArgs),
    MigrateToCpswap,
}

impl LaunchpadInstruction {
    pub fn name(&self) -> &'static str {
        match self {
            LaunchpadInstruction::Initialize(_) => "initialize",
            LaunchpadInstruction::BuyExactIn(_) => "buy_exact_in",
            LaunchpadInstruction::BuyExactOut(_) => "buy_exact_out",
            LaunchpadInstruction::SellExactIn(_) => "sell_exact_in",
            LaunchpadInstruction::SellExactOut(_) => "sell_exact_out",
            LaunchpadInstruction::ClaimPlatformFee => "claim_platform_fee",
            LaunchpadInstruction::MigrateToAmm(_) => "migrate_to_amm",
            LaunchpadInstruction::MigrateToCpswap => "migrate_to_cpswap",
        }
    }
}

/// A decoded self-invocation event payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgramEvent {
    PoolCreate(PoolCreateEvent),
    Trade(TradeEvent),
}

impl ProgramEvent {
    pub const POOL_CREATE: &'static str = "PoolCreateEvent";
    pub const TRADE: &'static str = "TradeEvent";

    pub fn name(&self) -> &'static str {
        match self {
            ProgramEvent::PoolCreate(_) => Self::POOL_CREATE,
            ProgramEvent::Trade(_) => Self::TRADE,
        }
    }
}
