//! Account positions in the instructions whose events we project.

pub mod initialize {
    pub const PAYER: usize = 0;
    pub const CREATOR: usize = 1;
    pub const GLOBAL_CONFIG: usize = 2;
    pub const PLATFORM_CONFIG: usize = 3;
    pub const AUTHORITY: usize = 4;
    pub const POOL_STATE: usize = 5;
    pub const BASE_MINT: usize = 6;
    pub const QUOTE_MINT: usize = 7;
}

/// Shared by the four buy/sell instructions.
pub mod trade {
    pub const PAYER: usize = 0;
    pub const AUTHORITY: usize = 1;
    pub const GLOBAL_CONFIG: usize = 2;
    pub const PLATFORM_CONFIG: usize = 3;
    pub const POOL_STATE: usize = 4;
    pub const BASE_TOKEN_MINT: usize = 9;
    pub const QUOTE_TOKEN_MINT: usize = 10;
}
