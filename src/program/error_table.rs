//! Custom error codes published by the remote program

use std::collections::BTreeMap;

/// First code of the program's user error range (Anchor convention)
pub const USER_ERROR_OFFSET: u32 = 6000;

/// Small-integer → human message table
#[derive(Debug, Clone, Default)]
pub struct ErrorTable {
    entries: BTreeMap<u32, ErrorEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorEntry {
    pub name: String,
    pub message: String,
}

impl ErrorTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from `(name, message)` pairs numbered from `offset`.
    pub fn from_ordered(offset: u32, entries: &[(&str, &str)]) -> Self {
        let entries = entries
            .iter()
            .enumerate()
            .map(|(i, (name, message))| {
                (
                    offset + i as u32,
                    ErrorEntry {
                        name: (*name).to_string(),
                        message: (*message).to_string(),
                    },
                )
            })
            .collect();
        Self { entries }
    }

    /// Table of the stock perpetuals program.
    pub fn perpetuals() -> Self {
        Self::from_ordered(
            USER_ERROR_OFFSET,
            &[
                ("MathOverflow", "Overflow in arithmetic operation"),
                ("UnsupportedOracle", "Unsupported price oracle"),
                ("InvalidOracleAccount", "Invalid oracle account"),
                ("InvalidOracleState", "Invalid oracle state"),
                ("StaleOraclePrice", "Stale oracle price"),
                ("InvalidOraclePrice", "Invalid oracle price"),
                ("InvalidEnvironment", "Instruction is not allowed in production"),
                ("InvalidPoolState", "Invalid pool state"),
                ("InvalidCustodyState", "Invalid custody state"),
                ("InvalidPositionState", "Invalid position state"),
                ("InvalidPerpetualsConfig", "Invalid perpetuals config"),
                ("InvalidPoolConfig", "Invalid pool config"),
                ("InvalidCustodyConfig", "Invalid custody config"),
                ("InsufficientAmountReturned", "Insufficient token amount returned"),
                ("MaxPriceSlippage", "Price slippage limit exceeded"),
                ("MaxLeverage", "Position leverage limit exceeded"),
                ("CustodyAmountLimit", "Custody amount limit exceeded"),
                ("PositionAmountLimit", "Position amount limit exceeded"),
                ("TokenRatioOutOfRange", "Token ratio out of range"),
                ("UnsupportedToken", "Token is not supported"),
                ("InstructionNotAllowed", "Instruction is not allowed at this time"),
                ("MaxUtilization", "Token utilization limit exceeded"),
            ],
        )
    }

    pub fn insert(&mut self, code: u32, name: impl Into<String>, message: impl Into<String>) {
        self.entries.insert(
            code,
            ErrorEntry {
                name: name.into(),
                message: message.into(),
            },
        );
    }

    pub fn get(&self, code: u32) -> Option<&ErrorEntry> {
        self.entries.get(&code)
    }

    pub fn message(&self, code: u32) -> Option<&str> {
        self.get(code).map(|e| e.message.as_str())
    }

    /// Reverse lookup used for Anchor logs that print the error name.
    pub fn code_for_name(&self, name: &str) -> Option<u32> {
        self.entries
            .iter()
            .find(|(_, e)| e.name == name)
            .map(|(code, _)| *code)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
