//! Balance shortfall recovery from log lines
//!
//! Programs and the runtime report insufficient balances in a handful of
//! phrasings, all of the form "insufficient X ... have A ... need B". The
//! amounts may carry `,` or `_` digit separators.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static SHORTFALL_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // system program: "Transfer: insufficient lamports 1000, need 1500"
        r"(?i)insufficient (?:lamports|funds|balance)[:\s]+(\d[\d,_]*)\s*,?\s*need(?:ed|s)?[:=\s]+(\d[\d,_]*)",
        // "insufficient funds: current=1000 need=1500" / "available: 1000, required: 1500"
        r"(?i)insufficient \w+\W+(?:current|have|available|balance)[:=\s]+(\d[\d,_]*)\W+(?:need(?:ed|s)?|required)[:=\s]+(\d[\d,_]*)",
        // "balance 1000 is less than required 1500"
        r"(?i)balance[:=\s]+(\d[\d,_]*)\s+is less than (?:required|needed)[:=\s]+(\d[\d,_]*)",
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

/// Amount missing for a failed operation, in base units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Shortfall {
    pub available: u64,
    pub required: u64,
    pub missing: u64,
    /// Decimals used to render base units as whole units
    pub decimals: u8,
}

impl Shortfall {
    /// `None` unless `required` exceeds `available`.
    pub fn new(available: u64, required: u64, decimals: u8) -> Option<Self> {
        (required > available).then(|| Self {
            available,
            required,
            missing: required - available,
            decimals,
        })
    }

    /// Missing amount in whole units, e.g. `"0.5"`.
    pub fn missing_display(&self) -> String {
        format_units(self.missing, self.decimals)
    }

    pub fn missing_ui(&self) -> f64 {
        self.missing as f64 / 10f64.powi(i32::from(self.decimals))
    }
}

/// First shortfall found in `lines`, trying every pattern on each line.
pub fn scan<'a>(lines: impl IntoIterator<Item = &'a str>, decimals: u8) -> Option<Shortfall> {
    lines.into_iter().find_map(|line| {
        SHORTFALL_PATTERNS.iter().find_map(|re| {
            let caps = re.captures(line)?;
            let available = parse_amount(caps.get(1)?.as_str())?;
            let required = parse_amount(caps.get(2)?.as_str())?;
            Shortfall::new(available, required, decimals)
        })
    })
}

fn parse_amount(raw: &str) -> Option<u64> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// Exact decimal rendering of a base-unit amount, trailing zeros trimmed.
pub fn format_units(amount: u64, decimals: u8) -> String {
    let Some(scale) = 10u64.checked_pow(u32::from(decimals)) else {
        return amount.to_string();
    };
    let whole = amount / scale;
    let frac = amount % scale;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{:0width$}", frac, width = usize::from(decimals));
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_transfer_phrasing() {
        let logs = [
            "Program 11111111111111111111111111111111 invoke [1]",
            "Transfer: insufficient lamports 1000000000, need 1500000000",
        ];
        let shortfall = scan(logs, 9).unwrap();
        assert_eq!(shortfall.available, 1_000_000_000);
        assert_eq!(shortfall.required, 1_500_000_000);
        assert_eq!(shortfall.missing, 500_000_000);
        assert_eq!(shortfall.missing_display(), "0.5");
        assert!((shortfall.missing_ui() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_labelled_phrasing_with_separators() {
        let logs = ["Program log: insufficient funds: current=1,000,000,000 need=1,500,000,000"];
        let shortfall = scan(logs, 9).unwrap();
        assert_eq!(shortfall.missing, 500_000_000);

        let logs = ["Error: insufficient balance, available: 250 required: 1000"];
        assert_eq!(scan(logs, 0).unwrap().missing, 750);
    }

    #[test]
    fn test_no_shortfall_when_covered() {
        assert_eq!(scan(["insufficient lamports 10, need 5"], 9), None);
        assert_eq!(scan(["Program log: all good"], 9), None);
        assert_eq!(scan(Vec::<&str>::new(), 9), None);
    }

    #[test]
    fn test_format_units() {
        assert_eq!(format_units(500_000_000, 9), "0.5");
        assert_eq!(format_units(1_250_000, 6), "1.25");
        assert_eq!(format_units(3_000_000_000, 9), "3");
        assert_eq!(format_units(1, 9), "0.000000001");
        assert_eq!(format_units(42, 0), "42");
    }
}
