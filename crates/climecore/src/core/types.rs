//! Domain types shared by the store, the cart and the bot.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumIter, EnumString};

use crate::core::error::{AppError, AppResult};

/// Stable inventory key (the row id of the record).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(pub i64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ItemId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<i64>().map(ItemId)
    }
}

/// Goldmine grading used by the shop and by Discogs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, AsRefStr, EnumIter, Serialize, Deserialize)]
#[strum(ascii_case_insensitive)]
pub enum Condition {
    #[strum(serialize = "m")]
    Mint,
    #[strum(serialize = "nm")]
    NearMint,
    #[strum(serialize = "vg+")]
    VeryGoodPlus,
    #[strum(serialize = "vg")]
    VeryGood,
    #[strum(serialize = "g+")]
    GoodPlus,
    #[strum(serialize = "g")]
    Good,
    #[strum(serialize = "f")]
    Fair,
    #[strum(serialize = "p")]
    Poor,
}

impl Condition {
    /// Short code stored in the inventory ("vg+").
    pub fn code(&self) -> &str {
        self.as_ref()
    }

    /// Name as Discogs keys its price suggestions.
    pub fn full_name(&self) -> &'static str {
        match self {
            Condition::Mint => "Mint (M)",
            Condition::NearMint => "Near Mint (NM or M-)",
            Condition::VeryGoodPlus => "Very Good Plus (VG+)",
            Condition::VeryGood => "Very Good (VG)",
            Condition::GoodPlus => "Good Plus (G+)",
            Condition::Good => "Good (G)",
            Condition::Fair => "Fair (F)",
            Condition::Poor => "Poor (P)",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code().to_uppercase())
    }
}

/// How the customer paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumString, AsRefStr, EnumIter, Serialize, Deserialize)]
#[strum(ascii_case_insensitive)]
pub enum PaymentMethod {
    #[strum(serialize = "cash")]
    Cash,
    /// Card terminal
    #[strum(serialize = "pos")]
    Pos,
}

impl PaymentMethod {
    pub fn label(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "Cash",
            PaymentMethod::Pos => "POS",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One record row in the inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: ItemId,
    pub artist: String,
    pub title: String,
    pub genre: String,
    pub style: String,
    pub label: String,
    pub format: String,
    pub condition: Condition,
    pub price: Decimal,
    pub quantity: u32,
    pub catalog_id: Option<u64>,
}

impl InventoryItem {
    /// "Artist - Title", the way records are shelved.
    pub fn display_name(&self) -> String {
        display_name(&self.artist, &self.title)
    }
}

/// Fields for a record that is not in the inventory yet.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewInventoryItem {
    pub artist: String,
    pub title: String,
    pub genre: String,
    pub style: String,
    pub label: String,
    pub format: String,
    pub condition: Option<Condition>,
    pub price: Decimal,
    pub quantity: i64,
    pub catalog_id: Option<u64>,
}

pub fn display_name(artist: &str, title: &str) -> String {
    if artist.is_empty() {
        title.to_string()
    } else {
        format!("{} - {}", artist, title)
    }
}

/// Splits "Artist - Title" on the first separator.
pub fn split_artist_title(raw: &str) -> (String, String) {
    match raw.split_once(" - ") {
        Some((artist, title)) => (artist.trim().to_string(), title.trim().to_string()),
        None => (String::new(), raw.trim().to_string()),
    }
}

/// Parses a shop price such as "20", "19.5" or "$12,99".
pub fn parse_price(input: &str) -> AppResult<Decimal> {
    let cleaned = input.trim().trim_start_matches('$').replace(',', ".");
    let value = Decimal::from_str(&cleaned)
        .map_err(|_| AppError::Validation(format!("'{}' is not a valid price", input.trim())))?;
    if value.is_sign_negative() {
        return Err(AppError::Validation("Price cannot be negative".to_string()));
    }
    Ok(value.round_dp(2))
}

/// Parses a positive whole quantity typed by the user.
pub fn parse_quantity(input: &str) -> AppResult<u32> {
    let raw = input.trim();
    let value: i64 = raw.parse().map_err(|_| AppError::InvalidQuantity(raw.to_string()))?;
    positive_quantity(value)
}

/// Rejects zero and negative quantities.
pub fn positive_quantity(value: i64) -> AppResult<u32> {
    if value < 1 {
        return Err(AppError::InvalidQuantity(value.to_string()));
    }
    u32::try_from(value).map_err(|_| AppError::InvalidQuantity(value.to_string()))
}

pub fn format_money(amount: Decimal) -> String {
    format!("${:.2}", amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_condition_codes_round_trip_case_insensitive() {
        assert_eq!(Condition::from_str("VG+").unwrap(), Condition::VeryGoodPlus);
        assert_eq!(Condition::from_str("nm").unwrap(), Condition::NearMint);
        assert!(Condition::from_str("excellent").is_err());
        assert_eq!(Condition::iter().count(), 8);
        assert_eq!(Condition::GoodPlus.to_string(), "G+");
    }

    #[test]
    fn test_payment_method_parse() {
        assert_eq!(PaymentMethod::from_str("POS").unwrap(), PaymentMethod::Pos);
        assert_eq!(PaymentMethod::Cash.as_ref(), "cash");
    }

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price("20").unwrap(), Decimal::new(2000, 2));
        assert_eq!(parse_price(" $12,99 ").unwrap(), Decimal::new(1299, 2));
        assert_eq!(parse_price("9.999").unwrap(), Decimal::new(1000, 2));
        assert!(parse_price("-1").is_err());
        assert!(parse_price("ok").is_err());
    }

    #[test]
    fn test_parse_quantity_rejects_non_positive_and_non_integer() {
        assert_eq!(parse_quantity("3").unwrap(), 3);
        for input in ["0", "-2", "2.5", "abc", ""] {
            match parse_quantity(input) {
                Err(AppError::InvalidQuantity(raw)) => assert_eq!(raw, input),
                other => panic!("{input:?} gave {other:?}"),
            }
        }
    }

    #[test]
    fn test_split_artist_title() {
        assert_eq!(
            split_artist_title("Can - Tago Mago"),
            ("Can".to_string(), "Tago Mago".to_string())
        );
        assert_eq!(
            split_artist_title("Various - Nuggets - Vol. 1"),
            ("Various".to_string(), "Nuggets - Vol. 1".to_string())
        );
        assert_eq!(split_artist_title("Untitled"), (String::new(), "Untitled".to_string()));
    }

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(Decimal::new(6000, 2)), "$60.00");
        assert_eq!(format_money(Decimal::new(5, 0)), "$5.00");
    }
}
