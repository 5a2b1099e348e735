//! Inline keyboard callback payloads.
//!
//! Format: `<flow>:<action>[:<arg>]`, e.g. `sell:add:42`, `add:cond:vg+`.
//! Telegram limits callback data to 64 bytes; every payload here stays far below.

use std::fmt;
use std::str::FromStr;

use climecore::core::types::{Condition, ItemId, PaymentMethod};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    /// Put one copy of a record into the cart
    SellAdd(ItemId),
    SellPage(u32),
    SellCart,
    SellDecrement(ItemId),
    SellRemove(ItemId),
    SellPay(PaymentMethod),
    SellConfirm,
    /// Back from the payment step (or the cart) to the record list
    SellBack,
    SellCancel,
    /// Index into the current page of catalog results
    AddPick(usize),
    AddPage(u32),
    AddManual,
    AddCondition(Condition),
    AddCancel,
}

impl CallbackAction {
    pub fn data(&self) -> String {
        self.to_string()
    }

    /// Whether the button belongs to the `/sell` flow.
    pub fn is_sell(&self) -> bool {
        matches!(
            self,
            Self::SellAdd(_)
                | Self::SellPage(_)
                | Self::SellCart
                | Self::SellDecrement(_)
                | Self::SellRemove(_)
                | Self::SellPay(_)
                | Self::SellConfirm
                | Self::SellBack
                | Self::SellCancel
        )
    }
}

impl fmt::Display for CallbackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallbackAction::SellAdd(id) => write!(f, "sell:add:{}", id),
            CallbackAction::SellPage(page) => write!(f, "sell:page:{}", page),
            CallbackAction::SellCart => f.write_str("sell:cart"),
            CallbackAction::SellDecrement(id) => write!(f, "sell:dec:{}", id),
            CallbackAction::SellRemove(id) => write!(f, "sell:rm:{}", id),
            CallbackAction::SellPay(method) => write!(f, "sell:pay:{}", method.as_ref()),
            CallbackAction::SellConfirm => f.write_str("sell:confirm"),
            CallbackAction::SellBack => f.write_str("sell:back"),
            CallbackAction::SellCancel => f.write_str("sell:cancel"),
            CallbackAction::AddPick(idx) => write!(f, "add:pick:{}", idx),
            CallbackAction::AddPage(page) => write!(f, "add:page:{}", page),
            CallbackAction::AddManual => f.write_str("add:manual"),
            CallbackAction::AddCondition(c) => write!(f, "add:cond:{}", c.code()),
            CallbackAction::AddCancel => f.write_str("add:cancel"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCallback(pub String);

impl fmt::Display for UnknownCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown callback data '{}'", self.0)
    }
}

impl std::error::Error for UnknownCallback {}

impl FromStr for CallbackAction {
    type Err = UnknownCallback;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let unknown = || UnknownCallback(data.to_string());
        let mut parts = data.splitn(3, ':');
        let flow = parts.next().unwrap_or_default();
        let action = parts.next().unwrap_or_default();
        let arg = parts.next();

        let action = match (flow, action, arg) {
            ("sell", "add", Some(id)) => CallbackAction::SellAdd(id.parse().map_err(|_| unknown())?),
            ("sell", "page", Some(page)) => CallbackAction::SellPage(page.parse().map_err(|_| unknown())?),
            ("sell", "cart", None) => CallbackAction::SellCart,
            ("sell", "dec", Some(id)) => CallbackAction::SellDecrement(id.parse().map_err(|_| unknown())?),
            ("sell", "rm", Some(id)) => CallbackAction::SellRemove(id.parse().map_err(|_| unknown())?),
            ("sell", "pay", Some(method)) => CallbackAction::SellPay(method.parse().map_err(|_| unknown())?),
            ("sell", "confirm", None) => CallbackAction::SellConfirm,
            ("sell", "back", None) => CallbackAction::SellBack,
            ("sell", "cancel", None) => CallbackAction::SellCancel,
            ("add", "pick", Some(idx)) => CallbackAction::AddPick(idx.parse().map_err(|_| unknown())?),
            ("add", "page", Some(page)) => CallbackAction::AddPage(page.parse().map_err(|_| unknown())?),
            ("add", "manual", None) => CallbackAction::AddManual,
            ("add", "cond", Some(code)) => CallbackAction::AddCondition(code.parse().map_err(|_| unknown())?),
            ("add", "cancel", None) => CallbackAction::AddCancel,
            _ => return Err(unknown()),
        };
        Ok(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_sell_actions() {
        assert_eq!("sell:add:42".parse(), Ok(CallbackAction::SellAdd(ItemId(42))));
        assert_eq!("sell:pay:pos".parse(), Ok(CallbackAction::SellPay(PaymentMethod::Pos)));
        assert_eq!("sell:confirm".parse(), Ok(CallbackAction::SellConfirm));
        assert!(CallbackAction::SellBack.is_sell());
        assert!(!CallbackAction::AddManual.is_sell());
    }

    #[test]
    fn test_condition_codes_with_plus_survive() {
        let data = CallbackAction::AddCondition(Condition::GoodPlus).data();
        assert_eq!(data, "add:cond:g+");
        assert_eq!(data.parse(), Ok(CallbackAction::AddCondition(Condition::GoodPlus)));
    }

    #[test]
    fn test_rejects_garbage() {
        for data in ["", "sell", "sell:add", "sell:add:x", "sell:pay:card", "sell:confirm:1", "mode:audio"] {
            assert!(data.parse::<CallbackAction>().is_err(), "{data} should not parse");
        }
    }
}
