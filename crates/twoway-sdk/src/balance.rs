use std::collections::BTreeMap;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::asset::Asset;
use crate::tx::OutPoint;

/// An unspent output and the value it holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutPointValue {
    pub out_point: OutPoint,
    pub value: Asset,
}

/// Aggregate balances across every address in a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceTotals {
    pub tokens: u64,
    /// Item amounts keyed by genesis hash.
    pub items: BTreeMap<String, u64>,
}

/// Address → outputs, kept in the order the balance source listed them.
///
/// Input selection walks this order, so it must survive deserialization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressList(Vec<(String, Vec<OutPointValue>)>);

impl AddressList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an address, or extend it if already present.
    pub fn push(&mut self, address: impl Into<String>, outputs: Vec<OutPointValue>) {
        let address = address.into();
        match self.0.iter_mut().find(|(a, _)| *a == address) {
            Some((_, existing)) => existing.extend(outputs),
            None => self.0.push((address, outputs)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[OutPointValue])> {
        self.0.iter().map(|(a, o)| (a.as_str(), o.as_slice()))
    }

    pub fn get(&self, address: &str) -> Option<&[OutPointValue]> {
        self.0
            .iter()
            .find(|(a, _)| a == address)
            .map(|(_, o)| o.as_slice())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for AddressList {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (address, outputs) in &self.0 {
            map.serialize_entry(address, outputs)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for AddressList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedVisitor;

        impl<'de> Visitor<'de> for OrderedVisitor {
            type Value = AddressList;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of address to unspent outputs")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut list = AddressList::new();
                while let Some((address, outputs)) =
                    access.next_entry::<String, Vec<OutPointValue>>()?
                {
                    list.push(address, outputs);
                }
                Ok(list)
            }
        }

        deserializer.deserialize_map(OrderedVisitor)
    }
}

/// Read-only balance view a payment is funded from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    pub total: BalanceTotals,
    pub address_list: AddressList,
}

impl BalanceSnapshot {
    /// Build a snapshot from ordered address entries, computing totals.
    pub fn from_entries<I, A>(entries: I) -> Self
    where
        I: IntoIterator<Item = (A, Vec<OutPointValue>)>,
        A: Into<String>,
    {
        let mut snapshot = Self::default();
        for (address, outputs) in entries {
            for output in &outputs {
                match &output.value {
                    Asset::Token(amount) => {
                        snapshot.total.tokens = snapshot.total.tokens.saturating_add(*amount)
                    }
                    Asset::Item(item) => {
                        let entry = snapshot
                            .total
                            .items
                            .entry(item.genesis_hash.clone())
                            .or_default();
                        *entry = entry.saturating_add(item.amount);
                    }
                }
            }
            snapshot.address_list.push(address, outputs);
        }
        snapshot
    }

    /// Aggregate available for assets compatible with `asset`.
    pub fn available_for(&self, asset: &Asset) -> u64 {
        match asset {
            Asset::Token(_) => self.total.tokens,
            Asset::Item(item) => self.total.items.get(&item.genesis_hash).copied().unwrap_or(0),
        }
    }

    /// First address holding an output created by `tx_hash`.
    pub fn owner_of(&self, tx_hash: &str) -> Option<&str> {
        self.address_list
            .iter()
            .find(|(_, outputs)| outputs.iter().any(|o| o.out_point.tx_hash == tx_hash))
            .map(|(address, _)| address)
    }
}
