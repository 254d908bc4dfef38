use alloy_primitives::U256;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::amount::{format_units, serialize_decimal_string, to_decimal};
use crate::attribution::AttributedSale;
use crate::currency::CurrencyToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum WindowLabel {
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "7d")]
    SevenDay,
    #[serde(rename = "all")]
    AllTime,
}

impl WindowLabel {
    /// Trailing span of the window; `None` for all-time
    pub fn span(&self) -> Option<Duration> {
        match self {
            WindowLabel::OneDay => Some(Duration::days(1)),
            WindowLabel::SevenDay => Some(Duration::days(7)),
            WindowLabel::AllTime => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeWindow {
    pub window_label: WindowLabel,
    #[serde(serialize_with = "serialize_decimal_string")]
    pub total_amount: U256,
    /// `total_amount` in whole currency units
    pub total_volume: String,
    pub sale_count: u64,
    pub fiat_total: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeStats {
    pub currency_symbol: &'static str,
    pub one_day: VolumeWindow,
    pub seven_day: VolumeWindow,
    pub all_time: VolumeWindow,
    pub currency_unit_price_in_fiat: Option<Decimal>,
    /// Attributed sales that were folded in
    pub sales_considered: u64,
}

#[derive(Debug, Clone, Copy)]
struct Tally {
    label: WindowLabel,
    since: Option<DateTime<Utc>>,
    total: U256,
    count: u64,
}

/// Folds attributed sales into nested trailing windows anchored at an explicit `now`.
///
/// Windows nest: anything in the 1-day window is also in the 7-day and all-time windows.
/// Sales in a currency that is not summable with `unit` are ignored.
#[derive(Debug, Clone)]
pub struct VolumeAccumulator {
    unit: CurrencyToken,
    tallies: [Tally; 3],
    considered: u64,
}

impl VolumeAccumulator {
    pub fn new(now: DateTime<Utc>, unit: CurrencyToken) -> Self {
        let tally = |label: WindowLabel| Tally {
            label,
            since: label.span().map(|span| now - span),
            total: U256::ZERO,
            count: 0,
        };
        Self {
            unit,
            tallies: [
                tally(WindowLabel::OneDay),
                tally(WindowLabel::SevenDay),
                tally(WindowLabel::AllTime),
            ],
            considered: 0,
        }
    }

    /// Returns whether the sale was counted
    pub fn add(&mut self, sale: &AttributedSale) -> bool {
        if !sale.is_sale() {
            return false;
        }
        let Some(consideration) = sale.consideration else {
            return false;
        };
        if !consideration.currency.same_unit(&self.unit) {
            return false;
        }

        for tally in self.tallies.iter_mut() {
            let inside = match (tally.since, sale.timestamp) {
                (None, _) => true,
                (Some(since), Some(at)) => at >= since,
                (Some(_), None) => false,
            };
            if inside {
                tally.total = tally.total.saturating_add(consideration.amount);
                tally.count += 1;
            }
        }
        self.considered += 1;
        true
    }

    pub fn extend<'a>(&mut self, sales: impl IntoIterator<Item = &'a AttributedSale>) {
        for sale in sales {
            self.add(sale);
        }
    }

    pub fn finish(self, unit_price_in_fiat: Option<Decimal>) -> VolumeStats {
        let unit = self.unit;
        let window = |tally: Tally| VolumeWindow {
            window_label: tally.label,
            total_amount: tally.total,
            total_volume: format_units(tally.total, unit.decimals),
            sale_count: tally.count,
            fiat_total: unit_price_in_fiat.and_then(|price| {
                to_decimal(tally.total, unit.decimals).map(|total| (total * price).round_dp(2))
            }),
        };
        let [one_day, seven_day, all_time] = self.tallies;

        VolumeStats {
            currency_symbol: unit.symbol,
            one_day: window(one_day),
            seven_day: window(seven_day),
            all_time: window(all_time),
            currency_unit_price_in_fiat: unit_price_in_fiat,
            sales_considered: self.considered,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribution::{Consideration, SaleKind};
    use crate::currency::{ETH, WETH, WILD};
    use crate::marketplace::Marketplace;
    use alloy_primitives::{Address, B256};
    use std::str::FromStr;

    const WEI: u128 = 1_000_000_000_000_000_000;

    fn sale(at: DateTime<Utc>, whole: u128, currency: CurrencyToken) -> AttributedSale {
        AttributedSale {
            token_id: U256::from(1u8),
            from_address: Address::ZERO,
            to_address: Address::ZERO,
            consideration: Some(Consideration {
                amount: U256::from(whole * WEI),
                currency,
            }),
            kind: SaleKind::Sale,
            marketplace: Marketplace::OpenSea,
            timestamp: Some(at),
            transaction_hash: B256::ZERO,
            block_number: None,
            bundle_size: 1,
        }
    }

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_750_000_000, 0).unwrap()
    }

    #[test]
    fn test_windows_nest() {
        let now = now();
        let mut acc = VolumeAccumulator::new(now, ETH);
        acc.extend(&[
            sale(now - Duration::hours(12), 1, ETH),
            sale(now - Duration::days(3), 2, WETH),
            sale(now - Duration::days(10), 3, ETH),
        ]);
        let stats = acc.finish(None);

        assert_eq!(stats.one_day.total_amount, U256::from(WEI));
        assert_eq!(stats.seven_day.total_amount, U256::from(3 * WEI));
        assert_eq!(stats.all_time.total_amount, U256::from(6 * WEI));
        assert_eq!(stats.one_day.sale_count, 1);
        assert_eq!(stats.seven_day.sale_count, 2);
        assert_eq!(stats.all_time.sale_count, 3);
        assert_eq!(stats.all_time.total_volume, "6.0");
        assert_eq!(stats.one_day.fiat_total, None);
        assert_eq!(stats.currency_unit_price_in_fiat, None);
    }

    #[test]
    fn test_every_one_day_sale_is_in_wider_windows() {
        let now = now();
        let mut acc = VolumeAccumulator::new(now, ETH);
        for hours in [0, 1, 23, 24, 25, 24 * 7, 24 * 7 + 1, 24 * 30] {
            acc.add(&sale(now - Duration::hours(hours), 1, ETH));
        }
        let stats = acc.finish(None);
        assert!(stats.one_day.sale_count <= stats.seven_day.sale_count);
        assert!(stats.seven_day.sale_count <= stats.all_time.sale_count);
        // boundaries are inclusive
        assert_eq!(stats.one_day.sale_count, 4);
        assert_eq!(stats.seven_day.sale_count, 6);
        assert_eq!(stats.all_time.sale_count, 8);
    }

    #[test]
    fn test_other_units_and_transfers_are_ignored() {
        let now = now();
        let mut acc = VolumeAccumulator::new(now, ETH);
        assert!(!acc.add(&sale(now, 900, WILD)));

        let mut transfer = sale(now, 1, ETH);
        transfer.kind = SaleKind::Transfer;
        transfer.consideration = None;
        assert!(!acc.add(&transfer));

        let stats = acc.finish(None);
        assert_eq!(stats.all_time.sale_count, 0);
        assert_eq!(stats.sales_considered, 0);
    }

    #[test]
    fn test_fiat_totals_use_the_price() {
        let now = now();
        let mut acc = VolumeAccumulator::new(now, WILD);
        acc.add(&sale(now, 1000, WILD));
        let stats = acc.finish(Some(Decimal::from_str("0.0123").unwrap()));

        assert_eq!(stats.currency_symbol, "WILD");
        assert_eq!(stats.all_time.fiat_total, Some(Decimal::from_str("12.30").unwrap()));
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["oneDay"]["windowLabel"], "1d");
        assert_eq!(json["allTime"]["totalAmount"], "1000000000000000000000");
    }
}
