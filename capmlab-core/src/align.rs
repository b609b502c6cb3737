//! Three-way date alignment of firm, market and risk-free series.
//!
//! Inner join on date: a date survives only when all three series report a
//! finite level and a defined return for it. Unlike a union timeline there
//! is no void-filling, because every downstream statistic needs all three legs.

use crate::error::MetricsError;
use crate::series::{ReturnRecord, ReturnSeries};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One date on which firm, market and risk-free all have data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlignedObservation {
    pub date: NaiveDate,
    pub firm_level: f64,
    pub market_level: f64,
    pub rf_level: f64,
    pub r_firm: f64,
    pub r_market: f64,
    pub r_rf: f64,
}

impl AlignedObservation {
    /// `r_market - r_rf`, the regressor of the market model.
    pub fn excess_market(&self) -> f64 {
        self.r_market - self.r_rf
    }

    /// `r_firm - r_rf`, the regressand of the market model.
    pub fn excess_firm(&self) -> f64 {
        self.r_firm - self.r_rf
    }

    fn is_complete(&self) -> bool {
        [
            self.firm_level,
            self.market_level,
            self.rf_level,
            self.r_firm,
            self.r_market,
            self.r_rf,
        ]
        .iter()
        .all(|v| v.is_finite())
    }
}

/// Aligned observations, sorted by date, at least two rows long.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedSeries {
    observations: Vec<AlignedObservation>,
}

impl AlignedSeries {
    /// Wrap observations, enforcing the ordering and length invariants.
    pub fn new(mut observations: Vec<AlignedObservation>) -> Result<Self, MetricsError> {
        observations.retain(AlignedObservation::is_complete);
        observations.sort_by_key(|o| o.date);
        observations.dedup_by_key(|o| o.date);
        if observations.len() < 2 {
            return Err(MetricsError::InsufficientData {
                observations: observations.len(),
            });
        }
        Ok(Self { observations })
    }

    pub fn observations(&self) -> &[AlignedObservation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn first(&self) -> &AlignedObservation {
        &self.observations[0]
    }

    pub fn last(&self) -> &AlignedObservation {
        &self.observations[self.observations.len() - 1]
    }

    pub fn r_firm(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.r_firm).collect()
    }

    pub fn r_rf(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.r_rf).collect()
    }

    /// BLAKE3 over dates and levels of all three legs.
    ///
    /// Two runs over the same aligned inputs produce the same hash.
    pub fn dataset_hash(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for o in &self.observations {
            hasher.update(o.date.to_string().as_bytes());
            hasher.update(&o.firm_level.to_le_bytes());
            hasher.update(&o.market_level.to_le_bytes());
            hasher.update(&o.rf_level.to_le_bytes());
        }
        hasher.finalize().to_hex().to_string()
    }
}

/// Inner-join the three series on date and drop incomplete rows.
pub fn align(
    firm: &ReturnSeries,
    market: &ReturnSeries,
    rf: &ReturnSeries,
) -> Result<AlignedSeries, MetricsError> {
    let market_by_date = index_by_date(market.records());
    let rf_by_date = index_by_date(rf.records());

    let joined: Vec<AlignedObservation> = firm
        .records()
        .iter()
        .filter_map(|f| {
            let m = market_by_date.get(&f.date)?;
            let r = rf_by_date.get(&f.date)?;
            Some(AlignedObservation {
                date: f.date,
                firm_level: f.level,
                market_level: m.level,
                rf_level: r.level,
                r_firm: f.ret?,
                r_market: m.ret?,
                r_rf: r.ret?,
            })
        })
        .collect();

    AlignedSeries::new(joined)
}

fn index_by_date(records: &[ReturnRecord]) -> HashMap<NaiveDate, &ReturnRecord> {
    records.iter().map(|r| (r.date, r)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::RawPricePoint;
    use crate::series::Role;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(day as i64)
    }

    fn series(role: Role, rows: &[(u32, f64)]) -> ReturnSeries {
        let points: Vec<RawPricePoint> = rows
            .iter()
            .map(|&(day, level)| RawPricePoint::new(d(day), level))
            .collect();
        ReturnSeries::from_points(role, "T", &points).unwrap()
    }

    #[test]
    fn keeps_only_common_dates_with_defined_returns() {
        let firm = series(
            Role::Firm,
            &[(0, 100.0), (1, 101.0), (2, 102.0), (3, 103.0), (4, 104.0)],
        );
        // market missing day 2
        let market = series(Role::Market, &[(0, 50.0), (1, 50.5), (3, 51.0), (4, 51.5)]);
        // rf missing day 4
        let rf = series(Role::RiskFree, &[(0, 5.0), (1, 5.0), (2, 5.0), (3, 5.0)]);

        let aligned = align(&firm, &market, &rf).unwrap();
        let dates: Vec<NaiveDate> = aligned.observations().iter().map(|o| o.date).collect();
        // day 0 dropped (no prior period), day 2 and 4 missing from a leg
        assert_eq!(dates, vec![d(1), d(3)]);
        // market return on day 3 spans the gap: 51.0 / 50.5 - 1
        assert!((aligned.observations()[1].r_market - (51.0 / 50.5 - 1.0)).abs() < 1e-12);
        assert_eq!(aligned.first().rf_level, 0.05);
    }

    #[test]
    fn fewer_than_two_rows_is_insufficient() {
        let firm = series(Role::Firm, &[(0, 100.0), (1, 101.0)]);
        let market = series(Role::Market, &[(0, 50.0), (1, 50.5)]);
        let rf = series(Role::RiskFree, &[(0, 5.0), (1, 5.0)]);
        let err = align(&firm, &market, &rf).unwrap_err();
        assert_eq!(err, MetricsError::InsufficientData { observations: 1 });
    }

    #[test]
    fn disjoint_dates_yield_zero_rows() {
        let firm = series(Role::Firm, &[(0, 1.0), (1, 2.0), (2, 3.0)]);
        let market = series(Role::Market, &[(10, 1.0), (11, 2.0), (12, 3.0)]);
        let rf = series(Role::RiskFree, &[(0, 1.0), (1, 1.0), (2, 1.0)]);
        let err = align(&firm, &market, &rf).unwrap_err();
        assert_eq!(err, MetricsError::InsufficientData { observations: 0 });
    }

    #[test]
    fn dataset_hash_is_deterministic_and_input_sensitive() {
        let firm = series(Role::Firm, &[(0, 100.0), (1, 101.0), (2, 103.0)]);
        let market = series(Role::Market, &[(0, 50.0), (1, 50.5), (2, 50.7)]);
        let rf = series(Role::RiskFree, &[(0, 5.0), (1, 5.0), (2, 5.0)]);
        let a = align(&firm, &market, &rf).unwrap();
        let b = align(&firm, &market, &rf).unwrap();
        assert_eq!(a.dataset_hash(), b.dataset_hash());

        let firm2 = series(Role::Firm, &[(0, 100.0), (1, 101.0), (2, 104.0)]);
        let c = align(&firm2, &market, &rf).unwrap();
        assert_ne!(a.dataset_hash(), c.dataset_hash());
    }

    fn arb_rows() -> impl Strategy<Value = Vec<(u32, f64)>> {
        prop::collection::btree_map(0u32..40, 1.0..200.0_f64, 0..30)
            .prop_map(|m| m.into_iter().collect())
    }

    proptest! {
        /// Output dates = intersection of inputs minus each series' first date.
        #[test]
        fn aligned_dates_are_the_intersection(
            f in arb_rows(),
            m in arb_rows(),
            r in arb_rows(),
        ) {
            prop_assume!(!f.is_empty() && !m.is_empty() && !r.is_empty());
            let firm = series(Role::Firm, &f);
            let market = series(Role::Market, &m);
            let rf = series(Role::RiskFree, &r);

            let dates = |rows: &[(u32, f64)]| {
                rows.iter().map(|(day, _)| *day).collect::<BTreeSet<u32>>()
            };
            let mut expected: BTreeSet<u32> = dates(&f)
                .intersection(&dates(&m))
                .copied()
                .collect::<BTreeSet<u32>>()
                .intersection(&dates(&r))
                .copied()
                .collect();
            // first firm and market rows have no return
            expected.remove(&f[0].0);
            expected.remove(&m[0].0);
            let expected: Vec<NaiveDate> = expected.into_iter().map(d).collect();

            match align(&firm, &market, &rf) {
                Ok(aligned) => {
                    let got: Vec<NaiveDate> =
                        aligned.observations().iter().map(|o| o.date).collect();
                    prop_assert_eq!(&got, &expected);
                    prop_assert!(got.windows(2).all(|w| w[0] < w[1]));
                    prop_assert!(aligned.len() <= firm.len().min(market.len()).min(rf.len()));
                }
                Err(MetricsError::InsufficientData { observations }) => {
                    prop_assert_eq!(observations, expected.len());
                    prop_assert!(observations < 2);
                }
                Err(other) => prop_assert!(false, "unexpected error {other:?}"),
            }
        }
    }
}
