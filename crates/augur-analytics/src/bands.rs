//! Band distribution over ACTIVE hypotheses

use augur_domain::{Band, Hypothesis};
use serde::Serialize;

/// Count and share of one band
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandShare {
    /// Band name
    pub band: String,
    /// ACTIVE hypotheses in the band
    pub count: usize,
    /// Percentage of ACTIVE hypotheses, 0 when there are none
    pub percentage: f64,
}

/// Every band, lowest first
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandDistribution {
    /// ACTIVE hypotheses counted
    pub total: usize,
    /// One entry per band, all four always present
    pub bands: Vec<BandShare>,
}

impl BandDistribution {
    /// Count of a band
    pub fn count(&self, band: Band) -> usize {
        self.bands
            .iter()
            .find(|b| b.band == band.as_str())
            .map(|b| b.count)
            .unwrap_or(0)
    }
}

/// Distribution of the ACTIVE members of `hypotheses`
pub fn band_distribution(hypotheses: &[Hypothesis]) -> BandDistribution {
    let active: Vec<&Hypothesis> = hypotheses.iter().filter(|h| h.is_active()).collect();
    let total = active.len();
    let bands = Band::ALL
        .iter()
        .map(|band| {
            let count = active.iter().filter(|h| h.band() == *band).count();
            BandShare {
                band: band.as_str().to_string(),
                count,
                percentage: percentage(count, total),
            }
        })
        .collect();

    BandDistribution { total, bands }
}

pub(crate) fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}
