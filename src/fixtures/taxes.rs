//! Tax Fixtures

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::{
    fixtures::{FixtureError, parse_rate},
    taxes::{Tax, TaxRule},
};

/// Wrapper for taxes in YAML
#[derive(Debug, Deserialize)]
pub struct TaxesFixture {
    /// Tax definitions
    pub taxes: Vec<TaxFixture>,
}

/// Tax fixture
#[derive(Debug, Deserialize)]
pub struct TaxFixture {
    /// Tax name
    pub name: String,

    /// Priority
    #[serde(default)]
    pub priority: i32,

    /// Rule
    #[serde(flatten)]
    pub rule: TaxRuleFixture,
}

/// Tax rule with rates written as "8%" or "0.08"
#[derive(Debug, Deserialize)]
#[serde(tag = "kind")]
pub enum TaxRuleFixture {
    /// One rate for a country
    Country {
        /// Country, or `*` for all
        country: String,
        /// Rate
        rate: String,
    },

    /// Rates per zip code
    ZipCode {
        /// Zip code to rate
        rates: BTreeMap<String, String>,
    },
}

impl TryFrom<TaxFixture> for Tax {
    type Error = FixtureError;

    fn try_from(fixture: TaxFixture) -> Result<Self, Self::Error> {
        let rule = match fixture.rule {
            TaxRuleFixture::Country { country, rate } => TaxRule::Country {
                country,
                rate: parse_rate(&rate)?,
            },
            TaxRuleFixture::ZipCode { rates } => TaxRule::ZipCode {
                rates: rates
                    .into_iter()
                    .map(|(zip, rate)| Ok((zip, parse_rate(&rate)?)))
                    .collect::<Result<_, FixtureError>>()?,
            },
        };

        Ok(Tax {
            name: fixture.name,
            priority: fixture.priority,
            rule,
        })
    }
}
