//! Coupon Fixtures

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::{
    coupons::{CouponType, NewCoupon},
    fixtures::FixtureError,
};

/// Wrapper for coupons in YAML
#[derive(Debug, Deserialize)]
pub struct CouponsFixture {
    /// Coupons in creation order
    pub coupons: Vec<CouponFixture>,
}

/// Coupon type in YAML
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CouponTypeFixture {
    /// Percent points off
    #[default]
    Percent,

    /// Fixed amount off
    Amount,
}

/// Coupon Fixture
#[derive(Debug, Deserialize)]
pub struct CouponFixture {
    /// Code customers enter
    pub code: String,

    /// Display name; defaults to the code
    #[serde(default)]
    pub name: Option<String>,

    /// Coupon type
    #[serde(default, rename = "type")]
    pub coupon_type: CouponTypeFixture,

    /// Percent points or amount (e.g., "10")
    pub value: String,

    /// Published flag
    #[serde(default = "published_by_default")]
    pub published: bool,
}

fn published_by_default() -> bool {
    true
}

impl TryFrom<CouponFixture> for NewCoupon {
    type Error = FixtureError;

    fn try_from(fixture: CouponFixture) -> Result<Self, Self::Error> {
        let value = fixture
            .value
            .trim()
            .parse::<Decimal>()
            .map_err(|_err| FixtureError::InvalidPrice(fixture.value.clone()))?;

        Ok(NewCoupon {
            name: fixture.name.unwrap_or_else(|| fixture.code.clone()),
            code: fixture.code,
            value,
            coupon_type: match fixture.coupon_type {
                CouponTypeFixture::Percent => CouponType::Percent,
                CouponTypeFixture::Amount => CouponType::Amount,
            },
            published: fixture.published,
        })
    }
}
