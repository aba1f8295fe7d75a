//! Integration tests for order snapshot persistence

use std::sync::Arc;

use rust_decimal::Decimal;
use rusty_money::iso::USD;
use serde_json::json;
use testresult::TestResult;

use tally::{
    cart::{AttributeValue, CartLine, Product},
    orders::{
        AdditionalElement, Address, Charge, DocumentKind, EventCategory, MemoryOrderStore,
        OrderDraft, OrderItem, OrderKey, OrderSnapshot, OrderStore,
    },
    shipping::{ShippingMethod, ShippingOption},
    taxes::TaxAmount,
};

fn address(first_name: &str, city: &str) -> Address {
    Address {
        first_name: first_name.to_string(),
        last_name: "Lovelace".to_string(),
        address1: "1 Analytical Way".to_string(),
        city: city.to_string(),
        postal_code: "10001".to_string(),
        country: "US".to_string(),
        ..Address::default()
    }
}

fn shipping() -> ShippingOption {
    ShippingMethod::new("Standard", Decimal::new(495, 2))
        .with_company("Parcelforce")
        .with_areas(vec!["US".to_string()], Vec::new())
        .to_option()
}

fn items() -> TestResult<Vec<OrderItem>> {
    let scarf = CartLine::new(
        Product::new(101, "Scarf", Decimal::new(4000, 2)).with_discount_price(Decimal::new(3500, 2)),
        2,
    )?
    .with_attribute(1, AttributeValue::plain("Charcoal"))
    .with_attribute(
        2,
        AttributeValue::extended("Ada", "engraving", r#"{"font":"serif"}"#),
    )
    .with_promotion(9);

    let gloves = CartLine::new(Product::new(102, "Gloves", Decimal::new(2500, 2)), 1)?
        .with_adjustment(Decimal::new(-250, 2));

    Ok(vec![OrderItem::from(&scarf), OrderItem::from(&gloves)])
}

fn draft() -> TestResult<OrderDraft> {
    Ok(OrderDraft {
        charge: Some(Charge::Payment {
            transaction_id: "txn_1".to_string(),
            charge_text: "Visa ending 4242".to_string(),
        }),
        items: items()?,
        subtotal: Decimal::new(9250, 2),
        total: Decimal::new(10533, 2),
        amount_paid: None,
        tax: Some(TaxAmount {
            name: "Sales tax".to_string(),
            amount: Decimal::new(838, 2),
        }),
        shipping: Some(shipping()),
        shipping_address: Some(address("Ada", "New York")),
        billing_address: Some(address("Ada", "London")),
        email: "ada@example.com".to_string(),
        phone: "+1 555 0100".to_string(),
        instructions: "Leave with the porter".to_string(),
        currency_code: "USD".to_string(),
        purchase_order: "PO-77".to_string(),
        additional_elements: vec![AdditionalElement::new(
            "GiftMessage",
            json!({ "to": "Charles", "message": "Happy holidays" }),
        )],
    })
}

#[test]
fn snapshot_round_trips_every_input() -> TestResult {
    let store: Arc<dyn OrderStore> = Arc::new(MemoryOrderStore::new());
    let key = OrderKey::new("A-1");
    let input = draft()?;

    OrderSnapshot::build(key.clone(), Arc::clone(&store), input.clone())?;

    let reloaded = OrderSnapshot::load(key, store)?;
    let contents = reloaded.contents()?;
    let customer = reloaded.customer()?;

    assert_eq!(contents.subtotal, input.subtotal);
    assert_eq!(contents.total, input.total);
    assert_eq!(contents.amount_paid(), input.total);
    assert_eq!(reloaded.currency()?, USD);
    assert_eq!(contents.items, input.items);
    assert_eq!(contents.taxes, input.tax);
    assert_eq!(contents.shipping, input.shipping);
    assert_eq!(contents.charge(), input.charge);
    assert_eq!(contents.purchase_order, input.purchase_order);
    assert_eq!(
        contents.additional_elements("GiftMessage").collect::<Vec<_>>(),
        input.additional_elements.iter().collect::<Vec<_>>()
    );

    assert_eq!(customer.shipping_address, input.shipping_address);
    assert_eq!(customer.billing_address, input.billing_address);
    assert_eq!(customer.email, input.email);
    assert_eq!(customer.phone, input.phone);
    assert_eq!(customer.instructions, input.instructions);

    Ok(())
}

#[test]
fn item_attributes_keep_their_extensions() -> TestResult {
    let store: Arc<dyn OrderStore> = Arc::new(MemoryOrderStore::new());
    let key = OrderKey::new("A-2");

    OrderSnapshot::build(key.clone(), Arc::clone(&store), draft()?)?;

    let reloaded = OrderSnapshot::load(key, store)?;
    let scarf = reloaded
        .contents()?
        .items
        .first()
        .ok_or("missing item")?
        .attribute_map();

    let engraving = scarf.get(&2).ok_or("missing attribute")?;

    assert_eq!(scarf.get(&1).map(AttributeValue::value), Some("Charcoal"));
    assert_eq!(engraving.value(), "Ada");
    assert_eq!(
        engraving.extension().map(|extension| extension.provider.as_str()),
        Some("engraving")
    );

    Ok(())
}

#[test]
fn activity_is_append_only_and_ordered() -> TestResult {
    let store: Arc<dyn OrderStore> = Arc::new(MemoryOrderStore::new());
    let key = OrderKey::new("A-3");
    let mut snapshot = OrderSnapshot::build(key.clone(), Arc::clone(&store), draft()?)?;

    let categories = [
        EventCategory::Event,
        EventCategory::Note,
        EventCategory::Task,
        EventCategory::Warning,
        EventCategory::Error,
    ];
    let mut logged = Vec::new();

    for (index, category) in categories.into_iter().enumerate() {
        logged.push(snapshot.log_activity(category, format!("entry {index}"))?);

        let reread = OrderSnapshot::load(key.clone(), Arc::clone(&store))?;

        assert_eq!(reread.activity()?, logged.as_slice(), "after {} entries", index + 1);
    }

    Ok(())
}

#[test]
fn edits_leave_other_documents_untouched() -> TestResult {
    let store: Arc<dyn OrderStore> = Arc::new(MemoryOrderStore::new());
    let key = OrderKey::new("A-4");
    let mut snapshot = OrderSnapshot::build(key.clone(), Arc::clone(&store), draft()?)?;
    let customer_before = store.read(&key, DocumentKind::Customer)?;

    snapshot.set_amount_paid(Decimal::new(5000, 2))?;
    snapshot.update_charge(Some(Charge::Card {
        transaction_id: "txn_2".to_string(),
        last4: "4242".to_string(),
        expiration_month: 12,
        expiration_year: 2030,
    }))?;

    let reloaded = OrderSnapshot::load(key.clone(), Arc::clone(&store))?;

    assert_eq!(reloaded.contents()?.amount_paid(), Decimal::new(5000, 2));
    assert_eq!(
        reloaded.contents()?.charge().map(|charge| charge.transaction_id().to_string()),
        Some("txn_2".to_string())
    );
    assert_eq!(store.read(&key, DocumentKind::Customer)?, customer_before);

    Ok(())
}

#[test]
fn legacy_card_documents_are_readable() -> TestResult {
    let store: Arc<dyn OrderStore> = Arc::new(MemoryOrderStore::new());
    let key = OrderKey::new("LEGACY-1");

    store.write(
        &key,
        DocumentKind::Contents,
        json!({
            "subtotal": "20.00",
            "total": "20.00",
            "currencyCode": "GBP",
            "card": {
                "transactionId": "old_1",
                "last4": "1111",
                "expirationMonth": 1,
                "expirationYear": 2020
            },
            "loyaltyPoints": 40
        })
        .to_string(),
    )?;

    let snapshot = OrderSnapshot::load(key, store)?;
    let contents = snapshot.contents()?;

    assert_eq!(
        contents.charge(),
        Some(Charge::Card {
            transaction_id: "old_1".to_string(),
            last4: "1111".to_string(),
            expiration_month: 1,
            expiration_year: 2020,
        })
    );
    assert_eq!(contents.extensions.get("loyaltyPoints"), Some(&json!(40)));
    assert!(snapshot.customer()?.email.is_empty());

    Ok(())
}
