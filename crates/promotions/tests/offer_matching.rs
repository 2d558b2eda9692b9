//! End-to-end offer evaluation: matching, benefit calculation and usage limits.

use std::sync::Arc;

use chrono::Utc;
use common::{Money, OrderId, UserId};
use promotions::{
    ApplicationRecorder, BasketLine, InMemoryApplicationRecorder, Offer, OfferBenefit,
    OfferCondition, OfferMatcher, OfferNotEligible, OfferRange, PromotionError, UnitGroup,
    UsageSnapshot, in_range,
};

fn groups_for(offer: &Offer, basket: &[BasketLine]) -> Vec<UnitGroup> {
    in_range(&offer.range, basket)
        .map(|(index, line)| UnitGroup {
            line: index,
            product_id: line.product_id.clone(),
            unit_price: line.unit_price,
            quantity: line.quantity,
        })
        .collect()
}

mod scenarios {
    use super::*;

    #[test]
    fn ten_percent_off_thirty_leaves_twenty_seven() {
        let basket = vec![BasketLine::new("A", Money::from_units(10), 3)];
        let offers = vec![Offer::new(
            "10% over 25",
            OfferRange::all_products(),
            OfferCondition::BasketValue(Money::from_units(25)),
            OfferBenefit::percentage(10),
        )];

        let eligible =
            OfferMatcher::new(Utc::now()).find_eligible(&basket, &offers, &UsageSnapshot::new());
        assert_eq!(eligible.len(), 1);

        let outcome = eligible[0].benefit.calculate(&groups_for(eligible[0], &basket));
        let subtotal: Money = basket.iter().map(BasketLine::line_value).sum();
        assert_eq!(outcome.discount, Money::from_units(3));
        assert_eq!(subtotal - outcome.discount, Money::from_units(27));
    }

    #[test]
    fn match_all_range_needs_shoes_and_acme() {
        let range = OfferRange::empty()
            .match_all()
            .include_category("Shoes")
            .include_brand("Acme");
        let nike = BasketLine::new("runner", Money::from_units(90), 1)
            .in_category("Shoes")
            .with_brand("Nike");
        let acme = BasketLine::new("boot", Money::from_units(70), 1)
            .in_category("Shoes")
            .with_brand("Acme");

        assert!(!range.matches(&nike));
        assert!(range.matches(&acme));

        let offers = vec![Offer::new(
            "Acme shoes",
            range,
            OfferCondition::BasketItems(1),
            OfferBenefit::percentage(20),
        )];
        let matcher = OfferMatcher::new(Utc::now());
        let report = matcher.report(&[nike.clone()], &offers, &UsageSnapshot::new());
        assert_eq!(report.rejected[0].1, OfferNotEligible::RangeMismatch);
        assert_eq!(
            matcher
                .find_eligible(&[nike, acme], &offers, &UsageSnapshot::new())
                .len(),
            1
        );
    }

    #[test]
    fn fixed_price_five_with_cap_two() {
        let basket = vec![
            BasketLine::new("eight", Money::from_units(8), 1),
            BasketLine::new("six", Money::from_units(6), 1),
            BasketLine::new("nine", Money::from_units(9), 1),
        ];
        let offer = Offer::new(
            "two for five",
            OfferRange::all_products(),
            OfferCondition::BasketItems(2),
            OfferBenefit::fixed_price(Money::from_units(5)).with_max_affected_items(2),
        );

        let outcome = offer.benefit.calculate(&groups_for(&offer, &basket));

        assert_eq!(outcome.discount, Money::from_units(4));
        let touched: Vec<usize> = outcome.allocations.iter().map(|a| a.line).collect();
        assert_eq!(touched, vec![1, 0]);
    }

    #[test]
    fn range_limits_the_condition_base() {
        // Only the Games line counts towards the threshold.
        let basket = vec![
            BasketLine::new("book", Money::from_units(40), 1).in_category("Books"),
            BasketLine::new("game", Money::from_units(20), 1).in_category("Games"),
        ];
        let offers = vec![Offer::new(
            "games over 25",
            OfferRange::empty().include_category("Games"),
            OfferCondition::BasketValue(Money::from_units(25)),
            OfferBenefit::percentage(10),
        )];

        let report = OfferMatcher::new(Utc::now()).report(&basket, &offers, &UsageSnapshot::new());
        assert!(report.eligible.is_empty());
        assert_eq!(report.rejected[0].1, OfferNotEligible::ConditionUnmet);
    }
}

mod usage_limits {
    use super::*;

    #[tokio::test]
    async fn exhausted_offer_is_not_eligible() {
        let recorder = InMemoryApplicationRecorder::new();
        let offers = vec![Offer::new(
            "once",
            OfferRange::all_products(),
            OfferCondition::BasketItems(1),
            OfferBenefit::free_shipping(),
        )
        .with_limit_total(1)];
        let basket = vec![BasketLine::new("A", Money::from_units(1), 1)];

        recorder
            .record(&offers[0], None, OrderId::new(), Utc::now())
            .await
            .unwrap();

        let usage = UsageSnapshot::collect(&recorder, &offers, None).await.unwrap();
        let report = OfferMatcher::new(Utc::now()).report(&basket, &offers, &usage);
        assert_eq!(report.rejected[0].1, OfferNotEligible::LimitExceeded);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_records_never_overrun_total_limit() {
        const ATTEMPTS: usize = 32;
        const LIMIT: u32 = 5;

        let recorder = Arc::new(InMemoryApplicationRecorder::new());
        let offer = Arc::new(
            Offer::new(
                "limited",
                OfferRange::all_products(),
                OfferCondition::BasketItems(1),
                OfferBenefit::percentage(10),
            )
            .with_limit_total(LIMIT),
        );

        let handles: Vec<_> = (0..ATTEMPTS)
            .map(|i| {
                let recorder = Arc::clone(&recorder);
                let offer = Arc::clone(&offer);
                tokio::spawn(async move {
                    let user = UserId::new(format!("user-{i}"));
                    recorder
                        .record(&offer, Some(&user), OrderId::new(), Utc::now())
                        .await
                })
            })
            .collect();

        let mut applied = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => applied += 1,
                Err(PromotionError::UsageLimitReached { .. }) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(applied, LIMIT as usize);
        let usage = recorder.usage(offer.id, None).await.unwrap();
        assert_eq!(usage.total, LIMIT);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_records_respect_per_user_limit() {
        let recorder = Arc::new(InMemoryApplicationRecorder::new());
        let offer = Arc::new(
            Offer::new(
                "once per customer",
                OfferRange::all_products(),
                OfferCondition::BasketItems(1),
                OfferBenefit::percentage(10),
            )
            .with_limit_per_user(1),
        );
        let alice = UserId::new("alice");

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let recorder = Arc::clone(&recorder);
                let offer = Arc::clone(&offer);
                let alice = alice.clone();
                tokio::spawn(async move {
                    recorder
                        .record(&offer, Some(&alice), OrderId::new(), Utc::now())
                        .await
                })
            })
            .collect();

        let mut applied = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                applied += 1;
            }
        }
        assert_eq!(applied, 1);
    }
}
