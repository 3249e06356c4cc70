//! Property tests: ledger reconciliation and balance non-negativity.

mod common;

use std::collections::HashSet;

use proptest::prelude::*;
use rust_decimal::Decimal;

use common::Fixture;
use storefront_core::{Game, LedgerEntryKind};
use storefront_service::{PurchaseError, WalletService};
use storefront_store::Store;

/// One step in a generated wallet history.
#[derive(Debug, Clone)]
enum Op {
    /// Buy catalog game `index`.
    Buy(usize),
    /// Add funds, in cents.
    TopUp(i64),
}

fn op_strategy(catalog_len: usize) -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0..catalog_len).prop_map(Op::Buy),
        1 => (1i64..50_000).prop_map(Op::TopUp),
    ]
}

/// Prices in cents; zero is a free game. Sale prices of zero mean no sale.
fn catalog_strategy() -> impl Strategy<Value = Vec<(i64, i64)>> {
    prop::collection::vec((0i64..20_000, prop_oneof![Just(0i64), 1i64..20_000]), 1..8)
}

fn cents(value: i64) -> Decimal {
    Decimal::new(value, 2)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn ledger_sum_reconciles_with_balance(
        opening in 0i64..50_000,
        catalog in catalog_strategy(),
        ops in prop::collection::vec(op_strategy(8), 0..24),
    ) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        rt.block_on(async move {
            let fx = Fixture::new(cents(opening)).await;
            let engine = fx.engine();
            let wallet = WalletService::new(fx.store.clone());

            let mut games = Vec::new();
            for (i, (price, sale)) in catalog.iter().enumerate() {
                let game = Game::new(format!("Game {i}"), cents(*price))
                    .with_sale_price(cents(*sale));
                games.push(fx.add_game(game).await);
            }

            let mut bought = HashSet::new();
            for op in ops {
                match op {
                    Op::Buy(index) => {
                        let Some(game) = games.get(index % games.len()) else {
                            continue;
                        };
                        match engine.purchase(fx.user_id, game.id).await {
                            Ok(receipt) => {
                                prop_assert!(bought.insert(game.id));
                                prop_assert_eq!(receipt.charged, game.effective_price());
                            }
                            Err(PurchaseError::AlreadyOwned { .. }) => {
                                prop_assert!(bought.contains(&game.id));
                            }
                            Err(PurchaseError::InsufficientFunds { balance, required }) => {
                                prop_assert!(balance < required);
                            }
                            Err(other) => {
                                return Err(TestCaseError::fail(format!("unexpected {other:?}")));
                            }
                        }
                    }
                    Op::TopUp(amount) => {
                        wallet.top_up(fx.user_id, cents(amount), None).await.unwrap();
                    }
                }

                let account = fx.store.get_account(&fx.user_id).await.unwrap().unwrap();
                prop_assert!(account.balance >= Decimal::ZERO);
            }

            let account = fx.store.get_account(&fx.user_id).await.unwrap().unwrap();
            let ledger = fx.store.list_ledger(&fx.user_id, usize::MAX, 0).await.unwrap();
            let ledger_sum: Decimal = ledger.iter().map(|e| e.amount).sum();
            prop_assert_eq!(cents(opening) + ledger_sum, account.balance);

            let library = fx.store.list_library(&fx.user_id).await.unwrap();
            prop_assert_eq!(library.len(), bought.len());

            let paid_purchases = games
                .iter()
                .filter(|g| bought.contains(&g.id) && !g.is_free())
                .count();
            let purchase_entries = ledger
                .iter()
                .filter(|e| e.kind == LedgerEntryKind::Purchase)
                .count();
            prop_assert_eq!(purchase_entries, paid_purchases);

            Ok(())
        })?;
    }
}
