//! End-to-end storefront flow: seed catalog, shop, reserve, manage status.

use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;

use libreria_core::{Price, ReservationStatus};
use libreria_integration_tests::TestContext;
use libreria_storefront::gateway::collections;
use libreria_storefront::models::CartLine;
use libreria_storefront::services::catalog::BookDraft;
use libreria_storefront::services::reservations::StatusChange;

fn draft(title: &str, author: &str, price: &str) -> BookDraft {
    BookDraft {
        title: title.to_owned(),
        author: author.to_owned(),
        price: Price::new(Decimal::from_str(price).expect("decimal literal")),
        stock: 10,
        description: format!("{title} description"),
        image: format!("/static/images/{title}.jpg"),
        genres: vec!["fiction".to_owned()],
        featured: false,
        published: true,
        editorial: None,
    }
}

async fn wait_for_lines<F>(ctx: &TestContext, shopper: &libreria_storefront::models::CurrentUser, pred: F) -> Vec<CartLine>
where
    F: Fn(&[CartLine]) -> bool,
{
    let mut rx = ctx
        .cart
        .observe_lines(Some(shopper))
        .await
        .expect("observe cart");
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            {
                let lines = rx.borrow().clone();
                if pred(&lines) {
                    return lines;
                }
            }
            rx.changed().await.expect("cart watch closed");
        }
    })
    .await
    .expect("timed out waiting for cart snapshot")
}

#[tokio::test]
async fn browse_reserve_and_fulfill() {
    let ctx = TestContext::new();
    let shopper = ctx.shopper("shopper");

    // Seed the catalog through the catalog service.
    let frankenstein_id = ctx
        .catalog
        .create(&draft("Frankenstein", "Mary Shelley", "29.99"))
        .await
        .expect("create book");
    ctx.catalog
        .create(&draft("1984", "George Orwell", "24.99"))
        .await
        .expect("create book");

    // Shop: Frankenstein twice (merges into one line), 1984 once.
    let frankenstein = ctx.catalog.get(&frankenstein_id).await.expect("get book");
    ctx.cart
        .add_item(Some(&shopper), &frankenstein, 1)
        .await
        .expect("add");
    ctx.cart
        .add_item(Some(&shopper), &frankenstein, 1)
        .await
        .expect("add again");

    let books = ctx.catalog.published_books().await.expect("books");
    let orwell = books
        .iter()
        .find(|b| b.title == "1984")
        .expect("1984 in catalog");
    ctx.cart
        .add_item(Some(&shopper), orwell, 1)
        .await
        .expect("add");

    let lines = wait_for_lines(&ctx, &shopper, |lines| {
        lines.len() == 2 && lines.iter().any(|l| l.quantity == 2)
    })
    .await;

    let total = ctx.cart.get_total(Some(&shopper)).await.expect("total");
    assert_eq!(total.to_string(), "84.97");

    // Reserve the whole cart.
    let outcome = ctx
        .reservations
        .submit(Some(&shopper), &ctx.cart, &lines)
        .await
        .expect("submit");
    assert!(outcome.fully_succeeded());
    assert_eq!(outcome.created.len(), 2);

    // Two pending reservations with the expected totals, one timestamp.
    let reservations = ctx.reservations.list(None).await.expect("list");
    assert_eq!(reservations.len(), 2);
    let mut totals: Vec<String> = reservations.iter().map(|r| r.total.to_string()).collect();
    totals.sort();
    assert_eq!(totals, vec!["24.99".to_owned(), "59.98".to_owned()]);
    assert!(
        reservations
            .iter()
            .all(|r| r.created_at == outcome.created_at && r.status == ReservationStatus::Pending)
    );

    // The cart emptied.
    wait_for_lines(&ctx, &shopper, |lines| lines.is_empty()).await;

    // Staff completes one reservation; the other stays pending.
    let first = reservations.first().expect("reservation");
    let change = ctx
        .reservations
        .change_status(&first.id, first.status, ReservationStatus::Completed)
        .await
        .expect("change status");
    assert_eq!(change, StatusChange::Updated);

    let pending = ctx
        .reservations
        .list(Some(ReservationStatus::Pending))
        .await
        .expect("pending");
    assert_eq!(pending.len(), 1);

    // The buyer sees both in their history.
    let history = ctx
        .reservations
        .list_for_buyer(&shopper.email)
        .await
        .expect("history");
    assert_eq!(history.len(), 2);
}

#[tokio::test]
async fn duplicate_catalog_entries_merge_in_the_cart() {
    let ctx = TestContext::new();
    let shopper = ctx.shopper("shopper");

    // Two catalog documents for the same physical book.
    let a = ctx
        .catalog
        .create(&draft("Frankenstein", "Mary Shelley", "29.99"))
        .await
        .expect("create");
    let b = ctx
        .catalog
        .create(&draft("Frankenstein", "Mary Shelley", "29.99"))
        .await
        .expect("create");
    assert_ne!(a, b);

    let first = ctx.catalog.get(&a).await.expect("get");
    let second = ctx.catalog.get(&b).await.expect("get");

    ctx.cart
        .add_item(Some(&shopper), &first, 2)
        .await
        .expect("add");
    wait_for_lines(&ctx, &shopper, |lines| lines.len() == 1).await;

    ctx.cart
        .add_item(Some(&shopper), &second, 3)
        .await
        .expect("add duplicate");

    let lines = wait_for_lines(&ctx, &shopper, |lines| {
        lines.len() == 1 && lines.iter().all(|l| l.quantity == 5)
    })
    .await;
    assert_eq!(lines.first().expect("line").quantity, 5);
}

#[tokio::test]
async fn partial_batch_failure_matches_the_documented_semantics() {
    let ctx = TestContext::new();
    let shopper = ctx.shopper("shopper");

    for title in ["A", "B", "C"] {
        let id = ctx
            .catalog
            .create(&draft(title, "Author", "10.00"))
            .await
            .expect("create");
        let book = ctx.catalog.get(&id).await.expect("get");
        ctx.cart
            .add_item(Some(&shopper), &book, 1)
            .await
            .expect("add");
    }
    let lines = wait_for_lines(&ctx, &shopper, |lines| lines.len() == 3).await;

    // Two creations succeed, the third fails.
    ctx.gateway.fail_creates_after(collections::RESERVATIONS, 2);

    let outcome = ctx
        .reservations
        .submit(Some(&shopper), &ctx.cart, &lines)
        .await
        .expect("submit");

    assert_eq!(outcome.created.len(), 2);
    assert!(outcome.failed.is_some());

    // Earlier reservations stand; the failed line is still in the cart.
    assert_eq!(ctx.reservations.list(None).await.expect("list").len(), 2);
    let remaining = wait_for_lines(&ctx, &shopper, |lines| lines.len() == 1).await;
    assert_eq!(remaining.len(), 1);
}
