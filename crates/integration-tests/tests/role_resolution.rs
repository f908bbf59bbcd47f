//! Role resolution across the seed accounts, the user directory, and the
//! baseline defaults.

use libreria_core::{Role, RoleId};
use libreria_integration_tests::TestContext;
use libreria_storefront::gateway::{CollectionGateway, collections};
use libreria_storefront::models::roles;

#[tokio::test]
async fn guest_and_baseline_defaults() {
    let ctx = TestContext::new();

    // No principal at all resolves to guest.
    assert_eq!(ctx.auth.resolve_role(None).await, Role::Guest);

    // A principal with no directory document is a baseline user, never an
    // error: public routes must stay reachable.
    let shopper = ctx.shopper("no-directory-doc");
    assert_eq!(ctx.auth.resolve_role(Some(&shopper)).await, Role::User);
}

#[tokio::test]
async fn seed_accounts_grant_their_roles_without_a_provider() {
    let ctx = TestContext::new();

    let (admin, role) = ctx
        .auth
        .login("admin@gmail.com", "admin123")
        .await
        .expect("admin seed login");
    assert_eq!(role, Role::Admin);
    assert_eq!(ctx.auth.resolve_role(Some(&admin)).await, Role::Admin);

    let (employee, role) = ctx
        .auth
        .login("empleado@gmail.com", "empleado123")
        .await
        .expect("employee seed login");
    assert_eq!(role, Role::Employee);
    assert_eq!(ctx.auth.resolve_role(Some(&employee)).await, Role::Employee);
}

#[tokio::test]
async fn directory_documents_drive_authoritative_resolution() {
    let ctx = TestContext::new();

    ctx.gateway
        .create(
            collections::USERS,
            serde_json::json!({
                "uid": "staff-1",
                "first_name": "Ana",
                "last_name": "García",
                "email": "ana@example.com",
                "role": roles::EMPLOYEE,
            }),
        )
        .await
        .expect("seed directory doc");

    let staff = ctx.shopper("staff-1");
    assert_eq!(ctx.auth.resolve_role(Some(&staff)).await, Role::Employee);

    // Reassignment to administrator is visible on the next resolution.
    let entry = ctx
        .auth
        .directory()
        .await
        .expect("directory")
        .into_iter()
        .find(|e| e.uid.as_str() == "staff-1")
        .expect("entry");
    ctx.auth
        .assign_role(&entry, &RoleId::new(roles::ADMINISTRATOR))
        .await
        .expect("assign");

    assert_eq!(ctx.auth.resolve_role(Some(&staff)).await, Role::Admin);
}

#[tokio::test]
async fn switching_principals_tears_the_cart_subscription_down() {
    let ctx = TestContext::new();
    let alice = ctx.shopper("alice");
    let bob = ctx.shopper("bob");

    // Alice has three lines in her sub-collection.
    for title in ["A", "B", "C"] {
        ctx.gateway
            .create(
                &collections::cart_for(&alice.uid),
                serde_json::json!({
                    "title": title,
                    "author": "Author",
                    "price": "10.00",
                    "quantity": 1,
                }),
            )
            .await
            .expect("seed line");
    }
    assert_eq!(
        ctx.cart.lines(Some(&alice)).await.expect("lines").len(),
        3
    );

    // Logout tears down before the next principal signs in.
    ctx.cart.detach(&alice.uid).await;

    // Bob's fresh view shows zero lines, never a residue of Alice's three.
    let bob_lines = ctx.cart.lines(Some(&bob)).await.expect("lines");
    assert!(bob_lines.is_empty());
}
