//! Live integration tests for harmony-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database spun up by the
//! sqlx test harness. The `migrations` path is relative to the crate root
//! (`crates/harmony-db/`), so `"../../migrations"` resolves to the workspace
//! migration directory.

use harmony_core::{
    is_suitable, seed::parse_catalog, ProductType, Role, ShopRequestStatus, Suitability,
    TimeOfDay,
};
use harmony_db::{
    admin_stats, approve_shop_request, create_product, create_shop_request, create_user,
    delete_product, fetch_catalog, fetch_catalog_entry, find_user_by_email, get_shop_request,
    get_user, list_shop_requests, list_shop_requests_for_user, list_shops_by_owner,
    reject_shop_request, seed_catalog, superadmin_stats, update_product, update_shop_settings,
    update_user, CatalogQuery, DbError, DeliveryUrls, NewProduct, NewShopRequest, NewUser,
    ProductUpdate, ShopSettings, UserUpdate,
};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn insert_user(pool: &PgPool, email: &str, role: Role) -> Uuid {
    create_user(
        pool,
        &NewUser {
            name: "Test User",
            email,
            password_hash: "hash",
            role,
        },
    )
    .await
    .unwrap_or_else(|e| panic!("insert_user failed for '{email}': {e}"))
    .id
}

fn shop_request(name: &str) -> NewShopRequest {
    NewShopRequest {
        shop_name: name.to_string(),
        description: Some("Warung makan".to_string()),
        address: Some("Jl. Malioboro 1".to_string()),
        phone: None,
        province: Some("yogya".to_string()),
        coordinates: None,
    }
}

fn noon() -> TimeOfDay {
    TimeOfDay {
        hour: 12,
        minute: 0,
    }
}

async fn approved_shop(pool: &PgPool, owner_email: &str) -> (Uuid, Uuid) {
    let owner = insert_user(pool, owner_email, Role::User).await;
    let reviewer = insert_user(pool, &format!("root-{owner_email}"), Role::Superadmin).await;
    let request = create_shop_request(pool, owner, &shop_request("Warung Test"))
        .await
        .expect("create request");
    let outcome = approve_shop_request(pool, request.id, reviewer)
        .await
        .expect("approve");
    (owner, outcome.shop.id)
}

fn new_product(name: &str, tag: Suitability) -> NewProduct {
    NewProduct {
        name: name.to_string(),
        product_type: ProductType::Food,
        price: Decimal::new(25_000, 0),
        description: None,
        weather_suitability: tag,
        images: vec!["https://img/1".to_string(), "https://img/2".to_string()],
        delivery: DeliveryUrls::default(),
    }
}

// ---------------------------------------------------------------------------
// Section 1: Users
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn duplicate_email_is_rejected_case_insensitively(pool: PgPool) {
    insert_user(&pool, "siti@warung.id", Role::User).await;

    let err = create_user(
        &pool,
        &NewUser {
            name: "Other",
            email: "  SITI@warung.id ",
            password_hash: "hash",
            role: Role::User,
        },
    )
    .await
    .unwrap_err();

    assert!(matches!(err, DbError::EmailTaken));
}

#[sqlx::test(migrations = "../../migrations")]
async fn find_by_email_returns_hash(pool: PgPool) {
    insert_user(&pool, "ayu@cendol.id", Role::User).await;

    let row = find_user_by_email(&pool, "Ayu@Cendol.id")
        .await
        .expect("query")
        .expect("user exists");
    assert_eq!(row.password_hash, "hash");
    assert_eq!(row.role, "user");
}

#[sqlx::test(migrations = "../../migrations")]
async fn update_user_changes_only_given_fields(pool: PgPool) {
    let id = insert_user(&pool, "budi@example.com", Role::User).await;

    let updated = update_user(
        &pool,
        id,
        &UserUpdate {
            role: Some(Role::Admin),
            ..UserUpdate::default()
        },
    )
    .await
    .expect("update");

    assert_eq!(updated.role, Role::Admin);
    assert_eq!(updated.email, "budi@example.com");
    assert_eq!(updated.name, "Test User");
}

#[sqlx::test(migrations = "../../migrations")]
async fn update_missing_user_is_not_found(pool: PgPool) {
    let err = update_user(
        &pool,
        Uuid::new_v4(),
        &UserUpdate {
            name: Some("Ghost".to_string()),
            ..UserUpdate::default()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, DbError::NotFound));
}

// ---------------------------------------------------------------------------
// Section 2: Shop request workflow
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn second_pending_request_is_refused(pool: PgPool) {
    let user = insert_user(&pool, "u@example.com", Role::User).await;
    create_shop_request(&pool, user, &shop_request("First"))
        .await
        .expect("first request");

    let err = create_shop_request(&pool, user, &shop_request("Second"))
        .await
        .unwrap_err();

    assert!(matches!(err, DbError::PendingRequestExists { user_id } if user_id == user));
}

#[sqlx::test(migrations = "../../migrations")]
async fn approval_applies_all_three_writes(pool: PgPool) {
    let user = insert_user(&pool, "u@example.com", Role::User).await;
    let reviewer = insert_user(&pool, "root@example.com", Role::Superadmin).await;
    let request = create_shop_request(&pool, user, &shop_request("Gudeg Yu Djum"))
        .await
        .expect("create");

    let outcome = approve_shop_request(&pool, request.id, reviewer)
        .await
        .expect("approve");

    assert_eq!(outcome.request.status, ShopRequestStatus::Approved);
    assert_eq!(outcome.request.reviewed_by, Some(reviewer));
    assert!(outcome.request.reviewed_at.is_some());

    let promoted = get_user(&pool, user).await.expect("query").expect("user");
    assert_eq!(promoted.role, Role::Admin);

    let shops = list_shops_by_owner(&pool, user).await.expect("shops");
    assert_eq!(shops.len(), 1);
    assert_eq!(shops[0].name, "Gudeg Yu Djum");
    assert!(shops[0].is_approved);
    assert_eq!(shops[0].open_time, "07:00");
    assert_eq!(shops[0].close_time, "21:00");
    // No coordinates submitted: province centroid for Yogyakarta.
    let (lat, lon) = shops[0].coordinates().expect("fallback coordinates");
    assert!((lat - -7.7956).abs() < 1e-6);
    assert!((lon - 110.3695).abs() < 1e-6);
}

#[sqlx::test(migrations = "../../migrations")]
async fn failed_shop_insert_rolls_back_the_whole_approval(pool: PgPool) {
    let user = insert_user(&pool, "u@example.com", Role::User).await;
    let reviewer = insert_user(&pool, "root@example.com", Role::Superadmin).await;
    let request = create_shop_request(&pool, user, &shop_request("Gagal Buka"))
        .await
        .expect("create");

    // Make the last of the three writes fail after the first two succeeded.
    sqlx::raw_sql(
        "CREATE FUNCTION refuse_shop_insert() RETURNS trigger AS $$ \
         BEGIN RAISE EXCEPTION 'shop inserts disabled'; END; \
         $$ LANGUAGE plpgsql; \
         CREATE TRIGGER refuse_shop_insert BEFORE INSERT ON shops \
         FOR EACH ROW EXECUTE FUNCTION refuse_shop_insert();",
    )
    .execute(&pool)
    .await
    .expect("install trigger");

    let err = approve_shop_request(&pool, request.id, reviewer)
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Sqlx(_)), "unexpected error: {err:?}");

    let still = get_shop_request(&pool, request.id)
        .await
        .expect("query")
        .expect("request");
    assert_eq!(still.status, ShopRequestStatus::Pending);
    assert!(still.reviewed_by.is_none());
    assert!(still.reviewed_at.is_none());
    assert_eq!(
        get_user(&pool, user).await.expect("query").expect("user").role,
        Role::User
    );
    let shops: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM shops")
        .fetch_one(&pool)
        .await
        .expect("count");
    assert_eq!(shops, 0);
}

#[sqlx::test(migrations = "../../migrations")]
async fn superadmin_requester_keeps_role_on_approval(pool: PgPool) {
    let root = insert_user(&pool, "root@example.com", Role::Superadmin).await;
    let request = create_shop_request(&pool, root, &shop_request("Root Shop"))
        .await
        .expect("create");

    approve_shop_request(&pool, request.id, root)
        .await
        .expect("approve");

    let user = get_user(&pool, root).await.expect("query").expect("user");
    assert_eq!(user.role, Role::Superadmin);
}

#[sqlx::test(migrations = "../../migrations")]
async fn reviewing_a_non_pending_request_has_no_side_effects(pool: PgPool) {
    let user = insert_user(&pool, "u@example.com", Role::User).await;
    let reviewer = insert_user(&pool, "root@example.com", Role::Superadmin).await;
    let request = create_shop_request(&pool, user, &shop_request("Rejected Shop"))
        .await
        .expect("create");

    let rejected = reject_shop_request(&pool, request.id, reviewer)
        .await
        .expect("reject");
    assert_eq!(rejected.status, ShopRequestStatus::Rejected);

    let err = approve_shop_request(&pool, request.id, reviewer)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DbError::InvalidShopRequestTransition {
            current: ShopRequestStatus::Rejected,
            ..
        }
    ));

    let err = reject_shop_request(&pool, request.id, reviewer)
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::InvalidShopRequestTransition { .. }));

    let still = get_shop_request(&pool, request.id)
        .await
        .expect("query")
        .expect("request");
    assert_eq!(still.status, ShopRequestStatus::Rejected);
    assert_eq!(
        get_user(&pool, user).await.expect("query").expect("user").role,
        Role::User
    );
    assert!(list_shops_by_owner(&pool, user)
        .await
        .expect("shops")
        .is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
async fn rejection_frees_the_user_to_submit_again(pool: PgPool) {
    let user = insert_user(&pool, "u@example.com", Role::User).await;
    let reviewer = insert_user(&pool, "root@example.com", Role::Superadmin).await;
    let first = create_shop_request(&pool, user, &shop_request("First"))
        .await
        .expect("first");
    reject_shop_request(&pool, first.id, reviewer)
        .await
        .expect("reject");

    create_shop_request(&pool, user, &shop_request("Second"))
        .await
        .expect("second request after rejection");

    let mine = list_shop_requests_for_user(&pool, user).await.expect("mine");
    assert_eq!(mine.len(), 2);
    assert_eq!(mine[0].shop_name, "Second");
}

#[sqlx::test(migrations = "../../migrations")]
async fn approving_unknown_request_is_not_found(pool: PgPool) {
    let reviewer = insert_user(&pool, "root@example.com", Role::Superadmin).await;
    let err = approve_shop_request(&pool, Uuid::new_v4(), reviewer)
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::NotFound));
}

#[sqlx::test(migrations = "../../migrations")]
async fn listing_filters_by_status_and_includes_requester(pool: PgPool) {
    let a = insert_user(&pool, "a@example.com", Role::User).await;
    let b = insert_user(&pool, "b@example.com", Role::User).await;
    let reviewer = insert_user(&pool, "root@example.com", Role::Superadmin).await;
    create_shop_request(&pool, a, &shop_request("A"))
        .await
        .expect("a");
    let rb = create_shop_request(&pool, b, &shop_request("B"))
        .await
        .expect("b");
    reject_shop_request(&pool, rb.id, reviewer)
        .await
        .expect("reject");

    let pending = list_shop_requests(&pool, Some(ShopRequestStatus::Pending))
        .await
        .expect("list");
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].requester_email, "a@example.com");

    let all = list_shop_requests(&pool, None).await.expect("list");
    assert_eq!(all.len(), 2);
}

// ---------------------------------------------------------------------------
// Section 3: Catalog and products
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn catalog_entry_has_images_in_order_and_empty_links(pool: PgPool) {
    let (_, shop_id) = approved_shop(&pool, "owner@example.com").await;
    let product = create_product(&pool, shop_id, &new_product("Soto", Suitability::Cool))
        .await
        .expect("create product");

    let entry = fetch_catalog_entry(&pool, product.id, noon())
        .await
        .expect("fetch")
        .expect("entry");

    assert_eq!(entry.shop.id, shop_id);
    let urls: Vec<_> = entry.images.iter().map(|i| i.image_url.as_str()).collect();
    assert_eq!(urls, vec!["https://img/1", "https://img/2"]);
    assert!(entry.delivery_links.is_empty());
    assert!(entry.is_shop_open);
}

#[sqlx::test(migrations = "../../migrations")]
async fn catalog_band_filter_keeps_matching_and_wildcard(pool: PgPool) {
    let (_, shop_id) = approved_shop(&pool, "owner@example.com").await;
    for (name, tag) in [
        ("Es Cendol", Suitability::Hot),
        ("Bakso", Suitability::Cold),
        ("Air Mineral", Suitability::All),
    ] {
        create_product(&pool, shop_id, &new_product(name, tag))
            .await
            .expect("create");
    }

    let hot = fetch_catalog(
        &pool,
        &CatalogQuery {
            band: Some(Suitability::Hot),
            ..CatalogQuery::default()
        },
        noon(),
    )
    .await
    .expect("fetch");

    let mut names: Vec<_> = hot.iter().map(|e| e.product.name.as_str()).collect();
    names.sort_unstable();
    assert_eq!(names, vec!["Air Mineral", "Es Cendol"]);
}

#[sqlx::test(migrations = "../../migrations")]
async fn catalog_limit_counts_only_products_in_band(pool: PgPool) {
    let (_, shop_id) = approved_shop(&pool, "owner@example.com").await;
    // Oldest first; the cold products are the newest and would fill an
    // unfiltered page.
    for (name, tag) in [
        ("Es Cendol", Suitability::Hot),
        ("Es Teh", Suitability::Hot),
        ("Bakso", Suitability::Cold),
        ("Wedang Jahe", Suitability::Cold),
        ("Sekoteng", Suitability::Cold),
    ] {
        create_product(&pool, shop_id, &new_product(name, tag))
            .await
            .expect("create");
    }

    let page = fetch_catalog(
        &pool,
        &CatalogQuery {
            band: Some(Suitability::Hot),
            limit: Some(1),
            ..CatalogQuery::default()
        },
        noon(),
    )
    .await
    .expect("fetch");

    assert_eq!(page.len(), 1);
    assert_eq!(page[0].product.name, "Es Teh");
    assert!(is_suitable(page[0].product.weather_suitability, Suitability::Hot));

    let everything = fetch_catalog(&pool, &CatalogQuery::default(), noon())
        .await
        .expect("fetch");
    assert_eq!(everything.len(), 5);
}

#[sqlx::test(migrations = "../../migrations")]
async fn update_product_replaces_images_and_links(pool: PgPool) {
    let (_, shop_id) = approved_shop(&pool, "owner@example.com").await;
    let product = create_product(&pool, shop_id, &new_product("Soto", Suitability::Cool))
        .await
        .expect("create");

    let updated = update_product(
        &pool,
        product.id,
        &ProductUpdate {
            price: Some(Decimal::new(27_500, 0)),
            images: Some(vec!["https://img/new".to_string()]),
            delivery: Some(DeliveryUrls {
                gofood_url: Some("https://gofood.co.id".to_string()),
                ..DeliveryUrls::default()
            }),
            ..ProductUpdate::default()
        },
    )
    .await
    .expect("update");
    assert_eq!(updated.price, Decimal::new(27_500, 0));
    assert_eq!(updated.name, "Soto");

    let entry = fetch_catalog_entry(&pool, product.id, noon())
        .await
        .expect("fetch")
        .expect("entry");
    assert_eq!(entry.images.len(), 1);
    assert_eq!(
        entry.delivery_links.gofood_url.as_deref(),
        Some("https://gofood.co.id")
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn blank_description_clears_and_absent_description_keeps(pool: PgPool) {
    let (_, shop_id) = approved_shop(&pool, "owner@example.com").await;
    let mut soto = new_product("Soto", Suitability::Cool);
    soto.description = Some("Kuah bening".to_string());
    let product = create_product(&pool, shop_id, &soto).await.expect("create");

    let kept = update_product(
        &pool,
        product.id,
        &ProductUpdate {
            price: Some(Decimal::new(20_000, 0)),
            ..ProductUpdate::default()
        },
    )
    .await
    .expect("update");
    assert_eq!(kept.description.as_deref(), Some("Kuah bening"));

    let cleared = update_product(
        &pool,
        product.id,
        &ProductUpdate {
            description: Some(String::new()),
            ..ProductUpdate::default()
        },
    )
    .await
    .expect("update");
    assert!(cleared.description.is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn delete_product_cascades(pool: PgPool) {
    let (_, shop_id) = approved_shop(&pool, "owner@example.com").await;
    let product = create_product(&pool, shop_id, &new_product("Soto", Suitability::Cool))
        .await
        .expect("create");

    assert!(delete_product(&pool, product.id).await.expect("delete"));
    assert!(!delete_product(&pool, product.id).await.expect("delete again"));

    let images: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM product_images WHERE product_id = $1")
            .bind(product.id)
            .fetch_one(&pool)
            .await
            .expect("count");
    assert_eq!(images, 0);
}

#[sqlx::test(migrations = "../../migrations")]
async fn shop_settings_update_hours(pool: PgPool) {
    let (_, shop_id) = approved_shop(&pool, "owner@example.com").await;

    let shop = update_shop_settings(
        &pool,
        shop_id,
        &ShopSettings {
            open_time: Some("13:00".to_string()),
            ..ShopSettings::default()
        },
    )
    .await
    .expect("update");

    assert_eq!(shop.open_time, "13:00");
    assert_eq!(shop.close_time, "21:00");
    assert!(!shop.is_open_at(noon()).expect("valid hours"));
}

// ---------------------------------------------------------------------------
// Section 4: Dashboards and seed
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn dashboard_counts(pool: PgPool) {
    let (owner, shop_id) = approved_shop(&pool, "owner@example.com").await;
    create_product(&pool, shop_id, &new_product("Soto", Suitability::Cool))
        .await
        .expect("create");
    let pending_user = insert_user(&pool, "p@example.com", Role::User).await;
    create_shop_request(&pool, pending_user, &shop_request("Pending"))
        .await
        .expect("pending");

    let admin = admin_stats(&pool, owner).await.expect("admin stats");
    assert_eq!(admin.total_products, 1);
    assert_eq!(admin.total_shops, 1);

    let root = superadmin_stats(&pool).await.expect("superadmin stats");
    assert_eq!(root.total_admins, 1);
    assert_eq!(root.total_shops, 1);
    assert_eq!(root.pending_requests, 1);
    assert_eq!(root.total_products, 1);
    assert_eq!(root.admins[0].id, owner);
}

#[sqlx::test(migrations = "../../migrations")]
async fn seed_is_idempotent(pool: PgPool) {
    let catalog = parse_catalog(
        r#"
shops:
  - name: Warung Bu Siti
    owner: { name: Siti, email: admin@warungbusiti.com }
    open_time: "07:00"
    close_time: "21:00"
    products:
      - name: Soto Ayam
        type: food
        price: 25000
        weather_suitability: cool
"#,
    )
    .expect("catalog");

    let first = seed_catalog(&pool, &catalog, "hash").await.expect("seed");
    assert_eq!(first.shops_created, 1);
    assert_eq!(first.products_created, 1);

    let second = seed_catalog(&pool, &catalog, "hash").await.expect("reseed");
    assert_eq!(second.shops_created, 0);
    assert_eq!(second.products_created, 0);

    let entries = fetch_catalog(&pool, &CatalogQuery::default(), noon())
        .await
        .expect("catalog");
    assert_eq!(entries.len(), 1);
}
