//! The PostgreSQL adapter against a real server. Uses testcontainers unless
//! `MEAL_BUILDER_TEST_PG_URL` points at an existing instance.

use std::str::FromStr;

use api_lib::adapters::DbAdapter;
use chrono::{Duration, Utc};
use meal_builder_core::domain::{
    DayOfWeek, ExternalIdentity, MealCategory, MealType, RecipeDraft, RecipeIngredient,
    SlotAssignment, Unit,
};
use meal_builder_core::ports::{DatabaseService, PortError};
use meal_builder_test_utils::{create_test_db, drop_test_db};
use rust_decimal::Decimal;

async fn adapter() -> (DbAdapter, String) {
    let (pool, db_name) = create_test_db().await;
    let adapter = DbAdapter::new(pool);
    adapter.run_migrations().await.unwrap();
    (adapter, db_name)
}

fn identity(subject: &str) -> ExternalIdentity {
    ExternalIdentity {
        provider: "google".into(),
        subject: subject.into(),
        email: format!("{subject}@example.com"),
        name: None,
    }
}

fn draft(title: &str) -> RecipeDraft {
    RecipeDraft {
        title: title.into(),
        description: Some("Simmer slowly".into()),
        category: MealCategory::Dinner,
        calories: Some(640),
        image_url: None,
    }
}

#[tokio::test]
#[ignore = "requires docker"]
async fn users_and_sessions() {
    let (db, db_name) = adapter().await;

    let first = db.get_or_create_user(&identity("sub-1")).await.unwrap();
    let again = db.get_or_create_user(&identity("sub-1")).await.unwrap();
    assert_eq!(first.id, again.id);

    db.create_auth_session("live", first.id, Utc::now() + Duration::days(1))
        .await
        .unwrap();
    db.create_auth_session("stale", first.id, Utc::now() - Duration::minutes(1))
        .await
        .unwrap();
    assert_eq!(db.validate_auth_session("live").await.unwrap(), first.id);
    assert!(matches!(
        db.validate_auth_session("stale").await,
        Err(PortError::Unauthorized)
    ));

    db.delete_auth_session("live").await.unwrap();
    assert!(db.validate_auth_session("live").await.is_err());

    drop_test_db(&db_name).await;
}

#[tokio::test]
#[ignore = "requires docker"]
async fn slot_upsert_reuses_the_cell() {
    let (db, db_name) = adapter().await;
    let user = db.get_or_create_user(&identity("sub-1")).await.unwrap();
    let plan = db.create_meal_plan(user.id, "Week 1").await.unwrap();
    let stew = db.create_recipe(user.id, &draft("Stew")).await.unwrap();
    let curry = db.create_recipe(user.id, &draft("Curry")).await.unwrap();

    let mut assignment = SlotAssignment {
        meal_plan_id: plan.id,
        recipe_id: stew.id,
        day: DayOfWeek::Thursday,
        meal_type: MealType::Dinner,
        notes: None,
    };
    let first = db.upsert_slot(&assignment).await.unwrap();
    assignment.recipe_id = curry.id;
    assignment.notes = Some("mild".into());
    let second = db.upsert_slot(&assignment).await.unwrap();
    assert_eq!(first, second);

    let meals = db.list_planned_meals(plan.id).await.unwrap();
    assert_eq!(meals.len(), 1);
    assert_eq!(meals[0].recipe_title, "Curry");
    assert_eq!(meals[0].slot.day, DayOfWeek::Thursday);
    assert_eq!(meals[0].slot.notes.as_deref(), Some("mild"));
    assert_eq!(db.count_recipe_usages(curry.id).await.unwrap(), 1);

    drop_test_db(&db_name).await;
}

#[tokio::test]
#[ignore = "requires docker"]
async fn slot_changes_require_the_owner() {
    let (db, db_name) = adapter().await;
    let alice = db.get_or_create_user(&identity("alice")).await.unwrap();
    let bob = db.get_or_create_user(&identity("bob")).await.unwrap();
    let plan = db.create_meal_plan(alice.id, "Week 1").await.unwrap();
    let stew = db.create_recipe(alice.id, &draft("Stew")).await.unwrap();
    let slot_id = db
        .upsert_slot(&SlotAssignment {
            meal_plan_id: plan.id,
            recipe_id: stew.id,
            day: DayOfWeek::Monday,
            meal_type: MealType::Lunch,
            notes: None,
        })
        .await
        .unwrap();

    assert!(!db
        .update_slot_notes(bob.id, plan.id, slot_id, Some("mine now"))
        .await
        .unwrap());
    assert!(!db.delete_slot(bob.id, plan.id, slot_id).await.unwrap());
    assert!(db
        .update_slot_notes(alice.id, plan.id, slot_id, Some("leftovers"))
        .await
        .unwrap());
    assert!(db.delete_slot(alice.id, plan.id, slot_id).await.unwrap());

    assert!(matches!(
        db.get_meal_plan(bob.id, plan.id).await,
        Err(PortError::NotFound(_))
    ));
    assert!(db.find_meal_plan(plan.id).await.unwrap().is_some());

    drop_test_db(&db_name).await;
}

#[tokio::test]
#[ignore = "requires docker"]
async fn recipe_ingredients_and_cascades() {
    let (db, db_name) = adapter().await;
    let user = db.get_or_create_user(&identity("sub-1")).await.unwrap();
    let bread = db.create_recipe(user.id, &draft("Bread")).await.unwrap();
    let flour = db.create_ingredient("Flour").await.unwrap();

    let mut link = RecipeIngredient {
        recipe_id: bread.id,
        ingredient_id: flour.id,
        quantity: Decimal::from_str("250").unwrap(),
        unit: Unit::Gram,
    };
    db.upsert_recipe_ingredient(&link).await.unwrap();
    link.quantity = Decimal::from_str("0.75").unwrap();
    link.unit = Unit::Piece;
    db.upsert_recipe_ingredient(&link).await.unwrap();

    let lines = db.list_recipe_ingredients(bread.id).await.unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].ingredient_name, "Flour");
    assert_eq!(lines[0].quantity, Decimal::from_str("0.75").unwrap());
    assert_eq!(lines[0].unit, Unit::Piece);

    assert!(matches!(
        db.upsert_recipe_ingredient(&RecipeIngredient {
            ingredient_id: flour.id + 1000,
            ..link.clone()
        })
        .await,
        Err(PortError::NotFound(_))
    ));

    assert!(db.delete_recipe(user.id, bread.id).await.unwrap());
    assert!(db.list_recipe_ingredients(bread.id).await.unwrap().is_empty());
    assert!(!db.delete_recipe(user.id, bread.id).await.unwrap());

    drop_test_db(&db_name).await;
}
