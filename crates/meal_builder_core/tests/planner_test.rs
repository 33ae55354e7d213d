//! Planner workflows against the in-memory database.

use std::str::FromStr;

use rust_decimal::Decimal;

use meal_builder_core::domain::{DayOfWeek, MealCategory, MealType, RecipeDraft, Unit};
use meal_builder_core::planner::{self, SlotRequest};
use meal_builder_core::ports::{DatabaseService, PortError};
use meal_builder_test_utils::InMemoryDb;

struct Fixture {
    db: InMemoryDb,
    user: i64,
    other_user: i64,
    plan: i64,
    pancakes: i64,
    omelette: i64,
}

async fn fixture() -> Fixture {
    let db = InMemoryDb::new();
    let (user, _) = db.seed_user_with_session("alice");
    let (other_user, _) = db.seed_user_with_session("bob");
    let plan = db.create_meal_plan(user, "Week 1").await.unwrap().id;
    let pancakes = db.create_recipe(user, &draft("Pancakes")).await.unwrap().id;
    let omelette = db.create_recipe(user, &draft("Omelette")).await.unwrap().id;
    Fixture {
        db,
        user,
        other_user,
        plan,
        pancakes,
        omelette,
    }
}

fn draft(title: &str) -> RecipeDraft {
    RecipeDraft {
        title: title.into(),
        description: None,
        category: MealCategory::Breakfast,
        calories: Some(300),
        image_url: None,
    }
}

fn monday_breakfast(recipe_id: i64, notes: Option<&str>) -> SlotRequest {
    SlotRequest {
        recipe_id,
        day: DayOfWeek::Monday,
        meal_type: MealType::Breakfast,
        notes: notes.map(str::to_owned),
    }
}

#[tokio::test]
async fn upserting_the_same_cell_twice_keeps_one_row_with_latest_recipe() {
    let f = fixture().await;

    let first = planner::upsert_slot(&f.db, f.user, f.plan, monday_breakfast(f.pancakes, None))
        .await
        .unwrap();
    let second = planner::upsert_slot(
        &f.db,
        f.user,
        f.plan,
        monday_breakfast(f.omelette, Some("extra cheese")),
    )
    .await
    .unwrap();

    assert_eq!(first, second);
    let slots = f.db.slots();
    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0].recipe_id, f.omelette);
    assert_eq!(slots[0].notes.as_deref(), Some("extra cheese"));
}

#[tokio::test]
async fn upsert_normalizes_notes() {
    let f = fixture().await;

    planner::upsert_slot(&f.db, f.user, f.plan, monday_breakfast(f.pancakes, Some("   ")))
        .await
        .unwrap();
    assert_eq!(f.db.slots()[0].notes, None);

    let long = "n".repeat(301);
    planner::upsert_slot(&f.db, f.user, f.plan, monday_breakfast(f.pancakes, Some(&long)))
        .await
        .unwrap();
    assert_eq!(f.db.slots()[0].notes.as_ref().map(|n| n.len()), Some(300));
}

#[tokio::test]
async fn upsert_rejects_foreign_plan_and_recipe_as_not_found() {
    let f = fixture().await;
    let foreign_recipe = f.db.create_recipe(f.other_user, &draft("Bob's")).await.unwrap().id;

    let err = planner::upsert_slot(&f.db, f.other_user, f.plan, monday_breakfast(foreign_recipe, None))
        .await
        .unwrap_err();
    assert!(matches!(err, PortError::NotFound(_)));

    let err = planner::upsert_slot(&f.db, f.user, f.plan, monday_breakfast(foreign_recipe, None))
        .await
        .unwrap_err();
    assert!(matches!(err, PortError::NotFound(_)));
    assert!(f.db.slots().is_empty());
}

#[tokio::test]
async fn concurrent_write_conflict_is_surfaced() {
    let f = fixture().await;
    f.db.fail_next_slot_write_with_conflict();

    let err = planner::upsert_slot(&f.db, f.user, f.plan, monday_breakfast(f.pancakes, None))
        .await
        .unwrap_err();
    assert!(matches!(err, PortError::Conflict(_)));
}

#[tokio::test]
async fn patching_notes_requires_slot_in_owned_plan() {
    let f = fixture().await;
    let slot = planner::upsert_slot(&f.db, f.user, f.plan, monday_breakfast(f.pancakes, None))
        .await
        .unwrap();

    planner::patch_slot_notes(&f.db, f.user, f.plan, slot, Some("no sugar"))
        .await
        .unwrap();
    assert_eq!(f.db.slots()[0].notes.as_deref(), Some("no sugar"));

    let err = planner::patch_slot_notes(&f.db, f.other_user, f.plan, slot, Some("mine now"))
        .await
        .unwrap_err();
    assert!(matches!(err, PortError::NotFound(_)));

    let err = planner::patch_slot_notes(&f.db, f.user, f.plan, slot + 100, None)
        .await
        .unwrap_err();
    assert!(matches!(err, PortError::NotFound(_)));
}

#[tokio::test]
async fn removing_reports_whether_a_row_was_deleted() {
    let f = fixture().await;
    let slot = planner::upsert_slot(&f.db, f.user, f.plan, monday_breakfast(f.pancakes, None))
        .await
        .unwrap();

    assert!(!planner::remove_slot(&f.db, f.other_user, f.plan, slot).await.unwrap());
    assert!(planner::remove_slot(&f.db, f.user, f.plan, slot).await.unwrap());
    assert!(!planner::remove_slot(&f.db, f.user, f.plan, slot).await.unwrap());
}

#[tokio::test]
async fn grid_has_one_filled_cell_for_one_slot() {
    let f = fixture().await;
    planner::upsert_slot(&f.db, f.user, f.plan, monday_breakfast(f.pancakes, None))
        .await
        .unwrap();

    let grid = planner::load_grid(&f.db, f.user, f.plan, DayOfWeek::Sunday)
        .await
        .unwrap();
    assert_eq!(grid.cells.len(), 35);
    assert_eq!(grid.filled_count(), 1);
    let cell = grid.cell(DayOfWeek::Monday, MealType::Breakfast).unwrap();
    assert_eq!(cell.recipe_title.as_deref(), Some("Pancakes"));

    let err = planner::load_grid(&f.db, f.other_user, f.plan, DayOfWeek::Sunday)
        .await
        .unwrap_err();
    assert!(matches!(err, PortError::NotFound(_)));

    assert!(planner::load_public_grid(&f.db, 9_999, DayOfWeek::Sunday)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn list_slots_is_sorted_by_day_then_meal_type() {
    let f = fixture().await;
    for (day, meal_type) in [
        (DayOfWeek::Friday, MealType::Breakfast),
        (DayOfWeek::Monday, MealType::Dinner),
        (DayOfWeek::Monday, MealType::Lunch),
    ] {
        let request = SlotRequest {
            recipe_id: f.pancakes,
            day,
            meal_type,
            notes: None,
        };
        planner::upsert_slot(&f.db, f.user, f.plan, request).await.unwrap();
    }

    let (_, meals) = planner::list_slots(&f.db, f.user, f.plan).await.unwrap();
    let order: Vec<_> = meals.iter().map(|m| (m.slot.day, m.slot.meal_type)).collect();
    assert_eq!(
        order,
        [
            (DayOfWeek::Monday, MealType::Lunch),
            (DayOfWeek::Monday, MealType::Dinner),
            (DayOfWeek::Friday, MealType::Breakfast),
        ]
    );
}

#[tokio::test]
async fn recipe_ingredient_upsert_overwrites_quantity_and_unit() {
    let f = fixture().await;
    let flour = f.db.create_ingredient("Flour").await.unwrap().id;

    planner::upsert_recipe_ingredient(&f.db, f.user, f.pancakes, flour, Decimal::from(200), Unit::Gram)
        .await
        .unwrap();
    planner::upsert_recipe_ingredient(
        &f.db,
        f.user,
        f.pancakes,
        flour,
        Decimal::from_str("1.5").unwrap(),
        Unit::Piece,
    )
    .await
    .unwrap();

    let lines = planner::list_recipe_ingredients(&f.db, f.user, f.pancakes)
        .await
        .unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].quantity, Decimal::from_str("1.50").unwrap());
    assert_eq!(lines[0].unit, Unit::Piece);
}

#[tokio::test]
async fn recipe_ingredient_requires_owned_recipe_and_known_ingredient() {
    let f = fixture().await;
    let flour = f.db.create_ingredient("Flour").await.unwrap().id;

    let err = planner::upsert_recipe_ingredient(&f.db, f.other_user, f.pancakes, flour, Decimal::ONE, Unit::Gram)
        .await
        .unwrap_err();
    assert!(matches!(err, PortError::NotFound(_)));

    let err = planner::upsert_recipe_ingredient(&f.db, f.user, f.pancakes, flour + 50, Decimal::ONE, Unit::Gram)
        .await
        .unwrap_err();
    assert!(matches!(err, PortError::NotFound(_)));

    let err = planner::remove_recipe_ingredient(&f.db, f.other_user, f.pancakes, flour)
        .await
        .unwrap_err();
    assert!(matches!(err, PortError::NotFound(_)));
    assert!(!planner::remove_recipe_ingredient(&f.db, f.user, f.pancakes, flour)
        .await
        .unwrap());
}

#[tokio::test]
async fn deleting_a_recipe_cascades_to_slots_and_links() {
    let f = fixture().await;
    let flour = f.db.create_ingredient("Flour").await.unwrap().id;
    planner::upsert_recipe_ingredient(&f.db, f.user, f.pancakes, flour, Decimal::ONE, Unit::Gram)
        .await
        .unwrap();
    planner::upsert_slot(&f.db, f.user, f.plan, monday_breakfast(f.pancakes, None))
        .await
        .unwrap();

    assert!(f.db.delete_recipe(f.user, f.pancakes).await.unwrap());
    assert!(f.db.slots().is_empty());
    assert!(f.db.recipe_links().is_empty());
}
