//! End-to-end requests through the assembled router, backed by the in-memory
//! database and fake external services.

use std::collections::HashMap;
use std::sync::Arc;

use api_lib::config::Config;
use api_lib::web::{build_router, state::AppState};
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use meal_builder_core::domain::{DayOfWeek, MealCategory, MealType, RecipeDraft};
use meal_builder_core::ports::{DatabaseService, ImageStorageService};
use meal_builder_test_utils::{FakeIdentityProvider, FakeImageStorage, InMemoryDb};
use serde_json::{json, Value};
use tower::ServiceExt;

struct TestApp {
    db: Arc<InMemoryDb>,
    images: Arc<FakeImageStorage>,
    router: Router,
    user: i64,
    session: String,
}

fn config_with(extra: &[(&'static str, &'static str)]) -> Config {
    let mut vars: HashMap<&str, &str> = HashMap::from([
        ("DATABASE_URL", "postgres://localhost/meals"),
        ("GOOGLE_CLIENT_ID", "client"),
        ("GOOGLE_CLIENT_SECRET", "secret"),
        ("COOKIE_SECURE", "false"),
    ]);
    vars.extend(extra.iter().copied());
    Config::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap()
}

fn app_from(config: Config, image_storage: bool) -> TestApp {
    let db = Arc::new(InMemoryDb::new());
    let (user, session) = db.seed_user_with_session("alice");
    let images = Arc::new(FakeImageStorage::new());
    let state = Arc::new(AppState {
        db: db.clone(),
        config: Arc::new(config),
        identity: Arc::new(FakeIdentityProvider::default()),
        image_storage: image_storage.then(|| images.clone() as Arc<dyn ImageStorageService>),
    });
    TestApp {
        router: build_router(state),
        db,
        images,
        user,
        session,
    }
}

fn app_with(image_storage: bool) -> TestApp {
    app_from(config_with(&[]), image_storage)
}

fn app() -> TestApp {
    app_with(true)
}

fn draft(title: &str) -> RecipeDraft {
    RecipeDraft {
        title: title.into(),
        description: None,
        category: MealCategory::Dinner,
        calories: Some(500),
        image_url: None,
    }
}

impl TestApp {
    async fn send(&self, req: Request<Body>) -> Response {
        self.router.clone().oneshot(req).await.unwrap()
    }

    fn authed(&self, method: Method, uri: &str) -> axum::http::request::Builder {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::COOKIE, format!("session={}", self.session))
    }

    async fn json(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        let builder = self.authed(method, uri);
        let req = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        };
        self.send(req.unwrap()).await
    }

    async fn form(&self, uri: &str, body: &str) -> Response {
        let req = self
            .authed(Method::POST, uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(req).await
    }

    async fn page(&self, uri: &str) -> Response {
        self.send(self.authed(Method::GET, uri).body(Body::empty()).unwrap())
            .await
    }
}

async fn body_json(resp: Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_text(resp: Response) -> String {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn location(resp: &Response) -> &str {
    resp.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

fn set_cookies(resp: &Response) -> Vec<String> {
    resp.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok().map(str::to_string))
        .collect()
}

//=========================================================================================
// Authentication
//=========================================================================================

#[tokio::test]
async fn api_without_session_is_unauthorized() {
    let app = app();
    let resp = app
        .send(Request::get("/api/recipes").body(Body::empty()).unwrap())
        .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(resp).await["status"], 401);
}

#[tokio::test]
async fn api_with_unknown_session_is_unauthorized() {
    let app = app();
    let req = Request::get("/api/recipes")
        .header(header::COOKIE, "session=not-a-session")
        .body(Body::empty())
        .unwrap();
    assert_eq!(app.send(req).await.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn pages_redirect_anonymous_visitors_to_login() {
    let app = app();
    let resp = app
        .send(Request::get("/mealplans/7?tab=grid").body(Body::empty()).unwrap())
        .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/auth/login?returnUrl=%2Fmealplans%2F7%3Ftab%3Dgrid");
}

#[tokio::test]
async fn login_sets_flow_cookies_and_redirects_to_provider() {
    let app = app();
    let resp = app
        .send(
            Request::get("/auth/login?returnUrl=/recipes")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert!(location(&resp).starts_with("https://accounts.test/authorize?state="));

    let cookies = set_cookies(&resp);
    assert!(cookies.iter().any(|c| c.starts_with("oauth_state=")));
    assert!(cookies.iter().any(|c| c.starts_with("oauth_return=/recipes;")));
    assert!(cookies.iter().all(|c| !c.contains("Secure")));
}

#[tokio::test]
async fn login_ignores_foreign_return_urls() {
    let app = app();
    let resp = app
        .send(
            Request::get("/auth/login?returnUrl=//evil.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    let cookies = set_cookies(&resp);
    assert!(cookies.iter().any(|c| c.starts_with("oauth_return=/;")));

    let resp = app
        .send(
            Request::get("/auth/login?returnUrl=%2Frecipes%3BDomain%3Devil.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert!(set_cookies(&resp)
        .iter()
        .any(|c| c.starts_with("oauth_return=/;")));
}

#[tokio::test]
async fn callback_with_mismatched_state_is_unauthorized() {
    let app = app();
    let req = Request::get("/auth/callback?code=good-code&state=forged")
        .header(header::COOKIE, "oauth_state=expected")
        .body(Body::empty())
        .unwrap();
    assert_eq!(app.send(req).await.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn callback_with_rejected_code_is_unauthorized() {
    let app = app();
    let req = Request::get("/auth/callback?code=bad-code&state=s1")
        .header(header::COOKIE, "oauth_state=s1")
        .body(Body::empty())
        .unwrap();
    assert_eq!(app.send(req).await.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn callback_creates_a_session_usable_by_the_api() {
    let app = app();
    let req = Request::get("/auth/callback?code=good-code&state=s1")
        .header(header::COOKIE, "oauth_state=s1; oauth_return=/mealplans?x=1")
        .body(Body::empty())
        .unwrap();
    let resp = app.send(req).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/mealplans?x=1");

    let cookies = set_cookies(&resp);
    let session = cookies
        .iter()
        .find_map(|c| c.strip_prefix("session="))
        .and_then(|c| c.split(';').next())
        .unwrap()
        .to_string();
    assert!(!session.is_empty());
    assert!(cookies.iter().any(|c| c.starts_with("oauth_state=;")));

    let req = Request::get("/api/mealplans")
        .header(header::COOKIE, format!("session={session}"))
        .body(Body::empty())
        .unwrap();
    assert_eq!(app.send(req).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn logout_ends_the_session() {
    let app = app();
    let resp = app
        .send(app.authed(Method::POST, "/auth/logout").body(Body::empty()).unwrap())
        .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/");
    assert!(set_cookies(&resp).iter().any(|c| c.starts_with("session=;")));

    let resp = app.json(Method::GET, "/api/recipes", None).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

//=========================================================================================
// JSON API
//=========================================================================================

#[tokio::test]
async fn ingredient_crud_round() {
    let app = app();
    let resp = app
        .json(Method::POST, "/api/ingredients", Some(json!({ "name": " Flour " })))
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let loc = location(&resp).to_string();
    let body = body_json(resp).await;
    assert_eq!(body["ok"], true);
    let id = body["id"].as_i64().unwrap();
    assert_eq!(loc, format!("/api/ingredients/{id}"));

    let got = body_json(app.json(Method::GET, &loc, None).await).await;
    assert_eq!(got["name"], "Flour");

    let resp = app
        .json(Method::PUT, &loc, Some(json!({ "name": "Rye flour" })))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, json!({ "ok": true }));

    assert_eq!(app.json(Method::DELETE, &loc, None).await.status(), StatusCode::OK);
    assert_eq!(app.json(Method::DELETE, &loc, None).await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_recipe_is_a_validation_problem() {
    let app = app();
    let resp = app
        .json(
            Method::POST,
            "/api/recipes",
            Some(json!({ "title": "  ", "category": "brunch", "calories": -5 })),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert_eq!(body["status"], 400);
    let errors = body["errors"].as_object().unwrap();
    assert!(errors.contains_key("title"));
    assert!(errors.contains_key("calories"));
    assert_eq!(errors["category"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn recipe_create_and_fetch() {
    let app = app();
    let resp = app
        .json(
            Method::POST,
            "/api/recipes",
            Some(json!({
                "title": "Lentil soup",
                "category": "Dinner",
                "calories": 420,
                "imageUrl": "https://img.example.com/soup.jpg"
            })),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let loc = location(&resp).to_string();

    let recipe = body_json(app.json(Method::GET, &loc, None).await).await;
    assert_eq!(recipe["title"], "Lentil soup");
    assert_eq!(recipe["category"], "dinner");
    assert_eq!(recipe["imageUrl"], "https://img.example.com/soup.jpg");
}

#[tokio::test]
async fn recipes_of_other_users_are_not_found() {
    let app = app();
    let (bob, _) = app.db.seed_user_with_session("bob");
    let theirs = app.db.create_recipe(bob, &draft("Secret stew")).await.unwrap();

    let resp = app
        .json(Method::GET, &format!("/api/recipes/{}", theirs.id), None)
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let list = body_json(app.json(Method::GET, "/api/recipes", None).await).await;
    assert_eq!(list, json!([]));
}

#[tokio::test]
async fn recipe_ingredient_quantities_are_upserted() {
    let app = app();
    let recipe = app.db.create_recipe(app.user, &draft("Bread")).await.unwrap();
    let flour = app.db.create_ingredient("Flour").await.unwrap();
    let uri = format!("/api/recipes/{}/ingredients/{}", recipe.id, flour.id);

    for quantity in ["250", "500.5"] {
        let resp = app
            .json(Method::PUT, &uri, Some(json!({ "quantity": quantity, "unit": "gram" })))
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
    }
    let links = body_json(
        app.json(Method::GET, &format!("/api/recipes/{}/ingredients", recipe.id), None)
            .await,
    )
    .await;
    let links = links.as_array().unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0]["ingredientName"], "Flour");
    assert_eq!(links[0]["quantity"], "500.5");

    assert_eq!(app.json(Method::DELETE, &uri, None).await.status(), StatusCode::OK);
    assert!(app.db.recipe_links().is_empty());
}

#[tokio::test]
async fn slot_upsert_keeps_one_slot_per_cell() {
    let app = app();
    let plan = app.db.create_meal_plan(app.user, "Week 1").await.unwrap();
    let soup = app.db.create_recipe(app.user, &draft("Soup")).await.unwrap();
    let pie = app.db.create_recipe(app.user, &draft("Pie")).await.unwrap();
    let uri = format!("/api/mealplans/{}/slots", plan.id);

    let first = body_json(
        app.json(
            Method::PUT,
            &uri,
            Some(json!({ "recipeId": soup.id, "day": "monday", "mealType": "dinner" })),
        )
        .await,
    )
    .await;
    let second = body_json(
        app.json(
            Method::PUT,
            &uri,
            Some(json!({ "recipeId": pie.id, "day": "Monday", "mealType": "DINNER", "notes": "  warm up  " })),
        )
        .await,
    )
    .await;
    assert_eq!(first["id"], second["id"]);
    assert_eq!(app.db.slots().len(), 1);

    let listed = body_json(app.json(Method::GET, &uri, None).await).await;
    assert_eq!(listed["name"], "Week 1");
    let slots = listed["slots"].as_array().unwrap();
    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0]["recipeTitle"], "Pie");
    assert_eq!(slots[0]["day"], "monday");
    assert_eq!(slots[0]["mealType"], "dinner");
    assert_eq!(slots[0]["notes"], "warm up");
}

#[tokio::test]
async fn slot_upsert_rejects_unknown_day_and_foreign_recipe() {
    let app = app();
    let plan = app.db.create_meal_plan(app.user, "Week 1").await.unwrap();
    let (bob, _) = app.db.seed_user_with_session("bob");
    let theirs = app.db.create_recipe(bob, &draft("Not mine")).await.unwrap();
    let uri = format!("/api/mealplans/{}/slots", plan.id);

    let resp = app
        .json(
            Method::PUT,
            &uri,
            Some(json!({ "recipeId": theirs.id, "day": "funday", "mealType": "dinner" })),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(resp).await["errors"]["day"].is_array());

    let resp = app
        .json(
            Method::PUT,
            &uri,
            Some(json!({ "recipeId": theirs.id, "day": "friday", "mealType": "lunch" })),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(app.db.slots().is_empty());
}

#[tokio::test]
async fn concurrent_slot_write_is_a_conflict() {
    let app = app();
    let plan = app.db.create_meal_plan(app.user, "Week 1").await.unwrap();
    let soup = app.db.create_recipe(app.user, &draft("Soup")).await.unwrap();
    app.db.fail_next_slot_write_with_conflict();

    let resp = app
        .json(
            Method::PUT,
            &format!("/api/mealplans/{}/slots", plan.id),
            Some(json!({ "recipeId": soup.id, "day": "sunday", "mealType": "lunch" })),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(resp).await["status"], 409);
}

#[tokio::test]
async fn slot_notes_patch_and_delete() {
    let app = app();
    let plan = app.db.create_meal_plan(app.user, "Week 1").await.unwrap();
    let soup = app.db.create_recipe(app.user, &draft("Soup")).await.unwrap();
    let created = body_json(
        app.json(
            Method::PUT,
            &format!("/api/mealplans/{}/slots", plan.id),
            Some(json!({ "recipeId": soup.id, "day": "tuesday", "mealType": "lunch", "notes": "old" })),
        )
        .await,
    )
    .await;
    let slot_id = created["id"].as_i64().unwrap();
    let slot_uri = format!("/api/mealplans/{}/slots/{slot_id}", plan.id);

    let resp = app
        .json(Method::PATCH, &format!("{slot_uri}/notes"), Some(json!({ "notes": "   " })))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(app.db.slots()[0].notes, None);

    let resp = app
        .json(Method::PATCH, &format!("/api/mealplans/{}/slots/9999/notes", plan.id), Some(json!({ "notes": "x" })))
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    assert_eq!(app.json(Method::DELETE, &slot_uri, None).await.status(), StatusCode::OK);
    assert_eq!(app.json(Method::DELETE, &slot_uri, None).await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn grid_stays_in_calendar_order_when_the_bot_week_starts_monday() {
    let app = app_from(config_with(&[("TELEGRAM_WEEK_START", "monday")]), true);
    let plan = app.db.create_meal_plan(app.user, "Week 1").await.unwrap();
    let grid = body_json(
        app.json(Method::GET, &format!("/api/mealplans/{}/grid", plan.id), None)
            .await,
    )
    .await;
    let cells = grid["cells"].as_array().unwrap();
    assert_eq!(cells.len(), DayOfWeek::ALL.len() * MealType::ALL.len());
    assert_eq!(cells[0]["day"], "sunday");
    assert_eq!(cells[cells.len() - 1]["day"], "saturday");
    assert!(cells.iter().all(|c| c["slotId"].is_null()));

    let html = body_text(app.page(&format!("/mealplans/{}", plan.id)).await).await;
    let sunday = html.find("<h3>Sunday").unwrap();
    let monday = html.find("<h3>Monday").unwrap();
    assert!(sunday < monday);
    let sunday_option = html.find("<option value=\"sunday\"").unwrap();
    let monday_option = html.find("<option value=\"monday\"").unwrap();
    assert!(sunday_option < monday_option);
}

#[tokio::test]
async fn foreign_meal_plans_are_not_found() {
    let app = app();
    let (bob, _) = app.db.seed_user_with_session("bob");
    let theirs = app.db.create_meal_plan(bob, "Bob's week").await.unwrap();

    for uri in [
        format!("/api/mealplans/{}", theirs.id),
        format!("/api/mealplans/{}/slots", theirs.id),
        format!("/api/mealplans/{}/grid", theirs.id),
    ] {
        let resp = app.json(Method::GET, &uri, None).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{uri}");
    }
    let resp = app
        .json(Method::DELETE, &format!("/api/mealplans/{}", theirs.id), None)
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

//=========================================================================================
// HTML pages
//=========================================================================================

#[tokio::test]
async fn home_page_for_anonymous_visitors_offers_login() {
    let app = app();
    let resp = app
        .send(Request::get("/").body(Body::empty()).unwrap())
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_text(resp).await.contains("/auth/login?returnUrl=/mealplans"));
}

#[tokio::test]
async fn meal_plan_form_creates_and_lists() {
    let app = app();
    let new_page = body_text(app.page("/mealplans/new").await).await;
    assert!(new_page.contains("My meal plan for this week"));

    let resp = app.form("/mealplans", "name=%3Cscript%3EWeek%3C%2Fscript%3E").await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/mealplans");

    let index = body_text(app.page("/mealplans").await).await;
    assert!(index.contains("&lt;script&gt;Week&lt;/script&gt;"));
    assert!(!index.contains("<script>"));
}

#[tokio::test]
async fn blank_meal_plan_name_rerenders_the_form() {
    let app = app();
    let resp = app.form("/mealplans", "name=+++").await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(resp).await.contains("class=\"errors\""));
}

#[tokio::test]
async fn assigning_from_the_grid_page() {
    let app = app();
    let plan = app.db.create_meal_plan(app.user, "Week 1").await.unwrap();
    let soup = app.db.create_recipe(app.user, &draft("Soup")).await.unwrap();
    let uri = format!("/mealplans/{}/slots", plan.id);

    let resp = app
        .form(&uri, &format!("day=wednesday&meal_type=lunch&recipe_id={}&notes=extra+bread", soup.id))
        .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), format!("/mealplans/{}", plan.id));

    let page = body_text(app.page(&format!("/mealplans/{}", plan.id)).await).await;
    assert!(page.contains("Soup"));
    assert!(page.contains("extra bread"));
    assert!(page.contains("500 kcal"));

    let resp = app.form(&uri, "day=&meal_type=lunch&recipe_id=abc").await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let page = body_text(resp).await;
    assert!(page.contains("day: is required"));
    assert!(page.contains("recipe_id: must be a number"));
}

#[tokio::test]
async fn removing_a_missing_slot_from_the_page_redirects() {
    let app = app();
    let plan = app.db.create_meal_plan(app.user, "Week 1").await.unwrap();
    let resp = app
        .form(&format!("/mealplans/{}/slots/4242/remove", plan.id), "")
        .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), format!("/mealplans/{}", plan.id));
}

#[tokio::test]
async fn foreign_plan_page_is_not_found() {
    let app = app();
    let (bob, _) = app.db.seed_user_with_session("bob");
    let theirs = app.db.create_meal_plan(bob, "Bob's week").await.unwrap();
    let resp = app.page(&format!("/mealplans/{}", theirs.id)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

/// An image part is `(file name, content type, bytes)`.
type ImagePart<'a> = (&'a str, &'a str, &'a [u8]);

fn multipart_body(boundary: &str, fields: &[(&str, &str)], file: Option<ImagePart<'_>>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!("--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                .as_bytes(),
        );
    }
    if let Some((file_name, content_type, data)) = file {
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"image_file\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    body
}

async fn post_recipe_form(app: &TestApp, fields: &[(&str, &str)], file: Option<ImagePart<'_>>) -> Response {
    let boundary = "mealbuilder-boundary";
    let req = app
        .authed(Method::POST, "/recipes")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(multipart_body(boundary, fields, file)))
        .unwrap();
    app.send(req).await
}

#[tokio::test]
async fn recipe_form_uploads_the_image() {
    let app = app();
    let resp = post_recipe_form(
        &app,
        &[("title", "Pancakes"), ("category", "breakfast"), ("calories", "350")],
        Some(("pancakes.png", "image/png", &b"not-really-a-png"[..])),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/recipes");

    assert_eq!(app.images.uploads(), vec![("pancakes.png".to_string(), 16)]);
    let recipes = app.db.list_recipes(app.user).await.unwrap();
    assert_eq!(recipes.len(), 1);
    assert_eq!(
        recipes[0].image_url.as_deref(),
        Some("https://images.test/pancakes.png")
    );
}

#[tokio::test]
async fn malformed_image_content_type_still_uploads() {
    let app = app();
    let resp = post_recipe_form(
        &app,
        &[("title", "Pancakes"), ("category", "breakfast")],
        Some(("pancakes.png", "image", &b"png"[..])),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(app.images.uploads(), vec![("pancakes.png".to_string(), 3)]);
}

#[tokio::test]
async fn invalid_recipe_form_skips_the_upload() {
    let app = app();
    let resp = post_recipe_form(
        &app,
        &[("title", ""), ("category", "brunch")],
        Some(("pancakes.png", "image/png", &b"png"[..])),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let page = body_text(resp).await;
    assert!(page.contains("category: is not a valid category"));
    assert!(!page.contains("category: is required"));
    assert!(app.images.uploads().is_empty());
}

#[tokio::test]
async fn image_upload_without_storage_is_a_field_error() {
    let app = app_with(false);
    let resp = post_recipe_form(
        &app,
        &[("title", "Pancakes"), ("category", "breakfast")],
        Some(("pancakes.png", "image/png", &b"png"[..])),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(resp)
        .await
        .contains("image uploads are not configured"));
}
