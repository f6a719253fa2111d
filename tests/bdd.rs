use std::{fmt, net::SocketAddr, sync::Arc};

use chrono::{NaiveDate, NaiveDateTime};
use cucumber::{given, then, when, World as _};
use wanderlog::{
    auth::{self, AuthenticatedUser},
    config::AppConfig,
    models::{destination::DestinationFields, trip::TripFields},
    planner::{
        batch::{BatchReport, ItemOutcome},
        form::{FormError, RemoveOutcome, TripForm},
        progress::destination_progress,
        status::TripSchedule,
    },
    services::{
        api::ResourceApi,
        memory::{ApiCall, ApiOperation, InMemoryResourceApi},
        places::{PlaceResult, PlacesService},
        session::InMemorySessionProvider,
    },
    state::AppState,
};

#[derive(Debug, cucumber::World, Default)]
struct PlannerWorld {
    backend: Option<TestBackend>,
    user: Option<AuthenticatedUser>,
    form: Option<TripForm>,
    trip_id: Option<String>,
    dates: Option<(NaiveDate, NaiveDate)>,
    schedule: Option<TripSchedule>,
    report: Option<BatchReport>,
    last_error: Option<FormError>,
    session_id: Option<String>,
    login_failed: bool,
}

impl PlannerWorld {
    fn backend(&mut self) -> &TestBackend {
        self.backend.get_or_insert_with(TestBackend::new)
    }

    fn api(&mut self) -> Arc<InMemoryResourceApi> {
        self.backend().api.clone()
    }

    fn user(&self) -> AuthenticatedUser {
        self.user.clone().expect("a user must be signed in first")
    }

    fn form_mut(&mut self) -> &mut TripForm {
        self.form.as_mut().expect("a trip form must be open first")
    }

    fn form(&self) -> &TripForm {
        self.form.as_ref().expect("a trip form must be open first")
    }
}

struct TestBackend {
    api: Arc<InMemoryResourceApi>,
    app: AppState,
}

impl fmt::Debug for TestBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestBackend").finish()
    }
}

impl TestBackend {
    fn new() -> Self {
        let config = AppConfig {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            api_base_url: None,
            auth_base_url: None,
            places_base_url: None,
            cookie_secret: "bdd-cookie-secret".into(),
        };
        let api = Arc::new(InMemoryResourceApi::new());
        let app = AppState::new(
            config,
            api.clone(),
            Arc::new(InMemorySessionProvider::new()),
            PlacesService::start(None),
        );
        Self { api, app }
    }
}

fn parse_date(raw: &str) -> NaiveDate {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").expect("date in YYYY-MM-DD form")
}

fn ordinal_index(position: usize) -> usize {
    assert!(position >= 1, "destinations are numbered from 1");
    position - 1
}

// Schedule

#[given(regex = r#"^a trip from "([^"]+)" to "([^"]+)"$"#)]
async fn given_trip_dates(world: &mut PlannerWorld, start: String, end: String) {
    world.dates = Some((parse_date(&start), parse_date(&end)));
}

#[when(regex = r#"^I look at it on "([^"]+)"$"#)]
async fn when_look_at(world: &mut PlannerWorld, at: String) {
    let now = NaiveDateTime::parse_from_str(&at, "%Y-%m-%d %H:%M").expect("timestamp");
    let (start, end) = world.dates.expect("trip dates must be set first");
    world.schedule = TripSchedule::from_dates(now, Some(start), Some(end));
}

#[then(regex = r#"^its status is "([^"]+)"$"#)]
async fn then_status(world: &mut PlannerWorld, status: String) {
    let schedule = world.schedule.as_ref().expect("trip has a schedule");
    assert_eq!(schedule.status.as_str(), status);
}

#[then(regex = r#"^its days info reads "([^"]+)"$"#)]
async fn then_days_info(world: &mut PlannerWorld, text: String) {
    let schedule = world.schedule.as_ref().expect("trip has a schedule");
    assert_eq!(schedule.days_info.to_string(), text);
}

#[then(regex = r#"^it lasts "([^"]+)"$"#)]
async fn then_lasts(world: &mut PlannerWorld, text: String) {
    let (start, end) = world.dates.expect("trip dates must be set first");
    let now = start.and_hms_opt(0, 0, 0).expect("midnight");
    let schedule =
        TripSchedule::from_dates(now, Some(start), Some(end)).expect("both dates are set");
    assert_eq!(schedule.duration_text(), text);
}

// Sessions

#[given(regex = r#"^I am signed in as "([^"]+)"$"#)]
async fn given_signed_in(world: &mut PlannerWorld, email: String) {
    let state = world.backend().app.clone();
    let user = auth::register_user(&state, &email, "bdd-password", Some("Ada"))
        .await
        .expect("register user");
    world.user = Some(user);
}

#[given(regex = r#"^a registered user "([^"]+)" with password "([^"]+)"$"#)]
async fn given_registered(world: &mut PlannerWorld, email: String, password: String) {
    let state = world.backend().app.clone();
    auth::register_user(&state, &email, &password, None)
        .await
        .expect("register user");
}

#[when(regex = r#"^I log in as "([^"]+)" with password "([^"]+)"$"#)]
async fn when_log_in(world: &mut PlannerWorld, email: String, password: String) {
    let state = world.backend().app.clone();
    match auth::authenticate_user(&state, &email, &password).await {
        Ok(user) => {
            world.session_id = Some(auth::create_session(&state, user).await);
            world.login_failed = false;
        }
        Err(_) => world.login_failed = true,
    }
}

#[when("I log out")]
async fn when_log_out(world: &mut PlannerWorld) {
    let state = world.backend().app.clone();
    let session_id = world.session_id.clone().expect("logged in first");
    auth::destroy_session(&state, &session_id)
        .await
        .expect("logout");
}

#[then(regex = r#"^the session context belongs to "([^"]+)"$"#)]
async fn then_session_belongs(world: &mut PlannerWorld, email: String) {
    let state = world.backend().app.clone();
    let session_id = world.session_id.clone().expect("logged in first");
    let user = state.sessions.get(&session_id).await.expect("live session");
    assert_eq!(user.email, email);
}

#[then("the session context is empty")]
async fn then_session_empty(world: &mut PlannerWorld) {
    let state = world.backend().app.clone();
    let session_id = world.session_id.clone().expect("logged in first");
    assert!(state.sessions.get(&session_id).await.is_none());
}

#[then("the login is rejected")]
async fn then_login_rejected(world: &mut PlannerWorld) {
    assert!(world.login_failed);
    assert!(world.session_id.is_none());
}

// Trip form

#[given(regex = r#"^a new trip form titled "([^"]+)"$"#)]
async fn given_new_form(world: &mut PlannerWorld, title: String) {
    let mut form = TripForm::new();
    form.update_field("title", &title).expect("title");
    world.form = Some(form);
}

#[given(regex = r#"^the first destination is named "([^"]+)"$"#)]
async fn given_first_named(world: &mut PlannerWorld, name: String) {
    world
        .form_mut()
        .update_destination_field(0, "name", &name)
        .expect("name");
}

#[given("I add an empty destination")]
async fn given_empty_destination(world: &mut PlannerWorld) {
    world.form_mut().add_destination_draft();
}

#[given(regex = r#"^I add a destination named "([^"]+)"$"#)]
async fn given_named_destination(world: &mut PlannerWorld, name: String) {
    let form = world.form_mut();
    let index = form.add_destination_draft();
    form.update_destination_field(index, "name", &name)
        .expect("name");
}

#[given(regex = r#"^a saved trip "([^"]+)" with destination "([^"]+)" opened for editing$"#)]
async fn given_saved_trip(world: &mut PlannerWorld, title: String, name: String) {
    let api = world.api();
    let user = world.user();
    let trip = api
        .create_trip(
            &user,
            &TripFields {
                title,
                ..TripFields::default()
            },
        )
        .await
        .expect("create trip");
    let mut fields = DestinationFields::named(name);
    fields.order_index = 1;
    api.create_destination(&user, &trip.id, &fields)
        .await
        .expect("create destination");
    api.clear_calls().await;

    let form = TripForm::initialize(&*api, &user, Some(trip.id.as_str()))
        .await
        .expect("load form");
    world.trip_id = Some(trip.id);
    world.form = Some(form);
}

#[given(regex = r#"^a saved trip "([^"]+)" with (\d+) destinations of which (\d+) are completed$"#)]
async fn given_trip_with_progress(
    world: &mut PlannerWorld,
    title: String,
    total: usize,
    completed: usize,
) {
    let api = world.api();
    let user = world.user();
    let trip = api
        .create_trip(
            &user,
            &TripFields {
                title,
                ..TripFields::default()
            },
        )
        .await
        .expect("create trip");
    for position in 0..total {
        let mut fields = DestinationFields::named(format!("Stop {}", position + 1));
        fields.order_index = position as u32 + 1;
        fields.is_completed = position < completed;
        api.create_destination(&user, &trip.id, &fields)
            .await
            .expect("create destination");
    }
    world.trip_id = Some(trip.id);
}

#[given("the backend rejects trip creation")]
async fn given_rejects_trip_creation(world: &mut PlannerWorld) {
    world.api().fail(ApiOperation::CreateTrip).await;
}

#[given("the backend rejects deletes")]
async fn given_rejects_deletes(world: &mut PlannerWorld) {
    world.api().fail(ApiOperation::DeleteDestination).await;
}

#[given(regex = r"^the backend accepts only (\d+) more destination creates?$")]
async fn given_create_budget(world: &mut PlannerWorld, successes: usize) {
    world
        .api()
        .fail_after(ApiOperation::CreateDestination, successes)
        .await;
}

#[when("I submit the trip")]
async fn when_submit(world: &mut PlannerWorld) {
    let api = world.api();
    let user = world.user();
    let outcome = world
        .form_mut()
        .submit_trip(&*api, &user)
        .await
        .expect("submit trip");
    world.trip_id = Some(outcome.trip.id);
    world.report = Some(outcome.destinations);
}

#[when("I try to submit the trip")]
async fn when_try_submit(world: &mut PlannerWorld) {
    let api = world.api();
    let user = world.user();
    let result = world.form_mut().submit_trip(&*api, &user).await;
    world.last_error = result.err();
}

#[when(regex = r"^I remove destination (\d+) (without confirming|with confirmation)$")]
async fn when_remove(world: &mut PlannerWorld, position: usize, mode: String) {
    let api = world.api();
    let user = world.user();
    let confirmed = mode == "with confirmation";
    let result = world
        .form_mut()
        .remove_destination_draft(&*api, &user, ordinal_index(position), confirmed)
        .await;
    match result {
        Ok(RemoveOutcome::NeedsConfirmation) => assert!(!confirmed),
        Ok(RemoveOutcome::Removed) => world.last_error = None,
        Err(err) => world.last_error = Some(err),
    }
}

#[when(regex = r#"^I pick the place "([^"]+)" at (-?[\d.]+), (-?[\d.]+) for the first destination$"#)]
async fn when_pick_place(world: &mut PlannerWorld, name: String, lat: f64, lng: f64) {
    let place = PlaceResult {
        formatted_address: format!("{name}, Lisbon, Portugal"),
        name,
        lat,
        lng,
        address_components: Vec::new(),
    };
    world.form_mut().apply_place(0, &place).expect("apply place");
}

#[when("I save all destinations")]
async fn when_save_all(world: &mut PlannerWorld) {
    let api = world.api();
    let user = world.user();
    let report = world
        .form_mut()
        .save_all_destinations(&*api, &user)
        .await
        .expect("save destinations");
    world.report = Some(report);
}

#[then(regex = r"^(\d+) destination create calls? (?:was|were) made$")]
async fn then_create_calls(world: &mut PlannerWorld, expected: usize) {
    let calls = world.api().calls().await;
    let creates = calls
        .iter()
        .filter(|call| matches!(call, ApiCall::CreateDestination { .. }))
        .count();
    assert_eq!(creates, expected);
}

#[then(regex = r"^the created destination has order index (\d+)$")]
async fn then_created_order(world: &mut PlannerWorld, expected: u32) {
    let calls = world.api().calls().await;
    let order = calls
        .iter()
        .find_map(|call| match call {
            ApiCall::CreateDestination { order_index, .. } => Some(*order_index),
            _ => None,
        })
        .expect("a destination was created");
    assert_eq!(order, expected);
}

#[then(regex = r"^the form has (\d+) destinations?$")]
async fn then_form_count(world: &mut PlannerWorld, expected: usize) {
    assert_eq!(world.form().destinations().len(), expected);
}

#[then("no delete call was made")]
async fn then_no_delete(world: &mut PlannerWorld) {
    let calls = world.api().calls().await;
    assert!(!calls
        .iter()
        .any(|call| matches!(call, ApiCall::DeleteDestination { .. })));
}

#[then("no resource calls were made")]
async fn then_no_calls(world: &mut PlannerWorld) {
    assert!(world.api().calls().await.is_empty());
}

#[then("the form is still for a new trip")]
async fn then_still_new(world: &mut PlannerWorld) {
    assert!(world.form().is_new_trip());
}

#[then("a delete call was made")]
async fn then_delete(world: &mut PlannerWorld) {
    let calls = world.api().calls().await;
    assert!(calls
        .iter()
        .any(|call| matches!(call, ApiCall::DeleteDestination { .. })));
}

#[then(regex = r"^the (?:removal|submit) fails with an error$")]
async fn then_action_failed(world: &mut PlannerWorld) {
    assert!(matches!(world.last_error, Some(FormError::Api(_))));
}

#[then("the first destination has no coordinates")]
async fn then_no_coordinates(world: &mut PlannerWorld) {
    let draft = world.form().destination(0).expect("first draft");
    assert!(draft.fields.location().is_none());
}

#[then(regex = r"^the first destination is located at (-?[\d.]+), (-?[\d.]+)$")]
async fn then_located(world: &mut PlannerWorld, lat: f64, lng: f64) {
    let draft = world.form().destination(0).expect("first draft");
    let location = draft.fields.location().expect("coordinates set");
    assert_eq!((location.lat, location.lng), (lat, lng));
}

#[then(regex = r#"^the first destination is now named "([^"]+)"$"#)]
async fn then_named(world: &mut PlannerWorld, name: String) {
    let draft = world.form().destination(0).expect("first draft");
    assert_eq!(draft.fields.name, name);
}

#[then(regex = r#"^the save outcomes are "([^"]+)"$"#)]
async fn then_outcomes(world: &mut PlannerWorld, expected: String) {
    let report = world.report.as_ref().expect("a save ran");
    let actual: Vec<&str> = report
        .outcomes()
        .iter()
        .map(|outcome| match outcome {
            ItemOutcome::Created(_) => "created",
            ItemOutcome::Updated(_) => "updated",
            ItemOutcome::SkippedUnnamed => "skipped",
            ItemOutcome::Failed(_) => "failed",
            ItemOutcome::NotAttempted => "not attempted",
        })
        .collect();
    let expected: Vec<&str> = expected.split(", ").collect();
    assert_eq!(actual, expected);
}

#[then("no destination is flagged new")]
async fn then_none_new(world: &mut PlannerWorld) {
    assert!(world.form().destinations().iter().all(|draft| !draft.is_new()));
}

#[then(regex = r"^the trip progress is (\d+)%$")]
async fn then_progress(world: &mut PlannerWorld, expected: u8) {
    let api = world.api();
    let user = world.user();
    let trip_id = world.trip_id.clone().expect("a trip was saved");
    let destinations = api
        .list_destinations(&user, &trip_id)
        .await
        .expect("list destinations");
    assert_eq!(destination_progress(&destinations), expected);
}

#[tokio::main]
async fn main() {
    PlannerWorld::cucumber()
        .fail_on_skipped()
        .with_default_cli()
        .run("tests/features")
        .await;
}
