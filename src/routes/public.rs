use askama::Template;
use askama_axum::IntoResponse as AskamaTemplateResponse;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use axum_extra::extract::cookie::PrivateCookieJar;
use serde::Deserialize;
use tracing::error;

use crate::{
    auth::{self, CurrentUser},
    error::AppError,
    services::session::SessionError,
    state::AppState,
};

const HOME: &str = "/trips/dashboard";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(landing))
        .route("/login", get(login_form).post(login_submit))
        .route("/signup", get(signup_form).post(signup_submit))
        .route("/logout", post(logout))
}

#[derive(Template)]
#[template(path = "landing.html")]
struct LandingTemplate {
    logged_in: bool,
    display_name: String,
}

async fn landing(current: CurrentUser) -> impl IntoResponse {
    AskamaTemplateResponse::into_response(LandingTemplate {
        logged_in: current.0.is_some(),
        display_name: current
            .0
            .map(|user| user.display_name)
            .unwrap_or_default(),
    })
}

#[derive(Template)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    show_error: bool,
    error_message: String,
    email: String,
}

async fn login_form() -> impl IntoResponse {
    AskamaTemplateResponse::into_response(LoginTemplate {
        show_error: false,
        error_message: String::new(),
        email: String::new(),
    })
}

#[derive(Deserialize)]
struct LoginForm {
    email: String,
    password: String,
}

async fn login_submit(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    match auth::authenticate_user(&state, &form.email, &form.password).await {
        Ok(user) => {
            let session_id = auth::create_session(&state, user).await;
            (
                auth::apply_session_cookie(jar, &session_id),
                Redirect::to(HOME),
            )
                .into_response()
        }
        Err(AppError::Session(SessionError::InvalidCredentials)) => render_login_error(
            form.email,
            "Login failed. Please check your email and password.".into(),
        ),
        Err(AppError::BadRequest(msg)) => render_login_error(form.email, msg),
        Err(err) => {
            error!("login failed: {err}");
            render_login_error(
                form.email,
                "Login is unavailable right now. Please try again.".into(),
            )
        }
    }
}

fn render_login_error(email: String, message: String) -> Response {
    (
        StatusCode::BAD_REQUEST,
        AskamaTemplateResponse::into_response(LoginTemplate {
            show_error: true,
            error_message: message,
            email,
        }),
    )
        .into_response()
}

#[derive(Template)]
#[template(path = "auth/signup.html")]
pub struct SignupTemplate {
    show_error: bool,
    error_message: String,
    email: String,
    display_name: String,
}

async fn signup_form() -> impl IntoResponse {
    AskamaTemplateResponse::into_response(SignupTemplate {
        show_error: false,
        error_message: String::new(),
        email: String::new(),
        display_name: String::new(),
    })
}

#[derive(Deserialize)]
struct SignupForm {
    email: String,
    #[serde(default)]
    display_name: String,
    password: String,
    password_confirm: String,
}

async fn signup_submit(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    Form(form): Form<SignupForm>,
) -> Response {
    if form.password != form.password_confirm {
        return render_signup_error(form, "The passwords do not match.".into());
    }

    match auth::register_user(&state, &form.email, &form.password, Some(&form.display_name))
        .await
    {
        Ok(user) => {
            let session_id = auth::create_session(&state, user).await;
            (
                auth::apply_session_cookie(jar, &session_id),
                Redirect::to(HOME),
            )
                .into_response()
        }
        Err(AppError::Session(SessionError::AlreadyRegistered)) => {
            render_signup_error(form, "An account with this email already exists.".into())
        }
        Err(AppError::BadRequest(msg)) => render_signup_error(form, msg),
        Err(err) => {
            error!("signup failed: {err}");
            render_signup_error(
                form,
                "Signup is unavailable right now. Please try again.".into(),
            )
        }
    }
}

fn render_signup_error(form: SignupForm, message: String) -> Response {
    (
        StatusCode::BAD_REQUEST,
        AskamaTemplateResponse::into_response(SignupTemplate {
            show_error: true,
            error_message: message,
            email: form.email,
            display_name: form.display_name,
        }),
    )
        .into_response()
}

async fn logout(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
) -> Result<(PrivateCookieJar, Redirect), AppError> {
    if let Some(cookie) = jar.get(auth::SESSION_COOKIE) {
        auth::destroy_session(&state, cookie.value()).await?;
    }
    Ok((auth::clear_session_cookie(jar), Redirect::to("/")))
}
