//! Test helpers for access-service integration tests.
//!
//! Builds the full router over an in-memory member repository and session
//! store, with the session key pair written to temporary files.

#![allow(dead_code)]

use access_service::{
    acl::default_acl,
    build_router,
    config::{AccessConfig, Environment, SessionConfig},
    models::{Album, Member, MembershipType, Organ, OrganInstallation, Page, Photo},
    services::{MemoryRepository, MemorySessionStore, SessionTokenService},
    utils::{hash_password, Password, PasswordHashString},
    AppState,
};
use axum::{
    body::Body,
    http::{header, Request, Response},
    Router,
};
use chrono::{NaiveDate, TimeZone, Utc};
use std::io::Write;
use std::sync::{Arc, OnceLock};
use tempfile::NamedTempFile;
use tower::util::ServiceExt;

pub const PRIVATE_KEY: &str = include_str!("../fixtures/session_private.pem");
pub const PUBLIC_KEY: &str = include_str!("../fixtures/session_public.pem");

pub const MEMBER: i64 = 1234;
pub const MEMBER_PASSWORD: &str = "s3cret";
pub const GRADUATE: i64 = 42;
pub const GRADUATE_PASSWORD: &str = "graduated";
pub const BOARD_MEMBER: i64 = 77;

pub const ALBUM_BEFORE_GRADUATION: u64 = 1;
pub const ALBUM_AFTER_GRADUATION: u64 = 2;
pub const ALBUM_AFTER_GRADUATION_TAGGED: u64 = 3;

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    _key_files: (NamedTempFile, NamedTempFile),
}

fn hashed(password: &str) -> PasswordHashString {
    // argon2 is slow in debug builds; hash each fixture password once
    static HASHES: OnceLock<(PasswordHashString, PasswordHashString)> = OnceLock::new();
    let (member, graduate) = HASHES.get_or_init(|| {
        (
            hash_password(&Password::new(MEMBER_PASSWORD)).unwrap(),
            hash_password(&Password::new(GRADUATE_PASSWORD)).unwrap(),
        )
    });
    match password {
        MEMBER_PASSWORD => member.clone(),
        GRADUATE_PASSWORD => graduate.clone(),
        other => panic!("no fixture hash for {}", other),
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn member(lidnr: i64, email: &str) -> Member {
    Member {
        lidnr,
        full_name: format!("Member {}", lidnr),
        email: email.to_string(),
        membership_type: MembershipType::Ordinary,
        membership_ends_on: None,
        organ_installations: vec![],
        board_installations: vec![],
        roles: vec![],
    }
}

fn repository() -> MemoryRepository {
    let mut abc_member = member(MEMBER, "member@example.com");
    abc_member.organ_installations.push(OrganInstallation {
        organ: Organ {
            id: 1,
            abbr: "ABC".to_string(),
            name: "Activity Board Committee".to_string(),
        },
        function: "Member".to_string(),
        install_date: date(2021, 1, 1),
        discharge_date: None,
    });

    let mut graduate = member(GRADUATE, "graduate@example.com");
    graduate.membership_type = MembershipType::Graduate;
    graduate.membership_ends_on = Some(date(2020, 1, 1));

    let mut board = member(BOARD_MEMBER, "board@example.com");
    board
        .board_installations
        .push(access_service::models::BoardInstallation {
            position: "Chair".to_string(),
            install_date: date(2020, 7, 1),
            discharge_date: None,
        });

    let album = |id: u64, start: chrono::DateTime<Utc>, tags: Vec<i64>| Album {
        id,
        name: format!("Album {}", id),
        start_date_time: start,
        photos: vec![Photo { id: id * 10, tags }],
    };

    let page = |slug: &str, required_role: &str| Page {
        slug: slug.to_string(),
        title: slug.to_string(),
        required_role: required_role.to_string(),
        body: format!("{} body", slug),
    };

    MemoryRepository::new()
        .with_member(abc_member, Some(hashed(MEMBER_PASSWORD)))
        .with_member(graduate, Some(hashed(GRADUATE_PASSWORD)))
        .with_member(board, None)
        .with_album(album(
            ALBUM_BEFORE_GRADUATION,
            Utc.with_ymd_and_hms(2019, 6, 1, 12, 0, 0).unwrap(),
            vec![],
        ))
        .with_album(album(
            ALBUM_AFTER_GRADUATION,
            Utc.with_ymd_and_hms(2020, 6, 1, 12, 0, 0).unwrap(),
            vec![MEMBER],
        ))
        .with_album(album(
            ALBUM_AFTER_GRADUATION_TAGGED,
            Utc.with_ymd_and_hms(2020, 6, 1, 12, 0, 0).unwrap(),
            vec![GRADUATE],
        ))
        .with_page(page("about", "guest"))
        .with_page(page("members", "user"))
        .with_page(page("board", "board"))
}

impl TestApp {
    pub fn new() -> Self {
        let mut private_key = NamedTempFile::new().unwrap();
        private_key.write_all(PRIVATE_KEY.as_bytes()).unwrap();
        let mut public_key = NamedTempFile::new().unwrap();
        public_key.write_all(PUBLIC_KEY.as_bytes()).unwrap();

        let config = AccessConfig {
            common: service_core::config::Config::default(),
            environment: Environment::Dev,
            service_name: "access-service-test".to_string(),
            service_version: "test".to_string(),
            log_level: "error".to_string(),
            session: SessionConfig {
                private_key_path: private_key.path().to_string_lossy().to_string(),
                public_key_path: public_key.path().to_string_lossy().to_string(),
                cookie_domain: None,
                lifetime_days: 14,
            },
            member_seed_path: String::new(),
        };

        let tokens = SessionTokenService::new(&config.session, false);
        let state = AppState::new(
            config,
            default_acl().unwrap(),
            Arc::new(repository()),
            Arc::new(MemorySessionStore::new()),
            tokens,
        );

        Self {
            router: build_router(state.clone()),
            state,
            _key_files: (private_key, public_key),
        }
    }

    pub async fn send(&self, req: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(req).await.unwrap()
    }

    pub async fn get(&self, uri: &str, cookies: &str) -> Response<Body> {
        self.send(get(uri, cookies)).await
    }

    /// Log in and return the `Cookie` header value for follow-up requests.
    pub async fn login(&self, login: &str, password: &str, remember: bool) -> String {
        let response = self.send(login_request(login, password, remember)).await;
        assert_eq!(response.status(), 200);
        cookie_header(&response)
    }
}

pub fn get(uri: &str, cookies: &str) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if !cookies.is_empty() {
        builder = builder.header(header::COOKIE, cookies);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn login_request(login: &str, password: &str, remember: bool) -> Request<Body> {
    let mut form = format!("login={}&password={}", login, password);
    if remember {
        form.push_str("&remember=on");
    }
    Request::builder()
        .method("POST")
        .uri("/login")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form))
        .unwrap()
}

pub fn post(uri: &str, cookies: &str) -> Request<Body> {
    let mut builder = Request::builder().method("POST").uri(uri);
    if !cookies.is_empty() {
        builder = builder.header(header::COOKIE, cookies);
    }
    builder.body(Body::empty()).unwrap()
}

/// Every `Set-Cookie` header of a response.
pub fn set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

/// Full `Set-Cookie` line for `name`, if the response sets it.
pub fn set_cookie(response: &Response<Body>, name: &str) -> Option<String> {
    let prefix = format!("{}=", name);
    set_cookies(response)
        .into_iter()
        .find(|c| c.starts_with(&prefix))
}

/// Value the response assigns to cookie `name`.
pub fn cookie_value(response: &Response<Body>, name: &str) -> Option<String> {
    set_cookie(response, name).map(|line| {
        line[name.len() + 1..]
            .split(';')
            .next()
            .unwrap_or("")
            .to_string()
    })
}

/// `Cookie` request header echoing every cookie the response set.
pub fn cookie_header(response: &Response<Body>) -> String {
    set_cookies(response)
        .iter()
        .filter_map(|line| line.split(';').next())
        .collect::<Vec<_>>()
        .join("; ")
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
