#![allow(dead_code)]

use iban_registry::{
    AppConfig, AppState, MemoryRepository, create_router,
    auth::AuthUser,
    models::{Account, IbanRequest, NewAccount, Role, RoleSet},
    password,
    repository::{Repository, RepositoryState},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use uuid::Uuid;

pub const CHISINAU: &str = "0100";
pub const BALTI: &str = "0300";

pub const ECO_INCOME_TAX: &str = "111110";
pub const ECO_LOCAL_FEES: &str = "114522";

/// Two districts, four localities and two eco codes. Locality `0120` exists in
/// both districts, so it cannot be resolved without a district.
pub fn reference_repo() -> MemoryRepository {
    MemoryRepository::new()
        .with_district(CHISINAU, "Chișinău")
        .with_district(BALTI, "Bălți")
        .with_locality(CHISINAU, "0101", "Chișinău")
        .with_locality(CHISINAU, "0120", "Codru")
        .with_locality(BALTI, "0301", "Bălți")
        .with_locality(BALTI, "0120", "Elizaveta")
        .with_eco_code(ECO_INCOME_TAX, "Impozit pe venit")
        .with_eco_code(ECO_LOCAL_FEES, "Taxa pentru \"salubrizare\", locală")
}

/// A structurally valid IBAN whose numeric tail is `n`.
pub fn iban(n: u64) -> String {
    format!("MD24AGRN{n:016}")
}

pub fn iban_request(code: &str, year: i32, eco_code: &str, locality_code: &str) -> IbanRequest {
    IbanRequest {
        iban_code: code.to_string(),
        year: Some(year),
        eco_code: eco_code.to_string(),
        district_code: None,
        locality_code: locality_code.to_string(),
    }
}

pub fn caller(roles: &[Role], district_code: Option<&str>) -> AuthUser {
    AuthUser {
        id: Uuid::new_v4(),
        username: "caller".to_string(),
        roles: roles.iter().copied().collect(),
        district_code: district_code.map(str::to_string),
    }
}

pub fn admin() -> AuthUser {
    caller(&[Role::Admin], None)
}

pub fn operator() -> AuthUser {
    caller(&[Role::Operator], None)
}

pub fn raion_operator(district: &str) -> AuthUser {
    caller(&[Role::OperatorRaion], Some(district))
}

pub async fn seed_account(
    repo: &dyn Repository,
    username: &str,
    plain_password: &str,
    roles: &[Role],
    district_code: Option<&str>,
) -> Account {
    repo.create_account(NewAccount {
        username: username.to_string(),
        password_hash: password::hash_password(plain_password).unwrap(),
        full_name: format!("{username} full name"),
        email: format!("{username}@example.com"),
        roles: roles.iter().copied().collect::<RoleSet>(),
        district_code: district_code.map(str::to_string),
    })
    .await
    .unwrap()
}

pub struct TestApp {
    pub address: String,
    pub repo: RepositoryState,
    pub config: AppConfig,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }
}

/// Serves the full router on an ephemeral port, backed by `repo`.
pub async fn spawn_app(repo: MemoryRepository) -> TestApp {
    let repo = Arc::new(repo) as RepositoryState;
    let config = AppConfig::default();

    let state = AppState {
        repo: repo.clone(),
        config: config.clone(),
    };
    let router = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp {
        address,
        repo,
        config,
    }
}
