// Integration tests for `DeviceSession` against the scripted mock router.

use std::time::Duration;

use secrecy::SecretString;

use wisply_ros::testing::{MockRouter, MockState};
use wisply_ros::{ConnectOptions, DeviceSession, Error};

fn creds() -> (String, SecretString) {
    ("api".to_owned(), SecretString::from("s3cret".to_owned()))
}

async fn connect(mock: &MockRouter) -> Result<DeviceSession, Error> {
    let (user, pass) = creds();
    DeviceSession::connect(
        &mock.host(),
        mock.port(),
        &user,
        &pass,
        &ConnectOptions::default(),
    )
    .await
}

#[tokio::test]
async fn login_and_list_secrets() {
    let mut state = MockState::default();
    state.add_secret("alice", "10M");
    state.add_secret("bob", "20M");
    let mock = MockRouter::start(state).await;

    let mut session = connect(&mock).await.unwrap();
    let secrets = session.list_secrets().await.unwrap();

    assert_eq!(secrets.len(), 2);
    assert_eq!(secrets[0].name, "alice");
    assert_eq!(secrets[0].profile, "10M");
    assert_eq!(secrets[0].service.as_deref(), Some("pppoe"));

    session.close().await;
    mock.shutdown();
}

#[tokio::test]
async fn find_secret_uses_remote_filter() {
    let mut state = MockState::default();
    state.add_secret("alice", "10M");
    state.add_secret("bob", "20M");
    let mock = MockRouter::start(state).await;

    let mut session = connect(&mock).await.unwrap();

    let found = session.find_secret("bob").await.unwrap();
    assert_eq!(found.map(|s| s.profile), Some("20M".to_owned()));

    // Exact, case-sensitive match: "Bob" is not "bob".
    let missing = session.find_secret("Bob").await.unwrap();
    assert!(missing.is_none());

    mock.shutdown();
}

#[tokio::test]
async fn set_secret_profile_round_trips() {
    let mut state = MockState::default();
    let id = state.add_secret("alice", "10M");
    let mock = MockRouter::start(state).await;

    let mut session = connect(&mock).await.unwrap();
    session.set_secret_profile(&id, "ISOLIR").await.unwrap();

    let secret = session.find_secret("alice").await.unwrap().unwrap();
    assert_eq!(secret.profile, "ISOLIR");

    mock.shutdown();
}

#[tokio::test]
async fn rejected_credentials_are_not_a_transient_error() {
    let state = MockState {
        reject_auth: true,
        ..MockState::default()
    };
    let mock = MockRouter::start(state).await;

    let err = connect(&mock).await.unwrap_err();
    assert!(err.is_auth_rejected());
    assert!(!err.is_transient());
    assert!(err.to_string().contains("invalid user name or password"));

    mock.shutdown();
}

#[tokio::test]
async fn trap_on_write_surfaces_the_device_message() {
    let mut state = MockState::default();
    state.add_secret("alice", "10M");
    let mock = MockRouter::start(state).await;

    let mut session = connect(&mock).await.unwrap();
    let err = session
        .set_secret_profile("*FF", "ISOLIR")
        .await
        .unwrap_err();

    match err {
        Error::Trap { message, .. } => assert_eq!(message, "no such item"),
        other => panic!("expected trap, got {other}"),
    }

    mock.shutdown();
}

#[tokio::test]
async fn connect_to_dead_port_times_out_quickly() {
    // Bind and immediately drop to get a port nothing listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let (user, pass) = creds();
    let opts = ConnectOptions {
        timeout: Duration::from_millis(500),
        attempts: 1,
    };
    let err = DeviceSession::connect("127.0.0.1", port, &user, &pass, &opts)
        .await
        .unwrap_err();
    assert!(err.is_transient());
}

#[tokio::test]
async fn remove_active_kicks_the_session() {
    let mut state = MockState::default();
    state.add_secret("alice", "10M");
    state.add_active("alice", "10.20.0.2");
    let mock = MockRouter::start(state).await;

    let mut session = connect(&mock).await.unwrap();
    let active = session.find_active("alice").await.unwrap().unwrap();
    session.remove_active(&active.id).await.unwrap();

    assert!(session.find_active("alice").await.unwrap().is_none());
    assert_eq!(mock.state().lock().await.kicked, vec!["alice".to_owned()]);

    mock.shutdown();
}

#[tokio::test]
async fn system_vitals() {
    let mut state = MockState::default();
    state.add_active("alice", "10.20.0.2");
    state.add_active("bob", "10.20.0.3");
    let mock = MockRouter::start(state).await;

    let mut session = connect(&mock).await.unwrap();

    let resource = session.system_resource().await.unwrap();
    assert_eq!(resource.cpu_load, Some(4));
    assert_eq!(resource.board_name.as_deref(), Some("RB5009UG+S+"));

    let identity = session.system_identity().await.unwrap();
    assert_eq!(identity.as_deref(), Some("mock-router"));

    let online = session.active_sessions().await.unwrap();
    assert_eq!(online.len(), 2);

    mock.shutdown();
}
