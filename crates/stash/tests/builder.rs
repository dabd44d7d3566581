//! Tests for assembling a `Stash` through the facade.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use stash::manager::{ManagerError, RegistryError};
use stash::prelude::*;
use stash::store::StoreError;

#[tokio::test(start_paused = true)]
async fn test_default_build_uses_memory_provider() {
    let stash = Stash::builder().build().unwrap();

    assert_eq!(stash.registry().names(), vec!["memory"]);
    assert_eq!(stash.manager().provider_name(), "memory");
    assert_eq!(stash.manager().cookie_name(), "stash_sid");
    assert_eq!(stash.manager().max_idle(), Duration::from_secs(3600));
}

#[tokio::test(start_paused = true)]
async fn test_session_round_trip_through_facade() {
    let stash = Stash::builder()
        .config(ManagerConfig::default().cookie_name("sid"))
        .build()
        .unwrap();
    let manager = stash.manager();

    let mut response = ResponseCookies::new();
    let session = manager.start(&RequestCookies::new(), &mut response).unwrap();
    session.insert("visits", 1u64).unwrap();

    let header = response.header_values().remove(0);
    let value = header
        .strip_prefix("sid=")
        .and_then(|rest| rest.split(';').next())
        .unwrap()
        .to_string();

    let request = RequestCookies::parse(&format!("theme=dark; sid={value}"));
    let resumed = manager.start(&request, &mut ResponseCookies::new()).unwrap();
    assert_eq!(resumed.get_as::<u64>("visits").as_deref(), Some(&1));
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_provider_surfaces_from_build() {
    let err = Stash::builder()
        .provider("memory", MemoryProvider::new())
        .build()
        .unwrap_err();

    assert!(matches!(
        err,
        StashError::Registry(RegistryError::DuplicateProvider(ref name)) if name == "memory"
    ));
}

#[tokio::test(start_paused = true)]
async fn test_replacing_memory_provider_with_capped_one() {
    let capped = Arc::new(MemoryProvider::with_max_sessions(NonZeroUsize::new(2).unwrap()));
    let stash = Stash::builder()
        .without_memory_provider()
        .shared_provider("memory", Arc::clone(&capped) as Arc<dyn Provider>)
        .build()
        .unwrap();

    for _ in 0..2 {
        stash
            .manager()
            .start(&RequestCookies::new(), &mut ResponseCookies::new())
            .unwrap();
    }
    let err = stash
        .manager()
        .start(&RequestCookies::new(), &mut ResponseCookies::new())
        .unwrap_err();

    assert!(matches!(
        err,
        ManagerError::Store(StoreError::CapacityExhausted { max: 2 })
    ));
    assert_eq!(capped.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_unknown_provider_surfaces_from_build() {
    let err = Stash::builder()
        .config(ManagerConfig::default().provider("redis"))
        .build()
        .unwrap_err();

    assert!(matches!(err, StashError::Manager(ManagerError::UnknownProvider(_))));
}

#[tokio::test(start_paused = true)]
async fn test_config_from_json() {
    let config: ManagerConfig =
        serde_json::from_str(r#"{ "cookie_name": "gosessionid", "max_idle_secs": 3600 }"#)
            .unwrap();
    let mut stash = Stash::builder().config(config).build().unwrap();

    assert_eq!(stash.manager().cookie_name(), "gosessionid");
    stash.shutdown().await;
    assert!(!stash.manager().is_running());
}

#[test]
fn test_build_outside_runtime_fails() {
    let err = Stash::builder().build().unwrap_err();
    assert!(matches!(err, StashError::Manager(ManagerError::Reaper(_))));
}
